//! Buffered byte reader (C1): an 8 KiB line/block reader over a TCP
//! connection. tokio's I/O driver already retries on `EINTR` at the
//! epoll/kqueue layer, so this struct's job is purely the buffering and
//! bound-respecting contract from spec §4.1, not raw-syscall retry logic.

use tokio::io::AsyncReadExt;
use tokio::net::tcp::ReadHalf;

pub const BUFFER_CAPACITY: usize = 8192;

pub struct BufferedReader<'a> {
    inner: ReadHalf<'a>,
}

impl<'a> BufferedReader<'a> {
    pub fn new(read_half: ReadHalf<'a>) -> Self {
        BufferedReader { inner: read_half }
    }

    /// Accumulates bytes from the connection into `out` until a header
    /// terminator (`\r\n\r\n`) is seen, `max` bytes have been accumulated,
    /// or EOF occurs. Returns `true` if the terminator was found. This is
    /// used once per connection by the driver (C7) to pull in the whole
    /// request-line-plus-headers block before handing it to the parser.
    pub async fn read_until_headers_end(
        &mut self,
        max: usize,
    ) -> std::io::Result<(Vec<u8>, bool)> {
        let mut buf = Vec::with_capacity(512);
        let mut chunk = [0u8; BUFFER_CAPACITY];
        loop {
            if let Some(pos) = find_subslice(&buf, b"\r\n\r\n") {
                buf.truncate(pos + 4);
                return Ok((buf, true));
            }
            if buf.len() >= max {
                return Ok((buf, false));
            }
            let to_read = chunk.len().min(max - buf.len());
            let n = self.inner.read(&mut chunk[..to_read]).await?;
            if n == 0 {
                return Ok((buf, false));
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
