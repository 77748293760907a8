//! Connection driver (C7): per-connection orchestration. Reads exactly one
//! request, dispatches to the static or CGI responder, and always closes
//! the connection after a single response — there is no keep-alive loop
//! (persistent connections are out of scope).

use crate::config::ServerConfig;
use crate::error::PipelineError;
use crate::reader::BufferedReader;
use crate::request::{self, Request};
use crate::response::Response;
use crate::{cgi, static_file};
use std::borrow::Cow;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Header block accumulation bound. Generous relative to `MAX_URI_LENGTH`
/// to leave room for a request line plus headers a real client sends.
const MAX_HEADER_BYTES: usize = 32 * 1024;

pub async fn handle(mut stream: TcpStream, config: ServerConfig) {
    let (read_half, mut write_half) = stream.split();
    let mut reader = BufferedReader::new(read_half);

    let result = reader.read_until_headers_end(MAX_HEADER_BYTES).await;

    let raw = match result {
        Ok((buf, true)) => buf,
        Ok((_, false)) => {
            send_error(&mut write_half, &config, PipelineError::BadRequest("request too large or truncated")).await;
            return;
        }
        Err(err) => {
            tracing::warn!(error = %err, "connection read failed");
            return;
        }
    };

    let request_line = match first_line(&raw) {
        Some(line) => line,
        None => {
            send_error(&mut write_half, &config, PipelineError::BadRequest("no request line")).await;
            return;
        }
    };

    let request = match request::parse_request_line(request_line, &config.dynamic_dir_name) {
        Ok(request) => request,
        Err(err) => {
            send_error(&mut write_half, &config, err).await;
            return;
        }
    };

    dispatch(&request, &mut write_half, &config).await;
}

async fn dispatch(
    request: &Request,
    write_half: &mut tokio::net::tcp::WriteHalf<'_>,
    config: &ServerConfig,
) {
    let outcome = if request.is_dynamic {
        cgi::serve(request, write_half, config).await
    } else {
        let mut response = Response::new(Cow::Owned(config.server_name.clone()));
        static_file::serve(request, &mut response, write_half, config).await
    };

    if let Err((err, committed)) = outcome {
        if committed {
            tracing::warn!(error = %err, "response already committed, cannot send error page");
        } else {
            send_error(write_half, config, err).await;
        }
    }
}

async fn send_error(
    write_half: &mut tokio::net::tcp::WriteHalf<'_>,
    config: &ServerConfig,
    err: PipelineError,
) {
    let mut response = Response::new(Cow::Owned(config.server_name.clone()));
    response.set_error(err.status_code());
    let body = format!(
        "<html><body><h1>{} {}</h1></body></html>",
        err.status_code(),
        err.reason()
    );
    response.content_type = Some(Cow::Borrowed("text/html"));
    response.content_length = body.len() as u64;

    let header_bytes = response.serialize();
    if write_half.write_all(&header_bytes).await.is_err() {
        return;
    }
    let _ = write_half.write_all(body.as_bytes()).await;
}

/// Pulls the request line (everything up to the first CRLF) out of the
/// accumulated header block, trimming the line itself but leaving the
/// rest of the headers (which this driver doesn't otherwise inspect) in
/// place.
fn first_line(raw: &[u8]) -> Option<&str> {
    let end = raw.windows(2).position(|w| w == b"\r\n")?;
    std::str::from_utf8(&raw[..end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream as ClientStream};

    fn test_config(root: &std::path::Path) -> ServerConfig {
        let mut cfg = ServerConfig::default_for_test();
        cfg.document_root = format!("{}/", root.display());
        cfg
    }

    #[tokio::test]
    async fn serves_static_file_end_to_end() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"content").unwrap();
        let config = test_config(dir.path());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            handle(stream, config).await;
        });

        let mut client = ClientStream::connect(addr).await.unwrap();
        client.write_all(b"GET /a.txt HTTP/1.1\r\nHost: x\r\n\r\n").await.unwrap();

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        let text = String::from_utf8(received).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.ends_with("content"));
    }

    #[tokio::test]
    async fn missing_file_returns_404_error_page() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = test_config(dir.path());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            handle(stream, config).await;
        });

        let mut client = ClientStream::connect(addr).await.unwrap();
        client.write_all(b"GET /missing.txt HTTP/1.1\r\n\r\n").await.unwrap();

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        let text = String::from_utf8(received).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[tokio::test]
    async fn malformed_request_line_returns_400() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = test_config(dir.path());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            handle(stream, config).await;
        });

        let mut client = ClientStream::connect(addr).await.unwrap();
        client.write_all(b"GET /x\r\n\r\n").await.unwrap();

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        let text = String::from_utf8(received).unwrap();
        assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[tokio::test]
    async fn path_traversal_escape_returns_404() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = test_config(dir.path());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            handle(stream, config).await;
        });

        let mut client = ClientStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET /../../../../etc/passwd HTTP/1.1\r\n\r\n")
            .await
            .unwrap();

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        let text = String::from_utf8(received).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }
}
