//! Dynamic (CGI/1.1) responder (C5): spawns the requested script, wires
//! its environment and pipes, and demultiplexes its stdout into an HTTP
//! status line, the forwarded CGI headers, and the body.

use crate::config::ServerConfig;
use crate::error::{reason_phrase, PipelineError};
use crate::path;
use crate::request::Request;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::io::FromRawFd;
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::WriteHalf;
use tokio::process::Command;

/// Sentinel exit code a CGI script can use to signal its own
/// query-string-too-long condition. The responder also performs the same
/// check up front, before spawning, so this path is only reachable if a
/// script chooses to exit this way on its own.
const QUERY_TOO_LONG_EXIT_CODE: i32 = 78;

/// Matches `BUFFER_SIZE` in the system this was distilled from: the cap
/// on the joined `QUERY_STRING` the responder will hand to a script.
const MAX_QUERY_STRING_LEN: usize = 8192;

/// Purely for tracing span naming — transitions are linear, there is no
/// retry or branching back.
#[derive(Debug, Clone, Copy)]
enum CgiState {
    Spawning,
    Streaming,
    Reaped,
}

pub async fn serve(
    request: &Request,
    writer: &mut WriteHalf<'_>,
    config: &ServerConfig,
) -> Result<(), (PipelineError, bool)> {
    let absolute_path = path::compose(&config.document_root, &request.path)
        .map_err(|e| (e, false))?;

    let metadata = tokio::fs::metadata(&absolute_path)
        .await
        .map_err(|e| (PipelineError::from_open_error(&e), false))?;

    if metadata.permissions().mode() & 0o111 == 0 {
        return Err((PipelineError::Forbidden, false));
    }

    let query_string = build_query_string(&request.params);
    if query_string.len() > MAX_QUERY_STRING_LEN {
        return Err((PipelineError::UriTooLong, false));
    }

    // stdout and stderr are redirected onto the same pipe, matching
    // `serve_dynamic`'s dup2 of both fds onto one pipe write-end: whatever
    // the script writes to either stream ends up in the single combined
    // output this responder demultiplexes below.
    let (mut output_reader, stdout_stdio, stderr_stdio) = combined_output_pipe()
        .map_err(|_| (PipelineError::Internal("failed to create CGI output pipe"), false))?;

    let mut command = Command::new(&absolute_path);
    command
        .env("REQUEST_METHOD", "GET")
        .env("SERVER_PORT", config.port.to_string())
        .env("SERVER_NAME", &config.server_name)
        .env("SCRIPT_NAME", &request.path)
        .env("SERVER_SOFTWARE", &config.server_name)
        .env("GATEWAY_INTERFACE", "CGI/1.1")
        .env("SERVER_PROTOCOL", "HTTP/1.1")
        .env("CONTENT_TYPE", "")
        .env("CONTENT_LENGTH", "0")
        .env("QUERY_STRING", &query_string)
        .stdin(Stdio::null())
        .stdout(stdout_stdio)
        .stderr(stderr_stdio);

    tracing::debug!(state = ?CgiState::Spawning, path = %absolute_path.display(), "spawning CGI script");
    let mut child = command
        .spawn()
        .map_err(|_| (PipelineError::Internal("failed to spawn CGI script"), false))?;

    // Drain the combined pipe concurrently with waiting for exit. This must
    // never wait for the child before the pipe is drained: a script that
    // writes more than one pipe buffer before exiting would otherwise
    // deadlock the server against itself.
    tracing::debug!(state = ?CgiState::Streaming, "draining CGI output");
    let (output, status) = tokio::join!(drain_to_vec(&mut output_reader), child.wait());
    let mut output = output.map_err(|_| (PipelineError::Internal("failed to read CGI output"), false))?;
    let status = status.map_err(|_| (PipelineError::Internal("failed to wait for CGI child"), false))?;
    tracing::debug!(state = ?CgiState::Reaped, code = ?status.code(), "CGI child exited");

    match status.code() {
        Some(0) => {}
        Some(QUERY_TOO_LONG_EXIT_CODE) => return Err((PipelineError::UriTooLong, false)),
        _ => return Err((PipelineError::Internal("CGI script exited abnormally"), false)),
    }

    let separator = find_header_separator(&output)
        .ok_or((PipelineError::Internal("CGI response missing header terminator"), false))?;

    let body = output.split_off(separator.end);
    let headers_text = String::from_utf8_lossy(&output[..separator.start]);

    let (status_code, forwarded_headers) = parse_cgi_headers(&headers_text);

    let status_line = format!(
        "HTTP/1.1 {} {}\r\n",
        status_code,
        reason_phrase(status_code)
    );

    writer
        .write_all(status_line.as_bytes())
        .await
        .map_err(|_| (PipelineError::Internal("write failed"), false))?;
    writer
        .write_all(format!("Server: {}\r\n", config.server_name).as_bytes())
        .await
        .map_err(|_| (PipelineError::Internal("write failed"), true))?;
    writer
        .write_all(b"Connection: close\r\n")
        .await
        .map_err(|_| (PipelineError::Internal("write failed"), true))?;

    for line in &forwarded_headers {
        writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .map_err(|_| (PipelineError::Internal("write failed"), true))?;
    }
    writer
        .write_all(b"\r\n")
        .await
        .map_err(|_| (PipelineError::Internal("write failed"), true))?;

    writer
        .write_all(&body)
        .await
        .map_err(|_| (PipelineError::Internal("write failed"), true))?;

    Ok(())
}

/// Creates one pipe and wires its write end into two `Stdio` handles (one
/// plain, one `dup`'d), so a child given both as stdout and stderr has them
/// dup2'd onto the same underlying pipe — the async analogue of
/// `serve_dynamic`'s `dup2(pipe_from_child[1], STDOUT_FILENO)` /
/// `dup2(pipe_from_child[1], STDERR_FILENO)` pair. The read end is handed
/// back wrapped for async reads; `tokio::fs::File` is used rather than a
/// `tokio::net::unix::pipe::Receiver` since it needs no non-blocking fd
/// setup and already appears in the teacher's dependency on full `tokio`.
fn combined_output_pipe() -> std::io::Result<(tokio::fs::File, Stdio, Stdio)> {
    let mut fds: [libc::c_int; 2] = [0; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    let (read_fd, write_fd) = (fds[0], fds[1]);

    let write_fd_dup = unsafe { libc::dup(write_fd) };
    if write_fd_dup < 0 {
        let err = std::io::Error::last_os_error();
        unsafe {
            libc::close(read_fd);
            libc::close(write_fd);
        }
        return Err(err);
    }

    // Safety: each fd above is freshly created and owned by exactly one of
    // these three wrappers, which take over closing it.
    let reader = unsafe { tokio::fs::File::from_std(std::fs::File::from_raw_fd(read_fd)) };
    let stdout_stdio = unsafe { Stdio::from_raw_fd(write_fd) };
    let stderr_stdio = unsafe { Stdio::from_raw_fd(write_fd_dup) };

    Ok((reader, stdout_stdio, stderr_stdio))
}

/// `name=value` pairs joined by `&`, matching the distilled source's
/// `QUERY_STRING` construction exactly (no re-encoding — see the Open
/// Question resolution in SPEC_FULL.md §9).
fn build_query_string(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

async fn drain_to_vec<R: AsyncReadExt + Unpin>(reader: &mut R) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}

struct Separator {
    start: usize,
    end: usize,
}

/// Finds the first `\r\n\r\n` or `\n\n` occurrence, whichever comes first,
/// matching `serve_dynamic`'s dual-terminator search.
fn find_header_separator(output: &[u8]) -> Option<Separator> {
    let crlf = find_subslice(output, b"\r\n\r\n").map(|pos| Separator { start: pos, end: pos + 4 });
    let lf = find_subslice(output, b"\n\n").map(|pos| Separator { start: pos, end: pos + 2 });
    match (crlf, lf) {
        (Some(c), Some(l)) => Some(if c.start <= l.start { c } else { l }),
        (Some(c), None) => Some(c),
        (None, Some(l)) => Some(l),
        (None, None) => None,
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

/// Parses the CGI header block: one header per `\n`-terminated line
/// (optional trailing `\r` stripped). A `Status:` line sets the HTTP
/// status and is excluded from the forwarded lines; everything else is
/// forwarded verbatim.
fn parse_cgi_headers(block: &str) -> (u16, Vec<String>) {
    let mut status_code = 200u16;
    let mut forwarded = Vec::new();

    for raw_line in block.split('\n') {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        if line.is_empty() {
            continue;
        }
        if let Some(value) = line.strip_prefix("Status:") {
            if let Ok(code) = value.trim().split_whitespace().next().unwrap_or("").parse() {
                status_code = code;
            }
            continue;
        }
        forwarded.push(line.to_string());
    }

    (status_code, forwarded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string_joins_without_reencoding() {
        let params = vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "".to_string()),
        ];
        assert_eq!(build_query_string(&params), "a=1&b=");
    }

    #[test]
    fn header_separator_prefers_crlf_when_both_present() {
        let output = b"Content-Type: text/plain\r\n\r\nbody";
        let sep = find_header_separator(output).unwrap();
        assert_eq!(sep.start, 25);
        assert_eq!(sep.end, 29);
    }

    #[test]
    fn header_separator_falls_back_to_lf_lf() {
        let output = b"Content-Type: text/plain\n\nbody";
        let sep = find_header_separator(output).unwrap();
        assert_eq!(&output[sep.end..], b"body");
    }

    #[test]
    fn status_header_is_parsed_and_excluded_from_forwarded_lines() {
        let (code, headers) = parse_cgi_headers("Status: 404 Not Found\r\nContent-Type: text/plain\r\n");
        assert_eq!(code, 404);
        assert_eq!(headers, vec!["Content-Type: text/plain".to_string()]);
    }

    #[test]
    fn missing_status_header_defaults_to_200() {
        let (code, headers) = parse_cgi_headers("Content-Type: text/plain\r\n");
        assert_eq!(code, 200);
        assert_eq!(headers, vec!["Content-Type: text/plain".to_string()]);
    }
}
