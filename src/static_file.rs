//! Static responder (C4): opens a file beneath the document root, fills
//! content headers from its metadata, and streams the body in 8 KiB
//! chunks.

use crate::config::ServerConfig;
use crate::error::PipelineError;
use crate::path;
use crate::request::Request;
use crate::response::Response;
use std::borrow::Cow;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::WriteHalf;

const STREAM_CHUNK_SIZE: usize = 8192;

/// Serves `request` as a static file. Writes the response header as soon
/// as content headers are filled, then streams the body. Returns `Ok(())`
/// after a full successful response, or `Err` with `response` mutated to
/// describe the failure. The caller tracks whether any bytes were written
/// yet (`committed`) to decide whether an error page can still be sent.
pub async fn serve(
    request: &Request,
    response: &mut Response,
    writer: &mut WriteHalf<'_>,
    config: &ServerConfig,
) -> Result<(), (PipelineError, bool)> {
    let absolute_path = path::compose(&config.document_root, &request.path)
        .map_err(|e| (e, false))?;

    let file = tokio::fs::File::open(&absolute_path)
        .await
        .map_err(|e| (PipelineError::from_open_error(&e), false))?;

    let metadata = file
        .metadata()
        .await
        .map_err(|_| (PipelineError::Internal("fstat failed"), false))?;

    response.content_length = metadata.len();
    response.content_type = Some(Cow::Borrowed(request.mime_type.as_str()));
    response.content_encoding = None;
    let modified = metadata
        .modified()
        .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
    response.last_modified = Some(httpdate::fmt_http_date(modified));
    response.status_code = 200;
    response.reason = Cow::Borrowed("OK");

    let header_bytes = response.serialize();
    writer
        .write_all(&header_bytes)
        .await
        .map_err(|_| (PipelineError::Internal("header write failed"), false))?;

    // The header has been committed: any failure from here on must not
    // attempt a second response.
    stream_body(file, writer)
        .await
        .map_err(|_| (PipelineError::Internal("body stream failed"), true))
}

async fn stream_body(
    mut file: tokio::fs::File,
    writer: &mut WriteHalf<'_>,
) -> std::io::Result<()> {
    let mut chunk = [0u8; STREAM_CHUNK_SIZE];
    loop {
        let n = file.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&chunk[..n]).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::parse_request_line;
    use tempfile::TempDir;
    use tokio::net::{TcpListener, TcpStream};

    fn config_with_root(root: &std::path::Path) -> ServerConfig {
        let mut cfg = ServerConfig::default_for_test();
        cfg.document_root = format!("{}/", root.display());
        cfg
    }

    #[tokio::test]
    async fn serves_file_with_correct_headers_and_body() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("hello.txt"), b"hi\n").unwrap();
        let config = config_with_root(dir.path());

        let request =
            parse_request_line("GET /hello.txt HTTP/1.1", &config.dynamic_dir_name).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server_task = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let (_, mut write_half) = stream.split();
            let mut response = Response::new(Cow::Borrowed("test/1.0"));
            serve(&request, &mut response, &mut write_half, &config)
                .await
                .unwrap();
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        server_task.await.unwrap();

        let mut received = Vec::new();
        use tokio::io::AsyncReadExt as _;
        client.read_to_end(&mut received).await.unwrap();

        let text = String::from_utf8(received).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/plain\r\n"));
        assert!(text.contains("Content-Length: 3\r\n"));
        assert!(text.ends_with("hi\n"));
    }

    #[tokio::test]
    async fn missing_file_yields_not_found() {
        let dir = TempDir::new().unwrap();
        let config = config_with_root(dir.path());
        let request =
            parse_request_line("GET /nope.txt HTTP/1.1", &config.dynamic_dir_name).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let (_, mut write_half) = stream.split();
            let mut response = Response::new(Cow::Borrowed("test/1.0"));
            let result = serve(&request, &mut response, &mut write_half, &config).await;
            assert!(matches!(result, Err((PipelineError::NotFound, false))));
        });

        let _client = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
}
