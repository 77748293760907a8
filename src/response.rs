//! `Response` record and the wire-format header serializer (C6).

use crate::error::reason_phrase;
use std::borrow::Cow;

#[derive(Debug, Clone)]
pub struct Response {
    pub status_code: u16,
    pub reason: Cow<'static, str>,

    pub server: Cow<'static, str>,
    pub date: String,
    pub connection: Cow<'static, str>,

    pub content_type: Option<Cow<'static, str>>,
    pub content_length: u64,
    pub content_encoding: Option<String>,
    pub last_modified: Option<String>,

    pub cache_control: Option<String>,
    pub etag: Option<String>,

    pub extra_headers: Vec<(String, String)>,
}

impl Response {
    /// A fresh 200 OK response with `date` stamped at construction time,
    /// matching `initialize_response`'s defaults in the distilled source.
    pub fn new(server_name: Cow<'static, str>) -> Self {
        Response {
            status_code: 200,
            reason: Cow::Borrowed("OK"),
            server: server_name,
            date: httpdate::fmt_http_date(std::time::SystemTime::now()),
            connection: Cow::Borrowed("close"),
            content_type: None,
            content_length: 0,
            content_encoding: None,
            last_modified: None,
            cache_control: None,
            etag: None,
            extra_headers: Vec::new(),
        }
    }

    pub fn set_error(&mut self, status_code: u16) {
        self.status_code = status_code;
        self.reason = Cow::Borrowed(reason_phrase(status_code));
    }

    /// Serializes the fixed header order from spec §4.6. `Content-Length`
    /// is always emitted, even when zero; every other header is emitted
    /// only when set.
    pub fn serialize(&self) -> Vec<u8> {
        let reason = if self.reason.is_empty() {
            "Unknown"
        } else {
            self.reason.as_ref()
        };

        let mut out = format!("HTTP/1.1 {} {}\r\n", self.status_code, reason);

        out.push_str(&format!("Date: {}\r\n", self.date));
        out.push_str(&format!("Server: {}\r\n", self.server));
        out.push_str(&format!("Connection: {}\r\n", self.connection));

        if let Some(v) = &self.last_modified {
            out.push_str(&format!("Last-Modified: {v}\r\n"));
        }
        if let Some(v) = &self.cache_control {
            out.push_str(&format!("Cache-Control: {v}\r\n"));
        }
        if let Some(v) = &self.etag {
            out.push_str(&format!("ETag: {v}\r\n"));
        }
        if let Some(v) = &self.content_type {
            out.push_str(&format!("Content-Type: {v}\r\n"));
        }

        out.push_str(&format!("Content-Length: {}\r\n", self.content_length));

        if let Some(v) = &self.content_encoding {
            out.push_str(&format!("Content-Encoding: {v}\r\n"));
        }

        for (name, value) in &self.extra_headers {
            out.push_str(&format!("{name}: {value}\r\n"));
        }

        out.push_str("\r\n");
        out.into_bytes()
    }
}
