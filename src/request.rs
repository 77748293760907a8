//! Request-line and URI parsing (C2): method/version validation,
//! percent-decoding, query splitting, and static/dynamic classification.

use crate::error::PipelineError;
use crate::mime::{self, MimeType};

pub const MAX_URI_LENGTH: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Options,
    Head,
    Put,
    Delete,
    Trace,
}

impl Method {
    fn parse(token: &str) -> Option<Method> {
        Some(match token {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "OPTIONS" => Method::Options,
            "HEAD" => Method::Head,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "TRACE" => Method::Trace,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    fn parse(token: &str) -> Option<Version> {
        match token {
            "HTTP/1.0" => Some(Version::Http10),
            "HTTP/1.1" => Some(Version::Http11),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub version: Version,
    pub path: String,
    pub is_dynamic: bool,
    pub mime_type: MimeType,
    pub params: Vec<(String, String)>,
}

/// Parses a raw request line (everything up to the first CRLF, already
/// stripped of the CRLF itself) into a `Request`, or a `PipelineError`
/// describing exactly why it was rejected (spec §4.2).
pub fn parse_request_line(line: &str, dynamic_dir_name: &str) -> Result<Request, PipelineError> {
    let mut tokens = line.split(' ').filter(|t| !t.is_empty());
    let method_token = tokens
        .next()
        .ok_or(PipelineError::BadRequest("missing method"))?;
    let uri = tokens
        .next()
        .ok_or(PipelineError::BadRequest("missing URI"))?;
    let version_token = tokens
        .next()
        .ok_or(PipelineError::BadRequest("missing version"))?;
    if tokens.next().is_some() {
        return Err(PipelineError::BadRequest("too many tokens in request line"));
    }

    if uri.len() > MAX_URI_LENGTH {
        return Err(PipelineError::UriTooLong);
    }

    let method = match method_token {
        "GET" => Method::Get,
        _ => {
            // Still validate it's a known method token before calling it
            // unimplemented, to give a Bad Request for pure garbage — but
            // the spec only asks that non-GET methods become 501, so any
            // recognizable or unrecognizable verb here is 501 uniformly.
            let _ = Method::parse(method_token);
            return Err(PipelineError::NotImplemented);
        }
    };

    let version =
        Version::parse(version_token).ok_or(PipelineError::VersionNotSupported)?;

    if !uri.starts_with('/') {
        return Err(PipelineError::BadRequest("URI must start with /"));
    }

    let (path, is_dynamic, mime_type, params) = parse_uri(uri, dynamic_dir_name)?;

    Ok(Request {
        method,
        version,
        path,
        is_dynamic,
        mime_type,
        params,
    })
}

fn parse_uri(
    uri: &str,
    dynamic_dir_name: &str,
) -> Result<(String, bool, MimeType, Vec<(String, String)>), PipelineError> {
    let decoded = percent_decode(uri);

    let (path_part, query_part) = match decoded.find('?') {
        Some(idx) => (&decoded[..idx], Some(&decoded[idx + 1..])),
        None => (decoded.as_str(), None),
    };

    if path_part.as_bytes().contains(&0) {
        return Err(PipelineError::BadRequest("NUL byte in path"));
    }

    let is_dynamic = classify_dynamic(path_part, dynamic_dir_name);
    let mime_type = mime::classify(path_part);

    let params = if is_dynamic {
        match query_part {
            Some(q) if !q.is_empty() => parse_query(q),
            _ => Vec::new(),
        }
    } else {
        Vec::new()
    };

    Ok((path_part.to_string(), is_dynamic, mime_type, params))
}

/// Whole-first-segment match: `path` (which begins with `/`) is dynamic
/// iff the segment right after the leading slash equals `dynamic_dir_name`
/// exactly, followed by `/` or end-of-string.
fn classify_dynamic(path: &str, dynamic_dir_name: &str) -> bool {
    let rest = &path[1..]; // skip leading '/'
    match rest.strip_prefix(dynamic_dir_name) {
        Some(after) => after.is_empty() || after.starts_with('/'),
        None => false,
    }
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .map(|token| match token.find('=') {
            Some(idx) => (token[..idx].to_string(), token[idx + 1..].to_string()),
            None => (token.to_string(), String::new()),
        })
        .collect()
}

/// Percent-decodes `input`: valid `%HH` sequences become the corresponding
/// byte, `+` becomes a space, and anything else (including malformed
/// `%`-escapes) is copied through verbatim. Works over raw bytes rather
/// than `&str` slicing throughout, since the two bytes after a `%` are not
/// guaranteed to land on a UTF-8 char boundary (the request line is valid
/// UTF-8 as a whole, but arbitrary byte sequences can follow `%`).
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                if i + 2 < bytes.len() {
                    let (hi, lo) = (bytes[i + 1], bytes[i + 2]);
                    if let (Some(hi), Some(lo)) = (hex_digit(hi), hex_digit(lo)) {
                        out.push(hi * 16 + lo);
                        i += 3;
                        continue;
                    }
                }
                out.push(b'%');
                i += 1;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Maps an ASCII hex digit byte to its value. Operating on raw bytes here
/// (rather than slicing `input` as `&str`) avoids panicking when the two
/// bytes after `%` fall in the middle of a multi-byte UTF-8 sequence.
fn hex_digit(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
