//! Pipeline error kinds and their HTTP status mappings (spec §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed request: {0}")]
    BadRequest(&'static str),

    #[error("method not implemented")]
    NotImplemented,

    #[error("HTTP version not supported")]
    VersionNotSupported,

    #[error("URI too long")]
    UriTooLong,

    #[error("not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,

    #[error("service unavailable")]
    ServiceUnavailable,

    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl PipelineError {
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::BadRequest(_) => 400,
            PipelineError::NotImplemented => 501,
            PipelineError::VersionNotSupported => 505,
            PipelineError::UriTooLong => 414,
            PipelineError::NotFound => 404,
            PipelineError::Forbidden => 403,
            PipelineError::ServiceUnavailable => 503,
            PipelineError::Internal(_) => 500,
        }
    }

    pub fn reason(&self) -> &'static str {
        reason_phrase(self.status_code())
    }

    /// Translates an I/O error encountered while opening a file or CGI
    /// script into the error kind the spec's errno table names.
    pub fn from_open_error(err: &std::io::Error) -> PipelineError {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::NotFound => PipelineError::NotFound,
            ErrorKind::PermissionDenied => PipelineError::Forbidden,
            _ => match err.raw_os_error() {
                Some(code) if code == libc::EMFILE || code == libc::ENFILE => {
                    PipelineError::ServiceUnavailable
                }
                _ => PipelineError::Internal("file open failed"),
            },
        }
    }
}

/// Shared reason-phrase table (spec §4.6), also used by the CGI responder
/// to translate a `Status:` code it didn't generate itself.
pub fn reason_phrase(status_code: u16) -> &'static str {
    match status_code {
        200 => "OK",
        301 => "Moved Permanently",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        414 => "URI Too Long",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",
        505 => "HTTP Version Not Supported",
        _ => "Unknown Status Code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_spec_table() {
        assert_eq!(PipelineError::BadRequest("x").status_code(), 400);
        assert_eq!(PipelineError::NotImplemented.status_code(), 501);
        assert_eq!(PipelineError::VersionNotSupported.status_code(), 505);
        assert_eq!(PipelineError::UriTooLong.status_code(), 414);
        assert_eq!(PipelineError::NotFound.status_code(), 404);
        assert_eq!(PipelineError::Forbidden.status_code(), 403);
        assert_eq!(PipelineError::ServiceUnavailable.status_code(), 503);
        assert_eq!(PipelineError::Internal("x").status_code(), 500);
    }

    #[test]
    fn unknown_code_falls_back() {
        assert_eq!(reason_phrase(999), "Unknown Status Code");
    }
}
