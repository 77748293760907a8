//! MIME type classification from a request path's extension.

use std::path::Path;

/// The set of `Content-Type` values this server can emit for static/CGI
/// dispatch. `OctetStream` is reserved for future extension table entries;
/// the current table always falls back to `PlainText` for unknown or
/// missing extensions, matching the distilled source's `get_mime_type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MimeType {
    Html,
    PlainText,
    Css,
    Javascript,
    Json,
    PostScript,
    Gif,
    Png,
    Jpeg,
    Pdf,
    OctetStream,
}

impl MimeType {
    pub fn as_str(self) -> &'static str {
        match self {
            MimeType::Html => "text/html",
            MimeType::PlainText => "text/plain",
            MimeType::Css => "text/css",
            MimeType::Javascript => "application/javascript",
            MimeType::Json => "application/json",
            MimeType::PostScript => "application/postscript",
            MimeType::Gif => "image/gif",
            MimeType::Png => "image/png",
            MimeType::Jpeg => "image/jpeg",
            MimeType::Pdf => "application/pdf",
            MimeType::OctetStream => "application/octet-stream",
        }
    }
}

/// Classifies a request path by its last `.`-separated extension,
/// case-insensitively. Paths with no extension default to `PlainText`.
pub fn classify(path: &str) -> MimeType {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str());

    let Some(extension) = extension else {
        return MimeType::PlainText;
    };

    match extension.to_ascii_lowercase().as_str() {
        "html" | "htm" => MimeType::Html,
        "txt" => MimeType::PlainText,
        "css" => MimeType::Css,
        "js" => MimeType::Javascript,
        "json" => MimeType::Json,
        "ps" => MimeType::PostScript,
        "gif" => MimeType::Gif,
        "png" => MimeType::Png,
        "jpg" | "jpeg" => MimeType::Jpeg,
        "pdf" => MimeType::Pdf,
        _ => MimeType::PlainText,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_variants() {
        assert_eq!(classify("index.html").as_str(), "text/html");
        assert_eq!(classify("page.htm").as_str(), "text/html");
        assert_eq!(classify("INDEX.HTML").as_str(), "text/html");
    }

    #[test]
    fn common_types() {
        assert_eq!(classify("style.css").as_str(), "text/css");
        assert_eq!(classify("app.js").as_str(), "application/javascript");
        assert_eq!(classify("data.json").as_str(), "application/json");
        assert_eq!(classify("doc.ps").as_str(), "application/postscript");
        assert_eq!(classify("icon.gif").as_str(), "image/gif");
        assert_eq!(classify("logo.png").as_str(), "image/png");
        assert_eq!(classify("photo.jpg").as_str(), "image/jpeg");
        assert_eq!(classify("photo.jpeg").as_str(), "image/jpeg");
        assert_eq!(classify("book.pdf").as_str(), "application/pdf");
    }

    #[test]
    fn unknown_and_missing_extension_default_to_plain_text() {
        assert_eq!(classify("README").as_str(), "text/plain");
        assert_eq!(classify("archive.tar.gz").as_str(), "text/plain");
        assert_eq!(classify("data.xyz").as_str(), "text/plain");
    }

    #[test]
    fn path_with_directories() {
        assert_eq!(classify("/css/main.css").as_str(), "text/css");
        assert_eq!(classify("/images/logo.png").as_str(), "image/png");
    }
}
