//! Content providers serving the console page and its assets.
//!
//! [`DirectoryMount`] serves files below a root directory, [`StaticContent`] serves one
//! in-memory resource. Both answer `404 NOT FOUND` or `500 INTERNAL ERROR` themselves
//! and close the connection afterwards like every other provider.

mod directory;
mod static_content;

pub use directory::{DirectoryMount, PathFilter, js_txt_filter};
pub use static_content::StaticContent;

use mime::Mime;
use tracing::warn;
use wsconsole_http::handler::ResponseWriter;
use wsconsole_http::protocol::{HttpRequest, ResponseHead, SendError, StatusLine};

/// Guesses the content type from the file extension of `path`.
pub fn content_type(path: &[u8]) -> Mime {
    let extension = path.rsplit(|&b| b == b'.').next().unwrap_or_default();
    match extension.to_ascii_lowercase().as_slice() {
        b"html" | b"htm" => mime::TEXT_HTML_UTF_8,
        b"js" | b"mjs" => mime::TEXT_JAVASCRIPT,
        b"css" => mime::TEXT_CSS_UTF_8,
        b"json" => mime::APPLICATION_JSON,
        b"txt" => mime::TEXT_PLAIN_UTF_8,
        b"png" => mime::IMAGE_PNG,
        b"jpg" | b"jpeg" => mime::IMAGE_JPEG,
        b"gif" => mime::IMAGE_GIF,
        b"svg" => mime::IMAGE_SVG,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

pub(crate) async fn not_found(out: &mut ResponseWriter<'_>, request: &HttpRequest) -> Result<(), SendError> {
    warn!(request = %request, "404 <=");
    wsconsole_http::codec::write_head(out, &ResponseHead::new(StatusLine::NOT_FOUND)).await
}

pub(crate) async fn internal_error(out: &mut ResponseWriter<'_>, message: &str) -> Result<(), SendError> {
    let head = ResponseHead::new(StatusLine::INTERNAL_ERROR).content_length(message.len());
    wsconsole_http::codec::write_response(out, &head, message.as_bytes()).await
}
