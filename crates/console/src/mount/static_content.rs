use std::fmt;
use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use mime::Mime;
use once_cell::sync::OnceCell;
use tracing::{info, warn};
use wsconsole_http::codec::write_response;
use wsconsole_http::handler::{ContentProvider, ResponseWriter};
use wsconsole_http::protocol::{HttpRequest, ResponseHead, SendError, StatusLine, Utf8Bytes};

use super::{content_type, internal_error};

type Loader = Box<dyn Fn() -> io::Result<Bytes> + Send + Sync>;

/// One in-memory resource served at an exact path.
///
/// The loader runs on the first request only. If it fails, that request is answered
/// with `500 INTERNAL ERROR` and the next request tries again.
pub struct StaticContent {
    path: Utf8Bytes,
    content_type: Mime,
    loader: Loader,
    content: OnceCell<Bytes>,
}

impl StaticContent {
    pub fn new<F>(path: impl Into<Utf8Bytes>, loader: F) -> Self
    where
        F: Fn() -> io::Result<Bytes> + Send + Sync + 'static,
    {
        let path = path.into();
        let content_type = content_type(path.as_bytes());
        Self { path, content_type, loader: Box::new(loader), content: OnceCell::new() }
    }

    pub fn from_bytes(path: impl Into<Utf8Bytes>, content: impl Into<Bytes>) -> Self {
        let content = content.into();
        let cell = OnceCell::with_value(content.clone());
        let mut provider = Self::new(path, move || Ok(content.clone()));
        provider.content = cell;
        provider
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: Mime) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn path(&self) -> &Utf8Bytes {
        &self.path
    }

    fn content(&self) -> io::Result<&Bytes> {
        self.content.get_or_try_init(|| (self.loader)())
    }
}

impl fmt::Debug for StaticContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticContent")
            .field("path", &self.path)
            .field("content_type", &self.content_type)
            .field("loaded", &self.content.get().is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ContentProvider for StaticContent {
    fn matches(&self, request: &HttpRequest) -> bool {
        request.index_path() == self.path
    }

    async fn respond(&self, request: &HttpRequest, out: &mut ResponseWriter<'_>) -> Result<(), SendError> {
        let content = match self.content() {
            Ok(content) => content.clone(),
            Err(e) => {
                warn!(path = %self.path, cause = %e, "failed to load static content");
                return internal_error(out, &e.to_string()).await;
            }
        };

        let head = ResponseHead::new(StatusLine::OK)
            .header("Content-Type", self.content_type.to_string())
            .content_length(content.len());
        write_response(out, &head, &content).await?;
        info!(request = %request, "200 <=");
        Ok(())
    }
}
