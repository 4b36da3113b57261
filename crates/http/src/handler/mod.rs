//! Content providers and the first-match chain that dispatches plain HTTP requests.
//!
//! A [`ContentProvider`] claims requests with [`ContentProvider::matches`] and writes a
//! complete response, head and body, in [`ContentProvider::respond`]. The connection is
//! closed after the response, so providers never deal with keep-alive or framing.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWrite;
use tracing::trace;

use crate::codec::write_response;
use crate::protocol::{HttpRequest, ResponseHead, SendError, StatusLine};

/// The writer a provider answers into.
pub type ResponseWriter<'a> = dyn AsyncWrite + Send + Unpin + 'a;

#[async_trait]
pub trait ContentProvider: Send + Sync {
    fn matches(&self, request: &HttpRequest) -> bool;

    async fn respond(&self, request: &HttpRequest, out: &mut ResponseWriter<'_>) -> Result<(), SendError>;
}

#[async_trait]
impl<P> ContentProvider for Arc<P>
where
    P: ContentProvider + ?Sized,
{
    fn matches(&self, request: &HttpRequest) -> bool {
        (**self).matches(request)
    }

    async fn respond(&self, request: &HttpRequest, out: &mut ResponseWriter<'_>) -> Result<(), SendError> {
        (**self).respond(request, out).await
    }
}

/// Answers every request with `200 OK` and the body `Hello`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OkResponder;

const OK_BODY: &[u8] = b"Hello";

#[async_trait]
impl ContentProvider for OkResponder {
    fn matches(&self, _request: &HttpRequest) -> bool {
        true
    }

    async fn respond(&self, _request: &HttpRequest, out: &mut ResponseWriter<'_>) -> Result<(), SendError> {
        let head = ResponseHead::new(StatusLine::OK).content_length(OK_BODY.len());
        write_response(out, &head, OK_BODY).await
    }
}

/// Ordered providers; the first one that matches answers.
pub struct DispatchChain {
    providers: Vec<Box<dyn ContentProvider>>,
    fallback: Box<dyn ContentProvider>,
}

impl DispatchChain {
    pub fn builder() -> DispatchChainBuilder {
        DispatchChainBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn select(&self, request: &HttpRequest) -> &dyn ContentProvider {
        self.providers
            .iter()
            .position(|provider| provider.matches(request))
            .map_or(self.fallback.as_ref(), |index| {
                trace!(provider = index, "content provider matched");
                self.providers[index].as_ref()
            })
    }

    pub async fn respond(&self, request: &HttpRequest, out: &mut ResponseWriter<'_>) -> Result<(), SendError> {
        self.select(request).respond(request, out).await
    }
}

impl Default for DispatchChain {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for DispatchChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchChain").field("providers", &self.providers.len()).finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct DispatchChainBuilder {
    providers: Vec<Box<dyn ContentProvider>>,
    fallback: Option<Box<dyn ContentProvider>>,
}

impl DispatchChainBuilder {
    #[must_use]
    pub fn provider<P: ContentProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Replaces the [`OkResponder`] answering requests no provider matched.
    #[must_use]
    pub fn fallback<P: ContentProvider + 'static>(mut self, provider: P) -> Self {
        self.fallback = Some(Box::new(provider));
        self
    }

    pub fn build(self) -> DispatchChain {
        DispatchChain { providers: self.providers, fallback: self.fallback.unwrap_or_else(|| Box::new(OkResponder)) }
    }
}

impl fmt::Debug for DispatchChainBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchChainBuilder").field("providers", &self.providers.len()).finish_non_exhaustive()
    }
}
