use crate::negotiate::Representation;
use axum::http::{HeaderMap, Request, Uri, header, request::Parts};
use uuid::Uuid;

/// Per-request context handed to resolution rules.
///
/// Carries the request's target path (for diagnostic messages), the accept
/// signal that drives content negotiation, and a correlation id that shows
/// up in resolution logs.
#[derive(Debug, Clone)]
pub struct RequestContext {
    path: String,
    accept: Option<String>,
    request_id: Uuid,
}

impl RequestContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            accept: None,
            request_id: Uuid::new_v4(),
        }
    }

    /// Set the accept-representation signal (a bare token like `"xml"` or a
    /// raw `Accept` header value).
    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    /// Extract path and `Accept` header from an incoming request.
    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self::extract(request.uri(), request.headers())
    }

    /// Extract path and `Accept` header from decomposed request parts.
    pub fn from_parts(parts: &Parts) -> Self {
        Self::extract(&parts.uri, &parts.headers)
    }

    fn extract(uri: &Uri, headers: &HeaderMap) -> Self {
        let context = Self::new(uri.path());
        match headers
            .get(header::ACCEPT)
            .and_then(|value| value.to_str().ok())
        {
            Some(accept) => context.with_accept(accept),
            None => context,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn accept(&self) -> Option<&str> {
        self.accept.as_deref()
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// The representation negotiated from the accept signal.
    pub fn representation(&self) -> Representation {
        Representation::negotiate(self.accept.as_deref())
    }
}
