//! The request view handed to predicates.
//!
//! The host buffers the whole body before dispatch. Predicates read it through
//! [`FakeRequest::body_text`] and friends, which decode it once and remember
//! that a filter looked at it.

use crate::error::{FakeServiceError, Result};
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::header::HOST;
use hyper::{HeaderMap, Method, Request, Uri};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use tracing::debug;

#[derive(Debug)]
pub struct FakeRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    body_read: AtomicBool,
    body_text: OnceLock<String>,
}

impl FakeRequest {
    /// Build a request directly. `uri` should be absolute for `where_uri` filters to see a host.
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            method,
            uri,
            headers,
            body: body.into(),
            body_read: AtomicBool::new(false),
            body_text: OnceLock::new(),
        }
    }

    /// Convert an inbound hyper request, collecting its body.
    ///
    /// Origin-form targets are made absolute from the `Host` header, falling back
    /// to `fallback_authority` (the bound address) when the header is missing.
    pub(crate) async fn from_hyper(req: Request<Incoming>, fallback_authority: &str) -> Self {
        let (parts, body) = req.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                debug!("Failed to read request body: {}", e);
                Bytes::new()
            }
        };
        let uri = absolute_uri(&parts.uri, &parts.headers, fallback_authority);
        Self::new(parts.method, uri, parts.headers, body)
    }

    pub fn method(&self) -> &str {
        self.method.as_str()
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of `name`, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Raw body bytes. Counts as reading the body.
    pub fn body_bytes(&self) -> &Bytes {
        self.body_read.store(true, Ordering::SeqCst);
        &self.body
    }

    /// Body decoded as UTF-8 (lossy), decoded at most once.
    pub fn body_text(&self) -> &str {
        self.body_read.store(true, Ordering::SeqCst);
        self.body_text
            .get_or_init(|| String::from_utf8_lossy(&self.body).into_owned())
    }

    /// Body parsed as a JSON document.
    pub fn body_document(&self) -> Result<serde_json::Value> {
        serde_json::from_str(self.body_text())
            .map_err(|e| FakeServiceError::malformed_body("body<json>", e))
    }

    /// Body deserialized into `T`.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(self.body_text()).map_err(|e| {
            FakeServiceError::malformed_body(format!("body<{}>", short_type_name::<T>()), e)
        })
    }

    /// Whether any filter or responder has looked at the body yet.
    pub fn body_was_read(&self) -> bool {
        self.body_read.load(Ordering::SeqCst)
    }

    /// Body text for logging; does not mark the body as read.
    pub(crate) fn body_preview(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn absolute_uri(uri: &Uri, headers: &HeaderMap, fallback_authority: &str) -> Uri {
    if uri.scheme().is_some() && uri.authority().is_some() {
        return uri.clone();
    }

    let authority = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(fallback_authority);
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    Uri::builder()
        .scheme("http")
        .authority(authority)
        .path_and_query(path_and_query)
        .build()
        .unwrap_or_else(|_| uri.clone())
}

/// `type_name` with module paths stripped: `alloc::vec::Vec<app::Order>` becomes `Vec<Order>`.
pub(crate) fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();

    for c in full.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            segment.push(c);
        } else {
            out.push_str(segment.rsplit("::").next().unwrap_or_default());
            segment.clear();
            out.push(c);
        }
    }
    out.push_str(segment.rsplit("::").next().unwrap_or_default());
    out
}
