//! Per-request context and the one-shot body cache.
//!
//! # Responsibilities
//! - Carry everything a handler needs about the inbound request: method,
//!   path, matched pattern, parameters, headers
//! - Materialize the request body at most once and serve every subsequent
//!   access from the cached text
//! - Decode the cached body into typed values through the shared codec
//!
//! # Design Decisions
//! - The body cache is an explicit slot on the request object, not a hidden
//!   attribute bag; the slot is populated on first access and never mutated
//!   afterwards
//! - The transport hand-off sits behind the [`BodySource`] trait so tests
//!   can count how often the underlying read happens

use crate::codec::JsonCodec;
use crate::error::{EmptyBodyError, RouteError};
use axum::http::{HeaderMap, Method, Uri};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::sync::{Mutex, OnceLock};
use uuid::Uuid;

/// Header carrying the per-request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Correlation id generated once per dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One-shot hand-off of the request body from the transport layer.
///
/// `read_body` is called at most once per request, by the first consumer of
/// [`HttpRequest::raw_body`].
pub trait BodySource: Send {
    fn read_body(&mut self) -> io::Result<String>;
}

/// Body text already collected by the runtime.
pub struct CollectedBody(Option<String>);

impl CollectedBody {
    pub fn new(text: impl Into<String>) -> Self {
        Self(Some(text.into()))
    }
}

impl BodySource for CollectedBody {
    fn read_body(&mut self) -> io::Result<String> {
        Ok(self.0.take().unwrap_or_default())
    }
}

/// Memoized raw-body slot.
///
/// Populated at most once per request; an empty read is cached as absent so
/// repeated accessors agree.
pub struct BodySlot {
    source: Mutex<Option<Box<dyn BodySource>>>,
    cache: OnceLock<Option<String>>,
}

impl BodySlot {
    pub fn new(source: Box<dyn BodySource>) -> Self {
        Self {
            source: Mutex::new(Some(source)),
            cache: OnceLock::new(),
        }
    }

    /// Slot for requests that arrived without a body.
    pub fn empty() -> Self {
        Self {
            source: Mutex::new(None),
            cache: OnceLock::new(),
        }
    }

    /// Cached body text; triggers the one-time source read on first call.
    pub fn get(&self) -> Option<&str> {
        self.cache
            .get_or_init(|| {
                let source = self.source.lock().ok().and_then(|mut guard| guard.take());
                match source {
                    Some(mut source) => match source.read_body() {
                        Ok(text) if !text.is_empty() => Some(text),
                        Ok(_) => None,
                        Err(err) => {
                            tracing::warn!(error = %err, "request body read failed");
                            None
                        }
                    },
                    None => None,
                }
            })
            .as_deref()
    }
}

/// Per-request context handed to every route handler and filter.
pub struct HttpRequest {
    id: RequestId,
    method: Method,
    uri: Uri,
    pattern: String,
    path_params: HashMap<String, String>,
    query_params: HashMap<String, String>,
    headers: HeaderMap,
    body: BodySlot,
    codec: JsonCodec,
    received_at: DateTime<Utc>,
}

impl HttpRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: RequestId,
        method: Method,
        uri: Uri,
        pattern: impl Into<String>,
        path_params: HashMap<String, String>,
        query_params: HashMap<String, String>,
        headers: HeaderMap,
        body: BodySlot,
        codec: JsonCodec,
    ) -> Self {
        Self {
            id,
            method,
            uri,
            pattern: pattern.into(),
            path_params,
            query_params,
            headers,
            body,
            codec,
            received_at: Utc::now(),
        }
    }

    /// Builder for constructing requests directly, mainly from tests.
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The registration pattern this request matched, e.g. `/pets/{id}`.
    /// Empty when no registered route matched.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Header value by name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Raw body text, read from the transport at most once and cached.
    pub fn raw_body(&self) -> Option<&str> {
        self.body.get()
    }

    /// Cached body parsed as a JSON tree, if present and well-formed.
    pub fn body_value(&self) -> Option<Value> {
        self.raw_body()
            .and_then(|text| serde_json::from_str(text).ok())
    }

    /// Decode the cached body into `T`.
    ///
    /// Fails with [`EmptyBodyError`] before attempting a decode when the
    /// body is absent or blank.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, RouteError> {
        match self.raw_body() {
            None => Err(EmptyBodyError.into()),
            Some(text) if text.trim().is_empty() => Err(EmptyBodyError.into()),
            Some(text) => self.codec.decode(text).map_err(RouteError::from),
        }
    }
}

/// Fluent constructor for [`HttpRequest`].
pub struct RequestBuilder {
    method: Method,
    uri: Uri,
    pattern: String,
    path_params: HashMap<String, String>,
    query_params: HashMap<String, String>,
    headers: HeaderMap,
    body: Option<BodySlot>,
    codec: JsonCodec,
}

impl RequestBuilder {
    fn new() -> Self {
        Self {
            method: Method::GET,
            uri: Uri::from_static("/"),
            pattern: String::new(),
            path_params: HashMap::new(),
            query_params: HashMap::new(),
            headers: HeaderMap::new(),
            body: None,
            codec: JsonCodec::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(name.into(), value.into());
        self
    }

    pub fn header(mut self, name: axum::http::HeaderName, value: axum::http::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body_text(mut self, text: impl Into<String>) -> Self {
        self.body = Some(BodySlot::new(Box::new(CollectedBody::new(text))));
        self
    }

    pub fn body_source(mut self, source: Box<dyn BodySource>) -> Self {
        self.body = Some(BodySlot::new(source));
        self
    }

    pub fn codec(mut self, codec: JsonCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn build(self) -> HttpRequest {
        HttpRequest::new(
            RequestId(Uuid::new_v4()),
            self.method,
            self.uri,
            self.pattern,
            self.path_params,
            self.query_params,
            self.headers,
            self.body.unwrap_or_else(BodySlot::empty),
            self.codec,
        )
    }
}
