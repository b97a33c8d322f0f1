//! Response context and result transformation.
//!
//! # Responsibilities
//! - Let handlers and filters set status and headers before the body exists
//! - Render handler results into body text through a pluggable transformer
//!
//! # Design Decisions
//! - The response object carries intent (status, headers), not bytes; the
//!   dispatch layer renders the body last and sets the content type only
//!   when a body is present
//! - The default transformer is JSON; a route can override it via its
//!   registration options

use crate::codec::JsonCodec;
use crate::error::RouteError;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde_json::Value;

/// Mutable response state handed to handlers and filters.
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpResponse {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Set a response header; invalid names or values are ignored with a
    /// warning rather than failing the request.
    pub fn set_header(&mut self, name: &str, value: &str) {
        match (
            HeaderName::try_from(name),
            HeaderValue::try_from(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => {
                tracing::warn!(header = name, "ignoring invalid response header");
            }
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub(crate) fn into_parts(self) -> (StatusCode, HeaderMap) {
        (self.status, self.headers)
    }
}

/// Renders a handler result into response body text.
pub trait ResponseTransformer: Send + Sync {
    /// Content type set on responses whose rendered body is non-empty.
    fn content_type(&self) -> &str;

    /// Render the handler result. `None` means the handler produced no
    /// value; the conventional rendering is an empty body.
    fn render(&self, value: Option<&Value>) -> Result<String, RouteError>;
}

/// Default transformer: JSON bodies through the shared codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTransformer {
    codec: JsonCodec,
}

impl JsonTransformer {
    pub fn new() -> Self {
        Self {
            codec: JsonCodec::new(),
        }
    }
}

impl ResponseTransformer for JsonTransformer {
    fn content_type(&self) -> &str {
        "application/json"
    }

    fn render(&self, value: Option<&Value>) -> Result<String, RouteError> {
        match value {
            None => Ok(String::new()),
            Some(value) => self
                .codec
                .encode(value)
                .map_err(|err| RouteError::custom("encoding", err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn none_renders_to_empty_body() {
        let body = JsonTransformer::new().render(None).unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn values_render_as_json() {
        let body = JsonTransformer::new()
            .render(Some(&json!({ "name": "Fluffy" })))
            .unwrap();
        assert_eq!(body, r#"{"name":"Fluffy"}"#);
    }

    #[test]
    fn invalid_header_names_are_dropped() {
        let mut response = HttpResponse::new();
        response.set_header("bad header", "x");
        assert!(response.headers().is_empty());
        response.set_header("x-extra", "1");
        assert_eq!(response.header("x-extra"), Some("1"));
    }
}
