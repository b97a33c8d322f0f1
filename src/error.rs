//! Error taxonomy and the kind-tagged error carrier.
//!
//! # Responsibilities
//! - Define the structured failures a handler or filter can raise
//! - Carry every failure through dispatch as a [`RouteError`] tagged with an
//!   explicit kind discriminant
//! - Feed the exception registry, which maps kinds to response handlers
//!
//! # Design Decisions
//! - Kinds are plain `&'static str` tags, not runtime type lookups; matching
//!   is an exact map lookup with an explicit fallback entry
//! - Errors are never recovered inside a handler; they propagate to the
//!   registry registered on the application router

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Raised when a typed body decode is attempted but no body text is available.
#[derive(Debug, Clone, Copy, Error)]
#[error("no request body available to decode")]
pub struct EmptyBodyError;

impl EmptyBodyError {
    /// Kind tag used for exception-registry lookup.
    pub const KIND: &'static str = "empty_body";
}

/// Raised when body text does not conform to the requested target shape.
#[derive(Debug, Error)]
#[error("cannot decode body into `{target}`: {source}")]
pub struct DeserializationError {
    /// The offending input text.
    pub text: String,
    /// Name of the target type the decode was attempted against.
    pub target: &'static str,
    #[source]
    pub source: serde_json::Error,
}

impl DeserializationError {
    pub const KIND: &'static str = "deserialization";
}

/// One failed validation or authorization check.
///
/// `path` attributes the rejection: a field path for shape checks, a token
/// name for authorization checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub reason: String,
    pub path: String,
}

impl Rejection {
    pub fn new(reason: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            path: path.into(),
        }
    }
}

/// Accumulated rejections from a validation pass.
#[derive(Debug, Error)]
#[error("validation failed with {} rejection(s)", rejections.len())]
pub struct ValidationError {
    pub rejections: Vec<Rejection>,
}

impl ValidationError {
    pub const KIND: &'static str = "validation";
}

/// Rejections produced specifically by failed authorization checks.
///
/// `all` records which semantics produced the failure: `true` when every
/// listed token was required, `false` when any one of them would have done.
#[derive(Debug, Error)]
#[error("not authorized: {} token check failed with {} rejection(s)", if *all { "all-of" } else { "any-of" }, rejections.len())]
pub struct NotAuthorizedError {
    pub rejections: Vec<Rejection>,
    pub all: bool,
}

impl NotAuthorizedError {
    pub const KIND: &'static str = "not_authorized";
}

/// Uniform error carrier flowing out of route handlers and filters.
///
/// Every error is tagged with a `kind` used by the exception registry;
/// applications introduce their own kinds via [`RouteError::custom`].
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct RouteError {
    kind: &'static str,
    message: String,
    detail: Option<Value>,
}

impl RouteError {
    /// Build an application-defined error with its own registry kind.
    pub fn custom(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    /// Attach a structured detail payload, surfaced by the default
    /// exception handlers.
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&Value> {
        self.detail.as_ref()
    }

    /// Default JSON body for this error, used by the built-in exception
    /// handlers.
    pub fn body(&self) -> Value {
        match &self.detail {
            Some(detail) => json!({ "error": self.message, "detail": detail }),
            None => json!({ "error": self.message }),
        }
    }
}

impl From<EmptyBodyError> for RouteError {
    fn from(err: EmptyBodyError) -> Self {
        Self {
            kind: EmptyBodyError::KIND,
            message: err.to_string(),
            detail: None,
        }
    }
}

impl From<DeserializationError> for RouteError {
    fn from(err: DeserializationError) -> Self {
        let detail = json!({ "target": err.target, "input": err.text });
        Self {
            kind: DeserializationError::KIND,
            message: err.to_string(),
            detail: Some(detail),
        }
    }
}

impl From<ValidationError> for RouteError {
    fn from(err: ValidationError) -> Self {
        let detail = json!({ "rejections": err.rejections });
        Self {
            kind: ValidationError::KIND,
            message: err.to_string(),
            detail: Some(detail),
        }
    }
}

impl From<NotAuthorizedError> for RouteError {
    fn from(err: NotAuthorizedError) -> Self {
        let detail = json!({ "all": err.all, "rejections": err.rejections });
        Self {
            kind: NotAuthorizedError::KIND,
            message: err.to_string(),
            detail: Some(detail),
        }
    }
}
