//! Per-request validation and authorization checks.
//!
//! # Responsibilities
//! - Hold the granted-token set computed once per request
//! - Run all-of / any-of token checks with full rejection accumulation
//! - Collect shape rejections with path attribution for nested values
//!
//! # Design Decisions
//! - The context is a plain struct built fresh per invocation, never shared
//!   across requests
//! - Token checks accumulate every failing token before raising, so one
//!   response reports the complete shortfall
//! - Nested attribution grows the path only for the duration of the closure

use crate::error::{NotAuthorizedError, Rejection, ValidationError};
use serde_json::Value;
use std::collections::HashSet;

/// Mutable check state for a single handler or filter invocation.
pub struct ValidationContext {
    granted: HashSet<String>,
    src: Option<Value>,
    path: String,
    rejections: Vec<Rejection>,
}

impl ValidationContext {
    pub fn new(granted: HashSet<String>) -> Self {
        Self {
            granted,
            src: None,
            path: String::new(),
            rejections: Vec::new(),
        }
    }

    /// Attach the source value rejections are checked against, usually the
    /// decoded request body.
    pub fn with_source(mut self, src: Value) -> Self {
        self.src = Some(src);
        self
    }

    /// Attach the source value to an already-threaded context.
    pub fn set_source(&mut self, src: Value) {
        self.src = Some(src);
    }

    pub fn granted(&self) -> &HashSet<String> {
        &self.granted
    }

    pub fn is_granted(&self, token: &str) -> bool {
        self.granted.contains(token)
    }

    pub fn source(&self) -> Option<&Value> {
        self.src.as_ref()
    }

    pub fn rejections(&self) -> &[Rejection] {
        &self.rejections
    }

    /// Every listed token must be granted.
    ///
    /// On failure, one rejection per missing token is recorded and the
    /// error raised carries all of them with `all = true`.
    pub fn check_all<I, S>(&mut self, tokens: I) -> Result<(), NotAuthorizedError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut missing = Vec::new();
        for token in tokens {
            let token = token.as_ref();
            if !self.granted.contains(token) {
                missing.push(Rejection::new("required authorization not granted", token));
            }
        }
        if missing.is_empty() {
            return Ok(());
        }
        self.rejections.extend(missing.iter().cloned());
        Err(NotAuthorizedError {
            rejections: missing,
            all: true,
        })
    }

    /// At least one listed token must be granted.
    ///
    /// On failure, the error carries a rejection per listed token and
    /// `all = false`.
    pub fn check_any<I, S>(&mut self, tokens: I) -> Result<(), NotAuthorizedError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(|t| t.as_ref().to_string()).collect();
        if tokens.iter().any(|token| self.granted.contains(token)) {
            return Ok(());
        }
        let listed: Vec<Rejection> = tokens
            .iter()
            .map(|token| Rejection::new("no listed authorization granted", token))
            .collect();
        self.rejections.extend(listed.iter().cloned());
        Err(NotAuthorizedError {
            rejections: listed,
            all: false,
        })
    }

    /// Record a rejection attributed to the current path.
    pub fn reject(&mut self, reason: impl Into<String>) {
        self.rejections
            .push(Rejection::new(reason, self.path.clone()));
    }

    /// Record a rejection attributed to a field under the current path.
    pub fn reject_field(&mut self, field: &str, reason: impl Into<String>) {
        self.rejections
            .push(Rejection::new(reason, self.joined(field)));
    }

    /// Require a non-null field on the source value; returns it when present.
    pub fn require(&mut self, field: &str) -> Option<Value> {
        let value = self
            .src
            .as_ref()
            .and_then(|src| src.get(field))
            .filter(|v| !v.is_null())
            .cloned();
        if value.is_none() {
            self.reject_field(field, "required value missing");
        }
        value
    }

    /// Run checks against a nested field; rejections recorded inside the
    /// closure are attributed under `field`.
    pub fn nested<F>(&mut self, field: &str, f: F)
    where
        F: FnOnce(&mut ValidationContext),
    {
        let src = self.src.as_ref().and_then(|src| src.get(field)).cloned();
        let mut child = ValidationContext {
            granted: self.granted.clone(),
            src,
            path: self.joined(field),
            rejections: Vec::new(),
        };
        f(&mut child);
        self.rejections.extend(child.rejections);
    }

    /// Finish the pass: `Ok` when nothing was rejected, otherwise a
    /// [`ValidationError`] carrying every accumulated rejection.
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.rejections.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                rejections: self.rejections,
            })
        }
    }

    fn joined(&self, field: &str) -> String {
        if self.path.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", self.path, field)
        }
    }
}
