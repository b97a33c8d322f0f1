//! Filter matching logic.
//!
//! # Responsibilities
//! - Match request paths against segment patterns with `{param}` and a
//!   trailing `*` wildcard
//! - Match the request Accept header against a route's accepted type
//!
//! # Design Decisions
//! - `{param}` matches exactly one non-empty segment
//! - A trailing `*` segment matches any remainder, including nothing
//! - Empty pattern = always matches (wildcard)
//! - An absent Accept header counts as `*/*`
//! - No regex to guarantee O(n) matching

use crate::http::request::HttpRequest;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync {
    /// Returns true if the request matches this condition.
    fn matches(&self, request: &HttpRequest) -> bool;
}

/// Matches the request path against a segment pattern.
#[derive(Debug, Clone)]
pub struct PathPatternMatcher {
    pattern: String,
}

impl PathPatternMatcher {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    pub fn matches_path(&self, path: &str) -> bool {
        if self.pattern.is_empty() {
            return true;
        }
        let mut pattern = self.pattern.split('/').filter(|s| !s.is_empty());
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        loop {
            match (pattern.next(), segments.next()) {
                (Some("*"), _) => return true,
                (Some(p), Some(s)) => {
                    let is_param = p.starts_with('{') && p.ends_with('}');
                    if !is_param && p != s {
                        return false;
                    }
                }
                (Some(_), None) => return false,
                (None, Some(_)) => return false,
                (None, None) => return true,
            }
        }
    }
}

impl Matcher for PathPatternMatcher {
    fn matches(&self, request: &HttpRequest) -> bool {
        self.matches_path(request.path())
    }
}

/// Matches the request Accept header against an accepted content type.
#[derive(Debug, Clone)]
pub struct AcceptMatcher {
    accepted: String,
}

impl AcceptMatcher {
    pub fn new(accepted: impl Into<String>) -> Self {
        Self {
            accepted: accepted.into().to_lowercase(),
        }
    }

    pub fn matches_accept(&self, accept: Option<&str>) -> bool {
        if self.accepted == "*/*" {
            return true;
        }
        let accept = accept.unwrap_or("*/*").to_lowercase();
        accept.split(',').any(|entry| {
            let media = entry.split(';').next().unwrap_or("").trim();
            if media == "*/*" || media == self.accepted {
                return true;
            }
            match (media.split_once('/'), self.accepted.split_once('/')) {
                (Some((req_type, "*")), Some((acc_type, _))) => req_type == acc_type,
                _ => false,
            }
        })
    }
}

impl Matcher for AcceptMatcher {
    fn matches(&self, request: &HttpRequest) -> bool {
        self.matches_accept(request.header("accept"))
    }
}
