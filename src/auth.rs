//! Authorization classification.
//!
//! # Responsibilities
//! - Classify an inbound request into the set of authorization tokens it has
//!   been granted
//! - Export the convention tokens shared between managers and checks
//!
//! # Design Decisions
//! - Classification is pure: the manager inspects the request (headers,
//!   parameters) and returns a token set without performing I/O here
//! - An empty set means no access; every check fails closed against it

use crate::http::request::HttpRequest;
use std::collections::HashSet;

/// Granted to any request whose caller was identified.
pub const AUTHENTICATED: &str = "AUTHENTICATED";

/// Granted to requests with no identified caller.
pub const ANONYMOUS: &str = "ANONYMOUS";

/// Maps a request to the authorization tokens it holds.
///
/// Configured once on the server config and consulted exactly once per
/// dispatch; the resulting set seeds the request's validation context.
pub trait AuthorizationManager: Send + Sync {
    fn granted_tokens(&self, request: &HttpRequest) -> HashSet<String>;
}

/// Grants nothing. Used when no manager is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl AuthorizationManager for DenyAll {
    fn granted_tokens(&self, _request: &HttpRequest) -> HashSet<String> {
        HashSet::new()
    }
}

impl<F> AuthorizationManager for F
where
    F: Fn(&HttpRequest) -> HashSet<String> + Send + Sync,
{
    fn granted_tokens(&self, request: &HttpRequest) -> HashSet<String> {
        self(request)
    }
}
