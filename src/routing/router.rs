//! Route registration DSL.
//!
//! # Responsibilities
//! - Collect route, filter, exception and WebSocket registrations
//! - Resolve an incoming (method, pattern, accept) to its handler
//! - Map error kinds to response handlers with an explicit fallback
//!
//! # Design Decisions
//! - Registrations are collected at startup and frozen when the server is
//!   built; lookup structures are immutable at runtime
//! - Exception dispatch is an exact map lookup on the error's kind tag,
//!   never a type-hierarchy walk; unregistered kinds hit the fallback
//! - First matching route wins (registration order)

use crate::error::{
    DeserializationError, EmptyBodyError, NotAuthorizedError, RouteError, ValidationError,
};
use crate::http::request::HttpRequest;
use crate::http::response::{HttpResponse, ResponseTransformer};
use crate::http::websocket::WebSocketFactory;
use crate::routing::matcher::{AcceptMatcher, Matcher, PathPatternMatcher};
use crate::validation::ValidationContext;
use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// What a route handler produces: `None` renders as an empty body,
/// `Some(value)` goes through the response transformer.
pub type HandlerResult = Result<Option<Value>, RouteError>;

/// Route handler signature.
pub type RouteHandler =
    dyn Fn(&mut ValidationContext, &HttpRequest, &mut HttpResponse) -> HandlerResult + Send + Sync;

/// Cross-cutting filter signature; errors short-circuit to the exception
/// registry.
pub type FilterFn = dyn Fn(&mut ValidationContext, &HttpRequest, &mut HttpResponse) -> Result<(), RouteError>
    + Send
    + Sync;

/// Exception handler: decides status and body for a failed dispatch.
pub type ExceptionHandler =
    dyn Fn(&RouteError, &HttpRequest, &mut HttpResponse) -> (StatusCode, Option<Value>)
        + Send
        + Sync;

/// Per-route registration options.
#[derive(Clone, Default)]
pub struct RouteOptions {
    accept: Option<String>,
    transformer: Option<Arc<dyn ResponseTransformer>>,
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the route to requests whose Accept header is compatible
    /// with `accept`. Default is `*/*`.
    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    /// Override the server-wide response transformer for this route.
    pub fn transformer(mut self, transformer: Arc<dyn ResponseTransformer>) -> Self {
        self.transformer = Some(transformer);
        self
    }
}

/// One registered route.
pub struct Route {
    pub(crate) method: Method,
    pub(crate) pattern: String,
    pub(crate) accept: AcceptMatcher,
    pub(crate) transformer: Option<Arc<dyn ResponseTransformer>>,
    pub(crate) handler: Arc<RouteHandler>,
}

impl Route {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn transformer(&self) -> Option<&Arc<dyn ResponseTransformer>> {
        self.transformer.as_ref()
    }

    pub fn handler(&self) -> &Arc<RouteHandler> {
        &self.handler
    }
}

/// One registered before/after filter.
pub struct Filter {
    path: PathPatternMatcher,
    accept: AcceptMatcher,
    pub(crate) filter: Arc<FilterFn>,
}

impl Filter {
    pub(crate) fn applies_to(&self, request: &HttpRequest) -> bool {
        self.path.matches(request) && self.accept.matches(request)
    }
}

/// Registration surface for routes, filters, exceptions and WebSockets.
pub struct AppRouter {
    routes: Vec<Route>,
    before: Vec<Filter>,
    after: Vec<Filter>,
    exceptions: HashMap<&'static str, Arc<ExceptionHandler>>,
    fallback: Arc<ExceptionHandler>,
    websockets: Vec<(String, Arc<dyn WebSocketFactory>)>,
}

impl Default for AppRouter {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! verb {
    ($name:ident, $method:expr) => {
        pub fn $name<H>(self, path: impl Into<String>, handler: H) -> Self
        where
            H: Fn(&mut ValidationContext, &HttpRequest, &mut HttpResponse) -> HandlerResult
                + Send
                + Sync
                + 'static,
        {
            self.route($method, path, RouteOptions::new(), handler)
        }
    };
}

impl AppRouter {
    pub fn new() -> Self {
        let mut router = Self {
            routes: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
            exceptions: HashMap::new(),
            fallback: Arc::new(|_err, _req, _res| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Some(json!({ "error": "internal server error" })),
                )
            }),
            websockets: Vec::new(),
        };

        router = router.exception(NotAuthorizedError::KIND, |err, _req, _res| {
            (StatusCode::UNAUTHORIZED, Some(err.body()))
        });
        for kind in [
            ValidationError::KIND,
            EmptyBodyError::KIND,
            DeserializationError::KIND,
        ] {
            router = router.exception(kind, |err, _req, _res| {
                (StatusCode::BAD_REQUEST, Some(err.body()))
            });
        }
        router
    }

    verb!(get, Method::GET);
    verb!(post, Method::POST);
    verb!(put, Method::PUT);
    verb!(patch, Method::PATCH);
    verb!(delete, Method::DELETE);
    verb!(head, Method::HEAD);
    verb!(trace, Method::TRACE);
    verb!(connect, Method::CONNECT);
    verb!(options, Method::OPTIONS);

    /// Register a route with explicit options.
    pub fn route<H>(
        mut self,
        method: Method,
        path: impl Into<String>,
        options: RouteOptions,
        handler: H,
    ) -> Self
    where
        H: Fn(&mut ValidationContext, &HttpRequest, &mut HttpResponse) -> HandlerResult
            + Send
            + Sync
            + 'static,
    {
        self.routes.push(Route {
            method,
            pattern: path.into(),
            accept: AcceptMatcher::new(options.accept.as_deref().unwrap_or("*/*")),
            transformer: options.transformer,
            handler: Arc::new(handler),
        });
        self
    }

    /// Register a filter running before every matched and unmatched route.
    pub fn before<F>(self, filter: F) -> Self
    where
        F: Fn(&mut ValidationContext, &HttpRequest, &mut HttpResponse) -> Result<(), RouteError>
            + Send
            + Sync
            + 'static,
    {
        self.before_matching("", "*/*", filter)
    }

    /// Register a before filter limited to a path pattern and accept type.
    pub fn before_matching<F>(
        mut self,
        pattern: impl Into<String>,
        accept: impl Into<String>,
        filter: F,
    ) -> Self
    where
        F: Fn(&mut ValidationContext, &HttpRequest, &mut HttpResponse) -> Result<(), RouteError>
            + Send
            + Sync
            + 'static,
    {
        self.before.push(Filter {
            path: PathPatternMatcher::new(pattern),
            accept: AcceptMatcher::new(accept),
            filter: Arc::new(filter),
        });
        self
    }

    /// Register a filter running after the handler on successful dispatch.
    pub fn after<F>(self, filter: F) -> Self
    where
        F: Fn(&mut ValidationContext, &HttpRequest, &mut HttpResponse) -> Result<(), RouteError>
            + Send
            + Sync
            + 'static,
    {
        self.after_matching("", "*/*", filter)
    }

    /// Register an after filter limited to a path pattern and accept type.
    pub fn after_matching<F>(
        mut self,
        pattern: impl Into<String>,
        accept: impl Into<String>,
        filter: F,
    ) -> Self
    where
        F: Fn(&mut ValidationContext, &HttpRequest, &mut HttpResponse) -> Result<(), RouteError>
            + Send
            + Sync
            + 'static,
    {
        self.after.push(Filter {
            path: PathPatternMatcher::new(pattern),
            accept: AcceptMatcher::new(accept),
            filter: Arc::new(filter),
        });
        self
    }

    /// Map an error kind to a response handler, replacing any earlier
    /// registration for the same kind (built-ins included).
    pub fn exception<F>(mut self, kind: &'static str, handler: F) -> Self
    where
        F: Fn(&RouteError, &HttpRequest, &mut HttpResponse) -> (StatusCode, Option<Value>)
            + Send
            + Sync
            + 'static,
    {
        self.exceptions.insert(kind, Arc::new(handler));
        self
    }

    /// Replace the fallback handler used for unregistered kinds.
    pub fn exception_fallback<F>(mut self, handler: F) -> Self
    where
        F: Fn(&RouteError, &HttpRequest, &mut HttpResponse) -> (StatusCode, Option<Value>)
            + Send
            + Sync
            + 'static,
    {
        self.fallback = Arc::new(handler);
        self
    }

    /// Bind a path to a WebSocket handler factory.
    pub fn web_socket<F>(mut self, path: impl Into<String>, factory: F) -> Self
    where
        F: WebSocketFactory + 'static,
    {
        self.websockets.push((path.into(), Arc::new(factory)));
        self
    }

    /// Unique registered route patterns, in registration order.
    pub(crate) fn patterns(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for route in &self.routes {
            if !seen.contains(&route.pattern) {
                seen.push(route.pattern.clone());
            }
        }
        seen
    }

    /// Resolve the route for a matched pattern; first registration whose
    /// method and accept filter fit wins.
    pub(crate) fn find_route(
        &self,
        method: &Method,
        pattern: &str,
        accept: Option<&str>,
    ) -> Option<&Route> {
        self.routes.iter().find(|route| {
            route.method == *method
                && route.pattern == pattern
                && route.accept.matches_accept(accept)
        })
    }

    pub(crate) fn before_filters(&self) -> &[Filter] {
        &self.before
    }

    pub(crate) fn after_filters(&self) -> &[Filter] {
        &self.after
    }

    /// Handler for an error kind; unregistered kinds get the fallback.
    pub(crate) fn exception_for(&self, kind: &str) -> &Arc<ExceptionHandler> {
        self.exceptions.get(kind).unwrap_or(&self.fallback)
    }

    pub(crate) fn websockets(&self) -> &[(String, Arc<dyn WebSocketFactory>)] {
        &self.websockets
    }
}
