//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Build the runtime router from the registration DSL
//! - Wire up middleware (tracing, timeout)
//! - Dispatch matched requests: authorization, filters, handler, response
//!   transformation, exception mapping
//! - Serve static files with extra headers and cache control
//! - Bind plain or TLS listeners and run until shutdown
//!
//! # Design Decisions
//! - One dispatch entry per unique registered pattern; method and accept
//!   resolution happens inside dispatch so mismatches render as 404 after
//!   the before filters ran
//! - The granted-token set is computed once per request and seeds a fresh
//!   validation context per filter/handler invocation
//! - Handler and filter errors are never recovered inline; they resolve
//!   through the exception registry by kind tag
//! - Error bodies are always JSON regardless of the route transformer

use axum::{
    body::Body,
    extract::{MatchedPath, RawPathParams, State, WebSocketUpgrade},
    http::{header, HeaderName, HeaderValue, Request, StatusCode, Uri},
    response::Response,
    routing::{any, get},
    Router,
};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    services::ServeDir, set_header::SetResponseHeaderLayer, timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::codec::JsonCodec;
use crate::config::{ServerConfig, StaticFilesConfig};
use crate::error::RouteError;
use crate::http::request::{BodySlot, CollectedBody, HttpRequest, RequestId, X_REQUEST_ID};
use crate::http::response::HttpResponse;
use crate::http::{tls, websocket};
use crate::routing::router::Filter;
use crate::routing::AppRouter;
use crate::validation::ValidationContext;

/// Upper bound for buffering a request body.
const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Application state injected into dispatch handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ServerConfig>,
    routes: Arc<AppRouter>,
    codec: JsonCodec,
}

/// The configured server, ready to bind.
pub struct Server {
    config: Arc<ServerConfig>,
    app: Router,
}

impl Server {
    /// Wire the registrations into a runtime router.
    pub fn new(config: ServerConfig, routes: AppRouter) -> Self {
        let config = Arc::new(config);
        let routes = Arc::new(routes);
        let state = AppState {
            config: Arc::clone(&config),
            routes: Arc::clone(&routes),
            codec: JsonCodec::new(),
        };
        let app = Self::build_router(&config, &routes, state);
        Self { config, app }
    }

    fn build_router(config: &ServerConfig, routes: &AppRouter, state: AppState) -> Router {
        let mut app = Router::new();

        for pattern in routes.patterns() {
            app = app.route(&pattern, any(dispatch));
        }

        let ws_idle = config
            .ws_timeout_ms
            .filter(|ms| *ms > 0)
            .map(|ms| Duration::from_millis(ms as u64));
        for (path, factory) in routes.websockets() {
            let factory = Arc::clone(factory);
            app = app.route(
                path,
                get(move |upgrade: WebSocketUpgrade| {
                    let factory = Arc::clone(&factory);
                    async move {
                        upgrade.on_upgrade(move |socket| {
                            websocket::drive(socket, factory.create(), ws_idle)
                        })
                    }
                }),
            );
        }

        app = match &config.static_files {
            Some(files) if files.mount.is_empty() => {
                app.fallback_service(static_router(files))
            }
            Some(files) => app
                .nest_service(&files.mount, static_router(files))
                .fallback(unmatched),
            None => app.fallback(unmatched),
        };

        let mut app = app.with_state(state).layer(TraceLayer::new_for_http());
        if config.idle_timeout_ms >= 0 {
            app = app.layer(TimeoutLayer::new(Duration::from_millis(
                config.idle_timeout_ms as u64,
            )));
        }
        app
    }

    /// The runtime router, for driving the server in-process.
    pub fn into_service(self) -> Router {
        self.app
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve on an already-bound listener until the shutdown signal.
    pub async fn serve(self, listener: TcpListener) -> Result<(), io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "server starting");

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("server stopped");
        Ok(())
    }

    /// Bind per the configuration and block until shutdown.
    ///
    /// Builds its own runtime sized from `max_threads`; use [`Server::serve`]
    /// from an existing runtime.
    pub fn run(self) -> Result<(), io::Error> {
        let workers = self.config.max_threads.max(1) as usize;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(workers)
            .enable_all()
            .build()?;

        runtime.block_on(async move {
            let bind = self.config.bind_address();
            match &self.config.tls {
                Some(tls_config) => {
                    let rustls = tls::load_tls_config(tls_config).await?;
                    let addr: SocketAddr = bind.parse().map_err(|err| {
                        io::Error::new(
                            io::ErrorKind::InvalidInput,
                            format!("invalid bind address {bind}: {err}"),
                        )
                    })?;
                    tracing::info!(address = %addr, "server starting (tls)");
                    axum_server::bind_rustls(addr, rustls)
                        .serve(self.app.into_make_service())
                        .await
                }
                None => {
                    let listener = TcpListener::bind(&bind).await?;
                    self.serve(listener).await
                }
            }
        })
    }
}

/// Static file sub-router with cache control and extra headers.
fn static_router(files: &StaticFilesConfig) -> Router {
    let cache_control = HeaderValue::try_from(format!("max-age={}", files.expire_seconds))
        .unwrap_or(HeaderValue::from_static("max-age=1"));

    let extra: Arc<Vec<(HeaderName, HeaderValue)>> = Arc::new(
        files
            .headers
            .iter()
            .filter_map(|(name, value)| {
                match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
                    (Ok(name), Ok(value)) => Some((name, value)),
                    _ => {
                        tracing::warn!(header = %name, "ignoring invalid static file header");
                        None
                    }
                }
            })
            .collect(),
    );

    Router::new()
        .fallback_service(ServeDir::new(&files.dir))
        .layer(axum::middleware::from_fn(
            move |request: Request<Body>, next: axum::middleware::Next| {
                let extra = Arc::clone(&extra);
                async move {
                    let mut response = next.run(request).await;
                    for (name, value) in extra.iter() {
                        response.headers_mut().insert(name.clone(), value.clone());
                    }
                    response
                }
            },
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            cache_control,
        ))
}

/// Dispatch entry for every registered pattern.
async fn dispatch(
    State(state): State<AppState>,
    matched: MatchedPath,
    params: RawPathParams,
    request: Request<Body>,
) -> Response {
    let pattern = matched.as_str().to_string();
    let path_params: HashMap<String, String> = params
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let request = into_context(&state, request, pattern, path_params).await;
    let span = tracing::info_span!(
        "request",
        request_id = %request.id(),
        method = %request.method(),
        path = request.path(),
    );
    dispatch_core(&state, &request).instrument(span).await
}

/// Fallback for paths with no registered pattern. Before filters still run;
/// an error from one of them resolves through the exception registry.
async fn unmatched(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request = into_context(&state, request, String::new(), HashMap::new()).await;
    let span = tracing::info_span!(
        "request",
        request_id = %request.id(),
        method = %request.method(),
        path = request.path(),
    );
    async {
        let granted = granted_tokens(&state, &request);
        let mut response = HttpResponse::new();
        if let Err(err) = run_filters(
            state.routes.before_filters(),
            &granted,
            &request,
            &mut response,
        ) {
            return render_error(&state, err, &request, response);
        }
        not_found(&request)
    }
    .instrument(span)
    .await
}

/// Build the per-request context, buffering the body for the cache slot.
async fn into_context(
    state: &AppState,
    request: Request<Body>,
    pattern: String,
    path_params: HashMap<String, String>,
) -> HttpRequest {
    let (parts, body) = request.into_parts();

    let id = parts
        .headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Uuid>().ok())
        .map(RequestId)
        .unwrap_or_else(|| RequestId(Uuid::new_v4()));

    let query_params = parse_query(&parts.uri);

    let slot = match axum::body::to_bytes(body, BODY_LIMIT).await {
        Ok(bytes) if bytes.is_empty() => BodySlot::empty(),
        Ok(bytes) => match String::from_utf8(bytes.to_vec()) {
            Ok(text) => BodySlot::new(Box::new(CollectedBody::new(text))),
            Err(_) => {
                tracing::debug!("request body is not valid UTF-8, treated as absent");
                BodySlot::empty()
            }
        },
        Err(err) => {
            tracing::warn!(error = %err, "request body collection failed");
            BodySlot::empty()
        }
    };

    HttpRequest::new(
        id,
        parts.method,
        parts.uri,
        pattern,
        path_params,
        query_params,
        parts.headers,
        slot,
        state.codec,
    )
}

fn parse_query(uri: &Uri) -> HashMap<String, String> {
    uri.query()
        .map(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}

fn granted_tokens(state: &AppState, request: &HttpRequest) -> HashSet<String> {
    state
        .config
        .authorization
        .as_ref()
        .map(|manager| manager.granted_tokens(request))
        .unwrap_or_default()
}

/// Run every applicable filter, each with a fresh validation context.
/// Rejections recorded on the context abort the pass even when the filter
/// itself returns `Ok`.
fn run_filters(
    filters: &[Filter],
    granted: &HashSet<String>,
    request: &HttpRequest,
    response: &mut HttpResponse,
) -> Result<(), RouteError> {
    for filter in filters.iter().filter(|f| f.applies_to(request)) {
        let mut ctx = ValidationContext::new(granted.clone());
        (filter.filter)(&mut ctx, request, response)?;
        raise_rejections(ctx)?;
    }
    Ok(())
}

/// Promote rejections accumulated on a finished context into the error that
/// resolves through the exception registry.
fn raise_rejections(ctx: ValidationContext) -> Result<(), RouteError> {
    ctx.into_result().map_err(RouteError::from)
}

async fn dispatch_core(state: &AppState, request: &HttpRequest) -> Response {
    let granted = granted_tokens(state, request);
    let mut response = HttpResponse::new();

    if let Err(err) = run_filters(
        state.routes.before_filters(),
        &granted,
        request,
        &mut response,
    ) {
        return render_error(state, err, request, response);
    }

    let route = match state.routes.find_route(
        request.method(),
        request.pattern(),
        request.header("accept"),
    ) {
        Some(route) => route,
        None => {
            tracing::debug!("no registration fits method and accept");
            return not_found(request);
        }
    };

    let mut ctx = ValidationContext::new(granted.clone());
    let result = (route.handler())(&mut ctx, request, &mut response);

    let value = match result {
        Ok(value) => value,
        Err(err) => return render_error(state, err, request, response),
    };

    // rejections recorded on the handler context abort the dispatch even
    // when the handler returned a value
    if let Err(err) = raise_rejections(ctx) {
        return render_error(state, err, request, response);
    }

    if let Err(err) = run_filters(
        state.routes.after_filters(),
        &granted,
        request,
        &mut response,
    ) {
        return render_error(state, err, request, response);
    }

    let transformer = route
        .transformer()
        .unwrap_or(&state.config.transformer)
        .as_ref();
    let body = match transformer.render(value.as_ref()) {
        Ok(body) => body,
        Err(err) => return render_error(state, err, request, response),
    };
    let content_type = transformer.content_type().to_string();

    finalize(response, body, &content_type, request.id())
}

/// Resolve an error through the exception registry and render its body.
fn render_error(
    state: &AppState,
    err: RouteError,
    request: &HttpRequest,
    mut response: HttpResponse,
) -> Response {
    tracing::debug!(kind = err.kind(), error = %err, "dispatch failed");
    let handler = state.routes.exception_for(err.kind());
    let (status, body) = handler(&err, request, &mut response);
    response.set_status(status);
    let body = body.map(|value| value.to_string()).unwrap_or_default();
    finalize(response, body, "application/json", request.id())
}

fn not_found(request: &HttpRequest) -> Response {
    let mut response = HttpResponse::new();
    response.set_status(StatusCode::NOT_FOUND);
    let body = json!({ "error": "not found" }).to_string();
    finalize(response, body, "application/json", request.id())
}

fn finalize(response: HttpResponse, body: String, content_type: &str, id: RequestId) -> Response {
    let (status, headers) = response.into_parts();
    let has_body = !body.is_empty();

    let mut out = Response::new(Body::from(body));
    *out.status_mut() = status;
    out.headers_mut().extend(headers);
    if has_body && !out.headers().contains_key(header::CONTENT_TYPE) {
        if let Ok(value) = HeaderValue::try_from(content_type) {
            out.headers_mut().insert(header::CONTENT_TYPE, value);
        }
    }
    if let Ok(value) = HeaderValue::try_from(id.to_string()) {
        out.headers_mut().insert(X_REQUEST_ID, value);
    }
    out
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("shutdown signal received");
}
