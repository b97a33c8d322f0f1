//! Shared utilities for integration testing.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use ember::config::ServerConfig;
use ember::http::Server;
use ember::routing::AppRouter;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

/// Build the runtime router from a config and registrations, as the server
/// would, without binding a socket.
pub fn service(config: ServerConfig, routes: AppRouter) -> Router {
    Server::new(config, routes).into_service()
}

/// Drive one request through the router.
pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

/// Build a simple request with an optional body.
pub fn request(method: &str, uri: &str, body: Option<&str>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Collect a response body as text.
#[allow(dead_code)]
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Collect a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}
