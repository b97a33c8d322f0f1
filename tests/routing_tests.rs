//! Route registration and dispatch behavior.

mod common;

use axum::http::StatusCode;
use common::{body_json, body_text, request, send, service};
use ember::config::ServerConfig;
use ember::error::RouteError;
use ember::http::{HttpRequest, HttpResponse, ResponseTransformer};
use ember::routing::{AppRouter, RouteOptions};
use ember::validation::ValidationContext;
use serde_json::{json, Value};
use std::sync::Arc;

#[tokio::test]
async fn matched_route_renders_json() {
    let routes = AppRouter::new().get("/pets", |_ctx: &mut ValidationContext, _req: &HttpRequest, _res: &mut HttpResponse| {
        Ok(Some(json!([{ "name": "Fluffy" }])))
    });
    let app = service(ServerConfig::default(), routes);

    let response = send(app, request("GET", "/pets", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(body_json(response).await, json!([{ "name": "Fluffy" }]));
}

#[tokio::test]
async fn none_result_renders_empty_body() {
    let routes = AppRouter::new().delete("/pets/{id}", |_ctx: &mut ValidationContext, _req: &HttpRequest, _res: &mut HttpResponse| Ok(None));
    let app = service(ServerConfig::default(), routes);

    let response = send(app, request("DELETE", "/pets/42", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("content-type"));
    assert!(body_text(response).await.is_empty());
}

#[tokio::test]
async fn unknown_path_is_404() {
    let routes = AppRouter::new().get("/pets", |_ctx: &mut ValidationContext, _req: &HttpRequest, _res: &mut HttpResponse| Ok(None));
    let app = service(ServerConfig::default(), routes);

    let response = send(app, request("GET", "/owners", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], json!("not found"));
}

#[tokio::test]
async fn method_mismatch_is_404() {
    let routes = AppRouter::new().get("/pets", |_ctx: &mut ValidationContext, _req: &HttpRequest, _res: &mut HttpResponse| Ok(None));
    let app = service(ServerConfig::default(), routes);

    let response = send(app, request("POST", "/pets", Some("{}"))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn accept_filter_selects_registration() {
    let routes = AppRouter::new()
        .route(
            axum::http::Method::GET,
            "/report",
            RouteOptions::new().accept("application/json"),
            |_ctx: &mut ValidationContext, _req: &HttpRequest, _res: &mut HttpResponse| {
                Ok(Some(json!({ "format": "json" })))
            },
        );
    let app = service(ServerConfig::default(), routes);

    let hit = axum::http::Request::builder()
        .method("GET")
        .uri("/report")
        .header("accept", "application/json")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = send(app.clone(), hit).await;
    assert_eq!(response.status(), StatusCode::OK);

    let miss = axum::http::Request::builder()
        .method("GET")
        .uri("/report")
        .header("accept", "image/png")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = send(app, miss).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn path_and_query_params_reach_the_handler() {
    let routes = AppRouter::new().get("/pets/{id}", |_ctx: &mut ValidationContext, req: &HttpRequest, _res: &mut HttpResponse| {
        Ok(Some(json!({
            "id": req.path_param("id"),
            "expand": req.query_param("expand"),
        })))
    });
    let app = service(ServerConfig::default(), routes);

    let response = send(app, request("GET", "/pets/42?expand=owner", None)).await;
    let body = body_json(response).await;
    assert_eq!(body["id"], json!("42"));
    assert_eq!(body["expand"], json!("owner"));
}

struct CsvTransformer;

impl ResponseTransformer for CsvTransformer {
    fn content_type(&self) -> &str {
        "text/csv"
    }

    fn render(&self, value: Option<&Value>) -> Result<String, RouteError> {
        let rows = match value.and_then(Value::as_array) {
            Some(rows) => rows,
            None => return Ok(String::new()),
        };
        Ok(rows
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(","))
    }
}

#[tokio::test]
async fn per_route_transformer_overrides_default() {
    let routes = AppRouter::new().route(
        axum::http::Method::GET,
        "/export",
        RouteOptions::new().transformer(Arc::new(CsvTransformer)),
        |_ctx: &mut ValidationContext, _req: &HttpRequest, _res: &mut HttpResponse| {
            Ok(Some(json!(["a", "b", "c"])))
        },
    );
    let app = service(ServerConfig::default(), routes);

    let response = send(app, request("GET", "/export", None)).await;
    assert_eq!(response.headers().get("content-type").unwrap(), "text/csv");
    assert_eq!(body_text(response).await, "a,b,c");
}

#[tokio::test]
async fn before_filter_error_short_circuits() {
    let routes = AppRouter::new()
        .before_matching("/pets/*", "*/*", |_ctx: &mut ValidationContext, _req: &HttpRequest, _res: &mut HttpResponse| {
            Err(RouteError::custom("maintenance", "down for maintenance"))
        })
        .exception("maintenance", |err, _req, _res| {
            (StatusCode::SERVICE_UNAVAILABLE, Some(err.body()))
        })
        .get("/pets", |_ctx: &mut ValidationContext, _req: &HttpRequest, _res: &mut HttpResponse| {
            panic!("handler must not run")
        });
    let app = service(ServerConfig::default(), routes);

    let response = send(app, request("GET", "/pets/1", None)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body_json(response).await["error"],
        json!("maintenance: down for maintenance")
    );
}

#[tokio::test]
async fn before_filters_run_for_unmatched_paths() {
    let routes = AppRouter::new()
        .before(|_ctx: &mut ValidationContext, _req: &HttpRequest, _res: &mut HttpResponse| {
            Err(RouteError::custom("blocked", "nope"))
        })
        .exception("blocked", |_err, _req, _res| (StatusCode::FORBIDDEN, None));
    let app = service(ServerConfig::default(), routes);

    let response = send(app, request("GET", "/anything", None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn after_filter_decorates_the_response() {
    let routes = AppRouter::new()
        .get("/pets", |_ctx: &mut ValidationContext, _req: &HttpRequest, _res: &mut HttpResponse| Ok(None))
        .after(|_ctx: &mut ValidationContext, _req: &HttpRequest, res: &mut HttpResponse| {
            res.set_header("x-served-by", "ember");
            Ok(())
        });
    let app = service(ServerConfig::default(), routes);

    let response = send(app, request("GET", "/pets", None)).await;
    assert_eq!(response.headers().get("x-served-by").unwrap(), "ember");
}

#[tokio::test]
async fn unmapped_error_kind_hits_fallback() {
    let routes = AppRouter::new().get("/boom", |_ctx: &mut ValidationContext, _req: &HttpRequest, _res: &mut HttpResponse| {
        Err(RouteError::custom("surprise", "sensitive detail"))
    });
    let app = service(ServerConfig::default(), routes);

    let response = send(app, request("GET", "/boom", None)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], json!("internal server error"));
}

#[tokio::test]
async fn handler_can_set_status_and_headers() {
    let routes = AppRouter::new().post("/pets", |_ctx: &mut ValidationContext, _req: &HttpRequest, res: &mut HttpResponse| {
        res.set_status(StatusCode::CREATED);
        res.set_header("location", "/pets/1");
        Ok(Some(json!({ "id": 1 })))
    });
    let app = service(ServerConfig::default(), routes);

    let response = send(app, request("POST", "/pets", Some("{}"))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers().get("location").unwrap(), "/pets/1");
}
