//! Thin route-registration, validation and authorization layer over axum.

pub mod auth;
pub mod codec;
pub mod config;
pub mod error;
pub mod http;
pub mod observability;
pub mod routing;
pub mod validation;

pub use auth::{AuthorizationManager, ANONYMOUS, AUTHENTICATED};
pub use codec::JsonCodec;
pub use config::ServerConfig;
pub use error::RouteError;
pub use http::{HttpRequest, HttpResponse, ResponseTransformer, Server};
pub use routing::{AppRouter, RouteOptions};
pub use validation::ValidationContext;
