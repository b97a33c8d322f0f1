//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection (runtime)
//!     → server.rs (router build, dispatch, middleware)
//!     → request.rs (per-request context, body cache)
//!     → [routing layer resolves handler]
//!     → response.rs (status/headers, result transformation)
//!     → send to client
//!
//! WebSocket upgrade:
//!     → websocket.rs (handler lifecycle per connection)
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod tls;
pub mod websocket;

pub use request::{BodySource, HttpRequest, RequestId, X_REQUEST_ID};
pub use response::{HttpResponse, JsonTransformer, ResponseTransformer};
pub use server::Server;
pub use websocket::{WebSocketFactory, WebSocketHandler, WsMessage, WsSession};
