//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files;
//! runtime-only fields (authorization manager, response transformer) are
//! skipped and attached through builder methods.

use crate::auth::AuthorizationManager;
use crate::http::response::{JsonTransformer, ResponseTransformer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Root configuration for the server.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (IP only; the port is separate).
    pub ip: String,

    /// Bind port.
    pub port: u16,

    /// Lower bound hint for the worker pool. `-1` leaves it to the runtime;
    /// tokio has no minimum-pool knob, so the value is accepted but unused.
    pub min_threads: i32,

    /// Worker threads for the blocking entry point's runtime.
    pub max_threads: i32,

    /// Per-request timeout in milliseconds. `-1` disables the timeout layer.
    pub idle_timeout_ms: i64,

    /// Idle timeout for accepted WebSocket connections, in milliseconds.
    /// Absent leaves connections open until either side closes.
    pub ws_timeout_ms: Option<i64>,

    /// Optional TLS termination material.
    pub tls: Option<TlsConfig>,

    /// Optional static file service.
    pub static_files: Option<StaticFilesConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Classifies requests into granted authorization tokens. Absent means
    /// every token check fails closed.
    #[serde(skip)]
    pub authorization: Option<Arc<dyn AuthorizationManager>>,

    /// Renders handler results into response bodies.
    #[serde(skip, default = "default_transformer")]
    pub transformer: Arc<dyn ResponseTransformer>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: "0.0.0.0".to_string(),
            port: 4567,
            min_threads: -1,
            max_threads: 10,
            idle_timeout_ms: -1,
            ws_timeout_ms: None,
            tls: None,
            static_files: None,
            observability: ObservabilityConfig::default(),
            authorization: None,
            transformer: default_transformer(),
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("ip", &self.ip)
            .field("port", &self.port)
            .field("min_threads", &self.min_threads)
            .field("max_threads", &self.max_threads)
            .field("idle_timeout_ms", &self.idle_timeout_ms)
            .field("ws_timeout_ms", &self.ws_timeout_ms)
            .field("tls", &self.tls)
            .field("static_files", &self.static_files)
            .field("observability", &self.observability)
            .field("authorization", &self.authorization.is_some())
            .finish()
    }
}

impl ServerConfig {
    pub fn with_authorization(mut self, manager: Arc<dyn AuthorizationManager>) -> Self {
        self.authorization = Some(manager);
        self
    }

    pub fn with_transformer(mut self, transformer: Arc<dyn ResponseTransformer>) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

fn default_transformer() -> Arc<dyn ResponseTransformer> {
    Arc::new(JsonTransformer::new())
}

/// TLS termination material, PEM-encoded.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate chain file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,

    /// Optional trust-anchor bundle for client verification (PEM).
    #[serde(default)]
    pub trust_ca_path: Option<String>,
}

/// Static file service settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Filesystem directory served as the document root.
    pub dir: String,

    /// URL prefix the directory is mounted under. Empty means the root,
    /// alongside registered routes.
    pub mount: String,

    /// Extra headers added to every static response.
    pub headers: HashMap<String, String>,

    /// `Cache-Control: max-age` seconds for static responses.
    pub expire_seconds: i64,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            dir: String::new(),
            mount: String::new(),
            headers: HashMap::new(),
            expire_seconds: 1,
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log filter, overridable via `RUST_LOG`.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
