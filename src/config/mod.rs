//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → runtime-only fields attached via builder methods
//!     → handed to Server::new
//! ```
//!
//! # Design Decisions
//! - Config is immutable once constructed
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The authorization manager and response transformer are runtime values,
//!   not file content; they attach through `with_*` builders

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{ObservabilityConfig, ServerConfig, StaticFilesConfig, TlsConfig};
pub use validation::{validate_config, ValidationError};
