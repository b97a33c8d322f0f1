//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports, thread bounds, timeouts, cache expiry)
//! - Check referenced TLS and static-file paths exist
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over the config plus the filesystem
//! - Runs before a config is accepted into the server

use crate::config::schema::ServerConfig;
use std::net::IpAddr;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid bind ip `{0}`")]
    InvalidBindIp(String),

    #[error("port must be non-zero")]
    InvalidPort,

    #[error("max_threads must be at least 1, got {0}")]
    InvalidMaxThreads(i32),

    #[error("min_threads {min} exceeds max_threads {max}")]
    ThreadBoundsInverted { min: i32, max: i32 },

    #[error("idle_timeout_ms must be -1 or non-negative, got {0}")]
    InvalidIdleTimeout(i64),

    #[error("ws_timeout_ms must be positive, got {0}")]
    InvalidWsTimeout(i64),

    #[error("{role} file not found: {path}")]
    MissingFile { role: &'static str, path: String },

    #[error("static_files.dir is not a directory: {0}")]
    NotADirectory(String),

    #[error("static_files.mount must start with `/` and not be `/`, got `{0}`")]
    InvalidMount(String),

    #[error("static_files.expire_seconds must be non-negative, got {0}")]
    InvalidExpiry(i64),
}

/// Validate a configuration, collecting every semantic error.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.ip.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::InvalidBindIp(config.ip.clone()));
    }
    if config.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }
    if config.max_threads < 1 {
        errors.push(ValidationError::InvalidMaxThreads(config.max_threads));
    } else if config.min_threads > config.max_threads {
        errors.push(ValidationError::ThreadBoundsInverted {
            min: config.min_threads,
            max: config.max_threads,
        });
    }
    if config.idle_timeout_ms < -1 {
        errors.push(ValidationError::InvalidIdleTimeout(config.idle_timeout_ms));
    }
    if let Some(ms) = config.ws_timeout_ms {
        if ms <= 0 {
            errors.push(ValidationError::InvalidWsTimeout(ms));
        }
    }

    if let Some(tls) = &config.tls {
        check_file("tls.cert_path", &tls.cert_path, &mut errors);
        check_file("tls.key_path", &tls.key_path, &mut errors);
        if let Some(trust) = &tls.trust_ca_path {
            check_file("tls.trust_ca_path", trust, &mut errors);
        }
    }

    if let Some(files) = &config.static_files {
        let dir = Path::new(&files.dir);
        if !dir.exists() {
            errors.push(ValidationError::MissingFile {
                role: "static_files.dir",
                path: files.dir.clone(),
            });
        } else if !dir.is_dir() {
            errors.push(ValidationError::NotADirectory(files.dir.clone()));
        }
        if !files.mount.is_empty() && (files.mount == "/" || !files.mount.starts_with('/')) {
            errors.push(ValidationError::InvalidMount(files.mount.clone()));
        }
        if files.expire_seconds < 0 {
            errors.push(ValidationError::InvalidExpiry(files.expire_seconds));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_file(role: &'static str, path: &str, errors: &mut Vec<ValidationError>) {
    if !Path::new(path).is_file() {
        errors.push(ValidationError::MissingFile {
            role,
            path: path.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{StaticFilesConfig, TlsConfig};

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let config = ServerConfig {
            ip: "not-an-ip".to_string(),
            port: 0,
            max_threads: 0,
            idle_timeout_ms: -2,
            ..ServerConfig::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn non_positive_ws_timeout_rejected() {
        let config = ServerConfig {
            ws_timeout_ms: Some(0),
            ..ServerConfig::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidWsTimeout(0)));
    }

    #[test]
    fn inverted_thread_bounds_rejected() {
        let config = ServerConfig {
            min_threads: 20,
            max_threads: 10,
            ..ServerConfig::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::ThreadBoundsInverted { min: 20, max: 10 }
        ));
    }

    #[test]
    fn missing_tls_material_rejected() {
        let config = ServerConfig {
            tls: Some(TlsConfig {
                cert_path: "/nonexistent/cert.pem".to_string(),
                key_path: "/nonexistent/key.pem".to_string(),
                trust_ca_path: None,
            }),
            ..ServerConfig::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn root_mount_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            static_files: Some(StaticFilesConfig {
                dir: dir.path().to_string_lossy().into_owned(),
                mount: "/".to_string(),
                ..StaticFilesConfig::default()
            }),
            ..ServerConfig::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidMount(_)));
    }
}
