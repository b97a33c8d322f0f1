//! TLS configuration and certificate loading.

use crate::config::TlsConfig;
use axum_server::tls_rustls::RustlsConfig;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// Load TLS material for the acceptor from the configured PEM files.
///
/// The files are inspected with rustls-pemfile first so a missing or
/// malformed bundle fails at startup with a pointed message instead of at
/// the first handshake.
pub async fn load_tls_config(config: &TlsConfig) -> Result<RustlsConfig, io::Error> {
    check_pem(&config.cert_path, "certificate")?;
    check_pem(&config.key_path, "private key")?;
    if let Some(trust) = &config.trust_ca_path {
        check_pem(trust, "trust anchor")?;
    }

    RustlsConfig::from_pem_file(&config.cert_path, &config.key_path).await
}

fn check_pem(path: &str, role: &str) -> Result<(), io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{role} file not found: {path:?}"),
        ));
    }
    let mut reader = BufReader::new(File::open(path)?);
    let items: Result<Vec<_>, _> = rustls_pemfile::read_all(&mut reader).collect();
    let items = items.map_err(|err| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{role} file {path:?} is not valid PEM: {err}"),
        )
    })?;
    if items.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{role} file {path:?} contains no PEM items"),
        ));
    }
    Ok(())
}
