//! TLS certificate loading.

use std::io::{Error, ErrorKind};
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

/// Load a rustls config from PEM certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, Error> {
    for (what, path) in [("Certificate", cert_path), ("Private key", key_path)] {
        if !path.exists() {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("{} file not found: {:?}", what, path),
            ));
        }
    }

    tracing::info!(cert = ?cert_path, "Loading TLS certificate");
    RustlsConfig::from_pem_file(cert_path, key_path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_certificate() {
        let err = load_tls_config(Path::new("/nonexistent/cert.pem"), Path::new("/nonexistent/key.pem"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().starts_with("Certificate"));
    }
}
