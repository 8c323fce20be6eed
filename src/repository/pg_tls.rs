//! PostgreSQL TLS connection helpers using rustls.
//!
//! TLS is required by default; set `sink.no_tls = true` for local databases.

use std::sync::Arc;

use rustls::ClientConfig;
use thiserror::Error;
use tokio_postgres_rustls::MakeRustlsConnect;

#[derive(Debug, Error)]
pub enum PgConnectError {
    #[error("TLS setup failed: {0}")]
    Tls(#[from] rustls::Error),

    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),
}

fn build_rustls_config() -> Result<ClientConfig, rustls::Error> {
    let mut root_store = rustls::RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for err in &native.errors {
        tracing::warn!("Skipping native certificate: {}", err);
    }
    for cert in native.certs {
        root_store.add(cert).ok();
    }

    Ok(
        ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()?
            .with_root_certificates(root_store)
            .with_no_client_auth(),
    )
}

pub fn make_tls_connector() -> Result<MakeRustlsConnect, rustls::Error> {
    Ok(MakeRustlsConnect::new(build_rustls_config()?))
}

/// Connect to PostgreSQL and spawn the connection task.
///
/// Returns just the `Client`. The connection future runs as a background
/// tokio task and ends when the client is dropped.
pub async fn connect(
    config: &tokio_postgres::Config,
    no_tls: bool,
) -> Result<tokio_postgres::Client, PgConnectError> {
    if no_tls {
        let (client, connection) = config.connect(tokio_postgres::NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });
        Ok(client)
    } else {
        let tls = make_tls_connector()?;
        let (client, connection) = config.connect(tls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });
        Ok(client)
    }
}
