// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, net::SocketAddr, time::Duration};

use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use legacy_locker_server::{
    api::router,
    auth::JwksManager,
    config::{DATA_DIR_ENV, EXPIRY_POLL_INTERVAL_ENV, INTERNAL_SCAN_SECRET_ENV},
    expiry_poller::ExpiryPoller,
    notify::Mailer,
    state::{AppState, AuthConfig},
    storage::{EncryptedStorage, StoragePaths},
};

/// Default background sweep interval (seconds).
const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;

/// Initialize tracing from LOG_FORMAT / RUST_LOG.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    match env::var("LOG_FORMAT").as_deref() {
        Ok("json") => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize encrypted storage
    let data_dir = env::var(DATA_DIR_ENV).unwrap_or_else(|_| "/data".to_string());
    let mut storage = EncryptedStorage::new(StoragePaths::new(&data_dir));
    storage
        .initialize()
        .expect("Failed to initialize encrypted storage");
    info!(data_dir, "Encrypted storage initialized");

    // Auth configuration: JWKS verification in production, structural
    // decode without it.
    let auth_config = match env::var("AUTH_JWKS_URL") {
        Ok(jwks_url) if !jwks_url.is_empty() => {
            info!(jwks_url, "JWT verification enabled (production mode)");
            AuthConfig {
                jwks: Some(JwksManager::new(jwks_url)),
                issuer: env::var("AUTH_ISSUER").ok(),
                audience: env::var("AUTH_AUDIENCE").ok(),
            }
        }
        _ => {
            warn!("AUTH_JWKS_URL not set; JWT signatures are NOT verified (development mode)");
            AuthConfig::default()
        }
    };

    let mut state = AppState::new(storage)
        .with_auth_config(auth_config)
        .with_mailer(Mailer::from_env());

    match env::var(INTERNAL_SCAN_SECRET_ENV) {
        Ok(secret) if !secret.is_empty() => {
            state = state.with_internal_secret(secret);
        }
        _ => warn!("INTERNAL_SCAN_SECRET not set; internal scan endpoint is disabled"),
    }

    // Background expiry poller with graceful shutdown
    let shutdown = CancellationToken::new();
    let poll_interval = env::var(EXPIRY_POLL_INTERVAL_ENV)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
    let poller =
        ExpiryPoller::new(state.clone()).with_poll_interval(Duration::from_secs(poll_interval));
    tokio::spawn(poller.run(shutdown.clone()));

    let app = router(state);

    // Parse bind address
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    let handle = axum_server::Handle::new();
    tokio::spawn(shutdown_listener(shutdown, handle.clone()));

    // Serve over TLS when certificates are configured, plain HTTP otherwise
    match (env::var("TLS_CERT_PATH"), env::var("TLS_KEY_PATH")) {
        (Ok(cert_path), Ok(key_path)) => {
            let tls_config = RustlsConfig::from_pem_file(&cert_path, &key_path)
                .await
                .expect("Failed to load TLS certificate/key");
            info!("Legacy Locker server listening on https://{addr} (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .expect("HTTPS server failed");
        }
        _ => {
            info!("Legacy Locker server listening on http://{addr} (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .expect("HTTP server failed");
        }
    }
}

/// Cancel the poller and drain in-flight requests on SIGINT/SIGTERM.
async fn shutdown_listener(shutdown: CancellationToken, handle: axum_server::Handle<SocketAddr>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    shutdown.cancel();
    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}
