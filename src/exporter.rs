use crate::{
    check::check,
    endpoint::Endpoint,
    metrics::MetricsStore,
    tls::{CertificateProbe, ProbeConfig, TlsProbe},
};
use anyhow::Context;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{Duration, Utc};
use futures::FutureExt;
use std::{net::IpAddr, sync::Arc};
use tokio::{net::TcpListener, task, time};
use tower_http::compression::CompressionLayer;
use tracing::{debug, error, info};

/// Start the exporter
///
/// Binds the HTTP listener, then runs the first check cycle right away and
/// one more every `interval` while serving `/healthz` and `/metrics`.
///
/// # Errors
///
/// Returns an error if the interval is out of range, the listener cannot be
/// bound, the server fails or the monitoring loop stops
pub async fn start(
    endpoints: Vec<Endpoint>,
    interval: std::time::Duration,
    listen: Option<IpAddr>,
    port: u16,
    probe: ProbeConfig,
) -> anyhow::Result<()> {
    let every = Duration::from_std(interval).context("check interval is out of range")?;

    let store = Arc::new(MetricsStore::new());
    let app = router(Arc::clone(&store));

    // Bind to socket with smart fallback
    let (listener, bind_addr) = match listen {
        Some(addr) => {
            // Explicit address specified - bind to it
            let socket_addr = std::net::SocketAddr::new(addr, port);
            let listener = TcpListener::bind(socket_addr)
                .await
                .with_context(|| format!("failed to bind {socket_addr}"))?;
            (listener, socket_addr.to_string())
        }
        None => {
            // Auto mode: try IPv6 first, fallback to IPv4
            if let Ok(l) = TcpListener::bind(format!("[::]:{port}")).await {
                (l, format!("[::]:{port}"))
            } else {
                let socket_addr = format!("0.0.0.0:{port}");
                let listener = TcpListener::bind(&socket_addr)
                    .await
                    .with_context(|| format!("failed to bind {socket_addr}"))?;
                (listener, socket_addr)
            }
        }
    };

    let probe = TlsProbe::new(probe);
    let hosts: Vec<String> = endpoints.iter().map(Endpoint::id).collect();
    info!(
        listen = %bind_addr,
        interval = ?interval,
        connect_timeout = ?probe.config().connect_timeout,
        handshake_timeout = ?probe.config().handshake_timeout,
        hosts = %hosts.join(", "),
        "configured to check hosts"
    );

    // keep JoinHandle to detect task failures
    let monitor_handle = task::spawn(run_loop(endpoints, every, probe, store));

    let server = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal());

    tokio::select! {
        result = server => {
            result.context("metrics server failed")?;
            info!("shutting down");
        }
        result = monitor_handle => {
            match result {
                Ok(()) => {
                    error!("monitoring loop exited unexpectedly");
                    anyhow::bail!("Monitoring loop stopped");
                }
                Err(e) => {
                    error!("monitoring loop panicked: {e}");
                    anyhow::bail!("Monitoring loop panicked: {e}");
                }
            }
        }
    }

    Ok(())
}

/// HTTP routes, sharing `store` with the check loop
///
/// Responses are gzip compressed when the client accepts it.
#[must_use]
pub fn router(store: Arc<MetricsStore>) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/metrics", get(metrics_handler))
        .fallback(not_found_handler)
        .layer(CompressionLayer::new())
        .with_state(store)
}

async fn healthz_handler() -> &'static str {
    "ok"
}

async fn metrics_handler(State(store): State<Arc<MetricsStore>>) -> Response {
    if store.is_empty().await {
        debug!("no check results recorded yet");
    }

    match store.export().await {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("{e:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn not_found_handler() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404 not found")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received ctrl-c"),
        () = terminate => info!("received SIGTERM"),
    }
}

#[inline]
fn remaining_sleep_duration(wait_time: Duration, runtime: Duration) -> Option<time::Duration> {
    wait_time
        .checked_sub(&runtime)
        .and_then(|remaining| remaining.to_std().ok())
        .filter(|duration| !duration.is_zero())
}

async fn run_loop<P: CertificateProbe>(
    endpoints: Vec<Endpoint>,
    every: Duration,
    probe: P,
    store: Arc<MetricsStore>,
) {
    loop {
        let start = Utc::now();

        // Catch panics in individual iterations to keep loop alive
        let iteration_result = std::panic::AssertUnwindSafe(check(&endpoints, &probe, &store))
            .catch_unwind()
            .await;

        if let Err(panic_info) = iteration_result {
            error!("panic in check cycle: {panic_info:?}");
        }

        let runtime = Utc::now().signed_duration_since(start);
        let endpoint_count = store.len().await;
        info!(
            runtime_ms = runtime.num_milliseconds(),
            endpoints = endpoint_count,
            "check cycle finished"
        );

        // Sleep for remaining interval time to maintain fixed interval
        if let Some(remaining) = remaining_sleep_duration(every, runtime) {
            time::sleep(remaining).await;
        }
    }
}
