use super::{
    CertificateSummary, FailureClass, ProbeConfig, ProbeFailure, ProbeOutcome,
    verifier::InspectOnlyVerifier,
};
use crate::endpoint::Endpoint;
use chrono::{DateTime, Utc};
use rustls::{
    ClientConfig,
    pki_types::{CertificateDer, ServerName},
};
use std::{
    future::Future,
    net::{IpAddr, SocketAddr},
    sync::{Arc, OnceLock},
};
use tokio::{
    io::AsyncWriteExt,
    net::{TcpStream, lookup_host},
    time::timeout,
};
use tokio_rustls::TlsConnector;
use tracing::debug;
use x509_parser::prelude::{FromDer, X509Certificate};

static CRYPTO_PROVIDER_INIT: OnceLock<()> = OnceLock::new();

/// Ensure the rustls crypto provider is initialized
///
/// This should be called before any TLS operations. It's safe to call
/// multiple times as initialization only happens once.
pub fn ensure_crypto_provider() {
    CRYPTO_PROVIDER_INIT.get_or_init(|| {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            // another provider was installed first, rustls keeps using it
            debug!("rustls crypto provider already installed");
        }
    });
}

/// Something that can fetch certificate expiry data for an endpoint.
///
/// Implementations must never fail past this boundary: every error is
/// reported as [`ProbeOutcome::Failure`].
pub trait CertificateProbe: Send + Sync {
    fn probe(&self, endpoint: &Endpoint) -> impl Future<Output = ProbeOutcome> + Send;
}

/// Probe that opens a real TCP connection and performs a TLS handshake
#[derive(Clone)]
pub struct TlsProbe {
    config: ProbeConfig,
    connector: TlsConnector,
}

impl std::fmt::Debug for TlsProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsProbe")
            .field("config", &self.config)
            .field("connector", &"TlsConnector")
            .finish()
    }
}

impl TlsProbe {
    #[must_use]
    pub fn new(config: ProbeConfig) -> Self {
        Self {
            config,
            connector: build_tls_connector(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ProbeConfig {
        &self.config
    }
}

impl CertificateProbe for TlsProbe {
    async fn probe(&self, endpoint: &Endpoint) -> ProbeOutcome {
        probe_certificate_chain(
            endpoint.host(),
            endpoint.port(),
            &self.config,
            &self.connector,
        )
        .await
    }
}

fn build_tls_connector() -> TlsConnector {
    ensure_crypto_provider();

    let config = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(InspectOnlyVerifier::new()))
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

/// Connect to `host:port`, complete a TLS handshake with SNI set to `host`
/// and summarize the peer certificate chain.
///
/// The connection is closed with `close_notify` once the chain has been read.
/// The socket is dropped on every return path, including a handshake that
/// fails halfway.
pub async fn probe_certificate_chain(
    host: &str,
    port: u16,
    config: &ProbeConfig,
    connector: &TlsConnector,
) -> ProbeOutcome {
    fetch_chain(host, port, config, connector).await.into()
}

async fn fetch_chain(
    host: &str,
    port: u16,
    config: &ProbeConfig,
    connector: &TlsConnector,
) -> Result<CertificateSummary, ProbeFailure> {
    let server_name = server_name_from_host(host)?;
    let addrs = resolve(host, port, config).await?;
    let stream = connect(host, port, &addrs, config).await?;

    let mut tls_stream = match timeout(
        config.handshake_timeout,
        connector.connect(server_name, stream),
    )
    .await
    {
        Ok(Ok(tls_stream)) => tls_stream,
        Ok(Err(e)) => {
            return Err(ProbeFailure::new(
                FailureClass::HandshakeError,
                format!("TLS handshake with {host}:{port} failed: {e}"),
            ));
        }
        Err(_) => {
            return Err(ProbeFailure::new(
                FailureClass::HandshakeTimeout,
                format!(
                    "TLS handshake with {host}:{port} timed out after {:?}",
                    config.handshake_timeout
                ),
            ));
        }
    };

    let summary = {
        let (_, connection) = tls_stream.get_ref();
        summarize_chain(connection.peer_certificates().unwrap_or_default())
    };

    match timeout(config.handshake_timeout, tls_stream.shutdown()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(host, port, error = %e, "TLS shutdown failed"),
        Err(_) => debug!(host, port, "TLS shutdown timed out"),
    }

    summary
}

async fn resolve(
    host: &str,
    port: u16,
    config: &ProbeConfig,
) -> Result<Vec<SocketAddr>, ProbeFailure> {
    match timeout(config.connect_timeout, lookup_host((host, port))).await {
        Ok(Ok(addrs)) => {
            let addrs: Vec<SocketAddr> = addrs.collect();
            if addrs.is_empty() {
                Err(ProbeFailure::new(
                    FailureClass::ResolveError,
                    format!("no addresses found for {host}"),
                ))
            } else {
                Ok(addrs)
            }
        }
        Ok(Err(e)) => Err(ProbeFailure::new(
            FailureClass::ResolveError,
            format!("failed to resolve {host}: {e}"),
        )),
        Err(_) => Err(ProbeFailure::new(
            FailureClass::ResolveTimeout,
            format!(
                "resolving {host} timed out after {:?}",
                config.connect_timeout
            ),
        )),
    }
}

async fn connect(
    host: &str,
    port: u16,
    addrs: &[SocketAddr],
    config: &ProbeConfig,
) -> Result<TcpStream, ProbeFailure> {
    match timeout(config.connect_timeout, TcpStream::connect(addrs)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(ProbeFailure::new(
            FailureClass::ConnectError,
            format!("failed to connect to {host}:{port}: {e}"),
        )),
        Err(_) => Err(ProbeFailure::new(
            FailureClass::ConnectTimeout,
            format!(
                "connecting to {host}:{port} timed out after {:?}",
                config.connect_timeout
            ),
        )),
    }
}

fn server_name_from_host(host: &str) -> Result<ServerName<'static>, ProbeFailure> {
    host.parse::<IpAddr>().map_or_else(
        |_| {
            ServerName::try_from(host.to_string()).map_err(|_| {
                ProbeFailure::new(
                    FailureClass::InvalidServerName,
                    format!("invalid server name: {host}"),
                )
            })
        },
        |ip| Ok(ServerName::from(ip)),
    )
}

/// Summarize a leaf-first certificate chain
///
/// Position 0 gives the subject, issuer and not-after of the leaf, position 1
/// (if present) gives the issuer not-after. Anything after that is ignored.
///
/// # Errors
///
/// Returns [`FailureClass::NoPeerCertificate`] for an empty chain and
/// [`FailureClass::CertificateParseError`] if either certificate does not parse
pub fn summarize_chain(
    chain: &[CertificateDer<'_>],
) -> Result<CertificateSummary, ProbeFailure> {
    let Some(leaf_der) = chain.first() else {
        return Err(ProbeFailure::new(
            FailureClass::NoPeerCertificate,
            "server did not present a certificate",
        ));
    };

    let leaf = parse_certificate(leaf_der, "leaf")?;
    let issuer_not_after = chain
        .get(1)
        .map(|issuer_der| {
            parse_certificate(issuer_der, "issuer").and_then(|issuer| not_after(&issuer))
        })
        .transpose()?;

    Ok(CertificateSummary {
        leaf_subject: leaf.subject().to_string(),
        leaf_issuer: leaf.issuer().to_string(),
        leaf_not_after: not_after(&leaf)?,
        issuer_not_after,
    })
}

fn parse_certificate<'a>(
    der: &'a CertificateDer<'_>,
    position: &str,
) -> Result<X509Certificate<'a>, ProbeFailure> {
    X509Certificate::from_der(der.as_ref())
        .map(|(_, cert)| cert)
        .map_err(|e| {
            ProbeFailure::new(
                FailureClass::CertificateParseError,
                format!("failed to parse {position} certificate: {e}"),
            )
        })
}

fn not_after(cert: &X509Certificate<'_>) -> Result<DateTime<Utc>, ProbeFailure> {
    let timestamp = cert.validity().not_after.timestamp();
    DateTime::<Utc>::from_timestamp(timestamp, 0).ok_or_else(|| {
        ProbeFailure::new(
            FailureClass::CertificateParseError,
            format!("certificate not-after out of range: {timestamp}"),
        )
    })
}
