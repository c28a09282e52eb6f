//! TLS certificate probing
//!
//! This module opens a TLS connection to an endpoint and reports the expiry
//! times of the certificate chain the server presents.
//!
//! # Module Organization
//!
//! - `config` - Probe timeouts
//! - `outcome` - Probe results and failure classes
//! - `probe` - Connecting, handshaking and reading the chain
//! - `verifier` - Verifier that accepts any served chain
//!
//! # Example
//!
//! ```rust,ignore
//! use certpulse::{endpoint::Endpoint, tls::{CertificateProbe, ProbeConfig, TlsProbe}};
//!
//! let probe = TlsProbe::new(ProbeConfig::default());
//! let outcome = probe.probe(&Endpoint::new("example.com", 443)).await;
//! ```

pub mod config;
pub mod outcome;
pub mod probe;
pub mod verifier;

// Re-export commonly used types
pub use config::ProbeConfig;
pub use outcome::{CertificateSummary, FailureClass, ProbeFailure, ProbeOutcome};
pub use probe::{
    CertificateProbe, TlsProbe, ensure_crypto_provider, probe_certificate_chain, summarize_chain,
};
pub use verifier::InspectOnlyVerifier;
