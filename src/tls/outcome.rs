use chrono::{DateTime, Utc};
use std::fmt;

/// Timing data taken from the served certificate chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSummary {
    /// Leaf subject DN
    pub leaf_subject: String,
    /// Leaf issuer DN
    pub leaf_issuer: String,
    /// Leaf not-after
    pub leaf_not_after: DateTime<Utc>,
    /// Not-after of the second certificate in the chain, `None` when the
    /// server sent only the leaf
    pub issuer_not_after: Option<DateTime<Utc>>,
}

/// Coarse classification of a failed probe, exported as `exception_class`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    ResolveError,
    ResolveTimeout,
    ConnectError,
    ConnectTimeout,
    InvalidServerName,
    HandshakeError,
    HandshakeTimeout,
    NoPeerCertificate,
    CertificateParseError,
    /// The probe itself panicked, set by the check cycle
    Panic,
}

impl FailureClass {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResolveError => "ResolveError",
            Self::ResolveTimeout => "ResolveTimeout",
            Self::ConnectError => "ConnectError",
            Self::ConnectTimeout => "ConnectTimeout",
            Self::InvalidServerName => "InvalidServerName",
            Self::HandshakeError => "HandshakeError",
            Self::HandshakeTimeout => "HandshakeTimeout",
            Self::NoPeerCertificate => "NoPeerCertificate",
            Self::CertificateParseError => "CertificateParseError",
            Self::Panic => "Panic",
        }
    }

    /// True for failures that happened before a TCP connection existed
    #[must_use]
    pub const fn is_resolution(self) -> bool {
        matches!(self, Self::ResolveError | Self::ResolveTimeout)
    }

    #[must_use]
    pub const fn is_timeout(self) -> bool {
        matches!(
            self,
            Self::ResolveTimeout | Self::ConnectTimeout | Self::HandshakeTimeout
        )
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure {
    pub class: FailureClass,
    pub message: String,
}

impl ProbeFailure {
    #[must_use]
    pub fn new(class: FailureClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class, self.message)
    }
}

/// Result of a single probe, produced fresh every time and handed to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success(CertificateSummary),
    Failure(ProbeFailure),
}

impl ProbeOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<Result<CertificateSummary, ProbeFailure>> for ProbeOutcome {
    fn from(result: Result<CertificateSummary, ProbeFailure>) -> Self {
        match result {
            Ok(summary) => Self::Success(summary),
            Err(failure) => Self::Failure(failure),
        }
    }
}
