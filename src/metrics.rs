use crate::tls::ProbeOutcome;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use prometheus::{IntGaugeVec, Opts, Registry, TextEncoder};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

pub const CHECKED_TIME: &str = "ssl_cert_checked_time";
pub const EXPIRY_TIME: &str = "ssl_cert_expiry_time";
pub const ISSUER_EXPIRY_TIME: &str = "ssl_cert_issuer_expiry_time";
pub const CHECK_SUCCESS: &str = "ssl_cert_check_success";

/// Issuer expiry exported when the server sent only the leaf.
///
/// Indistinguishable from a real epoch-zero timestamp, consumers already
/// rely on it meaning "unknown".
pub const UNKNOWN_EXPIRY: i64 = 0;

/// Latest observed state of one endpoint, timestamps in Unix seconds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointMetricState {
    /// Time of the last successful check, `None` until one succeeds
    pub checked_at: Option<i64>,
    pub leaf_expiry: i64,
    pub issuer_expiry: i64,
    pub subject: String,
    pub issuer: String,
    pub success: bool,
    pub error_class: String,
    pub error_message: String,
}

impl EndpointMetricState {
    /// Build the record that replaces `prior` after `outcome`.
    ///
    /// A failure keeps the last known certificate data and only touches the
    /// success and error fields.
    #[must_use]
    pub fn observe(prior: Option<&Self>, outcome: ProbeOutcome, now: DateTime<Utc>) -> Self {
        match outcome {
            ProbeOutcome::Success(summary) => Self {
                checked_at: Some(now.timestamp()),
                leaf_expiry: summary.leaf_not_after.timestamp(),
                issuer_expiry: summary
                    .issuer_not_after
                    .map_or(UNKNOWN_EXPIRY, |not_after| not_after.timestamp()),
                subject: summary.leaf_subject,
                issuer: summary.leaf_issuer,
                success: true,
                error_class: String::new(),
                error_message: String::new(),
            },
            ProbeOutcome::Failure(failure) => Self {
                success: false,
                error_class: failure.class.to_string(),
                error_message: failure.message,
                ..prior.cloned().unwrap_or_default()
            },
        }
    }

    /// True once the endpoint has had at least one successful check
    #[must_use]
    pub const fn has_certificate(&self) -> bool {
        self.checked_at.is_some()
    }

    #[must_use]
    pub fn cert_labels<'a>(&'a self, connect_host: &'a str) -> CertLabels<'a> {
        CertLabels {
            connect_host,
            subject: &self.subject,
            issuer: &self.issuer,
        }
    }

    #[must_use]
    pub fn check_labels<'a>(&'a self, connect_host: &'a str) -> CheckLabels<'a> {
        CheckLabels {
            connect_host,
            exception_class: &self.error_class,
            exception_message: &self.error_message,
        }
    }
}

/// Label set shared by the checked, expiry and issuer expiry families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertLabels<'a> {
    pub connect_host: &'a str,
    pub subject: &'a str,
    pub issuer: &'a str,
}

impl<'a> CertLabels<'a> {
    pub const NAMES: [&'static str; 3] = ["connect_host", "subject", "issuer"];

    #[must_use]
    pub const fn values(&self) -> [&'a str; 3] {
        [self.connect_host, self.subject, self.issuer]
    }
}

/// Label set of the check success family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckLabels<'a> {
    pub connect_host: &'a str,
    pub exception_class: &'a str,
    pub exception_message: &'a str,
}

impl<'a> CheckLabels<'a> {
    pub const NAMES: [&'static str; 3] = ["connect_host", "exception_class", "exception_message"];

    #[must_use]
    pub const fn values(&self) -> [&'a str; 3] {
        [
            self.connect_host,
            self.exception_class,
            self.exception_message,
        ]
    }
}

/// Latest state per endpoint, keyed by endpoint identity
///
/// Written by the check cycle and read by the `/metrics` handler. Every
/// record is replaced whole under the write lock, readers clone a snapshot
/// and render without holding the lock.
#[derive(Debug, Default)]
pub struct MetricsStore {
    states: RwLock<BTreeMap<String, EndpointMetricState>>,
}

impl MetricsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of probing `endpoint_id` at `now`
    pub async fn record(&self, endpoint_id: &str, outcome: ProbeOutcome, now: DateTime<Utc>) {
        let mut states = self.states.write().await;
        let state = EndpointMetricState::observe(states.get(endpoint_id), outcome, now);
        states.insert(endpoint_id.to_string(), state);
    }

    pub async fn get(&self, endpoint_id: &str) -> Option<EndpointMetricState> {
        self.states.read().await.get(endpoint_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }

    /// Copy of every retained record, sorted by endpoint identity
    pub async fn snapshot(&self) -> BTreeMap<String, EndpointMetricState> {
        self.states.read().await.clone()
    }

    /// Render the retained state in the prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded
    pub async fn export(&self) -> Result<String> {
        let snapshot = self.snapshot().await;
        render(&snapshot)
    }
}

struct Families {
    registry: Registry,
    checked: IntGaugeVec,
    expiry: IntGaugeVec,
    issuer_expiry: IntGaugeVec,
    success: IntGaugeVec,
}

impl Families {
    fn new() -> Result<Self> {
        let registry = Registry::new();

        let checked = register_gauge_vec(
            &registry,
            CHECKED_TIME,
            "Timestamp of when the cert was checked",
            &CertLabels::NAMES,
        )?;
        let expiry = register_gauge_vec(
            &registry,
            EXPIRY_TIME,
            "Timestamp of when the cert will expire",
            &CertLabels::NAMES,
        )?;
        let issuer_expiry = register_gauge_vec(
            &registry,
            ISSUER_EXPIRY_TIME,
            "Timestamp of when the cert's issuer will expire, 0 if the issuer is not in the served chain",
            &CertLabels::NAMES,
        )?;
        let success = register_gauge_vec(
            &registry,
            CHECK_SUCCESS,
            "Labels with the result of the cert check, 1 ok, 0 error",
            &CheckLabels::NAMES,
        )?;

        Ok(Self {
            registry,
            checked,
            expiry,
            issuer_expiry,
            success,
        })
    }
}

fn register_gauge_vec(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> Result<IntGaugeVec> {
    let gauge = IntGaugeVec::new(Opts::new(name, help), labels)
        .with_context(|| format!("failed to create metric {name}"))?;
    registry
        .register(Box::new(gauge.clone()))
        .with_context(|| format!("failed to register metric {name}"))?;
    Ok(gauge)
}

fn set_gauge(gauge: &IntGaugeVec, labels: &[&str], value: i64) -> Result<()> {
    gauge
        .get_metric_with_label_values(labels)
        .with_context(|| format!("invalid label values {labels:?}"))?
        .set(value);
    Ok(())
}

/// Render endpoint states in the prometheus text exposition format
///
/// Certificate families are only emitted for endpoints that have succeeded
/// at least once, `ssl_cert_check_success` is emitted for every endpoint.
/// An empty map renders to an empty string.
///
/// # Errors
///
/// Returns an error if the metrics cannot be built or encoded
pub fn render(states: &BTreeMap<String, EndpointMetricState>) -> Result<String> {
    let families = Families::new()?;

    for (connect_host, state) in states {
        if let Some(checked_at) = state.checked_at {
            let labels = state.cert_labels(connect_host).values();
            set_gauge(&families.checked, &labels, checked_at)?;
            set_gauge(&families.expiry, &labels, state.leaf_expiry)?;
            set_gauge(&families.issuer_expiry, &labels, state.issuer_expiry)?;
        }

        set_gauge(
            &families.success,
            &state.check_labels(connect_host).values(),
            i64::from(state.success),
        )?;
    }

    TextEncoder::new()
        .encode_to_string(&families.registry.gather())
        .context("could not encode certificate metrics")
}
