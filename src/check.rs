use crate::{
    endpoint::Endpoint,
    metrics::MetricsStore,
    tls::{CertificateProbe, FailureClass, ProbeFailure, ProbeOutcome},
};
use chrono::Utc;
use futures::FutureExt;
use std::{any::Any, panic::AssertUnwindSafe};
use tracing::{debug, error, info, warn};

/// Run one check cycle: probe every endpoint in order and record each
/// outcome right away.
///
/// A probe that panics is recorded as a [`FailureClass::Panic`] failure and
/// the cycle moves on to the next endpoint. Running the cycle again simply
/// replaces the previous records.
pub async fn check<P: CertificateProbe>(endpoints: &[Endpoint], probe: &P, store: &MetricsStore) {
    info!(endpoints = endpoints.len(), "checking configured hosts");

    for endpoint in endpoints {
        let endpoint_id = endpoint.id();
        debug!(endpoint = %endpoint_id, "connecting");

        let outcome = match AssertUnwindSafe(probe.probe(endpoint)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(endpoint = %endpoint_id, %message, "probe panicked");
                ProbeOutcome::Failure(ProbeFailure::new(FailureClass::Panic, message))
            }
        };

        log_outcome(&endpoint_id, &outcome);
        store.record(&endpoint_id, outcome, Utc::now()).await;
    }

    info!("done checking configured hosts");
}

fn log_outcome(endpoint_id: &str, outcome: &ProbeOutcome) {
    match outcome {
        ProbeOutcome::Success(summary) => match summary.issuer_not_after {
            Some(issuer_not_after) => info!(
                endpoint = %endpoint_id,
                subject = %summary.leaf_subject,
                expires_at = %summary.leaf_not_after,
                issuer = %summary.leaf_issuer,
                issuer_expires_at = %issuer_not_after,
                "certificate checked"
            ),
            None => info!(
                endpoint = %endpoint_id,
                subject = %summary.leaf_subject,
                expires_at = %summary.leaf_not_after,
                issuer = %summary.leaf_issuer,
                "certificate checked, issuer expiry unknown, not in chain"
            ),
        },
        ProbeOutcome::Failure(failure) => warn!(
            endpoint = %endpoint_id,
            class = %failure.class,
            timeout = failure.class.is_timeout(),
            resolution = failure.class.is_resolution(),
            error = %failure.message,
            "unable to check certificate"
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "probe panicked".to_string())
}
