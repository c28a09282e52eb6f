#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use certpulse::{
    metrics::{CHECK_SUCCESS, CHECKED_TIME, EXPIRY_TIME, ISSUER_EXPIRY_TIME, MetricsStore},
    tls::{CertificateSummary, FailureClass, ProbeFailure, ProbeOutcome},
};
use chrono::{TimeZone, Utc};
use common::*;

fn summary(issuer: Option<i64>) -> ProbeOutcome {
    ProbeOutcome::Success(CertificateSummary {
        leaf_subject: LEAF_SUBJECT.to_string(),
        leaf_issuer: LEAF_ISSUER.to_string(),
        leaf_not_after: Utc.timestamp_opt(LEAF_NOT_AFTER, 0).unwrap(),
        issuer_not_after: issuer.map(|secs| Utc.timestamp_opt(secs, 0).unwrap()),
    })
}

#[tokio::test]
async fn test_export_empty_store() {
    let store = MetricsStore::new();
    let body = store.export().await.unwrap();

    assert!(parse_exposition(&body).is_empty());
}

#[tokio::test]
async fn test_export_declares_gauges() {
    let store = MetricsStore::new();
    store
        .record("example.com:443", summary(Some(CA_NOT_AFTER)), Utc::now())
        .await;
    let body = store.export().await.unwrap();

    for name in [CHECKED_TIME, EXPIRY_TIME, ISSUER_EXPIRY_TIME, CHECK_SUCCESS] {
        assert!(
            body.contains(&format!("# TYPE {name} gauge")),
            "missing TYPE line for {name}:\n{body}"
        );
        assert!(
            body.contains(&format!("# HELP {name} ")),
            "missing HELP line for {name}:\n{body}"
        );
    }
}

#[tokio::test]
async fn test_export_values_round_trip() {
    let store = MetricsStore::new();
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap();
    store.record("a.example:443", summary(Some(CA_NOT_AFTER)), now).await;
    store.record("[::1]:8443", summary(None), now).await;

    let samples = parse_exposition(&store.export().await.unwrap());
    assert_eq!(samples.len(), 8);

    let checked = find(&samples, CHECKED_TIME, "a.example:443").unwrap();
    assert_eq!(checked.value, now.timestamp());
    assert_eq!(
        find(&samples, ISSUER_EXPIRY_TIME, "a.example:443").unwrap().value,
        CA_NOT_AFTER
    );
    assert_eq!(
        find(&samples, ISSUER_EXPIRY_TIME, "[::1]:8443").unwrap().value,
        0
    );
    assert_eq!(find(&samples, EXPIRY_TIME, "[::1]:8443").unwrap().value, LEAF_NOT_AFTER);
}

#[tokio::test]
async fn test_export_escaped_failure_message() {
    let store = MetricsStore::new();
    let message = "bad \"reply\"\nfrom C:\\server";
    store
        .record(
            "odd.example:443",
            ProbeOutcome::Failure(ProbeFailure::new(FailureClass::HandshakeError, message)),
            Utc::now(),
        )
        .await;

    let body = store.export().await.unwrap();
    assert_eq!(
        body.lines().filter(|l| !l.starts_with('#')).count(),
        1,
        "newline in a label value must be escaped:\n{body}"
    );

    let samples = parse_exposition(&body);
    let sample = find(&samples, CHECK_SUCCESS, "odd.example:443").unwrap();
    assert_eq!(sample.value, 0);
    assert_eq!(sample.label("exception_class"), Some("HandshakeError"));
    assert_eq!(sample.label("exception_message"), Some(message));
}
