//! Contract Test: Idempotency
//!
//! Constraints verified:
//! - A second cycle over an unchanged desired set performs no writes
//! - Duplicate desired hostnames collapse to a single creation
//! - A cycle that failed halfway is completed by the next one
//!
//! If this test fails, cycles are no longer independently correct.

mod common;

use common::*;

#[tokio::test]
async fn second_cycle_performs_no_writes() {
    let provider = MemoryProvider::new().with_owned("old.example.com", "203.0.113.7");
    let ip_source = FixedIpSource::new(public_ip());
    let engine = engine_with(&provider, &ip_source, false);

    let wanted = desired(&["a.example.com", "b.example.com"]);

    let first = engine.reconcile(&wanted).await.unwrap();
    assert_eq!(first.created, vec!["a.example.com", "b.example.com"]);
    assert_eq!(first.deleted, vec!["old.example.com"]);

    provider.clear_calls();
    let second = engine.reconcile(&wanted).await.unwrap();

    assert_eq!(second.changes(), 0);
    assert!(
        provider.writes().is_empty(),
        "Expected no writes on second cycle, got {:?}",
        provider.writes()
    );
}

#[tokio::test]
async fn duplicate_hostnames_create_once() {
    let provider = MemoryProvider::new();
    let ip_source = FixedIpSource::new(public_ip());
    let engine = engine_with(&provider, &ip_source, false);

    let wanted = desired(&["a.example.com", "a.example.com", "A.EXAMPLE.COM"]);
    let report = engine.reconcile(&wanted).await.unwrap();

    assert_eq!(report.created, vec!["a.example.com"]);
    assert_eq!(provider.writes().len(), 1);
    assert_eq!(provider.records_for("a.example.com").len(), 2);
}

#[tokio::test]
async fn partial_failure_heals_on_next_cycle() {
    let provider = MemoryProvider::new();
    let ip_source = FixedIpSource::new(public_ip());
    let engine = engine_with(&provider, &ip_source, false);

    let wanted = desired(&["a.example.com", "b.example.com", "c.example.com"]);

    provider.fail_create_of("b.example.com");
    assert!(engine.reconcile(&wanted).await.is_err());
    assert_eq!(provider.records_for("a.example.com").len(), 2);
    assert!(provider.records_for("c.example.com").is_empty());

    provider.clear_failures();
    let report = engine.reconcile(&wanted).await.unwrap();
    assert_eq!(report.created, vec!["b.example.com", "c.example.com"]);

    provider.clear_calls();
    let report = engine.reconcile(&wanted).await.unwrap();
    assert_eq!(report.changes(), 0);
    assert!(provider.writes().is_empty());
}
