//! Contract Test: Controller Loop
//!
//! Constraints verified:
//! - One-shot mode runs exactly one cycle and returns its error
//! - A periodic loop survives failing cycles and keeps reconciling
//! - A periodic loop terminates promptly on shutdown
//! - Events describe what each cycle did

mod common;

use common::*;
use dockdns_core::{EngineConfig, EngineEvent, LoopMode, ReconcileEngine};
use std::time::Duration;

#[tokio::test]
async fn one_shot_runs_a_single_cycle() {
    let provider = MemoryProvider::new();
    let ip_source = FixedIpSource::new(public_ip());
    let engine = engine_with(&provider, &ip_source, false);
    let source = SwitchableSource::new(&["a.example.com"]);

    engine.run(&source, LoopMode::Once).await.unwrap();

    assert_eq!(source.queries(), 1);
    assert_eq!(provider.records_for("a.example.com").len(), 2);
}

#[tokio::test]
async fn one_shot_returns_cycle_error() {
    let provider = MemoryProvider::new();
    let ip_source = FixedIpSource::new(public_ip());
    let engine = engine_with(&provider, &ip_source, false);
    let source = SwitchableSource::new(&[]);
    source.break_upstream();

    let err = engine.run(&source, LoopMode::Once).await.unwrap_err();

    assert!(matches!(err, dockdns_core::Error::DesiredState(_)));
    assert!(provider.calls().is_empty(), "provider must not be queried");
}

#[tokio::test]
async fn periodic_loop_survives_errors_and_stops_on_shutdown() {
    let provider = MemoryProvider::new();
    let ip_source = FixedIpSource::new(public_ip());
    let engine = engine_with(&provider, &ip_source, false);
    let source = SwitchableSource::new(&[]);
    source.break_upstream();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let loop_source = source.clone();
    let handle = tokio::spawn(async move {
        engine
            .run_with_shutdown(
                &loop_source,
                LoopMode::Every(Duration::from_millis(10)),
                Some(shutdown_rx),
            )
            .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(source.queries() >= 2, "loop keeps running after failures");

    source.set(&["a.example.com"]);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(provider.records_for("a.example.com").len(), 2);

    shutdown_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop should stop within 5 seconds")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn cycle_events_are_emitted() {
    let provider = MemoryProvider::new()
        .with_owned("a.example.com", "203.0.113.7")
        .with_foreign("b.example.com", "10.0.0.1");
    let ip_source = FixedIpSource::new(public_ip());
    let (engine, mut events) = ReconcileEngine::new(
        Box::new(provider.clone()),
        Box::new(ip_source.clone()),
        &EngineConfig::default(),
    )
    .unwrap();

    engine.reconcile(&desired(&["c.example.com"])).await.unwrap();

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }

    assert_eq!(
        received,
        vec![
            EngineEvent::CycleStarted { desired_count: 1 },
            EngineEvent::ForeignRecordSkipped {
                hostname: "b.example.com".to_string(),
            },
            EngineEvent::HostnameCreated {
                hostname: "c.example.com".to_string(),
                ip: public_ip(),
            },
            EngineEvent::HostnameDeleted {
                hostname: "a.example.com".to_string(),
            },
            EngineEvent::CycleCompleted {
                created: 1,
                replaced: 0,
                deleted: 1,
            },
        ]
    );
}

#[tokio::test]
async fn failed_cycle_emits_failure_event() {
    let provider = MemoryProvider::new();
    provider.fail_fetch();
    let ip_source = FixedIpSource::new(public_ip());
    let (engine, mut events) = ReconcileEngine::new(
        Box::new(provider.clone()),
        Box::new(ip_source),
        &EngineConfig::default(),
    )
    .unwrap();

    tokio_test::assert_err!(engine.reconcile(&desired(&["a.example.com"])).await);

    assert!(matches!(events.try_recv(), Ok(EngineEvent::CycleStarted { .. })));
    assert!(matches!(events.try_recv(), Ok(EngineEvent::CycleFailed { .. })));
}

#[test]
fn zero_capacity_event_channel_is_rejected() {
    let config = EngineConfig {
        repair_ip_drift: false,
        event_channel_capacity: 0,
    };
    let result = ReconcileEngine::new(
        Box::new(MemoryProvider::new()),
        Box::new(FixedIpSource::new(public_ip())),
        &config,
    );
    assert!(result.is_err());
}
