//! Expiry sweeper against the sqlite store.

mod common;

use std::time::Duration as StdDuration;

use chrono::Duration;

use cascata::domain::models::{ClienteStatus, SweeperConfig};
use cascata::domain::ports::ClienteRepository;
use cascata::services::{ExpirySweeper, StopReason, SweeperEvent};
use common::harness;

fn fast_config() -> SweeperConfig {
    SweeperConfig {
        interval_secs: 1,
        run_on_startup: true,
        batch_limit: 100,
        concurrency: 2,
    }
}

#[tokio::test]
async fn test_sweep_once_escalates_and_exhausts() {
    let h = harness().await;
    h.roster(&[("ana", "atendimento"), ("gil", "gerencia")]).await;
    let (lead_a, cliente_a) = h.new_lead("Maria").await;
    let (lead_b, cliente_b) = h.new_lead("João").await;
    h.controller.start_cascade(lead_a, cliente_a).await.unwrap();
    h.controller.start_cascade(lead_b, cliente_b).await.unwrap();

    let sweeper = ExpirySweeper::new(h.controller.clone(), fast_config());

    // Nothing is due yet.
    let report = sweeper.sweep_once().await.unwrap();
    assert_eq!(report.overdue, 0);

    h.clock.advance(Duration::minutes(61));
    let report = sweeper.sweep_once().await.unwrap();
    assert_eq!(report.overdue, 2);
    assert_eq!(report.escalated, 2);

    // Tier 2 has a two hour budget and no tier 3 is configured.
    h.clock.advance(Duration::hours(2) + Duration::seconds(1));
    let report = sweeper.sweep_once().await.unwrap();
    assert_eq!(report.exhausted, 2);
    assert!(h.controller.cascade_snapshot(None).await.unwrap().is_empty());

    let cliente = h.clientes.get_cliente(cliente_a).await.unwrap().unwrap();
    assert_eq!(cliente.status, ClienteStatus::SemAtendimento);

    let report = sweeper.sweep_once().await.unwrap();
    assert_eq!(report.overdue, 0);
}

#[tokio::test]
async fn test_sweep_respects_batch_limit() {
    let h = harness().await;
    h.roster(&[("ana", "atendimento"), ("gil", "gerencia")]).await;
    for i in 0..3 {
        let (lead_id, cliente_id) = h.new_lead(&format!("Cliente {i}")).await;
        h.controller.start_cascade(lead_id, cliente_id).await.unwrap();
    }
    h.clock.advance(Duration::hours(2));

    let sweeper = ExpirySweeper::new(
        h.controller.clone(),
        SweeperConfig {
            batch_limit: 2,
            ..fast_config()
        },
    );
    assert_eq!(sweeper.sweep_once().await.unwrap().escalated, 2);
    assert_eq!(sweeper.sweep_once().await.unwrap().escalated, 1);
}

#[tokio::test]
async fn test_daemon_reports_sweeps_and_stops() {
    let h = harness().await;
    h.roster(&[("ana", "atendimento"), ("gil", "gerencia")]).await;
    let (lead_id, cliente_id) = h.new_lead("Maria").await;
    h.controller.start_cascade(lead_id, cliente_id).await.unwrap();
    h.clock.advance(Duration::hours(2));

    let sweeper = ExpirySweeper::new(h.controller.clone(), fast_config());
    let handle = sweeper.handle();
    let mut events = sweeper.run();

    assert!(matches!(events.recv().await, Some(SweeperEvent::Started)));
    assert!(matches!(
        events.recv().await,
        Some(SweeperEvent::SweepStarted { run_number: 1 })
    ));
    match events.recv().await {
        Some(SweeperEvent::SweepCompleted { report, .. }) => assert_eq!(report.escalated, 1),
        other => panic!("expected SweepCompleted, got {other:?}"),
    }

    handle.stop();
    let stopped = tokio::time::timeout(StdDuration::from_secs(5), async {
        while let Some(event) = events.recv().await {
            if let SweeperEvent::Stopped { reason } = event {
                return Some(reason);
            }
        }
        None
    })
    .await
    .expect("sweeper did not stop");
    assert_eq!(stopped, Some(StopReason::Requested));

    let status = handle.status().await;
    assert!(!status.running);
    assert!(status.successful_runs >= 1);
    assert_eq!(status.total_escalated, 1);
}

#[tokio::test]
async fn test_idle_daemon_stops_without_waiting_for_next_tick() {
    let h = harness().await;
    let sweeper = ExpirySweeper::new(
        h.controller.clone(),
        SweeperConfig {
            interval_secs: 3600,
            ..fast_config()
        },
    );
    let handle = sweeper.handle();
    let mut events = sweeper.run();

    // Wait for the startup sweep so the loop is parked on its hour-long tick.
    loop {
        match events.recv().await {
            Some(SweeperEvent::SweepCompleted { .. }) => break,
            Some(_) => {}
            None => panic!("sweeper exited early"),
        }
    }

    handle.stop();
    let next = tokio::time::timeout(StdDuration::from_secs(2), events.recv())
        .await
        .expect("stop waited for the next tick");
    assert!(matches!(
        next,
        Some(SweeperEvent::Stopped { reason: StopReason::Requested })
    ));
    assert!(!handle.status().await.running);
}
