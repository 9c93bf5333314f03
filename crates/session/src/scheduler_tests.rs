// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tokio::sync::broadcast::error::TryRecvError;

use super::*;

#[yare::parameterized(
    one_minute = { 60, 50 },
    just_above_lead = { 16, 6 },
    floor_applies = { 12, 5 },
    shorter_than_lead = { 3, 5 },
    zero = { 0, 5 },
    one_hour = { 3600, 3590 },
)]
fn expiry_delay(expires_in: u64, expected_secs: u64) {
    assert_eq!(SessionScheduler::expiry_delay(expires_in), Duration::from_secs(expected_secs));
}

#[tokio::test(start_paused = true)]
async fn fires_once_after_delay() -> anyhow::Result<()> {
    let bus = EventBus::default();
    let mut rx = bus.subscribe();
    let scheduler = SessionScheduler::new(bus.clone());

    let generation = scheduler.arm(Duration::from_secs(50));
    assert_eq!(scheduler.armed_delay(), Some(Duration::from_secs(50)));

    tokio::time::sleep(Duration::from_secs(49)).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(rx.try_recv()?, SessionEvent::TokenExpiring { generation });

    // Single-shot: nothing pending, nothing more fires.
    assert_eq!(scheduler.armed_delay(), None);
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn rearm_replaces_pending_timer() -> anyhow::Result<()> {
    let bus = EventBus::default();
    let mut rx = bus.subscribe();
    let scheduler = SessionScheduler::new(bus.clone());

    let first = scheduler.arm(Duration::from_secs(50));
    let second = scheduler.arm(Duration::from_secs(110));
    assert_ne!(first, second);
    assert_eq!(scheduler.armed_generation(), Some(second));

    tokio::time::sleep(Duration::from_secs(200)).await;
    assert_eq!(rx.try_recv()?, SessionEvent::TokenExpiring { generation: second });
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shorter_rearm_still_only_fires_latest() -> anyhow::Result<()> {
    let bus = EventBus::default();
    let mut rx = bus.subscribe();
    let scheduler = SessionScheduler::new(bus.clone());

    scheduler.arm(Duration::from_secs(300));
    let latest = scheduler.arm(Duration::from_secs(5));

    tokio::time::sleep(Duration::from_secs(400)).await;
    assert_eq!(rx.try_recv()?, SessionEvent::TokenExpiring { generation: latest });
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancel_prevents_firing() -> anyhow::Result<()> {
    let bus = EventBus::default();
    let mut rx = bus.subscribe();
    let scheduler = SessionScheduler::new(bus.clone());

    scheduler.arm(Duration::from_secs(10));
    scheduler.cancel();
    scheduler.cancel();
    assert_eq!(scheduler.armed_delay(), None);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    Ok(())
}

#[test]
fn arm_without_runtime_leaves_nothing_pending() {
    let scheduler = SessionScheduler::new(EventBus::default());
    let generation = scheduler.arm(Duration::from_secs(10));
    assert_eq!(generation, 1);
    assert_eq!(scheduler.armed_delay(), None);
}

#[tokio::test(start_paused = true)]
async fn tracks_current_generation() {
    let scheduler = SessionScheduler::new(EventBus::default());
    assert!(!scheduler.is_current(0));

    let first = scheduler.arm(Duration::from_secs(5));
    assert!(scheduler.is_current(first));
    let second = scheduler.arm(Duration::from_secs(5));
    assert!(!scheduler.is_current(first));
    assert!(scheduler.is_current(second));

    // Firing leaves the generation current until something replaces it.
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(scheduler.armed_generation(), None);
    assert!(scheduler.is_current(second));

    scheduler.cancel();
    assert!(!scheduler.is_current(second));
}
