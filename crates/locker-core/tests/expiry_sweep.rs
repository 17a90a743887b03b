//! Expiry sweep scenarios
//!
//! Uses a manual clock to walk tickets across the retention boundary.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use locker_core::{
    spawn_configured_cleanup, LockerConfig, LockerError, LockerService, ManualClock, SizeTier,
};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

fn reference_service() -> (Arc<ManualClock>, Arc<LockerService>) {
    let clock = Arc::new(ManualClock::new(1000));
    let service = LockerService::new(LockerConfig::default(), clock.clone()).unwrap();
    (clock, Arc::new(service))
}

#[test]
fn test_reference_walkthrough() {
    let (clock, service) = reference_service();

    let first = service.deposit(SizeTier::Small).unwrap();
    assert_eq!(first.to_string(), "Ticket{lockerId='S-0', code='S-0-1000', creationTime=1000}");

    for _ in 0..9 {
        service.deposit(SizeTier::Small).unwrap();
    }
    let upgraded = service.deposit(SizeTier::Small).unwrap();
    assert_eq!(upgraded.compartment.to_string(), "M-0");

    let receipt = service.pickup(first.code.as_str()).unwrap();
    assert_eq!(receipt.to_string(), "Locker S-0 opened. Package retrieved.");

    let large = service.deposit(SizeTier::Large).unwrap();
    clock.advance(4 * DAY);

    let report = service.cleanup();
    // Every ticket above predates the jump, so all of them go
    assert_eq!(report.reclaimed.len(), 11);
    assert!(report.reclaimed.contains(&large.compartment));
    assert_eq!(report.remaining, 0);
    assert_matches!(
        service.pickup(large.code.as_str()),
        Err(LockerError::InvalidCode { .. })
    );
    for tier in SizeTier::ALL {
        assert_eq!(service.available(tier), 10);
    }
}

#[test]
fn test_expired_compartment_is_reusable() {
    let (clock, service) = reference_service();
    for _ in 0..10 {
        service.deposit(SizeTier::Large).unwrap();
    }
    assert_matches!(
        service.deposit(SizeTier::Large),
        Err(LockerError::CapacityExhausted { .. })
    );

    clock.advance(3 * DAY);
    assert_eq!(service.cleanup().reclaimed.len(), 10);

    let reused = service.deposit(SizeTier::Large).unwrap();
    assert_eq!(reused.compartment.to_string(), "L-0");
}

#[test]
fn test_retention_measured_from_creation() {
    let (clock, service) = reference_service();
    let ticket = service.deposit(SizeTier::Medium).unwrap();

    // Checking validity does not refresh the ticket
    for _ in 0..3 {
        clock.advance(DAY - Duration::from_millis(1));
        assert!(service.is_valid(ticket.code.as_str()));
        service.cleanup();
    }
    clock.advance(Duration::from_millis(3));
    assert_eq!(service.cleanup().reclaimed, vec![ticket.compartment]);
}

#[test]
fn test_young_tickets_survive_sweep() {
    let (clock, service) = reference_service();
    let ticket = service.deposit(SizeTier::Small).unwrap();
    clock.advance(3 * DAY - Duration::from_millis(1));

    let report = service.cleanup();
    assert!(report.is_empty());
    assert_eq!(report.remaining, 1);
    assert!(service.pickup(ticket.code.as_str()).is_ok());
}

#[test]
fn test_clock_behind_ticket_does_not_expire() {
    let (clock, service) = reference_service();
    let ticket = service.deposit(SizeTier::Small).unwrap();
    clock.set(0);

    assert!(service.cleanup().is_empty());
    assert!(service.is_valid(ticket.code.as_str()));
}

#[tokio::test]
async fn test_configured_sweeper_reclaims_in_background() {
    let clock = Arc::new(ManualClock::new(0));
    let mut config = LockerConfig::default().with_retention(Duration::from_millis(50));
    config.sweep_interval_ms = Some(5);
    let service = Arc::new(LockerService::new(config, clock.clone()).unwrap());

    let task = spawn_configured_cleanup(&service).unwrap();
    let ticket = service.deposit(SizeTier::Medium).unwrap();
    clock.advance(Duration::from_millis(50));

    for _ in 0..200 {
        if service.active_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert!(!service.is_valid(ticket.code.as_str()));
    assert_eq!(service.statistics().expired_reclaims, 1);
    task.shutdown().await;
}
