//! Integration tests for the routing engine
//!
//! These tests run the full stack against the virtual switch bank:
//! gateway, store, actor, and path classification end to end, including
//! fault injection for dead and half-dead controllers.

use std::time::Duration;

use coax_protocol::{SwitchId, SwitchPosition};
use coax_route::{
    actor, Classification, RouteConfig, RouteError, RouteEvent, StoreView, SwitchGateway,
    SwitchState,
};
use coax_sim::{spawn_bank, BankHandle, FaultMode, VirtualBankConfig};
use tokio::sync::mpsc;
use tokio::time::timeout;

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    /// Actor config tuned for tests: fast polling, fast failure
    pub fn fast_config() -> RouteConfig {
        RouteConfig {
            poll_interval: Duration::from_millis(200),
        }
    }

    /// Full stack over a virtual bank
    pub fn start_stack(
        config: VirtualBankConfig,
    ) -> (
        coax_route::RouteHandle,
        mpsc::Receiver<RouteEvent>,
        BankHandle,
    ) {
        let (host, bank) = spawn_bank(config);
        let gateway = SwitchGateway::new(host, Duration::from_millis(100));
        let (handle, events, _task) = actor::start(gateway, fast_config());
        (handle, events, bank)
    }

    /// Wait for the next state change, panicking after a second
    pub async fn next_change(events: &mut mpsc::Receiver<RouteEvent>) -> (StoreView, Classification) {
        loop {
            let event = timeout(Duration::from_secs(1), events.recv())
                .await
                .expect("no event within 1s")
                .expect("event stream closed");
            if let RouteEvent::StateChanged { view, path } = event {
                return (view, path.classification);
            }
        }
    }

    /// Wait until the store reports a connected state
    pub async fn wait_connected(events: &mut mpsc::Receiver<RouteEvent>) -> SwitchState {
        loop {
            let (view, _) = next_change(events).await;
            if let StoreView::Connected(state) = view {
                return state;
            }
        }
    }
}

use helpers::*;

// ============================================================================
// Reconciliation
// ============================================================================

#[tokio::test]
async fn test_first_poll_populates_store() {
    let (_handle, mut events, _bank) = start_stack(VirtualBankConfig::default());

    let state = wait_connected(&mut events).await;
    assert_eq!(
        state.triple(),
        [SwitchPosition::P1, SwitchPosition::P1, SwitchPosition::P1]
    );
}

#[tokio::test]
async fn test_set_reconciles_against_device_truth() {
    let (handle, mut events, bank) = start_stack(VirtualBankConfig::default());
    wait_connected(&mut events).await;

    handle
        .set_switch(SwitchId::S2, SwitchPosition::P2)
        .await
        .unwrap();

    let (view, _) = handle.query().await.unwrap();
    let state = view.state().expect("connected after successful set");
    assert_eq!(state.get(SwitchId::S2), SwitchPosition::P2);
    assert_eq!(bank.position(SwitchId::S2), SwitchPosition::P2);
}

#[tokio::test]
async fn test_poll_picks_up_out_of_band_change() {
    let (_handle, mut events, bank) = start_stack(VirtualBankConfig::default());
    wait_connected(&mut events).await;

    // Relay moves behind the host's back; the next poll must notice
    bank.set_position(SwitchId::S1, SwitchPosition::P2);

    let state = wait_connected(&mut events).await;
    assert_eq!(state.get(SwitchId::S1), SwitchPosition::P2);
}

#[tokio::test]
async fn test_refresh_reads_immediately() {
    let (handle, mut events, bank) = start_stack(VirtualBankConfig::default());
    wait_connected(&mut events).await;

    bank.set_position(SwitchId::S3, SwitchPosition::P2);

    let view = handle.refresh().await.unwrap();
    let state = view.state().expect("connected");
    assert_eq!(state.get(SwitchId::S3), SwitchPosition::P2);
}

// ============================================================================
// Path classification through the stack
// ============================================================================

#[tokio::test]
async fn test_drive_to_transmit_path() {
    let (handle, mut events, _bank) = start_stack(VirtualBankConfig::default());
    wait_connected(&mut events).await;

    handle
        .set_switch(SwitchId::S1, SwitchPosition::P1)
        .await
        .unwrap();
    handle
        .set_switch(SwitchId::S2, SwitchPosition::P2)
        .await
        .unwrap();
    handle
        .set_switch(SwitchId::S3, SwitchPosition::P2)
        .await
        .unwrap();

    let (_, path) = handle.query().await.unwrap();
    assert_eq!(path.classification, Classification::ValidTx);
    assert!(path.reaches);
}

#[tokio::test]
async fn test_drive_to_receive_path() {
    let (handle, mut events, _bank) = start_stack(VirtualBankConfig::default());
    wait_connected(&mut events).await;

    handle
        .set_switch(SwitchId::S1, SwitchPosition::P2)
        .await
        .unwrap();

    // S2 and S3 boot at P1, so one set completes the receive chain
    let (_, path) = handle.query().await.unwrap();
    assert_eq!(path.classification, Classification::ValidRx);
}

#[tokio::test]
async fn test_boot_state_is_misconfigured() {
    let (handle, mut events, _bank) = start_stack(VirtualBankConfig::default());
    wait_connected(&mut events).await;

    // All relays on P1 routes the TX source through the RX chain
    let (_, path) = handle.query().await.unwrap();
    assert_eq!(path.classification, Classification::Misconfigured);
}

#[tokio::test]
async fn test_split_switches_give_no_path() {
    let config = VirtualBankConfig {
        initial: [SwitchPosition::P1, SwitchPosition::P2, SwitchPosition::P1],
        fault: FaultMode::None,
    };
    let (handle, mut events, _bank) = start_stack(config);
    wait_connected(&mut events).await;

    let (_, path) = handle.query().await.unwrap();
    assert_eq!(path.classification, Classification::Inactive);
    assert!(!path.reaches);
}

// ============================================================================
// Fault handling
// ============================================================================

#[tokio::test]
async fn test_dead_device_goes_disconnected() {
    let (handle, mut events, bank) = start_stack(VirtualBankConfig::default());
    wait_connected(&mut events).await;

    bank.set_fault(FaultMode::DropReplies);

    let view = handle.refresh().await.unwrap();
    assert_eq!(view, StoreView::Disconnected);

    let (_, path) = handle.query().await.unwrap();
    assert_eq!(path.classification, Classification::Inactive);
}

#[tokio::test]
async fn test_partial_status_goes_disconnected() {
    let (handle, mut events, bank) = start_stack(VirtualBankConfig::default());
    wait_connected(&mut events).await;

    bank.set_fault(FaultMode::OmitSwitch(SwitchId::S2));

    let view = handle.refresh().await.unwrap();
    assert_eq!(view, StoreView::Disconnected);
}

#[tokio::test]
async fn test_recovers_after_fault_clears() {
    let (handle, mut events, bank) = start_stack(VirtualBankConfig::default());
    wait_connected(&mut events).await;

    bank.set_fault(FaultMode::DropReplies);
    assert_eq!(handle.refresh().await.unwrap(), StoreView::Disconnected);

    bank.set_fault(FaultMode::None);
    let view = handle.refresh().await.unwrap();
    assert!(view.is_connected());
}

#[tokio::test]
async fn test_rejected_set_surfaces_to_caller_only() {
    let (handle, mut events, bank) = start_stack(VirtualBankConfig::default());
    wait_connected(&mut events).await;

    bank.set_fault(FaultMode::RejectSets);

    let err = handle
        .set_switch(SwitchId::S1, SwitchPosition::P2)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RouteError::Device(coax_route::DeviceError::Rejected(_))
    ));
    assert_eq!(bank.position(SwitchId::S1), SwitchPosition::P1);

    // The rejection fails safe to disconnected first
    let (view, classification) = next_change(&mut events).await;
    assert_eq!(view, StoreView::Disconnected);
    assert_eq!(classification, Classification::Inactive);

    // Status still works, so the next poll recovers the real state
    let state = wait_connected(&mut events).await;
    assert_eq!(state.get(SwitchId::S1), SwitchPosition::P1);
}

#[tokio::test]
async fn test_failed_set_drops_store_to_disconnected() {
    let (handle, mut events, bank) = start_stack(VirtualBankConfig::default());
    wait_connected(&mut events).await;

    bank.set_fault(FaultMode::DropReplies);

    let err = handle
        .set_switch(SwitchId::S3, SwitchPosition::P2)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RouteError::Device(coax_route::DeviceError::Unreachable(_))
    ));

    let (view, path) = handle.query().await.unwrap();
    assert_eq!(view, StoreView::Disconnected);
    assert_eq!(path.classification, Classification::Inactive);
}

#[tokio::test]
async fn test_concurrent_set_same_switch_conflicts() {
    let (handle, mut events, bank) = start_stack(VirtualBankConfig::default());
    wait_connected(&mut events).await;

    // Stall the first set so the second lands while it is in flight
    bank.set_fault(FaultMode::DropReplies);

    let first = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.set_switch(SwitchId::S1, SwitchPosition::P2).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let err = handle
        .set_switch(SwitchId::S1, SwitchPosition::P1)
        .await
        .unwrap_err();
    assert!(matches!(err, RouteError::ConflictingCommand(SwitchId::S1)));

    // The first command still resolves on its own
    assert!(first.await.unwrap().is_err());
}

#[tokio::test]
async fn test_sets_for_different_switches_queue() {
    let (handle, mut events, _bank) = start_stack(VirtualBankConfig::default());
    wait_connected(&mut events).await;

    let a = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.set_switch(SwitchId::S2, SwitchPosition::P2).await })
    };
    let b = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.set_switch(SwitchId::S3, SwitchPosition::P2).await })
    };

    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let (view, _) = handle.query().await.unwrap();
    let state = view.state().unwrap();
    assert_eq!(state.get(SwitchId::S2), SwitchPosition::P2);
    assert_eq!(state.get(SwitchId::S3), SwitchPosition::P2);
}

#[tokio::test]
async fn test_shutdown_emits_stopped() {
    let (handle, mut events, _bank) = start_stack(VirtualBankConfig::default());
    wait_connected(&mut events).await;

    handle.shutdown().await;

    loop {
        match timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("no event within 1s")
        {
            Some(RouteEvent::Stopped) | None => break,
            Some(_) => continue,
        }
    }

    assert!(matches!(
        handle.query().await.unwrap_err(),
        RouteError::ActorGone
    ));
}

// ============================================================================
// Property tests
// ============================================================================

mod proptest_tests {
    use super::*;
    use coax_route::{compute_path, energize};
    use coax_sim::VirtualSwitchBank;
    use proptest::prelude::*;

    fn position() -> impl Strategy<Value = SwitchPosition> {
        prop_oneof![Just(SwitchPosition::P1), Just(SwitchPosition::P2)]
    }

    proptest! {
        /// STATUS always reports exactly what the relays hold
        #[test]
        fn bank_status_reflects_positions(
            s1 in position(),
            s2 in position(),
            s3 in position(),
        ) {
            let mut bank = VirtualSwitchBank::new();
            bank.set_position(SwitchId::S1, s1);
            bank.set_position(SwitchId::S2, s2);
            bank.set_position(SwitchId::S3, s3);

            let reply = bank.handle_line("STATUS").unwrap();
            prop_assert_eq!(
                reply,
                format!("STATE {}", SwitchState::new(s1, s2, s3))
            );
        }

        /// The antenna is reachable exactly when S2 and S3 agree
        #[test]
        fn antenna_reachable_iff_chain_agrees(
            s1 in position(),
            s2 in position(),
            s3 in position(),
        ) {
            let state = SwitchState::new(s1, s2, s3);
            prop_assert_eq!(energize(&state).reaches, s2 == s3);
        }

        /// Classification is a pure function of the connected state
        #[test]
        fn classification_is_deterministic(
            s1 in position(),
            s2 in position(),
            s3 in position(),
        ) {
            let view = StoreView::Connected(SwitchState::new(s1, s2, s3));
            prop_assert_eq!(compute_path(&view), compute_path(&view));
        }

        /// Exactly one source leg is ever energized, selected by S1
        #[test]
        fn single_source_energized(
            s1 in position(),
            s2 in position(),
            s3 in position(),
        ) {
            use coax_route::WIRING;

            let trace = energize(&SwitchState::new(s1, s2, s3));
            let tx_leg = trace.energized.contains(WIRING[0]);
            let rx_leg = trace.energized.contains(WIRING[2]);
            prop_assert_ne!(tx_leg, rx_leg);
            prop_assert_eq!(tx_leg, s1 == SwitchPosition::P1);
        }
    }
}
