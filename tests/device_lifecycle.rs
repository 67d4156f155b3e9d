// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the device connection lifecycle and output
//! streaming, driven through the in-memory transport.

use std::sync::Arc;
use std::time::Duration;

use brickctl::protocol::{
    DEVICE_INFORMATION_SERVICE, Endpoint, FIRMWARE_REVISION_CHAR, MODEL_NUMBER_CHAR,
    MemoryPeripheral, MemoryTransport,
};
use brickctl::{
    ChannelValue, ConnectionState, ControlConfig, Device, DeviceError, DeviceFamily, Error,
    FamilyCodec, OutputCodec, StateChange,
};
use parking_lot::Mutex;
use tokio::time::{sleep, timeout};

const ADDR: &str = "00:11:22:33:44:55";

/// BuWizz frame for `[50, -30, 0, 0]`.
const REFERENCE_FRAME: [u8; 5] = [0x8C, 0x47, 0x00, 0x00, 0x14];
/// BuWizz frame with every channel neutral.
const NEUTRAL_FRAME: [u8; 5] = [0x80, 0x00, 0x00, 0x00, 0x14];

fn setup(peripheral: MemoryPeripheral) -> (Arc<MemoryTransport>, Device<MemoryTransport>) {
    let transport = Arc::new(MemoryTransport::new());
    transport.add_peripheral(peripheral);
    let device = Device::new(
        DeviceFamily::BuWizz,
        "Crane",
        ADDR,
        Arc::clone(&transport),
        ControlConfig::default(),
    );
    (transport, device)
}

fn buwizz() -> MemoryPeripheral {
    MemoryPeripheral::for_family(DeviceFamily::BuWizz, ADDR)
}

/// Records every state change the device publishes.
fn record_changes(device: &Device<MemoryTransport>) -> Arc<Mutex<Vec<StateChange>>> {
    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changes);
    device.subscribe(move |change| sink.lock().push(change.clone()));
    changes
}

async fn wait_for_state(device: &Device<MemoryTransport>, state: ConnectionState) {
    let mut rx = device.watch_state();
    timeout(Duration::from_secs(5), rx.wait_for(|s| *s == state))
        .await
        .unwrap_or_else(|_| panic!("device never reached {state}"))
        .unwrap();
}

async fn connected(peripheral: MemoryPeripheral) -> (Arc<MemoryTransport>, Device<MemoryTransport>) {
    let (transport, device) = setup(peripheral);
    device.connect().unwrap();
    wait_for_state(&device, ConnectionState::Connected).await;
    (transport, device)
}

// ============================================================================
// State Machine
// ============================================================================

mod state_machine {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn full_cycle_publishes_every_transition() {
        let (transport, device) = setup(buwizz());
        let changes = record_changes(&device);

        device.connect().unwrap();
        wait_for_state(&device, ConnectionState::Connected).await;
        assert!(transport.is_connected(ADDR));

        device.disconnect().unwrap();
        wait_for_state(&device, ConnectionState::Disconnected).await;

        let seen: Vec<(ConnectionState, ConnectionState)> = changes
            .lock()
            .iter()
            .map(|c| (c.previous, c.current))
            .collect();
        assert_eq!(
            seen,
            vec![
                (ConnectionState::Disconnected, ConnectionState::Connecting),
                (ConnectionState::Connecting, ConnectionState::Connected),
                (ConnectionState::Connected, ConnectionState::Disconnecting),
                (ConnectionState::Disconnecting, ConnectionState::Disconnected),
            ]
        );
        assert!(changes.lock().iter().all(|c| !c.is_failure()));
        assert_eq!(transport.session_counts(ADDR), (1, 1));
        assert!(!transport.is_connected(ADDR));
    }

    #[tokio::test(start_paused = true)]
    async fn connect_is_rejected_unless_disconnected() {
        let (_transport, device) = setup(buwizz());
        device.connect().unwrap();

        let err = device.connect().unwrap_err();
        assert!(matches!(
            err,
            Error::Device(DeviceError::InvalidTransition {
                state: ConnectionState::Connecting,
                ..
            })
        ));

        wait_for_state(&device, ConnectionState::Connected).await;
        assert!(device.connect().is_err());
        assert_eq!(device.connection_state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn disconnect_is_rejected_when_disconnected() {
        let (_transport, device) = setup(buwizz());
        let changes = record_changes(&device);

        assert!(device.disconnect().is_err());
        assert!(changes.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_cancels_pending_connect() {
        let (transport, device) = setup(buwizz().with_connect_delay(Duration::from_secs(2)));
        let changes = record_changes(&device);

        device.connect().unwrap();
        device.disconnect().unwrap();
        wait_for_state(&device, ConnectionState::Disconnected).await;

        let last = changes.lock().last().cloned().unwrap();
        assert_eq!(last.previous, ConnectionState::Disconnecting);
        assert!(!last.is_failure());
        assert_eq!(transport.session_counts(ADDR), (0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_reuses_the_device() {
        let (transport, device) = connected(buwizz()).await;
        device.disconnect().unwrap();
        wait_for_state(&device, ConnectionState::Disconnected).await;

        device.connect().unwrap();
        wait_for_state(&device, ConnectionState::Connected).await;
        assert_eq!(transport.session_counts(ADDR), (2, 1));
    }
}

// ============================================================================
// Transport Failures
// ============================================================================

mod failures {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn connect_failure_reports_error() {
        let (transport, device) = setup(buwizz());
        transport.fail_next_connect(ADDR, "out of range");
        let changes = record_changes(&device);

        device.connect().unwrap();
        wait_for_state(&device, ConnectionState::Disconnected).await;

        let last = changes.lock().last().cloned().unwrap();
        assert_eq!(last.previous, ConnectionState::Connecting);
        assert_eq!(
            last.error.as_deref(),
            Some("connection failed: out of range")
        );

        // Retry is up to the caller
        device.connect().unwrap();
        wait_for_state(&device, ConnectionState::Connected).await;
    }

    #[tokio::test(start_paused = true)]
    async fn missing_service_fails_setup() {
        let (transport, device) = setup(MemoryPeripheral::new(ADDR));
        let changes = record_changes(&device);

        device.connect().unwrap();
        wait_for_state(&device, ConnectionState::Disconnected).await;

        let last = changes.lock().last().cloned().unwrap();
        assert!(last.error.unwrap().starts_with("service"));
        assert_eq!(transport.session_counts(ADDR), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn link_loss_resets_outputs() {
        let (transport, device) = connected(buwizz()).await;
        let changes = record_changes(&device);
        device.set_output(0, 90);
        sleep(Duration::from_millis(100)).await;

        assert!(transport.drop_link(ADDR));
        wait_for_state(&device, ConnectionState::Disconnected).await;

        let last = changes.lock().last().cloned().unwrap();
        assert_eq!(last.previous, ConnectionState::Connected);
        assert_eq!(last.error.as_deref(), Some("link lost"));
        assert_eq!(device.outputs(), vec![0; 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn link_loss_while_connecting_lands_disconnected() {
        let (transport, device) = setup(buwizz().with_stalled_discovery());
        let changes = record_changes(&device);
        device.connect().unwrap();
        sleep(Duration::from_millis(50)).await;
        assert_eq!(device.connection_state(), ConnectionState::Connecting);
        device.set_output(0, 50);

        assert!(transport.drop_link(ADDR));
        wait_for_state(&device, ConnectionState::Disconnected).await;

        let last = changes.lock().last().cloned().unwrap();
        assert_eq!(last.previous, ConnectionState::Connecting);
        assert_eq!(last.error.as_deref(), Some("link lost"));
        assert_eq!(device.outputs(), vec![0; 4]);
        assert!(transport.writes(ADDR).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn write_failure_ends_connection() {
        let (transport, device) = connected(buwizz()).await;
        let changes = record_changes(&device);
        transport.fail_writes(ADDR, true);

        device.set_output(2, 30);
        wait_for_state(&device, ConnectionState::Disconnected).await;

        let last = changes.lock().last().cloned().unwrap();
        assert!(last.error.unwrap().starts_with("write failed"));
        assert_eq!(transport.session_counts(ADDR), (1, 1));
    }
}

// ============================================================================
// Output Streaming
// ============================================================================

mod streaming {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn nothing_is_sent_while_idle() {
        let (transport, _device) = connected(buwizz()).await;
        sleep(Duration::from_millis(500)).await;
        assert!(transport.writes(ADDR).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn values_are_resent_every_tick() {
        let (transport, device) = connected(buwizz()).await;

        device.set_outputs(&[ChannelValue::new(0, 50), ChannelValue::new(1, -30)]);
        sleep(Duration::from_millis(250)).await;

        let writes = transport.writes(ADDR);
        assert!(writes.len() >= 3, "expected repeated frames, got {}", writes.len());
        assert!(writes.iter().all(|frame| frame.as_slice() == REFERENCE_FRAME));
    }

    #[tokio::test(start_paused = true)]
    async fn one_stop_frame_then_silence() {
        let (transport, device) = connected(buwizz()).await;

        device.set_output(0, 80);
        sleep(Duration::from_millis(200)).await;
        device.set_output(0, 0);
        sleep(Duration::from_millis(500)).await;

        let writes = transport.writes(ADDR);
        let neutral = writes
            .iter()
            .filter(|frame| frame.as_slice() == NEUTRAL_FRAME)
            .count();
        assert_eq!(neutral, 1);
        assert_eq!(writes.last().map(Vec::as_slice), Some(&NEUTRAL_FRAME[..]));

        let settled = writes.len();
        sleep(Duration::from_millis(500)).await;
        assert_eq!(transport.writes(ADDR).len(), settled);
    }

    #[tokio::test(start_paused = true)]
    async fn neutral_write_on_idle_device_sends_nothing() {
        let (transport, device) = connected(buwizz()).await;

        device.set_output(1, 0);
        sleep(Duration::from_millis(300)).await;

        assert!(transport.writes(ADDR).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn values_set_while_disconnected_are_not_replayed() {
        let (transport, device) = setup(buwizz());
        device.set_output(0, 100);

        device.connect().unwrap();
        wait_for_state(&device, ConnectionState::Connected).await;
        sleep(Duration::from_millis(300)).await;

        assert_eq!(device.outputs(), vec![0; 4]);
        assert!(transport.writes(ADDR).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn no_writes_after_disconnect() {
        let (transport, device) = connected(buwizz()).await;
        device.set_output(3, -100);
        sleep(Duration::from_millis(200)).await;

        device.disconnect().unwrap();
        wait_for_state(&device, ConnectionState::Disconnected).await;
        let sent = transport.writes(ADDR).len();

        device.set_output(3, 100);
        sleep(Duration::from_millis(500)).await;
        assert_eq!(transport.writes(ADDR).len(), sent);
    }

    #[tokio::test(start_paused = true)]
    async fn sbrick_frames_reach_its_characteristic() {
        let transport = Arc::new(MemoryTransport::new());
        transport.add_peripheral(MemoryPeripheral::for_family(DeviceFamily::SBrick, ADDR));
        let device = Device::new(
            DeviceFamily::SBrick,
            "Loader",
            ADDR,
            Arc::clone(&transport),
            ControlConfig::default(),
        );
        device.connect().unwrap();
        wait_for_state(&device, ConnectionState::Connected).await;

        device.set_output(1, -255);
        sleep(Duration::from_millis(100)).await;

        let (endpoint, bytes) = transport.written_frames(ADDR).remove(0);
        assert_eq!(endpoint, FamilyCodec::for_family(DeviceFamily::SBrick).endpoint());
        assert_eq!(
            bytes,
            vec![0x01, 0, 0x00, 0, 1, 0x01, 0xFF, 2, 0x00, 0, 3, 0x00, 0]
        );
    }
}

// ============================================================================
// Device Information
// ============================================================================

mod device_info {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn read_while_connecting_and_cleared_on_disconnect() {
        let peripheral = buwizz()
            .with_value(
                Endpoint::new(DEVICE_INFORMATION_SERVICE, MODEL_NUMBER_CHAR),
                "BuWizz 2.0",
            )
            .with_value(
                Endpoint::new(DEVICE_INFORMATION_SERVICE, FIRMWARE_REVISION_CHAR),
                "1.22",
            );
        let (_transport, device) = connected(peripheral).await;

        let info = device.device_info().unwrap();
        assert_eq!(info.model.as_deref(), Some("BuWizz 2.0"));
        assert_eq!(info.firmware.as_deref(), Some("1.22"));

        device.disconnect().unwrap();
        wait_for_state(&device, ConnectionState::Disconnected).await;
        assert!(device.device_info().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn absent_without_information_service() {
        let (_transport, device) = connected(buwizz()).await;
        assert!(device.device_info().is_none());
    }
}
