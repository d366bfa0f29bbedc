//! Integration tests for the session registry
//!
//! Drives the same operations the native entry points use, with a scripted
//! device instead of libusb.
//!
//! # Test Scenarios
//! - Initialize success and failure
//! - Control transfers: full, short, failing, OUT data stage
//! - Deinitialize idempotence
//! - Isochronous stub
//! - Independent concurrent sessions
//!
//! Run with: `cargo test -p bridge --test bridge_tests`

use protocol::{ControlSetup, StatusCode, TransferOutcome, UsbError};
use std::sync::Arc;
use std::thread;
use usb_runtime::test_utils::{MockDevice, MockResponse, mock_identity};
use usb_runtime::usb::RusbDevice;
use usb_runtime::{Bridge, BridgeConfig};

fn new_bridge() -> Bridge<MockDevice> {
    Bridge::new(BridgeConfig::default())
}

/// GET_CUR of the VS probe control, 26 bytes
fn probe_get_cur() -> ControlSetup {
    ControlSetup::from_raw(0xa1, 0x81, 0x0100, 0x0001, 26, 2000).unwrap()
}

/// SET_CUR of the VS commit control, 26 bytes
fn commit_set_cur() -> ControlSetup {
    ControlSetup::from_raw(0x21, 0x01, 0x0200, 0x0001, 26, 2000).unwrap()
}

// ============================================================================
// Initialize
// ============================================================================

#[test]
fn test_failed_initialize_stores_no_session() {
    let bridge = new_bridge();

    let result = bridge.initialize(|_| Err(UsbError::NoDevice));

    assert_eq!(result.status_code(), UsbError::NoDevice.code());
    assert!(result.status_code() < 0);
    assert_eq!(bridge.active_sessions(), 0);
}

#[cfg(unix)]
#[test]
fn test_invalid_fd_stores_no_session() {
    let bridge: Bridge<RusbDevice> = Bridge::new(BridgeConfig::default());

    let result = bridge.initialize(|usb| RusbDevice::from_fd(-1, usb.detach_kernel_driver));

    assert_eq!(result.status_code(), UsbError::InvalidParam.code());
    assert_eq!(bridge.active_sessions(), 0);
}

#[test]
fn test_failed_claim_stores_no_session() {
    let bridge = new_bridge();

    let result = bridge.initialize(|_| Ok(MockDevice::new().with_claim_error(UsbError::Access)));

    assert_eq!(result.status_code(), -3);
    assert_eq!(bridge.active_sessions(), 0);
}

#[test]
fn test_initialize_returns_zero_and_registers() {
    let bridge = new_bridge();

    let result = bridge.initialize(|_| Ok(MockDevice::new()));

    assert_eq!(result.status_code(), 0);
    assert_eq!(bridge.active_sessions(), 1);
}

#[test]
fn test_transfers_use_the_initialized_device() {
    let bridge = new_bridge();
    let device = MockDevice::new();
    let log = device.log();

    let id = bridge.initialize(|_| Ok(device)).unwrap();
    let mut buffer = vec![0u8; 26];
    bridge
        .control_transfer(Some(id), &probe_get_cur(), &mut buffer)
        .unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.controls, vec![probe_get_cur()]);
}

// ============================================================================
// Control transfers
// ============================================================================

#[test]
fn test_full_in_transfer_returns_length_and_fills_buffer() {
    let bridge = new_bridge();
    let probe: Vec<u8> = (0..26).collect();
    let id = bridge
        .initialize(|_| Ok(MockDevice::new().with_response(MockResponse::Data(probe.clone()))))
        .unwrap();

    let mut buffer = vec![0u8; 26];
    let result = bridge.control_transfer(Some(id), &probe_get_cur(), &mut buffer);

    assert_eq!(result, Ok(TransferOutcome::Complete { transferred: 26 }));
    assert_eq!(result.status_code(), 26);
    assert_eq!(buffer, probe);
}

#[test]
fn test_short_in_transfer_returns_actual_count() {
    let bridge = new_bridge();
    let id = bridge
        .initialize(|_| Ok(MockDevice::new().with_response(MockResponse::Data(vec![0xaa; 11]))))
        .unwrap();

    let mut buffer = vec![0u8; 26];
    let result = bridge.control_transfer(Some(id), &probe_get_cur(), &mut buffer);

    assert_eq!(result.status_code(), 11);
    assert!(result.unwrap().is_short());
    assert_eq!(&buffer[..11], &[0xaa; 11]);
    assert_eq!(&buffer[11..], &[0u8; 15]);
}

#[test]
fn test_failed_transfer_returns_error_code() {
    let bridge = new_bridge();
    let id = bridge
        .initialize(|_| Ok(MockDevice::new().with_response(MockResponse::Fail(UsbError::Pipe))))
        .unwrap();

    let mut buffer = vec![0u8; 26];
    let result = bridge.control_transfer(Some(id), &probe_get_cur(), &mut buffer);

    assert_eq!(result, Err(UsbError::Pipe));
    assert_eq!(result.status_code(), -9);
}

#[test]
fn test_out_transfer_sends_data_stage() {
    let bridge = new_bridge();
    let device = MockDevice::new();
    let log = device.log();
    let id = bridge.initialize(|_| Ok(device)).unwrap();

    let mut commit = vec![0x01, 0x00, 0x01, 0x01];
    commit.resize(26, 0);
    let result = bridge.control_transfer(Some(id), &commit_set_cur(), &mut commit.clone());

    assert_eq!(result.status_code(), 26);
    assert_eq!(log.lock().unwrap().written, vec![commit]);
}

#[test]
fn test_short_out_transfer_is_not_an_error() {
    let bridge = new_bridge();
    let id = bridge
        .initialize(|_| Ok(MockDevice::new().with_response(MockResponse::Accept(8))))
        .unwrap();

    let mut buffer = vec![0u8; 26];
    let result = bridge.control_transfer(Some(id), &commit_set_cur(), &mut buffer);

    assert_eq!(result.status_code(), 8);
}

#[test]
fn test_transfer_before_initialize_is_no_device() {
    let bridge = new_bridge();
    let mut buffer = vec![0u8; 26];

    let result = bridge.control_transfer(None, &probe_get_cur(), &mut buffer);

    assert_eq!(result, Err(UsbError::NoDevice));
}

#[test]
fn test_transfer_after_deinitialize_is_no_device() {
    let bridge = new_bridge();
    let id = bridge.initialize(|_| Ok(MockDevice::new())).unwrap();
    bridge.deinitialize(Some(id));

    let mut buffer = vec![0u8; 26];
    let result = bridge.control_transfer(Some(id), &probe_get_cur(), &mut buffer);

    assert_eq!(result, Err(UsbError::NoDevice));
}

// ============================================================================
// Deinitialize
// ============================================================================

#[test]
fn test_deinitialize_twice_is_safe() {
    let bridge = new_bridge();
    let device = MockDevice::new();
    let log = device.log();
    let id = bridge.initialize(|_| Ok(device)).unwrap();

    assert!(bridge.deinitialize(Some(id)));
    assert!(!bridge.deinitialize(Some(id)));
    assert_eq!(bridge.active_sessions(), 0);

    // Interface released exactly once
    assert_eq!(log.lock().unwrap().released, vec![0]);
}

#[test]
fn test_deinitialize_without_session_is_noop() {
    let bridge = new_bridge();

    assert!(!bridge.deinitialize(None));
    assert!(!bridge.deinitialize(None));
    assert_eq!(bridge.active_sessions(), 0);
}

// ============================================================================
// Alternate settings
// ============================================================================

#[test]
fn test_select_alternate_setting_claims_streaming_interface() {
    let bridge = new_bridge();
    let device = MockDevice::new();
    let log = device.log();
    let id = bridge.initialize(|_| Ok(device)).unwrap();

    bridge.select_alternate_setting(Some(id), 1, 6).unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.claimed, vec![0, 1]);
    assert_eq!(log.alternate_settings, vec![(1, 6)]);
}

#[test]
fn test_select_alternate_setting_without_session() {
    let bridge = new_bridge();

    assert_eq!(
        bridge.select_alternate_setting(None, 1, 0),
        Err(UsbError::NoDevice)
    );
}

// ============================================================================
// Isochronous stub
// ============================================================================

#[test]
fn test_isochronous_transfer_always_returns_zero() {
    let bridge = new_bridge();
    assert_eq!(bridge.isochronous_transfer(None, None), 0);
    assert_eq!(bridge.isochronous_transfer(None, Some(3072)), 0);

    let id = bridge.initialize(|_| Ok(MockDevice::new())).unwrap();
    assert_eq!(bridge.isochronous_transfer(Some(id), Some(0)), 0);
    assert_eq!(bridge.isochronous_transfer(Some(id), Some(1 << 20)), 0);
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_sessions_are_independent() {
    let bridge = new_bridge();
    let camera = MockDevice::new()
        .with_identity(mock_identity(0x046d, 0x082d))
        .with_response(MockResponse::Data(vec![1; 26]));
    let capture = MockDevice::new()
        .with_identity(mock_identity(0x1bcf, 0x2c99))
        .with_response(MockResponse::Data(vec![2; 26]));

    let first = bridge.initialize(|_| Ok(camera)).unwrap();
    let second = bridge.initialize(|_| Ok(capture)).unwrap();
    assert_eq!(bridge.active_sessions(), 2);

    let mut buffer = vec![0u8; 26];
    bridge
        .control_transfer(Some(second), &probe_get_cur(), &mut buffer)
        .unwrap();
    assert_eq!(buffer, vec![2; 26]);

    bridge.deinitialize(Some(second));
    bridge
        .control_transfer(Some(first), &probe_get_cur(), &mut buffer)
        .unwrap();
    assert_eq!(buffer, vec![1; 26]);
}

#[test]
fn test_concurrent_transfers_on_one_session() {
    let bridge = Arc::new(new_bridge());
    let device = MockDevice::new();
    let log = device.log();
    let id = bridge.initialize(|_| Ok(device)).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let bridge = Arc::clone(&bridge);
            thread::spawn(move || {
                for _ in 0..25 {
                    let mut buffer = vec![0u8; 26];
                    let result = bridge.control_transfer(Some(id), &probe_get_cur(), &mut buffer);
                    assert_eq!(result.status_code(), 26);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Transfer thread panicked");
    }

    assert_eq!(log.lock().unwrap().controls.len(), 200);
}

#[test]
fn test_deinitialize_while_other_thread_transfers() {
    let bridge = Arc::new(new_bridge());
    let device = MockDevice::new();
    let log = device.log();
    let id = bridge.initialize(|_| Ok(device)).unwrap();

    let worker = {
        let bridge = Arc::clone(&bridge);
        thread::spawn(move || {
            let mut statuses = Vec::new();
            for _ in 0..100 {
                let mut buffer = vec![0u8; 26];
                let result = bridge.control_transfer(Some(id), &probe_get_cur(), &mut buffer);
                statuses.push(result.status_code());
            }
            statuses
        })
    };

    bridge.deinitialize(Some(id));
    let statuses = worker.join().expect("Transfer thread panicked");

    // Every call either completed or saw the session gone.
    assert!(
        statuses
            .iter()
            .all(|&status| status == 26 || status == UsbError::NoDevice.code())
    );
    assert_eq!(log.lock().unwrap().released, vec![0]);
}
