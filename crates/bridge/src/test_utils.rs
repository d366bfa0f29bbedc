//! Test utilities for the USB bridge
//!
//! Provides a scripted `DeviceIo` implementation so sessions and the bridge
//! can be exercised without hardware or a JVM.
//!
//! # Example
//!
//! ```
//! use usb_runtime::test_utils::{MockDevice, MockResponse};
//! use usb_runtime::usb::UsbSession;
//!
//! let device = MockDevice::new().with_response(MockResponse::Data(vec![0x01, 0x02]));
//! let log = device.log();
//!
//! let session = UsbSession::open(device, 0).unwrap();
//! assert_eq!(log.lock().unwrap().claimed, vec![0]);
//! # drop(session);
//! ```

use crate::usb::DeviceIo;
use protocol::{ControlSetup, DeviceIdentity, Direction, UsbError};
use std::sync::{Arc, Mutex};

/// How the mock answers control transfers
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// IN: copy these bytes (truncated to the buffer). OUT: accept everything.
    Data(Vec<u8>),
    /// Report this many bytes transferred without touching the buffer
    Accept(usize),
    /// Fail every transfer
    Fail(UsbError),
}

/// Everything the mock was asked to do
#[derive(Debug, Default)]
pub struct MockLog {
    pub claimed: Vec<u8>,
    pub released: Vec<u8>,
    pub alternate_settings: Vec<(u8, u8)>,
    pub controls: Vec<ControlSetup>,
    /// Data stages of OUT transfers
    pub written: Vec<Vec<u8>>,
}

pub struct MockDevice {
    identity: Result<DeviceIdentity, UsbError>,
    claim_error: Option<UsbError>,
    response: MockResponse,
    log: Arc<Mutex<MockLog>>,
}

impl MockDevice {
    /// Logitech C920-like device that answers IN transfers with zeros
    pub fn new() -> Self {
        Self {
            identity: Ok(mock_identity(0x046d, 0x082d)),
            claim_error: None,
            response: MockResponse::Data(Vec::new()),
            log: Arc::new(Mutex::new(MockLog::default())),
        }
    }

    pub fn with_identity(mut self, identity: DeviceIdentity) -> Self {
        self.identity = Ok(identity);
        self
    }

    pub fn with_identity_error(mut self, error: UsbError) -> Self {
        self.identity = Err(error);
        self
    }

    pub fn with_claim_error(mut self, error: UsbError) -> Self {
        self.claim_error = Some(error);
        self
    }

    pub fn with_response(mut self, response: MockResponse) -> Self {
        self.response = response;
        self
    }

    /// Shared call log, still readable after the device moved into a session
    pub fn log(&self) -> Arc<Mutex<MockLog>> {
        Arc::clone(&self.log)
    }

    fn record<F: FnOnce(&mut MockLog)>(&self, f: F) {
        let mut log = self
            .log
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut log);
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceIo for MockDevice {
    fn identity(&self) -> Result<DeviceIdentity, UsbError> {
        self.identity.clone()
    }

    fn claim_interface(&mut self, interface: u8) -> Result<(), UsbError> {
        if let Some(error) = self.claim_error {
            return Err(error);
        }
        self.record(|log| log.claimed.push(interface));
        Ok(())
    }

    fn release_interface(&mut self, interface: u8) -> Result<(), UsbError> {
        self.record(|log| log.released.push(interface));
        Ok(())
    }

    fn set_alternate_setting(&mut self, interface: u8, setting: u8) -> Result<(), UsbError> {
        self.record(|log| log.alternate_settings.push((interface, setting)));
        Ok(())
    }

    fn control(&mut self, setup: &ControlSetup, buffer: &mut [u8]) -> Result<usize, UsbError> {
        self.record(|log| {
            log.controls.push(setup.clone());
            if setup.direction() == Direction::Out {
                log.written.push(buffer.to_vec());
            }
        });

        match (&self.response, setup.direction()) {
            (MockResponse::Fail(error), _) => Err(*error),
            (MockResponse::Accept(count), _) => Ok((*count).min(buffer.len())),
            (MockResponse::Data(data), Direction::In) => {
                // An empty script answers with a full buffer of zeros.
                if data.is_empty() {
                    buffer.fill(0);
                    return Ok(buffer.len());
                }
                let count = data.len().min(buffer.len());
                buffer[..count].copy_from_slice(&data[..count]);
                Ok(count)
            }
            (MockResponse::Data(_), Direction::Out) => Ok(buffer.len()),
        }
    }
}

/// Identity on bus 1, address 2, behind port 1.4
pub fn mock_identity(vendor_id: u16, product_id: u16) -> DeviceIdentity {
    DeviceIdentity {
        vendor_id,
        product_id,
        bus_number: 1,
        address: 2,
        port_path: vec![1, 4],
    }
}
