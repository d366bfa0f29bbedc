//! USB session
//!
//! A session is one initialized device: the opened handle, its identity and
//! the interfaces claimed on it. Everything acquired on open is released when
//! the session is dropped, on every path.

use crate::usb::device::DeviceIo;
use protocol::{ControlSetup, DeviceIdentity, TransferOutcome, UsbError};
use tracing::{debug, error, info, warn};

pub struct UsbSession<D: DeviceIo> {
    device: D,
    /// `None` when the device descriptor could not be read
    identity: Option<DeviceIdentity>,
    /// Interfaces claimed by us, in claim order
    claimed_interfaces: Vec<u8>,
}

impl<D: DeviceIo> UsbSession<D> {
    /// Start a session on an opened device and claim `interface`
    ///
    /// A missing descriptor is only logged; failing to claim the interface
    /// fails the whole open and drops the device.
    pub fn open(device: D, interface: u8) -> Result<Self, UsbError> {
        let identity = match device.identity() {
            Ok(identity) => {
                info!("Native USB initialized for device {}", identity);
                Some(identity)
            }
            Err(e) => {
                error!("Failed to get device descriptor: {}", e);
                None
            }
        };

        let mut session = Self {
            device,
            identity,
            claimed_interfaces: Vec::new(),
        };
        session.claim(interface)?;

        Ok(session)
    }

    pub fn identity(&self) -> Option<&DeviceIdentity> {
        self.identity.as_ref()
    }

    pub fn claimed_interfaces(&self) -> &[u8] {
        &self.claimed_interfaces
    }

    /// Run a control transfer using the first `setup.length` bytes of `buffer`
    ///
    /// Short transfers are returned as such and logged; they are not retried.
    pub fn control_transfer(
        &mut self,
        setup: &ControlSetup,
        buffer: &mut [u8],
    ) -> Result<TransferOutcome, UsbError> {
        let available = buffer.len();
        let Some(data) = buffer.get_mut(..setup.length) else {
            warn!(
                "Control transfer buffer holds {} bytes, {} requested",
                available, setup.length
            );
            return Err(UsbError::InvalidParam);
        };

        match self.device.control(setup, data) {
            Ok(transferred) => {
                let outcome = TransferOutcome::classify(transferred, setup.length);
                if outcome.is_short() {
                    warn!(
                        "Control transfer short: {} of {} bytes (request {:#x})",
                        transferred, setup.length, setup.request
                    );
                } else {
                    debug!("Control transfer succeeded: {} bytes", transferred);
                }
                Ok(outcome)
            }
            Err(e) => {
                error!(
                    "Control transfer error: {} ({}) (request {:#x})",
                    e,
                    e.code(),
                    setup.request
                );
                Err(e)
            }
        }
    }

    /// Select an alternate setting, claiming the interface first if needed
    pub fn select_alternate_setting(&mut self, interface: u8, setting: u8) -> Result<(), UsbError> {
        if !self.claimed_interfaces.contains(&interface) {
            self.claim(interface)?;
        }

        self.device
            .set_alternate_setting(interface, setting)
            .inspect_err(|e| {
                warn!(
                    "Failed to select alternate setting {} on interface {}: {}",
                    setting, interface, e
                );
            })?;

        debug!(
            "Selected alternate setting {} on interface {}",
            setting, interface
        );
        Ok(())
    }

    fn claim(&mut self, interface: u8) -> Result<(), UsbError> {
        self.device.claim_interface(interface).inspect_err(|e| {
            warn!("Failed to claim interface {}: {}", interface, e);
        })?;

        debug!("Claimed interface {}", interface);
        self.claimed_interfaces.push(interface);
        Ok(())
    }
}

impl<D: DeviceIo> Drop for UsbSession<D> {
    fn drop(&mut self) {
        for interface in self.claimed_interfaces.drain(..).rev() {
            if let Err(e) = self.device.release_interface(interface) {
                warn!("Failed to release interface {}: {}", interface, e);
            } else {
                debug!("Released interface {}", interface);
            }
        }

        match &self.identity {
            Some(identity) => debug!("Closed session for device {}", identity),
            None => debug!("Closed session"),
        }
    }
}
