//! USB device abstraction
//!
//! `DeviceIo` is the seam between a session and libusb. `RusbDevice` is the
//! production implementation: a rusb handle wrapped around a file descriptor
//! that Android's `UsbManager` already opened and granted.

use crate::usb::transfers::{execute_control_transfer, map_rusb_error};
use protocol::{ControlSetup, DeviceIdentity, UsbError};
use rusb::{Context, DeviceHandle};
use tracing::{debug, warn};

/// Operations a session needs from an opened USB device
pub trait DeviceIo: Send {
    /// Read the identity (ids, bus, address, port path) of the device
    fn identity(&self) -> Result<DeviceIdentity, UsbError>;

    fn claim_interface(&mut self, interface: u8) -> Result<(), UsbError>;

    fn release_interface(&mut self, interface: u8) -> Result<(), UsbError>;

    fn set_alternate_setting(&mut self, interface: u8, setting: u8) -> Result<(), UsbError>;

    /// Run a synchronous control transfer whose data stage is `buffer`
    ///
    /// Returns the number of bytes actually transferred.
    fn control(&mut self, setup: &ControlSetup, buffer: &mut [u8]) -> Result<usize, UsbError>;
}

/// libusb device opened from a platform file descriptor
///
/// Owns its own `rusb::Context`; the context is exited when the handle is
/// dropped, so each device lives and dies with its session.
pub struct RusbDevice {
    handle: DeviceHandle<Context>,
    detach_kernel_driver: bool,
}

impl RusbDevice {
    /// Wrap an already-opened usbfs file descriptor
    ///
    /// The descriptor stays owned by the caller (`UsbDeviceConnection` on
    /// Android); closing the handle does not close it.
    #[cfg(unix)]
    pub fn from_fd(fd: i32, detach_kernel_driver: bool) -> Result<Self, UsbError> {
        use rusb::UsbContext;

        if fd < 0 {
            warn!("Refusing to wrap invalid file descriptor {}", fd);
            return Err(UsbError::InvalidParam);
        }

        prepare_backend();

        let context = Context::new().map_err(|e| {
            warn!("libusb initialization returned: {}", e);
            map_rusb_error(e)
        })?;

        // SAFETY: `fd` is a usbfs descriptor owned by the managed caller and
        // kept open for the whole session; libusb only borrows it.
        let handle = unsafe { context.open_device_with_fd(fd) }.map_err(|e| {
            warn!("Failed to wrap file descriptor {}: {}", fd, e);
            map_rusb_error(e)
        })?;

        debug!("Wrapped file descriptor {} into a libusb handle", fd);

        Ok(Self {
            handle,
            detach_kernel_driver,
        })
    }

    #[cfg(not(unix))]
    pub fn from_fd(_fd: i32, _detach_kernel_driver: bool) -> Result<Self, UsbError> {
        Err(UsbError::NotSupported)
    }

    fn detach_active_driver(&mut self, interface: u8) {
        match self.handle.kernel_driver_active(interface) {
            Ok(true) => {
                debug!("Detaching kernel driver from interface {}", interface);
                if let Err(e) = self.handle.detach_kernel_driver(interface) {
                    // Claiming will report the real failure.
                    warn!(
                        "Failed to detach kernel driver from interface {}: {}",
                        interface, e
                    );
                }
            }
            Ok(false) => {
                debug!("No kernel driver active on interface {}", interface);
            }
            Err(e) => {
                debug!(
                    "Could not check kernel driver status for interface {}: {}",
                    interface, e
                );
            }
        }
    }
}

impl DeviceIo for RusbDevice {
    fn identity(&self) -> Result<DeviceIdentity, UsbError> {
        let device = self.handle.device();
        let descriptor = device.device_descriptor().map_err(map_rusb_error)?;
        let port_path = device.port_numbers().unwrap_or_else(|e| {
            debug!("Port path unavailable: {}", e);
            Vec::new()
        });

        Ok(DeviceIdentity {
            vendor_id: descriptor.vendor_id(),
            product_id: descriptor.product_id(),
            bus_number: device.bus_number(),
            address: device.address(),
            port_path,
        })
    }

    fn claim_interface(&mut self, interface: u8) -> Result<(), UsbError> {
        if self.detach_kernel_driver {
            self.detach_active_driver(interface);
        }
        self.handle
            .claim_interface(interface)
            .map_err(map_rusb_error)
    }

    fn release_interface(&mut self, interface: u8) -> Result<(), UsbError> {
        self.handle
            .release_interface(interface)
            .map_err(map_rusb_error)
    }

    fn set_alternate_setting(&mut self, interface: u8, setting: u8) -> Result<(), UsbError> {
        self.handle
            .set_alternate_setting(interface, setting)
            .map_err(map_rusb_error)
    }

    fn control(&mut self, setup: &ControlSetup, buffer: &mut [u8]) -> Result<usize, UsbError> {
        execute_control_transfer(&self.handle, setup, buffer)
    }
}

/// One-time libusb configuration for the process
///
/// Android apps cannot enumerate `/dev/bus/usb`, so libusb must be told not
/// to scan before the first context exists.
pub fn prepare_backend() {
    #[cfg(target_os = "android")]
    {
        use std::sync::Once;

        static PREPARE: Once = Once::new();
        PREPARE.call_once(|| {
            if let Err(e) = rusb::disable_device_discovery() {
                warn!("Failed to disable libusb device discovery: {}", e);
            } else {
                debug!("libusb device discovery disabled");
            }
        });
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_negative_fd_is_rejected_before_libusb() {
        assert!(matches!(
            RusbDevice::from_fd(-1, false),
            Err(UsbError::InvalidParam)
        ));
        assert!(matches!(
            RusbDevice::from_fd(i32::MIN, true),
            Err(UsbError::InvalidParam)
        ));
    }
}
