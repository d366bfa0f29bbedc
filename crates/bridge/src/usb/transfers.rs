//! USB transfer execution
//!
//! This module runs control transfers on a rusb device handle and maps rusb
//! errors onto the libusb error taxonomy handed back to Java.

use protocol::{ControlSetup, Direction, UsbError};
use rusb::{DeviceHandle, UsbContext};
use tracing::debug;

/// Execute a synchronous control transfer
///
/// `buffer` is exactly the data stage: for IN transfers it receives what the
/// device sends, for OUT transfers it holds what is written. Blocks for up to
/// `setup.timeout` (forever when zero).
pub fn execute_control_transfer<T: UsbContext>(
    handle: &DeviceHandle<T>,
    setup: &ControlSetup,
    buffer: &mut [u8],
) -> Result<usize, UsbError> {
    debug!(
        "Control transfer: request_type={:#x}, request={:#x}, value={:#x}, index={:#x}, data_len={}, timeout={}ms",
        setup.request_type,
        setup.request,
        setup.value,
        setup.index,
        buffer.len(),
        setup.timeout.as_millis()
    );

    let result = match setup.direction() {
        Direction::In => handle.read_control(
            setup.request_type,
            setup.request,
            setup.value,
            setup.index,
            buffer,
            setup.timeout,
        ),
        Direction::Out => handle.write_control(
            setup.request_type,
            setup.request,
            setup.value,
            setup.index,
            buffer,
            setup.timeout,
        ),
    };

    result.map_err(map_rusb_error)
}

/// Map rusb::Error to protocol::UsbError
pub fn map_rusb_error(err: rusb::Error) -> UsbError {
    match err {
        rusb::Error::Io => UsbError::Io,
        rusb::Error::InvalidParam => UsbError::InvalidParam,
        rusb::Error::Access => UsbError::Access,
        rusb::Error::NoDevice => UsbError::NoDevice,
        rusb::Error::NotFound => UsbError::NotFound,
        rusb::Error::Busy => UsbError::Busy,
        rusb::Error::Timeout => UsbError::Timeout,
        rusb::Error::Overflow => UsbError::Overflow,
        rusb::Error::Pipe => UsbError::Pipe,
        rusb::Error::Interrupted => UsbError::Interrupted,
        rusb::Error::NoMem => UsbError::NoMem,
        rusb::Error::NotSupported => UsbError::NotSupported,
        _ => UsbError::Other,
    }
}
