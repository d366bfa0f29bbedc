//! Types shared between the managed caller and the USB session
//!
//! Managed callers hand over plain `int`s; these types are where those
//! integers get range-checked and given meaning.

use crate::error::{Result, UsbError};
use std::fmt;
use std::time::Duration;

/// Largest data stage a control transfer can carry (`wLength` is 16 bits)
pub const MAX_CONTROL_LENGTH: usize = u16::MAX as usize;

/// Transfer direction, taken from bit 7 of `bmRequestType`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Device to host
    In,
    /// Host to device
    Out,
}

impl Direction {
    pub fn from_request_type(request_type: u8) -> Self {
        if request_type & 0x80 != 0 {
            Direction::In
        } else {
            Direction::Out
        }
    }
}

/// Validated control transfer parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlSetup {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    /// Number of bytes in the data stage
    pub length: usize,
    /// Zero means wait forever
    pub timeout: Duration,
}

impl ControlSetup {
    /// Build a setup from the raw `int` arguments of `controlTransfer`
    ///
    /// Java has no unsigned bytes, so request type and request are accepted
    /// sign-extended (`-128..=255`) and masked; value and index likewise
    /// accept `-32768..=65535`. Length must fit `wLength` and the timeout
    /// must not be negative.
    pub fn from_raw(
        request_type: i32,
        request: i32,
        value: i32,
        index: i32,
        length: i32,
        timeout_ms: i32,
    ) -> Result<Self> {
        let length = usize::try_from(length).map_err(|_| UsbError::InvalidParam)?;
        if length > MAX_CONTROL_LENGTH {
            return Err(UsbError::InvalidParam);
        }
        let timeout_ms = u64::try_from(timeout_ms).map_err(|_| UsbError::InvalidParam)?;

        Ok(Self {
            request_type: mask_u8(request_type)?,
            request: mask_u8(request)?,
            value: mask_u16(value)?,
            index: mask_u16(index)?,
            length,
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    pub fn direction(&self) -> Direction {
        Direction::from_request_type(self.request_type)
    }
}

fn mask_u8(raw: i32) -> Result<u8> {
    if (i32::from(i8::MIN)..=i32::from(u8::MAX)).contains(&raw) {
        Ok((raw & 0xff) as u8)
    } else {
        Err(UsbError::InvalidParam)
    }
}

fn mask_u16(raw: i32) -> Result<u16> {
    if (i32::from(i16::MIN)..=i32::from(u16::MAX)).contains(&raw) {
        Ok((raw & 0xffff) as u16)
    } else {
        Err(UsbError::InvalidParam)
    }
}

/// Successful transfer result
///
/// A short transfer is still a success: the device answered with fewer bytes
/// than requested. It is reported, never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// All requested bytes were transferred
    Complete { transferred: usize },
    /// Fewer bytes than requested were transferred
    Short { transferred: usize, requested: usize },
}

impl TransferOutcome {
    pub fn classify(transferred: usize, requested: usize) -> Self {
        if transferred < requested {
            TransferOutcome::Short {
                transferred,
                requested,
            }
        } else {
            TransferOutcome::Complete { transferred }
        }
    }

    /// Number of bytes actually moved
    pub fn transferred(&self) -> usize {
        match *self {
            TransferOutcome::Complete { transferred } => transferred,
            TransferOutcome::Short { transferred, .. } => transferred,
        }
    }

    pub fn is_short(&self) -> bool {
        matches!(self, TransferOutcome::Short { .. })
    }
}

/// Identity of the wrapped device, logged once per session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
    pub bus_number: u8,
    pub address: u8,
    /// Port numbers from the root hub down; empty when unknown
    pub port_path: Vec<u8>,
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} (bus {}, device {})",
            self.vendor_id, self.product_id, self.bus_number, self.address
        )?;

        if let Some((first, rest)) = self.port_path.split_first() {
            write!(f, " path: {}", first)?;
            for port in rest {
                write!(f, ".{}", port)?;
            }
        }
        Ok(())
    }
}
