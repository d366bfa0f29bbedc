//! USB error taxonomy
//!
//! Every failure that crosses the native boundary is one of the libusb error
//! codes. `UsbError` keeps them typed on the Rust side; `code()` produces the
//! raw negative integer the managed caller expects.

use thiserror::Error;

/// libusb error kinds, one variant per `LIBUSB_ERROR_*` code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum UsbError {
    /// Input/output error
    #[error("Input/output error")]
    Io,
    /// Invalid parameter
    #[error("Invalid parameter")]
    InvalidParam,
    /// Access denied (insufficient permissions)
    #[error("Access denied (insufficient permissions)")]
    Access,
    /// Device was disconnected or no session is open
    #[error("No such device (it may have been disconnected)")]
    NoDevice,
    /// Entity not found
    #[error("Entity not found")]
    NotFound,
    /// Resource busy
    #[error("Resource busy")]
    Busy,
    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,
    /// Device sent more data than requested
    #[error("Overflow")]
    Overflow,
    /// Endpoint stalled
    #[error("Pipe error")]
    Pipe,
    /// System call interrupted
    #[error("System call interrupted")]
    Interrupted,
    /// Insufficient memory
    #[error("Insufficient memory")]
    NoMem,
    /// Operation not supported on this platform
    #[error("Operation not supported or unimplemented on this platform")]
    NotSupported,
    /// Anything libusb does not classify
    #[error("Other error")]
    Other,
}

impl UsbError {
    /// Raw libusb error code (always negative)
    pub const fn code(self) -> i32 {
        match self {
            UsbError::Io => -1,
            UsbError::InvalidParam => -2,
            UsbError::Access => -3,
            UsbError::NoDevice => -4,
            UsbError::NotFound => -5,
            UsbError::Busy => -6,
            UsbError::Timeout => -7,
            UsbError::Overflow => -8,
            UsbError::Pipe => -9,
            UsbError::Interrupted => -10,
            UsbError::NoMem => -11,
            UsbError::NotSupported => -12,
            UsbError::Other => -99,
        }
    }

    /// Classify a raw libusb code
    ///
    /// Codes libusb does not define collapse into `Other`.
    pub const fn from_code(code: i32) -> Self {
        match code {
            -1 => UsbError::Io,
            -2 => UsbError::InvalidParam,
            -3 => UsbError::Access,
            -4 => UsbError::NoDevice,
            -5 => UsbError::NotFound,
            -6 => UsbError::Busy,
            -7 => UsbError::Timeout,
            -8 => UsbError::Overflow,
            -9 => UsbError::Pipe,
            -10 => UsbError::Interrupted,
            -11 => UsbError::NoMem,
            -12 => UsbError::NotSupported,
            _ => UsbError::Other,
        }
    }
}

/// Type alias for USB operation results
pub type Result<T> = std::result::Result<T, UsbError>;
