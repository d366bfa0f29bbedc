//! Common error types

use protocol::UsbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("USB error: {0}")]
    Usb(#[from] UsbError),

    #[error("JNI error: {0}")]
    Jni(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    /// libusb status code reported to the managed caller
    ///
    /// Only USB failures carry a meaningful code; marshalling and setup
    /// failures all surface as `LIBUSB_ERROR_OTHER`.
    pub fn status_code(&self) -> i32 {
        match self {
            Error::Usb(error) => error.code(),
            _ => UsbError::Other.code(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usb_error_keeps_code() {
        let err: Error = UsbError::Timeout.into();
        assert_eq!(err.status_code(), -7);
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_marshalling_error_is_other() {
        let err = Error::Jni("array region out of bounds".to_string());
        assert_eq!(err.status_code(), UsbError::Other.code());
    }
}
