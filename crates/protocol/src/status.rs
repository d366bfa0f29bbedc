//! Conversion of typed results into the `int` status seen by Java

use crate::error::UsbError;
use crate::types::TransferOutcome;

/// Status value for a successful operation that moves no data
pub const STATUS_OK: i32 = 0;

/// Flattening of a typed result into a native status code
///
/// Zero or a positive byte count means success; negative values are libusb
/// error codes.
pub trait StatusCode {
    fn status_code(&self) -> i32;
}

impl StatusCode for () {
    fn status_code(&self) -> i32 {
        STATUS_OK
    }
}

impl StatusCode for TransferOutcome {
    fn status_code(&self) -> i32 {
        // Transfers are bounded by wLength, so the count always fits.
        i32::try_from(self.transferred()).unwrap_or(i32::MAX)
    }
}

impl StatusCode for UsbError {
    fn status_code(&self) -> i32 {
        self.code()
    }
}

impl<T: StatusCode> StatusCode for Result<T, UsbError> {
    fn status_code(&self) -> i32 {
        match self {
            Ok(value) => value.status_code(),
            Err(error) => error.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_success_is_zero() {
        let result: Result<(), UsbError> = Ok(());
        assert_eq!(result.status_code(), STATUS_OK);
    }

    #[test]
    fn test_outcome_reports_byte_count() {
        let short: Result<TransferOutcome, UsbError> = Ok(TransferOutcome::classify(10, 26));
        assert_eq!(short.status_code(), 10);
    }

    #[test]
    fn test_error_reports_code() {
        let failed: Result<TransferOutcome, UsbError> = Err(UsbError::Pipe);
        assert_eq!(failed.status_code(), -9);
    }
}
