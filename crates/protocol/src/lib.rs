//! Boundary types for the UVC USB runtime
//!
//! This crate defines what crosses the native boundary between the managed
//! webcam library and libusb: the libusb error taxonomy, validated control
//! transfer parameters, transfer outcomes, and the conversion of all of them
//! into the integer status codes the Java side receives.
//!
//! # Example
//!
//! ```
//! use protocol::{ControlSetup, Direction, StatusCode, TransferOutcome, UsbError};
//!
//! // GET_CUR on the video probe control, as issued by the webcam library
//! let setup = ControlSetup::from_raw(0xa1, 0x81, 0x0100, 1, 26, 500).unwrap();
//! assert_eq!(setup.direction(), Direction::In);
//!
//! let result: Result<TransferOutcome, UsbError> = Ok(TransferOutcome::classify(26, 26));
//! assert_eq!(result.status_code(), 26);
//! ```

pub mod error;
pub mod status;
pub mod types;

pub use error::{Result, UsbError};
pub use status::{STATUS_OK, StatusCode};
pub use types::{ControlSetup, DeviceIdentity, Direction, MAX_CONTROL_LENGTH, TransferOutcome};
