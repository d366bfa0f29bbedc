//! USB subsystem
//!
//! Wraps a platform-provided file descriptor into a libusb handle and runs
//! the transfers the webcam library asks for:
//! - Device wrapping and identity logging
//! - Interface claiming and alternate setting selection
//! - Synchronous control transfers
//!
//! All calls block the calling thread until libusb returns.

pub mod device;
pub mod session;
pub mod transfers;

pub use device::{DeviceIo, RusbDevice};
pub use session::UsbSession;
pub use transfers::map_rusb_error;
