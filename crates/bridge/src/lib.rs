//! Native USB runtime for the Android UVC webcam library
//!
//! The Java class `com.jwoolston.android.uvc.libusb.IsochronousConnection`
//! hands this library the file descriptor of a `UsbDeviceConnection`; the
//! library wraps it into a libusb handle, claims the streaming interface and
//! runs the transfers the webcam stack asks for.
//!
//! The Java class is expected to declare:
//!
//! ```java
//! private long nativeSession;
//!
//! private native int initialize(int fd);
//! public native int deinitialize();
//! public native int isochronousTransfer(UsbDeviceConnection connection, ByteBuffer buffer);
//! public native int controlTransfer(int requestType, int request, int value, int index,
//!                                   byte[] buffer, int length, int timeout);
//! public native boolean selectAlternateSetting(int interfaceId, int alternateSetting);
//! ```
//!
//! Layers, from the JVM down:
//! - [`native`]: JNI marshalling of Java arguments and the session field
//! - [`bridge`]: session registry, one session per Java connection
//! - [`usb`]: libusb session, device wrapping and transfers

pub mod bridge;
pub mod config;
pub mod native;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod usb;

pub use bridge::{Bridge, SessionId};
pub use config::BridgeConfig;
