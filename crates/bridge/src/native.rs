//! Native methods of `com.jwoolston.android.uvc.libusb.IsochronousConnection`
//!
//! This layer only marshals: it reads the session id stored in the Java
//! object's `long nativeSession` field, copies `byte[]` contents in and out,
//! and flattens typed results into `int` status codes. Every entry point
//! catches panics so none unwinds into the JVM.
//!
//! Java exceptions raised while marshalling are logged and cleared, never
//! rethrown; the caller sees the status code of the failed operation.

use crate::bridge::{Bridge, SessionId};
use crate::config::BridgeConfig;
use crate::usb::RusbDevice;
use crate::usb::device::prepare_backend;
use common::Error;
use jni::JNIEnv;
use jni::objects::{JByteArray, JByteBuffer, JObject, JString, JValue};
use jni::sys::{JNI_ERR, JNI_FALSE, JNI_TRUE, JNI_VERSION_1_6, jboolean, jint};
use protocol::{ControlSetup, Direction, STATUS_OK, StatusCode, TransferOutcome, UsbError};
use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;
use tracing::{debug, error, info, warn};

/// Java field holding the session id (`0` = no session)
pub const SESSION_FIELD: &str = "nativeSession";

static BRIDGE: OnceLock<Bridge<RusbDevice>> = OnceLock::new();

fn bridge() -> &'static Bridge<RusbDevice> {
    BRIDGE.get_or_init(|| Bridge::new(BridgeConfig::default()))
}

#[unsafe(no_mangle)]
pub extern "system" fn JNI_OnLoad(_vm: *mut jni::sys::JavaVM, _reserved: *mut c_void) -> jint {
    ffi_boundary("JNI_OnLoad", JNI_ERR, || {
        let (config, config_error) = match BridgeConfig::from_env() {
            Ok(config) => (config, None),
            Err(e) => (BridgeConfig::default(), Some(e)),
        };

        if let Err(e) = common::setup_logging(&config.logging.level) {
            debug!("Keeping existing log sink: {}", e);
        }
        if let Some(e) = config_error {
            warn!("Falling back to default configuration: {:#}", e);
        }

        prepare_backend();
        if BRIDGE.set(Bridge::new(config)).is_err() {
            debug!("Bridge already initialized, keeping its configuration");
        }

        info!("USB runtime loaded");
        JNI_VERSION_1_6
    })
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_jwoolston_android_uvc_libusb_IsochronousConnection_initialize<
    'local,
>(
    mut env: JNIEnv<'local>,
    this: JObject<'local>,
    fd: jint,
) -> jint {
    ffi_boundary("initialize", UsbError::Other.code(), || {
        debug!("IsochronousConnection.initialize({})", fd);
        let bridge = bridge();

        if let Some(previous) = load_session(&mut env, &this, "initialize") {
            warn!("initialize on an open connection, closing {:?} first", previous);
            bridge.deinitialize(Some(previous));
        }

        let result =
            bridge.initialize(|usb| RusbDevice::from_fd(fd, usb.detach_kernel_driver));
        let id = match result {
            Ok(id) => id,
            Err(e) => {
                warn!("Initialization returned: {} ({})", e, e.code());
                // A stale id must not survive a failed initialize.
                if let Err(e) = store_session(&mut env, &this, None, "initialize") {
                    debug!("Could not clear session after failed initialize: {}", e);
                }
                return e.code();
            }
        };

        if let Err(e) = store_session(&mut env, &this, Some(id), "initialize") {
            bridge.deinitialize(Some(id));
            return e.status_code();
        }

        id.status_code()
    })
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_jwoolston_android_uvc_libusb_IsochronousConnection_deinitialize<
    'local,
>(
    mut env: JNIEnv<'local>,
    this: JObject<'local>,
) -> jint {
    ffi_boundary("deinitialize", STATUS_OK, || {
        debug!("IsochronousConnection.deinitialize()");

        let session = load_session(&mut env, &this, "deinitialize");
        bridge().deinitialize(session);
        if session.is_some() {
            if let Err(e) = store_session(&mut env, &this, None, "deinitialize") {
                debug!("Could not clear session field: {}", e);
            }
        }

        STATUS_OK
    })
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_jwoolston_android_uvc_libusb_IsochronousConnection_isochronousTransfer<
    'local,
>(
    mut env: JNIEnv<'local>,
    this: JObject<'local>,
    _connection: JObject<'local>,
    buffer: JObject<'local>,
) -> jint {
    ffi_boundary("isochronousTransfer", STATUS_OK, || {
        let session = load_session(&mut env, &this, "isochronousTransfer");

        let capacity = if buffer.is_null() {
            None
        } else {
            let buffer = JByteBuffer::from(buffer);
            env.get_direct_buffer_capacity(&buffer).ok()
        };

        bridge().isochronous_transfer(session, capacity)
    })
}

#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub extern "system" fn Java_com_jwoolston_android_uvc_libusb_IsochronousConnection_controlTransfer<
    'local,
>(
    mut env: JNIEnv<'local>,
    this: JObject<'local>,
    request_type: jint,
    request: jint,
    value: jint,
    index: jint,
    buffer: JByteArray<'local>,
    length: jint,
    timeout: jint,
) -> jint {
    ffi_boundary("controlTransfer", UsbError::Other.code(), || {
        let setup =
            match ControlSetup::from_raw(request_type, request, value, index, length, timeout) {
                Ok(setup) => setup,
                Err(e) => {
                    warn!(
                        "Rejected control transfer arguments: type={} request={} value={} index={} length={} timeout={}",
                        request_type, request, value, index, length, timeout
                    );
                    return e.code();
                }
            };

        let mut data = match copy_in(&mut env, &buffer, &setup) {
            Ok(data) => data,
            Err(e) => return e.status_code(),
        };

        let session = load_session(&mut env, &this, "controlTransfer");
        let result = bridge().control_transfer(session, &setup, &mut data);

        if let Some(count) = copy_back_len(&setup, &result) {
            if let Err(e) = copy_out(&mut env, &buffer, &data[..count]) {
                return e.status_code();
            }
        }

        result.status_code()
    })
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_jwoolston_android_uvc_libusb_IsochronousConnection_selectAlternateSetting<
    'local,
>(
    mut env: JNIEnv<'local>,
    this: JObject<'local>,
    interface_id: jint,
    alternate_setting: jint,
) -> jboolean {
    ffi_boundary("selectAlternateSetting", JNI_FALSE, || {
        debug!(
            "IsochronousConnection.selectAlternateSetting({}, {})",
            interface_id, alternate_setting
        );

        let (Ok(interface), Ok(setting)) = (
            u8::try_from(interface_id),
            u8::try_from(alternate_setting),
        ) else {
            warn!(
                "Rejected alternate setting {} for interface {}",
                alternate_setting, interface_id
            );
            return JNI_FALSE;
        };

        let session = load_session(&mut env, &this, "selectAlternateSetting");
        match bridge().select_alternate_setting(session, interface, setting) {
            Ok(()) => JNI_TRUE,
            Err(_) => JNI_FALSE,
        }
    })
}

/// Run `f`, turning a panic into `fallback`
fn ffi_boundary<T>(function: &str, fallback: T, f: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error!("{}: panic in native code", function);
            fallback
        }
    }
}

fn load_session(env: &mut JNIEnv, this: &JObject, function: &str) -> Option<SessionId> {
    match env.get_field(this, SESSION_FIELD, "J").and_then(|value| value.j()) {
        Ok(raw) => SessionId::from_raw(raw),
        Err(e) => {
            warn_session_field(function, &e);
            jni_error(env, e, function);
            None
        }
    }
}

fn store_session(
    env: &mut JNIEnv,
    this: &JObject,
    session: Option<SessionId>,
    function: &str,
) -> common::Result<()> {
    let raw = session.map_or(0, SessionId::as_raw);
    env.set_field(this, SESSION_FIELD, "J", JValue::Long(raw))
        .map_err(|e| {
            warn_session_field(function, &e);
            jni_error(env, e, function)
        })
}

/// Hint logged when the session field cannot be accessed
///
/// A Java class built without the field fails lookup with
/// `NoSuchFieldError`, which surfaces as a pending exception.
fn session_field_hint(function: &str, err: &jni::errors::Error) -> Option<String> {
    match err {
        jni::errors::Error::FieldNotFound { .. }
        | jni::errors::Error::JavaException
        | jni::errors::Error::WrongJValueType(..) => Some(format!(
            "{}: cannot access `long {}` on IsochronousConnection; the class must declare `private long {};`",
            function, SESSION_FIELD, SESSION_FIELD
        )),
        _ => None,
    }
}

fn warn_session_field(function: &str, err: &jni::errors::Error) {
    if let Some(hint) = session_field_hint(function, err) {
        warn!("{}", hint);
    }
}

/// Copy the data stage out of the Java array
///
/// IN transfers only need room, so nothing is read from Java for them.
fn copy_in(env: &mut JNIEnv, buffer: &JByteArray, setup: &ControlSetup) -> common::Result<Vec<u8>> {
    let available = if buffer.is_null() {
        None
    } else {
        let length = env
            .get_array_length(buffer)
            .map_err(|e| jni_error(env, e, "controlTransfer"))?;
        Some(usize::try_from(length).unwrap_or(0))
    };
    check_buffer(available, setup)?;

    if setup.direction() == Direction::Out && setup.length > 0 {
        let mut signed = vec![0i8; setup.length];
        env.get_byte_array_region(buffer, 0, &mut signed)
            .map_err(|e| jni_error(env, e, "controlTransfer"))?;
        return Ok(to_unsigned(&signed));
    }
    Ok(vec![0u8; setup.length])
}

/// Copy received bytes back into the start of the Java array
fn copy_out(env: &mut JNIEnv, buffer: &JByteArray, data: &[u8]) -> common::Result<()> {
    env.set_byte_array_region(buffer, 0, &to_signed(data))
        .map_err(|e| jni_error(env, e, "controlTransfer"))
}

/// Validate the Java array against the requested length
///
/// `available` is `None` for a null array, accepted only without a data
/// stage.
fn check_buffer(available: Option<usize>, setup: &ControlSetup) -> Result<(), UsbError> {
    match available {
        None if setup.length == 0 => Ok(()),
        None => {
            warn!("controlTransfer: null buffer for {} bytes", setup.length);
            Err(UsbError::InvalidParam)
        }
        Some(available) if available < setup.length => {
            warn!(
                "controlTransfer: buffer holds {} bytes, {} requested",
                available, setup.length
            );
            Err(UsbError::InvalidParam)
        }
        Some(_) => Ok(()),
    }
}

/// Number of bytes to write back into the Java array after a transfer
fn copy_back_len(setup: &ControlSetup, result: &Result<TransferOutcome, UsbError>) -> Option<usize> {
    match result {
        Ok(outcome) if setup.direction() == Direction::In && outcome.transferred() > 0 => {
            Some(outcome.transferred().min(setup.length))
        }
        _ => None,
    }
}

fn to_unsigned(signed: &[i8]) -> Vec<u8> {
    signed.iter().map(|&byte| byte as u8).collect()
}

fn to_signed(data: &[u8]) -> Vec<i8> {
    data.iter().map(|&byte| byte as i8).collect()
}

/// Log a failed JNI call and convert it
///
/// A pending Java exception is described and cleared here.
fn jni_error(env: &mut JNIEnv, err: jni::errors::Error, function: &str) -> Error {
    if let jni::errors::Error::JavaException = err {
        log_exception(env, function);
    } else {
        error!("{}: JNI call failed: {}", function, err);
    }
    Error::Jni(err.to_string())
}

fn log_exception(env: &mut JNIEnv, function: &str) {
    let exception = match env.exception_occurred() {
        Ok(exception) if !exception.is_null() => exception,
        _ => {
            error!("{}: a Java exception occurred, but it is gone", function);
            return;
        }
    };
    let _ = env.exception_clear();

    let description = env
        .call_method(&exception, "toString", "()Ljava/lang/String;", &[])
        .and_then(|value| value.l());

    match description {
        Err(_) => {
            if env.exception_check().unwrap_or(false) {
                let _ = env.exception_clear();
            }
            error!(
                "{}: a Java exception occurred, but toString() failed",
                function
            );
        }
        Ok(text) if text.is_null() => {
            error!(
                "{}: a Java exception occurred, but toString() is null",
                function
            );
        }
        Ok(text) => {
            let text = JString::from(text);
            let text = env.get_string(&text).map(String::from);
            match text {
                Ok(text) => error!("{}: a Java exception occurred: {}", function, text),
                Err(_) => {
                    if env.exception_check().unwrap_or(false) {
                        let _ = env.exception_clear();
                    }
                    error!(
                        "{}: a Java exception occurred, but its text is unreadable",
                        function
                    );
                }
            }
        }
    }
}
