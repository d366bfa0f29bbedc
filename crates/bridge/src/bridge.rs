//! Session registry behind the native entry points
//!
//! Each initialized Java connection owns one session, addressed by a
//! `SessionId` that the JNI layer stores in the Java object. The registry map
//! is only locked to look sessions up or remove them; transfers lock their
//! own session, so separate devices never wait on each other and calls on
//! one device are serialized.

use crate::config::{BridgeConfig, UsbSettings};
use crate::usb::{DeviceIo, UsbSession};
use protocol::{ControlSetup, STATUS_OK, StatusCode, TransferOutcome, UsbError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Handle to a registered session; never zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Interpret the value stored on the Java side (`0` = no session)
    pub fn from_raw(raw: i64) -> Option<Self> {
        u64::try_from(raw).ok().filter(|id| *id != 0).map(SessionId)
    }

    pub fn as_raw(self) -> i64 {
        i64::try_from(self.0).unwrap_or(i64::MAX)
    }
}

impl StatusCode for SessionId {
    fn status_code(&self) -> i32 {
        STATUS_OK
    }
}

type SharedSession<D> = Arc<Mutex<UsbSession<D>>>;

pub struct Bridge<D: DeviceIo> {
    config: BridgeConfig,
    sessions: Mutex<HashMap<SessionId, SharedSession<D>>>,
    next_session_id: AtomicU64,
}

impl<D: DeviceIo> Bridge<D> {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
            next_session_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Open a device with `open` and register a session for it
    ///
    /// Nothing is registered unless opening the device and claiming the
    /// configured interface both succeed.
    pub fn initialize<F>(&self, open: F) -> Result<SessionId, UsbError>
    where
        F: FnOnce(&UsbSettings) -> Result<D, UsbError>,
    {
        let device = open(&self.config.usb)?;
        let session = UsbSession::open(device, self.config.usb.interface)?;

        let id = SessionId(self.next_session_id.fetch_add(1, Ordering::Relaxed));
        self.lock_sessions()
            .insert(id, Arc::new(Mutex::new(session)));

        info!("Registered USB session {:?}", id);
        Ok(id)
    }

    /// Close a session; unknown or absent ids are a no-op
    ///
    /// Returns whether a session was removed. A transfer still running on the
    /// session keeps it alive until it finishes; it is closed right after.
    pub fn deinitialize(&self, id: Option<SessionId>) -> bool {
        let Some(id) = id else {
            debug!("Deinitialize without a session");
            return false;
        };

        let removed = self.lock_sessions().remove(&id);
        match removed {
            Some(session) => {
                // Dropped outside the registry lock.
                drop(session);
                info!("Closed USB session {:?}", id);
                true
            }
            None => {
                debug!("Deinitialize for unknown session {:?}", id);
                false
            }
        }
    }

    pub fn control_transfer(
        &self,
        id: Option<SessionId>,
        setup: &ControlSetup,
        buffer: &mut [u8],
    ) -> Result<TransferOutcome, UsbError> {
        let session = self.session(id)?;
        let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
        session.control_transfer(setup, buffer)
    }

    pub fn select_alternate_setting(
        &self,
        id: Option<SessionId>,
        interface: u8,
        setting: u8,
    ) -> Result<(), UsbError> {
        let session = self.session(id)?;
        let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
        session.select_alternate_setting(interface, setting)
    }

    /// Isochronous transfer entry point
    ///
    /// Submission is not implemented: the call is logged and reports success
    /// without moving data, whether or not a session exists.
    pub fn isochronous_transfer(&self, id: Option<SessionId>, capacity: Option<usize>) -> i32 {
        debug!(
            "Isochronous transfer requested (session {:?}, buffer capacity {:?}); not submitted",
            id, capacity
        );
        STATUS_OK
    }

    pub fn active_sessions(&self) -> usize {
        self.lock_sessions().len()
    }

    fn session(&self, id: Option<SessionId>) -> Result<SharedSession<D>, UsbError> {
        let Some(id) = id else {
            warn!("USB call before initialize");
            return Err(UsbError::NoDevice);
        };

        self.lock_sessions().get(&id).cloned().ok_or_else(|| {
            warn!("USB call on closed session {:?}", id);
            UsbError::NoDevice
        })
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<SessionId, SharedSession<D>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
