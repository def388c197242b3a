//! In-process stand-in for the DTCP-IP sink library.
//!
//! `LoopbackLibrary` performs no AKE and no decryption: cleartext equals the
//! input. It does enforce the real library's call ordering (init before
//! open, open before decrypt, every allocation freed once), which makes it
//! useful for wiring up pipelines without a DTCP source device.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::library::{Cleartext, DtcpIpLibrary, LibResult, ReturnCode, SessionHandle};

/// A call was made before `common_init`/`sink_init`.
pub const RC_NOT_INITIALIZED: ReturnCode = ReturnCode(-2);
/// The session handle is not open.
pub const RC_INVALID_SESSION: ReturnCode = ReturnCode(-3);
/// The key storage directory is missing or not a directory.
pub const RC_BAD_STORAGE: ReturnCode = ReturnCode(-4);
/// `free` was called with no allocation outstanding.
pub const RC_NOTHING_TO_FREE: ReturnCode = ReturnCode(-5);

#[derive(Debug, Default)]
struct Inner {
    storage_dir: Option<PathBuf>,
    sink_ready: bool,
    next_handle: i32,
    sessions: HashMap<SessionHandle, (String, u16)>,
    outstanding: usize,
}

/// Pass-through [`DtcpIpLibrary`].
#[derive(Debug, Default)]
pub struct LoopbackLibrary {
    inner: Mutex<Inner>,
}

impl LoopbackLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage directory given to the last successful `common_init`.
    #[must_use]
    pub fn storage_dir(&self) -> Option<PathBuf> {
        self.inner.lock().storage_dir.clone()
    }

    /// Peers of the currently open sessions.
    #[must_use]
    pub fn open_sessions(&self) -> Vec<(SessionHandle, String, u16)> {
        let inner = self.inner.lock();
        let mut sessions: Vec<_> = inner
            .sessions
            .iter()
            .map(|(handle, (host, port))| (*handle, host.clone(), *port))
            .collect();
        sessions.sort_by_key(|(handle, _, _)| handle.0);
        sessions
    }

    /// Cleartext regions handed out and not yet freed.
    #[must_use]
    pub fn outstanding_allocations(&self) -> usize {
        self.inner.lock().outstanding
    }
}

impl DtcpIpLibrary for LoopbackLibrary {
    fn common_init(&self, storage_dir: &Path) -> LibResult<()> {
        if !storage_dir.is_dir() {
            return Err(RC_BAD_STORAGE);
        }
        self.inner.lock().storage_dir = Some(storage_dir.to_path_buf());
        Ok(())
    }

    fn version(&self) -> String {
        format!("loopback {}", env!("CARGO_PKG_VERSION"))
    }

    fn sink_init(&self) -> LibResult<()> {
        let mut inner = self.inner.lock();
        if inner.storage_dir.is_none() {
            return Err(RC_NOT_INITIALIZED);
        }
        inner.sink_ready = true;
        Ok(())
    }

    fn sink_open(&self, host: &str, port: u16) -> LibResult<SessionHandle> {
        let mut inner = self.inner.lock();
        if !inner.sink_ready {
            return Err(RC_NOT_INITIALIZED);
        }
        if host.is_empty() {
            return Err(ReturnCode::FAILURE);
        }
        let handle = SessionHandle(inner.next_handle);
        inner.next_handle += 1;
        inner.sessions.insert(handle, (host.to_string(), port));
        Ok(handle)
    }

    fn alloc_decrypt(&self, session: SessionHandle, encrypted: &[u8]) -> LibResult<Cleartext> {
        let mut inner = self.inner.lock();
        if !inner.sessions.contains_key(&session) {
            return Err(RC_INVALID_SESSION);
        }
        inner.outstanding += 1;
        Ok(Cleartext::new(encrypted.to_vec()))
    }

    fn free(&self, cleartext: Cleartext) -> LibResult<()> {
        let mut inner = self.inner.lock();
        if inner.outstanding == 0 {
            return Err(RC_NOTHING_TO_FREE);
        }
        inner.outstanding -= 1;
        drop(cleartext);
        Ok(())
    }

    fn sink_close(&self, session: SessionHandle) -> LibResult<()> {
        match self.inner.lock().sessions.remove(&session) {
            Some(_) => Ok(()),
            None => Err(RC_INVALID_SESSION),
        }
    }
}
