//! Process-wide state of the DTCP-IP library.
//!
//! The library is a singleton: `common_init` and `sink_init` configure it for
//! the whole process. A [`Runtime`] wraps one library and is shared by every
//! element using it. It counts the elements that hold the library (READY or
//! above) and only initializes on the first one. The library has no teardown
//! entry point, so the last release leaves it initialized; the next first
//! acquisition initializes it again.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, InitStage, Result};
use crate::library::DtcpIpLibrary;

#[derive(Debug, Default)]
struct InitState {
    storage_dir: Option<PathBuf>,
    version: Option<String>,
    users: usize,
}

/// Shared handle to the process-wide DTCP-IP library.
pub struct Runtime {
    library: Arc<dyn DtcpIpLibrary>,
    state: Mutex<InitState>,
}

impl Runtime {
    pub fn new(library: impl DtcpIpLibrary + 'static) -> Arc<Self> {
        Self::with_library(Arc::new(library))
    }

    pub fn with_library(library: Arc<dyn DtcpIpLibrary>) -> Arc<Self> {
        Arc::new(Self {
            library,
            state: Mutex::new(InitState::default()),
        })
    }

    #[must_use]
    pub fn library(&self) -> &Arc<dyn DtcpIpLibrary> {
        &self.library
    }

    /// Number of elements currently holding the library.
    #[must_use]
    pub fn users(&self) -> usize {
        self.state.lock().users
    }

    /// Version string reported by the last initialization.
    #[must_use]
    pub fn version(&self) -> Option<String> {
        self.state.lock().version.clone()
    }

    /// Take a reference on the initialized library, initializing it first if
    /// nobody holds it.
    ///
    /// While the library is held, every user must agree on `storage_dir`.
    pub fn acquire(self: &Arc<Self>, storage_dir: &Path) -> Result<LibraryRef> {
        let mut state = self.state.lock();

        if state.users == 0 {
            self.initialize(storage_dir, &mut state)?;
        } else if state.storage_dir.as_deref() != Some(storage_dir) {
            return Err(Error::StorageConflict {
                active: state.storage_dir.clone().unwrap_or_default(),
                requested: storage_dir.to_path_buf(),
            });
        } else {
            debug!("DTCP-IP library already initialized, {} user(s)", state.users);
        }

        state.users += 1;
        Ok(LibraryRef {
            runtime: Arc::clone(self),
        })
    }

    fn initialize(&self, storage_dir: &Path, state: &mut InitState) -> Result<()> {
        state.storage_dir = None;
        state.version = None;

        if let Err(code) = self.library.common_init(storage_dir) {
            let err = Error::LibraryInit {
                stage: InitStage::Common,
                storage_dir: storage_dir.to_path_buf(),
                code,
            };
            error!("{}", err);
            return Err(err);
        }
        debug!("Initialized common library with storage {}", storage_dir.display());

        let version = self.library.version();
        debug!("DTCP-IP library version \"{}\"", version);

        debug!("Calling sink init");
        if let Err(code) = self.library.sink_init() {
            let err = Error::LibraryInit {
                stage: InitStage::Sink,
                storage_dir: storage_dir.to_path_buf(),
                code,
            };
            error!("{}", err);
            return Err(err);
        }
        debug!("Initialized sink");

        state.storage_dir = Some(storage_dir.to_path_buf());
        state.version = Some(version);
        Ok(())
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.users = state.users.saturating_sub(1);
        if state.users == 0 {
            // Nothing to call: the library cannot be torn down.
            debug!("Last user released the DTCP-IP library");
        }
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

/// One element's claim on the initialized library. Released on drop.
#[derive(Debug)]
pub struct LibraryRef {
    runtime: Arc<Runtime>,
}

impl LibraryRef {
    #[must_use]
    pub fn library(&self) -> &Arc<dyn DtcpIpLibrary> {
        self.runtime.library()
    }
}

impl Drop for LibraryRef {
    fn drop(&mut self) {
        self.runtime.release();
    }
}
