//! Maps element state changes onto DTCP-IP library calls.
//!
//! | transition        | before generic handling      | after generic handling |
//! |-------------------|------------------------------|------------------------|
//! | `NULL_TO_READY`   | common init, version, sink init |                     |
//! | `READY_TO_PAUSED` | open session with the peer   |                        |
//! | `PAUSED_TO_READY` |                              | close session          |
//! | `READY_TO_NULL`   |                              | drop library reference |
//!
//! Resources acquired before the generic handling are only committed once it
//! succeeds; otherwise they are released again, so a failed activation never
//! leaves a session open. Teardown is best-effort and always completes.

use std::sync::Arc;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::library::{DtcpIpLibrary, SessionHandle};
use crate::runtime::{LibraryRef, Runtime};
use crate::state::StateChange;

/// An open sink session. Closed exactly once, explicitly or on drop.
pub struct SinkSession {
    library: Arc<dyn DtcpIpLibrary>,
    handle: SessionHandle,
    open: bool,
}

impl SinkSession {
    /// Run AKE with the peer and open a session.
    pub fn open(library: Arc<dyn DtcpIpLibrary>, host: &str, port: u16) -> Result<Self> {
        if host.is_empty() {
            error!("Cannot open session: {}", Error::MissingPeerHost);
            return Err(Error::MissingPeerHost);
        }

        match library.sink_open(host, port) {
            Ok(handle) => {
                debug!("Opened session {} with {}:{}", handle, host, port);
                Ok(Self {
                    library,
                    handle,
                    open: true,
                })
            }
            Err(code) => {
                let err = Error::SessionOpen {
                    host: host.to_string(),
                    port,
                    code,
                };
                error!("{}", err);
                Err(err)
            }
        }
    }

    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        self.handle
    }

    #[must_use]
    pub fn library(&self) -> &Arc<dyn DtcpIpLibrary> {
        &self.library
    }

    /// Close the session, reporting the library's verdict.
    pub fn close(mut self) -> Result<()> {
        self.open = false;
        self.library
            .sink_close(self.handle)
            .map_err(|code| Error::SessionClose {
                handle: self.handle,
                code,
            })
    }
}

impl std::fmt::Debug for SinkSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkSession")
            .field("handle", &self.handle)
            .field("open", &self.open)
            .finish()
    }
}

impl Drop for SinkSession {
    fn drop(&mut self) {
        if self.open {
            if let Err(code) = self.library.sink_close(self.handle) {
                error!(
                    "{}",
                    Error::SessionClose {
                        handle: self.handle,
                        code,
                    }
                );
            }
        }
    }
}

/// Resource taken by the first half of an upward transition.
enum Acquired {
    Nothing,
    Library(LibraryRef),
    Session(SinkSession),
}

/// Owner of the library reference and the session of one element.
#[derive(Debug)]
pub struct LifecycleController {
    // Field order is drop order: the session closes before the library goes.
    session: Option<SinkSession>,
    library: Option<LibraryRef>,
    runtime: Arc<Runtime>,
}

impl LifecycleController {
    pub fn new(runtime: Arc<Runtime>) -> Self {
        Self {
            session: None,
            library: None,
            runtime,
        }
    }

    #[must_use]
    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// Handle of the open session, or [`SessionHandle::INVALID`].
    #[must_use]
    pub fn session_handle(&self) -> SessionHandle {
        self.session
            .as_ref()
            .map_or(SessionHandle::INVALID, SinkSession::handle)
    }

    #[must_use]
    pub fn session(&self) -> Option<&SinkSession> {
        self.session.as_ref()
    }

    /// Whether this element holds the initialized library.
    #[must_use]
    pub fn holds_library(&self) -> bool {
        self.library.is_some()
    }

    /// Perform `transition`, running `parent` (generic element handling)
    /// between the acquire and release halves.
    ///
    /// Upward: a failure in either half aborts, and whatever was acquired is
    /// released before returning. Downward: the release half always runs and
    /// the first failure of `parent` is returned afterwards; close failures
    /// are only logged.
    pub fn change_state<F>(
        &mut self,
        transition: StateChange,
        settings: &Settings,
        parent: F,
    ) -> Result<()>
    where
        F: FnOnce(StateChange) -> Result<()>,
    {
        debug!("State change {}", transition);

        let acquired = self.acquire(transition, settings)?;

        if let Err(err) = parent(transition) {
            error!("Problems with parent class state change: {}", err);
            if transition.is_upward() {
                Self::discard(acquired);
            } else {
                self.release(transition);
            }
            return Err(err);
        }

        self.commit(acquired);
        self.release(transition);
        Ok(())
    }

    fn acquire(&mut self, transition: StateChange, settings: &Settings) -> Result<Acquired> {
        match transition {
            // Allocate non-stream-specific resources.
            StateChange::NullToReady if self.library.is_none() => {
                let library = self.runtime.acquire(&settings.key_storage_dir)?;
                Ok(Acquired::Library(library))
            }
            // Allocate stream-specific resources.
            StateChange::ReadyToPaused if self.session.is_none() => {
                let library = match &self.library {
                    Some(library) => Arc::clone(library.library()),
                    None => {
                        return Err(Error::Other(
                            "Cannot open a session before the library is initialized".to_string(),
                        ))
                    }
                };
                let session =
                    SinkSession::open(library, &settings.peer_host, settings.peer_port)?;
                Ok(Acquired::Session(session))
            }
            _ => Ok(Acquired::Nothing),
        }
    }

    fn commit(&mut self, acquired: Acquired) {
        match acquired {
            Acquired::Nothing => {}
            Acquired::Library(library) => self.library = Some(library),
            Acquired::Session(session) => self.session = Some(session),
        }
    }

    fn discard(acquired: Acquired) {
        match acquired {
            Acquired::Nothing | Acquired::Library(_) => {}
            Acquired::Session(session) => {
                if let Err(err) = session.close() {
                    error!("{}", err);
                }
            }
        }
    }

    fn release(&mut self, transition: StateChange) {
        match transition {
            // De-allocate stream-specific resources.
            StateChange::PausedToReady => {
                if let Some(session) = self.session.take() {
                    let handle = session.handle();
                    match session.close() {
                        Ok(()) => debug!("Closed session {}", handle),
                        // Closing anyway: the element leaves PAUSED regardless.
                        Err(err) => error!("{}", err),
                    }
                }
            }
            // Library-wide state stays initialized; only our claim goes.
            StateChange::ReadyToNull => {
                self.library = None;
            }
            _ => {}
        }
    }
}
