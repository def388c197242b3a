//! The `dtcpip` filter element.
//!
//! `DtcpIpDec` decrypts DTCP-IP link-encrypted content in-line: encrypted
//! buffers are pushed in, cleartext buffers come out on the linked
//! [`Downstream`]. Caps are passed through unchanged.
//!
//! ```
//! use rsdtcpip::element::DtcpIpDec;
//! use rsdtcpip::loopback::LoopbackLibrary;
//! use rsdtcpip::pad::{CollectSink, Filter};
//! use rsdtcpip::runtime::Runtime;
//! use rsdtcpip::state::State;
//!
//! # fn main() -> rsdtcpip::error::Result<()> {
//! let runtime = Runtime::new(LoopbackLibrary::new());
//! let mut element = DtcpIpDec::new(runtime);
//! element.link(CollectSink::new());
//! element.set_property_from_str("dtcp1host=10.4.19.241")?;
//! element.set_state(State::Playing)?;
//!
//! element.push_buffer(b"encrypted".to_vec().into()).expect("flow");
//! element.set_state(State::Null)?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::buffer::Buffer;
use crate::caps::{self, Caps};
use crate::config::{PropertyValue, Settings};
use crate::error::{Error, Result};
use crate::library::SessionHandle;
use crate::lifecycle::LifecycleController;
use crate::pad::{Downstream, Filter, FlowError, FlowResult};
use crate::relay::{DecryptRelay, RelayStats};
use crate::runtime::Runtime;
use crate::state::{State, StateChange};

/// Static description of the element.
#[derive(Debug, Clone, Copy)]
pub struct ElementMetadata {
    pub factory_name: &'static str,
    pub long_name: &'static str,
    pub klass: &'static str,
    pub description: &'static str,
    pub sink_template: &'static str,
    pub src_template: &'static str,
}

pub const METADATA: ElementMetadata = ElementMetadata {
    factory_name: "dtcpip",
    long_name: "DTCP-IP decryption",
    klass: "Decrypt/DTCP",
    description: "Decrypts link-encrypted DTCP-IP DLNA content",
    sink_template: caps::SINK_TEMPLATE,
    src_template: caps::SRC_TEMPLATE,
};

/// DTCP-IP decrypting filter.
#[derive(Debug)]
pub struct DtcpIpDec<D> {
    settings: Settings,
    state: State,
    lifecycle: LifecycleController,
    relay: DecryptRelay,
    sink_caps: Option<Caps>,
    src_caps: Option<Caps>,
    downstream: Option<D>,
}

impl<D: Downstream> DtcpIpDec<D> {
    /// Create an element in the `NULL` state using the shared `runtime`.
    pub fn new(runtime: Arc<Runtime>) -> Self {
        Self::with_settings(runtime, Settings::default())
    }

    pub fn with_settings(runtime: Arc<Runtime>, settings: Settings) -> Self {
        debug!("Initializing");
        Self {
            settings,
            state: State::Null,
            lifecycle: LifecycleController::new(runtime),
            relay: DecryptRelay::new(),
            sink_caps: None,
            src_caps: None,
            downstream: None,
        }
    }

    /// Link the output side, replacing any previous peer.
    ///
    /// Caps already negotiated on the input side are offered to the new peer.
    /// If it refuses them the output side is left without caps.
    pub fn link(&mut self, mut downstream: D) -> Option<D> {
        if let Some(caps) = self.sink_caps.as_ref() {
            if downstream.set_caps(caps) {
                self.src_caps = Some(caps.clone());
            } else {
                warn!("Newly linked downstream refused caps {}", caps);
                self.src_caps = None;
            }
        }
        self.downstream.replace(downstream)
    }

    pub fn unlink(&mut self) -> Option<D> {
        self.downstream.take()
    }

    #[must_use]
    pub fn downstream(&self) -> Option<&D> {
        self.downstream.as_ref()
    }

    pub fn downstream_mut(&mut self) -> Option<&mut D> {
        self.downstream.as_mut()
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn peer_host(&self) -> &str {
        &self.settings.peer_host
    }

    /// Takes effect on the next `READY_TO_PAUSED`.
    pub fn set_peer_host(&mut self, host: impl Into<String>) {
        self.settings.peer_host = host.into();
        info!("Host property: {}", self.settings.peer_host);
    }

    #[must_use]
    pub fn peer_port(&self) -> u16 {
        self.settings.peer_port
    }

    pub fn set_peer_port(&mut self, port: u16) {
        self.settings.peer_port = port;
        info!("Port property: {}", port);
    }

    #[must_use]
    pub fn key_storage_dir(&self) -> &Path {
        &self.settings.key_storage_dir
    }

    /// Takes effect on the next `NULL_TO_READY`.
    pub fn set_key_storage_dir(&mut self, dir: impl Into<PathBuf>) {
        self.settings.key_storage_dir = dir.into();
        info!("Key storage property: {}", self.settings.key_storage_dir.display());
    }

    pub fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<()> {
        self.settings.set_property(name, value)
    }

    pub fn property(&self, name: &str) -> Result<PropertyValue> {
        self.settings.property(name)
    }

    pub fn set_property_from_str(&mut self, assignment: &str) -> Result<()> {
        self.settings.set_property_from_str(assignment)
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// Handle of the open session, [`SessionHandle::INVALID`] unless PAUSED
    /// or PLAYING.
    #[must_use]
    pub fn session_handle(&self) -> SessionHandle {
        self.lifecycle.session_handle()
    }

    #[must_use]
    pub fn runtime(&self) -> &Arc<Runtime> {
        self.lifecycle.runtime()
    }

    #[must_use]
    pub fn stats(&self) -> RelayStats {
        self.relay.stats()
    }

    #[must_use]
    pub fn sink_caps(&self) -> Option<&Caps> {
        self.sink_caps.as_ref()
    }

    /// Perform one state transition.
    ///
    /// On failure of an upward transition the element stays in its current
    /// state with no new resources held. Downward transitions always release
    /// their resources and reach the next state, even when reporting an error.
    pub fn change_state(&mut self, transition: StateChange) -> Result<()> {
        if transition.current() != self.state {
            return Err(Error::InvalidStateChange {
                transition,
                current: self.state,
            });
        }

        let downstream = &mut self.downstream;
        let result = self
            .lifecycle
            .change_state(transition, &self.settings, |transition| {
                activate_pads(downstream.as_mut(), transition)
            });

        if result.is_ok() || !transition.is_upward() {
            self.state = transition.next();
        }
        result
    }

    /// Walk through every intermediate state up or down to `target`.
    ///
    /// Going up stops at the first failure. Going down always reaches
    /// `target`; the first failure along the way is returned.
    pub fn set_state(&mut self, target: State) -> Result<()> {
        let mut first_error = None;
        while let Some(transition) = StateChange::towards(self.state, target) {
            if let Err(err) = self.change_state(transition) {
                if transition.is_upward() {
                    return Err(err);
                }
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

// Generic element handling: (de)activate the pads around the streaming
// states.
fn activate_pads<D: Downstream>(downstream: Option<&mut D>, transition: StateChange) -> Result<()> {
    let active = match transition {
        StateChange::ReadyToPaused => true,
        StateChange::PausedToReady => false,
        _ => return Ok(()),
    };
    match downstream {
        Some(downstream) => downstream.activate(active).map_err(Error::PadActivation),
        None => Ok(()),
    }
}

impl<D: Downstream> Filter for DtcpIpDec<D> {
    fn accept_upstream_caps(&mut self, caps: Caps) -> Result<()> {
        debug!("Setting caps {}", caps);
        if let Some(downstream) = self.downstream.as_mut() {
            if !downstream.set_caps(&caps) {
                warn!("Downstream refused caps {}", caps);
                return Err(Error::NotNegotiated(caps));
            }
        }
        self.src_caps = Some(caps.clone());
        self.sink_caps = Some(caps);
        Ok(())
    }

    fn downstream_caps(&self) -> Option<&Caps> {
        self.src_caps.as_ref()
    }

    fn push_buffer(&mut self, buffer: Buffer) -> FlowResult {
        let Some(downstream) = self.downstream.as_mut() else {
            return Err(FlowError::NotLinked);
        };
        self.relay
            .process(self.lifecycle.session(), buffer, downstream)
    }
}
