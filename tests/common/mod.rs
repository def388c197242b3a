#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rsdtcpip::buffer::Buffer;
use rsdtcpip::caps::Caps;
use rsdtcpip::element::DtcpIpDec;
use rsdtcpip::library::{Cleartext, DtcpIpLibrary, LibResult, ReturnCode, SessionHandle};
use rsdtcpip::pad::{Downstream, FlowError, FlowResult};
use rsdtcpip::runtime::Runtime;

/// A library entry point invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CommonInit(PathBuf),
    Version,
    SinkInit,
    SinkOpen(String, u16),
    AllocDecrypt(SessionHandle, usize),
    Free(usize),
    SinkClose(SessionHandle),
}

/// Results the scripted library hands out.
#[derive(Debug, Clone)]
pub struct Script {
    pub common_init: LibResult<()>,
    pub sink_init: LibResult<()>,
    pub open: LibResult<SessionHandle>,
    /// Cleartext length; `None` keeps the input length.
    pub decrypt: LibResult<Option<usize>>,
    pub free: LibResult<()>,
    pub close: LibResult<()>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            common_init: Ok(()),
            sink_init: Ok(()),
            open: Ok(SessionHandle(42)),
            decrypt: Ok(None),
            free: Ok(()),
            close: Ok(()),
        }
    }
}

/// Library double recording every call.
#[derive(Debug, Default)]
pub struct ScriptedLibrary {
    script: Mutex<Script>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedLibrary {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_script(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn update(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.script.lock());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| pred(*call)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

impl DtcpIpLibrary for ScriptedLibrary {
    fn common_init(&self, storage_dir: &Path) -> LibResult<()> {
        self.record(Call::CommonInit(storage_dir.to_path_buf()));
        self.script.lock().common_init
    }

    fn version(&self) -> String {
        self.record(Call::Version);
        "scripted 1.0".to_string()
    }

    fn sink_init(&self) -> LibResult<()> {
        self.record(Call::SinkInit);
        self.script.lock().sink_init
    }

    fn sink_open(&self, host: &str, port: u16) -> LibResult<SessionHandle> {
        self.record(Call::SinkOpen(host.to_string(), port));
        self.script.lock().open
    }

    fn alloc_decrypt(&self, session: SessionHandle, encrypted: &[u8]) -> LibResult<Cleartext> {
        self.record(Call::AllocDecrypt(session, encrypted.len()));
        let size = self.script.lock().decrypt?.unwrap_or(encrypted.len());
        Ok(Cleartext::new(vec![0xC1u8; size]))
    }

    fn free(&self, cleartext: Cleartext) -> LibResult<()> {
        self.record(Call::Free(cleartext.len()));
        self.script.lock().free
    }

    fn sink_close(&self, session: SessionHandle) -> LibResult<()> {
        self.record(Call::SinkClose(session));
        self.script.lock().close
    }
}

pub const FAILED: ReturnCode = ReturnCode(-7);

/// Downstream double with switchable failures.
#[derive(Debug, Default)]
pub struct TestSink {
    pub caps: Option<Caps>,
    pub buffers: Vec<Buffer>,
    pub refuse_caps: bool,
    pub flow: Option<FlowError>,
    pub fail_activate: bool,
    pub fail_deactivate: bool,
}

impl Downstream for TestSink {
    fn set_caps(&mut self, caps: &Caps) -> bool {
        if self.refuse_caps {
            return false;
        }
        self.caps = Some(caps.clone());
        true
    }

    fn push(&mut self, buffer: Buffer) -> FlowResult {
        match self.flow {
            Some(err) => Err(err),
            None => {
                self.buffers.push(buffer);
                Ok(())
            }
        }
    }

    fn activate(&mut self, active: bool) -> FlowResult {
        if (active && self.fail_activate) || (!active && self.fail_deactivate) {
            return Err(FlowError::Error);
        }
        Ok(())
    }
}

/// An element on a fresh runtime, linked to a `TestSink`.
pub fn element(
    library: &Arc<ScriptedLibrary>,
    storage: &Path,
) -> DtcpIpDec<TestSink> {
    let mut element = DtcpIpDec::new(Runtime::with_library(library.clone()));
    element.set_key_storage_dir(storage);
    element.link(TestSink::default());
    element
}
