//! Interface to the external DTCP-IP sink library.
//!
//! AKE, content key derivation and decryption all live behind
//! [`DtcpIpLibrary`]. This crate only decides *when* each entry point is
//! called. Implementations are process-wide singletons in practice, so they
//! must be shareable between element instances.

use std::fmt;
use std::path::Path;

/// Status code reported by a failing library call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReturnCode(pub i32);

impl ReturnCode {
    /// Generic failure.
    pub const FAILURE: ReturnCode = ReturnCode(-1);
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a library call: `Err` carries the library's failure code.
pub type LibResult<T> = std::result::Result<T, ReturnCode>;

/// Opaque ticket for one open, authenticated decryption context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(pub i32);

impl SessionHandle {
    /// Sentinel for "no session open".
    pub const INVALID: SessionHandle = SessionHandle(-1);

    #[must_use]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cleartext region allocated by [`DtcpIpLibrary::alloc_decrypt`].
///
/// Must be handed back through [`DtcpIpLibrary::free`]; in this crate that
/// happens when the [`Buffer`](crate::buffer::Buffer) wrapping it is dropped.
#[derive(Debug, PartialEq, Eq)]
pub struct Cleartext {
    data: Box<[u8]>,
}

impl Cleartext {
    pub fn new(data: impl Into<Box<[u8]>>) -> Self {
        Self { data: data.into() }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Take the bytes out of the region, consuming it.
    #[must_use]
    pub fn into_inner(self) -> Box<[u8]> {
        self.data
    }
}

/// Entry points of the external DTCP-IP sink library.
///
/// Call order expected by implementations:
/// `common_init` → `sink_init` → `sink_open` → (`alloc_decrypt` / `free`)*
/// → `sink_close`. The library has no library-wide teardown entry point.
pub trait DtcpIpLibrary: Send + Sync {
    /// Library-wide initialization; `storage_dir` holds the device keys.
    fn common_init(&self, storage_dir: &Path) -> LibResult<()>;

    /// Human readable library version, diagnostic only.
    fn version(&self) -> String;

    /// Initialize the sink (decrypting) role.
    fn sink_init(&self) -> LibResult<()>;

    /// Run AKE with `host:port` and open a decryption session.
    fn sink_open(&self, host: &str, port: u16) -> LibResult<SessionHandle>;

    /// Decrypt `encrypted` into a newly allocated cleartext region.
    fn alloc_decrypt(&self, session: SessionHandle, encrypted: &[u8]) -> LibResult<Cleartext>;

    /// Release a region returned by `alloc_decrypt`.
    fn free(&self, cleartext: Cleartext) -> LibResult<()>;

    /// Close a session opened by `sink_open`.
    fn sink_close(&self, session: SessionHandle) -> LibResult<()>;
}
