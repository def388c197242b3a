//! Media buffers flowing through the element.
//!
//! A buffer either owns plain heap memory (what upstream pushes in) or a
//! cleartext region allocated by the DTCP-IP library. In the latter case the
//! buffer is the region's only owner and hands it back to the library's
//! `free` entry point exactly once, when dropped.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::error::Error;
use crate::library::{Cleartext, DtcpIpLibrary};

enum Memory {
    Owned(Vec<u8>),
    Library {
        // `None` only after the region has been released.
        region: Option<Cleartext>,
        library: Arc<dyn DtcpIpLibrary>,
    },
}

/// A contiguous block of media data.
pub struct Buffer {
    memory: Memory,
}

impl Buffer {
    /// Wrap plain heap memory.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            memory: Memory::Owned(data),
        }
    }

    /// Wrap a library allocated region; `library` frees it on drop.
    pub fn from_cleartext(region: Cleartext, library: Arc<dyn DtcpIpLibrary>) -> Self {
        Self {
            memory: Memory::Library {
                region: Some(region),
                library,
            },
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        match &self.memory {
            Memory::Owned(data) => data,
            Memory::Library { region, .. } => region.as_ref().map_or(&[][..], Cleartext::as_slice),
        }
    }

    /// Whether the bytes belong to the DTCP-IP library.
    #[must_use]
    pub fn is_library_memory(&self) -> bool {
        matches!(self.memory, Memory::Library { .. })
    }

    /// Copy the bytes out. Library memory is released right away.
    #[must_use]
    pub fn into_vec(mut self) -> Vec<u8> {
        match &mut self.memory {
            Memory::Owned(data) => std::mem::take(data),
            Memory::Library { region, .. } => region
                .as_ref()
                .map(|region| region.as_slice().to_vec())
                .unwrap_or_default(),
        }
    }
}

impl Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("size", &self.len())
            .field("library_memory", &self.is_library_memory())
            .finish()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Memory::Library { region, library } = &mut self.memory {
            if let Some(region) = region.take() {
                let size = region.len();
                match library.free(region) {
                    Ok(()) => trace!("Freed {} bytes of cleartext", size),
                    Err(code) => error!("{}", Error::Free { code }),
                }
            }
        }
    }
}
