//! Data path: decrypt one buffer and forward the cleartext.

use std::sync::Arc;

use crate::buffer::Buffer;
use crate::error::Error;
use crate::lifecycle::SinkSession;
use crate::pad::{Downstream, FlowError, FlowResult};

/// Running totals of the data path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Buffers forwarded downstream.
    pub buffers: u64,
    /// Encrypted bytes received.
    pub encrypted_bytes: u64,
    /// Cleartext bytes forwarded.
    pub cleartext_bytes: u64,
    /// Buffers dropped because decryption failed.
    pub decrypt_failures: u64,
}

/// Decrypts buffers through an open session.
#[derive(Debug, Default)]
pub struct DecryptRelay {
    stats: RelayStats,
}

impl DecryptRelay {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    /// Decrypt `inbuf` with `session` and push the result to `downstream`.
    ///
    /// Without a session nothing is decrypted and `Flushing` is returned. A
    /// decrypt failure forwards nothing and returns `Error`. Otherwise the
    /// downstream flow result is returned. The pushed buffer owns the
    /// library's cleartext region and frees it when downstream drops it.
    pub fn process<D>(
        &mut self,
        session: Option<&SinkSession>,
        inbuf: Buffer,
        downstream: &mut D,
    ) -> FlowResult
    where
        D: Downstream + ?Sized,
    {
        let Some(session) = session else {
            error!("Dropping {} byte buffer: no open session", inbuf.len());
            return Err(FlowError::Flushing);
        };
        let handle = session.handle();
        trace!("buffer of {} bytes in session {}", inbuf.len(), handle);

        let encrypted_size = inbuf.len();
        let decrypted = session.library().alloc_decrypt(handle, &inbuf);
        // The library never keeps a reference to its input.
        drop(inbuf);
        self.stats.encrypted_bytes += encrypted_size as u64;

        let cleartext = match decrypted {
            Ok(cleartext) => cleartext,
            Err(code) => {
                self.stats.decrypt_failures += 1;
                error!("{}", Error::Decrypt { handle, code });
                return Err(FlowError::Error);
            }
        };

        let outbuf = Buffer::from_cleartext(cleartext, Arc::clone(session.library()));
        let cleartext_size = outbuf.len();
        trace!("decrypted {} bytes into {} bytes", encrypted_size, cleartext_size);

        downstream.push(outbuf)?;
        self.stats.buffers += 1;
        self.stats.cleartext_bytes += cleartext_size as u64;
        Ok(())
    }
}
