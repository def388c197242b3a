//! One-input, one-output filter contract.
//!
//! The host pipeline is reduced to what the element needs from it: a
//! [`Downstream`] peer that accepts caps and buffers, and the [`Filter`]
//! operations the upstream side drives.

use thiserror::Error;

use crate::buffer::Buffer;
use crate::caps::Caps;
use crate::error::Result;

/// Why a buffer could not be processed or forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FlowError {
    /// The element is not activated (no open session).
    #[error("flushing")]
    Flushing,
    /// There is no downstream peer.
    #[error("not linked")]
    NotLinked,
    /// Downstream does not want more data.
    #[error("end of stream")]
    Eos,
    /// Fatal data path error; the stream is broken.
    #[error("error")]
    Error,
}

/// Outcome of pushing one buffer.
pub type FlowResult = std::result::Result<(), FlowError>;

/// The next stage of the pipeline.
pub trait Downstream {
    /// Receive the caps that will describe following buffers.
    fn set_caps(&mut self, caps: &Caps) -> bool;

    /// Receive a buffer; ownership moves downstream.
    fn push(&mut self, buffer: Buffer) -> FlowResult;

    /// Pad (de)activation on READY <-> PAUSED.
    fn activate(&mut self, _active: bool) -> FlowResult {
        Ok(())
    }
}

impl<D: Downstream + ?Sized> Downstream for Box<D> {
    fn set_caps(&mut self, caps: &Caps) -> bool {
        (**self).set_caps(caps)
    }

    fn push(&mut self, buffer: Buffer) -> FlowResult {
        (**self).push(buffer)
    }

    fn activate(&mut self, active: bool) -> FlowResult {
        (**self).activate(active)
    }
}

/// Operations the upstream side drives on a filter element.
pub trait Filter {
    /// Caps arrived on the input side.
    fn accept_upstream_caps(&mut self, caps: Caps) -> Result<()>;

    /// Caps currently set on the output side.
    fn downstream_caps(&self) -> Option<&Caps>;

    /// Process one input buffer.
    fn push_buffer(&mut self, buffer: Buffer) -> FlowResult;
}

/// Downstream that keeps everything it receives.
#[derive(Debug, Default)]
pub struct CollectSink {
    pub caps: Option<Caps>,
    pub buffers: Vec<Buffer>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All received bytes, in order.
    #[must_use]
    pub fn concat(&self) -> Vec<u8> {
        self.buffers.iter().flat_map(|b| b.iter().copied()).collect()
    }
}

impl Downstream for CollectSink {
    fn set_caps(&mut self, caps: &Caps) -> bool {
        self.caps = Some(caps.clone());
        true
    }

    fn push(&mut self, buffer: Buffer) -> FlowResult {
        self.buffers.push(buffer);
        Ok(())
    }
}
