//! rsdtcpip - DTCP-IP decryption filter element.
//!
//! This crate provides:
//! - The `dtcpip` element: a one-input, one-output filter that decrypts
//!   DTCP-IP link-encrypted buffers in-line.
//! - The lifecycle protocol driving an external DTCP-IP sink library across
//!   element state changes (library init, session open, session close).
//! - Explicit process-wide library state shared between element instances.
//! - A loopback library for running pipelines without a DTCP source device.
//!
//! AKE and decryption are delegated to an implementation of
//! [`library::DtcpIpLibrary`].
//!
//! Feature flags:
//! - `tracing`: emit diagnostics through `tracing` (default).
//! - `cli`: build the `rsdtcpip` binary.

#[macro_use]
mod macros;

/// Media buffers and ownership of library allocated cleartext.
pub mod buffer;
/// Capability descriptions.
pub mod caps;
/// Element properties and configuration files.
pub mod config;
/// The `dtcpip` element.
pub mod element;
/// Common error types and Result alias.
pub mod error;
/// Interface to the external DTCP-IP library.
pub mod library;
/// State-change driven library lifecycle.
pub mod lifecycle;
/// Pass-through library implementation.
pub mod loopback;
/// Filter and downstream contracts.
pub mod pad;
/// Data path decryption.
pub mod relay;
/// Process-wide library state.
pub mod runtime;
/// Element states and transitions.
pub mod state;
