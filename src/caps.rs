//! Capability descriptions passed between filter stages.

use std::fmt;

/// Media type the sink side is registered for.
pub const SINK_TEMPLATE: &str = "application/x-dtcp1";
/// The source side produces whatever the content is.
pub const SRC_TEMPLATE: &str = "ANY";

/// An opaque capability description, e.g. `video/mpegts, systemstream=true`.
///
/// The element never interprets caps; it only forwards them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Caps(String);

impl Caps {
    pub fn new(description: impl Into<String>) -> Self {
        Self(description.into())
    }
}

impl fmt::Display for Caps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
