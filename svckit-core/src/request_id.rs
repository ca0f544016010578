//! Request-id propagation.
//!
//! Every inbound HTTP request and broker message carries an
//! `x-request-id` header; when one is missing a UUID is generated so the
//! id can be attached to logs and forwarded on outgoing calls.

use crate::envelope::Envelope;
use std::fmt;
use uuid::Uuid;

/// Canonical request-id header/attribute key.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id attached to a unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an id received from the outside.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read the id from an envelope header, if present.
    pub fn from_envelope(envelope: &Envelope) -> Option<Self> {
        envelope.get_header(REQUEST_ID_HEADER).map(Self::new)
    }

    /// Read the id from an envelope header, generating one otherwise.
    pub fn ensure(envelope: &Envelope) -> Self {
        Self::from_envelope(envelope).unwrap_or_else(Self::generate)
    }

    /// Write the id into an envelope header unless one is already set.
    pub fn inject(&self, envelope: &mut Envelope) {
        if !envelope.has_header(REQUEST_ID_HEADER) {
            envelope.set_header(REQUEST_ID_HEADER, self.as_str());
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
