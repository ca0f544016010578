//! Broker message envelope.
//!
//! An [`Envelope`] is the in-process form of a broker message: string
//! headers plus a raw byte payload. The wire form is produced by
//! [`crate::codec::RawJsonCodec`].

use crate::{AdapterError, AdapterResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

/// Well-known header carrying the payload content type.
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";

/// Content type for payloads that bypass envelope processing entirely.
pub const CONTENT_TYPE_BYTES_PLAIN: &str = "application/bytes-plain";

/// Content type guarding protobuf-encoded payloads from content sniffing.
pub const CONTENT_TYPE_GRPC_PROTO: &str = "application/grpc+proto";

/// Broker message: key/value headers plus a raw payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Message headers
    pub header: HashMap<String, String>,
    /// Raw message payload
    pub body: Vec<u8>,
}

impl Envelope {
    /// Create an envelope with an empty header map.
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            header: HashMap::new(),
            body,
        }
    }

    /// Create an envelope from a JSON-serializable value.
    pub fn from_json<T: Serialize>(data: &T) -> AdapterResult<Self> {
        let body = serde_json::to_vec(data)?;
        Ok(Self::new(body))
    }

    /// Add a header, builder style.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.insert(key.into(), value.into());
        self
    }

    /// Get a header value.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.header.get(key).map(|s| s.as_str())
    }

    /// Set a header value.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.header.insert(key.into(), value.into());
    }

    pub fn has_header(&self, key: &str) -> bool {
        self.header.contains_key(key)
    }

    /// The `Content-Type` header, if present.
    pub fn content_type(&self) -> Option<&str> {
        self.get_header(CONTENT_TYPE_HEADER)
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// Payload as a UTF-8 string slice, if valid.
    pub fn body_str(&self) -> AdapterResult<&str> {
        std::str::from_utf8(&self.body)
            .map_err(|e| AdapterError::invalid_data(format!("payload is not valid UTF-8: {}", e)))
    }

    /// Deserialize the payload as JSON.
    pub fn body_json<T: DeserializeOwned>(&self) -> AdapterResult<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| AdapterError::invalid_data(format!("failed to deserialize JSON: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_envelope_basic() {
        let env = Envelope::new(b"test payload".to_vec())
            .with_header("Content-Type", "application/json")
            .with_header("Micro-Topic", "events");

        assert_eq!(env.size(), 12);
        assert_eq!(env.body_str().unwrap(), "test payload");
        assert_eq!(env.content_type(), Some("application/json"));
        assert_eq!(env.get_header("Micro-Topic"), Some("events"));
        assert!(env.has_header("Micro-Topic"));
        assert!(!env.has_header("Missing"));
    }

    #[test]
    fn test_envelope_json_roundtrip() {
        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        struct Event {
            action: String,
            id: u64,
        }

        let event = Event {
            action: "NEW".to_string(),
            id: 42,
        };

        let env = Envelope::from_json(&event).unwrap();
        let decoded: Event = env.body_json().unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_body_str_rejects_invalid_utf8() {
        let env = Envelope::new(vec![0xff, 0xfe]);
        assert!(env.body_str().unwrap_err().is_invalid_data());
    }
}
