//! Envelope wire codec.
//!
//! The broker wire format is `{"Header": {...}, "Body": <JSON string>}`.
//! Payloads arrive in several historical shapes (raw JSON, quoted JSON,
//! base64-wrapped text), so both directions normalize the body before
//! passing it on: unquote a JSON string literal, then undo one layer of
//! base64 when the result is valid UTF-8. Headers carrying `Bearer`
//! credentials are dropped on both paths.
//!
//! Two content types short-circuit the sniffing:
//! - `application/bytes-plain`: the body is passed through untouched;
//! - `application/grpc+proto`: the envelope is carried verbatim with the
//!   body as base64, so protobuf payloads are never inspected.
//!
//! Outside those guards the body travels as a JSON string, which cannot
//! carry arbitrary bytes: invalid UTF-8 is replaced with U+FFFD on
//! encode. Binary payloads must use one of the guard content types.

use crate::envelope::{Envelope, CONTENT_TYPE_BYTES_PLAIN, CONTENT_TYPE_GRPC_PROTO};
use crate::{AdapterError, AdapterResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::collections::HashMap;

/// Substring marking a header value as a credential.
const REDACT_MARKER: &str = "Bearer";

/// Wire shape of an envelope.
#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    #[serde(rename = "Header", default)]
    header: HashMap<String, String>,
    #[serde(rename = "Body", default)]
    body: Option<Box<RawValue>>,
}

/// Stateless codec between [`Envelope`] and the broker wire format.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawJsonCodec;

impl RawJsonCodec {
    pub fn new() -> Self {
        Self
    }

    /// Codec name, used for content-type registration and logging.
    pub fn name(&self) -> &'static str {
        "rawjson"
    }

    /// Encode an envelope into the wire format.
    pub fn encode(&self, envelope: &Envelope) -> AdapterResult<Vec<u8>> {
        // Not a framework message, pass the payload as-is.
        if envelope.header.is_empty() {
            return Ok(envelope.body.clone());
        }

        match envelope.content_type() {
            Some(CONTENT_TYPE_BYTES_PLAIN) => return Ok(envelope.body.clone()),
            Some(CONTENT_TYPE_GRPC_PROTO) => {
                // Protobuf payload: carry the envelope verbatim, body as base64.
                let wire = WireEnvelope {
                    header: envelope.header.clone(),
                    body: Some(raw_string(&BASE64.encode(&envelope.body))?),
                };
                return Ok(serde_json::to_vec(&wire)?);
            }
            _ => {}
        }

        // Lossy: the wire body is a JSON string, so non-UTF-8 bytes become
        // U+FFFD here. Binary payloads belong under a guard content type.
        let body = normalize_body(&String::from_utf8_lossy(&envelope.body));
        let wire = WireEnvelope {
            header: redact(&envelope.header),
            body: Some(raw_string(&body)?),
        };

        Ok(serde_json::to_vec(&wire)?)
    }

    /// Decode the wire format into an envelope.
    pub fn decode(&self, data: &[u8]) -> AdapterResult<Envelope> {
        let wire: WireEnvelope = serde_json::from_slice(data)
            .map_err(|e| AdapterError::codec(format!("malformed wire envelope: {}", e)))?;

        let raw_body = wire.body.as_ref().map(|b| b.get()).unwrap_or_default();

        // Protobuf payload: decode the base64 body without sniffing.
        if wire.header.get(crate::envelope::CONTENT_TYPE_HEADER).map(String::as_str)
            == Some(CONTENT_TYPE_GRPC_PROTO)
        {
            let encoded: String = serde_json::from_str(raw_body)
                .map_err(|e| AdapterError::codec(format!("malformed protobuf body: {}", e)))?;
            let body = BASE64
                .decode(encoded.as_bytes())
                .map_err(|e| AdapterError::codec(format!("malformed protobuf body: {}", e)))?;
            return Ok(Envelope {
                header: wire.header,
                body,
            });
        }

        let body = normalize_body(raw_body);

        Ok(Envelope {
            header: redact(&wire.header),
            body: body.into_bytes(),
        })
    }

    /// Serialize a plain value, bypassing envelope handling.
    pub fn encode_value<T: Serialize>(&self, value: &T) -> AdapterResult<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    /// Deserialize a plain value, bypassing envelope handling.
    pub fn decode_value<T: DeserializeOwned>(&self, data: &[u8]) -> AdapterResult<T> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Unquote a JSON string literal if the body is one, then undo a single
/// layer of base64 when the decoded bytes are valid UTF-8.
fn normalize_body(body: &str) -> String {
    let mut dst = body.to_string();

    if let Ok(unquoted) = serde_json::from_str::<String>(&dst) {
        dst = unquoted;
    }

    if let Ok(decoded) = BASE64.decode(dst.as_bytes()) {
        if let Ok(text) = String::from_utf8(decoded) {
            dst = text;
        }
    }

    dst
}

/// Copy headers, dropping any value carrying a credential.
fn redact(header: &HashMap<String, String>) -> HashMap<String, String> {
    header
        .iter()
        .filter(|(_, v)| !v.contains(REDACT_MARKER))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Quote `text` into a raw JSON string value for the wire `Body` field.
fn raw_string(text: &str) -> AdapterResult<Box<RawValue>> {
    let quoted = serde_json::to_string(text)?;
    RawValue::from_string(quoted).map_err(AdapterError::Serialization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn codec() -> RawJsonCodec {
        RawJsonCodec::new()
    }

    fn envelope(body: &str) -> Envelope {
        Envelope::new(body.as_bytes().to_vec())
            .with_header("Content-Type", "application/json")
            .with_header("Micro-Topic", "test_topic")
    }

    #[test]
    fn test_encode_wraps_body_as_json_string() {
        let env = envelope(r#"{"ACTION": "NEW","ID": "220661547858"}"#);
        let wire = codec().encode(&env).unwrap();

        let parsed: Value = serde_json::from_slice(&wire).unwrap();
        assert_eq!(parsed["Header"]["Micro-Topic"], "test_topic");
        assert_eq!(parsed["Body"], r#"{"ACTION": "NEW","ID": "220661547858"}"#);
    }

    #[test]
    fn test_roundtrip_restores_body() {
        let env = envelope(r#"{"EVENTID":"2020061515015270469"}"#);
        let wire = codec().encode(&env).unwrap();
        let decoded = codec().decode(&wire).unwrap();

        assert_eq!(decoded.body, env.body);
        assert_eq!(decoded.get_header("Micro-Topic"), Some("test_topic"));
    }

    #[test]
    fn test_encode_unquotes_quoted_body() {
        // Payload already wrapped in a JSON string literal: one layer comes off.
        let env = envelope(r#""{\"a\":1}""#);
        let wire = codec().encode(&env).unwrap();

        let parsed: Value = serde_json::from_slice(&wire).unwrap();
        assert_eq!(parsed["Body"], r#"{"a":1}"#);
    }

    #[test]
    fn test_encode_unwraps_base64_text() {
        let b64 = BASE64.encode(r#"{"hello":"world"}"#);
        let env = envelope(&b64);
        let wire = codec().encode(&env).unwrap();

        let parsed: Value = serde_json::from_slice(&wire).unwrap();
        assert_eq!(parsed["Body"], r#"{"hello":"world"}"#);
    }

    #[test]
    fn test_base64_binary_is_left_alone() {
        // Decodes as base64 but not to UTF-8 text, so the body stays as-is.
        let b64 = BASE64.encode([0xff, 0xfe, 0xfd, 0xfc]);
        let env = envelope(&b64);
        let decoded = codec().decode(&codec().encode(&env).unwrap()).unwrap();
        assert_eq!(decoded.body, b64.as_bytes());
    }

    #[test]
    fn test_bearer_headers_are_redacted() {
        let env = envelope("{}").with_header("Authorization", "Bearer secret-token");
        let wire = codec().encode(&env).unwrap();

        let parsed: Value = serde_json::from_slice(&wire).unwrap();
        assert!(parsed["Header"].get("Authorization").is_none());
        assert_eq!(parsed["Header"]["Micro-Topic"], "test_topic");

        let decoded = codec().decode(&wire).unwrap();
        assert!(!decoded.has_header("Authorization"));
    }

    #[test]
    fn test_empty_header_passes_body_through() {
        let env = Envelope::new(b"opaque bytes".to_vec());
        let wire = codec().encode(&env).unwrap();
        assert_eq!(wire, b"opaque bytes");
    }

    #[test]
    fn test_bytes_plain_passes_body_through() {
        let env = Envelope::new(b"\x00\x01\x02".to_vec())
            .with_header("Content-Type", CONTENT_TYPE_BYTES_PLAIN);
        let wire = codec().encode(&env).unwrap();
        assert_eq!(wire, b"\x00\x01\x02");
    }

    #[test]
    fn test_grpc_proto_guard_skips_sniffing() {
        let payload = vec![0x08, 0x96, 0x01]; // arbitrary protobuf bytes
        let env = Envelope::new(payload.clone())
            .with_header("Content-Type", CONTENT_TYPE_GRPC_PROTO)
            .with_header("Authorization", "Bearer secret");

        let wire = codec().encode(&env).unwrap();
        let parsed: Value = serde_json::from_slice(&wire).unwrap();
        // Verbatim path: no redaction, body is base64.
        assert_eq!(parsed["Header"]["Authorization"], "Bearer secret");
        assert_eq!(parsed["Body"], BASE64.encode(&payload));

        let decoded = codec().decode(&wire).unwrap();
        assert_eq!(decoded.body, payload);
    }

    #[test]
    fn test_invalid_utf8_body_is_replaced_outside_guards() {
        // Without a guard content type the body travels as a JSON string,
        // so non-UTF-8 bytes are rewritten to the replacement character.
        let env = Envelope::new(vec![0xff, 0xfe]).with_header("Content-Type", "application/json");
        let wire = codec().encode(&env).unwrap();

        let parsed: Value = serde_json::from_slice(&wire).unwrap();
        assert_eq!(parsed["Body"], "\u{fffd}\u{fffd}");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = codec().decode(b"not json at all").unwrap_err();
        assert!(err.is_invalid_data());
    }

    #[test]
    fn test_plain_value_fallback() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Ping {
            seq: u32,
        }

        let bytes = codec().encode_value(&Ping { seq: 7 }).unwrap();
        let back: Ping = codec().decode_value(&bytes).unwrap();
        assert_eq!(back, Ping { seq: 7 });
    }
}
