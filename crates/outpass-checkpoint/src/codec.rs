//! # Checkpoint Token Codec
//!
//! The payload a resident presents at the gate, as a scanned code or typed
//! in by the operator. It is a compact JSON object:
//!
//! ```json
//! {
//!   "outpass_id": "6f1c…",
//!   "student_id": "a2b4…",
//!   "destination": "City Center",
//!   "from_time": "2024-01-01T14:00:00Z",
//!   "to_time": "2024-01-01T18:00:00Z"
//! }
//! ```
//!
//! The key names match the codes already printed in the field, so existing
//! codes keep scanning.
//!
//! ## Decoding Rules
//!
//! - Payloads over [`MAX_TOKEN_BYTES`] are rejected before parsing.
//! - The payload must be a JSON object carrying all five keys with string
//!   values. Unknown keys are ignored.
//! - Timestamps must be RFC 3339. Any UTC offset is accepted and
//!   normalized; encoding always emits the `Z` form.
//! - The destination must be non-empty and the window must satisfy
//!   `from_time < to_time`.
//!
//! Decoding never touches a store. Whether the token names a real, approved
//! request is the verifier's concern.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use outpass_core::{PrincipalId, RequestId, Timestamp};
use outpass_state::{is_late_return, Direction, OutpassRequest};

/// Largest payload accepted by [`decode`], in bytes.
pub const MAX_TOKEN_BYTES: usize = 4096;

const KEY_REQUEST: &str = "outpass_id";
const KEY_REQUESTER: &str = "student_id";
const KEY_DESTINATION: &str = "destination";
const KEY_WINDOW_START: &str = "from_time";
const KEY_WINDOW_END: &str = "to_time";

// ─── Errors ──────────────────────────────────────────────────────────

/// A payload that is not a well-formed checkpoint token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The payload exceeds [`MAX_TOKEN_BYTES`].
    #[error("token payload is {size} bytes, limit is {max}")]
    TooLarge {
        /// Actual size.
        size: usize,
        /// The limit.
        max: usize,
    },

    /// The payload is not JSON.
    #[error("token payload is not valid JSON: {0}")]
    NotJson(String),

    /// The payload is JSON but not an object.
    #[error("token payload must be a JSON object")]
    NotAnObject,

    /// A required key is absent.
    #[error("token is missing field '{0}'")]
    MissingField(&'static str),

    /// A key is present but its value is unusable.
    #[error("token field '{field}' is invalid: {reason}")]
    InvalidField {
        /// The offending key.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The destination is empty or whitespace.
    #[error("token destination must not be empty")]
    EmptyDestination,

    /// The window does not satisfy `from_time < to_time`.
    #[error("token window start {start} is not before end {end}")]
    InvalidWindow {
        /// Encoded start.
        start: Timestamp,
        /// Encoded end.
        end: Timestamp,
    },
}

// ─── Token ───────────────────────────────────────────────────────────

/// The decoded contents of a checkpoint payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointToken {
    /// The request the token was issued for.
    #[serde(rename = "outpass_id")]
    pub request_id: RequestId,
    /// The resident the request belongs to.
    #[serde(rename = "student_id")]
    pub requester_id: PrincipalId,
    /// Destination as approved.
    pub destination: String,
    /// Start of the validity window.
    #[serde(rename = "from_time")]
    pub window_start: Timestamp,
    /// End of the validity window.
    #[serde(rename = "to_time")]
    pub window_end: Timestamp,
}

impl CheckpointToken {
    /// Capture the token fields of a request.
    pub fn from_request(request: &OutpassRequest) -> Self {
        Self {
            request_id: request.id,
            requester_id: request.requester_id,
            destination: request.destination.clone(),
            window_start: request.window.start(),
            window_end: request.window.end(),
        }
    }

    /// Render the payload string.
    pub fn to_payload(&self) -> String {
        let mut map = Map::new();
        map.insert(KEY_REQUEST.into(), Value::String(self.request_id.0.to_string()));
        map.insert(
            KEY_REQUESTER.into(),
            Value::String(self.requester_id.0.to_string()),
        );
        map.insert(KEY_DESTINATION.into(), Value::String(self.destination.clone()));
        map.insert(
            KEY_WINDOW_START.into(),
            Value::String(self.window_start.to_iso8601()),
        );
        map.insert(
            KEY_WINDOW_END.into(),
            Value::String(self.window_end.to_iso8601()),
        );
        Value::Object(map).to_string()
    }

    /// Whether a return scanned at `at` would be late under this token's
    /// window.
    pub fn is_late_return_at(&self, at: Timestamp) -> bool {
        is_late_return(Direction::Return, self.window_end, at)
    }
}

// ─── Encode / Decode ─────────────────────────────────────────────────

/// Encode a request as a checkpoint payload.
pub fn encode(request: &OutpassRequest) -> String {
    CheckpointToken::from_request(request).to_payload()
}

/// Decode a payload produced by [`encode`] (or by an older issuer using the
/// same keys).
pub fn decode(payload: &str) -> Result<CheckpointToken, TokenError> {
    if payload.len() > MAX_TOKEN_BYTES {
        return Err(TokenError::TooLarge {
            size: payload.len(),
            max: MAX_TOKEN_BYTES,
        });
    }
    let value: Value =
        serde_json::from_str(payload).map_err(|e| TokenError::NotJson(e.to_string()))?;
    let Value::Object(map) = value else {
        return Err(TokenError::NotAnObject);
    };

    let request_id = RequestId(uuid_field(&map, KEY_REQUEST)?);
    let requester_id = PrincipalId(uuid_field(&map, KEY_REQUESTER)?);
    let destination = string_field(&map, KEY_DESTINATION)?.trim().to_string();
    if destination.is_empty() {
        return Err(TokenError::EmptyDestination);
    }
    let window_start = timestamp_field(&map, KEY_WINDOW_START)?;
    let window_end = timestamp_field(&map, KEY_WINDOW_END)?;
    if window_start >= window_end {
        return Err(TokenError::InvalidWindow {
            start: window_start,
            end: window_end,
        });
    }

    Ok(CheckpointToken {
        request_id,
        requester_id,
        destination,
        window_start,
        window_end,
    })
}

/// Decode operator-typed text. Surrounding whitespace is trimmed; the rest
/// goes through [`decode`] unchanged.
pub fn decode_manual(input: &str) -> Result<CheckpointToken, TokenError> {
    decode(input.trim())
}

fn string_field<'a>(map: &'a Map<String, Value>, field: &'static str) -> Result<&'a str, TokenError> {
    match map.get(field) {
        None | Some(Value::Null) => Err(TokenError::MissingField(field)),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(TokenError::InvalidField {
            field,
            reason: format!("expected a string, found {}", json_kind(other)),
        }),
    }
}

fn uuid_field(map: &Map<String, Value>, field: &'static str) -> Result<Uuid, TokenError> {
    let raw = string_field(map, field)?;
    Uuid::parse_str(raw.trim()).map_err(|e| TokenError::InvalidField {
        field,
        reason: e.to_string(),
    })
}

fn timestamp_field(map: &Map<String, Value>, field: &'static str) -> Result<Timestamp, TokenError> {
    let raw = string_field(map, field)?;
    Timestamp::parse_lenient(raw).map_err(|e| TokenError::InvalidField {
        field,
        reason: e.to_string(),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
