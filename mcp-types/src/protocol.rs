//! JSON-RPC 2.0 framing for the Model Context Protocol.
//!
//! MCP servers communicate over newline-delimited JSON on stdio — not the
//! Content-Length framing used by LSP. Each line is exactly one JSON-RPC
//! object: a request, a response, a notification, or an error.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// The only JSON-RPC version this crate speaks.
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC request or response identifier.
///
/// JSON decoders commonly surface integral numbers as floating point, so a
/// server that echoes back the id `1` may send `1.0`. [`RequestId::normalize`]
/// collapses any integral float to the canonical [`RequestId::Integer`] form
/// so id matching never depends on the server's choice of numeric encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum RequestId {
    Integer(i64),
    String(String),
}

// Deserialization is hand-written rather than derived: an untagged derive
// tries each variant's native deserializer in turn, and `i64`'s deserializer
// does not coerce a JSON float like `1.0` into an integer, so a server that
// echoes ids back as floats would fail to parse at all. Going through
// `normalize` instead makes float/int id drift transparent at the one place
// ids enter the system.
impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        RequestId::normalize(&value)
            .ok_or_else(|| serde::de::Error::custom("request id must not be null"))
    }
}

impl RequestId {
    /// Normalize a raw JSON id value per the MCP id-matching rule.
    ///
    /// Returns `None` for `null`, which is never a valid request id.
    pub fn normalize(raw: &Value) -> Option<RequestId> {
        match raw {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(RequestId::Integer(i))
                } else if let Some(f) = n.as_f64() {
                    if f.fract() == 0.0 && f.is_finite() {
                        Some(RequestId::Integer(f as i64))
                    } else {
                        // Non-integral float: no canonical integer form, fall
                        // back to its textual rendering so it still matches
                        // itself on repeated normalization.
                        Some(RequestId::String(n.to_string()))
                    }
                } else {
                    None
                }
            }
            Value::String(s) => Some(RequestId::String(s.clone())),
            _ => None,
        }
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::Integer(i) => write!(f, "{i}"),
            RequestId::String(s) => write!(f, "{s}"),
        }
    }
}

/// An outgoing or incoming JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JSONRPCRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A JSON-RPC notification — a request with no `id` that expects no reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JSONRPCNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A successful JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JSONRPCResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    pub result: Value,
}

/// The `error` object of a JSON-RPC error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JSONRPCErrorError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A JSON-RPC error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JSONRPCError {
    pub jsonrpc: String,
    pub id: RequestId,
    pub error: JSONRPCErrorError,
}

/// Any one of the four JSON-RPC message shapes MCP exchanges over stdio.
///
/// `#[serde(untagged)]` dispatches purely on the presence/absence of `id`,
/// `method`, `result`, and `error` fields, mirroring the wire format (there
/// is no envelope discriminant).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JSONRPCMessage {
    Request(JSONRPCRequest),
    Response(JSONRPCResponse),
    Error(JSONRPCError),
    Notification(JSONRPCNotification),
}

/// Reasons a line of stdio failed to parse as a JSON-RPC message.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("not a recognizable JSON-RPC request, response, or notification")]
    UnknownShape,
    #[error("unsupported jsonrpc version: {0:?}, expected {JSONRPC_VERSION:?}")]
    VersionMismatch(String),
}

/// Decode one line of stdio as a JSON-RPC message.
///
/// Untagged enum deserialization alone can't distinguish "wrong shape" from
/// "wrong version" with a useful error, so we parse to a `Value` first and
/// check `jsonrpc` ourselves before dispatching on shape.
pub fn decode(line: &str) -> Result<JSONRPCMessage, DecodeError> {
    let value: Value = serde_json::from_str(line)?;
    let jsonrpc = value.get("jsonrpc").and_then(Value::as_str);
    if let Some(v) = jsonrpc {
        if v != JSONRPC_VERSION {
            return Err(DecodeError::VersionMismatch(v.to_string()));
        }
    }
    let has_id = value.get("id").is_some_and(|v| !v.is_null());
    let has_method = value.get("method").is_some();
    let has_result = value.get("result").is_some();
    let has_error = value.get("error").is_some();

    let message = if has_method && has_id {
        JSONRPCMessage::Request(serde_json::from_value(value)?)
    } else if has_method && !has_id {
        JSONRPCMessage::Notification(serde_json::from_value(value)?)
    } else if has_error {
        JSONRPCMessage::Error(serde_json::from_value(value)?)
    } else if has_result {
        JSONRPCMessage::Response(serde_json::from_value(value)?)
    } else {
        return Err(DecodeError::UnknownShape);
    };
    Ok(message)
}

/// Encode a message as a single newline-terminated line.
pub fn encode(msg: &JSONRPCMessage) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_json::to_vec(msg)?;
    bytes.push(b'\n');
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_integral_float_to_integer() {
        assert_eq!(
            RequestId::normalize(&json!(1.0)),
            Some(RequestId::Integer(1))
        );
        assert_eq!(
            RequestId::normalize(&json!(1)),
            Some(RequestId::Integer(1))
        );
        assert_eq!(RequestId::normalize(&json!(1)), RequestId::normalize(&json!(1.0)));
    }

    #[test]
    fn strings_pass_through() {
        assert_eq!(
            RequestId::normalize(&json!("abc")),
            Some(RequestId::String("abc".to_string()))
        );
    }

    #[test]
    fn null_is_rejected() {
        assert_eq!(RequestId::normalize(&json!(null)), None);
    }

    #[test]
    fn decode_dispatches_by_shape() {
        let req = r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#;
        assert!(matches!(decode(req).unwrap(), JSONRPCMessage::Request(_)));

        let notif = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        assert!(matches!(
            decode(notif).unwrap(),
            JSONRPCMessage::Notification(_)
        ));

        let resp = r#"{"jsonrpc":"2.0","id":1,"result":{}}"#;
        assert!(matches!(decode(resp).unwrap(), JSONRPCMessage::Response(_)));

        let err = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"nope"}}"#;
        assert!(matches!(decode(err).unwrap(), JSONRPCMessage::Error(_)));
    }

    #[test]
    fn decode_rejects_unknown_shape() {
        let line = r#"{"jsonrpc":"2.0"}"#;
        assert!(matches!(decode(line), Err(DecodeError::UnknownShape)));
    }

    #[test]
    fn decode_rejects_version_mismatch() {
        let line = r#"{"jsonrpc":"1.0","id":1,"method":"x"}"#;
        assert!(matches!(decode(line), Err(DecodeError::VersionMismatch(_))));
    }

    #[test]
    fn encode_appends_newline() {
        let msg = JSONRPCMessage::Notification(JSONRPCNotification {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: "notifications/initialized".to_string(),
            params: None,
        });
        let bytes = encode(&msg).unwrap();
        assert_eq!(*bytes.last().unwrap(), b'\n');
    }
}
