//! JSON-RPC style messages of the control and image channels
//!
//! Every message is one UTF-8 JSON object terminated by `\r\n`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Line terminator used on every channel
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Outbound command
///
/// # Examples
///
/// ```
/// use seelink_core::Request;
///
/// let line = Request::new(2, "test_connection").encode_line().unwrap();
/// assert_eq!(line, b"{\"id\":2,\"method\":\"test_connection\"}\r\n");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify: Option<bool>,

    pub method: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(id: u64, method: impl Into<String>) -> Self {
        Self {
            id,
            verify: None,
            method: method.into(),
            params: None,
        }
    }

    /// Attach method parameters
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Mark the command as verified (set by the vendor app on one-shot commands)
    pub fn verified(mut self) -> Self {
        self.verify = Some(true);
        self
    }

    /// Serialize as one `\r\n` terminated line
    pub fn encode_line(&self) -> Result<Vec<u8>> {
        let mut line = serde_json::to_vec(self)?;
        line.extend_from_slice(LINE_TERMINATOR);
        Ok(line)
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Request[{}]({})", self.id, self.method)
    }
}

/// Command response
///
/// `{"jsonrpc","Timestamp","method","result","code","id"}`; error
/// responses carry `error` and a non-zero `code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub jsonrpc: Option<String>,

    #[serde(default, rename = "Timestamp")]
    pub timestamp: Option<String>,

    #[serde(default)]
    pub method: Option<String>,

    #[serde(default)]
    pub result: Option<Value>,

    #[serde(default)]
    pub code: Option<i64>,

    #[serde(default)]
    pub id: Option<u64>,

    #[serde(default)]
    pub error: Option<Value>,
}

impl Response {
    /// Parse one response line (terminator optional)
    pub fn parse(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line.trim_end())?)
    }

    /// Check if the device reported success
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.code.unwrap_or(0) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_with_params() {
        let request = Request::new(1, "scope_park")
            .with_params(json!({"equ_mode": true}))
            .verified();
        let line = request.encode_line().unwrap();

        assert!(line.ends_with(b"\r\n"));
        let value: Value = serde_json::from_slice(&line).unwrap();
        assert_eq!(
            value,
            json!({"id": 1, "verify": true, "method": "scope_park", "params": {"equ_mode": true}})
        );
    }

    #[test]
    fn test_response_parse() {
        let line = r#"{"jsonrpc":"2.0","Timestamp":"9507.2","method":"test_connection","result":"ok","code":0,"id":1}"#;
        let response = Response::parse(&format!("{}\r\n", line)).unwrap();

        assert_eq!(response.method.as_deref(), Some("test_connection"));
        assert_eq!(response.result, Some(json!("ok")));
        assert_eq!(response.timestamp.as_deref(), Some("9507.2"));
        assert!(response.is_success());
    }

    #[test]
    fn test_error_response() {
        let line = r#"{"jsonrpc":"2.0","method":"scope_goto","error":"fail to operate","code":207,"id":1}"#;
        let response = Response::parse(line).unwrap();

        assert!(!response.is_success());
        assert_eq!(response.code, Some(207));
    }

    #[test]
    fn test_response_not_json() {
        assert!(Response::parse("garbage").is_err());
    }
}
