//! Turns remote API failures into readable error messages.
//!
//! Google APIs report failures as `{"error": {"code", "status", "message", "details"}}`.
//! [`ApiFailure`] keeps that body (when there is one) next to the HTTP code and the
//! transport message, and the functions here compose:
//!
//! - [`describe`]: a one-line summary prefixed by the stage context, plus a
//!   remediation hint for the well-known "API disabled" permission failure.
//! - [`diagnostic_block`]: the multi-line block printed once at the outermost
//!   reporting boundary.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

const API_DISABLED_HINT: &str = "Ensure the Apps Script API is enabled for the project by visiting https://script.google.com/home/usersettings.";

/// Structured error body returned by the remote service.
///
/// Every field is optional; presence is checked explicitly by the formatters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<Value>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<RemoteStatus>,
}

/// A failed call to the remote API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiFailure {
    /// Transport-level message, or the raw response text when no structured body was found.
    pub message: String,
    /// HTTP status code of the response, when a response was received.
    pub http_code: Option<u16>,
    pub remote: Option<RemoteStatus>,
}

impl ApiFailure {
    /// A failure where no response was received (connection, TLS, decoding...).
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            http_code: None,
            remote: None,
        }
    }

    /// Builds a failure from a non-success response, decoding the Google error envelope if present.
    pub fn from_response(http_code: u16, body: &str) -> Self {
        let remote = serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .and_then(|envelope| envelope.error);
        let message = if remote.is_some() || body.trim().is_empty() {
            format!("HTTP {http_code}")
        } else {
            body.trim().to_string()
        };
        Self {
            message,
            http_code: Some(http_code),
            remote,
        }
    }

    fn remote_message(&self) -> Option<&str> {
        self.remote
            .as_ref()
            .and_then(|r| r.message.as_deref())
            .filter(|m| !m.is_empty())
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.remote_message() {
            Some(message) => f.write_str(message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ApiFailure {}

/// Composes `"<context> <status-or-code>: <message>."` for a failure, with a remediation
/// hint appended when the Apps Script API is disabled for the caller's project.
pub fn describe(context: &str, failure: &ApiFailure) -> String {
    let mut parts = vec![context.to_string()];
    if let Some(summary) = summarize(failure) {
        parts.push(summary);
    }
    if let Some(hint) = remediation_hint(failure) {
        parts.push(hint.to_string());
    }
    parts.join(" ")
}

fn summarize(failure: &ApiFailure) -> Option<String> {
    if let Some(message) = failure.remote_message() {
        let remote = failure.remote.as_ref()?;
        let label = remote
            .status
            .clone()
            .or_else(|| remote.code.map(|c| c.to_string()))
            .or_else(|| failure.http_code.map(|c| c.to_string()));
        let stop = if message.ends_with('.') { "" } else { "." };
        return Some(match label {
            Some(label) => format!("{label}: {message}{stop}"),
            None => format!("{message}{stop}"),
        });
    }
    if failure.message.is_empty() {
        None
    } else {
        Some(failure.message.clone())
    }
}

fn remediation_hint(failure: &ApiFailure) -> Option<&'static str> {
    let remote = failure.remote.as_ref()?;
    if remote.status.as_deref() != Some("PERMISSION_DENIED") {
        return None;
    }
    let message = failure.remote_message().unwrap_or(&failure.message);
    message
        .to_lowercase()
        .contains("apps script api")
        .then_some(API_DISABLED_HINT)
}

/// Multi-line diagnostic for the top-level report: status, HTTP code, message and details.
///
/// Without a structured body this is just `Cause: <message>`, or nothing at all.
pub fn diagnostic_block(failure: &ApiFailure) -> Option<String> {
    let Some(remote) = failure.remote.as_ref() else {
        return (!failure.message.is_empty()).then(|| format!("Cause: {}", failure.message));
    };
    let mut lines = Vec::new();
    if let Some(status) = &remote.status {
        lines.push(format!("Status: {status}"));
    }
    if let Some(code) = failure.http_code {
        lines.push(format!("Code: {code}"));
    }
    if let Some(message) = &remote.message {
        lines.push(format!("Message: {message}"));
    }
    if let Some(details) = status_details(remote) {
        lines.push(format!("Details: {details}"));
    }
    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Renders the `details` entries of a status payload, `;`-joined.
pub fn status_details(status: &RemoteStatus) -> Option<String> {
    let rendered: Vec<String> = status
        .details
        .iter()
        .map(render_detail)
        .filter(|d| !d.is_empty())
        .collect();
    (!rendered.is_empty()).then(|| rendered.join("; "))
}

fn render_detail(detail: &Value) -> String {
    for key in ["errorType", "detail"] {
        if let Some(text) = detail.get(key).and_then(Value::as_str) {
            if !text.is_empty() {
                return text.to_string();
            }
        }
    }
    match detail {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn permission_denied(message: &str) -> ApiFailure {
        ApiFailure {
            message: "HTTP 403".into(),
            http_code: Some(403),
            remote: Some(RemoteStatus {
                code: Some(403),
                status: Some("PERMISSION_DENIED".into()),
                message: Some(message.into()),
                details: vec![],
            }),
        }
    }

    #[test]
    fn describe_uses_remote_status_and_message() {
        let failure = permission_denied("The caller does not have permission");
        assert_eq!(
            describe("version creation failed.", &failure),
            "version creation failed. PERMISSION_DENIED: The caller does not have permission."
        );
    }

    #[test]
    fn describe_does_not_double_the_final_period() {
        let failure = permission_denied("Requested entity was not found.");
        assert_eq!(
            describe("ctx", &failure),
            "ctx PERMISSION_DENIED: Requested entity was not found."
        );
    }

    #[test]
    fn describe_appends_hint_when_api_disabled() {
        let failure = permission_denied(
            "User has not enabled the Apps Script API. Enable it by visiting https://script.google.com/home/usersettings",
        );
        let text = describe("content update failed.", &failure);
        assert!(text.ends_with(API_DISABLED_HINT), "{text}");
    }

    #[test]
    fn describe_falls_back_to_code_then_transport_message_then_context() {
        let coded = ApiFailure {
            message: "HTTP 404".into(),
            http_code: Some(404),
            remote: Some(RemoteStatus {
                message: Some("Requested entity was not found".into()),
                ..Default::default()
            }),
        };
        assert_eq!(
            describe("ctx", &coded),
            "ctx 404: Requested entity was not found."
        );
        assert_eq!(
            describe("ctx", &ApiFailure::transport("connection refused")),
            "ctx connection refused"
        );
        assert_eq!(describe("ctx", &ApiFailure::default()), "ctx");
    }

    #[test]
    fn from_response_decodes_google_envelope() {
        let body = r#"{"error":{"code":400,"message":"Bad file","status":"INVALID_ARGUMENT","details":[{"detail":"line 3"}]}}"#;
        let failure = ApiFailure::from_response(400, body);
        let remote = failure.remote.as_ref().expect("structured body");
        assert_eq!(remote.status.as_deref(), Some("INVALID_ARGUMENT"));
        assert_eq!(failure.to_string(), "Bad file");

        let plain = ApiFailure::from_response(502, "upstream unavailable");
        assert!(plain.remote.is_none());
        assert_eq!(plain.message, "upstream unavailable");
    }

    #[test]
    fn diagnostic_block_lists_present_fields_and_details() {
        let mut failure = permission_denied("denied");
        failure.remote.as_mut().unwrap().details = vec![
            json!({"errorType": "ScriptError"}),
            json!({"detail": "quota"}),
            json!({"@type": "type.googleapis.com/google.rpc.ErrorInfo", "reason": "X"}),
        ];
        let block = diagnostic_block(&failure).expect("block");
        assert_eq!(
            block,
            "Status: PERMISSION_DENIED\nCode: 403\nMessage: denied\nDetails: ScriptError; quota; {\"@type\":\"type.googleapis.com/google.rpc.ErrorInfo\",\"reason\":\"X\"}"
        );
    }

    #[test]
    fn diagnostic_block_without_body_reports_cause() {
        assert_eq!(
            diagnostic_block(&ApiFailure::transport("timed out")).as_deref(),
            Some("Cause: timed out")
        );
        assert_eq!(diagnostic_block(&ApiFailure::default()), None);
    }
}
