//! Operation results and diagnostic messages.
//!
//! Every server operation returns a [`ServiceResponse`]: a tagged
//! success/failure value with a human-readable message and an optional typed
//! payload. Expected business failures (duplicate id, mode conflict, vetoed
//! update, disabled management API) are `Failure` responses, never `Err`;
//! only storage and transport faults propagate through [`crate::error`].

use serde::{Deserialize, Serialize};

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// Diagnostic message attached to a server, a container, or a health report.
///
/// A message carries one severity and one or more lines of text (a health
/// report header groups several lines under a single INFO message).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub severity: Severity,
    pub messages: Vec<String>,
}

impl Message {
    /// Creates a single-line message.
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            messages: vec![text.into()],
        }
    }

    /// Creates a multi-line message.
    pub fn with_lines(severity: Severity, lines: Vec<String>) -> Self {
        Self {
            severity,
            messages: lines,
        }
    }

    /// Appends a line.
    pub fn push(&mut self, text: impl Into<String>) {
        self.messages.push(text.into());
    }

    /// Returns true for `Severity::Error`.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Outcome tag of a [`ServiceResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseType {
    Success,
    Failure,
}

/// Tagged result of a server operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceResponse<T> {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
}

impl<T> ServiceResponse<T> {
    /// Successful response with a payload.
    pub fn success(msg: impl Into<String>, result: T) -> Self {
        Self {
            response_type: ResponseType::Success,
            msg: msg.into(),
            result: Some(result),
        }
    }

    /// Successful response without a payload.
    pub fn success_empty(msg: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Success,
            msg: msg.into(),
            result: None,
        }
    }

    /// Failure response.
    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Failure,
            msg: msg.into(),
            result: None,
        }
    }

    /// Failure response that still reports a payload (e.g. the conflicting
    /// container on a duplicate create).
    pub fn failure_with(msg: impl Into<String>, result: T) -> Self {
        Self {
            response_type: ResponseType::Failure,
            msg: msg.into(),
            result: Some(result),
        }
    }

    /// The failure raised for every mutating operation while the management
    /// API is disabled.
    pub fn forbidden() -> Self {
        Self::failure("Server management api is disabled")
    }

    /// Returns true for a `Success` response.
    pub fn is_success(&self) -> bool {
        self.response_type == ResponseType::Success
    }

    /// Returns true for a `Failure` response.
    pub fn is_failure(&self) -> bool {
        self.response_type == ResponseType::Failure
    }

    /// Re-tags the payload type of a payload-less response.
    pub fn retype<U>(self) -> ServiceResponse<U> {
        ServiceResponse {
            response_type: self.response_type,
            msg: self.msg,
            result: None,
        }
    }
}
