use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Diagnostic scope marking the end of a workflow's event stream.
pub const STREAM_END_SCOPE: &str = "__paperflow_stream_end__";

/// One observable step of a workflow run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Event {
    /// The traversal engine is about to execute an operation.
    Operation(OperationEvent),
    /// Lifecycle or infrastructure notice (run started, run finished, ...).
    Diagnostic(DiagnosticEvent),
}

impl Event {
    pub fn progress(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Operation(OperationEvent {
            operation: operation.into(),
            message: message.into(),
        })
    }

    pub fn diagnostic(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Diagnostic(DiagnosticEvent {
            scope: scope.into(),
            message: message.into(),
        })
    }

    /// Stream-termination diagnostic consumed by progress subscribers.
    pub fn stream_end(message: impl Into<String>) -> Self {
        Self::diagnostic(STREAM_END_SCOPE, message)
    }

    pub fn scope_label(&self) -> &str {
        match self {
            Event::Operation(op) => &op.operation,
            Event::Diagnostic(diag) => &diag.scope,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Event::Operation(op) => &op.message,
            Event::Diagnostic(diag) => &diag.message,
        }
    }

    pub fn is_stream_end(&self) -> bool {
        matches!(self, Event::Diagnostic(diag) if diag.scope == STREAM_END_SCOPE)
    }

    /// Normalized JSON shape served over the progress stream.
    ///
    /// ```
    /// use paperflow::events::Event;
    ///
    /// let json = Event::progress("rotate", "Starting: rotate").to_json_value();
    /// assert_eq!(json["type"], "operation");
    /// assert_eq!(json["scope"], "rotate");
    /// assert_eq!(json["message"], "Starting: rotate");
    /// ```
    pub fn to_json_value(&self) -> Value {
        let event_type = match self {
            Event::Operation(_) => "operation",
            Event::Diagnostic(_) => "diagnostic",
        };
        json!({
            "type": event_type,
            "scope": self.scope_label(),
            "message": self.message(),
            "timestamp": Utc::now().to_rfc3339(),
        })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Operation(op) => write!(f, "[{}] {}", op.operation, op.message),
            Event::Diagnostic(diag) => write!(f, "{}", diag.message),
        }
    }
}

/// Progress notice emitted by the traversal engine before each operation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationEvent {
    /// Wire-format operation label (`rotate`, `split`, ...).
    pub operation: String,
    pub message: String,
}

/// Lifecycle notice emitted by the session manager.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosticEvent {
    pub scope: String,
    pub message: String,
}
