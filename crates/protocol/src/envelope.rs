use serde::{Deserialize, Serialize};

/// Uniform result envelope returned by every server-side write operation.
///
/// Failures are data, not errors: the server catches everything at this
/// boundary and reports it through the envelope, so exceptions never cross
/// the API surface. `result` defaults to `true` when absent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpResult {
    #[serde(default = "default_true")]
    pub result: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

impl OpResult {
    /// A successful outcome carrying `message`.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            result: true,
            message: message.into(),
            details: None,
        }
    }

    /// A failed outcome carrying `message`.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            result: false,
            message: message.into(),
            details: None,
        }
    }

    /// Attaches per-item detail lines, e.g. one per failed payload.
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }

    /// Whether the operation succeeded.
    pub fn is_ok(&self) -> bool {
        self.result
    }
}
