use crate::ids::SignalId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An upstream observation, opaque to the engine beyond the few indexable
/// fields the Risk Scorer reads when computing historical factors.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    pub signal_type: String,
    pub tool_name: Option<String>,
    pub error_kind: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    pub fn new(signal_type: impl Into<String>) -> Self {
        Self {
            id: SignalId::generate(),
            signal_type: signal_type.into(),
            tool_name: None,
            error_kind: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    pub fn with_error_kind(mut self, error_kind: impl Into<String>) -> Self {
        self.error_kind = Some(error_kind.into());
        self
    }
}
