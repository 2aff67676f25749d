use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Job type dispatched for every accepted lead.
pub const PROCESS_LEAD: &str = "process_lead";

/// Payload of a `process_lead` job: the id of the lead to run through the
/// pipeline. Serialized as `{"lead_id": <integer>}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessLeadJob {
    pub lead_id: i64,
}

impl ProcessLeadJob {
    pub fn new(lead_id: i64) -> Self {
        Self { lead_id }
    }

    pub fn to_payload(&self) -> Value {
        serde_json::json!({ "lead_id": self.lead_id })
    }

    /// Extract the lead id from a raw job payload. Tolerates any JSON number
    /// representation but rejects missing or non-integer values.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let lead_id = payload.get("lead_id")?.as_i64()?;
        Some(Self { lead_id })
    }
}
