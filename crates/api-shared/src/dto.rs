//! Request and response bodies that are not queue records.
//!
//! Queue records (entries, counters, the board) live in `queue-wire`.

use queue_wire::PriorityWire;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Settings a client mirror needs to predict the server's transitions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ServerConfigRes {
    /// `reject` or `auto-complete`.
    pub already_serving_policy: String,
    pub display_next_up: usize,
}

/// Body of `POST /counters`. The server picks the next free counter number when
/// `counter_number` is absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateCounterReq {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_number: Option<u32>,
}

/// Body of `POST /entries`. The server issues the queue number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CheckInReq {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initials: Option<String>,
    #[serde(default)]
    pub priority: PriorityWire,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_id: Option<String>,
}

/// Body of skip, recall and complete: the entry the operator is looking at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct EntryActionReq {
    pub entry_id: String,
}

/// Body of `POST /entries/{id}/assign`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AssignReq {
    pub counter_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PurgeRes {
    pub purged: usize,
}

/// Body of `PUT /counters/{id}/order`: every waiting entry id, head first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ReorderReq {
    pub entry_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_in_defaults_to_normal_priority() {
        let req: CheckInReq =
            serde_json::from_str(r#"{"display_name": "Ana Lima"}"#).expect("parse");
        assert_eq!(req.priority, PriorityWire::Normal);
        assert_eq!(req.counter_id, None);
    }

    #[test]
    fn reorder_rejects_unknown_keys() {
        let result: Result<ReorderReq, _> =
            serde_json::from_str(r#"{"entry_ids": [], "counter_id": "x"}"#);
        assert!(result.is_err());
    }
}
