//! Workflow event model and the flat field codec used on the stream.
//!
//! Events travel over the log as field/value pairs (`event`, `docId`,
//! `userId` / `approverId`, `timestamp`). Decoding fails closed: an unknown
//! tag or a missing required field is an error, never a half-filled record.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

/// Tag value for a submission event on the wire.
pub const EVENT_DOCUMENT_SUBMITTED: &str = "DOCUMENT_SUBMITTED";
/// Tag value for an approval event on the wire.
pub const EVENT_DOCUMENT_APPROVED: &str = "DOCUMENT_APPROVED";

/// A single workflow occurrence, as appended to and decoded from the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum WorkflowEvent {
    #[serde(rename = "DOCUMENT_SUBMITTED")]
    DocumentSubmitted {
        #[serde(rename = "docId")]
        doc_id: String,
        #[serde(rename = "userId")]
        user_id: String,
        timestamp: String,
    },

    #[serde(rename = "DOCUMENT_APPROVED")]
    DocumentApproved {
        #[serde(rename = "docId")]
        doc_id: String,
        #[serde(rename = "approverId")]
        approver_id: String,
        timestamp: String,
    },
}

impl WorkflowEvent {
    /// Build a submission event with a capture timestamp of now.
    pub fn submitted(doc_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::DocumentSubmitted {
            doc_id: doc_id.into(),
            user_id: user_id.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Build an approval event with a capture timestamp of now.
    pub fn approved(doc_id: impl Into<String>, approver_id: impl Into<String>) -> Self {
        Self::DocumentApproved {
            doc_id: doc_id.into(),
            approver_id: approver_id.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// The wire tag for this variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DocumentSubmitted { .. } => EVENT_DOCUMENT_SUBMITTED,
            Self::DocumentApproved { .. } => EVENT_DOCUMENT_APPROVED,
        }
    }

    /// The caller-visible status a fresh event of this kind carries.
    pub fn status(&self) -> WorkflowStatus {
        match self {
            Self::DocumentSubmitted { .. } => WorkflowStatus::Pending,
            Self::DocumentApproved { .. } => WorkflowStatus::Approved,
        }
    }

    pub fn doc_id(&self) -> &str {
        match self {
            Self::DocumentSubmitted { doc_id, .. } | Self::DocumentApproved { doc_id, .. } => {
                doc_id
            }
        }
    }

    pub fn timestamp(&self) -> &str {
        match self {
            Self::DocumentSubmitted { timestamp, .. }
            | Self::DocumentApproved { timestamp, .. } => timestamp,
        }
    }

    /// Encode as the flat field/value pairs appended to the stream.
    pub fn to_fields(&self) -> Vec<(String, String)> {
        match self {
            Self::DocumentSubmitted {
                doc_id,
                user_id,
                timestamp,
            } => vec![
                ("event".into(), EVENT_DOCUMENT_SUBMITTED.into()),
                ("docId".into(), doc_id.clone()),
                ("userId".into(), user_id.clone()),
                ("timestamp".into(), timestamp.clone()),
            ],
            Self::DocumentApproved {
                doc_id,
                approver_id,
                timestamp,
            } => vec![
                ("event".into(), EVENT_DOCUMENT_APPROVED.into()),
                ("docId".into(), doc_id.clone()),
                ("approverId".into(), approver_id.clone()),
                ("timestamp".into(), timestamp.clone()),
            ],
        }
    }

    /// Decode from stream fields. `id` is only used in the error path.
    pub fn from_fields(id: &str, fields: &[(String, String)]) -> Result<Self, WorkflowError> {
        let get = |key: &str| -> Option<String> {
            fields
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };
        let require = |key: &str| -> Result<String, WorkflowError> {
            get(key).ok_or_else(|| WorkflowError::Decode {
                id: id.to_string(),
                message: format!("missing required field '{key}'"),
            })
        };

        let tag = require("event")?;
        let timestamp = require("timestamp")?;
        match tag.as_str() {
            EVENT_DOCUMENT_SUBMITTED => Ok(Self::DocumentSubmitted {
                doc_id: require("docId")?,
                user_id: require("userId")?,
                timestamp,
            }),
            EVENT_DOCUMENT_APPROVED => Ok(Self::DocumentApproved {
                doc_id: require("docId")?,
                approver_id: require("approverId")?,
                timestamp,
            }),
            other => Err(WorkflowError::Decode {
                id: id.to_string(),
                message: format!("unknown event tag '{other}'"),
            }),
        }
    }
}

/// Caller-visible status returned by submit/approve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    Pending,
    Approved,
}

/// Response to a successful submit/approve action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(rename = "messageId")]
    pub message_id: String,
    pub status: WorkflowStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submitted_round_trips_through_fields() {
        let event = WorkflowEvent::submitted("D1", "U1");
        let fields = event.to_fields();
        let decoded = WorkflowEvent::from_fields("1-0", &fields).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn approved_round_trips_through_fields() {
        let event = WorkflowEvent::approved("D2", "A9");
        let fields = event.to_fields();
        let decoded = WorkflowEvent::from_fields("2-0", &fields).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn decode_rejects_unknown_tag() {
        let fields = vec![
            ("event".to_string(), "DOCUMENT_SHREDDED".to_string()),
            ("docId".to_string(), "D1".to_string()),
            ("timestamp".to_string(), "2026-01-01T00:00:00Z".to_string()),
        ];
        let err = WorkflowEvent::from_fields("3-0", &fields).unwrap_err();
        assert!(matches!(err, WorkflowError::Decode { .. }));
    }

    #[test]
    fn decode_rejects_missing_required_field() {
        // Submission without userId must not produce a partial record.
        let fields = vec![
            ("event".to_string(), EVENT_DOCUMENT_SUBMITTED.to_string()),
            ("docId".to_string(), "D1".to_string()),
            ("timestamp".to_string(), "2026-01-01T00:00:00Z".to_string()),
        ];
        let err = WorkflowEvent::from_fields("4-0", &fields).unwrap_err();
        assert!(matches!(err, WorkflowError::Decode { .. }));
    }

    #[test]
    fn status_follows_variant() {
        assert_eq!(
            WorkflowEvent::submitted("D", "U").status(),
            WorkflowStatus::Pending
        );
        assert_eq!(
            WorkflowEvent::approved("D", "A").status(),
            WorkflowStatus::Approved
        );
    }

    #[test]
    fn status_serializes_screaming() {
        assert_eq!(
            serde_json::to_string(&WorkflowStatus::Pending).unwrap(),
            "\"PENDING\""
        );
        assert_eq!(
            serde_json::to_string(&WorkflowStatus::Approved).unwrap(),
            "\"APPROVED\""
        );
    }
}
