use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Recipient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Success { message_id: Option<String> },
    Failed { reason: String },
    /// The session was cancelled before any send covered this recipient.
    NotAttempted { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub recipient: Recipient,
    #[serde(flatten)]
    pub status: DeliveryStatus,
}

impl DeliveryRecord {
    pub fn success(recipient: Recipient, message_id: Option<String>) -> Self {
        Self {
            recipient,
            status: DeliveryStatus::Success { message_id },
        }
    }

    pub fn failed(recipient: Recipient, reason: impl Into<String>) -> Self {
        Self {
            recipient,
            status: DeliveryStatus::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn not_attempted(recipient: Recipient, reason: impl Into<String>) -> Self {
        Self {
            recipient,
            status: DeliveryStatus::NotAttempted {
                reason: reason.into(),
            },
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match &self.status {
            DeliveryStatus::Success { .. } => None,
            DeliveryStatus::Failed { reason } | DeliveryStatus::NotAttempted { reason } => {
                Some(reason)
            }
        }
    }
}

/// Outcome of every recipient resolved so far, split by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchAggregate {
    pub success: Vec<DeliveryRecord>,
    pub failed: Vec<DeliveryRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_attempted: Vec<DeliveryRecord>,
}

impl DispatchAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files a record under the collection matching its status.
    pub fn push(&mut self, record: DeliveryRecord) {
        match record.status {
            DeliveryStatus::Success { .. } => self.success.push(record),
            DeliveryStatus::Failed { .. } => self.failed.push(record),
            DeliveryStatus::NotAttempted { .. } => self.not_attempted.push(record),
        }
    }

    pub fn success_count(&self) -> usize {
        self.success.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn not_attempted_count(&self) -> usize {
        self.not_attempted.len()
    }

    /// Number of recipients with a terminal record.
    pub fn resolved(&self) -> usize {
        self.success.len() + self.failed.len() + self.not_attempted.len()
    }
}

impl FromIterator<DeliveryRecord> for DispatchAggregate {
    fn from_iter<I: IntoIterator<Item = DeliveryRecord>>(iter: I) -> Self {
        let mut aggregate = DispatchAggregate::new();
        for record in iter {
            aggregate.push(record);
        }
        aggregate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Validating,
    Gating,
    Dispatching,
    Completed,
    Cancelled,
    Aborted,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionPhase::Completed | SessionPhase::Cancelled | SessionPhase::Aborted
        )
    }
}

/// Snapshot published to observers while a session runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchProgress {
    pub session_id: Option<Uuid>,
    pub phase: SessionPhase,
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
    pub succeeded: usize,
    pub failed: usize,
}

impl Default for DispatchProgress {
    fn default() -> Self {
        Self {
            session_id: None,
            phase: SessionPhase::Idle,
            completed: 0,
            total: 0,
            percent: 0,
            succeeded: 0,
            failed: 0,
        }
    }
}

/// Final account of a session that reached `Completed` or `Cancelled`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub phase: SessionPhase,
    pub total: usize,
    pub results: DispatchAggregate,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SessionReport {
    pub fn is_cancelled(&self) -> bool {
        self.phase == SessionPhase::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient(number: &str) -> Recipient {
        Recipient::parse(number).unwrap()
    }

    #[test]
    fn test_push_routes_by_status() {
        let aggregate: DispatchAggregate = vec![
            DeliveryRecord::success(recipient("111"), None),
            DeliveryRecord::failed(recipient("222"), "rejected"),
            DeliveryRecord::not_attempted(recipient("333"), "cancelled"),
            DeliveryRecord::success(recipient("444"), Some("wamid.1".into())),
        ]
        .into_iter()
        .collect();

        assert_eq!(aggregate.success_count(), 2);
        assert_eq!(aggregate.failed_count(), 1);
        assert_eq!(aggregate.not_attempted_count(), 1);
        assert_eq!(aggregate.resolved(), 4);
    }

    #[test]
    fn test_record_serialization_shape() {
        let record = DeliveryRecord::failed(recipient("222"), "invalid number");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"recipient": "222", "status": "failed", "reason": "invalid number"})
        );
    }
}
