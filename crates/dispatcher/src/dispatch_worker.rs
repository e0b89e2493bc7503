use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use bulk_sender_core::{
    ChunkResults, DeliveryRecord, DispatchAggregate, MessagePayload, MessagingChannel, Recipient,
    SendChunkRequest,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::aggregator::{fail_all, skip_all};
use crate::chunk_planner::Chunk;
use crate::retry_policy::{RetryError, RetryPolicy};

pub const NOT_ATTEMPTED_REASON: &str = "not attempted: session cancelled";
const REJECTED_REASON: &str = "rejected by messaging channel";

/// Result of sending one chunk, retries included.
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    pub index: usize,
    pub results: DispatchAggregate,
    pub attempts: u32,
    /// The channel accepted the request (individual recipients may still
    /// have failed).
    pub accepted: bool,
    pub cancelled: bool,
}

/// Sends chunks through the channel under an explicit [`RetryPolicy`].
pub struct DispatchWorker {
    channel: Arc<dyn MessagingChannel>,
    policy: RetryPolicy,
}

impl DispatchWorker {
    pub fn new(channel: Arc<dyn MessagingChannel>, policy: RetryPolicy) -> Self {
        Self { channel, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Sends `chunk` and resolves every one of its recipients.
    pub async fn send(
        &self,
        chunk: &Chunk,
        payload: &MessagePayload,
        cancel: &CancellationToken,
    ) -> ChunkOutcome {
        let request = SendChunkRequest::new(&chunk.recipients, payload);
        let label = format!("chunk {}", chunk.index);

        debug!(
            "Sending chunk {} with {} recipients",
            chunk.index,
            chunk.len()
        );

        let result = self
            .policy
            .execute(&label, cancel, |_| self.channel.send_chunk(&request))
            .await;

        match result {
            Ok(attempted) => {
                let results = resolve_breakdown(&chunk.recipients, &attempted.value.results);
                info!(
                    "Chunk {} delivered after {} attempt(s): {} succeeded, {} failed",
                    chunk.index,
                    attempted.attempts,
                    results.success_count(),
                    results.failed_count()
                );
                ChunkOutcome {
                    index: chunk.index,
                    results,
                    attempts: attempted.attempts,
                    accepted: true,
                    cancelled: false,
                }
            }
            Err(error) if error.never_attempted() => ChunkOutcome {
                index: chunk.index,
                results: skip_all(&chunk.recipients, NOT_ATTEMPTED_REASON),
                attempts: 0,
                accepted: false,
                cancelled: true,
            },
            Err(error) => {
                let reason = failure_reason(&error);
                warn!("Chunk {} failed: {}", chunk.index, reason);
                ChunkOutcome {
                    index: chunk.index,
                    results: fail_all(&chunk.recipients, &reason),
                    attempts: error.attempts(),
                    accepted: false,
                    cancelled: matches!(error, RetryError::Cancelled { .. }),
                }
            }
        }
    }
}

/// Reason recorded for recipients of a chunk whose send failed, preferring
/// the message supplied by the channel.
pub fn failure_reason(error: &RetryError) -> String {
    if let Some(message) = error.last_error().and_then(|e| e.server_message()) {
        return message.to_string();
    }

    match error {
        RetryError::Rejected { .. } => REJECTED_REASON.to_string(),
        RetryError::Exhausted { attempts, .. } => {
            format!("delivery failed after {attempts} attempt(s)")
        }
        RetryError::Cancelled { attempts, .. } => {
            format!("session cancelled after {attempts} failed attempt(s)")
        }
    }
}

/// Applies the channel's per-recipient breakdown to a chunk.
///
/// Recipients listed as failed are failed; everyone else in the chunk counts
/// as delivered. Listings are matched by number and consumed one per
/// recipient, so duplicates resolve independently. Entries naming numbers
/// outside the chunk are ignored.
pub fn resolve_breakdown(recipients: &[Recipient], results: &ChunkResults) -> DispatchAggregate {
    let mut failed: HashMap<String, VecDeque<Option<String>>> = HashMap::new();
    for entry in &results.failed {
        if let Some(number) = Recipient::parse(&entry.number) {
            failed
                .entry(number.as_str().to_string())
                .or_default()
                .push_back(entry.error.clone());
        }
    }

    let mut delivered: HashMap<String, VecDeque<Option<String>>> = HashMap::new();
    for entry in &results.success {
        if let Some(number) = Recipient::parse(entry.number()) {
            delivered
                .entry(number.as_str().to_string())
                .or_default()
                .push_back(entry.message_id().map(str::to_string));
        }
    }

    let aggregate = recipients
        .iter()
        .map(|recipient| {
            let failure = failed
                .get_mut(recipient.as_str())
                .and_then(VecDeque::pop_front);
            match failure {
                Some(reason) => DeliveryRecord::failed(
                    recipient.clone(),
                    reason
                        .filter(|r| !r.trim().is_empty())
                        .unwrap_or_else(|| REJECTED_REASON.to_string()),
                ),
                None => {
                    let message_id = delivered
                        .get_mut(recipient.as_str())
                        .and_then(VecDeque::pop_front)
                        .flatten();
                    DeliveryRecord::success(recipient.clone(), message_id)
                }
            }
        })
        .collect();

    let unmatched: usize = failed.values().map(VecDeque::len).sum::<usize>()
        + delivered.values().map(VecDeque::len).sum::<usize>();
    if unmatched > 0 {
        warn!(
            "Ignoring {} result entries for numbers outside the chunk",
            unmatched
        );
    }

    aggregate
}
