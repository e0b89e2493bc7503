use chrono::{DateTime, Utc};
use uuid::Uuid;

use bulk_sender_core::{
    DispatchAggregate, DispatchError, MessagePayload, Recipient, SessionPhase, SessionReport,
};

use crate::aggregator::{merge, skip_all};
use crate::chunk_planner::{plan, Chunk};
use crate::connection_gate::ConnectionGate;
use crate::dispatch_worker::{ChunkOutcome, NOT_ATTEMPTED_REASON};

/// What the operator asked to send.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub recipients: Vec<Recipient>,
    pub payload: MessagePayload,
}

impl DispatchRequest {
    pub fn new(recipients: Vec<Recipient>, payload: MessagePayload) -> Self {
        Self {
            recipients,
            payload,
        }
    }
}

/// State of one dispatch request, moved through each phase transition.
#[derive(Debug)]
pub struct DispatchSession {
    id: Uuid,
    phase: SessionPhase,
    request: DispatchRequest,
    chunks: Vec<Chunk>,
    cursor: usize,
    aggregate: DispatchAggregate,
    started_at: DateTime<Utc>,
}

impl DispatchSession {
    pub fn new(request: DispatchRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: SessionPhase::Idle,
            request,
            chunks: Vec::new(),
            cursor: 0,
            aggregate: DispatchAggregate::new(),
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn total(&self) -> usize {
        self.request.recipients.len()
    }

    pub fn payload(&self) -> &MessagePayload {
        &self.request.payload
    }

    pub fn aggregate(&self) -> &DispatchAggregate {
        &self.aggregate
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// `Idle → Validating → Gating`. Requires at least one recipient and
    /// some text or media.
    pub fn validate(mut self) -> Result<Self, DispatchError> {
        self.phase = SessionPhase::Validating;

        if self.request.recipients.is_empty() {
            return Err(DispatchError::Validation(
                "recipient list is empty".to_string(),
            ));
        }
        if self.request.payload.is_empty() {
            return Err(DispatchError::Validation(
                "message text or media is required".to_string(),
            ));
        }

        self.phase = SessionPhase::Gating;
        Ok(self)
    }

    /// `Gating → Dispatching`. Plans the chunks once the channel is ready.
    pub fn open(mut self, gate: &ConnectionGate, chunk_size: usize) -> Result<Self, DispatchError> {
        debug_assert_eq!(self.phase, SessionPhase::Gating);
        gate.assert_ready()?;

        self.chunks = plan(&self.request.recipients, chunk_size);
        self.phase = SessionPhase::Dispatching;
        Ok(self)
    }

    pub fn next_chunk(&self) -> Option<&Chunk> {
        self.chunks.get(self.cursor)
    }

    pub fn has_remaining(&self) -> bool {
        self.cursor < self.chunks.len()
    }

    /// Folds a chunk's outcome in and advances to the next chunk.
    pub fn record(&mut self, outcome: ChunkOutcome) {
        debug_assert_eq!(Some(outcome.index), self.next_chunk().map(|c| c.index));
        let aggregate = std::mem::take(&mut self.aggregate);
        self.aggregate = merge(aggregate, outcome.results);
        self.cursor += 1;
    }

    /// Resolves every chunk not yet sent as not attempted.
    pub fn cancel_remaining(&mut self) {
        for chunk in &self.chunks[self.cursor..] {
            let aggregate = std::mem::take(&mut self.aggregate);
            self.aggregate = merge(aggregate, skip_all(&chunk.recipients, NOT_ATTEMPTED_REASON));
        }
        self.cursor = self.chunks.len();
        self.phase = SessionPhase::Cancelled;
    }

    /// Ends the session, yielding its terminal report.
    pub fn finish(mut self) -> SessionReport {
        if self.phase != SessionPhase::Cancelled {
            self.phase = SessionPhase::Completed;
        }

        SessionReport {
            session_id: self.id,
            phase: self.phase,
            total: self.request.recipients.len(),
            results: self.aggregate,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulk_sender_core::ConnectionState;
    use tokio::sync::watch;

    fn request(numbers: &[&str], text: Option<&str>) -> DispatchRequest {
        DispatchRequest::new(
            numbers.iter().map(|n| Recipient::parse(n).unwrap()).collect(),
            MessagePayload::new(text.map(str::to_string), vec![]),
        )
    }

    fn gate(state: ConnectionState) -> (watch::Sender<ConnectionState>, ConnectionGate) {
        let (tx, rx) = watch::channel(state);
        (tx, ConnectionGate::new(rx))
    }

    #[test]
    fn test_validate_rejects_empty_recipients() {
        let result = DispatchSession::new(request(&[], Some("hello"))).validate();
        assert!(matches!(result, Err(DispatchError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_empty_payload() {
        let result = DispatchSession::new(request(&["111"], None)).validate();
        assert!(matches!(result, Err(DispatchError::Validation(_))));
    }

    #[test]
    fn test_open_requires_connection() {
        let (_tx, gate) = gate(ConnectionState::Disconnected);
        let session = DispatchSession::new(request(&["111"], Some("hi")))
            .validate()
            .unwrap();
        assert!(matches!(
            session.open(&gate, 5),
            Err(DispatchError::NotConnected { .. })
        ));
    }

    #[test]
    fn test_cancel_remaining_resolves_everyone() {
        let (_tx, gate) = gate(ConnectionState::Connected);
        let mut session = DispatchSession::new(request(&["111", "222", "333"], Some("hi")))
            .validate()
            .unwrap()
            .open(&gate, 1)
            .unwrap();
        assert_eq!(session.phase(), SessionPhase::Dispatching);
        assert_eq!(session.chunks().len(), 3);

        let first = session.next_chunk().cloned().unwrap();
        session.record(ChunkOutcome {
            index: first.index,
            results: first
                .recipients
                .iter()
                .map(|r| bulk_sender_core::DeliveryRecord::success(r.clone(), None))
                .collect(),
            attempts: 1,
            accepted: true,
            cancelled: false,
        });
        session.cancel_remaining();

        let report = session.finish();
        assert_eq!(report.phase, SessionPhase::Cancelled);
        assert_eq!(report.results.success_count(), 1);
        assert_eq!(report.results.not_attempted_count(), 2);
        assert_eq!(report.results.resolved(), report.total);
    }
}
