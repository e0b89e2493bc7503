use bulk_sender_core::{
    DispatchConfig, DispatchError, DispatchProgress, SessionPhase, SessionReport,
};
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use crate::connection_gate::ConnectionGate;
use crate::dispatch_worker::DispatchWorker;
use crate::progress::ProgressReporter;
use crate::session::{DispatchRequest, DispatchSession};

/// Runs dispatch sessions one at a time: validate, gate on the channel
/// state, then send chunks strictly in sequence.
pub struct SessionOrchestrator {
    gate: ConnectionGate,
    worker: DispatchWorker,
    settings: DispatchConfig,
    progress: ProgressReporter,
    active: Mutex<()>,
}

impl SessionOrchestrator {
    pub fn new(gate: ConnectionGate, worker: DispatchWorker, settings: DispatchConfig) -> Self {
        Self {
            gate,
            worker,
            settings,
            progress: ProgressReporter::new(),
            active: Mutex::new(()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DispatchProgress> {
        self.progress.subscribe()
    }

    pub fn progress(&self) -> DispatchProgress {
        self.progress.current()
    }

    /// Runs one session to completion or cancellation.
    ///
    /// Validation and connection failures abort before any chunk is sent and
    /// carry no partial results. Failed chunks never stop the session.
    pub async fn run(
        &self,
        request: DispatchRequest,
        cancel: CancellationToken,
    ) -> Result<SessionReport, DispatchError> {
        let _guard = self
            .active
            .try_lock()
            .map_err(|_| DispatchError::SessionActive)?;

        let session = DispatchSession::new(request);
        let span = info_span!("dispatch_session", session_id = %session.id());

        self.drive(session, cancel).instrument(span).await
    }

    async fn drive(
        &self,
        session: DispatchSession,
        cancel: CancellationToken,
    ) -> Result<SessionReport, DispatchError> {
        self.progress.start(session.id(), session.total());
        info!("Starting dispatch session for {} recipients", session.total());

        let mut session = match session
            .validate()
            .and_then(|s| {
                self.progress.set_phase(SessionPhase::Gating);
                s.open(&self.gate, self.settings.chunk_size)
            }) {
            Ok(session) => session,
            Err(e) => {
                warn!("Dispatch session aborted: {}", e);
                self.progress.set_phase(SessionPhase::Aborted);
                return Err(e);
            }
        };

        self.progress.set_phase(SessionPhase::Dispatching);
        info!(
            "Dispatching {} chunks of up to {} recipients",
            session.chunks().len(),
            self.settings.chunk_size
        );

        while let Some(chunk) = session.next_chunk().cloned() {
            if cancel.is_cancelled() {
                warn!("Session cancelled before chunk {}", chunk.index);
                session.cancel_remaining();
                break;
            }

            let outcome = self.worker.send(&chunk, session.payload(), &cancel).await;
            let accepted = outcome.accepted;
            let cancelled = outcome.cancelled;

            session.record(outcome);
            self.progress.record(session.aggregate());

            if cancelled {
                warn!("Session cancelled while sending chunk {}", chunk.index);
                session.cancel_remaining();
                break;
            }

            if session.has_remaining() {
                let cooldown = if accepted {
                    self.settings.inter_chunk_delay()
                } else {
                    self.settings.failure_cooldown()
                };
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(cooldown) => {}
                }
            }
        }

        let report = session.finish();
        self.progress.set_phase(report.phase);
        info!(
            "Dispatch session {}: {} succeeded, {} failed, {} not attempted",
            if report.is_cancelled() { "cancelled" } else { "completed" },
            report.results.success_count(),
            report.results.failed_count(),
            report.results.not_attempted_count()
        );

        Ok(report)
    }
}
