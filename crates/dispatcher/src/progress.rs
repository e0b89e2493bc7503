use bulk_sender_core::{DispatchAggregate, DispatchProgress, SessionPhase};
use tokio::sync::watch;
use uuid::Uuid;

/// `round(100 * completed / total)`, with an empty session reporting 0.
pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u128;
    let total = total as u128;
    ((completed * 200 + total) / (total * 2)) as u8
}

/// Publishes progress snapshots for the session currently running.
///
/// Within one session the published percentage never decreases, and 100 is
/// only reported once the session completes with every recipient resolved.
#[derive(Debug)]
pub struct ProgressReporter {
    tx: watch::Sender<DispatchProgress>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(DispatchProgress::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<DispatchProgress> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> DispatchProgress {
        self.tx.borrow().clone()
    }

    /// Resets the snapshot for a new session.
    pub fn start(&self, session_id: Uuid, total: usize) {
        self.tx.send_replace(DispatchProgress {
            session_id: Some(session_id),
            phase: SessionPhase::Validating,
            completed: 0,
            total,
            percent: 0,
            succeeded: 0,
            failed: 0,
        });
    }

    pub fn set_phase(&self, phase: SessionPhase) {
        self.tx.send_modify(|progress| {
            progress.phase = phase;
            if phase == SessionPhase::Completed && progress.completed == progress.total {
                progress.percent = 100;
            }
        });
    }

    /// Recomputes the snapshot from the records resolved so far.
    pub fn record(&self, aggregate: &DispatchAggregate) {
        self.tx.send_modify(|progress| {
            let completed = aggregate.resolved().min(progress.total);
            let value = percent(completed, progress.total).min(99);

            progress.completed = completed;
            progress.percent = progress.percent.max(value);
            progress.succeeded = aggregate.success_count();
            progress.failed = aggregate.failed_count();
        });
    }
}
