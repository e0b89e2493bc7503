//! Bulk dispatch engine.
//!
//! Splits a recipient list into chunks and delivers them one at a time
//! through a [`MessagingChannel`](bulk_sender_core::MessagingChannel),
//! retrying transient failures and accounting for every recipient.

pub mod aggregator;
pub mod chunk_planner;
pub mod connection_gate;
pub mod dispatch_worker;
pub mod media_uploader;
pub mod orchestrator;
pub mod progress;
pub mod retry_policy;
pub mod session;

#[cfg(test)]
pub mod test_utils;

pub use chunk_planner::{plan, Chunk};
pub use connection_gate::{ConnectionGate, StatusPoller};
pub use dispatch_worker::{ChunkOutcome, DispatchWorker};
pub use media_uploader::MediaUploader;
pub use orchestrator::SessionOrchestrator;
pub use progress::{percent, ProgressReporter};
pub use retry_policy::{Attempted, RetryError, RetryPolicy};
pub use session::{DispatchRequest, DispatchSession};
