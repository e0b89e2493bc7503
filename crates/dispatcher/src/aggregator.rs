use bulk_sender_core::{DeliveryRecord, DispatchAggregate, Recipient};

/// Folds a chunk's outcome into the running aggregate.
///
/// Collections are concatenated, so the result holds exactly the records of
/// both inputs whatever order chunks are merged in.
pub fn merge(mut aggregate: DispatchAggregate, outcome: DispatchAggregate) -> DispatchAggregate {
    aggregate.success.extend(outcome.success);
    aggregate.failed.extend(outcome.failed);
    aggregate.not_attempted.extend(outcome.not_attempted);
    aggregate
}

/// Marks every recipient as failed with the same reason.
pub fn fail_all(recipients: &[Recipient], reason: &str) -> DispatchAggregate {
    recipients
        .iter()
        .map(|r| DeliveryRecord::failed(r.clone(), reason))
        .collect()
}

/// Marks every recipient as never sent.
pub fn skip_all(recipients: &[Recipient], reason: &str) -> DispatchAggregate {
    recipients
        .iter()
        .map(|r| DeliveryRecord::not_attempted(r.clone(), reason))
        .collect()
}
