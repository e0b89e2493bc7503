use bulk_sender_core::Recipient;

/// Contiguous slice of a session's recipients sent in one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub recipients: Vec<Recipient>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }
}

/// Splits `recipients` into `ceil(len / chunk_size)` chunks, preserving order.
///
/// Every chunk holds `chunk_size` recipients except possibly the last. A zero
/// `chunk_size` is rejected by config validation; here it is treated as 1.
pub fn plan(recipients: &[Recipient], chunk_size: usize) -> Vec<Chunk> {
    recipients
        .chunks(chunk_size.max(1))
        .enumerate()
        .map(|(index, slice)| Chunk {
            index,
            recipients: slice.to_vec(),
        })
        .collect()
}
