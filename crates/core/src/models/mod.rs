pub mod channel;
pub mod connection;
pub mod delivery;
pub mod payload;
pub mod recipient;

pub use channel::{
    ChunkResults, ErrorBody, FailedEntry, SendChunkRequest, SendChunkResponse, StatusResponse,
    SuccessEntry, UploadMediaResponse,
};
pub use connection::ConnectionState;
pub use delivery::{
    DeliveryRecord, DeliveryStatus, DispatchAggregate, DispatchProgress, SessionPhase,
    SessionReport,
};
pub use payload::{MediaRef, MessagePayload};
pub use recipient::Recipient;
