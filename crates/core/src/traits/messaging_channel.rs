use async_trait::async_trait;

use crate::{
    errors::ChannelError,
    models::{MediaRef, SendChunkRequest, SendChunkResponse, StatusResponse},
};

pub type ChannelResult<T> = std::result::Result<T, ChannelError>;

/// Remote messaging channel the dispatch engine delivers through.
#[async_trait]
pub trait MessagingChannel: Send + Sync {
    /// Current pairing/connection status of the channel.
    async fn get_status(&self) -> ChannelResult<StatusResponse>;

    /// Logs the channel out.
    async fn disconnect(&self) -> ChannelResult<()>;

    /// Stores a media file on the channel side.
    async fn upload_media(&self, file_name: &str, bytes: Vec<u8>) -> ChannelResult<MediaRef>;

    /// Sends one chunk of recipients in a single request.
    async fn send_chunk(&self, request: &SendChunkRequest) -> ChannelResult<SendChunkResponse>;
}
