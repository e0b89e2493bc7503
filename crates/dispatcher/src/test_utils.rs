use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bulk_sender_core::{
    ChannelError, ChannelResult, MediaRef, MessagingChannel, SendChunkRequest, SendChunkResponse,
    StatusResponse,
};
use tokio_util::sync::CancellationToken;

/// In-memory channel replaying scripted responses.
///
/// Status responses are consumed in order and the last one repeats. Send and
/// upload responses are consumed in order and default to success once the
/// script runs out.
#[derive(Default)]
pub struct ScriptedChannel {
    statuses: Mutex<VecDeque<ChannelResult<StatusResponse>>>,
    sends: Mutex<VecDeque<ChannelResult<SendChunkResponse>>>,
    uploads: Mutex<VecDeque<ChannelResult<MediaRef>>>,
    disconnect_error: Mutex<Option<ChannelError>>,
    cancel_after_sends: Mutex<Option<(usize, CancellationToken)>>,
    sent: Mutex<Vec<SendChunkRequest>>,
    uploaded: Mutex<Vec<String>>,
    status_calls: Mutex<usize>,
    disconnect_calls: Mutex<usize>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected() -> Self {
        let channel = Self::new();
        channel.push_status(Ok(StatusResponse {
            status: "connected".to_string(),
            qr_code: None,
        }));
        channel
    }

    pub fn push_status(&self, response: ChannelResult<StatusResponse>) {
        self.statuses.lock().unwrap().push_back(response);
    }

    pub fn push_send(&self, response: ChannelResult<SendChunkResponse>) {
        self.sends.lock().unwrap().push_back(response);
    }

    pub fn push_upload(&self, response: ChannelResult<MediaRef>) {
        self.uploads.lock().unwrap().push_back(response);
    }

    pub fn fail_disconnect(&self, error: ChannelError) {
        *self.disconnect_error.lock().unwrap() = Some(error);
    }

    /// Cancels `token` as soon as `sends` send requests have been answered.
    pub fn cancel_after_sends(&self, sends: usize, token: CancellationToken) {
        *self.cancel_after_sends.lock().unwrap() = Some((sends, token));
    }

    pub fn sent_requests(&self) -> Vec<SendChunkRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn uploaded_files(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        *self.status_calls.lock().unwrap()
    }

    pub fn disconnect_calls(&self) -> usize {
        *self.disconnect_calls.lock().unwrap()
    }
}

#[async_trait]
impl MessagingChannel for ScriptedChannel {
    async fn get_status(&self) -> ChannelResult<StatusResponse> {
        *self.status_calls.lock().unwrap() += 1;
        let mut statuses = self.statuses.lock().unwrap();
        match statuses.len() {
            0 => Err(ChannelError::Connectivity("no scripted status".to_string())),
            1 => statuses[0].clone(),
            _ => statuses.pop_front().unwrap(),
        }
    }

    async fn disconnect(&self) -> ChannelResult<()> {
        *self.disconnect_calls.lock().unwrap() += 1;
        match self.disconnect_error.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn upload_media(&self, file_name: &str, _bytes: Vec<u8>) -> ChannelResult<MediaRef> {
        self.uploaded.lock().unwrap().push(file_name.to_string());
        self.uploads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(MediaRef(format!("uploads/{file_name}"))))
    }

    async fn send_chunk(&self, request: &SendChunkRequest) -> ChannelResult<SendChunkResponse> {
        let sent = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(request.clone());
            sent.len()
        };

        if let Some((after, token)) = self.cancel_after_sends.lock().unwrap().as_ref() {
            if sent >= *after {
                token.cancel();
            }
        }

        self.sends
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SendChunkResponse::default()))
    }
}
