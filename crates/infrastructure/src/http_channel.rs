use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use bulk_sender_core::{
    ChannelConfig, ChannelError, ChannelResult, ErrorBody, MediaRef, MessagingChannel,
    SendChunkRequest, SendChunkResponse, StatusResponse, UploadMediaResponse,
};

/// [`MessagingChannel`] backed by the channel's HTTP API.
pub struct HttpChannel {
    base_url: String,
    send_timeout: Duration,
    http_client: reqwest::Client,
}

impl HttpChannel {
    pub fn new(config: &ChannelConfig) -> ChannelResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ChannelError::Connectivity(format!("HTTP客户端初始化失败: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            send_timeout: config.send_timeout(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Turns a non-2xx response into the matching error class, keeping the
    /// server-supplied reason when the body carries one.
    async fn check(response: Response) -> ChannelResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::into_message)
            .or_else(|| {
                let body = body.trim();
                (!body.is_empty()).then(|| body.to_string())
            });
        warn!("Messaging channel responded HTTP {}: {:?}", status, message);
        Err(ChannelError::from_status(status.as_u16(), message))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ChannelResult<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ChannelError::Connectivity(format!("读取响应失败: {e}")))?;
        serde_json::from_slice(&bytes).map_err(|e| ChannelError::Decode(e.to_string()))
    }
}

fn connectivity(e: reqwest::Error) -> ChannelError {
    ChannelError::Connectivity(e.to_string())
}

#[async_trait]
impl MessagingChannel for HttpChannel {
    async fn get_status(&self) -> ChannelResult<StatusResponse> {
        let response = self
            .http_client
            .get(self.url("status"))
            .send()
            .await
            .map_err(connectivity)?;
        Self::decode(Self::check(response).await?).await
    }

    async fn disconnect(&self) -> ChannelResult<()> {
        let response = self
            .http_client
            .post(self.url("disconnect"))
            .send()
            .await
            .map_err(connectivity)?;
        Self::check(response).await?;
        debug!("Messaging channel acknowledged disconnect");
        Ok(())
    }

    async fn upload_media(&self, file_name: &str, bytes: Vec<u8>) -> ChannelResult<MediaRef> {
        let size = bytes.len();
        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = multipart::Form::new().part("media", part);

        let response = self
            .http_client
            .post(self.url("upload-media"))
            .multipart(form)
            .send()
            .await
            .map_err(connectivity)?;
        let uploaded: UploadMediaResponse = Self::decode(Self::check(response).await?).await?;

        debug!("Uploaded {} ({} bytes) as {}", file_name, size, uploaded.file_path);
        Ok(uploaded.into())
    }

    async fn send_chunk(&self, request: &SendChunkRequest) -> ChannelResult<SendChunkResponse> {
        let response = self
            .http_client
            .post(self.url("send-bulk-messages"))
            .timeout(self.send_timeout)
            .json(request)
            .send()
            .await
            .map_err(connectivity)?;
        Self::decode(Self::check(response).await?).await
    }
}
