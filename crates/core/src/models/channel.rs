//! Request/response bodies exchanged with the messaging channel.

use serde::{Deserialize, Serialize};

use super::{ConnectionState, MediaRef, MessagePayload, Recipient};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub qr_code: Option<String>,
}

impl StatusResponse {
    /// Maps the channel's free-form status onto a [`ConnectionState`].
    pub fn connection_state(&self) -> ConnectionState {
        let status = self.status.trim().to_ascii_lowercase();
        if status == "connected" {
            return ConnectionState::Connected;
        }
        match &self.qr_code {
            Some(qr_code) if !qr_code.is_empty() => ConnectionState::Pairing {
                qr_code: qr_code.clone(),
            },
            _ if status == "pairing" || status == "qr" => ConnectionState::Pairing {
                qr_code: String::new(),
            },
            _ => ConnectionState::Disconnected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendChunkRequest {
    pub numbers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub media_paths: Vec<String>,
}

impl SendChunkRequest {
    pub fn new(recipients: &[Recipient], payload: &MessagePayload) -> Self {
        Self {
            numbers: recipients.iter().map(|r| r.as_str().to_string()).collect(),
            message: payload.text.clone().filter(|t| !t.trim().is_empty()),
            media_paths: payload.media.iter().map(|m| m.as_str().to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendChunkResponse {
    #[serde(default)]
    pub results: ChunkResults,
}

/// Per-recipient breakdown returned by the channel for one chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkResults {
    #[serde(default)]
    pub success: Vec<SuccessEntry>,
    #[serde(default)]
    pub failed: Vec<FailedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SuccessEntry {
    Number(String),
    Detailed {
        number: String,
        #[serde(default, rename = "messageId")]
        message_id: Option<String>,
    },
}

impl SuccessEntry {
    pub fn number(&self) -> &str {
        match self {
            SuccessEntry::Number(number) => number,
            SuccessEntry::Detailed { number, .. } => number,
        }
    }

    pub fn message_id(&self) -> Option<&str> {
        match self {
            SuccessEntry::Number(_) => None,
            SuccessEntry::Detailed { message_id, .. } => message_id.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedEntry {
    pub number: String,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMediaResponse {
    pub file_path: String,
}

impl From<UploadMediaResponse> for MediaRef {
    fn from(response: UploadMediaResponse) -> Self {
        MediaRef(response.file_path)
    }
}

/// Body of an unsuccessful response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.error.or(self.message)
    }
}
