use serde::{Deserialize, Serialize};

/// Server-side reference to an uploaded media file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(pub String);

impl MediaRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Message content sent to every recipient of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub text: Option<String>,
    pub media: Vec<MediaRef>,
}

impl MessagePayload {
    pub fn new(text: Option<String>, media: Vec<MediaRef>) -> Self {
        Self { text, media }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            media: Vec::new(),
        }
    }

    /// Text with only whitespace counts as absent.
    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_text() && !self.has_media()
    }
}
