use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub base_url: String,
    pub request_timeout_seconds: u64,
    /// Bulk sends wait much longer than status calls.
    pub send_timeout_seconds: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            request_timeout_seconds: 30,
            send_timeout_seconds: 300,
        }
    }
}

impl ChannelConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.is_empty() {
            return Err(anyhow::anyhow!("消息通道地址不能为空"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "消息通道地址必须以http://或https://开头: {}",
                self.base_url
            ));
        }

        if self.request_timeout_seconds == 0 || self.send_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("请求超时时间必须大于0"));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub poll_interval_seconds: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 5,
        }
    }
}

impl StatusConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval_seconds == 0 {
            return Err(anyhow::anyhow!("状态轮询间隔必须大于0"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub max_media_bytes: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_media_bytes: 16 * 1024 * 1024,
        }
    }
}

impl MediaConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_media_bytes == 0 {
            return Err(anyhow::anyhow!("媒体文件大小上限必须大于0"));
        }
        Ok(())
    }
}
