use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    channel_status::{ChannelConfig, MediaConfig, StatusConfig},
    dispatch_retry::{DispatchConfig, RetryConfig},
    observability::ObservabilityConfig,
};

const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/bulk-sender.toml",
    "bulk-sender.toml",
    "/etc/bulk-sender/config.toml",
];

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub channel: ChannelConfig,
    pub dispatch: DispatchConfig,
    pub retry: RetryConfig,
    pub status: StatusConfig,
    pub media: MediaConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from config file and environment variables
    ///
    /// Load order:
    /// 1. Built-in defaults for every missing key
    /// 2. Config file (TOML format)
    /// 3. Environment variable overrides, e.g. `BULK_SENDER_DISPATCH__CHUNK_SIZE=10`
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|path| Path::new(path).exists())
        {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("BULK_SENDER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    pub fn validate(&self) -> Result<()> {
        self.channel.validate().context("消息通道配置验证失败")?;
        self.dispatch.validate().context("分发配置验证失败")?;
        self.retry.validate().context("重试配置验证失败")?;
        self.status.validate().context("状态轮询配置验证失败")?;
        self.media.validate().context("媒体配置验证失败")?;
        self.observability
            .validate()
            .context("可观测性配置验证失败")?;

        Ok(())
    }
}
