use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Recipients per send request.
    pub chunk_size: usize,
    /// Pause after a chunk the channel accepted.
    pub inter_chunk_delay_ms: u64,
    /// Pause after a chunk that ended in failure.
    pub failure_cooldown_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: 5,
            inter_chunk_delay_ms: 1_000,
            failure_cooldown_ms: 5_000,
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.chunk_size == 0 {
            return Err(anyhow::anyhow!("分块大小必须大于0"));
        }

        if self.failure_cooldown_ms < self.inter_chunk_delay_ms {
            return Err(anyhow::anyhow!(
                "失败冷却时间({}ms)不能小于分块间隔({}ms)",
                self.failure_cooldown_ms,
                self.inter_chunk_delay_ms
            ));
        }

        Ok(())
    }

    pub fn inter_chunk_delay(&self) -> Duration {
        Duration::from_millis(self.inter_chunk_delay_ms)
    }

    pub fn failure_cooldown(&self) -> Duration {
        Duration::from_millis(self.failure_cooldown_ms)
    }
}

/// 重试策略配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// 基础重试间隔（毫秒）
    pub base_delay_ms: u64,
    /// 最大重试间隔（毫秒）
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_attempts == 0 {
            return Err(anyhow::anyhow!("最大尝试次数必须大于0"));
        }

        if self.max_delay_ms < self.base_delay_ms {
            return Err(anyhow::anyhow!(
                "最大重试间隔({}ms)不能小于基础重试间隔({}ms)",
                self.max_delay_ms,
                self.base_delay_ms
            ));
        }

        Ok(())
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}
