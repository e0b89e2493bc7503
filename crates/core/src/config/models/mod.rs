pub mod app_config;
pub mod channel_status;
pub mod dispatch_retry;
pub mod observability;

// Re-export main types for easier imports
pub use app_config::AppConfig;
pub use channel_status::{ChannelConfig, MediaConfig, StatusConfig};
pub use dispatch_retry::{DispatchConfig, RetryConfig};
pub use observability::ObservabilityConfig;
