pub mod config;
pub mod errors;
pub mod models;
pub mod traits;

pub use self::config::{
    AppConfig, ChannelConfig, DispatchConfig, MediaConfig, ObservabilityConfig, RetryConfig,
    StatusConfig,
};
pub use errors::*;
pub use models::*;
pub use traits::*;
