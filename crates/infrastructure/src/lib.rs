pub mod http_channel;
pub mod recipient_source;

pub use http_channel::HttpChannel;
pub use recipient_source::{extract_recipients, load_recipients, PHONE_COLUMN_KEYWORDS};
