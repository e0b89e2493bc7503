pub mod messaging_channel;

pub use messaging_channel::*;
