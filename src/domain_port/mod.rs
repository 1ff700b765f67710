mod notification_sink;
mod refresh_token_store;

pub use notification_sink::*;
pub use refresh_token_store::*;
