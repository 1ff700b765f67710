mod notification_dispatcher;
mod secret_hasher;
mod session_service;
mod token_codec;

pub use notification_dispatcher::*;
pub use secret_hasher::*;
pub use session_service::*;
pub use token_codec::*;
