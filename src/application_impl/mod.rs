mod argon2_secret_hasher;
mod jwt_token_codec;
mod notification_dispatcher_impl;
mod notification_sink_log;
mod session_service_impl;

pub use argon2_secret_hasher::*;
pub use jwt_token_codec::*;
pub use notification_dispatcher_impl::*;
pub use notification_sink_log::*;
pub use session_service_impl::*;
