mod claims;
mod notification;
mod refresh_token;
mod user;

pub use claims::*;
pub use notification::*;
pub use refresh_token::*;
pub use user::*;
