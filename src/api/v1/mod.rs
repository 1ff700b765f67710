mod error;
mod handler;
mod router;

pub use error::{ApiError, ApiErrorCode, recover_error};
pub use handler::SessionBody;
pub use router::{routes, routes_with_recovery};
