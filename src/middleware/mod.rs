mod auth;
mod error_handler;
mod rate_limit;

pub use auth::auth_middleware;
pub use error_handler::error_context;
pub use rate_limit::{RateLimiter, rate_limit};
