//! Request middleware: authentication, signature verification, rate limiting.

mod auth;
mod rate_limit;

pub use auth::{WEBHOOK_SIGNATURE_HEADER, api_key_middleware, webhook_signature_middleware};
pub use rate_limit::{RateLimiter, rate_limit_middleware};
