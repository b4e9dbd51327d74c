//! API Middleware Module
//!
//! Authentication and rate limiting for the PDFSmith API.

pub mod auth;
pub mod rate_limit;
pub mod service;

pub use auth::{client_ip, header_value, Caller, CallerExt, API_KEY_HEADER, SUPER_USER_HEADER};
pub use rate_limit::{
    append_rate_limit_headers, rate_limit_exceeded_response, RateDecision, RateLimitStatus,
    RateLimiter, RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING, RATE_LIMIT_RESET, RETRY_AFTER,
};
pub use service::ApiGuard;
