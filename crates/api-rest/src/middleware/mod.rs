//! Request middleware, applied outermost first: correlation, timeout, auth, rate limit.

pub mod auth;
pub mod correlation;
pub mod rate_limit;
pub mod timeout;
