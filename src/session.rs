//! CSRF session-token lifecycle.
//!
//! [`TokenCache`] implements the `NoToken -> Fetching -> Valid` state machine with a
//! singleflight guard and a rate limiter, [`SessionToken`] keeps the token value out of logs,
//! and the fetch module performs the auth-check + token-endpoint exchange.

mod cache;
mod fetch;
mod metrics;
mod token;

pub use cache::*;
pub use metrics::TokenMetrics;
pub use token::SessionToken;

pub(crate) use fetch::fetch_csrf_token;
