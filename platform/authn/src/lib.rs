//! Request-side authentication: bearer-token verification, the principal
//! resolution state machine, and anonymous-visitor throttling.
//!
//! Any path that resolves a request to an anonymous visitor passes through
//! the [`VisitorLimiter`] first; a throttled request fails context
//! resolution with [`ContextError::Throttled`] before any access decision
//! is attempted.

pub mod context;
pub mod limiter;
pub mod token;

pub use context::{AccessContext, ContextError, PrincipalStore, RequestPrincipal};
pub use limiter::{RateExceeded, VisitorLimiter};
pub use token::{AccessClaims, TokenConfig, TokenError, issue_token, verify_token};
