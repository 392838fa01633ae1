//! Domain layer - Core access-control types, capabilities and decision logic

pub mod access;
pub mod auth;
pub mod clock;
pub mod error;
pub mod rate_limit;
pub mod token;

pub use access::{AccessDenied, AccessPipeline, InfrastructureFailure};
pub use auth::{Claims, ClaimsVerifier, VerifyError};
pub use clock::{fixed_clock, system_clock, Clock};
pub use error::DomainError;
pub use rate_limit::{CounterError, CounterStore, RateLimitError, RateLimiter};
pub use token::{TokenRecord, TokenStore, TokenStoreError};
