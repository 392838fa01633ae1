//! Signed-claim domain
//!
//! Claims decoded from a bearer token and the verifier capability that
//! produces them.

mod claims;

pub use claims::{Claims, ClaimsVerifier, VerifyError};

#[cfg(test)]
pub use claims::MockClaimsVerifier;
