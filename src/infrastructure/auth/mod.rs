//! Bearer token verification backed by JSON Web Tokens

mod jwt;

pub use jwt::{parse_algorithm, JwtSigner, JwtVerifier, KeySet};
