//! Signed bearer token verification and signing

use std::fmt;
use std::str::FromStr;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::config::TokenConfig;
use crate::domain::{Claims, ClaimsVerifier, DomainError, VerifyError};

/// Parse an algorithm name such as `HS256` or `rs512`
pub fn parse_algorithm(name: &str) -> Result<Algorithm, DomainError> {
    Algorithm::from_str(&name.trim().to_uppercase())
        .map_err(|_| DomainError::configuration(format!("Unsupported token algorithm '{}'", name)))
}

fn is_hmac(algorithm: Algorithm) -> bool {
    matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

fn is_rsa(algorithm: Algorithm) -> bool {
    matches!(
        algorithm,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
    )
}

/// Verification key paired with the one algorithm it is accepted for
///
/// Either half may be absent; a verifier built from an incomplete key set
/// rejects every token with a configuration error.
#[derive(Clone, Default)]
pub struct KeySet {
    algorithm: Option<Algorithm>,
    key: Option<DecodingKey>,
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySet")
            .field("algorithm", &self.algorithm)
            .field("key", &self.key.as_ref().map(|_| "[hidden]"))
            .finish()
    }
}

impl KeySet {
    pub fn new(algorithm: Option<Algorithm>, key: Option<DecodingKey>) -> Self {
        Self { algorithm, key }
    }

    /// Shared-secret key set for an HS* algorithm
    pub fn hmac(algorithm: &str, secret: &str) -> Result<Self, DomainError> {
        let algorithm = parse_algorithm(algorithm)?;
        if !is_hmac(algorithm) {
            return Err(DomainError::configuration(format!(
                "{:?} is not an HMAC algorithm",
                algorithm
            )));
        }
        if secret.is_empty() {
            return Err(DomainError::configuration("HMAC secret must not be empty"));
        }

        Ok(Self::new(
            Some(algorithm),
            Some(DecodingKey::from_secret(secret.as_bytes())),
        ))
    }

    /// Public-key key set for an RS*/PS* algorithm
    pub fn rsa_pem(algorithm: &str, pem: &str) -> Result<Self, DomainError> {
        let algorithm = parse_algorithm(algorithm)?;
        if !is_rsa(algorithm) {
            return Err(DomainError::configuration(format!(
                "{:?} is not an RSA algorithm",
                algorithm
            )));
        }

        let key = DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
            DomainError::configuration(format!("Failed to parse RSA public key: {}", e))
        })?;

        Ok(Self::new(Some(algorithm), Some(key)))
    }

    pub fn from_config(config: &TokenConfig) -> Result<Self, DomainError> {
        if config.is_rsa() {
            Self::rsa_pem(
                &config.algorithm,
                config.public_key_pem.as_deref().unwrap_or_default(),
            )
        } else {
            Self::hmac(&config.algorithm, &config.secret)
        }
    }
}

/// JWT implementation of [`ClaimsVerifier`]
///
/// Checks signature, algorithm and the presence of `exp`. Whether the token
/// is still live is left to the caller, which compares `exp` against its own
/// clock.
#[derive(Debug, Clone)]
pub struct JwtVerifier {
    keys: KeySet,
}

impl JwtVerifier {
    pub fn new(keys: KeySet) -> Self {
        Self { keys }
    }
}

impl ClaimsVerifier for JwtVerifier {
    fn parse(&self, token: &str) -> Result<Claims, VerifyError> {
        let key = self.keys.key.as_ref().ok_or(VerifyError::MissingKey)?;
        let algorithm = self.keys.algorithm.ok_or(VerifyError::MissingAlgorithm)?;

        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<Claims>(token, key, &validation)
            .map_err(|e| VerifyError::InvalidToken(e.to_string()))?;

        if data.claims.api_key.is_empty() {
            return Err(VerifyError::MissingApiKey);
        }

        Ok(data.claims)
    }
}

/// Issues HMAC-signed bearer tokens
#[derive(Clone)]
pub struct JwtSigner {
    algorithm: Algorithm,
    key: EncodingKey,
}

impl fmt::Debug for JwtSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSigner")
            .field("algorithm", &self.algorithm)
            .field("key", &"[hidden]")
            .finish()
    }
}

impl JwtSigner {
    pub fn hmac(algorithm: &str, secret: &str) -> Result<Self, DomainError> {
        let algorithm = parse_algorithm(algorithm)?;
        if !is_hmac(algorithm) {
            return Err(DomainError::configuration(format!(
                "Tokens can only be issued with HMAC algorithms, got {:?}",
                algorithm
            )));
        }
        if secret.is_empty() {
            return Err(DomainError::configuration("HMAC secret must not be empty"));
        }

        Ok(Self {
            algorithm,
            key: EncodingKey::from_secret(secret.as_bytes()),
        })
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, DomainError> {
        encode(&Header::new(self.algorithm), claims, &self.key)
            .map_err(|e| DomainError::internal(format!("Failed to sign token: {}", e)))
    }
}
