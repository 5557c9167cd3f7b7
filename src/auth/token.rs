//! Session token issuance and verification.
//!
//! Tokens are compact JWTs signed with HMAC-SHA256 under a single
//! process-wide secret. The codec owns the derived keys; it is built once at
//! startup and shared behind an `Arc`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The only algorithm tokens are signed with or accepted under.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;
const SIGNING_ALGORITHM_NAME: &str = "HS256";

/// Shorter secrets are accepted but logged as weak at startup.
pub const RECOMMENDED_SECRET_LEN: usize = 32;

/// Payload carried inside every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Stringified numeric user id.
    pub sub: String,
    /// Issue time, seconds since epoch.
    pub iat: i64,
    /// Expiry time, seconds since epoch. Valid while `now < exp`.
    pub exp: i64,
}

/// Token failures. Exactly one is reported per rejected token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    /// Signature mismatch, or a header declaring anything other than HS256.
    #[error("bad token signature")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Only the `alg` field matters before signature verification.
#[derive(Deserialize)]
struct DeclaredHeader {
    alg: String,
}

/// Creates and verifies signed session tokens.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Build a codec from the signing secret.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = 0;
        // Expiry is compared against whole seconds in `parse_token_at`. `exp`
        // is left out of the required claims: the decoder reads it as unsigned
        // and would call a pre-1970 expiry missing rather than expired.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a token for `subject` that expires `ttl` from now.
    ///
    /// A zero or negative `ttl` produces a token that is already expired.
    pub fn create_token(&self, subject: &str, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: expiry_timestamp(now, ttl)?,
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify a token and return its claims.
    pub fn parse_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.parse_token_at(token, Utc::now().timestamp())
    }

    /// Verify a token as of `now` (seconds since epoch).
    pub fn parse_token_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        ensure_declared_algorithm(token)?;

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| classify(e.kind()))?;

        if now >= data.claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &SIGNING_ALGORITHM)
            .finish_non_exhaustive()
    }
}

/// `exp` is `iat + ttl` in whole seconds. A positive fractional part of the
/// ttl rounds up so a fresh token is never born expired; non-positive ttls
/// land at or before the issue second.
fn expiry_timestamp(now: DateTime<Utc>, ttl: Duration) -> Result<i64, TokenError> {
    let mut secs = ttl.num_seconds();
    if ttl.subsec_nanos() > 0 {
        secs += 1;
    }

    now.timestamp()
        .checked_add(secs)
        .ok_or_else(|| TokenError::Signing("token lifetime out of range".to_string()))
}

/// Reject algorithm substitution (including `none`) before touching the
/// signature. The decoder would refuse these too, but reports `none` as a
/// parse failure rather than a signature failure.
fn ensure_declared_algorithm(token: &str) -> Result<(), TokenError> {
    let segment = token
        .split('.')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or(TokenError::Malformed)?;
    let raw = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    let header: DeclaredHeader = serde_json::from_slice(&raw).map_err(|_| TokenError::Malformed)?;

    if header.alg != SIGNING_ALGORITHM_NAME {
        return Err(TokenError::BadSignature);
    }
    Ok(())
}

fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName => TokenError::BadSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}
