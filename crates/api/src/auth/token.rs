//! JWT issuance and verification.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use storeline_core::UserId;

use super::AuthError;

const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
const ACCEPTED_ALGORITHM_NAMES: [&str; 3] = ["HS256", "HS384", "HS512"];

/// Claims carried by every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the authenticated user's id.
    pub sub: UserId,
    pub email: String,
    /// Expiry (Unix seconds).
    pub exp: i64,
    /// Issued at (Unix seconds).
    pub iat: i64,
}

impl Claims {
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.sub
    }
}

/// A freshly signed token and its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Signs and verifies access tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: TimeDelta,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("keys", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Create a token service from the signing secret and token lifetime.
    #[must_use]
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let secret = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let ttl = i64::try_from(ttl.as_secs())
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Issue a token for `user_id` valid from now for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if encoding fails.
    pub fn issue(&self, user_id: UserId, email: &str) -> Result<IssuedToken, AuthError> {
        self.issue_at(user_id, email, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if encoding fails.
    pub fn issue_at(
        &self,
        user_id: UserId,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let expires_at = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let claims = Claims {
            sub: user_id,
            email: email.to_owned(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(AuthError::Signing)?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify a token's algorithm, signature and expiry.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MalformedToken`] if the header cannot be read
    /// - [`AuthError::UnsupportedAlgorithm`] for anything but HS256/384/512
    /// - [`AuthError::Expired`] once `exp` has passed
    /// - [`AuthError::InvalidToken`] for a bad signature or claims
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let alg = header_algorithm(token)?;
        if !ACCEPTED_ALGORITHM_NAMES.contains(&alg.as_str()) {
            return Err(AuthError::UnsupportedAlgorithm(alg));
        }

        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e),
            })
    }
}

/// Read `alg` from the token header without trusting anything else.
///
/// Done by hand so that algorithms `jsonwebtoken` cannot represent
/// (such as `none`) are still reported as unsupported rather than malformed.
fn header_algorithm(token: &str) -> Result<String, AuthError> {
    let mut segments = token.split('.');
    let (Some(header), Some(_), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AuthError::MalformedToken);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| AuthError::MalformedToken)?;
    let raw: RawHeader = serde_json::from_slice(&bytes).map_err(|_| AuthError::MalformedToken)?;
    Ok(raw.alg)
}
