//! Stateless bearer tokens.
//!
//! Tokens are HS256 JWTs carrying the user id as `sub`, the configured
//! issuer and an expiry. Nothing is stored server-side, so a token stays
//! valid until it expires.

mod fingerprint;
mod settings;

use std::sync::Arc;

use chrono::TimeDelta;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

pub use fingerprint::key_fingerprint;
pub use settings::{
    BuildMode, DEFAULT_ISSUER, DEFAULT_TTL_HOURS, TokenConfigError, TokenSettings,
    token_settings_from_env,
};

use super::Error;
use super::user::UserId;

/// Claims carried by every issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the decimal user id.
    pub sub: String,
    /// Issuer.
    pub iss: String,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// Reasons a token cannot be issued or trusted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Signature, algorithm or issuer mismatch.
    #[error("token signature is invalid")]
    InvalidToken,
    /// The expiry has passed.
    #[error("token has expired")]
    Expired,
    /// The token cannot be parsed.
    #[error("token is malformed")]
    Malformed,
    /// Encoding a new token failed.
    #[error("failed to sign token: {message}")]
    Signing { message: String },
}

impl From<TokenError> for Error {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Signing { message } => {
                error!(%message, "token signing failed");
                Error::opaque_internal()
            }
            _ => Error::authentication_required(),
        }
    }
}

/// Issues and verifies signed, time-bound identity tokens.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
///
/// use chrono::TimeDelta;
/// use expense_tracker::domain::{TokenService, TokenSettings, UserId};
/// use mockable::DefaultClock;
///
/// let settings = TokenSettings::new(vec![7_u8; 32], TimeDelta::hours(1), "expense-tracker");
/// let tokens = TokenService::new(&settings, Arc::new(DefaultClock));
/// let token = tokens.issue(UserId::new(42)).expect("sign");
/// assert_eq!(tokens.verify(&token), Ok(UserId::new(42)));
/// ```
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl: TimeDelta,
    fingerprint: String,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    /// Build a service from immutable settings.
    pub fn new(settings: &TokenSettings, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // Expiry is checked against the injected clock in `verify`.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.set_issuer(&[settings.issuer()]);

        Self {
            encoding: EncodingKey::from_secret(settings.secret()),
            decoding: DecodingKey::from_secret(settings.secret()),
            validation,
            issuer: settings.issuer().to_owned(),
            ttl: settings.ttl(),
            fingerprint: key_fingerprint(settings.secret()),
            clock,
        }
    }

    /// Fingerprint of the active signing secret.
    pub fn fingerprint(&self) -> &str {
        self.fingerprint.as_str()
    }

    /// Sign a token for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] when encoding fails.
    pub fn issue(&self, user: UserId) -> Result<String, TokenError> {
        let now = self.clock.utc();
        let claims = TokenClaims {
            sub: user.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(
            |err| TokenError::Signing {
                message: err.to_string(),
            },
        )
    }

    /// Resolve a token to the user id it was issued for.
    ///
    /// # Errors
    ///
    /// [`TokenError::InvalidToken`] on signature or issuer mismatch,
    /// [`TokenError::Expired`] once the clock reaches `exp`, and
    /// [`TokenError::Malformed`] for anything that does not parse.
    pub fn verify(&self, token: &str) -> Result<UserId, TokenError> {
        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map_err(|err| {
                let mapped = map_decode_error(err.kind());
                debug!(
                    key = %self.fingerprint,
                    reason = %mapped,
                    "token rejected"
                );
                mapped
            })?;
        let claims = data.claims;

        if self.clock.utc().timestamp() >= claims.exp {
            debug!(key = %self.fingerprint, "token expired");
            return Err(TokenError::Expired);
        }

        claims
            .sub
            .parse::<i64>()
            .map(UserId::new)
            .map_err(|_| TokenError::Malformed)
    }
}

fn map_decode_error(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidIssuer
        | ErrorKind::ImmatureSignature => TokenError::InvalidToken,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}
