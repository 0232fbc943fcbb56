//! Token signing configuration parsed from the environment.
//!
//! Settings are read once at startup and handed to
//! [`TokenService::new`](super::TokenService::new); nothing here is global.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use mockable::Env;
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::warn;
use zeroize::Zeroizing;

use crate::cap_fs;

const SECRET_DEFAULT_PATH: &str = "/var/run/secrets/token_secret";
const SECRET_MIN_LEN: usize = 32;
const EPHEMERAL_SECRET_LEN: usize = 64;
const SECRET_FILE_ENV: &str = "TOKEN_SECRET_FILE";
const ALLOW_EPHEMERAL_ENV: &str = "TOKEN_ALLOW_EPHEMERAL";
const TTL_HOURS_ENV: &str = "TOKEN_TTL_HOURS";
const ISSUER_ENV: &str = "TOKEN_ISSUER";
const BOOL_EXPECTED: &str = "1|0|true|false|yes|no|y|n";
const TTL_EXPECTED: &str = "whole hours between 1 and 720";

/// Default issuer claim.
pub const DEFAULT_ISSUER: &str = "expense-tracker";
/// Default token lifetime in hours.
pub const DEFAULT_TTL_HOURS: i64 = 24;
const MAX_TTL_HOURS: i64 = 720;

/// Build mode for token configuration validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Debug builds tolerate defaults and may use an ephemeral secret.
    Debug,
    /// Release builds require a readable secret of adequate length.
    Release,
}

impl BuildMode {
    /// Determine the build mode from `cfg!(debug_assertions)`.
    #[must_use]
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }

    fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }
}

/// Immutable signing configuration for issued tokens.
#[derive(Clone)]
pub struct TokenSettings {
    secret: Zeroizing<Vec<u8>>,
    ttl: TimeDelta,
    issuer: String,
}

impl TokenSettings {
    /// Build settings from explicit parts.
    pub fn new(secret: impl Into<Vec<u8>>, ttl: TimeDelta, issuer: impl Into<String>) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
            ttl,
            issuer: issuer.into(),
        }
    }

    /// HMAC signing secret.
    pub fn secret(&self) -> &[u8] {
        self.secret.as_slice()
    }

    /// Lifetime of an issued token.
    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Issuer claim stamped on and required from every token.
    pub fn issuer(&self) -> &str {
        self.issuer.as_str()
    }
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("ttl", &self.ttl)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

/// Errors raised while validating token configuration.
#[derive(thiserror::Error, Debug)]
pub enum TokenConfigError {
    /// A variable is present but contains an invalid value.
    #[error("invalid value for {name}='{value}'; expected {expected}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    /// Reading the secret file failed.
    #[error("failed to read token secret at {path}: {source}")]
    SecretRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The secret file is shorter than the build mode allows.
    #[error("token secret at {path} too short: need >= {min_len} bytes, got {length}")]
    SecretTooShort {
        path: PathBuf,
        length: usize,
        min_len: usize,
    },
    /// Release builds must not allow ephemeral secrets.
    #[error("TOKEN_ALLOW_EPHEMERAL must be 0 in release builds")]
    EphemeralNotAllowed,
}

/// Build token settings from environment variables and build mode.
///
/// # Examples
///
/// ```rust
/// use expense_tracker::domain::{BuildMode, token_settings_from_env};
/// use mockable::MockEnv;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let secret_path = dir.path().join("token_secret");
/// std::fs::write(&secret_path, vec![b's'; 32])?;
///
/// let secret_path = secret_path.to_string_lossy().into_owned();
/// let mut env = MockEnv::new();
/// env.expect_string().returning(move |name| match name {
///     "TOKEN_SECRET_FILE" => Some(secret_path.clone()),
///     "TOKEN_TTL_HOURS" => Some("12".to_owned()),
///     _ => None,
/// });
///
/// let settings = token_settings_from_env(&env, BuildMode::Release)?;
/// assert_eq!(settings.ttl(), chrono::TimeDelta::hours(12));
/// assert_eq!(settings.issuer(), "expense-tracker");
/// # Ok(())
/// # }
/// ```
pub fn token_settings_from_env<E: Env>(
    env: &E,
    mode: BuildMode,
) -> Result<TokenSettings, TokenConfigError> {
    let ttl = ttl_from_env(env, mode)?;
    let issuer = issuer_from_env(env);
    let allow_ephemeral = allow_ephemeral_from_env(env, mode)?;
    let secret = secret_from_env(env, mode, allow_ephemeral)?;

    Ok(TokenSettings {
        secret,
        ttl,
        issuer,
    })
}

fn ttl_from_env<E: Env>(env: &E, mode: BuildMode) -> Result<TimeDelta, TokenConfigError> {
    let Some(value) = env.string(TTL_HOURS_ENV) else {
        return Ok(TimeDelta::hours(DEFAULT_TTL_HOURS));
    };
    match value.trim().parse::<i64>() {
        Ok(hours) if (1..=MAX_TTL_HOURS).contains(&hours) => Ok(TimeDelta::hours(hours)),
        _ if mode.is_debug() => {
            warn!(value = %value, "invalid TOKEN_TTL_HOURS; using default");
            Ok(TimeDelta::hours(DEFAULT_TTL_HOURS))
        }
        _ => Err(TokenConfigError::InvalidEnv {
            name: TTL_HOURS_ENV,
            value,
            expected: TTL_EXPECTED,
        }),
    }
}

fn issuer_from_env<E: Env>(env: &E) -> String {
    env.string(ISSUER_ENV)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_ISSUER.to_owned())
}

fn allow_ephemeral_from_env<E: Env>(env: &E, mode: BuildMode) -> Result<bool, TokenConfigError> {
    let Some(value) = env.string(ALLOW_EPHEMERAL_ENV) else {
        return Ok(mode.is_debug());
    };
    match parse_bool(&value) {
        Some(true) if mode.is_debug() => Ok(true),
        Some(true) => Err(TokenConfigError::EphemeralNotAllowed),
        Some(false) => Ok(false),
        None if mode.is_debug() => {
            warn!(value = %value, "invalid TOKEN_ALLOW_EPHEMERAL; defaulting to enabled");
            Ok(true)
        }
        None => Err(TokenConfigError::InvalidEnv {
            name: ALLOW_EPHEMERAL_ENV,
            value,
            expected: BOOL_EXPECTED,
        }),
    }
}

fn secret_from_env<E: Env>(
    env: &E,
    mode: BuildMode,
    allow_ephemeral: bool,
) -> Result<Zeroizing<Vec<u8>>, TokenConfigError> {
    let path = PathBuf::from(
        env.string(SECRET_FILE_ENV)
            .unwrap_or_else(|| SECRET_DEFAULT_PATH.to_owned()),
    );

    match cap_fs::read_file(&path) {
        Ok(bytes) => validate_secret(Zeroizing::new(bytes), &path, mode),
        Err(error) if allow_ephemeral => {
            warn!(
                path = %path.display(),
                error = %error,
                "using temporary token secret (dev only)"
            );
            Ok(ephemeral_secret())
        }
        Err(error) => Err(TokenConfigError::SecretRead {
            path,
            source: error,
        }),
    }
}

fn validate_secret(
    bytes: Zeroizing<Vec<u8>>,
    path: &Path,
    mode: BuildMode,
) -> Result<Zeroizing<Vec<u8>>, TokenConfigError> {
    let min_len = if mode.is_debug() { 1 } else { SECRET_MIN_LEN };
    let length = bytes.len();
    if length < min_len {
        return Err(TokenConfigError::SecretTooShort {
            path: path.to_path_buf(),
            length,
            min_len,
        });
    }
    if length < SECRET_MIN_LEN {
        warn!(length, "token secret shorter than recommended minimum");
    }
    Ok(bytes)
}

fn ephemeral_secret() -> Zeroizing<Vec<u8>> {
    let mut bytes = Zeroizing::new(vec![0_u8; EPHEMERAL_SECRET_LEN]);
    OsRng.fill_bytes(bytes.as_mut_slice());
    bytes
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for token configuration parsing.
    use super::*;
    use mockable::MockEnv;
    use rstest::rstest;
    use std::collections::HashMap;
    use tempfile::TempDir;

    struct SecretFile {
        _dir: TempDir,
        path: String,
    }

    fn secret_file(len: usize) -> SecretFile {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("token_secret");
        std::fs::write(&path, vec![b'k'; len]).expect("write secret");
        SecretFile {
            path: path.to_string_lossy().into_owned(),
            _dir: dir,
        }
    }

    fn mock_env(vars: &[(&str, &str)]) -> MockEnv {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        let mut env = MockEnv::new();
        env.expect_string()
            .times(0..)
            .returning(move |key| vars.get(key).cloned());
        env
    }

    #[rstest]
    fn release_reads_secret_and_defaults() {
        let file = secret_file(SECRET_MIN_LEN);
        let env = mock_env(&[(SECRET_FILE_ENV, file.path.as_str())]);

        let settings = token_settings_from_env(&env, BuildMode::Release).expect("valid settings");
        assert_eq!(settings.secret(), vec![b'k'; SECRET_MIN_LEN].as_slice());
        assert_eq!(settings.ttl(), TimeDelta::hours(DEFAULT_TTL_HOURS));
        assert_eq!(settings.issuer(), DEFAULT_ISSUER);
    }

    #[rstest]
    fn release_rejects_short_secret() {
        let file = secret_file(SECRET_MIN_LEN - 1);
        let env = mock_env(&[(SECRET_FILE_ENV, file.path.as_str())]);

        let err = token_settings_from_env(&env, BuildMode::Release).expect_err("short secret");
        assert!(matches!(
            err,
            TokenConfigError::SecretTooShort { length, min_len: SECRET_MIN_LEN, .. }
                if length == SECRET_MIN_LEN - 1
        ));
    }

    #[rstest]
    fn release_rejects_missing_secret() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent").to_string_lossy().into_owned();
        let env = mock_env(&[(SECRET_FILE_ENV, missing.as_str())]);

        let err = token_settings_from_env(&env, BuildMode::Release).expect_err("missing secret");
        assert!(matches!(err, TokenConfigError::SecretRead { .. }));
    }

    #[rstest]
    fn release_rejects_ephemeral_toggle() {
        let file = secret_file(SECRET_MIN_LEN);
        let env = mock_env(&[
            (SECRET_FILE_ENV, file.path.as_str()),
            (ALLOW_EPHEMERAL_ENV, "1"),
        ]);

        let err = token_settings_from_env(&env, BuildMode::Release).expect_err("ephemeral");
        assert!(matches!(err, TokenConfigError::EphemeralNotAllowed));
    }

    #[rstest]
    fn debug_falls_back_to_ephemeral_secret() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent").to_string_lossy().into_owned();
        let env = mock_env(&[(SECRET_FILE_ENV, missing.as_str())]);

        let settings = token_settings_from_env(&env, BuildMode::Debug).expect("ephemeral secret");
        assert_eq!(settings.secret().len(), EPHEMERAL_SECRET_LEN);
    }

    #[rstest]
    fn debug_respects_disabled_ephemeral_toggle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent").to_string_lossy().into_owned();
        let env = mock_env(&[
            (SECRET_FILE_ENV, missing.as_str()),
            (ALLOW_EPHEMERAL_ENV, "no"),
        ]);

        let err = token_settings_from_env(&env, BuildMode::Debug).expect_err("no fallback");
        assert!(matches!(err, TokenConfigError::SecretRead { .. }));
    }

    #[rstest]
    #[case("0")]
    #[case("721")]
    #[case("soon")]
    fn release_rejects_invalid_ttl(#[case] value: &str) {
        let file = secret_file(SECRET_MIN_LEN);
        let env = mock_env(&[(SECRET_FILE_ENV, file.path.as_str()), (TTL_HOURS_ENV, value)]);

        let err = token_settings_from_env(&env, BuildMode::Release).expect_err("invalid ttl");
        assert!(matches!(
            err,
            TokenConfigError::InvalidEnv { name: TTL_HOURS_ENV, .. }
        ));
    }

    #[rstest]
    fn debug_defaults_invalid_ttl() {
        let file = secret_file(8);
        let env = mock_env(&[(SECRET_FILE_ENV, file.path.as_str()), (TTL_HOURS_ENV, "-3")]);

        let settings = token_settings_from_env(&env, BuildMode::Debug).expect("settings");
        assert_eq!(settings.ttl(), TimeDelta::hours(DEFAULT_TTL_HOURS));
    }

    #[rstest]
    fn custom_issuer_is_trimmed() {
        let file = secret_file(SECRET_MIN_LEN);
        let env = mock_env(&[
            (SECRET_FILE_ENV, file.path.as_str()),
            (ISSUER_ENV, "  ledger-api "),
        ]);

        let settings = token_settings_from_env(&env, BuildMode::Release).expect("settings");
        assert_eq!(settings.issuer(), "ledger-api");
    }

    #[rstest]
    fn debug_output_hides_secret() {
        let settings = TokenSettings::new(b"super-secret".to_vec(), TimeDelta::hours(1), "iss");
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("iss"));
    }
}
