//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `SESSION_SECRET` - Session cookie signing secret (min 64 chars, high entropy)
//!
//! ## Optional
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 3000)
//! - `APP_ENV` - `development` or `production` (default: development)
//! - `BASE_URL` - Public URL (default: `http://localhost:{PORT}`)
//! - `RESEND_API_KEY` - Transactional email API key (OTP mails fail without it)
//! - `EMAIL_FROM` - Sender address (default: `Notes App <onboarding@resend.dev>`)
//! - `VAPID_PUBLIC_KEY` / `VAPID_PRIVATE_KEY` - Web Push key pair (base64url)
//! - `VAPID_EMAIL` - Push contact, `mailto:` URI (default: `mailto:admin@localhost`)
//! - `REMINDER_INTERVAL_SECS` - Reminder scan period (default: 3600)
//! - `REMINDER_WINDOW_DAYS` - Days ahead of today that count as due (default: 2)
//! - `RESET_CONCEAL_UNKNOWN_EMAIL` - Answer forgot-password identically for
//!   unknown emails (default: false)
//! - `TRUST_PROXY_HEADERS` - Rate-limit by `X-Forwarded-For`/`X-Real-IP`
//!   instead of the peer address; set only behind a reverse proxy (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 64;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Length of an uncompressed P-256 point, the form browsers expect for
/// `applicationServerKey`.
const VAPID_PUBLIC_KEY_LENGTH: usize = 65;

const DEFAULT_EMAIL_FROM: &str = "Notes App <onboarding@resend.dev>";
const DEFAULT_VAPID_SUBJECT: &str = "mailto:admin@localhost";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "mysecretkey",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigError::InvalidEnvVar(
                "APP_ENV".to_string(),
                format!("expected development or production, got {other}"),
            )),
        }
    }

    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    /// Name reported to Sentry.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, used in email links
    pub base_url: String,
    /// Deployment environment
    pub environment: Environment,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Transactional email configuration
    pub email: EmailConfig,
    /// Web Push configuration, absent when no key pair is configured
    pub push: Option<PushConfig>,
    /// Reminder scheduler configuration
    pub reminders: ReminderConfig,
    /// Answer forgot-password requests for unknown emails like known ones
    pub conceal_unknown_reset_email: bool,
    /// Key rate limits on `X-Forwarded-For`/`X-Real-IP` (only behind a proxy)
    pub trust_proxy_headers: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Transactional email configuration.
#[derive(Clone)]
pub struct EmailConfig {
    /// Resend API key. Without one every send fails.
    pub api_key: Option<SecretString>,
    /// `From` header value
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Web Push (VAPID) configuration.
///
/// Implements `Debug` manually to redact the private key.
#[derive(Clone)]
pub struct PushConfig {
    /// Base64url public key handed to browsers
    pub public_key: String,
    /// Base64url private key used to sign VAPID claims
    pub private_key: SecretString,
    /// Contact URI placed in the VAPID `sub` claim
    pub subject: String,
}

impl std::fmt::Debug for PushConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushConfig")
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .field("subject", &self.subject)
            .finish()
    }
}

/// Reminder scheduler configuration.
#[derive(Debug, Clone, Copy)]
pub struct ReminderConfig {
    /// Time between scans
    pub interval: Duration,
    /// Number of days, starting today, whose due notes are reminded
    pub window_days: u32,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60 * 60),
            window_days: 2,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_required_secret("DATABASE_URL")?;
        let host = parse_env("HOST", "127.0.0.1")?;
        let port: u16 = parse_env("PORT", "3000")?;
        let base_url = get_optional_env("BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}"));
        let environment = Environment::parse(&get_env_or_default("APP_ENV", "development"))?;

        let session_secret = get_validated_secret("SESSION_SECRET")?;
        validate_session_secret(&session_secret, "SESSION_SECRET")?;

        let email = EmailConfig::from_env();
        let push = PushConfig::from_env()?;
        let reminders = ReminderConfig::from_env()?;
        let conceal_unknown_reset_email = parse_bool_env("RESET_CONCEAL_UNKNOWN_EMAIL")?;
        let trust_proxy_headers = parse_bool_env("TRUST_PROXY_HEADERS")?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            environment,
            session_secret,
            email,
            push,
            reminders,
            conceal_unknown_reset_email,
            trust_proxy_headers,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl EmailConfig {
    fn from_env() -> Self {
        Self {
            api_key: get_optional_env("RESEND_API_KEY").map(SecretString::from),
            from_address: get_env_or_default("EMAIL_FROM", DEFAULT_EMAIL_FROM),
        }
    }
}

impl PushConfig {
    /// Load the VAPID key pair. Both halves must be present, or neither.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if only one key is set or a value is malformed.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let public_key = get_optional_env("VAPID_PUBLIC_KEY");
        let private_key = get_optional_env("VAPID_PRIVATE_KEY");

        match (public_key, private_key) {
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::MissingEnvVar("VAPID_PRIVATE_KEY".to_string())),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar("VAPID_PUBLIC_KEY".to_string())),
            (Some(public_key), Some(private_key)) => {
                validate_vapid_public_key(&public_key)?;
                let subject = get_env_or_default("VAPID_EMAIL", DEFAULT_VAPID_SUBJECT);
                validate_vapid_subject(&subject)?;
                Ok(Some(Self {
                    public_key,
                    private_key: SecretString::from(private_key),
                    subject,
                }))
            }
        }
    }
}

impl ReminderConfig {
    /// Load scheduler settings, falling back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for unparsable or zero values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let interval_secs: u64 = parse_env(
            "REMINDER_INTERVAL_SECS",
            &defaults.interval.as_secs().to_string(),
        )?;
        if interval_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "REMINDER_INTERVAL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let window_days: u32 =
            parse_env("REMINDER_WINDOW_DAYS", &defaults.window_days.to_string())?;
        if window_days == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "REMINDER_WINDOW_DAYS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            interval: Duration::from_secs(interval_secs),
            window_days,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a boolean flag; unset means `false`.
fn parse_bool_env(key: &str) -> Result<bool, ConfigError> {
    get_optional_env(key).map_or(Ok(false), |v| parse_bool(key, &v))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got {other}"),
        )),
    }
}

/// Validate that a session secret meets minimum length requirements.
///
/// The secret becomes the cookie signing key, which must be at least 64 bytes.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Check that the public key decodes to an uncompressed P-256 point.
fn validate_vapid_public_key(key: &str) -> Result<(), ConfigError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(key.trim_end_matches('='))
        .map_err(|e| ConfigError::InvalidEnvVar("VAPID_PUBLIC_KEY".to_string(), e.to_string()))?;

    if bytes.len() != VAPID_PUBLIC_KEY_LENGTH || bytes.first() != Some(&0x04) {
        return Err(ConfigError::InvalidEnvVar(
            "VAPID_PUBLIC_KEY".to_string(),
            format!(
                "expected a {VAPID_PUBLIC_KEY_LENGTH}-byte uncompressed P-256 key, got {} bytes",
                bytes.len()
            ),
        ));
    }
    Ok(())
}

/// VAPID requires a `mailto:` or `https:` contact.
fn validate_vapid_subject(subject: &str) -> Result<(), ConfigError> {
    if subject.starts_with("mailto:") || subject.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            "VAPID_EMAIL".to_string(),
            "must start with mailto: or https://".to_string(),
        ))
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
