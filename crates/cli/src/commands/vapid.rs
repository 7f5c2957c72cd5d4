//! VAPID key generation.
//!
//! # Usage
//!
//! ```bash
//! duenotes-cli vapid generate >> .env
//! duenotes-cli vapid generate -s mailto:ops@duenotes.app
//! ```
//!
//! Prints `VAPID_PUBLIC_KEY`, `VAPID_PRIVATE_KEY` and `VAPID_EMAIL` lines
//! ready to paste into the server environment. Needs no database.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use p256::SecretKey;
use p256::elliptic_curve::rand_core::OsRng;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use secrecy::{ExposeSecret, SecretString};

/// A freshly generated P-256 key pair, both halves base64url without padding.
pub struct VapidKeyPair {
    /// Uncompressed SEC1 point, 65 bytes before encoding.
    pub public_key: String,
    /// Raw 32-byte scalar.
    pub private_key: SecretString,
}

impl VapidKeyPair {
    #[must_use]
    pub fn generate() -> Self {
        let secret = SecretKey::random(&mut OsRng);
        let point = secret.public_key().to_encoded_point(false);

        Self {
            public_key: URL_SAFE_NO_PAD.encode(point.as_bytes()),
            private_key: SecretString::from(URL_SAFE_NO_PAD.encode(secret.to_bytes())),
        }
    }

    /// Render as `.env` lines.
    #[must_use]
    pub fn to_env_lines(&self, subject: &str) -> String {
        format!(
            "VAPID_PUBLIC_KEY={}\nVAPID_PRIVATE_KEY={}\nVAPID_EMAIL={subject}\n",
            self.public_key,
            self.private_key.expose_secret()
        )
    }
}

/// Errors from `vapid generate`.
#[derive(Debug, thiserror::Error)]
pub enum VapidError {
    #[error("Invalid subject {0}: expected a mailto: or https:// contact")]
    InvalidSubject(String),
}

/// Generate a key pair and print it to stdout.
#[allow(clippy::print_stdout)]
pub fn generate(subject: &str) -> Result<(), VapidError> {
    if !subject.starts_with("mailto:") && !subject.starts_with("https://") {
        return Err(VapidError::InvalidSubject(subject.to_string()));
    }

    let keys = VapidKeyPair::generate();
    tracing::info!("Generated VAPID key pair");
    print!("{}", keys.to_env_lines(subject));
    Ok(())
}
