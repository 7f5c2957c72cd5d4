//! Transactional email for the password-reset flow.
//!
//! Messages are rendered from Askama templates (HTML and plain text) and
//! delivered through the Resend HTTP API.

use std::future::Future;

use askama::Template;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;

use duenotes_core::Email;

use crate::config::EmailConfig;
use crate::models::user::RESET_CODE_TTL_MINUTES;

/// Resend API endpoint for sending a single message.
const RESEND_URL: &str = "https://api.resend.com/emails";

/// HTML template for the reset code email.
#[derive(Template)]
#[template(path = "email/reset_code.html")]
struct ResetCodeEmailHtml<'a> {
    code: &'a str,
    ttl_minutes: i64,
}

/// Plain text template for the reset code email.
#[derive(Template)]
#[template(path = "email/reset_code.txt")]
struct ResetCodeEmailText<'a> {
    code: &'a str,
    ttl_minutes: i64,
}

/// HTML template for the password changed email.
#[derive(Template)]
#[template(path = "email/password_changed.html")]
struct PasswordChangedEmailHtml;

/// Plain text template for the password changed email.
#[derive(Template)]
#[template(path = "email/password_changed.txt")]
struct PasswordChangedEmailText;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum MailError {
    /// No API key configured.
    #[error("email delivery is not configured")]
    NotConfigured,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider rejected the message.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// API key is not a valid header value.
    #[error("invalid API key format")]
    InvalidApiKey,
}

/// Sends the reset-flow emails.
pub trait Mailer: Send + Sync {
    /// Send a one-time reset code.
    fn send_reset_code(
        &self,
        to: &Email,
        code: &str,
    ) -> impl Future<Output = Result<(), MailError>> + Send;

    /// Confirm a completed password change.
    fn send_password_changed(&self, to: &Email)
    -> impl Future<Output = Result<(), MailError>> + Send;
}

/// Request body for `POST /emails`.
#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

/// [`Mailer`] backed by the Resend API.
#[derive(Clone)]
pub struct ResendMailer {
    client: Option<reqwest::Client>,
    from_address: String,
}

impl ResendMailer {
    /// Create a mailer from configuration.
    ///
    /// Without an API key every send fails with [`MailError::NotConfigured`].
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &EmailConfig) -> Result<Self, MailError> {
        let client = match &config.api_key {
            Some(api_key) => {
                let mut headers = HeaderMap::new();
                let auth_value = format!("Bearer {}", api_key.expose_secret());
                let mut auth =
                    HeaderValue::from_str(&auth_value).map_err(|_| MailError::InvalidApiKey)?;
                auth.set_sensitive(true);
                headers.insert(AUTHORIZATION, auth);

                Some(reqwest::Client::builder().default_headers(headers).build()?)
            }
            None => None,
        };

        Ok(Self {
            client,
            from_address: config.from_address.clone(),
        })
    }

    async fn send(
        &self,
        to: &Email,
        subject: &str,
        text: &str,
        html: &str,
    ) -> Result<(), MailError> {
        let client = self.client.as_ref().ok_or(MailError::NotConfigured)?;

        let body = SendEmailRequest {
            from: &self.from_address,
            to: [to.as_str()],
            subject,
            html,
            text,
        };

        let response = client.post(RESEND_URL).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

impl Mailer for ResendMailer {
    async fn send_reset_code(&self, to: &Email, code: &str) -> Result<(), MailError> {
        let html = ResetCodeEmailHtml {
            code,
            ttl_minutes: RESET_CODE_TTL_MINUTES,
        }
        .render()?;
        let text = ResetCodeEmailText {
            code,
            ttl_minutes: RESET_CODE_TTL_MINUTES,
        }
        .render()?;

        self.send(to, "Password Reset OTP - Notes App", &text, &html)
            .await
    }

    async fn send_password_changed(&self, to: &Email) -> Result<(), MailError> {
        let html = PasswordChangedEmailHtml.render()?;
        let text = PasswordChangedEmailText.render()?;

        self.send(to, "Password Changed - Notes App", &text, &html)
            .await
    }
}

/// Generate a 6-digit reset code.
#[must_use]
pub fn generate_reset_code() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_reset_code_format() {
        let code = generate_reset_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_generate_reset_code_range() {
        for _ in 0..100 {
            let code: u32 = generate_reset_code().parse().expect("valid number");
            assert!(code >= 100_000);
            assert!(code < 1_000_000);
        }
    }

    #[test]
    fn test_reset_code_templates_include_code_and_ttl() {
        let html = ResetCodeEmailHtml {
            code: "482913",
            ttl_minutes: 10,
        }
        .render()
        .expect("html renders");
        let text = ResetCodeEmailText {
            code: "482913",
            ttl_minutes: 10,
        }
        .render()
        .expect("text renders");

        for body in [html, text] {
            assert!(body.contains("482913"));
            assert!(body.contains("10 minutes"));
        }
    }

    #[tokio::test]
    async fn test_unconfigured_mailer_fails() {
        let mailer = ResendMailer::new(&EmailConfig {
            api_key: None,
            from_address: "Notes App <onboarding@resend.dev>".to_owned(),
        })
        .expect("builds without a key");
        let to = Email::parse("ann@example.com").expect("valid email");

        let err = mailer.send_reset_code(&to, "123456").await.unwrap_err();
        assert!(matches!(err, MailError::NotConfigured));
    }
}
