//! Web Push delivery.
//!
//! Payloads are encrypted with `aes128gcm` and signed with the server's
//! VAPID key. Push services answer 404/410 for subscriptions that no longer
//! exist; those surface as [`PushError::Gone`].

use std::future::Future;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use web_push::{
    ContentEncoding, IsahcWebPushClient, SubscriptionInfo, URL_SAFE_NO_PAD, VapidSignatureBuilder,
    WebPushClient, WebPushError, WebPushMessageBuilder,
};

use crate::config::PushConfig;
use crate::models::PushSubscription;

/// Errors that can occur when delivering a push message.
#[derive(Debug, Error)]
pub enum PushError {
    /// The subscription no longer exists at the push service.
    #[error("subscription is gone")]
    Gone,

    /// Payload could not be serialized.
    #[error("payload error: {0}")]
    Payload(#[from] serde_json::Error),

    /// Signing, encryption or transport failure.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

impl From<WebPushError> for PushError {
    fn from(e: WebPushError) -> Self {
        match e.short_description() {
            "endpoint_not_found" | "endpoint_not_valid" => Self::Gone,
            _ => Self::Delivery(e.to_string()),
        }
    }
}

/// Delivers JSON payloads to browser push subscriptions.
pub trait PushSender: Send + Sync {
    fn send<P: Serialize + Sync>(
        &self,
        subscription: &PushSubscription,
        payload: &P,
    ) -> impl Future<Output = Result<(), PushError>> + Send;
}

/// [`PushSender`] using VAPID-signed Web Push.
pub struct VapidPushSender {
    client: IsahcWebPushClient,
    private_key: SecretString,
    subject: String,
}

impl VapidPushSender {
    /// Create a sender from the VAPID configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &PushConfig) -> Result<Self, PushError> {
        Ok(Self {
            client: IsahcWebPushClient::new()?,
            private_key: config.private_key.clone(),
            subject: config.subject.clone(),
        })
    }
}

impl PushSender for VapidPushSender {
    async fn send<P: Serialize + Sync>(
        &self,
        subscription: &PushSubscription,
        payload: &P,
    ) -> Result<(), PushError> {
        let content = serde_json::to_vec(payload)?;

        let info = SubscriptionInfo::new(
            &subscription.endpoint,
            &subscription.keys.p256dh,
            &subscription.keys.auth,
        );

        let mut signature = VapidSignatureBuilder::from_base64(
            self.private_key.expose_secret(),
            URL_SAFE_NO_PAD,
            &info,
        )?;
        signature.add_claim("sub", self.subject.as_str());

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_payload(ContentEncoding::Aes128Gcm, &content);
        builder.set_vapid_signature(signature.build()?);

        self.client.send(builder.build()?).await?;

        tracing::debug!(endpoint = %subscription.endpoint, "Push message delivered");
        Ok(())
    }
}

