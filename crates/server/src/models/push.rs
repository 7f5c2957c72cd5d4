//! Browser push subscription.

use serde::{Deserialize, Serialize};
use url::Url;

/// A subscription as produced by `PushManager.subscribe()` and posted by the
/// browser (`JSON.stringify(subscription)`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    /// Push service URL for this browser.
    pub endpoint: String,
    /// Milliseconds since the epoch, when the browser reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<i64>,
    /// Encryption material.
    pub keys: PushKeys,
}

/// Client keys used to encrypt payloads for a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushKeys {
    /// Client public key (base64url).
    pub p256dh: String,
    /// Authentication secret (base64url).
    pub auth: String,
}

/// Reasons a posted subscription is refused.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("endpoint is not a valid URL")]
    InvalidEndpoint,
    #[error("endpoint must use https")]
    InsecureEndpoint,
    #[error("subscription keys are missing")]
    MissingKeys,
}

impl PushSubscription {
    /// Check the fields a push service will need.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError` for a malformed endpoint or empty keys.
    pub fn validate(&self) -> Result<(), SubscriptionError> {
        let url = Url::parse(&self.endpoint).map_err(|_| SubscriptionError::InvalidEndpoint)?;
        if url.scheme() != "https" {
            return Err(SubscriptionError::InsecureEndpoint);
        }
        if self.keys.p256dh.trim().is_empty() || self.keys.auth.trim().is_empty() {
            return Err(SubscriptionError::MissingKeys);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BROWSER_JSON: &str = r#"{
        "endpoint": "https://fcm.googleapis.com/fcm/send/abc123",
        "expirationTime": null,
        "keys": { "p256dh": "BNcRdreALRFXTkOOUHK1EtK2wtaz5Ry4YfYCA_0QTpQtUbVlUls0VJXg7A8u-Ts1XbjhazAkj7I99e8QcYP7DkM", "auth": "tBHItJI5svbpez7KI4CCXg" }
    }"#;

    #[test]
    fn test_deserializes_browser_payload() {
        let sub: PushSubscription = serde_json::from_str(BROWSER_JSON).unwrap();
        assert_eq!(sub.endpoint, "https://fcm.googleapis.com/fcm/send/abc123");
        assert_eq!(sub.expiration_time, None);
        assert_eq!(sub.keys.auth, "tBHItJI5svbpez7KI4CCXg");
        assert!(sub.validate().is_ok());
    }

    #[test]
    fn test_rejects_http_endpoint() {
        let mut sub: PushSubscription = serde_json::from_str(BROWSER_JSON).unwrap();
        sub.endpoint = "http://push.example/abc".to_string();
        assert_eq!(sub.validate(), Err(SubscriptionError::InsecureEndpoint));
    }

    #[test]
    fn test_rejects_garbage_endpoint_and_empty_keys() {
        let mut sub: PushSubscription = serde_json::from_str(BROWSER_JSON).unwrap();
        sub.keys.auth = String::new();
        assert_eq!(sub.validate(), Err(SubscriptionError::MissingKeys));

        sub.endpoint = "nonsense".to_string();
        assert_eq!(sub.validate(), Err(SubscriptionError::InvalidEndpoint));
    }
}
