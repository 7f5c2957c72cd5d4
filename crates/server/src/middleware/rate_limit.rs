//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `auth_rate_limiter`: strict limits for login, signup and reset form posts
//! - `api_rate_limiter`: relaxed limits for the push subscription API
//!
//! Clients are keyed by peer address unless `TRUST_PROXY_HEADERS` is set.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Per-client key for the limiters.
///
/// Uses the socket peer address. `X-Forwarded-For` and `X-Real-IP` are only
/// read when `trust_proxy_headers` is set; without a proxy in front they are
/// client-controlled.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClientIpKeyExtractor {
    pub trust_proxy_headers: bool,
}

impl ClientIpKeyExtractor {
    fn forwarded_ip<T>(req: &Request<T>) -> Option<IpAddr> {
        let headers = req.headers();

        // First hop of X-Forwarded-For is the original client
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<IpAddr>().ok())
            })
    }
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        if let Some(ip) = self
            .trust_proxy_headers
            .then(|| Self::forwarded_ip(req))
            .flatten()
        {
            return Ok(ip);
        }

        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers, which are always accepted by `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter(trust_proxy_headers: bool) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor { trust_proxy_headers })
        .per_second(6)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Create rate limiter for the push API: ~60 requests per minute per IP.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers, which are always accepted by `GovernorConfigBuilder`.
#[must_use]
pub fn api_rate_limiter(trust_proxy_headers: bool) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor { trust_proxy_headers })
        .per_second(1)
        .burst_size(20)
        .finish()
        .expect("rate limiter config with per_second(1) and burst_size(20) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/login");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap_or_default()
    }

    fn peer(mut req: Request<()>) -> Request<()> {
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
        req
    }

    const DIRECT: ClientIpKeyExtractor = ClientIpKeyExtractor {
        trust_proxy_headers: false,
    };
    const BEHIND_PROXY: ClientIpKeyExtractor = ClientIpKeyExtractor {
        trust_proxy_headers: true,
    };

    #[test]
    fn test_direct_ignores_spoofed_headers() {
        for headers in [
            [("x-forwarded-for", "203.0.113.7")],
            [("x-forwarded-for", "198.51.100.9, 10.0.0.1")],
            [("x-real-ip", "198.51.100.2")],
        ] {
            let req = peer(request(&headers));
            assert_eq!(DIRECT.extract(&req).ok(), "127.0.0.1".parse().ok());
        }
    }

    #[test]
    fn test_proxy_uses_forwarded_for_first_hop() {
        let req = peer(request(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1")]));
        assert_eq!(BEHIND_PROXY.extract(&req).ok(), "203.0.113.7".parse().ok());
    }

    #[test]
    fn test_proxy_falls_back_to_real_ip_then_peer() {
        let req = peer(request(&[("x-real-ip", "198.51.100.2")]));
        assert_eq!(BEHIND_PROXY.extract(&req).ok(), "198.51.100.2".parse().ok());

        let req = peer(request(&[("x-forwarded-for", "not-an-ip")]));
        assert_eq!(BEHIND_PROXY.extract(&req).ok(), "127.0.0.1".parse().ok());
    }

    #[test]
    fn test_no_address_is_an_error() {
        assert!(DIRECT.extract(&request(&[])).is_err());
        assert!(BEHIND_PROXY.extract(&request(&[])).is_err());
    }
}
