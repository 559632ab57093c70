//! Rate limiting middleware using token bucket algorithm.

use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::net::IpAddr;
use std::sync::Arc;
use tower_governor::{
    GovernorError, GovernorLayer, governor::GovernorConfigBuilder, key_extractor::KeyExtractor,
};

use crate::utils::client_ip;

/// Keys rate limits by client address.
///
/// Behind a trusted proxy the forwarding headers are honored, the same way
/// [`crate::utils::ClientIp`] resolves addresses.
#[derive(Debug, Clone, Copy)]
pub struct ClientIpKeyExtractor {
    pub behind_proxy: bool,
}

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let ip = client_ip::resolve(req.headers(), req.extensions(), self.behind_proxy);
        if ip.is_unspecified() {
            return Err(GovernorError::UnableToExtractKey);
        }
        Ok(ip)
    }
}

pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Creates a rate limiter for public endpoints.
///
/// # Limits
///
/// - **Rate**: 2 requests per second
/// - **Burst**: 100 requests
///
/// Requests exceeding the limit receive `429 Too Many Requests`.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/health", get(health_handler))
///     .layer(rate_limit::layer(config.behind_proxy));
/// ```
pub fn layer(behind_proxy: bool) -> RateLimiterLayer {
    let governor_conf = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor { behind_proxy })
        .per_second(2)
        .burst_size(100)
        .finish()
        .expect("rate limiter config with per_second(2) and burst_size(100) is valid");

    GovernorLayer::new(Arc::new(governor_conf))
}

/// Creates a stricter rate limiter for login and admin endpoints.
///
/// # Limits
///
/// - **Rate**: 1 request per second
/// - **Burst**: 10 requests
pub fn secure_layer(behind_proxy: bool) -> RateLimiterLayer {
    let governor_conf = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor { behind_proxy })
        .per_second(1)
        .burst_size(10)
        .finish()
        .expect("rate limiter config with per_second(1) and burst_size(10) is valid");

    GovernorLayer::new(Arc::new(governor_conf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ConnectInfo;
    use std::net::SocketAddr;

    #[test]
    fn test_extracts_peer_address() {
        let mut req = Request::new(());
        req.extensions_mut()
            .insert(ConnectInfo("198.51.100.7:4000".parse::<SocketAddr>().unwrap()));

        let key = ClientIpKeyExtractor { behind_proxy: false }.extract(&req).unwrap();
        assert_eq!(key, "198.51.100.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_forwarded_header_behind_proxy() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.1")
            .body(())
            .unwrap();

        let key = ClientIpKeyExtractor { behind_proxy: true }.extract(&req).unwrap();
        assert_eq!(key, "203.0.113.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_unknown_address_rejected() {
        let req = Request::new(());
        assert!(ClientIpKeyExtractor { behind_proxy: false }.extract(&req).is_err());
    }
}
