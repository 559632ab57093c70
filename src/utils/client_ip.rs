//! Client address resolution.

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{HeaderMap, Extensions, request::Parts};
use std::convert::Infallible;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::state::AppState;

/// The requesting client's address.
///
/// Behind a trusted proxy the first `X-Forwarded-For` entry (or `X-Real-IP`)
/// wins; otherwise the socket peer address is used. When neither is known the
/// unspecified address is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(resolve(&parts.headers, &parts.extensions, state.behind_proxy)))
    }
}

/// Resolves the client address from headers and connection info.
///
/// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`), as reported by dual-stack
/// listeners, come back as plain IPv4.
pub fn resolve(headers: &HeaderMap, extensions: &Extensions, behind_proxy: bool) -> IpAddr {
    if behind_proxy && let Some(ip) = forwarded_ip(headers) {
        return ip.to_canonical();
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_canonical())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let from_xff = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok());

    from_xff.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    })
}
