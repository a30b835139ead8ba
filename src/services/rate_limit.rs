use axum::http::Request;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tower_governor::{key_extractor::KeyExtractor, GovernorError};

/// Rate-limit key extractor that works both behind a reverse proxy and in
/// bare Docker setups. Proxy headers win over the peer address; requests with
/// no identifiable caller all share the localhost bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIpKeyExtractor;

fn forwarded_ip<T>(req: &Request<T>) -> Option<IpAddr> {
    // First hop in the X-Forwarded-For chain is the client
    let raw = req.headers().get("x-forwarded-for")?.to_str().ok()?;
    raw.split(',').next()?.trim().parse().ok()
}

fn real_ip<T>(req: &Request<T>) -> Option<IpAddr> {
    req.headers()
        .get("x-real-ip")?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn peer_ip<T>(req: &Request<T>) -> Option<IpAddr> {
    req.extensions()
        .get::<axum::extract::ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
}

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Ok(forwarded_ip(req)
            .or_else(|| real_ip(req))
            .or_else(|| peer_ip(req))
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)))
    }
}
