use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{Extensions, HeaderMap, Request};

/// Bucket used when no peer address is known.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Client address for rate limiting and request context.
///
/// With `trust_proxy` the first `X-Forwarded-For` hop wins; otherwise the
/// peer address recorded by `into_make_service_with_connect_info`.
pub fn client_ip<B>(req: &Request<B>, trust_proxy: bool) -> String {
    resolve(req.headers(), req.extensions(), trust_proxy)
}

/// [`client_ip`] over already-split request parts.
pub fn resolve(headers: &HeaderMap, extensions: &Extensions, trust_proxy: bool) -> String {
    if trust_proxy && let Some(ip) = forwarded_for(headers) {
        return ip;
    }
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| UNKNOWN_CLIENT.to_owned(), |ci| ci.0.ip().to_string())
}

/// First hop of `X-Forwarded-For`.
pub fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}
