//! Client IP extraction from HTTP headers with trust validation
//!
//! Falls back to the socket remote address whenever the configured proxy
//! headers are missing or unparseable.

use axum::http::HeaderMap;
use std::net::IpAddr;
use tracing::warn;

use crate::config::TrustedProxyMode;

/// Extract the client IP address according to the trust configuration.
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: IpAddr,
    mode: TrustedProxyMode,
) -> IpAddr {
    match mode {
        TrustedProxyMode::Cloudflare => extract_cloudflare_ip(headers).unwrap_or_else(|| {
            warn!("CF-Connecting-IP header missing in Cloudflare mode, using socket address");
            socket_addr
        }),
        TrustedProxyMode::Standard => {
            extract_from_x_forwarded_for(headers).unwrap_or(socket_addr)
        }
        TrustedProxyMode::None => socket_addr,
    }
}

/// Extract IP from Cloudflare-specific header
fn extract_cloudflare_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("cf-connecting-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<IpAddr>().ok())
}

/// Parse X-Forwarded-For, taking the leftmost parseable address.
fn extract_from_x_forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    let xff = headers.get("x-forwarded-for")?.to_str().ok()?;

    xff.split(',')
        .map(str::trim)
        .find_map(|part| part.parse::<IpAddr>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn socket() -> IpAddr {
        "203.0.113.9".parse().unwrap()
    }

    #[test]
    fn none_mode_uses_socket() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "198.51.100.1".parse().unwrap());
        let ip = extract_client_ip(&headers, socket(), TrustedProxyMode::None);
        assert_eq!(ip, socket());
    }

    #[test]
    fn standard_mode_reads_x_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "198.51.100.1, 10.0.0.1".parse().unwrap(),
        );
        let ip = extract_client_ip(&headers, socket(), TrustedProxyMode::Standard);
        assert_eq!(ip, "198.51.100.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn standard_mode_skips_garbage_entries() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "not-an-ip, 198.51.100.7".parse().unwrap(),
        );
        let ip = extract_client_ip(&headers, socket(), TrustedProxyMode::Standard);
        assert_eq!(ip, "198.51.100.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn cloudflare_mode_prefers_cf_header() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", "2001:db8::1".parse().unwrap());
        let ip = extract_client_ip(&headers, socket(), TrustedProxyMode::Cloudflare);
        assert_eq!(ip, "2001:db8::1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn cloudflare_mode_falls_back_to_socket() {
        let headers = HeaderMap::new();
        let ip = extract_client_ip(&headers, socket(), TrustedProxyMode::Cloudflare);
        assert_eq!(ip, socket());
    }
}
