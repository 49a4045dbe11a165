use anyhow::{Context, anyhow};
use std::net::{SocketAddr, ToSocketAddrs};
use url::Url;

/// Validates an upstream endpoint and normalizes it to `scheme://host[:port][/path]`
/// without a trailing slash, so route paths can be appended verbatim.
pub fn sanitize_url(url: &str) -> anyhow::Result<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(anyhow!("URL cannot be empty"));
    }

    if url.contains('\0') || url.contains('\r') || url.contains('\n') {
        return Err(anyhow!("URL contains invalid control characters"));
    }

    let parsed_url = Url::parse(url).map_err(|e| anyhow!("Invalid URL format: {}", e))?;

    match parsed_url.scheme() {
        "http" | "https" => {}
        other => return Err(anyhow!("Unsupported URL scheme: {}", other)),
    }

    if parsed_url.host_str().is_none() {
        return Err(anyhow!("URL has no host"));
    }

    if parsed_url.query().is_some() || parsed_url.fragment().is_some() {
        return Err(anyhow!("URL must not carry a query or fragment"));
    }

    let url_str = parsed_url.to_string();
    Ok(url_str.trim_end_matches('/').to_string())
}

/// Resolves a listen address given either as `host:port` or as a full URL.
pub fn parse_socket_addr(listen: &str) -> anyhow::Result<SocketAddr> {
    if let Ok(addr) = listen.parse::<SocketAddr>() {
        return Ok(addr);
    }

    let url = if listen.starts_with("http://") || listen.starts_with("https://") {
        Url::parse(listen)?
    } else {
        Url::parse(&format!("http://{}", listen))?
    };

    let host = url
        .host_str()
        .ok_or(anyhow!("missing host in listen address"))?;
    let port = url.port_or_known_default().unwrap_or(80);

    (host, port)
        .to_socket_addrs()
        .with_context(|| format!("failed to resolve {}", listen))?
        .next()
        .ok_or(anyhow!("no address found for {}", listen))
}
