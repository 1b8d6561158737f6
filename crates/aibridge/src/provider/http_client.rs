use std::time::Duration;

use reqwest::{Client, header};

/// Shared reqwest defaults for every vendor client.
///
/// A short pool idle timeout keeps us from pinning stale connections when a
/// vendor rotates DNS records under load; the same default several gateways
/// ship with.
pub(super) fn default_http_client_builder(mut headers: header::HeaderMap) -> reqwest::ClientBuilder {
    headers.insert(header::CONNECTION, header::HeaderValue::from_static("keep-alive"));

    Client::builder()
        .timeout(Duration::from_secs(120))
        .pool_idle_timeout(Some(Duration::from_secs(5)))
        .tcp_nodelay(true)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .default_headers(headers)
}
