//! HTTP client for the catalog and host endpoints

use super::types::{HttpMethod, Request, Response};
use crate::config::OutgoingSettings;
use crate::error::{CatalogError, Result};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// HTTP client wrapper with card-search specific configuration
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    default_timeout: Duration,
    user_agent: String,
    extra_headers: HashMap<String, String>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> anyhow::Result<Self> {
        Self::with_settings(&OutgoingSettings::default())
    }

    /// Create a new HTTP client with custom settings
    pub fn with_settings(settings: &OutgoingSettings) -> anyhow::Result<Self> {
        let timeout = settings.timeout();
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(settings.pool_maxsize)
            .gzip(true)
            .brotli(true);

        // SSL verification
        if !settings.verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        // Proxy settings
        if let Some(ref proxy_url) = settings.proxies.all {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        } else {
            if let Some(ref http) = settings.proxies.http {
                builder = builder.proxy(reqwest::Proxy::http(http)?);
            }
            if let Some(ref https) = settings.proxies.https {
                builder = builder.proxy(reqwest::Proxy::https(https)?);
            }
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            default_timeout: timeout,
            user_agent: settings
                .useragent
                .clone()
                .unwrap_or_else(|| format!("card-search/{}", crate::VERSION)),
            extra_headers: settings.extra_headers.clone(),
        })
    }

    /// Execute a request
    pub async fn execute(&self, request: Request) -> Result<Response> {
        self.execute_with_timeout(request, self.default_timeout).await
    }

    async fn execute_with_timeout(
        &self,
        request: Request,
        timeout: Duration,
    ) -> Result<Response> {
        let mut req_builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        req_builder = req_builder
            .timeout(timeout)
            .header("User-Agent", &self.user_agent);

        for (key, value) in &self.extra_headers {
            req_builder = req_builder.header(key, value);
        }

        // Per-request headers win over the configured extras
        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if let Some(ref body) = request.json {
            req_builder = req_builder.json(body);
        }

        debug!("{:?} {}", request.method, request.url);

        let response = req_builder
            .send()
            .await
            .map_err(|e| CatalogError::network(&request.url, e))?;

        Self::parse_response(response).await
    }

    /// Parse response into Response
    async fn parse_response(response: reqwest::Response) -> Result<Response> {
        let status = response.status().as_u16();
        let url = response.url().to_string();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.as_str().to_ascii_lowercase(), v.to_string());
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CatalogError::network(&url, e))?
            .to_vec();

        Ok(Response {
            status,
            headers,
            body,
            url,
        })
    }
}
