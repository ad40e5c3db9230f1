//! Shared HTTP transport for provider adapters.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::Provider;
use crate::config::LlmConfig;
use crate::error::LlmError;

/// A `reqwest` client configured with the request timeout and proxy.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    client: reqwest::Client,
    provider: Provider,
}

impl Transport {
    pub(crate) fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs));

        if let Some(url) = config.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(url).map_err(|source| LlmError::InvalidProxy {
                url: url.to_string(),
                source,
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(LlmError::ClientBuild)?;
        Ok(Self {
            client,
            provider: config.provider,
        })
    }

    /// POST a JSON body and decode the JSON response.
    ///
    /// Non-2xx responses become [`LlmError::Status`] carrying the body text.
    pub(crate) async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &B,
    ) -> Result<Value, LlmError> {
        let provider = self.provider.to_string();
        debug!(%provider, url, "Sending generation request");

        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|source| LlmError::Request {
                provider: provider.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%provider, status = status.as_u16(), "Provider returned an error status");
            return Err(LlmError::Status {
                provider,
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|source| LlmError::InvalidResponse { provider, source })
    }
}

/// Build a header map, skipping entries that are not valid header values.
pub(crate) fn headers(entries: &[(&'static str, String)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in entries {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                map.insert(HeaderName::from_static(name), value);
            }
            Err(_) => warn!(header = name, "Skipping header with invalid characters"),
        }
    }
    map
}

/// Read a string at a JSON pointer; `None` when absent or not a string.
pub(crate) fn string_at(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(Value::as_str).map(str::to_string)
}
