use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{multipart, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};

/// HTTP client for the backend API (direct reqwest, no SDK).
#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve an endpoint against the configured base URL.
    ///
    /// Absolute URLs pass through untouched; everything else is joined
    /// with exactly one `/` between base and endpoint.
    pub fn build_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        let normalized = if endpoint.starts_with('/') {
            endpoint.to_string()
        } else {
            format!("/{}", endpoint)
        };
        if self.base_url.is_empty() {
            normalized
        } else {
            format!("{}{}", self.base_url.trim_end_matches('/'), normalized)
        }
    }

    /// POST a JSON body and decode a JSON response.
    pub async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http_client
            .post(self.build_url(endpoint))
            .json(body)
            .send()
            .await?;
        decode_json(response).await
    }

    pub async fn get_json<T>(&self, endpoint: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .http_client
            .get(self.build_url(endpoint))
            .send()
            .await?;
        decode_json(response).await
    }

    /// POST a single file as multipart form data.
    pub async fn post_multipart<T>(
        &self,
        endpoint: &str,
        field_name: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = multipart::Form::new().part(field_name.to_string(), part);
        let response = self
            .http_client
            .post(self.build_url(endpoint))
            .multipart(form)
            .send()
            .await?;
        decode_json(response).await
    }

    /// POST a JSON body and return the raw response bytes (binary
    /// endpoints: PDF export). Applies the same error taxonomy as the
    /// JSON calls, plus a per-request timeout.
    pub async fn post_json_bytes<B>(
        &self,
        endpoint: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<Vec<u8>>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .http_client
            .post(self.build_url(endpoint))
            .json(body)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Http {
                status: status.as_u16(),
                detail: extract_detail(&text, status),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// POST a JSON body and hand back the raw response for streaming
    /// consumption. A non-2xx status is converted to [`ApiError::Http`]
    /// here so stream decoding only ever sees an open event stream.
    pub async fn post_json_streaming<B>(&self, endpoint: &str, body: &B) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .http_client
            .post(self.build_url(endpoint))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Http {
                status: status.as_u16(),
                detail: extract_detail(&text, status),
            });
        }
        Ok(response)
    }
}

async fn decode_json<T>(response: Response) -> Result<T>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(ApiError::Http {
            status: status.as_u16(),
            detail: extract_detail(&text, status),
        });
    }

    serde_json::from_str(&text).map_err(|_| ApiError::Decode { detail: text })
}

/// Pull the most specific message out of an error body: a JSON
/// `detail`/`errorMessage`/`message` field, else the raw text, else the
/// bare status line.
fn extract_detail(text: &str, status: StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
        for key in ["detail", "errorMessage", "message"] {
            if let Some(detail) = value.get(key).and_then(|v| v.as_str()) {
                if !detail.is_empty() {
                    return detail.to_string();
                }
            }
        }
    }
    if !text.trim().is_empty() {
        return text.trim().to_string();
    }
    format!(
        "HTTP {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    )
    .trim_end()
    .to_string()
}
