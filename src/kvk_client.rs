use crate::config::Config;
use crate::errors::AppError;
use crate::models::SubResource;
use serde_json::{json, Value};
use std::time::Duration;

/// Header the KVK API reads the credential from.
const API_KEY_HEADER: &str = "apikey";

/// Client for the KVK registry API.
///
/// One instance is created per incoming request; every upstream call made
/// while serving that request shares its connection pool.
#[derive(Clone)]
pub struct KvkClient {
    client: reqwest::Client,
    api_key: String,
}

impl KvkClient {
    /// Creates a new `KvkClient`.
    ///
    /// # Arguments
    ///
    /// * `api_key` - The KVK API key, sent with every request.
    /// * `timeout` - Per-request timeout.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create KVK client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    /// Creates a client from configuration, failing when the API key is missing.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(config.api_key()?, config.timeout())
    }

    async fn send(&self, url: url::Url) -> Result<reqwest::Response, AppError> {
        tracing::debug!("GET {}", url);

        self.client
            .get(url.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| {
                let err = AppError::from(e);
                tracing::warn!("KVK request to {} failed: {}", url, err);
                err
            })
    }

    /// Strict GET: any status >= 400 becomes `AppError::Upstream`.
    ///
    /// # Returns
    ///
    /// * `Result<Value, AppError>` - The parsed JSON body.
    pub async fn get_json(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Value, AppError> {
        let response = self.send(request_url(url, params)?).await?;
        let status = response.status();
        let request_url = response.url().to_string();

        if status.as_u16() >= 400 {
            let body = error_body(response, &request_url).await;
            tracing::warn!("KVK returned {} for {}", status, request_url);
            return Err(AppError::Upstream {
                status: status.as_u16(),
                url: request_url,
                body,
            });
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                AppError::UpstreamTimeout { url: request_url }
            } else {
                AppError::UpstreamUnavailable(format!(
                    "Failed to parse KVK response from {}: {}",
                    request_url, e
                ))
            }
        })
    }

    /// Like [`get_json`](Self::get_json), but an upstream 404 yields `Ok(None)`.
    pub async fn get_optional(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Option<Value>, AppError> {
        match self.get_json(url, params).await {
            Ok(value) => Ok(Some(value)),
            Err(AppError::Upstream { status: 404, url, .. }) => {
                tracing::debug!("KVK reported {} as absent", url);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// GET whose failures are captured in the result instead of raised.
    pub async fn get_captured(&self, url: &str, params: &[(&str, String)]) -> SubResource {
        match self.get_json(url, params).await {
            Ok(value) => SubResource::Present(value),
            Err(AppError::Upstream { status: 404, .. }) => SubResource::Absent,
            Err(AppError::Upstream { status, url, body }) => SubResource::Error {
                error: body,
                status,
                url,
            },
            Err(e) => SubResource::Error {
                error: json!(e.to_string()),
                status: e.status_code().as_u16(),
                url: request_url(url, params)
                    .map(String::from)
                    .unwrap_or_else(|_| url.to_string()),
            },
        }
    }
}

/// Endpoint URL with its query string, exactly as it is sent upstream.
fn request_url(url: &str, params: &[(&str, String)]) -> Result<url::Url, AppError> {
    let mut target = url::Url::parse(url)
        .map_err(|e| AppError::Internal(format!("Invalid KVK URL {}: {}", url, e)))?;
    if !params.is_empty() {
        target
            .query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
    }
    Ok(target)
}

/// Error body as JSON when possible, else `{"raw": <text>}`.
async fn error_body(response: reqwest::Response, request_url: &str) -> Value {
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Failed to read KVK error body from {}: {}", request_url, e);
            return json!({ "raw": "", "read_error": e.to_string() });
        }
    };
    serde_json::from_str(&text).unwrap_or_else(|_| json!({ "raw": text }))
}
