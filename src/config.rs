use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root of the KVK test environment.
pub const KVK_TEST_ROOT: &str = "https://api.kvk.nl/test/api";
/// Root of the KVK production environment.
pub const KVK_PROD_ROOT: &str = "https://api.kvk.nl/api";

/// Default upstream request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Which KVK environment the proxy talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvkEnvironment {
    Test,
    Production,
}

impl KvkEnvironment {
    /// Anything other than `test` (case-insensitive, trimmed) selects production.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("test") {
            KvkEnvironment::Test
        } else {
            KvkEnvironment::Production
        }
    }

    pub fn root(self) -> &'static str {
        match self {
            KvkEnvironment::Test => KVK_TEST_ROOT,
            KvkEnvironment::Production => KVK_PROD_ROOT,
        }
    }
}

/// The four upstream endpoint roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvkUrls {
    pub zoeken: String,
    pub basisprofielen: String,
    pub vestigingsprofielen: String,
    pub naamgevingen: String,
}

impl KvkUrls {
    pub fn from_root(root: &str) -> Self {
        let root = root.trim_end_matches('/');
        Self {
            zoeken: format!("{}/v2/zoeken", root),
            basisprofielen: format!("{}/v1/basisprofielen", root),
            vestigingsprofielen: format!("{}/v1/vestigingsprofielen", root),
            naamgevingen: format!("{}/v1/naamgevingen", root),
        }
    }
}

/// Resolves the upstream URL set for an environment selector value.
pub fn kvk_base_urls(env: &str) -> KvkUrls {
    KvkUrls::from_root(KvkEnvironment::parse(env).root())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Raw `KVK_ENV` value, echoed by the debug endpoint.
    pub kvk_env: String,
    pub kvk_api_key: Option<String>,
    /// Overrides the environment-derived root (staging, mock servers).
    pub kvk_base_url: Option<String>,
    pub kvk_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            kvk_env: std::env::var("KVK_ENV").unwrap_or_else(|_| "prod".to_string()),
            // A missing key is reported per request, not at startup.
            kvk_api_key: std::env::var("KVK_API_KEY")
                .ok()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            kvk_base_url: std::env::var("KVK_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|raw| {
                    let parsed = url::Url::parse(raw.trim())
                        .map_err(|e| anyhow::anyhow!("KVK_BASE_URL is not a valid URL: {}", e))?;
                    if parsed.scheme() != "http" && parsed.scheme() != "https" {
                        anyhow::bail!("KVK_BASE_URL must start with http:// or https://");
                    }
                    Ok(raw.trim().to_string())
                })
                .transpose()?,
            kvk_timeout_secs: std::env::var("KVK_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("KVK_TIMEOUT_SECS must be a positive number"))
                .and_then(|secs| {
                    if secs == 0 {
                        anyhow::bail!("KVK_TIMEOUT_SECS must be greater than zero");
                    }
                    Ok(secs)
                })?,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("KVK environment: {}", config.kvk_env);
        if let Some(ref root) = config.kvk_base_url {
            tracing::info!("KVK base URL override configured: {}", root);
        }
        if config.kvk_api_key.is_none() {
            tracing::warn!("KVK_API_KEY is not set; upstream requests will be rejected");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// Resolved upstream URL set.
    pub fn urls(&self) -> KvkUrls {
        match self.kvk_base_url {
            Some(ref root) => KvkUrls::from_root(root),
            None => kvk_base_urls(&self.kvk_env),
        }
    }

    /// The credential, or a configuration error when it is absent.
    pub fn api_key(&self) -> Result<&str, AppError> {
        self.kvk_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                AppError::Configuration("Missing KVK_API_KEY in environment/.env".to_string())
            })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.kvk_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(env: &str, key: Option<&str>) -> Config {
        Config {
            port: 8000,
            kvk_env: env.to_string(),
            kvk_api_key: key.map(str::to_string),
            kvk_base_url: None,
            kvk_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    #[test]
    fn test_env_selector() {
        assert_eq!(KvkEnvironment::parse("test"), KvkEnvironment::Test);
        assert_eq!(KvkEnvironment::parse("  TeSt \n"), KvkEnvironment::Test);
        assert_eq!(KvkEnvironment::parse("prod"), KvkEnvironment::Production);
        assert_eq!(KvkEnvironment::parse(""), KvkEnvironment::Production);
        assert_eq!(KvkEnvironment::parse("testing"), KvkEnvironment::Production);
    }

    #[test]
    fn test_url_set() {
        let urls = kvk_base_urls("test");
        assert_eq!(urls.zoeken, "https://api.kvk.nl/test/api/v2/zoeken");
        assert_eq!(urls.basisprofielen, "https://api.kvk.nl/test/api/v1/basisprofielen");
        assert_eq!(
            urls.vestigingsprofielen,
            "https://api.kvk.nl/test/api/v1/vestigingsprofielen"
        );
        assert_eq!(urls.naamgevingen, "https://api.kvk.nl/test/api/v1/naamgevingen");

        let urls = kvk_base_urls("production");
        assert_eq!(urls.zoeken, "https://api.kvk.nl/api/v2/zoeken");
        assert_eq!(urls.naamgevingen, "https://api.kvk.nl/api/v1/naamgevingen");
    }

    #[test]
    fn test_base_url_override_wins() {
        let mut cfg = config("test", Some("key"));
        cfg.kvk_base_url = Some("http://127.0.0.1:9999/".to_string());
        assert_eq!(cfg.urls().zoeken, "http://127.0.0.1:9999/v2/zoeken");
    }

    #[test]
    fn test_api_key_missing_is_configuration_error() {
        assert!(matches!(
            config("prod", None).api_key(),
            Err(AppError::Configuration(_))
        ));
        assert!(matches!(
            config("prod", Some("   ")).api_key(),
            Err(AppError::Configuration(_))
        ));
        assert_eq!(config("prod", Some(" abc ")).api_key().unwrap(), "abc");
    }
}
