use crate::config::{Config, KvkUrls};
use crate::errors::AppError;
use crate::kvk_client::KvkClient;
use crate::models::{is_valid_identifier, ProfileBundle, SearchQuery};
use serde_json::Value;

/// Appends path segments to an endpoint root, percent-encoding each one.
///
/// `/` inside a segment is encoded, so an identifier can never step into a
/// sibling endpoint.
pub fn endpoint_url(root: &str, segments: &[&str]) -> Result<String, AppError> {
    let mut url = url::Url::parse(root)
        .map_err(|e| AppError::Configuration(format!("Invalid KVK URL {}: {}", root, e)))?;
    url.path_segments_mut()
        .map_err(|_| AppError::Configuration(format!("KVK URL {} cannot carry a path", root)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.to_string())
}

fn check_identifier<'a>(field: &str, value: &'a str) -> Result<&'a str, AppError> {
    if is_valid_identifier(value) {
        Ok(value)
    } else {
        Err(AppError::BadRequest(format!(
            "Invalid {}: only letters and digits are allowed",
            field
        )))
    }
}

/// Request-scoped access to the KVK endpoints.
pub struct KvkService {
    client: KvkClient,
    urls: KvkUrls,
}

impl KvkService {
    pub fn new(client: KvkClient, urls: KvkUrls) -> Self {
        Self { client, urls }
    }

    /// Builds a service for one request; fails when the API key is missing.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Ok(Self::new(KvkClient::from_config(config)?, config.urls()))
    }

    /// Search companies by name, optionally filtered by place and street.
    ///
    /// Returns the raw search response; picking a result is up to the caller.
    pub async fn search_by_name(&self, query: &SearchQuery) -> Result<Value, AppError> {
        tracing::info!(
            "Searching KVK for name='{}' place={:?} street={:?}",
            query.name,
            query.place,
            query.street
        );
        self.client
            .get_json(&self.urls.zoeken, &query.to_params())
            .await
    }

    /// Fetch the basisprofiel and, optionally, its sub-resources.
    ///
    /// The primary profile is fetched first and any failure there is fatal.
    /// The three sub-resources are then fetched concurrently; each outcome is
    /// captured independently. `eigenaar` is fetched but not returned.
    pub async fn fetch_basisprofiel(
        &self,
        kvk_number: &str,
        geo_data: bool,
        include_subresources: bool,
    ) -> Result<ProfileBundle, AppError> {
        let kvk_number = check_identifier("kvk_number", kvk_number)?;
        let base_url = endpoint_url(&self.urls.basisprofielen, &[kvk_number])?;
        let params = [("geoData", geo_data.to_string())];

        tracing::info!("Fetching basisprofiel for KVK number {}", kvk_number);
        let basisprofiel = self.client.get_json(&base_url, &params).await?;

        if !include_subresources {
            return Ok(ProfileBundle {
                basisprofiel,
                hoofdvestiging: None,
                vestigingen: None,
            });
        }

        let eigenaar_url = endpoint_url(&base_url, &["eigenaar"])?;
        let hoofdvestiging_url = endpoint_url(&base_url, &["hoofdvestiging"])?;
        let vestigingen_url = endpoint_url(&base_url, &["vestigingen"])?;

        let (eigenaar, hoofdvestiging, vestigingen) = tokio::join!(
            self.client.get_captured(&eigenaar_url, &params),
            self.client.get_captured(&hoofdvestiging_url, &params),
            self.client.get_captured(&vestigingen_url, &params),
        );

        tracing::debug!(
            "Sub-resources for {}: eigenaar={} hoofdvestiging={} vestigingen={}",
            kvk_number,
            eigenaar.state(),
            hoofdvestiging.state(),
            vestigingen.state()
        );

        Ok(ProfileBundle {
            basisprofiel,
            hoofdvestiging: Some(hoofdvestiging),
            vestigingen: Some(vestigingen),
        })
    }

    /// Naming history for a KVK number; `None` when upstream reports 404.
    pub async fn fetch_naamgeving(&self, kvk_number: &str) -> Result<Option<Value>, AppError> {
        let kvk_number = check_identifier("kvk_number", kvk_number)?;
        let url = endpoint_url(&self.urls.naamgevingen, &["kvknummer", kvk_number])?;
        tracing::info!("Fetching naamgeving for KVK number {}", kvk_number);
        self.client.get_optional(&url, &[]).await
    }

    /// Branch profile for a vestigingsnummer; `None` when upstream reports 404.
    pub async fn fetch_vestigingsprofiel(
        &self,
        vestigingsnummer: &str,
    ) -> Result<Option<Value>, AppError> {
        let vestigingsnummer = check_identifier("vestigingsnummer", vestigingsnummer)?;
        let url = endpoint_url(&self.urls.vestigingsprofielen, &[vestigingsnummer])?;
        tracing::debug!("Fetching vestigingsprofiel {}", vestigingsnummer);
        self.client.get_optional(&url, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_encodes_segments() {
        assert_eq!(
            endpoint_url("https://api.kvk.nl/api/v1/basisprofielen", &["69599068"]).unwrap(),
            "https://api.kvk.nl/api/v1/basisprofielen/69599068"
        );
        assert_eq!(
            endpoint_url("http://127.0.0.1:9999/v1/naamgevingen", &["kvknummer", "1"]).unwrap(),
            "http://127.0.0.1:9999/v1/naamgevingen/kvknummer/1"
        );
        let url = endpoint_url("http://kvk/v1/vestigingsprofielen", &["a/b"]).unwrap();
        assert_eq!(url, "http://kvk/v1/vestigingsprofielen/a%2Fb");
    }

    #[test]
    fn test_identifiers_with_separators_are_rejected() {
        assert!(check_identifier("vestigingsnummer", "000037178598").is_ok());
        for bad in ["", "..", "../naamgevingen/kvknummer/1", "1 2", "1?x=2", "1%2F2"] {
            assert!(matches!(
                check_identifier("vestigingsnummer", bad),
                Err(AppError::BadRequest(_))
            ));
        }
    }
}
