//! Composite lookups built on top of [`KvkService`]
//!
//! This module provides the multi-step workflows behind the HTTP endpoints:
//! 1. Resolve a company by KVK number, or by name search + first result
//! 2. Extract branch identifiers from a `vestigingen` payload
//! 3. Fan out to naming history and branch profiles for a full profile
use crate::errors::AppError;
use crate::models::{
    is_valid_identifier, non_empty, CompanyInput, CompanyLookup, CompanyQueryParams,
    CompanyResponse, FullProfileBundle, FullProfileOptions, SearchQuery, SearchSelection,
    SubResource,
};
use crate::services::KvkService;
use futures::future::join_all;
use serde_json::Value;
use std::collections::BTreeSet;

/// Key variants a branch item may carry its identifier under.
const VESTIGINGSNUMMER_KEYS: [&str; 2] = ["vestigingsnummer", "vestigingsNummer"];

/// Collects the vestigingsnummers of a `vestigingen` payload.
///
/// Scans the top-level `vestigingen` list and every list inside `_embedded`.
/// Missing or malformed structure yields an empty list. The result is
/// deduplicated and sorted lexicographically.
pub fn extract_vestigingsnummers(payload: &Value) -> Vec<String> {
    let mut found = BTreeSet::new();

    if let Some(items) = payload.get("vestigingen").and_then(Value::as_array) {
        collect_identifiers(items, &mut found);
    }

    if let Some(embedded) = payload.get("_embedded").and_then(Value::as_object) {
        for items in embedded.values().filter_map(Value::as_array) {
            collect_identifiers(items, &mut found);
        }
    }

    found.into_iter().collect()
}

fn collect_identifiers(items: &[Value], found: &mut BTreeSet<String>) {
    for item in items {
        for key in VESTIGINGSNUMMER_KEYS {
            match item.get(key) {
                Some(Value::String(s)) if is_valid_identifier(s.trim()) => {
                    found.insert(s.trim().to_string());
                }
                Some(Value::Number(n)) if n.is_u64() => {
                    found.insert(n.to_string());
                }
                Some(other) => {
                    tracing::warn!("Skipping unusable {} {}", key, other);
                }
                None => {}
            }
        }
    }
}

/// KVK number of a search result, accepting string or numeric encodings.
fn result_kvk_number(result: &Value) -> Option<String> {
    match result.get("kvkNummer") {
        Some(Value::String(s)) if is_valid_identifier(s.trim()) => Some(s.trim().to_string()),
        Some(Value::Number(n)) if n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

/// Resolves a company by KVK number, or by searching on name and taking the first hit.
pub async fn resolve_company(
    service: &KvkService,
    lookup: CompanyLookup<'_>,
    params: &CompanyQueryParams,
) -> Result<CompanyResponse, AppError> {
    let geo_data = params.geo_data.unwrap_or(false);
    let include_subresources = params.include_subresources.unwrap_or(true);

    let name = match lookup {
        CompanyLookup::Name(name) => name,
        CompanyLookup::KvkNumber(kvk_number) => {
            let details = service
                .fetch_basisprofiel(kvk_number, geo_data, include_subresources)
                .await?;
            return Ok(CompanyResponse {
                input: CompanyInput::Number {
                    kvk_number: kvk_number.to_string(),
                },
                search: None,
                details,
            });
        }
    };

    let query = SearchQuery {
        place: non_empty(&params.place).map(str::to_string),
        street: non_empty(&params.street).map(str::to_string),
        include_inactive: params.include_inactive.unwrap_or(false),
        ..SearchQuery::new(name)
    };

    let raw = service.search_by_name(&query).await?;

    let best = raw
        .get("resultaten")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .cloned()
        .ok_or_else(|| AppError::NotFound("No companies found for that name/filter".to_string()))?;

    let found_kvk = result_kvk_number(&best).ok_or_else(|| AppError::ContractViolation {
        message: "Result missing kvkNummer".to_string(),
        result: best.clone(),
    })?;

    tracing::info!("Search for '{}' selected KVK number {}", name, found_kvk);

    let details = service
        .fetch_basisprofiel(&found_kvk, geo_data, include_subresources)
        .await?;

    Ok(CompanyResponse {
        input: CompanyInput::Name {
            name: query.name,
            place: query.place,
            street: query.street,
        },
        search: Some(SearchSelection {
            raw,
            selected_result: best,
        }),
        details,
    })
}

/// Fetches one branch profile per vestigingsnummer, in the given order.
///
/// All calls run to completion before results are inspected; the first
/// non-404 failure is then returned.
pub async fn fetch_vestigingsprofielen(
    service: &KvkService,
    vestigingsnummers: &[String],
) -> Result<Vec<Option<Value>>, AppError> {
    if vestigingsnummers.is_empty() {
        return Ok(Vec::new());
    }

    join_all(
        vestigingsnummers
            .iter()
            .map(|nummer| service.fetch_vestigingsprofiel(nummer)),
    )
    .await
    .into_iter()
    .collect()
}

/// Profile bundle plus naming history and branch profiles.
///
/// The naming history is fetched concurrently with the profile; branch
/// profiles depend on the profile's `vestigingen` and are fetched afterwards.
pub async fn fetch_full_profile(
    service: &KvkService,
    kvk_number: &str,
    options: FullProfileOptions,
) -> Result<FullProfileBundle, AppError> {
    let naamgeving = async {
        if options.include_naamgeving {
            service.fetch_naamgeving(kvk_number).await.map(Some)
        } else {
            Ok(None)
        }
    };

    let (details, naamgeving) = tokio::join!(
        service.fetch_basisprofiel(kvk_number, options.geo_data, options.include_subresources),
        naamgeving,
    );
    let details = details?;
    let naamgeving = naamgeving?;

    let (vestigingsnummers, vestigingsprofielen) = if options.include_vestigingsprofielen {
        let nummers = details
            .vestigingen
            .as_ref()
            .and_then(SubResource::as_present)
            .map(extract_vestigingsnummers)
            .unwrap_or_default();
        tracing::info!(
            "Fetching {} vestigingsprofielen for KVK number {}",
            nummers.len(),
            kvk_number
        );
        let profielen = fetch_vestigingsprofielen(service, &nummers).await?;
        (Some(nummers), Some(profielen))
    } else {
        (None, None)
    };

    Ok(FullProfileBundle {
        details,
        naamgeving,
        vestigingsnummers,
        vestigingsprofielen,
    })
}
