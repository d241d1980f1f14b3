use crate::aggregation::{fetch_full_profile, resolve_company};
use crate::config::Config;
use crate::errors::AppError;
use crate::extractors::ValidatedQuery;
use crate::models::*;
use crate::services::KvkService;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "kvk-proxy",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// GET /debug/kvk
///
/// Confirms environment, URL set and key presence. Never reveals the key.
pub async fn debug_kvk(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let key = state.config.kvk_api_key.as_deref().unwrap_or("").trim();

    Json(json!({
        "KVK_ENV": state.config.kvk_env,
        "KVK_API_KEY_present": !key.is_empty(),
        "KVK_API_KEY_len": key.len(),
        "urls": state.config.urls(),
    }))
}

/// GET /company
///
/// Resolves a company by `kvk_number`, or by `name` (with optional `place` and
/// `street` filters) taking the first search result.
///
/// # Returns
///
/// * `Result<Json<CompanyResponse>, AppError>` - The company envelope or an error.
pub async fn get_company(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(params): ValidatedQuery<CompanyQueryParams>,
) -> Result<Json<CompanyResponse>, AppError> {
    tracing::info!("GET /company - params: {:?}", params);

    let lookup = params.lookup()?;
    let service = KvkService::from_config(&state.config)?;
    let response = resolve_company(&service, lookup, &params).await?;

    Ok(Json(response))
}

/// GET /company/full
///
/// Company profile plus naming history and every branch profile.
pub async fn get_company_full(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(params): ValidatedQuery<FullProfileQueryParams>,
) -> Result<Json<FullProfileResponse>, AppError> {
    tracing::info!("GET /company/full - params: {:?}", params);

    let kvk_number = non_empty(&params.kvk_number)
        .ok_or_else(|| AppError::BadRequest("Provide kvk_number".to_string()))?
        .to_string();

    let defaults = FullProfileOptions::default();
    let options = FullProfileOptions {
        geo_data: params.geo_data.unwrap_or(defaults.geo_data),
        include_subresources: params
            .include_subresources
            .unwrap_or(defaults.include_subresources),
        include_naamgeving: params
            .include_naamgeving
            .unwrap_or(defaults.include_naamgeving),
        include_vestigingsprofielen: params
            .include_vestigingsprofielen
            .unwrap_or(defaults.include_vestigingsprofielen),
    };

    let service = KvkService::from_config(&state.config)?;
    let profile = fetch_full_profile(&service, &kvk_number, options).await?;

    Ok(Json(FullProfileResponse {
        input: CompanyInput::Number { kvk_number },
        profile,
    }))
}

/// GET /vestiging/:vestigingsnummer
///
/// Single branch profile; `vestigingsprofiel` is null when KVK reports it absent.
pub async fn get_vestiging(
    State(state): State<Arc<AppState>>,
    Path(vestigingsnummer): Path<String>,
) -> Result<Json<VestigingResponse>, AppError> {
    tracing::info!("GET /vestiging/{}", vestigingsnummer);

    let vestigingsnummer = vestigingsnummer.trim().to_string();
    if vestigingsnummer.is_empty() {
        return Err(AppError::BadRequest("Provide vestigingsnummer".to_string()));
    }

    let service = KvkService::from_config(&state.config)?;
    let vestigingsprofiel = service.fetch_vestigingsprofiel(&vestigingsnummer).await?;

    Ok(Json(VestigingResponse {
        vestigingsnummer,
        vestigingsprofiel,
    }))
}
