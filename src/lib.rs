//! KVK Company Lookup API Library
//!
//! A thin aggregation proxy in front of the KVK business-registry API. It
//! resolves companies by KVK number or name search, fans out to related
//! sub-resources and merges the results into a single JSON response.
//!
//! # Modules
//!
//! - `aggregation`: Company resolution, branch identifier extraction and full-profile fan-out.
//! - `app`: Router construction.
//! - `config`: Configuration management and upstream URL resolution.
//! - `errors`: Error handling types.
//! - `extractors`: Request extractors with JSON rejections.
//! - `handlers`: HTTP request handlers.
//! - `kvk_client`: KVK API client.
//! - `models`: Query, result and response types.
//! - `services`: Single-endpoint KVK operations.

pub mod aggregation;
pub mod app;
pub mod config;
pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod kvk_client;
pub mod models;
pub mod services;
