//! Request extractors whose rejections render as [`AppError`].

use crate::errors::AppError;
use axum::extract::FromRequestParts;

/// `Query<T>` whose deserialization failures become JSON `400` responses.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ValidatedQuery<T>(pub T);
