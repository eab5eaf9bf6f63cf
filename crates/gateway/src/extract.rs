//! Extractors whose rejections use the shared `{detail, code}` error body

use acadex_common::errors::AppError;
use axum::extract::{FromRequest, FromRequestParts};

/// JSON body extractor rejecting with `AppError`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor rejecting with `AppError`
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
