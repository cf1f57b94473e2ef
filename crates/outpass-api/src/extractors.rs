//! # Request Extractors
//!
//! Extractors whose rejections are [`AppError`]s, so a malformed body, path
//! segment or query string produces the same `{"error": {...}}` envelope as
//! every other failure instead of axum's plain-text rejection.
//!
//! - [`JsonBody`] maps any JSON rejection (syntax, missing field, wrong
//!   content type) to 400 `BAD_REQUEST`.
//! - [`ValidatedJson`] additionally runs [`Validate`] and maps its message
//!   to 422 `VALIDATION_ERROR`.
//! - [`PathParam`] and [`QueryParams`] map unparseable path segments and
//!   query strings to 400 `BAD_REQUEST`.
//!
//! Domain rules (trimmed text, window order) stay in `outpass-state`;
//! [`Validate`] only covers limits on fields the domain never sees, such as
//! operator notes on a scan.

use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Request bodies with checks beyond deserialization.
pub trait Validate {
    /// Returns a human-readable message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// A JSON body; rejections become [`AppError::BadRequest`].
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(reason = %rejection.body_text(), "request body rejected");
                Err(AppError::BadRequest(rejection.body_text()))
            }
        }
    }
}

/// A JSON body that must also pass [`Validate`].
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(value) = JsonBody::<T>::from_request(req, state).await?;
        value.validate().map_err(AppError::Validation)?;
        Ok(Self(value))
    }
}

/// A typed path parameter; rejections become [`AppError::BadRequest`].
#[derive(Debug, Clone)]
pub struct PathParam<T>(pub T);

impl<S, T> FromRequestParts<S> for PathParam<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(reason = %rejection.body_text(), "path rejected");
                Err(AppError::BadRequest(rejection.body_text()))
            }
        }
    }
}

/// A typed query string; rejections become [`AppError::BadRequest`].
#[derive(Debug, Clone)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(reason = %rejection.body_text(), "query string rejected");
                Err(AppError::BadRequest(rejection.body_text()))
            }
        }
    }
}
