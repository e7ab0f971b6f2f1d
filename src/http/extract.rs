use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    response::Response,
    Json,
};
use serde::de::DeserializeOwned;

use crate::errors::ErrorKind;
use crate::http::error::error_response;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// json body whose parse errors come back in the api error shape
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| error_response(ErrorKind::Validation, e.body_text()))?;
        Ok(ApiJson(value))
    }
}

/// json body that may be left out entirely
///
/// An empty body yields `None`. A body that is present but malformed is
/// rejected like [`ApiJson`] instead of being ignored.
pub struct OptionalJson<T>(pub Option<T>);

#[async_trait]
impl<T, S> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| error_response(ErrorKind::Validation, e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalJson(None));
        }
        let value = serde_json::from_slice(&bytes).map_err(|e| {
            error_response(
                ErrorKind::Validation,
                format!("Failed to deserialize the JSON body: {}", e),
            )
        })?;
        Ok(OptionalJson(Some(value)))
    }
}

/// optional `Idempotency-Key` header
#[derive(Debug, Clone, Default)]
pub struct IdempotencyKey(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for IdempotencyKey
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(IDEMPOTENCY_KEY_HEADER) else {
            return Ok(IdempotencyKey(None));
        };
        let key = value.to_str().map_err(|_| {
            error_response(
                ErrorKind::Validation,
                "Idempotency-Key header must be visible ascii".to_string(),
            )
        })?;
        let key = key.trim();
        Ok(IdempotencyKey((!key.is_empty()).then(|| key.to_string())))
    }
}
