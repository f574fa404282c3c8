//! Body extractors whose rejections use the gateway error shape.

use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// JSON body, or a urlencoded form when the request says so.
pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send + 'static,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        if is_form {
            let Form(v) = Form::<T>::from_request(req, state).await.map_err(|e| AppError::user("invalid_body".to_string(), e.body_text()))?;
            return Ok(Self(v));
        }
        let JsonBody(v) = JsonBody::<T>::from_request(req, state).await?;
        Ok(Self(v))
    }
}

/// `axum::Json` with an `AppError` rejection.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send + 'static,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(v) = Json::<T>::from_request(req, state).await.map_err(|e| AppError::user("invalid_body".to_string(), e.body_text()))?;
        Ok(Self(v))
    }
}
