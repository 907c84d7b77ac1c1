use axum::extract::{FromRequest, FromRequestParts};
use axum::response::{IntoResponse, Response};
use garde::{Report, Validate};
use http::request::Parts;
use std::fmt::Display;
use std::ops::Deref;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Default)]
pub struct Garde<E>(pub E);

/// Path parameters answering extraction failures with [`ApiError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct PathParam<T>(pub T);

/// JSON request body answering extraction failures with [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

#[derive(Debug)]
pub enum ValidationRejection<V, E> {
    /// Validation rules failed for the extracted value.
    Valid(V),
    /// The inner extractor failed.
    Inner(E),
}

impl<V: Display, E: Into<ApiError>> IntoResponse for ValidationRejection<V, E> {
    fn into_response(self) -> Response {
        let error = match self {
            ValidationRejection::Valid(v) => ApiError::InvalidQuery(v.to_string()),
            ValidationRejection::Inner(e) => e.into(),
        };
        error.into_response()
    }
}

pub type GardeRejection<E> = ValidationRejection<Report, E>;

impl<E> From<Report> for GardeRejection<E> {
    fn from(value: Report) -> Self {
        Self::Valid(value)
    }
}

impl<Extractor, T> FromRequestParts<AppState> for Garde<Extractor>
where
    T: Validate<Context = ()>,
    Extractor: Deref<Target = T> + FromRequestParts<AppState>,
    <Extractor as FromRequestParts<AppState>>::Rejection: Into<ApiError>,
{
    type Rejection = GardeRejection<<Extractor as FromRequestParts<AppState>>::Rejection>;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let inner = Extractor::from_request_parts(parts, state)
            .await
            .map_err(GardeRejection::Inner)?;

        inner.deref().validate()?;
        Ok(Garde(inner))
    }
}
