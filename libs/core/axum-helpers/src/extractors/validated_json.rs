use crate::errors::ErrorResponse;
use axum::{
    extract::{FromRequest, Json, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

/// `Json<T>` that also runs `T::validate()`.
///
/// Malformed JSON keeps axum's own rejection; validation failures become a
/// 400 `VALIDATION_ERROR` with per-field codes in `details`.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;

        data.validate().map_err(validation_response)?;
        Ok(ValidatedJson(data))
    }
}

fn validation_response(errors: ValidationErrors) -> Response {
    let details = errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let codes: Vec<serde_json::Value> = errs
                .iter()
                .map(|err| serde_json::json!({ "code": err.code, "message": err.message }))
                .collect();
            (field.to_string(), serde_json::Value::Array(codes))
        })
        .collect::<serde_json::Map<_, _>>();

    ErrorResponse::new("VALIDATION_ERROR", "Request validation failed")
        .with_details(serde_json::Value::Object(details))
        .into_response_with(StatusCode::BAD_REQUEST)
}
