//! JSON extractor that runs `validator` rules before a use case runs.
//!
//! Malformed bodies and failed rules both surface as a 400
//! `VALIDATION_ERROR`, so the auth endpoints reject bad input at the
//! edge. The domain value objects still apply their own policy behind
//! it; this layer only keeps garbage out of the use cases.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::errors::AppError;

/// JSON body that passed its `validator` rules.
///
/// ```rust,ignore
/// pub async fn register(
///     State(state): State<AppState>,
///     ValidatedJson(payload): ValidatedJson<RegisterRequest>,
/// ) -> AppResult<(StatusCode, Json<MessageResponse>)> {
///     // payload.email / payload.password already passed the
///     // request-level rules here
///     state.auth_service.register(payload.email, payload.password).await?;
///     ...
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let payload = match Json::<T>::from_request(req, state).await {
            Ok(Json(payload)) => payload,
            Err(rejection) => return Err(AppError::validation(rejection.body_text())),
        };

        match payload.validate() {
            Ok(()) => Ok(ValidatedJson(payload)),
            Err(errors) => Err(AppError::validation(flatten_errors(&errors))),
        }
    }
}

/// Collapse validator's error tree into one "field: message" entry per
/// failed rule, sorted so the output is deterministic.
fn flatten_errors(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, field_errors)| {
            field_errors.iter().map(move |error| match &error.message {
                Some(message) => format!("{}: {}", field, message),
                None => format!("{}: failed rule '{}'", field, error.code),
            })
        })
        .collect();

    messages.sort();
    messages.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct SampleRequest {
        #[validate(email(message = "Invalid email format"))]
        email: String,
        #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
        password: String,
    }

    #[test]
    fn test_flatten_errors_prefixes_fields() {
        let sample = SampleRequest {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
        };

        let message = flatten_errors(&sample.validate().unwrap_err());
        assert_eq!(
            message,
            "email: Invalid email format; password: Password must be at least 8 characters"
        );
    }

    #[test]
    fn test_flatten_errors_passes_valid_input() {
        let sample = SampleRequest {
            email: "alice@example.com".to_string(),
            password: "LongEnough1".to_string(),
        };
        assert!(sample.validate().is_ok());
    }
}
