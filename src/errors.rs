use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::JsonResponse;

#[derive(Debug)]
pub enum RequestError {
    Validation(&'static str),
    NotAuthorized(&'static str),
    Forbidden(&'static str),
    NotFound(&'static str),
    ServerError,
    DatabaseError(sqlx::Error),
}

#[derive(serde::Serialize)]
pub struct ErrorBody {
    message: String,
}

impl ErrorBody {
    pub fn new(message: &str) -> ErrorBody {
        ErrorBody {
            message: message.to_string(),
        }
    }
}

impl From<sqlx::Error> for RequestError {
    fn from(value: sqlx::Error) -> Self {
        Self::DatabaseError(value)
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> axum::response::Response {
        self.to_json_response().into_response()
    }
}

impl RequestError {
    pub fn to_json_response(&self) -> JsonResponse<ErrorBody> {
        let (status_code, json) = match self {
            RequestError::Validation(message) => {
                (StatusCode::BAD_REQUEST, ErrorBody::new(message))
            }
            RequestError::NotAuthorized(message) => {
                (StatusCode::UNAUTHORIZED, ErrorBody::new(message))
            }
            RequestError::Forbidden(message) => (StatusCode::FORBIDDEN, ErrorBody::new(message)),
            RequestError::NotFound(message) => (StatusCode::NOT_FOUND, ErrorBody::new(message)),
            RequestError::ServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("Internal Server Error"),
            ),
            RequestError::DatabaseError(e) => {
                // Logged here so handlers can bubble sqlx errors with `?`
                // without leaking internals to the client.
                tracing::error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("Internal Server Error"),
                )
            }
        };
        (status_code, Json(json))
    }
}
