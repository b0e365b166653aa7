use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_json::to_string(&self).map_err(|_| fmt::Error)?)
    }
}

#[derive(Debug, PartialEq)]
pub enum ErrorMessage {
    EmptyPassword,
    ExceededMaxPasswordLength(usize),
    InvalidHashFormat,
    HashingError,
    ServerError,
    WrongCredentials,
    EmailExist,
    MatricNumberExist,
    UserNoLongerExist,
    PaymentInProgress,
    AlreadyPaid,
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str())
    }
}

impl ErrorMessage {
    fn to_str(&self) -> String {
        match self {
            ErrorMessage::ServerError => "Server Error. Please try again later".to_string(),
            ErrorMessage::WrongCredentials => "Invalid credentials. Please try again.".to_string(),
            ErrorMessage::EmailExist => "A user with this email already exists".to_string(),
            ErrorMessage::MatricNumberExist => "This matriculation number is already registered".to_string(),
            ErrorMessage::UserNoLongerExist => "User belonging to this session no longer exists".to_string(),
            ErrorMessage::EmptyPassword => "Password cannot be empty".to_string(),
            ErrorMessage::HashingError => "Error while hashing password".to_string(),
            ErrorMessage::InvalidHashFormat => "Invalid password hash format".to_string(),
            ErrorMessage::ExceededMaxPasswordLength(max_length) => format!("Password must not be more than {} characters", max_length),
            ErrorMessage::PaymentInProgress => "A payment is already being processed".to_string(),
            ErrorMessage::AlreadyPaid => "SIWES fee has already been paid".to_string(),
        }
    }
}

/// Failures of the persisted record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("stored value under `{key}` is not valid JSON for its collection: {source}")]
    Corruption {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize collection `{key}`: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Domain errors raised by the portal services.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("collection `{key}` is corrupted")]
    StoreCorruption { key: String },
    #[error("{message}")]
    DuplicateIdentifier { field: &'static str, message: String },
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("backend failure: {0}")]
    Backend(String),
    #[error("hashing failure: {0}")]
    Hashing(String),
}

impl From<StoreError> for PortalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Corruption { key, .. } => PortalError::StoreCorruption { key },
            other => PortalError::Backend(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for PortalError {
    fn from(err: validator::ValidationErrors) -> Self {
        PortalError::Validation(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct HttpError {
    pub message: String,
    pub status: StatusCode,
    pub field: Option<String>,
}

impl HttpError {
    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        HttpError {
            message: message.into(),
            status,
            field: None,
        }
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::BAD_REQUEST)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::UNAUTHORIZED)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::FORBIDDEN)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::NOT_FOUND)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::CONFLICT)
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Maps a `password::hash` failure. Bad input is reported on `field`.
    pub fn from_password_error(err: ErrorMessage, field: &str) -> Self {
        match err {
            ErrorMessage::EmptyPassword | ErrorMessage::ExceededMaxPasswordLength(_) => {
                HttpError::bad_request(err.to_string()).with_field(field)
            }
            other => {
                tracing::error!("Password hashing failed: {}", other);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        }
    }

    pub fn into_http_response(self) -> Response {
        let json_response = Json(ErrorResponse {
            status: "fail".to_string(),
            message: self.message.clone(),
            field: self.field.clone(),
        });

        (self.status, json_response).into_response()
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HttpError: message: {}, status: {}", self.message, self.status)
    }
}

impl std::error::Error for HttpError {}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        self.into_http_response()
    }
}

impl From<PortalError> for HttpError {
    fn from(err: PortalError) -> Self {
        match err {
            PortalError::InvalidCredentials => {
                HttpError::unauthorized(ErrorMessage::WrongCredentials.to_string())
            }
            PortalError::DuplicateIdentifier { field, message } => {
                HttpError::bad_request(message).with_field(field)
            }
            PortalError::Validation(message) => HttpError::bad_request(message),
            PortalError::NotFound(message) => HttpError::not_found(message),
            PortalError::Forbidden(message) => HttpError::forbidden(message),
            PortalError::Conflict(message) => HttpError::conflict(message),
            PortalError::StoreCorruption { key } => {
                tracing::error!("Store corruption surfaced to a request: {}", key);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
            PortalError::Backend(e) | PortalError::Hashing(e) => {
                tracing::error!("Request failed: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        }
    }
}

/// First failing field, alphabetically, with its message.
impl From<validator::ValidationErrors> for HttpError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let first = errors
            .field_errors()
            .into_iter()
            .min_by_key(|(field, _)| *field)
            .and_then(|(field, errs)| errs.first().map(|e| (field, e)));

        match first {
            Some((field, err)) => {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                HttpError::bad_request(message).with_field(field)
            }
            None => HttpError::bad_request(errors.to_string()),
        }
    }
}

impl From<StoreError> for HttpError {
    fn from(err: StoreError) -> Self {
        PortalError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_input_errors_are_field_errors() {
        let err = HttpError::from_password_error(ErrorMessage::ExceededMaxPasswordLength(64), "password");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.field.as_deref(), Some("password"));
        assert_eq!(err.message, "Password must not be more than 64 characters");

        let err = HttpError::from_password_error(ErrorMessage::EmptyPassword, "new_password");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.field.as_deref(), Some("new_password"));

        let err = HttpError::from_password_error(ErrorMessage::HashingError, "password");
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.field, None);
    }
}
