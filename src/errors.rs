use serde::{Deserialize, Serialize};

use crate::models::checkout_form::FormErrors;

/// Message shown when a second payment initiation races the first one.
pub const PAYMENT_IN_PROGRESS_MESSAGE: &str =
    "A payment is already being processed. Please wait for it to finish.";

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorResponse {
    /// Best human-readable text carried by the body, if any.
    pub fn into_message(self) -> Option<String> {
        self.error
            .filter(|s| !s.trim().is_empty())
            .or(self.message.filter(|s| !s.trim().is_empty()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Checkout form is invalid: {0}")]
    InvalidForm(FormErrors),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Payment already in progress")]
    PaymentInProgress,

    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    #[error("Order error: {0}")]
    OrderError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Ordering disabled: {0}")]
    OrderingDisabled(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("External API error (HTTP {status}): {message}")]
    ExternalApiError { status: u16, message: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Repository error: {0}")]
    RepositoryError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::SerializationError(err.to_string())
        } else {
            ServiceError::ExternalServiceError(err.to_string())
        }
    }
}

impl ServiceError {
    /// Builds an error from a non-2xx response status and body text.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(ErrorResponse::into_message)
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    format!("Request failed with status {}", status)
                } else {
                    trimmed.to_string()
                }
            });
        ServiceError::ExternalApiError { status, message }
    }

    /// Transport failures and 5xx responses. A retry of the same call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ExternalServiceError(_) => true,
            Self::ExternalApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns the text that should be shown to the user.
    /// Server-side order and payment messages are passed through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            Self::ValidationError(msg) | Self::InvalidInput(msg) => msg.clone(),
            Self::InvalidForm(errors) => errors.to_string(),
            Self::PaymentInProgress => PAYMENT_IN_PROGRESS_MESSAGE.to_string(),
            Self::PaymentFailed(msg)
            | Self::OrderError(msg)
            | Self::Conflict(msg)
            | Self::OrderingDisabled(msg)
            | Self::NotFound(msg) => msg.clone(),
            Self::ExternalApiError { message, .. } => message.clone(),
            Self::ExternalServiceError(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            Self::SerializationError(_) => {
                "The server sent an unexpected response. Please try again.".to_string()
            }
            Self::RepositoryError(_) => "Something went wrong. Please try again.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_status_prefers_error_field() {
        let err = ServiceError::from_status(400, r#"{"error":"Insufficient funds","message":"x"}"#);
        match err {
            ServiceError::ExternalApiError { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Insufficient funds");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn from_status_falls_back_to_raw_body() {
        let err = ServiceError::from_status(502, "Bad Gateway");
        assert_eq!(err.user_message(), "Bad Gateway");
        assert!(err.is_transient());
    }

    #[test]
    fn from_status_with_empty_body() {
        let err = ServiceError::from_status(404, "  ");
        assert_eq!(err.user_message(), "Request failed with status 404");
        assert!(!err.is_transient());
    }

    #[test]
    fn in_progress_message_is_distinct_from_network_errors() {
        let busy = ServiceError::PaymentInProgress.user_message();
        let network = ServiceError::ExternalServiceError("connection refused".into()).user_message();
        assert_eq!(busy, PAYMENT_IN_PROGRESS_MESSAGE);
        assert_ne!(busy, network);
    }

    #[test]
    fn order_errors_are_verbatim() {
        let err = ServiceError::OrderError("Product p1 is out of stock".into());
        assert_eq!(err.user_message(), "Product p1 is out of stock");
    }
}
