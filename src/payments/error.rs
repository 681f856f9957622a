use crate::payments::session::SessionState;
use thiserror::Error;

pub type PaymentResult<T> = Result<T, PaymentError>;

#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        field: Option<String>,
    },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Provider error: provider={provider}, message={message}")]
    ProviderError {
        provider: String,
        message: String,
        provider_code: Option<String>,
        retryable: bool,
    },

    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition { from: SessionState, to: SessionState },
}

impl PaymentError {
    pub fn validation(message: &str, field: &str) -> Self {
        PaymentError::ValidationError {
            message: message.to_string(),
            field: Some(field.to_string()),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::ValidationError { .. } => false,
            PaymentError::NetworkError { .. } => true,
            PaymentError::ProviderError { retryable, .. } => *retryable,
            PaymentError::InvalidTransition { .. } => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            PaymentError::ValidationError { message, .. } => message.clone(),
            PaymentError::NetworkError { .. } => {
                "Payment gateway is temporarily unavailable".to_string()
            }
            PaymentError::ProviderError { .. } => "Payment gateway returned an error".to_string(),
            PaymentError::InvalidTransition { .. } => {
                "Payment session is not in a state that allows this action".to_string()
            }
        }
    }
}
