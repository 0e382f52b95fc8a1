//! Error types for the interface registry.
//!
//! Every façade operation returns [`RegistryResult`]; nothing in the core
//! panics or surfaces an untyped fault to the caller.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

use crate::model::InterfaceId;
use crate::store::StoreError;

/// Coarse classification of a [`RegistryError`], stable across transports.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    InvalidTransition,
    DuplicateKey,
    Forbidden,
    Timeout,
    StoreUnavailable,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RegistryError {
    /// Malformed or missing input. The caller must fix the request.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Interface not found: {id}")]
    NotFound { id: InterfaceId },

    /// A generic update tried to move the lifecycle state.
    #[error("Invalid transition for interface {id}: {message}")]
    InvalidTransition { id: InterfaceId, message: String },

    #[error("User interface grant not found: {id}")]
    GrantNotFound { id: u64 },

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// A caller tried to use an interface it holds no usable grant for.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Store operation `{operation}` timed out after {}ms", timeout.as_millis())]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl RegistryError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::NotFound { .. } | Self::GrantNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::DuplicateKey(_) => ErrorKind::DuplicateKey,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
        }
    }

    /// Transient failures a caller may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::StoreUnavailable(_))
    }
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => Self::NotFound { id },
            StoreError::DuplicateKey { id } => {
                Self::DuplicateKey(format!("interface id {} already exists", id))
            }
            StoreError::Unavailable(message) => Self::StoreUnavailable(message),
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;
