//! Uniform response envelope returned to façade callers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ErrorKind, RegistryError, RegistryResult};

/// `{ data, success, errorMessage?, errorKind? }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            success: true,
            error_message: None,
            error_kind: None,
        }
    }

    pub fn error(err: &RegistryError) -> Self {
        Self {
            data: None,
            success: false,
            error_message: Some(err.to_string()),
            error_kind: Some(err.kind()),
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self
                .error_message
                .unwrap_or_else(|| "request failed".to_string())),
        }
    }
}

impl<T> From<RegistryResult<T>> for ApiResponse<T> {
    fn from(result: RegistryResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::error(&err),
        }
    }
}
