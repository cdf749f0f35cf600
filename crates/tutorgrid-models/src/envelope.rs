//! The `{success, message?, data?}` envelope every remote endpoint returns.

use serde::{Deserialize, Serialize};
use tutorgrid_core::{ConsoleError, PaginationMeta};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaginationMeta>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            meta: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            meta: None,
        }
    }

    fn failure_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| "request was not successful".to_string())
    }

    /// Unwrap the payload; a non-success envelope or a missing payload is a
    /// [`ConsoleError::RemoteFailure`].
    pub fn into_data(self) -> Result<T, ConsoleError> {
        if !self.success {
            return Err(ConsoleError::RemoteFailure(self.failure_message()));
        }
        self.data
            .ok_or_else(|| ConsoleError::RemoteFailure("response carried no data".to_string()))
    }
}
