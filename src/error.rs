use rmcp::ErrorData as RpcError;

use serde_json::json;
use thiserror::Error;
use tokio::io;

use crate::storage::StorageError;
use crate::timer::TimerError;

pub type ServiceResult<T> = core::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    FromString(String),
    #[error("{0}")]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Timer(#[from] TimerError),
    #[error("{0}")]
    IoError(#[from] io::Error),
    #[error("{0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("{0}")]
    Dialog(#[from] dialoguer::Error),
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}

impl From<StorageError> for RpcError {
    fn from(err: StorageError) -> Self {
        if err.is_user_error() {
            RpcError::invalid_params(err.to_string(), None)
        } else {
            tracing::error!(error = %err, "storage failure");
            RpcError::internal_error(err.to_string(), Some(json!({ "kind": "storage" })))
        }
    }
}

impl From<TimerError> for RpcError {
    fn from(err: TimerError) -> Self {
        RpcError::invalid_params(err.to_string(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode;

    #[test]
    fn not_found_maps_to_invalid_params() {
        let rpc: RpcError = StorageError::TaskNotFound("x".into()).into();
        assert_eq!(rpc.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn io_maps_to_internal_error() {
        let rpc: RpcError = StorageError::Io(io::Error::other("disk")).into();
        assert_eq!(rpc.code, ErrorCode::INTERNAL_ERROR);
    }
}
