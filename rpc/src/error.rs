//! HTTP API errors and their status codes.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chainvote_contract::ContractError;
use chainvote_types::TypesError;
use chainvote_verification::VerificationError;
use chainvote_workflow::WorkflowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    /// The contract refused the transaction.
    #[error("{0}")]
    Reverted(String),

    /// The Ethereum node could not be reached or answered garbage.
    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

/// Attached to error responses so middleware can tell contract failures
/// apart without parsing bodies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Client,
    Contract,
    Server,
}

impl RpcError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Reverted(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Reverted(_) | Self::Upstream(_) => ErrorClass::Contract,
            Self::Internal(_) => ErrorClass::Server,
            _ => ErrorClass::Client,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let class = self.class();
        let mut response =
            (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response();
        response.extensions_mut().insert(class);
        response
    }
}

impl From<ContractError> for RpcError {
    fn from(e: ContractError) -> Self {
        match e {
            ContractError::Revert { .. } | ContractError::TransactionFailed(_) => {
                Self::Reverted(e.user_message())
            }
            other => Self::Upstream(other.user_message()),
        }
    }
}

impl From<WorkflowError> for RpcError {
    fn from(e: WorkflowError) -> Self {
        match e {
            WorkflowError::Validation(msg)
            | WorkflowError::VoteRefused(msg)
            | WorkflowError::Otp(msg) => Self::BadRequest(msg),
            e @ WorkflowError::InvalidTransition { .. } => Self::BadRequest(e.to_string()),
            WorkflowError::Conflict(msg) => Self::Conflict(msg),
            WorkflowError::NotFound(what) => Self::NotFound(format!("not found: {what}")),
            e @ WorkflowError::NotAdmin(_) => Self::Forbidden(e.to_string()),
            WorkflowError::Contract(c) => c.into(),
            e @ WorkflowError::Store(_) => Self::Internal(e.to_string()),
        }
    }
}

impl From<VerificationError> for RpcError {
    fn from(e: VerificationError) -> Self {
        WorkflowError::from(e).into()
    }
}

impl From<TypesError> for RpcError {
    fn from(e: TypesError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<JsonRejection> for RpcError {
    fn from(e: JsonRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for RpcError {
    fn from(e: QueryRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}
