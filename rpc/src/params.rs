//! Request parameter helpers shared by the handlers.
//!
//! Bodies and queries are deserialized with every field optional so that a
//! missing field is answered with a 400 and a readable message instead of the
//! extractor's own rejection.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;
use chainvote_types::VoterAddress;
use serde::Deserialize;

use crate::error::RpcError;

#[derive(Debug, Default, Deserialize)]
pub struct AddressQuery {
    pub address: Option<String>,
}

pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, RpcError> {
    Ok(payload?.0)
}

pub(crate) fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, RpcError> {
    Ok(params?.0)
}

/// A present, non-blank string field.
pub(crate) fn required(value: Option<String>, message: &str) -> Result<String, RpcError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| RpcError::BadRequest(message.to_string()))
}

pub(crate) fn address(value: Option<String>, message: &str) -> Result<VoterAddress, RpcError> {
    Ok(VoterAddress::parse(&required(value, message)?)?)
}
