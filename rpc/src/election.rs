//! Read-side views of the election and vote casting.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use chainvote_contract::TxReceipt;
use chainvote_types::{Candidate, CandidateId, RegistrationStatus, VoterAddress};
use chainvote_workflow::{ElectionInfo, ResultsView, WalletSession};
use serde::{Deserialize, Serialize};

use crate::error::RpcError;
use crate::params::{self, AddressQuery};
use crate::server::ApiState;

type ApiResult<T> = Result<Json<T>, RpcError>;

pub async fn session(
    State(state): State<Arc<ApiState>>,
    q: Result<Query<AddressQuery>, QueryRejection>,
) -> ApiResult<WalletSession> {
    let address = params::address(params::query(q)?.address, "Wallet address is required")?;
    Ok(Json(state.sessions.describe(&address).await?))
}

pub async fn election(State(state): State<Arc<ApiState>>) -> ApiResult<ElectionInfo> {
    Ok(Json(state.ballot.election().await?))
}

pub async fn candidates(State(state): State<Arc<ApiState>>) -> ApiResult<Vec<Candidate>> {
    Ok(Json(state.ballot.candidates().await?))
}

pub async fn results(State(state): State<Arc<ApiState>>) -> ApiResult<ResultsView> {
    Ok(Json(state.ballot.results().await?))
}

/// On-chain flags next to the off-chain request status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterStatusResponse {
    pub address: VoterAddress,
    pub is_registered: bool,
    pub has_voted: bool,
    pub can_vote: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_status: Option<RegistrationStatus>,
    pub otp_required: bool,
}

pub async fn voter_status(
    State(state): State<Arc<ApiState>>,
    q: Result<Query<AddressQuery>, QueryRejection>,
) -> ApiResult<VoterStatusResponse> {
    let address = params::address(params::query(q)?.address, "Wallet address is required")?;
    let on_chain = state.contract.voter(&address).await?;
    let request_status = state.registry.get(&address)?.map(|r| r.status);
    Ok(Json(VoterStatusResponse {
        address,
        is_registered: on_chain.is_registered,
        has_voted: on_chain.has_voted,
        can_vote: on_chain.can_vote(),
        request_status,
        otp_required: state.desk.requires_otp(),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub address: Option<String>,
    pub candidate_id: Option<u64>,
    pub otp_code: Option<String>,
}

pub async fn vote(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> ApiResult<TxReceipt> {
    let req = params::body(payload)?;
    let voter = params::address(req.address, "Wallet address is required")?;
    let candidate = req
        .candidate_id
        .map(CandidateId::new)
        .ok_or_else(|| RpcError::BadRequest("Please select a candidate".into()))?;

    let receipt = state
        .desk
        .cast_vote(&voter, candidate, req.otp_code.as_deref())
        .await?;
    state.metrics.votes_cast.inc();
    Ok(Json(receipt))
}
