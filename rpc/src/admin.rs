//! Admin actions. The caller names the acting address; it must equal the
//! contract's admin.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chainvote_contract::TxReceipt;
use chainvote_types::{CandidateId, VoterAddress};
use chainvote_workflow::{DecisionOutcome, OutcomeKind, VotingToggle};
use serde::{Deserialize, Serialize};

use crate::error::RpcError;
use crate::params;
use crate::server::ApiState;

type ApiResult<T> = Result<Json<T>, RpcError>;

const ADMIN_REQUIRED: &str = "Admin address is required";

#[derive(Debug, Default, Deserialize)]
pub struct AdminRequest {
    pub admin: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DecisionRequest {
    pub admin: Option<String>,
    #[serde(default)]
    pub addresses: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    pub outcomes: Vec<DecisionOutcome>,
    pub succeeded: usize,
    pub failed: usize,
}

impl DecisionResponse {
    fn new(outcomes: Vec<DecisionOutcome>) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        Self {
            failed: outcomes.len() - succeeded,
            succeeded,
            outcomes,
        }
    }

    fn count(&self, kind: OutcomeKind) -> u64 {
        self.outcomes.iter().filter(|o| o.outcome == kind).count() as u64
    }
}

fn decision_targets(req: DecisionRequest) -> Result<(VoterAddress, Vec<VoterAddress>), RpcError> {
    let actor = params::address(req.admin, ADMIN_REQUIRED)?;
    if req.addresses.is_empty() {
        return Err(RpcError::BadRequest("No voter addresses selected".into()));
    }
    let addresses = req
        .addresses
        .iter()
        .map(|a| VoterAddress::parse(a))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((actor, addresses))
}

pub async fn approve(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<DecisionRequest>, JsonRejection>,
) -> ApiResult<DecisionResponse> {
    let (actor, addresses) = decision_targets(params::body(payload)?)?;
    let response = DecisionResponse::new(state.admin.approve(&actor, &addresses).await?);
    state.metrics.approvals.inc_by(response.count(OutcomeKind::Approved));
    Ok(Json(response))
}

pub async fn reject(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<DecisionRequest>, JsonRejection>,
) -> ApiResult<DecisionResponse> {
    let (actor, addresses) = decision_targets(params::body(payload)?)?;
    let response = DecisionResponse::new(state.admin.reject(&actor, &addresses).await?);
    state.metrics.rejections.inc_by(response.count(OutcomeKind::Rejected));
    Ok(Json(response))
}

pub async fn start_voting(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<AdminRequest>, JsonRejection>,
) -> ApiResult<VotingToggle> {
    let actor = params::address(params::body(payload)?.admin, ADMIN_REQUIRED)?;
    Ok(Json(state.desk.start(&actor).await?))
}

pub async fn end_voting(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<AdminRequest>, JsonRejection>,
) -> ApiResult<VotingToggle> {
    let actor = params::address(params::body(payload)?.admin, ADMIN_REQUIRED)?;
    Ok(Json(state.desk.end(&actor).await?))
}

pub async fn toggle_voting(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<AdminRequest>, JsonRejection>,
) -> ApiResult<VotingToggle> {
    let actor = params::address(params::body(payload)?.admin, ADMIN_REQUIRED)?;
    Ok(Json(state.desk.toggle(&actor).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct AddCandidateRequest {
    pub admin: Option<String>,
    pub name: Option<String>,
}

pub async fn add_candidate(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<AddCandidateRequest>, JsonRejection>,
) -> ApiResult<TxReceipt> {
    let req = params::body(payload)?;
    let actor = params::address(req.admin, ADMIN_REQUIRED)?;
    let name = params::required(req.name, "Candidate name is required")?;
    Ok(Json(state.desk.add_candidate(&actor, &name).await?))
}

#[derive(Debug, Serialize)]
pub struct HiddenCandidates {
    pub hidden: Vec<CandidateId>,
}

pub async fn hidden_candidates(State(state): State<Arc<ApiState>>) -> ApiResult<HiddenCandidates> {
    Ok(Json(HiddenCandidates {
        hidden: state.ballot.hidden()?.into_iter().collect(),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateVisibilityRequest {
    pub admin: Option<String>,
    pub candidate_id: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateVisibility {
    pub candidate_id: CandidateId,
    pub hidden: bool,
    /// False when the candidate was already in the requested state.
    pub changed: bool,
}

fn visibility_target(
    req: CandidateVisibilityRequest,
) -> Result<(VoterAddress, CandidateId), RpcError> {
    let actor = params::address(req.admin, ADMIN_REQUIRED)?;
    let id = req
        .candidate_id
        .map(CandidateId::new)
        .ok_or_else(|| RpcError::BadRequest("Candidate id is required".into()))?;
    Ok((actor, id))
}

pub async fn hide_candidate(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<CandidateVisibilityRequest>, JsonRejection>,
) -> ApiResult<CandidateVisibility> {
    let (actor, candidate_id) = visibility_target(params::body(payload)?)?;
    let changed = state.ballot.hide(&actor, candidate_id).await?;
    Ok(Json(CandidateVisibility {
        candidate_id,
        hidden: true,
        changed,
    }))
}

pub async fn unhide_candidate(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<CandidateVisibilityRequest>, JsonRejection>,
) -> ApiResult<CandidateVisibility> {
    let (actor, candidate_id) = visibility_target(params::body(payload)?)?;
    let changed = state.ballot.unhide(&actor, candidate_id).await?;
    Ok(Json(CandidateVisibility {
        candidate_id,
        hidden: false,
        changed,
    }))
}
