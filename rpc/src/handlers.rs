//! Registration, identity check, capture and OTP handlers.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chainvote_store::{RegistrationSubmission, VoterRegistration};
use chainvote_types::RegistrationStatus;
use chainvote_verification::{
    capture, format_phone_e164, BiometricKind, BiometricOutcome, FingerprintMode, IssuedOtp,
};
use chainvote_workflow::{ensure_admin, VerificationData, WorkflowError};
use serde::{Deserialize, Serialize};

use crate::error::RpcError;
use crate::params::{self, AddressQuery};
use crate::server::ApiState;

type ApiResult<T> = Result<Json<T>, RpcError>;

// ── Voter requests ──────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListVotersQuery {
    pub status: Option<String>,
}

pub async fn list_voters(
    State(state): State<Arc<ApiState>>,
    q: Result<Query<ListVotersQuery>, QueryRejection>,
) -> ApiResult<Vec<VoterRegistration>> {
    let q = params::query(q)?;
    let filter = match q.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(
            s.parse::<RegistrationStatus>()
                .map_err(|_| RpcError::BadRequest("Invalid status value".into()))?,
        ),
    };
    Ok(Json(state.registry.list(filter)?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVoterRequest {
    pub address: Option<String>,
    pub face_data: Option<String>,
    pub fingerprint_data: Option<String>,
    #[serde(alias = "aadharNumber")]
    pub national_id: Option<String>,
    pub phone_number: Option<String>,
}

pub async fn submit_voter(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<SubmitVoterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<VoterRegistration>), RpcError> {
    let req = params::body(payload)?;
    let missing = "Missing required fields";
    let submission = RegistrationSubmission {
        address: params::address(req.address, missing)?,
        face_data: params::required(req.face_data, missing)?,
        fingerprint_data: params::required(req.fingerprint_data, missing)?,
        national_id: params::required(req.national_id, missing)?,
        phone_number: params::required(req.phone_number, missing)?,
    };

    match state.registry.submit(submission) {
        Ok(record) => {
            state.metrics.registrations_submitted.inc();
            Ok((StatusCode::CREATED, Json(record)))
        }
        Err(e @ WorkflowError::Conflict(_)) => {
            state.metrics.registration_conflicts.inc();
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SetStatusRequest {
    pub admin: Option<String>,
    pub address: Option<String>,
    pub status: Option<String>,
}

/// Admin status change for one request. Approval registers the voter on
/// chain, like a batch approval; other moves must follow the lifecycle.
pub async fn set_voter_status(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<SetStatusRequest>, JsonRejection>,
) -> ApiResult<VoterRegistration> {
    let req = params::body(payload)?;
    let missing = "Address and status parameters are required";
    let address = params::address(req.address, missing)?;
    let status = params::required(req.status, missing)?
        .parse::<RegistrationStatus>()
        .map_err(|_| RpcError::BadRequest("Invalid status value".into()))?;
    let actor = params::address(req.admin, "Admin parameter is required")?;

    match state.admin.set_status(&actor, &address, status).await {
        Ok(record) => Ok(Json(record)),
        Err(WorkflowError::NotFound(_)) => {
            Err(RpcError::NotFound("Voter request not found".into()))
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoveVoterQuery {
    pub address: Option<String>,
    pub admin: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RemoveVoterResponse {
    pub success: bool,
    pub registration: VoterRegistration,
}

/// Soft removal: the request is kept and marked rejected. Approved voters
/// are refused.
pub async fn remove_voter(
    State(state): State<Arc<ApiState>>,
    q: Result<Query<RemoveVoterQuery>, QueryRejection>,
) -> ApiResult<RemoveVoterResponse> {
    let q = params::query(q)?;
    let address = params::address(q.address, "Address parameter is required")?;
    let actor = params::address(q.admin, "Admin parameter is required")?;
    ensure_admin(state.contract.as_ref(), &actor).await?;

    match state.registry.remove(&address) {
        Ok(registration) => {
            state.metrics.rejections.inc();
            Ok(Json(RemoveVoterResponse {
                success: true,
                registration,
            }))
        }
        Err(WorkflowError::NotFound(_)) => {
            Err(RpcError::NotFound("Voter request not found".into()))
        }
        Err(e) => Err(e.into()),
    }
}

// ── Identity check ──────────────────────────────────────────────────────

pub async fn verification_data(
    State(state): State<Arc<ApiState>>,
    q: Result<Query<AddressQuery>, QueryRejection>,
) -> ApiResult<VerificationData> {
    let q = params::query(q)?;
    let address = params::address(q.address, "Wallet address is required")?;
    match state.registry.verification_data(&address) {
        Ok(data) => Ok(Json(data)),
        Err(WorkflowError::NotFound(_)) => Err(RpcError::NotFound(
            "Voter verification data not found".into(),
        )),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyVoterRequest {
    pub address: Option<String>,
    pub kind: Option<BiometricKind>,
    pub data: Option<String>,
}

pub async fn verify_voter(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<VerifyVoterRequest>, JsonRejection>,
) -> ApiResult<BiometricOutcome> {
    let req = params::body(payload)?;
    let address = params::address(req.address, "Wallet address is required")?;
    let kind = req
        .kind
        .ok_or_else(|| RpcError::BadRequest("Verification kind is required".into()))?;
    let presented = params::required(req.data, "Captured data is required")?;
    Ok(Json(state.identity.verify(&address, kind, &presented)?))
}

// ── Capture ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResponse {
    pub kind: BiometricKind,
    pub data: String,
    /// Always true: captures are digests, not biometric templates.
    pub simulated: bool,
    /// The fixed demo value was returned instead of a capture.
    pub demo: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureFaceRequest {
    /// Encoded camera frame, hex.
    pub frame_hex: Option<String>,
}

pub async fn capture_face(
    State(state): State<Arc<ApiState>>,
    payload: Option<Json<CaptureFaceRequest>>,
) -> ApiResult<CaptureResponse> {
    let frame = payload.and_then(|Json(req)| req.frame_hex);
    let (data, demo) = match frame {
        Some(hex_frame) if !state.capture.face_demo_mode => {
            let bytes = hex::decode(hex_frame.trim().trim_start_matches("0x"))
                .map_err(|e| RpcError::BadRequest(format!("frame is not valid hex: {e}")))?;
            (capture::face_from_frame(&bytes)?, false)
        }
        _ => (capture::DEMO_FACE_DATA.to_string(), true),
    };
    Ok(Json(CaptureResponse {
        kind: BiometricKind::Face,
        data,
        simulated: true,
        demo,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct CaptureFingerprintRequest {
    pub mode: Option<FingerprintMode>,
}

pub async fn capture_fingerprint(
    State(state): State<Arc<ApiState>>,
    payload: Option<Json<CaptureFingerprintRequest>>,
) -> ApiResult<CaptureResponse> {
    let mode = payload
        .and_then(|Json(req)| req.mode)
        .unwrap_or(state.capture.fingerprint_mode);
    let data = capture::capture_fingerprint(mode, state.random.as_ref());
    Ok(Json(CaptureResponse {
        kind: BiometricKind::Fingerprint,
        data,
        simulated: true,
        demo: false,
    }))
}

// ── OTP ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueOtpRequest {
    pub address: Option<String>,
    /// Optional; must match the number on the address's registration.
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueOtpResponse {
    #[serde(flatten)]
    pub issued: IssuedOtp,
    pub demo: bool,
}

pub async fn issue_otp(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<IssueOtpRequest>, JsonRejection>,
) -> ApiResult<IssueOtpResponse> {
    let req = params::body(payload)?;
    let address = params::address(req.address, "Wallet address is required")?;
    let phone = state
        .registry
        .get(&address)?
        .map(|r| r.phone_number)
        .ok_or_else(|| RpcError::NotFound("No phone number on file for this address".into()))?;
    if let Some(claimed) = req.phone_number.filter(|p| !p.trim().is_empty()) {
        if format_phone_e164(&claimed) != format_phone_e164(&phone) {
            return Err(RpcError::BadRequest(
                "Phone number does not match the registration".into(),
            ));
        }
    }

    let issued = state.otp.issue(&address, &phone)?;
    Ok(Json(IssueOtpResponse {
        issued,
        demo: state.otp.demo_mode(),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyOtpRequest {
    pub address: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyOtpResponse {
    pub verified: bool,
}

pub async fn verify_otp(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> ApiResult<VerifyOtpResponse> {
    let req = params::body(payload)?;
    let address = params::address(req.address, "Wallet address is required")?;
    let code = params::required(req.code, "Verification code is required")?;
    state.otp.verify(&address, &code)?;
    Ok(Json(VerifyOtpResponse { verified: true }))
}
