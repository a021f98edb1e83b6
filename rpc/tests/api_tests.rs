//! HTTP API tests against the router with nullable infrastructure.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chainvote_contract::VotingContract;
use chainvote_nullables::{
    NullClock, NullContract, NullHiddenCandidateStore, NullOtpStore, NullRandom,
    NullRegistrationStore,
};
use chainvote_rpc::{router, ApiMetrics, ApiState, CaptureSettings};
use chainvote_types::{ChainId, VoterAddress};
use chainvote_verification::{OtpService, SimulatedBiometricVerifier};
use chainvote_workflow::{
    AdminWorkflow, Ballot, IdentityCheck, VoterRegistry, VotingDesk, WalletSessions,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// ── Harness ─────────────────────────────────────────────────────────────

const ADMIN: &str = "0x1194cd63491865d684a4619b785129230f018730";
const VOTER: &str = "0x00000000000000000000000000000000000000aa";

struct Harness {
    app: Router,
    contract: Arc<NullContract>,
    state: Arc<ApiState>,
}

fn harness_with(require_otp: bool) -> Harness {
    let admin = VoterAddress::parse(ADMIN).unwrap();
    let contract = Arc::new(NullContract::new(admin).with_candidates(&["Alice", "Bob"]));
    let clock = Arc::new(NullClock::new(1_700_000_000));
    let random = Arc::new(NullRandom::always_high());

    let registry = Arc::new(VoterRegistry::new(
        Arc::new(NullRegistrationStore::new()),
        clock.clone(),
    ));
    let otp = Arc::new(OtpService::new(
        Arc::new(NullOtpStore::new()),
        clock,
        random.clone(),
        120,
        true,
    ));
    let hidden = Arc::new(NullHiddenCandidateStore::new());
    let mut desk = VotingDesk::new(contract.clone()).with_hidden_candidates(hidden.clone());
    if require_otp {
        desk = desk.with_otp(otp.clone());
    }
    let verifier = Arc::new(SimulatedBiometricVerifier::new(0.2, random.clone()));

    let state = Arc::new(ApiState {
        admin: AdminWorkflow::new(registry.clone(), contract.clone()),
        ballot: Ballot::new(contract.clone(), hidden),
        desk,
        sessions: WalletSessions::new(contract.clone(), contract.clone(), ChainId::SEPOLIA),
        identity: IdentityCheck::new(registry.clone(), verifier),
        registry,
        otp,
        contract: contract.clone(),
        random,
        capture: CaptureSettings::default(),
        metrics: ApiMetrics::new().unwrap(),
    });
    Harness {
        app: router(state.clone()),
        contract,
        state,
    }
}

fn harness() -> Harness {
    harness_with(false)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

fn registration(address: &str) -> Value {
    json!({
        "address": address,
        "faceData": "0xface",
        "fingerprintData": "0xf1f1",
        "nationalId": "1234 5678 9012",
        "phoneNumber": "98765-43210",
    })
}

// ── Voter requests ──────────────────────────────────────────────────────

#[tokio::test]
async fn submit_returns_created_pending() {
    let h = harness();
    let (status, body) = send(&h.app, Method::POST, "/api/voters", Some(registration(VOTER))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["nationalId"], "123456789012");
    assert_eq!(body["phoneNumber"], "9876543210");
    assert_eq!(h.state.metrics.registrations_submitted.get(), 1);
}

#[tokio::test]
async fn legacy_id_field_name_is_accepted() {
    let h = harness();
    let body = json!({
        "address": VOTER,
        "faceData": "0xface",
        "fingerprintData": "0xf1f1",
        "aadharNumber": "123456789012",
        "phoneNumber": "9876543210",
    });
    let (status, _) = send(&h.app, Method::POST, "/api/voters", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn duplicate_submission_conflicts() {
    let h = harness();
    send(&h.app, Method::POST, "/api/voters", Some(registration(VOTER))).await;
    let upper = VOTER.to_uppercase().replacen("0X", "0x", 1);
    let (status, body) = send(&h.app, Method::POST, "/api/voters", Some(registration(&upper))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already"));
    assert_eq!(h.state.metrics.registration_conflicts.get(), 1);
}

#[tokio::test]
async fn missing_fields_are_bad_request() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        Method::POST,
        "/api/voters",
        Some(json!({ "address": VOTER })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");

    let mut bad_id = registration(VOTER);
    bad_id["nationalId"] = json!("1234");
    let (status, _) = send(&h.app, Method::POST, "/api/voters", Some(bad_id)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_filters_by_status() {
    let h = harness();
    send(&h.app, Method::POST, "/api/voters", Some(registration(VOTER))).await;

    let (_, all) = send(&h.app, Method::GET, "/api/voters", None).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
    let (_, approved) = send(&h.app, Method::GET, "/api/voters?status=approved", None).await;
    assert!(approved.as_array().unwrap().is_empty());
    let (status, _) = send(&h.app, Method::GET, "/api/voters?status=maybe", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_status() {
    let h = harness();
    let (status, _) = send(
        &h.app,
        Method::PATCH,
        "/api/voters",
        Some(json!({ "admin": ADMIN, "address": VOTER, "status": "rejected" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(&h.app, Method::POST, "/api/voters", Some(registration(VOTER))).await;
    let (status, body) = send(
        &h.app,
        Method::PATCH,
        "/api/voters",
        Some(json!({ "admin": ADMIN, "address": VOTER, "status": "bogus" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid status value");

    let (status, body) = send(
        &h.app,
        Method::PATCH,
        "/api/voters",
        Some(json!({ "admin": ADMIN, "address": VOTER, "status": "rejected" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");

    // a decision is final
    let (status, _) = send(
        &h.app,
        Method::PATCH,
        "/api/voters",
        Some(json!({ "admin": ADMIN, "address": VOTER, "status": "pending" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_status_requires_admin() {
    let h = harness();
    send(&h.app, Method::POST, "/api/voters", Some(registration(VOTER))).await;

    let (status, _) = send(
        &h.app,
        Method::PATCH,
        "/api/voters",
        Some(json!({ "address": VOTER, "status": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &h.app,
        Method::PATCH,
        "/api/voters",
        Some(json!({ "admin": VOTER, "address": VOTER, "status": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/api/verify-voter?address={VOTER}");
    let (status, _) = send(&h.app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = send(&h.app, Method::GET, "/api/voters?status=pending", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn patch_approval_registers_on_chain_and_is_final() {
    let h = harness();
    send(&h.app, Method::POST, "/api/voters", Some(registration(VOTER))).await;

    let (status, body) = send(
        &h.app,
        Method::PATCH,
        "/api/voters",
        Some(json!({ "admin": ADMIN, "address": VOTER, "status": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");
    let voter = VoterAddress::parse(VOTER).unwrap();
    assert!(h.contract.voter(&voter).await.unwrap().is_registered);

    let (status, _) = send(
        &h.app,
        Method::PATCH,
        "/api/voters",
        Some(json!({ "admin": ADMIN, "address": VOTER, "status": "pending" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/voters?address={VOTER}&admin={ADMIN}");
    let (status, _) = send(&h.app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, body) = send(&h.app, Method::GET, "/api/voters?status=approved", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

// ── Admin and voting ────────────────────────────────────────────────────

#[tokio::test]
async fn approve_then_vote() {
    let h = harness();
    send(&h.app, Method::POST, "/api/voters", Some(registration(VOTER))).await;

    let (status, body) = send(
        &h.app,
        Method::POST,
        "/api/admin/voters/approve",
        Some(json!({ "admin": ADMIN, "addresses": [VOTER] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["succeeded"], 1);
    assert_eq!(body["outcomes"][0]["outcome"], "approved");
    assert_eq!(h.state.metrics.approvals.get(), 1);

    let (_, verification) = send(
        &h.app,
        Method::GET,
        &format!("/api/verify-voter?address={VOTER}"),
        None,
    )
    .await;
    assert_eq!(verification["faceData"], "0xface");

    let (status, body) = send(
        &h.app,
        Method::POST,
        "/api/admin/voting/toggle",
        Some(json!({ "admin": ADMIN })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["votingActive"], true);

    let (status, _) = send(
        &h.app,
        Method::POST,
        "/api/vote",
        Some(json!({ "address": VOTER, "candidateId": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.state.metrics.votes_cast.get(), 1);

    let (_, status_body) = send(
        &h.app,
        Method::GET,
        &format!("/api/voter-status?address={VOTER}"),
        None,
    )
    .await;
    assert_eq!(status_body["hasVoted"], true);
    assert_eq!(status_body["requestStatus"], "approved");

    let (_, results) = send(&h.app, Method::GET, "/api/results", None).await;
    assert_eq!(results["candidates"][0]["voteCount"], 1);
    assert_eq!(results["totalVotes"], 1);

    let (status, body) = send(
        &h.app,
        Method::POST,
        "/api/vote",
        Some(json!({ "address": VOTER, "candidateId": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You have already voted");
}

#[tokio::test]
async fn non_admin_is_forbidden() {
    let h = harness();
    let (status, _) = send(
        &h.app,
        Method::POST,
        "/api/admin/voting/start",
        Some(json!({ "admin": VOTER })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!h.contract.voting_active().await.unwrap());
}

#[tokio::test]
async fn contract_revert_is_counted() {
    let h = harness();
    h.contract.set_voting_active(true);
    h.contract.preregister(&VoterAddress::parse(VOTER).unwrap());

    let (status, body) = send(
        &h.app,
        Method::POST,
        "/api/vote",
        Some(json!({ "address": VOTER, "candidateId": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid candidate selection");
    assert_eq!(h.state.metrics.contract_errors.get(), 1);
}

#[tokio::test]
async fn hidden_candidates_leave_ballot_not_contract() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        Method::POST,
        "/api/admin/candidates/hide",
        Some(json!({ "admin": ADMIN, "candidateId": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], true);

    let (_, ballot) = send(&h.app, Method::GET, "/api/candidates", None).await;
    assert_eq!(ballot.as_array().unwrap().len(), 1);
    let (_, hidden) = send(&h.app, Method::GET, "/api/admin/candidates/hidden", None).await;
    assert_eq!(hidden["hidden"], json!([1]));
    let (_, election) = send(&h.app, Method::GET, "/api/election", None).await;
    assert_eq!(election["totalCandidates"], 2);
    assert_eq!(election["visibleCandidates"], 1);
}

#[tokio::test]
async fn hidden_candidate_is_not_votable() {
    let h = harness();
    send(&h.app, Method::POST, "/api/voters", Some(registration(VOTER))).await;
    send(
        &h.app,
        Method::POST,
        "/api/admin/voters/approve",
        Some(json!({ "admin": ADMIN, "addresses": [VOTER] })),
    )
    .await;
    send(
        &h.app,
        Method::POST,
        "/api/admin/candidates/hide",
        Some(json!({ "admin": ADMIN, "candidateId": 1 })),
    )
    .await;
    h.contract.set_voting_active(true);

    let (status, _) = send(
        &h.app,
        Method::POST,
        "/api/vote",
        Some(json!({ "address": VOTER, "candidateId": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let voter = VoterAddress::parse(VOTER).unwrap();
    assert!(!h.contract.voter(&voter).await.unwrap().has_voted);

    let (status, _) = send(
        &h.app,
        Method::POST,
        "/api/vote",
        Some(json!({ "address": VOTER, "candidateId": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn add_candidate() {
    let h = harness();
    let (status, _) = send(
        &h.app,
        Method::POST,
        "/api/admin/candidates",
        Some(json!({ "admin": ADMIN, "name": "Carol" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.contract.total_candidates().await.unwrap(), 3);
}

// ── Session, capture, OTP ───────────────────────────────────────────────

#[tokio::test]
async fn session_reports_admin_and_network() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        Method::GET,
        &format!("/api/session?address={ADMIN}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isAdmin"], true);
    assert_eq!(body["isCorrectNetwork"], true);

    let (status, _) = send(&h.app, Method::GET, "/api/session?address=nope", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn captures_are_marked_simulated() {
    let h = harness();
    let (status, face) = send(&h.app, Method::POST, "/api/capture/face", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(face["simulated"], true);
    assert_eq!(face["demo"], true);
    assert_eq!(face["data"].as_str().unwrap().len(), 66);

    let (_, print) = send(
        &h.app,
        Method::POST,
        "/api/capture/fingerprint",
        Some(json!({ "mode": "random" })),
    )
    .await;
    assert_eq!(print["kind"], "fingerprint");
    assert_eq!(print["data"].as_str().unwrap().len(), 66);
}

#[tokio::test]
async fn biometric_check_needs_approved_voter() {
    let h = harness();
    send(&h.app, Method::POST, "/api/voters", Some(registration(VOTER))).await;
    let (status, _) = send(
        &h.app,
        Method::POST,
        "/api/verify-voter",
        Some(json!({ "address": VOTER, "kind": "face", "data": "0xface" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(
        &h.app,
        Method::POST,
        "/api/admin/voters/approve",
        Some(json!({ "admin": ADMIN, "addresses": [VOTER] })),
    )
    .await;
    let (status, body) = send(
        &h.app,
        Method::POST,
        "/api/verify-voter",
        Some(json!({ "address": VOTER, "kind": "face", "data": "0xface" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matched"], true);
    assert_eq!(body["simulated"], true);
}

#[tokio::test]
async fn otp_gates_the_vote() {
    let h = harness_with(true);
    send(&h.app, Method::POST, "/api/voters", Some(registration(VOTER))).await;
    send(
        &h.app,
        Method::POST,
        "/api/admin/voters/approve",
        Some(json!({ "admin": ADMIN, "addresses": [VOTER] })),
    )
    .await;
    h.contract.set_voting_active(true);

    let (status, _) = send(
        &h.app,
        Method::POST,
        "/api/vote",
        Some(json!({ "address": VOTER, "candidateId": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Phone number comes from the registration request.
    let (status, issued) = send(
        &h.app,
        Method::POST,
        "/api/otp",
        Some(json!({ "address": VOTER })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(issued["phoneNumber"], "+919876543210");
    assert_eq!(issued["demo"], true);
    let code = issued["demoCode"].as_str().unwrap().to_string();

    let (status, _) = send(
        &h.app,
        Method::POST,
        "/api/vote",
        Some(json!({ "address": VOTER, "candidateId": 1, "otpCode": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn otp_verify_endpoint() {
    let h = harness();
    send(&h.app, Method::POST, "/api/voters", Some(registration(VOTER))).await;
    let (_, issued) = send(
        &h.app,
        Method::POST,
        "/api/otp",
        Some(json!({ "address": VOTER, "phoneNumber": "+91 98765 43210" })),
    )
    .await;
    let code = issued["demoCode"].as_str().unwrap().to_string();

    let (status, _) = send(
        &h.app,
        Method::POST,
        "/api/otp/verify",
        Some(json!({ "address": VOTER, "code": "123456" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &h.app,
        Method::POST,
        "/api/otp/verify",
        Some(json!({ "address": VOTER, "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], true);
}

#[tokio::test]
async fn otp_goes_only_to_the_registered_number() {
    let h = harness();
    let (status, _) = send(
        &h.app,
        Method::POST,
        "/api/otp",
        Some(json!({ "address": VOTER, "phoneNumber": "9876543210" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(&h.app, Method::POST, "/api/voters", Some(registration(VOTER))).await;
    let (status, body) = send(
        &h.app,
        Method::POST,
        "/api/otp",
        Some(json!({ "address": VOTER, "phoneNumber": "9000000000" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Phone number does not match the registration");
}

#[tokio::test]
async fn otp_guesses_are_limited() {
    let h = harness();
    send(&h.app, Method::POST, "/api/voters", Some(registration(VOTER))).await;
    let (_, issued) = send(&h.app, Method::POST, "/api/otp", Some(json!({ "address": VOTER }))).await;
    let code = issued["demoCode"].as_str().unwrap().to_string();
    let wrong = if code == "100000" { "100001" } else { "100000" };

    for _ in 0..chainvote_verification::MAX_FAILED_ATTEMPTS {
        let (status, _) = send(
            &h.app,
            Method::POST,
            "/api/otp/verify",
            Some(json!({ "address": VOTER, "code": wrong })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    let (status, _) = send(
        &h.app,
        Method::POST,
        "/api/otp/verify",
        Some(json!({ "address": VOTER, "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn metrics_endpoint_exposes_counters() {
    let h = harness();
    send(&h.app, Method::GET, "/api/election", None).await;
    let (status, body) = send(&h.app, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().unwrap();
    assert!(text.contains("chainvote_registrations_submitted_total"));
    assert!(text.contains("route=\"/api/election\""));
}
