//! Axum router and server for the HTTP API.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Router};
use chainvote_contract::VotingContract;
use chainvote_verification::{FingerprintMode, OtpService, RandomSource};
use chainvote_workflow::{
    AdminWorkflow, Ballot, IdentityCheck, VoterRegistry, VotingDesk, WalletSessions,
};
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::RpcError;
use crate::metrics::{self, ApiMetrics};
use crate::{admin, election, handlers};

/// How capture endpoints behave.
#[derive(Clone, Copy, Debug)]
pub struct CaptureSettings {
    /// Ignore uploaded frames and return the fixed demo face digest.
    pub face_demo_mode: bool,
    pub fingerprint_mode: FingerprintMode,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            face_demo_mode: true,
            fingerprint_mode: FingerprintMode::Pattern,
        }
    }
}

/// Everything a handler may need, shared behind one `Arc`.
pub struct ApiState {
    pub registry: Arc<VoterRegistry>,
    pub admin: AdminWorkflow,
    pub ballot: Ballot,
    pub desk: VotingDesk,
    pub sessions: WalletSessions,
    pub identity: IdentityCheck,
    pub otp: Arc<OtpService>,
    pub contract: Arc<dyn VotingContract>,
    pub random: Arc<dyn RandomSource>,
    pub capture: CaptureSettings,
    pub metrics: ApiMetrics,
}

pub fn router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route(
            "/api/voters",
            get(handlers::list_voters)
                .post(handlers::submit_voter)
                .patch(handlers::set_voter_status)
                .delete(handlers::remove_voter),
        )
        .route(
            "/api/verify-voter",
            get(handlers::verification_data).post(handlers::verify_voter),
        )
        .route("/api/capture/face", post(handlers::capture_face))
        .route("/api/capture/fingerprint", post(handlers::capture_fingerprint))
        .route("/api/otp", post(handlers::issue_otp))
        .route("/api/otp/verify", post(handlers::verify_otp))
        .route("/api/session", get(election::session))
        .route("/api/election", get(election::election))
        .route("/api/candidates", get(election::candidates))
        .route("/api/results", get(election::results))
        .route("/api/voter-status", get(election::voter_status))
        .route("/api/vote", post(election::vote))
        .route("/api/admin/voters/approve", post(admin::approve))
        .route("/api/admin/voters/reject", post(admin::reject))
        .route("/api/admin/voting/start", post(admin::start_voting))
        .route("/api/admin/voting/end", post(admin::end_voting))
        .route("/api/admin/voting/toggle", post(admin::toggle_voting))
        .route("/api/admin/candidates", post(admin::add_candidate))
        .route("/api/admin/candidates/hidden", get(admin::hidden_candidates))
        .route("/api/admin/candidates/hide", post(admin::hide_candidate))
        .route("/api/admin/candidates/unhide", post(admin::unhide_candidate))
        .route("/metrics", get(metrics_text))
        .route_layer(middleware::from_fn_with_state(state.clone(), metrics::track));

    api.layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn metrics_text(
    axum::extract::State(state): axum::extract::State<Arc<ApiState>>,
) -> Response {
    match state.metrics.encode_text() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => RpcError::Internal(format!("failed to encode metrics: {e}")).into_response(),
    }
}

pub struct RpcServer {
    pub addr: SocketAddr,
    pub state: Arc<ApiState>,
}

impl RpcServer {
    pub fn new(addr: SocketAddr, state: Arc<ApiState>) -> Self {
        Self { addr, state }
    }

    /// Serve until `shutdown` fires.
    pub async fn start(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), RpcError> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| RpcError::Internal(format!("failed to bind {}: {e}", self.addr)))?;
        info!(addr = %self.addr, "HTTP API listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await
            .map_err(|e| RpcError::Internal(format!("HTTP server error: {e}")))?;
        info!("HTTP API stopped");
        Ok(())
    }
}
