//! Prometheus metrics for the HTTP API.
//!
//! [`ApiMetrics`] owns its own [`Registry`]; `/metrics` encodes it in the
//! Prometheus text exposition format.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_with_registry, Encoder,
    HistogramOpts, HistogramVec, IntCounter, Opts, Registry, TextEncoder,
};

use crate::error::ErrorClass;
use crate::server::ApiState;

pub struct ApiMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Registration requests stored.
    pub registrations_submitted: IntCounter,
    /// Submissions refused because a request already exists.
    pub registration_conflicts: IntCounter,
    /// Addresses approved (registered on chain and marked approved).
    pub approvals: IntCounter,
    pub rejections: IntCounter,
    pub votes_cast: IntCounter,
    /// Requests that failed because of the contract or the Ethereum node.
    pub contract_errors: IntCounter,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Handler latency in seconds, by method and route.
    pub request_duration: HistogramVec,
}

impl ApiMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let registrations_submitted = register_int_counter_with_registry!(
            Opts::new(
                "chainvote_registrations_submitted_total",
                "Voter registration requests stored"
            ),
            registry
        )?;
        let registration_conflicts = register_int_counter_with_registry!(
            Opts::new(
                "chainvote_registration_conflicts_total",
                "Registration requests refused as duplicates"
            ),
            registry
        )?;
        let approvals = register_int_counter_with_registry!(
            Opts::new("chainvote_approvals_total", "Registration requests approved"),
            registry
        )?;
        let rejections = register_int_counter_with_registry!(
            Opts::new("chainvote_rejections_total", "Registration requests rejected"),
            registry
        )?;
        let votes_cast = register_int_counter_with_registry!(
            Opts::new("chainvote_votes_cast_total", "Votes submitted to the contract"),
            registry
        )?;
        let contract_errors = register_int_counter_with_registry!(
            Opts::new(
                "chainvote_contract_errors_total",
                "Requests failed by a contract revert or node error"
            ),
            registry
        )?;

        // 1 ms to ~16 s; transaction endpoints wait for receipts.
        let request_duration = register_histogram_vec_with_registry!(
            HistogramOpts::new(
                "chainvote_http_request_duration_seconds",
                "HTTP handler latency in seconds"
            )
            .buckets(prometheus::exponential_buckets(0.001, 2.0, 15)?),
            &["method", "route"],
            registry
        )?;

        Ok(Self {
            registry,
            registrations_submitted,
            registration_conflicts,
            approvals,
            rejections,
            votes_cast,
            contract_errors,
            request_duration,
        })
    }

    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Middleware: time every request and count contract failures.
pub(crate) async fn track(
    State(state): State<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let started = Instant::now();
    let response = next.run(request).await;

    state
        .metrics
        .request_duration
        .with_label_values(&[&method, &route])
        .observe(started.elapsed().as_secs_f64());
    if response.extensions().get::<ErrorClass>() == Some(&ErrorClass::Contract) {
        state.metrics.contract_errors.inc();
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_registered_metrics() {
        let metrics = ApiMetrics::new().unwrap();
        metrics.votes_cast.inc();
        metrics
            .request_duration
            .with_label_values(&["GET", "/api/results"])
            .observe(0.01);

        let text = metrics.encode_text().unwrap();
        assert!(text.contains("chainvote_votes_cast_total 1"));
        assert!(text.contains("chainvote_http_request_duration_seconds_bucket"));
    }

    #[test]
    fn separate_instances_do_not_collide() {
        let a = ApiMetrics::new().unwrap();
        let b = ApiMetrics::new().unwrap();
        a.approvals.inc();
        assert_eq!(b.approvals.get(), 0);
    }
}
