//! Pluggable biometric verification.
//!
//! The only implementation shipped is simulated: it accepts with a fixed
//! probability and never looks at the captured data.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::RandomSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiometricKind {
    Face,
    Fingerprint,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiometricOutcome {
    pub kind: BiometricKind,
    pub matched: bool,
    pub simulated: bool,
    pub message: String,
}

pub trait BiometricVerifier: Send + Sync {
    fn name(&self) -> &str;

    /// Compare a fresh capture with the one stored at registration.
    fn verify(&self, kind: BiometricKind, stored: &str, presented: &str) -> BiometricOutcome;
}

/// Succeeds when a uniform draw exceeds `failure_rate`.
pub struct SimulatedBiometricVerifier {
    failure_rate: f64,
    random: Arc<dyn RandomSource>,
}

impl SimulatedBiometricVerifier {
    pub const DEFAULT_FAILURE_RATE: f64 = 0.2;

    pub fn new(failure_rate: f64, random: Arc<dyn RandomSource>) -> Self {
        Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
            random,
        }
    }

    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }
}

impl BiometricVerifier for SimulatedBiometricVerifier {
    fn name(&self) -> &str {
        "simulated"
    }

    fn verify(&self, kind: BiometricKind, _stored: &str, _presented: &str) -> BiometricOutcome {
        let matched = self.random.unit() > self.failure_rate;
        let label = match kind {
            BiometricKind::Face => "Face",
            BiometricKind::Fingerprint => "Fingerprint",
        };
        let message = if matched {
            format!("{label} verification successful")
        } else {
            format!("{label} verification failed, please try again")
        };
        tracing::debug!(?kind, matched, "simulated biometric check");
        BiometricOutcome {
            kind,
            matched,
            simulated: true,
            message,
        }
    }
}
