//! Pre-vote identity check against the captures stored at registration.

use std::sync::Arc;

use chainvote_types::VoterAddress;
use chainvote_verification::{BiometricKind, BiometricOutcome, BiometricVerifier};

use crate::{VoterRegistry, WorkflowError};

pub struct IdentityCheck {
    registry: Arc<VoterRegistry>,
    verifier: Arc<dyn BiometricVerifier>,
}

impl IdentityCheck {
    pub fn new(registry: Arc<VoterRegistry>, verifier: Arc<dyn BiometricVerifier>) -> Self {
        Self { registry, verifier }
    }

    /// Only approved voters have stored captures; anyone else is `NotFound`.
    pub fn verify(
        &self,
        address: &VoterAddress,
        kind: BiometricKind,
        presented: &str,
    ) -> Result<BiometricOutcome, WorkflowError> {
        let stored = self.registry.verification_data(address)?;
        let reference = match kind {
            BiometricKind::Face => &stored.face_data,
            BiometricKind::Fingerprint => &stored.fingerprint_data,
        };
        let outcome = self.verifier.verify(kind, reference, presented);
        tracing::info!(
            %address,
            ?kind,
            matched = outcome.matched,
            method = self.verifier.name(),
            "identity check"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainvote_nullables::{NullClock, NullRandom, NullRegistrationStore};
    use chainvote_store::RegistrationSubmission;
    use chainvote_types::RegistrationStatus;
    use chainvote_verification::SimulatedBiometricVerifier;

    fn addr() -> VoterAddress {
        VoterAddress::parse("0x00000000000000000000000000000000000000aa").unwrap()
    }

    fn check(random: NullRandom) -> (Arc<VoterRegistry>, IdentityCheck) {
        let registry = Arc::new(VoterRegistry::new(
            Arc::new(NullRegistrationStore::new()),
            Arc::new(NullClock::new(0)),
        ));
        registry
            .submit(RegistrationSubmission {
                address: addr(),
                face_data: "0xface".into(),
                fingerprint_data: "0xf1".into(),
                national_id: "123456789012".into(),
                phone_number: "9876543210".into(),
            })
            .unwrap();
        let verifier = Arc::new(SimulatedBiometricVerifier::new(0.2, Arc::new(random)));
        (registry.clone(), IdentityCheck::new(registry, verifier))
    }

    #[test]
    fn pending_voter_has_no_reference() {
        let (_registry, check) = check(NullRandom::always_high());
        assert!(matches!(
            check.verify(&addr(), BiometricKind::Face, "0xface"),
            Err(WorkflowError::NotFound(_))
        ));
    }

    #[test]
    fn approved_voter_is_checked() {
        let (registry, check) = check(NullRandom::always_high());
        registry
            .set_status(&addr(), RegistrationStatus::Approved)
            .unwrap();
        let outcome = check
            .verify(&addr(), BiometricKind::Fingerprint, "0xf1")
            .unwrap();
        assert!(outcome.matched);
        assert!(outcome.simulated);
    }

    #[test]
    fn simulated_failure() {
        let (registry, check) = check(NullRandom::always_low());
        registry
            .set_status(&addr(), RegistrationStatus::Approved)
            .unwrap();
        assert!(!check.verify(&addr(), BiometricKind::Face, "0xface").unwrap().matched);
    }
}
