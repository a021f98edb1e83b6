//! Voter registration lifecycle.

use std::sync::Arc;

use chainvote_store::{RegistrationStore, RegistrationSubmission, VoterRegistration};
use chainvote_types::{Clock, RegistrationStatus, VoterAddress};
use chainvote_verification::{validate_national_id, validate_phone_number};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::WorkflowError;

/// Published after every successful write to a registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationEvent {
    pub address: VoterAddress,
    pub status: RegistrationStatus,
}

/// Stored captures an approved voter is checked against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationData {
    pub face_data: String,
    pub fingerprint_data: String,
}

pub struct VoterRegistry {
    store: Arc<dyn RegistrationStore>,
    clock: Arc<dyn Clock>,
    events: Option<broadcast::Sender<RegistrationEvent>>,
}

impl VoterRegistry {
    pub fn new(store: Arc<dyn RegistrationStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            events: None,
        }
    }

    /// Publish registration changes on `sender`.
    pub fn with_events(mut self, sender: broadcast::Sender<RegistrationEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    fn publish(&self, record: &VoterRegistration) {
        if let Some(tx) = &self.events {
            // No subscribers is not an error.
            let _ = tx.send(RegistrationEvent {
                address: record.address.clone(),
                status: record.status,
            });
        }
    }

    /// Validate and store a registration request.
    ///
    /// Captures must be present; national id and phone number are reduced to
    /// bare digits before storage.
    pub fn submit(
        &self,
        mut submission: RegistrationSubmission,
    ) -> Result<VoterRegistration, WorkflowError> {
        if submission.face_data.trim().is_empty() || submission.fingerprint_data.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "face and fingerprint captures are required".into(),
            ));
        }
        submission.national_id = validate_national_id(&submission.national_id)?;
        submission.phone_number = validate_phone_number(&submission.phone_number)?;

        let address = submission.address.clone();
        let record = self.store.submit(submission, self.clock.now()).map_err(|e| {
            tracing::info!(%address, error = %e, "registration refused");
            WorkflowError::from(e)
        })?;
        tracing::info!(address = %record.address, "registration submitted");
        self.publish(&record);
        Ok(record)
    }

    pub fn get(&self, address: &VoterAddress) -> Result<Option<VoterRegistration>, WorkflowError> {
        Ok(self.store.get(address)?)
    }

    pub fn list(
        &self,
        filter: Option<RegistrationStatus>,
    ) -> Result<Vec<VoterRegistration>, WorkflowError> {
        Ok(self.store.list(filter)?)
    }

    /// Overwrite a record's status without transition checks.
    pub(crate) fn set_status(
        &self,
        address: &VoterAddress,
        status: RegistrationStatus,
    ) -> Result<VoterRegistration, WorkflowError> {
        let record = self.store.set_status(address, status, self.clock.now())?;
        tracing::info!(%address, %status, "registration status set");
        self.publish(&record);
        Ok(record)
    }

    /// Move a record to `status` if the lifecycle allows it.
    ///
    /// Setting the status a record already has is accepted and returns the
    /// record unchanged. Approval must go through [`crate::AdminWorkflow`] so
    /// that the contract registration happens first.
    pub(crate) fn decide(
        &self,
        address: &VoterAddress,
        status: RegistrationStatus,
    ) -> Result<VoterRegistration, WorkflowError> {
        let current = self
            .store
            .get(address)?
            .ok_or_else(|| WorkflowError::NotFound(address.to_string()))?;
        if current.status == status {
            return Ok(current);
        }
        if !current.status.can_decide(status) {
            return Err(WorkflowError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }
        self.set_status(address, status)
    }

    /// Soft removal: the record is kept and marked rejected. Approved voters
    /// are registered on chain and cannot be removed here.
    pub fn remove(&self, address: &VoterAddress) -> Result<VoterRegistration, WorkflowError> {
        self.decide(address, RegistrationStatus::Rejected)
    }

    /// Stored captures for an approved voter.
    pub fn verification_data(
        &self,
        address: &VoterAddress,
    ) -> Result<VerificationData, WorkflowError> {
        match self.store.get(address)? {
            Some(record) if record.status == RegistrationStatus::Approved => Ok(VerificationData {
                face_data: record.face_data,
                fingerprint_data: record.fingerprint_data,
            }),
            _ => Err(WorkflowError::NotFound(format!(
                "no approved voter registration for {address}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainvote_nullables::{NullClock, NullRegistrationStore};

    fn addr(n: u8) -> VoterAddress {
        let mut b = [0u8; 20];
        b[19] = n;
        VoterAddress::from_bytes(b)
    }

    fn submission(n: u8) -> RegistrationSubmission {
        RegistrationSubmission {
            address: addr(n),
            face_data: "0xface".into(),
            fingerprint_data: "0xf1f1".into(),
            national_id: "1234 5678 9012".into(),
            phone_number: "98765 43210".into(),
        }
    }

    fn registry() -> VoterRegistry {
        VoterRegistry::new(
            Arc::new(NullRegistrationStore::new()),
            Arc::new(NullClock::new(1_000)),
        )
    }

    #[test]
    fn submit_normalises_digits() {
        let r = registry();
        let rec = r.submit(submission(1)).unwrap();
        assert_eq!(rec.national_id, "123456789012");
        assert_eq!(rec.phone_number, "9876543210");
        assert_eq!(rec.status, RegistrationStatus::Pending);
    }

    #[test]
    fn submit_rejects_missing_capture() {
        let r = registry();
        let mut s = submission(1);
        s.fingerprint_data = " ".into();
        assert!(matches!(r.submit(s), Err(WorkflowError::Validation(_))));
    }

    #[test]
    fn submit_rejects_bad_national_id() {
        let r = registry();
        let mut s = submission(1);
        s.national_id = "123".into();
        assert!(matches!(r.submit(s), Err(WorkflowError::Validation(_))));
    }

    #[test]
    fn decide_enforces_lifecycle() {
        let r = registry();
        r.submit(submission(1)).unwrap();
        r.decide(&addr(1), RegistrationStatus::Rejected).unwrap();
        let err = r.decide(&addr(1), RegistrationStatus::Approved).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
        // idempotent self-transition
        r.decide(&addr(1), RegistrationStatus::Rejected).unwrap();
    }

    #[test]
    fn decide_missing_is_not_found() {
        let r = registry();
        assert!(matches!(
            r.decide(&addr(9), RegistrationStatus::Approved),
            Err(WorkflowError::NotFound(_))
        ));
    }

    #[test]
    fn remove_is_soft() {
        let r = registry();
        r.submit(submission(1)).unwrap();
        let rec = r.remove(&addr(1)).unwrap();
        assert_eq!(rec.status, RegistrationStatus::Rejected);
        assert!(r.get(&addr(1)).unwrap().is_some());
    }

    #[test]
    fn approved_voter_cannot_be_removed() {
        let r = registry();
        r.submit(submission(1)).unwrap();
        r.set_status(&addr(1), RegistrationStatus::Approved).unwrap();
        assert!(matches!(
            r.remove(&addr(1)),
            Err(WorkflowError::InvalidTransition {
                from: RegistrationStatus::Approved,
                to: RegistrationStatus::Rejected,
            })
        ));
        assert_eq!(
            r.get(&addr(1)).unwrap().unwrap().status,
            RegistrationStatus::Approved
        );
    }

    #[test]
    fn decide_cannot_reopen_a_decision() {
        let r = registry();
        r.submit(submission(1)).unwrap();
        r.set_status(&addr(1), RegistrationStatus::Approved).unwrap();
        assert!(r.decide(&addr(1), RegistrationStatus::Pending).is_err());
    }

    #[test]
    fn verification_data_only_for_approved() {
        let r = registry();
        r.submit(submission(1)).unwrap();
        assert!(r.verification_data(&addr(1)).is_err());
        r.set_status(&addr(1), RegistrationStatus::Approved).unwrap();
        let data = r.verification_data(&addr(1)).unwrap();
        assert_eq!(data.face_data, "0xface");
    }

    #[test]
    fn events_published() {
        let (tx, mut rx) = broadcast::channel(8);
        let r = registry().with_events(tx);
        r.submit(submission(1)).unwrap();
        r.set_status(&addr(1), RegistrationStatus::Approved).unwrap();
        assert_eq!(rx.try_recv().unwrap().status, RegistrationStatus::Pending);
        assert_eq!(rx.try_recv().unwrap().status, RegistrationStatus::Approved);
    }
}
