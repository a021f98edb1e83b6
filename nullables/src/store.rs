//! Nullable stores: thread-safe in-memory storage for testing.
//!
//! Each store holds its data behind one `Mutex`, so a `submit` runs its
//! read-check-write inside a single critical section.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chainvote_store::{
    admit_submission, apply_status, sort_registrations, HiddenCandidateStore, OtpChallenge,
    OtpStore, RegistrationStore, RegistrationSubmission, StoreError, VoterRegistration,
};
use chainvote_types::{CandidateId, RegistrationStatus, Timestamp, VoterAddress};

/// An in-memory registration store.
#[derive(Default)]
pub struct NullRegistrationStore {
    records: Mutex<HashMap<VoterAddress, VoterRegistration>>,
    fail_status_writes: AtomicBool,
}

impl NullRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set_status` fail with a backend error.
    pub fn fail_status_writes(&self, fail: bool) {
        self.fail_status_writes.store(fail, Ordering::SeqCst);
    }

    /// Insert a record directly, bypassing the admission rule.
    pub fn insert(&self, record: VoterRegistration) {
        self.records
            .lock()
            .unwrap()
            .insert(record.address.clone(), record);
    }
}

impl RegistrationStore for NullRegistrationStore {
    fn submit(
        &self,
        submission: RegistrationSubmission,
        now: Timestamp,
    ) -> Result<VoterRegistration, StoreError> {
        let mut records = self.records.lock().unwrap();
        let record = admit_submission(records.get(&submission.address), submission, now)?;
        records.insert(record.address.clone(), record.clone());
        Ok(record)
    }

    fn get(&self, address: &VoterAddress) -> Result<Option<VoterRegistration>, StoreError> {
        Ok(self.records.lock().unwrap().get(address).cloned())
    }

    fn list(
        &self,
        filter: Option<RegistrationStatus>,
    ) -> Result<Vec<VoterRegistration>, StoreError> {
        let mut out: Vec<VoterRegistration> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| filter.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        sort_registrations(&mut out);
        Ok(out)
    }

    fn set_status(
        &self,
        address: &VoterAddress,
        status: RegistrationStatus,
        now: Timestamp,
    ) -> Result<VoterRegistration, StoreError> {
        if self.fail_status_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("null store: status writes disabled".into()));
        }
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(address)
            .ok_or_else(|| StoreError::NotFound(address.to_string()))?;
        apply_status(record, status, now);
        Ok(record.clone())
    }

    fn count(&self) -> Result<u64, StoreError> {
        Ok(self.records.lock().unwrap().len() as u64)
    }
}

#[derive(Default)]
pub struct NullHiddenCandidateStore {
    hidden: Mutex<BTreeSet<CandidateId>>,
}

impl NullHiddenCandidateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HiddenCandidateStore for NullHiddenCandidateStore {
    fn hide(&self, id: CandidateId) -> Result<bool, StoreError> {
        Ok(self.hidden.lock().unwrap().insert(id))
    }

    fn unhide(&self, id: CandidateId) -> Result<bool, StoreError> {
        Ok(self.hidden.lock().unwrap().remove(&id))
    }

    fn hidden(&self) -> Result<BTreeSet<CandidateId>, StoreError> {
        Ok(self.hidden.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct NullOtpStore {
    challenges: Mutex<HashMap<VoterAddress, OtpChallenge>>,
}

impl NullOtpStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OtpStore for NullOtpStore {
    fn put(&self, challenge: &OtpChallenge) -> Result<(), StoreError> {
        self.challenges
            .lock()
            .unwrap()
            .insert(challenge.address.clone(), challenge.clone());
        Ok(())
    }

    fn get(&self, address: &VoterAddress) -> Result<Option<OtpChallenge>, StoreError> {
        Ok(self.challenges.lock().unwrap().get(address).cloned())
    }

    fn remove(&self, address: &VoterAddress) -> Result<bool, StoreError> {
        Ok(self.challenges.lock().unwrap().remove(address).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn submission(address: &VoterAddress) -> RegistrationSubmission {
        RegistrationSubmission {
            address: address.clone(),
            face_data: "0xface".into(),
            fingerprint_data: "0xf1".into(),
            national_id: "123456789012".into(),
            phone_number: "9876543210".into(),
        }
    }

    #[test]
    fn concurrent_submissions_admit_exactly_one() {
        let store = Arc::new(NullRegistrationStore::new());
        let address = VoterAddress::parse("0x00000000000000000000000000000000000000aa").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                let address = address.clone();
                std::thread::spawn(move || store.submit(submission(&address), Timestamp::new(i)))
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Result::is_ok)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn failing_status_writes() {
        let store = NullRegistrationStore::new();
        let address = VoterAddress::parse("0x00000000000000000000000000000000000000aa").unwrap();
        store.submit(submission(&address), Timestamp::new(1)).unwrap();
        store.fail_status_writes(true);
        assert!(matches!(
            store.set_status(&address, RegistrationStatus::Approved, Timestamp::new(2)),
            Err(StoreError::Backend(_))
        ));
    }

    #[test]
    fn hidden_set() {
        let store = NullHiddenCandidateStore::new();
        assert!(store.hide(CandidateId::new(1)).unwrap());
        assert!(!store.hide(CandidateId::new(1)).unwrap());
        assert!(store.unhide(CandidateId::new(1)).unwrap());
        assert!(store.hidden().unwrap().is_empty());
    }
}
