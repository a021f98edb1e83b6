//! LMDB implementation of RegistrationStore.
//!
//! Keyed by the lowercase address string. `submit` performs its
//! read-check-write inside one write transaction; LMDB allows a single
//! writer at a time, which gives the per-address uniqueness guarantee.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use chainvote_store::{
    admit_submission, apply_status, sort_registrations, RegistrationStore,
    RegistrationSubmission, StoreError, VoterRegistration,
};
use chainvote_types::{RegistrationStatus, Timestamp, VoterAddress};

use crate::{decode, encode, LmdbError};

pub struct LmdbRegistrationStore {
    pub(crate) env: Arc<Env>,
    pub(crate) registrations_db: Database<Bytes, Bytes>,
}

impl RegistrationStore for LmdbRegistrationStore {
    fn submit(
        &self,
        submission: RegistrationSubmission,
        now: Timestamp,
    ) -> Result<VoterRegistration, StoreError> {
        let key = submission.address.as_str().as_bytes().to_vec();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let existing: Option<VoterRegistration> = match self
            .registrations_db
            .get(&wtxn, &key)
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Some(decode(bytes)?),
            None => None,
        };

        let record = admit_submission(existing.as_ref(), submission, now)?;
        let bytes = encode(&record)?;
        self.registrations_db
            .put(&mut wtxn, &key, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;

        tracing::debug!(address = %record.address, "registration stored");
        Ok(record)
    }

    fn get(&self, address: &VoterAddress) -> Result<Option<VoterRegistration>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .registrations_db
            .get(&rtxn, address.as_str().as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }

    fn list(
        &self,
        filter: Option<RegistrationStatus>,
    ) -> Result<Vec<VoterRegistration>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.registrations_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut records = Vec::new();
        for entry in iter {
            let (_key, val) = entry.map_err(LmdbError::from)?;
            let record: VoterRegistration = decode(val)?;
            if filter.map_or(true, |s| record.status == s) {
                records.push(record);
            }
        }
        sort_registrations(&mut records);
        Ok(records)
    }

    fn set_status(
        &self,
        address: &VoterAddress,
        status: RegistrationStatus,
        now: Timestamp,
    ) -> Result<VoterRegistration, StoreError> {
        let key = address.as_str().as_bytes();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let mut record: VoterRegistration = match self
            .registrations_db
            .get(&wtxn, key)
            .map_err(LmdbError::from)?
        {
            Some(bytes) => decode(bytes)?,
            None => return Err(StoreError::NotFound(address.to_string())),
        };

        apply_status(&mut record, status, now);
        let bytes = encode(&record)?;
        self.registrations_db
            .put(&mut wtxn, key, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(record)
    }

    fn count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let len = self
            .registrations_db
            .len(&rtxn)
            .map_err(LmdbError::from)?;
        Ok(len)
    }
}
