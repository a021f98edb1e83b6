//! LMDB implementation of OtpStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use chainvote_store::{OtpChallenge, OtpStore, StoreError};
use chainvote_types::VoterAddress;

use crate::{decode, encode, LmdbError};

pub struct LmdbOtpStore {
    pub(crate) env: Arc<Env>,
    pub(crate) otp_db: Database<Bytes, Bytes>,
}

impl OtpStore for LmdbOtpStore {
    fn put(&self, challenge: &OtpChallenge) -> Result<(), StoreError> {
        let bytes = encode(challenge)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.otp_db
            .put(&mut wtxn, challenge.address.as_str().as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get(&self, address: &VoterAddress) -> Result<Option<OtpChallenge>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .otp_db
            .get(&rtxn, address.as_str().as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }

    fn remove(&self, address: &VoterAddress) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let removed = self
            .otp_db
            .delete(&mut wtxn, address.as_str().as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(removed)
    }
}
