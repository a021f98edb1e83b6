//! LMDB implementation of HiddenCandidateStore.
//!
//! Keys are big-endian candidate ids so iteration yields ascending order;
//! values are empty.

use std::collections::BTreeSet;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use chainvote_store::{HiddenCandidateStore, StoreError};
use chainvote_types::CandidateId;

use crate::LmdbError;

pub struct LmdbHiddenCandidateStore {
    pub(crate) env: Arc<Env>,
    pub(crate) hidden_db: Database<Bytes, Bytes>,
}

impl HiddenCandidateStore for LmdbHiddenCandidateStore {
    fn hide(&self, id: CandidateId) -> Result<bool, StoreError> {
        let key = id.value().to_be_bytes();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .hidden_db
            .get(&wtxn, &key)
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Ok(false);
        }
        self.hidden_db
            .put(&mut wtxn, &key, &[])
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(true)
    }

    fn unhide(&self, id: CandidateId) -> Result<bool, StoreError> {
        let key = id.value().to_be_bytes();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let removed = self
            .hidden_db
            .delete(&mut wtxn, &key)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(removed)
    }

    fn hidden(&self) -> Result<BTreeSet<CandidateId>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.hidden_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut ids = BTreeSet::new();
        for entry in iter {
            let (key, _) = entry.map_err(LmdbError::from)?;
            let arr: [u8; 8] = key.try_into().map_err(|_| {
                StoreError::Corruption("hidden candidate key has unexpected length".into())
            })?;
            ids.insert(CandidateId::new(u64::from_be_bytes(arr)));
        }
        Ok(ids)
    }
}
