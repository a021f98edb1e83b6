//! Hidden-candidate storage trait.
//!
//! Hiding is purely cosmetic: the contract cannot delete candidates, so the
//! service keeps its own set of ids to leave out of ballot and results views.

use std::collections::BTreeSet;

use chainvote_types::CandidateId;

use crate::StoreError;

pub trait HiddenCandidateStore: Send + Sync {
    /// Hide a candidate. Returns `false` if it was already hidden.
    fn hide(&self, id: CandidateId) -> Result<bool, StoreError>;

    /// Unhide a candidate. Returns `false` if it was not hidden.
    fn unhide(&self, id: CandidateId) -> Result<bool, StoreError>;

    /// All currently hidden candidate ids.
    fn hidden(&self) -> Result<BTreeSet<CandidateId>, StoreError>;
}
