//! Schema migrations.
//!
//! The schema version lives in the meta store. Opening an environment walks
//! every step from the stored version to [`CURRENT_SCHEMA_VERSION`]; a
//! database written by a newer build is refused.
//!
//! | Version | Change |
//! |---|---|
//! | 1 | registrations, hidden_candidates, otp_challenges, meta |
//! | 2 | registrations keyed by lowercase address only |
//! | 3 | OTP challenges carry a failed-attempt count; old challenges dropped |

use chainvote_store::{MetaStore, VoterRegistration};

use crate::environment::LmdbEnvironment;
use crate::{decode, encode, LmdbError};

pub const CURRENT_SCHEMA_VERSION: u32 = 3;

pub struct Migrator;

impl Migrator {
    /// Bring the environment's schema up to date. Version 0 is a fresh
    /// database.
    pub fn run(environment: &LmdbEnvironment) -> Result<(), LmdbError> {
        let meta = environment.meta_store();
        let stored = meta
            .get_schema_version()
            .map_err(|e| LmdbError::Migration(e.to_string()))?;

        if stored > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::Migration(format!(
                "database schema version {stored} is newer than supported version {CURRENT_SCHEMA_VERSION}"
            )));
        }
        if stored == CURRENT_SCHEMA_VERSION {
            tracing::debug!(version = stored, "database schema is up to date");
            return Ok(());
        }

        // A fresh database has nothing to rewrite.
        if stored > 0 {
            for version in stored..CURRENT_SCHEMA_VERSION {
                tracing::info!(from = version, to = version + 1, "running migration");
                step(environment, version)?;
            }
        }

        meta.set_schema_version(CURRENT_SCHEMA_VERSION)
            .map_err(|e| LmdbError::Migration(e.to_string()))?;
        tracing::info!(from = stored, to = CURRENT_SCHEMA_VERSION, "schema migrated");
        Ok(())
    }
}

fn step(environment: &LmdbEnvironment, from: u32) -> Result<(), LmdbError> {
    match from {
        1 => rekey_registrations(environment).map(|moved| {
            if moved > 0 {
                tracing::info!(moved, "registrations rekeyed to lowercase addresses");
            }
        }),
        2 => clear_otp_challenges(environment).map(|dropped| {
            tracing::info!(dropped, "outstanding verification codes discarded");
        }),
        other => Err(LmdbError::Migration(format!(
            "no migration from schema version {other}"
        ))),
    }
}

/// Move every registration stored under a key other than its normalised
/// address. When both keys hold a record, the most recently updated wins.
fn rekey_registrations(environment: &LmdbEnvironment) -> Result<usize, LmdbError> {
    let store = environment.registration_store();
    let mut wtxn = store.env.write_txn()?;

    let mut misplaced = Vec::new();
    for entry in store.registrations_db.iter(&wtxn)? {
        let (key, value) = entry?;
        let record: VoterRegistration = decode(value)?;
        if key != record.address.as_str().as_bytes() {
            misplaced.push((key.to_vec(), record));
        }
    }

    for (old_key, record) in &misplaced {
        let canonical = record.address.as_str().as_bytes();
        let keep = match store.registrations_db.get(&wtxn, canonical)? {
            Some(existing) => {
                let existing: VoterRegistration = decode(existing)?;
                record.updated_at > existing.updated_at
            }
            None => true,
        };
        if keep {
            store
                .registrations_db
                .put(&mut wtxn, canonical, &encode(record)?)?;
        }
        store.registrations_db.delete(&mut wtxn, old_key)?;
    }

    wtxn.commit()?;
    Ok(misplaced.len())
}

/// Challenges live for minutes; dropping them only forces a reissue.
fn clear_otp_challenges(environment: &LmdbEnvironment) -> Result<u64, LmdbError> {
    let store = environment.otp_store();
    let mut wtxn = store.env.write_txn()?;
    let dropped = store.otp_db.len(&wtxn)?;
    store.otp_db.clear(&mut wtxn)?;
    wtxn.commit()?;
    Ok(dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainvote_store::RegistrationStore;
    use chainvote_types::{RegistrationStatus, Timestamp, VoterAddress};

    fn record(updated_at: u64, phone: &str) -> VoterRegistration {
        VoterRegistration {
            address: VoterAddress::parse("0x00000000000000000000000000000000000000AB").unwrap(),
            face_data: "0xface".into(),
            fingerprint_data: "0xf1f1".into(),
            national_id: "123456789012".into(),
            phone_number: phone.into(),
            status: RegistrationStatus::Pending,
            created_at: Timestamp::new(1),
            updated_at: Timestamp::new(updated_at),
        }
    }

    fn put_raw(env: &LmdbEnvironment, key: &str, value: &VoterRegistration) {
        let store = env.registration_store();
        let mut wtxn = store.env.write_txn().unwrap();
        store
            .registrations_db
            .put(&mut wtxn, key.as_bytes(), &encode(value).unwrap())
            .unwrap();
        wtxn.commit().unwrap();
    }

    #[test]
    fn unknown_step_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 8, 10 * 1024 * 1024).unwrap();
        assert!(step(&env, 99).is_err());
    }

    #[test]
    fn mixed_case_keys_are_moved() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 8, 10 * 1024 * 1024).unwrap();
        put_raw(&env, "0x00000000000000000000000000000000000000AB", &record(5, "9876543210"));

        assert_eq!(rekey_registrations(&env).unwrap(), 1);
        let address = VoterAddress::parse("0x00000000000000000000000000000000000000ab").unwrap();
        let moved = env.registration_store().get(&address).unwrap().unwrap();
        assert_eq!(moved.updated_at, Timestamp::new(5));
        assert_eq!(rekey_registrations(&env).unwrap(), 0);
    }

    #[test]
    fn newer_record_wins_on_collision() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 8, 10 * 1024 * 1024).unwrap();
        put_raw(&env, "0x00000000000000000000000000000000000000ab", &record(5, "1111111111"));
        put_raw(&env, "0x00000000000000000000000000000000000000AB", &record(9, "2222222222"));

        rekey_registrations(&env).unwrap();
        let all = env.registration_store().list(None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].phone_number, "2222222222");
    }

    #[test]
    fn old_otp_challenges_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), 8, 10 * 1024 * 1024).unwrap();
            let store = env.otp_store();
            let mut wtxn = store.env.write_txn().unwrap();
            store
                .otp_db
                .put(&mut wtxn, b"0x00000000000000000000000000000000000000ab", b"old")
                .unwrap();
            wtxn.commit().unwrap();
            env.meta_store().set_schema_version(2).unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), 8, 10 * 1024 * 1024).unwrap();
        assert_eq!(env.meta_store().get_schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
        let address = VoterAddress::parse("0x00000000000000000000000000000000000000ab").unwrap();
        assert!(chainvote_store::OtpStore::get(&env.otp_store(), &address)
            .unwrap()
            .is_none());
    }

    #[test]
    fn version_one_database_is_upgraded_on_open() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), 8, 10 * 1024 * 1024).unwrap();
            put_raw(&env, "0x00000000000000000000000000000000000000AB", &record(5, "9876543210"));
            env.meta_store().set_schema_version(1).unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), 8, 10 * 1024 * 1024).unwrap();
        assert_eq!(env.meta_store().get_schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
        let report = crate::check_integrity(&env).unwrap();
        assert!(report.is_healthy(), "{:?}", report.errors);
    }
}
