//! LMDB environment setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::hidden::LmdbHiddenCandidateStore;
use crate::meta::LmdbMetaStore;
use crate::migration::Migrator;
use crate::otp::LmdbOtpStore;
use crate::registration::LmdbRegistrationStore;
use crate::LmdbError;

/// Names of every database the environment creates.
pub const DATABASE_NAMES: &[&str] = &["registrations", "hidden_candidates", "otp_challenges", "meta"];

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    path: PathBuf,
    env: Arc<Env>,
    registrations_db: Database<Bytes, Bytes>,
    hidden_db: Database<Bytes, Bytes>,
    otp_db: Database<Bytes, Bytes>,
    meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path, creating all
    /// databases and running pending schema migrations.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        let mut options = EnvOpenOptions::new();
        options.map_size(map_size).max_dbs(max_dbs);
        // SAFETY: the environment is opened once per process for this path and
        // the directory is owned by the service.
        let env = unsafe { options.open(path)? };

        let mut wtxn = env.write_txn()?;
        let registrations_db = env.create_database(&mut wtxn, Some("registrations"))?;
        let hidden_db = env.create_database(&mut wtxn, Some("hidden_candidates"))?;
        let otp_db = env.create_database(&mut wtxn, Some("otp_challenges"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        let environment = Self {
            path: path.to_path_buf(),
            env: Arc::new(env),
            registrations_db,
            hidden_db,
            otp_db,
            meta_db,
        };

        Migrator::run(&environment)?;
        tracing::info!(path = %path.display(), "LMDB environment opened");
        Ok(environment)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    /// Flush dirty pages to disk.
    pub fn force_sync(&self) -> Result<(), LmdbError> {
        self.env.force_sync()?;
        Ok(())
    }

    pub fn registration_store(&self) -> LmdbRegistrationStore {
        LmdbRegistrationStore {
            env: self.env.clone(),
            registrations_db: self.registrations_db,
        }
    }

    pub fn hidden_candidate_store(&self) -> LmdbHiddenCandidateStore {
        LmdbHiddenCandidateStore {
            env: self.env.clone(),
            hidden_db: self.hidden_db,
        }
    }

    pub fn otp_store(&self) -> LmdbOtpStore {
        LmdbOtpStore {
            env: self.env.clone(),
            otp_db: self.otp_db,
        }
    }

    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: self.env.clone(),
            meta_db: self.meta_db,
        }
    }
}
