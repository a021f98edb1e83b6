//! LMDB database integrity checks.
//!
//! Run from the CLI (or on startup) to detect corruption before the service
//! starts answering requests.

use std::path::Path;

use chainvote_store::VoterRegistration;

use crate::environment::{LmdbEnvironment, DATABASE_NAMES};
use crate::{decode, LmdbError};

/// Summary of an integrity check run.
#[derive(Debug)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check database integrity.
///
/// Counts entries in every expected database and decodes every registration,
/// verifying it is stored under its own address. Read failures are recorded
/// in the report rather than causing a hard error.
pub fn check_integrity(environment: &LmdbEnvironment) -> Result<IntegrityReport, LmdbError> {
    let env = environment.env();
    let mut report = IntegrityReport {
        databases_checked: 0,
        total_entries: 0,
        errors: Vec::new(),
    };

    let rtxn = env.read_txn()?;

    for &db_name in DATABASE_NAMES {
        match env.open_database::<heed::types::Bytes, heed::types::Bytes>(&rtxn, Some(db_name)) {
            Ok(Some(db)) => {
                report.databases_checked += 1;
                match db.len(&rtxn) {
                    Ok(count) => report.total_entries += count,
                    Err(e) => report
                        .errors
                        .push(format!("failed to read database '{}': {}", db_name, e)),
                }

                if db_name == "registrations" {
                    check_registrations(&db, &rtxn, &mut report)?;
                }
            }
            Ok(None) => report
                .errors
                .push(format!("database '{}' is missing", db_name)),
            Err(e) => report
                .errors
                .push(format!("failed to open database '{}': {}", db_name, e)),
        }
    }

    Ok(report)
}

fn check_registrations(
    db: &heed::Database<heed::types::Bytes, heed::types::Bytes>,
    rtxn: &heed::RoTxn,
    report: &mut IntegrityReport,
) -> Result<(), LmdbError> {
    for entry in db.iter(rtxn)? {
        let (key, val) = entry?;
        let key_str = String::from_utf8_lossy(key).into_owned();
        match decode::<VoterRegistration>(val) {
            Ok(record) if record.address.as_str() == key_str => {}
            Ok(record) => report.errors.push(format!(
                "registration stored under '{}' belongs to {}",
                key_str, record.address
            )),
            Err(e) => report
                .errors
                .push(format!("registration '{}' does not decode: {}", key_str, e)),
        }
    }
    Ok(())
}

/// Check if the LMDB data directory looks valid before opening.
///
/// Returns `Ok(())` for a fresh (nonexistent) directory. Returns an error
/// if the directory exists but `data.mdb` is missing.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}
