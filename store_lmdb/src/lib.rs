//! LMDB storage backend for chainvote.
//!
//! Implements the storage traits from `chainvote-store` using the `heed` LMDB
//! bindings. Each logical store maps to one LMDB database within a single
//! environment; all store handles share the environment.

pub mod environment;
pub mod error;
pub mod hidden;
pub mod integrity;
pub mod meta;
pub mod migration;
pub mod otp;
pub mod registration;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use hidden::LmdbHiddenCandidateStore;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use meta::LmdbMetaStore;
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
pub use otp::LmdbOtpStore;
pub use registration::LmdbRegistrationStore;

/// Serialize a value for storage.
pub(crate) fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, LmdbError> {
    bincode::serialize(value).map_err(|e| LmdbError::Serialization(e.to_string()))
}

/// Deserialize a stored value.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, LmdbError> {
    bincode::deserialize(bytes).map_err(|e| LmdbError::Serialization(e.to_string()))
}
