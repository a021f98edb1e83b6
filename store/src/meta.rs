//! Metadata storage: small keyed values such as the schema version and the
//! contract event cursor.

use crate::StoreError;

const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Raw byte values under string keys. Integers are stored little-endian.
pub trait MetaStore: Send + Sync {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// `None` if the key was never written.
    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn put_u64(&self, key: &str, value: u64) -> Result<(), StoreError> {
        self.put_meta(key, &value.to_le_bytes())
    }

    fn get_u64(&self, key: &str) -> Result<Option<u64>, StoreError> {
        self.get_meta(key)?
            .map(|bytes| {
                let arr: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::Corruption(format!("{key} is {} bytes, expected 8", bytes.len()))
                })?;
                Ok(u64::from_le_bytes(arr))
            })
            .transpose()
    }

    /// A fresh database reports 0.
    fn get_schema_version(&self) -> Result<u32, StoreError> {
        match self.get_meta(SCHEMA_VERSION_KEY)? {
            Some(bytes) => {
                let arr: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::Corruption("schema_version has unexpected byte length".into())
                })?;
                Ok(u32::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        self.put_meta(SCHEMA_VERSION_KEY, &version.to_le_bytes())
    }
}
