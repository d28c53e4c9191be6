//! sled-backed motion flag for installations that keep it on the
//! controller host instead of the dimmer.

use async_trait::async_trait;
use std::path::Path;

use super::{DeviceError, MotionFlagStore};

const FLAG_KEY: &[u8] = b"motion_enabled";

#[derive(Debug, Clone)]
pub struct SledFlagStore {
    db: sled::Db,
}

impl SledFlagStore {
    pub fn open(path: &Path) -> Result<Self, DeviceError> {
        Ok(Self { db: sled::open(path)? })
    }
}

#[async_trait]
impl MotionFlagStore for SledFlagStore {
    async fn get(&self) -> Result<Option<bool>, DeviceError> {
        let value = self.db.get(FLAG_KEY)?;
        Ok(match value.as_deref() {
            Some([1]) => Some(true),
            Some([0]) => Some(false),
            _ => None,
        })
    }

    async fn set(&self, enabled: bool) -> Result<(), DeviceError> {
        self.db.insert(FLAG_KEY, vec![u8::from(enabled)])?;
        self.db.flush_async().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temporary() -> SledFlagStore {
        let db = sled::Config::new().temporary(true).open().unwrap();
        SledFlagStore { db }
    }

    #[tokio::test]
    async fn test_absent_flag_reads_none() {
        let store = temporary();
        assert_eq!(store.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = temporary();
        store.set(false).await.unwrap();
        assert_eq!(store.get().await.unwrap(), Some(false));
        store.set(true).await.unwrap();
        assert_eq!(store.get().await.unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_malformed_value_reads_none() {
        let store = temporary();
        store.db.insert(FLAG_KEY, b"yes".as_slice()).unwrap();
        assert_eq!(store.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_opens_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledFlagStore::open(&dir.path().join("flag")).unwrap();
        store.set(false).await.unwrap();
        assert_eq!(store.get().await.unwrap(), Some(false));
        assert!(dir.path().join("flag").exists());
    }
}
