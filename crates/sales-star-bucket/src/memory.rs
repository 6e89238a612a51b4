use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{BucketError, BucketStore};

/// In-process store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryBucketStore {
    name: String,
    objects: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryBucketStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Synchronous insert, handy when seeding fixtures.
    pub fn insert(&self, key: impl Into<String>, bytes: impl Into<Bytes>) {
        let mut objects = match self.objects.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        objects.insert(key.into(), bytes.into());
    }

    fn poisoned() -> BucketError {
        BucketError::Sdk("memory store lock poisoned".into())
    }
}

#[async_trait]
impl BucketStore for MemoryBucketStore {
    fn location(&self) -> String {
        format!("memory://{}", self.name)
    }

    async fn exists(&self, key: &str) -> Result<bool, BucketError> {
        let objects = self.objects.read().map_err(|_| Self::poisoned())?;
        Ok(objects.contains_key(key))
    }

    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        _content_type: &str,
    ) -> Result<(), BucketError> {
        let mut objects = self.objects.write().map_err(|_| Self::poisoned())?;
        objects.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError> {
        let objects = self.objects.read().map_err(|_| Self::poisoned())?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| BucketError::NotFound(key.to_string()))
    }
}
