//! Abstractions over the object stores that hold raw batch extracts and receive packaged output.

mod local;
mod memory;
mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;

pub use local::LocalDirStore;
pub use memory::MemoryBucketStore;
pub use s3::{S3BucketStore, S3Config};

#[derive(Debug, Error)]
pub enum BucketError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("sdk error: {0}")]
    Sdk(String),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BucketError {
    pub(crate) fn from_sdk(err: impl fmt::Display) -> Self {
        Self::Sdk(err.to_string())
    }
}

/// A flat key/value object store. Every call either fully succeeds or fully fails.
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Human-readable location of the store, used in logs and error messages.
    fn location(&self) -> String;

    async fn exists(&self, key: &str) -> Result<bool, BucketError>;
    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BucketError>;
    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError>;
}
