use serde::Deserialize;

use crate::error::{EtlError, Result};

/// A "new batch available" notification naming the bucket that holds the extracts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEvent {
    pub bucket: String,
    /// Object whose arrival fired the notification, when the platform reports it.
    pub object: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventPayload {
    data: Option<EventData>,
    bucket: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventData {
    bucket: Option<String>,
    name: Option<String>,
}

impl BatchEvent {
    /// Accepts a CloudEvent envelope (`{"data": {"bucket": ...}}`) or a bare `{"bucket": ...}`.
    pub fn from_json(raw: &str) -> Result<Self> {
        let payload: EventPayload = serde_json::from_str(raw)
            .map_err(|err| EtlError::Config(format!("invalid trigger event: {err}")))?;

        let (bucket, object) = match payload.data {
            Some(data) => (data.bucket.or(payload.bucket), data.name.or(payload.name)),
            None => (payload.bucket, payload.name),
        };

        let bucket = bucket
            .map(|bucket| bucket.trim().to_string())
            .filter(|bucket| !bucket.is_empty())
            .ok_or_else(|| EtlError::Config("trigger event does not name a bucket".into()))?;

        Ok(Self { bucket, object })
    }
}
