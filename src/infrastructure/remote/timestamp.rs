use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use crate::application::ports::TimestampCodec;

/// Native timestamp value as the remote document service serializes it:
/// an object with exactly `_seconds` and `_nanoseconds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteTimestamp {
    pub seconds: i64,
    pub nanoseconds: u32,
}

impl RemoteTimestamp {
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanoseconds: dt.timestamp_subsec_nanos(),
        }
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.seconds, self.nanoseconds).single()
    }

    pub fn to_value(self) -> Value {
        json!({
            "_seconds": self.seconds,
            "_nanoseconds": self.nanoseconds,
        })
    }

    /// Strict on shape: extra keys mean the object is application data that
    /// merely resembles a timestamp, and it must pass through untouched.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        if map.len() != 2 {
            return None;
        }
        let seconds = map.get("_seconds")?.as_i64()?;
        let nanoseconds = map.get("_nanoseconds")?.as_i64()?;
        if !(0..1_000_000_000).contains(&nanoseconds) {
            return None;
        }
        Some(Self {
            seconds,
            nanoseconds: nanoseconds as u32,
        })
    }
}

/// Recognizer handed to the normalizer by the remote adapter.
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoteTimestampCodec;

impl TimestampCodec for RemoteTimestampCodec {
    fn decode(&self, value: &Value) -> Option<DateTime<Utc>> {
        RemoteTimestamp::from_value(value)?.to_datetime()
    }
}
