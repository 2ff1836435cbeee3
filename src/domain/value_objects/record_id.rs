use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::collection::CollectionName;

const LOCAL_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Identifier of a record. Remote-assigned ids are opaque; ids generated
/// while offline carry the `<collection>_<epoch-ms>_<suffix>` shape until the
/// remote service assigns the final id during queue replay.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(value: String) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        Self::validate(value)?;
        Ok(Self(value.to_string()))
    }

    /// Temporary id for a record created while the remote service is
    /// unreachable.
    pub fn generate_local(collection: &CollectionName, now: DateTime<Utc>) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..LOCAL_SUFFIX_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        Self(format!(
            "{}_{}_{}",
            collection.as_str(),
            now.timestamp_millis(),
            suffix
        ))
    }

    /// Whether this id was generated locally for the given collection.
    pub fn is_local_for(&self, collection: &CollectionName) -> bool {
        let Some(rest) = self.0.strip_prefix(&format!("{}_", collection.as_str())) else {
            return false;
        };
        match rest.split_once('_') {
            Some((millis, suffix)) => {
                !millis.is_empty()
                    && millis.bytes().all(|b| b.is_ascii_digit())
                    && !suffix.is_empty()
            }
            None => false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(value: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            return Err("Record id cannot be empty".to_string());
        }
        Ok(())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl FromStr for RecordId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_ids_carry_the_collection_prefix_and_suffix() {
        let collection = CollectionName::parse("clients").expect("collection");
        let id = RecordId::generate_local(&collection, Utc::now());

        assert!(id.as_str().starts_with("clients_"));
        assert!(id.is_local_for(&collection));

        let suffix = id.as_str().rsplit('_').next().expect("suffix");
        assert_eq!(suffix.len(), LOCAL_SUFFIX_LEN);
    }

    #[test]
    fn remote_ids_are_not_recognized_as_local() {
        let collection = CollectionName::parse("clients").expect("collection");
        let id = RecordId::parse("aF3kZ9qLmN0pXyWvB2cD").expect("id");
        assert!(!id.is_local_for(&collection));

        // Prefix alone is not enough without the epoch segment.
        let id = RecordId::parse("clients_abc_def").expect("id");
        assert!(!id.is_local_for(&collection));
    }

    #[test]
    fn empty_ids_are_rejected() {
        assert!(RecordId::parse("  ").is_err());
    }
}
