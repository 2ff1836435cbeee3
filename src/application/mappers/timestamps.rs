use chrono::SecondsFormat;
use serde_json::Value;

use crate::application::ports::TimestampCodec;
use crate::domain::entities::{FieldMap, Record};

/// Rewrites every native remote timestamp into an RFC3339 UTC string, the
/// representation the typed models deserialize. Recurses through objects and
/// arrays; anything the codec does not recognize passes through unchanged,
/// so running the pass twice yields identical output.
pub fn normalize_value(codec: &dyn TimestampCodec, value: Value) -> Value {
    if let Some(ts) = codec.decode(&value) {
        return Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true));
    }
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, child)| (key, normalize_value(codec, child)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|child| normalize_value(codec, child))
                .collect(),
        ),
        other => other,
    }
}

pub fn normalize_fields(codec: &dyn TimestampCodec, fields: FieldMap) -> FieldMap {
    fields
        .into_iter()
        .map(|(key, value)| (key, normalize_value(codec, value)))
        .collect()
}

/// Applied to every record read from the remote service before it is cached
/// or returned.
pub fn normalize_record(codec: &dyn TimestampCodec, record: Record) -> Record {
    Record::new(record.id, normalize_fields(codec, record.fields))
}

pub fn normalize_records(codec: &dyn TimestampCodec, records: Vec<Record>) -> Vec<Record> {
    records
        .into_iter()
        .map(|record| normalize_record(codec, record))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    struct SecondsNanosCodec;

    impl TimestampCodec for SecondsNanosCodec {
        fn decode(&self, value: &Value) -> Option<DateTime<Utc>> {
            let map = value.as_object()?;
            if map.len() != 2 {
                return None;
            }
            let seconds = map.get("_seconds")?.as_i64()?;
            let nanos = map.get("_nanoseconds")?.as_i64()?;
            Utc.timestamp_opt(seconds, nanos as u32).single()
        }
    }

    fn native(seconds: i64) -> Value {
        json!({ "_seconds": seconds, "_nanoseconds": 0 })
    }

    #[test]
    fn converts_timestamps_at_any_depth_including_arrays() {
        let value = json!({
            "createdAt": native(1_700_000_000),
            "items": [
                { "deliveredAt": native(1_700_000_100), "qty": 2 },
                "untouched",
            ],
            "meta": { "audit": { "at": native(1_700_000_200) } },
        });

        let normalized = normalize_value(&SecondsNanosCodec, value);

        assert_eq!(
            normalized["createdAt"],
            json!("2023-11-14T22:13:20.000Z")
        );
        assert_eq!(
            normalized["items"][0]["deliveredAt"],
            json!("2023-11-14T22:15:00.000Z")
        );
        assert_eq!(normalized["items"][0]["qty"], json!(2));
        assert_eq!(normalized["items"][1], json!("untouched"));
        assert_eq!(
            normalized["meta"]["audit"]["at"],
            json!("2023-11-14T22:16:40.000Z")
        );
    }

    #[test]
    fn second_pass_is_byte_identical() {
        let value = json!({
            "createdAt": native(1_700_000_000),
            "nested": [{ "at": native(1_700_000_001) }],
            "note": "plain",
        });

        let once = normalize_value(&SecondsNanosCodec, value);
        let twice = normalize_value(&SecondsNanosCodec, once.clone());

        assert_eq!(
            serde_json::to_string(&once).expect("json"),
            serde_json::to_string(&twice).expect("json"),
        );
    }

    #[test]
    fn unrecognized_shapes_pass_through() {
        let value = json!({
            "_seconds": 12,
            "extra": true,
            "list": [1, 2, 3],
        });
        let normalized = normalize_value(&SecondsNanosCodec, value.clone());
        assert_eq!(normalized, value);
    }

    #[test]
    fn record_ids_survive_normalization() {
        let record = Record::from_value(json!({
            "id": "invoices_1",
            "issueDate": native(1_700_000_000),
        }))
        .expect("record");

        let normalized = normalize_record(&SecondsNanosCodec, record);
        assert_eq!(normalized.id.as_str(), "invoices_1");
        assert_eq!(
            normalized.get("issueDate"),
            Some(&json!("2023-11-14T22:13:20.000Z"))
        );
    }
}
