use serde::Serialize;
use serde_json::Value;

use crate::domain::entities::{FieldMap, Record};
use crate::domain::schema::CollectionModel;
use crate::shared::error::{AppError, Result};

/// Serializes a model into the field map handed to the data layer. Any `id`
/// field is dropped; ids travel beside the fields, never inside them.
pub fn to_fields<T: Serialize>(model: &T) -> Result<FieldMap> {
    match serde_json::to_value(model)? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        _ => Err(AppError::Serialization(
            "model must serialize to a JSON object".to_string(),
        )),
    }
}

/// Serializes a full model (id included) into a record.
pub fn to_record<T: Serialize>(model: &T) -> Result<Record> {
    Record::from_value(serde_json::to_value(model)?).map_err(AppError::Serialization)
}

/// Rebuilds a typed model from a stored record.
pub fn from_record<T: CollectionModel>(record: &Record) -> Result<T> {
    Ok(serde_json::from_value(record.to_value())?)
}

/// Converts a batch, skipping records that no longer deserialize into the
/// model (e.g. rows written by an older app version). Skips are logged,
/// never surfaced as errors.
pub fn from_records<T: CollectionModel>(records: &[Record]) -> Vec<T> {
    records
        .iter()
        .filter_map(|record| match from_record::<T>(record) {
            Ok(model) => Some(model),
            Err(err) => {
                tracing::warn!(
                    collection = T::COLLECTION,
                    id = %record.id,
                    error = %err,
                    "Skipping record that does not match the typed model"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Client, NewClient};
    use crate::domain::value_objects::TenantId;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn draft() -> NewClient {
        NewClient {
            company_id: TenantId::parse("acme").expect("tenant"),
            name: "Globex".to_string(),
            email: "billing@globex.example".to_string(),
            phone: "+248 2 555 0147".to_string(),
            address: "12 Harbor Road".to_string(),
            tax_id: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).single().expect("ts"),
            updated_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).single().expect("ts"),
        }
    }

    #[test]
    fn drafts_serialize_without_an_id() {
        let fields = to_fields(&draft()).expect("fields");
        assert!(fields.get("id").is_none());
        assert_eq!(fields.get("companyId"), Some(&json!("acme")));
        assert_eq!(fields.get("name"), Some(&json!("Globex")));
        // None options stay off the wire entirely.
        assert!(fields.get("taxId").is_none());
    }

    #[test]
    fn records_round_trip_into_typed_models() {
        let mut fields = to_fields(&draft()).expect("fields");
        fields.insert("id".to_string(), json!("remote-abc"));
        let record = Record::from_value(Value::Object(fields)).expect("record");

        let client: Client = from_record(&record).expect("client");
        assert_eq!(client.id.as_str(), "remote-abc");
        assert_eq!(client.company_id.as_str(), "acme");
    }

    #[test]
    fn mismatched_records_are_skipped_in_batches() {
        let good = to_record(&json!({
            "id": "c1",
            "companyId": "acme",
            "name": "Globex",
            "email": "a@b.c",
            "phone": "1",
            "address": "x",
            "createdAt": "2024-03-01T09:00:00Z",
            "updatedAt": "2024-03-01T09:00:00Z",
        }))
        .expect("record");
        let bad = to_record(&json!({ "id": "c2", "companyId": 7 })).expect("record");

        let clients = from_records::<Client>(&[good, bad]);
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].id.as_str(), "c1");
    }
}
