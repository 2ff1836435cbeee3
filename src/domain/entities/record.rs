use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::value_objects::RecordId;

/// Top-level fields of a record, without the id.
pub type FieldMap = Map<String, Value>;

/// A schema-light document: an id plus arbitrary JSON fields. The field map
/// never contains an `id` key; the id lives beside it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: FieldMap,
}

impl Record {
    pub fn new(id: RecordId, mut fields: FieldMap) -> Self {
        fields.remove("id");
        Self { id, fields }
    }

    /// Parses a JSON object carrying a string `id` field.
    pub fn from_value(value: Value) -> Result<Self, String> {
        let Value::Object(mut fields) = value else {
            return Err("Record must be a JSON object".to_string());
        };
        let id = match fields.remove("id") {
            Some(Value::String(id)) => RecordId::new(id)?,
            Some(_) => return Err("Record id must be a string".to_string()),
            None => return Err("Record is missing an id".to_string()),
        };
        Ok(Self { id, fields })
    }

    /// The record as a single JSON object, id included.
    pub fn to_value(&self) -> Value {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.to_string()));
        Value::Object(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Replaces top-level fields from a partial map. Last writer wins per
    /// field; an `id` key in the changes is ignored.
    pub fn merge(&mut self, changes: &FieldMap) {
        for (key, value) in changes {
            if key == "id" {
                continue;
            }
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// Rekeys the record, used when the remote service assigns the final id
    /// for a record created offline.
    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields_of(value: Value) -> FieldMap {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn from_value_extracts_the_id() {
        let record = Record::from_value(json!({
            "id": "clients_1",
            "name": "Acme",
        }))
        .expect("record");

        assert_eq!(record.id.as_str(), "clients_1");
        assert_eq!(record.get("name"), Some(&json!("Acme")));
        assert!(record.get("id").is_none());
    }

    #[test]
    fn from_value_rejects_missing_or_non_string_id() {
        assert!(Record::from_value(json!({ "name": "Acme" })).is_err());
        assert!(Record::from_value(json!({ "id": 42 })).is_err());
        assert!(Record::from_value(json!("scalar")).is_err());
    }

    #[test]
    fn merge_replaces_top_level_fields_only() {
        let mut record = Record::from_value(json!({
            "id": "invoices_1",
            "status": "draft",
            "totals": { "subtotal": 100.0, "tax": 15.0 },
        }))
        .expect("record");

        record.merge(&fields_of(json!({
            "status": "paid",
            "id": "hijacked",
        })));

        assert_eq!(record.id.as_str(), "invoices_1");
        assert_eq!(record.get("status"), Some(&json!("paid")));
        // Untouched fields survive a partial merge.
        assert_eq!(
            record.get("totals"),
            Some(&json!({ "subtotal": 100.0, "tax": 15.0 }))
        );
    }

    #[test]
    fn to_value_round_trips_with_the_id_inline() {
        let record = Record::new(
            RecordId::parse("receipts_9").expect("id"),
            fields_of(json!({ "amount": 250.0 })),
        );

        assert_eq!(
            record.to_value(),
            json!({ "id": "receipts_9", "amount": 250.0 })
        );
    }
}
