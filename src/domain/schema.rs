use serde::{de::DeserializeOwned, Serialize};

use crate::domain::value_objects::CollectionName;

/// Field that scopes tenant-owned collections to a company.
pub const TENANT_FIELD: &str = "companyId";

/// Declared schema version. Raising it after adding collections or indexes
/// lets an opened store tell upgrades apart from downgrades.
pub const SCHEMA_VERSION: u32 = 2;

/// Binds a typed model to the collection its records live in. Implemented by
/// both full models and their `New*` drafts.
pub trait CollectionModel: Serialize + DeserializeOwned + Send {
    const COLLECTION: &'static str;
}

/// Declared shape of one collection: its name and the fields served by
/// equality indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    name: CollectionName,
    indexes: Vec<String>,
}

impl CollectionSpec {
    pub fn new(name: CollectionName) -> Self {
        Self {
            name,
            indexes: Vec::new(),
        }
    }

    pub fn with_index(mut self, field: &str) -> Self {
        if !self.indexes.iter().any(|f| f == field) {
            self.indexes.push(field.to_string());
        }
        self
    }

    pub fn name(&self) -> &CollectionName {
        &self.name
    }

    pub fn indexes(&self) -> &[String] {
        &self.indexes
    }

    pub fn has_index(&self, field: &str) -> bool {
        self.indexes.iter().any(|f| f == field)
    }

    /// Whether records in this collection belong to a company.
    pub fn is_tenant_scoped(&self) -> bool {
        self.has_index(TENANT_FIELD)
    }
}

/// The full declared collection registry, versioned. The local store diffs
/// this against what it has registered on disk and backfills additions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSchema {
    version: u32,
    collections: Vec<CollectionSpec>,
}

impl StoreSchema {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            collections: Vec::new(),
        }
    }

    pub fn with_collection(mut self, spec: CollectionSpec) -> Self {
        if !self.collections.iter().any(|c| c.name == spec.name) {
            self.collections.push(spec);
        }
        self
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn collections(&self) -> &[CollectionSpec] {
        &self.collections
    }

    pub fn collection(&self, name: &CollectionName) -> Option<&CollectionSpec> {
        self.collections.iter().find(|c| c.name == *name)
    }

    pub fn contains(&self, name: &CollectionName) -> bool {
        self.collection(name).is_some()
    }

    /// The invoicing application schema. Version 2 added the admins
    /// collection and its email index.
    pub fn invoicing() -> Self {
        Self::new(SCHEMA_VERSION)
            .with_collection(spec("users").with_index(TENANT_FIELD))
            .with_collection(spec("companies"))
            .with_collection(spec("admins").with_index("email"))
            .with_collection(spec("clients").with_index(TENANT_FIELD))
            .with_collection(
                spec("invoices")
                    .with_index(TENANT_FIELD)
                    .with_index("clientId"),
            )
            .with_collection(
                spec("receipts")
                    .with_index(TENANT_FIELD)
                    .with_index("invoiceId"),
            )
            .with_collection(spec("quotations").with_index(TENANT_FIELD))
    }
}

fn spec(name: &'static str) -> CollectionSpec {
    CollectionSpec::new(CollectionName::from_static(name))
}
