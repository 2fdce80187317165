//! REST resource addressing and the domain seam behind the REST strategy.
//!
//! # Responsibilities
//! - Interpret a path positionally: resource / id / sub-resource / sub-id
//! - Define `ResourceStore`, the collaborator that performs CRUD work
//! - Provide `SampleStore`, a stateless stand-in domain layer
//!
//! # Design Decisions
//! - Ids are numeric; a non-numeric id segment is not treated as an id
//! - An all-digit segment that does not fit in `u64` is rejected, not ignored
//! - The targeted id is the sub-resource id when a sub-resource is named

use std::fmt;

use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Positional interpretation of a REST path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourcePath {
    /// Segment 0. Empty for `/`.
    pub resource: String,
    /// Segment 1, when numeric.
    pub id: Option<u64>,
    /// Segment 2.
    pub sub_resource: Option<String>,
    /// Segment 3, when numeric.
    pub sub_id: Option<u64>,
}

/// An id segment made of digits that does not fit in `u64`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ID {0} is out of range")]
pub struct IdOutOfRange(pub String);

impl ResourcePath {
    pub fn parse(path: &str) -> Result<Self, IdOutOfRange> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let numeric = |index: usize| match segments.get(index) {
            Some(segment) => parse_id(segment),
            None => Ok(None),
        };

        Ok(Self {
            resource: segments.first().map(|s| s.to_string()).unwrap_or_default(),
            id: numeric(1)?,
            sub_resource: segments.get(2).map(|s| s.to_string()),
            sub_id: numeric(3)?,
        })
    }

    /// The id an item operation acts on.
    pub fn target_id(&self) -> Option<u64> {
        if self.sub_resource.is_some() {
            self.sub_id
        } else {
            self.id
        }
    }

    /// Name of the collection an operation acts on.
    pub fn target_resource(&self) -> &str {
        self.sub_resource.as_deref().unwrap_or(&self.resource)
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.resource)?;
        if let Some(id) = self.id {
            write!(f, "/{id}")?;
        }
        if let Some(sub) = &self.sub_resource {
            write!(f, "/{sub}")?;
        }
        if let Some(sub_id) = self.sub_id {
            write!(f, "/{sub_id}")?;
        }
        Ok(())
    }
}

fn parse_id(segment: &str) -> Result<Option<u64>, IdOutOfRange> {
    if !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(None);
    }
    segment
        .parse()
        .map(Some)
        .map_err(|_| IdOutOfRange(segment.to_string()))
}

/// Pagination window for collection reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub limit: u64,
}

impl Page {
    pub fn offset(&self) -> u64 {
        (self.page.saturating_sub(1)).saturating_mul(self.limit)
    }
}

/// One page of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub items: Vec<Value>,
    pub total: u64,
}

/// Result of a create call.
#[derive(Debug, Clone, PartialEq)]
pub struct Created {
    pub record: Value,
    /// False when the store accepted the call without creating anything.
    pub created: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{resource} {id} not found")]
    NotFound { resource: String, id: u64 },
    #[error("storage backend failed: {0}")]
    Backend(String),
}

/// CRUD operations the REST strategy delegates to.
pub trait ResourceStore: Send + Sync + fmt::Debug {
    fn list(&self, path: &ResourcePath, page: Page) -> Result<Collection, StoreError>;

    fn show(&self, path: &ResourcePath, id: u64) -> Result<Value, StoreError>;

    fn create(&self, path: &ResourcePath, input: &Map<String, Value>) -> Result<Created, StoreError>;

    /// `partial` is true for PATCH.
    fn update(
        &self,
        path: &ResourcePath,
        id: u64,
        input: &Map<String, Value>,
        partial: bool,
    ) -> Result<Value, StoreError>;

    fn delete(&self, path: &ResourcePath, id: u64) -> Result<(), StoreError>;
}

/// Stand-in domain layer. Holds no records: reads return empty pages or
/// synthesized items, writes echo their input.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleStore;

impl ResourceStore for SampleStore {
    fn list(&self, _path: &ResourcePath, _page: Page) -> Result<Collection, StoreError> {
        Ok(Collection {
            items: Vec::new(),
            total: 0,
        })
    }

    fn show(&self, path: &ResourcePath, id: u64) -> Result<Value, StoreError> {
        let mut item = json!({
            "id": id,
            "type": path.target_resource(),
        });
        if let (Some(parent), Some(_)) = (path.id, &path.sub_resource) {
            item["parent"] = json!({"type": path.resource, "id": parent});
        }
        Ok(item)
    }

    fn create(&self, path: &ResourcePath, input: &Map<String, Value>) -> Result<Created, StoreError> {
        let mut record = input.clone();
        record.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        if let (Some(parent), Some(_)) = (path.id, &path.sub_resource) {
            record.insert(format!("{}_id", path.resource), json!(parent));
        }
        Ok(Created {
            record: Value::Object(record),
            created: true,
        })
    }

    fn update(
        &self,
        _path: &ResourcePath,
        id: u64,
        input: &Map<String, Value>,
        _partial: bool,
    ) -> Result<Value, StoreError> {
        let mut record = input.clone();
        record.insert("id".to_string(), json!(id));
        Ok(Value::Object(record))
    }

    fn delete(&self, _path: &ResourcePath, _id: u64) -> Result<(), StoreError> {
        Ok(())
    }
}
