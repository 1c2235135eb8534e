use super::error::{DbError, Result};
use super::path::{self, FieldPath, ID_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identity of a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub uuid::Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> Result<Self> {
        uuid::Uuid::parse_str(raw)
            .map(Self)
            .map_err(|e| DbError::Serialization(format!("Invalid document id '{}': {}", raw, e)))
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A schemaless document.
///
/// The identity is mirrored into the body under `_id` so rules can read it
/// like any other field. Only the store assigns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    id: DocumentId,
    body: Map<String, Value>,
    version: u64,
}

impl Document {
    pub(crate) fn new(id: DocumentId, mut body: Map<String, Value>) -> Self {
        body.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        Self { id, body, version: 0 }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Store-side modification counter, bumped on every committed write.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Reads a dotted path, e.g. `doc.get("info.age")`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let segments: Vec<&str> = path.split('.').collect();
        path::lookup(&self.body, &segments)
    }

    pub fn get_path(&self, path: &FieldPath) -> Option<&Value> {
        path::lookup(&self.body, path.segments())
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub(crate) fn set_path(&mut self, path: &FieldPath, value: Value) -> Result<()> {
        path::assign(&mut self.body, path, value)
    }

    pub(crate) fn unset_path(&mut self, path: &FieldPath) -> bool {
        path::remove(&mut self.body, path)
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.body.clone())
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.body)
    }
}
