//! Declarative migration instructions.
//!
//! The wire shape is camelCase JSON:
//!
//! ```json
//! {
//!   "collection": "testdocs",
//!   "addWithTransform": [{ "new": "fullName", "transform": "full_name" }],
//!   "addFromOld": [{ "new": "info.age", "from": "age" }],
//!   "removeOld": [{ "field": "firstName" }],
//!   "comments": "merge names"
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Derive `target` by invoking the registered transform `transform`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddWithTransform {
    #[serde(rename = "new")]
    pub target: String,
    pub transform: String,
}

/// Copy the value at `from` to `target` verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddFromOld {
    #[serde(rename = "new")]
    pub target: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveOld {
    pub field: String,
}

/// A migration request against a single collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    pub collection: String,
    #[serde(default)]
    pub add_with_transform: Vec<AddWithTransform>,
    #[serde(default)]
    pub add_from_old: Vec<AddFromOld>,
    #[serde(default)]
    pub remove_old: Vec<RemoveOld>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

impl Instruction {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            add_with_transform: Vec::new(),
            add_from_old: Vec::new(),
            remove_old: Vec::new(),
            comments: None,
        }
    }

    pub fn with_transform(mut self, target: impl Into<String>, transform: impl Into<String>) -> Self {
        self.add_with_transform.push(AddWithTransform {
            target: target.into(),
            transform: transform.into(),
        });
        self
    }

    pub fn with_copy(mut self, target: impl Into<String>, from: impl Into<String>) -> Self {
        self.add_from_old.push(AddFromOld {
            target: target.into(),
            from: from.into(),
        });
        self
    }

    pub fn with_removal(mut self, field: impl Into<String>) -> Self {
        self.remove_old.push(RemoveOld { field: field.into() });
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    /// True when the instruction carries no rules at all.
    pub fn is_noop(&self) -> bool {
        self.add_with_transform.is_empty() && self.add_from_old.is_empty() && self.remove_old.is_empty()
    }
}
