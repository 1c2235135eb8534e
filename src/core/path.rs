// ============================================================================
// Field Paths
// ============================================================================
//
// Dotted paths into schemaless documents ("info.age", "tags.0").
// Objects are traversed by key, arrays by numeric segment.
//
// ============================================================================

use super::error::{CompileError, DbError};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Name of the identity field every stored document carries.
pub const ID_FIELD: &str = "_id";

/// A parsed, validated dotted field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(raw: &str) -> std::result::Result<Self, CompileError> {
        let invalid = |reason: &str| CompileError::InvalidFieldPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid("path cannot be empty"));
        }
        if raw.contains('\0') {
            return Err(invalid("path cannot contain NUL characters"));
        }

        let mut segments = Vec::new();
        for segment in raw.split('.') {
            if segment.is_empty() {
                return Err(invalid("path cannot contain empty segments"));
            }
            if segment.starts_with('$') {
                return Err(invalid("segments cannot start with '$'"));
            }
            segments.push(segment.to_string());
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True when the path names the document identity.
    pub fn is_id(&self) -> bool {
        self.segments[0] == ID_FIELD
    }

    /// True when `self` equals `other` or is one of its ancestors.
    pub fn is_prefix_of(&self, other: &FieldPath) -> bool {
        self.segments.len() <= other.segments.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(a, b)| a == b)
    }

    /// Two paths overlap when writing one would touch the other.
    pub fn overlaps(&self, other: &FieldPath) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for FieldPath {
    type Err = CompileError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Resolves `segments` against `root`. Missing keys, out-of-range indices and
/// traversal through scalars all resolve to `None`.
pub fn lookup<'a, S: AsRef<str>>(root: &'a Map<String, Value>, segments: &[S]) -> Option<&'a Value> {
    let (first, rest) = segments.split_first()?;
    let mut current = root.get(first.as_ref())?;
    for segment in rest {
        current = match current {
            Value::Object(map) => map.get(segment.as_ref())?,
            Value::Array(items) => items.get(segment.as_ref().parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Writes `value` at `path`, creating intermediate objects as needed.
///
/// Setting below a scalar is a `PathConflict`. A numeric segment past the end
/// of an array pads the array with nulls.
pub fn assign(root: &mut Map<String, Value>, path: &FieldPath, value: Value) -> Result<(), DbError> {
    let segments = path.segments();
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| DbError::InvalidUpdate("empty field path".to_string()))?;

    let mut current: &mut Value = match parents.first() {
        None => {
            root.insert(last.clone(), value);
            return Ok(());
        }
        Some(first) => root
            .entry(first.clone())
            .or_insert_with(|| Value::Object(Map::new())),
    };

    for segment in parents.iter().skip(1) {
        current = child_mut(current, segment, path)?;
    }

    match current {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(items) => {
            let index = array_index(last, path)?;
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            items[index] = value;
            Ok(())
        }
        other => Err(scalar_conflict(last, path, other)),
    }
}

/// Removes the value at `path`. Returns whether anything changed.
///
/// Absent paths are a no-op. Removing an array element nulls it out so the
/// positions of its siblings are preserved.
pub fn remove(root: &mut Map<String, Value>, path: &FieldPath) -> bool {
    let segments = path.segments();
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };

    let mut current = match parents.first() {
        None => return root.remove(last.as_str()).is_some(),
        Some(first) => match root.get_mut(first.as_str()) {
            Some(value) => value,
            None => return false,
        },
    };

    for segment in parents.iter().skip(1) {
        current = match current {
            Value::Object(map) => match map.get_mut(segment.as_str()) {
                Some(value) => value,
                None => return false,
            },
            Value::Array(items) => match segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                Some(value) => value,
                None => return false,
            },
            _ => return false,
        };
    }

    match current {
        Value::Object(map) => map.remove(last.as_str()).is_some(),
        Value::Array(items) => match last.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
            Some(slot) if !slot.is_null() => {
                *slot = Value::Null;
                true
            }
            _ => false,
        },
        _ => false,
    }
}

fn child_mut<'a>(current: &'a mut Value, segment: &str, path: &FieldPath) -> Result<&'a mut Value, DbError> {
    match current {
        Value::Object(map) => Ok(map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()))),
        Value::Array(items) => {
            let index = array_index(segment, path)?;
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            if items[index].is_null() {
                items[index] = Value::Object(Map::new());
            }
            Ok(&mut items[index])
        }
        other => Err(scalar_conflict(segment, path, other)),
    }
}

fn array_index(segment: &str, path: &FieldPath) -> Result<usize, DbError> {
    segment.parse::<usize>().map_err(|_| {
        DbError::PathConflict(format!(
            "cannot use non-numeric segment '{}' of '{}' to index an array",
            segment, path
        ))
    })
}

fn scalar_conflict(segment: &str, path: &FieldPath, parent: &Value) -> DbError {
    DbError::PathConflict(format!(
        "cannot create field '{}' of '{}' inside non-container value {}",
        segment, path, parent
    ))
}
