use crate::core::{CompileError, Document};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// A derived-field computation: a pure function of one document.
///
/// Returning `None` means "no value" and the field is left untouched.
pub type TransformFn = Arc<dyn Fn(&Document) -> Option<Value> + Send + Sync>;

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*([.:\-][A-Za-z0-9_]+)*$")
            .expect("transform identifier pattern is valid")
    })
}

/// Checks that `id` is usable as a transform rule identifier.
pub fn validate_transform_id(id: &str) -> Result<(), CompileError> {
    let malformed = |reason: &str| CompileError::MalformedTransform {
        id: id.to_string(),
        reason: reason.to_string(),
    };

    if id.trim().is_empty() {
        return Err(malformed("identifier cannot be empty"));
    }
    if id.len() > 128 {
        return Err(malformed("identifier too long (max 128 characters)"));
    }
    if !identifier_pattern().is_match(id) {
        return Err(malformed(
            "identifier must start with a letter or underscore and contain only letters, digits, '_', '.', ':' or '-'",
        ));
    }
    Ok(())
}

/// Registry of named transforms.
///
/// Instructions refer to transforms by identifier; only callables registered
/// here can ever run.
#[derive(Clone, Default)]
pub struct TransformRegistry {
    transforms: HashMap<String, TransformFn>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `transform` under `id`, replacing any previous registration.
    pub fn register<F>(&mut self, id: impl Into<String>, transform: F) -> Result<(), CompileError>
    where
        F: Fn(&Document) -> Option<Value> + Send + Sync + 'static,
    {
        self.register_arc(id, Arc::new(transform))
    }

    pub fn register_arc(&mut self, id: impl Into<String>, transform: TransformFn) -> Result<(), CompileError> {
        let id = id.into();
        validate_transform_id(&id)?;
        tracing::debug!(transform = %id, "registered transform");
        self.transforms.insert(id, transform);
        Ok(())
    }

    /// Fluent variant of [`register`](Self::register).
    pub fn with<F>(mut self, id: impl Into<String>, transform: F) -> Result<Self, CompileError>
    where
        F: Fn(&Document) -> Option<Value> + Send + Sync + 'static,
    {
        self.register(id, transform)?;
        Ok(self)
    }

    pub fn get(&self, id: &str) -> Option<TransformFn> {
        self.transforms.get(id).cloned()
    }

    /// Looks `id` up, distinguishing malformed from unregistered identifiers.
    pub fn resolve(&self, id: &str) -> Result<TransformFn, CompileError> {
        validate_transform_id(id)?;
        self.get(id)
            .ok_or_else(|| CompileError::UnknownTransform(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.transforms.contains_key(id)
    }

    pub fn unregister(&mut self, id: &str) -> bool {
        self.transforms.remove(id).is_some()
    }

    /// Registered identifiers, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.transforms.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("transforms", &self.ids())
            .finish()
    }
}
