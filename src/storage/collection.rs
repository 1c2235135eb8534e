use super::engine::CollectionOptions;
use crate::core::{DbError, Document, DocumentId, Result};
use std::collections::HashMap;

/// A named set of documents kept in insertion order.
#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    options: CollectionOptions,
    documents: Vec<Document>,
    positions: HashMap<DocumentId, usize>,
}

impl Collection {
    pub fn new(name: impl Into<String>, options: CollectionOptions) -> Self {
        Self {
            name: name.into(),
            options,
            documents: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &CollectionOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, id: DocumentId) -> Option<&Document> {
        self.positions.get(&id).map(|&pos| &self.documents[pos])
    }

    /// Runs the collection validator, if any.
    pub fn validate(&self, document: &Document) -> Result<()> {
        match &self.options.validator {
            Some(validator) => validator(document).map_err(|reason| {
                DbError::ConstraintViolation(format!(
                    "document {} rejected by '{}': {}",
                    document.id(),
                    self.name,
                    reason
                ))
            }),
            None => Ok(()),
        }
    }

    /// Inserts or replaces `document` without validation, bumping its
    /// version past the stored one.
    pub fn put(&mut self, mut document: Document) {
        let id = document.id();
        match self.positions.get(&id) {
            Some(&pos) => {
                document.set_version(self.documents[pos].version() + 1);
                self.documents[pos] = document;
            }
            None => {
                document.set_version(0);
                self.positions.insert(id, self.documents.len());
                self.documents.push(document);
            }
        }
    }

    /// Validates, then stores `document`.
    pub fn write(&mut self, document: Document) -> Result<()> {
        self.validate(&document)?;
        self.put(document);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    #[test]
    fn test_put_bumps_version() {
        let mut collection = Collection::new("users", CollectionOptions::permissive());
        let id = DocumentId::new();
        collection.put(Document::new(id, Map::new()));
        assert_eq!(collection.get(id).unwrap().version(), 0);

        let replacement = collection.get(id).unwrap().clone();
        collection.put(replacement);
        assert_eq!(collection.get(id).unwrap().version(), 1);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_validator_rejects_document() {
        let options = CollectionOptions::permissive().with_validator(|doc: &Document| {
            if doc.contains("forbidden") {
                Err("field 'forbidden' is not allowed".to_string())
            } else {
                Ok(())
            }
        });
        let mut collection = Collection::new("users", options);

        let mut body = Map::new();
        body.insert("forbidden".into(), json!(true));
        let err = collection.write(Document::new(DocumentId::new(), body)).unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));
        assert!(collection.is_empty());
    }
}
