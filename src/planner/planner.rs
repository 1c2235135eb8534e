// ============================================================================
// Migration Planner
// ============================================================================
//
// Builds the per-document update payloads for a compiled instruction.
// Every rule reads the document's pre-migration state: derived and copied
// values are computed first, removals are staged last and unconditionally.
//
// ============================================================================

use crate::core::{Document, FieldPath};
use crate::storage::{UpdateDocument, UpdateOne};
use crate::transform::CompiledInstruction;
use serde_json::Value;

pub struct MigrationPlanner<'a> {
    compiled: &'a CompiledInstruction,
}

impl<'a> MigrationPlanner<'a> {
    pub fn new(compiled: &'a CompiledInstruction) -> Self {
        Self { compiled }
    }

    /// Update for a single document, or `None` when nothing would change.
    pub fn plan_document(&self, document: &Document) -> Option<UpdateOne> {
        let mut update = UpdateDocument::new();

        for rule in &self.compiled.derived {
            if let Some(value) = (rule.transform)(document) {
                stage_set(&mut update, &rule.target, value);
            }
        }

        for rule in &self.compiled.copies {
            if let Some(value) = document.get_path(&rule.source) {
                stage_set(&mut update, &rule.target, value.clone());
            }
        }

        update.unset.extend(self.compiled.removals.iter().cloned());

        if update.is_empty() {
            return None;
        }
        Some(UpdateOne {
            id: document.id(),
            update,
        })
    }

    /// Updates for every document that needs one, in document order.
    pub fn plan(&self, documents: &[Document]) -> Vec<UpdateOne> {
        documents
            .iter()
            .filter_map(|document| self.plan_document(document))
            .collect()
    }
}

// Later rules targeting the same path win.
fn stage_set(update: &mut UpdateDocument, target: &FieldPath, value: Value) {
    match update.set.iter_mut().find(|(path, _)| path == target) {
        Some(entry) => entry.1 = value,
        None => update.set.push((target.clone(), value)),
    }
}
