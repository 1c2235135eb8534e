use crate::storage::UpdateOne;

/// The writes a migration would issue against one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationPlan {
    pub collection: String,
    /// Documents loaded from the collection.
    pub documents_scanned: usize,
    /// One entry per document with a non-empty payload.
    pub operations: Vec<UpdateOne>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// Human-readable rendering, one line per operation.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "BulkWrite on '{}': {} operation(s) over {} document(s)",
            self.collection,
            self.operations.len(),
            self.documents_scanned
        )];
        for op in &self.operations {
            let set: Vec<String> = op
                .update
                .set
                .iter()
                .map(|(path, value)| format!("{}={}", path, value))
                .collect();
            let unset: Vec<&str> = op.update.unset.iter().map(|path| path.as_str()).collect();
            lines.push(format!(
                "  UpdateOne {{_id: {}}} $set [{}] $unset [{}]",
                op.id,
                set.join(", "),
                unset.join(", ")
            ));
        }
        lines
    }
}
