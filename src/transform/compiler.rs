// ============================================================================
// Transform Compiler
// ============================================================================
//
// Normalizes an Instruction's three rule lists into executable form:
// derived-field rules, copy-field rules and a de-duplicated removal set.
// Compilation is pure; it never touches the store.
//
// ============================================================================

use super::registry::{TransformFn, TransformRegistry};
use crate::core::{CompileError, FieldPath};
use crate::instruction::Instruction;
use std::fmt;

const MAX_COLLECTION_NAME_LEN: usize = 120;

/// A field computed by a registered transform.
#[derive(Clone)]
pub struct DerivedField {
    pub target: FieldPath,
    pub transform_id: String,
    pub transform: TransformFn,
}

impl fmt::Debug for DerivedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedField")
            .field("target", &self.target)
            .field("transform_id", &self.transform_id)
            .finish()
    }
}

/// A field copied verbatim from another field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyField {
    pub target: FieldPath,
    pub source: FieldPath,
}

/// Executable form of an [`Instruction`].
#[derive(Debug, Clone)]
pub struct CompiledInstruction {
    pub collection: String,
    pub derived: Vec<DerivedField>,
    pub copies: Vec<CopyField>,
    pub removals: Vec<FieldPath>,
}

impl CompiledInstruction {
    pub fn rule_count(&self) -> usize {
        self.derived.len() + self.copies.len() + self.removals.len()
    }
}

/// Validates a target collection name.
pub fn validate_collection_name(name: &str) -> Result<(), CompileError> {
    let invalid = |reason: &str| Err(CompileError::InvalidInstruction(reason.to_string()));

    if name.trim().is_empty() {
        return invalid("collection name cannot be empty");
    }
    if name.len() > MAX_COLLECTION_NAME_LEN {
        return invalid("collection name too long (max 120 characters)");
    }
    if name.contains('\0') || name.contains('$') {
        return invalid("collection name cannot contain '$' or NUL characters");
    }
    Ok(())
}

pub struct TransformCompiler<'a> {
    registry: &'a TransformRegistry,
}

impl<'a> TransformCompiler<'a> {
    pub fn new(registry: &'a TransformRegistry) -> Self {
        Self { registry }
    }

    pub fn compile(&self, instruction: &Instruction) -> Result<CompiledInstruction, CompileError> {
        validate_collection_name(&instruction.collection)?;

        let mut derived = Vec::with_capacity(instruction.add_with_transform.len());
        for rule in &instruction.add_with_transform {
            let target = writable_path(&rule.target)?;
            let transform = self.registry.resolve(&rule.transform)?;
            derived.push(DerivedField {
                target,
                transform_id: rule.transform.clone(),
                transform,
            });
        }

        let mut copies = Vec::with_capacity(instruction.add_from_old.len());
        for rule in &instruction.add_from_old {
            copies.push(CopyField {
                target: writable_path(&rule.target)?,
                source: FieldPath::parse(&rule.from)?,
            });
        }

        let mut removals: Vec<FieldPath> = Vec::with_capacity(instruction.remove_old.len());
        for rule in &instruction.remove_old {
            let path = writable_path(&rule.field)?;
            if !removals.contains(&path) {
                removals.push(path);
            }
        }

        let compiled = CompiledInstruction {
            collection: instruction.collection.clone(),
            derived,
            copies,
            removals,
        };
        check_conflicts(&compiled)?;
        Ok(compiled)
    }
}

fn writable_path(raw: &str) -> Result<FieldPath, CompileError> {
    let path = FieldPath::parse(raw)?;
    if path.is_id() {
        return Err(CompileError::ImmutableField(raw.to_string()));
    }
    Ok(path)
}

// The store refuses an update whose set and unset paths overlap, and a single
// update cannot set both a field and one of its ancestors.
fn check_conflicts(compiled: &CompiledInstruction) -> Result<(), CompileError> {
    let targets: Vec<&FieldPath> = compiled
        .derived
        .iter()
        .map(|rule| &rule.target)
        .chain(compiled.copies.iter().map(|rule| &rule.target))
        .collect();

    for (i, a) in targets.iter().enumerate() {
        for b in &targets[i + 1..] {
            if a != b && a.overlaps(b) {
                return Err(CompileError::ConflictingPaths(a.to_string(), b.to_string()));
            }
        }
        for removal in &compiled.removals {
            if a.overlaps(removal) {
                return Err(CompileError::ConflictingPaths(a.to_string(), removal.to_string()));
            }
        }
    }

    for (i, a) in compiled.removals.iter().enumerate() {
        for b in &compiled.removals[i + 1..] {
            if a.overlaps(b) {
                return Err(CompileError::ConflictingPaths(a.to_string(), b.to_string()));
            }
        }
    }
    Ok(())
}
