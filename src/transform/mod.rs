//! Transform rules: the registry of named derived-field functions and the
//! compiler that turns an [`Instruction`](crate::Instruction) into executable
//! rule sets.

pub mod builtins;
pub mod compiler;
pub mod registry;

pub use compiler::{CompiledInstruction, CopyField, DerivedField, TransformCompiler, validate_collection_name};
pub use registry::{TransformFn, TransformRegistry, validate_transform_id};
