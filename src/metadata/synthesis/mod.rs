//! Attributes the compiler adds on its own.
//!
//! Some language features have no metadata representation of their own and are recorded
//! with marker attributes instead: `dynamic` in a signature, `in` parameters and
//! `ref readonly` returns, `readonly` and `ref` structs, and `unmanaged` constraints. The
//! [`SynthesisEngine`] computes those attributes per symbol, and the assembly-level
//! `CompilationRelaxations` and `RuntimeCompatibility` attributes for the manifest.
//!
//! A marker type is taken from the compilation or its references when a type with the
//! exact full name exists. Otherwise it is synthesized into the output as an internal type
//! carrying `Embedded` and `CompilerGenerated`, through the [`MarkerRegistry`], which
//! admits each marker at most once per compilation. Speculative queries work on a
//! [`MarkerRegistry::fork`] so that nothing they request is ever emitted.

mod engine;
mod markers;
mod registry;
mod transforms;

pub use engine::{strips_markers, MarkerTypeDefinition, SynthesisEngine};
pub use markers::MarkerKind;
pub use registry::MarkerRegistry;
pub use transforms::{dynamic_transform, transform_flags, DynamicTransform};
