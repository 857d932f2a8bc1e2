//! Custom-attribute emission.
//!
//! The [`AttributeEmitter`] turns the final attribute set of a compilation into rows:
//! every emittable attribute becomes one `CustomAttribute` row owned by its symbol's token,
//! with the encoded value blob and the token of its constructor. Constructors in the
//! compilation are `MethodDef` tokens; everything else is referenced through `MemberRef`
//! rows whose parents are `TypeRef` rows, all numbered by [`TokenMap`]. Rows are handed to
//! a [`MetadataWriter`], which owns the binary table and heap layout.
//!
//! When the output is a net-module, assembly attributes have no Assembly row to attach to
//! and are written on a reference to [`ASSEMBLY_ATTRIBUTES_GO_HERE`] instead, to be merged
//! by whichever assembly links the module.

mod emitter;
mod tokens;
mod writer;

pub use emitter::{AttributeEmitter, EmitInput, EmitOutcome, LinkedFile};
pub use tokens::{
    token_bytes, MarkerTokens, MemberRefKey, MemberRefRow, TokenMap, ASSEMBLY_ATTRIBUTES_GO_HERE,
};
pub use writer::{
    AssemblyRow, CustomAttributeRow, FileHashRow, InMemoryMetadataWriter, MetadataWriter,
    StoredAssemblyRow,
};
