//! # cilattr Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the cilattr library. Import it to declare a compilation, query its attributes and
//! emit them.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all cilattr operations
pub use crate::Error;

/// The result type used throughout cilattr
pub use crate::Result;

/// Low-level blob parsing
pub use crate::Parser;

/// Cooperative cancellation of the attribute pass
pub use crate::utils::CancellationToken;

// ================================================================================================
// Compilations
// ================================================================================================

/// Building and querying a compilation
pub use crate::compilation::{
    Compilation, CompilationBuilder, CompilationOptions, Corlib, NetModule, OutputKind,
    SpeculativeModel, SpeculativeResult,
};

// ================================================================================================
// Declarations and Syntax
// ================================================================================================

/// Symbols and the declaration builder
pub use crate::metadata::symbols::{
    AttributeLocation, AttributeTargets, EventDecl, FieldDecl, ImportedAttribute, MethodDecl,
    ParameterDecl, PropertyDecl, RefKind, Symbol, SymbolId, SymbolKind, SymbolTable,
    SymbolTableBuilder, TypeDecl, TypeParameterDecl,
};

/// Attribute usages as written
pub use crate::metadata::syntax::{AttributeSyntax, Expression, Location};

/// Structural types
pub use crate::metadata::typesystem::{PrimitiveType, TypeSig};

// ================================================================================================
// Attributes
// ================================================================================================

/// Bound attributes
pub use crate::metadata::binder::{AttributeSource, BoundAttribute, ConstructorRef};

/// Attribute values and the blob codec
pub use crate::metadata::customattributes::{
    decode_custom_attribute, encode_custom_attribute, ConstantValue, CustomAttributeValue,
    NamedArgument, NamedArgumentKind, SerType, TypedConstant,
};

/// Well-known attributes
pub use crate::metadata::wellknown::{
    AssemblyHashAlgorithm, CallerInfoKind, Version, WellKnownAttributeKind, WellKnownValue,
};

/// Compiler-added attributes
pub use crate::metadata::synthesis::{transform_flags, MarkerKind};

// ================================================================================================
// Diagnostics and Emit
// ================================================================================================

/// Compiler diagnostics
pub use crate::metadata::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSeverity, Diagnostics};

/// Writing rows
pub use crate::metadata::emit::{EmitOutcome, InMemoryMetadataWriter, MetadataWriter};

/// Metadata tokens
pub use crate::metadata::token::Token;
