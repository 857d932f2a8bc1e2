// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # cilattr
//!
//! The custom-attribute subsystem of a managed-code compiler targeting ECMA-335 metadata,
//! written in pure Rust.
//!
//! `cilattr` takes attribute usages written on declarations, binds them to attribute classes
//! and constructors, validates and decodes the attributes the compiler itself understands,
//! adds the attributes the compiler synthesizes, merges the assembly-level attributes of
//! linked net-modules, and writes the result as custom-attribute table rows with
//! byte-exact value blobs.
//!
//! ## Features
//!
//! - **Binding** - attribute class lookup through namespaces and `using` directives,
//!   constructor overload resolution, named arguments, `target:` specifiers
//! - **Well-known attributes** - assembly identity (`AssemblyVersion`, `AssemblyCulture`,
//!   `AssemblyFlags`, `AssemblyAlgorithmId`, ...), `InternalsVisibleTo`, caller-info
//!   markers, `AttributeUsage` and `Obsolete`
//! - **Synthesis** - `Dynamic` transform flags, `IsReadOnly`, `IsByRefLike` and
//!   `IsUnmanaged` markers, with marker types synthesized at most once per compilation
//! - **Merge** - de-duplication of net-module assembly attributes, with source taking
//!   precedence
//! - **Encoding** - ECMA-335 II.23.3 custom-attribute blobs, with a depth-limited decoder for
//!   the reverse direction
//! - **Concurrency** - every per-symbol result is memoized write-once, and the full pass runs
//!   on rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use cilattr::prelude::*;
//!
//! let mut builder = CompilationBuilder::new("App", CompilationOptions::library());
//! let corlib = builder.corlib()?;
//! let class = builder
//!     .declarations()
//!     .add_type(None, TypeDecl::class("N", "C").base(TypeSig::named(corlib.object)))?;
//! builder
//!     .declarations()
//!     .add_field(class, FieldDecl::new("F", TypeSig::sz_array(TypeSig::Dynamic)))?;
//!
//! let compilation = builder.build();
//! assert!(!compilation.diagnostics()?.has_errors());
//!
//! let mut writer = InMemoryMetadataWriter::new();
//! let outcome = compilation.emit(&mut writer)?;
//! assert!(outcome.rows > 0);
//! # Ok::<(), cilattr::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Compiler diagnostics are values, collected in [`metadata::diagnostics::Diagnostics`].
//! [`Error`] only reports operational failures:
//!
//! ```rust
//! use cilattr::{Error, metadata::customattributes::decode_custom_attribute};
//!
//! match decode_custom_attribute(&[0x01, 0x00, 0x05], &[]) {
//!     Err(Error::Malformed { message, .. }) => println!("Malformed blob: {message}"),
//!     Err(e) => println!("Other error: {e}"),
//!     Ok(value) => println!("{} named argument(s)", value.named_args.len()),
//! }
//! ```
//!
//! ## Standards Compliance
//!
//! Blob layouts, table rows and `AttributeTargets` values follow the **ECMA-335
//! specification** (6th edition).

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use cilattr::prelude::*;
///
/// let options = CompilationOptions::library().with_deterministic(true);
/// let compilation = CompilationBuilder::new("App", options).build();
/// assert!(compilation.table().references().is_empty());
/// ```
pub mod prelude;

/// Compilations: declarations, references, options and the attribute pipeline over them.
///
/// # Key Types
///
/// - [`compilation::CompilationBuilder`] - collects declarations and net-modules
/// - [`compilation::Compilation`] - the memoized attribute queries and emit
/// - [`compilation::CompilationOptions`] - output kind, determinism, marker synthesis
/// - [`compilation::Corlib`] - the standard core library declarations
/// - [`compilation::SpeculativeModel`] - queries that never reach the compilation
pub mod compilation;

/// Attribute binding, decoding, synthesis, merging and emission over ECMA-335 metadata.
///
/// # Key Components
///
/// - [`metadata::symbols`] - the declared symbol graph and its builder
/// - [`metadata::syntax`] - attribute usages as written
/// - [`metadata::binder`] - binding usages to classes, constructors and constants
/// - [`metadata::wellknown`] - attributes the compiler understands
/// - [`metadata::synthesis`] - attributes the compiler adds
/// - [`metadata::merge`] - net-module assembly attribute merging
/// - [`metadata::customattributes`] - value model and blob codec
/// - [`metadata::emit`] - tokens, rows and heaps
/// - [`metadata::diagnostics`] - compiler diagnostics
pub mod metadata;

/// Low-level helpers: compressed integers, checked narrowing, cancellation.
pub mod utils;

/// `cilattr` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `cilattr` Error type
///
/// The error type for operational failures: malformed blobs, foreign symbol ids,
/// cancellation, and emit requests that diagnostics block.
///
/// # Examples
///
/// ```rust
/// use cilattr::prelude::*;
///
/// let mut builder = CompilationBuilder::new("App", CompilationOptions::library());
/// builder.corlib()?;
/// builder.declarations().add_assembly_attribute(
///     AttributeSyntax::new("System.Reflection.AssemblyVersion").arg(Expression::string("1.*")),
/// );
/// let compilation = builder.build();
///
/// match compilation.emit(&mut InMemoryMetadataWriter::new()) {
///     Err(Error::EmitFailed { errors }) => assert_eq!(errors, 1),
///     other => panic!("unexpected {other:?}"),
/// }
/// # Ok::<(), cilattr::Error>(())
/// ```
pub use error::Error;

/// Cursor-based reader for custom-attribute blobs.
///
/// # Example
///
/// ```rust
/// use cilattr::Parser;
///
/// let mut parser = Parser::new(&[0x81, 0x00]);
/// assert_eq!(parser.read_compressed_uint()?, 0x100);
/// # Ok::<(), cilattr::Error>(())
/// ```
pub use file::parser::Parser;
