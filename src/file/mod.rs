//! Byte-level access to custom-attribute blobs.
//!
//! Blobs arrive either from auxiliary net-modules (their assembly-level custom attributes are
//! stored pre-encoded) or from this crate's own encoder during round-trip checks. Both are read
//! through the bounds-checked [`parser::Parser`].

pub mod io;
pub mod parser;
