//! Attribute binding, decoding, synthesis, merging and emission.
//!
//! The modules follow the pipeline order: declarations ([`symbols`], [`syntax`]) are bound
//! ([`binder`]), recognized attributes are decoded ([`wellknown`]), compiler-added attributes
//! are computed ([`synthesis`]), net-module attributes are folded in ([`merge`]), and the
//! result is encoded ([`customattributes`]) and written ([`emit`]). Everything reports
//! through [`diagnostics`].

pub mod binder;
pub mod customattributes;
pub mod diagnostics;
pub mod emit;
pub mod merge;
pub mod symbols;
pub mod synthesis;
pub mod syntax;
pub mod token;
pub mod typesystem;
pub mod wellknown;
