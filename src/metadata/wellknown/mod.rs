//! Well-known attributes: attribute classes the compiler recognizes by full name and whose
//! presence changes the emitted metadata or the meaning of the attributed symbol.
//!
//! Recognition happens once per bound attribute through
//! [`WellKnownAttributeKind::from_full_name`]. The [`WellKnownDecoder`] then validates the
//! arguments of each recognized instance and accumulates the results into a
//! [`WellKnownData`] per symbol:
//!
//! - assembly identity (`AssemblyVersion`, `AssemblyCulture`, `AssemblyFlags`, ...)
//! - friend assemblies (`InternalsVisibleTo`)
//! - caller-info substitution on parameters
//! - `AttributeUsage` on attribute classes and `Obsolete` on members
//!
//! # Examples
//!
//! ```rust
//! use cilattr::metadata::wellknown::WellKnownAttributeKind;
//!
//! let kind = WellKnownAttributeKind::from_full_name("System.Reflection.AssemblyVersionAttribute");
//! assert_eq!(kind, Some(WellKnownAttributeKind::AssemblyVersion));
//!
//! // A user type named `AssemblyVersionAttribute` in another namespace is ordinary.
//! assert_eq!(WellKnownAttributeKind::from_full_name("My.AssemblyVersionAttribute"), None);
//! ```

mod callerinfo;
mod data;
mod decoder;
mod kinds;
mod version;

pub use callerinfo::{check_caller_info, CallerInfoMarker};
pub use data::{
    AssemblyFlags, AssemblyHashAlgorithm, AssemblyWellKnownData, AttributeUsageInfo,
    CallerInfoData, CallerInfoKind, WellKnownData, WellKnownValue,
};
pub use decoder::{decode_obsolete, decode_usage, WellKnownDecoder};
pub use kinds::WellKnownAttributeKind;
pub use version::{generated_components, parse_version, ParsedVersion, Version, VersionKind};
