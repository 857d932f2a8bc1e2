//! Transform flags: the flattened boolean description of where `dynamic` occurs in a type.
//!
//! The type is walked in pre-order and every node contributes exactly one flag:
//!
//! - `dynamic` contributes `true`
//! - an array (any rank) or pointer contributes `false`, followed by its element type
//! - a named type contributes `false`, followed by each of its type arguments (outermost
//!   containing type's arguments first)
//! - every other type contributes `false`
//!
//! A by-reference parameter or return value is prefixed with one extra `false` for the
//! reference itself. Readers of the emitted assembly replay the same walk, so the order is
//! part of the binary contract.

use crate::metadata::{symbols::RefKind, typesystem::TypeSig};

/// The `DynamicAttribute` a signature needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DynamicTransform {
    /// No `dynamic` anywhere; no attribute
    None,
    /// The signature is exactly `dynamic`; the parameterless constructor
    Simple,
    /// The flags constructor with the flattened flags
    Flags(Vec<bool>),
}

/// Flatten `ty` into its transform flags.
///
/// # Examples
///
/// ```rust
/// use cilattr::metadata::{symbols::RefKind, synthesis::transform_flags, typesystem::TypeSig};
///
/// let flags = transform_flags(&TypeSig::sz_array(TypeSig::Dynamic), RefKind::None);
/// assert_eq!(flags, vec![false, true]);
/// ```
#[must_use]
pub fn transform_flags(ty: &TypeSig, ref_kind: RefKind) -> Vec<bool> {
    let mut flags = Vec::new();
    if ref_kind.is_by_ref() {
        flags.push(false);
    }
    flatten(ty, &mut flags);
    flags
}

fn flatten(ty: &TypeSig, flags: &mut Vec<bool>) {
    match ty {
        TypeSig::Dynamic => flags.push(true),
        TypeSig::SzArray(element) | TypeSig::Array { element, .. } | TypeSig::Pointer(element) => {
            flags.push(false);
            flatten(element, flags);
        }
        TypeSig::Named { args, .. } => {
            flags.push(false);
            for arg in args {
                flatten(arg, flags);
            }
        }
        _ => flags.push(false),
    }
}

/// Decide which `DynamicAttribute` constructor, if any, a signature needs.
#[must_use]
pub fn dynamic_transform(ty: &TypeSig, ref_kind: RefKind) -> DynamicTransform {
    if !ty.contains_dynamic() {
        return DynamicTransform::None;
    }
    let flags = transform_flags(ty, ref_kind);
    if flags == [true] {
        DynamicTransform::Simple
    } else {
        DynamicTransform::Flags(flags)
    }
}
