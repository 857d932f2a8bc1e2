//! Structural identity of attribute instances.
//!
//! Two instances are identical when they name the same attribute class, use a constructor
//! with the same parameter slot types, and carry equal fixed arguments and equal named
//! arguments. Named arguments are compared as a set keyed by kind and name, so the order in
//! which they were written does not matter.

use crate::metadata::customattributes::types::{
    CustomAttributeValue, NamedArgument, SerType, TypedConstant,
};

/// Hashable identity of one attribute instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeSignatureKey {
    class_name: String,
    constructor: Vec<SerType>,
    fixed_args: Vec<TypedConstant>,
    named_args: Vec<NamedArgument>,
}

impl AttributeSignatureKey {
    /// Build the identity of an instance of `class_name` constructed through a constructor
    /// with parameter slots `constructor`.
    #[must_use]
    pub fn new(class_name: &str, constructor: &[SerType], value: &CustomAttributeValue) -> Self {
        let mut named_args = value.named_args.clone();
        named_args.sort_by(|a, b| (a.kind, &a.name).cmp(&(b.kind, &b.name)));
        AttributeSignatureKey {
            class_name: class_name.to_string(),
            constructor: constructor.to_vec(),
            fixed_args: value.fixed_args.clone(),
            named_args,
        }
    }

    /// The attribute class full name.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::customattributes::NamedArgumentKind;
    use std::collections::HashSet;

    fn named(name: &str, value: bool) -> NamedArgument {
        NamedArgument {
            kind: NamedArgumentKind::Property,
            name: name.into(),
            value: TypedConstant::bool(value),
        }
    }

    #[test]
    fn named_argument_order_is_ignored() {
        let a = CustomAttributeValue {
            fixed_args: vec![],
            named_args: vec![named("A", true), named("B", false)],
        };
        let b = CustomAttributeValue {
            fixed_args: vec![],
            named_args: vec![named("B", false), named("A", true)],
        };
        let mut set = HashSet::new();
        set.insert(AttributeSignatureKey::new("X", &[], &a));
        assert!(!set.insert(AttributeSignatureKey::new("X", &[], &b)));
    }

    #[test]
    fn constructor_and_class_matter() {
        let v = CustomAttributeValue {
            fixed_args: vec![TypedConstant::string("x")],
            named_args: vec![],
        };
        let base = AttributeSignatureKey::new("X", &[SerType::String], &v);
        assert_ne!(base, AttributeSignatureKey::new("Y", &[SerType::String], &v));
        assert_ne!(base, AttributeSignatureKey::new("X", &[SerType::Object], &v));
        assert_eq!(base.class_name(), "X");
    }
}
