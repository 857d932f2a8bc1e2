//! The result of binding one attribute usage.

use crate::metadata::{
    customattributes::{AttributeSignatureKey, CustomAttributeValue, SerType, TypedConstant},
    symbols::{AttributeLocation, SymbolId},
    synthesis::MarkerKind,
    syntax::Location,
    wellknown::WellKnownAttributeKind,
};

/// The constructor an attribute instance is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstructorRef {
    /// A constructor in the symbol table
    Method(SymbolId),
    /// A constructor of a marker type synthesized into the output; `flags` selects the
    /// `bool[]` overload of `DynamicAttribute`
    Synthesized {
        /// Marker type
        marker: MarkerKind,
        /// The flags constructor
        flags: bool,
    },
    /// A constructor read from a net-module that does not resolve in this compilation
    External,
}

/// Where an attribute instance came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeSource {
    /// Written in source
    Source,
    /// Read from a referenced assembly
    Imported,
    /// Added by the compiler
    Synthesized,
    /// Read from the net-module at this index of the linked module list
    NetModule(usize),
}

/// An attribute usage bound to a class, a constructor and constant arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundAttribute {
    /// Reflection full name of the attribute class
    pub class_name: String,
    /// The attribute class, when it is in the symbol table
    pub class: Option<SymbolId>,
    /// The constructor
    pub constructor: ConstructorRef,
    /// Slot types of the constructor parameters
    pub constructor_params: Vec<SerType>,
    /// Constructor and named arguments
    pub value: CustomAttributeValue,
    /// The symbol the attribute applies to, after target routing
    pub owner: SymbolId,
    /// The symbol whose declaration carries the usage
    pub declared_on: SymbolId,
    /// Position of the usage
    pub location: Location,
    /// The resolved attribute location
    pub target: AttributeLocation,
    /// Binding reported an error for this usage
    pub has_errors: bool,
    /// The usage sits in a block with an invalid target specifier
    pub ignored_location: bool,
    /// Dropped as a structural duplicate while merging net-module attributes
    pub duplicate_suppressed: bool,
    /// Origin
    pub source: AttributeSource,
    /// Well-known kind of the class
    pub well_known: Option<WellKnownAttributeKind>,
}

impl BoundAttribute {
    /// Whether the attribute is of well-known `kind`.
    #[must_use]
    pub fn is(&self, kind: WellKnownAttributeKind) -> bool {
        self.well_known == Some(kind)
    }

    /// Whether the attribute belongs in the custom-attribute table.
    #[must_use]
    pub fn is_emittable(&self) -> bool {
        !self.has_errors
            && !self.ignored_location
            && !self.duplicate_suppressed
            && !self.well_known.is_some_and(WellKnownAttributeKind::is_pseudo_custom)
    }

    /// The `index`th constructor argument.
    #[must_use]
    pub fn fixed(&self, index: usize) -> Option<&TypedConstant> {
        self.value.fixed_args.get(index)
    }

    /// The named argument `name`.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&TypedConstant> {
        self.value.named(name)
    }

    /// Structural identity used for duplicate detection.
    #[must_use]
    pub fn signature_key(&self) -> AttributeSignatureKey {
        AttributeSignatureKey::new(&self.class_name, &self.constructor_params, &self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::customattributes::{NamedArgument, NamedArgumentKind};

    fn description(text: &str) -> BoundAttribute {
        BoundAttribute {
            class_name: "System.Reflection.AssemblyDescriptionAttribute".into(),
            class: None,
            constructor: ConstructorRef::External,
            constructor_params: vec![SerType::String],
            value: CustomAttributeValue {
                fixed_args: vec![TypedConstant::string(text)],
                named_args: Vec::new(),
            },
            owner: SymbolId::new(0),
            declared_on: SymbolId::new(0),
            location: Location::none(),
            target: AttributeLocation::Assembly,
            has_errors: false,
            ignored_location: false,
            duplicate_suppressed: false,
            source: AttributeSource::NetModule(1),
            well_known: Some(WellKnownAttributeKind::AssemblyDescription),
        }
    }

    #[test]
    fn emittable_rules() {
        let attribute = description("Module1");
        assert!(attribute.is_emittable());
        assert!(!BoundAttribute {
            ignored_location: true,
            ..attribute.clone()
        }
        .is_emittable());
        assert!(!BoundAttribute {
            well_known: Some(WellKnownAttributeKind::AssemblyAlgorithmId),
            ..attribute
        }
        .is_emittable());
    }

    #[test]
    fn signature_keys_ignore_named_order() {
        let mut a = description("x");
        let mut b = description("x");
        let first = NamedArgument {
            kind: NamedArgumentKind::Property,
            name: "A".into(),
            value: TypedConstant::i4(1),
        };
        let second = NamedArgument {
            kind: NamedArgumentKind::Field,
            name: "B".into(),
            value: TypedConstant::i4(2),
        };
        a.value.named_args = vec![first.clone(), second.clone()];
        b.value.named_args = vec![second, first];
        assert_eq!(a.signature_key(), b.signature_key());
        assert_ne!(a.signature_key(), description("y").signature_key());
    }
}
