//! Attribute target keywords and applicability.
//!
//! Two related but separate notions live here:
//! - [`AttributeLocation`] / [`AttributeLocations`]: the `target:` keywords a declaration
//!   accepts in front of an attribute (`[return: X]`). The accepted set depends only on the
//!   kind of declaration.
//! - [`AttributeTargets`]: the CLR `System.AttributeTargets` bits an attribute class names in
//!   its `AttributeUsage` to say which declarations it may be applied to.

use std::fmt;

use bitflags::bitflags;
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::metadata::symbols::{MethodKind, Symbol, SymbolData, SymbolKind, TypeKind};

/// A `target:` keyword.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, IntoStaticStr, EnumIter,
)]
pub enum AttributeLocation {
    /// `assembly`
    #[strum(serialize = "assembly")]
    Assembly,
    /// `module`
    #[strum(serialize = "module")]
    Module,
    /// `type`
    #[strum(serialize = "type")]
    Type,
    /// `method`
    #[strum(serialize = "method")]
    Method,
    /// `field`
    #[strum(serialize = "field")]
    Field,
    /// `property`
    #[strum(serialize = "property")]
    Property,
    /// `event`
    #[strum(serialize = "event")]
    Event,
    /// `param`
    #[strum(serialize = "param")]
    Parameter,
    /// `return`
    #[strum(serialize = "return")]
    Return,
    /// `typevar`
    #[strum(serialize = "typevar")]
    TypeVar,
}

impl AttributeLocation {
    /// The keyword as written in source.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        self.into()
    }

    /// The single-location set.
    #[must_use]
    pub fn as_set(self) -> AttributeLocations {
        match self {
            AttributeLocation::Assembly => AttributeLocations::ASSEMBLY,
            AttributeLocation::Module => AttributeLocations::MODULE,
            AttributeLocation::Type => AttributeLocations::TYPE,
            AttributeLocation::Method => AttributeLocations::METHOD,
            AttributeLocation::Field => AttributeLocations::FIELD,
            AttributeLocation::Property => AttributeLocations::PROPERTY,
            AttributeLocation::Event => AttributeLocations::EVENT,
            AttributeLocation::Parameter => AttributeLocations::PARAMETER,
            AttributeLocation::Return => AttributeLocations::RETURN,
            AttributeLocation::TypeVar => AttributeLocations::TYPE_VAR,
        }
    }
}

impl fmt::Display for AttributeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// A set of `target:` keywords
    pub struct AttributeLocations: u16 {
        /// `assembly`
        const ASSEMBLY = 0x0001;
        /// `module`
        const MODULE = 0x0002;
        /// `type`
        const TYPE = 0x0004;
        /// `method`
        const METHOD = 0x0008;
        /// `field`
        const FIELD = 0x0010;
        /// `property`
        const PROPERTY = 0x0020;
        /// `event`
        const EVENT = 0x0040;
        /// `param`
        const PARAMETER = 0x0080;
        /// `return`
        const RETURN = 0x0100;
        /// `typevar`
        const TYPE_VAR = 0x0200;
    }
}

impl AttributeLocations {
    /// Whether `location` is in the set.
    #[must_use]
    pub fn allows(self, location: AttributeLocation) -> bool {
        self.contains(location.as_set())
    }

    /// The locations in keyword order.
    pub fn locations(self) -> impl Iterator<Item = AttributeLocation> {
        AttributeLocation::iter().filter(move |location| self.allows(*location))
    }
}

impl fmt::Display for AttributeLocations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keywords: Vec<&str> = self.locations().map(AttributeLocation::keyword).collect();
        f.write_str(&keywords.join(", "))
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// `System.AttributeTargets`
    pub struct AttributeTargets: u32 {
        /// Assembly
        const ASSEMBLY = 0x0001;
        /// Module
        const MODULE = 0x0002;
        /// Class
        const CLASS = 0x0004;
        /// Struct
        const STRUCT = 0x0008;
        /// Enum
        const ENUM = 0x0010;
        /// Constructor
        const CONSTRUCTOR = 0x0020;
        /// Method
        const METHOD = 0x0040;
        /// Property
        const PROPERTY = 0x0080;
        /// Field
        const FIELD = 0x0100;
        /// Event
        const EVENT = 0x0200;
        /// Interface
        const INTERFACE = 0x0400;
        /// Parameter
        const PARAMETER = 0x0800;
        /// Delegate
        const DELEGATE = 0x1000;
        /// Return value
        const RETURN_VALUE = 0x2000;
        /// Generic parameter
        const GENERIC_PARAMETER = 0x4000;
        /// Everything
        const ALL = 0x7FFF;
    }
}

impl AttributeTargets {
    const NAMES: [(AttributeTargets, &'static str); 15] = [
        (AttributeTargets::ASSEMBLY, "assembly"),
        (AttributeTargets::MODULE, "module"),
        (AttributeTargets::CLASS, "class"),
        (AttributeTargets::STRUCT, "struct"),
        (AttributeTargets::ENUM, "enum"),
        (AttributeTargets::CONSTRUCTOR, "constructor"),
        (AttributeTargets::METHOD, "method"),
        (AttributeTargets::PROPERTY, "property, indexer"),
        (AttributeTargets::FIELD, "field"),
        (AttributeTargets::EVENT, "event"),
        (AttributeTargets::INTERFACE, "interface"),
        (AttributeTargets::PARAMETER, "parameter"),
        (AttributeTargets::DELEGATE, "delegate"),
        (AttributeTargets::RETURN_VALUE, "return"),
        (AttributeTargets::GENERIC_PARAMETER, "type parameter"),
    ];
}

impl fmt::Display for AttributeTargets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = AttributeTargets::NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&names.join(", "))
    }
}

/// The `target:` keywords `symbol` accepts.
///
/// The result is a function of the declaration kind only:
///
/// | Declaration | Locations |
/// |---|---|
/// | class, struct, interface, enum | `type` |
/// | delegate | `type, return` |
/// | method, getter | `method, return` |
/// | setter, `add`, `remove` | `method, param, return` |
/// | field-like event with a backing field | `method, field, event` |
/// | field-like event in an interface | `method, event` |
/// | event with accessors | `event` |
#[must_use]
pub fn applicable_locations(symbol: &Symbol) -> AttributeLocations {
    match &symbol.data {
        SymbolData::Assembly(_) => AttributeLocations::ASSEMBLY,
        SymbolData::Module => AttributeLocations::MODULE,
        SymbolData::Type(t) if t.kind == TypeKind::Delegate => {
            AttributeLocations::TYPE | AttributeLocations::RETURN
        }
        SymbolData::Type(_) => AttributeLocations::TYPE,
        SymbolData::Method(m) => match m.kind {
            MethodKind::PropertySet | MethodKind::EventAdd | MethodKind::EventRemove => {
                AttributeLocations::METHOD | AttributeLocations::PARAMETER | AttributeLocations::RETURN
            }
            _ => AttributeLocations::METHOD | AttributeLocations::RETURN,
        },
        SymbolData::Field(_) => AttributeLocations::FIELD,
        SymbolData::Property(_) => AttributeLocations::PROPERTY,
        SymbolData::Event(e) if e.is_field_like => {
            let mut locations = AttributeLocations::METHOD | AttributeLocations::EVENT;
            if e.backing_field.is_some() {
                locations |= AttributeLocations::FIELD;
            }
            locations
        }
        SymbolData::Event(_) => AttributeLocations::EVENT,
        SymbolData::Parameter(_) => AttributeLocations::PARAMETER,
        SymbolData::TypeParameter(_) => AttributeLocations::TYPE_VAR,
        SymbolData::ReturnValue(_) => AttributeLocations::RETURN,
    }
}

/// The location an attribute without a `target:` keyword applies to.
#[must_use]
pub fn default_location(symbol: &Symbol) -> AttributeLocation {
    match symbol.kind() {
        SymbolKind::Assembly => AttributeLocation::Assembly,
        SymbolKind::Module => AttributeLocation::Module,
        SymbolKind::Type(_) => AttributeLocation::Type,
        SymbolKind::Method(_) => AttributeLocation::Method,
        SymbolKind::Field => AttributeLocation::Field,
        SymbolKind::Property => AttributeLocation::Property,
        SymbolKind::Event => AttributeLocation::Event,
        SymbolKind::Parameter => AttributeLocation::Parameter,
        SymbolKind::TypeParameter => AttributeLocation::TypeVar,
        SymbolKind::ReturnValue => AttributeLocation::Return,
    }
}

/// The `AttributeTargets` bit describing `symbol`.
#[must_use]
pub fn symbol_targets(symbol: &Symbol) -> AttributeTargets {
    match symbol.kind() {
        SymbolKind::Assembly => AttributeTargets::ASSEMBLY,
        SymbolKind::Module => AttributeTargets::MODULE,
        SymbolKind::Type(TypeKind::Class) => AttributeTargets::CLASS,
        SymbolKind::Type(TypeKind::Struct) => AttributeTargets::STRUCT,
        SymbolKind::Type(TypeKind::Interface) => AttributeTargets::INTERFACE,
        SymbolKind::Type(TypeKind::Enum) => AttributeTargets::ENUM,
        SymbolKind::Type(TypeKind::Delegate) => AttributeTargets::DELEGATE,
        SymbolKind::Method(MethodKind::Constructor) => AttributeTargets::CONSTRUCTOR,
        SymbolKind::Method(_) => AttributeTargets::METHOD,
        SymbolKind::Field => AttributeTargets::FIELD,
        SymbolKind::Property => AttributeTargets::PROPERTY,
        SymbolKind::Event => AttributeTargets::EVENT,
        SymbolKind::Parameter => AttributeTargets::PARAMETER,
        SymbolKind::TypeParameter => AttributeTargets::GENERIC_PARAMETER,
        SymbolKind::ReturnValue => AttributeTargets::RETURN_VALUE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn keywords_parse() {
        assert_eq!(AttributeLocation::from_str("return").ok(), Some(AttributeLocation::Return));
        assert_eq!(AttributeLocation::from_str("param").ok(), Some(AttributeLocation::Parameter));
        assert!(AttributeLocation::from_str("Return").is_err());
        assert!(AttributeLocation::from_str("foo").is_err());
        assert_eq!(AttributeLocation::TypeVar.keyword(), "typevar");
    }

    #[test]
    fn location_sets_print_in_keyword_order() {
        let set = AttributeLocations::RETURN | AttributeLocations::METHOD | AttributeLocations::PARAMETER;
        assert_eq!(set.to_string(), "method, param, return");
        assert!(set.allows(AttributeLocation::Parameter));
        assert!(!set.allows(AttributeLocation::Field));
    }

    #[test]
    fn targets_print_like_the_compiler() {
        let targets = AttributeTargets::CLASS | AttributeTargets::STRUCT;
        assert_eq!(targets.to_string(), "class, struct");
        assert!(AttributeTargets::ALL.contains(AttributeTargets::GENERIC_PARAMETER));
    }
}
