//! The declaration graph.
//!
//! Every declared entity (assembly, module, type, method, field, property, event, parameter,
//! type parameter and the return-value pseudo-symbol of each method) is a [`Symbol`] stored in
//! a [`SymbolTable`] and addressed by a [`SymbolId`]. The table is immutable once built; the
//! only state that gets filled in later lives outside of it, in the compilation's memo slots.
//!
//! Symbols come from three places, recorded in [`SymbolOrigin`]:
//! - **Source** - declared by the program being compiled; carries [`AttributeSyntax`] lists
//! - **Referenced** - imported from a referenced assembly; carries [`ImportedAttribute`]s
//! - **Embedded** - a referenced type copied by value into the output (interop embedding);
//!   compiler marker attributes are stripped on import
//!
//! # Key Components
//!
//! - [`SymbolTable`] - storage, name lookup and display helpers
//! - [`SymbolTableBuilder`] - the declaration phase, with [`TypeDecl`], [`MethodDecl`] and friends
//! - [`AttributeLocation`], [`AttributeLocations`], [`AttributeTargets`] - attribute target rules

mod builder;
mod locations;
mod table;

pub use builder::{
    EventDecl, FieldDecl, MethodDecl, ParameterDecl, PropertyDecl, SymbolTableBuilder, TypeDecl,
    TypeParameterDecl,
};
pub use locations::{
    applicable_locations, default_location, symbol_targets, AttributeLocation,
    AttributeLocations, AttributeTargets,
};
pub use table::SymbolTable;

use std::fmt;

use crate::metadata::{
    customattributes::{ConstantValue, CustomAttributeValue, SerType},
    syntax::{AttributeSyntax, Location},
    typesystem::{PrimitiveType, TypeSig},
    wellknown::Version,
};

/// Index of a symbol in its [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    /// Wrap a raw index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        SymbolId(index)
    }

    /// The raw index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Flavor of a type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// `class`
    Class,
    /// `struct`
    Struct,
    /// `interface`
    Interface,
    /// `enum`
    Enum,
    /// `delegate`
    Delegate,
}

/// Flavor of a method declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// An ordinary method
    Ordinary,
    /// An instance constructor
    Constructor,
    /// Property getter
    PropertyGet,
    /// Property setter
    PropertySet,
    /// Event `add` accessor
    EventAdd,
    /// Event `remove` accessor
    EventRemove,
    /// The `Invoke` method of a delegate type
    DelegateInvoke,
    /// A user-defined operator
    Operator,
    /// A user-defined conversion
    Conversion,
    /// An explicit interface implementation
    ExplicitInterfaceImplementation,
    /// The implementing part of a partial method
    PartialImplementation,
    /// The defining part of a partial method
    PartialDefinition,
}

impl MethodKind {
    /// Whether calls to this method never omit optional arguments.
    ///
    /// Delegate `Invoke` methods and indexer accessors are left out: calls through a delegate
    /// or an indexer can still omit arguments, so caller-info markers there are consumed.
    #[must_use]
    pub fn never_omits_arguments(self) -> bool {
        matches!(
            self,
            MethodKind::Operator
                | MethodKind::Conversion
                | MethodKind::ExplicitInterfaceImplementation
                | MethodKind::PartialImplementation
        )
    }

    /// Whether this is a property or event accessor.
    #[must_use]
    pub fn is_accessor(self) -> bool {
        matches!(
            self,
            MethodKind::PropertyGet
                | MethodKind::PropertySet
                | MethodKind::EventAdd
                | MethodKind::EventRemove
        )
    }
}

/// How a parameter or return value is passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RefKind {
    /// By value
    #[default]
    None,
    /// `ref`
    Ref,
    /// `out`
    Out,
    /// `in` parameter
    In,
    /// `ref readonly` return
    RefReadOnly,
}

impl RefKind {
    /// Passed by reference in any form.
    #[must_use]
    pub fn is_by_ref(self) -> bool {
        !matches!(self, RefKind::None)
    }

    /// A read-only reference.
    #[must_use]
    pub fn is_read_only(self) -> bool {
        matches!(self, RefKind::In | RefKind::RefReadOnly)
    }
}

/// Declared accessibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Accessibility {
    /// `public`
    #[default]
    Public,
    /// `internal`
    Internal,
    /// `protected`
    Protected,
    /// `private`
    Private,
}

/// Where a symbol came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolOrigin {
    /// Declared in the program being compiled
    Source,
    /// Imported by identity from the given referenced assembly
    Referenced(SymbolId),
    /// Copied by value from the given referenced assembly
    Embedded(SymbolId),
    /// Created by the compiler; only used for marker types
    Synthesized,
}

impl SymbolOrigin {
    /// Declared in source.
    #[must_use]
    pub fn is_source(self) -> bool {
        matches!(self, SymbolOrigin::Source)
    }
}

/// The kind of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// An assembly
    Assembly,
    /// A module
    Module,
    /// A type
    Type(TypeKind),
    /// A method
    Method(MethodKind),
    /// A field
    Field,
    /// A property
    Property,
    /// An event
    Event,
    /// A parameter
    Parameter,
    /// A type parameter
    TypeParameter,
    /// The return value of a method
    ReturnValue,
}

/// Declared obsolescence of a member.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObsoleteData {
    /// Message shown with the warning
    pub message: Option<String>,
    /// Use is an error instead of a warning
    pub is_error: bool,
}

/// An attribute read from a referenced assembly's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedAttribute {
    /// Attribute class full name
    pub class: String,
    /// Constructor parameter slot types
    pub constructor: Vec<SerType>,
    /// Decoded arguments
    pub value: CustomAttributeValue,
}

impl ImportedAttribute {
    /// An imported attribute with the given constructor arguments.
    #[must_use]
    pub fn new(class: &str, constructor: Vec<SerType>, value: CustomAttributeValue) -> Self {
        ImportedAttribute {
            class: class.to_string(),
            constructor,
            value,
        }
    }

    /// An imported attribute created through the parameterless constructor.
    #[must_use]
    pub fn simple(class: &str) -> Self {
        ImportedAttribute::new(class, Vec::new(), CustomAttributeValue::default())
    }
}

/// Assembly identity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssemblyData {
    /// Four-part version
    pub version: Version,
    /// Culture, empty for neutral
    pub culture: String,
    /// Types of embedded (by value) references
    pub embed_interop_types: bool,
}

/// Type declaration data.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeData {
    /// Flavor
    pub kind: TypeKind,
    /// Namespace, empty for the global namespace or a nested type
    pub namespace: String,
    /// Base type
    pub base: Option<TypeSig>,
    /// Directly implemented interfaces
    pub interfaces: Vec<TypeSig>,
    /// Methods, fields, properties, events and nested types in declaration order
    pub members: Vec<SymbolId>,
    /// Own type parameters
    pub type_parameters: Vec<SymbolId>,
    /// `abstract`
    pub is_abstract: bool,
    /// `sealed`
    pub is_sealed: bool,
    /// `readonly struct`
    pub is_readonly: bool,
    /// `ref struct`
    pub is_ref_like: bool,
    /// Underlying type of an enum
    pub enum_underlying: Option<PrimitiveType>,
    /// `Invoke` of a delegate
    pub invoke: Option<SymbolId>,
}

/// Method declaration data.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodData {
    /// Flavor
    pub kind: MethodKind,
    /// Parameters in order
    pub parameters: Vec<SymbolId>,
    /// The return-value pseudo-symbol
    pub return_value: SymbolId,
    /// Own type parameters
    pub type_parameters: Vec<SymbolId>,
    /// The property or event an accessor belongs to
    pub associated: Option<SymbolId>,
    /// Declared obsolescence
    pub obsolete: Option<ObsoleteData>,
}

/// Field declaration data.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldData {
    /// Field type
    pub ty: TypeSig,
    /// `readonly`
    pub is_readonly: bool,
    /// `const`, with its value in `constant`
    pub is_const: bool,
    /// Value of a constant or an enum member
    pub constant: Option<ConstantValue>,
    /// The field-like event this field backs
    pub associated_event: Option<SymbolId>,
}

/// Property declaration data.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyData {
    /// Property type
    pub ty: TypeSig,
    /// Getter
    pub getter: Option<SymbolId>,
    /// Setter
    pub setter: Option<SymbolId>,
}

/// Event declaration data.
#[derive(Debug, Clone, PartialEq)]
pub struct EventData {
    /// Delegate type
    pub ty: TypeSig,
    /// `add` accessor
    pub adder: SymbolId,
    /// `remove` accessor
    pub remover: SymbolId,
    /// Backing field of a field-like event in a class or struct
    pub backing_field: Option<SymbolId>,
    /// Declared without accessors
    pub is_field_like: bool,
}

/// Parameter declaration data.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterData {
    /// Parameter type
    pub ty: TypeSig,
    /// Passing mode
    pub ref_kind: RefKind,
    /// Zero-based position
    pub ordinal: u16,
    /// Default value of an optional parameter
    pub default_value: Option<ConstantValue>,
    /// `params` array
    pub is_params: bool,
}

/// Type parameter declaration data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParameterData {
    /// Zero-based position
    pub ordinal: u16,
    /// `where T : unmanaged`
    pub has_unmanaged_constraint: bool,
}

/// Return value data.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnValueData {
    /// Return type
    pub ty: TypeSig,
    /// Passing mode
    pub ref_kind: RefKind,
}

/// Kind-specific data of a symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolData {
    /// An assembly
    Assembly(AssemblyData),
    /// A module
    Module,
    /// A type
    Type(TypeData),
    /// A method
    Method(MethodData),
    /// A field
    Field(FieldData),
    /// A property
    Property(PropertyData),
    /// An event
    Event(EventData),
    /// A parameter
    Parameter(ParameterData),
    /// A type parameter
    TypeParameter(TypeParameterData),
    /// A return value
    ReturnValue(ReturnValueData),
}

/// A node in the declaration graph.
#[derive(Debug, Clone)]
pub struct Symbol {
    /// This symbol's id
    pub id: SymbolId,
    /// Simple name (`.ctor` for constructors, empty for return values)
    pub name: String,
    /// Containing symbol
    pub container: Option<SymbolId>,
    /// Origin
    pub origin: SymbolOrigin,
    /// Accessibility
    pub accessibility: Accessibility,
    /// `static`
    pub is_static: bool,
    /// Declaration position
    pub location: Location,
    /// Attribute usages written on this declaration, in declaration order
    pub attribute_lists: Vec<AttributeSyntax>,
    /// Attributes read from metadata
    pub imported_attributes: Vec<ImportedAttribute>,
    /// Kind-specific data
    pub data: SymbolData,
}

impl Symbol {
    /// The kind, derived from the data.
    #[must_use]
    pub fn kind(&self) -> SymbolKind {
        match &self.data {
            SymbolData::Assembly(_) => SymbolKind::Assembly,
            SymbolData::Module => SymbolKind::Module,
            SymbolData::Type(t) => SymbolKind::Type(t.kind),
            SymbolData::Method(m) => SymbolKind::Method(m.kind),
            SymbolData::Field(_) => SymbolKind::Field,
            SymbolData::Property(_) => SymbolKind::Property,
            SymbolData::Event(_) => SymbolKind::Event,
            SymbolData::Parameter(_) => SymbolKind::Parameter,
            SymbolData::TypeParameter(_) => SymbolKind::TypeParameter,
            SymbolData::ReturnValue(_) => SymbolKind::ReturnValue,
        }
    }

    /// Type data, if this is a type.
    #[must_use]
    pub fn as_type(&self) -> Option<&TypeData> {
        match &self.data {
            SymbolData::Type(t) => Some(t),
            _ => None,
        }
    }

    /// Method data, if this is a method.
    #[must_use]
    pub fn as_method(&self) -> Option<&MethodData> {
        match &self.data {
            SymbolData::Method(m) => Some(m),
            _ => None,
        }
    }

    /// Parameter data, if this is a parameter.
    #[must_use]
    pub fn as_parameter(&self) -> Option<&ParameterData> {
        match &self.data {
            SymbolData::Parameter(p) => Some(p),
            _ => None,
        }
    }

    /// Field data, if this is a field.
    #[must_use]
    pub fn as_field(&self) -> Option<&FieldData> {
        match &self.data {
            SymbolData::Field(f) => Some(f),
            _ => None,
        }
    }

    /// Property data, if this is a property.
    #[must_use]
    pub fn as_property(&self) -> Option<&PropertyData> {
        match &self.data {
            SymbolData::Property(p) => Some(p),
            _ => None,
        }
    }

    /// Event data, if this is an event.
    #[must_use]
    pub fn as_event(&self) -> Option<&EventData> {
        match &self.data {
            SymbolData::Event(e) => Some(e),
            _ => None,
        }
    }

    /// Assembly data, if this is an assembly.
    #[must_use]
    pub fn as_assembly(&self) -> Option<&AssemblyData> {
        match &self.data {
            SymbolData::Assembly(a) => Some(a),
            _ => None,
        }
    }

    /// The declared type of a field, property, event, parameter or return value.
    #[must_use]
    pub fn declared_type(&self) -> Option<&TypeSig> {
        match &self.data {
            SymbolData::Field(f) => Some(&f.ty),
            SymbolData::Property(p) => Some(&p.ty),
            SymbolData::Event(e) => Some(&e.ty),
            SymbolData::Parameter(p) => Some(&p.ty),
            SymbolData::ReturnValue(r) => Some(&r.ty),
            _ => None,
        }
    }

    /// Declared in source.
    #[must_use]
    pub fn is_source(&self) -> bool {
        self.origin.is_source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_and_order() {
        assert_eq!(SymbolId::new(7).to_string(), "#7");
        assert!(SymbolId::new(1) < SymbolId::new(2));
        assert_eq!(SymbolId::new(9).index(), 9);
    }

    #[test]
    fn unconsumed_method_kinds() {
        assert!(MethodKind::Operator.never_omits_arguments());
        assert!(MethodKind::PartialImplementation.never_omits_arguments());
        assert!(!MethodKind::PartialDefinition.never_omits_arguments());
        assert!(!MethodKind::Ordinary.never_omits_arguments());
        assert!(!MethodKind::DelegateInvoke.never_omits_arguments());
        assert!(!MethodKind::PropertyGet.never_omits_arguments());
        assert!(MethodKind::EventAdd.is_accessor());
    }

    #[test]
    fn ref_kinds() {
        assert!(RefKind::In.is_read_only());
        assert!(RefKind::RefReadOnly.is_read_only());
        assert!(!RefKind::Ref.is_read_only());
        assert!(RefKind::Out.is_by_ref());
        assert!(!RefKind::None.is_by_ref());
    }
}
