//! The declaration phase.
//!
//! [`SymbolTableBuilder`] creates symbols in declaration order from small declaration
//! records. It also creates the implied children of a declaration:
//! - a return-value symbol per method
//! - getter and setter methods (the setter with its `value` parameter) per property
//! - `add`/`remove` accessors per event, and the backing field of a field-like event
//!   declared in a class or struct
//! - the `Invoke` method of a delegate type

use std::collections::HashMap;

use crate::{
    metadata::{
        customattributes::ConstantValue,
        syntax::{AttributeSyntax, Location},
        symbols::{
            Accessibility, AssemblyData, EventData, FieldData, ImportedAttribute, MethodData,
            MethodKind, ObsoleteData, ParameterData, PropertyData, RefKind, ReturnValueData,
            Symbol, SymbolData, SymbolId, SymbolKind, SymbolOrigin, SymbolTable, TypeData,
            TypeKind, TypeParameterData,
        },
        typesystem::{PrimitiveType, TypeSig},
    },
    Error, Result,
};

/// A type parameter declaration.
#[derive(Debug, Clone, Default)]
pub struct TypeParameterDecl {
    /// Name
    pub name: String,
    /// `where T : unmanaged`
    pub unmanaged: bool,
    /// Attribute usages
    pub attributes: Vec<AttributeSyntax>,
}

impl TypeParameterDecl {
    /// A plain type parameter.
    #[must_use]
    pub fn new(name: &str) -> Self {
        TypeParameterDecl {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Add the `unmanaged` constraint.
    #[must_use]
    pub fn unmanaged(mut self) -> Self {
        self.unmanaged = true;
        self
    }

    /// Attach an attribute usage.
    #[must_use]
    pub fn attribute(mut self, attribute: AttributeSyntax) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// A parameter declaration.
#[derive(Debug, Clone)]
pub struct ParameterDecl {
    /// Name
    pub name: String,
    /// Type
    pub ty: TypeSig,
    /// Passing mode
    pub ref_kind: RefKind,
    /// Default value
    pub default_value: Option<ConstantValue>,
    /// `params`
    pub is_params: bool,
    /// Attribute usages
    pub attributes: Vec<AttributeSyntax>,
    /// Attributes from metadata
    pub imported: Vec<ImportedAttribute>,
    /// Position
    pub location: Location,
}

impl ParameterDecl {
    /// A required by-value parameter.
    #[must_use]
    pub fn new(name: &str, ty: TypeSig) -> Self {
        ParameterDecl {
            name: name.to_string(),
            ty,
            ref_kind: RefKind::None,
            default_value: None,
            is_params: false,
            attributes: Vec::new(),
            imported: Vec::new(),
            location: Location::None,
        }
    }

    /// Set the passing mode.
    #[must_use]
    pub fn ref_kind(mut self, ref_kind: RefKind) -> Self {
        self.ref_kind = ref_kind;
        self
    }

    /// Make the parameter optional with `value` as default.
    #[must_use]
    pub fn default(mut self, value: ConstantValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Mark as `params`.
    #[must_use]
    pub fn params(mut self) -> Self {
        self.is_params = true;
        self
    }

    /// Attach an attribute usage.
    #[must_use]
    pub fn attribute(mut self, attribute: AttributeSyntax) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Attach an attribute read from metadata.
    #[must_use]
    pub fn imported(mut self, attribute: ImportedAttribute) -> Self {
        self.imported.push(attribute);
        self
    }

    /// Set the position.
    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}

/// A method declaration.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    /// Flavor
    pub kind: MethodKind,
    /// Name
    pub name: String,
    /// Accessibility
    pub accessibility: Accessibility,
    /// `static`
    pub is_static: bool,
    /// Parameters
    pub parameters: Vec<ParameterDecl>,
    /// Return type
    pub return_type: TypeSig,
    /// Return passing mode
    pub return_ref: RefKind,
    /// Own type parameters
    pub type_parameters: Vec<TypeParameterDecl>,
    /// Attribute usages on the method
    pub attributes: Vec<AttributeSyntax>,
    /// Attributes from metadata on the method
    pub imported: Vec<ImportedAttribute>,
    /// Attributes from metadata on the return value
    pub return_imported: Vec<ImportedAttribute>,
    /// Declared obsolescence
    pub obsolete: Option<ObsoleteData>,
    /// Position
    pub location: Location,
}

impl MethodDecl {
    /// An ordinary `void` method.
    #[must_use]
    pub fn new(name: &str) -> Self {
        MethodDecl {
            kind: MethodKind::Ordinary,
            name: name.to_string(),
            accessibility: Accessibility::Public,
            is_static: false,
            parameters: Vec::new(),
            return_type: TypeSig::Void,
            return_ref: RefKind::None,
            type_parameters: Vec::new(),
            attributes: Vec::new(),
            imported: Vec::new(),
            return_imported: Vec::new(),
            obsolete: None,
            location: Location::None,
        }
    }

    /// An instance constructor.
    #[must_use]
    pub fn constructor() -> Self {
        MethodDecl::new(".ctor").kind(MethodKind::Constructor)
    }

    /// Set the flavor.
    #[must_use]
    pub fn kind(mut self, kind: MethodKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the return type.
    #[must_use]
    pub fn returns(mut self, ty: TypeSig) -> Self {
        self.return_type = ty;
        self
    }

    /// Return by reference.
    #[must_use]
    pub fn returns_ref(mut self, ref_kind: RefKind) -> Self {
        self.return_ref = ref_kind;
        self
    }

    /// Append a parameter.
    #[must_use]
    pub fn parameter(mut self, parameter: ParameterDecl) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Append a type parameter.
    #[must_use]
    pub fn type_parameter(mut self, name: &str) -> Self {
        self.type_parameters.push(TypeParameterDecl::new(name));
        self
    }

    /// Append a type parameter declaration.
    #[must_use]
    pub fn type_parameter_decl(mut self, decl: TypeParameterDecl) -> Self {
        self.type_parameters.push(decl);
        self
    }

    /// Attach an attribute usage.
    #[must_use]
    pub fn attribute(mut self, attribute: AttributeSyntax) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Attach an attribute read from metadata.
    #[must_use]
    pub fn imported(mut self, attribute: ImportedAttribute) -> Self {
        self.imported.push(attribute);
        self
    }

    /// Attach an attribute read from metadata to the return value.
    #[must_use]
    pub fn return_imported(mut self, attribute: ImportedAttribute) -> Self {
        self.return_imported.push(attribute);
        self
    }

    /// Mark obsolete.
    #[must_use]
    pub fn obsolete(mut self, data: ObsoleteData) -> Self {
        self.obsolete = Some(data);
        self
    }

    /// Mark `static`.
    #[must_use]
    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Set the accessibility.
    #[must_use]
    pub fn accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    /// Set the position.
    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}

/// A type declaration.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    /// Flavor
    pub kind: TypeKind,
    /// Namespace
    pub namespace: String,
    /// Simple name without arity
    pub name: String,
    /// Accessibility
    pub accessibility: Accessibility,
    /// Base type
    pub base: Option<TypeSig>,
    /// Implemented interfaces
    pub interfaces: Vec<TypeSig>,
    /// `abstract`
    pub is_abstract: bool,
    /// `sealed`
    pub is_sealed: bool,
    /// `static`
    pub is_static: bool,
    /// `readonly struct`
    pub is_readonly: bool,
    /// `ref struct`
    pub is_ref_like: bool,
    /// Underlying type of an enum
    pub enum_underlying: Option<PrimitiveType>,
    /// Own type parameters
    pub type_parameters: Vec<TypeParameterDecl>,
    /// Attribute usages
    pub attributes: Vec<AttributeSyntax>,
    /// Attributes from metadata
    pub imported: Vec<ImportedAttribute>,
    /// Signature of a delegate's `Invoke`
    pub invoke: Option<MethodDecl>,
    /// Position
    pub location: Location,
}

impl TypeDecl {
    fn with_kind(kind: TypeKind, namespace: &str, name: &str) -> Self {
        TypeDecl {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
            accessibility: Accessibility::Public,
            base: None,
            interfaces: Vec::new(),
            is_abstract: false,
            is_sealed: false,
            is_static: false,
            is_readonly: false,
            is_ref_like: false,
            enum_underlying: None,
            type_parameters: Vec::new(),
            attributes: Vec::new(),
            imported: Vec::new(),
            invoke: None,
            location: Location::None,
        }
    }

    /// A class.
    #[must_use]
    pub fn class(namespace: &str, name: &str) -> Self {
        TypeDecl::with_kind(TypeKind::Class, namespace, name)
    }

    /// A struct.
    #[must_use]
    pub fn structure(namespace: &str, name: &str) -> Self {
        TypeDecl::with_kind(TypeKind::Struct, namespace, name)
    }

    /// An interface.
    #[must_use]
    pub fn interface(namespace: &str, name: &str) -> Self {
        TypeDecl::with_kind(TypeKind::Interface, namespace, name)
    }

    /// An enum with the given underlying type.
    #[must_use]
    pub fn enumeration(namespace: &str, name: &str, underlying: PrimitiveType) -> Self {
        let mut decl = TypeDecl::with_kind(TypeKind::Enum, namespace, name);
        decl.enum_underlying = Some(underlying);
        decl
    }

    /// A delegate whose `Invoke` has the signature of `invoke`.
    #[must_use]
    pub fn delegate(namespace: &str, name: &str, invoke: MethodDecl) -> Self {
        let mut decl = TypeDecl::with_kind(TypeKind::Delegate, namespace, name);
        decl.invoke = Some(invoke);
        decl
    }

    /// Set the base type.
    #[must_use]
    pub fn base(mut self, base: TypeSig) -> Self {
        self.base = Some(base);
        self
    }

    /// Add an implemented interface.
    #[must_use]
    pub fn implements(mut self, interface: TypeSig) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Mark `abstract`.
    #[must_use]
    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Mark `sealed`.
    #[must_use]
    pub fn sealed(mut self) -> Self {
        self.is_sealed = true;
        self
    }

    /// Mark `readonly` (structs).
    #[must_use]
    pub fn readonly(mut self) -> Self {
        self.is_readonly = true;
        self
    }

    /// Mark `ref` (structs).
    #[must_use]
    pub fn ref_like(mut self) -> Self {
        self.is_ref_like = true;
        self
    }

    /// Set the accessibility.
    #[must_use]
    pub fn accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    /// Append a type parameter.
    #[must_use]
    pub fn type_parameter(mut self, name: &str) -> Self {
        self.type_parameters.push(TypeParameterDecl::new(name));
        self
    }

    /// Append a type parameter declaration.
    #[must_use]
    pub fn type_parameter_decl(mut self, decl: TypeParameterDecl) -> Self {
        self.type_parameters.push(decl);
        self
    }

    /// Attach an attribute usage.
    #[must_use]
    pub fn attribute(mut self, attribute: AttributeSyntax) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Attach an attribute read from metadata.
    #[must_use]
    pub fn imported(mut self, attribute: ImportedAttribute) -> Self {
        self.imported.push(attribute);
        self
    }

    /// Set the position.
    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}

/// A field declaration.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// Name
    pub name: String,
    /// Type; [`TypeSig::Void`] on an enum member means the enum itself
    pub ty: TypeSig,
    /// Accessibility
    pub accessibility: Accessibility,
    /// `static`
    pub is_static: bool,
    /// `readonly`
    pub is_readonly: bool,
    /// `const`
    pub is_const: bool,
    /// Constant value
    pub constant: Option<ConstantValue>,
    /// Attribute usages
    pub attributes: Vec<AttributeSyntax>,
    /// Attributes from metadata
    pub imported: Vec<ImportedAttribute>,
    /// Position
    pub location: Location,
}

impl FieldDecl {
    /// A public instance field.
    #[must_use]
    pub fn new(name: &str, ty: TypeSig) -> Self {
        FieldDecl {
            name: name.to_string(),
            ty,
            accessibility: Accessibility::Public,
            is_static: false,
            is_readonly: false,
            is_const: false,
            constant: None,
            attributes: Vec::new(),
            imported: Vec::new(),
            location: Location::None,
        }
    }

    /// An enum member with the given value.
    #[must_use]
    pub fn enum_member(name: &str, value: ConstantValue) -> Self {
        FieldDecl::new(name, TypeSig::Void).constant(value)
    }

    /// Make this a `const` with the given value.
    #[must_use]
    pub fn constant(mut self, value: ConstantValue) -> Self {
        self.is_const = true;
        self.is_static = true;
        self.constant = Some(value);
        self
    }

    /// Mark `readonly`.
    #[must_use]
    pub fn readonly(mut self) -> Self {
        self.is_readonly = true;
        self
    }

    /// Mark `static`.
    #[must_use]
    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Set the accessibility.
    #[must_use]
    pub fn accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    /// Attach an attribute usage.
    #[must_use]
    pub fn attribute(mut self, attribute: AttributeSyntax) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Attach an attribute read from metadata.
    #[must_use]
    pub fn imported(mut self, attribute: ImportedAttribute) -> Self {
        self.imported.push(attribute);
        self
    }

    /// Set the position.
    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}

/// A property declaration.
#[derive(Debug, Clone)]
pub struct PropertyDecl {
    /// Name
    pub name: String,
    /// Type
    pub ty: TypeSig,
    /// Accessibility of the property and its accessors
    pub accessibility: Accessibility,
    /// `static`
    pub is_static: bool,
    /// Has a getter
    pub has_getter: bool,
    /// Has a setter
    pub has_setter: bool,
    /// Attribute usages on the property
    pub attributes: Vec<AttributeSyntax>,
    /// Attribute usages on the getter
    pub getter_attributes: Vec<AttributeSyntax>,
    /// Attribute usages on the setter
    pub setter_attributes: Vec<AttributeSyntax>,
    /// Attributes from metadata
    pub imported: Vec<ImportedAttribute>,
    /// Position
    pub location: Location,
}

impl PropertyDecl {
    /// A public read-write property.
    #[must_use]
    pub fn new(name: &str, ty: TypeSig) -> Self {
        PropertyDecl {
            name: name.to_string(),
            ty,
            accessibility: Accessibility::Public,
            is_static: false,
            has_getter: true,
            has_setter: true,
            attributes: Vec::new(),
            getter_attributes: Vec::new(),
            setter_attributes: Vec::new(),
            imported: Vec::new(),
            location: Location::None,
        }
    }

    /// Drop the setter.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.has_setter = false;
        self
    }

    /// Mark `static`.
    #[must_use]
    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Attach an attribute usage to the property.
    #[must_use]
    pub fn attribute(mut self, attribute: AttributeSyntax) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Attach an attribute usage to the getter.
    #[must_use]
    pub fn getter_attribute(mut self, attribute: AttributeSyntax) -> Self {
        self.getter_attributes.push(attribute);
        self
    }

    /// Attach an attribute usage to the setter.
    #[must_use]
    pub fn setter_attribute(mut self, attribute: AttributeSyntax) -> Self {
        self.setter_attributes.push(attribute);
        self
    }

    /// Attach an attribute read from metadata.
    #[must_use]
    pub fn imported(mut self, attribute: ImportedAttribute) -> Self {
        self.imported.push(attribute);
        self
    }

    /// Set the position.
    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}

/// An event declaration.
#[derive(Debug, Clone)]
pub struct EventDecl {
    /// Name
    pub name: String,
    /// Delegate type
    pub ty: TypeSig,
    /// Declared without accessors
    pub is_field_like: bool,
    /// Attribute usages on the event
    pub attributes: Vec<AttributeSyntax>,
    /// Attribute usages on the `add` accessor
    pub adder_attributes: Vec<AttributeSyntax>,
    /// Attribute usages on the `remove` accessor
    pub remover_attributes: Vec<AttributeSyntax>,
    /// Position
    pub location: Location,
}

impl EventDecl {
    /// `event T Name;`
    #[must_use]
    pub fn field_like(name: &str, ty: TypeSig) -> Self {
        EventDecl {
            name: name.to_string(),
            ty,
            is_field_like: true,
            attributes: Vec::new(),
            adder_attributes: Vec::new(),
            remover_attributes: Vec::new(),
            location: Location::None,
        }
    }

    /// `event T Name { add { } remove { } }`
    #[must_use]
    pub fn with_accessors(name: &str, ty: TypeSig) -> Self {
        EventDecl {
            is_field_like: false,
            ..EventDecl::field_like(name, ty)
        }
    }

    /// Attach an attribute usage to the event.
    #[must_use]
    pub fn attribute(mut self, attribute: AttributeSyntax) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Attach an attribute usage to the `add` accessor.
    #[must_use]
    pub fn adder_attribute(mut self, attribute: AttributeSyntax) -> Self {
        self.adder_attributes.push(attribute);
        self
    }

    /// Attach an attribute usage to the `remove` accessor.
    #[must_use]
    pub fn remover_attribute(mut self, attribute: AttributeSyntax) -> Self {
        self.remover_attributes.push(attribute);
        self
    }

    /// Set the position.
    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}

/// Builds a [`SymbolTable`] in declaration order.
///
/// # Examples
///
/// ```rust
/// use cilattr::metadata::{
///     symbols::{FieldDecl, SymbolTableBuilder, TypeDecl},
///     typesystem::TypeSig,
/// };
///
/// let mut builder = SymbolTableBuilder::new("App", "App.dll");
/// let class = builder.add_type(None, TypeDecl::class("N", "C"))?;
/// builder.add_field(class, FieldDecl::new("F", TypeSig::sz_array(TypeSig::Dynamic)))?;
/// let table = builder.build();
/// assert_eq!(table.lookup_type("N.C"), Some(class));
/// # Ok::<(), cilattr::Error>(())
/// ```
pub struct SymbolTableBuilder {
    symbols: Vec<Symbol>,
    names: HashMap<String, Vec<SymbolId>>,
    assembly: SymbolId,
    module: SymbolId,
    references: Vec<SymbolId>,
}

impl SymbolTableBuilder {
    /// Start a table for the assembly `assembly_name` with source module `module_name`.
    #[must_use]
    pub fn new(assembly_name: &str, module_name: &str) -> Self {
        let mut builder = SymbolTableBuilder {
            symbols: Vec::new(),
            names: HashMap::new(),
            assembly: SymbolId::new(0),
            module: SymbolId::new(1),
            references: Vec::new(),
        };
        let assembly = builder.push(
            assembly_name,
            None,
            SymbolOrigin::Source,
            SymbolData::Assembly(AssemblyData::default()),
        );
        let module = builder.push(module_name, Some(assembly), SymbolOrigin::Source, SymbolData::Module);
        builder.assembly = assembly;
        builder.module = module;
        builder
    }

    /// The source assembly.
    #[must_use]
    pub fn assembly(&self) -> SymbolId {
        self.assembly
    }

    /// The source module.
    #[must_use]
    pub fn module(&self) -> SymbolId {
        self.module
    }

    /// Attach an attribute usage written at assembly level.
    pub fn add_assembly_attribute(&mut self, attribute: AttributeSyntax) {
        let id = self.assembly;
        self.symbols[id.index()].attribute_lists.push(attribute);
    }

    /// Attach an attribute usage written at module level.
    pub fn add_module_attribute(&mut self, attribute: AttributeSyntax) {
        let id = self.module;
        self.symbols[id.index()].attribute_lists.push(attribute);
    }

    /// Declare a referenced assembly.
    pub fn add_reference(&mut self, name: &str, data: AssemblyData) -> SymbolId {
        let id = SymbolId::new(self.next_index());
        let reference = self.push(name, None, SymbolOrigin::Referenced(id), SymbolData::Assembly(data));
        self.references.push(reference);
        reference
    }

    /// Types with the given full name declared so far, source first.
    #[must_use]
    pub fn lookup_types(&self, full_name: &str) -> &[SymbolId] {
        self.names.get(full_name).map_or(&[][..], Vec::as_slice)
    }

    /// The first source or referenced type with the given full name.
    #[must_use]
    pub fn lookup_type(&self, full_name: &str) -> Option<SymbolId> {
        let ids = self.lookup_types(full_name);
        ids.iter()
            .copied()
            .find(|id| self.symbols[id.index()].is_source())
            .or_else(|| ids.first().copied())
    }

    /// Declare a source type; `container` is the enclosing type of a nested type.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidDeclaration`] if `container` is not a source type.
    pub fn add_type(&mut self, container: Option<SymbolId>, decl: TypeDecl) -> Result<SymbolId> {
        self.add_type_with_origin(container, decl, SymbolOrigin::Source)
    }

    /// Declare a type of the referenced assembly `reference`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidDeclaration`] if `reference` is not a referenced assembly.
    pub fn add_referenced_type(
        &mut self,
        reference: SymbolId,
        container: Option<SymbolId>,
        decl: TypeDecl,
    ) -> Result<SymbolId> {
        let embedded = match self.symbol(reference)?.as_assembly() {
            Some(data) if reference != self.assembly => data.embed_interop_types,
            _ => {
                return Err(Error::InvalidDeclaration(format!(
                    "{reference} is not a referenced assembly"
                )))
            }
        };
        let origin = if embedded {
            SymbolOrigin::Embedded(reference)
        } else {
            SymbolOrigin::Referenced(reference)
        };
        self.add_type_with_origin(container, decl, origin)
    }

    fn add_type_with_origin(
        &mut self,
        container: Option<SymbolId>,
        decl: TypeDecl,
        origin: SymbolOrigin,
    ) -> Result<SymbolId> {
        let parent = match container {
            Some(outer) => {
                let outer_symbol = self.symbol(outer)?;
                if outer_symbol.as_type().is_none() || outer_symbol.origin != origin {
                    return Err(Error::InvalidDeclaration(format!(
                        "{outer} cannot contain type '{}'",
                        decl.name
                    )));
                }
                outer
            }
            None => match origin {
                SymbolOrigin::Referenced(assembly) | SymbolOrigin::Embedded(assembly) => assembly,
                _ => self.module,
            },
        };

        let data = TypeData {
            kind: decl.kind,
            namespace: if container.is_some() {
                String::new()
            } else {
                decl.namespace.clone()
            },
            base: decl.base.clone(),
            interfaces: decl.interfaces.clone(),
            members: Vec::new(),
            type_parameters: Vec::new(),
            is_abstract: decl.is_abstract,
            is_sealed: decl.is_sealed,
            is_readonly: decl.is_readonly,
            is_ref_like: decl.is_ref_like,
            enum_underlying: decl.enum_underlying,
            invoke: None,
        };
        let id = self.push(&decl.name, Some(parent), origin, SymbolData::Type(data));
        {
            let symbol = &mut self.symbols[id.index()];
            symbol.accessibility = decl.accessibility;
            symbol.is_static = decl.is_static;
            symbol.location = decl.location.clone();
            symbol.attribute_lists = decl.attributes;
            symbol.imported_attributes = decl.imported;
        }
        if let Some(outer) = container {
            self.type_data_mut(outer)?.members.push(id);
        }
        if decl.base.as_ref().and_then(TypeSig::definition) == Some(id) {
            return Err(Error::InvalidDeclaration(format!(
                "type '{}' cannot derive from itself",
                decl.name
            )));
        }

        let mut type_parameters = Vec::with_capacity(decl.type_parameters.len());
        for (ordinal, parameter) in decl.type_parameters.into_iter().enumerate() {
            type_parameters.push(self.push_type_parameter(id, ordinal, parameter)?);
        }
        self.type_data_mut(id)?.type_parameters = type_parameters;

        let full_name = self.full_name(id);
        self.names.entry(full_name).or_default().push(id);

        if let Some(invoke) = decl.invoke {
            let invoke = self.add_method(id, invoke.kind(MethodKind::DelegateInvoke))?;
            self.type_data_mut(id)?.invoke = Some(invoke);
        }
        Ok(id)
    }

    /// Declare a method of `ty`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidDeclaration`] if `ty` is not a type.
    pub fn add_method(&mut self, ty: SymbolId, decl: MethodDecl) -> Result<SymbolId> {
        self.add_method_with_association(ty, decl, None)
    }

    fn add_method_with_association(
        &mut self,
        ty: SymbolId,
        decl: MethodDecl,
        associated: Option<SymbolId>,
    ) -> Result<SymbolId> {
        let origin = self.require_type(ty)?;
        let placeholder = MethodData {
            kind: decl.kind,
            parameters: Vec::new(),
            return_value: SymbolId::new(0),
            type_parameters: Vec::new(),
            associated,
            obsolete: decl.obsolete,
        };
        let id = self.push(&decl.name, Some(ty), origin, SymbolData::Method(placeholder));
        {
            let symbol = &mut self.symbols[id.index()];
            symbol.accessibility = decl.accessibility;
            symbol.is_static = decl.is_static;
            symbol.location = decl.location.clone();
            symbol.attribute_lists = decl.attributes;
            symbol.imported_attributes = decl.imported;
        }
        self.type_data_mut(ty)?.members.push(id);

        let return_value = self.push(
            "",
            Some(id),
            origin,
            SymbolData::ReturnValue(ReturnValueData {
                ty: decl.return_type,
                ref_kind: decl.return_ref,
            }),
        );
        self.symbols[return_value.index()].imported_attributes = decl.return_imported;
        self.symbols[return_value.index()].location = decl.location;

        let mut parameters = Vec::with_capacity(decl.parameters.len());
        for (ordinal, parameter) in decl.parameters.into_iter().enumerate() {
            let ordinal = u16::try_from(ordinal)
                .map_err(|_| Error::InvalidDeclaration("too many parameters".to_string()))?;
            let parameter_id = self.push(
                &parameter.name,
                Some(id),
                origin,
                SymbolData::Parameter(ParameterData {
                    ty: parameter.ty,
                    ref_kind: parameter.ref_kind,
                    ordinal,
                    default_value: parameter.default_value,
                    is_params: parameter.is_params,
                }),
            );
            let symbol = &mut self.symbols[parameter_id.index()];
            symbol.attribute_lists = parameter.attributes;
            symbol.imported_attributes = parameter.imported;
            symbol.location = parameter.location;
            parameters.push(parameter_id);
        }

        let mut type_parameters = Vec::with_capacity(decl.type_parameters.len());
        for (ordinal, parameter) in decl.type_parameters.into_iter().enumerate() {
            type_parameters.push(self.push_type_parameter(id, ordinal, parameter)?);
        }

        if let SymbolData::Method(data) = &mut self.symbols[id.index()].data {
            data.parameters = parameters;
            data.return_value = return_value;
            data.type_parameters = type_parameters;
        }
        Ok(id)
    }

    /// Declare a field of `ty`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidDeclaration`] if `ty` is not a type.
    pub fn add_field(&mut self, ty: SymbolId, decl: FieldDecl) -> Result<SymbolId> {
        let origin = self.require_type(ty)?;
        let field_type = match decl.ty {
            TypeSig::Void => TypeSig::named(ty),
            other => other,
        };
        let id = self.push(
            &decl.name,
            Some(ty),
            origin,
            SymbolData::Field(FieldData {
                ty: field_type,
                is_readonly: decl.is_readonly,
                is_const: decl.is_const,
                constant: decl.constant,
                associated_event: None,
            }),
        );
        let symbol = &mut self.symbols[id.index()];
        symbol.accessibility = decl.accessibility;
        symbol.is_static = decl.is_static;
        symbol.location = decl.location;
        symbol.attribute_lists = decl.attributes;
        symbol.imported_attributes = decl.imported;
        self.type_data_mut(ty)?.members.push(id);
        Ok(id)
    }

    /// Declare a property of `ty` with its accessors.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidDeclaration`] if `ty` is not a type.
    pub fn add_property(&mut self, ty: SymbolId, decl: PropertyDecl) -> Result<SymbolId> {
        let origin = self.require_type(ty)?;
        let id = self.push(
            &decl.name,
            Some(ty),
            origin,
            SymbolData::Property(PropertyData {
                ty: decl.ty.clone(),
                getter: None,
                setter: None,
            }),
        );
        {
            let symbol = &mut self.symbols[id.index()];
            symbol.accessibility = decl.accessibility;
            symbol.is_static = decl.is_static;
            symbol.location = decl.location.clone();
            symbol.attribute_lists = decl.attributes;
            symbol.imported_attributes = decl.imported;
        }
        self.type_data_mut(ty)?.members.push(id);

        let getter = if decl.has_getter {
            let mut method = MethodDecl::new(&format!("get_{}", decl.name))
                .kind(MethodKind::PropertyGet)
                .returns(decl.ty.clone())
                .accessibility(decl.accessibility)
                .at(decl.location.clone());
            method.is_static = decl.is_static;
            method.attributes = decl.getter_attributes;
            Some(self.add_method_with_association(ty, method, Some(id))?)
        } else {
            None
        };
        let setter = if decl.has_setter {
            let mut method = MethodDecl::new(&format!("set_{}", decl.name))
                .kind(MethodKind::PropertySet)
                .parameter(ParameterDecl::new("value", decl.ty.clone()))
                .accessibility(decl.accessibility)
                .at(decl.location.clone());
            method.is_static = decl.is_static;
            method.attributes = decl.setter_attributes;
            Some(self.add_method_with_association(ty, method, Some(id))?)
        } else {
            None
        };
        if let SymbolData::Property(data) = &mut self.symbols[id.index()].data {
            data.getter = getter;
            data.setter = setter;
        }
        Ok(id)
    }

    /// Declare an event of `ty` with its accessors and, for a field-like event of a class
    /// or struct, its backing field.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidDeclaration`] if `ty` is not a type.
    pub fn add_event(&mut self, ty: SymbolId, decl: EventDecl) -> Result<SymbolId> {
        let origin = self.require_type(ty)?;
        let is_interface = self.symbol(ty)?.as_type().map(|t| t.kind) == Some(TypeKind::Interface);
        let id = self.push(
            &decl.name,
            Some(ty),
            origin,
            SymbolData::Event(EventData {
                ty: decl.ty.clone(),
                adder: SymbolId::new(0),
                remover: SymbolId::new(0),
                backing_field: None,
                is_field_like: decl.is_field_like,
            }),
        );
        self.symbols[id.index()].location = decl.location.clone();
        self.symbols[id.index()].attribute_lists = decl.attributes;
        self.type_data_mut(ty)?.members.push(id);

        let backing_field = if decl.is_field_like && !is_interface {
            let field = self.add_field(
                ty,
                FieldDecl::new(&decl.name, decl.ty.clone())
                    .accessibility(Accessibility::Private)
                    .at(decl.location.clone()),
            )?;
            if let SymbolData::Field(data) = &mut self.symbols[field.index()].data {
                data.associated_event = Some(id);
            }
            Some(field)
        } else {
            None
        };

        let mut adder = MethodDecl::new(&format!("add_{}", decl.name))
            .kind(MethodKind::EventAdd)
            .parameter(ParameterDecl::new("value", decl.ty.clone()))
            .at(decl.location.clone());
        adder.attributes = decl.adder_attributes;
        let adder = self.add_method_with_association(ty, adder, Some(id))?;

        let mut remover = MethodDecl::new(&format!("remove_{}", decl.name))
            .kind(MethodKind::EventRemove)
            .parameter(ParameterDecl::new("value", decl.ty))
            .at(decl.location);
        remover.attributes = decl.remover_attributes;
        let remover = self.add_method_with_association(ty, remover, Some(id))?;

        if let SymbolData::Event(data) = &mut self.symbols[id.index()].data {
            data.adder = adder;
            data.remover = remover;
            data.backing_field = backing_field;
        }
        Ok(id)
    }

    /// Finish the declaration phase.
    #[must_use]
    pub fn build(self) -> SymbolTable {
        SymbolTable::from_parts(self.symbols, self.assembly, self.module, self.references)
    }

    fn next_index(&self) -> u32 {
        u32::try_from(self.symbols.len()).unwrap_or(u32::MAX)
    }

    fn push(
        &mut self,
        name: &str,
        container: Option<SymbolId>,
        origin: SymbolOrigin,
        data: SymbolData,
    ) -> SymbolId {
        let id = SymbolId::new(self.next_index());
        self.symbols.push(Symbol {
            id,
            name: name.to_string(),
            container,
            origin,
            accessibility: Accessibility::Public,
            is_static: false,
            location: Location::None,
            attribute_lists: Vec::new(),
            imported_attributes: Vec::new(),
            data,
        });
        id
    }

    fn push_type_parameter(
        &mut self,
        owner: SymbolId,
        ordinal: usize,
        decl: TypeParameterDecl,
    ) -> Result<SymbolId> {
        let origin = self.symbol(owner)?.origin;
        let ordinal = u16::try_from(ordinal)
            .map_err(|_| Error::InvalidDeclaration("too many type parameters".to_string()))?;
        let id = self.push(
            &decl.name,
            Some(owner),
            origin,
            SymbolData::TypeParameter(TypeParameterData {
                ordinal,
                has_unmanaged_constraint: decl.unmanaged,
            }),
        );
        self.symbols[id.index()].attribute_lists = decl.attributes;
        Ok(id)
    }

    fn symbol(&self, id: SymbolId) -> Result<&Symbol> {
        self.symbols.get(id.index()).ok_or(Error::SymbolNotFound(id))
    }

    fn require_type(&self, ty: SymbolId) -> Result<SymbolOrigin> {
        let symbol = self.symbol(ty)?;
        match symbol.kind() {
            SymbolKind::Type(_) => Ok(symbol.origin),
            _ => Err(Error::InvalidDeclaration(format!(
                "{ty} ('{}') is not a type",
                symbol.name
            ))),
        }
    }

    fn type_data_mut(&mut self, ty: SymbolId) -> Result<&mut TypeData> {
        match self.symbols.get_mut(ty.index()).map(|s| &mut s.data) {
            Some(SymbolData::Type(data)) => Ok(data),
            _ => Err(Error::InvalidDeclaration(format!("{ty} is not a type"))),
        }
    }

    fn full_name(&self, id: SymbolId) -> String {
        let symbol = &self.symbols[id.index()];
        let (name, namespace) = match symbol.as_type() {
            Some(t) if !t.type_parameters.is_empty() => (
                format!("{}`{}", symbol.name, t.type_parameters.len()),
                t.namespace.as_str(),
            ),
            Some(t) => (symbol.name.clone(), t.namespace.as_str()),
            None => (symbol.name.clone(), ""),
        };
        match symbol.container {
            Some(outer) if self.symbols[outer.index()].as_type().is_some() => {
                format!("{}+{}", self.full_name(outer), name)
            }
            _ if namespace.is_empty() => name,
            _ => format!("{namespace}.{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_and_event_children() {
        let mut builder = SymbolTableBuilder::new("App", "App.dll");
        let class = builder.add_type(None, TypeDecl::class("", "C")).unwrap();
        let property = builder
            .add_property(class, PropertyDecl::new("P", TypeSig::String))
            .unwrap();
        let event = builder
            .add_event(class, EventDecl::field_like("E", TypeSig::Object))
            .unwrap();
        let table = builder.build();

        let data = table.get(property).unwrap().as_property().unwrap();
        let setter = table.get(data.setter.unwrap()).unwrap();
        assert_eq!(setter.name, "set_P");
        assert_eq!(table.parameters(setter.id).len(), 1);

        let event = table.get(event).unwrap().as_event().unwrap();
        assert!(event.backing_field.is_some());
        assert_eq!(table.get(event.adder).unwrap().name, "add_E");
    }

    #[test]
    fn interface_events_have_no_backing_field() {
        let mut builder = SymbolTableBuilder::new("App", "App.dll");
        let interface = builder.add_type(None, TypeDecl::interface("", "I")).unwrap();
        let event = builder
            .add_event(interface, EventDecl::field_like("E", TypeSig::Object))
            .unwrap();
        let table = builder.build();
        assert!(table.get(event).unwrap().as_event().unwrap().backing_field.is_none());
    }

    #[test]
    fn delegate_gets_invoke() {
        let mut builder = SymbolTableBuilder::new("App", "App.dll");
        let delegate = builder
            .add_type(
                None,
                TypeDecl::delegate("", "D", MethodDecl::new("Invoke").returns(TypeSig::int())),
            )
            .unwrap();
        let table = builder.build();
        let invoke = table.get(delegate).unwrap().as_type().unwrap().invoke.unwrap();
        assert_eq!(
            table.get(invoke).unwrap().kind(),
            SymbolKind::Method(MethodKind::DelegateInvoke)
        );
    }

    #[test]
    fn members_only_on_types() {
        let mut builder = SymbolTableBuilder::new("App", "App.dll");
        let assembly = builder.assembly();
        assert!(matches!(
            builder.add_field(assembly, FieldDecl::new("F", TypeSig::int())),
            Err(Error::InvalidDeclaration(_))
        ));
    }

    #[test]
    fn referenced_types_lose_to_source_types() {
        let mut builder = SymbolTableBuilder::new("App", "App.dll");
        let reference = builder.add_reference("Lib", AssemblyData::default());
        let referenced = builder
            .add_referenced_type(reference, None, TypeDecl::class("N", "C"))
            .unwrap();
        let source = builder.add_type(None, TypeDecl::class("N", "C")).unwrap();
        assert_eq!(builder.lookup_type("N.C"), Some(source));
        let table = builder.build();
        assert_eq!(table.lookup_types("N.C"), [source, referenced]);
        assert_eq!(table.assembly_of(referenced), reference);
    }
}
