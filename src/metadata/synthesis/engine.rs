//! Compiler-added attributes per symbol.

use crate::{
    compilation::CompilationOptions,
    metadata::{
        binder::{AttributeSource, BoundAttribute, ConstructorRef},
        customattributes::{
            CustomAttributeValue, NamedArgument, NamedArgumentKind, SerType, TypedConstant,
        },
        diagnostics::{Diagnostic, DiagnosticCode},
        symbols::{
            default_location, Accessibility, RefKind, Symbol, SymbolData, SymbolId, SymbolOrigin,
            SymbolTable,
        },
        synthesis::{dynamic_transform, DynamicTransform, MarkerKind, MarkerRegistry},
        typesystem::{PrimitiveType, TypeSig},
        wellknown::{AssemblyWellKnownData, WellKnownAttributeKind},
    },
    Result,
};

/// `CompilationRelaxations.NoStringInterning`
const NO_STRING_INTERNING: i32 = 8;

/// A marker type definition synthesized into the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerTypeDefinition {
    /// The marker
    pub kind: MarkerKind,
    /// Namespace
    pub namespace: &'static str,
    /// Simple name
    pub name: &'static str,
    /// Always internal
    pub accessibility: Accessibility,
    /// Whether a `bool[]` constructor is defined besides the parameterless one
    pub has_flags_constructor: bool,
    /// Attributes placed on the definition itself, all through parameterless constructors
    pub attributes: Vec<(MarkerKind, ConstructorRef)>,
}

/// Computes the attributes the compiler adds to symbols.
///
/// Marker types are looked up in the symbol table first. A marker type that is nowhere to
/// be found is requested from the [`MarkerRegistry`], which synthesizes it into the output
/// at most once.
pub struct SynthesisEngine<'a> {
    table: &'a SymbolTable,
    options: &'a CompilationOptions,
    registry: &'a MarkerRegistry,
}

impl<'a> SynthesisEngine<'a> {
    /// An engine requesting marker types from `registry`.
    #[must_use]
    pub fn new(
        table: &'a SymbolTable,
        options: &'a CompilationOptions,
        registry: &'a MarkerRegistry,
    ) -> Self {
        SynthesisEngine {
            table,
            options,
            registry,
        }
    }

    /// The attributes the compiler adds to `id`.
    ///
    /// `assembly_data` is the decoded well-known data of the source assembly; it decides
    /// whether the assembly-level attributes are still needed.
    ///
    /// # Errors
    /// Returns [`crate::Error::SymbolNotFound`] if `id` is not in the table.
    pub fn synthesized_attributes(
        &self,
        id: SymbolId,
        assembly_data: &AssemblyWellKnownData,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Vec<BoundAttribute>> {
        let symbol = self.table.get(id)?;
        if !symbol.is_source() {
            return Ok(Vec::new());
        }

        let mut attributes = Vec::new();
        match &symbol.data {
            SymbolData::Assembly(_) => {
                attributes.extend(self.assembly_attributes(symbol, assembly_data));
            }
            SymbolData::Type(data) => {
                if let Some(base) = &data.base {
                    self.add_dynamic(symbol, base, RefKind::None, diagnostics, &mut attributes);
                }
                if data.is_readonly {
                    self.add_simple(symbol, MarkerKind::IsReadOnly, diagnostics, &mut attributes);
                }
                if data.is_ref_like {
                    self.add_simple(symbol, MarkerKind::IsByRefLike, diagnostics, &mut attributes);
                }
            }
            SymbolData::Field(data) => {
                self.add_dynamic(symbol, &data.ty, RefKind::None, diagnostics, &mut attributes);
            }
            SymbolData::Property(data) => {
                self.add_dynamic(symbol, &data.ty, RefKind::None, diagnostics, &mut attributes);
            }
            SymbolData::Event(data) => {
                self.add_dynamic(symbol, &data.ty, RefKind::None, diagnostics, &mut attributes);
            }
            SymbolData::Parameter(data) => {
                self.add_dynamic(symbol, &data.ty, data.ref_kind, diagnostics, &mut attributes);
                if data.ref_kind == RefKind::In {
                    self.add_simple(symbol, MarkerKind::IsReadOnly, diagnostics, &mut attributes);
                }
            }
            SymbolData::ReturnValue(data) => {
                self.add_dynamic(symbol, &data.ty, data.ref_kind, diagnostics, &mut attributes);
                if data.ref_kind == RefKind::RefReadOnly {
                    self.add_simple(symbol, MarkerKind::IsReadOnly, diagnostics, &mut attributes);
                }
            }
            SymbolData::TypeParameter(data) => {
                if data.has_unmanaged_constraint {
                    self.add_simple(symbol, MarkerKind::IsUnmanaged, diagnostics, &mut attributes);
                }
            }
            SymbolData::Module | SymbolData::Method(_) => {}
        }
        Ok(attributes)
    }

    /// Definitions of every marker type requested so far, in [`MarkerKind`] order.
    #[must_use]
    pub fn definitions(&self) -> Vec<MarkerTypeDefinition> {
        self.registry
            .requested()
            .into_iter()
            .map(|kind| MarkerTypeDefinition {
                kind,
                namespace: kind.namespace(),
                name: kind.name(),
                accessibility: Accessibility::Internal,
                has_flags_constructor: kind.has_flags_constructor(),
                attributes: [MarkerKind::CompilerGenerated, MarkerKind::Embedded]
                    .into_iter()
                    .filter_map(|marker| {
                        self.existing_constructor(marker, false)
                            .or_else(|| {
                                self.registry.contains(marker).then_some(
                                    ConstructorRef::Synthesized {
                                        marker,
                                        flags: false,
                                    },
                                )
                            })
                            .map(|ctor| (marker, ctor))
                    })
                    .collect(),
            })
            .collect()
    }

    fn add_simple(
        &self,
        symbol: &Symbol,
        kind: MarkerKind,
        diagnostics: &mut Vec<Diagnostic>,
        attributes: &mut Vec<BoundAttribute>,
    ) {
        if let Some(attribute) = self.marker(symbol, kind, None, diagnostics) {
            attributes.push(attribute);
        }
    }

    fn add_dynamic(
        &self,
        symbol: &Symbol,
        ty: &TypeSig,
        ref_kind: RefKind,
        diagnostics: &mut Vec<Diagnostic>,
        attributes: &mut Vec<BoundAttribute>,
    ) {
        let flags = match dynamic_transform(ty, ref_kind) {
            DynamicTransform::None => return,
            DynamicTransform::Simple => None,
            DynamicTransform::Flags(flags) => Some(flags),
        };
        if let Some(attribute) = self.marker(symbol, MarkerKind::Dynamic, flags, diagnostics) {
            attributes.push(attribute);
        }
    }

    /// Build the marker attribute for `symbol`, resolving or requesting the marker type.
    fn marker(
        &self,
        symbol: &Symbol,
        kind: MarkerKind,
        flags: Option<Vec<bool>>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<BoundAttribute> {
        let wants_flags = flags.is_some();
        let full_name = kind.full_name();
        let class = self.table.lookup_type(full_name);

        let constructor = match class {
            Some(_) => match self.existing_constructor(kind, wants_flags) {
                Some(constructor) => constructor,
                None => {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticCode::ErrMissingPredefinedMember,
                        symbol.location.clone(),
                        vec![full_name.to_string(), ".ctor".to_string()],
                    ));
                    return None;
                }
            },
            None if self.options.synthesize_markers => {
                self.request(kind);
                ConstructorRef::Synthesized {
                    marker: kind,
                    flags: wants_flags,
                }
            }
            None => {
                let diagnostic = if kind == MarkerKind::Dynamic {
                    Diagnostic::new(
                        DiagnosticCode::ErrDynamicAttributeMissing,
                        symbol.location.clone(),
                        vec![full_name.to_string()],
                    )
                } else {
                    Diagnostic::new(
                        DiagnosticCode::ErrMissingPredefinedMember,
                        symbol.location.clone(),
                        vec![full_name.to_string(), ".ctor".to_string()],
                    )
                };
                diagnostics.push(diagnostic);
                return None;
            }
        };

        let (constructor_params, fixed_args) = match flags {
            Some(flags) => (
                vec![SerType::SzArray(Box::new(SerType::Boolean))],
                vec![TypedConstant::bool_array(&flags)],
            ),
            None => (Vec::new(), Vec::new()),
        };
        Some(BoundAttribute {
            class_name: full_name.to_string(),
            class,
            constructor,
            constructor_params,
            value: CustomAttributeValue {
                fixed_args,
                named_args: Vec::new(),
            },
            owner: symbol.id,
            declared_on: symbol.id,
            location: symbol.location.clone(),
            target: default_location(symbol),
            has_errors: false,
            ignored_location: false,
            duplicate_suppressed: false,
            source: AttributeSource::Synthesized,
            well_known: Some(kind.well_known()),
        })
    }

    /// Request `kind` together with the markers its definition carries.
    fn request(&self, kind: MarkerKind) {
        self.registry.request(kind);
        self.registry.request(MarkerKind::Embedded);
        if self
            .table
            .lookup_type(MarkerKind::CompilerGenerated.full_name())
            .is_none()
        {
            self.registry.request(MarkerKind::CompilerGenerated);
        }
    }

    /// The constructor of an existing marker type with the required shape.
    fn existing_constructor(&self, kind: MarkerKind, flags: bool) -> Option<ConstructorRef> {
        let class = self.table.lookup_type(kind.full_name())?;
        let flags_type = TypeSig::sz_array(TypeSig::Primitive(PrimitiveType::Boolean));
        self.table
            .constructors(class)
            .into_iter()
            .find(|ctor| {
                let parameters = self.table.parameters(*ctor);
                if !flags {
                    return parameters.is_empty();
                }
                match parameters {
                    [only] => self
                        .table
                        .get(*only)
                        .ok()
                        .and_then(Symbol::declared_type)
                        .is_some_and(|ty| *ty == flags_type),
                    _ => false,
                }
            })
            .map(ConstructorRef::Method)
    }

    fn assembly_attributes(
        &self,
        assembly: &Symbol,
        data: &AssemblyWellKnownData,
    ) -> Vec<BoundAttribute> {
        if self.options.output_kind.is_net_module() {
            return Vec::new();
        }
        let mut attributes = Vec::new();
        if !data.has_compilation_relaxations {
            let kind = WellKnownAttributeKind::CompilationRelaxations;
            let value = CustomAttributeValue {
                fixed_args: vec![TypedConstant::i4(NO_STRING_INTERNING)],
                named_args: Vec::new(),
            };
            if let Some(attribute) =
                self.assembly_attribute(assembly, kind, &[TypeSig::int()], value)
            {
                attributes.push(attribute);
            }
        }
        if !data.has_runtime_compatibility {
            let kind = WellKnownAttributeKind::RuntimeCompatibility;
            let value = CustomAttributeValue {
                fixed_args: Vec::new(),
                named_args: vec![NamedArgument {
                    kind: NamedArgumentKind::Property,
                    name: "WrapNonExceptionThrows".to_string(),
                    value: TypedConstant::bool(true),
                }],
            };
            if let Some(attribute) = self.assembly_attribute(assembly, kind, &[], value) {
                attributes.push(attribute);
            }
        }
        attributes
    }

    /// An assembly attribute through the constructor of `kind` with `parameters`; absent
    /// when the class or the constructor is not available.
    fn assembly_attribute(
        &self,
        assembly: &Symbol,
        kind: WellKnownAttributeKind,
        parameters: &[TypeSig],
        value: CustomAttributeValue,
    ) -> Option<BoundAttribute> {
        let class = self.table.lookup_type(kind.full_name())?;
        let constructor = self.table.constructors(class).into_iter().find(|ctor| {
            let types: Vec<Option<&TypeSig>> = self
                .table
                .parameters(*ctor)
                .iter()
                .map(|p| self.table.get(*p).ok().and_then(Symbol::declared_type))
                .collect();
            types.len() == parameters.len()
                && types.iter().zip(parameters).all(|(a, b)| *a == Some(b))
        })?;
        let constructor_params = value
            .fixed_args
            .iter()
            .map(|argument| argument.ty.clone())
            .collect();
        Some(BoundAttribute {
            class_name: kind.full_name().to_string(),
            class: Some(class),
            constructor: ConstructorRef::Method(constructor),
            constructor_params,
            value,
            owner: assembly.id,
            declared_on: assembly.id,
            location: assembly.location.clone(),
            target: default_location(assembly),
            has_errors: false,
            ignored_location: false,
            duplicate_suppressed: false,
            source: AttributeSource::Synthesized,
            well_known: Some(kind),
        })
    }
}

/// Whether imported attributes on `symbol` lose their marker attributes.
#[must_use]
pub fn strips_markers(symbol: &Symbol) -> bool {
    matches!(symbol.origin, SymbolOrigin::Embedded(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::symbols::{
        FieldDecl, MethodDecl, ParameterDecl, SymbolTableBuilder, TypeDecl,
    };

    fn table_with_field(ty: TypeSig, define_dynamic: Option<Vec<MethodDecl>>) -> (SymbolTable, SymbolId) {
        let mut builder = SymbolTableBuilder::new("App", "App.dll");
        let object = builder.add_type(None, TypeDecl::class("System", "Object")).unwrap();
        if let Some(ctors) = define_dynamic {
            let dynamic = builder
                .add_type(
                    None,
                    TypeDecl::class("System.Runtime.CompilerServices", "DynamicAttribute")
                        .base(TypeSig::named(object)),
                )
                .unwrap();
            for ctor in ctors {
                builder.add_method(dynamic, ctor).unwrap();
            }
        }
        let class = builder
            .add_type(None, TypeDecl::class("N", "C").base(TypeSig::named(object)))
            .unwrap();
        let field = builder.add_field(class, FieldDecl::new("f", ty)).unwrap();
        (builder.build(), field)
    }

    #[test]
    fn dynamic_array_field_requests_marker_once() {
        let (table, field) = table_with_field(TypeSig::sz_array(TypeSig::Dynamic), None);
        let options = CompilationOptions::library();
        let registry = MarkerRegistry::new();
        let engine = SynthesisEngine::new(&table, &options, &registry);
        let mut diagnostics = Vec::new();

        let data = AssemblyWellKnownData::default();
        let first = engine.synthesized_attributes(field, &data, &mut diagnostics).unwrap();
        let second = engine.synthesized_attributes(field, &data, &mut diagnostics).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(first, second);
        assert_eq!(
            first[0].fixed(0),
            Some(&TypedConstant::bool_array(&[false, true]))
        );
        assert_eq!(
            first[0].constructor,
            ConstructorRef::Synthesized {
                marker: MarkerKind::Dynamic,
                flags: true
            }
        );
        assert_eq!(
            registry.requested(),
            vec![
                MarkerKind::Embedded,
                MarkerKind::CompilerGenerated,
                MarkerKind::Dynamic
            ]
        );

        let definitions = engine.definitions();
        assert_eq!(definitions.len(), 3);
        assert!(definitions
            .iter()
            .all(|d| d.accessibility == Accessibility::Internal && d.attributes.len() == 2));
    }

    #[test]
    fn existing_type_without_flags_constructor() {
        let (table, field) = table_with_field(
            TypeSig::sz_array(TypeSig::Dynamic),
            Some(vec![MethodDecl::constructor()]),
        );
        let options = CompilationOptions::library();
        let registry = MarkerRegistry::new();
        let engine = SynthesisEngine::new(&table, &options, &registry);
        let mut diagnostics = Vec::new();
        let attributes = engine
            .synthesized_attributes(field, &AssemblyWellKnownData::default(), &mut diagnostics)
            .unwrap();
        assert!(attributes.is_empty());
        assert_eq!(diagnostics[0].code, DiagnosticCode::ErrMissingPredefinedMember);
        assert_eq!(
            diagnostics[0].arguments,
            vec!["System.Runtime.CompilerServices.DynamicAttribute", ".ctor"]
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn existing_type_with_both_constructors_is_reused() {
        let flags = TypeSig::sz_array(TypeSig::Primitive(PrimitiveType::Boolean));
        let (table, field) = table_with_field(
            TypeSig::Dynamic,
            Some(vec![
                MethodDecl::constructor(),
                MethodDecl::constructor().parameter(ParameterDecl::new("flags", flags)),
            ]),
        );
        let options = CompilationOptions::library();
        let registry = MarkerRegistry::new();
        let engine = SynthesisEngine::new(&table, &options, &registry);
        let mut diagnostics = Vec::new();
        let attributes = engine
            .synthesized_attributes(field, &AssemblyWellKnownData::default(), &mut diagnostics)
            .unwrap();
        assert!(diagnostics.is_empty());
        assert!(matches!(attributes[0].constructor, ConstructorRef::Method(_)));
        assert!(attributes[0].value.fixed_args.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn missing_marker_without_synthesis() {
        let (table, field) = table_with_field(TypeSig::Dynamic, None);
        let options = CompilationOptions::library().with_synthesize_markers(false);
        let registry = MarkerRegistry::new();
        let engine = SynthesisEngine::new(&table, &options, &registry);
        let mut diagnostics = Vec::new();
        engine
            .synthesized_attributes(field, &AssemblyWellKnownData::default(), &mut diagnostics)
            .unwrap();
        assert_eq!(diagnostics[0].code, DiagnosticCode::ErrDynamicAttributeMissing);
        assert!(registry.is_empty());
    }
}
