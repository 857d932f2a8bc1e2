//! Attribute binding.
//!
//! Binding turns one [`AttributeSyntax`] written on a declaration into a [`BoundAttribute`]:
//!
//! 1. the class name is resolved to an attribute class ([`AttributeClassResolver`])
//! 2. the positional arguments are evaluated to constants ([`ConstantEvaluator`])
//! 3. a constructor is chosen by overload resolution, and optional parameters are filled
//!    from their default values or caller-info substitutions
//! 4. the named arguments are matched to fields and properties of the class
//!
//! Every failure is reported as a [`Diagnostic`] and yields a bound attribute with
//! `has_errors` set, so the usage stays visible to reflection-style consumers while never
//! reaching the encoder. Target specifiers are checked separately by [`route`].

mod bound;
mod conversions;
mod evaluator;
mod overload;
mod resolution;
mod routing;

pub use bound::{AttributeSource, BoundAttribute, ConstructorRef};
pub use conversions::{convert_constant, implicit_numeric, ConversionKind, Conversions};
pub use evaluator::{ArgumentValue, ConstantEvaluator, EvaluatedArgument, LiteralEvaluator};
pub use resolution::AttributeClassResolver;
pub use routing::{route, RoutedTarget, Routing};

use crate::{
    compilation::CompilationOptions,
    metadata::{
        customattributes::{
            ConstantValue, CustomAttributeValue, NamedArgument, NamedArgumentKind, SerType,
        },
        diagnostics::{Diagnostic, DiagnosticCode},
        symbols::{
            Accessibility, AttributeLocation, ImportedAttribute, SymbolData, SymbolId,
            SymbolTable,
        },
        syntax::{AttributeSyntax, Location},
        typesystem::TypeSig,
        wellknown::{check_caller_info, CallerInfoKind, CallerInfoMarker, WellKnownAttributeKind},
    },
};

/// Binds attribute usages against a symbol table.
pub struct AttributeBinder<'a> {
    table: &'a SymbolTable,
    options: &'a CompilationOptions,
    evaluator: &'a dyn ConstantEvaluator,
}

impl<'a> AttributeBinder<'a> {
    /// A binder evaluating arguments with `evaluator`.
    #[must_use]
    pub fn new(
        table: &'a SymbolTable,
        options: &'a CompilationOptions,
        evaluator: &'a dyn ConstantEvaluator,
    ) -> Self {
        AttributeBinder {
            table,
            options,
            evaluator,
        }
    }

    /// Bind `syntax`, written on the declaration of `declared_on`, as an attribute of
    /// `owner` at location `target`.
    ///
    /// Diagnostics are appended to `diagnostics`; the returned attribute has `has_errors`
    /// set when any of them is an error.
    pub fn bind(
        &self,
        syntax: &AttributeSyntax,
        declared_on: SymbolId,
        owner: SymbolId,
        target: AttributeLocation,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> BoundAttribute {
        let resolver = AttributeClassResolver::new(self.table, &self.options.usings);
        let class = match resolver.resolve(declared_on, &syntax.name, &syntax.location) {
            Ok(class) => class,
            Err(diagnostic) => {
                diagnostics.push(diagnostic);
                let name = syntax.name.to_string();
                return self.placeholder(name, None, syntax, declared_on, owner, target);
            }
        };
        let class_name = self.table.type_full_name(class);
        let well_known = WellKnownAttributeKind::from_full_name(&class_name);
        let failed =
            |name: String| self.placeholder(name, Some(class), syntax, declared_on, owner, target);

        match well_known {
            Some(WellKnownAttributeKind::Dynamic) => {
                diagnostics.push(Diagnostic::bare(
                    DiagnosticCode::ErrExplicitDynamicAttr,
                    syntax.location.clone(),
                ));
                return BoundAttribute { well_known, ..failed(class_name) };
            }
            Some(kind) if kind.is_reserved() => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticCode::ErrExplicitReservedAttr,
                    syntax.location.clone(),
                    vec![class_name.clone()],
                ));
                return BoundAttribute { well_known, ..failed(class_name) };
            }
            _ => {}
        }

        let mut arguments = Vec::with_capacity(syntax.arguments.len());
        let mut has_errors = false;
        for expression in &syntax.arguments {
            match self.evaluator.evaluate(self.table, expression, &syntax.location) {
                Ok(argument) => arguments.push(argument),
                Err(diagnostic) => {
                    has_errors = true;
                    diagnostics.push(diagnostic);
                }
            }
        }
        if has_errors {
            return BoundAttribute { well_known, ..failed(class_name) };
        }

        let conversions = Conversions::new(self.table);
        let candidate = match overload::resolve_constructor(
            self.table,
            &conversions,
            class,
            &arguments,
            &syntax.location,
        ) {
            Ok(candidate) => candidate,
            Err(diagnostic) => {
                diagnostics.push(diagnostic);
                return BoundAttribute { well_known, ..failed(class_name) };
            }
        };

        let mut constructor_params = Vec::with_capacity(candidate.parameters.len());
        let mut fixed_args = Vec::with_capacity(candidate.parameters.len());
        for (index, (parameter, ty)) in candidate
            .parameters
            .iter()
            .zip(candidate.parameter_types.iter())
            .enumerate()
        {
            let Some(slot) = conversions.slot_type(ty) else {
                let name = self.table.get(*parameter).map(|s| s.name.clone()).unwrap_or_default();
                diagnostics.push(Diagnostic::new(
                    DiagnosticCode::ErrBadAttributeParamType,
                    syntax.location.clone(),
                    vec![name, self.table.display_type(ty)],
                ));
                has_errors = true;
                continue;
            };

            let argument = match arguments.get(index) {
                Some(argument) => argument.clone(),
                None => self.default_argument(*parameter, ty, owner, &syntax.location),
            };
            match conversions.value_in_slot(&argument, &slot) {
                Some(value) => fixed_args.push(value),
                None => {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticCode::ErrNoImplicitConv,
                        argument.location.clone(),
                        vec![argument.display_type(self.table), self.table.display_type(ty)],
                    ));
                    has_errors = true;
                }
            }
            constructor_params.push(slot);
        }

        let named_args = self.bind_named(syntax, class, &conversions, diagnostics, &mut has_errors);
        self.check_obsolete(candidate.constructor, &syntax.location, diagnostics, &mut has_errors);

        log::trace!("bound [{class_name}] on {owner}");
        BoundAttribute {
            class_name,
            class: Some(class),
            constructor: ConstructorRef::Method(candidate.constructor),
            constructor_params,
            value: CustomAttributeValue { fixed_args, named_args },
            owner,
            declared_on,
            location: syntax.location.clone(),
            target,
            has_errors,
            ignored_location: false,
            duplicate_suppressed: false,
            source: AttributeSource::Source,
            well_known,
        }
    }

    /// Bind an attribute read from metadata. The constructor is matched by its parameter
    /// slot types and recorded as [`ConstructorRef::External`] when nothing matches.
    #[must_use]
    pub fn bind_imported(
        &self,
        imported: &ImportedAttribute,
        owner: SymbolId,
        target: AttributeLocation,
        source: AttributeSource,
    ) -> BoundAttribute {
        let class = self.table.lookup_type(&imported.class);
        let conversions = Conversions::new(self.table);
        let constructor = class
            .and_then(|class| {
                self.table.constructors(class).into_iter().find(|ctor| {
                    let slots: Option<Vec<SerType>> = self
                        .table
                        .parameters(*ctor)
                        .iter()
                        .map(|p| {
                            self.table
                                .get(*p)
                                .ok()
                                .and_then(|s| s.declared_type())
                                .and_then(|ty| conversions.slot_type(ty))
                        })
                        .collect();
                    slots.as_deref() == Some(imported.constructor.as_slice())
                })
            })
            .map_or(ConstructorRef::External, ConstructorRef::Method);

        BoundAttribute {
            class_name: imported.class.clone(),
            class,
            constructor,
            constructor_params: imported.constructor.clone(),
            value: imported.value.clone(),
            owner,
            declared_on: owner,
            location: Location::none(),
            target,
            has_errors: false,
            ignored_location: false,
            duplicate_suppressed: false,
            source,
            well_known: WellKnownAttributeKind::from_full_name(&imported.class),
        }
    }

    /// The caller-info substitution active on `parameter`, computed from the parameter's
    /// own attribute syntax without binding it.
    #[must_use]
    pub fn active_caller_info(&self, parameter: SymbolId) -> Option<CallerInfoKind> {
        let symbol = self.table.get(parameter).ok()?;
        let resolver = AttributeClassResolver::new(self.table, &self.options.usings);
        let mut markers: Vec<CallerInfoMarker> = symbol
            .attribute_lists
            .iter()
            .filter_map(|syntax| {
                let class = resolver.resolve_quiet(parameter, &syntax.name)?;
                let kind = WellKnownAttributeKind::from_full_name(&self.table.type_full_name(class))?
                    .caller_info()?;
                Some(CallerInfoMarker {
                    kind,
                    location: syntax.location.clone(),
                })
            })
            .collect();
        markers.extend(symbol.imported_attributes.iter().filter_map(|imported| {
            let kind = WellKnownAttributeKind::from_full_name(&imported.class)?.caller_info()?;
            Some(CallerInfoMarker {
                kind,
                location: Location::none(),
            })
        }));
        if markers.is_empty() {
            return None;
        }
        check_caller_info(self.table, parameter, &markers, None).active
    }

    fn default_argument(
        &self,
        parameter: SymbolId,
        ty: &TypeSig,
        owner: SymbolId,
        location: &Location,
    ) -> EvaluatedArgument {
        let substituted = match self.active_caller_info(parameter) {
            Some(CallerInfoKind::LineNumber) => Some((
                Some(TypeSig::int()),
                ConstantValue::I4(
                    location
                        .line()
                        .map_or(0, |line| i32::try_from(line).unwrap_or(i32::MAX)),
                ),
            )),
            Some(CallerInfoKind::FilePath) => Some((
                Some(TypeSig::String),
                ConstantValue::String(location.file().unwrap_or_default().to_string()),
            )),
            Some(CallerInfoKind::MemberName) => Some(match self.table.caller_member_name(owner) {
                Some(name) => (Some(TypeSig::String), ConstantValue::String(name)),
                None => (None, ConstantValue::Null),
            }),
            None => None,
        };
        if let Some((natural, value)) = substituted {
            return EvaluatedArgument::constant(natural, value, location.clone());
        }

        let default = self
            .table
            .get(parameter)
            .ok()
            .and_then(|s| s.as_parameter())
            .and_then(|p| p.default_value.clone())
            .unwrap_or(ConstantValue::Null);
        let natural = (!default.is_null()).then(|| ty.clone());
        EvaluatedArgument::constant(natural, default, location.clone())
    }

    fn bind_named(
        &self,
        syntax: &AttributeSyntax,
        class: SymbolId,
        conversions: &Conversions<'_>,
        diagnostics: &mut Vec<Diagnostic>,
        has_errors: &mut bool,
    ) -> Vec<NamedArgument> {
        let mut named_args: Vec<NamedArgument> = Vec::with_capacity(syntax.named_arguments.len());
        let mut error = |diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic| {
            diagnostics.push(diagnostic);
            *has_errors = true;
        };

        for named in &syntax.named_arguments {
            let Some(member) = self
                .table
                .find_field_or_property(class, &named.name)
                .and_then(|m| self.table.get(m).ok())
            else {
                error(
                    diagnostics,
                    Diagnostic::new(
                        DiagnosticCode::ErrNameNotInContext,
                        named.location.clone(),
                        vec![named.name.clone()],
                    ),
                );
                continue;
            };

            let (kind, ty, valid) = match &member.data {
                SymbolData::Field(field) => (
                    NamedArgumentKind::Field,
                    field.ty.clone(),
                    !member.is_static && !field.is_readonly && !field.is_const,
                ),
                SymbolData::Property(property) => (
                    NamedArgumentKind::Property,
                    property.ty.clone(),
                    !member.is_static
                        && member.accessibility == Accessibility::Public
                        && property.getter.is_some()
                        && property.setter.is_some(),
                ),
                _ => continue,
            };
            if !valid {
                error(
                    diagnostics,
                    Diagnostic::new(
                        DiagnosticCode::ErrBadNamedAttributeArgument,
                        named.location.clone(),
                        vec![named.name.clone()],
                    ),
                );
                continue;
            }
            if named_args.iter().any(|existing| existing.name == named.name) {
                error(
                    diagnostics,
                    Diagnostic::new(
                        DiagnosticCode::ErrDuplicateNamedAttributeArgument,
                        named.location.clone(),
                        vec![named.name.clone()],
                    ),
                );
                continue;
            }
            if conversions.slot_type(&ty).is_none() {
                error(
                    diagnostics,
                    Diagnostic::new(
                        DiagnosticCode::ErrBadNamedAttributeArgumentType,
                        named.location.clone(),
                        vec![named.name.clone()],
                    ),
                );
                continue;
            }

            let argument = match self.evaluator.evaluate(self.table, &named.value, &named.location) {
                Ok(argument) => argument,
                Err(diagnostic) => {
                    error(diagnostics, diagnostic);
                    continue;
                }
            };
            let value = conversions
                .classify(&argument, &ty)
                .and_then(|_| conversions.to_typed_constant(&argument, &ty));
            match value {
                Some(value) => named_args.push(NamedArgument {
                    kind,
                    name: named.name.clone(),
                    value,
                }),
                None => error(
                    diagnostics,
                    Diagnostic::new(
                        DiagnosticCode::ErrNoImplicitConv,
                        named.location.clone(),
                        vec![argument.display_type(self.table), self.table.display_type(&ty)],
                    ),
                ),
            }
        }
        named_args
    }

    fn check_obsolete(
        &self,
        constructor: SymbolId,
        location: &Location,
        diagnostics: &mut Vec<Diagnostic>,
        has_errors: &mut bool,
    ) {
        let Some(obsolete) = self
            .table
            .get(constructor)
            .ok()
            .and_then(|s| s.as_method())
            .and_then(|m| m.obsolete.as_ref())
        else {
            return;
        };
        let display = self.table.method_display(constructor);
        let diagnostic = match (&obsolete.message, obsolete.is_error) {
            (message, true) => {
                *has_errors = true;
                Diagnostic::new(
                    DiagnosticCode::ErrDeprecatedSymbolStr,
                    location.clone(),
                    vec![display, message.clone().unwrap_or_default()],
                )
            }
            (Some(message), false) => Diagnostic::new(
                DiagnosticCode::WrnDeprecatedSymbolStr,
                location.clone(),
                vec![display, message.clone()],
            ),
            (None, false) => {
                Diagnostic::new(DiagnosticCode::WrnDeprecatedSymbol, location.clone(), vec![display])
            }
        };
        diagnostics.push(diagnostic);
    }

    fn placeholder(
        &self,
        class_name: String,
        class: Option<SymbolId>,
        syntax: &AttributeSyntax,
        declared_on: SymbolId,
        owner: SymbolId,
        target: AttributeLocation,
    ) -> BoundAttribute {
        BoundAttribute {
            class_name,
            class,
            constructor: ConstructorRef::External,
            constructor_params: Vec::new(),
            value: CustomAttributeValue::default(),
            owner,
            declared_on,
            location: syntax.location.clone(),
            target,
            has_errors: true,
            ignored_location: false,
            duplicate_suppressed: false,
            source: AttributeSource::Source,
            well_known: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        customattributes::TypedConstant,
        symbols::{
            FieldDecl, MethodDecl, ObsoleteData, ParameterDecl, PropertyDecl, SymbolTableBuilder,
            TypeDecl,
        },
        syntax::Expression,
        typesystem::PrimitiveType,
    };

    struct Fixture {
        table: SymbolTable,
        class: SymbolId,
        target: SymbolId,
    }

    fn fixture() -> Fixture {
        let mut builder = SymbolTableBuilder::new("App", "App.dll");
        let object = builder.add_type(None, TypeDecl::class("System", "Object")).unwrap();
        builder
            .add_type(None, TypeDecl::class("System", "String").base(TypeSig::named(object)))
            .unwrap();
        let attribute = builder
            .add_type(
                None,
                TypeDecl::class("System", "Attribute").abstract_().base(TypeSig::named(object)),
            )
            .unwrap();
        let services = "System.Runtime.CompilerServices";
        let line = builder
            .add_type(
                None,
                TypeDecl::class(services, "CallerLineNumberAttribute").base(TypeSig::named(attribute)),
            )
            .unwrap();
        builder.add_method(line, MethodDecl::constructor()).unwrap();
        let dynamic = builder
            .add_type(
                None,
                TypeDecl::class(services, "DynamicAttribute").base(TypeSig::named(attribute)),
            )
            .unwrap();
        builder.add_method(dynamic, MethodDecl::constructor()).unwrap();

        let class = builder
            .add_type(None, TypeDecl::class("N", "InfoAttribute").base(TypeSig::named(attribute)))
            .unwrap();
        builder
            .add_method(
                class,
                MethodDecl::constructor()
                    .parameter(ParameterDecl::new("text", TypeSig::String))
                    .parameter(
                        ParameterDecl::new("line", TypeSig::int())
                            .default(ConstantValue::I4(-1))
                            .attribute(AttributeSyntax::new("System.Runtime.CompilerServices.CallerLineNumber")),
                    ),
            )
            .unwrap();
        builder
            .add_method(
                class,
                MethodDecl::constructor()
                    .parameter(ParameterDecl::new("flag", TypeSig::Primitive(PrimitiveType::Boolean)))
                    .obsolete(ObsoleteData {
                        message: Some("use text".into()),
                        is_error: false,
                    }),
            )
            .unwrap();
        builder.add_field(class, FieldDecl::new("Tag", TypeSig::String)).unwrap();
        builder
            .add_field(class, FieldDecl::new("Fixed", TypeSig::int()).readonly())
            .unwrap();
        builder
            .add_property(class, PropertyDecl::new("Order", TypeSig::int()))
            .unwrap();
        builder
            .add_property(class, PropertyDecl::new("Id", TypeSig::int()).read_only())
            .unwrap();
        let target = builder.add_type(None, TypeDecl::class("N", "Target")).unwrap();
        Fixture {
            table: builder.build(),
            class,
            target,
        }
    }

    fn bind(fixture: &Fixture, syntax: &AttributeSyntax) -> (BoundAttribute, Vec<Diagnostic>) {
        let options = CompilationOptions::library();
        let evaluator = LiteralEvaluator::new();
        let binder = AttributeBinder::new(&fixture.table, &options, &evaluator);
        let mut diagnostics = Vec::new();
        let bound = binder.bind(
            syntax,
            fixture.target,
            fixture.target,
            AttributeLocation::Type,
            &mut diagnostics,
        );
        (bound, diagnostics)
    }

    #[test]
    fn caller_line_fills_the_optional_parameter() {
        let fixture = fixture();
        let syntax = AttributeSyntax::new("Info")
            .arg(Expression::string("hello"))
            .named("Tag", Expression::string("t"))
            .named("Order", Expression::int(3))
            .at(Location::source("a.cs", 12, 2));
        let (bound, diagnostics) = bind(&fixture, &syntax);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(bound.class, Some(fixture.class));
        assert_eq!(bound.class_name, "N.InfoAttribute");
        assert_eq!(bound.constructor_params, vec![SerType::String, SerType::I4]);
        assert_eq!(
            bound.value.fixed_args,
            vec![TypedConstant::string("hello"), TypedConstant::i4(12)]
        );
        assert_eq!(bound.value.named_args.len(), 2);
        assert_eq!(bound.value.named_args[0].kind, NamedArgumentKind::Field);
        assert_eq!(bound.value.named_args[1].kind, NamedArgumentKind::Property);
        assert!(!bound.has_errors);
    }

    #[test]
    fn named_argument_rules() {
        let fixture = fixture();
        let syntax = AttributeSyntax::new("Info")
            .arg(Expression::string("x"))
            .named("Missing", Expression::int(1))
            .named("Fixed", Expression::int(1))
            .named("Id", Expression::int(1))
            .named("Tag", Expression::string("a"))
            .named("Tag", Expression::string("b"))
            .named("Order", Expression::string("c"));
        let (bound, diagnostics) = bind(&fixture, &syntax);
        let codes: Vec<_> = diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![
                DiagnosticCode::ErrNameNotInContext,
                DiagnosticCode::ErrBadNamedAttributeArgument,
                DiagnosticCode::ErrBadNamedAttributeArgument,
                DiagnosticCode::ErrDuplicateNamedAttributeArgument,
                DiagnosticCode::ErrNoImplicitConv,
            ]
        );
        assert!(bound.has_errors);
    }

    #[test]
    fn obsolete_constructor_warns() {
        let fixture = fixture();
        let (bound, diagnostics) = bind(&fixture, &AttributeSyntax::new("Info").arg(Expression::bool(true)));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::WrnDeprecatedSymbolStr);
        assert_eq!(diagnostics[0].arguments[1], "use text");
        assert!(!bound.has_errors);
    }

    #[test]
    fn reserved_and_unresolved_names() {
        let fixture = fixture();
        let (bound, diagnostics) = bind(
            &fixture,
            &AttributeSyntax::new("System.Runtime.CompilerServices.Dynamic"),
        );
        assert_eq!(diagnostics[0].code, DiagnosticCode::ErrExplicitDynamicAttr);
        assert!(bound.has_errors);
        assert_eq!(bound.well_known, Some(WellKnownAttributeKind::Dynamic));

        let (bound, diagnostics) = bind(&fixture, &AttributeSyntax::new("Nope"));
        assert_eq!(diagnostics[0].code, DiagnosticCode::ErrSingleTypeNameNotFound);
        assert_eq!(bound.class_name, "Nope");
        assert_eq!(bound.class, None);
    }

    #[test]
    fn early_caller_info_reads_parameter_syntax() {
        let fixture = fixture();
        let options = CompilationOptions::library();
        let evaluator = LiteralEvaluator::new();
        let binder = AttributeBinder::new(&fixture.table, &options, &evaluator);
        let ctor = fixture.table.constructors(fixture.class)[0];
        let line = fixture.table.parameters(ctor)[1];
        assert_eq!(binder.active_caller_info(line), Some(CallerInfoKind::LineNumber));
        let text = fixture.table.parameters(ctor)[0];
        assert_eq!(binder.active_caller_info(text), None);
    }
}
