//! Attribute class name lookup.
//!
//! An attribute name `X` is looked up as both `X` and `XAttribute` (only `X` when written
//! verbatim as `@X`) in a sequence of scopes, innermost first:
//! 1. the types containing the declaration, for nested attribute classes
//! 2. the declaration's namespace and each enclosing namespace, out to the global namespace
//! 3. the namespaces imported by the compilation's `using` directives
//!
//! The first scope in which either candidate names a type decides the result.

use crate::metadata::{
    diagnostics::{Diagnostic, DiagnosticCode},
    symbols::{SymbolId, SymbolTable},
    syntax::{AttributeName, Location},
    typesystem::TypeSig,
};

const ATTRIBUTE_SUFFIX: &str = "Attribute";
const MAX_GENERIC_ARITY: usize = 8;

enum Scope {
    Type(SymbolId),
    Namespace(String),
    Usings,
}

/// Resolves attribute names written on declarations to attribute classes.
pub struct AttributeClassResolver<'a> {
    table: &'a SymbolTable,
    usings: &'a [String],
}

impl<'a> AttributeClassResolver<'a> {
    /// A resolver over `table` with the given imported namespaces.
    #[must_use]
    pub fn new(table: &'a SymbolTable, usings: &'a [String]) -> Self {
        AttributeClassResolver { table, usings }
    }

    /// Resolve `name`, written on the declaration of `declared_on`, to an applicable
    /// attribute class.
    ///
    /// # Errors
    /// Returns the diagnostic describing why the name does not denote an attribute class
    /// that can be applied: not found, ambiguous, not an attribute class, generic or
    /// abstract.
    pub fn resolve(
        &self,
        declared_on: SymbolId,
        name: &AttributeName,
        location: &Location,
    ) -> Result<SymbolId, Diagnostic> {
        let class = self.lookup(declared_on, name, location)?;
        let display = self.table.display_type(&TypeSig::named(class));
        let data = self
            .table
            .get(class)
            .ok()
            .and_then(|s| s.as_type())
            .ok_or_else(|| {
                Diagnostic::new(
                    DiagnosticCode::ErrNotAnAttributeClass,
                    location.clone(),
                    vec![display.clone()],
                )
            })?;
        if !data.type_parameters.is_empty() {
            return Err(Diagnostic::new(
                DiagnosticCode::ErrAttributeCantBeGeneric,
                location.clone(),
                vec![display],
            ));
        }
        if data.is_abstract {
            return Err(Diagnostic::new(
                DiagnosticCode::ErrAbstractAttributeClass,
                location.clone(),
                vec![display],
            ));
        }
        Ok(class)
    }

    /// The attribute class `name` denotes, without the generic and abstract checks and
    /// without a diagnostic.
    #[must_use]
    pub fn resolve_quiet(&self, declared_on: SymbolId, name: &AttributeName) -> Option<SymbolId> {
        self.lookup(declared_on, name, &Location::None).ok()
    }

    fn lookup(
        &self,
        declared_on: SymbolId,
        name: &AttributeName,
        location: &Location,
    ) -> Result<SymbolId, Diagnostic> {
        let simple = name.simple_name();
        let mut candidates = vec![simple.to_string()];
        if !name.verbatim {
            candidates.push(format!("{simple}{ATTRIBUTE_SUFFIX}"));
        }

        for scope in self.scopes(declared_on, name) {
            let found: Vec<Option<SymbolId>> = candidates
                .iter()
                .map(|candidate| self.find_in(&scope, name, candidate))
                .collect();
            let exact = found.first().copied().flatten();
            let suffixed = found.get(1).copied().flatten();
            if exact.is_none() && suffixed.is_none() {
                continue;
            }
            return self.choose(name, exact, suffixed, location);
        }

        Err(Diagnostic::new(
            DiagnosticCode::ErrSingleTypeNameNotFound,
            location.clone(),
            vec![name.to_string().trim_start_matches('@').to_string()],
        ))
    }

    fn choose(
        &self,
        name: &AttributeName,
        exact: Option<SymbolId>,
        suffixed: Option<SymbolId>,
        location: &Location,
    ) -> Result<SymbolId, Diagnostic> {
        let is_attribute =
            |id: Option<SymbolId>| id.is_some_and(|id| self.table.is_attribute_class(id));
        let display = |id: SymbolId| self.table.display_type(&TypeSig::named(id));

        match (exact, suffixed) {
            (Some(x), Some(xa)) if is_attribute(exact) && is_attribute(suffixed) => {
                Err(Diagnostic::new(
                    DiagnosticCode::ErrAmbiguousAttribute,
                    location.clone(),
                    vec![name.simple_name().to_string(), display(x), display(xa)],
                ))
            }
            (Some(x), _) if is_attribute(exact) => Ok(x),
            (_, Some(xa)) if is_attribute(suffixed) => Ok(xa),
            (Some(other), _) | (None, Some(other)) => Err(Diagnostic::new(
                DiagnosticCode::ErrNotAnAttributeClass,
                location.clone(),
                vec![display(other)],
            )),
            (None, None) => Err(Diagnostic::new(
                DiagnosticCode::ErrSingleTypeNameNotFound,
                location.clone(),
                vec![name.simple_name().to_string()],
            )),
        }
    }

    fn scopes(&self, declared_on: SymbolId, name: &AttributeName) -> Vec<Scope> {
        let mut scopes = Vec::new();
        let qualified = !name.qualifier().is_empty();

        let mut outermost = None;
        let mut current = self.table.containing_type(declared_on);
        while let Some(ty) = current {
            if !qualified {
                scopes.push(Scope::Type(ty));
            }
            outermost = Some(ty);
            current = self.table.containing_type(ty);
        }

        let top = outermost.or_else(|| {
            self.table
                .get(declared_on)
                .ok()
                .filter(|s| s.as_type().is_some())
                .map(|s| s.id)
        });
        let namespace = top
            .and_then(|id| self.table.get(id).ok())
            .and_then(|s| s.as_type())
            .map(|t| t.namespace.clone())
            .unwrap_or_default();

        let mut segments: Vec<&str> = namespace.split('.').filter(|s| !s.is_empty()).collect();
        loop {
            scopes.push(Scope::Namespace(segments.join(".")));
            if segments.pop().is_none() {
                break;
            }
        }

        if !qualified {
            scopes.push(Scope::Usings);
        }
        scopes
    }

    fn find_in(&self, scope: &Scope, name: &AttributeName, candidate: &str) -> Option<SymbolId> {
        let qualifier = name.qualifier().join(".");
        let relative = if qualifier.is_empty() {
            candidate.to_string()
        } else {
            format!("{qualifier}.{candidate}")
        };
        match scope {
            Scope::Type(ty) => {
                self.lookup_any_arity(&format!("{}+{relative}", self.table.type_full_name(*ty)))
            }
            Scope::Namespace(namespace) if namespace.is_empty() => self.lookup_any_arity(&relative),
            Scope::Namespace(namespace) => {
                self.lookup_any_arity(&format!("{namespace}.{relative}"))
            }
            Scope::Usings => self
                .usings
                .iter()
                .find_map(|using| self.lookup_any_arity(&format!("{using}.{relative}"))),
        }
    }

    /// A type named `full_name`, or failing that a generic type of that name.
    fn lookup_any_arity(&self, full_name: &str) -> Option<SymbolId> {
        self.table.lookup_type(full_name).or_else(|| {
            (1..=MAX_GENERIC_ARITY)
                .find_map(|arity| self.table.lookup_type(&format!("{full_name}`{arity}")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::symbols::{SymbolTableBuilder, TypeDecl};

    struct Fixture {
        table: SymbolTable,
        user: SymbolId,
        attribute_attr: SymbolId,
    }

    fn fixture() -> Fixture {
        let mut builder = SymbolTableBuilder::new("App", "App.dll");
        let object = builder.add_type(None, TypeDecl::class("System", "Object")).unwrap();
        let attribute = builder
            .add_type(
                None,
                TypeDecl::class("System", "Attribute").abstract_().base(TypeSig::named(object)),
            )
            .unwrap();
        let base = TypeSig::named(attribute);
        builder
            .add_type(None, TypeDecl::class("N", "X").base(base.clone()))
            .unwrap();
        builder
            .add_type(None, TypeDecl::class("N", "XAttribute").base(base.clone()))
            .unwrap();
        builder
            .add_type(None, TypeDecl::class("N", "Plain").base(TypeSig::named(object)))
            .unwrap();
        let attribute_attr = builder
            .add_type(None, TypeDecl::class("N", "OnlyAttribute").base(base.clone()))
            .unwrap();
        builder
            .add_type(None, TypeDecl::class("N", "AbsAttribute").base(base.clone()).abstract_())
            .unwrap();
        builder
            .add_type(None, TypeDecl::class("N", "GenAttribute").base(base).type_parameter("T"))
            .unwrap();
        let user = builder.add_type(None, TypeDecl::class("N", "User")).unwrap();
        Fixture {
            table: builder.build(),
            user,
            attribute_attr,
        }
    }

    fn resolve(fixture: &Fixture, name: &str) -> Result<SymbolId, Diagnostic> {
        AttributeClassResolver::new(&fixture.table, &[]).resolve(
            fixture.user,
            &AttributeName::parse(name),
            &Location::none(),
        )
    }

    #[test]
    fn suffix_is_tried() {
        let fixture = fixture();
        assert_eq!(resolve(&fixture, "Only").unwrap(), fixture.attribute_attr);
        assert_eq!(resolve(&fixture, "OnlyAttribute").unwrap(), fixture.attribute_attr);
    }

    #[test]
    fn both_forms_are_ambiguous_unless_verbatim() {
        let fixture = fixture();
        let err = resolve(&fixture, "X").unwrap_err();
        assert_eq!(err.code, DiagnosticCode::ErrAmbiguousAttribute);
        assert_eq!(err.arguments, vec!["X", "N.X", "N.XAttribute"]);

        let exact = resolve(&fixture, "@X").unwrap();
        assert_eq!(fixture.table.type_full_name(exact), "N.X");
    }

    #[test]
    fn class_checks() {
        let fixture = fixture();
        let code = |name: &str| resolve(&fixture, name).unwrap_err().code;
        assert_eq!(code("Missing"), DiagnosticCode::ErrSingleTypeNameNotFound);
        assert_eq!(code("Plain"), DiagnosticCode::ErrNotAnAttributeClass);
        assert_eq!(code("Abs"), DiagnosticCode::ErrAbstractAttributeClass);
        assert_eq!(code("Gen"), DiagnosticCode::ErrAttributeCantBeGeneric);
    }

    #[test]
    fn qualified_and_imported_names() {
        let fixture = fixture();
        let qualified = resolve(&fixture, "N.Only").unwrap();
        assert_eq!(qualified, fixture.attribute_attr);

        let usings = vec!["N".to_string()];
        let from_global = AttributeClassResolver::new(&fixture.table, &usings)
            .resolve(fixture.table.source_module(), &AttributeName::parse("Only"), &Location::none())
            .unwrap();
        assert_eq!(from_global, fixture.attribute_attr);
    }
}
