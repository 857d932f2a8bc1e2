//! Symbol storage and queries.

use std::collections::HashMap;

use crate::{
    metadata::{
        symbols::{MethodKind, Symbol, SymbolData, SymbolId, SymbolKind, SymbolOrigin, TypeKind},
        typesystem::{PrimitiveType, TypeSig},
    },
    Error, Result,
};

/// Full name of the root of all attribute classes.
pub(crate) const SYSTEM_ATTRIBUTE: &str = "System.Attribute";
/// Full name of `System.Type`.
pub(crate) const SYSTEM_TYPE: &str = "System.Type";

/// The immutable declaration graph of one compilation.
///
/// Holds the source assembly, its single source module, and every referenced assembly with
/// the types imported from it. Type lookup by full name prefers source types over referenced
/// ones of the same name.
#[derive(Debug)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    types_by_name: HashMap<String, Vec<SymbolId>>,
    assembly: SymbolId,
    module: SymbolId,
    references: Vec<SymbolId>,
    corlib: Option<SymbolId>,
}

impl SymbolTable {
    pub(crate) fn from_parts(
        symbols: Vec<Symbol>,
        assembly: SymbolId,
        module: SymbolId,
        references: Vec<SymbolId>,
    ) -> Self {
        let mut table = SymbolTable {
            symbols,
            types_by_name: HashMap::new(),
            assembly,
            module,
            references,
            corlib: None,
        };

        let mut by_name: HashMap<String, Vec<SymbolId>> = HashMap::new();
        for symbol in &table.symbols {
            if symbol.as_type().is_some() {
                by_name
                    .entry(table.type_full_name(symbol.id))
                    .or_default()
                    .push(symbol.id);
            }
        }
        for ids in by_name.values_mut() {
            let symbols = &table.symbols;
            ids.sort_by_key(|id| (!symbols[id.index()].is_source(), *id));
        }
        table.corlib = by_name
            .get("System.Object")
            .and_then(|ids| ids.first())
            .map(|id| table.assembly_of(*id));
        table.types_by_name = by_name;
        table
    }

    /// Fetch a symbol.
    ///
    /// # Errors
    /// Returns [`crate::Error::SymbolNotFound`] if `id` is not part of this table.
    pub fn get(&self, id: SymbolId) -> Result<&Symbol> {
        self.symbols.get(id.index()).ok_or(Error::SymbolNotFound(id))
    }

    /// Number of symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the table is empty; never true for a built compilation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// All symbols in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    /// The assembly being compiled.
    #[must_use]
    pub fn source_assembly(&self) -> SymbolId {
        self.assembly
    }

    /// The source module.
    #[must_use]
    pub fn source_module(&self) -> SymbolId {
        self.module
    }

    /// Referenced assemblies in reference order.
    #[must_use]
    pub fn references(&self) -> &[SymbolId] {
        &self.references
    }

    /// The referenced assembly defining `System.Object`.
    #[must_use]
    pub fn corlib(&self) -> Option<SymbolId> {
        self.corlib
    }

    /// The preferred type with the given full name.
    #[must_use]
    pub fn lookup_type(&self, full_name: &str) -> Option<SymbolId> {
        self.lookup_types(full_name).first().copied()
    }

    /// All types with the given full name, source types first.
    #[must_use]
    pub fn lookup_types(&self, full_name: &str) -> &[SymbolId] {
        self.types_by_name
            .get(full_name)
            .map_or(&[][..], Vec::as_slice)
    }

    /// Metadata name of a type: simple name plus the generic arity suffix.
    #[must_use]
    pub fn metadata_name(&self, symbol: &Symbol) -> String {
        match symbol.as_type() {
            Some(t) if !t.type_parameters.is_empty() => {
                format!("{}`{}", symbol.name, t.type_parameters.len())
            }
            _ => symbol.name.clone(),
        }
    }

    /// Reflection full name of a type (`N.C`, `N.Outer+Inner`, `N.G`1`).
    #[must_use]
    pub fn type_full_name(&self, id: SymbolId) -> String {
        let Some(symbol) = self.symbols.get(id.index()) else {
            return String::new();
        };
        let Some(data) = symbol.as_type() else {
            return symbol.name.clone();
        };
        let name = self.metadata_name(symbol);
        if let Some(outer) = symbol
            .container
            .filter(|c| self.symbols.get(c.index()).is_some_and(|s| s.as_type().is_some()))
        {
            return format!("{}+{}", self.type_full_name(outer), name);
        }
        if data.namespace.is_empty() {
            name
        } else {
            format!("{}.{}", data.namespace, name)
        }
    }

    /// The assembly a symbol belongs to.
    #[must_use]
    pub fn assembly_of(&self, id: SymbolId) -> SymbolId {
        match self.symbols.get(id.index()).map(|s| s.origin) {
            Some(SymbolOrigin::Referenced(assembly) | SymbolOrigin::Embedded(assembly)) => {
                assembly
            }
            _ => self.assembly,
        }
    }

    /// The nearest containing type.
    #[must_use]
    pub fn containing_type(&self, id: SymbolId) -> Option<SymbolId> {
        let mut current = self.symbols.get(id.index())?.container;
        while let Some(candidate) = current {
            let symbol = self.symbols.get(candidate.index())?;
            if symbol.as_type().is_some() {
                return Some(candidate);
            }
            current = symbol.container;
        }
        None
    }

    /// The nearest containing method.
    #[must_use]
    pub fn containing_method(&self, id: SymbolId) -> Option<SymbolId> {
        let container = self.symbols.get(id.index())?.container?;
        self.symbols
            .get(container.index())
            .filter(|s| s.as_method().is_some())
            .map(|s| s.id)
    }

    /// The base type definition.
    #[must_use]
    pub fn base_type(&self, id: SymbolId) -> Option<SymbolId> {
        self.symbols
            .get(id.index())?
            .as_type()?
            .base
            .as_ref()?
            .definition()
    }

    /// Whether `id` is, or derives from, the type named `full_name`.
    #[must_use]
    pub fn derives_from(&self, id: SymbolId, full_name: &str) -> bool {
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(ty) = current {
            if self.type_full_name(ty) == full_name {
                return true;
            }
            steps += 1;
            if steps > self.symbols.len() {
                return false;
            }
            current = self.base_type(ty);
        }
        false
    }

    /// Every interface `id` implements, through its bases and through interface inheritance.
    #[must_use]
    pub fn all_interfaces(&self, id: SymbolId) -> Vec<TypeSig> {
        let mut found: Vec<TypeSig> = Vec::new();
        let mut pending: Vec<SymbolId> = vec![id];
        let mut visited: Vec<SymbolId> = Vec::new();
        while let Some(current) = pending.pop() {
            if visited.contains(&current) {
                continue;
            }
            visited.push(current);
            let Some(data) = self.symbols.get(current.index()).and_then(Symbol::as_type) else {
                continue;
            };
            for interface in &data.interfaces {
                if !found.contains(interface) {
                    found.push(interface.clone());
                }
                if let Some(def) = interface.definition() {
                    pending.push(def);
                }
            }
            if let Some(base) = self.base_type(current) {
                pending.push(base);
            }
        }
        found
    }

    /// Whether `id` is a class deriving from `System.Attribute`.
    #[must_use]
    pub fn is_attribute_class(&self, id: SymbolId) -> bool {
        self.symbols
            .get(id.index())
            .and_then(Symbol::as_type)
            .is_some_and(|t| t.kind == TypeKind::Class)
            && self.derives_from(id, SYSTEM_ATTRIBUTE)
    }

    /// Instance constructors of a type in declaration order.
    #[must_use]
    pub fn constructors(&self, ty: SymbolId) -> Vec<SymbolId> {
        self.members(ty)
            .iter()
            .copied()
            .filter(|member| {
                self.symbols.get(member.index()).is_some_and(|s| {
                    !s.is_static && matches!(s.kind(), SymbolKind::Method(MethodKind::Constructor))
                })
            })
            .collect()
    }

    /// Members of a type in declaration order.
    #[must_use]
    pub fn members(&self, ty: SymbolId) -> &[SymbolId] {
        self.symbols
            .get(ty.index())
            .and_then(Symbol::as_type)
            .map_or(&[][..], |t| t.members.as_slice())
    }

    /// Find a field or property named `name` on `ty` or one of its base types.
    #[must_use]
    pub fn find_field_or_property(&self, ty: SymbolId, name: &str) -> Option<SymbolId> {
        let mut current = Some(ty);
        let mut steps = 0;
        while let Some(t) = current {
            let found = self.members(t).iter().copied().find(|member| {
                self.symbols.get(member.index()).is_some_and(|s| {
                    s.name == name && matches!(s.kind(), SymbolKind::Field | SymbolKind::Property)
                })
            });
            if found.is_some() {
                return found;
            }
            steps += 1;
            if steps > self.symbols.len() {
                return None;
            }
            current = self.base_type(t);
        }
        None
    }

    /// Find a constant field named `name` on `ty`.
    #[must_use]
    pub fn find_constant(&self, ty: SymbolId, name: &str) -> Option<&Symbol> {
        self.members(ty)
            .iter()
            .filter_map(|member| self.symbols.get(member.index()))
            .find(|s| s.name == name && s.as_field().is_some_and(|f| f.constant.is_some()))
    }

    /// Parameters of a method.
    #[must_use]
    pub fn parameters(&self, method: SymbolId) -> &[SymbolId] {
        self.symbols
            .get(method.index())
            .and_then(Symbol::as_method)
            .map_or(&[][..], |m| m.parameters.as_slice())
    }

    /// Underlying type of an enum.
    #[must_use]
    pub fn enum_underlying(&self, ty: SymbolId) -> Option<PrimitiveType> {
        let data = self.symbols.get(ty.index())?.as_type()?;
        match data.kind {
            TypeKind::Enum => Some(data.enum_underlying.unwrap_or(PrimitiveType::Int32)),
            _ => None,
        }
    }

    /// Whether `sig` names `System.Type`.
    #[must_use]
    pub fn is_system_type(&self, sig: &TypeSig) -> bool {
        sig.definition()
            .is_some_and(|def| self.type_full_name(def) == SYSTEM_TYPE)
    }

    /// Whether `sig` is the named type `full_name`.
    #[must_use]
    pub fn is_named(&self, sig: &TypeSig, full_name: &str) -> bool {
        sig.definition()
            .is_some_and(|def| self.type_full_name(def) == full_name)
    }

    /// The type as the compiler prints it in diagnostics.
    #[must_use]
    pub fn display_type(&self, sig: &TypeSig) -> String {
        match sig {
            TypeSig::Void => "void".to_string(),
            TypeSig::Primitive(p) => p.keyword().to_string(),
            TypeSig::String => "string".to_string(),
            TypeSig::Object => "object".to_string(),
            TypeSig::Dynamic => "dynamic".to_string(),
            TypeSig::Named { def, args } => {
                let Some(symbol) = self.symbols.get(def.index()) else {
                    return def.to_string();
                };
                let namespace = symbol
                    .as_type()
                    .map(|t| t.namespace.as_str())
                    .unwrap_or_default();
                let mut name = if let Some(outer) = self.containing_type(*def) {
                    format!("{}.{}", self.display_type(&TypeSig::named(outer)), symbol.name)
                } else if namespace.is_empty() {
                    symbol.name.clone()
                } else {
                    format!("{namespace}.{}", symbol.name)
                };
                if self.type_full_name(*def) == "System.Nullable`1" && args.len() == 1 {
                    return format!("{}?", self.display_type(&args[0]));
                }
                if !args.is_empty() {
                    let shown: Vec<String> = args.iter().map(|a| self.display_type(a)).collect();
                    name = format!("{name}<{}>", shown.join(", "));
                }
                name
            }
            TypeSig::SzArray(element) => format!("{}[]", self.display_type(element)),
            TypeSig::Array { element, rank } => format!(
                "{}[{}]",
                self.display_type(element),
                ",".repeat((*rank as usize).saturating_sub(1))
            ),
            TypeSig::Pointer(element) => format!("{}*", self.display_type(element)),
            TypeSig::TypeParameter(id) => self
                .symbols
                .get(id.index())
                .map_or_else(|| id.to_string(), |s| s.name.clone()),
        }
    }

    /// The name a custom-attribute blob stores for `sig` (`typeof` values and enum types).
    ///
    /// Types from the source assembly and from corlib use their plain reflection name;
    /// types from other references are assembly-qualified.
    #[must_use]
    pub fn serialized_type_name(&self, sig: &TypeSig) -> String {
        let (name, def) = self.reflection_name(sig);
        match def.map(|d| self.assembly_of(d)) {
            Some(assembly) if assembly != self.assembly && Some(assembly) != self.corlib => {
                format!("{name}, {}", self.assembly_display_name(assembly))
            }
            _ => name,
        }
    }

    fn reflection_name(&self, sig: &TypeSig) -> (String, Option<SymbolId>) {
        match sig {
            TypeSig::Void => ("System.Void".to_string(), None),
            TypeSig::Primitive(p) => (p.full_name(), None),
            TypeSig::String => ("System.String".to_string(), None),
            TypeSig::Object | TypeSig::Dynamic => ("System.Object".to_string(), None),
            TypeSig::Named { def, args } => {
                let mut name = self.type_full_name(*def);
                if !args.is_empty() {
                    let inner: Vec<String> = args
                        .iter()
                        .map(|a| format!("[{}]", self.serialized_type_name(a)))
                        .collect();
                    name = format!("{name}[{}]", inner.join(","));
                }
                (name, Some(*def))
            }
            TypeSig::SzArray(element) => {
                let (name, def) = self.reflection_name(element);
                (format!("{name}[]"), def)
            }
            TypeSig::Array { element, rank } => {
                let (name, def) = self.reflection_name(element);
                let commas = ",".repeat((*rank as usize).saturating_sub(1));
                (format!("{name}[{commas}]"), def)
            }
            TypeSig::Pointer(element) => {
                let (name, def) = self.reflection_name(element);
                (format!("{name}*"), def)
            }
            TypeSig::TypeParameter(id) => (
                self.symbols
                    .get(id.index())
                    .map_or_else(String::new, |s| s.name.clone()),
                None,
            ),
        }
    }

    /// `Name, Version=a.b.c.d, Culture=xx, PublicKeyToken=null`.
    #[must_use]
    pub fn assembly_display_name(&self, assembly: SymbolId) -> String {
        let Some(symbol) = self.symbols.get(assembly.index()) else {
            return String::new();
        };
        let (version, culture) = symbol.as_assembly().map_or_else(
            || ("0.0.0.0".to_string(), "neutral".to_string()),
            |a| {
                let culture = if a.culture.is_empty() {
                    "neutral".to_string()
                } else {
                    a.culture.clone()
                };
                (a.version.to_string(), culture)
            },
        );
        format!(
            "{}, Version={version}, Culture={culture}, PublicKeyToken=null",
            symbol.name
        )
    }

    /// A method as printed in diagnostics, e.g. `N.MyAttribute.MyAttribute(int, string)`.
    #[must_use]
    pub fn method_display(&self, method: SymbolId) -> String {
        let Ok(symbol) = self.get(method) else {
            return method.to_string();
        };
        let owner = self
            .containing_type(method)
            .map(|t| self.display_type(&TypeSig::named(t)))
            .unwrap_or_default();
        let name = if symbol.name == ".ctor" {
            self.get(self.containing_type(method).unwrap_or(method))
                .map(|s| s.name.clone())
                .unwrap_or_default()
        } else {
            symbol.name.clone()
        };
        let parameters: Vec<String> = self
            .parameters(method)
            .iter()
            .filter_map(|p| self.get(*p).ok())
            .filter_map(|p| p.declared_type().map(|ty| self.display_type(ty)))
            .collect();
        if owner.is_empty() {
            format!("{name}({})", parameters.join(", "))
        } else {
            format!("{owner}.{name}({})", parameters.join(", "))
        }
    }

    /// The member name a caller-member-name argument receives for attributes on `owner`.
    #[must_use]
    pub fn caller_member_name(&self, owner: SymbolId) -> Option<String> {
        let symbol = self.get(owner).ok()?;
        match &symbol.data {
            SymbolData::Method(m) => match (m.kind, m.associated) {
                (_, Some(associated)) => self.get(associated).ok().map(|s| s.name.clone()),
                (MethodKind::Constructor, _) => Some(".ctor".to_string()),
                _ => Some(symbol.name.clone()),
            },
            SymbolData::Parameter(_) | SymbolData::ReturnValue(_) | SymbolData::TypeParameter(_) => {
                symbol.container.and_then(|c| self.caller_member_name(c))
            }
            SymbolData::Assembly(_) | SymbolData::Module => None,
            _ => Some(symbol.name.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::metadata::{
        symbols::{FieldDecl, MethodDecl, ParameterDecl, SymbolTableBuilder, TypeDecl},
        typesystem::TypeSig,
    };

    #[test]
    fn names_and_lookup() {
        let mut builder = SymbolTableBuilder::new("App", "App.dll");
        let outer = builder.add_type(None, TypeDecl::class("N", "Outer")).unwrap();
        let inner = builder
            .add_type(Some(outer), TypeDecl::class("", "Inner").type_parameter("T"))
            .unwrap();
        let ctor = builder
            .add_method(
                outer,
                MethodDecl::constructor().parameter(ParameterDecl::new("x", TypeSig::int())),
            )
            .unwrap();
        builder
            .add_field(outer, FieldDecl::new("F", TypeSig::sz_array(TypeSig::Dynamic)))
            .unwrap();
        let table = builder.build();

        assert_eq!(table.type_full_name(inner), "N.Outer+Inner`1");
        assert_eq!(table.lookup_type("N.Outer"), Some(outer));
        assert_eq!(table.lookup_type("N.Outer+Inner`1"), Some(inner));
        assert_eq!(table.method_display(ctor), "N.Outer.Outer(int)");
        assert_eq!(table.constructors(outer), vec![ctor]);
        assert!(table.find_field_or_property(outer, "F").is_some());
        assert_eq!(
            table.display_type(&TypeSig::sz_array(TypeSig::Dynamic)),
            "dynamic[]"
        );
        assert_eq!(table.serialized_type_name(&TypeSig::named(outer)), "N.Outer");
    }
}
