//! The attribute pipeline of one compilation.
//!
//! A [`Compilation`] owns the declared symbols and answers the three questions consumers ask
//! about attributes: which attributes a symbol carries ([`Compilation::get_attributes`]),
//! which rows it contributes to the custom-attribute table
//! ([`Compilation::get_custom_attributes_to_emit`]), and what a well-known attribute resolved
//! to ([`Compilation::get_well_known_attribute_value`]).
//!
//! Every answer is computed lazily and memoized per symbol in a write-once slot, so a result
//! is identical no matter how many threads ask for it or in which order. The stages are:
//!
//! 1. binding: the usages written on a declaration are routed to their targets and bound
//! 2. collection: each owner gathers the usages routed to it, checks `AttributeUsage`, and
//!    decodes the well-known ones
//! 3. synthesis: compiler-added attributes, requesting marker types as needed
//! 4. merge: the assembly-level attributes of linked net-modules join those of source
//!
//! [`Compilation::diagnostics`] runs every stage for every source symbol, on the rayon pool
//! when [`CompilationOptions::parallel`] is set, and [`Compilation::emit`] writes the result
//! once nothing blocks it.
//!
//! # Examples
//!
//! ```rust
//! use cilattr::prelude::*;
//!
//! let mut builder = CompilationBuilder::new("App", CompilationOptions::library());
//! builder.corlib()?;
//! builder.declarations().add_assembly_attribute(
//!     AttributeSyntax::new("System.Reflection.AssemblyVersion")
//!         .arg(Expression::string("1.22.333.4444")),
//! );
//! let compilation = builder.build();
//! let assembly = compilation.table().source_assembly();
//!
//! assert!(compilation.diagnostics()?.is_empty());
//! assert_eq!(
//!     compilation.get_well_known_attribute_value(assembly, WellKnownAttributeKind::AssemblyVersion)?,
//!     Some(WellKnownValue::Version(Version::new(1, 22, 333, 4444)))
//! );
//! # Ok::<(), cilattr::Error>(())
//! ```

mod builder;
mod corlib;
mod options;
mod references;
mod speculative;

pub use builder::CompilationBuilder;
pub use corlib::{usage_attribute, Corlib, CORLIB_NAME};
pub use options::{CompilationOptions, OutputKind};
pub use references::NetModule;
pub use speculative::{SpeculativeModel, SpeculativeResult};

use dashmap::DashMap;
use rayon::prelude::*;

use crate::{
    metadata::{
        binder::{
            route, AttributeBinder, AttributeClassResolver, AttributeSource, BoundAttribute,
            ConstantEvaluator, Routing,
        },
        diagnostics::{Diagnostic, DiagnosticCode, Diagnostics},
        emit::{AssemblyRow, AttributeEmitter, EmitInput, EmitOutcome, LinkedFile, MetadataWriter},
        merge::{merge_assembly_attributes, ModuleAttributes},
        symbols::{
            default_location, symbol_targets, AttributeLocation, MethodKind, Symbol, SymbolData,
            SymbolId, SymbolTable,
        },
        synthesis::{
            strips_markers, MarkerKind, MarkerRegistry, MarkerTypeDefinition, SynthesisEngine,
        },
        syntax::AttributeSyntax,
        wellknown::{
            decode_usage, AssemblyFlags, AssemblyWellKnownData, AttributeUsageInfo,
            WellKnownAttributeKind, WellKnownData, WellKnownDecoder, WellKnownValue,
        },
    },
    utils::{synchronization::OnceSlot, CancellationToken},
    Error, Result,
};

/// A slot result; memoized failures are kept as their message.
type Fallible<T> = std::result::Result<T, String>;

/// The usages written on one declaration, bound for every symbol they route to.
#[derive(Debug, Default)]
struct DeclaredBag {
    bound: Vec<BoundAttribute>,
    diagnostics: Vec<Diagnostic>,
}

/// Everything known about the attributes of one owner.
#[derive(Debug, Default)]
struct OwnerBag {
    attributes: Vec<BoundAttribute>,
    data: WellKnownData,
    diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Default)]
struct SynthesizedBag {
    attributes: Vec<BoundAttribute>,
    diagnostics: Vec<Diagnostic>,
}

/// The assembly after merging linked net-modules.
#[derive(Debug, Default)]
struct MergedAssembly {
    attributes: Vec<BoundAttribute>,
    suppressed: Vec<BoundAttribute>,
    data: WellKnownData,
    diagnostics: Vec<Diagnostic>,
}

/// One compilation: declared symbols, linked net-modules and the memoized attribute state.
///
/// Created through [`CompilationBuilder`]. All queries take `&self` and may be issued from
/// several threads at once.
pub struct Compilation {
    table: SymbolTable,
    options: CompilationOptions,
    modules: Vec<NetModule>,
    evaluator: Box<dyn ConstantEvaluator>,
    registry: MarkerRegistry,
    cancellation: CancellationToken,
    declared: Vec<OnceSlot<Fallible<DeclaredBag>>>,
    owners: Vec<OnceSlot<Fallible<OwnerBag>>>,
    synthesized: Vec<OnceSlot<Fallible<SynthesizedBag>>>,
    merged: OnceSlot<Fallible<MergedAssembly>>,
    usage: DashMap<SymbolId, AttributeUsageInfo>,
    emit_diagnostics: Diagnostics,
}

impl Compilation {
    fn new(
        table: SymbolTable,
        options: CompilationOptions,
        modules: Vec<NetModule>,
        evaluator: Box<dyn ConstantEvaluator>,
        cancellation: CancellationToken,
    ) -> Self {
        let slots = table.len();
        Compilation {
            table,
            options,
            modules,
            evaluator,
            registry: MarkerRegistry::new(),
            cancellation,
            declared: (0..slots).map(|_| OnceSlot::new()).collect(),
            owners: (0..slots).map(|_| OnceSlot::new()).collect(),
            synthesized: (0..slots).map(|_| OnceSlot::new()).collect(),
            merged: OnceSlot::new(),
            usage: DashMap::new(),
            emit_diagnostics: Diagnostics::new(),
        }
    }

    /// The declared symbols.
    #[must_use]
    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    /// The options the compilation was created with.
    #[must_use]
    pub fn options(&self) -> &CompilationOptions {
        &self.options
    }

    /// Linked net-modules, in link order.
    #[must_use]
    pub fn net_modules(&self) -> &[NetModule] {
        &self.modules
    }

    /// The attributes of `id` as reflection sees them.
    ///
    /// For the source assembly this is the merged set: source attributes followed by the
    /// surviving net-module attributes. Usages with an invalid target specifier are included
    /// with `ignored_location` set, even though they are never emitted.
    ///
    /// # Errors
    /// Returns [`Error::SymbolNotFound`] for a foreign id, [`Error::Cancelled`] if the host
    /// cancelled before the symbol was bound, or [`Error::CycleDetected`] if the query
    /// re-entered itself.
    pub fn get_attributes(&self, id: SymbolId) -> Result<&[BoundAttribute]> {
        if id == self.table.source_assembly() {
            return Ok(&self.merged()?.attributes);
        }
        Ok(&self.owner(id)?.attributes)
    }

    /// The rows `id` contributes to the custom-attribute table: its emittable attributes
    /// followed by the synthesized ones.
    ///
    /// # Errors
    /// See [`Compilation::get_attributes`].
    pub fn get_custom_attributes_to_emit(&self, id: SymbolId) -> Result<Vec<BoundAttribute>> {
        let mut attributes: Vec<BoundAttribute> = self
            .get_attributes(id)?
            .iter()
            .filter(|a| a.is_emittable())
            .cloned()
            .collect();
        attributes.extend(self.synthesized_bag(id)?.attributes.iter().cloned());
        Ok(attributes)
    }

    /// The decoded payload of the well-known attribute `kind` on `id`.
    ///
    /// Assembly-level values include those supplied by net-modules for anything the source
    /// left unset.
    ///
    /// # Errors
    /// See [`Compilation::get_attributes`].
    pub fn get_well_known_attribute_value(
        &self,
        id: SymbolId,
        kind: WellKnownAttributeKind,
    ) -> Result<Option<WellKnownValue>> {
        Ok(self.well_known_data(id)?.value(kind))
    }

    /// Everything decoded from the well-known attributes of `id`.
    ///
    /// # Errors
    /// See [`Compilation::get_attributes`].
    pub fn well_known_data(&self, id: SymbolId) -> Result<&WellKnownData> {
        if id == self.table.source_assembly() {
            return Ok(&self.merged()?.data);
        }
        Ok(&self.owner(id)?.data)
    }

    /// Assembly attributes dropped by the merge, with `duplicate_suppressed` set: repeated
    /// source instances of an `AllowMultiple` attribute, then net-module attributes.
    ///
    /// # Errors
    /// See [`Compilation::get_attributes`].
    pub fn suppressed_module_attributes(&self) -> Result<&[BoundAttribute]> {
        Ok(&self.merged()?.suppressed)
    }

    /// Run every stage for every source symbol and return all diagnostics, sorted by
    /// location.
    ///
    /// # Errors
    /// Returns [`Error::Cancelled`] if the host cancelled the pass, or any error a query on a
    /// single symbol can return.
    pub fn diagnostics(&self) -> Result<Diagnostics> {
        let sources: Vec<SymbolId> = self
            .table
            .iter()
            .filter(|s| s.is_source())
            .map(|s| s.id)
            .collect();
        log::debug!("attribute pass over {} source symbol(s)", sources.len());

        let visit = |id: &SymbolId| -> Result<()> {
            self.cancellation.check()?;
            self.get_attributes(*id)?;
            self.synthesized_bag(*id)?;
            Ok(())
        };
        if self.options.parallel {
            sources.par_iter().try_for_each(visit)?;
        } else {
            sources.iter().try_for_each(visit)?;
        }

        let collected = Diagnostics::new();
        for id in &sources {
            collected.extend(self.declared_bag(*id)?.diagnostics.iter().cloned());
            collected.extend(self.owner(*id)?.diagnostics.iter().cloned());
            collected.extend(self.synthesized_bag(*id)?.diagnostics.iter().cloned());
        }
        collected.extend(self.merged()?.diagnostics.iter().cloned());
        collected.extend(self.emit_diagnostics.iter().cloned());
        Ok(collected.sorted().into_iter().collect())
    }

    /// The errors among [`Compilation::diagnostics`]; emit refuses to run while any exist.
    ///
    /// # Errors
    /// See [`Compilation::diagnostics`].
    pub fn emit_blocking_diagnostics(&self) -> Result<Vec<Diagnostic>> {
        Ok(self
            .diagnostics()?
            .iter()
            .filter(|d| d.is_error())
            .cloned()
            .collect())
    }

    /// Marker types requested so far, in definition order.
    #[must_use]
    pub fn requested_markers(&self) -> Vec<MarkerKind> {
        self.registry.requested()
    }

    /// Definitions of the marker types synthesized into the output so far.
    #[must_use]
    pub fn synthesized_marker_types(&self) -> Vec<MarkerTypeDefinition> {
        SynthesisEngine::new(&self.table, &self.options, &self.registry).definitions()
    }

    /// A model for speculative queries. Nothing it computes reaches this compilation.
    #[must_use]
    pub fn speculate(&self) -> SpeculativeModel<'_> {
        SpeculativeModel::new(self)
    }

    /// Write the custom-attribute table, the Assembly row and the file hashes.
    ///
    /// Diagnostics only detectable while writing, such as an unsupported hash algorithm when
    /// a net-module must be hashed, are recorded on the compilation and fail the emit.
    ///
    /// # Errors
    /// Returns [`Error::EmitFailed`] if emit-blocking diagnostics exist before or arise
    /// during writing, or any error of the writer.
    pub fn emit(&self, writer: &mut dyn MetadataWriter) -> Result<EmitOutcome> {
        let errors = self.diagnostics()?.error_count();
        if errors > 0 {
            return Err(Error::EmitFailed { errors });
        }

        let mut attributes = Vec::new();
        for symbol in self.table.iter().filter(|s| s.is_source()) {
            attributes.extend(self.get_custom_attributes_to_emit(symbol.id)?);
        }
        let markers = self.synthesized_marker_types();
        let manifest = if self.options.output_kind.is_net_module() {
            None
        } else {
            Some(self.manifest()?)
        };
        let files: Vec<LinkedFile<'_>> = self
            .modules
            .iter()
            .map(|m| LinkedFile {
                name: m.name(),
                contents: m.image(),
            })
            .collect();

        let emitter = AttributeEmitter::new(&self.table, &self.options);
        let outcome = emitter.emit(
            &EmitInput {
                attributes: &attributes,
                markers: &markers,
                manifest: manifest.as_ref(),
                files: &files,
            },
            writer,
        )?;

        for diagnostic in &outcome.diagnostics {
            if !self.emit_diagnostics.iter().any(|d| d == diagnostic) {
                self.emit_diagnostics.push(diagnostic.clone());
            }
        }
        let errors = outcome.diagnostics.iter().filter(|d| d.is_error()).count();
        if errors > 0 {
            return Err(Error::EmitFailed { errors });
        }
        Ok(outcome)
    }

    fn manifest(&self) -> Result<AssemblyRow> {
        let data = &self.merged()?.data.assembly;
        let assembly = self.table.get(self.table.source_assembly())?;
        let mut flags = data.flags.unwrap_or(0);
        if !self.options.public_key.is_empty() {
            flags |= AssemblyFlags::PUBLIC_KEY;
        }
        Ok(AssemblyRow {
            name: assembly.name.clone(),
            version: data.version.unwrap_or_default(),
            culture: data.culture.clone().unwrap_or_default(),
            hash_algorithm: data.hash_algorithm(),
            flags,
            public_key: self.options.public_key.clone(),
        })
    }

    fn fill<'s, T, F>(&self, slot: &'s OnceSlot<Fallible<T>>, id: SymbolId, init: F) -> Result<&'s T>
    where
        F: FnOnce() -> Result<T>,
    {
        if !slot.is_filled() {
            self.cancellation.check()?;
        }
        slot.get_or_init(|| init().map_err(|e| e.to_string()))
            .map_err(|_| Error::CycleDetected(id))?
            .as_ref()
            .map_err(|message| Error::Error(message.clone()))
    }

    pub(crate) fn binder(&self) -> AttributeBinder<'_> {
        AttributeBinder::new(&self.table, &self.options, self.evaluator.as_ref())
    }

    /// Route and bind one usage written on `declared_on`.
    pub(crate) fn bind_usage(
        &self,
        binder: &AttributeBinder<'_>,
        syntax: &AttributeSyntax,
        declared_on: SymbolId,
        bound: &mut Vec<BoundAttribute>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<()> {
        match route(&self.table, declared_on, syntax.target.as_deref(), &syntax.location)? {
            Routing::Routed(routed) => {
                for (index, target) in routed.targets.iter().enumerate() {
                    // one usage applied to several accessors reports its problems once
                    let mut reported = Vec::new();
                    bound.push(binder.bind(syntax, declared_on, *target, routed.location, &mut reported));
                    if index == 0 {
                        diagnostics.extend(reported);
                    }
                }
            }
            Routing::Ignored { location, diagnostic } => {
                diagnostics.push(diagnostic);
                let attribute = binder.bind(syntax, declared_on, declared_on, location, diagnostics);
                bound.push(BoundAttribute {
                    ignored_location: true,
                    ..attribute
                });
            }
        }
        Ok(())
    }

    fn declared_bag(&self, id: SymbolId) -> Result<&DeclaredBag> {
        let symbol = self.table.get(id)?;
        let slot = slot_get!(self.declared, id.index())?;
        self.fill(slot, id, || {
            let mut bag = DeclaredBag::default();
            if !symbol.is_source() {
                return Ok(bag);
            }
            let binder = self.binder();
            for syntax in &symbol.attribute_lists {
                self.bind_usage(&binder, syntax, id, &mut bag.bound, &mut bag.diagnostics)?;
            }
            log::trace!("bound {} usage(s) declared on {id}", symbol.attribute_lists.len());
            Ok(bag)
        })
    }

    /// Declarations whose usages may route to `symbol`.
    fn declarers(&self, symbol: &Symbol) -> Vec<SymbolId> {
        let mut declarers = vec![symbol.id];
        match &symbol.data {
            SymbolData::ReturnValue(_) => {
                if let Some(method) = self.table.containing_method(symbol.id) {
                    declarers.push(method);
                    let invoke = self
                        .table
                        .get(method)
                        .ok()
                        .and_then(Symbol::as_method)
                        .is_some_and(|m| m.kind == MethodKind::DelegateInvoke);
                    if invoke {
                        declarers.extend(self.table.containing_type(method));
                    }
                }
            }
            SymbolData::Parameter(_) => declarers.extend(self.table.containing_method(symbol.id)),
            SymbolData::Field(field) => declarers.extend(field.associated_event),
            SymbolData::Method(method) => declarers.extend(method.associated),
            _ => {}
        }
        declarers
    }

    fn owner(&self, id: SymbolId) -> Result<&OwnerBag> {
        let symbol = self.table.get(id)?;
        let slot = slot_get!(self.owners, id.index())?;
        if let Some(Ok(bag)) = slot.get() {
            return Ok(bag);
        }

        let mut routed = Vec::new();
        if symbol.is_source() {
            for declarer in self.declarers(symbol) {
                let bag = self.declared_bag(declarer)?;
                routed.extend(bag.bound.iter().filter(|a| a.owner == id).cloned());
            }
        }

        self.fill(slot, id, || {
            let mut bag = OwnerBag::default();
            if symbol.is_source() {
                bag.attributes = routed;
                self.check_usage(symbol, &mut bag.attributes, &[], &mut bag.diagnostics);
            } else {
                let binder = self.binder();
                let target = default_location(symbol);
                let strip = strips_markers(symbol);
                bag.attributes = symbol
                    .imported_attributes
                    .iter()
                    .map(|a| binder.bind_imported(a, id, target, AttributeSource::Imported))
                    .filter(|a| {
                        !(strip && a.well_known.and_then(MarkerKind::from_well_known).is_some())
                    })
                    .collect();
            }
            let decoder = WellKnownDecoder::new(&self.table, &self.options);
            bag.data = decoder.decode(id, &bag.attributes, &mut bag.diagnostics);
            Ok(bag)
        })
    }

    /// Apply `AttributeUsage` to the usages routed to `symbol`: inapplicable targets and
    /// repeated single-use attributes become errors. `existing` holds attributes already
    /// accepted on the symbol.
    pub(crate) fn check_usage(
        &self,
        symbol: &Symbol,
        attributes: &mut [BoundAttribute],
        existing: &[BoundAttribute],
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let targets = symbol_targets(symbol);
        let mut seen: Vec<String> = existing
            .iter()
            .filter(|a| !a.has_errors && !a.ignored_location)
            .map(|a| a.class_name.clone())
            .collect();
        for attribute in attributes.iter_mut() {
            if attribute.has_errors || attribute.ignored_location {
                continue;
            }
            let Some(class) = attribute.class else {
                continue;
            };
            let usage = self.usage_of(class);
            if !usage.valid_on.intersects(targets) {
                diagnostics.push(Diagnostic::new(
                    DiagnosticCode::ErrAttributeOnBadSymbolType,
                    attribute.location.clone(),
                    vec![display_name(&attribute.class_name).to_string(), usage.valid_on.to_string()],
                ));
                attribute.has_errors = true;
                continue;
            }
            if !usage.allow_multiple && seen.contains(&attribute.class_name) {
                diagnostics.push(Diagnostic::new(
                    DiagnosticCode::ErrDuplicateAttribute,
                    attribute.location.clone(),
                    vec![display_name(&attribute.class_name).to_string()],
                ));
                attribute.has_errors = true;
                continue;
            }
            seen.push(attribute.class_name.clone());
        }
    }

    /// The effective `AttributeUsage` of an attribute class, inherited from its bases.
    pub(crate) fn usage_of(&self, class: SymbolId) -> AttributeUsageInfo {
        if let Some(info) = self.usage.get(&class) {
            return *info;
        }
        let mut current = Some(class);
        let mut info = None;
        // bounded walk; a malformed base chain falls back to the default
        for _ in 0..self.table.len() {
            let Some(id) = current else {
                break;
            };
            if let Some(known) = self.usage.get(&id) {
                info = Some(*known);
                break;
            }
            if let Some(found) = self.declared_usage(id) {
                info = Some(found);
                break;
            }
            current = self.table.base_type(id);
        }
        let info = info.unwrap_or_default();
        self.usage.insert(class, info);
        info
    }

    /// The `AttributeUsage` written directly on `class`, bound without touching any slot.
    fn declared_usage(&self, class: SymbolId) -> Option<AttributeUsageInfo> {
        let symbol = self.table.get(class).ok()?;
        let usage_name = WellKnownAttributeKind::AttributeUsage.full_name();
        if !symbol.is_source() {
            return symbol
                .imported_attributes
                .iter()
                .find(|a| a.class == usage_name)
                .map(|a| decode_usage(&a.value));
        }
        let usage_class = self.table.lookup_type(usage_name)?;
        let resolver = AttributeClassResolver::new(&self.table, &self.options.usings);
        let binder = self.binder();
        symbol
            .attribute_lists
            .iter()
            .filter(|syntax| resolver.resolve_quiet(class, &syntax.name) == Some(usage_class))
            .map(|syntax| {
                let mut ignored = Vec::new();
                binder.bind(syntax, class, class, AttributeLocation::Type, &mut ignored)
            })
            .find(|bound| !bound.has_errors)
            .map(|bound| decode_usage(&bound.value))
    }

    fn synthesized_bag(&self, id: SymbolId) -> Result<&SynthesizedBag> {
        self.table.get(id)?;
        let slot = slot_get!(self.synthesized, id.index())?;
        if let Some(Ok(bag)) = slot.get() {
            return Ok(bag);
        }
        let assembly = self.assembly_data()?.clone();
        self.fill(slot, id, || {
            let engine = SynthesisEngine::new(&self.table, &self.options, &self.registry);
            let mut bag = SynthesizedBag::default();
            bag.attributes = engine.synthesized_attributes(id, &assembly, &mut bag.diagnostics)?;
            Ok(bag)
        })
    }

    /// Merged assembly-level well-known data.
    pub(crate) fn assembly_data(&self) -> Result<&AssemblyWellKnownData> {
        Ok(&self.merged()?.data.assembly)
    }

    fn merged(&self) -> Result<&MergedAssembly> {
        let assembly = self.table.source_assembly();
        if let Some(Ok(merged)) = self.merged.get() {
            return Ok(merged);
        }
        let source = self.owner(assembly)?;

        self.fill(&self.merged, assembly, || {
            let binder = self.binder();
            let modules: Vec<ModuleAttributes> = self
                .modules
                .iter()
                .enumerate()
                .map(|(index, module)| ModuleAttributes {
                    name: module.name().to_string(),
                    attributes: module
                        .attributes()
                        .iter()
                        .map(|a| {
                            binder.bind_imported(
                                a,
                                assembly,
                                AttributeLocation::Assembly,
                                AttributeSource::NetModule(index),
                            )
                        })
                        .collect(),
                })
                .collect();
            log::debug!("merging assembly attributes of {} net-module(s)", modules.len());
            let result = merge_assembly_attributes(&source.attributes, &modules, |attribute| {
                attribute
                    .class
                    .is_some_and(|class| self.usage_of(class).allow_multiple)
            });

            let from_modules: Vec<BoundAttribute> = result
                .attributes
                .iter()
                .filter(|a| matches!(a.source, AttributeSource::NetModule(_)))
                .cloned()
                .collect();
            let decoder = WellKnownDecoder::new(&self.table, &self.options);
            // module attributes were validated when the module was compiled
            let mut revalidated = Vec::new();
            let module_data = decoder.decode(assembly, &from_modules, &mut revalidated);

            let mut data = source.data.clone();
            data.assembly.fill_from(&module_data.assembly);
            let mut diagnostics = result.diagnostics;
            decoder.check_reference_cultures(&data.assembly, &mut diagnostics);

            Ok(MergedAssembly {
                attributes: result.attributes,
                suppressed: result.suppressed,
                data,
                diagnostics,
            })
        })
    }

    pub(crate) fn registry(&self) -> &MarkerRegistry {
        &self.registry
    }
}

/// The attribute name as users write it: simple name without the `Attribute` suffix.
fn display_name(class_name: &str) -> &str {
    let simple = class_name.rsplit(['.', '+']).next().unwrap_or(class_name);
    match simple.strip_suffix("Attribute") {
        Some(stem) if !stem.is_empty() => stem,
        _ => simple,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        symbols::{FieldDecl, MethodDecl, ParameterDecl, TypeDecl},
        syntax::{Expression, Location},
        typesystem::TypeSig,
    };

    fn compilation_with(
        configure: impl FnOnce(&mut CompilationBuilder, &Corlib) -> SymbolId,
    ) -> (Compilation, SymbolId) {
        let mut builder = CompilationBuilder::new("App", CompilationOptions::library());
        let corlib = builder.corlib().unwrap();
        let id = configure(&mut builder, &corlib);
        (builder.build(), id)
    }

    #[test]
    fn display_names_drop_the_suffix() {
        assert_eq!(display_name("System.ObsoleteAttribute"), "Obsolete");
        assert_eq!(display_name("N.Outer+InnerAttribute"), "Inner");
        assert_eq!(display_name("Attribute"), "Attribute");
        assert_eq!(display_name("N.Plain"), "Plain");
    }

    #[test]
    fn attribute_on_bad_target_is_rejected() {
        let (compilation, class) = compilation_with(|builder, corlib| {
            builder
                .declarations()
                .add_type(
                    None,
                    TypeDecl::class("N", "C")
                        .base(TypeSig::named(corlib.object))
                        .attribute(
                            AttributeSyntax::new("System.Runtime.CompilerServices.InternalsVisibleTo")
                                .arg(Expression::string("Friend"))
                                .at(Location::source("a.cs", 3, 2)),
                        ),
                )
                .unwrap()
        });
        let attributes = compilation.get_attributes(class).unwrap();
        assert!(attributes[0].has_errors);
        let diagnostics = compilation.diagnostics().unwrap();
        let errors = diagnostics.by_code(DiagnosticCode::ErrAttributeOnBadSymbolType);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].arguments, vec!["InternalsVisibleTo", "assembly"]);
    }

    #[test]
    fn single_use_attribute_repeated_across_declarers() {
        let (compilation, method) = compilation_with(|builder, corlib| {
            let class = builder
                .declarations()
                .add_type(None, TypeDecl::class("N", "C").base(TypeSig::named(corlib.object)))
                .unwrap();
            let obsolete = || AttributeSyntax::new("System.Obsolete");
            builder
                .declarations()
                .add_method(
                    class,
                    MethodDecl::new("M")
                        .attribute(obsolete())
                        .attribute(obsolete().at(Location::source("a.cs", 5, 6))),
                )
                .unwrap()
        });
        let diagnostics = compilation.diagnostics().unwrap();
        let duplicates = diagnostics.by_code(DiagnosticCode::ErrDuplicateAttribute);
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].arguments, vec!["Obsolete"]);
        assert_eq!(duplicates[0].location, Location::source("a.cs", 5, 6));
        assert_eq!(compilation.get_custom_attributes_to_emit(method).unwrap().len(), 1);
    }

    #[test]
    fn usage_is_inherited_from_the_base_class() {
        let (compilation, derived) = compilation_with(|builder, corlib| {
            let declarations = builder.declarations();
            let base = declarations
                .add_type(
                    None,
                    TypeDecl::class("N", "BaseAttribute")
                        .base(TypeSig::named(corlib.attribute))
                        .attribute(
                            AttributeSyntax::new("System.AttributeUsage")
                                .arg(Expression::member(
                                    TypeSig::named(corlib.attribute_targets),
                                    "Field",
                                ))
                                .named("AllowMultiple", Expression::bool(true)),
                        ),
                )
                .unwrap();
            declarations
                .add_type(None, TypeDecl::class("N", "DerivedAttribute").base(TypeSig::named(base)))
                .unwrap()
        });
        let usage = compilation.usage_of(derived);
        assert_eq!(usage.valid_on, crate::metadata::symbols::AttributeTargets::FIELD);
        assert!(usage.allow_multiple);
    }

    #[test]
    fn return_target_reaches_the_return_value() {
        let (compilation, method) = compilation_with(|builder, corlib| {
            let declarations = builder.declarations();
            let class = declarations
                .add_type(None, TypeDecl::class("N", "C").base(TypeSig::named(corlib.object)))
                .unwrap();
            let marker = declarations
                .add_type(None, TypeDecl::class("N", "TagAttribute").base(TypeSig::named(corlib.attribute)))
                .unwrap();
            declarations.add_method(marker, MethodDecl::constructor()).unwrap();
            declarations
                .add_method(
                    class,
                    MethodDecl::new("M")
                        .returns(TypeSig::int())
                        .attribute(AttributeSyntax::new("N.Tag").target("return"))
                        .attribute(AttributeSyntax::new("N.Tag").target("field")),
                )
                .unwrap()
        });
        let return_value = compilation
            .table()
            .get(method)
            .unwrap()
            .as_method()
            .unwrap()
            .return_value;
        assert_eq!(compilation.get_attributes(return_value).unwrap().len(), 1);

        // the invalid specifier stays visible on the method but is never emitted
        let on_method = compilation.get_attributes(method).unwrap();
        assert_eq!(on_method.len(), 1);
        assert!(on_method[0].ignored_location);
        assert!(compilation.get_custom_attributes_to_emit(method).unwrap().is_empty());
        let diagnostics = compilation.diagnostics().unwrap();
        assert_eq!(
            diagnostics
                .by_code(DiagnosticCode::WrnAttributeLocationOnBadDeclaration)
                .len(),
            1
        );
    }

    #[test]
    fn sequential_and_parallel_passes_agree() {
        let build = |parallel: bool| {
            let mut builder = CompilationBuilder::new(
                "App",
                CompilationOptions::library().with_parallel(parallel),
            );
            let corlib = builder.corlib().unwrap();
            let declarations = builder.declarations();
            let class = declarations
                .add_type(None, TypeDecl::class("N", "C").base(TypeSig::named(corlib.object)))
                .unwrap();
            for index in 0..8 {
                declarations
                    .add_field(class, FieldDecl::new(&format!("F{index}"), TypeSig::Dynamic))
                    .unwrap();
                declarations
                    .add_method(
                        class,
                        MethodDecl::new(&format!("M{index}")).parameter(
                            ParameterDecl::new("p", TypeSig::String).attribute(
                                AttributeSyntax::new("System.Runtime.CompilerServices.CallerLineNumber"),
                            ),
                        ),
                    )
                    .unwrap();
            }
            builder.build().diagnostics().unwrap().sorted()
        };
        assert_eq!(build(true), build(false));
    }

    #[test]
    fn cancelled_pass_stops() {
        let mut builder = CompilationBuilder::new("App", CompilationOptions::library());
        builder.corlib().unwrap();
        let token = CancellationToken::new();
        builder.cancellation(token.clone());
        let compilation = builder.build();
        token.cancel();
        assert!(matches!(compilation.diagnostics(), Err(Error::Cancelled)));
    }
}
