//! Writing bound attributes as custom-attribute rows.

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use rayon::prelude::*;

use crate::{
    compilation::CompilationOptions,
    metadata::{
        binder::{BoundAttribute, ConstructorRef},
        customattributes::{encode_custom_attribute, CustomAttributeValue, SerType},
        diagnostics::{Diagnostic, DiagnosticCode},
        emit::{
            tokens::{TokenMap, ASSEMBLY_ATTRIBUTES_GO_HERE},
            writer::{AssemblyRow, MetadataWriter},
        },
        symbols::{SymbolId, SymbolTable},
        synthesis::MarkerTypeDefinition,
        syntax::Location,
        token::Token,
    },
    utils::{crypto::compute_file_hash, to_u32},
    Error, Result,
};

/// A file linked into the assembly whose contents are hashed into the file table.
#[derive(Debug, Clone, Copy)]
pub struct LinkedFile<'a> {
    /// File name
    pub name: &'a str,
    /// File contents
    pub contents: &'a [u8],
}

/// Everything the emitter writes for one compilation.
#[derive(Debug, Clone, Copy)]
pub struct EmitInput<'a> {
    /// Attributes in symbol order; only emittable ones are written
    pub attributes: &'a [BoundAttribute],
    /// Synthesized marker types
    pub markers: &'a [MarkerTypeDefinition],
    /// The Assembly row; `None` for a net-module
    pub manifest: Option<&'a AssemblyRow>,
    /// Linked net-modules
    pub files: &'a [LinkedFile<'a>],
}

/// The result of a successful emit.
#[derive(Debug)]
pub struct EmitOutcome {
    /// Tokens assigned to definitions and references
    pub tokens: TokenMap,
    /// Number of custom-attribute rows written
    pub rows: usize,
    /// Diagnostics only detectable while writing
    pub diagnostics: Vec<Diagnostic>,
}

type RowKey = (Token, usize);
type Row = (Token, Vec<u8>);

/// Writes custom-attribute rows, the Assembly row and file hashes.
///
/// Rows are encoded on the rayon pool when `parallel` is set and collected in an ordered
/// map keyed by owner token and input position, so the table comes out the same regardless
/// of which thread finished first.
pub struct AttributeEmitter<'a> {
    table: &'a SymbolTable,
    options: &'a CompilationOptions,
    blobs: DashMap<CustomAttributeValue, Vec<u8>>,
}

impl<'a> AttributeEmitter<'a> {
    /// An emitter for `table`.
    #[must_use]
    pub fn new(table: &'a SymbolTable, options: &'a CompilationOptions) -> Self {
        AttributeEmitter {
            table,
            options,
            blobs: DashMap::new(),
        }
    }

    /// Emit `input` into `writer`.
    ///
    /// # Errors
    /// Returns an error if a blob cannot be encoded, an owner has no token, or the writer
    /// fails.
    pub fn emit(&self, input: &EmitInput<'_>, writer: &mut dyn MetadataWriter) -> Result<EmitOutcome> {
        log::debug!(
            "emitting {} attribute(s), {} marker type(s)",
            input.attributes.len(),
            input.markers.len()
        );
        let mut tokens = TokenMap::new(self.table, input.markers)?;

        let emittable: Vec<&BoundAttribute> =
            input.attributes.iter().filter(|a| a.is_emittable()).collect();
        let mut references: Vec<(&str, &[SerType])> = Vec::new();
        for attribute in &emittable {
            if self.needs_member_ref(attribute.constructor) {
                references.push((
                    attribute.class_name.as_str(),
                    attribute.constructor_params.as_slice(),
                ));
            }
        }
        for definition in input.markers {
            for (marker, constructor) in &definition.attributes {
                if self.needs_member_ref(*constructor) {
                    references.push((marker.full_name(), &[][..]));
                }
            }
        }
        let extra: &[&str] = if self.options.output_kind.is_net_module() {
            &[ASSEMBLY_ATTRIBUTES_GO_HERE]
        } else {
            &[]
        };
        tokens.add_references(references, extra)?;

        let rows: SkipMap<RowKey, Row> = SkipMap::new();
        let encode = |(seq, attribute): (usize, &&BoundAttribute)| -> Result<()> {
            let owner = self.owner_token(&tokens, attribute.owner)?;
            let constructor = self.constructor_token(&tokens, attribute)?;
            let blob = self.blob(&attribute.value)?;
            rows.insert((owner, seq), (constructor, blob));
            Ok(())
        };
        if self.options.parallel {
            emittable.par_iter().enumerate().try_for_each(encode)?;
        } else {
            emittable.iter().enumerate().try_for_each(encode)?;
        }

        let mut seq = emittable.len();
        for definition in input.markers {
            let Some(marker_tokens) = tokens.marker(definition.kind) else {
                continue;
            };
            for (marker, constructor) in &definition.attributes {
                let constructor = match constructor {
                    ConstructorRef::Synthesized { marker, .. } => tokens
                        .marker(*marker)
                        .map(|t| t.constructor)
                        .ok_or_else(|| malformed_error!("Marker {:?} was not synthesized", marker))?,
                    ConstructorRef::Method(id) if self.is_source(*id) => tokens
                        .definition(*id)
                        .ok_or(Error::SymbolNotFound(*id))?,
                    _ => tokens
                        .member_ref(marker.full_name(), &[])
                        .ok_or_else(|| malformed_error!("No reference for {}", marker.full_name()))?,
                };
                let blob = self.blob(&CustomAttributeValue::default())?;
                rows.insert((marker_tokens.type_def, seq), (constructor, blob));
                seq += 1;
            }
        }

        // nothing reaches the writer unless every file could be hashed
        let digests = match input.manifest {
            Some(manifest) => match Self::hash_files(manifest.hash_algorithm, input.files) {
                Ok(digests) => digests,
                Err(diagnostic) => {
                    return Ok(EmitOutcome {
                        tokens,
                        rows: 0,
                        diagnostics: vec![diagnostic],
                    })
                }
            },
            None => Vec::new(),
        };

        for entry in &rows {
            let (owner, _) = *entry.key();
            let (constructor, blob) = entry.value();
            writer.add_custom_attribute_row(owner, *constructor, blob)?;
        }
        if let Some(manifest) = input.manifest {
            writer.add_assembly_row(manifest)?;
            for (index, digest) in digests.iter().enumerate() {
                writer.add_file_hash_row(to_u32(index + 1)?, digest)?;
            }
        }

        Ok(EmitOutcome {
            tokens,
            rows: rows.len(),
            diagnostics: Vec::new(),
        })
    }

    fn hash_files(
        algorithm: u32,
        files: &[LinkedFile<'_>],
    ) -> std::result::Result<Vec<Vec<u8>>, Diagnostic> {
        files
            .iter()
            .map(|file| {
                compute_file_hash(algorithm, file.contents).ok_or_else(|| {
                    log::warn!(
                        "hash algorithm 0x{algorithm:X} is not supported, cannot hash {}",
                        file.name
                    );
                    Diagnostic::bare(DiagnosticCode::ErrCryptoHashFailed, Location::none())
                })
            })
            .collect()
    }

    fn is_source(&self, id: SymbolId) -> bool {
        self.table.get(id).is_ok_and(|s| s.is_source())
    }

    fn needs_member_ref(&self, constructor: ConstructorRef) -> bool {
        match constructor {
            ConstructorRef::Method(id) => !self.is_source(id),
            ConstructorRef::Synthesized { .. } => false,
            ConstructorRef::External => true,
        }
    }

    fn owner_token(&self, tokens: &TokenMap, owner: SymbolId) -> Result<Token> {
        if owner == self.table.source_assembly() && self.options.output_kind.is_net_module() {
            return tokens
                .type_token(ASSEMBLY_ATTRIBUTES_GO_HERE)
                .ok_or_else(|| malformed_error!("No reference for {}", ASSEMBLY_ATTRIBUTES_GO_HERE));
        }
        tokens.definition(owner).ok_or(Error::SymbolNotFound(owner))
    }

    fn constructor_token(&self, tokens: &TokenMap, attribute: &BoundAttribute) -> Result<Token> {
        match attribute.constructor {
            ConstructorRef::Method(id) if self.is_source(id) => {
                tokens.definition(id).ok_or(Error::SymbolNotFound(id))
            }
            ConstructorRef::Synthesized { marker, flags } => {
                let marker_tokens = tokens
                    .marker(marker)
                    .ok_or_else(|| malformed_error!("Marker {:?} was not synthesized", marker))?;
                if flags {
                    marker_tokens.flags_constructor.ok_or_else(|| {
                        malformed_error!("Marker {:?} has no flags constructor", marker)
                    })
                } else {
                    Ok(marker_tokens.constructor)
                }
            }
            ConstructorRef::Method(_) | ConstructorRef::External => tokens
                .member_ref(&attribute.class_name, &attribute.constructor_params)
                .ok_or_else(|| malformed_error!("No reference for {}", attribute.class_name)),
        }
    }

    fn blob(&self, value: &CustomAttributeValue) -> Result<Vec<u8>> {
        if let Some(blob) = self.blobs.get(value) {
            return Ok(blob.clone());
        }
        let blob = encode_custom_attribute(value)?;
        self.blobs.insert(value.clone(), blob.clone());
        Ok(blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        binder::AttributeSource,
        customattributes::TypedConstant,
        emit::writer::InMemoryMetadataWriter,
        symbols::{Accessibility, AttributeLocation, FieldDecl, SymbolTableBuilder, TypeDecl},
        synthesis::MarkerKind,
        typesystem::TypeSig,
        wellknown::AssemblyHashAlgorithm,
    };

    const TITLE: &str = "System.Reflection.AssemblyTitleAttribute";

    fn attribute(owner: SymbolId, constructor: ConstructorRef, value: CustomAttributeValue) -> BoundAttribute {
        let (class_name, constructor_params) = match constructor {
            ConstructorRef::Synthesized { marker, flags } => (
                marker.full_name().to_string(),
                if flags {
                    vec![SerType::SzArray(Box::new(SerType::Boolean))]
                } else {
                    Vec::new()
                },
            ),
            _ => (TITLE.to_string(), vec![SerType::String]),
        };
        BoundAttribute {
            class_name,
            class: None,
            constructor,
            constructor_params,
            value,
            owner,
            declared_on: owner,
            location: Location::none(),
            target: AttributeLocation::Assembly,
            has_errors: false,
            ignored_location: false,
            duplicate_suppressed: false,
            source: AttributeSource::Source,
            well_known: None,
        }
    }

    fn title(owner: SymbolId, text: &str) -> BoundAttribute {
        attribute(
            owner,
            ConstructorRef::External,
            CustomAttributeValue {
                fixed_args: vec![TypedConstant::string(text)],
                named_args: Vec::new(),
            },
        )
    }

    fn dynamic_marker() -> MarkerTypeDefinition {
        MarkerTypeDefinition {
            kind: MarkerKind::Dynamic,
            namespace: MarkerKind::Dynamic.namespace(),
            name: MarkerKind::Dynamic.name(),
            accessibility: Accessibility::Internal,
            has_flags_constructor: true,
            attributes: vec![(MarkerKind::CompilerGenerated, ConstructorRef::External)],
        }
    }

    struct Fixture {
        table: SymbolTable,
        field: SymbolId,
    }

    fn fixture() -> Fixture {
        let mut builder = SymbolTableBuilder::new("App", "App.dll");
        let object = builder.add_type(None, TypeDecl::class("System", "Object")).unwrap();
        let class = builder
            .add_type(None, TypeDecl::class("N", "C").base(TypeSig::named(object)))
            .unwrap();
        let field = builder
            .add_field(class, FieldDecl::new("F", TypeSig::sz_array(TypeSig::Dynamic)))
            .unwrap();
        Fixture {
            table: builder.build(),
            field,
        }
    }

    fn emit(
        fixture: &Fixture,
        options: &CompilationOptions,
        manifest: Option<&AssemblyRow>,
        files: &[LinkedFile<'_>],
    ) -> (EmitOutcome, InMemoryMetadataWriter) {
        let assembly = fixture.table.source_assembly();
        let attributes = vec![
            title(assembly, "App"),
            attribute(
                fixture.field,
                ConstructorRef::Synthesized {
                    marker: MarkerKind::Dynamic,
                    flags: true,
                },
                CustomAttributeValue {
                    fixed_args: vec![TypedConstant::bool_array(&[false, true])],
                    named_args: Vec::new(),
                },
            ),
            BoundAttribute {
                has_errors: true,
                ..title(assembly, "broken")
            },
        ];
        let markers = [dynamic_marker()];
        let input = EmitInput {
            attributes: &attributes,
            markers: &markers,
            manifest,
            files,
        };
        let mut writer = InMemoryMetadataWriter::new();
        let outcome = AttributeEmitter::new(&fixture.table, options)
            .emit(&input, &mut writer)
            .unwrap();
        (outcome, writer)
    }

    #[test]
    fn rows_are_ordered_by_owner() {
        let fixture = fixture();
        let manifest = AssemblyRow {
            name: "App".into(),
            hash_algorithm: AssemblyHashAlgorithm::SHA1,
            ..AssemblyRow::default()
        };
        let (outcome, writer) = emit(&fixture, &CompilationOptions::library(), Some(&manifest), &[]);
        assert_eq!(outcome.rows, 3);
        let rows = writer.custom_attributes();
        let dynamic = outcome.tokens.marker(MarkerKind::Dynamic).unwrap();
        let owners: Vec<Token> = rows.iter().map(|r| r.parent).collect();
        assert_eq!(
            owners,
            vec![
                dynamic.type_def,
                outcome.tokens.definition(fixture.field).unwrap(),
                outcome.tokens.definition(fixture.table.source_assembly()).unwrap(),
            ]
        );
        assert_eq!(rows[1].constructor, dynamic.flags_constructor.unwrap());
        assert_eq!(writer.blob(rows[1].value).unwrap(), [1, 0, 2, 0, 0, 0, 0, 1, 0, 0]);
        assert_eq!(writer.blob(rows[0].value).unwrap(), [1, 0, 0, 0]);
        assert!(writer.assembly().is_some());
    }

    #[test]
    fn net_module_attributes_go_to_the_placeholder_type() {
        let fixture = fixture();
        let (outcome, writer) = emit(&fixture, &CompilationOptions::net_module(), None, &[]);
        let placeholder = outcome.tokens.type_token(ASSEMBLY_ATTRIBUTES_GO_HERE).unwrap();
        // TypeRef tokens sort before TypeDef tokens
        assert_eq!(writer.custom_attributes()[0].parent, placeholder);
        assert!(writer.assembly().is_none());
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let fixture = fixture();
        let sequential = CompilationOptions {
            parallel: false,
            ..CompilationOptions::library()
        };
        let (_, a) = emit(&fixture, &sequential, None, &[]);
        let (_, b) = emit(&fixture, &CompilationOptions::library(), None, &[]);
        assert_eq!(a.custom_attributes(), b.custom_attributes());
    }

    #[test]
    fn unsupported_hash_algorithm_is_reported() {
        let fixture = fixture();
        let files = [LinkedFile {
            name: "m1.netmodule",
            contents: b"module image",
        }];
        let sha1 = AssemblyRow {
            hash_algorithm: AssemblyHashAlgorithm::SHA1,
            ..AssemblyRow::default()
        };
        let (outcome, writer) = emit(&fixture, &CompilationOptions::library(), Some(&sha1), &files);
        assert!(outcome.diagnostics.is_empty());
        assert_eq!(writer.blob(writer.files()[0].hash).unwrap().len(), 20);

        let bogus = AssemblyRow {
            hash_algorithm: 12345,
            ..AssemblyRow::default()
        };
        let (outcome, writer) = emit(&fixture, &CompilationOptions::library(), Some(&bogus), &files);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].code, DiagnosticCode::ErrCryptoHashFailed);
        assert_eq!(outcome.rows, 0);
        assert!(writer.files().is_empty());
        assert!(writer.custom_attributes().is_empty());
        assert!(writer.assembly().is_none());
    }
}
