//! Integration tests for compiler-added attributes and synthesized marker types.

use std::thread;

use cilattr::{
    metadata::symbols::{AssemblyData, SymbolOrigin},
    prelude::*,
    Result,
};

const DYNAMIC: &str = "System.Runtime.CompilerServices.DynamicAttribute";
const MARKERS: [WellKnownAttributeKind; 3] = [
    WellKnownAttributeKind::IsReadOnly,
    WellKnownAttributeKind::IsByRefLike,
    WellKnownAttributeKind::Embedded,
];

fn start(options: CompilationOptions) -> Result<(CompilationBuilder, Corlib)> {
    let mut builder = CompilationBuilder::new("App", options);
    let corlib = builder.corlib()?;
    Ok((builder, corlib))
}

/// A `dynamic[]` field carries `Dynamic({false, true})` through the flags constructor.
#[test]
fn test_dynamic_array_field() -> Result<()> {
    let (mut builder, corlib) = start(CompilationOptions::library())?;
    let class = builder
        .declarations()
        .add_type(None, TypeDecl::class("N", "C").base(TypeSig::named(corlib.object)))?;
    let field = builder
        .declarations()
        .add_field(class, FieldDecl::new("F", TypeSig::sz_array(TypeSig::Dynamic)))?;
    let compilation = builder.build();

    let attributes = compilation.get_custom_attributes_to_emit(field)?;
    assert_eq!(attributes.len(), 1);
    let dynamic = &attributes[0];
    assert_eq!(dynamic.class_name, DYNAMIC);
    assert_eq!(dynamic.source, AttributeSource::Synthesized);
    assert_eq!(
        dynamic.constructor_params,
        vec![SerType::SzArray(Box::new(SerType::Boolean))]
    );
    let flags: Vec<Option<bool>> = dynamic
        .fixed(0)
        .and_then(TypedConstant::as_array)
        .map(|items| items.iter().map(TypedConstant::as_bool).collect())
        .unwrap_or_default();
    assert_eq!(flags, vec![Some(false), Some(true)]);

    let mut writer = InMemoryMetadataWriter::new();
    let outcome = compilation.emit(&mut writer)?;
    let owner = outcome.tokens.definition(field).expect("field token");
    let row = writer
        .custom_attributes()
        .iter()
        .find(|row| row.parent == owner)
        .expect("dynamic row");
    assert_eq!(
        writer.blob(row.value),
        Some(&[0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00][..])
    );
    Ok(())
}

/// A plain `dynamic` field uses the parameterless constructor.
#[test]
fn test_plain_dynamic_uses_the_simple_constructor() -> Result<()> {
    let (mut builder, corlib) = start(CompilationOptions::library())?;
    let class = builder
        .declarations()
        .add_type(None, TypeDecl::class("N", "C").base(TypeSig::named(corlib.object)))?;
    let field = builder
        .declarations()
        .add_field(class, FieldDecl::new("F", TypeSig::Dynamic))?;
    let compilation = builder.build();

    let attributes = compilation.get_custom_attributes_to_emit(field)?;
    assert_eq!(attributes.len(), 1);
    assert!(attributes[0].constructor_params.is_empty());
    assert!(attributes[0].value.fixed_args.is_empty());
    assert_eq!(transform_flags(&TypeSig::Dynamic, RefKind::None), vec![true]);
    Ok(())
}

/// Many threads asking for the attributes of readonly structs synthesize `IsReadOnly` once.
#[test]
fn test_marker_type_is_synthesized_once() -> Result<()> {
    let (mut builder, corlib) = start(CompilationOptions::library())?;
    let mut structs = Vec::new();
    for index in 0..32 {
        structs.push(builder.declarations().add_type(
            None,
            TypeDecl::structure("N", &format!("S{index}"))
                .base(TypeSig::named(corlib.value_type))
                .readonly(),
        )?);
    }
    let compilation = builder.build();

    thread::scope(|scope| {
        for chunk in structs.chunks(4) {
            let compilation = &compilation;
            scope.spawn(move || {
                for id in chunk {
                    let attributes = compilation
                        .get_custom_attributes_to_emit(*id)
                        .expect("attributes of a source struct");
                    assert!(attributes.iter().any(|a| a.is(WellKnownAttributeKind::IsReadOnly)));
                }
            });
        }
    });

    let definitions = compilation.synthesized_marker_types();
    let read_only: Vec<_> = definitions
        .iter()
        .filter(|d| d.kind == MarkerKind::IsReadOnly)
        .collect();
    assert_eq!(read_only.len(), 1);
    assert!(!read_only[0].has_flags_constructor);
    assert_eq!(
        compilation.requested_markers(),
        vec![MarkerKind::Embedded, MarkerKind::IsReadOnly]
    );

    let mut writer = InMemoryMetadataWriter::new();
    let outcome = compilation.emit(&mut writer)?;
    let tokens = outcome.tokens.marker(MarkerKind::IsReadOnly).expect("marker tokens");
    let uses = writer
        .custom_attributes()
        .iter()
        .filter(|row| row.constructor == tokens.constructor)
        .count();
    assert_eq!(uses, structs.len());
    Ok(())
}

/// Synthesized marker types carry `CompilerGenerated` and `Embedded` themselves.
#[test]
fn test_marker_types_are_embedded() -> Result<()> {
    let (mut builder, corlib) = start(CompilationOptions::library())?;
    let class = builder
        .declarations()
        .add_type(None, TypeDecl::class("N", "C").base(TypeSig::named(corlib.object)))?;
    let method = builder.declarations().add_method(
        class,
        MethodDecl::new("M").parameter(ParameterDecl::new("p", TypeSig::int()).ref_kind(RefKind::In)),
    )?;
    let compilation = builder.build();

    let parameter = compilation.table().parameters(method)[0];
    let attributes = compilation.get_custom_attributes_to_emit(parameter)?;
    assert!(attributes.iter().any(|a| a.is(WellKnownAttributeKind::IsReadOnly)));

    let definitions = compilation.synthesized_marker_types();
    let read_only = definitions
        .iter()
        .find(|d| d.kind == MarkerKind::IsReadOnly)
        .expect("IsReadOnly synthesized");
    let carried: Vec<MarkerKind> = read_only.attributes.iter().map(|(kind, _)| *kind).collect();
    assert_eq!(carried, vec![MarkerKind::CompilerGenerated, MarkerKind::Embedded]);
    assert!(definitions.iter().any(|d| d.kind == MarkerKind::Embedded));
    Ok(())
}

/// With synthesis disabled, a missing marker type is an error on the declaration.
#[test]
fn test_missing_marker_without_synthesis() -> Result<()> {
    let (mut builder, corlib) = start(CompilationOptions::library().with_synthesize_markers(false))?;
    builder.declarations().add_type(
        None,
        TypeDecl::structure("N", "Span")
            .base(TypeSig::named(corlib.value_type))
            .ref_like()
            .at(Location::source("Span.cs", 2, 15)),
    )?;
    let compilation = builder.build();

    let diagnostics = compilation.diagnostics()?;
    let errors = diagnostics.by_code(DiagnosticCode::ErrMissingPredefinedMember);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].arguments,
        vec!["System.Runtime.CompilerServices.IsByRefLikeAttribute", ".ctor"]
    );
    assert_eq!(errors[0].location, Location::source("Span.cs", 2, 15));
    assert!(compilation.requested_markers().is_empty());
    Ok(())
}

/// A library gets `CompilationRelaxations(8)` and `RuntimeCompatibility` unless it declares them.
#[test]
fn test_assembly_gets_relaxations_and_compatibility() -> Result<()> {
    let (builder, _) = start(CompilationOptions::library())?;
    let compilation = builder.build();
    let assembly = compilation.table().source_assembly();
    let added = compilation.get_custom_attributes_to_emit(assembly)?;
    assert_eq!(added.len(), 2);
    assert!(added[0].is(WellKnownAttributeKind::CompilationRelaxations));
    assert_eq!(added[0].fixed(0).and_then(TypedConstant::as_integer), Some(8));
    assert!(added[1].is(WellKnownAttributeKind::RuntimeCompatibility));
    assert_eq!(
        added[1].named("WrapNonExceptionThrows").and_then(TypedConstant::as_bool),
        Some(true)
    );

    let (mut builder, _) = start(CompilationOptions::library())?;
    builder.declarations().add_assembly_attribute(
        AttributeSyntax::new("System.Runtime.CompilerServices.CompilationRelaxations")
            .arg(Expression::int(0)),
    );
    let compilation = builder.build();
    let assembly = compilation.table().source_assembly();
    let relaxations = compilation
        .get_custom_attributes_to_emit(assembly)?
        .into_iter()
        .filter(|a| a.is(WellKnownAttributeKind::CompilationRelaxations))
        .count();
    assert_eq!(relaxations, 1);

    let (builder, _) = start(CompilationOptions::net_module())?;
    let compilation = builder.build();
    let assembly = compilation.table().source_assembly();
    assert!(compilation.get_custom_attributes_to_emit(assembly)?.is_empty());
    Ok(())
}

/// An embedded interop type drops the marker attributes it was imported with, while a
/// source type of the same shape gets them synthesized.
#[test]
fn test_embedded_types_drop_marker_attributes() -> Result<()> {
    let (mut builder, corlib) = start(CompilationOptions::library())?;
    let shape = |name: &str| {
        TypeDecl::structure("Interop", name)
            .base(TypeSig::named(corlib.value_type))
            .readonly()
            .ref_like()
            .imported(ImportedAttribute::simple(
                "System.Runtime.CompilerServices.IsReadOnlyAttribute",
            ))
            .imported(ImportedAttribute::simple(
                "System.Runtime.CompilerServices.IsByRefLikeAttribute",
            ))
            .imported(ImportedAttribute::simple("Microsoft.CodeAnalysis.EmbeddedAttribute"))
            .imported(ImportedAttribute::new(
                "System.ObsoleteAttribute",
                vec![SerType::String],
                CustomAttributeValue {
                    fixed_args: vec![TypedConstant::string("legacy")],
                    named_args: Vec::new(),
                },
            ))
    };
    let interop = builder.declarations().add_reference(
        "Interop",
        AssemblyData {
            embed_interop_types: true,
            ..AssemblyData::default()
        },
    );
    let linked = builder.declarations().add_reference("Linked", AssemblyData::default());
    let embedded = builder
        .declarations()
        .add_referenced_type(interop, None, shape("Buffer"))?;
    let referenced = builder
        .declarations()
        .add_referenced_type(linked, None, shape("Cursor"))?;
    let source = builder.declarations().add_type(
        None,
        TypeDecl::structure("N", "Buffer")
            .base(TypeSig::named(corlib.value_type))
            .readonly()
            .ref_like(),
    )?;
    let compilation = builder.build();
    assert!(matches!(
        compilation.table().get(embedded)?.origin,
        SymbolOrigin::Embedded(_)
    ));

    let attributes = compilation.get_custom_attributes_to_emit(embedded)?;
    assert!(attributes.iter().all(|a| MARKERS.iter().all(|kind| !a.is(*kind))));
    assert_eq!(attributes.len(), 1);
    assert_eq!(attributes[0].class_name, "System.ObsoleteAttribute");

    // plain references keep what metadata says
    let attributes = compilation.get_attributes(referenced)?;
    assert_eq!(attributes.len(), 4);

    let attributes = compilation.get_custom_attributes_to_emit(source)?;
    assert!(attributes.iter().any(|a| a.is(WellKnownAttributeKind::IsReadOnly)));
    assert!(attributes.iter().any(|a| a.is(WellKnownAttributeKind::IsByRefLike)));
    Ok(())
}
