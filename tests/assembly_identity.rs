//! Integration tests for assembly identity attributes and the Assembly row.
//!
//! These tests declare assembly-level attributes in source and check the decoded values,
//! the diagnostics, and the row the emitter writes.

use cilattr::{prelude::*, Result};

fn compilation(options: CompilationOptions, attributes: Vec<AttributeSyntax>) -> Result<Compilation> {
    let mut builder = CompilationBuilder::new("App", options);
    builder.corlib()?;
    for attribute in attributes {
        builder.declarations().add_assembly_attribute(attribute);
    }
    Ok(builder.build())
}

fn version(text: &str) -> AttributeSyntax {
    AttributeSyntax::new("System.Reflection.AssemblyVersion")
        .arg(Expression::string(text))
        .at(Location::source("AssemblyInfo.cs", 1, 12))
}

/// A four-part version is decoded without diagnostics and lands in the Assembly row.
#[test]
fn test_four_part_version() -> Result<()> {
    let compilation = compilation(CompilationOptions::library(), vec![version("1.22.333.4444")])?;
    assert!(compilation.diagnostics()?.is_empty());

    let assembly = compilation.table().source_assembly();
    let expected = Version {
        major: 1,
        minor: 22,
        build: 333,
        revision: 4444,
    };
    assert_eq!(
        compilation.get_well_known_attribute_value(assembly, WellKnownAttributeKind::AssemblyVersion)?,
        Some(WellKnownValue::Version(expected))
    );

    let mut writer = InMemoryMetadataWriter::new();
    compilation.emit(&mut writer)?;
    let row = writer.assembly().expect("assembly row written");
    assert_eq!(row.version, expected);
    assert_eq!(writer.string(row.name), Some(&b"App"[..]));
    assert_eq!(row.culture, 0);
    Ok(())
}

/// A wildcard in the minor position is rejected and blocks emit.
#[test]
fn test_wildcard_minor_is_rejected() -> Result<()> {
    let compilation = compilation(CompilationOptions::library(), vec![version("1.*")])?;
    let diagnostics = compilation.diagnostics()?;
    let errors = diagnostics.by_code(DiagnosticCode::ErrInvalidVersionFormat);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].location, Location::source("AssemblyInfo.cs", 1, 12));

    let assembly = compilation.table().source_assembly();
    assert_eq!(
        compilation.get_well_known_attribute_value(assembly, WellKnownAttributeKind::AssemblyVersion)?,
        None
    );
    assert!(matches!(
        compilation.emit(&mut InMemoryMetadataWriter::new()),
        Err(Error::EmitFailed { errors: 1 })
    ));
    Ok(())
}

/// A wildcard build number is generated from the build time and stays stable per compilation.
#[test]
fn test_wildcard_build_is_generated() -> Result<()> {
    let compilation = compilation(CompilationOptions::library(), vec![version("2.5.*")])?;
    assert!(!compilation.diagnostics()?.has_errors());

    let assembly = compilation.table().source_assembly();
    let data = compilation.well_known_data(assembly)?;
    let version = data.assembly.version.expect("version decoded");
    assert_eq!((version.major, version.minor), (2, 5));
    assert!(data.assembly.version_has_wildcard);
    assert_eq!(compilation.well_known_data(assembly)?.assembly.version, Some(version));
    Ok(())
}

/// The algorithm id lives in the Assembly row, so it is reflected but never emitted as a row.
#[test]
fn test_algorithm_id_is_not_emitted_as_a_row() -> Result<()> {
    let compilation = compilation(
        CompilationOptions::library(),
        vec![AttributeSyntax::new("System.Reflection.AssemblyAlgorithmId")
            .arg(Expression::int(0x8004))],
    )?;
    let assembly = compilation.table().source_assembly();
    assert!(compilation
        .get_attributes(assembly)?
        .iter()
        .any(|a| a.is(WellKnownAttributeKind::AssemblyAlgorithmId)));
    assert!(compilation
        .get_custom_attributes_to_emit(assembly)?
        .iter()
        .all(|a| !a.is(WellKnownAttributeKind::AssemblyAlgorithmId)));
    Ok(())
}

/// A culture on an executable is an error, on a library it is written to the row.
#[test]
fn test_culture_depends_on_output_kind() -> Result<()> {
    let culture = || {
        AttributeSyntax::new("System.Reflection.AssemblyCulture").arg(Expression::string("de-DE"))
    };

    let library = compilation(CompilationOptions::library(), vec![culture()])?;
    assert!(library.diagnostics()?.is_empty());
    let mut writer = InMemoryMetadataWriter::new();
    library.emit(&mut writer)?;
    let row = writer.assembly().expect("assembly row written");
    assert_eq!(writer.string(row.culture), Some(&b"de-DE"[..]));

    let executable = compilation(CompilationOptions::console_application(), vec![culture()])?;
    assert_eq!(
        executable
            .diagnostics()?
            .by_code(DiagnosticCode::ErrInvalidAssemblyCultureForExe)
            .len(),
        1
    );
    Ok(())
}

/// A public key sets the public-key flag in the Assembly row.
#[test]
fn test_public_key_sets_the_flag() -> Result<()> {
    let options = CompilationOptions::library().with_public_key(vec![0x00, 0x24, 0x00, 0x00]);
    let compilation = compilation(options, Vec::new())?;
    let mut writer = InMemoryMetadataWriter::new();
    compilation.emit(&mut writer)?;
    let row = writer.assembly().expect("assembly row written");
    assert_eq!(row.flags & 0x0001, 0x0001);
    assert_ne!(row.public_key, 0);
    Ok(())
}

/// An unsupported hash algorithm only matters once a net-module must be hashed.
#[test]
fn test_unsupported_hash_algorithm_is_deferred() -> Result<()> {
    let algorithm =
        || AttributeSyntax::new("System.Reflection.AssemblyAlgorithmId").arg(Expression::int(12345));

    let alone = compilation(CompilationOptions::library(), vec![algorithm()])?;
    assert!(!alone.diagnostics()?.has_errors());
    let mut writer = InMemoryMetadataWriter::new();
    alone.emit(&mut writer)?;
    assert_eq!(writer.assembly().map(|r| r.hash_algorithm), Some(12345));
    assert!(writer.files().is_empty());

    let mut builder = CompilationBuilder::new("App", CompilationOptions::library());
    builder.corlib()?;
    builder.declarations().add_assembly_attribute(algorithm());
    builder.add_net_module(NetModule::new("m1.netmodule", vec![0x4D, 0x5A, 0x90, 0x00]));
    let linked = builder.build();
    assert!(!linked.diagnostics()?.has_errors());
    let mut writer = InMemoryMetadataWriter::new();
    assert!(matches!(
        linked.emit(&mut writer),
        Err(Error::EmitFailed { errors: 1 })
    ));
    // a failed emit leaves the writer untouched
    assert!(writer.custom_attributes().is_empty());
    assert!(writer.assembly().is_none());
    assert!(writer.files().is_empty());
    assert_eq!(
        linked.diagnostics()?.by_code(DiagnosticCode::ErrCryptoHashFailed).len(),
        1
    );
    Ok(())
}

/// Linked net-modules are hashed with the default SHA-1 algorithm.
#[test]
fn test_net_modules_are_hashed() -> Result<()> {
    let mut builder = CompilationBuilder::new("App", CompilationOptions::library());
    builder.corlib()?;
    builder.add_net_module(NetModule::new("m1.netmodule", vec![0x4D, 0x5A, 0x90, 0x00, 0x03]));
    let compilation = builder.build();

    let mut writer = InMemoryMetadataWriter::new();
    compilation.emit(&mut writer)?;
    let files = writer.files();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].file_index, 1);
    assert_eq!(writer.blob(files[0].hash).map(<[u8]>::len), Some(20));
    assert_eq!(
        writer.assembly().map(|r| r.hash_algorithm),
        Some(AssemblyHashAlgorithm::SHA1)
    );
    Ok(())
}

/// Friend assemblies accumulate in declaration order.
#[test]
fn test_internals_visible_to_collects_friends() -> Result<()> {
    let friend = |name: &str| {
        AttributeSyntax::new("System.Runtime.CompilerServices.InternalsVisibleTo")
            .arg(Expression::string(name))
    };
    let compilation = compilation(
        CompilationOptions::library(),
        vec![friend("App.Tests"), friend("App.Benchmarks")],
    )?;
    assert!(compilation.diagnostics()?.is_empty());
    let assembly = compilation.table().source_assembly();
    assert_eq!(
        compilation
            .get_well_known_attribute_value(assembly, WellKnownAttributeKind::InternalsVisibleTo)?,
        Some(WellKnownValue::Friends(vec![
            "App.Tests".to_string(),
            "App.Benchmarks".to_string()
        ]))
    );
    Ok(())
}

/// Repeating an identical `InternalsVisibleTo` in source writes a single row.
#[test]
fn test_identical_friend_attributes_collapse() -> Result<()> {
    let friend = || {
        AttributeSyntax::new("System.Runtime.CompilerServices.InternalsVisibleTo")
            .arg(Expression::string("A"))
    };
    let compilation = compilation(
        CompilationOptions::library(),
        vec![friend(), friend(), friend()],
    )?;
    assert!(compilation.diagnostics()?.is_empty());

    let assembly = compilation.table().source_assembly();
    let friends = compilation
        .get_custom_attributes_to_emit(assembly)?
        .into_iter()
        .filter(|a| a.is(WellKnownAttributeKind::InternalsVisibleTo))
        .count();
    assert_eq!(friends, 1);
    let suppressed = compilation.suppressed_module_attributes()?;
    assert_eq!(suppressed.len(), 2);
    assert!(suppressed.iter().all(|a| a.duplicate_suppressed && a.source == AttributeSource::Source));

    let mut writer = InMemoryMetadataWriter::new();
    compilation.emit(&mut writer)?;
    let mut blob = vec![0x01, 0x00, 0x01, b'A'];
    blob.extend_from_slice(&[0x00, 0x00]);
    let rows = writer
        .custom_attributes()
        .iter()
        .filter(|r| writer.blob(r.value) == Some(blob.as_slice()))
        .count();
    assert_eq!(rows, 1);
    Ok(())
}
