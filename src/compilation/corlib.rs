//! A referenced core library with the types attribute binding depends on.
//!
//! [`Corlib::standard`] declares a referenced `mscorlib` holding the System base types, the
//! primitive structs, `AttributeUsageAttribute` with `AttributeTargets`, and the attribute
//! classes the well-known decoder recognizes, each carrying the `AttributeUsage` it has in
//! the real framework. The `IsReadOnly`, `IsByRefLike` and `IsUnmanaged` markers are left
//! out on purpose: a compilation against this library gets them synthesized.

use strum::IntoEnumIterator;

use crate::{
    metadata::{
        customattributes::{
            ConstantValue, CustomAttributeValue, NamedArgument, NamedArgumentKind, SerType,
            TypedConstant,
        },
        symbols::{
            AssemblyData, AttributeTargets, FieldDecl, ImportedAttribute, MethodDecl,
            ObsoleteData, ParameterDecl, PropertyDecl, SymbolId, SymbolTableBuilder, TypeDecl,
            TypeParameterDecl,
        },
        typesystem::{PrimitiveType, TypeSig},
        wellknown::{AssemblyFlags, AssemblyHashAlgorithm, Version},
    },
    Result,
};

/// Name of the referenced core library.
pub const CORLIB_NAME: &str = "mscorlib";

const REFLECTION: &str = "System.Reflection";
const COMPILER_SERVICES: &str = "System.Runtime.CompilerServices";

/// Assembly attributes constructed from a single string.
const STRING_ASSEMBLY_ATTRIBUTES: [(&str, &str); 13] = [
    (REFLECTION, "AssemblyVersionAttribute"),
    (REFLECTION, "AssemblyFileVersionAttribute"),
    (REFLECTION, "AssemblyInformationalVersionAttribute"),
    (REFLECTION, "AssemblyCultureAttribute"),
    (REFLECTION, "AssemblyTitleAttribute"),
    (REFLECTION, "AssemblyDescriptionAttribute"),
    (REFLECTION, "AssemblyConfigurationAttribute"),
    (REFLECTION, "AssemblyCompanyAttribute"),
    (REFLECTION, "AssemblyProductAttribute"),
    (REFLECTION, "AssemblyCopyrightAttribute"),
    (REFLECTION, "AssemblyTrademarkAttribute"),
    (REFLECTION, "AssemblyKeyFileAttribute"),
    (REFLECTION, "AssemblyKeyNameAttribute"),
];

/// The `AttributeUsage` a referenced attribute class carries in metadata.
#[must_use]
pub fn usage_attribute(
    targets: AttributeTargets,
    allow_multiple: bool,
    inherited: bool,
) -> ImportedAttribute {
    let bits = i32::try_from(targets.bits()).unwrap_or(i32::MAX);
    let flag = |name: &str, value: bool| NamedArgument {
        kind: NamedArgumentKind::Property,
        name: name.to_string(),
        value: TypedConstant::bool(value),
    };
    ImportedAttribute::new(
        "System.AttributeUsageAttribute",
        vec![SerType::Enum {
            name: "System.AttributeTargets".to_string(),
            underlying: PrimitiveType::Int32,
        }],
        CustomAttributeValue {
            fixed_args: vec![TypedConstant::enum_value(
                "System.AttributeTargets",
                PrimitiveType::Int32,
                ConstantValue::I4(bits),
            )],
            named_args: vec![flag("AllowMultiple", allow_multiple), flag("Inherited", inherited)],
        },
    )
}

/// Ids of the core types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Corlib {
    /// The core library assembly
    pub assembly: SymbolId,
    /// `System.Object`
    pub object: SymbolId,
    /// `System.ValueType`
    pub value_type: SymbolId,
    /// `System.Enum`
    pub enum_type: SymbolId,
    /// `System.String`
    pub string: SymbolId,
    /// `System.Type`
    pub system_type: SymbolId,
    /// `System.Array`
    pub array: SymbolId,
    /// `System.Nullable<T>`
    pub nullable: SymbolId,
    /// `System.IComparable`
    pub comparable: SymbolId,
    /// `System.Attribute`
    pub attribute: SymbolId,
    /// `System.AttributeTargets`
    pub attribute_targets: SymbolId,
    /// `System.AttributeUsageAttribute`
    pub attribute_usage: SymbolId,
}

impl Corlib {
    /// Declare the standard core library as a reference of `builder`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidDeclaration`] if a declaration is rejected, which only
    /// happens when `builder` already declares one of the core names in a conflicting way.
    pub fn standard(builder: &mut SymbolTableBuilder) -> Result<Corlib> {
        let assembly = builder.add_reference(
            CORLIB_NAME,
            AssemblyData {
                version: Version::new(4, 0, 0, 0),
                ..AssemblyData::default()
            },
        );
        let mut declare = |decl: TypeDecl| builder.add_referenced_type(assembly, None, decl);

        let object = declare(TypeDecl::class("System", "Object"))?;
        let value_type = declare(
            TypeDecl::class("System", "ValueType")
                .abstract_()
                .base(TypeSig::named(object)),
        )?;
        let enum_type = declare(
            TypeDecl::class("System", "Enum")
                .abstract_()
                .base(TypeSig::named(value_type)),
        )?;
        let comparable = declare(TypeDecl::interface("System", "IComparable"))?;
        let string = declare(
            TypeDecl::class("System", "String")
                .sealed()
                .base(TypeSig::named(object))
                .implements(TypeSig::named(comparable)),
        )?;
        for primitive in PrimitiveType::iter() {
            let name: &'static str = primitive.into();
            declare(
                TypeDecl::structure("System", name)
                    .base(TypeSig::named(value_type))
                    .implements(TypeSig::named(comparable)),
            )?;
        }
        declare(TypeDecl::structure("System", "Void").base(TypeSig::named(value_type)))?;
        let system_type = declare(
            TypeDecl::class("System", "Type")
                .abstract_()
                .base(TypeSig::named(object)),
        )?;
        let array = declare(
            TypeDecl::class("System", "Array")
                .abstract_()
                .base(TypeSig::named(object)),
        )?;
        let nullable = declare(
            TypeDecl::structure("System", "Nullable")
                .base(TypeSig::named(value_type))
                .type_parameter_decl(TypeParameterDecl::new("T")),
        )?;
        let attribute = declare(
            TypeDecl::class("System", "Attribute")
                .abstract_()
                .base(TypeSig::named(object))
                .imported(usage_attribute(AttributeTargets::ALL, false, true)),
        )?;

        let attribute_targets = declare(
            TypeDecl::enumeration("System", "AttributeTargets", PrimitiveType::Int32)
                .base(TypeSig::named(enum_type)),
        )?;
        for (name, bits) in [
            ("Assembly", AttributeTargets::ASSEMBLY),
            ("Module", AttributeTargets::MODULE),
            ("Class", AttributeTargets::CLASS),
            ("Struct", AttributeTargets::STRUCT),
            ("Enum", AttributeTargets::ENUM),
            ("Constructor", AttributeTargets::CONSTRUCTOR),
            ("Method", AttributeTargets::METHOD),
            ("Property", AttributeTargets::PROPERTY),
            ("Field", AttributeTargets::FIELD),
            ("Event", AttributeTargets::EVENT),
            ("Interface", AttributeTargets::INTERFACE),
            ("Parameter", AttributeTargets::PARAMETER),
            ("Delegate", AttributeTargets::DELEGATE),
            ("ReturnValue", AttributeTargets::RETURN_VALUE),
            ("GenericParameter", AttributeTargets::GENERIC_PARAMETER),
            ("All", AttributeTargets::ALL),
        ] {
            let value = i32::try_from(bits.bits()).unwrap_or(i32::MAX);
            builder.add_field(
                attribute_targets,
                FieldDecl::enum_member(name, ConstantValue::I4(value)),
            )?;
        }

        let mut corlib = Corlib {
            assembly,
            object,
            value_type,
            enum_type,
            string,
            system_type,
            array,
            nullable,
            comparable,
            attribute,
            attribute_targets,
            attribute_usage: attribute,
        };

        let usage = corlib.attribute_class(
            builder,
            "System",
            "AttributeUsageAttribute",
            usage_attribute(AttributeTargets::CLASS, false, true),
        )?;
        builder.add_method(
            usage,
            MethodDecl::constructor().parameter(ParameterDecl::new(
                "validOn",
                TypeSig::named(attribute_targets),
            )),
        )?;
        let boolean = TypeSig::Primitive(PrimitiveType::Boolean);
        builder.add_property(usage, PropertyDecl::new("AllowMultiple", boolean.clone()))?;
        builder.add_property(usage, PropertyDecl::new("Inherited", boolean.clone()))?;
        builder.add_property(
            usage,
            PropertyDecl::new("ValidOn", TypeSig::named(attribute_targets)).read_only(),
        )?;
        corlib.attribute_usage = usage;

        corlib.declare_attributes(builder)?;
        Ok(corlib)
    }

    /// Declare a sealed attribute class of the core library with the given usage.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidDeclaration`] if the declaration is rejected.
    pub fn attribute_class(
        &self,
        builder: &mut SymbolTableBuilder,
        namespace: &str,
        name: &str,
        usage: ImportedAttribute,
    ) -> Result<SymbolId> {
        builder.add_referenced_type(
            self.assembly,
            None,
            TypeDecl::class(namespace, name)
                .sealed()
                .base(TypeSig::named(self.attribute))
                .imported(usage),
        )
    }

    fn declare_attributes(&self, builder: &mut SymbolTableBuilder) -> Result<()> {
        let assembly_only = || usage_attribute(AttributeTargets::ASSEMBLY, false, false);
        let text = || ParameterDecl::new("value", TypeSig::String);
        let int = TypeSig::int();
        let uint = TypeSig::Primitive(PrimitiveType::UInt32);

        for (namespace, name) in STRING_ASSEMBLY_ATTRIBUTES {
            let class = self.attribute_class(builder, namespace, name, assembly_only())?;
            builder.add_method(class, MethodDecl::constructor().parameter(text()))?;
        }

        let satellite = self.attribute_class(
            builder,
            "System.Resources",
            "SatelliteContractVersionAttribute",
            assembly_only(),
        )?;
        builder.add_method(satellite, MethodDecl::constructor().parameter(text()))?;

        let delay_sign =
            self.attribute_class(builder, REFLECTION, "AssemblyDelaySignAttribute", assembly_only())?;
        builder.add_method(
            delay_sign,
            MethodDecl::constructor().parameter(ParameterDecl::new(
                "delaySign",
                TypeSig::Primitive(PrimitiveType::Boolean),
            )),
        )?;

        let signature_key = self.attribute_class(
            builder,
            REFLECTION,
            "AssemblySignatureKeyAttribute",
            assembly_only(),
        )?;
        builder.add_method(
            signature_key,
            MethodDecl::constructor()
                .parameter(ParameterDecl::new("publicKey", TypeSig::String))
                .parameter(ParameterDecl::new("countersignature", TypeSig::String)),
        )?;

        let hash_algorithm = builder.add_referenced_type(
            self.assembly,
            None,
            TypeDecl::enumeration(
                "System.Configuration.Assemblies",
                "AssemblyHashAlgorithm",
                PrimitiveType::Int32,
            )
            .base(TypeSig::named(self.enum_type)),
        )?;
        for (name, value) in [
            ("None", AssemblyHashAlgorithm::NONE),
            ("MD5", AssemblyHashAlgorithm::MD5),
            ("SHA1", AssemblyHashAlgorithm::SHA1),
            ("SHA256", AssemblyHashAlgorithm::SHA256),
            ("SHA384", AssemblyHashAlgorithm::SHA384),
            ("SHA512", AssemblyHashAlgorithm::SHA512),
        ] {
            let value = i32::try_from(value).unwrap_or(i32::MAX);
            builder.add_field(hash_algorithm, FieldDecl::enum_member(name, ConstantValue::I4(value)))?;
        }
        let algorithm =
            self.attribute_class(builder, REFLECTION, "AssemblyAlgorithmIdAttribute", assembly_only())?;
        builder.add_method(
            algorithm,
            MethodDecl::constructor().parameter(ParameterDecl::new(
                "algorithmId",
                TypeSig::named(hash_algorithm),
            )),
        )?;
        builder.add_method(
            algorithm,
            MethodDecl::constructor()
                .parameter(ParameterDecl::new("algorithmId", uint.clone()))
                .obsolete(ObsoleteData {
                    message: Some(
                        "This constructor has been deprecated. Please use AssemblyAlgorithmIdAttribute(AssemblyHashAlgorithm) instead."
                            .to_string(),
                    ),
                    is_error: false,
                }),
        )?;

        let name_flags = builder.add_referenced_type(
            self.assembly,
            None,
            TypeDecl::enumeration(REFLECTION, "AssemblyNameFlags", PrimitiveType::Int32)
                .base(TypeSig::named(self.enum_type)),
        )?;
        for (name, value) in [
            ("None", 0),
            ("PublicKey", AssemblyFlags::PUBLIC_KEY),
            ("Retargetable", AssemblyFlags::RETARGETABLE),
            ("EnableJITcompileOptimizer", AssemblyFlags::DISABLE_JIT_COMPILE_OPTIMIZER),
            ("EnableJITcompileTracking", AssemblyFlags::ENABLE_JIT_COMPILE_TRACKING),
        ] {
            let value = i32::try_from(value).unwrap_or(i32::MAX);
            builder.add_field(name_flags, FieldDecl::enum_member(name, ConstantValue::I4(value)))?;
        }
        let flags =
            self.attribute_class(builder, REFLECTION, "AssemblyFlagsAttribute", assembly_only())?;
        builder.add_method(
            flags,
            MethodDecl::constructor()
                .parameter(ParameterDecl::new("assemblyFlags", TypeSig::named(name_flags))),
        )?;
        for legacy in [int.clone(), uint] {
            builder.add_method(
                flags,
                MethodDecl::constructor()
                    .parameter(ParameterDecl::new("assemblyFlags", legacy))
                    .obsolete(ObsoleteData {
                        message: Some(
                            "This constructor has been deprecated. Please use AssemblyFlagsAttribute(AssemblyNameFlags) instead."
                                .to_string(),
                        ),
                        is_error: false,
                    }),
            )?;
        }

        let friends = self.attribute_class(
            builder,
            COMPILER_SERVICES,
            "InternalsVisibleToAttribute",
            usage_attribute(AttributeTargets::ASSEMBLY, true, false),
        )?;
        builder.add_method(
            friends,
            MethodDecl::constructor().parameter(ParameterDecl::new("assemblyName", TypeSig::String)),
        )?;

        for name in [
            "CallerLineNumberAttribute",
            "CallerFilePathAttribute",
            "CallerMemberNameAttribute",
        ] {
            let class = self.attribute_class(
                builder,
                COMPILER_SERVICES,
                name,
                usage_attribute(AttributeTargets::PARAMETER, false, false),
            )?;
            builder.add_method(class, MethodDecl::constructor())?;
        }

        let generated = self.attribute_class(
            builder,
            COMPILER_SERVICES,
            "CompilerGeneratedAttribute",
            usage_attribute(AttributeTargets::ALL, false, true),
        )?;
        builder.add_method(generated, MethodDecl::constructor())?;

        let dynamic = self.attribute_class(
            builder,
            COMPILER_SERVICES,
            "DynamicAttribute",
            usage_attribute(
                AttributeTargets::CLASS
                    | AttributeTargets::STRUCT
                    | AttributeTargets::FIELD
                    | AttributeTargets::PARAMETER
                    | AttributeTargets::PROPERTY
                    | AttributeTargets::EVENT
                    | AttributeTargets::RETURN_VALUE,
                false,
                true,
            ),
        )?;
        builder.add_method(dynamic, MethodDecl::constructor())?;
        builder.add_method(
            dynamic,
            MethodDecl::constructor().parameter(ParameterDecl::new(
                "transformFlags",
                TypeSig::sz_array(TypeSig::Primitive(PrimitiveType::Boolean)),
            )),
        )?;

        let relaxations = self.attribute_class(
            builder,
            COMPILER_SERVICES,
            "CompilationRelaxationsAttribute",
            usage_attribute(
                AttributeTargets::ASSEMBLY | AttributeTargets::MODULE | AttributeTargets::CLASS
                    | AttributeTargets::METHOD,
                false,
                false,
            ),
        )?;
        builder.add_method(
            relaxations,
            MethodDecl::constructor().parameter(ParameterDecl::new("relaxations", int)),
        )?;

        let compatibility = self.attribute_class(
            builder,
            COMPILER_SERVICES,
            "RuntimeCompatibilityAttribute",
            usage_attribute(AttributeTargets::ASSEMBLY, false, false),
        )?;
        builder.add_method(compatibility, MethodDecl::constructor())?;
        builder.add_property(
            compatibility,
            PropertyDecl::new("WrapNonExceptionThrows", TypeSig::Primitive(PrimitiveType::Boolean)),
        )?;

        let obsolete = self.attribute_class(
            builder,
            "System",
            "ObsoleteAttribute",
            usage_attribute(
                AttributeTargets::ALL
                    - AttributeTargets::ASSEMBLY
                    - AttributeTargets::MODULE
                    - AttributeTargets::PARAMETER
                    - AttributeTargets::RETURN_VALUE
                    - AttributeTargets::GENERIC_PARAMETER,
                false,
                false,
            ),
        )?;
        builder.add_method(obsolete, MethodDecl::constructor())?;
        builder.add_method(obsolete, MethodDecl::constructor().parameter(text()))?;
        builder.add_method(
            obsolete,
            MethodDecl::constructor()
                .parameter(ParameterDecl::new("message", TypeSig::String))
                .parameter(ParameterDecl::new(
                    "error",
                    TypeSig::Primitive(PrimitiveType::Boolean),
                )),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::wellknown::{decode_usage, WellKnownAttributeKind};

    #[test]
    fn declares_every_well_known_class() {
        let mut builder = SymbolTableBuilder::new("App", "App.dll");
        let corlib = Corlib::standard(&mut builder).unwrap();
        let table = builder.build();
        assert_eq!(table.corlib(), Some(corlib.assembly));
        for kind in [
            WellKnownAttributeKind::AssemblyVersion,
            WellKnownAttributeKind::AssemblyAlgorithmId,
            WellKnownAttributeKind::InternalsVisibleTo,
            WellKnownAttributeKind::CallerFilePath,
            WellKnownAttributeKind::Dynamic,
            WellKnownAttributeKind::RuntimeCompatibility,
            WellKnownAttributeKind::AttributeUsage,
        ] {
            let class = table.lookup_type(kind.full_name()).unwrap();
            assert!(table.is_attribute_class(class), "{}", kind.full_name());
        }
        assert!(table
            .lookup_type(WellKnownAttributeKind::IsReadOnly.full_name())
            .is_none());
        assert_eq!(table.constructors(corlib.attribute_usage).len(), 1);
    }

    #[test]
    fn usage_attribute_decodes() {
        let usage = usage_attribute(AttributeTargets::ASSEMBLY, true, false);
        let info = decode_usage(&usage.value);
        assert_eq!(info.valid_on, AttributeTargets::ASSEMBLY);
        assert!(info.allow_multiple);
        assert!(!info.inherited);
    }
}
