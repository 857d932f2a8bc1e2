//! Recognition of well-known attribute classes by full name.

use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::metadata::wellknown::CallerInfoKind;

/// The closed set of attribute classes whose presence changes compiler behavior.
///
/// Recognition is by reflection full name only; a user type that merely shares the simple
/// name is an ordinary attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, IntoStaticStr, EnumIter)]
pub enum WellKnownAttributeKind {
    /// `System.Reflection.AssemblyVersionAttribute`
    AssemblyVersion,
    /// `System.Reflection.AssemblyFileVersionAttribute`
    AssemblyFileVersion,
    /// `System.Reflection.AssemblyInformationalVersionAttribute`
    AssemblyInformationalVersion,
    /// `System.Resources.SatelliteContractVersionAttribute`
    SatelliteContractVersion,
    /// `System.Reflection.AssemblyCultureAttribute`
    AssemblyCulture,
    /// `System.Reflection.AssemblyAlgorithmIdAttribute`
    AssemblyAlgorithmId,
    /// `System.Reflection.AssemblyFlagsAttribute`
    AssemblyFlags,
    /// `System.Reflection.AssemblyTitleAttribute`
    AssemblyTitle,
    /// `System.Reflection.AssemblyDescriptionAttribute`
    AssemblyDescription,
    /// `System.Reflection.AssemblyConfigurationAttribute`
    AssemblyConfiguration,
    /// `System.Reflection.AssemblyCompanyAttribute`
    AssemblyCompany,
    /// `System.Reflection.AssemblyProductAttribute`
    AssemblyProduct,
    /// `System.Reflection.AssemblyCopyrightAttribute`
    AssemblyCopyright,
    /// `System.Reflection.AssemblyTrademarkAttribute`
    AssemblyTrademark,
    /// `System.Reflection.AssemblyKeyFileAttribute`
    AssemblyKeyFile,
    /// `System.Reflection.AssemblyKeyNameAttribute`
    AssemblyKeyName,
    /// `System.Reflection.AssemblyDelaySignAttribute`
    AssemblyDelaySign,
    /// `System.Reflection.AssemblySignatureKeyAttribute`
    AssemblySignatureKey,
    /// `System.Runtime.CompilerServices.InternalsVisibleToAttribute`
    InternalsVisibleTo,
    /// `System.Runtime.CompilerServices.CallerLineNumberAttribute`
    CallerLineNumber,
    /// `System.Runtime.CompilerServices.CallerFilePathAttribute`
    CallerFilePath,
    /// `System.Runtime.CompilerServices.CallerMemberNameAttribute`
    CallerMemberName,
    /// `System.Runtime.CompilerServices.DynamicAttribute`
    Dynamic,
    /// `System.Runtime.CompilerServices.IsReadOnlyAttribute`
    IsReadOnly,
    /// `System.Runtime.CompilerServices.IsByRefLikeAttribute`
    IsByRefLike,
    /// `System.Runtime.CompilerServices.IsUnmanagedAttribute`
    IsUnmanaged,
    /// `Microsoft.CodeAnalysis.EmbeddedAttribute`
    Embedded,
    /// `System.Runtime.CompilerServices.CompilerGeneratedAttribute`
    CompilerGenerated,
    /// `System.Runtime.CompilerServices.CompilationRelaxationsAttribute`
    CompilationRelaxations,
    /// `System.Runtime.CompilerServices.RuntimeCompatibilityAttribute`
    RuntimeCompatibility,
    /// `System.AttributeUsageAttribute`
    AttributeUsage,
    /// `System.ObsoleteAttribute`
    Obsolete,
}

impl WellKnownAttributeKind {
    /// Reflection full name of the attribute class.
    #[must_use]
    pub fn full_name(self) -> &'static str {
        match self {
            WellKnownAttributeKind::AssemblyVersion => "System.Reflection.AssemblyVersionAttribute",
            WellKnownAttributeKind::AssemblyFileVersion => {
                "System.Reflection.AssemblyFileVersionAttribute"
            }
            WellKnownAttributeKind::AssemblyInformationalVersion => {
                "System.Reflection.AssemblyInformationalVersionAttribute"
            }
            WellKnownAttributeKind::SatelliteContractVersion => {
                "System.Resources.SatelliteContractVersionAttribute"
            }
            WellKnownAttributeKind::AssemblyCulture => "System.Reflection.AssemblyCultureAttribute",
            WellKnownAttributeKind::AssemblyAlgorithmId => {
                "System.Reflection.AssemblyAlgorithmIdAttribute"
            }
            WellKnownAttributeKind::AssemblyFlags => "System.Reflection.AssemblyFlagsAttribute",
            WellKnownAttributeKind::AssemblyTitle => "System.Reflection.AssemblyTitleAttribute",
            WellKnownAttributeKind::AssemblyDescription => {
                "System.Reflection.AssemblyDescriptionAttribute"
            }
            WellKnownAttributeKind::AssemblyConfiguration => {
                "System.Reflection.AssemblyConfigurationAttribute"
            }
            WellKnownAttributeKind::AssemblyCompany => "System.Reflection.AssemblyCompanyAttribute",
            WellKnownAttributeKind::AssemblyProduct => "System.Reflection.AssemblyProductAttribute",
            WellKnownAttributeKind::AssemblyCopyright => {
                "System.Reflection.AssemblyCopyrightAttribute"
            }
            WellKnownAttributeKind::AssemblyTrademark => {
                "System.Reflection.AssemblyTrademarkAttribute"
            }
            WellKnownAttributeKind::AssemblyKeyFile => "System.Reflection.AssemblyKeyFileAttribute",
            WellKnownAttributeKind::AssemblyKeyName => "System.Reflection.AssemblyKeyNameAttribute",
            WellKnownAttributeKind::AssemblyDelaySign => {
                "System.Reflection.AssemblyDelaySignAttribute"
            }
            WellKnownAttributeKind::AssemblySignatureKey => {
                "System.Reflection.AssemblySignatureKeyAttribute"
            }
            WellKnownAttributeKind::InternalsVisibleTo => {
                "System.Runtime.CompilerServices.InternalsVisibleToAttribute"
            }
            WellKnownAttributeKind::CallerLineNumber => {
                "System.Runtime.CompilerServices.CallerLineNumberAttribute"
            }
            WellKnownAttributeKind::CallerFilePath => {
                "System.Runtime.CompilerServices.CallerFilePathAttribute"
            }
            WellKnownAttributeKind::CallerMemberName => {
                "System.Runtime.CompilerServices.CallerMemberNameAttribute"
            }
            WellKnownAttributeKind::Dynamic => "System.Runtime.CompilerServices.DynamicAttribute",
            WellKnownAttributeKind::IsReadOnly => {
                "System.Runtime.CompilerServices.IsReadOnlyAttribute"
            }
            WellKnownAttributeKind::IsByRefLike => {
                "System.Runtime.CompilerServices.IsByRefLikeAttribute"
            }
            WellKnownAttributeKind::IsUnmanaged => {
                "System.Runtime.CompilerServices.IsUnmanagedAttribute"
            }
            WellKnownAttributeKind::Embedded => "Microsoft.CodeAnalysis.EmbeddedAttribute",
            WellKnownAttributeKind::CompilerGenerated => {
                "System.Runtime.CompilerServices.CompilerGeneratedAttribute"
            }
            WellKnownAttributeKind::CompilationRelaxations => {
                "System.Runtime.CompilerServices.CompilationRelaxationsAttribute"
            }
            WellKnownAttributeKind::RuntimeCompatibility => {
                "System.Runtime.CompilerServices.RuntimeCompatibilityAttribute"
            }
            WellKnownAttributeKind::AttributeUsage => "System.AttributeUsageAttribute",
            WellKnownAttributeKind::Obsolete => "System.ObsoleteAttribute",
        }
    }

    /// Recognize a class by its reflection full name.
    #[must_use]
    pub fn from_full_name(full_name: &str) -> Option<Self> {
        WellKnownAttributeKind::iter().find(|kind| kind.full_name() == full_name)
    }

    /// Assembly-level attributes whose decoded value describes the assembly identity or
    /// manifest. An instance from a net-module that source replaces draws a warning.
    #[must_use]
    pub fn is_assembly_identity(self) -> bool {
        matches!(
            self,
            WellKnownAttributeKind::AssemblyVersion
                | WellKnownAttributeKind::AssemblyFileVersion
                | WellKnownAttributeKind::AssemblyInformationalVersion
                | WellKnownAttributeKind::SatelliteContractVersion
                | WellKnownAttributeKind::AssemblyCulture
                | WellKnownAttributeKind::AssemblyAlgorithmId
                | WellKnownAttributeKind::AssemblyFlags
                | WellKnownAttributeKind::AssemblyTitle
                | WellKnownAttributeKind::AssemblyDescription
                | WellKnownAttributeKind::AssemblyConfiguration
                | WellKnownAttributeKind::AssemblyCompany
                | WellKnownAttributeKind::AssemblyProduct
                | WellKnownAttributeKind::AssemblyCopyright
                | WellKnownAttributeKind::AssemblyTrademark
                | WellKnownAttributeKind::AssemblyKeyFile
                | WellKnownAttributeKind::AssemblyKeyName
                | WellKnownAttributeKind::AssemblyDelaySign
                | WellKnownAttributeKind::AssemblySignatureKey
        )
    }

    /// Attributes stored in metadata tables rather than as custom-attribute rows.
    #[must_use]
    pub fn is_pseudo_custom(self) -> bool {
        matches!(self, WellKnownAttributeKind::AssemblyAlgorithmId)
    }

    /// One of the three caller-info parameter markers.
    #[must_use]
    pub fn is_caller_info(self) -> bool {
        matches!(
            self,
            WellKnownAttributeKind::CallerLineNumber
                | WellKnownAttributeKind::CallerFilePath
                | WellKnownAttributeKind::CallerMemberName
        )
    }

    /// The substitution a caller-info marker stands for.
    #[must_use]
    pub fn caller_info(self) -> Option<CallerInfoKind> {
        match self {
            WellKnownAttributeKind::CallerLineNumber => Some(CallerInfoKind::LineNumber),
            WellKnownAttributeKind::CallerFilePath => Some(CallerInfoKind::FilePath),
            WellKnownAttributeKind::CallerMemberName => Some(CallerInfoKind::MemberName),
            _ => None,
        }
    }

    /// Marker types only the compiler may apply.
    #[must_use]
    pub fn is_reserved(self) -> bool {
        matches!(
            self,
            WellKnownAttributeKind::Dynamic
                | WellKnownAttributeKind::IsReadOnly
                | WellKnownAttributeKind::IsByRefLike
                | WellKnownAttributeKind::IsUnmanaged
        )
    }
}
