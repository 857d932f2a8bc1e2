//! Decoded well-known attribute payloads.

use widestring::U16String;

use crate::metadata::{
    symbols::{AttributeTargets, ObsoleteData},
    wellknown::{Version, WellKnownAttributeKind},
};

/// `AssemblyHashAlgorithm` values (ECMA-335 §II.23.1.1).
#[allow(non_snake_case)]
pub mod AssemblyHashAlgorithm {
    /// No hash
    pub const NONE: u32 = 0x0000;
    /// MD5
    pub const MD5: u32 = 0x8003;
    /// SHA1, the default
    pub const SHA1: u32 = 0x8004;
    /// SHA256
    pub const SHA256: u32 = 0x800C;
    /// SHA384
    pub const SHA384: u32 = 0x800D;
    /// SHA512
    pub const SHA512: u32 = 0x800E;
}

/// `AssemblyFlags` values (ECMA-335 §II.23.1.2).
#[allow(non_snake_case)]
pub mod AssemblyFlags {
    /// The assembly reference holds the full public key
    pub const PUBLIC_KEY: u32 = 0x0001;
    /// The implementation may be retargeted at runtime
    pub const RETARGETABLE: u32 = 0x0100;
    /// JIT optimizer disabled
    pub const DISABLE_JIT_COMPILE_OPTIMIZER: u32 = 0x4000;
    /// JIT tracking enabled
    pub const ENABLE_JIT_COMPILE_TRACKING: u32 = 0x8000;
}

/// Which caller-info substitution a parameter receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallerInfoKind {
    /// Lowest precedence
    MemberName,
    /// Middle precedence
    FilePath,
    /// Highest precedence
    LineNumber,
}

/// Caller-info markers found on a parameter and the one that takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallerInfoData {
    /// `[CallerLineNumber]` present
    pub line_number: bool,
    /// `[CallerFilePath]` present
    pub file_path: bool,
    /// `[CallerMemberName]` present
    pub member_name: bool,
    /// The substitution call sites use, if any
    pub active: Option<CallerInfoKind>,
}

impl CallerInfoData {
    /// Whether `kind` was applied.
    #[must_use]
    pub fn has(&self, kind: CallerInfoKind) -> bool {
        match kind {
            CallerInfoKind::LineNumber => self.line_number,
            CallerInfoKind::FilePath => self.file_path,
            CallerInfoKind::MemberName => self.member_name,
        }
    }

    pub(crate) fn mark(&mut self, kind: CallerInfoKind) {
        match kind {
            CallerInfoKind::LineNumber => self.line_number = true,
            CallerInfoKind::FilePath => self.file_path = true,
            CallerInfoKind::MemberName => self.member_name = true,
        }
    }

    /// Whether any marker was applied.
    #[must_use]
    pub fn any(&self) -> bool {
        self.line_number || self.file_path || self.member_name
    }
}

/// Decoded `AttributeUsageAttribute` of an attribute class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeUsageInfo {
    /// Declarations the attribute may be applied to
    pub valid_on: AttributeTargets,
    /// Several instances may be applied to one target
    pub allow_multiple: bool,
    /// Applies to derived classes and overriding members
    pub inherited: bool,
}

impl Default for AttributeUsageInfo {
    fn default() -> Self {
        AttributeUsageInfo {
            valid_on: AttributeTargets::ALL,
            allow_multiple: false,
            inherited: true,
        }
    }
}

/// Well-known data decoded from assembly-level attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssemblyWellKnownData {
    /// `AssemblyVersion`
    pub version: Option<Version>,
    /// The assembly version was written with `*`
    pub version_has_wildcard: bool,
    /// `AssemblyFileVersion`, verbatim
    pub file_version: Option<String>,
    /// `AssemblyInformationalVersion`, verbatim
    pub informational_version: Option<String>,
    /// `SatelliteContractVersion`
    pub satellite_contract_version: Option<Version>,
    /// `AssemblyCulture`, as UTF-16 code units
    pub culture: Option<U16String>,
    /// `AssemblyAlgorithmId`, raw
    pub algorithm_id: Option<u32>,
    /// `AssemblyFlags`, OR of every instance
    pub flags: Option<u32>,
    /// `AssemblyTitle`
    pub title: Option<String>,
    /// `AssemblyDescription`
    pub description: Option<String>,
    /// `AssemblyConfiguration`
    pub configuration: Option<String>,
    /// `AssemblyCompany`
    pub company: Option<String>,
    /// `AssemblyProduct`
    pub product: Option<String>,
    /// `AssemblyCopyright`
    pub copyright: Option<String>,
    /// `AssemblyTrademark`
    pub trademark: Option<String>,
    /// `AssemblyKeyFile`
    pub key_file: Option<String>,
    /// `AssemblyKeyName`
    pub key_name: Option<String>,
    /// `AssemblyDelaySign`
    pub delay_sign: Option<bool>,
    /// `AssemblySignatureKey` public key
    pub signature_key: Option<String>,
    /// Friend assembly names from `InternalsVisibleTo`
    pub friends: Vec<String>,
    /// Source supplied `CompilationRelaxations`
    pub has_compilation_relaxations: bool,
    /// Source supplied `RuntimeCompatibility`
    pub has_runtime_compatibility: bool,
}

impl AssemblyWellKnownData {
    /// The effective hash algorithm: `AssemblyAlgorithmId` or SHA1.
    #[must_use]
    pub fn hash_algorithm(&self) -> u32 {
        self.algorithm_id.unwrap_or(AssemblyHashAlgorithm::SHA1)
    }

    /// The culture as a lossy UTF-8 string, empty when neutral.
    #[must_use]
    pub fn culture_lossy(&self) -> String {
        self.culture
            .as_ref()
            .map(|culture| culture.to_string_lossy())
            .unwrap_or_default()
    }

    /// Fill every field `self` has not set from `other`; flags are combined.
    pub fn fill_from(&mut self, other: &AssemblyWellKnownData) {
        fn fill<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
            if target.is_none() {
                target.clone_from(source);
            }
        }

        if self.version.is_none() {
            self.version = other.version;
            self.version_has_wildcard = other.version_has_wildcard;
        }
        fill(&mut self.file_version, &other.file_version);
        fill(&mut self.informational_version, &other.informational_version);
        fill(&mut self.satellite_contract_version, &other.satellite_contract_version);
        fill(&mut self.culture, &other.culture);
        fill(&mut self.algorithm_id, &other.algorithm_id);
        fill(&mut self.title, &other.title);
        fill(&mut self.description, &other.description);
        fill(&mut self.configuration, &other.configuration);
        fill(&mut self.company, &other.company);
        fill(&mut self.product, &other.product);
        fill(&mut self.copyright, &other.copyright);
        fill(&mut self.trademark, &other.trademark);
        fill(&mut self.key_file, &other.key_file);
        fill(&mut self.key_name, &other.key_name);
        fill(&mut self.delay_sign, &other.delay_sign);
        fill(&mut self.signature_key, &other.signature_key);
        self.flags = match (self.flags, other.flags) {
            (Some(a), Some(b)) => Some(a | b),
            (a, b) => a.or(b),
        };
        for friend in &other.friends {
            if !self.friends.contains(friend) {
                self.friends.push(friend.clone());
            }
        }
        self.has_compilation_relaxations |= other.has_compilation_relaxations;
        self.has_runtime_compatibility |= other.has_runtime_compatibility;
    }
}

/// Everything the decoder learned from the attributes of one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WellKnownData {
    /// Assembly-level data; only filled for the assembly
    pub assembly: AssemblyWellKnownData,
    /// `AttributeUsage` written on an attribute class
    pub usage: Option<AttributeUsageInfo>,
    /// `Obsolete`
    pub obsolete: Option<ObsoleteData>,
    /// Caller-info markers on a parameter
    pub caller_info: CallerInfoData,
    /// `CompilerGenerated` present
    pub compiler_generated: bool,
    /// `Embedded` present
    pub embedded: bool,
}

/// The decoded payload returned for one well-known attribute kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WellKnownValue {
    /// A parsed version
    Version(Version),
    /// Free text (informational version, file version, title, ...)
    Text(String),
    /// Culture code units, empty when neutral
    Culture(U16String),
    /// A raw 32-bit value (algorithm id, flags)
    Raw(u32),
    /// A boolean (delay sign)
    Bool(bool),
    /// Friend assembly names
    Friends(Vec<String>),
    /// The active caller-info substitution
    CallerInfo(CallerInfoKind),
    /// `AttributeUsage`
    Usage(AttributeUsageInfo),
    /// `Obsolete`
    Obsolete(ObsoleteData),
    /// A marker attribute with no payload is present
    Present,
}

impl WellKnownData {
    /// The decoded payload of `kind`, if the symbol carried a valid instance.
    #[must_use]
    pub fn value(&self, kind: WellKnownAttributeKind) -> Option<WellKnownValue> {
        let assembly = &self.assembly;
        let text = |value: &Option<String>| value.clone().map(WellKnownValue::Text);
        match kind {
            WellKnownAttributeKind::AssemblyVersion => assembly.version.map(WellKnownValue::Version),
            WellKnownAttributeKind::SatelliteContractVersion => {
                assembly.satellite_contract_version.map(WellKnownValue::Version)
            }
            WellKnownAttributeKind::AssemblyFileVersion => text(&assembly.file_version),
            WellKnownAttributeKind::AssemblyInformationalVersion => {
                text(&assembly.informational_version)
            }
            WellKnownAttributeKind::AssemblyCulture => {
                assembly.culture.clone().map(WellKnownValue::Culture)
            }
            WellKnownAttributeKind::AssemblyAlgorithmId => {
                assembly.algorithm_id.map(WellKnownValue::Raw)
            }
            WellKnownAttributeKind::AssemblyFlags => assembly.flags.map(WellKnownValue::Raw),
            WellKnownAttributeKind::AssemblyTitle => text(&assembly.title),
            WellKnownAttributeKind::AssemblyDescription => text(&assembly.description),
            WellKnownAttributeKind::AssemblyConfiguration => text(&assembly.configuration),
            WellKnownAttributeKind::AssemblyCompany => text(&assembly.company),
            WellKnownAttributeKind::AssemblyProduct => text(&assembly.product),
            WellKnownAttributeKind::AssemblyCopyright => text(&assembly.copyright),
            WellKnownAttributeKind::AssemblyTrademark => text(&assembly.trademark),
            WellKnownAttributeKind::AssemblyKeyFile => text(&assembly.key_file),
            WellKnownAttributeKind::AssemblyKeyName => text(&assembly.key_name),
            WellKnownAttributeKind::AssemblySignatureKey => text(&assembly.signature_key),
            WellKnownAttributeKind::AssemblyDelaySign => assembly.delay_sign.map(WellKnownValue::Bool),
            WellKnownAttributeKind::InternalsVisibleTo => (!assembly.friends.is_empty())
                .then(|| WellKnownValue::Friends(assembly.friends.clone())),
            WellKnownAttributeKind::CallerLineNumber
            | WellKnownAttributeKind::CallerFilePath
            | WellKnownAttributeKind::CallerMemberName => self
                .caller_info
                .active
                .filter(|active| Some(*active) == kind.caller_info())
                .map(WellKnownValue::CallerInfo),
            WellKnownAttributeKind::AttributeUsage => self.usage.map(WellKnownValue::Usage),
            WellKnownAttributeKind::Obsolete => self.obsolete.clone().map(WellKnownValue::Obsolete),
            WellKnownAttributeKind::CompilerGenerated => {
                self.compiler_generated.then_some(WellKnownValue::Present)
            }
            WellKnownAttributeKind::Embedded => self.embedded.then_some(WellKnownValue::Present),
            WellKnownAttributeKind::CompilationRelaxations => assembly
                .has_compilation_relaxations
                .then_some(WellKnownValue::Present),
            WellKnownAttributeKind::RuntimeCompatibility => assembly
                .has_runtime_compatibility
                .then_some(WellKnownValue::Present),
            WellKnownAttributeKind::Dynamic
            | WellKnownAttributeKind::IsReadOnly
            | WellKnownAttributeKind::IsByRefLike
            | WellKnownAttributeKind::IsUnmanaged => None,
        }
    }
}
