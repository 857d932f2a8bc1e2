//! Decoding of well-known attributes into [`WellKnownData`].
//!
//! The decoder runs once per symbol over that symbol's bound attributes, after binding.
//! Usages that failed to bind or sit in an ignored `target:` block are skipped. Validation
//! failures are reported as diagnostics and leave the corresponding field unset; the
//! attribute itself stays in the symbol's attribute list.

use std::borrow::Cow;

use widestring::U16String;

use crate::{
    compilation::CompilationOptions,
    metadata::{
        binder::BoundAttribute,
        customattributes::CustomAttributeValue,
        diagnostics::{Diagnostic, DiagnosticCode},
        symbols::{AttributeTargets, ObsoleteData, SymbolId, SymbolKind, SymbolTable},
        syntax::Location,
        wellknown::{
            callerinfo::{check_caller_info, CallerInfoMarker},
            parse_version, AssemblyWellKnownData, AttributeUsageInfo, VersionKind,
            WellKnownAttributeKind, WellKnownData,
        },
    },
};

/// Keys an `InternalsVisibleTo` name may not specify.
const FORBIDDEN_FRIEND_KEYS: [&str; 5] = [
    "version",
    "culture",
    "publickeytoken",
    "processorarchitecture",
    "retargetable",
];

/// Decode `AttributeUsage(validOn, AllowMultiple = .., Inherited = ..)`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn decode_usage(value: &CustomAttributeValue) -> AttributeUsageInfo {
    let mut usage = AttributeUsageInfo::default();
    if let Some(bits) = value.fixed_args.first().and_then(|arg| arg.as_integer()) {
        usage.valid_on = AttributeTargets::from_bits_truncate(bits as u32);
    }
    if let Some(allow_multiple) = value.named("AllowMultiple").and_then(|arg| arg.as_bool()) {
        usage.allow_multiple = allow_multiple;
    }
    if let Some(inherited) = value.named("Inherited").and_then(|arg| arg.as_bool()) {
        usage.inherited = inherited;
    }
    usage
}

/// Decode `Obsolete()`, `Obsolete(message)` or `Obsolete(message, error)`.
#[must_use]
pub fn decode_obsolete(value: &CustomAttributeValue) -> ObsoleteData {
    ObsoleteData {
        message: value
            .fixed_args
            .first()
            .and_then(|arg| arg.constant())
            .and_then(|c| c.as_string_lossy())
            .map(Cow::into_owned),
        is_error: value
            .fixed_args
            .get(1)
            .and_then(|arg| arg.as_bool())
            .unwrap_or(false),
    }
}

enum FriendName {
    Valid(String),
    ForbiddenKey,
    Invalid,
}

fn parse_friend_name(text: &str) -> FriendName {
    let mut parts = text.split(',');
    let name = parts.next().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return FriendName::Invalid;
    }

    let mut forbidden = false;
    for part in parts {
        let Some((key, _)) = part.split_once('=') else {
            return FriendName::Invalid;
        };
        let key = key.trim().to_ascii_lowercase();
        if FORBIDDEN_FRIEND_KEYS.contains(&key.as_str()) {
            forbidden = true;
        } else if key != "publickey" {
            return FriendName::Invalid;
        }
    }
    if forbidden {
        FriendName::ForbiddenKey
    } else {
        FriendName::Valid(name.to_string())
    }
}

/// Well-known attribute decoding for one compilation.
pub struct WellKnownDecoder<'a> {
    table: &'a SymbolTable,
    options: &'a CompilationOptions,
}

impl<'a> WellKnownDecoder<'a> {
    /// A decoder applying the rules of `options`.
    #[must_use]
    pub fn new(table: &'a SymbolTable, options: &'a CompilationOptions) -> Self {
        WellKnownDecoder { table, options }
    }

    /// Decode the attributes bound on `owner`.
    pub fn decode(
        &self,
        owner: SymbolId,
        attributes: &[BoundAttribute],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> WellKnownData {
        let mut data = WellKnownData::default();
        let mut markers = Vec::new();

        for attribute in attributes {
            if attribute.has_errors || attribute.ignored_location {
                continue;
            }
            let Some(kind) = attribute.well_known else {
                continue;
            };
            if let Some(marker) = kind.caller_info() {
                markers.push(CallerInfoMarker {
                    kind: marker,
                    location: attribute.location.clone(),
                });
                continue;
            }
            self.decode_one(kind, attribute, &mut data, diagnostics);
        }

        let is_parameter = self
            .table
            .get(owner)
            .is_ok_and(|s| s.kind() == SymbolKind::Parameter);
        if is_parameter && !markers.is_empty() {
            data.caller_info = check_caller_info(self.table, owner, &markers, Some(diagnostics));
        }
        data
    }

    fn decode_one(
        &self,
        kind: WellKnownAttributeKind,
        attribute: &BoundAttribute,
        data: &mut WellKnownData,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let text = || -> Option<String> {
            attribute
                .fixed(0)
                .and_then(|arg| arg.constant())
                .and_then(|c| c.as_string_lossy())
                .map(Cow::into_owned)
        };
        let report = |diagnostics: &mut Vec<Diagnostic>, code: DiagnosticCode, arguments: Vec<String>| {
            diagnostics.push(Diagnostic::new(code, attribute.location.clone(), arguments));
        };
        let assembly = &mut data.assembly;

        match kind {
            WellKnownAttributeKind::AssemblyVersion => {
                let value = text().unwrap_or_default();
                match parse_version(&value, VersionKind::Assembly, self.options.build_time) {
                    None => report(diagnostics, DiagnosticCode::ErrInvalidVersionFormat, vec![value]),
                    Some(parsed) => {
                        if parsed.has_wildcard && self.options.deterministic {
                            report(
                                diagnostics,
                                DiagnosticCode::ErrInvalidVersionFormatDeterministic,
                                vec![value],
                            );
                        } else {
                            assembly.version = Some(parsed.version);
                            assembly.version_has_wildcard = parsed.has_wildcard;
                        }
                    }
                }
            }
            WellKnownAttributeKind::AssemblyFileVersion => {
                let value = text().unwrap_or_default();
                if parse_version(&value, VersionKind::File, self.options.build_time).is_none() {
                    report(diagnostics, DiagnosticCode::WrnInvalidVersionFormat, vec![value.clone()]);
                }
                assembly.file_version = Some(value);
            }
            WellKnownAttributeKind::SatelliteContractVersion => {
                let value = text().unwrap_or_default();
                match parse_version(&value, VersionKind::SatelliteContract, self.options.build_time) {
                    Some(parsed) if !parsed.has_wildcard => {
                        assembly.satellite_contract_version = Some(parsed.version);
                    }
                    _ => report(diagnostics, DiagnosticCode::ErrInvalidVersionFormat2, vec![value]),
                }
            }
            WellKnownAttributeKind::AssemblyInformationalVersion => {
                assembly.informational_version = text();
            }
            WellKnownAttributeKind::AssemblyCulture => {
                let units = attribute
                    .fixed(0)
                    .and_then(|arg| arg.constant())
                    .and_then(|c| c.to_utf16())
                    .unwrap_or_default();
                if units.contains(&0) {
                    report(diagnostics, DiagnosticCode::ErrInvalidAssemblyCulture, Vec::new());
                } else if !units.is_empty() && self.options.output_kind.is_executable() {
                    report(diagnostics, DiagnosticCode::ErrInvalidAssemblyCultureForExe, Vec::new());
                } else {
                    assembly.culture = Some(U16String::from_vec(units));
                }
            }
            WellKnownAttributeKind::AssemblyAlgorithmId => {
                if let Some(value) = attribute.fixed(0).and_then(|arg| arg.as_integer()) {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let raw = value as u32;
                    assembly.algorithm_id = Some(raw);
                }
            }
            WellKnownAttributeKind::AssemblyFlags => {
                if let Some(value) = attribute.fixed(0).and_then(|arg| arg.as_integer()) {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let raw = value as u32;
                    assembly.flags = Some(assembly.flags.unwrap_or(0) | raw);
                }
            }
            WellKnownAttributeKind::AssemblyTitle => assembly.title = text(),
            WellKnownAttributeKind::AssemblyDescription => assembly.description = text(),
            WellKnownAttributeKind::AssemblyConfiguration => assembly.configuration = text(),
            WellKnownAttributeKind::AssemblyCompany => assembly.company = text(),
            WellKnownAttributeKind::AssemblyProduct => assembly.product = text(),
            WellKnownAttributeKind::AssemblyCopyright => assembly.copyright = text(),
            WellKnownAttributeKind::AssemblyTrademark => assembly.trademark = text(),
            WellKnownAttributeKind::AssemblyKeyFile => assembly.key_file = text(),
            WellKnownAttributeKind::AssemblyKeyName => assembly.key_name = text(),
            WellKnownAttributeKind::AssemblySignatureKey => assembly.signature_key = text(),
            WellKnownAttributeKind::AssemblyDelaySign => {
                assembly.delay_sign = attribute.fixed(0).and_then(|arg| arg.as_bool());
            }
            WellKnownAttributeKind::InternalsVisibleTo => {
                let Some(value) = text() else {
                    report(diagnostics, DiagnosticCode::ErrCannotPassNullForFriendAssembly, Vec::new());
                    return;
                };
                match parse_friend_name(&value) {
                    FriendName::Valid(name) => {
                        if !assembly.friends.contains(&name) {
                            assembly.friends.push(name);
                        }
                    }
                    FriendName::ForbiddenKey => {
                        report(diagnostics, DiagnosticCode::ErrFriendAssemblyBadArgs, vec![value]);
                    }
                    FriendName::Invalid => {
                        report(diagnostics, DiagnosticCode::WrnInvalidAssemblyName, vec![value]);
                    }
                }
            }
            WellKnownAttributeKind::CompilationRelaxations => {
                assembly.has_compilation_relaxations = true;
            }
            WellKnownAttributeKind::RuntimeCompatibility => {
                assembly.has_runtime_compatibility = true;
            }
            WellKnownAttributeKind::AttributeUsage => data.usage = Some(decode_usage(&attribute.value)),
            WellKnownAttributeKind::Obsolete => data.obsolete = Some(decode_obsolete(&attribute.value)),
            WellKnownAttributeKind::CompilerGenerated => data.compiler_generated = true,
            WellKnownAttributeKind::Embedded => data.embedded = true,
            WellKnownAttributeKind::CallerLineNumber
            | WellKnownAttributeKind::CallerFilePath
            | WellKnownAttributeKind::CallerMemberName
            | WellKnownAttributeKind::Dynamic
            | WellKnownAttributeKind::IsReadOnly
            | WellKnownAttributeKind::IsByRefLike
            | WellKnownAttributeKind::IsUnmanaged => {}
        }
    }

    /// Warn about referenced assemblies whose culture differs from the one being built.
    ///
    /// Only references with a non-neutral culture are considered, and the comparison ignores
    /// case. Net-modules carry no identity of their own, so nothing is reported for them.
    pub fn check_reference_cultures(
        &self,
        assembly: &AssemblyWellKnownData,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        if self.options.output_kind.is_net_module() {
            return;
        }
        let ours = assembly.culture_lossy();
        for reference in self.table.references() {
            let Some(culture) = self
                .table
                .get(*reference)
                .ok()
                .and_then(|s| s.as_assembly())
                .map(|a| a.culture.clone())
            else {
                continue;
            };
            if culture.is_empty() || culture.eq_ignore_ascii_case(&ours) {
                continue;
            }
            diagnostics.push(Diagnostic::new(
                DiagnosticCode::WrnRefCultureMismatch,
                Location::none(),
                vec![self.table.assembly_display_name(*reference), culture],
            ));
        }
    }
}
