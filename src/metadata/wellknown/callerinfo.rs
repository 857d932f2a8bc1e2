//! Validation and precedence of caller-info parameters.
//!
//! A parameter may carry any combination of `[CallerLineNumber]`, `[CallerFilePath]` and
//! `[CallerMemberName]`. Each marker is checked in this order, and the first failing check
//! is the only one reported for it:
//! 1. the member is used where optional arguments are never omitted (operators,
//!    conversions, explicit interface implementations, partial implementations): warning
//! 2. no standard implicit conversion from `int` (line) or `string` (file, member) to the
//!    parameter type: error
//! 3. the parameter has no default value: error
//! 4. a higher-precedence marker is also present: warning naming the marker that wins
//!
//! Precedence is line number over file path over member name. The highest marker present
//! is the active substitution, provided it passed checks 1 to 3.

use crate::metadata::{
    binder::Conversions,
    diagnostics::{Diagnostic, DiagnosticCode},
    symbols::{SymbolId, SymbolTable},
    syntax::Location,
    typesystem::TypeSig,
    wellknown::{CallerInfoData, CallerInfoKind},
};

/// One caller-info marker applied to a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerInfoMarker {
    /// Which marker
    pub kind: CallerInfoKind,
    /// Position of the usage
    pub location: Location,
}

enum Check {
    Valid,
    Unconsumed,
    Invalid,
}

/// Check the markers applied to `parameter` and compute the active substitution.
///
/// Diagnostics are appended to `diagnostics` when given; the early pass that only needs the
/// active kind passes `None`.
pub fn check_caller_info(
    table: &SymbolTable,
    parameter: SymbolId,
    markers: &[CallerInfoMarker],
    mut diagnostics: Option<&mut Vec<Diagnostic>>,
) -> CallerInfoData {
    let mut data = CallerInfoData::default();
    for marker in markers {
        data.mark(marker.kind);
    }
    let Some(symbol) = table.get(parameter).ok() else {
        return data;
    };
    let Some(parameter_data) = symbol.as_parameter() else {
        return data;
    };

    let unconsumed = table
        .containing_method(parameter)
        .and_then(|m| table.get(m).ok())
        .and_then(|m| m.as_method())
        .is_some_and(|m| m.kind.never_omits_arguments());
    let conversions = Conversions::new(table);
    let name = symbol.name.clone();
    let ty = &parameter_data.ty;

    let mut valid = Vec::new();
    for marker in markers {
        let mut report = |code: DiagnosticCode, arguments: Vec<String>| {
            if let Some(sink) = diagnostics.as_deref_mut() {
                sink.push(Diagnostic::new(code, marker.location.clone(), arguments));
            }
        };

        let check = if unconsumed {
            let code = match marker.kind {
                CallerInfoKind::LineNumber => {
                    DiagnosticCode::WrnCallerLineNumberParamForUnconsumedLocation
                }
                CallerInfoKind::FilePath => {
                    DiagnosticCode::WrnCallerFilePathParamForUnconsumedLocation
                }
                CallerInfoKind::MemberName => {
                    DiagnosticCode::WrnCallerMemberNameParamForUnconsumedLocation
                }
            };
            report(code, vec![name.clone()]);
            Check::Unconsumed
        } else if !converts(&conversions, marker.kind, ty) {
            let (code, from) = match marker.kind {
                CallerInfoKind::LineNumber => {
                    (DiagnosticCode::ErrNoConversionForCallerLineNumberParam, "int")
                }
                CallerInfoKind::FilePath => {
                    (DiagnosticCode::ErrNoConversionForCallerFilePathParam, "string")
                }
                CallerInfoKind::MemberName => {
                    (DiagnosticCode::ErrNoConversionForCallerMemberNameParam, "string")
                }
            };
            report(code, vec![from.to_string(), table.display_type(ty)]);
            Check::Invalid
        } else if parameter_data.default_value.is_none() {
            let code = match marker.kind {
                CallerInfoKind::LineNumber => {
                    DiagnosticCode::ErrBadCallerLineNumberParamWithoutDefaultValue
                }
                CallerInfoKind::FilePath => {
                    DiagnosticCode::ErrBadCallerFilePathParamWithoutDefaultValue
                }
                CallerInfoKind::MemberName => {
                    DiagnosticCode::ErrBadCallerMemberNameParamWithoutDefaultValue
                }
            };
            report(code, Vec::new());
            Check::Invalid
        } else {
            match marker.kind {
                CallerInfoKind::FilePath if data.line_number => report(
                    DiagnosticCode::WrnCallerLineNumberPreferredOverCallerFilePath,
                    vec![name.clone()],
                ),
                CallerInfoKind::MemberName if data.line_number => report(
                    DiagnosticCode::WrnCallerLineNumberPreferredOverCallerMemberName,
                    vec![name.clone()],
                ),
                CallerInfoKind::MemberName if data.file_path => report(
                    DiagnosticCode::WrnCallerFilePathPreferredOverCallerMemberName,
                    vec![name.clone()],
                ),
                _ => {}
            }
            Check::Valid
        };
        if matches!(check, Check::Valid) {
            valid.push(marker.kind);
        }
    }

    let highest = [
        CallerInfoKind::LineNumber,
        CallerInfoKind::FilePath,
        CallerInfoKind::MemberName,
    ]
    .into_iter()
    .find(|kind| data.has(*kind));
    data.active = highest.filter(|kind| valid.contains(kind));
    data
}

fn converts(conversions: &Conversions<'_>, kind: CallerInfoKind, ty: &TypeSig) -> bool {
    let from = match kind {
        CallerInfoKind::LineNumber => TypeSig::int(),
        CallerInfoKind::FilePath | CallerInfoKind::MemberName => TypeSig::String,
    };
    conversions.standard_implicit(&from, ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        customattributes::ConstantValue,
        symbols::{MethodDecl, MethodKind, ParameterDecl, SymbolTableBuilder, TypeDecl},
        typesystem::PrimitiveType,
    };

    fn parameter(
        ty: TypeSig,
        default: Option<ConstantValue>,
        kind: MethodKind,
    ) -> (SymbolTable, SymbolId) {
        let mut builder = SymbolTableBuilder::new("App", "App.dll");
        let object = builder.add_type(None, TypeDecl::class("System", "Object")).unwrap();
        builder
            .add_type(None, TypeDecl::class("System", "String").base(TypeSig::named(object)))
            .unwrap();
        let c = builder.add_type(None, TypeDecl::class("N", "C")).unwrap();
        let mut decl = ParameterDecl::new("p", ty);
        if let Some(value) = default {
            decl = decl.default(value);
        }
        let m = builder
            .add_method(c, MethodDecl::new("M").kind(kind).parameter(decl))
            .unwrap();
        let table = builder.build();
        let p = table.parameters(m)[0];
        (table, p)
    }

    fn markers(kinds: &[CallerInfoKind]) -> Vec<CallerInfoMarker> {
        kinds
            .iter()
            .map(|kind| CallerInfoMarker {
                kind: *kind,
                location: Location::source("a.cs", 3, 10),
            })
            .collect()
    }

    #[test]
    fn line_number_wins_over_file_path() {
        let (table, p) = parameter(TypeSig::Object, Some(ConstantValue::Null), MethodKind::Ordinary);
        let mut diagnostics = Vec::new();
        let data = check_caller_info(
            &table,
            p,
            &markers(&[CallerInfoKind::LineNumber, CallerInfoKind::FilePath]),
            Some(&mut diagnostics),
        );
        assert_eq!(data.active, Some(CallerInfoKind::LineNumber));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::WrnCallerLineNumberPreferredOverCallerFilePath);
        assert_eq!(diagnostics[0].arguments, vec!["p"]);
    }

    #[test]
    fn string_parameter_rejects_line_number() {
        let (table, p) = parameter(TypeSig::String, Some(ConstantValue::Null), MethodKind::Ordinary);
        let mut diagnostics = Vec::new();
        let data = check_caller_info(
            &table,
            p,
            &markers(&[CallerInfoKind::LineNumber, CallerInfoKind::FilePath]),
            Some(&mut diagnostics),
        );
        let codes: Vec<_> = diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![
                DiagnosticCode::ErrNoConversionForCallerLineNumberParam,
                DiagnosticCode::WrnCallerLineNumberPreferredOverCallerFilePath,
            ]
        );
        assert_eq!(diagnostics[0].arguments, vec!["int", "string"]);
        assert_eq!(data.active, None);
    }

    #[test]
    fn unconsumed_locations_only_warn() {
        let (table, p) = parameter(TypeSig::int(), None, MethodKind::Operator);
        let mut diagnostics = Vec::new();
        let data = check_caller_info(
            &table,
            p,
            &markers(&[CallerInfoKind::LineNumber]),
            Some(&mut diagnostics),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::WrnCallerLineNumberParamForUnconsumedLocation);
        assert_eq!(data.active, None);
    }

    #[test]
    fn missing_default_is_an_error() {
        let long = TypeSig::Primitive(PrimitiveType::Int64);
        let (table, p) = parameter(long, None, MethodKind::Ordinary);
        let mut diagnostics = Vec::new();
        check_caller_info(&table, p, &markers(&[CallerInfoKind::LineNumber]), Some(&mut diagnostics));
        assert_eq!(diagnostics[0].code, DiagnosticCode::ErrBadCallerLineNumberParamWithoutDefaultValue);
    }

    #[test]
    fn member_name_alone_is_active() {
        let (table, p) = parameter(TypeSig::String, Some(ConstantValue::Null), MethodKind::Ordinary);
        let data = check_caller_info(&table, p, &markers(&[CallerInfoKind::MemberName]), None);
        assert_eq!(data.active, Some(CallerInfoKind::MemberName));
        assert!(data.member_name && !data.file_path);
    }
}
