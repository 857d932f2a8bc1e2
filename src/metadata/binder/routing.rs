//! `target:` specifiers and where the attribute ends up.
//!
//! Most specifiers select the declaration itself. A few move the attribute to a related
//! symbol instead:
//!
//! | Declaration | Specifier | Target |
//! |---|---|---|
//! | method | `return` | its return value |
//! | delegate | `return` | the return value of `Invoke` |
//! | setter, `add`, `remove` | `param` | the implicit `value` parameter |
//! | field-like event | `field` | the backing field |
//! | field-like event | `method` | both accessors |

use std::str::FromStr;

use crate::{
    metadata::{
        diagnostics::{Diagnostic, DiagnosticCode},
        symbols::{
            applicable_locations, default_location, AttributeLocation, SymbolData, SymbolId,
            SymbolTable,
        },
        syntax::Location,
    },
    Error, Result,
};

/// A usage whose specifier was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedTarget {
    /// The resolved location
    pub location: AttributeLocation,
    /// Symbols that receive the attribute
    pub targets: Vec<SymbolId>,
}

/// The outcome of checking a `target:` specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routing {
    /// The usage applies to `targets`
    Routed(RoutedTarget),
    /// The specifier is invalid for the declaration; the usage is kept but never emitted
    Ignored {
        /// The declaration's default location
        location: AttributeLocation,
        /// The location warning to report
        diagnostic: Diagnostic,
    },
}

/// Check the specifier `keyword` written on the declaration of `declared_on` and find the
/// symbols the usage applies to.
///
/// # Errors
/// Returns [`crate::Error::SymbolNotFound`] if `declared_on` is not in `table`.
pub fn route(
    table: &SymbolTable,
    declared_on: SymbolId,
    keyword: Option<&str>,
    location: &Location,
) -> Result<Routing> {
    let symbol = table.get(declared_on)?;
    let default = default_location(symbol);
    let Some(keyword) = keyword else {
        return Ok(Routing::Routed(RoutedTarget {
            location: default,
            targets: vec![declared_on],
        }));
    };

    let valid = applicable_locations(symbol);
    let requested = match AttributeLocation::from_str(keyword) {
        Ok(requested) => requested,
        Err(_) => {
            return Ok(Routing::Ignored {
                location: default,
                diagnostic: Diagnostic::new(
                    DiagnosticCode::WrnInvalidAttributeLocation,
                    location.clone(),
                    vec![keyword.to_string(), valid.to_string()],
                ),
            })
        }
    };
    if !valid.allows(requested) {
        return Ok(Routing::Ignored {
            location: default,
            diagnostic: Diagnostic::new(
                DiagnosticCode::WrnAttributeLocationOnBadDeclaration,
                location.clone(),
                vec![keyword.to_string(), valid.to_string()],
            ),
        });
    }

    let targets = match (&symbol.data, requested) {
        (SymbolData::Method(method), AttributeLocation::Return) => vec![method.return_value],
        (SymbolData::Type(ty), AttributeLocation::Return) => {
            let invoke = ty.invoke.ok_or_else(|| {
                Error::InvalidDeclaration(format!("delegate {} has no Invoke", symbol.name))
            })?;
            let method = table.get(invoke)?.as_method().ok_or(Error::SymbolNotFound(invoke))?;
            vec![method.return_value]
        }
        (SymbolData::Method(method), AttributeLocation::Parameter) => {
            let last = method.parameters.last().copied().ok_or_else(|| {
                Error::InvalidDeclaration(format!("accessor {} has no value parameter", symbol.name))
            })?;
            vec![last]
        }
        (SymbolData::Event(event), AttributeLocation::Field) => {
            vec![event.backing_field.ok_or(Error::SymbolNotFound(declared_on))?]
        }
        (SymbolData::Event(event), AttributeLocation::Method) => vec![event.adder, event.remover],
        _ => vec![declared_on],
    };

    Ok(Routing::Routed(RoutedTarget {
        location: requested,
        targets,
    }))
}
