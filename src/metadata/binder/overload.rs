//! Attribute constructor overload resolution.
//!
//! A constructor is applicable when it has at least as many parameters as there are
//! positional arguments, every parameter past the last argument is optional, and every
//! argument converts to its parameter. Among several applicable constructors the one whose
//! conversions are all at least as good, and one strictly better, wins. A remaining tie is
//! broken in favor of a constructor that needs no default values.

use crate::metadata::{
    binder::{
        conversions::{ConversionKind, Conversions},
        evaluator::EvaluatedArgument,
    },
    diagnostics::{Diagnostic, DiagnosticCode},
    symbols::{SymbolId, SymbolTable},
    syntax::Location,
    typesystem::TypeSig,
};

/// A constructor that accepts the arguments.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub constructor: SymbolId,
    pub parameters: Vec<SymbolId>,
    pub parameter_types: Vec<TypeSig>,
    conversions: Vec<ConversionKind>,
    uses_defaults: bool,
}

struct Parameter {
    id: SymbolId,
    ty: TypeSig,
    optional: bool,
}

fn parameters_of(table: &SymbolTable, constructor: SymbolId) -> Vec<Parameter> {
    table
        .parameters(constructor)
        .iter()
        .filter_map(|p| {
            let symbol = table.get(*p).ok()?;
            let data = symbol.as_parameter()?;
            Some(Parameter {
                id: *p,
                ty: data.ty.clone(),
                optional: data.default_value.is_some(),
            })
        })
        .collect()
}

/// Pick the constructor of `class` that `arguments` bind to.
///
/// The error is the single diagnostic describing why no constructor was chosen.
pub(crate) fn resolve_constructor(
    table: &SymbolTable,
    conversions: &Conversions<'_>,
    class: SymbolId,
    arguments: &[EvaluatedArgument],
    location: &Location,
) -> Result<Candidate, Diagnostic> {
    let constructors = table.constructors(class);
    let count = arguments.len();

    let shaped: Vec<(SymbolId, Vec<Parameter>)> = constructors
        .iter()
        .map(|c| (*c, parameters_of(table, *c)))
        .collect();
    let arity_compatible: Vec<&(SymbolId, Vec<Parameter>)> = shaped
        .iter()
        .filter(|(_, params)| params.len() >= count && params[count..].iter().all(|p| p.optional))
        .collect();

    if arity_compatible.is_empty() {
        if let [(constructor, params)] = shaped.as_slice() {
            if count < params.len() {
                let missing = params[count..]
                    .iter()
                    .find(|p| !p.optional)
                    .and_then(|p| table.get(p.id).ok())
                    .map(|s| s.name.clone())
                    .unwrap_or_default();
                return Err(Diagnostic::new(
                    DiagnosticCode::ErrNoCorrespondingArgument,
                    location.clone(),
                    vec![missing, table.method_display(*constructor)],
                ));
            }
        }
        return Err(Diagnostic::new(
            DiagnosticCode::ErrBadCtorArgCount,
            location.clone(),
            vec![table.display_type(&TypeSig::named(class)), count.to_string()],
        ));
    }

    let mut applicable = Vec::new();
    for (constructor, params) in &arity_compatible {
        let kinds: Option<Vec<ConversionKind>> = arguments
            .iter()
            .zip(params.iter())
            .map(|(argument, parameter)| conversions.classify(argument, &parameter.ty))
            .collect();
        if let Some(kinds) = kinds {
            applicable.push(Candidate {
                constructor: *constructor,
                parameters: params.iter().map(|p| p.id).collect(),
                parameter_types: params.iter().map(|p| p.ty.clone()).collect(),
                conversions: kinds,
                uses_defaults: params.len() > count,
            });
        }
    }

    if applicable.is_empty() {
        let (_, params) = arity_compatible[0];
        let failing = arguments
            .iter()
            .zip(params.iter())
            .position(|(argument, parameter)| conversions.classify(argument, &parameter.ty).is_none())
            .unwrap_or(0);
        let argument_type = arguments
            .get(failing)
            .map_or_else(|| "<null>".to_string(), |a| a.display_type(table));
        let parameter_type = params
            .get(failing)
            .map(|p| table.display_type(&p.ty))
            .unwrap_or_default();
        return Err(Diagnostic::new(
            DiagnosticCode::ErrBadArgType,
            location.clone(),
            vec![(failing + 1).to_string(), argument_type, parameter_type],
        ));
    }

    select_best(table, conversions, applicable, arguments, location)
}

fn select_best(
    table: &SymbolTable,
    conversions: &Conversions<'_>,
    applicable: Vec<Candidate>,
    arguments: &[EvaluatedArgument],
    location: &Location,
) -> Result<Candidate, Diagnostic> {
    if let [only] = applicable.as_slice() {
        return Ok(only.clone());
    }

    let best: Vec<&Candidate> = applicable
        .iter()
        .filter(|candidate| {
            !applicable
                .iter()
                .any(|other| is_better(conversions, other, candidate, arguments.len()))
        })
        .collect();

    let chosen = match best.as_slice() {
        [only] => Some(*only),
        _ => {
            let without_defaults: Vec<&&Candidate> =
                best.iter().filter(|c| !c.uses_defaults).collect();
            match without_defaults.as_slice() {
                [only] => Some(**only),
                _ => None,
            }
        }
    };

    if let Some(candidate) = chosen {
        return Ok(candidate.clone());
    }
    let first = best.first().copied().unwrap_or(&applicable[0]);
    let second = best.get(1).copied().unwrap_or(&applicable[1]);
    Err(Diagnostic::new(
        DiagnosticCode::ErrAmbigCall,
        location.clone(),
        vec![
            table.method_display(first.constructor),
            table.method_display(second.constructor),
        ],
    ))
}

/// Whether `a` is a better function member than `b` for the first `count` arguments.
fn is_better(conversions: &Conversions<'_>, a: &Candidate, b: &Candidate, count: usize) -> bool {
    let mut strictly = false;
    for index in 0..count {
        match compare(conversions, a, b, index) {
            Ordering::Worse => return false,
            Ordering::Better => strictly = true,
            Ordering::Same => {}
        }
    }
    strictly
}

enum Ordering {
    Better,
    Same,
    Worse,
}

fn compare(conversions: &Conversions<'_>, a: &Candidate, b: &Candidate, index: usize) -> Ordering {
    let (ta, tb) = (&a.parameter_types[index], &b.parameter_types[index]);
    if conversions.is_identity(ta, tb) {
        return Ordering::Same;
    }
    let (ka, kb) = (a.conversions[index], b.conversions[index]);
    match (ka.is_identity(), kb.is_identity()) {
        (true, false) => return Ordering::Better,
        (false, true) => return Ordering::Worse,
        _ => {}
    }
    if conversions.is_better_target(ta, tb) {
        Ordering::Better
    } else if conversions.is_better_target(tb, ta) {
        Ordering::Worse
    } else {
        Ordering::Same
    }
}
