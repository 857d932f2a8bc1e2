//! Merging assembly-level attributes of linked net-modules.
//!
//! An assembly built from source plus pre-compiled net-modules emits a single set of
//! assembly attributes. The attributes of every module are checked against those already
//! accepted, walking the modules from last to first so that later modules override earlier
//! ones and source overrides all of them:
//!
//! - `AllowMultiple = true`: structurally identical instances collapse to one, also when
//!   both are written in source
//! - `AllowMultiple = false`, identical to an accepted instance: dropped silently
//! - `AllowMultiple = false`, different from a source instance: dropped with
//!   `WRN_AssemblyAttributeFromModuleIsOverridden`
//! - `AllowMultiple = false`, different from another module's instance: a well-known
//!   assembly attribute is overridden with the same warning; anything else is
//!   `ERR_DuplicateAttributeInNetModule`
//!
//! Every dropped instance is returned with `duplicate_suppressed` set.

use std::collections::HashSet;

use crate::metadata::{
    binder::BoundAttribute,
    customattributes::AttributeSignatureKey,
    diagnostics::{Diagnostic, DiagnosticCode},
    syntax::Location,
};

/// The assembly-level attributes read from one linked net-module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleAttributes {
    /// Module file name, used in diagnostics
    pub name: String,
    /// Attributes in metadata order
    pub attributes: Vec<BoundAttribute>,
}

/// The outcome of [`merge_assembly_attributes`].
#[derive(Debug, Clone, Default)]
pub struct MergeResult {
    /// Surviving source attributes followed by the surviving module attributes, in module
    /// order
    pub attributes: Vec<BoundAttribute>,
    /// Instances dropped as duplicates or overridden: source duplicates first, then module
    /// attributes in module order
    pub suppressed: Vec<BoundAttribute>,
    /// Warnings and errors reported while merging
    pub diagnostics: Vec<Diagnostic>,
}

impl MergeResult {
    /// Number of attribute instances that did not survive.
    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.suppressed.len()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Origin {
    Source,
    Module,
}

struct Accepted {
    class_name: String,
    key: AttributeSignatureKey,
    origin: Origin,
}

/// Merge the assembly attributes of `modules` into those of `source`.
///
/// `allow_multiple` reports the `AllowMultiple` setting of an attribute's class.
pub fn merge_assembly_attributes<F>(
    source: &[BoundAttribute],
    modules: &[ModuleAttributes],
    allow_multiple: F,
) -> MergeResult
where
    F: Fn(&BoundAttribute) -> bool,
{
    let mut result = MergeResult::default();
    let mut source_duplicates = Vec::new();

    let mut accepted: Vec<Accepted> = Vec::new();
    let mut keys: HashSet<AttributeSignatureKey> = HashSet::new();
    for attribute in source {
        if attribute.has_errors {
            result.attributes.push(attribute.clone());
            continue;
        }
        let key = attribute.signature_key();
        if !keys.insert(key.clone()) && allow_multiple(attribute) {
            source_duplicates.push(BoundAttribute {
                duplicate_suppressed: true,
                ..attribute.clone()
            });
            continue;
        }
        result.attributes.push(attribute.clone());
        accepted.push(Accepted {
            class_name: attribute.class_name.clone(),
            key,
            origin: Origin::Source,
        });
    }
    let from_source = result.attributes.len();

    let flattened: Vec<(usize, usize, &BoundAttribute)> = modules
        .iter()
        .enumerate()
        .flat_map(|(module, m)| {
            m.attributes
                .iter()
                .enumerate()
                .map(move |(index, attribute)| (module, index, attribute))
        })
        .collect();

    let mut survivors: Vec<(usize, usize, BoundAttribute)> = Vec::new();
    for (module, index, attribute) in flattened.into_iter().rev() {
        if attribute.has_errors {
            continue;
        }
        let module_name = &modules[module].name;
        let key = attribute.signature_key();

        let keep = if allow_multiple(attribute) {
            keys.insert(key.clone())
        } else {
            let same_class: Vec<&Accepted> = accepted
                .iter()
                .filter(|a| a.class_name == attribute.class_name)
                .collect();
            if same_class.is_empty() {
                keys.insert(key.clone());
                true
            } else {
                let identical = same_class.iter().any(|a| a.key == key);
                let overridden_by_source = same_class.iter().any(|a| a.origin == Origin::Source);
                let well_known = attribute
                    .well_known
                    .is_some_and(|kind| kind.is_assembly_identity());
                if identical {
                    // dropped silently
                } else if overridden_by_source || well_known {
                    result.diagnostics.push(Diagnostic::new(
                        DiagnosticCode::WrnAssemblyAttributeFromModuleIsOverridden,
                        Location::module(module_name),
                        vec![attribute.class_name.clone(), module_name.clone()],
                    ));
                } else if keys.insert(key.clone()) {
                    let simple_name = attribute
                        .class_name
                        .rsplit_once('.')
                        .map_or(attribute.class_name.as_str(), |(_, name)| name);
                    result.diagnostics.push(Diagnostic::new(
                        DiagnosticCode::ErrDuplicateAttributeInNetModule,
                        Location::module(module_name),
                        vec![simple_name.to_string(), module_name.clone()],
                    ));
                }
                false
            }
        };

        if keep {
            accepted.push(Accepted {
                class_name: attribute.class_name.clone(),
                key,
                origin: Origin::Module,
            });
            survivors.push((module, index, attribute.clone()));
        } else {
            result.suppressed.push(BoundAttribute {
                duplicate_suppressed: true,
                ..attribute.clone()
            });
        }
    }

    survivors.sort_by_key(|(module, index, _)| (*module, *index));
    result
        .attributes
        .extend(survivors.into_iter().map(|(_, _, attribute)| attribute));
    result.suppressed.reverse();
    result.suppressed.splice(0..0, source_duplicates);
    log::debug!(
        "merged {} module attribute(s): {} kept, {} suppressed",
        modules.iter().map(|m| m.attributes.len()).sum::<usize>(),
        result.attributes.len() - from_source,
        result.suppressed.len()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        binder::{AttributeSource, ConstructorRef},
        customattributes::{CustomAttributeValue, SerType, TypedConstant},
        symbols::{AttributeLocation, SymbolId},
        wellknown::WellKnownAttributeKind,
    };

    fn attribute(class: &str, text: &str, source: AttributeSource) -> BoundAttribute {
        BoundAttribute {
            class_name: class.to_string(),
            class: None,
            constructor: ConstructorRef::External,
            constructor_params: vec![SerType::String],
            value: CustomAttributeValue {
                fixed_args: vec![TypedConstant::string(text)],
                named_args: Vec::new(),
            },
            owner: SymbolId::new(0),
            declared_on: SymbolId::new(0),
            location: Location::none(),
            target: AttributeLocation::Assembly,
            has_errors: false,
            ignored_location: false,
            duplicate_suppressed: false,
            source,
            well_known: WellKnownAttributeKind::from_full_name(class),
        }
    }

    const DESCRIPTION: &str = "System.Reflection.AssemblyDescriptionAttribute";
    const USER: &str = "N.UserAttribute";

    fn module(name: &str, index: usize, attributes: &[(&str, &str)]) -> ModuleAttributes {
        ModuleAttributes {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(class, text)| attribute(class, text, AttributeSource::NetModule(index)))
                .collect(),
        }
    }

    #[test]
    fn identical_module_attributes_collapse() {
        for k in 1..=4 {
            let modules: Vec<ModuleAttributes> = (0..k)
                .map(|i| module(&format!("m{i}.netmodule"), i + 1, &[(DESCRIPTION, "Module1")]))
                .collect();
            let result = merge_assembly_attributes(&[], &modules, |_| false);
            assert_eq!(result.attributes.len(), 1);
            assert_eq!(result.duplicates(), k - 1);
            assert!(result.diagnostics.is_empty());
            assert!(result.suppressed.iter().all(|a| a.duplicate_suppressed));
        }
    }

    #[test]
    fn source_overrides_module() {
        let source = [attribute(DESCRIPTION, "Module3", AttributeSource::Source)];
        let modules = [module("m1.netmodule", 1, &[(DESCRIPTION, "Module1")])];
        let result = merge_assembly_attributes(&source, &modules, |_| false);
        assert_eq!(result.attributes, source.to_vec());
        assert_eq!(result.diagnostics.len(), 1);
        let warning = &result.diagnostics[0];
        assert_eq!(warning.code, DiagnosticCode::WrnAssemblyAttributeFromModuleIsOverridden);
        assert_eq!(warning.arguments, vec![DESCRIPTION, "m1.netmodule"]);

        let same = [module("m1.netmodule", 1, &[(DESCRIPTION, "Module3")])];
        let result = merge_assembly_attributes(&source, &same, |_| false);
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.duplicates(), 1);
    }

    #[test]
    fn conflicting_modules() {
        let modules = [
            module("m1.netmodule", 1, &[(USER, "a"), (DESCRIPTION, "x")]),
            module("m2.netmodule", 2, &[(USER, "b"), (DESCRIPTION, "y")]),
        ];
        let result = merge_assembly_attributes(&[], &modules, |_| false);
        let codes: Vec<DiagnosticCode> = result.diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![
                DiagnosticCode::WrnAssemblyAttributeFromModuleIsOverridden,
                DiagnosticCode::ErrDuplicateAttributeInNetModule
            ]
        );
        assert_eq!(result.diagnostics[1].arguments, vec!["UserAttribute", "m1.netmodule"]);
        // the later module wins
        assert!(result
            .attributes
            .iter()
            .all(|a| a.source == AttributeSource::NetModule(2)));
    }

    #[test]
    fn allow_multiple_keeps_distinct_instances_in_module_order() {
        let modules = [
            module("m1.netmodule", 1, &[(USER, "a"), (USER, "b")]),
            module("m2.netmodule", 2, &[(USER, "b"), (USER, "c")]),
        ];
        let result = merge_assembly_attributes(&[], &modules, |_| true);
        let texts: Vec<&str> = result
            .attributes
            .iter()
            .filter_map(|a| a.fixed(0).and_then(TypedConstant::as_str))
            .collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        assert_eq!(result.duplicates(), 1);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn identical_source_instances_collapse() {
        let source = [
            attribute(USER, "a", AttributeSource::Source),
            attribute(USER, "a", AttributeSource::Source),
            attribute(USER, "b", AttributeSource::Source),
        ];
        let modules = [module("m1.netmodule", 1, &[(USER, "a")])];
        let result = merge_assembly_attributes(&source, &modules, |_| true);
        let texts: Vec<&str> = result
            .attributes
            .iter()
            .filter_map(|a| a.fixed(0).and_then(TypedConstant::as_str))
            .collect();
        assert_eq!(texts, vec!["a", "b"]);
        assert_eq!(result.duplicates(), 2);
        assert_eq!(result.suppressed[0].source, AttributeSource::Source);
        assert_eq!(result.suppressed[1].source, AttributeSource::NetModule(1));
        assert!(result.suppressed.iter().all(|a| a.duplicate_suppressed));
        assert!(result.diagnostics.is_empty());

        // without AllowMultiple the binder has already reported the duplicate
        let result = merge_assembly_attributes(&source[..2], &[], |_| false);
        assert_eq!(result.attributes.len(), 2);
        assert_eq!(result.duplicates(), 0);
    }
}
