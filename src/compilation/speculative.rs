//! Speculative attribute queries.
//!
//! An editor asking "what would this attribute bind to here?" must not change what the
//! compilation later emits. A [`SpeculativeModel`] answers such queries against the committed
//! symbols but keeps a forked marker registry and hands every diagnostic back to the caller,
//! so neither a synthesized marker type nor an error can reach the compilation.

use crate::{
    compilation::Compilation,
    metadata::{
        binder::BoundAttribute,
        diagnostics::Diagnostic,
        symbols::SymbolId,
        synthesis::{MarkerKind, MarkerRegistry, SynthesisEngine},
        syntax::AttributeSyntax,
        wellknown::WellKnownDecoder,
    },
    Result,
};

/// Attributes computed by a speculative query, with the diagnostics it produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeculativeResult {
    /// The bound or synthesized attributes
    pub attributes: Vec<BoundAttribute>,
    /// Diagnostics of this query only
    pub diagnostics: Vec<Diagnostic>,
}

/// A private view of a [`Compilation`] for non-committed queries.
pub struct SpeculativeModel<'c> {
    compilation: &'c Compilation,
    registry: MarkerRegistry,
}

impl<'c> SpeculativeModel<'c> {
    pub(crate) fn new(compilation: &'c Compilation) -> Self {
        SpeculativeModel {
            compilation,
            registry: compilation.registry().fork(),
        }
    }

    /// Bind `syntax` as if it were written on the declaration of `declared_on`, next to the
    /// usages already there.
    ///
    /// # Errors
    /// Returns [`crate::Error::SymbolNotFound`] if `declared_on` is not in the compilation.
    pub fn bind_attribute(
        &self,
        declared_on: SymbolId,
        syntax: &AttributeSyntax,
    ) -> Result<SpeculativeResult> {
        let compilation = self.compilation;
        let symbol = compilation.table().get(declared_on)?;
        let binder = compilation.binder();
        let mut result = SpeculativeResult::default();
        compilation.bind_usage(
            &binder,
            syntax,
            declared_on,
            &mut result.attributes,
            &mut result.diagnostics,
        )?;

        let (own, routed): (Vec<BoundAttribute>, Vec<BoundAttribute>) = result
            .attributes
            .into_iter()
            .partition(|a| a.owner == declared_on);
        let mut own = own;
        let existing = compilation.get_attributes(declared_on)?;
        compilation.check_usage(symbol, &mut own, existing, &mut result.diagnostics);
        WellKnownDecoder::new(compilation.table(), compilation.options()).decode(
            declared_on,
            &own,
            &mut result.diagnostics,
        );
        own.extend(routed);
        result.attributes = own;
        Ok(result)
    }

    /// The synthesized attributes of `id`, requesting marker types from the private
    /// registry only.
    ///
    /// # Errors
    /// Returns [`crate::Error::SymbolNotFound`] if `id` is not in the compilation.
    pub fn synthesized_attributes(&self, id: SymbolId) -> Result<SpeculativeResult> {
        let compilation = self.compilation;
        let assembly = compilation.assembly_data()?;
        let engine = SynthesisEngine::new(compilation.table(), compilation.options(), &self.registry);
        let mut result = SpeculativeResult::default();
        result.attributes = engine.synthesized_attributes(id, assembly, &mut result.diagnostics)?;
        Ok(result)
    }

    /// Marker types this model would synthesize, including those the compilation already
    /// requested when the model was created.
    #[must_use]
    pub fn requested_markers(&self) -> Vec<MarkerKind> {
        self.registry.requested()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        compilation::{CompilationBuilder, CompilationOptions},
        metadata::{
            diagnostics::DiagnosticCode,
            symbols::TypeDecl,
            synthesis::MarkerKind,
            syntax::{AttributeSyntax, Expression},
            typesystem::TypeSig,
        },
    };

    #[test]
    fn speculative_synthesis_stays_private() {
        let mut builder = CompilationBuilder::new("App", CompilationOptions::library());
        let corlib = builder.corlib().unwrap();
        let point = builder
            .declarations()
            .add_type(
                None,
                TypeDecl::structure("N", "Point")
                    .base(TypeSig::named(corlib.value_type))
                    .readonly(),
            )
            .unwrap();
        let compilation = builder.build();

        let model = compilation.speculate();
        let result = model.synthesized_attributes(point).unwrap();
        assert!(result
            .attributes
            .iter()
            .any(|a| a.class_name == MarkerKind::IsReadOnly.full_name()));
        let requested = model.requested_markers();
        assert!(requested.contains(&MarkerKind::IsReadOnly));
        assert!(requested.contains(&MarkerKind::Embedded));
        assert!(compilation.requested_markers().is_empty());
    }

    #[test]
    fn speculative_errors_stay_private() {
        let mut builder = CompilationBuilder::new("App", CompilationOptions::library());
        builder.corlib().unwrap();
        let compilation = builder.build();
        let assembly = compilation.table().source_assembly();

        let result = compilation
            .speculate()
            .bind_attribute(
                assembly,
                &AttributeSyntax::new("System.Reflection.AssemblyVersion")
                    .arg(Expression::string("1.*")),
            )
            .unwrap();
        assert_eq!(result.attributes.len(), 1);
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::ErrInvalidVersionFormat));
        assert!(compilation.diagnostics().unwrap().is_empty());
    }
}
