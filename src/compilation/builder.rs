//! Assembling a [`Compilation`] from declarations, references and net-modules.

use crate::{
    compilation::{Compilation, CompilationOptions, Corlib, NetModule},
    metadata::{
        binder::{ConstantEvaluator, LiteralEvaluator},
        symbols::SymbolTableBuilder,
    },
    utils::CancellationToken,
    Result,
};

/// Collects everything a [`Compilation`] is made of.
///
/// # Examples
///
/// ```rust
/// use cilattr::prelude::*;
///
/// let mut builder = CompilationBuilder::new("App", CompilationOptions::library());
/// let corlib = builder.corlib()?;
/// builder.declarations().add_type(
///     None,
///     TypeDecl::class("N", "C").base(TypeSig::named(corlib.object)),
/// )?;
/// builder.add_net_module(NetModule::new("m1.netmodule", vec![0x4D, 0x5A]));
///
/// let compilation = builder.build();
/// assert_eq!(compilation.net_modules().len(), 1);
/// # Ok::<(), cilattr::Error>(())
/// ```
pub struct CompilationBuilder {
    declarations: SymbolTableBuilder,
    options: CompilationOptions,
    modules: Vec<NetModule>,
    evaluator: Box<dyn ConstantEvaluator>,
    cancellation: CancellationToken,
    corlib: Option<Corlib>,
}

impl CompilationBuilder {
    /// Start a compilation producing the assembly `assembly_name`. The primary module is
    /// named after [`CompilationOptions::module_name_for`].
    #[must_use]
    pub fn new(assembly_name: &str, options: CompilationOptions) -> Self {
        let module_name = options.module_name_for(assembly_name);
        CompilationBuilder {
            declarations: SymbolTableBuilder::new(assembly_name, &module_name),
            options,
            modules: Vec::new(),
            evaluator: Box::new(LiteralEvaluator::new()),
            cancellation: CancellationToken::new(),
            corlib: None,
        }
    }

    /// The declaration builder for source symbols and references.
    pub fn declarations(&mut self) -> &mut SymbolTableBuilder {
        &mut self.declarations
    }

    /// Reference the standard core library, declaring it on first use.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidDeclaration`] if the core types cannot be declared.
    pub fn corlib(&mut self) -> Result<Corlib> {
        if let Some(corlib) = self.corlib {
            return Ok(corlib);
        }
        let corlib = Corlib::standard(&mut self.declarations)?;
        self.corlib = Some(corlib);
        Ok(corlib)
    }

    /// Link a net-module into the output assembly.
    pub fn add_net_module(&mut self, module: NetModule) -> &mut Self {
        self.modules.push(module);
        self
    }

    /// Evaluate attribute arguments with `evaluator` instead of the literal evaluator.
    pub fn evaluator(&mut self, evaluator: Box<dyn ConstantEvaluator>) -> &mut Self {
        self.evaluator = evaluator;
        self
    }

    /// Poll `token` between symbols.
    pub fn cancellation(&mut self, token: CancellationToken) -> &mut Self {
        self.cancellation = token;
        self
    }

    /// Finish the declarations.
    #[must_use]
    pub fn build(self) -> Compilation {
        let table = self.declarations.build();
        log::debug!(
            "compilation with {} symbol(s), {} net-module(s)",
            table.len(),
            self.modules.len()
        );
        Compilation::new(
            table,
            self.options,
            self.modules,
            self.evaluator,
            self.cancellation,
        )
    }
}
