//! Compilation options.

use std::time::{SystemTime, UNIX_EPOCH};

/// The kind of image being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputKind {
    /// A console executable
    ConsoleApplication,
    /// A GUI executable
    WindowsApplication,
    /// A class library
    #[default]
    DynamicallyLinkedLibrary,
    /// A module without an assembly manifest, linked into an assembly later
    NetModule,
}

impl OutputKind {
    /// Executables cannot declare a culture.
    #[must_use]
    pub fn is_executable(self) -> bool {
        matches!(
            self,
            OutputKind::ConsoleApplication | OutputKind::WindowsApplication
        )
    }

    /// A module without a manifest.
    #[must_use]
    pub fn is_net_module(self) -> bool {
        self == OutputKind::NetModule
    }

    /// File extension of the primary module.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            OutputKind::ConsoleApplication | OutputKind::WindowsApplication => "exe",
            OutputKind::DynamicallyLinkedLibrary => "dll",
            OutputKind::NetModule => "netmodule",
        }
    }
}

/// Configuration of one compilation.
///
/// # Examples
///
/// ```rust
/// use cilattr::compilation::{CompilationOptions, OutputKind};
///
/// let options = CompilationOptions::console_application()
///     .with_deterministic(true)
///     .with_using("System.Reflection");
/// assert_eq!(options.output_kind, OutputKind::ConsoleApplication);
/// assert!(options.deterministic);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationOptions {
    /// Image kind
    pub output_kind: OutputKind,
    /// Byte-for-byte reproducible output; wildcard versions are rejected
    pub deterministic: bool,
    /// Time used to generate wildcard build and revision numbers
    pub build_time: SystemTime,
    /// Synthesize missing marker types into the output instead of reporting them missing
    pub synthesize_markers: bool,
    /// Strong-name public key written to the Assembly row
    pub public_key: Vec<u8>,
    /// Name of the primary module; defaults to the assembly name plus the output extension
    pub module_name: Option<String>,
    /// Namespaces imported into every source file
    pub usings: Vec<String>,
    /// Bind and encode symbols on the rayon thread pool
    pub parallel: bool,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self {
            output_kind: OutputKind::DynamicallyLinkedLibrary,
            deterministic: false,
            build_time: UNIX_EPOCH,
            synthesize_markers: true,
            public_key: Vec::new(),
            module_name: None,
            usings: Vec::new(),
            parallel: true,
        }
    }
}

impl CompilationOptions {
    /// A class library.
    #[must_use]
    pub fn library() -> Self {
        Self::default()
    }

    /// A console executable.
    #[must_use]
    pub fn console_application() -> Self {
        Self {
            output_kind: OutputKind::ConsoleApplication,
            ..Self::default()
        }
    }

    /// A GUI executable.
    #[must_use]
    pub fn windows_application() -> Self {
        Self {
            output_kind: OutputKind::WindowsApplication,
            ..Self::default()
        }
    }

    /// A net-module.
    #[must_use]
    pub fn net_module() -> Self {
        Self {
            output_kind: OutputKind::NetModule,
            ..Self::default()
        }
    }

    /// Set the output kind.
    #[must_use]
    pub fn with_output_kind(mut self, output_kind: OutputKind) -> Self {
        self.output_kind = output_kind;
        self
    }

    /// Enable or disable deterministic output.
    #[must_use]
    pub fn with_deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    /// Set the build time.
    #[must_use]
    pub fn with_build_time(mut self, build_time: SystemTime) -> Self {
        self.build_time = build_time;
        self
    }

    /// Enable or disable marker synthesis.
    #[must_use]
    pub fn with_synthesize_markers(mut self, synthesize: bool) -> Self {
        self.synthesize_markers = synthesize;
        self
    }

    /// Set the strong-name public key.
    #[must_use]
    pub fn with_public_key(mut self, public_key: Vec<u8>) -> Self {
        self.public_key = public_key;
        self
    }

    /// Set the primary module name.
    #[must_use]
    pub fn with_module_name(mut self, name: &str) -> Self {
        self.module_name = Some(name.to_string());
        self
    }

    /// Add a global `using`.
    #[must_use]
    pub fn with_using(mut self, namespace: &str) -> Self {
        self.usings.push(namespace.to_string());
        self
    }

    /// Enable or disable parallel binding and encoding.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// The primary module name for an assembly called `assembly_name`.
    #[must_use]
    pub fn module_name_for(&self, assembly_name: &str) -> String {
        self.module_name
            .clone()
            .unwrap_or_else(|| format!("{assembly_name}.{}", self.output_kind.extension()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        assert_eq!(CompilationOptions::library().output_kind, OutputKind::DynamicallyLinkedLibrary);
        assert!(CompilationOptions::console_application().output_kind.is_executable());
        assert!(CompilationOptions::windows_application().output_kind.is_executable());
        assert!(!CompilationOptions::net_module().output_kind.is_executable());
        assert!(CompilationOptions::default().synthesize_markers);
    }

    #[test]
    fn module_names() {
        assert_eq!(CompilationOptions::library().module_name_for("App"), "App.dll");
        assert_eq!(CompilationOptions::net_module().module_name_for("M1"), "M1.netmodule");
        assert_eq!(
            CompilationOptions::library()
                .with_module_name("Custom.dll")
                .module_name_for("App"),
            "Custom.dll"
        );
    }
}
