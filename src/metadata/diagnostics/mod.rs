//! Diagnostics collection for attribute binding, merge and emission.
//!
//! Compiler diagnostics are values, not errors: every phase of the pipeline collects them and
//! the compilation hands them out together, so a caller can ask for "all diagnostics" or
//! only the emit-blocking ones.
//!
//! # Architecture
//!
//! - **Binding**: each symbol's memoized attribute bag carries the diagnostics produced while
//!   binding and decoding it, so binding twice can never report twice
//! - **Merge**: the cross-module pass reports duplicates and overrides against the module
//!   they came from
//! - **Emit**: hashing failures only surface while the image is written
//!
//! The [`Diagnostics`] container uses `boxcar::Vec` for lock-free append, which lets parallel
//! binding workers report without synchronization.
//!
//! # Usage Examples
//!
//! ```rust
//! use cilattr::metadata::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
//! use cilattr::metadata::syntax::Location;
//!
//! let diagnostics = Diagnostics::new();
//! diagnostics.push(Diagnostic::new(
//!     DiagnosticCode::ErrInvalidVersionFormat,
//!     Location::source("a.cs", 1, 12),
//!     vec!["1.*".to_string()],
//! ));
//!
//! assert!(diagnostics.has_errors());
//! assert_eq!(diagnostics.by_code(DiagnosticCode::ErrInvalidVersionFormat).len(), 1);
//! ```

mod codes;

pub use codes::DiagnosticCode;

use std::fmt::{self, Write};

use crate::metadata::syntax::Location;

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticSeverity {
    /// Informational message
    Info,
    /// Reported, output is still produced
    Warning,
    /// Output is not produced
    Error,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Info => write!(f, "info"),
            DiagnosticSeverity::Warning => write!(f, "warning"),
            DiagnosticSeverity::Error => write!(f, "error"),
        }
    }
}

/// The pipeline area a diagnostic originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticCategory {
    /// Attribute name, constructor and argument binding
    Binding,
    /// Attribute target locations
    Location,
    /// Caller-info parameters
    CallerInfo,
    /// Assembly identity attributes (version, culture, friend assemblies)
    Assembly,
    /// Compiler-synthesized marker attributes
    Synthesis,
    /// Cross-module merge of assembly attributes
    Merge,
    /// Image emission
    Emit,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticCategory::Binding => "Binding",
            DiagnosticCategory::Location => "Location",
            DiagnosticCategory::CallerInfo => "CallerInfo",
            DiagnosticCategory::Assembly => "Assembly",
            DiagnosticCategory::Synthesis => "Synthesis",
            DiagnosticCategory::Merge => "Merge",
            DiagnosticCategory::Emit => "Emit",
        };
        f.write_str(name)
    }
}

/// A single reported diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The diagnostic code
    pub code: DiagnosticCode,
    /// Severity (the code's default severity unless overridden)
    pub severity: DiagnosticSeverity,
    /// Where it was reported
    pub location: Location,
    /// Message arguments, in placeholder order
    pub arguments: Vec<String>,
}

impl Diagnostic {
    /// Create a diagnostic with the code's default severity.
    #[must_use]
    pub fn new(code: DiagnosticCode, location: Location, arguments: Vec<String>) -> Self {
        Self {
            code,
            severity: code.default_severity(),
            location,
            arguments,
        }
    }

    /// Same as [`Diagnostic::new`] with no arguments.
    #[must_use]
    pub fn bare(code: DiagnosticCode, location: Location) -> Self {
        Self::new(code, location, Vec::new())
    }

    /// The pipeline area.
    #[must_use]
    pub fn category(&self) -> DiagnosticCategory {
        self.code.category()
    }

    /// Whether this diagnostic prevents output.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }

    /// The formatted message.
    #[must_use]
    pub fn message(&self) -> String {
        self.code.format(&self.arguments)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {}: {}",
            self.location,
            self.severity,
            self.code.id(),
            self.message()
        )
    }
}

/// Thread-safe, append-only diagnostic collection.
#[derive(Debug)]
pub struct Diagnostics {
    entries: boxcar::Vec<Diagnostic>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Diagnostics {
    fn clone(&self) -> Self {
        let copy = Diagnostics::new();
        copy.extend(self.iter().cloned());
        copy
    }
}

impl Diagnostics {
    /// An empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: boxcar::Vec::new(),
        }
    }

    /// Report a diagnostic.
    pub fn push(&self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// Report `code` at `location` with `arguments`.
    pub fn report(&self, code: DiagnosticCode, location: &Location, arguments: Vec<String>) {
        self.push(Diagnostic::new(code, location.clone(), arguments));
    }

    /// Append several diagnostics.
    pub fn extend<I: IntoIterator<Item = Diagnostic>>(&self, diagnostics: I) {
        for diagnostic in diagnostics {
            self.push(diagnostic);
        }
    }

    /// Whether nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.entries.count() == 0
    }

    /// Whether any error was reported.
    pub fn has_errors(&self) -> bool {
        self.iter().any(Diagnostic::is_error)
    }

    /// Total number of entries.
    pub fn count(&self) -> usize {
        self.entries.count()
    }

    /// Number of errors.
    pub fn error_count(&self) -> usize {
        self.iter().filter(|d| d.is_error()).count()
    }

    /// Number of warnings.
    pub fn warning_count(&self) -> usize {
        self.iter()
            .filter(|d| d.severity == DiagnosticSeverity::Warning)
            .count()
    }

    /// Iterate in report order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().map(|(_, d)| d)
    }

    /// All errors.
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.iter().filter(|d| d.is_error()).collect()
    }

    /// All warnings.
    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.iter()
            .filter(|d| d.severity == DiagnosticSeverity::Warning)
            .collect()
    }

    /// All entries with `code`.
    pub fn by_code(&self, code: DiagnosticCode) -> Vec<&Diagnostic> {
        self.iter().filter(|d| d.code == code).collect()
    }

    /// All entries in `category`.
    pub fn by_category(&self, category: DiagnosticCategory) -> Vec<&Diagnostic> {
        self.iter().filter(|d| d.category() == category).collect()
    }

    /// Entries ordered by location, then code, then arguments.
    ///
    /// Parallel binding reports in thread completion order; this is the order handed to users.
    pub fn sorted(&self) -> Vec<Diagnostic> {
        let mut entries: Vec<Diagnostic> = self.iter().cloned().collect();
        entries.sort_by(|a, b| {
            a.location
                .cmp(&b.location)
                .then(a.code.cmp(&b.code))
                .then_with(|| a.arguments.cmp(&b.arguments))
        });
        entries
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        let mut output = String::new();
        let error_count = self.error_count();
        let warning_count = self.warning_count();

        let _ = writeln!(
            output,
            "Diagnostics: {} error(s), {} warning(s)",
            error_count, warning_count
        );

        for diag in self.sorted() {
            let _ = writeln!(output, "  {diag}");
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        let diagnostics = Diagnostics::new();
        diagnostics.extend(iter);
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn at(line: u32) -> Location {
        Location::source("test.cs", line, 1)
    }

    #[test]
    fn test_diagnostic_creation() {
        let diag = Diagnostic::new(
            DiagnosticCode::WrnAttributeLocationOnBadDeclaration,
            at(3),
            vec!["return".to_string(), "field".to_string()],
        );

        assert_eq!(diag.severity, DiagnosticSeverity::Warning);
        assert_eq!(diag.category(), DiagnosticCategory::Location);
        assert!(diag.message().starts_with("'return' is not a valid attribute location"));
        assert!(diag.message().contains("are 'field'"));
    }

    #[test]
    fn test_display() {
        let diag = Diagnostic::bare(DiagnosticCode::ErrCryptoHashFailed, Location::none());
        assert_eq!(
            diag.to_string(),
            "<none>: error CS8013: Cryptographic failure while creating hashes."
        );
    }

    #[test]
    fn test_counts_and_filters() {
        let diagnostics = Diagnostics::new();
        diagnostics.report(DiagnosticCode::ErrDuplicateAttribute, &at(2), vec!["A".into()]);
        diagnostics.report(DiagnosticCode::WrnDeprecatedSymbol, &at(1), vec!["B".into()]);
        diagnostics.report(DiagnosticCode::ErrDuplicateAttribute, &at(1), vec!["C".into()]);

        assert_eq!(diagnostics.count(), 3);
        assert_eq!(diagnostics.error_count(), 2);
        assert_eq!(diagnostics.warning_count(), 1);
        assert_eq!(diagnostics.by_code(DiagnosticCode::ErrDuplicateAttribute).len(), 2);
        assert_eq!(diagnostics.by_category(DiagnosticCategory::Binding).len(), 3);

        let sorted = diagnostics.sorted();
        assert_eq!(sorted[0].arguments, vec!["B".to_string()]);
        assert_eq!(sorted[1].arguments, vec!["C".to_string()]);
        assert_eq!(sorted[2].arguments, vec!["A".to_string()]);
    }

    #[test]
    fn test_thread_safety() {
        let diagnostics = Arc::new(Diagnostics::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let diagnostics = Arc::clone(&diagnostics);
                thread::spawn(move || {
                    for j in 0..25 {
                        diagnostics.report(
                            DiagnosticCode::WrnDeprecatedSymbol,
                            &at(i * 100 + j),
                            vec![],
                        );
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(diagnostics.count(), 100);
        assert!(!diagnostics.has_errors());
    }
}
