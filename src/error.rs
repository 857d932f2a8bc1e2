use thiserror::Error;

use crate::metadata::symbols::SymbolId;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which covers every operational failure this library can return.
///
/// Compiler diagnostics (binding errors, version format errors, duplicate attributes, ...) are
/// *not* errors in this sense. They are collected as [`crate::metadata::diagnostics::Diagnostic`]
/// values and returned alongside results, so that a caller can ask for all of them at once.
/// An [`Error`] means the API was used incorrectly, an input blob is damaged, or the
/// computation was interrupted.
///
/// # Error Categories
///
/// ## Blob Decoding Errors
/// - [`Error::Malformed`] - Corrupted or invalid custom-attribute blob
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of a blob
/// - [`Error::RecursionLimit`] - Nesting in a blob exceeded the allowed depth
///
/// ## Declaration Errors
/// - [`Error::SymbolNotFound`] - A symbol id does not belong to this compilation
/// - [`Error::InvalidDeclaration`] - The declaration builder was given inconsistent input
/// - [`Error::NotSupported`] - The requested operation is not available for this symbol
///
/// ## Pipeline Errors
/// - [`Error::CycleDetected`] - A memoized attribute computation re-entered itself
/// - [`Error::Cancelled`] - The host cancelled the operation between two symbols
/// - [`Error::EmitFailed`] - Emission was requested while emit-blocking diagnostics exist
/// - [`Error::LockError`] - Thread synchronization failure
///
/// # Examples
///
/// ```rust
/// use cilattr::{Error, metadata::customattributes::CustomAttributeDecoder};
///
/// match CustomAttributeDecoder::new(&[0x02, 0x00]).decode(&[]) {
///     Err(Error::Malformed { message, .. }) => println!("bad blob: {message}"),
///     Err(e) => println!("other error: {e}"),
///     Ok(_) => unreachable!(),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The blob is damaged and could not be decoded.
    ///
    /// The error includes the source location where the malformation was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while reading a blob or a symbol slot.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// The requested operation is not supported for this input.
    #[error("This operation is not supported")]
    NotSupported,

    /// A symbol id was used with a compilation that does not contain it.
    #[error("Symbol {0} does not exist in this compilation")]
    SymbolNotFound(SymbolId),

    /// The declaration builder received inconsistent input.
    ///
    /// Examples are a parameter declared on a field, or a member added to a type that was
    /// declared by a different assembly.
    #[error("Invalid declaration - {0}")]
    InvalidDeclaration(String),

    /// A memoized computation for a symbol re-entered itself on the same thread.
    ///
    /// Bound attribute slots are filled at most once; an attempt to fill a slot while
    /// its own computation is in progress is reported instead of recomputed.
    #[error("Cycle detected while computing attributes of symbol {0}")]
    CycleDetected(SymbolId),

    /// Reached the maximum nesting depth while decoding a blob.
    #[error("Reached the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// Failed to lock a shared structure.
    #[error("Failed to lock target")]
    LockError,

    /// The host cancelled the operation.
    ///
    /// Cancellation is only observed between two symbols; no symbol is left half bound.
    #[error("The operation was cancelled")]
    Cancelled,

    /// Emission was requested while emit-blocking diagnostics exist.
    #[error("Emit failed with {errors} error(s)")]
    EmitFailed {
        /// Number of emit-blocking diagnostics
        errors: usize,
    },

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
