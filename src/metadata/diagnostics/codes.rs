//! The closed set of diagnostics the attribute pipeline reports.
//!
//! Every code carries its public `CSnnnn` number, its default severity, the category used
//! for filtering, and a message template with positional `{0}`, `{1}`, ... placeholders.

use strum::{EnumIter, IntoStaticStr};

use crate::metadata::diagnostics::{DiagnosticCategory, DiagnosticSeverity};

macro_rules! diagnostic_codes {
    ($( $name:ident = ($number:expr, $severity:ident, $category:ident, $message:expr) ),* $(,)?) => {
        /// A compiler diagnostic code.
        #[allow(missing_docs)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, IntoStaticStr, EnumIter)]
        pub enum DiagnosticCode {
            $( $name, )*
        }

        impl DiagnosticCode {
            /// The numeric part of the public id.
            #[must_use]
            pub fn number(self) -> u16 {
                match self {
                    $( DiagnosticCode::$name => $number, )*
                }
            }

            /// Severity this code is reported with.
            #[must_use]
            pub fn default_severity(self) -> DiagnosticSeverity {
                match self {
                    $( DiagnosticCode::$name => DiagnosticSeverity::$severity, )*
                }
            }

            /// Category used for filtering.
            #[must_use]
            pub fn category(self) -> DiagnosticCategory {
                match self {
                    $( DiagnosticCode::$name => DiagnosticCategory::$category, )*
                }
            }

            /// Message template with `{n}` placeholders.
            #[must_use]
            pub fn message_format(self) -> &'static str {
                match self {
                    $( DiagnosticCode::$name => $message, )*
                }
            }
        }
    };
}

diagnostic_codes! {
    // Name resolution and attribute class checks
    ErrNoImplicitConv = (29, Error, Binding, "Cannot implicitly convert type '{0}' to '{1}'"),
    ErrNameNotInContext = (103, Error, Binding, "The name '{0}' does not exist in the current context"),
    ErrNoSuchMember = (117, Error, Binding, "'{0}' does not contain a definition for '{1}'"),
    ErrAmbigCall = (121, Error, Binding, "The call is ambiguous between the following methods or properties: '{0}' and '{1}'"),
    ErrBadAttributeParamType = (181, Error, Binding, "Attribute constructor parameter '{0}' has type '{1}', which is not a valid attribute parameter type"),
    ErrBadAttributeArgument = (182, Error, Binding, "An attribute argument must be a constant expression, typeof expression or array creation expression of an attribute parameter type"),
    ErrConstOutOfRangeChecked = (221, Error, Binding, "Constant value '{0}' cannot be converted to a '{1}'"),
    ErrSingleTypeNameNotFound = (246, Error, Binding, "The type or namespace name '{0}' could not be found (are you missing a using directive or an assembly reference?)"),
    ErrAttributeCantBeGeneric = (404, Error, Binding, "Cannot apply attribute class '{0}' because it is generic"),
    ErrDuplicateAttribute = (579, Error, Binding, "Duplicate '{0}' attribute"),
    ErrAttributeOnBadSymbolType = (592, Error, Location, "Attribute '{0}' is not valid on this declaration type. It is only valid on '{1}' declarations."),
    WrnDeprecatedSymbol = (612, Warning, Binding, "'{0}' is obsolete"),
    ErrNotAnAttributeClass = (616, Error, Binding, "'{0}' is not an attribute class"),
    ErrBadNamedAttributeArgument = (617, Error, Binding, "'{0}' is not a valid named attribute argument. Named attribute arguments must be fields which are not readonly, static, or const, or read-write properties which are public and not static."),
    WrnDeprecatedSymbolStr = (618, Warning, Binding, "'{0}' is obsolete: '{1}'"),
    ErrDeprecatedSymbolStr = (619, Error, Binding, "'{0}' is obsolete: '{1}'"),
    ErrDuplicateNamedAttributeArgument = (643, Error, Binding, "'{0}' duplicate named attribute argument"),
    ErrBadNamedAttributeArgumentType = (655, Error, Binding, "'{0}' is not a valid named attribute argument because it is not a valid attribute parameter type"),
    ErrAbstractAttributeClass = (653, Error, Binding, "Cannot apply attribute class '{0}' because it is abstract"),
    WrnAttributeLocationOnBadDeclaration = (657, Warning, Location, "'{0}' is not a valid attribute location for this declaration. Valid attribute locations for this declaration are '{1}'. All attributes in this block will be ignored."),
    WrnInvalidAttributeLocation = (658, Warning, Location, "'{0}' is not a recognized attribute location. Valid attribute locations for this declaration are '{1}'. All attributes in this block will be ignored."),
    ErrBadArgType = (1503, Error, Binding, "Argument {0}: cannot convert from '{1}' to '{2}'"),
    ErrAmbiguousAttribute = (1614, Error, Binding, "'{0}' is ambiguous between '{1}' and '{2}'. Either use '@{0}' or explicitly include the 'Attribute' suffix."),
    ErrBadCtorArgCount = (1729, Error, Binding, "'{0}' does not contain a constructor that takes {1} arguments"),
    ErrNoCorrespondingArgument = (7036, Error, Binding, "There is no argument given that corresponds to the required parameter '{0}' of '{1}'"),

    // Synthesized markers
    ErrExplicitDynamicAttr = (1970, Error, Synthesis, "Do not use 'System.Runtime.CompilerServices.DynamicAttribute'. Use the 'dynamic' keyword instead."),
    ErrDynamicAttributeMissing = (1980, Error, Synthesis, "Cannot define a class or member that utilizes 'dynamic' because the compiler required type '{0}' cannot be found. Are you missing a reference?"),
    ErrMissingPredefinedMember = (656, Error, Synthesis, "Missing compiler required member '{0}.{1}'"),
    ErrExplicitReservedAttr = (8335, Error, Synthesis, "Do not use '{0}'. This is reserved for compiler usage."),

    // Caller-info parameters
    ErrNoConversionForCallerLineNumberParam = (4017, Error, CallerInfo, "CallerLineNumberAttribute cannot be applied because there are no standard conversions from type '{0}' to type '{1}'"),
    ErrNoConversionForCallerFilePathParam = (4018, Error, CallerInfo, "CallerFilePathAttribute cannot be applied because there are no standard conversions from type '{0}' to type '{1}'"),
    ErrNoConversionForCallerMemberNameParam = (4019, Error, CallerInfo, "CallerMemberNameAttribute cannot be applied because there are no standard conversions from type '{0}' to type '{1}'"),
    ErrBadCallerLineNumberParamWithoutDefaultValue = (4020, Error, CallerInfo, "The CallerLineNumberAttribute may only be applied to parameters with default values"),
    ErrBadCallerFilePathParamWithoutDefaultValue = (4021, Error, CallerInfo, "The CallerFilePathAttribute may only be applied to parameters with default values"),
    ErrBadCallerMemberNameParamWithoutDefaultValue = (4022, Error, CallerInfo, "The CallerMemberNameAttribute may only be applied to parameters with default values"),
    WrnCallerLineNumberParamForUnconsumedLocation = (4024, Warning, CallerInfo, "The CallerLineNumberAttribute applied to parameter '{0}' will have no effect because it applies to a member that is used in contexts that do not allow optional arguments"),
    WrnCallerFilePathParamForUnconsumedLocation = (4025, Warning, CallerInfo, "The CallerFilePathAttribute applied to parameter '{0}' will have no effect because it applies to a member that is used in contexts that do not allow optional arguments"),
    WrnCallerMemberNameParamForUnconsumedLocation = (4026, Warning, CallerInfo, "The CallerMemberNameAttribute applied to parameter '{0}' will have no effect because it applies to a member that is used in contexts that do not allow optional arguments"),
    WrnCallerFilePathPreferredOverCallerMemberName = (7072, Warning, CallerInfo, "The CallerMemberNameAttribute applied to parameter '{0}' will have no effect. It is overridden by the CallerFilePathAttribute."),
    WrnCallerLineNumberPreferredOverCallerMemberName = (7073, Warning, CallerInfo, "The CallerMemberNameAttribute applied to parameter '{0}' will have no effect. It is overridden by the CallerLineNumberAttribute."),
    WrnCallerLineNumberPreferredOverCallerFilePath = (7074, Warning, CallerInfo, "The CallerFilePathAttribute applied to parameter '{0}' will have no effect. It is overridden by the CallerLineNumberAttribute."),

    // Assembly identity
    ErrInvalidVersionFormat = (7034, Error, Assembly, "The specified version string '{0}' does not conform to the required format - major[.minor[.build[.revision]]]"),
    WrnInvalidVersionFormat = (7035, Warning, Assembly, "The specified version string '{0}' does not conform to the recommended format - major.minor.build.revision"),
    ErrInvalidVersionFormat2 = (7058, Error, Assembly, "The specified version string '{0}' does not conform to the required format - major.minor.build.revision (without wildcards)"),
    ErrInvalidAssemblyCultureForExe = (7059, Error, Assembly, "Executables cannot be satellite assemblies; culture should always be empty"),
    ErrInvalidAssemblyCulture = (7100, Error, Assembly, "Assembly culture strings may not contain embedded NUL characters."),
    ErrInvalidVersionFormatDeterministic = (8357, Error, Assembly, "The specified version string '{0}' contains wildcards, which are not compatible with determinism. Either remove wildcards from the version string, or disable determinism for this compilation"),
    ErrCannotPassNullForFriendAssembly = (1700, Error, Assembly, "Friend assembly reference cannot be null"),
    ErrFriendAssemblyBadArgs = (1725, Error, Assembly, "Friend assembly reference '{0}' is invalid. InternalsVisibleTo declarations cannot have a version, culture, public key token, or processor architecture specified."),
    WrnInvalidAssemblyName = (1701, Warning, Assembly, "Assembly reference '{0}' is invalid and cannot be resolved"),
    WrnRefCultureMismatch = (8009, Warning, Assembly, "Referenced assembly '{0}' has different culture setting of '{1}'."),

    // Cross-module merge
    ErrDuplicateAttributeInNetModule = (7061, Error, Merge, "Duplicate '{0}' attribute in '{1}'"),
    WrnAssemblyAttributeFromModuleIsOverridden = (7090, Warning, Merge, "Attribute '{0}' from module '{1}' will be ignored in favor of the instance appearing in source"),

    // Emit
    ErrCryptoHashFailed = (8013, Error, Emit, "Cryptographic failure while creating hashes."),
}

impl DiagnosticCode {
    /// The public id, e.g. `CS0246`.
    #[must_use]
    pub fn id(self) -> String {
        format!("CS{:04}", self.number())
    }

    /// The variant name, e.g. `ErrSingleTypeNameNotFound`.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Substitute `arguments` into the message template.
    #[must_use]
    pub fn format(self, arguments: &[String]) -> String {
        let mut message = self.message_format().to_string();
        for (index, argument) in arguments.iter().enumerate() {
            message = message.replace(&format!("{{{index}}}"), argument);
        }
        message
    }
}
