//! The read-only syntax the binder consumes.
//!
//! Parsing is not part of this crate. Declarations arrive with their attribute lists already
//! split into [`AttributeSyntax`] nodes: an optional target keyword, a possibly dotted and
//! possibly `@`-escaped class name, positional argument expressions and named assignments.
//! Type expressions inside arguments (`typeof(T)`, `new T[] { .. }`, enum member access)
//! arrive as resolved [`TypeSig`] values from the declaration phase.

use std::{fmt, sync::Arc};

use crate::metadata::{customattributes::ConstantValue, typesystem::TypeSig};

/// A position in a source file or an auxiliary module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Location {
    /// No position available
    #[default]
    None,
    /// A position in source
    Source {
        /// File path as given to the compiler
        file: Arc<str>,
        /// 1-based line
        line: u32,
        /// 1-based column
        column: u32,
    },
    /// Inside a linked net-module, identified by its file name
    Module(String),
}

impl Location {
    /// No position.
    #[must_use]
    pub fn none() -> Self {
        Location::None
    }

    /// A source position.
    #[must_use]
    pub fn source(file: &str, line: u32, column: u32) -> Self {
        Location::Source {
            file: Arc::from(file),
            line,
            column,
        }
    }

    /// A net-module.
    #[must_use]
    pub fn module(name: &str) -> Self {
        Location::Module(name.to_string())
    }

    /// The source line, if any.
    #[must_use]
    pub fn line(&self) -> Option<u32> {
        match self {
            Location::Source { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// The source file, if any.
    #[must_use]
    pub fn file(&self) -> Option<&str> {
        match self {
            Location::Source { file, .. } => Some(file),
            _ => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::None => f.write_str("<none>"),
            Location::Source { file, line, column } => write!(f, "{file}({line},{column})"),
            Location::Module(name) => f.write_str(name),
        }
    }
}

/// The class name of an attribute usage as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeName {
    /// Dotted segments; the last one names the class
    pub segments: Vec<String>,
    /// The last segment was written `@Name`: no `Attribute` suffix is tried
    pub verbatim: bool,
}

impl AttributeName {
    /// Parse `System.Diagnostics.Conditional` or `@Foo` style names.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut segments: Vec<String> = text
            .split('.')
            .map(|segment| segment.trim().to_string())
            .collect();
        let mut verbatim = false;
        if let Some(last) = segments.last_mut() {
            if let Some(stripped) = last.strip_prefix('@') {
                *last = stripped.to_string();
                verbatim = true;
            }
        }
        for segment in &mut segments {
            if let Some(stripped) = segment.strip_prefix('@') {
                *segment = stripped.to_string();
            }
        }
        AttributeName { segments, verbatim }
    }

    /// The class segment.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// The qualifying segments before the class name.
    #[must_use]
    pub fn qualifier(&self) -> &[String] {
        let count = self.segments.len().saturating_sub(1);
        &self.segments[..count]
    }
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                f.write_str(".")?;
            }
            if self.verbatim && index + 1 == self.segments.len() {
                f.write_str("@")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

/// Operators a constant argument expression may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    /// `|`
    BitOr,
    /// `&`
    BitAnd,
    /// `+`
    Add,
    /// `-`
    Subtract,
}

/// An argument expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A literal, typed by its value (`null` is [`ConstantValue::Null`])
    Literal(ConstantValue),
    /// `typeof(T)`
    TypeOf(TypeSig),
    /// `new T[] { e0, e1, .. }`
    ArrayCreation {
        /// Element type
        element: TypeSig,
        /// Initializer elements
        elements: Vec<Expression>,
    },
    /// `E.Member` naming a constant field of an enum or a class
    MemberAccess {
        /// The type containing the constant
        ty: TypeSig,
        /// Member name
        member: String,
    },
    /// `(T)e`
    Cast {
        /// Target type
        ty: TypeSig,
        /// Operand
        operand: Box<Expression>,
    },
    /// `-e`
    Negate(Box<Expression>),
    /// `a op b`
    Binary {
        /// The operator
        operator: BinaryOperator,
        /// Left operand
        left: Box<Expression>,
        /// Right operand
        right: Box<Expression>,
    },
    /// An identifier in argument position (a local, a parameter, an unknown name)
    Identifier(String),
    /// Any other expression; never a compile-time constant
    NonConstant(String),
}

impl Expression {
    /// A string literal.
    #[must_use]
    pub fn string(value: &str) -> Self {
        Expression::Literal(ConstantValue::String(value.to_string()))
    }

    /// An `int` literal.
    #[must_use]
    pub fn int(value: i32) -> Self {
        Expression::Literal(ConstantValue::I4(value))
    }

    /// A `bool` literal.
    #[must_use]
    pub fn bool(value: bool) -> Self {
        Expression::Literal(ConstantValue::Bool(value))
    }

    /// The `null` literal.
    #[must_use]
    pub fn null() -> Self {
        Expression::Literal(ConstantValue::Null)
    }

    /// `ty.member`.
    #[must_use]
    pub fn member(ty: TypeSig, member: &str) -> Self {
        Expression::MemberAccess {
            ty,
            member: member.to_string(),
        }
    }

    /// `a | b`.
    #[must_use]
    pub fn bit_or(left: Expression, right: Expression) -> Self {
        Expression::Binary {
            operator: BinaryOperator::BitOr,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `(ty)operand`.
    #[must_use]
    pub fn cast(ty: TypeSig, operand: Expression) -> Self {
        Expression::Cast {
            ty,
            operand: Box::new(operand),
        }
    }
}

/// `Name = value` inside an attribute argument list.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedArgumentSyntax {
    /// Field or property name
    pub name: String,
    /// Assigned expression
    pub value: Expression,
    /// Position of the assignment
    pub location: Location,
}

/// One attribute usage inside a `[...]` list.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSyntax {
    /// Target keyword before the colon (`return`, `assembly`, ...), if written
    pub target: Option<String>,
    /// Class name as written
    pub name: AttributeName,
    /// Positional arguments
    pub arguments: Vec<Expression>,
    /// Named arguments in source order
    pub named_arguments: Vec<NamedArgumentSyntax>,
    /// Position of the attribute name
    pub location: Location,
}

impl AttributeSyntax {
    /// `[name]` with no target and no arguments.
    #[must_use]
    pub fn new(name: &str) -> Self {
        AttributeSyntax {
            target: None,
            name: AttributeName::parse(name),
            arguments: Vec::new(),
            named_arguments: Vec::new(),
            location: Location::None,
        }
    }

    /// Set the target keyword.
    #[must_use]
    pub fn target(mut self, keyword: &str) -> Self {
        self.target = Some(keyword.to_string());
        self
    }

    /// Append a positional argument.
    #[must_use]
    pub fn arg(mut self, expression: Expression) -> Self {
        self.arguments.push(expression);
        self
    }

    /// Append a named argument.
    #[must_use]
    pub fn named(mut self, name: &str, value: Expression) -> Self {
        let location = self.location.clone();
        self.named_arguments.push(NamedArgumentSyntax {
            name: name.to_string(),
            value,
            location,
        });
        self
    }

    /// Set the position.
    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_verbatim_and_qualified_names() {
        let name = AttributeName::parse("@X");
        assert!(name.verbatim);
        assert_eq!(name.simple_name(), "X");
        assert_eq!(name.to_string(), "@X");

        let qualified = AttributeName::parse("System.Reflection.AssemblyVersion");
        assert!(!qualified.verbatim);
        assert_eq!(qualified.qualifier(), ["System", "Reflection"]);
        assert_eq!(qualified.simple_name(), "AssemblyVersion");
    }

    #[test]
    fn location_ordering_and_display() {
        let a = Location::source("a.cs", 1, 5);
        let b = Location::source("a.cs", 2, 1);
        assert!(a < b);
        assert!(Location::none() < a);
        assert_eq!(a.to_string(), "a.cs(1,5)");
        assert_eq!(Location::module("M1.netmodule").to_string(), "M1.netmodule");
    }

    #[test]
    fn builder_records_arguments() {
        let usage = AttributeSyntax::new("Obsolete")
            .target("method")
            .arg(Expression::string("old"))
            .named("DiagnosticId", Expression::string("X1"))
            .at(Location::source("a.cs", 4, 2));
        assert_eq!(usage.target.as_deref(), Some("method"));
        assert_eq!(usage.arguments.len(), 1);
        assert_eq!(usage.named_arguments[0].name, "DiagnosticId");
        assert_eq!(usage.location.line(), Some(4));
    }
}
