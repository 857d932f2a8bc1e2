//! Constant evaluation of attribute argument expressions.
//!
//! The binder never looks at an [`Expression`] directly; it asks a [`ConstantEvaluator`]
//! for an [`EvaluatedArgument`], a value with its natural type. A host with a richer
//! expression language can plug in its own evaluator; [`LiteralEvaluator`] covers literals,
//! `typeof`, array creation, constant and enum member access, casts, negation and the
//! `| & + -` operators.

use crate::metadata::{
    binder::conversions::{convert_constant, Conversions},
    customattributes::ConstantValue,
    diagnostics::{Diagnostic, DiagnosticCode},
    symbols::{SymbolKind, SymbolTable},
    syntax::{BinaryOperator, Expression, Location},
    typesystem::{PrimitiveType, TypeSig},
};

/// The value part of an evaluated argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
    /// A primitive, string, enum or `null` constant
    Constant(ConstantValue),
    /// `typeof(T)`
    Type(TypeSig),
    /// An array creation
    Array {
        /// Declared element type
        element: TypeSig,
        /// Elements, already converted to `element`
        items: Vec<EvaluatedArgument>,
    },
}

/// A constant argument with its natural type.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedArgument {
    /// Natural type; `None` for the `null` literal
    pub ty: Option<TypeSig>,
    /// Value
    pub value: ArgumentValue,
    /// Position of the expression
    pub location: Location,
}

impl EvaluatedArgument {
    /// A constant of type `ty`.
    #[must_use]
    pub fn constant(ty: Option<TypeSig>, value: ConstantValue, location: Location) -> Self {
        EvaluatedArgument {
            ty,
            value: ArgumentValue::Constant(value),
            location,
        }
    }

    /// Whether this is the `null` literal.
    #[must_use]
    pub fn is_null_literal(&self) -> bool {
        self.ty.is_none()
    }

    /// The type as printed in conversion diagnostics.
    #[must_use]
    pub fn display_type(&self, table: &SymbolTable) -> String {
        self.ty
            .as_ref()
            .map_or_else(|| "<null>".to_string(), |ty| table.display_type(ty))
    }

    fn constant_value(&self) -> Option<&ConstantValue> {
        match &self.value {
            ArgumentValue::Constant(value) => Some(value),
            _ => None,
        }
    }
}

/// Turns argument expressions into constants.
pub trait ConstantEvaluator: Send + Sync {
    /// Evaluate `expression`, written at `location`.
    ///
    /// # Errors
    /// Returns the diagnostic to report when the expression is not a valid attribute
    /// argument.
    fn evaluate(
        &self,
        table: &SymbolTable,
        expression: &Expression,
        location: &Location,
    ) -> Result<EvaluatedArgument, Diagnostic>;
}

/// The built-in evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralEvaluator;

impl LiteralEvaluator {
    /// Create the evaluator.
    #[must_use]
    pub fn new() -> Self {
        LiteralEvaluator
    }
}

fn natural_type(value: &ConstantValue) -> Option<TypeSig> {
    if value.is_string() {
        return Some(TypeSig::String);
    }
    value.primitive_type().map(TypeSig::Primitive)
}

fn error(code: DiagnosticCode, location: &Location, arguments: Vec<String>) -> Diagnostic {
    Diagnostic::new(code, location.clone(), arguments)
}

/// The operand type of a unary or binary numeric operator after promotion.
fn promote(left: PrimitiveType, right: PrimitiveType) -> Option<PrimitiveType> {
    use PrimitiveType::{Double, Int32, Int64, Single, UInt32, UInt64};

    let is_signed_small = |p: PrimitiveType| {
        matches!(p, PrimitiveType::SByte | PrimitiveType::Int16 | PrimitiveType::Int32)
    };
    let numeric = |p: PrimitiveType| p.is_integral() || matches!(p, PrimitiveType::Char | Single | Double);
    if !numeric(left) || !numeric(right) {
        return None;
    }
    Some(if left == Double || right == Double {
        Double
    } else if left == Single || right == Single {
        Single
    } else if left == UInt64 || right == UInt64 {
        UInt64
    } else if left == Int64 || right == Int64 {
        Int64
    } else if (left == UInt32 && is_signed_small(right)) || (right == UInt32 && is_signed_small(left)) {
        Int64
    } else if left == UInt32 || right == UInt32 {
        UInt32
    } else {
        Int32
    })
}

impl ConstantEvaluator for LiteralEvaluator {
    fn evaluate(
        &self,
        table: &SymbolTable,
        expression: &Expression,
        location: &Location,
    ) -> Result<EvaluatedArgument, Diagnostic> {
        match expression {
            Expression::Literal(value) => Ok(EvaluatedArgument::constant(
                natural_type(value),
                value.clone(),
                location.clone(),
            )),
            Expression::TypeOf(sig) => {
                let Some(system_type) = table.lookup_type("System.Type") else {
                    return Err(error(
                        DiagnosticCode::ErrSingleTypeNameNotFound,
                        location,
                        vec!["Type".to_string()],
                    ));
                };
                Ok(EvaluatedArgument {
                    ty: Some(TypeSig::named(system_type)),
                    value: ArgumentValue::Type(sig.clone()),
                    location: location.clone(),
                })
            }
            Expression::ArrayCreation { element, elements } => {
                let conversions = Conversions::new(table);
                let mut items = Vec::with_capacity(elements.len());
                for item in elements {
                    let evaluated = self.evaluate(table, item, location)?;
                    items.push(convert_element(table, &conversions, evaluated, element)?);
                }
                Ok(EvaluatedArgument {
                    ty: Some(TypeSig::sz_array(element.clone())),
                    value: ArgumentValue::Array {
                        element: element.clone(),
                        items,
                    },
                    location: location.clone(),
                })
            }
            Expression::MemberAccess { ty, member } => {
                let not_found = || {
                    error(
                        DiagnosticCode::ErrNoSuchMember,
                        location,
                        vec![table.display_type(ty), member.clone()],
                    )
                };
                let def = ty.definition().ok_or_else(not_found)?;
                if let Some(field) = table.find_constant(def, member) {
                    let data = field.as_field().ok_or_else(not_found)?;
                    let value = data.constant.clone().ok_or_else(not_found)?;
                    return Ok(EvaluatedArgument::constant(
                        Some(data.ty.clone()),
                        value,
                        location.clone(),
                    ));
                }
                let exists = table.members(def).iter().any(|m| {
                    table.get(*m).is_ok_and(|s| {
                        s.name == *member
                            && matches!(s.kind(), SymbolKind::Field | SymbolKind::Property)
                    })
                });
                if exists {
                    Err(error(DiagnosticCode::ErrBadAttributeArgument, location, Vec::new()))
                } else {
                    Err(not_found())
                }
            }
            Expression::Cast { ty, operand } => {
                let operand = self.evaluate(table, operand, location)?;
                cast(table, operand, ty, location)
            }
            Expression::Negate(operand) => {
                let operand = self.evaluate(table, operand, location)?;
                negate(operand, location)
            }
            Expression::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.evaluate(table, left, location)?;
                let right = self.evaluate(table, right, location)?;
                binary(table, *operator, left, right, location)
            }
            Expression::Identifier(name) => Err(error(
                DiagnosticCode::ErrNameNotInContext,
                location,
                vec![name.clone()],
            )),
            Expression::NonConstant(_) => {
                Err(error(DiagnosticCode::ErrBadAttributeArgument, location, Vec::new()))
            }
        }
    }
}

fn convert_element(
    table: &SymbolTable,
    conversions: &Conversions<'_>,
    item: EvaluatedArgument,
    element: &TypeSig,
) -> Result<EvaluatedArgument, Diagnostic> {
    if conversions.classify(&item, element).is_none() {
        return Err(error(
            DiagnosticCode::ErrNoImplicitConv,
            &item.location,
            vec![item.display_type(table), table.display_type(element)],
        ));
    }
    let value = match (&item.value, conversions.normalize(element)) {
        (ArgumentValue::Constant(value), TypeSig::Primitive(p)) => {
            ArgumentValue::Constant(convert_constant(value, p).unwrap_or_else(|| value.clone()))
        }
        (value, _) => value.clone(),
    };
    let ty = match &item.value {
        ArgumentValue::Constant(ConstantValue::Null) => item.ty.clone(),
        _ if conversions.is_reference_type(element) => item.ty.clone(),
        _ => Some(element.clone()),
    };
    Ok(EvaluatedArgument {
        ty,
        value,
        location: item.location,
    })
}

#[allow(clippy::cast_possible_truncation)]
fn cast(
    table: &SymbolTable,
    operand: EvaluatedArgument,
    target: &TypeSig,
    location: &Location,
) -> Result<EvaluatedArgument, Diagnostic> {
    let conversions = Conversions::new(table);
    let no_conversion = |operand: &EvaluatedArgument| {
        error(
            DiagnosticCode::ErrNoImplicitConv,
            location,
            vec![operand.display_type(table), table.display_type(target)],
        )
    };
    let out_of_range = |value: &ConstantValue| {
        error(
            DiagnosticCode::ErrConstOutOfRangeChecked,
            location,
            vec![value.to_string(), table.display_type(target)],
        )
    };

    let normalized = conversions.normalize(target);
    let integral_target = match &normalized {
        TypeSig::Primitive(p) if p.is_integral() || *p == PrimitiveType::Char => Some(*p),
        _ => conversions.enum_underlying(target),
    };

    if let Some(underlying) = integral_target {
        let Some(value) = operand.constant_value() else {
            return Err(no_conversion(&operand));
        };
        let integer = match value {
            ConstantValue::R4(_) | ConstantValue::R8(_) => value
                .as_f64()
                .map(f64::trunc)
                .filter(|v| v.is_finite() && v.abs() < 1e30)
                .map(|v| v as i128),
            other => other.as_integer(),
        };
        let Some(integer) = integer else {
            return Err(no_conversion(&operand));
        };
        let converted =
            ConstantValue::from_integer(underlying, integer).ok_or_else(|| out_of_range(value))?;
        return Ok(EvaluatedArgument::constant(
            Some(target.clone()),
            converted,
            operand.location,
        ));
    }

    match &normalized {
        TypeSig::Primitive(p @ (PrimitiveType::Single | PrimitiveType::Double)) => {
            let converted = operand
                .constant_value()
                .filter(|v| v.primitive_type().is_some_and(|t| t != PrimitiveType::Boolean))
                .and_then(|v| convert_constant(v, *p))
                .ok_or_else(|| no_conversion(&operand))?;
            Ok(EvaluatedArgument::constant(
                Some(target.clone()),
                converted,
                operand.location,
            ))
        }
        TypeSig::Primitive(PrimitiveType::Boolean) => match operand.constant_value() {
            Some(ConstantValue::Bool(b)) => Ok(EvaluatedArgument::constant(
                Some(target.clone()),
                ConstantValue::Bool(*b),
                operand.location,
            )),
            _ => Err(no_conversion(&operand)),
        },
        TypeSig::Object => Ok(EvaluatedArgument {
            ty: match &operand.value {
                ArgumentValue::Constant(ConstantValue::Null) => None,
                _ => operand.ty.clone().or(Some(TypeSig::Object)),
            },
            ..operand
        }),
        _ => {
            if operand.is_null_literal() && conversions.is_reference_type(target) {
                return Ok(EvaluatedArgument {
                    ty: Some(target.clone()),
                    ..operand
                });
            }
            if conversions.classify(&operand, target).is_some() {
                return Ok(EvaluatedArgument {
                    ty: Some(target.clone()),
                    ..operand
                });
            }
            Err(no_conversion(&operand))
        }
    }
}

fn negate(operand: EvaluatedArgument, location: &Location) -> Result<EvaluatedArgument, Diagnostic> {
    let invalid = || error(DiagnosticCode::ErrBadAttributeArgument, location, Vec::new());
    let value = operand.constant_value().ok_or_else(invalid)?;
    let negated = match value {
        ConstantValue::R4(v) => ConstantValue::R4(-v),
        ConstantValue::R8(v) => ConstantValue::R8(-v),
        ConstantValue::U8(_) | ConstantValue::Bool(_) => return Err(invalid()),
        other => {
            let promoted = match other.primitive_type().ok_or_else(invalid)? {
                PrimitiveType::UInt32 | PrimitiveType::Int64 => PrimitiveType::Int64,
                _ => PrimitiveType::Int32,
            };
            let integer = other.as_integer().ok_or_else(invalid)?;
            ConstantValue::from_integer(promoted, -integer).ok_or_else(|| {
                error(
                    DiagnosticCode::ErrConstOutOfRangeChecked,
                    location,
                    vec![(-integer).to_string(), promoted.keyword().to_string()],
                )
            })?
        }
    };
    let ty = natural_type(&negated);
    Ok(EvaluatedArgument::constant(ty, negated, operand.location))
}

fn binary(
    table: &SymbolTable,
    operator: BinaryOperator,
    left: EvaluatedArgument,
    right: EvaluatedArgument,
    location: &Location,
) -> Result<EvaluatedArgument, Diagnostic> {
    let conversions = Conversions::new(table);
    let invalid = || error(DiagnosticCode::ErrBadAttributeArgument, location, Vec::new());
    let (Some(a), Some(b)) = (left.constant_value(), right.constant_value()) else {
        return Err(invalid());
    };

    if operator == BinaryOperator::Add && (a.is_string() || b.is_string()) {
        let text = |value: &ConstantValue| -> Option<String> {
            match value {
                ConstantValue::Null => Some(String::new()),
                other => other.as_string_lossy().map(|s| s.into_owned()),
            }
        };
        let (Some(x), Some(y)) = (text(a), text(b)) else {
            return Err(invalid());
        };
        return Ok(EvaluatedArgument::constant(
            Some(TypeSig::String),
            ConstantValue::String(x + &y),
            location.clone(),
        ));
    }

    if let (ConstantValue::Bool(x), ConstantValue::Bool(y)) = (a, b) {
        let value = match operator {
            BinaryOperator::BitOr => *x | *y,
            BinaryOperator::BitAnd => *x & *y,
            _ => return Err(invalid()),
        };
        return Ok(EvaluatedArgument::constant(
            Some(TypeSig::Primitive(PrimitiveType::Boolean)),
            ConstantValue::Bool(value),
            location.clone(),
        ));
    }

    let left_enum = left.ty.as_ref().filter(|t| conversions.enum_underlying(t).is_some());
    let right_enum = right.ty.as_ref().filter(|t| conversions.enum_underlying(t).is_some());
    let enum_result = match (left_enum, right_enum) {
        (Some(l), Some(r)) if conversions.is_identity(l, r) => {
            matches!(operator, BinaryOperator::BitOr | BinaryOperator::BitAnd).then(|| l.clone())
        }
        (Some(e), None) | (None, Some(e)) => {
            matches!(operator, BinaryOperator::Add | BinaryOperator::Subtract).then(|| e.clone())
        }
        (None, None) => None,
        _ => return Err(invalid()),
    };

    let operand_type = match &enum_result {
        Some(ty) => conversions.enum_underlying(ty).ok_or_else(invalid)?,
        None => promote(
            a.primitive_type().ok_or_else(invalid)?,
            b.primitive_type().ok_or_else(invalid)?,
        )
        .ok_or_else(invalid)?,
    };

    let value = if matches!(operand_type, PrimitiveType::Single | PrimitiveType::Double) {
        if matches!(operator, BinaryOperator::BitOr | BinaryOperator::BitAnd) {
            return Err(invalid());
        }
        let (x, y) = (a.as_f64().ok_or_else(invalid)?, b.as_f64().ok_or_else(invalid)?);
        let result = if operator == BinaryOperator::Add { x + y } else { x - y };
        convert_constant(&ConstantValue::R8(result), operand_type).ok_or_else(invalid)?
    } else {
        let (x, y) = (a.as_integer().ok_or_else(invalid)?, b.as_integer().ok_or_else(invalid)?);
        let result = match operator {
            BinaryOperator::BitOr => x | y,
            BinaryOperator::BitAnd => x & y,
            BinaryOperator::Add => x + y,
            BinaryOperator::Subtract => x - y,
        };
        let bitwise = matches!(operator, BinaryOperator::BitOr | BinaryOperator::BitAnd);
        let converted = if bitwise {
            ConstantValue::wrapping_integer(operand_type, result)
        } else {
            ConstantValue::from_integer(operand_type, result)
        };
        converted.ok_or_else(|| {
            error(
                DiagnosticCode::ErrConstOutOfRangeChecked,
                location,
                vec![result.to_string(), operand_type.keyword().to_string()],
            )
        })?
    };

    let ty = enum_result.or_else(|| Some(TypeSig::Primitive(operand_type)));
    Ok(EvaluatedArgument::constant(ty, value, location.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::symbols::{FieldDecl, SymbolTableBuilder, TypeDecl};

    fn table_with_enum() -> (SymbolTable, TypeSig) {
        let mut builder = SymbolTableBuilder::new("App", "App.dll");
        let targets = builder
            .add_type(None, TypeDecl::enumeration("N", "Targets", PrimitiveType::Int32))
            .unwrap();
        builder
            .add_field(targets, FieldDecl::enum_member("Class", ConstantValue::I4(4)))
            .unwrap();
        builder
            .add_field(targets, FieldDecl::enum_member("Method", ConstantValue::I4(64)))
            .unwrap();
        (builder.build(), TypeSig::named(targets))
    }

    fn eval(table: &SymbolTable, expression: &Expression) -> Result<EvaluatedArgument, Diagnostic> {
        LiteralEvaluator::new().evaluate(table, expression, &Location::none())
    }

    #[test]
    fn enum_members_combine_with_bit_or() {
        let (table, targets) = table_with_enum();
        let combined = eval(
            &table,
            &Expression::bit_or(
                Expression::member(targets.clone(), "Class"),
                Expression::member(targets.clone(), "Method"),
            ),
        )
        .unwrap();
        assert_eq!(combined.ty, Some(targets));
        assert_eq!(combined.value, ArgumentValue::Constant(ConstantValue::I4(68)));
    }

    #[test]
    fn checked_casts_reject_out_of_range_values() {
        let (table, _) = table_with_enum();
        let byte = TypeSig::Primitive(PrimitiveType::Byte);
        let ok = eval(&table, &Expression::cast(byte.clone(), Expression::int(255))).unwrap();
        assert_eq!(ok.value, ArgumentValue::Constant(ConstantValue::U1(255)));

        let err = eval(&table, &Expression::cast(byte, Expression::int(256))).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::ErrConstOutOfRangeChecked);
    }

    #[test]
    fn non_constants_are_rejected() {
        let (table, targets) = table_with_enum();
        let unknown = eval(&table, &Expression::Identifier("x".into())).unwrap_err();
        assert_eq!(unknown.code, DiagnosticCode::ErrNameNotInContext);
        assert_eq!(unknown.arguments, vec!["x".to_string()]);

        let call = eval(&table, &Expression::NonConstant("M()".into())).unwrap_err();
        assert_eq!(call.code, DiagnosticCode::ErrBadAttributeArgument);

        let missing = eval(&table, &Expression::member(targets, "Field")).unwrap_err();
        assert_eq!(missing.code, DiagnosticCode::ErrNoSuchMember);
    }

    #[test]
    fn arithmetic_and_concatenation() {
        let (table, _) = table_with_enum();
        let negative = eval(&table, &Expression::Negate(Box::new(Expression::int(5)))).unwrap();
        assert_eq!(negative.value, ArgumentValue::Constant(ConstantValue::I4(-5)));

        let joined = eval(
            &table,
            &Expression::Binary {
                operator: BinaryOperator::Add,
                left: Box::new(Expression::string("a")),
                right: Box::new(Expression::string("b")),
            },
        )
        .unwrap();
        assert_eq!(joined.value, ArgumentValue::Constant(ConstantValue::String("ab".into())));

        let overflow = eval(
            &table,
            &Expression::Binary {
                operator: BinaryOperator::Add,
                left: Box::new(Expression::int(i32::MAX)),
                right: Box::new(Expression::int(1)),
            },
        )
        .unwrap_err();
        assert_eq!(overflow.code, DiagnosticCode::ErrConstOutOfRangeChecked);
    }

    #[test]
    fn arrays_convert_their_elements() {
        let (table, _) = table_with_enum();
        let long = TypeSig::Primitive(PrimitiveType::Int64);
        let array = eval(
            &table,
            &Expression::ArrayCreation {
                element: long.clone(),
                elements: vec![Expression::int(1), Expression::int(2)],
            },
        )
        .unwrap();
        let ArgumentValue::Array { items, .. } = array.value else {
            panic!("expected an array");
        };
        assert_eq!(items[0].value, ArgumentValue::Constant(ConstantValue::I8(1)));
        assert_eq!(items[1].ty, Some(long));

        let bad = eval(
            &table,
            &Expression::ArrayCreation {
                element: TypeSig::int(),
                elements: vec![Expression::string("x")],
            },
        )
        .unwrap_err();
        assert_eq!(bad.code, DiagnosticCode::ErrNoImplicitConv);
    }
}
