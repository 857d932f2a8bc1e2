//! Implicit conversions between attribute argument types.
//!
//! Attribute arguments are constants, so only a small part of the language's conversion
//! rules matter here:
//! - identity, with `dynamic` and `object` treated as the same type
//! - implicit numeric widening, plus the constant-expression narrowing of `int` literals
//! - the `0` literal to any enum
//! - the `null` literal to reference types and `Nullable<T>`
//! - boxing and implicit reference conversions to base classes and implemented interfaces
//!
//! [`Conversions`] classifies an evaluated argument against a parameter type for overload
//! resolution and then produces the [`TypedConstant`] stored in the blob slot.

use crate::metadata::{
    binder::evaluator::{ArgumentValue, EvaluatedArgument},
    customattributes::{ConstantValue, SerType, TypedConstant, TypedValue},
    symbols::{SymbolTable, TypeKind},
    typesystem::{PrimitiveType, TypeSig},
};

/// Full name of `System.Nullable<T>`.
const SYSTEM_NULLABLE: &str = "System.Nullable`1";

/// How an argument converts to a parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionKind {
    /// Same type
    Identity,
    /// Widening between numeric types
    ImplicitNumeric,
    /// An `int` (or non-negative `long`) constant that fits the narrower target
    ImplicitConstant,
    /// The constant `0` to an enum
    EnumZero,
    /// The `null` literal
    NullLiteral,
    /// To a base class or an implemented interface of a reference type
    ImplicitReference,
    /// A value type to `object`, `System.ValueType`, `System.Enum` or an interface
    Boxing,
    /// A value type to `Nullable<T>`
    Nullable,
}

impl ConversionKind {
    /// Whether this is the identity conversion.
    #[must_use]
    pub fn is_identity(self) -> bool {
        self == ConversionKind::Identity
    }
}

/// Whether `from` widens to `to` without loss of magnitude.
#[must_use]
pub fn implicit_numeric(from: PrimitiveType, to: PrimitiveType) -> bool {
    use PrimitiveType::{
        Boolean, Byte, Char, Decimal, Double, Int16, Int32, Int64, IntPtr, SByte, Single, UInt16, UInt32,
        UInt64, UIntPtr,
    };

    match from {
        SByte => matches!(to, Int16 | Int32 | Int64 | IntPtr | Single | Double | Decimal),
        Byte => matches!(
            to,
            Int16 | UInt16 | Int32 | UInt32 | Int64 | UInt64 | IntPtr | UIntPtr | Single | Double
                | Decimal
        ),
        Int16 => matches!(to, Int32 | Int64 | IntPtr | Single | Double | Decimal),
        UInt16 | Char => matches!(
            to,
            Int32 | UInt32 | Int64 | UInt64 | IntPtr | UIntPtr | Single | Double | Decimal
        ) || (from == Char && to == UInt16),
        Int32 => matches!(to, Int64 | IntPtr | Single | Double | Decimal),
        UInt32 => matches!(to, Int64 | UInt64 | UIntPtr | Single | Double | Decimal),
        Int64 | UInt64 => matches!(to, Single | Double | Decimal),
        Single => to == Double,
        IntPtr => matches!(to, Int64 | Single | Double | Decimal),
        UIntPtr => matches!(to, UInt64 | Single | Double | Decimal),
        Boolean | Double | Decimal => false,
    }
}

/// Convert a constant to the primitive `to`, checking the range of integral targets.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn convert_constant(value: &ConstantValue, to: PrimitiveType) -> Option<ConstantValue> {
    match to {
        PrimitiveType::Boolean => value.as_bool().map(ConstantValue::Bool),
        PrimitiveType::Char => match value {
            ConstantValue::Char(c) => Some(ConstantValue::Char(*c)),
            other => ConstantValue::from_integer(PrimitiveType::Char, other.as_integer()?),
        },
        PrimitiveType::Single => value.as_f64().map(|v| ConstantValue::R4(v as f32)),
        PrimitiveType::Double => value.as_f64().map(ConstantValue::R8),
        other if other.is_integral() => ConstantValue::from_integer(other, value.as_integer()?),
        _ => None,
    }
}

/// Conversion rules over one symbol table.
pub struct Conversions<'a> {
    table: &'a SymbolTable,
}

impl<'a> Conversions<'a> {
    /// Conversions resolving named types through `table`.
    #[must_use]
    pub fn new(table: &'a SymbolTable) -> Self {
        Conversions { table }
    }

    /// Replace named references to `System.Int32`, `System.String` and `System.Object`
    /// with their keyword forms.
    #[must_use]
    pub fn normalize(&self, sig: &TypeSig) -> TypeSig {
        match sig {
            TypeSig::Dynamic => TypeSig::Object,
            TypeSig::Named { def, args } if args.is_empty() => {
                let name = self.table.type_full_name(*def);
                match name.as_str() {
                    "System.String" => TypeSig::String,
                    "System.Object" => TypeSig::Object,
                    _ => PRIMITIVES
                        .iter()
                        .find(|p| p.full_name() == name)
                        .map_or_else(|| sig.clone(), |p| TypeSig::Primitive(*p)),
                }
            }
            TypeSig::SzArray(element) => TypeSig::sz_array(self.normalize(element)),
            other => other.clone(),
        }
    }

    /// Whether `a` and `b` denote the same type.
    #[must_use]
    pub fn is_identity(&self, a: &TypeSig, b: &TypeSig) -> bool {
        a == b || self.normalize(a) == self.normalize(b)
    }

    /// Whether `sig` is a class, interface, delegate, array or `string`.
    #[must_use]
    pub fn is_reference_type(&self, sig: &TypeSig) -> bool {
        match self.normalize(sig) {
            TypeSig::String | TypeSig::Object | TypeSig::SzArray(_) | TypeSig::Array { .. } => {
                true
            }
            TypeSig::Named { def, .. } => self
                .table
                .get(def)
                .ok()
                .and_then(|s| s.as_type())
                .is_some_and(|t| {
                    matches!(t.kind, TypeKind::Class | TypeKind::Interface | TypeKind::Delegate)
                }),
            _ => false,
        }
    }

    /// Whether `sig` is a primitive, struct or enum.
    #[must_use]
    pub fn is_value_type(&self, sig: &TypeSig) -> bool {
        match self.normalize(sig) {
            TypeSig::Primitive(_) => true,
            TypeSig::Named { def, .. } => self
                .table
                .get(def)
                .ok()
                .and_then(|s| s.as_type())
                .is_some_and(|t| matches!(t.kind, TypeKind::Struct | TypeKind::Enum)),
            _ => false,
        }
    }

    /// The underlying type of an enum type.
    #[must_use]
    pub fn enum_underlying(&self, sig: &TypeSig) -> Option<PrimitiveType> {
        self.table.enum_underlying(sig.definition()?)
    }

    fn nullable_underlying<'s>(&self, sig: &'s TypeSig) -> Option<&'s TypeSig> {
        match sig {
            TypeSig::Named { args, .. } if self.table.is_named(sig, SYSTEM_NULLABLE) => args.first(),
            _ => None,
        }
    }

    /// Base classes and interfaces `sig` converts to by reference or boxing.
    fn supertypes(&self, sig: &TypeSig) -> Vec<TypeSig> {
        let sig = self.normalize(sig);
        let definition = match &sig {
            TypeSig::Primitive(p) => self.table.lookup_type(&p.full_name()),
            TypeSig::String => self.table.lookup_type("System.String"),
            TypeSig::Named { def, .. } => Some(*def),
            TypeSig::SzArray(_) | TypeSig::Array { .. } => self.table.lookup_type("System.Array"),
            TypeSig::Pointer(_) | TypeSig::Void => return Vec::new(),
            _ => None,
        };

        let mut found = vec![TypeSig::Object];
        if let Some(def) = definition {
            if matches!(sig, TypeSig::SzArray(_) | TypeSig::Array { .. }) {
                found.push(TypeSig::named(def));
            }
            let mut current = self
                .table
                .get(def)
                .ok()
                .and_then(|s| s.as_type())
                .and_then(|t| t.base.clone());
            let mut steps = 0;
            while let Some(base) = current {
                steps += 1;
                if steps > self.table.len() {
                    break;
                }
                current = base
                    .definition()
                    .and_then(|d| self.table.get(d).ok())
                    .and_then(|s| s.as_type())
                    .and_then(|t| t.base.clone());
                found.push(base);
            }
            found.extend(self.table.all_interfaces(def));
        }
        if self.is_value_type(&sig) {
            for name in ["System.ValueType", "System.Enum"] {
                if name == "System.Enum" && self.enum_underlying(&sig).is_none() {
                    continue;
                }
                if let Some(def) = self.table.lookup_type(name) {
                    found.push(TypeSig::named(def));
                }
            }
        }
        found
    }

    /// Whether a standard implicit conversion exists from a value of type `from` to `to`.
    ///
    /// This is the rule caller-info parameters are checked with: identity, numeric
    /// widening, `Nullable<T>` wrapping, boxing and implicit reference conversions. Constant
    /// narrowing is not part of it.
    #[must_use]
    pub fn standard_implicit(&self, from: &TypeSig, to: &TypeSig) -> bool {
        if self.is_identity(from, to) {
            return true;
        }
        let (from_n, to_n) = (self.normalize(from), self.normalize(to));
        if let (TypeSig::Primitive(p), TypeSig::Primitive(q)) = (&from_n, &to_n) {
            return implicit_numeric(*p, *q);
        }
        if let Some(underlying) = self.nullable_underlying(to) {
            if self.is_value_type(from) && self.nullable_underlying(from).is_none() {
                return self.standard_implicit(from, underlying);
            }
        }
        if let (TypeSig::SzArray(a), TypeSig::SzArray(b)) = (&from_n, &to_n) {
            return self.is_reference_type(a)
                && self.is_reference_type(b)
                && self.standard_implicit(a, b);
        }
        let source = self.nullable_underlying(from).cloned().unwrap_or(from_n);
        self.supertypes(&source)
            .iter()
            .any(|candidate| self.is_identity(candidate, to))
    }

    /// Classify the conversion of an evaluated argument to the parameter type `to`.
    #[must_use]
    pub fn classify(&self, argument: &EvaluatedArgument, to: &TypeSig) -> Option<ConversionKind> {
        let Some(from) = &argument.ty else {
            return (self.is_reference_type(to) || self.nullable_underlying(to).is_some())
                .then_some(ConversionKind::NullLiteral);
        };
        if self.is_identity(from, to) {
            return Some(ConversionKind::Identity);
        }

        let (from_n, to_n) = (self.normalize(from), self.normalize(to));
        if let (TypeSig::Primitive(p), TypeSig::Primitive(q)) = (&from_n, &to_n) {
            if implicit_numeric(*p, *q) {
                return Some(ConversionKind::ImplicitNumeric);
            }
        }

        if let ArgumentValue::Constant(value) = &argument.value {
            if let (TypeSig::Primitive(p), TypeSig::Primitive(q)) = (&from_n, &to_n) {
                let narrows = match p {
                    PrimitiveType::Int32 => q.is_integral(),
                    PrimitiveType::Int64 => *q == PrimitiveType::UInt64,
                    _ => false,
                };
                if narrows && convert_constant(value, *q).is_some() {
                    return Some(ConversionKind::ImplicitConstant);
                }
            }
            if matches!(from_n, TypeSig::Primitive(p) if p.is_integral())
                && value.as_integer() == Some(0)
                && self.enum_underlying(to).is_some()
            {
                return Some(ConversionKind::EnumZero);
            }
        }

        if self.nullable_underlying(to).is_some() && self.standard_implicit(from, to) {
            return Some(ConversionKind::Nullable);
        }
        if self.standard_implicit(from, to) {
            return Some(if self.is_value_type(from) {
                ConversionKind::Boxing
            } else {
                ConversionKind::ImplicitReference
            });
        }
        None
    }

    /// Whether target `a` is a better conversion target than `b`: `a` converts to `b` and
    /// not the other way around.
    #[must_use]
    pub fn is_better_target(&self, a: &TypeSig, b: &TypeSig) -> bool {
        !self.is_identity(a, b) && self.standard_implicit(a, b) && !self.standard_implicit(b, a)
    }

    /// The blob slot type of a parameter, field or property of type `sig`.
    ///
    /// Returns `None` for types a custom attribute cannot carry (`decimal`, structs,
    /// multi-dimensional and nested arrays, ...).
    #[must_use]
    pub fn slot_type(&self, sig: &TypeSig) -> Option<SerType> {
        match self.normalize(sig) {
            TypeSig::Primitive(p) => SerType::from_primitive(p),
            TypeSig::String => Some(SerType::String),
            TypeSig::Object => Some(SerType::Object),
            named @ TypeSig::Named { .. } => {
                if self.table.is_system_type(&named) {
                    Some(SerType::Type)
                } else {
                    let underlying = self.enum_underlying(&named)?;
                    Some(SerType::Enum {
                        name: self.table.serialized_type_name(&named),
                        underlying,
                    })
                }
            }
            TypeSig::SzArray(element) => match self.slot_type(&element)? {
                SerType::SzArray(_) => None,
                slot => Some(SerType::SzArray(Box::new(slot))),
            },
            _ => None,
        }
    }

    /// Store `argument` in a slot of parameter type `to`.
    #[must_use]
    pub fn to_typed_constant(&self, argument: &EvaluatedArgument, to: &TypeSig) -> Option<TypedConstant> {
        let slot = self.slot_type(to)?;
        self.value_in_slot(argument, &slot)
    }

    /// Store `argument` in a slot of the given slot type.
    #[must_use]
    pub fn value_in_slot(&self, argument: &EvaluatedArgument, slot: &SerType) -> Option<TypedConstant> {
        let is_null = matches!(&argument.value, ArgumentValue::Constant(ConstantValue::Null));
        match slot {
            SerType::Object => {
                if is_null {
                    return Some(TypedConstant::null(SerType::Object));
                }
                let natural = self.natural_slot(argument)?;
                if natural == SerType::Object {
                    return None;
                }
                let inner = self.value_in_slot(argument, &natural)?;
                Some(TypedConstant::boxed(inner))
            }
            SerType::String => match &argument.value {
                ArgumentValue::Constant(ConstantValue::Null) => Some(TypedConstant::null(SerType::String)),
                ArgumentValue::Constant(value) if value.is_string() => Some(TypedConstant::new(
                    SerType::String,
                    TypedValue::Primitive(value.clone()),
                )),
                _ => None,
            },
            SerType::Type => match &argument.value {
                ArgumentValue::Constant(ConstantValue::Null) => Some(TypedConstant::null(SerType::Type)),
                ArgumentValue::Type(sig) => Some(TypedConstant::type_name(
                    &self.table.serialized_type_name(sig),
                )),
                ArgumentValue::Constant(_) | ArgumentValue::Array { .. } => None,
            },
            SerType::SzArray(element) => match &argument.value {
                ArgumentValue::Constant(ConstantValue::Null) => Some(TypedConstant::null(slot.clone())),
                ArgumentValue::Array { items, .. } => {
                    let items = items
                        .iter()
                        .map(|item| self.value_in_slot(item, element))
                        .collect::<Option<Vec<_>>>()?;
                    Some(TypedConstant::new(slot.clone(), TypedValue::Array(items)))
                }
                _ => None,
            },
            SerType::Enum { underlying, .. } => match &argument.value {
                ArgumentValue::Constant(value) => {
                    let stored = ConstantValue::from_integer(*underlying, value.as_integer()?)?;
                    Some(TypedConstant::new(slot.clone(), TypedValue::Enum(stored)))
                }
                _ => None,
            },
            primitive => match &argument.value {
                ArgumentValue::Constant(value) => {
                    let stored = convert_constant(value, primitive.primitive()?)?;
                    Some(TypedConstant::new(slot.clone(), TypedValue::Primitive(stored)))
                }
                _ => None,
            },
        }
    }

    /// The slot type an argument has on its own, used when it is boxed into `object`.
    fn natural_slot(&self, argument: &EvaluatedArgument) -> Option<SerType> {
        match &argument.value {
            ArgumentValue::Type(_) => Some(SerType::Type),
            ArgumentValue::Array { element, .. } => {
                self.slot_type(&TypeSig::sz_array(element.clone()))
            }
            ArgumentValue::Constant(value) => {
                if let Some(ty) = &argument.ty {
                    if !matches!(self.normalize(ty), TypeSig::Object) {
                        return self.slot_type(ty);
                    }
                }
                if value.is_string() {
                    Some(SerType::String)
                } else {
                    SerType::from_primitive(value.primitive_type()?)
                }
            }
        }
    }
}

const PRIMITIVES: [PrimitiveType; 15] = [
    PrimitiveType::Boolean,
    PrimitiveType::Char,
    PrimitiveType::SByte,
    PrimitiveType::Byte,
    PrimitiveType::Int16,
    PrimitiveType::UInt16,
    PrimitiveType::Int32,
    PrimitiveType::UInt32,
    PrimitiveType::Int64,
    PrimitiveType::UInt64,
    PrimitiveType::Single,
    PrimitiveType::Double,
    PrimitiveType::Decimal,
    PrimitiveType::IntPtr,
    PrimitiveType::UIntPtr,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        symbols::{FieldDecl, SymbolTableBuilder, TypeDecl},
        syntax::Location,
    };

    fn constant(ty: TypeSig, value: ConstantValue) -> EvaluatedArgument {
        EvaluatedArgument::constant(Some(ty), value, Location::none())
    }

    #[test]
    fn numeric_widening() {
        assert!(implicit_numeric(PrimitiveType::Int32, PrimitiveType::Int64));
        assert!(implicit_numeric(PrimitiveType::Char, PrimitiveType::UInt16));
        assert!(implicit_numeric(PrimitiveType::Single, PrimitiveType::Double));
        assert!(!implicit_numeric(PrimitiveType::Int64, PrimitiveType::Int32));
        assert!(!implicit_numeric(PrimitiveType::Int32, PrimitiveType::UInt32));
        assert!(!implicit_numeric(PrimitiveType::Boolean, PrimitiveType::Int32));
    }

    #[test]
    fn constant_narrowing_and_enum_zero() {
        let mut builder = SymbolTableBuilder::new("App", "App.dll");
        let color = builder
            .add_type(None, TypeDecl::enumeration("N", "Color", PrimitiveType::Int32))
            .unwrap();
        builder
            .add_field(color, FieldDecl::enum_member("Red", ConstantValue::I4(1)))
            .unwrap();
        let table = builder.build();
        let conversions = Conversions::new(&table);
        let byte = TypeSig::Primitive(PrimitiveType::Byte);

        let small = constant(TypeSig::int(), ConstantValue::I4(200));
        assert_eq!(conversions.classify(&small, &byte), Some(ConversionKind::ImplicitConstant));
        let large = constant(TypeSig::int(), ConstantValue::I4(300));
        assert_eq!(conversions.classify(&large, &byte), None);

        let zero = constant(TypeSig::int(), ConstantValue::I4(0));
        let color_sig = TypeSig::named(color);
        assert_eq!(conversions.classify(&zero, &color_sig), Some(ConversionKind::EnumZero));
        assert_eq!(conversions.classify(&small, &color_sig), None);

        let slot = conversions.to_typed_constant(&zero, &color_sig).unwrap();
        assert_eq!(
            slot,
            TypedConstant::enum_value("N.Color", PrimitiveType::Int32, ConstantValue::I4(0))
        );
    }

    #[test]
    fn null_and_object_slots() {
        let table = SymbolTableBuilder::new("App", "App.dll").build();
        let conversions = Conversions::new(&table);
        let null = EvaluatedArgument::constant(None, ConstantValue::Null, Location::none());
        assert_eq!(conversions.classify(&null, &TypeSig::String), Some(ConversionKind::NullLiteral));
        assert_eq!(conversions.classify(&null, &TypeSig::int()), None);

        let one = constant(TypeSig::int(), ConstantValue::I4(1));
        assert_eq!(conversions.classify(&one, &TypeSig::Object), Some(ConversionKind::Boxing));
        assert_eq!(
            conversions.to_typed_constant(&one, &TypeSig::Object),
            Some(TypedConstant::boxed(TypedConstant::i4(1)))
        );
        assert_eq!(
            conversions.to_typed_constant(&null, &TypeSig::Object),
            Some(TypedConstant::null(SerType::Object))
        );
        assert_eq!(
            conversions.slot_type(&TypeSig::sz_array(TypeSig::sz_array(TypeSig::int()))),
            None
        );
        assert_eq!(conversions.slot_type(&TypeSig::Primitive(PrimitiveType::Decimal)), None);
    }

    #[test]
    fn better_target_prefers_narrower_type() {
        let table = SymbolTableBuilder::new("App", "App.dll").build();
        let conversions = Conversions::new(&table);
        let long = TypeSig::Primitive(PrimitiveType::Int64);
        assert!(conversions.is_better_target(&TypeSig::int(), &long));
        assert!(!conversions.is_better_target(&long, &TypeSig::int()));
        assert!(conversions.is_better_target(&TypeSig::String, &TypeSig::Object));
    }
}
