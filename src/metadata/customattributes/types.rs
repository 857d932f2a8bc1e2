//! Typed constants and custom-attribute values.
//!
//! These types are the shared vocabulary of the binder, the encoder and the decoder. A
//! [`TypedConstant`] pairs the static slot type ([`SerType`], the ECMA-335 II.23.3
//! `FieldOrPropType` vocabulary) with a [`TypedValue`]; the pair is what gets compared when
//! the merge pass decides whether two attribute instances are structurally identical.

use std::{
    borrow::Cow,
    fmt,
    hash::{Hash, Hasher},
};

use widestring::U16String;

use crate::metadata::typesystem::PrimitiveType;

/// .NET `CorSerializationType` constants as defined in corhdr.h
#[allow(non_snake_case, missing_docs)]
pub mod SERIALIZATION_TYPE {
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0A;
    pub const U8: u8 = 0x0B;
    pub const R4: u8 = 0x0C;
    pub const R8: u8 = 0x0D;
    pub const STRING: u8 = 0x0E;
    pub const SZARRAY: u8 = 0x1D;
    pub const TYPE: u8 = 0x50;
    pub const TAGGED_OBJECT: u8 = 0x51;
    pub const FIELD: u8 = 0x53;
    pub const PROPERTY: u8 = 0x54;
    pub const ENUM: u8 = 0x55;
}

/// A compile-time constant value.
///
/// Floating point values compare and hash by their bit pattern, so `NaN` equals itself and
/// `0.0` differs from `-0.0`, which is what blob identity needs.
#[derive(Debug, Clone)]
pub enum ConstantValue {
    /// The `null` literal
    Null,
    /// `bool`
    Bool(bool),
    /// `char` as a UTF-16 code unit
    Char(u16),
    /// `sbyte`
    I1(i8),
    /// `byte`
    U1(u8),
    /// `short`
    I2(i16),
    /// `ushort`
    U2(u16),
    /// `int`
    I4(i32),
    /// `uint`
    U4(u32),
    /// `long`
    I8(i64),
    /// `ulong`
    U8(u64),
    /// `float`
    R4(f32),
    /// `double`
    R8(f64),
    /// Non-null `string`
    String(String),
    /// Non-null `string` holding UTF-16 code units that are not valid Unicode (an unpaired
    /// surrogate). Strings that are valid Unicode always use [`ConstantValue::String`].
    WideString(U16String),
}

impl ConstantValue {
    /// A string constant from UTF-16 code units.
    #[must_use]
    pub fn from_utf16(units: &[u16]) -> Self {
        match String::from_utf16(units) {
            Ok(text) => ConstantValue::String(text),
            Err(_) => ConstantValue::WideString(U16String::from_vec(units.to_vec())),
        }
    }

    /// The primitive type of the value, `None` for `null` and strings.
    #[must_use]
    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        Some(match self {
            ConstantValue::Bool(_) => PrimitiveType::Boolean,
            ConstantValue::Char(_) => PrimitiveType::Char,
            ConstantValue::I1(_) => PrimitiveType::SByte,
            ConstantValue::U1(_) => PrimitiveType::Byte,
            ConstantValue::I2(_) => PrimitiveType::Int16,
            ConstantValue::U2(_) => PrimitiveType::UInt16,
            ConstantValue::I4(_) => PrimitiveType::Int32,
            ConstantValue::U4(_) => PrimitiveType::UInt32,
            ConstantValue::I8(_) => PrimitiveType::Int64,
            ConstantValue::U8(_) => PrimitiveType::UInt64,
            ConstantValue::R4(_) => PrimitiveType::Single,
            ConstantValue::R8(_) => PrimitiveType::Double,
            ConstantValue::Null | ConstantValue::String(_) | ConstantValue::WideString(_) => {
                return None
            }
        })
    }

    /// Integral (and `char`) values widened to `i128`.
    #[must_use]
    pub fn as_integer(&self) -> Option<i128> {
        Some(match self {
            ConstantValue::Char(v) => i128::from(*v),
            ConstantValue::I1(v) => i128::from(*v),
            ConstantValue::U1(v) => i128::from(*v),
            ConstantValue::I2(v) => i128::from(*v),
            ConstantValue::U2(v) => i128::from(*v),
            ConstantValue::I4(v) => i128::from(*v),
            ConstantValue::U4(v) => i128::from(*v),
            ConstantValue::I8(v) => i128::from(*v),
            ConstantValue::U8(v) => i128::from(*v),
            _ => return None,
        })
    }

    /// Numeric values as `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConstantValue::R4(v) => Some(f64::from(*v)),
            ConstantValue::R8(v) => Some(*v),
            other => other.as_integer().map(|v| v as f64),
        }
    }

    /// The string payload.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstantValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The string payload, replacing invalid code units.
    #[must_use]
    pub fn as_string_lossy(&self) -> Option<Cow<'_, str>> {
        match self {
            ConstantValue::String(s) => Some(Cow::Borrowed(s)),
            ConstantValue::WideString(w) => Some(Cow::Owned(w.to_string_lossy())),
            _ => None,
        }
    }

    /// The string payload as UTF-16 code units.
    #[must_use]
    pub fn to_utf16(&self) -> Option<Vec<u16>> {
        match self {
            ConstantValue::String(s) => Some(s.encode_utf16().collect()),
            ConstantValue::WideString(w) => Some(w.as_slice().to_vec()),
            _ => None,
        }
    }

    /// Whether this is a non-null string.
    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self, ConstantValue::String(_) | ConstantValue::WideString(_))
    }

    /// The boolean payload.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConstantValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether this is `null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, ConstantValue::Null)
    }

    /// Build a value of integral type `target` from `value`, if it is in range.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_integer(target: PrimitiveType, value: i128) -> Option<ConstantValue> {
        Some(match target {
            PrimitiveType::Char => ConstantValue::Char(u16::try_from(value).ok()?),
            PrimitiveType::SByte => ConstantValue::I1(i8::try_from(value).ok()?),
            PrimitiveType::Byte => ConstantValue::U1(u8::try_from(value).ok()?),
            PrimitiveType::Int16 => ConstantValue::I2(i16::try_from(value).ok()?),
            PrimitiveType::UInt16 => ConstantValue::U2(u16::try_from(value).ok()?),
            PrimitiveType::Int32 => ConstantValue::I4(i32::try_from(value).ok()?),
            PrimitiveType::UInt32 => ConstantValue::U4(u32::try_from(value).ok()?),
            PrimitiveType::Int64 => ConstantValue::I8(i64::try_from(value).ok()?),
            PrimitiveType::UInt64 => ConstantValue::U8(u64::try_from(value).ok()?),
            _ => return None,
        })
    }

    /// Reinterpret an integral value as `target`, wrapping like an unchecked cast.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn wrapping_integer(target: PrimitiveType, value: i128) -> Option<ConstantValue> {
        Some(match target {
            PrimitiveType::Char => ConstantValue::Char(value as u16),
            PrimitiveType::SByte => ConstantValue::I1(value as i8),
            PrimitiveType::Byte => ConstantValue::U1(value as u8),
            PrimitiveType::Int16 => ConstantValue::I2(value as i16),
            PrimitiveType::UInt16 => ConstantValue::U2(value as u16),
            PrimitiveType::Int32 => ConstantValue::I4(value as i32),
            PrimitiveType::UInt32 => ConstantValue::U4(value as u32),
            PrimitiveType::Int64 => ConstantValue::I8(value as i64),
            PrimitiveType::UInt64 => ConstantValue::U8(value as u64),
            _ => return None,
        })
    }

    fn discriminant(&self) -> u8 {
        match self {
            ConstantValue::Null => 0,
            ConstantValue::Bool(_) => 1,
            ConstantValue::Char(_) => 2,
            ConstantValue::I1(_) => 3,
            ConstantValue::U1(_) => 4,
            ConstantValue::I2(_) => 5,
            ConstantValue::U2(_) => 6,
            ConstantValue::I4(_) => 7,
            ConstantValue::U4(_) => 8,
            ConstantValue::I8(_) => 9,
            ConstantValue::U8(_) => 10,
            ConstantValue::R4(_) => 11,
            ConstantValue::R8(_) => 12,
            ConstantValue::String(_) => 13,
            ConstantValue::WideString(_) => 14,
        }
    }
}

impl PartialEq for ConstantValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConstantValue::R4(a), ConstantValue::R4(b)) => a.to_bits() == b.to_bits(),
            (ConstantValue::R8(a), ConstantValue::R8(b)) => a.to_bits() == b.to_bits(),
            (ConstantValue::String(a), ConstantValue::String(b)) => a == b,
            (ConstantValue::WideString(a), ConstantValue::WideString(b)) => a == b,
            (ConstantValue::Bool(a), ConstantValue::Bool(b)) => a == b,
            (ConstantValue::Null, ConstantValue::Null) => true,
            (a, b) => a.discriminant() == b.discriminant() && a.as_integer() == b.as_integer(),
        }
    }
}

impl Eq for ConstantValue {}

impl Hash for ConstantValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.discriminant().hash(state);
        match self {
            ConstantValue::R4(v) => v.to_bits().hash(state),
            ConstantValue::R8(v) => v.to_bits().hash(state),
            ConstantValue::String(s) => s.hash(state),
            ConstantValue::WideString(w) => w.as_slice().hash(state),
            ConstantValue::Bool(b) => b.hash(state),
            other => other.as_integer().hash(state),
        }
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Null => f.write_str("null"),
            ConstantValue::Bool(b) => write!(f, "{b}"),
            ConstantValue::Char(c) => match char::from_u32(u32::from(*c)) {
                Some(ch) => write!(f, "'{ch}'"),
                None => write!(f, "'\\u{c:04x}'"),
            },
            ConstantValue::R4(v) => write!(f, "{v}"),
            ConstantValue::R8(v) => write!(f, "{v}"),
            ConstantValue::String(s) => write!(f, "\"{s}\""),
            ConstantValue::WideString(w) => write!(f, "\"{}\"", w.to_string_lossy()),
            other => match other.as_integer() {
                Some(v) => write!(f, "{v}"),
                None => Ok(()),
            },
        }
    }
}

/// The static type of a custom-attribute slot (ECMA-335 II.23.3 `FieldOrPropType`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SerType {
    /// `bool`
    Boolean,
    /// `char`
    Char,
    /// `sbyte`
    I1,
    /// `byte`
    U1,
    /// `short`
    I2,
    /// `ushort`
    U2,
    /// `int`
    I4,
    /// `uint`
    U4,
    /// `long`
    I8,
    /// `ulong`
    U8,
    /// `float`
    R4,
    /// `double`
    R8,
    /// `string`
    String,
    /// `System.Type`
    Type,
    /// `object`: the value carries its own type tag
    Object,
    /// An enum, by reflection name, with its underlying integral type
    Enum {
        /// Reflection name of the enum type
        name: String,
        /// Underlying integral type
        underlying: PrimitiveType,
    },
    /// Single-dimensional array
    SzArray(Box<SerType>),
}

impl SerType {
    /// The slot type for a serializable primitive.
    #[must_use]
    pub fn from_primitive(primitive: PrimitiveType) -> Option<SerType> {
        Some(match primitive {
            PrimitiveType::Boolean => SerType::Boolean,
            PrimitiveType::Char => SerType::Char,
            PrimitiveType::SByte => SerType::I1,
            PrimitiveType::Byte => SerType::U1,
            PrimitiveType::Int16 => SerType::I2,
            PrimitiveType::UInt16 => SerType::U2,
            PrimitiveType::Int32 => SerType::I4,
            PrimitiveType::UInt32 => SerType::U4,
            PrimitiveType::Int64 => SerType::I8,
            PrimitiveType::UInt64 => SerType::U8,
            PrimitiveType::Single => SerType::R4,
            PrimitiveType::Double => SerType::R8,
            PrimitiveType::Decimal | PrimitiveType::IntPtr | PrimitiveType::UIntPtr => {
                return None
            }
        })
    }

    /// The primitive a primitive or enum slot stores.
    #[must_use]
    pub fn primitive(&self) -> Option<PrimitiveType> {
        Some(match self {
            SerType::Boolean => PrimitiveType::Boolean,
            SerType::Char => PrimitiveType::Char,
            SerType::I1 => PrimitiveType::SByte,
            SerType::U1 => PrimitiveType::Byte,
            SerType::I2 => PrimitiveType::Int16,
            SerType::U2 => PrimitiveType::UInt16,
            SerType::I4 => PrimitiveType::Int32,
            SerType::U4 => PrimitiveType::UInt32,
            SerType::I8 => PrimitiveType::Int64,
            SerType::U8 => PrimitiveType::UInt64,
            SerType::R4 => PrimitiveType::Single,
            SerType::R8 => PrimitiveType::Double,
            SerType::Enum { underlying, .. } => *underlying,
            SerType::String | SerType::Type | SerType::Object | SerType::SzArray(_) => {
                return None
            }
        })
    }

    /// The `SERIALIZATION_TYPE` tag of this slot type.
    #[must_use]
    pub fn tag(&self) -> u8 {
        match self {
            SerType::Boolean => SERIALIZATION_TYPE::BOOLEAN,
            SerType::Char => SERIALIZATION_TYPE::CHAR,
            SerType::I1 => SERIALIZATION_TYPE::I1,
            SerType::U1 => SERIALIZATION_TYPE::U1,
            SerType::I2 => SERIALIZATION_TYPE::I2,
            SerType::U2 => SERIALIZATION_TYPE::U2,
            SerType::I4 => SERIALIZATION_TYPE::I4,
            SerType::U4 => SERIALIZATION_TYPE::U4,
            SerType::I8 => SERIALIZATION_TYPE::I8,
            SerType::U8 => SERIALIZATION_TYPE::U8,
            SerType::R4 => SERIALIZATION_TYPE::R4,
            SerType::R8 => SERIALIZATION_TYPE::R8,
            SerType::String => SERIALIZATION_TYPE::STRING,
            SerType::Type => SERIALIZATION_TYPE::TYPE,
            SerType::Object => SERIALIZATION_TYPE::TAGGED_OBJECT,
            SerType::Enum { .. } => SERIALIZATION_TYPE::ENUM,
            SerType::SzArray(_) => SERIALIZATION_TYPE::SZARRAY,
        }
    }

    /// Whether `null` is a valid value for this slot.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            SerType::String | SerType::Type | SerType::Object | SerType::SzArray(_)
        )
    }
}

impl fmt::Display for SerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerType::String => f.write_str("string"),
            SerType::Type => f.write_str("System.Type"),
            SerType::Object => f.write_str("object"),
            SerType::Enum { name, .. } => f.write_str(name),
            SerType::SzArray(element) => write!(f, "{element}[]"),
            other => match other.primitive() {
                Some(primitive) => f.write_str(primitive.keyword()),
                None => Ok(()),
            },
        }
    }
}

/// The shape of a [`TypedConstant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypedConstantKind {
    /// Boolean, character, numeric or non-null string
    Primitive,
    /// Enum member or enum-typed integral value
    Enum,
    /// `typeof(..)`
    Type,
    /// Single-dimensional array
    Array,
    /// `null` of a reference slot
    Null,
}

/// The value half of a [`TypedConstant`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypedValue {
    /// `null` for a string, `System.Type`, array or `object` slot
    Null,
    /// Primitive or non-null string
    Primitive(ConstantValue),
    /// Enum value, stored as its underlying integral value
    Enum(ConstantValue),
    /// Reflection name of the referenced type
    Type(String),
    /// Array elements, each carrying the element slot type
    Array(Vec<TypedConstant>),
    /// A value stored in an `object` slot, carrying its own concrete type
    Boxed(Box<TypedConstant>),
}

/// A constant with its static slot type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypedConstant {
    /// Slot type
    pub ty: SerType,
    /// Value
    pub value: TypedValue,
}

impl TypedConstant {
    /// Pair a slot type with a value.
    #[must_use]
    pub fn new(ty: SerType, value: TypedValue) -> Self {
        TypedConstant { ty, value }
    }

    /// A primitive constant typed by its own value.
    ///
    /// Returns `None` for `null` (which needs a slot type) and for non-serializable values.
    #[must_use]
    pub fn primitive(value: ConstantValue) -> Option<Self> {
        let ty = match &value {
            ConstantValue::String(_) | ConstantValue::WideString(_) => SerType::String,
            ConstantValue::Null => return None,
            other => SerType::from_primitive(other.primitive_type()?)?,
        };
        Some(TypedConstant::new(ty, TypedValue::Primitive(value)))
    }

    /// A `bool`.
    #[must_use]
    pub fn bool(value: bool) -> Self {
        TypedConstant::new(SerType::Boolean, TypedValue::Primitive(ConstantValue::Bool(value)))
    }

    /// An `int`.
    #[must_use]
    pub fn i4(value: i32) -> Self {
        TypedConstant::new(SerType::I4, TypedValue::Primitive(ConstantValue::I4(value)))
    }

    /// A `uint`.
    #[must_use]
    pub fn u4(value: u32) -> Self {
        TypedConstant::new(SerType::U4, TypedValue::Primitive(ConstantValue::U4(value)))
    }

    /// A non-null string.
    #[must_use]
    pub fn string(value: &str) -> Self {
        TypedConstant::new(
            SerType::String,
            TypedValue::Primitive(ConstantValue::String(value.to_string())),
        )
    }

    /// `null` in a slot of type `ty`.
    #[must_use]
    pub fn null(ty: SerType) -> Self {
        TypedConstant::new(ty, TypedValue::Null)
    }

    /// `typeof(..)` by reflection name.
    #[must_use]
    pub fn type_name(name: &str) -> Self {
        TypedConstant::new(SerType::Type, TypedValue::Type(name.to_string()))
    }

    /// An enum value.
    #[must_use]
    pub fn enum_value(name: &str, underlying: PrimitiveType, value: ConstantValue) -> Self {
        TypedConstant::new(
            SerType::Enum {
                name: name.to_string(),
                underlying,
            },
            TypedValue::Enum(value),
        )
    }

    /// An array of `element` typed items.
    #[must_use]
    pub fn array(element: SerType, items: Vec<TypedConstant>) -> Self {
        TypedConstant::new(SerType::SzArray(Box::new(element)), TypedValue::Array(items))
    }

    /// `bool[]` with the given flags.
    #[must_use]
    pub fn bool_array(flags: &[bool]) -> Self {
        TypedConstant::array(
            SerType::Boolean,
            flags.iter().map(|flag| TypedConstant::bool(*flag)).collect(),
        )
    }

    /// `inner` stored in an `object` slot.
    #[must_use]
    pub fn boxed(inner: TypedConstant) -> Self {
        TypedConstant::new(SerType::Object, TypedValue::Boxed(Box::new(inner)))
    }

    /// The shape, looking through boxing.
    #[must_use]
    pub fn kind(&self) -> TypedConstantKind {
        match &self.value {
            TypedValue::Null => TypedConstantKind::Null,
            TypedValue::Primitive(_) => TypedConstantKind::Primitive,
            TypedValue::Enum(_) => TypedConstantKind::Enum,
            TypedValue::Type(_) => TypedConstantKind::Type,
            TypedValue::Array(_) => TypedConstantKind::Array,
            TypedValue::Boxed(inner) => inner.kind(),
        }
    }

    /// The primitive or enum value, looking through boxing.
    #[must_use]
    pub fn constant(&self) -> Option<&ConstantValue> {
        match &self.value {
            TypedValue::Primitive(value) | TypedValue::Enum(value) => Some(value),
            TypedValue::Boxed(inner) => inner.constant(),
            _ => None,
        }
    }

    /// The string payload.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.constant().and_then(ConstantValue::as_str)
    }

    /// The boolean payload.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        self.constant().and_then(ConstantValue::as_bool)
    }

    /// The integral payload.
    #[must_use]
    pub fn as_integer(&self) -> Option<i128> {
        self.constant().and_then(ConstantValue::as_integer)
    }

    /// Array elements.
    #[must_use]
    pub fn as_array(&self) -> Option<&[TypedConstant]> {
        match &self.value {
            TypedValue::Array(items) => Some(items),
            TypedValue::Boxed(inner) => inner.as_array(),
            _ => None,
        }
    }

    /// Whether the value is `null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self.value, TypedValue::Null)
    }
}

impl fmt::Display for TypedConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            TypedValue::Null => f.write_str("null"),
            TypedValue::Primitive(value) => write!(f, "{value}"),
            TypedValue::Enum(value) => write!(f, "({}){value}", self.ty),
            TypedValue::Type(name) => write!(f, "typeof({name})"),
            TypedValue::Array(items) => {
                f.write_str("{")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("}")
            }
            TypedValue::Boxed(inner) => write!(f, "{inner}"),
        }
    }
}

/// Whether a named argument assigns a field or a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NamedArgumentKind {
    /// `FIELD` (0x53)
    Field,
    /// `PROPERTY` (0x54)
    Property,
}

/// A named argument of an attribute instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedArgument {
    /// Field or property
    pub kind: NamedArgumentKind,
    /// Member name
    pub name: String,
    /// Assigned value; its `ty` is the member type
    pub value: TypedConstant,
}

/// The argument payload of an attribute instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CustomAttributeValue {
    /// Constructor arguments, in parameter order
    pub fixed_args: Vec<TypedConstant>,
    /// Named arguments, in assignment order
    pub named_args: Vec<NamedArgument>,
}

impl CustomAttributeValue {
    /// Look up a named argument by name.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&TypedConstant> {
        self.named_args
            .iter()
            .find(|argument| argument.name == name)
            .map(|argument| &argument.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_identity_is_bitwise() {
        assert_eq!(ConstantValue::R8(f64::NAN), ConstantValue::R8(f64::NAN));
        assert_ne!(ConstantValue::R4(0.0), ConstantValue::R4(-0.0));
        assert_ne!(ConstantValue::I4(1), ConstantValue::U4(1));
        assert_eq!(ConstantValue::I4(1), ConstantValue::I4(1));
    }

    #[test]
    fn utf16_strings_are_canonical() {
        let hello: Vec<u16> = "hi".encode_utf16().collect();
        assert_eq!(
            ConstantValue::from_utf16(&hello),
            ConstantValue::String("hi".into())
        );
        let lone = ConstantValue::from_utf16(&[0x61, 0xD800]);
        assert!(matches!(lone, ConstantValue::WideString(_)));
        assert_eq!(lone.to_utf16(), Some(vec![0x61, 0xD800]));
        assert!(lone.is_string());
    }

    #[test]
    fn integer_range_checks() {
        assert_eq!(
            ConstantValue::from_integer(PrimitiveType::Byte, 255),
            Some(ConstantValue::U1(255))
        );
        assert_eq!(ConstantValue::from_integer(PrimitiveType::Byte, 256), None);
        assert_eq!(ConstantValue::from_integer(PrimitiveType::UInt32, -1), None);
        assert_eq!(
            ConstantValue::wrapping_integer(PrimitiveType::UInt32, -1),
            Some(ConstantValue::U4(u32::MAX))
        );
    }

    #[test]
    fn boxed_differs_from_primitive() {
        let plain = TypedConstant::i4(5);
        let boxed = TypedConstant::boxed(TypedConstant::i4(5));
        assert_ne!(plain, boxed);
        assert_eq!(boxed.kind(), TypedConstantKind::Primitive);
        assert_eq!(boxed.as_integer(), Some(5));
    }

    #[test]
    fn kinds() {
        assert_eq!(TypedConstant::null(SerType::String).kind(), TypedConstantKind::Null);
        assert_eq!(TypedConstant::type_name("C").kind(), TypedConstantKind::Type);
        assert_eq!(TypedConstant::bool_array(&[true]).kind(), TypedConstantKind::Array);
        assert_eq!(
            TypedConstant::enum_value("E", PrimitiveType::Int32, ConstantValue::I4(1)).kind(),
            TypedConstantKind::Enum
        );
        assert_eq!(TypedConstant::primitive(ConstantValue::Null), None);
    }

    #[test]
    fn display() {
        assert_eq!(TypedConstant::string("Module1").to_string(), "\"Module1\"");
        assert_eq!(TypedConstant::bool_array(&[false, true]).to_string(), "{false, true}");
        assert_eq!(TypedConstant::type_name("C").to_string(), "typeof(C)");
        assert_eq!(SerType::SzArray(Box::new(SerType::I4)).to_string(), "int[]");
    }
}
