//! Custom-attribute blob decoding (ECMA-335 II.23.3).
//!
//! The decoder is the inverse of [`crate::metadata::customattributes::encode_custom_attribute`].
//! Fixed arguments need their slot types up front (they come from the constructor signature);
//! named arguments carry their own `FieldOrPropType`. Enum names inside named arguments are
//! resolved to their underlying type through an optional resolver; unresolved enums are
//! assumed to be `int`-backed.
//!
//! Decoding is bounds-checked and depth-limited. A damaged blob yields
//! [`crate::Error::Malformed`], [`crate::Error::OutOfBounds`] or
//! [`crate::Error::RecursionLimit`], never a panic.

use crate::{
    file::parser::Parser,
    metadata::{
        customattributes::types::{
            ConstantValue, CustomAttributeValue, NamedArgument, NamedArgumentKind, SerType,
            TypedConstant, TypedValue, SERIALIZATION_TYPE,
        },
        typesystem::PrimitiveType,
    },
    utils::decode_wtf8,
    Error, Result,
};

/// Maximum nesting of arrays and boxed values inside one blob.
const MAX_NESTING_DEPTH: usize = 32;

/// Maps an enum reflection name to its underlying integral type.
pub type EnumResolver<'r> = &'r dyn Fn(&str) -> Option<PrimitiveType>;

/// Decoder for one custom-attribute blob.
pub struct CustomAttributeDecoder<'a> {
    parser: Parser<'a>,
    depth: usize,
    enum_resolver: Option<EnumResolver<'a>>,
}

impl<'a> CustomAttributeDecoder<'a> {
    /// Create a decoder over `blob`.
    #[must_use]
    pub fn new(blob: &'a [u8]) -> Self {
        CustomAttributeDecoder {
            parser: Parser::new(blob),
            depth: 0,
            enum_resolver: None,
        }
    }

    /// Resolve enum names found in tagged values through `resolver`.
    #[must_use]
    pub fn with_enum_resolver(mut self, resolver: EnumResolver<'a>) -> Self {
        self.enum_resolver = Some(resolver);
        self
    }

    /// Decode the blob, reading one fixed argument per entry of `fixed`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a bad prolog, an invalid tag, trailing data or
    /// invalid UTF-8; [`crate::Error::OutOfBounds`] for truncated data;
    /// [`crate::Error::RecursionLimit`] for excessively nested values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cilattr::metadata::customattributes::{CustomAttributeDecoder, SerType};
    ///
    /// let blob = [0x01, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00];
    /// let value = CustomAttributeDecoder::new(&blob).decode(&[SerType::I4])?;
    /// assert_eq!(value.fixed_args[0].as_integer(), Some(8));
    /// # Ok::<(), cilattr::Error>(())
    /// ```
    pub fn decode(&mut self, fixed: &[SerType]) -> Result<CustomAttributeValue> {
        let prolog = self.parser.read_le::<u16>()?;
        if prolog != 0x0001 {
            return Err(malformed_error!(
                "Invalid custom attribute prolog - expected 0x0001, found {:#06x}",
                prolog
            ));
        }

        let mut fixed_args = Vec::with_capacity(fixed.len());
        for ty in fixed {
            fixed_args.push(self.read_fixed_arg(ty)?);
        }

        let count = self.parser.read_le::<u16>()?;
        let mut named_args = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            named_args.push(self.read_named_arg()?);
        }

        if self.parser.has_more_data() {
            return Err(malformed_error!(
                "{} trailing bytes after custom attribute",
                self.parser.remaining()
            ));
        }

        Ok(CustomAttributeValue {
            fixed_args,
            named_args,
        })
    }

    fn read_named_arg(&mut self) -> Result<NamedArgument> {
        let kind = match self.parser.read_le::<u8>()? {
            SERIALIZATION_TYPE::FIELD => NamedArgumentKind::Field,
            SERIALIZATION_TYPE::PROPERTY => NamedArgumentKind::Property,
            other => {
                return Err(malformed_error!(
                    "Invalid named argument kind - {:#04x}",
                    other
                ))
            }
        };
        let ty = self.read_field_or_prop_type()?;
        let Some(name) = self.parser.read_ser_string()? else {
            return Err(malformed_error!("Named argument without a name"));
        };
        let value = self.read_fixed_arg(&ty)?;
        Ok(NamedArgument { kind, name, value })
    }

    fn read_field_or_prop_type(&mut self) -> Result<SerType> {
        let tag = self.parser.read_le::<u8>()?;
        Ok(match tag {
            SERIALIZATION_TYPE::BOOLEAN => SerType::Boolean,
            SERIALIZATION_TYPE::CHAR => SerType::Char,
            SERIALIZATION_TYPE::I1 => SerType::I1,
            SERIALIZATION_TYPE::U1 => SerType::U1,
            SERIALIZATION_TYPE::I2 => SerType::I2,
            SERIALIZATION_TYPE::U2 => SerType::U2,
            SERIALIZATION_TYPE::I4 => SerType::I4,
            SERIALIZATION_TYPE::U4 => SerType::U4,
            SERIALIZATION_TYPE::I8 => SerType::I8,
            SERIALIZATION_TYPE::U8 => SerType::U8,
            SERIALIZATION_TYPE::R4 => SerType::R4,
            SERIALIZATION_TYPE::R8 => SerType::R8,
            SERIALIZATION_TYPE::STRING => SerType::String,
            SERIALIZATION_TYPE::TYPE => SerType::Type,
            SERIALIZATION_TYPE::TAGGED_OBJECT => SerType::Object,
            SERIALIZATION_TYPE::ENUM => {
                let Some(name) = self.parser.read_ser_string()? else {
                    return Err(malformed_error!("Enum type without a name"));
                };
                let underlying = self
                    .enum_resolver
                    .and_then(|resolve| resolve(&name))
                    .unwrap_or(PrimitiveType::Int32);
                SerType::Enum { name, underlying }
            }
            SERIALIZATION_TYPE::SZARRAY => {
                self.enter()?;
                let element = self.read_field_or_prop_type()?;
                self.leave();
                SerType::SzArray(Box::new(element))
            }
            other => return Err(malformed_error!("Invalid serialization type - {:#04x}", other)),
        })
    }

    /// Strings are UTF-8, except that unpaired surrogates survive as three-byte sequences.
    fn string_constant(bytes: &[u8]) -> Result<ConstantValue> {
        if let Ok(text) = std::str::from_utf8(bytes) {
            return Ok(ConstantValue::String(text.to_string()));
        }
        decode_wtf8(bytes)
            .map(|units| ConstantValue::from_utf16(&units))
            .ok_or_else(|| malformed_error!("Invalid UTF-8 string of {} bytes", bytes.len()))
    }

    fn read_fixed_arg(&mut self, ty: &SerType) -> Result<TypedConstant> {
        let value = match ty {
            SerType::String => match self.parser.read_ser_bytes()? {
                Some(bytes) => TypedValue::Primitive(Self::string_constant(bytes)?),
                None => TypedValue::Null,
            },
            SerType::Type => match self.parser.read_ser_string()? {
                Some(name) => TypedValue::Type(name),
                None => TypedValue::Null,
            },
            SerType::Object => {
                self.enter()?;
                let inner_ty = self.read_field_or_prop_type()?;
                if matches!(inner_ty, SerType::Object) {
                    return Err(malformed_error!("An object slot cannot box another object"));
                }
                let inner = self.read_fixed_arg(&inner_ty)?;
                self.leave();
                if inner.ty == SerType::String && inner.is_null() {
                    TypedValue::Null
                } else {
                    TypedValue::Boxed(Box::new(inner))
                }
            }
            SerType::SzArray(element) => {
                let count = self.parser.read_le::<u32>()?;
                if count == u32::MAX {
                    TypedValue::Null
                } else {
                    let count = count as usize;
                    if count > self.parser.remaining() {
                        return Err(malformed_error!(
                            "Array of {} elements exceeds remaining {} bytes",
                            count,
                            self.parser.remaining()
                        ));
                    }
                    self.enter()?;
                    let mut items = Vec::with_capacity(count);
                    for _ in 0..count {
                        items.push(self.read_fixed_arg(element)?);
                    }
                    self.leave();
                    TypedValue::Array(items)
                }
            }
            SerType::Enum { underlying, .. } => TypedValue::Enum(self.read_primitive(*underlying)?),
            primitive => {
                let Some(kind) = primitive.primitive() else {
                    return Err(Error::NotSupported);
                };
                TypedValue::Primitive(self.read_primitive(kind)?)
            }
        };
        Ok(TypedConstant::new(ty.clone(), value))
    }

    fn read_primitive(&mut self, kind: PrimitiveType) -> Result<ConstantValue> {
        let parser = &mut self.parser;
        Ok(match kind {
            PrimitiveType::Boolean => ConstantValue::Bool(parser.read_le::<u8>()? != 0),
            PrimitiveType::Char => ConstantValue::Char(parser.read_le::<u16>()?),
            PrimitiveType::SByte => ConstantValue::I1(parser.read_le::<i8>()?),
            PrimitiveType::Byte => ConstantValue::U1(parser.read_le::<u8>()?),
            PrimitiveType::Int16 => ConstantValue::I2(parser.read_le::<i16>()?),
            PrimitiveType::UInt16 => ConstantValue::U2(parser.read_le::<u16>()?),
            PrimitiveType::Int32 => ConstantValue::I4(parser.read_le::<i32>()?),
            PrimitiveType::UInt32 => ConstantValue::U4(parser.read_le::<u32>()?),
            PrimitiveType::Int64 => ConstantValue::I8(parser.read_le::<i64>()?),
            PrimitiveType::UInt64 => ConstantValue::U8(parser.read_le::<u64>()?),
            PrimitiveType::Single => ConstantValue::R4(parser.read_le::<f32>()?),
            PrimitiveType::Double => ConstantValue::R8(parser.read_le::<f64>()?),
            other => {
                return Err(malformed_error!(
                    "{} cannot appear in a custom attribute",
                    other.full_name()
                ))
            }
        })
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(Error::RecursionLimit(MAX_NESTING_DEPTH));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

/// Decode `blob` with fixed slot types `fixed` and no enum resolver.
///
/// # Errors
/// See [`CustomAttributeDecoder::decode`].
pub fn decode_custom_attribute(blob: &[u8], fixed: &[SerType]) -> Result<CustomAttributeValue> {
    CustomAttributeDecoder::new(blob).decode(fixed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::customattributes::encode_custom_attribute;

    #[test]
    fn bad_prolog() {
        let result = CustomAttributeDecoder::new(&[0x02, 0x00]).decode(&[]);
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn truncated() {
        let result = decode_custom_attribute(&[0x01, 0x00, 0x08], &[SerType::I4]);
        assert!(matches!(result, Err(Error::OutOfBounds)));
    }

    #[test]
    fn trailing_data_rejected() {
        let result = decode_custom_attribute(&[0x01, 0x00, 0x00, 0x00, 0x00], &[]);
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn unpaired_surrogates_survive_a_round_trip() {
        let lone = ConstantValue::from_utf16(&[0x61, 0xD800, 0x62]);
        assert!(matches!(lone, ConstantValue::WideString(_)));
        let value = CustomAttributeValue {
            fixed_args: vec![TypedConstant::primitive(lone).unwrap()],
            named_args: vec![],
        };
        let blob = encode_custom_attribute(&value).unwrap();
        assert_eq!(blob, [0x01, 0x00, 0x05, 0x61, 0xED, 0xA0, 0x80, 0x62, 0x00, 0x00]);
        let decoded = decode_custom_attribute(&blob, &[SerType::String]).unwrap();
        assert_eq!(decoded, value);

        let broken = [0x01, 0x00, 0x02, 0xC3, 0x28, 0x00, 0x00];
        let result = decode_custom_attribute(&broken, &[SerType::String]);
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn huge_array_count_rejected() {
        let blob = [0x01, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00];
        let result = decode_custom_attribute(&blob, &[SerType::SzArray(Box::new(SerType::I4))]);
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn nested_array_types_are_depth_limited() {
        let mut blob = vec![0x01, 0x00, 0x01, 0x00, 0x53];
        blob.extend(std::iter::repeat(SERIALIZATION_TYPE::SZARRAY).take(MAX_NESTING_DEPTH + 2));
        blob.push(SERIALIZATION_TYPE::I4);
        let result = decode_custom_attribute(&blob, &[]);
        assert!(matches!(result, Err(Error::RecursionLimit(_))));
    }

    #[test]
    fn enum_resolver_is_consulted() {
        let value = CustomAttributeValue {
            fixed_args: vec![],
            named_args: vec![NamedArgument {
                kind: NamedArgumentKind::Field,
                name: "Kind".into(),
                value: TypedConstant::enum_value("My.E", PrimitiveType::Byte, ConstantValue::U1(7)),
            }],
        };
        let blob = encode_custom_attribute(&value).unwrap();

        let resolver = |name: &str| (name == "My.E").then_some(PrimitiveType::Byte);
        let decoded = CustomAttributeDecoder::new(&blob)
            .with_enum_resolver(&resolver)
            .decode(&[])
            .unwrap();
        assert_eq!(decoded, value);

        // Without the resolver the byte payload is read as an int and runs out of data.
        assert!(decode_custom_attribute(&blob, &[]).is_err());
    }

    #[test]
    fn null_object_round_trips() {
        let value = CustomAttributeValue {
            fixed_args: vec![
                TypedConstant::null(SerType::Object),
                TypedConstant::boxed(TypedConstant::string("s")),
                TypedConstant::boxed(TypedConstant::bool_array(&[true])),
            ],
            named_args: vec![],
        };
        let blob = encode_custom_attribute(&value).unwrap();
        let decoded =
            decode_custom_attribute(&blob, &[SerType::Object, SerType::Object, SerType::Object])
                .unwrap();
        assert_eq!(decoded, value);
    }
}
