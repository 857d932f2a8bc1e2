//! Custom-attribute blob encoding (ECMA-335 II.23.3).
//!
//! Encoding is a pure function of the [`CustomAttributeValue`]: the same value always produces
//! the same bytes, which is what allows the merge pass and the blob heap to compare instances
//! by content.
//!
//! ```text
//! CustomAttrib ::= Prolog(0x0001) FixedArg* NumNamed(u16) NamedArg*
//! NamedArg     ::= (FIELD | PROPERTY) FieldOrPropType SerString FixedArg
//! ```
//!
//! Fixed arguments are written untagged using their slot type. Values stored in an `object`
//! slot are preceded by the `FieldOrPropType` of their concrete type; a `null` object is
//! written as a null string (`0x0E 0xFF`).

use crate::{
    file::io::write_le,
    metadata::customattributes::types::{
        ConstantValue, CustomAttributeValue, NamedArgument, NamedArgumentKind, SerType,
        TypedConstant, TypedValue, SERIALIZATION_TYPE,
    },
    utils::{to_u32, write_ser_string, write_ser_units},
    Result,
};

/// The custom-attribute prolog, little endian.
pub const CUSTOM_ATTRIBUTE_PROLOG: u16 = 0x0001;

/// Encode a full custom-attribute blob.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a value does not fit its slot type, or if a count
/// or length exceeds what the format can express.
///
/// # Examples
///
/// ```rust
/// use cilattr::metadata::customattributes::{
///     encode_custom_attribute, CustomAttributeValue, TypedConstant,
/// };
///
/// let value = CustomAttributeValue {
///     fixed_args: vec![TypedConstant::string("Hi")],
///     named_args: vec![],
/// };
/// let blob = encode_custom_attribute(&value)?;
/// assert_eq!(blob, [0x01, 0x00, 0x02, b'H', b'i', 0x00, 0x00]);
/// # Ok::<(), cilattr::Error>(())
/// ```
pub fn encode_custom_attribute(value: &CustomAttributeValue) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(16);
    write_le(&mut buffer, CUSTOM_ATTRIBUTE_PROLOG);

    for argument in &value.fixed_args {
        encode_fixed_arg(argument, &mut buffer)?;
    }

    let count = u16::try_from(value.named_args.len()).map_err(|_| {
        malformed_error!(
            "Too many named arguments ({}) for a custom attribute",
            value.named_args.len()
        )
    })?;
    write_le(&mut buffer, count);

    for argument in &value.named_args {
        encode_named_arg(argument, &mut buffer)?;
    }

    Ok(buffer)
}

/// Encode one named argument.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the value does not fit its declared member type.
pub fn encode_named_arg(argument: &NamedArgument, buffer: &mut Vec<u8>) -> Result<()> {
    buffer.push(match argument.kind {
        NamedArgumentKind::Field => SERIALIZATION_TYPE::FIELD,
        NamedArgumentKind::Property => SERIALIZATION_TYPE::PROPERTY,
    });
    encode_field_or_prop_type(&argument.value.ty, buffer)?;
    write_ser_string(Some(&argument.name), buffer)?;
    encode_fixed_arg(&argument.value, buffer)
}

/// Encode a `FieldOrPropType`.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if an enum name is too long.
pub fn encode_field_or_prop_type(ty: &SerType, buffer: &mut Vec<u8>) -> Result<()> {
    buffer.push(ty.tag());
    match ty {
        SerType::Enum { name, .. } => write_ser_string(Some(name), buffer),
        SerType::SzArray(element) => encode_field_or_prop_type(element, buffer),
        _ => Ok(()),
    }
}

/// Encode a value according to its slot type, without a leading type tag.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the value does not fit the slot.
pub fn encode_fixed_arg(argument: &TypedConstant, buffer: &mut Vec<u8>) -> Result<()> {
    match (&argument.ty, &argument.value) {
        (SerType::Object, TypedValue::Boxed(inner)) => {
            if matches!(inner.ty, SerType::Object) {
                return Err(malformed_error!("An object slot cannot box another object"));
            }
            encode_field_or_prop_type(&inner.ty, buffer)?;
            encode_fixed_arg(inner, buffer)
        }
        (SerType::Object, TypedValue::Null) => {
            buffer.push(SERIALIZATION_TYPE::STRING);
            buffer.push(0xFF);
            Ok(())
        }
        (SerType::String | SerType::Type, TypedValue::Null) => {
            buffer.push(0xFF);
            Ok(())
        }
        (SerType::String, TypedValue::Primitive(ConstantValue::String(text))) => {
            write_ser_string(Some(text), buffer)
        }
        (SerType::String, TypedValue::Primitive(ConstantValue::WideString(text))) => {
            write_ser_units(text.as_slice(), buffer)
        }
        (SerType::Type, TypedValue::Type(name)) => write_ser_string(Some(name), buffer),
        (SerType::SzArray(_), TypedValue::Null) => {
            write_le(buffer, u32::MAX);
            Ok(())
        }
        (SerType::SzArray(element), TypedValue::Array(items)) => {
            write_le(buffer, to_u32(items.len())?);
            for item in items {
                if item.ty != **element {
                    return Err(malformed_error!(
                        "Array element of type {} in an array of {}",
                        item.ty,
                        element
                    ));
                }
                encode_fixed_arg(item, buffer)?;
            }
            Ok(())
        }
        (SerType::Enum { underlying, .. }, TypedValue::Enum(value) | TypedValue::Primitive(value)) => {
            let raw = value
                .as_integer()
                .and_then(|raw| ConstantValue::wrapping_integer(*underlying, raw))
                .ok_or_else(|| malformed_error!("Enum value {} is not integral", value))?;
            encode_primitive(&raw, buffer);
            Ok(())
        }
        (slot, TypedValue::Primitive(value)) if slot.primitive().is_some() => {
            if value.primitive_type() != slot.primitive() {
                return Err(malformed_error!(
                    "Value {} does not match slot type {}",
                    value,
                    slot
                ));
            }
            encode_primitive(value, buffer);
            Ok(())
        }
        (slot, value) => Err(malformed_error!(
            "Value {:?} cannot be stored in a slot of type {}",
            value,
            slot
        )),
    }
}

fn encode_primitive(value: &ConstantValue, buffer: &mut Vec<u8>) {
    match value {
        ConstantValue::Bool(v) => buffer.push(u8::from(*v)),
        ConstantValue::Char(v) | ConstantValue::U2(v) => write_le(buffer, *v),
        ConstantValue::I1(v) => write_le(buffer, *v),
        ConstantValue::U1(v) => write_le(buffer, *v),
        ConstantValue::I2(v) => write_le(buffer, *v),
        ConstantValue::I4(v) => write_le(buffer, *v),
        ConstantValue::U4(v) => write_le(buffer, *v),
        ConstantValue::I8(v) => write_le(buffer, *v),
        ConstantValue::U8(v) => write_le(buffer, *v),
        ConstantValue::R4(v) => write_le(buffer, *v),
        ConstantValue::R8(v) => write_le(buffer, *v),
        ConstantValue::Null | ConstantValue::String(_) | ConstantValue::WideString(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::typesystem::PrimitiveType;

    fn value(fixed: Vec<TypedConstant>, named: Vec<NamedArgument>) -> CustomAttributeValue {
        CustomAttributeValue {
            fixed_args: fixed,
            named_args: named,
        }
    }

    #[test]
    fn empty_attribute() {
        let blob = encode_custom_attribute(&value(vec![], vec![])).unwrap();
        assert_eq!(blob, [0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn compilation_relaxations() {
        let blob = encode_custom_attribute(&value(vec![TypedConstant::i4(8)], vec![])).unwrap();
        assert_eq!(blob, [0x01, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn runtime_compatibility_named_property() {
        let named = NamedArgument {
            kind: NamedArgumentKind::Property,
            name: "WrapNonExceptionThrows".to_string(),
            value: TypedConstant::bool(true),
        };
        let blob = encode_custom_attribute(&value(vec![], vec![named])).unwrap();

        let mut expected = vec![0x01, 0x00, 0x01, 0x00, 0x54, 0x02, 0x16];
        expected.extend_from_slice(b"WrapNonExceptionThrows");
        expected.push(0x01);
        assert_eq!(blob, expected);
    }

    #[test]
    fn bool_array() {
        let blob =
            encode_custom_attribute(&value(vec![TypedConstant::bool_array(&[false, true])], vec![]))
                .unwrap();
        assert_eq!(
            blob,
            [0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00]
        );
    }

    #[test]
    fn nulls() {
        let blob = encode_custom_attribute(&value(
            vec![
                TypedConstant::null(SerType::String),
                TypedConstant::null(SerType::SzArray(Box::new(SerType::I4))),
                TypedConstant::null(SerType::Object),
            ],
            vec![],
        ))
        .unwrap();
        assert_eq!(
            blob,
            [0x01, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x0E, 0xFF, 0x00, 0x00]
        );
    }

    #[test]
    fn boxed_enum_carries_name() {
        let inner = TypedConstant::enum_value("E", PrimitiveType::Byte, ConstantValue::U1(3));
        let blob =
            encode_custom_attribute(&value(vec![TypedConstant::boxed(inner)], vec![])).unwrap();
        assert_eq!(blob, [0x01, 0x00, 0x55, 0x01, b'E', 0x03, 0x00, 0x00]);
    }

    #[test]
    fn mismatched_slot_is_malformed() {
        let bad = TypedConstant::new(
            SerType::I4,
            TypedValue::Primitive(ConstantValue::String("x".into())),
        );
        assert!(matches!(
            encode_custom_attribute(&value(vec![bad], vec![])),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn deterministic() {
        let v = value(
            vec![TypedConstant::string("Module1"), TypedConstant::type_name("C")],
            vec![],
        );
        assert_eq!(
            encode_custom_attribute(&v).unwrap(),
            encode_custom_attribute(&v.clone()).unwrap()
        );
    }
}
