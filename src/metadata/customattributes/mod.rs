//! Custom-attribute values and their blob format.
//!
//! Custom attributes are stored in metadata as a (parent, constructor, blob) triple. The blob
//! follows ECMA-335 II.23.3:
//! - **Prolog** - the `0x0001` marker
//! - **Fixed Arguments** - constructor arguments in parameter order, untagged
//! - **Named Arguments** - a `u16` count followed by tagged field and property assignments
//!
//! This module holds the value model ([`TypedConstant`], [`CustomAttributeValue`]), the
//! deterministic [`encode_custom_attribute`] encoder, the bounds-checked
//! [`CustomAttributeDecoder`], and the [`AttributeSignatureKey`] used to tell whether two
//! instances are identical.
//!
//! # Examples
//!
//! ```rust
//! use cilattr::metadata::customattributes::{
//!     decode_custom_attribute, encode_custom_attribute, CustomAttributeValue, SerType,
//!     TypedConstant,
//! };
//!
//! let value = CustomAttributeValue {
//!     fixed_args: vec![TypedConstant::bool_array(&[false, true])],
//!     named_args: vec![],
//! };
//! let blob = encode_custom_attribute(&value)?;
//! let ty = SerType::SzArray(Box::new(SerType::Boolean));
//! assert_eq!(decode_custom_attribute(&blob, &[ty])?, value);
//! # Ok::<(), cilattr::Error>(())
//! ```
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 23.3 - Custom Attributes

mod comparer;
mod encoder;
mod parser;
mod types;

pub use comparer::AttributeSignatureKey;
pub use encoder::{
    encode_custom_attribute, encode_field_or_prop_type, encode_fixed_arg, encode_named_arg,
    CUSTOM_ATTRIBUTE_PROLOG,
};
pub use parser::{decode_custom_attribute, CustomAttributeDecoder, EnumResolver};
pub use types::*;
