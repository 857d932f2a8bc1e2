//! Structural type signatures.
//!
//! [`TypeSig`] is the shape the binder converts between and the synthesis engine flattens.
//! A constructed generic type keeps *all* of its type arguments in one list, outermost
//! containing type first: `Outer<A>.Inner<B, C>` is `Named { def: Inner, args: [A, B, C] }`.
//! That is the order both the reflection name and the dynamic transform flags use.

use strum::{EnumIter, IntoStaticStr};

use crate::metadata::symbols::SymbolId;

/// Built-in value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, IntoStaticStr, EnumIter)]
pub enum PrimitiveType {
    /// `bool`
    Boolean,
    /// `char`
    Char,
    /// `sbyte`
    SByte,
    /// `byte`
    Byte,
    /// `short`
    Int16,
    /// `ushort`
    UInt16,
    /// `int`
    Int32,
    /// `uint`
    UInt32,
    /// `long`
    Int64,
    /// `ulong`
    UInt64,
    /// `float`
    Single,
    /// `double`
    Double,
    /// `decimal`
    Decimal,
    /// `nint`
    IntPtr,
    /// `nuint`
    UIntPtr,
}

impl PrimitiveType {
    /// The C# keyword.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "bool",
            PrimitiveType::Char => "char",
            PrimitiveType::SByte => "sbyte",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Int16 => "short",
            PrimitiveType::UInt16 => "ushort",
            PrimitiveType::Int32 => "int",
            PrimitiveType::UInt32 => "uint",
            PrimitiveType::Int64 => "long",
            PrimitiveType::UInt64 => "ulong",
            PrimitiveType::Single => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::Decimal => "decimal",
            PrimitiveType::IntPtr => "nint",
            PrimitiveType::UIntPtr => "nuint",
        }
    }

    /// The `System` type name.
    #[must_use]
    pub fn full_name(self) -> String {
        let name: &'static str = self.into();
        format!("System.{name}")
    }

    /// `sbyte` through `ulong`.
    #[must_use]
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveType::SByte
                | PrimitiveType::Byte
                | PrimitiveType::Int16
                | PrimitiveType::UInt16
                | PrimitiveType::Int32
                | PrimitiveType::UInt32
                | PrimitiveType::Int64
                | PrimitiveType::UInt64
        )
    }

    /// Whether the value can appear in a custom-attribute blob.
    #[must_use]
    pub fn is_attribute_serializable(self) -> bool {
        !matches!(
            self,
            PrimitiveType::Decimal | PrimitiveType::IntPtr | PrimitiveType::UIntPtr
        )
    }
}

/// A type as it appears in a signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSig {
    /// `void`
    Void,
    /// A built-in value type
    Primitive(PrimitiveType),
    /// `string`
    String,
    /// `object`
    Object,
    /// `dynamic`: `object` at runtime, marked with `DynamicAttribute` flags
    Dynamic,
    /// A class, struct, interface, enum or delegate, possibly constructed
    Named {
        /// The type definition
        def: SymbolId,
        /// Type arguments, outermost containing type first
        args: Vec<TypeSig>,
    },
    /// Single-dimensional zero-based array
    SzArray(Box<TypeSig>),
    /// Multi-dimensional array
    Array {
        /// Element type
        element: Box<TypeSig>,
        /// Number of dimensions
        rank: u32,
    },
    /// Unmanaged pointer
    Pointer(Box<TypeSig>),
    /// A type parameter of a type or method
    TypeParameter(SymbolId),
}

impl TypeSig {
    /// `int`.
    #[must_use]
    pub fn int() -> Self {
        TypeSig::Primitive(PrimitiveType::Int32)
    }

    /// A non-generic named type.
    #[must_use]
    pub fn named(def: SymbolId) -> Self {
        TypeSig::Named {
            def,
            args: Vec::new(),
        }
    }

    /// A constructed generic type.
    #[must_use]
    pub fn generic(def: SymbolId, args: Vec<TypeSig>) -> Self {
        TypeSig::Named { def, args }
    }

    /// `element[]`.
    #[must_use]
    pub fn sz_array(element: TypeSig) -> Self {
        TypeSig::SzArray(Box::new(element))
    }

    /// `element*`.
    #[must_use]
    pub fn pointer(element: TypeSig) -> Self {
        TypeSig::Pointer(Box::new(element))
    }

    /// Whether `dynamic` occurs anywhere in the shape.
    #[must_use]
    pub fn contains_dynamic(&self) -> bool {
        match self {
            TypeSig::Dynamic => true,
            TypeSig::Named { args, .. } => args.iter().any(TypeSig::contains_dynamic),
            TypeSig::SzArray(element)
            | TypeSig::Array { element, .. }
            | TypeSig::Pointer(element) => element.contains_dynamic(),
            _ => false,
        }
    }

    /// The named definition, if this is a named type.
    #[must_use]
    pub fn definition(&self) -> Option<SymbolId> {
        match self {
            TypeSig::Named { def, .. } => Some(*def),
            _ => None,
        }
    }

    /// The element type of a single-dimensional array.
    #[must_use]
    pub fn sz_array_element(&self) -> Option<&TypeSig> {
        match self {
            TypeSig::SzArray(element) => Some(element),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_names() {
        assert_eq!(PrimitiveType::Int32.keyword(), "int");
        assert_eq!(PrimitiveType::Int32.full_name(), "System.Int32");
        assert_eq!(PrimitiveType::UIntPtr.full_name(), "System.UIntPtr");
        assert!(PrimitiveType::UInt64.is_integral());
        assert!(!PrimitiveType::Char.is_integral());
        assert!(!PrimitiveType::Decimal.is_attribute_serializable());
    }

    #[test]
    fn dynamic_detection() {
        let list = SymbolId::new(3);
        assert!(TypeSig::sz_array(TypeSig::Dynamic).contains_dynamic());
        assert!(TypeSig::generic(list, vec![TypeSig::Dynamic]).contains_dynamic());
        assert!(!TypeSig::generic(list, vec![TypeSig::Object]).contains_dynamic());
        assert!(!TypeSig::String.contains_dynamic());
    }
}
