//! Little-endian primitive access for blob parsing.
//!
//! [`CilIO`] abstracts over the fixed-width primitives a custom-attribute blob may contain,
//! and [`read_le_at`] reads one of them from a slice while advancing an offset.

use crate::{Error::OutOfBounds, Result};

/// Fixed-width primitives with a little-endian byte representation.
pub trait CilIO: Sized {
    /// The byte array type for this primitive
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Read the value from its little-endian bytes
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Convert the value to its little-endian bytes
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_cil_io {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_cil_io!(
    u8 => 1, i8 => 1,
    u16 => 2, i16 => 2,
    u32 => 4, i32 => 4,
    u64 => 8, i64 => 8,
    f32 => 4, f64 => 8,
);

/// Read a `T` in little-endian order at `offset`, advancing `offset` past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes remain.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;
    Ok(T::from_le_bytes(read))
}

/// Append the little-endian bytes of `value` to `buffer`.
pub fn write_le<T>(buffer: &mut Vec<u8>, value: T)
where
    T: CilIO,
    T::Bytes: AsRef<[u8]>,
{
    buffer.extend_from_slice(value.to_le_bytes().as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_advances_offset() {
        let data = [0x01, 0x00, 0x02, 0x00, 0x00, 0x00];
        let mut offset = 0;
        assert_eq!(read_le_at::<u16>(&data, &mut offset).unwrap(), 1);
        assert_eq!(read_le_at::<u32>(&data, &mut offset).unwrap(), 2);
        assert_eq!(offset, 6);
        assert!(matches!(read_le_at::<u8>(&data, &mut offset), Err(OutOfBounds)));
    }

    #[test]
    fn write_floats() {
        let mut buffer = Vec::new();
        write_le(&mut buffer, 1.5_f32);
        write_le(&mut buffer, -1_i16);
        assert_eq!(buffer, vec![0x00, 0x00, 0xC0, 0x3F, 0xFF, 0xFF]);
    }
}
