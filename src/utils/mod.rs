//! Shared low-level helpers.
//!
//! - [`write_compressed_uint`] / [`write_ser_string`] produce the ECMA-335 II.23.2 compressed
//!   integer and `SerString` encodings used inside custom-attribute blobs.
//! - [`to_u32`] performs checked narrowing for counts that end up in 32-bit table columns.
//! - [`encode_wtf8`] turns a UTF-16 string (possibly containing unpaired surrogates) into bytes
//!   for the metadata heaps and blobs without losing information; [`decode_wtf8`] reverses it.
//! - [`crypto`] computes file digests for the assembly file table.
//! - [`synchronization`] holds the at-most-once memo slot and the cancellation token.

pub(crate) mod crypto;
pub(crate) mod synchronization;

pub use synchronization::CancellationToken;

use crate::Result;

/// Largest value representable by the compressed unsigned integer encoding.
pub const MAX_COMPRESSED_UINT: u32 = 0x1FFF_FFFF;

/// Append `value` using the ECMA-335 compressed unsigned integer encoding.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if `value` exceeds [`MAX_COMPRESSED_UINT`].
pub fn write_compressed_uint(value: u32, buffer: &mut Vec<u8>) -> Result<()> {
    match value {
        0..=0x7F => {
            #[allow(clippy::cast_possible_truncation)]
            buffer.push(value as u8);
        }
        0x80..=0x3FFF => {
            #[allow(clippy::cast_possible_truncation)]
            buffer.extend_from_slice(&[0x80 | (value >> 8) as u8, value as u8]);
        }
        0x4000..=MAX_COMPRESSED_UINT => {
            #[allow(clippy::cast_possible_truncation)]
            buffer.extend_from_slice(&[
                0xC0 | (value >> 24) as u8,
                (value >> 16) as u8,
                (value >> 8) as u8,
                value as u8,
            ]);
        }
        _ => {
            return Err(malformed_error!(
                "Value {:#x} is too large for a compressed integer",
                value
            ))
        }
    }
    Ok(())
}

/// Append a `SerString`: `0xFF` for `None`, otherwise compressed length plus UTF-8 bytes.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the string is longer than the compressed encoding allows.
pub fn write_ser_string(value: Option<&str>, buffer: &mut Vec<u8>) -> Result<()> {
    match value {
        None => {
            buffer.push(0xFF);
            Ok(())
        }
        Some(text) => {
            write_compressed_uint(to_u32(text.len())?, buffer)?;
            buffer.extend_from_slice(text.as_bytes());
            Ok(())
        }
    }
}

/// Append a non-null `SerString` holding UTF-16 code units, unpaired surrogates included.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the encoded length does not fit a compressed integer.
pub fn write_ser_units(units: &[u16], buffer: &mut Vec<u8>) -> Result<()> {
    let bytes = encode_wtf8(units);
    write_compressed_uint(to_u32(bytes.len())?, buffer)?;
    buffer.extend_from_slice(&bytes);
    Ok(())
}

/// Checked conversion of a length or count into a `u32`.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if `value` does not fit.
pub fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| malformed_error!("Value {} does not fit into u32", value))
}

/// Generalized UTF-8 of a UTF-16 sequence.
///
/// Well-formed surrogate pairs become ordinary 4-byte UTF-8; an unpaired surrogate code unit is
/// written as the 3-byte sequence of its own code point, so no input is replaced or dropped.
#[must_use]
pub fn encode_wtf8(units: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(units.len());
    for decoded in char::decode_utf16(units.iter().copied()) {
        match decoded {
            Ok(ch) => {
                let mut buf = [0_u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
            Err(unpaired) => {
                let unit = unpaired.unpaired_surrogate();
                #[allow(clippy::cast_possible_truncation)]
                out.extend_from_slice(&[
                    0xE0 | (unit >> 12) as u8,
                    0x80 | ((unit >> 6) & 0x3F) as u8,
                    0x80 | (unit & 0x3F) as u8,
                ]);
            }
        }
    }
    out
}

/// Decode bytes written by [`encode_wtf8`] back into UTF-16 code units.
///
/// Three-byte sequences may encode surrogate code points. Returns `None` for anything else
/// that is not UTF-8: stray continuation bytes, overlong forms, truncated sequences.
#[must_use]
pub fn decode_wtf8(bytes: &[u8]) -> Option<Vec<u16>> {
    let continuation = |index: usize| -> Option<u32> {
        match bytes.get(index) {
            Some(byte) if byte & 0xC0 == 0x80 => Some(u32::from(byte & 0x3F)),
            _ => None,
        }
    };

    let mut units = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while let Some(&lead) = bytes.get(index) {
        let lead = u32::from(lead);
        let (code_point, width) = match lead {
            0x00..=0x7F => (lead, 1),
            0xC2..=0xDF => ((lead & 0x1F) << 6 | continuation(index + 1)?, 2),
            0xE0..=0xEF => {
                let cp = (lead & 0x0F) << 12 | continuation(index + 1)? << 6 | continuation(index + 2)?;
                if cp < 0x800 {
                    return None;
                }
                (cp, 3)
            }
            0xF0..=0xF4 => {
                let cp = (lead & 0x07) << 18
                    | continuation(index + 1)? << 12
                    | continuation(index + 2)? << 6
                    | continuation(index + 3)?;
                if !(0x1_0000..=0x10_FFFF).contains(&cp) {
                    return None;
                }
                (cp, 4)
            }
            _ => return None,
        };
        let ch = char::from_u32(code_point);
        match ch {
            Some(ch) => {
                let mut buf = [0_u16; 2];
                units.extend_from_slice(ch.encode_utf16(&mut buf));
            }
            // a lone surrogate code point
            None => units.push(u16::try_from(code_point).ok()?),
        }
        index += width;
    }
    Some(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressed_uint_widths() {
        let mut buffer = Vec::new();
        write_compressed_uint(0x03, &mut buffer).unwrap();
        write_compressed_uint(0x80, &mut buffer).unwrap();
        write_compressed_uint(0x3FFF, &mut buffer).unwrap();
        write_compressed_uint(0x4000, &mut buffer).unwrap();
        assert_eq!(
            buffer,
            vec![0x03, 0x80, 0x80, 0xBF, 0xFF, 0xC0, 0x00, 0x40, 0x00]
        );
    }

    #[test]
    fn compressed_uint_rejects_overflow() {
        let mut buffer = Vec::new();
        assert!(write_compressed_uint(0x2000_0000, &mut buffer).is_err());
        assert!(buffer.is_empty());
    }

    #[test]
    fn ser_string_null_and_empty() {
        let mut buffer = Vec::new();
        write_ser_string(None, &mut buffer).unwrap();
        write_ser_string(Some(""), &mut buffer).unwrap();
        write_ser_string(Some("ab"), &mut buffer).unwrap();
        assert_eq!(buffer, vec![0xFF, 0x00, 0x02, b'a', b'b']);
    }

    #[test]
    fn wtf8_keeps_unpaired_surrogates() {
        assert_eq!(encode_wtf8(&[0x0064, 0x0065]), b"de".to_vec());
        assert_eq!(encode_wtf8(&[0xD800]), vec![0xED, 0xA0, 0x80]);
        assert_eq!(encode_wtf8(&[0xD83D, 0xDE00]), "\u{1F600}".as_bytes().to_vec());
    }

    #[test]
    fn wtf8_decodes_what_it_encodes() {
        let cases: [&[u16]; 4] = [&[0x0064, 0x0065], &[0xD800], &[0x61, 0xDC00, 0x62], &[0xD83D, 0xDE00]];
        for units in cases {
            assert_eq!(decode_wtf8(&encode_wtf8(units)).as_deref(), Some(units));
        }
        assert_eq!(decode_wtf8(&[0x80]), None);
        assert_eq!(decode_wtf8(&[0xC0, 0xAF]), None);
        assert_eq!(decode_wtf8(&[0xE0, 0x80, 0xAF]), None);
        assert_eq!(decode_wtf8(&[0xED, 0xA0]), None);
    }
}
