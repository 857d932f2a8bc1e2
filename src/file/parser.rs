//! Cursor-based reader for custom-attribute blobs.
//!
//! [`Parser`] keeps a position inside a byte slice and offers bounds-checked reads of the
//! primitives, compressed integers and `SerString`s that ECMA-335 II.23.3 blobs are made of.
//!
//! ```rust
//! use cilattr::Parser;
//!
//! let data = [0x01, 0x00, 0x03, b'a', b'b', b'c'];
//! let mut parser = Parser::new(&data);
//! assert_eq!(parser.read_le::<u16>()?, 1);
//! assert_eq!(parser.read_ser_string()?.as_deref(), Some("abc"));
//! assert!(!parser.has_more_data());
//! # Ok::<(), cilattr::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, CilIO},
    Error::OutOfBounds,
    Result,
};

/// A bounds-checked cursor over a blob.
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Total length of the underlying data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the underlying data is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether unread bytes remain.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Current position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Look at the next byte without consuming it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of the data.
    pub fn peek_byte(&self) -> Result<u8> {
        self.data.get(self.position).copied().ok_or(OutOfBounds)
    }

    /// Read a little-endian primitive.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit in the remaining data.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read a compressed unsigned integer (ECMA-335 II.23.2).
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the data ends early or
    /// [`crate::Error::Malformed`] for an invalid lead byte.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let first_byte = self.read_le::<u8>()?;

        // 1-byte encoding: 0xxxxxxx
        if (first_byte & 0x80) == 0 {
            return Ok(u32::from(first_byte));
        }

        // 2-byte encoding: 10xxxxxx xxxxxxxx
        if (first_byte & 0xC0) == 0x80 {
            let second_byte = self.read_le::<u8>()?;
            return Ok(((u32::from(first_byte) & 0x3F) << 8) | u32::from(second_byte));
        }

        // 4-byte encoding: 110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx
        if (first_byte & 0xE0) == 0xC0 {
            let b1 = u32::from(self.read_le::<u8>()?);
            let b2 = u32::from(self.read_le::<u8>()?);
            let b3 = u32::from(self.read_le::<u8>()?);
            return Ok(((u32::from(first_byte) & 0x1F) << 24) | (b1 << 16) | (b2 << 8) | b3);
        }

        Err(malformed_error!("Invalid compressed uint - {}", first_byte))
    }

    /// Read `length` raw bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self.position.checked_add(length).ok_or(OutOfBounds)?;
        if end > self.data.len() {
            return Err(OutOfBounds);
        }
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Read the raw bytes of a `SerString`, `None` for the null string.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated data.
    pub fn read_ser_bytes(&mut self) -> Result<Option<&'a [u8]>> {
        if self.peek_byte()? == 0xFF {
            self.position += 1;
            return Ok(None);
        }
        let length = self.read_compressed_uint()? as usize;
        self.read_bytes(length).map(Some)
    }

    /// Read a `SerString`: `0xFF` is the null string, otherwise a compressed length
    /// followed by UTF-8 bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated data or
    /// [`crate::Error::Malformed`] for invalid UTF-8.
    pub fn read_ser_string(&mut self) -> Result<Option<String>> {
        if self.peek_byte()? == 0xFF {
            self.position += 1;
            return Ok(None);
        }

        let length = self.read_compressed_uint()? as usize;
        let start = self.position;
        let bytes = self.read_bytes(length)?;
        String::from_utf8(bytes.to_vec()).map(Some).map_err(|e| {
            malformed_error!(
                "Invalid UTF-8 string at offset {}-{}: {}",
                start,
                start + length,
                e.utf8_error()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressed_uint_encodings() {
        let data = [0x7F, 0x80, 0x80, 0xC0, 0x00, 0x40, 0x00];
        let mut parser = Parser::new(&data);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x7F);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x80);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x4000);
        assert!(!parser.has_more_data());
    }

    #[test]
    fn invalid_compressed_lead_byte() {
        let mut parser = Parser::new(&[0xE0]);
        assert!(matches!(
            parser.read_compressed_uint(),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn ser_strings() {
        let data = [0xFF, 0x00, 0x02, b'h', b'i'];
        let mut parser = Parser::new(&data);
        assert_eq!(parser.read_ser_string().unwrap(), None);
        assert_eq!(parser.read_ser_string().unwrap().as_deref(), Some(""));
        assert_eq!(parser.read_ser_string().unwrap().as_deref(), Some("hi"));
    }

    #[test]
    fn truncated_string() {
        let mut parser = Parser::new(&[0x05, b'a']);
        assert!(matches!(parser.read_ser_string(), Err(OutOfBounds)));
    }

    #[test]
    fn invalid_utf8() {
        let mut parser = Parser::new(&[0x01, 0xC3]);
        assert!(matches!(
            parser.read_ser_string(),
            Err(crate::Error::Malformed { .. })
        ));
    }
}
