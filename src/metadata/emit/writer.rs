//! The binary table writer the emitter hands its rows to.

use std::collections::HashMap;

use widestring::U16String;

use crate::{
    file::parser::Parser,
    metadata::{
        token::{TableId, Token},
        wellknown::Version,
    },
    utils::{encode_wtf8, to_u32, write_compressed_uint},
    Result,
};

/// The identity columns of the Assembly row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssemblyRow {
    /// Simple name
    pub name: String,
    /// Four-part version
    pub version: Version,
    /// Culture as written, possibly with unpaired surrogates
    pub culture: U16String,
    /// `AssemblyHashAlgorithm` value
    pub hash_algorithm: u32,
    /// `AssemblyFlags` value
    pub flags: u32,
    /// Public key blob, empty when unsigned
    pub public_key: Vec<u8>,
}

/// Receives the rows produced by the emitter.
pub trait MetadataWriter {
    /// Append a custom-attribute row and return its 1-based row number.
    ///
    /// # Errors
    /// Returns an error if the row cannot be stored.
    fn add_custom_attribute_row(&mut self, owner: Token, constructor: Token, blob: &[u8])
        -> Result<u32>;

    /// Write the Assembly row.
    ///
    /// # Errors
    /// Returns an error if the row cannot be stored.
    fn add_assembly_row(&mut self, row: &AssemblyRow) -> Result<Token>;

    /// Record the content hash of the linked file at 1-based `file_index`.
    ///
    /// # Errors
    /// Returns an error if the row cannot be stored.
    fn add_file_hash_row(&mut self, file_index: u32, digest: &[u8]) -> Result<()>;
}

/// A stored custom-attribute row; `value` indexes the blob heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomAttributeRow {
    /// Owner token
    pub parent: Token,
    /// Constructor token
    pub constructor: Token,
    /// Blob heap index of the value
    pub value: u32,
}

/// A stored Assembly row; string and blob columns are heap indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredAssemblyRow {
    /// Version
    pub version: Version,
    /// String heap index of the name
    pub name: u32,
    /// String heap index of the culture, 0 when neutral
    pub culture: u32,
    /// Hash algorithm
    pub hash_algorithm: u32,
    /// Flags
    pub flags: u32,
    /// Blob heap index of the public key, 0 when unsigned
    pub public_key: u32,
}

/// A stored file hash row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHashRow {
    /// 1-based file index
    pub file_index: u32,
    /// Blob heap index of the digest
    pub hash: u32,
}

/// Append-only heap that stores every distinct entry once.
#[derive(Debug)]
struct Heap {
    data: Vec<u8>,
    offsets: HashMap<Vec<u8>, u32>,
}

impl Heap {
    fn new() -> Self {
        Heap {
            data: vec![0],
            offsets: HashMap::new(),
        }
    }

    fn intern(&mut self, encoded: Vec<u8>) -> Result<u32> {
        if let Some(offset) = self.offsets.get(&encoded) {
            return Ok(*offset);
        }
        let offset = to_u32(self.data.len())?;
        self.data.extend_from_slice(&encoded);
        self.offsets.insert(encoded, offset);
        Ok(offset)
    }
}

/// A [`MetadataWriter`] that keeps everything in memory, with deduplicating blob and string
/// heaps.
///
/// # Examples
///
/// ```rust
/// use cilattr::metadata::{emit::{InMemoryMetadataWriter, MetadataWriter}, token::Token};
///
/// let mut writer = InMemoryMetadataWriter::new();
/// writer.add_custom_attribute_row(Token::new(0x0200_0002), Token::new(0x0A00_0001), &[1, 0, 0, 0])?;
/// writer.add_custom_attribute_row(Token::new(0x0200_0003), Token::new(0x0A00_0001), &[1, 0, 0, 0])?;
/// let rows = writer.custom_attributes();
/// assert_eq!(rows[0].value, rows[1].value);
/// # Ok::<(), cilattr::Error>(())
/// ```
#[derive(Debug)]
pub struct InMemoryMetadataWriter {
    blobs: Heap,
    strings: Heap,
    custom_attributes: Vec<CustomAttributeRow>,
    assembly: Option<StoredAssemblyRow>,
    files: Vec<FileHashRow>,
}

impl Default for InMemoryMetadataWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMetadataWriter {
    /// An empty writer. Index 0 of both heaps is the empty entry.
    #[must_use]
    pub fn new() -> Self {
        InMemoryMetadataWriter {
            blobs: Heap::new(),
            strings: Heap::new(),
            custom_attributes: Vec::new(),
            assembly: None,
            files: Vec::new(),
        }
    }

    fn add_blob(&mut self, bytes: &[u8]) -> Result<u32> {
        if bytes.is_empty() {
            return Ok(0);
        }
        let mut encoded = Vec::with_capacity(bytes.len() + 4);
        write_compressed_uint(to_u32(bytes.len())?, &mut encoded)?;
        encoded.extend_from_slice(bytes);
        self.blobs.intern(encoded)
    }

    fn add_string(&mut self, bytes: &[u8]) -> Result<u32> {
        if bytes.is_empty() {
            return Ok(0);
        }
        let mut encoded = bytes.to_vec();
        encoded.push(0);
        self.strings.intern(encoded)
    }

    /// Custom-attribute rows in insertion order.
    #[must_use]
    pub fn custom_attributes(&self) -> &[CustomAttributeRow] {
        &self.custom_attributes
    }

    /// The Assembly row, once written.
    #[must_use]
    pub fn assembly(&self) -> Option<&StoredAssemblyRow> {
        self.assembly.as_ref()
    }

    /// File hash rows in insertion order.
    #[must_use]
    pub fn files(&self) -> &[FileHashRow] {
        &self.files
    }

    /// The blob stored at heap `index`, without its length prefix.
    #[must_use]
    pub fn blob(&self, index: u32) -> Option<&[u8]> {
        let start = index as usize;
        if start == 0 {
            return Some(&[]);
        }
        let mut parser = Parser::new(self.blobs.data.get(start..)?);
        let length = parser.read_compressed_uint().ok()? as usize;
        let header = parser.pos();
        self.blobs.data.get(start + header..start + header + length)
    }

    /// The string stored at heap `index`, without its terminator.
    #[must_use]
    pub fn string(&self, index: u32) -> Option<&[u8]> {
        let rest = self.strings.data.get(index as usize..)?;
        let end = rest.iter().position(|b| *b == 0)?;
        Some(&rest[..end])
    }

    /// Size of the blob heap in bytes.
    #[must_use]
    pub fn blob_heap_size(&self) -> usize {
        self.blobs.data.len()
    }
}

impl MetadataWriter for InMemoryMetadataWriter {
    fn add_custom_attribute_row(
        &mut self,
        owner: Token,
        constructor: Token,
        blob: &[u8],
    ) -> Result<u32> {
        let value = self.add_blob(blob)?;
        self.custom_attributes.push(CustomAttributeRow {
            parent: owner,
            constructor,
            value,
        });
        to_u32(self.custom_attributes.len())
    }

    fn add_assembly_row(&mut self, row: &AssemblyRow) -> Result<Token> {
        let name = self.add_string(row.name.as_bytes())?;
        let culture = self.add_string(&encode_wtf8(row.culture.as_slice()))?;
        let public_key = self.add_blob(&row.public_key)?;
        self.assembly = Some(StoredAssemblyRow {
            version: row.version,
            name,
            culture,
            hash_algorithm: row.hash_algorithm,
            flags: row.flags,
            public_key,
        });
        Ok(Token::from_parts(TableId::ASSEMBLY, 1))
    }

    fn add_file_hash_row(&mut self, file_index: u32, digest: &[u8]) -> Result<()> {
        let hash = self.add_blob(digest)?;
        self.files.push(FileHashRow { file_index, hash });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn culture_keeps_unpaired_surrogates() {
        let mut writer = InMemoryMetadataWriter::new();
        let culture = U16String::from_vec(vec![u16::from(b'e'), 0xD800, u16::from(b'n')]);
        writer
            .add_assembly_row(&AssemblyRow {
                name: "App".into(),
                culture,
                ..AssemblyRow::default()
            })
            .unwrap();
        let row = *writer.assembly().unwrap();
        assert_eq!(writer.string(row.culture).unwrap(), [b'e', 0xED, 0xA0, 0x80, b'n']);
        assert_eq!(writer.string(row.name).unwrap(), b"App");
        assert_eq!(row.public_key, 0);
    }

    #[test]
    fn blobs_round_trip_through_the_heap() {
        let mut writer = InMemoryMetadataWriter::new();
        let long: Vec<u8> = (0..200u8).collect();
        writer.add_file_hash_row(1, &long).unwrap();
        writer.add_file_hash_row(2, &[7, 7]).unwrap();
        let files = writer.files().to_vec();
        assert_eq!(writer.blob(files[0].hash).unwrap(), long.as_slice());
        assert_eq!(writer.blob(files[1].hash).unwrap(), [7, 7]);
        let size = writer.blob_heap_size();
        writer.add_file_hash_row(3, &[7, 7]).unwrap();
        assert_eq!(writer.blob_heap_size(), size);
    }
}
