//! Net-modules linked into the output assembly.

use crate::{
    metadata::{
        customattributes::{decode_custom_attribute, SerType},
        symbols::ImportedAttribute,
    },
    Result,
};

/// A pre-compiled net-module whose assembly-level attributes are merged into the output
/// assembly, and whose image is hashed into the File table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetModule {
    name: String,
    image: Vec<u8>,
    attributes: Vec<ImportedAttribute>,
}

impl NetModule {
    /// A module file named `name` with the given image bytes and no attributes.
    #[must_use]
    pub fn new(name: &str, image: Vec<u8>) -> Self {
        NetModule {
            name: name.to_string(),
            image,
            attributes: Vec::new(),
        }
    }

    /// Append an already decoded assembly attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: ImportedAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Append an assembly attribute stored as a custom-attribute blob, decoding it against
    /// the constructor's parameter slot types.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] if `blob` is not
    /// a valid value blob for `constructor`.
    pub fn add_encoded_attribute(
        &mut self,
        class: &str,
        constructor: Vec<SerType>,
        blob: &[u8],
    ) -> Result<()> {
        let value = decode_custom_attribute(blob, &constructor)?;
        self.attributes
            .push(ImportedAttribute::new(class, constructor, value));
        Ok(())
    }

    /// File name, also used in merge diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The module image as linked.
    #[must_use]
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    /// Assembly-level attributes in metadata order.
    #[must_use]
    pub fn attributes(&self) -> &[ImportedAttribute] {
        &self.attributes
    }
}
