//! Token assignment for emitted definitions and referenced attribute constructors.
//!
//! Definitions are numbered in declaration order per table, with the synthesized marker
//! types and their constructors appended after the source definitions. TypeDef row 1 is
//! the `<Module>` type. References (TypeRef, MemberRef) are numbered after all of them are
//! known, in sorted order, so the numbering never depends on the order attributes were
//! visited in.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::{
    file::io::write_le,
    metadata::{
        customattributes::SerType,
        symbols::{SymbolData, SymbolId, SymbolTable},
        synthesis::{MarkerKind, MarkerTypeDefinition},
        token::{TableId, Token},
    },
    utils::{to_u32, write_compressed_uint},
    Result,
};

/// Owner of assembly attributes in a net-module, which has no Assembly row.
pub const ASSEMBLY_ATTRIBUTES_GO_HERE: &str =
    "System.Runtime.CompilerServices.AssemblyAttributesGoHere";

const SIG_HASTHIS: u8 = 0x20;
const ELEMENT_TYPE_VOID: u8 = 0x01;
const ELEMENT_TYPE_VALUETYPE: u8 = 0x11;
const ELEMENT_TYPE_CLASS: u8 = 0x12;
const ELEMENT_TYPE_OBJECT: u8 = 0x1C;
const ELEMENT_TYPE_SZARRAY: u8 = 0x1D;

/// Tokens of one synthesized marker type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerTokens {
    /// The TypeDef
    pub type_def: Token,
    /// The parameterless constructor
    pub constructor: Token,
    /// The `bool[]` constructor, if defined
    pub flags_constructor: Option<Token>,
}

/// Identity of a referenced constructor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberRefKey {
    /// Declaring class full name
    pub class: String,
    /// Parameter slot types, printed
    pub parameters: String,
}

impl MemberRefKey {
    /// The key of the constructor of `class` with parameter slots `parameters`.
    #[must_use]
    pub fn new(class: &str, parameters: &[SerType]) -> Self {
        MemberRefKey {
            class: class.to_string(),
            parameters: parameters
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

/// A MemberRef row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRefRow {
    /// Its token
    pub token: Token,
    /// The declaring TypeRef
    pub parent: Token,
    /// Always `.ctor`
    pub name: &'static str,
    /// Method signature blob
    pub signature: Vec<u8>,
}

/// Every token the emitter needs.
#[derive(Debug)]
pub struct TokenMap {
    definitions: HashMap<SymbolId, Token>,
    source_types: HashMap<String, Token>,
    markers: BTreeMap<MarkerKind, MarkerTokens>,
    type_refs: BTreeMap<String, Token>,
    member_refs: BTreeMap<MemberRefKey, MemberRefRow>,
}

impl TokenMap {
    /// Number the source definitions of `table`, then the marker `definitions`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a table outgrows a token.
    pub fn new(table: &SymbolTable, definitions: &[MarkerTypeDefinition]) -> Result<Self> {
        let mut next: HashMap<u8, u32> = HashMap::new();
        // row 1 of TypeDef is <Module>
        next.insert(TableId::TYPE_DEF, 1);
        let mut allocate = |table_id: u8| -> Token {
            let row = next.entry(table_id).or_insert(0);
            *row += 1;
            Token::from_parts(table_id, *row)
        };

        let mut map = TokenMap {
            definitions: HashMap::new(),
            source_types: HashMap::new(),
            markers: BTreeMap::new(),
            type_refs: BTreeMap::new(),
            member_refs: BTreeMap::new(),
        };
        for symbol in table.iter().filter(|s| s.is_source()) {
            let table_id = match &symbol.data {
                SymbolData::Assembly(_) => TableId::ASSEMBLY,
                SymbolData::Module => TableId::MODULE,
                SymbolData::Type(_) => TableId::TYPE_DEF,
                SymbolData::Method(_) => TableId::METHOD_DEF,
                SymbolData::Field(_) => TableId::FIELD,
                SymbolData::Property(_) => TableId::PROPERTY,
                SymbolData::Event(_) => TableId::EVENT,
                SymbolData::Parameter(_) | SymbolData::ReturnValue(_) => TableId::PARAM,
                SymbolData::TypeParameter(_) => TableId::GENERIC_PARAM,
            };
            let token = allocate(table_id);
            if table_id == TableId::TYPE_DEF {
                map.source_types.insert(table.type_full_name(symbol.id), token);
            }
            map.definitions.insert(symbol.id, token);
        }

        for definition in definitions {
            let type_def = allocate(TableId::TYPE_DEF);
            let constructor = allocate(TableId::METHOD_DEF);
            let flags_constructor = definition
                .has_flags_constructor
                .then(|| allocate(TableId::METHOD_DEF));
            map.markers.insert(
                definition.kind,
                MarkerTokens {
                    type_def,
                    constructor,
                    flags_constructor,
                },
            );
        }

        let rows = next.values().copied().max().unwrap_or(0);
        if rows > 0x00FF_FFFF {
            return Err(malformed_error!("Too many rows ({}) for a metadata token", rows));
        }
        Ok(map)
    }

    /// Number the TypeRefs and MemberRefs needed for `constructors` and the extra type
    /// names in `types`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a signature cannot be encoded.
    pub fn add_references<'a, I>(&mut self, constructors: I, types: &[&str]) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a [SerType])>,
    {
        let constructors: BTreeMap<MemberRefKey, (String, Vec<SerType>)> = constructors
            .into_iter()
            .map(|(class, parameters)| {
                (
                    MemberRefKey::new(class, parameters),
                    (class.to_string(), parameters.to_vec()),
                )
            })
            .collect();

        let mut names: BTreeSet<String> = types.iter().map(|t| (*t).to_string()).collect();
        for (class, parameters) in constructors.values() {
            names.insert(class.clone());
            for parameter in parameters {
                collect_type_names(parameter, &mut names);
            }
        }
        for name in names {
            if self.source_types.contains_key(&name) || self.type_refs.contains_key(&name) {
                continue;
            }
            let row = to_u32(self.type_refs.len() + 1)?;
            self.type_refs
                .insert(name, Token::from_parts(TableId::TYPE_REF, row));
        }

        for (key, (class, parameters)) in constructors {
            if self.member_refs.contains_key(&key) {
                continue;
            }
            let parent = self
                .type_token(&class)
                .ok_or_else(|| malformed_error!("No type token for {}", class))?;
            let signature = self.constructor_signature(&parameters)?;
            let row = to_u32(self.member_refs.len() + 1)?;
            self.member_refs.insert(
                key,
                MemberRefRow {
                    token: Token::from_parts(TableId::MEMBER_REF, row),
                    parent,
                    name: ".ctor",
                    signature,
                },
            );
        }
        Ok(())
    }

    /// The token of a source definition.
    #[must_use]
    pub fn definition(&self, id: SymbolId) -> Option<Token> {
        self.definitions.get(&id).copied()
    }

    /// Tokens of a synthesized marker type.
    #[must_use]
    pub fn marker(&self, kind: MarkerKind) -> Option<MarkerTokens> {
        self.markers.get(&kind).copied()
    }

    /// The TypeDef of a source type or the TypeRef of any other type, by full name.
    #[must_use]
    pub fn type_token(&self, full_name: &str) -> Option<Token> {
        self.source_types
            .get(full_name)
            .or_else(|| self.type_refs.get(full_name))
            .copied()
    }

    /// The MemberRef of a referenced constructor.
    #[must_use]
    pub fn member_ref(&self, class: &str, parameters: &[SerType]) -> Option<Token> {
        self.member_refs
            .get(&MemberRefKey::new(class, parameters))
            .map(|row| row.token)
    }

    /// All MemberRef rows in token order.
    #[must_use]
    pub fn member_refs(&self) -> Vec<&MemberRefRow> {
        let mut rows: Vec<&MemberRefRow> = self.member_refs.values().collect();
        rows.sort_by_key(|row| row.token);
        rows
    }

    /// All TypeRefs by name.
    #[must_use]
    pub fn type_refs(&self) -> &BTreeMap<String, Token> {
        &self.type_refs
    }

    /// `HASTHIS` instance constructor signature returning `void`.
    fn constructor_signature(&self, parameters: &[SerType]) -> Result<Vec<u8>> {
        let mut signature = vec![SIG_HASTHIS];
        write_compressed_uint(to_u32(parameters.len())?, &mut signature)?;
        signature.push(ELEMENT_TYPE_VOID);
        for parameter in parameters {
            self.encode_parameter(parameter, &mut signature)?;
        }
        Ok(signature)
    }

    fn encode_parameter(&self, ty: &SerType, buffer: &mut Vec<u8>) -> Result<()> {
        match ty {
            SerType::Object => buffer.push(ELEMENT_TYPE_OBJECT),
            SerType::SzArray(element) => {
                buffer.push(ELEMENT_TYPE_SZARRAY);
                self.encode_parameter(element, buffer)?;
            }
            SerType::Type => {
                buffer.push(ELEMENT_TYPE_CLASS);
                self.encode_type_def_or_ref("System.Type", buffer)?;
            }
            SerType::Enum { name, .. } => {
                buffer.push(ELEMENT_TYPE_VALUETYPE);
                self.encode_type_def_or_ref(name, buffer)?;
            }
            // primitives and string share their element type with the serialization tag
            other => buffer.push(other.tag()),
        }
        Ok(())
    }

    /// `TypeDefOrRef` coded index (ECMA-335 II.23.2.8).
    fn encode_type_def_or_ref(&self, name: &str, buffer: &mut Vec<u8>) -> Result<()> {
        let token = self
            .type_token(name)
            .ok_or_else(|| malformed_error!("No type token for {}", name))?;
        let tag = if token.table() == TableId::TYPE_DEF { 0 } else { 1 };
        write_compressed_uint((token.row() << 2) | tag, buffer)
    }
}

fn collect_type_names(ty: &SerType, names: &mut BTreeSet<String>) {
    match ty {
        SerType::Type => {
            names.insert("System.Type".to_string());
        }
        SerType::Enum { name, .. } => {
            names.insert(name.clone());
        }
        SerType::SzArray(element) => collect_type_names(element, names),
        _ => {}
    }
}

/// Little-endian `u32` of a token, as it appears in a table column.
#[must_use]
pub fn token_bytes(token: Token) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(4);
    write_le(&mut bytes, token.value());
    bytes
}
