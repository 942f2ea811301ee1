//! Per-document field serialization shared by both codecs.
//!
//! ```text
//! varint field_count
//! field_count × { varint name_len, name bytes, u8 tag, value }
//!   tag 1: i32 LE      tag 2: f64 LE
//!   tag 3/4: varint len + UTF-8 bytes (stored / indexed text)
//! ```

use crate::document::document::Document;
use crate::document::field_value::FieldValue;
use crate::error::{PilumError, Result};
use crate::storage::structured::{StructReader, StructWriter};

/// Serialize one document.
pub fn encode_document(doc: &Document) -> Result<Vec<u8>> {
    let mut writer = StructWriter::with_capacity(64);
    writer.write_varint(doc.len() as u64)?;

    for (name, value) in doc.iter() {
        writer.write_string(name)?;
        writer.write_u8(value.type_tag())?;
        match value {
            FieldValue::Integer(i) => writer.write_i32(*i)?,
            FieldValue::Float(f) => writer.write_f64(*f)?,
            FieldValue::StoredText(s) | FieldValue::IndexedText(s) => writer.write_string(s)?,
        }
    }

    Ok(writer.into_inner())
}

/// Deserialize one document; trailing bytes are corrupt data.
pub fn decode_document(bytes: &[u8]) -> Result<Document> {
    let mut reader = StructReader::new(bytes);
    let field_count = reader.read_varint()?;
    // Every field needs at least a name length byte and a tag.
    if field_count > (reader.remaining() / 2) as u64 {
        return Err(PilumError::corrupt(format!(
            "field count {field_count} exceeds document size"
        )));
    }

    let mut doc = Document::with_capacity(field_count as usize);
    for _ in 0..field_count {
        let name = reader.read_string()?;
        let value = match reader.read_u8()? {
            1 => FieldValue::Integer(reader.read_i32()?),
            2 => FieldValue::Float(reader.read_f64()?),
            3 => FieldValue::StoredText(reader.read_string()?),
            4 => FieldValue::IndexedText(reader.read_string()?),
            tag => {
                return Err(PilumError::corrupt(format!(
                    "unknown field type tag {tag} for field '{name}'"
                )));
            }
        };
        doc.add_field(name, value);
    }

    if !reader.is_eof() {
        return Err(PilumError::corrupt(format!(
            "{} trailing bytes after document",
            reader.remaining()
        )));
    }
    Ok(doc)
}
