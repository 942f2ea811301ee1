//! Field value types for documents.

use serde::{Deserialize, Serialize};

/// Represents a value for a field in a document.
///
/// Integer fields are the only numerically indexed type; every other value
/// is stored and returned verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// 32-bit signed integer, stored and range-indexed.
    Integer(i32),
    /// 64-bit floating point value, stored only.
    Float(f64),
    /// UTF-8 text, stored only.
    StoredText(String),
    /// UTF-8 text, stored and marked for indexing.
    IndexedText(String),
}

impl FieldValue {
    /// One-byte tag identifying the value type in the stored-fields format.
    pub fn type_tag(&self) -> u8 {
        match self {
            FieldValue::Integer(_) => 1,
            FieldValue::Float(_) => 2,
            FieldValue::StoredText(_) => 3,
            FieldValue::IndexedText(_) => 4,
        }
    }

    /// Get the integer value, if this is an integer field.
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the float value, if this is a float field.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the text, for either text flavour.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::StoredText(s) | FieldValue::IndexedText(s) => Some(s),
            _ => None,
        }
    }

    /// Whether the value is marked for indexing.
    pub fn is_indexed(&self) -> bool {
        matches!(self, FieldValue::Integer(_) | FieldValue::IndexedText(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(FieldValue::Integer(7).as_integer(), Some(7));
        assert_eq!(FieldValue::Integer(7).as_text(), None);
        assert_eq!(FieldValue::Float(1.5).as_float(), Some(1.5));
        assert_eq!(FieldValue::StoredText("a".into()).as_text(), Some("a"));
        assert_eq!(FieldValue::IndexedText("b".into()).as_text(), Some("b"));
    }

    #[test]
    fn test_type_tags_are_distinct() {
        let tags = [
            FieldValue::Integer(0).type_tag(),
            FieldValue::Float(0.0).type_tag(),
            FieldValue::StoredText(String::new()).type_tag(),
            FieldValue::IndexedText(String::new()).type_tag(),
        ];
        assert_eq!(tags, [1, 2, 3, 4]);
    }

    #[test]
    fn test_indexed_flag() {
        assert!(FieldValue::IndexedText("x".into()).is_indexed());
        assert!(!FieldValue::StoredText("x".into()).is_indexed());
        assert!(!FieldValue::Float(0.0).is_indexed());
    }
}
