//! Document module.
//!
//! Documents are ordered collections of `(field name, value)` pairs. They are
//! transient: built per insert, consumed by
//! [`IndexWriter::add_document`](crate::index::writer::IndexWriter::add_document)
//! and reconstructed by the stored-fields codecs on read.
//!
//! # Core Components
//!
//! - [`document::Document`] - The ordered field/value container
//! - [`field_value::FieldValue`] - The typed value of one field
//! - [`generator::DocumentGenerator`] - Synthetic documents for load testing
//!
//! # Examples
//!
//! ```
//! use pilum::document::document::Document;
//! use pilum::document::field_value::FieldValue;
//!
//! let doc = Document::builder()
//!     .add_integer("foo", 42)
//!     .add_float("d1", 0.5)
//!     .add_indexed_text("bar", "hello, world")
//!     .add_stored_text("content", "URL http://www.google.com")
//!     .build();
//!
//! assert_eq!(doc.len(), 4);
//! assert_eq!(doc.get("foo"), Some(&FieldValue::Integer(42)));
//! ```

pub mod document;
pub mod field_value;
pub mod generator;

pub use document::{Document, DocumentBuilder};
pub use field_value::FieldValue;
pub use generator::DocumentGenerator;
