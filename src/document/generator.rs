//! Synthetic document generator for load testing.
//!
//! Every generated document carries the same four fields:
//!
//! | field | value |
//! |---|---|
//! | `foo` | random `i32`, range-indexed |
//! | `d1` | random `f64` in `[0, 1)` |
//! | `bar` | indexed text: a fixed multilingual sentence followed by `foo` |
//! | `content` | stored-only text with fixed URL-like content |

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::document::document::Document;

/// Integer field name.
pub const INT_FIELD: &str = "foo";
/// Float field name.
pub const FLOAT_FIELD: &str = "d1";
/// Indexed text field name.
pub const INDEXED_TEXT_FIELD: &str = "bar";
/// Stored-only text field name.
pub const STORED_TEXT_FIELD: &str = "content";

const TEXT_TEMPLATE: &str = "hello, world; 我们是中文呀! 我要去棉山旅游，身体健康，万事如意。请尽快联系，速回电，去吃饭！";
const URL_CONTENT: &str = "URL http://www.google.com; http://www.baidu.com";

/// Produces synthetic documents from a seedable RNG.
#[derive(Debug)]
pub struct DocumentGenerator {
    rng: StdRng,
}

impl DocumentGenerator {
    /// Create a generator; a fixed `seed` makes the sequence reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        DocumentGenerator { rng }
    }

    /// Generate the next document.
    pub fn generate(&mut self) -> Document {
        let key: i32 = self.rng.random();
        let d: f64 = self.rng.random();

        Document::builder()
            .add_integer(INT_FIELD, key)
            .add_float(FLOAT_FIELD, d)
            .add_indexed_text(INDEXED_TEXT_FIELD, format!("{TEXT_TEMPLATE}{key}"))
            .add_stored_text(STORED_TEXT_FIELD, URL_CONTENT)
            .build()
    }
}

impl Iterator for DocumentGenerator {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        Some(self.generate())
    }
}
