//! Sorted numeric index for range queries over one integer field.
//!
//! Entries are `(value, ordinal)` pairs kept sorted by value, ties broken by
//! ordinal. A range query locates both cut points with binary search and
//! returns the ordinals in between: O(log n + k).

use serde::{Deserialize, Serialize};

use crate::error::{PilumError, Result};
use crate::storage::structured::{StructReader, StructWriter};

/// Bounds of a numeric range query. `None` leaves that side unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericRange {
    pub lower: Option<i32>,
    pub upper: Option<i32>,
    pub lower_inclusive: bool,
    pub upper_inclusive: bool,
}

impl NumericRange {
    /// Inclusive range `[lower, upper]`.
    pub fn new(lower: Option<i32>, upper: Option<i32>) -> Self {
        NumericRange {
            lower,
            upper,
            lower_inclusive: true,
            upper_inclusive: true,
        }
    }

    /// Range with explicit inclusivity flags.
    pub fn with_inclusivity(
        lower: Option<i32>,
        upper: Option<i32>,
        lower_inclusive: bool,
        upper_inclusive: bool,
    ) -> Self {
        NumericRange {
            lower,
            upper,
            lower_inclusive,
            upper_inclusive,
        }
    }

    /// Values strictly greater than `threshold`.
    pub fn greater_than(threshold: i32) -> Self {
        Self::with_inclusivity(Some(threshold), None, false, false)
    }

    /// Values greater than or equal to `threshold`.
    pub fn at_least(threshold: i32) -> Self {
        Self::new(Some(threshold), None)
    }

    /// Matches every value.
    pub fn all() -> Self {
        Self::new(None, None)
    }

    /// Whether `value` falls inside the range.
    pub fn contains(&self, value: i32) -> bool {
        let above = match self.lower {
            Some(lower) if self.lower_inclusive => value >= lower,
            Some(lower) => value > lower,
            None => true,
        };
        let below = match self.upper {
            Some(upper) if self.upper_inclusive => value <= upper,
            Some(upper) => value < upper,
            None => true,
        };
        above && below
    }
}

/// Sorted `(value, ordinal)` entries for one integer field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericIndex {
    /// Field name this index is built for.
    field: String,
    /// Sorted by value first, then by ordinal.
    entries: Vec<(i32, u64)>,
}

impl NumericIndex {
    /// Build an index from unsorted `(value, ordinal)` pairs.
    pub fn build<S: Into<String>>(field: S, mut entries: Vec<(i32, u64)>) -> Self {
        entries.sort_unstable();
        NumericIndex {
            field: field.into(),
            entries,
        }
    }

    /// Create an empty index.
    pub fn empty<S: Into<String>>(field: S) -> Self {
        Self::build(field, Vec::new())
    }

    /// Get the field name this index is built for.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Smallest and largest indexed value.
    pub fn min_max(&self) -> Option<(i32, i32)> {
        Some((self.entries.first()?.0, self.entries.last()?.0))
    }

    /// Ordinals whose value falls inside `range`, in ascending value order.
    ///
    /// Ties keep ascending ordinal order; callers that need pure ordinal
    /// order must sort the result.
    pub fn range_query(&self, range: &NumericRange) -> Vec<u64> {
        let start = match range.lower {
            Some(lower) if range.lower_inclusive => {
                self.entries.partition_point(|&(value, _)| value < lower)
            }
            Some(lower) => self.entries.partition_point(|&(value, _)| value <= lower),
            None => 0,
        };
        let end = match range.upper {
            Some(upper) if range.upper_inclusive => {
                self.entries.partition_point(|&(value, _)| value <= upper)
            }
            Some(upper) => self.entries.partition_point(|&(value, _)| value < upper),
            None => self.entries.len(),
        };

        if start >= end {
            return Vec::new();
        }
        self.entries[start..end]
            .iter()
            .map(|&(_, ordinal)| ordinal)
            .collect()
    }

    /// Serialize as: field name, u64 entry count, `(i32, u64)` entries.
    pub fn write_to(&self, writer: &mut StructWriter) -> Result<()> {
        writer.write_string(&self.field)?;
        writer.write_u64(self.entries.len() as u64)?;
        for &(value, ordinal) in &self.entries {
            writer.write_i32(value)?;
            writer.write_u64(ordinal)?;
        }
        Ok(())
    }

    /// Read an index written by [`write_to`](Self::write_to).
    ///
    /// Ordering is verified so that a corrupted region cannot produce
    /// silently wrong range results.
    pub fn read_from(reader: &mut StructReader<'_>) -> Result<Self> {
        let field = reader.read_string()?;
        let count = reader.read_u64()?;
        if count > (reader.remaining() / 12) as u64 {
            return Err(PilumError::corrupt(format!(
                "numeric index '{field}' claims {count} entries, region too short"
            )));
        }

        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let value = reader.read_i32()?;
            let ordinal = reader.read_u64()?;
            entries.push((value, ordinal));
        }
        if !entries.windows(2).all(|w| w[0] <= w[1]) {
            return Err(PilumError::corrupt(format!(
                "numeric index '{field}' is not sorted"
            )));
        }

        Ok(NumericIndex { field, entries })
    }

    /// Largest ordinal referenced, if any.
    pub fn max_ordinal(&self) -> Option<u64> {
        self.entries.iter().map(|&(_, ordinal)| ordinal).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_index() -> NumericIndex {
        // Ordinal i holds value (i * 7) % 10, so values repeat and are unsorted.
        let entries = (0..20u64).map(|i| (((i * 7) % 10) as i32, i)).collect();
        NumericIndex::build("foo", entries)
    }

    fn brute_force(index_values: &[(i32, u64)], range: &NumericRange) -> Vec<u64> {
        let mut ordinals: Vec<u64> = index_values
            .iter()
            .filter(|(value, _)| range.contains(*value))
            .map(|&(_, ordinal)| ordinal)
            .collect();
        ordinals.sort_unstable();
        ordinals
    }

    #[test]
    fn test_index_creation() {
        let index = create_test_index();
        assert_eq!(index.field(), "foo");
        assert_eq!(index.len(), 20);
        assert_eq!(index.min_max(), Some((0, 9)));
    }

    #[test]
    fn test_empty_index() {
        let index = NumericIndex::empty("foo");
        assert!(index.is_empty());
        assert!(index.range_query(&NumericRange::all()).is_empty());
        assert_eq!(index.min_max(), None);
    }

    #[test]
    fn test_result_is_in_value_order() {
        let index = create_test_index();
        let ordinals = index.range_query(&NumericRange::all());

        let values: Vec<i32> = ordinals.iter().map(|&o| ((o * 7) % 10) as i32).collect();
        let mut sorted = values.clone();
        sorted.sort_unstable();
        assert_eq!(values, sorted);
        // Ties keep ordinal order: value 0 is held by ordinals 0 and 10.
        assert_eq!(&ordinals[..2], &[0, 10]);
    }

    #[test]
    fn test_inclusivity_matches_brute_force() {
        let index = create_test_index();
        let raw: Vec<(i32, u64)> = (0..20u64).map(|i| (((i * 7) % 10) as i32, i)).collect();

        for lower in [None, Some(-1), Some(0), Some(3), Some(9), Some(10)] {
            for upper in [None, Some(-1), Some(0), Some(4), Some(9), Some(12)] {
                for lower_inclusive in [true, false] {
                    for upper_inclusive in [true, false] {
                        let range = NumericRange::with_inclusivity(
                            lower,
                            upper,
                            lower_inclusive,
                            upper_inclusive,
                        );
                        let mut got = index.range_query(&range);
                        got.sort_unstable();
                        assert_eq!(got, brute_force(&raw, &range), "range {range:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_inverted_bounds_are_empty() {
        let index = create_test_index();
        assert!(index.range_query(&NumericRange::new(Some(8), Some(2))).is_empty());
        assert!(
            index
                .range_query(&NumericRange::with_inclusivity(Some(5), Some(5), false, true))
                .is_empty()
        );
    }

    #[test]
    fn test_extreme_values() {
        let index = NumericIndex::build("foo", vec![(i32::MIN, 0), (i32::MAX, 1), (0, 2)]);
        assert_eq!(index.range_query(&NumericRange::greater_than(i32::MAX)), Vec::<u64>::new());
        assert_eq!(index.range_query(&NumericRange::at_least(i32::MAX)), vec![1]);
        assert_eq!(
            index.range_query(&NumericRange::new(None, Some(i32::MIN))),
            vec![0]
        );
    }

    #[test]
    fn test_serialization() {
        let index = create_test_index();
        let mut writer = StructWriter::new();
        index.write_to(&mut writer).unwrap();
        let bytes = writer.into_inner();

        let mut reader = StructReader::new(&bytes);
        let decoded = NumericIndex::read_from(&mut reader).unwrap();
        assert_eq!(decoded, index);
        assert_eq!(decoded.max_ordinal(), Some(19));
        assert!(reader.is_eof());
    }

    #[test]
    fn test_unsorted_region_is_corrupt() {
        let mut writer = StructWriter::new();
        writer.write_string("foo").unwrap();
        writer.write_u64(2).unwrap();
        writer.write_i32(5).unwrap();
        writer.write_u64(0).unwrap();
        writer.write_i32(1).unwrap();
        writer.write_u64(1).unwrap();
        let bytes = writer.into_inner();

        let result = NumericIndex::read_from(&mut StructReader::new(&bytes));
        assert!(matches!(
            result,
            Err(PilumError::CorruptData(_))
        ));
    }
}
