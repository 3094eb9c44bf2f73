use gla_error::{DbError, Result};

use super::array::Array;
use super::datatype::DataType;
use super::scalar::{Row, ScalarValue};

/// A set of equal-length columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    arrays: Vec<Array>,
    num_rows: usize,
}

impl Batch {
    /// Create a batch from arrays, erroring if the arrays differ in length.
    pub fn try_new(arrays: impl IntoIterator<Item = Array>) -> Result<Self> {
        let arrays: Vec<_> = arrays.into_iter().collect();
        let num_rows = arrays.first().map(|a| a.len()).unwrap_or(0);

        for (idx, array) in arrays.iter().enumerate() {
            if array.len() != num_rows {
                return Err(DbError::new("Arrays in batch have different lengths")
                    .with_field("expected", num_rows)
                    .with_field("col_idx", idx)
                    .with_field("have", array.len()));
            }
        }

        Ok(Batch { arrays, num_rows })
    }

    /// Build a batch by copying rows into freshly allocated columns.
    pub fn try_from_rows<'a>(
        datatypes: &[DataType],
        rows: impl IntoIterator<Item = &'a [ScalarValue]>,
    ) -> Result<Self> {
        let mut arrays: Vec<_> = datatypes
            .iter()
            .map(|&datatype| Array::with_capacity(datatype, 0))
            .collect();

        let mut num_rows = 0;
        for row in rows {
            if row.len() != arrays.len() {
                return Err(DbError::new("Row has wrong number of columns")
                    .with_field("expected", arrays.len())
                    .with_field("have", row.len()));
            }
            for (array, value) in arrays.iter_mut().zip(row) {
                array.push_scalar(value)?;
            }
            num_rows += 1;
        }

        Ok(Batch { arrays, num_rows })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.arrays.len()
    }

    pub fn arrays(&self) -> &[Array] {
        &self.arrays
    }

    pub fn array(&self, idx: usize) -> Option<&Array> {
        self.arrays.get(idx)
    }

    pub fn datatypes(&self) -> impl ExactSizeIterator<Item = DataType> + '_ {
        self.arrays.iter().map(|a| a.datatype())
    }

    /// Copy out a single row.
    pub fn row(&self, idx: usize) -> Option<Row> {
        if idx >= self.num_rows {
            return None;
        }
        self.arrays.iter().map(|a| a.get(idx)).collect()
    }
}
