use gla_error::{DbError, Result};

use super::datatype::DataType;
use super::scalar::ScalarValue;
use crate::values::ValueType;
use crate::values::macaddr::MacAddr;

/// Typed storage for a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum Array {
    Boolean(Vec<bool>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Utf8(Vec<String>),
    MacAddr(Vec<MacAddr>),
}

/// Run `$body` with `$values` bound to the typed vector inside an array.
macro_rules! with_values {
    ($array:expr, $values:ident => $body:expr) => {
        match $array {
            Array::Boolean($values) => $body,
            Array::Int8($values) => $body,
            Array::Int16($values) => $body,
            Array::Int32($values) => $body,
            Array::Int64($values) => $body,
            Array::UInt8($values) => $body,
            Array::UInt16($values) => $body,
            Array::UInt32($values) => $body,
            Array::UInt64($values) => $body,
            Array::Float32($values) => $body,
            Array::Float64($values) => $body,
            Array::Utf8($values) => $body,
            Array::MacAddr($values) => $body,
        }
    };
}

impl Array {
    /// Create an empty array of the given type.
    pub fn with_capacity(datatype: DataType, capacity: usize) -> Self {
        match datatype {
            DataType::Boolean => Array::Boolean(Vec::with_capacity(capacity)),
            DataType::Int8 => Array::Int8(Vec::with_capacity(capacity)),
            DataType::Int16 => Array::Int16(Vec::with_capacity(capacity)),
            DataType::Int32 => Array::Int32(Vec::with_capacity(capacity)),
            DataType::Int64 => Array::Int64(Vec::with_capacity(capacity)),
            DataType::UInt8 => Array::UInt8(Vec::with_capacity(capacity)),
            DataType::UInt16 => Array::UInt16(Vec::with_capacity(capacity)),
            DataType::UInt32 => Array::UInt32(Vec::with_capacity(capacity)),
            DataType::UInt64 => Array::UInt64(Vec::with_capacity(capacity)),
            DataType::Float32 => Array::Float32(Vec::with_capacity(capacity)),
            DataType::Float64 => Array::Float64(Vec::with_capacity(capacity)),
            DataType::Utf8 => Array::Utf8(Vec::with_capacity(capacity)),
            DataType::MacAddr => Array::MacAddr(Vec::with_capacity(capacity)),
        }
    }

    pub fn datatype(&self) -> DataType {
        match self {
            Array::Boolean(_) => DataType::Boolean,
            Array::Int8(_) => DataType::Int8,
            Array::Int16(_) => DataType::Int16,
            Array::Int32(_) => DataType::Int32,
            Array::Int64(_) => DataType::Int64,
            Array::UInt8(_) => DataType::UInt8,
            Array::UInt16(_) => DataType::UInt16,
            Array::UInt32(_) => DataType::UInt32,
            Array::UInt64(_) => DataType::UInt64,
            Array::Float32(_) => DataType::Float32,
            Array::Float64(_) => DataType::Float64,
            Array::Utf8(_) => DataType::Utf8,
            Array::MacAddr(_) => DataType::MacAddr,
        }
    }

    pub fn len(&self) -> usize {
        with_values!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        with_values!(self, v => v.capacity())
    }

    /// Reserve room for `additional` more values, erroring instead of
    /// aborting when the allocation can't be made.
    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        with_values!(self, v => v.try_reserve(additional)).map_err(|e| {
            DbError::with_source("Failed to reserve array capacity", Box::new(e))
                .with_field("additional", additional)
        })
    }

    /// Get the value at `idx` as a scalar.
    pub fn get(&self, idx: usize) -> Option<ScalarValue> {
        with_values!(self, v => v.get(idx).cloned().map(ValueType::into_scalar))
    }

    /// Append a single value, erroring if its type doesn't match.
    pub fn push_scalar(&mut self, value: &ScalarValue) -> Result<()> {
        fn push<T: ValueType>(values: &mut Vec<T>, value: &ScalarValue) -> Result<()> {
            let v = T::from_scalar(value).ok_or_else(|| {
                DbError::new("Cannot push value into array of a different type")
                    .with_field("array", T::DATATYPE)
                    .with_field("value", value.datatype())
            })?;
            values.push(v.clone());
            Ok(())
        }

        with_values!(self, v => push(v, value))
    }

    /// Move all values from `other` to the end of this array, leaving `other`
    /// empty.
    pub fn append(&mut self, other: &mut Array) -> Result<()> {
        fn append<T: ValueType>(values: &mut Vec<T>, other: &mut Array) -> Result<()> {
            let other_datatype = other.datatype();
            let other = T::downcast_array_mut(other).ok_or_else(|| {
                DbError::new("Cannot append arrays of different types")
                    .with_field("left", T::DATATYPE)
                    .with_field("right", other_datatype)
            })?;
            values.append(other);
            Ok(())
        }

        with_values!(self, v => append(v, other))
    }

    /// Copy all values from `other` to the end of this array.
    pub fn extend_from(&mut self, other: &Array) -> Result<()> {
        fn extend<T: ValueType>(values: &mut Vec<T>, other: &Array) -> Result<()> {
            values.extend_from_slice(other.try_as_slice::<T>()?);
            Ok(())
        }

        with_values!(self, v => extend(v, other))
    }

    /// Copy rows from equal-length `columns` into this array one row after
    /// another, so row `i` occupies `columns.len()` consecutive slots.
    ///
    /// Every column must have this array's type.
    pub fn extend_interleaved(&mut self, columns: &[Array]) -> Result<()> {
        fn interleave<T: ValueType>(values: &mut Vec<T>, columns: &[Array]) -> Result<()> {
            let slices = columns
                .iter()
                .map(|c| c.try_as_slice::<T>())
                .collect::<Result<Vec<_>>>()?;
            let num_rows = slices.first().map(|s| s.len()).unwrap_or(0);
            if let Some(idx) = slices.iter().position(|s| s.len() != num_rows) {
                return Err(DbError::new("Cannot interleave columns of different lengths")
                    .with_field("col_idx", idx));
            }

            values.reserve(num_rows * slices.len());
            for row in 0..num_rows {
                values.extend(slices.iter().map(|s| s[row].clone()));
            }
            Ok(())
        }

        with_values!(self, v => interleave(v, columns))
    }

    /// Borrow the typed values.
    pub fn try_as_slice<T: ValueType>(&self) -> Result<&[T]> {
        T::downcast_array(self).ok_or_else(|| {
            DbError::new("Array has unexpected type")
                .with_field("need", T::DATATYPE)
                .with_field("have", self.datatype())
        })
    }
}

impl<T: ValueType> From<Vec<T>> for Array {
    fn from(values: Vec<T>) -> Self {
        T::into_array(values)
    }
}
