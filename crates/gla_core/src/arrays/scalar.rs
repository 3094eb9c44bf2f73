use std::fmt;

use gla_error::{DbError, Result};

use super::datatype::DataType;
use crate::values::ValueType;
use crate::values::macaddr::MacAddr;

/// A single value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Utf8(String),
    MacAddr(MacAddr),
}

/// A row of values, one per column.
pub type Row = Vec<ScalarValue>;

impl ScalarValue {
    pub const fn datatype(&self) -> DataType {
        match self {
            Self::Boolean(_) => DataType::Boolean,
            Self::Int8(_) => DataType::Int8,
            Self::Int16(_) => DataType::Int16,
            Self::Int32(_) => DataType::Int32,
            Self::Int64(_) => DataType::Int64,
            Self::UInt8(_) => DataType::UInt8,
            Self::UInt16(_) => DataType::UInt16,
            Self::UInt32(_) => DataType::UInt32,
            Self::UInt64(_) => DataType::UInt64,
            Self::Float32(_) => DataType::Float32,
            Self::Float64(_) => DataType::Float64,
            Self::Utf8(_) => DataType::Utf8,
            Self::MacAddr(_) => DataType::MacAddr,
        }
    }

    /// Parse a value of the given type from text.
    pub fn parse(datatype: DataType, text: &str) -> Result<Self> {
        Ok(match datatype {
            DataType::Boolean => bool::parse_text(text)?.into(),
            DataType::Int8 => i8::parse_text(text)?.into(),
            DataType::Int16 => i16::parse_text(text)?.into(),
            DataType::Int32 => i32::parse_text(text)?.into(),
            DataType::Int64 => i64::parse_text(text)?.into(),
            DataType::UInt8 => u8::parse_text(text)?.into(),
            DataType::UInt16 => u16::parse_text(text)?.into(),
            DataType::UInt32 => u32::parse_text(text)?.into(),
            DataType::UInt64 => u64::parse_text(text)?.into(),
            DataType::Float32 => f32::parse_text(text)?.into(),
            DataType::Float64 => f64::parse_text(text)?.into(),
            DataType::Utf8 => String::parse_text(text)?.into(),
            DataType::MacAddr => MacAddr::parse_text(text)?.into(),
        })
    }

    /// Stable hash of the contained value.
    pub fn hash_value(&self) -> u64 {
        match self {
            Self::Boolean(v) => v.hash_value(),
            Self::Int8(v) => v.hash_value(),
            Self::Int16(v) => v.hash_value(),
            Self::Int32(v) => v.hash_value(),
            Self::Int64(v) => v.hash_value(),
            Self::UInt8(v) => v.hash_value(),
            Self::UInt16(v) => v.hash_value(),
            Self::UInt32(v) => v.hash_value(),
            Self::UInt64(v) => v.hash_value(),
            Self::Float32(v) => v.hash_value(),
            Self::Float64(v) => v.hash_value(),
            Self::Utf8(v) => v.hash_value(),
            Self::MacAddr(v) => v.hash_value(),
        }
    }

    pub fn try_as_i64(&self) -> Result<i64> {
        Ok(match self {
            Self::Int8(v) => *v as i64,
            Self::Int16(v) => *v as i64,
            Self::Int32(v) => *v as i64,
            Self::Int64(v) => *v,
            Self::UInt8(v) => *v as i64,
            Self::UInt16(v) => *v as i64,
            Self::UInt32(v) => *v as i64,
            Self::UInt64(v) => i64::try_from(*v).map_err(|_| {
                DbError::new("Value too large for Int64").with_field("value", v)
            })?,
            other => {
                return Err(DbError::new("Value is not an integer")
                    .with_field("datatype", other.datatype()));
            }
        })
    }

    pub fn try_as_bool(&self) -> Result<bool> {
        match self {
            Self::Boolean(v) => Ok(*v),
            other => Err(DbError::new("Value is not a boolean")
                .with_field("datatype", other.datatype())),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int8(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::UInt8(v) => write!(f, "{v}"),
            Self::UInt16(v) => write!(f, "{v}"),
            Self::UInt32(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "{v}"),
            Self::MacAddr(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! impl_from_for_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for ScalarValue {
                fn from(value: $ty) -> Self {
                    ScalarValue::$variant(value)
                }
            }
        )*
    };
}

impl_from_for_scalar!(
    bool => Boolean,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    String => Utf8,
    MacAddr => MacAddr,
);

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Utf8(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_each_type() {
        assert_eq!(
            ScalarValue::Int32(-3),
            ScalarValue::parse(DataType::Int32, "-3").unwrap()
        );
        assert_eq!(
            ScalarValue::Utf8("abc".to_string()),
            ScalarValue::parse(DataType::Utf8, "abc").unwrap()
        );
        assert_eq!(
            ScalarValue::MacAddr(MacAddr::from_octets([0, 1, 2, 3, 4, 5])),
            ScalarValue::parse(DataType::MacAddr, "00:01:02:03:04:05").unwrap()
        );
        ScalarValue::parse(DataType::UInt8, "-1").unwrap_err();
    }

    #[test]
    fn display_matches_parse() {
        let v = ScalarValue::parse(DataType::Float64, "1.25").unwrap();
        assert_eq!("1.25", v.to_string());
    }

    #[test]
    fn as_i64() {
        assert_eq!(4, ScalarValue::UInt8(4).try_as_i64().unwrap());
        ScalarValue::UInt64(u64::MAX).try_as_i64().unwrap_err();
        ScalarValue::Boolean(true).try_as_i64().unwrap_err();
    }
}
