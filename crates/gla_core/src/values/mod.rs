//! Capabilities required of the values stored in operator columns.

pub mod macaddr;

use std::fmt::{Debug, Display};
use std::str::FromStr;

use ahash::RandomState;
use gla_error::{Result, ResultExt};
use macaddr::MacAddr;

use crate::arrays::array::Array;
use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;

/// Fixed seeds so that hashes are stable across instances and processes.
pub const RANDOM_STATE: RandomState = RandomState::with_seeds(0, 0, 0, 0);

/// A column's scalar type.
///
/// Provides default construction and copies (via `Default` and `Clone`), a
/// text round trip (`FromStr`/`Display`), hashing, and the conversions needed
/// to move values between rows, columns and typed operator state.
pub trait ValueType:
    Default + Clone + PartialEq + Debug + Display + FromStr + Send + Sync + 'static
{
    /// The column type this value type backs.
    const DATATYPE: DataType;

    /// Borrow the value out of a scalar if the scalar holds this type.
    fn from_scalar(scalar: &ScalarValue) -> Option<&Self>;

    fn into_scalar(self) -> ScalarValue;

    /// Get the typed values of an array if the array holds this type.
    fn downcast_array(array: &Array) -> Option<&[Self]>;

    fn downcast_array_mut(array: &mut Array) -> Option<&mut Vec<Self>>;

    fn into_array(values: Vec<Self>) -> Array;

    /// Parse a value from its text form.
    fn parse_text(text: &str) -> Result<Self>;

    /// Stable 64-bit hash of the value.
    fn hash_value(&self) -> u64;
}

/// A value type with an explicit maximum.
///
/// `max_value` must be commutative and associative so running maximums can
/// be merged in any order.
pub trait MaxValue: ValueType {
    fn max_value(self, other: Self) -> Self;
}

macro_rules! impl_value_type {
    (@hash f32, $variant:ident) => {
        fn hash_value(&self) -> u64 {
            // -0.0 == 0.0, keep their hashes equal too.
            let v = if *self == 0.0 { 0.0_f32 } else { *self };
            RANDOM_STATE.hash_one(v.to_bits())
        }
    };
    (@hash f64, $variant:ident) => {
        fn hash_value(&self) -> u64 {
            let v = if *self == 0.0 { 0.0_f64 } else { *self };
            RANDOM_STATE.hash_one(v.to_bits())
        }
    };
    (@hash $ty:ident, $variant:ident) => {
        fn hash_value(&self) -> u64 {
            RANDOM_STATE.hash_one(self)
        }
    };
    ($ty:ident, $variant:ident) => {
        impl ValueType for $ty {
            const DATATYPE: DataType = DataType::$variant;

            fn from_scalar(scalar: &ScalarValue) -> Option<&Self> {
                match scalar {
                    ScalarValue::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn into_scalar(self) -> ScalarValue {
                ScalarValue::$variant(self)
            }

            fn downcast_array(array: &Array) -> Option<&[Self]> {
                match array {
                    Array::$variant(v) => Some(v.as_slice()),
                    _ => None,
                }
            }

            fn downcast_array_mut(array: &mut Array) -> Option<&mut Vec<Self>> {
                match array {
                    Array::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn into_array(values: Vec<Self>) -> Array {
                Array::$variant(values)
            }

            fn parse_text(text: &str) -> Result<Self> {
                text.parse::<$ty>().context_fn(|| {
                    format!("Failed to parse '{text}' as {}", DataType::$variant)
                })
            }

            impl_value_type!(@hash $ty, $variant);
        }
    };
}

impl_value_type!(bool, Boolean);
impl_value_type!(i8, Int8);
impl_value_type!(i16, Int16);
impl_value_type!(i32, Int32);
impl_value_type!(i64, Int64);
impl_value_type!(u8, UInt8);
impl_value_type!(u16, UInt16);
impl_value_type!(u32, UInt32);
impl_value_type!(u64, UInt64);
impl_value_type!(f32, Float32);
impl_value_type!(f64, Float64);
impl_value_type!(String, Utf8);
impl_value_type!(MacAddr, MacAddr);

macro_rules! impl_ord_max_value {
    ($($ty:ty),*) => {
        $(
            impl MaxValue for $ty {
                fn max_value(self, other: Self) -> Self {
                    Ord::max(self, other)
                }
            }
        )*
    };
}

impl_ord_max_value!(bool, i8, i16, i32, i64, u8, u16, u32, u64, String, MacAddr);

// IEEE max, a NaN loses to any number. Equal values can still be zeros of
// different sign, in which case +0.0 wins. Either way the result does not
// depend on the order values arrive in.
macro_rules! impl_float_max_value {
    ($($ty:ty),*) => {
        $(
            impl MaxValue for $ty {
                fn max_value(self, other: Self) -> Self {
                    if self == other {
                        if self.is_sign_positive() { self } else { other }
                    } else {
                        <$ty>::max(self, other)
                    }
                }
            }
        )*
    };
}

impl_float_max_value!(f32, f64);
