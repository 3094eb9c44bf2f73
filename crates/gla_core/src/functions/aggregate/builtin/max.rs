use std::any::Any;

use gla_error::{DbError, Result};
use tracing::trace;

use crate::arrays::array::Array;
use crate::arrays::batch::Batch;
use crate::arrays::datatype::DataType;
use crate::arrays::field::Field;
use crate::arrays::scalar::{Row, ScalarValue};
use crate::config::operator::OperatorConfig;
use crate::functions::aggregate::definition::{
    AggregateDefinition,
    Constraint,
    OperatorKind,
    ResultShape,
};
use crate::functions::aggregate::specialize::{SpecializedOperator, StateRepr};
use crate::functions::aggregate::states::{AggregateState, MaxState};
use crate::functions::aggregate::{
    AggregateOperator,
    OperatorInstance,
    Phase,
    SingleResultOperator,
    check_batch,
    check_row,
    downcast_other,
};
use crate::values::macaddr::MacAddr;
use crate::values::{MaxValue, ValueType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Max;

impl AggregateDefinition for Max {
    fn name(&self) -> &'static str {
        "max"
    }

    fn description(&self) -> &'static str {
        "Return the maximum of each input column independently."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::ColumnwiseExtremum
    }

    fn result_shape(&self) -> ResultShape {
        ResultShape::Single
    }

    fn constraints(&self, _config: &OperatorConfig) -> Vec<Constraint> {
        vec![
            Constraint::MinColumns(1),
            Constraint::EqualArity,
            Constraint::MirroredOutputTypes,
        ]
    }

    fn state_repr(&self, inputs: &[Field], _config: &OperatorConfig) -> Result<StateRepr> {
        Ok(StateRepr::RunningValues {
            columns: inputs.iter().map(|f| f.datatype).collect(),
        })
    }

    fn new_instance(&self, op: &SpecializedOperator) -> Result<OperatorInstance> {
        Ok(OperatorInstance::Single(Box::new(MaxOperator::new(
            op.input_types(),
        ))))
    }
}

fn update_scalar<T: MaxValue>(state: &mut MaxState<T>, value: &ScalarValue) -> Result<()> {
    let value = T::from_scalar(value).ok_or_else(|| {
        DbError::new("Unexpected value type for max")
            .with_field("expected", T::DATATYPE)
            .with_field("have", value.datatype())
    })?;
    state.update(value.clone())
}

fn update_array<T: MaxValue>(state: &mut MaxState<T>, array: &Array) -> Result<()> {
    for value in array.try_as_slice::<T>()? {
        state.update(value.clone())?;
    }
    Ok(())
}

macro_rules! running_max {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        /// Running maximum for one column, tagged by the column's type.
        #[derive(Debug)]
        enum RunningMax {
            $($variant(MaxState<$ty>),)*
        }

        impl RunningMax {
            fn new(datatype: DataType) -> Self {
                match datatype {
                    $(DataType::$variant => RunningMax::$variant(MaxState::default()),)*
                }
            }

            fn datatype(&self) -> DataType {
                match self {
                    $(RunningMax::$variant(_) => DataType::$variant,)*
                }
            }

            fn update(&mut self, value: &ScalarValue) -> Result<()> {
                match self {
                    $(RunningMax::$variant(state) => update_scalar(state, value),)*
                }
            }

            fn update_array(&mut self, array: &Array) -> Result<()> {
                match self {
                    $(RunningMax::$variant(state) => update_array(state, array),)*
                }
            }

            fn merge(&mut self, other: &mut RunningMax) -> Result<()> {
                match (self, other) {
                    $((RunningMax::$variant(a), RunningMax::$variant(b)) => a.merge(b),)*
                    (a, b) => Err(DbError::new("Cannot merge running maximums of different types")
                        .with_field("left", a.datatype())
                        .with_field("right", b.datatype())),
                }
            }

            fn value(&self) -> Option<ScalarValue> {
                match self {
                    $(RunningMax::$variant(state) => state.finalize().map(ValueType::into_scalar),)*
                }
            }
        }
    };
}

running_max!(
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
);

/// Columnwise maximum over every row added to it.
#[derive(Debug)]
pub struct MaxOperator {
    input_types: Vec<DataType>,
    columns: Vec<RunningMax>,
    count: u64,
    phase: Phase,
}

impl MaxOperator {
    pub fn new(input_types: Vec<DataType>) -> Self {
        let columns = input_types.iter().map(|&t| RunningMax::new(t)).collect();
        MaxOperator {
            input_types,
            columns,
            count: 0,
            phase: Phase::Accumulating,
        }
    }

    fn reset(&mut self) {
        self.columns = self
            .input_types
            .iter()
            .map(|&t| RunningMax::new(t))
            .collect();
        self.count = 0;
    }
}

impl AggregateOperator for MaxOperator {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn input_types(&self) -> &[DataType] {
        &self.input_types
    }

    fn add_item(&mut self, row: &[ScalarValue]) -> Result<()> {
        self.phase.check_accumulating(Max.name())?;
        check_row(&self.input_types, row)?;

        for (column, value) in self.columns.iter_mut().zip(row) {
            column.update(value)?;
        }
        self.count += 1;

        Ok(())
    }

    fn add_batch(&mut self, batch: &Batch) -> Result<()> {
        self.phase.check_accumulating(Max.name())?;
        check_batch(&self.input_types, batch)?;

        for (column, array) in self.columns.iter_mut().zip(batch.arrays()) {
            column.update_array(array)?;
        }
        self.count += batch.num_rows() as u64;

        Ok(())
    }

    fn add_state(&mut self, other: &mut dyn Any) -> Result<()> {
        self.phase.check_accumulating(Max.name())?;
        let other = downcast_other::<Self>(&Max, other)?;

        if self.input_types != other.input_types {
            return Err(
                DbError::new("Attempted to combine max states with different input types")
                    .with_field("left", format!("{:?}", self.input_types))
                    .with_field("right", format!("{:?}", other.input_types)),
            );
        }

        trace!(left = self.count, right = other.count, "merging max states");

        for (column, other_column) in self.columns.iter_mut().zip(&mut other.columns) {
            column.merge(other_column)?;
        }
        self.count += other.count;
        other.reset();

        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.phase = Phase::Finalized;
        Ok(())
    }

    fn count(&self) -> u64 {
        self.count
    }
}

impl SingleResultOperator for MaxOperator {
    fn result(&self) -> Result<Row> {
        self.phase.check_finalized(Max.name())?;
        if self.count == 0 {
            return Err(
                DbError::new("No rows accumulated for max").with_field("operator", Max.name())
            );
        }

        self.columns
            .iter()
            .map(|column| {
                column.value().ok_or_else(|| {
                    DbError::new("Missing running value for max")
                        .with_field("datatype", column.datatype())
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::field::{ColumnSignature, OutputColumn};
    use crate::functions::aggregate::specialize::specialize;

    fn max_instance(types: &[DataType]) -> OperatorInstance {
        let sig = ColumnSignature::new(
            types
                .iter()
                .enumerate()
                .map(|(idx, &t)| Field::new(format!("c{idx}"), t)),
            (0..types.len()).map(|idx| OutputColumn::untyped(format!("m{idx}"))),
        );
        specialize(&Max, &sig, &OperatorConfig::default())
            .unwrap()
            .new_instance()
            .unwrap()
    }

    fn int_row(a: i64, b: i64) -> Row {
        vec![ScalarValue::Int64(a), ScalarValue::Int64(b)]
    }

    fn result(instance: &mut OperatorInstance) -> Result<Row> {
        instance.as_single_mut()?.result()
    }

    #[test]
    fn columns_are_independent() {
        let mut max = max_instance(&[DataType::Int64, DataType::Int64]);
        max.add_item(&int_row(1, 5)).unwrap();
        max.add_item(&int_row(3, 2)).unwrap();
        max.add_item(&int_row(2, 9)).unwrap();
        max.finalize().unwrap();

        assert_eq!(3, max.count());
        assert_eq!(int_row(3, 9), result(&mut max).unwrap());
    }

    #[test]
    fn merge_partitions() {
        let mut left = max_instance(&[DataType::Int64, DataType::Int64]);
        left.add_item(&int_row(1, 5)).unwrap();
        left.add_item(&int_row(3, 2)).unwrap();

        let mut right = max_instance(&[DataType::Int64, DataType::Int64]);
        right.add_item(&int_row(2, 9)).unwrap();

        left.add_state(&mut right).unwrap();
        assert_eq!(3, left.count());
        assert_eq!(0, right.count());

        left.finalize().unwrap();
        assert_eq!(int_row(3, 9), result(&mut left).unwrap());
    }

    #[test]
    fn merge_into_empty_adopts_values() {
        let mut empty = max_instance(&[DataType::Int32]);
        let mut other = max_instance(&[DataType::Int32]);
        other.add_item(&[ScalarValue::Int32(-7)]).unwrap();

        empty.add_state(&mut other).unwrap();
        empty.finalize().unwrap();
        assert_eq!(vec![ScalarValue::Int32(-7)], result(&mut empty).unwrap());
    }

    #[test]
    fn merge_empty_keeps_values() {
        let mut max = max_instance(&[DataType::Utf8]);
        max.add_item(&[ScalarValue::from("pear")]).unwrap();
        let mut empty = max_instance(&[DataType::Utf8]);

        max.add_state(&mut empty).unwrap();
        max.finalize().unwrap();
        assert_eq!(vec![ScalarValue::from("pear")], result(&mut max).unwrap());
        assert_eq!(1, max.count());
    }

    #[test]
    fn merge_different_types_leaves_target() {
        let mut a = max_instance(&[DataType::Int32]);
        a.add_item(&[ScalarValue::Int32(1)]).unwrap();
        let mut b = max_instance(&[DataType::Int64]);
        b.add_item(&[ScalarValue::Int64(10)]).unwrap();

        a.add_state(&mut b).unwrap_err();
        assert_eq!(1, a.count());
        assert_eq!(1, b.count());
    }

    #[test]
    fn empty_result_is_error() {
        let mut max = max_instance(&[DataType::Float64]);
        max.finalize().unwrap();
        let err = result(&mut max).unwrap_err();
        assert_eq!("No rows accumulated for max", err.get_msg());
    }

    #[test]
    fn result_before_finalize_is_error() {
        let mut max = max_instance(&[DataType::Int8]);
        max.add_item(&[ScalarValue::Int8(1)]).unwrap();
        result(&mut max).unwrap_err();
    }

    #[test]
    fn add_after_finalize_is_error() {
        let mut max = max_instance(&[DataType::Int8]);
        max.finalize().unwrap();
        max.add_item(&[ScalarValue::Int8(1)]).unwrap_err();

        let mut other = max_instance(&[DataType::Int8]);
        max.add_state(&mut other).unwrap_err();
        assert_eq!(0, max.count());
    }

    #[test]
    fn wrong_row_type_rejected_without_partial_update() {
        let mut max = max_instance(&[DataType::Int64, DataType::Int64]);
        max.add_item(&[ScalarValue::Int64(100), ScalarValue::Utf8("x".to_string())])
            .unwrap_err();
        max.add_item(&int_row(1, 1)).unwrap();
        max.finalize().unwrap();

        assert_eq!(int_row(1, 1), result(&mut max).unwrap());
    }

    #[test]
    fn batch_matches_items() {
        let batch = Batch::try_new([
            Array::from(vec![1_u32, 8, 3]),
            Array::from(vec!["b".to_string(), "a".to_string(), "c".to_string()]),
            Array::from(vec![
                MacAddr::from_u64(0x0800_2b01_0203),
                MacAddr::from_u64(0xffff_0000_0001),
                MacAddr::from_u64(0x0000_0000_00ff),
            ]),
        ])
        .unwrap();

        let mut max = max_instance(&[DataType::UInt32, DataType::Utf8, DataType::MacAddr]);
        max.add_batch(&batch).unwrap();
        let empty = Batch::try_new([
            Array::from(Vec::<u32>::new()),
            Array::from(Vec::<String>::new()),
            Array::from(Vec::<MacAddr>::new()),
        ])
        .unwrap();
        max.add_batch(&empty).unwrap();
        max.finalize().unwrap();

        assert_eq!(3, max.count());
        assert_eq!(
            vec![
                ScalarValue::UInt32(8),
                ScalarValue::from("c"),
                ScalarValue::MacAddr(MacAddr::from_u64(0xffff_0000_0001)),
            ],
            result(&mut max).unwrap()
        );
    }

    #[test]
    fn floats_skip_nan() {
        let mut max = max_instance(&[DataType::Float32]);
        max.add_item(&[ScalarValue::Float32(f32::NAN)]).unwrap();
        max.add_item(&[ScalarValue::Float32(-2.0)]).unwrap();
        max.finalize().unwrap();
        assert_eq!(vec![ScalarValue::Float32(-2.0)], result(&mut max).unwrap());
    }

    #[test]
    fn signed_zeros_merge_the_same_in_both_orders() {
        let merged = |first: f64, second: f64| {
            let mut a = max_instance(&[DataType::Float64]);
            a.add_item(&[ScalarValue::Float64(first)]).unwrap();
            let mut b = max_instance(&[DataType::Float64]);
            b.add_item(&[ScalarValue::Float64(second)]).unwrap();
            a.add_state(&mut b).unwrap();
            a.finalize().unwrap();
            result(&mut a).unwrap()
        };

        for row in [merged(0.0, -0.0), merged(-0.0, 0.0)] {
            match row.as_slice() {
                [ScalarValue::Float64(v)] => {
                    assert_eq!(0.0, *v);
                    assert!(v.is_sign_positive());
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn booleans() {
        let mut max = max_instance(&[DataType::Boolean]);
        max.add_item(&[ScalarValue::Boolean(false)]).unwrap();
        max.add_item(&[ScalarValue::Boolean(true)]).unwrap();
        max.finalize().unwrap();
        assert_eq!(vec![ScalarValue::Boolean(true)], result(&mut max).unwrap());
    }
}
