use std::any::Any;

use gla_error::{DbError, Result};
use tracing::{debug, trace};

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
use crate::functions::aggregate::{
    AggregateOperator,
    MultiResultOperator,
    OperatorInstance,
    Phase,
    check_batch,
    check_row,
    downcast_other,
};

/// Collects every input row, unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gather;

impl AggregateDefinition for Gather {
    fn name(&self) -> &'static str {
        "gather"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["collect"]
    }

    fn description(&self) -> &'static str {
        "Collect every input row, without deduplicating or reordering."
    }

    fn kind(&self) -> OperatorKind {
        OperatorKind::Collect
    }

    fn result_shape(&self) -> ResultShape {
        ResultShape::Multi
    }

    fn properties(&self) -> &'static [&'static str] {
        &["list"]
    }

    fn constraints(&self, config: &OperatorConfig) -> Vec<Constraint> {
        let mut constraints = vec![
            Constraint::MinColumns(1),
            Constraint::EqualArity,
            Constraint::MirroredOutputTypes,
        ];
        if config.use_array {
            constraints.push(Constraint::HomogeneousInputs);
        }
        constraints
    }

    fn state_repr(&self, inputs: &[Field], config: &OperatorConfig) -> Result<StateRepr> {
        if config.use_array {
            let element = inputs
                .first()
                .ok_or_else(|| DbError::new("Array storage needs at least one column"))?
                .datatype;
            Ok(StateRepr::Array {
                element,
                width: inputs.len(),
            })
        } else {
            Ok(StateRepr::Tuple {
                columns: inputs.iter().map(|f| f.datatype).collect(),
            })
        }
    }

    fn new_instance(&self, op: &SpecializedOperator) -> Result<OperatorInstance> {
        let storage = RowStorage::new(&op.state, op.config.init_size);
        Ok(OperatorInstance::Multi(Box::new(GatherOperator {
            input_types: op.input_types(),
            storage,
            cursor: 0,
            phase: Phase::Accumulating,
        })))
    }
}

/// Collected rows.
#[derive(Debug)]
enum RowStorage {
    /// One array per column.
    Tuples { columns: Vec<Array> },
    /// A single flat array, `width` consecutive values per row.
    Arrays { values: Array, width: usize },
}

impl RowStorage {
    fn new(repr: &StateRepr, init_size: usize) -> Self {
        let mut storage = match repr {
            StateRepr::Array { element, width } => RowStorage::Arrays {
                values: Array::with_capacity(*element, 0),
                width: *width,
            },
            StateRepr::Tuple { columns } | StateRepr::RunningValues { columns } => {
                RowStorage::Tuples {
                    columns: columns
                        .iter()
                        .map(|&datatype| Array::with_capacity(datatype, 0))
                        .collect(),
                }
            }
        };
        storage.reserve_rows(init_size);
        storage
    }

    /// Reserve room for `rows` rows. This is only a capacity hint, a
    /// reservation that can't be made is skipped.
    fn reserve_rows(&mut self, rows: usize) {
        if rows == 0 {
            return;
        }
        let result = match self {
            Self::Tuples { columns } => columns.iter_mut().try_for_each(|c| c.try_reserve(rows)),
            Self::Arrays { values, width } => match rows.checked_mul(*width) {
                Some(additional) => values.try_reserve(additional),
                None => Err(DbError::new("Initial size overflows array storage")
                    .with_field("rows", rows)
                    .with_field("width", *width)),
            },
        };
        if let Err(error) = result {
            debug!(rows, %error, "skipping initial reservation for gather");
        }
    }

    fn repr(&self) -> StateRepr {
        match self {
            Self::Tuples { columns } => StateRepr::Tuple {
                columns: columns.iter().map(|c| c.datatype()).collect(),
            },
            Self::Arrays { values, width } => StateRepr::Array {
                element: values.datatype(),
                width: *width,
            },
        }
    }

    fn num_rows(&self) -> usize {
        match self {
            Self::Tuples { columns } => columns.first().map(|c| c.len()).unwrap_or(0),
            Self::Arrays { values, width } => values.len().checked_div(*width).unwrap_or(0),
        }
    }

    fn reserved_rows(&self) -> usize {
        match self {
            Self::Tuples { columns } => columns.iter().map(|c| c.capacity()).min().unwrap_or(0),
            Self::Arrays { values, width } => values.capacity().checked_div(*width).unwrap_or(0),
        }
    }

    /// Push a row that has already been checked against the input types.
    fn push_row(&mut self, row: &[ScalarValue]) -> Result<()> {
        match self {
            Self::Tuples { columns } => {
                for (column, value) in columns.iter_mut().zip(row) {
                    column.push_scalar(value)?;
                }
            }
            Self::Arrays { values, .. } => {
                for value in row {
                    values.push_scalar(value)?;
                }
            }
        }
        Ok(())
    }

    fn push_batch(&mut self, batch: &Batch) -> Result<()> {
        match self {
            Self::Tuples { columns } => {
                for (column, array) in columns.iter_mut().zip(batch.arrays()) {
                    column.extend_from(array)?;
                }
                Ok(())
            }
            Self::Arrays { values, .. } => values.extend_interleaved(batch.arrays()),
        }
    }

    /// Move all rows out of `other`. Both sides must have the same repr.
    fn append(&mut self, other: &mut RowStorage) -> Result<()> {
        match (self, other) {
            (Self::Tuples { columns }, Self::Tuples { columns: other }) => {
                for (column, other) in columns.iter_mut().zip(other.iter_mut()) {
                    column.append(other)?;
                }
                Ok(())
            }
            (Self::Arrays { values, .. }, Self::Arrays { values: other, .. }) => {
                values.append(other)
            }
            _ => Err(DbError::new("Cannot append rows stored in different layouts")),
        }
    }

    fn row(&self, idx: usize) -> Option<Row> {
        if idx >= self.num_rows() {
            return None;
        }
        match self {
            Self::Tuples { columns } => columns.iter().map(|c| c.get(idx)).collect(),
            Self::Arrays { values, width } => {
                let start = idx * width;
                (start..start + width).map(|i| values.get(i)).collect()
            }
        }
    }
}

/// Instance of [`Gather`].
///
/// Rows are read back in storage order. Absorbing another instance appends
/// its rows after the ones already stored.
#[derive(Debug)]
pub struct GatherOperator {
    input_types: Vec<DataType>,
    storage: RowStorage,
    cursor: usize,
    phase: Phase,
}

impl GatherOperator {
    /// Get a collected row by index.
    pub fn row(&self, idx: usize) -> Option<Row> {
        self.storage.row(idx)
    }

    /// Copy all collected rows into a batch.
    pub fn collected(&self) -> Result<Batch> {
        match &self.storage {
            RowStorage::Tuples { columns } => Batch::try_new(columns.iter().cloned()),
            RowStorage::Arrays { .. } => {
                let rows = (0..self.storage.num_rows())
                    .map(|idx| {
                        self.storage.row(idx).ok_or_else(|| {
                            DbError::new("Missing collected row").with_field("row", idx)
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Batch::try_from_rows(&self.input_types, rows.iter().map(|r| r.as_slice()))
            }
        }
    }

    /// Number of rows that fit in the storage without reallocating.
    pub fn reserved_rows(&self) -> usize {
        self.storage.reserved_rows()
    }
}

impl AggregateOperator for GatherOperator {
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
        self.phase.check_accumulating(Gather.name())?;
        check_row(&self.input_types, row)?;
        self.storage.push_row(row)
    }

    fn add_batch(&mut self, batch: &Batch) -> Result<()> {
        self.phase.check_accumulating(Gather.name())?;
        check_batch(&self.input_types, batch)?;
        self.storage.push_batch(batch)
    }

    fn add_state(&mut self, other: &mut dyn Any) -> Result<()> {
        self.phase.check_accumulating(Gather.name())?;
        let other = downcast_other::<Self>(&Gather, other)?;

        let (left, right) = (self.storage.repr(), other.storage.repr());
        if left != right {
            return Err(
                DbError::new("Attempted to combine gather states with different layouts")
                    .with_field("left", left)
                    .with_field("right", right),
            );
        }

        trace!(
            left = self.storage.num_rows(),
            right = other.storage.num_rows(),
            "merging gather states"
        );

        self.storage.append(&mut other.storage)?;
        other.cursor = 0;

        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.phase = Phase::Finalized;
        self.cursor = 0;
        Ok(())
    }

    fn count(&self) -> u64 {
        self.storage.num_rows() as u64
    }
}

impl MultiResultOperator for GatherOperator {
    fn next_result(&mut self) -> Result<Option<Row>> {
        self.phase.check_finalized(Gather.name())?;
        let row = self.storage.row(self.cursor);
        if row.is_some() {
            self.cursor += 1;
        }
        Ok(row)
    }
}
