//! Mergeable aggregate operators.
//!
//! An operator is declared by an [`AggregateDefinition`], bound to concrete
//! column types by [`specialize`](specialize::specialize), and run as one
//! [`OperatorInstance`] per partition. Instances accumulate rows, absorb each
//! other's state up an arbitrary merge tree, and are read out once finalized.

pub mod builtin;
pub mod definition;
pub mod specialize;
pub mod states;

use std::any::Any;
use std::fmt::Debug;

use gla_error::{DbError, Result};

use crate::arrays::batch::Batch;
use crate::arrays::datatype::DataType;
use crate::arrays::scalar::{Row, ScalarValue};
use definition::{AggregateDefinition, ResultShape};

/// Lifecycle shared by every aggregate operator.
pub trait AggregateOperator: Debug + Send {
    /// Needed to allow downcasting to the concrete type when absorbing
    /// another instance's state.
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Types of the input columns this instance was created for.
    fn input_types(&self) -> &[DataType];

    /// Add a single row.
    fn add_item(&mut self, row: &[ScalarValue]) -> Result<()>;

    /// Add every row of a batch.
    fn add_batch(&mut self, batch: &Batch) -> Result<()>;

    /// Absorb the state of another instance of the same specialization,
    /// leaving `other` empty.
    ///
    /// `other` is the other instance's `as_any_mut`.
    fn add_state(&mut self, other: &mut dyn Any) -> Result<()>;

    /// Prepare for readout. No rows can be added afterwards.
    fn finalize(&mut self) -> Result<()>;

    /// Number of rows accumulated, directly or through merges.
    fn count(&self) -> u64;
}

/// An operator producing exactly one output row.
pub trait SingleResultOperator: AggregateOperator {
    fn result(&self) -> Result<Row>;
}

/// An operator producing a finite sequence of output rows.
pub trait MultiResultOperator: AggregateOperator {
    /// Get the next output row, or `None` once the sequence is exhausted.
    fn next_result(&mut self) -> Result<Option<Row>>;
}

/// A runtime instance of a specialized operator.
///
/// Readout is only reachable through the variant matching the operator's
/// result shape.
#[derive(Debug)]
pub enum OperatorInstance {
    Single(Box<dyn SingleResultOperator>),
    Multi(Box<dyn MultiResultOperator>),
}

impl OperatorInstance {
    pub fn result_shape(&self) -> ResultShape {
        match self {
            Self::Single(_) => ResultShape::Single,
            Self::Multi(_) => ResultShape::Multi,
        }
    }

    pub fn input_types(&self) -> &[DataType] {
        match self {
            Self::Single(op) => op.input_types(),
            Self::Multi(op) => op.input_types(),
        }
    }

    pub fn add_item(&mut self, row: &[ScalarValue]) -> Result<()> {
        match self {
            Self::Single(op) => op.add_item(row),
            Self::Multi(op) => op.add_item(row),
        }
    }

    pub fn add_batch(&mut self, batch: &Batch) -> Result<()> {
        match self {
            Self::Single(op) => op.add_batch(batch),
            Self::Multi(op) => op.add_batch(batch),
        }
    }

    /// Absorb `other` into this instance. `other` is left empty.
    pub fn add_state(&mut self, other: &mut OperatorInstance) -> Result<()> {
        match (self, other) {
            (Self::Single(a), Self::Single(b)) => a.add_state(b.as_any_mut()),
            (Self::Multi(a), Self::Multi(b)) => a.add_state(b.as_any_mut()),
            _ => Err(DbError::new(
                "Attempted to combine aggregate states of different types",
            )),
        }
    }

    pub fn finalize(&mut self) -> Result<()> {
        match self {
            Self::Single(op) => op.finalize(),
            Self::Multi(op) => op.finalize(),
        }
    }

    pub fn count(&self) -> u64 {
        match self {
            Self::Single(op) => op.count(),
            Self::Multi(op) => op.count(),
        }
    }

    pub fn as_single_mut(&mut self) -> Result<&mut dyn SingleResultOperator> {
        match self {
            Self::Single(op) => Ok(op.as_mut()),
            Self::Multi(_) => Err(DbError::new("Operator produces multiple results")),
        }
    }

    pub fn as_multi_mut(&mut self) -> Result<&mut dyn MultiResultOperator> {
        match self {
            Self::Multi(op) => Ok(op.as_mut()),
            Self::Single(_) => Err(DbError::new("Operator produces a single result")),
        }
    }

    pub fn downcast_ref<T: AggregateOperator + 'static>(&self) -> Option<&T> {
        match self {
            Self::Single(op) => op.as_any().downcast_ref(),
            Self::Multi(op) => op.as_any().downcast_ref(),
        }
    }

    pub fn downcast_mut<T: AggregateOperator + 'static>(&mut self) -> Option<&mut T> {
        match self {
            Self::Single(op) => op.as_any_mut().downcast_mut(),
            Self::Multi(op) => op.as_any_mut().downcast_mut(),
        }
    }

    /// Read every output row of a finalized instance.
    pub fn read_all(&mut self) -> Result<Vec<Row>> {
        match self {
            Self::Single(op) => Ok(vec![op.result()?]),
            Self::Multi(op) => {
                let mut rows = Vec::new();
                while let Some(row) = op.next_result()? {
                    rows.push(row);
                }
                Ok(rows)
            }
        }
    }
}

/// Where an instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Accumulating,
    Finalized,
}

impl Phase {
    pub fn check_accumulating(self, operator: &str) -> Result<()> {
        match self {
            Self::Accumulating => Ok(()),
            Self::Finalized => Err(DbError::new("Cannot add rows to a finalized aggregate")
                .with_field("operator", operator)),
        }
    }

    pub fn check_finalized(self, operator: &str) -> Result<()> {
        match self {
            Self::Finalized => Ok(()),
            Self::Accumulating => Err(DbError::new(
                "Cannot read results from an aggregate before it is finalized",
            )
            .with_field("operator", operator)),
        }
    }
}

/// Check that a row matches the expected input types.
pub fn check_row(expected: &[DataType], row: &[ScalarValue]) -> Result<()> {
    if row.len() != expected.len() {
        return Err(DbError::new("Row has wrong number of columns")
            .with_field("expected", expected.len())
            .with_field("have", row.len()));
    }
    for (idx, (datatype, value)) in expected.iter().zip(row).enumerate() {
        if value.datatype() != *datatype {
            return Err(DbError::new("Row value has wrong type")
                .with_field("col_idx", idx)
                .with_field("expected", datatype)
                .with_field("have", value.datatype()));
        }
    }
    Ok(())
}

/// Check that a batch's columns match the expected input types.
pub fn check_batch(expected: &[DataType], batch: &Batch) -> Result<()> {
    if batch.num_columns() != expected.len() {
        return Err(DbError::new("Batch has wrong number of columns")
            .with_field("expected", expected.len())
            .with_field("have", batch.num_columns()));
    }
    for (idx, (datatype, have)) in expected.iter().zip(batch.datatypes()).enumerate() {
        if have != *datatype {
            return Err(DbError::new("Batch column has wrong type")
                .with_field("col_idx", idx)
                .with_field("expected", datatype)
                .with_field("have", have));
        }
    }
    Ok(())
}

/// Downcast the state passed to `add_state`.
pub fn downcast_other<'a, T: AggregateOperator + 'static>(
    definition: &dyn AggregateDefinition,
    other: &'a mut dyn Any,
) -> Result<&'a mut T> {
    other.downcast_mut::<T>().ok_or_else(|| {
        DbError::new("Attempted to combine aggregate states of different types")
            .with_field("operator", definition.name())
    })
}
