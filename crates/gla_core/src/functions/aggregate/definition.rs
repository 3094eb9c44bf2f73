use std::fmt::{self, Debug};

use gla_error::Result;
use serde::{Deserialize, Serialize};

use super::OperatorInstance;
use super::specialize::{SpecializedOperator, StateRepr};
use crate::arrays::field::Field;
use crate::config::operator::OperatorConfig;

/// What an operator computes, independent of column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    /// Keep every input row.
    Collect,
    /// Running per-column extremum.
    ColumnwiseExtremum,
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collect => write!(f, "collect"),
            Self::ColumnwiseExtremum => write!(f, "columnwise-extremum"),
        }
    }
}

/// How many rows an operator produces once finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultShape {
    /// Exactly one output row.
    Single,
    /// Zero or more output rows, read one at a time.
    Multi,
}

impl fmt::Display for ResultShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Multi => write!(f, "multi"),
        }
    }
}

/// A rule a column signature has to satisfy before an operator can be
/// specialized for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// At least this many input columns.
    MinColumns(usize),
    /// Same number of input and output columns.
    EqualArity,
    /// Every input column has the same type.
    HomogeneousInputs,
    /// Output column `i` has the type of input column `i`. Output types left
    /// out by the caller are filled in.
    MirroredOutputTypes,
}

impl Constraint {
    /// Stable identifier, attached to errors as the `constraint` field.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MinColumns(_) => "min_columns",
            Self::EqualArity => "equal_arity",
            Self::HomogeneousInputs => "homogeneous_inputs",
            Self::MirroredOutputTypes => "mirrored_output_types",
        }
    }
}

/// Declarative description of an aggregate operator.
///
/// A definition is bound to concrete column types through
/// [`specialize`](super::specialize::specialize), which checks every
/// constraint before the definition is asked for a state representation or
/// instances.
pub trait AggregateDefinition: Debug + Sync + Send {
    fn name(&self) -> &'static str;

    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    fn description(&self) -> &'static str;

    fn kind(&self) -> OperatorKind;

    fn result_shape(&self) -> ResultShape;

    /// Extra properties reported to the engine (e.g. "list").
    fn properties(&self) -> &'static [&'static str] {
        &[]
    }

    /// Constraints for the given configuration.
    fn constraints(&self, config: &OperatorConfig) -> Vec<Constraint>;

    /// State representation for inputs that passed every constraint.
    fn state_repr(&self, inputs: &[Field], config: &OperatorConfig) -> Result<StateRepr>;

    /// Create an empty instance for one partition.
    fn new_instance(&self, op: &SpecializedOperator) -> Result<OperatorInstance>;
}
