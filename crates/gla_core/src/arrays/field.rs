use std::fmt;

use serde::{Deserialize, Serialize};

use super::datatype::DataType;

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub datatype: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        Field {
            name: name.into(),
            datatype,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.datatype)
    }
}

/// An output column requested by the planner.
///
/// The type may be left out for operators that compute their output types
/// from their inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputColumn {
    pub name: String,
    pub datatype: Option<DataType>,
}

impl OutputColumn {
    /// Output column with the type left for the specializer to decide.
    pub fn untyped(name: impl Into<String>) -> Self {
        OutputColumn {
            name: name.into(),
            datatype: None,
        }
    }

    pub fn typed(name: impl Into<String>, datatype: DataType) -> Self {
        OutputColumn {
            name: name.into(),
            datatype: Some(datatype),
        }
    }
}

/// Input and output columns for a single aggregate call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnSignature {
    pub inputs: Vec<Field>,
    pub outputs: Vec<OutputColumn>,
}

impl ColumnSignature {
    pub fn new(
        inputs: impl IntoIterator<Item = Field>,
        outputs: impl IntoIterator<Item = OutputColumn>,
    ) -> Self {
        ColumnSignature {
            inputs: inputs.into_iter().collect(),
            outputs: outputs.into_iter().collect(),
        }
    }

    pub fn input_types(&self) -> impl ExactSizeIterator<Item = DataType> + '_ {
        self.inputs.iter().map(|f| f.datatype)
    }
}
