//! Binding operator definitions to concrete column types.

use std::fmt;

use gla_error::{DbError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::OperatorInstance;
use super::builtin::find_aggregate;
use super::definition::{AggregateDefinition, Constraint, OperatorKind, ResultShape};
use crate::arrays::datatype::DataType;
use crate::arrays::field::{ColumnSignature, Field};
use crate::config::operator::OperatorConfig;

/// How a specialized operator lays out its partial state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "repr", rename_all = "snake_case")]
pub enum StateRepr {
    /// Growable sequence of mixed-type tuples.
    Tuple { columns: Vec<DataType> },
    /// Growable sequence of fixed-length arrays of a single type.
    Array { element: DataType, width: usize },
    /// One running value per column.
    RunningValues { columns: Vec<DataType> },
}

impl fmt::Display for StateRepr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tuple { columns } => write!(f, "tuple<{}>", display_types(columns)),
            Self::Array { element, width } => write!(f, "array[{element}; {width}]"),
            Self::RunningValues { columns } => {
                write!(f, "running_values<{}>", display_types(columns))
            }
        }
    }
}

fn display_types(types: &[DataType]) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A signature that failed one of a definition's constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintViolation {
    TooFewColumns {
        min: usize,
        have: usize,
    },
    ArityMismatch {
        inputs: usize,
        outputs: usize,
    },
    NonUniformTypes {
        expected: DataType,
        found: DataType,
        position: usize,
    },
    OutputTypeMismatch {
        position: usize,
        input: DataType,
        output: DataType,
    },
}

impl ConstraintViolation {
    /// The rule that was violated.
    pub fn constraint(&self) -> Constraint {
        match self {
            Self::TooFewColumns { min, .. } => Constraint::MinColumns(*min),
            Self::ArityMismatch { .. } => Constraint::EqualArity,
            Self::NonUniformTypes { .. } => Constraint::HomogeneousInputs,
            Self::OutputTypeMismatch { .. } => Constraint::MirroredOutputTypes,
        }
    }

    fn into_error(self, operator: &str) -> DbError {
        DbError::new(format!("Cannot specialize '{operator}': {self}"))
            .with_field("operator", operator)
            .with_field("constraint", self.constraint().name())
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewColumns { min, have } => {
                write!(f, "expected at least {min} input columns, got {have}")
            }
            Self::ArityMismatch { inputs, outputs } => write!(
                f,
                "expected the same number of inputs and outputs, got {inputs} inputs and {outputs} outputs"
            ),
            Self::NonUniformTypes {
                expected,
                found,
                position,
            } => write!(
                f,
                "all inputs must have the same type, input {position} is {found}, expected {expected}"
            ),
            Self::OutputTypeMismatch {
                position,
                input,
                output,
            } => write!(
                f,
                "output {position} must have the type of its input ({input}), got {output}"
            ),
        }
    }
}

impl Constraint {
    /// Check a signature against this constraint.
    pub fn check(&self, signature: &ColumnSignature) -> Result<(), ConstraintViolation> {
        match self {
            Self::MinColumns(min) => {
                if signature.inputs.len() < *min {
                    return Err(ConstraintViolation::TooFewColumns {
                        min: *min,
                        have: signature.inputs.len(),
                    });
                }
            }
            Self::EqualArity => {
                if signature.inputs.len() != signature.outputs.len() {
                    return Err(ConstraintViolation::ArityMismatch {
                        inputs: signature.inputs.len(),
                        outputs: signature.outputs.len(),
                    });
                }
            }
            Self::HomogeneousInputs => {
                let mut types = signature.input_types();
                if let Some(expected) = types.next() {
                    if let Some((idx, found)) = types.enumerate().find(|(_, t)| *t != expected) {
                        return Err(ConstraintViolation::NonUniformTypes {
                            expected,
                            found,
                            position: idx + 1,
                        });
                    }
                }
            }
            Self::MirroredOutputTypes => {
                for (position, (input, output)) in signature
                    .inputs
                    .iter()
                    .zip(&signature.outputs)
                    .enumerate()
                {
                    if let Some(output) = output.datatype {
                        if output != input.datatype {
                            return Err(ConstraintViolation::OutputTypeMismatch {
                                position,
                                input: input.datatype,
                                output,
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// An operator definition bound to a concrete column signature.
///
/// Cheap to clone, and shared by every partition of a query. Each partition
/// gets its own instance through `new_instance`.
#[derive(Debug, Clone)]
pub struct SpecializedOperator {
    pub name: String,
    pub definition: &'static dyn AggregateDefinition,
    pub inputs: Vec<Field>,
    pub outputs: Vec<Field>,
    pub state: StateRepr,
    pub config: OperatorConfig,
}

impl SpecializedOperator {
    pub fn kind(&self) -> OperatorKind {
        self.definition.kind()
    }

    pub fn result_shape(&self) -> ResultShape {
        self.definition.result_shape()
    }

    pub fn input_types(&self) -> Vec<DataType> {
        self.inputs.iter().map(|f| f.datatype).collect()
    }

    pub fn output_types(&self) -> Vec<DataType> {
        self.outputs.iter().map(|f| f.datatype).collect()
    }

    /// Create an empty instance for one partition.
    pub fn new_instance(&self) -> Result<OperatorInstance> {
        self.definition.new_instance(self)
    }

    pub fn descriptor(&self) -> OperatorDescriptor {
        OperatorDescriptor {
            name: self.name.clone(),
            operator: self.definition.name().to_string(),
            kind: self.kind(),
            result_shape: self.result_shape(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            state: self.state.clone(),
            properties: self
                .definition
                .properties()
                .iter()
                .map(|p| p.to_string())
                .collect(),
            config: self.config.clone(),
        }
    }
}

impl fmt::Display for SpecializedOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}, {})",
            self.name,
            self.kind(),
            self.result_shape(),
            self.state
        )
    }
}

/// Serializable description of a specialized operator, handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorDescriptor {
    pub name: String,
    pub operator: String,
    pub kind: OperatorKind,
    pub result_shape: ResultShape,
    pub inputs: Vec<Field>,
    pub outputs: Vec<Field>,
    pub state: StateRepr,
    pub properties: Vec<String>,
    pub config: OperatorConfig,
}

/// Validate a definition's constraints against a signature and bind the
/// definition to it.
///
/// Nothing is created when any constraint fails. The returned error names
/// the failing rule in its `constraint` field.
pub fn specialize(
    definition: &'static dyn AggregateDefinition,
    signature: &ColumnSignature,
    config: &OperatorConfig,
) -> Result<SpecializedOperator> {
    let constraints = definition.constraints(config);

    for constraint in &constraints {
        if let Err(violation) = constraint.check(signature) {
            debug!(operator = definition.name(), %violation, "rejected specialization");
            return Err(violation.into_error(definition.name()));
        }
    }

    let mirrored = constraints.contains(&Constraint::MirroredOutputTypes);
    let outputs = signature
        .outputs
        .iter()
        .enumerate()
        .map(|(idx, output)| {
            let datatype = if mirrored {
                // Arity checked above if the definition cares, otherwise a
                // missing input just means there is nothing to mirror.
                signature.inputs.get(idx).map(|f| f.datatype)
            } else {
                output.datatype
            };
            let datatype = datatype.ok_or_else(|| {
                DbError::new("Missing type for output column")
                    .with_field("operator", definition.name())
                    .with_field("output", &output.name)
            })?;
            Ok(Field::new(output.name.clone(), datatype))
        })
        .collect::<Result<Vec<_>>>()?;

    let state = definition.state_repr(&signature.inputs, config)?;

    let name = format!(
        "{}<{}>",
        definition.name(),
        display_types(&signature.input_types().collect::<Vec<_>>())
    );

    debug!(%name, %state, shape = %definition.result_shape(), "specialized aggregate operator");

    Ok(SpecializedOperator {
        name,
        definition,
        inputs: signature.inputs.clone(),
        outputs,
        state,
        config: config.clone(),
    })
}

/// Look up a builtin definition by name or alias and specialize it.
pub fn specialize_by_name(
    name: &str,
    signature: &ColumnSignature,
    config: &OperatorConfig,
) -> Result<SpecializedOperator> {
    let definition = find_aggregate(name)
        .ok_or_else(|| DbError::new(format!("Unknown aggregate operator '{name}'")))?;
    specialize(definition, signature, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::field::OutputColumn;
    use crate::functions::aggregate::builtin::gather::Gather;
    use crate::functions::aggregate::builtin::max::Max;

    fn signature(inputs: &[DataType], outputs: &[Option<DataType>]) -> ColumnSignature {
        ColumnSignature::new(
            inputs
                .iter()
                .enumerate()
                .map(|(idx, &t)| Field::new(format!("in{idx}"), t)),
            outputs
                .iter()
                .enumerate()
                .map(|(idx, t)| OutputColumn {
                    name: format!("out{idx}"),
                    datatype: *t,
                }),
        )
    }

    #[test]
    fn max_rejects_unequal_arity() {
        let sig = signature(&[DataType::Int64, DataType::Int64], &[None]);
        let err = specialize(&Max, &sig, &OperatorConfig::default()).unwrap_err();

        assert_eq!(Some("equal_arity"), err.get_field("constraint"));
        assert_eq!(Some("max"), err.get_field("operator"));
    }

    #[test]
    fn max_rejects_no_columns() {
        let sig = signature(&[], &[]);
        let err = specialize(&Max, &sig, &OperatorConfig::default()).unwrap_err();
        assert_eq!(Some("min_columns"), err.get_field("constraint"));
    }

    #[test]
    fn max_mirrors_output_types() {
        let sig = signature(
            &[DataType::Int64, DataType::Float64],
            &[None, Some(DataType::Float64)],
        );
        let op = specialize(&Max, &sig, &OperatorConfig::default()).unwrap();

        assert_eq!("max<Int64, Float64>", op.name);
        assert_eq!(vec![DataType::Int64, DataType::Float64], op.output_types());
        assert_eq!("out0", op.outputs[0].name);
        assert_eq!(ResultShape::Single, op.result_shape());
        assert_eq!(
            StateRepr::RunningValues {
                columns: vec![DataType::Int64, DataType::Float64]
            },
            op.state
        );
    }

    #[test]
    fn max_rejects_wrong_output_type() {
        let sig = signature(&[DataType::Int64], &[Some(DataType::Int32)]);
        let err = specialize(&Max, &sig, &OperatorConfig::default()).unwrap_err();
        assert_eq!(Some("mirrored_output_types"), err.get_field("constraint"));
    }

    #[test]
    fn gather_array_mode_requires_uniform_types() {
        let sig = signature(&[DataType::Int64, DataType::Utf8], &[None, None]);
        let config = OperatorConfig {
            init_size: 0,
            use_array: true,
        };
        let err = specialize(&Gather, &sig, &config).unwrap_err();
        assert_eq!(Some("homogeneous_inputs"), err.get_field("constraint"));

        // Same signature is fine as tuples.
        let op = specialize(&Gather, &sig, &OperatorConfig::default()).unwrap();
        assert_eq!(
            StateRepr::Tuple {
                columns: vec![DataType::Int64, DataType::Utf8]
            },
            op.state
        );
    }

    #[test]
    fn gather_array_mode_repr() {
        let sig = signature(&[DataType::UInt16; 3], &[None, None, None]);
        let config = OperatorConfig {
            init_size: 8,
            use_array: true,
        };
        let op = specialize(&Gather, &sig, &config).unwrap();
        assert_eq!(
            StateRepr::Array {
                element: DataType::UInt16,
                width: 3
            },
            op.state
        );
        assert_eq!("array[UInt16; 3]", op.state.to_string());
        assert_eq!(ResultShape::Multi, op.result_shape());
    }

    #[test]
    fn violation_reports_position() {
        let sig = signature(
            &[DataType::Int8, DataType::Int8, DataType::Boolean],
            &[None, None, None],
        );
        let violation = Constraint::HomogeneousInputs.check(&sig).unwrap_err();
        assert_eq!(
            ConstraintViolation::NonUniformTypes {
                expected: DataType::Int8,
                found: DataType::Boolean,
                position: 2,
            },
            violation
        );
    }

    #[test]
    fn by_name_and_alias() {
        let sig = signature(&[DataType::Utf8], &[None]);
        let op = specialize_by_name("collect", &sig, &OperatorConfig::default()).unwrap();
        assert_eq!("gather<Utf8>", op.name);

        specialize_by_name("median", &sig, &OperatorConfig::default()).unwrap_err();
    }

    #[test]
    fn display() {
        let sig = signature(&[DataType::Int32], &[None]);
        let op = specialize(&Max, &sig, &OperatorConfig::default()).unwrap();
        assert_eq!(
            "max<Int32> (columnwise-extremum, single, running_values<Int32>)",
            op.to_string()
        );
    }
}
