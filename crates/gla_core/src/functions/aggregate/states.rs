use std::fmt::Debug;
use std::mem;

use gla_error::Result;

use crate::values::MaxValue;

/// State for a single running aggregate value.
pub trait AggregateState<Input, Output>: Default + Debug {
    /// Merge other state into this state, leaving `other` in its default
    /// state.
    fn merge(&mut self, other: &mut Self) -> Result<()>;

    /// Update this state with some input.
    fn update(&mut self, input: Input) -> Result<()>;

    /// Produce the output value, or `None` if the state never saw any input.
    fn finalize(&self) -> Option<Output>;
}

/// Running maximum of a single column.
#[derive(Debug, Default)]
pub struct MaxState<T> {
    max: T,
    valid: bool,
}

impl<T: MaxValue> AggregateState<T, T> for MaxState<T> {
    fn merge(&mut self, other: &mut Self) -> Result<()> {
        if !other.valid {
            return Ok(());
        }

        let other_max = mem::take(&mut other.max);
        other.valid = false;

        if self.valid {
            self.max = mem::take(&mut self.max).max_value(other_max);
        } else {
            self.max = other_max;
            self.valid = true;
        }

        Ok(())
    }

    fn update(&mut self, input: T) -> Result<()> {
        if self.valid {
            self.max = mem::take(&mut self.max).max_value(input);
        } else {
            self.max = input;
            self.valid = true;
        }
        Ok(())
    }

    fn finalize(&self) -> Option<T> {
        self.valid.then(|| self.max.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_update_sets_value() {
        let mut state = MaxState::<i32>::default();
        assert_eq!(None, state.finalize());

        // Below the default, still taken as the first value.
        state.update(-4).unwrap();
        assert_eq!(Some(-4), state.finalize());

        state.update(-9).unwrap();
        state.update(-1).unwrap();
        assert_eq!(Some(-1), state.finalize());
    }

    #[test]
    fn merge_both_valid() {
        let mut a = MaxState::<u8>::default();
        a.update(3).unwrap();
        let mut b = MaxState::<u8>::default();
        b.update(7).unwrap();

        a.merge(&mut b).unwrap();
        assert_eq!(Some(7), a.finalize());
        assert_eq!(None, b.finalize());
    }

    #[test]
    fn merge_into_empty_adopts() {
        let mut a = MaxState::<String>::default();
        let mut b = MaxState::<String>::default();
        b.update("m".to_string()).unwrap();

        a.merge(&mut b).unwrap();
        assert_eq!(Some("m".to_string()), a.finalize());
    }

    #[test]
    fn merge_empty_keeps() {
        let mut a = MaxState::<f64>::default();
        a.update(-0.5).unwrap();
        let mut b = MaxState::<f64>::default();

        a.merge(&mut b).unwrap();
        assert_eq!(Some(-0.5), a.finalize());

        let mut empty = MaxState::<f64>::default();
        empty.merge(&mut b).unwrap();
        assert_eq!(None, empty.finalize());
    }
}
