use std::collections::HashMap;
use std::sync::LazyLock;

use gla_error::{DbError, Result, ResultExt};
use serde::{Deserialize, Serialize};

use crate::arrays::scalar::ScalarValue;

/// Options supplied alongside an operator at specialization time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Initial capacity reserved by collecting operators.
    pub init_size: usize,
    /// Store collected rows as fixed-length arrays of a single type instead of
    /// tuples.
    pub use_array: bool,
}

impl OperatorConfig {
    /// Build a config from key/value options, starting from the defaults.
    pub fn from_options<'a>(
        options: impl IntoIterator<Item = (&'a str, ScalarValue)>,
    ) -> Result<Self> {
        let mut conf = OperatorConfig::default();
        for (name, value) in options {
            conf.set_from_scalar(name, value)?;
        }
        Ok(conf)
    }

    pub fn set_from_scalar(&mut self, name: &str, value: ScalarValue) -> Result<()> {
        let func = lookup_setting(name)?;
        (func.set)(value, self)
    }

    pub fn get_as_scalar(&self, name: &str) -> Result<ScalarValue> {
        let func = lookup_setting(name)?;
        Ok((func.get)(self))
    }

    /// Reset a single option to its default.
    pub fn reset(&mut self, name: &str) -> Result<()> {
        let func = lookup_setting(name)?;
        let def_conf = OperatorConfig::default();
        (func.set)((func.get)(&def_conf), self)
    }

    /// Names and descriptions of all recognized options.
    pub fn describe() -> impl Iterator<Item = (&'static str, &'static str)> {
        SETTINGS
            .iter()
            .map(|(name, func)| (*name, func.description))
    }
}

fn lookup_setting(name: &str) -> Result<&'static SettingFunctions> {
    SETTINGS
        .get(name)
        .ok_or_else(|| DbError::new(format!("Unknown operator option '{name}'")))
}

struct SettingFunctions {
    description: &'static str,
    set: fn(scalar: ScalarValue, conf: &mut OperatorConfig) -> Result<()>,
    get: fn(conf: &OperatorConfig) -> ScalarValue,
}

impl SettingFunctions {
    const fn new<S: OperatorSetting>() -> Self {
        SettingFunctions {
            description: S::DESCRIPTION,
            set: S::set_from_scalar as _,
            get: S::get_as_scalar as _,
        }
    }
}

fn insert_setting<S: OperatorSetting>(map: &mut HashMap<&'static str, SettingFunctions>) {
    if map.insert(S::NAME, SettingFunctions::new::<S>()).is_some() {
        panic!("Duplicate option names: {}", S::NAME);
    }
}

static SETTINGS: LazyLock<HashMap<&'static str, SettingFunctions>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    insert_setting::<InitSize>(&mut map);
    insert_setting::<UseArray>(&mut map);

    map
});

pub trait OperatorSetting: Sync + Send + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn set_from_scalar(scalar: ScalarValue, conf: &mut OperatorConfig) -> Result<()>;
    fn get_as_scalar(conf: &OperatorConfig) -> ScalarValue;
}

/// Largest accepted `init.size`, in rows.
pub const MAX_INIT_SIZE: usize = 1 << 24;

pub struct InitSize;

impl InitSize {
    pub fn validate_value(val: i64) -> Result<()> {
        if val < 0 {
            return Err(DbError::new("Option must be non-negative")
                .with_field("option", Self::NAME)
                .with_field("value", val));
        }

        if val as u64 > MAX_INIT_SIZE as u64 {
            return Err(DbError::new(format!(
                "Initial size cannot be greater than {MAX_INIT_SIZE}"
            ))
            .with_field("option", Self::NAME)
            .with_field("value", val));
        }

        Ok(())
    }
}

impl OperatorSetting for InitSize {
    const NAME: &'static str = "init.size";
    const DESCRIPTION: &'static str = "Initial capacity reserved for collected rows";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut OperatorConfig) -> Result<()> {
        let val = match scalar {
            ScalarValue::Utf8(s) => s.trim().parse::<i64>()?,
            other => other.try_as_i64()?,
        };
        Self::validate_value(val)?;
        conf.init_size = usize::try_from(val).context("Initial size does not fit in usize")?;
        Ok(())
    }

    fn get_as_scalar(conf: &OperatorConfig) -> ScalarValue {
        ScalarValue::UInt64(conf.init_size as u64)
    }
}

pub struct UseArray;

impl OperatorSetting for UseArray {
    const NAME: &'static str = "use.array";
    const DESCRIPTION: &'static str =
        "Store rows as fixed-length arrays; all inputs must share one type";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut OperatorConfig) -> Result<()> {
        let val = match scalar {
            ScalarValue::Utf8(s) => s.trim().parse::<bool>()?,
            other => other.try_as_bool()?,
        };
        conf.use_array = val;
        Ok(())
    }

    fn get_as_scalar(conf: &OperatorConfig) -> ScalarValue {
        conf.use_array.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let conf = OperatorConfig::default();
        assert_eq!(0, conf.init_size);
        assert!(!conf.use_array);
    }

    #[test]
    fn set_setting_exists() {
        let mut conf = OperatorConfig::default();
        conf.set_from_scalar("init.size", ScalarValue::Int32(64))
            .unwrap();

        assert_eq!(64, conf.init_size);
        assert_eq!(
            ScalarValue::UInt64(64),
            conf.get_as_scalar("init.size").unwrap()
        );
    }

    #[test]
    fn set_setting_not_exists() {
        let mut conf = OperatorConfig::default();
        conf.set_from_scalar("init.capacity", 8_i64.into())
            .unwrap_err();
    }

    #[test]
    fn negative_size_rejected() {
        let mut conf = OperatorConfig::default();
        let err = conf
            .set_from_scalar("init.size", ScalarValue::Int64(-1))
            .unwrap_err();
        assert_eq!(Some("init.size"), err.get_field("option"));
        assert_eq!(0, conf.init_size);
    }

    #[test]
    fn oversized_init_size_rejected() {
        let mut conf = OperatorConfig::default();
        let err = conf
            .set_from_scalar("init.size", ScalarValue::Int64(i64::MAX))
            .unwrap_err();
        assert_eq!(Some("init.size"), err.get_field("option"));
        assert_eq!(0, conf.init_size);

        conf.set_from_scalar("init.size", ScalarValue::UInt64(MAX_INIT_SIZE as u64))
            .unwrap();
        assert_eq!(MAX_INIT_SIZE, conf.init_size);

        OperatorConfig::from_options([("init.size", ScalarValue::from("16777217"))]).unwrap_err();
    }

    #[test]
    fn from_text_options() {
        let conf = OperatorConfig::from_options([
            ("use.array", ScalarValue::from("true")),
            ("init.size", ScalarValue::from("10")),
        ])
        .unwrap();

        assert_eq!(
            OperatorConfig {
                init_size: 10,
                use_array: true
            },
            conf
        );
    }

    #[test]
    fn wrong_type_for_bool() {
        OperatorConfig::from_options([("use.array", ScalarValue::Float64(1.0))]).unwrap_err();
    }

    #[test]
    fn reset_single_option() {
        let mut conf = OperatorConfig {
            init_size: 5,
            use_array: true,
        };
        conf.reset("use.array").unwrap();
        assert!(!conf.use_array);
        assert_eq!(5, conf.init_size);
    }

    #[test]
    fn describe_lists_all_options() {
        let mut names: Vec<_> = OperatorConfig::describe().map(|(name, _)| name).collect();
        names.sort_unstable();
        assert_eq!(vec!["init.size", "use.array"], names);
    }
}
