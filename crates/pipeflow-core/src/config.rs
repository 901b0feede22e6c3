//! Named, range-checked parameters used by models, global settings and
//! per-node production.
//!
//! A [`ConfigItem`] never clamps: a write outside its declared range is
//! rejected and the previous value is kept. Imports go through the same
//! [`ConfigItem::set`] path as interactive edits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// The value held by a config item. Serializes as a bare number or boolean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Number(f64),
}

impl ConfigValue {
    /// Numeric view. Booleans read as 1.0 / 0.0.
    pub fn as_f64(self) -> f64 {
        match self {
            ConfigValue::Number(v) => v,
            ConfigValue::Bool(true) => 1.0,
            ConfigValue::Bool(false) => 0.0,
        }
    }

    /// Boolean view. Numbers read as `true` when non-zero.
    pub fn as_bool(self) -> bool {
        match self {
            ConfigValue::Bool(b) => b,
            ConfigValue::Number(v) => v != 0.0,
        }
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        ConfigValue::Number(v)
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}

// ---------------------------------------------------------------------------
// ConfigItem
// ---------------------------------------------------------------------------

/// A single tunable parameter with an allowed range and a description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigItem {
    value: ConfigValue,
    min: f64,
    max: f64,
    description: String,
}

impl ConfigItem {
    /// A numeric item. `value` is expected to lie inside `[min, max]`.
    pub fn number(value: f64, min: f64, max: f64, description: impl Into<String>) -> Self {
        debug_assert!(min <= value && value <= max, "default outside range");
        Self {
            value: ConfigValue::Number(value),
            min,
            max,
            description: description.into(),
        }
    }

    /// A boolean toggle.
    pub fn flag(value: bool, description: impl Into<String>) -> Self {
        Self {
            value: ConfigValue::Bool(value),
            min: 0.0,
            max: 1.0,
            description: description.into(),
        }
    }

    pub fn get(&self) -> ConfigValue {
        self.value
    }

    pub fn as_f64(&self) -> f64 {
        self.value.as_f64()
    }

    pub fn as_bool(&self) -> bool {
        self.value.as_bool()
    }

    pub fn is_flag(&self) -> bool {
        matches!(self.value, ConfigValue::Bool(_))
    }

    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Store `value` if it has the right type and lies within the range.
    ///
    /// On failure the current value is left untouched. `name` is only used to
    /// label the error.
    pub fn set_named(&mut self, name: &str, value: ConfigValue) -> Result<(), ConfigError> {
        match (self.value, value) {
            (ConfigValue::Bool(_), ConfigValue::Bool(b)) => {
                self.value = ConfigValue::Bool(b);
                Ok(())
            }
            (ConfigValue::Number(_), ConfigValue::Number(v)) => {
                // NaN fails both comparisons and is rejected here.
                if v >= self.min && v <= self.max {
                    self.value = ConfigValue::Number(v);
                    Ok(())
                } else {
                    Err(ConfigError::OutOfRange {
                        name: name.to_string(),
                        value: v,
                        min: self.min,
                        max: self.max,
                    })
                }
            }
            (ConfigValue::Bool(_), ConfigValue::Number(_)) => Err(ConfigError::TypeMismatch {
                name: name.to_string(),
                expected: "boolean",
            }),
            (ConfigValue::Number(_), ConfigValue::Bool(_)) => Err(ConfigError::TypeMismatch {
                name: name.to_string(),
                expected: "numeric",
            }),
        }
    }

    /// Anonymous form of [`set_named`](Self::set_named).
    pub fn set(&mut self, value: impl Into<ConfigValue>) -> Result<(), ConfigError> {
        self.set_named("<item>", value.into())
    }
}

// ---------------------------------------------------------------------------
// ConfigSet
// ---------------------------------------------------------------------------

/// An ordered, named collection of config items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSet {
    items: BTreeMap<String, ConfigItem>,
}

impl ConfigSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, item: ConfigItem) -> Self {
        self.items.insert(name.to_string(), item);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ConfigItem> {
        self.items.get(name)
    }

    /// Numeric value of `name`, or 0.0 if no such item exists.
    pub fn f64(&self, name: &str) -> f64 {
        self.items.get(name).map(ConfigItem::as_f64).unwrap_or(0.0)
    }

    /// Boolean value of `name`, or `false` if no such item exists.
    pub fn flag(&self, name: &str) -> bool {
        self.items.get(name).map(ConfigItem::as_bool).unwrap_or(false)
    }

    pub fn set(&mut self, name: &str, value: impl Into<ConfigValue>) -> Result<(), ConfigError> {
        let item = self
            .items
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownItem(name.to_string()))?;
        item.set_named(name, value.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigItem)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Export as a plain name → value map.
    pub fn values(&self) -> BTreeMap<String, ConfigValue> {
        self.items
            .iter()
            .map(|(k, v)| (k.clone(), v.get()))
            .collect()
    }

    /// Apply every entry of `values` through [`set`](Self::set).
    ///
    /// Valid entries are stored; each rejected entry is returned together with
    /// its error, and the affected items keep their previous values.
    pub fn apply(&mut self, values: &BTreeMap<String, ConfigValue>) -> Vec<ConfigError> {
        values
            .iter()
            .filter_map(|(name, value)| self.set(name, *value).err())
            .collect()
    }
}
