//! JSON configuration access.
//!
//! Configuration is read once at startup; every accessor takes a default that
//! is used when the key is absent or `null`. Values of the wrong type are
//! reported as [`Error::Conversion`] rather than silently replaced.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::{Error, Result};

/// Types that can be read out of a JSON config value.
pub trait ConfigValue: Sized {
    fn from_json(key: &str, value: &Value) -> Result<Self>;
}

fn conversion(key: &str, reason: impl Into<String>) -> Error {
    Error::Conversion {
        key: key.to_string(),
        reason: reason.into(),
    }
}

impl ConfigValue for i64 {
    fn from_json(key: &str, value: &Value) -> Result<Self> {
        value
            .as_i64()
            .ok_or_else(|| conversion(key, format!("expected an integer, got {value}")))
    }
}

impl ConfigValue for u64 {
    fn from_json(key: &str, value: &Value) -> Result<Self> {
        value
            .as_u64()
            .ok_or_else(|| conversion(key, format!("expected an unsigned integer, got {value}")))
    }
}

impl ConfigValue for usize {
    fn from_json(key: &str, value: &Value) -> Result<Self> {
        let raw = u64::from_json(key, value)?;
        Self::try_from(raw).map_err(|_| conversion(key, format!("{raw} does not fit usize")))
    }
}

impl ConfigValue for String {
    fn from_json(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(conversion(key, format!("expected a string, got {other}"))),
        }
    }
}

impl ConfigValue for bool {
    /// Accepts JSON booleans, the numbers 0 and 1 (integral reals such as
    /// `1.0` included), and the strings `0/false/off/no` and `1/true/on/yes`
    /// in any case.
    #[allow(clippy::float_cmp)]
    fn from_json(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => return Ok(*b),
            Value::Number(n) => match n.as_f64() {
                Some(x) if x == 0.0 => return Ok(false),
                Some(x) if x == 1.0 => return Ok(true),
                _ => {}
            },
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "0" | "false" | "off" | "no" => return Ok(false),
                "1" | "true" | "on" | "yes" => return Ok(true),
                _ => {}
            },
            _ => {}
        }
        Err(conversion(key, format!("cannot convert {value} to bool")))
    }
}

impl ConfigValue for Vec<String> {
    fn from_json(key: &str, value: &Value) -> Result<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| conversion(key, format!("expected an array, got {value}")))?;
        items.iter().map(|item| String::from_json(key, item)).collect()
    }
}

impl ConfigValue for HashSet<String> {
    fn from_json(key: &str, value: &Value) -> Result<Self> {
        Vec::<String>::from_json(key, value).map(|items| items.into_iter().collect())
    }
}

impl ConfigValue for HashMap<String, Vec<String>> {
    fn from_json(key: &str, value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| conversion(key, format!("expected an object, got {value}")))?;
        object
            .iter()
            .map(|(name, list)| {
                let items = list
                    .as_array()
                    .ok_or_else(|| conversion(key, format!("'{name}' is not an array")))?;
                let strings = items
                    .iter()
                    .map(|item| {
                        item.as_str().map(str::to_string).ok_or_else(|| {
                            conversion(key, format!("'{name}' holds non-string {item}"))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok((name.clone(), strings))
            })
            .collect()
    }
}

impl ConfigValue for Value {
    fn from_json(_key: &str, value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

/// Typed view over a JSON configuration object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonConfig {
    value: Value,
}

impl JsonConfig {
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(text)?))
    }

    /// Read `name`, falling back to `default` when it is absent or `null`.
    pub fn get<T: ConfigValue>(&self, name: &str, default: T) -> Result<T> {
        match self.lookup(name)? {
            None => Ok(default),
            Some(value) => T::from_json(name, value),
        }
    }

    /// Nested object `name`; empty when absent or `null`.
    pub fn section(&self, name: &str) -> Result<Self> {
        match self.lookup(name)? {
            None => Ok(Self::default()),
            Some(value @ Value::Object(_)) => Ok(Self::new(value.clone())),
            Some(other) => Err(conversion(name, format!("expected an object, got {other}"))),
        }
    }

    /// Checks the wrapped value is an object (or `null`, the empty config).
    fn ensure_object(&self) -> Result<()> {
        match &self.value {
            Value::Null | Value::Object(_) => Ok(()),
            other => Err(conversion("<root>", format!("expected an object, got {other}"))),
        }
    }

    /// Non-null value of `name`.
    fn lookup(&self, name: &str) -> Result<Option<&Value>> {
        self.ensure_object()?;
        Ok(self.value.get(name).filter(|value| !value.is_null()))
    }
}

/// Process-wide configuration consumed by optimization passes.
#[derive(Debug, Clone, Default)]
pub struct ConfigFiles {
    json: JsonConfig,
    no_optimizations_annos: HashSet<String>,
}

impl ConfigFiles {
    pub fn new(json: JsonConfig) -> Result<Self> {
        json.ensure_object()?;
        let no_optimizations_annos = json.get("no_optimizations_annotations", HashSet::new())?;
        Ok(Self {
            json,
            no_optimizations_annos,
        })
    }

    #[must_use]
    pub const fn json(&self) -> &JsonConfig {
        &self.json
    }

    /// Annotation type descriptors whose classes must not be optimized.
    #[must_use]
    pub const fn no_optimizations_annotations(&self) -> &HashSet<String> {
        &self.no_optimizations_annos
    }

    #[must_use]
    pub fn blocks_optimization<S: AsRef<str>>(&self, annotations: &[S]) -> bool {
        annotations
            .iter()
            .any(|anno| self.no_optimizations_annos.contains(anno.as_ref()))
    }
}
