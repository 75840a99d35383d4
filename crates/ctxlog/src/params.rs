use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::{LogError, LogResult};

#[derive(Debug, Clone, PartialEq)]
enum ParamValue {
    Json(Value),
    // Conversion failed when the param was set; reported when a record carries it.
    Unserializable(String),
}

/// Structured fields merged into every record written through a context or logger.
///
/// Keys are unique and later writes win. Iteration order is unspecified.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamBag {
    entries: HashMap<String, ParamValue>,
}

impl ParamBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.entries
            .insert(key.into(), ParamValue::Json(value.into()));
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Stores any `Serialize` value. A value serde_json cannot represent is
    /// kept as a failure marker and degrades the record that carries it into
    /// a diagnostic line instead of failing here.
    pub fn set_serialized<T>(&mut self, key: impl Into<String>, value: &T) -> &mut Self
    where
        T: Serialize + ?Sized,
    {
        let v = match serde_json::to_value(value) {
            Ok(v) => ParamValue::Json(v),
            Err(e) => ParamValue::Unserializable(e.to_string()),
        };
        self.entries.insert(key.into(), v);
        self
    }

    /// Copies `other` into `self`; `other` wins on conflicting keys.
    pub fn merge(&mut self, other: &ParamBag) -> &mut Self {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
        self
    }

    pub fn merged(&self, other: &ParamBag) -> ParamBag {
        let mut out = self.clone();
        out.merge(other);
        out
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.entries.get(key)? {
            ParamValue::Json(v) => Some(v),
            ParamValue::Unserializable(_) => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All entries as JSON values, or the first entry that failed to convert.
    pub(crate) fn resolve(&self) -> LogResult<Vec<(&str, &Value)>> {
        self.entries
            .iter()
            .map(|(k, v)| match v {
                ParamValue::Json(v) => Ok((k.as_str(), v)),
                ParamValue::Unserializable(reason) => Err(LogError::Unserializable {
                    key: k.clone(),
                    reason: reason.clone(),
                }),
            })
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for ParamBag
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = ParamBag::new();
        bag.extend(iter);
        bag
    }
}

impl<K, V> Extend<(K, V)> for ParamBag
where
    K: Into<String>,
    V: Into<Value>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}
