//! Dynamically typed attribute values, used as the input and output of
//! [`spiral_waveform_tool`](crate::tool::spiral_waveform_tool).

mod extract;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ExtractionError;

/// Named attributes, e.g. the parameters passed to a tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueDict(pub HashMap<String, Value>);

impl ValueDict {
    /// Remove `key` and convert it into `T`.
    pub fn pop<T>(&mut self, key: &str) -> Result<T, ExtractionError>
    where
        T: TryFrom<Value, Error = crate::ConversionError>,
    {
        match self.0.remove(key) {
            Some(value) => value
                .try_into()
                .map_err(|source| ExtractionError::Conversion {
                    key: key.to_string(),
                    source,
                }),
            None => Err(ExtractionError::KeyNotFound(key.to_string())),
        }
    }

    /// Like [`ValueDict::pop`], but a missing key yields `default`.
    /// A present key of the wrong type is still an error.
    pub fn pop_or<T>(&mut self, key: &str, default: T) -> Result<T, ExtractionError>
    where
        T: TryFrom<Value, Error = crate::ConversionError>,
    {
        match self.pop(key) {
            Err(ExtractionError::KeyNotFound(_)) => Ok(default),
            result => result,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ValueDict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// A single attribute. Waveforms travel as a list of `[gx, gy]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Vec2List(Vec<[f64; 2]>),
}

impl Value {
    fn type_name(&self) -> &'static str {
        use std::any::type_name_of_val;

        match self {
            Value::Int(x) => type_name_of_val(x),
            Value::Float(x) => type_name_of_val(x),
            Value::Str(x) => type_name_of_val(x),
            Value::Vec2List(x) => type_name_of_val(x),
        }
    }
}
