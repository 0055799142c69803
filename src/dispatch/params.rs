//! Explicitly supplied command parameters
//!
//! CLI flags and batch-file objects both end up here, keyed by snake_case
//! field names. Absent, `null` and `false` all mean "not supplied".

use crate::errors::{AppError, AppResult};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Map<String, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Set a value unconditionally
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Set a value only when one was given
    pub fn with_opt<T: Into<Value>>(mut self, key: &str, value: Option<T>) -> Self {
        if let Some(value) = value {
            self.0.insert(key.to_string(), value.into());
        }
        self
    }

    /// Set a boolean switch only when it is on
    pub fn with_flag(mut self, key: &str, on: bool) -> Self {
        if on {
            self.0.insert(key.to_string(), Value::Bool(true));
        }
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Whether a field counts as supplied
    pub fn has(&self, key: &str) -> bool {
        match self.0.get(key) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    fn present(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// String value; numbers are accepted and rendered as text
    pub fn string(&self, key: &str) -> AppResult<Option<String>> {
        match self.present(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(type_error(key, "a string", other)),
        }
    }

    /// Non-empty string value
    pub fn required(&self, key: &str) -> AppResult<String> {
        self.string(key)?
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::validation(format!("Missing required field '{key}'.")))
    }

    pub fn flag(&self, key: &str) -> AppResult<bool> {
        match self.present(key) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(type_error(key, "true or false", other)),
        }
    }

    pub fn int(&self, key: &str) -> AppResult<Option<i64>> {
        match self.present(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| type_error(key, "an integer", &Value::Number(n.clone()))),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| type_error(key, "an integer", &Value::String(s.clone()))),
            Some(other) => Err(type_error(key, "an integer", other)),
        }
    }

    pub fn float(&self, key: &str) -> AppResult<Option<f64>> {
        match self.present(key) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| type_error(key, "a number", &Value::String(s.clone()))),
            Some(other) => Err(type_error(key, "a number", other)),
        }
    }

    /// String list from a JSON array or a comma-separated string
    pub fn list(&self, key: &str) -> AppResult<Option<Vec<String>>> {
        match self.present(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(
                s.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.trim().to_string()),
                    other => Err(type_error(key, "a list of strings", other)),
                })
                .filter(|item| !matches!(item, Ok(s) if s.is_empty()))
                .collect::<AppResult<Vec<_>>>()
                .map(Some),
            Some(other) => Err(type_error(key, "a list of strings", other)),
        }
    }

    /// Positive integer with a default
    pub fn positive(&self, key: &str, default: i64) -> AppResult<i64> {
        let value = self.int(key)?.unwrap_or(default);
        if value <= 0 {
            return Err(AppError::validation(format!(
                "Field '{key}' must be a positive integer, got {value}."
            )));
        }
        Ok(value)
    }
}

fn type_error(key: &str, expected: &str, got: &Value) -> AppError {
    AppError::validation(format!("Field '{key}' must be {expected}, got {got}."))
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
