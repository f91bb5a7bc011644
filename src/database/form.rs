use std::collections::HashMap;

use serde_json::Value;

use super::error::TypeError;

pub type FormData = HashMap<String, Value>;

/// Loosely typed request body. Every getter distinguishes a missing key
/// (`Ok(None)`) from a present key of the wrong shape (`Err`).
pub struct Form {
    inner: HashMap<String, Value>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn get_str(&self, key: &str) -> Result<Option<String>, TypeError> {
        match self.inner.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(v)) => Ok(Some(v.to_owned())),
            Some(_) => Err(TypeError::new("Expected a string")),
        }
    }

    pub fn get_integer(&self, key: &str) -> Result<Option<i64>, TypeError> {
        match self.inner.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => integer(value).map(Some),
        }
    }

    pub fn get_list(&self, key: &str) -> Result<Option<&[Value]>, TypeError> {
        match self.inner.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items.as_slice())),
            Some(_) => Err(TypeError::new("Expected a list of items")),
        }
    }
}

impl From<FormData> for Form {
    fn from(value: FormData) -> Self {
        Self::from_data(value)
    }
}

pub fn integer(value: &Value) -> Result<i64, TypeError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| TypeError::new("A valid integer is required")),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_e| TypeError::new("A valid integer is required")),
        _ => Err(TypeError::new("A valid integer is required")),
    }
}
