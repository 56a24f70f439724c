//! Typed access to the arguments a tool is invoked with.

use serde_json::Value;

use crate::error::{EngineError, Result};

/// Arguments for one tool invocation, as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments {
    value: Value,
}

impl ToolArguments {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Parse arguments from raw JSON text. Blank text is an empty object.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::new(Value::Object(Default::default())));
        }
        serde_json::from_str(trimmed)
            .map(Self::new)
            .map_err(|e| EngineError::InvalidArgument(format!("arguments are not JSON: {e}")))
    }

    pub fn raw(&self) -> &Value {
        &self.value
    }

    pub fn get_str(&self, key: &str) -> Result<&str> {
        self.lookup(key, "string", Value::as_str)
    }

    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Result<i64> {
        self.lookup(key, "integer", Value::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Result<f64> {
        self.lookup(key, "number", Value::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.lookup(key, "boolean", Value::as_bool)
    }

    /// Deserialize all arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.value.clone())
            .map_err(|e| EngineError::InvalidArgument(format!("cannot read arguments: {e}")))
    }

    fn lookup<'a, T>(
        &'a self,
        key: &str,
        kind: &str,
        extract: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T> {
        self.value
            .get(key)
            .and_then(extract)
            .ok_or_else(|| EngineError::InvalidArgument(format!("missing {kind} argument: {key}")))
    }
}

impl From<Value> for ToolArguments {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_getters_read_matching_values() {
        let args = ToolArguments::new(json!({"name": "a.txt", "count": 3, "ratio": 0.5, "dry": true}));
        assert_eq!(args.get_str("name").unwrap(), "a.txt");
        assert_eq!(args.get_i64("count").unwrap(), 3);
        assert_eq!(args.get_f64("ratio").unwrap(), 0.5);
        assert!(args.get_bool("dry").unwrap());
        assert_eq!(args.get_str_opt("missing"), None);
    }

    #[test]
    fn wrong_type_is_invalid_argument() {
        let args = ToolArguments::new(json!({"count": "three"}));
        let err = args.get_i64("count").unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument: missing integer argument: count");
    }

    #[test]
    fn blank_raw_text_parses_as_empty_object() {
        let args = ToolArguments::parse("   ").unwrap();
        assert_eq!(args.raw(), &json!({}));
        assert!(ToolArguments::parse("{not json").is_err());
    }

    #[test]
    fn deserialize_into_struct() {
        #[derive(serde::Deserialize)]
        struct Doc {
            file_name: String,
        }
        let args = ToolArguments::new(json!({"file_name": "notes.txt"}));
        let doc: Doc = args.deserialize().unwrap();
        assert_eq!(doc.file_name, "notes.txt");
    }
}
