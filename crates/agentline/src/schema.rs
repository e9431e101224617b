//! Explicit input schemas for tools.
//!
//! Tool authors declare the accepted input shape up front instead of having it derived
//! from a type at runtime.

use serde_json::{json, Map, Value};

/// Builder for a JSON schema describing an object with named properties.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property of the given json type
    pub fn property(mut self, name: &str, kind: &str, description: &str, required: bool) -> Self {
        let mut property = json!({ "type": kind });
        if !description.is_empty() {
            property["description"] = json!(description);
        }
        self.properties.insert(name.to_string(), property);
        if required && !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
        self
    }

    pub fn string(self, name: &str, description: &str, required: bool) -> Self {
        self.property(name, "string", description, required)
    }

    pub fn integer(self, name: &str, description: &str, required: bool) -> Self {
        self.property(name, "integer", description, required)
    }

    pub fn number(self, name: &str, description: &str, required: bool) -> Self {
        self.property(name, "number", description, required)
    }

    pub fn boolean(self, name: &str, description: &str, required: bool) -> Self {
        self.property(name, "boolean", description, required)
    }

    /// Restrict a string property to a fixed set of values
    pub fn enumeration(mut self, name: &str, values: &[&str], description: &str, required: bool) -> Self {
        self = self.string(name, description, required);
        if let Some(property) = self.properties.get_mut(name) {
            property["enum"] = json!(values);
        }
        self
    }

    pub fn build(self) -> Value {
        let mut schema = json!({
            "type": "object",
            "properties": Value::Object(self.properties),
        });
        if !self.required.is_empty() {
            schema["required"] = json!(self.required);
        }
        schema
    }
}
