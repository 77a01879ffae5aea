//! Declarative output contracts for classification exchanges.
//!
//! A [`ClassificationSchema`] is rendered into the function-tool definition
//! sent to the engine, and the same schema validates whatever arguments come
//! back. Results are never trusted just because the engine was told the shape.

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::errors::EngineError;
use crate::prompts;

/// Primitive JSON type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Boolean,
}

impl FieldKind {
    pub fn json_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

/// One output field of a classification exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaField {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
    pub required: bool,
    /// Enumerated domain; empty means unrestricted.
    pub allowed: &'static [&'static str],
}

/// Output contract plus the assistant persona bound to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationSchema {
    pub assistant_name: &'static str,
    pub instructions: &'static str,
    pub function_name: &'static str,
    pub function_description: &'static str,
    pub fields: &'static [SchemaField],
}

/// Transcript → feature / bug / neither.
pub const SCRIPT_PROCESSING: ClassificationSchema = ClassificationSchema {
    assistant_name: "Script Processor",
    instructions: prompts::SCRIPT_PROCESSOR_INSTRUCTIONS,
    function_name: "invoke_linear_api",
    function_description: "Based on a transcript, this function call pings the Linear API \
        depending on if the customer is requesting a feature, reporting a bug, or neither.",
    fields: &[
        SchemaField {
            name: "request_type",
            kind: FieldKind::String,
            description: "The type of request the customer is making. Must be 'feature', \
                'bug', or 'neither'.",
            required: true,
            allowed: &["feature", "bug", "neither"],
        },
        SchemaField {
            name: "name",
            kind: FieldKind::String,
            description: "The name of the Linear issue to create. If the type is 'neither', \
                this is ignored.",
            required: false,
            allowed: &[],
        },
        SchemaField {
            name: "description",
            kind: FieldKind::String,
            description: "The description of the Linear issue to create. Should include the \
                customer name and relevant stakeholders. If the type is 'neither', this is \
                ignored.",
            required: false,
            allowed: &[],
        },
    ],
};

/// New draft vs. active issues → new issue, or comment on an existing one.
pub const ISSUE_MATCHING: ClassificationSchema = ClassificationSchema {
    assistant_name: "Linear Issue Matching Assistant",
    instructions: prompts::ISSUE_MATCHING_INSTRUCTIONS,
    function_name: "query_issues",
    function_description: "Queries all existing active issues and determines if the new issue \
        presented is completely new or if it is the extension of a previous issue.",
    fields: &[
        SchemaField {
            name: "is_new_issue",
            kind: FieldKind::Boolean,
            description: "True when the new issue is not related to any of the existing issues.",
            required: true,
            allowed: &[],
        },
        SchemaField {
            name: "old_issue_id",
            kind: FieldKind::String,
            description: "The id of the existing issue that the new issue is related to. If \
                there is no related existing issue, this is ignored.",
            required: false,
            allowed: &[],
        },
        SchemaField {
            name: "description",
            kind: FieldKind::String,
            description: "The comment to add to the existing issue, based on what relevant new \
                context the new issue adds to that existing issue. If there is no related \
                existing issue, this is ignored.",
            required: false,
            allowed: &[],
        },
    ],
};

impl ClassificationSchema {
    /// JSON-Schema object for the function's `parameters`.
    pub fn parameters(&self) -> Value {
        let mut properties = Map::new();
        for field in self.fields {
            let mut prop = json!({
                "type": field.kind.json_type(),
                "description": field.description,
            });
            if !field.allowed.is_empty() {
                prop["enum"] = json!(field.allowed);
            }
            properties.insert(field.name.to_string(), prop);
        }

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();

        let mut params = json!({
            "type": "object",
            "properties": properties,
        });
        if !required.is_empty() {
            params["required"] = json!(required);
        }
        params
    }

    /// Function-tool entry for an assistant definition.
    pub fn tool_definition(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.function_name,
                "description": self.function_description,
                "parameters": self.parameters(),
            }
        })
    }

    /// Check `value` against this schema.
    ///
    /// Explicit `null`s on optional fields are treated as absent. Fields the
    /// schema does not declare are dropped.
    pub fn validate(&self, value: Value) -> Result<ClassificationResult, EngineError> {
        let Value::Object(mut object) = value else {
            return Err(EngineError::schema(format!(
                "{}: arguments must be a JSON object",
                self.function_name
            )));
        };

        let mut fields = Map::new();
        for field in self.fields {
            match object.remove(field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(EngineError::schema(format!(
                        "{}: missing required field '{}'",
                        self.function_name, field.name
                    )));
                }
                None | Some(Value::Null) => {}
                Some(v) if !field.kind.accepts(&v) => {
                    return Err(EngineError::schema(format!(
                        "{}: field '{}' must be a {}",
                        self.function_name,
                        field.name,
                        field.kind.json_type()
                    )));
                }
                Some(v) => {
                    if !field.allowed.is_empty() {
                        let s = v.as_str().unwrap_or_default();
                        if !field.allowed.contains(&s) {
                            return Err(EngineError::schema(format!(
                                "{}: field '{}' value '{}' not in {:?}",
                                self.function_name, field.name, s, field.allowed
                            )));
                        }
                    }
                    fields.insert(field.name.to_string(), v);
                }
            }
        }

        Ok(ClassificationResult(fields))
    }
}

/// Validated field-name → value mapping produced by an exchange.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassificationResult(Map<String, Value>);

impl ClassificationResult {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(Value::as_bool)
    }

    /// Deserialize into a typed argument struct.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, EngineError> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| EngineError::schema(e.to_string()))
    }
}

impl From<Map<String, Value>> for ClassificationResult {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_parameters_declare_enum_and_required() {
        let params = SCRIPT_PROCESSING.parameters();
        assert_eq!(params["type"], "object");
        assert_eq!(
            params["properties"]["request_type"]["enum"],
            json!(["feature", "bug", "neither"])
        );
        assert_eq!(params["required"], json!(["request_type"]));
        assert!(params["properties"]["name"].get("enum").is_none());
    }

    #[test]
    fn matching_tool_definition_is_a_function() {
        let tool = ISSUE_MATCHING.tool_definition();
        assert_eq!(tool["type"], "function");
        assert_eq!(tool["function"]["name"], "query_issues");
        assert_eq!(
            tool["function"]["parameters"]["properties"]["is_new_issue"]["type"],
            "boolean"
        );
    }

    #[test]
    fn every_property_has_type_and_description() {
        for schema in [SCRIPT_PROCESSING, ISSUE_MATCHING] {
            let params = schema.parameters();
            for (name, prop) in params["properties"].as_object().unwrap() {
                assert!(prop.get("type").is_some(), "{name} missing type");
                assert!(prop.get("description").is_some(), "{name} missing description");
            }
        }
    }

    #[test]
    fn validate_accepts_well_formed_arguments() {
        let result = SCRIPT_PROCESSING
            .validate(json!({
                "request_type": "bug",
                "name": "Login loop",
                "description": "SSO redirect never returns"
            }))
            .unwrap();
        assert_eq!(result.get_str("request_type"), Some("bug"));
        assert_eq!(result.get_str("name"), Some("Login loop"));
    }

    #[test]
    fn validate_rejects_missing_required_field() {
        let err = SCRIPT_PROCESSING
            .validate(json!({ "name": "x" }))
            .unwrap_err();
        assert!(err.to_string().contains("missing required field 'request_type'"));
    }

    #[test]
    fn validate_rejects_value_outside_enum() {
        let err = SCRIPT_PROCESSING
            .validate(json!({ "request_type": "question" }))
            .unwrap_err();
        assert!(matches!(err, EngineError::SchemaViolation(_)));
    }

    #[test]
    fn validate_rejects_wrong_type() {
        let err = ISSUE_MATCHING
            .validate(json!({ "is_new_issue": "yes" }))
            .unwrap_err();
        assert!(err.to_string().contains("must be a boolean"));
    }

    #[test]
    fn validate_rejects_non_object() {
        assert!(ISSUE_MATCHING.validate(json!([true])).is_err());
    }

    #[test]
    fn null_optional_and_unknown_fields_are_dropped() {
        let result = ISSUE_MATCHING
            .validate(json!({
                "is_new_issue": true,
                "old_issue_id": null,
                "confidence": 0.9
            }))
            .unwrap();
        assert_eq!(result.get_bool("is_new_issue"), Some(true));
        assert!(result.get("old_issue_id").is_none());
        assert!(result.get("confidence").is_none());
    }
}
