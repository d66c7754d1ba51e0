//! JSON Schema validation for task payloads and vendor results.

use aigate_kernel::{SchemaValidator, ValidationError};
use jsonschema::JSONSchema;
use serde_json::Value;
use std::collections::HashMap;

use crate::tasks::{TaskRegistry, input_schema_id, output_schema_id};

/// Compiled schemas keyed by id.
#[derive(Default)]
pub struct JsonSchemaValidator {
    schemas: HashMap<String, JSONSchema>,
}

impl std::fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.schemas.keys().collect();
        ids.sort();
        f.debug_struct("JsonSchemaValidator").field("schemas", &ids).finish()
    }
}

impl JsonSchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validator holding the input and output schema of every task in `tasks`.
    pub fn for_tasks(tasks: &TaskRegistry) -> Result<Self, ValidationError> {
        let mut validator = Self::new();
        for task in tasks.iter() {
            validator.register(input_schema_id(&task.name), &task.input_schema)?;
            validator.register(output_schema_id(&task.name), &task.output_schema)?;
        }
        Ok(validator)
    }

    /// Compile `schema` and store it under `id`, replacing any previous one.
    pub fn register(&mut self, id: impl Into<String>, schema: &Value) -> Result<(), ValidationError> {
        let id = id.into();
        let compiled = JSONSchema::compile(schema)
            .map_err(|e| ValidationError::new(id.clone(), vec![format!("invalid schema: {e}")]))?;
        self.schemas.insert(id, compiled);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.schemas.contains_key(id)
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, schema_id: &str, value: &Value) -> Result<(), ValidationError> {
        let Some(schema) = self.schemas.get(schema_id) else {
            return Err(ValidationError::new(
                schema_id,
                vec![format!("no schema registered under '{schema_id}'")],
            ));
        };
        schema.validate(value).map_err(|errors| {
            let details = errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() {
                        e.to_string()
                    } else {
                        format!("{path}: {e}")
                    }
                })
                .collect();
            ValidationError::new(schema_id, details)
        })
    }
}
