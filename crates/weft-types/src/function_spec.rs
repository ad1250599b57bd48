//! Function metadata advertised to language models.
//!
//! Function-call nodes describe their callable surface with
//! [`FunctionSpec`]s. At graph-build time these specs are attached to
//! the upstream model-calling nodes so the model can discover which
//! tools are reachable downstream.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema of one named parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// JSON-schema type name ("string", "number", ...).
    pub r#type: String,
    /// Human-readable description shown to the model.
    #[serde(default)]
    pub description: String,
}

/// Schema of a function's parameter object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParametersSchema {
    /// Always "object" for function-call parameters.
    #[serde(default = "ParametersSchema::object_type")]
    pub r#type: String,
    /// Named parameters, keyed by argument name.
    pub properties: BTreeMap<String, ParameterSchema>,
    /// Names of required parameters.
    #[serde(default)]
    pub required: Vec<String>,
}

impl ParametersSchema {
    fn object_type() -> String {
        "object".to_string()
    }

    /// An empty parameter object (a function taking no arguments).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            r#type: Self::object_type(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

/// Description of one callable function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    /// Function name, matched against tool-call requests.
    pub name: String,
    /// What the function does, shown to the model.
    pub description: String,
    /// Parameter schema.
    pub parameters: ParametersSchema,
}

impl FunctionSpec {
    /// Creates a spec with an empty parameter object.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ParametersSchema::empty(),
        }
    }

    /// Adds a parameter to the spec.
    #[must_use]
    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        r#type: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let name = name.into();
        self.parameters.properties.insert(
            name.clone(),
            ParameterSchema {
                r#type: r#type.into(),
                description: description.into(),
            },
        );
        if required {
            self.parameters.required.push(name);
        }
        self
    }
}
