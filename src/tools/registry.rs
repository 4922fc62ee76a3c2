use serde_json::{json, Value};

use crate::error::ToolError;
use crate::types::Capability;

/// A tool definition: public name, capability it maps to, and its schema.
pub struct ToolDef {
    pub name: String,
    pub capability: Capability,
    pub schema: Value,
}

/// Catalog of the tools exposed to callers. Provides schemas and resolves
/// public tool names to capabilities.
pub struct ToolRegistry {
    tools: Vec<ToolDef>,
}

impl ToolRegistry {
    fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// The three built-in tools.
    pub fn builtin() -> Self {
        Self::new()
            .add(
                Capability::Diagnosis,
                "Run system diagnosis to find probable issues",
                "Description of the issue or system check needed",
            )
            .add(
                Capability::Settings,
                "Get PC settings like volume, WiFi, battery, etc.",
                "The setting or information you want to retrieve",
            )
            .add(
                Capability::Troubleshoot,
                "Execute troubleshooting commands to fix system issues",
                "Description of the issue to fix",
            )
    }

    /// Register a capability under its public tool name.
    fn add(mut self, capability: Capability, description: &str, input_hint: &str) -> Self {
        let name = capability.tool_name();
        self.tools.push(ToolDef {
            name: name.to_string(),
            capability,
            schema: json!({
                "name": name,
                "description": description,
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "input_text": {
                            "type": "string",
                            "description": input_hint
                        }
                    },
                    "required": ["input_text"]
                }
            }),
        });
        self
    }

    /// All tool schemas, in registration order.
    pub fn schemas(&self) -> Vec<Value> {
        self.tools.iter().map(|t| t.schema.clone()).collect()
    }

    /// Resolve a public tool name.
    pub fn lookup(&self, name: &str) -> Result<Capability, ToolError> {
        self.tools
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.capability)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_three_tools_in_order() {
        let reg = ToolRegistry::builtin();
        assert_eq!(
            reg.tool_names(),
            vec!["run_diagnosis", "get_pc_settings", "execute_troubleshooting"]
        );
    }

    #[test]
    fn lookup_resolves_names() {
        let reg = ToolRegistry::builtin();
        assert_eq!(reg.lookup("get_pc_settings").unwrap(), Capability::Settings);
        assert!(matches!(
            reg.lookup("format_disk"),
            Err(ToolError::UnknownTool(_))
        ));
    }

    #[test]
    fn schemas_require_input_text() {
        let reg = ToolRegistry::builtin();
        for schema in reg.schemas() {
            assert_eq!(schema["inputSchema"]["required"][0], "input_text");
            assert!(schema["description"].is_string());
        }
    }

    #[test]
    fn catalog_lists_every_capability_once() {
        let reg = ToolRegistry::builtin();
        let listed: Vec<String> = reg
            .schemas()
            .iter()
            .map(|s| s["name"].as_str().unwrap().to_string())
            .collect();
        let expected: Vec<String> = Capability::ALL
            .iter()
            .map(|c| c.tool_name().to_string())
            .collect();
        assert_eq!(listed, expected);
    }
}
