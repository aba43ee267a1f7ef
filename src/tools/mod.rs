pub mod builtin;
pub mod calc;
pub mod outcome;
pub mod schema;
pub mod traits;

pub use outcome::ToolOutcome;
pub use traits::Tool;

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::{DeskPilotError, DeskPilotResult};
use crate::facade::Desktop;
use crate::llm::types::{FunctionDef, ToolDef};

/// Fixed mapping from tool name to its descriptor and execute function.
/// Built once at startup; registration after construction is not a
/// supported path, and duplicate names fail construction.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Registration order, so descriptors are presented to the model
    /// deterministically.
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> DeskPilotResult<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(DeskPilotError::Config(format!(
                "duplicate tool name '{name}'"
            )));
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> DeskPilotResult<Arc<dyn Tool>> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| DeskPilotError::ToolNotFound(name.to_string()))
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Tool descriptors in the wire shape the chat-completions API expects.
    pub fn descriptors(&self) -> Vec<ToolDef> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolDef {
                def_type: "function".into(),
                function: FunctionDef {
                    name: tool.name().into(),
                    description: tool.description().into(),
                    parameters: tool.parameters_schema(),
                },
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the full built-in tool set against the given facade.
pub fn builtin_registry(
    desktop: Arc<dyn Desktop>,
    config: &AppConfig,
) -> DeskPilotResult<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(builtin::ScreenshotTool::new(desktop.clone())))?;
    registry.register(Arc::new(builtin::FindElementsTool::new(desktop.clone())))?;
    registry.register(Arc::new(builtin::ClickElementTool::new(desktop.clone())))?;
    registry.register(Arc::new(builtin::TypeTextTool::new(desktop.clone())))?;
    registry.register(Arc::new(builtin::PressKeyTool::new(desktop.clone())))?;
    registry.register(Arc::new(builtin::OpenApplicationTool::new(desktop.clone())))?;
    registry.register(Arc::new(builtin::OpenUrlTool::new(desktop.clone())))?;
    registry.register(Arc::new(builtin::RunCommandTool::new(
        desktop.clone(),
        &config.safety,
    )?))?;
    registry.register(Arc::new(builtin::ReadScreenTool::new(
        desktop.clone(),
        &config.recognition,
    )))?;
    registry.register(Arc::new(builtin::CalculateTool))?;
    registry.register(Arc::new(builtin::DrawShapeTool::new(
        desktop,
        &config.agent,
    )))?;
    registry.register(Arc::new(builtin::WaitTool))?;

    tracing::info!(tools = registry.len(), "tool registry built");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct DummyTool(&'static str);

    #[async_trait]
    impl Tool for DummyTool {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "dummy"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _args: serde_json::Value) -> ToolOutcome {
            ToolOutcome::success("ok")
        }
    }

    #[test]
    fn resolve_returns_registered_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(DummyTool("alpha"))).unwrap();
        registry.register(Arc::new(DummyTool("beta"))).unwrap();

        for name in ["alpha", "beta"] {
            assert_eq!(registry.resolve(name).unwrap().name(), name);
        }
    }

    #[test]
    fn unknown_name_is_tool_not_found() {
        let registry = ToolRegistry::new();
        let err = match registry.resolve("nope") {
            Ok(_) => panic!("expected resolve to fail"),
            Err(e) => e,
        };
        assert!(matches!(err, DeskPilotError::ToolNotFound(name) if name == "nope"));
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(DummyTool("alpha"))).unwrap();
        let err = registry.register(Arc::new(DummyTool("alpha"))).unwrap_err();
        assert!(matches!(err, DeskPilotError::Config(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn descriptors_follow_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(DummyTool("zeta"))).unwrap();
        registry.register(Arc::new(DummyTool("alpha"))).unwrap();

        let defs = registry.descriptors();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].function.name, "zeta");
        assert_eq!(defs[1].function.name, "alpha");
        assert_eq!(defs[0].def_type, "function");
    }
}
