use async_trait::async_trait;

use crate::tools::outcome::ToolOutcome;

/// A named, schema-described operation exposed to the language model.
///
/// `execute` receives arguments already validated against
/// `parameters_schema` and must always terminate with a `ToolOutcome`:
/// facade failures are converted at this boundary, never propagated.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (used in function calls; unique within a registry).
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with validated arguments.
    async fn execute(&self, args: serde_json::Value) -> ToolOutcome;
}
