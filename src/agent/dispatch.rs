use crate::agent::context::ConversationContext;
use crate::agent::transcript::Transcript;
use crate::config::AgentConfig;
use crate::errors::DeskPilotResult;
use crate::llm::registry::ProviderRegistry;
use crate::llm::types::{ChatMessage, MessageContent, ToolCall};
use crate::tools::{schema, ToolOutcome, ToolRegistry};

/// Whether tool outcomes are fed back to the model for further rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnMode {
    /// One prompt, one optional tool batch, done.
    Single,
    /// Outcomes are appended to the conversation and the loop returns
    /// to prompting, bounded by `agent.max_turns`.
    Conversational,
}

/// One executed tool invocation with its captured outcome.
#[derive(Debug, Clone)]
pub struct ExecutedCall {
    pub call: ToolCall,
    pub outcome: ToolOutcome,
}

/// Summary of one user-visible turn.
#[derive(Debug, Clone, Default)]
pub struct TurnReport {
    /// Final free-text answer from the model (may be empty).
    pub text: String,
    /// Every tool execution captured during the turn, in order.
    pub executed: Vec<ExecutedCall>,
    /// Prompt→tool cycles consumed.
    pub rounds: u32,
}

impl TurnReport {
    pub fn all_succeeded(&self) -> bool {
        self.executed.iter().all(|e| e.outcome.is_success())
    }
}

/// Execute one batch of tool invocation requests, strictly in the order
/// received. Resolution or validation failure ends the batch
/// immediately (fail-fast): later calls never start. A tool's own
/// failed outcome is captured and execution continues.
pub async fn execute_batch(
    registry: &ToolRegistry,
    calls: &[ToolCall],
) -> DeskPilotResult<Vec<ExecutedCall>> {
    let mut executed = Vec::with_capacity(calls.len());

    for call in calls {
        let tool = registry.resolve(&call.function.name)?;
        let args = schema::validate_args(&tool.parameters_schema(), &call.function.arguments)?;

        tracing::info!(tool = %call.function.name, args = %call.function.arguments, "executing tool");
        let outcome = tool.execute(args).await;
        tracing::info!(
            tool = %call.function.name,
            success = outcome.is_success(),
            "tool execution captured"
        );

        executed.push(ExecutedCall {
            call: call.clone(),
            outcome,
        });
    }

    Ok(executed)
}

/// Resolve + validate + execute a single tool by name, outside any
/// model conversation (the direct CLI subcommands).
pub async fn invoke_direct(
    registry: &ToolRegistry,
    name: &str,
    args: serde_json::Value,
) -> DeskPilotResult<ToolOutcome> {
    let tool = registry.resolve(name)?;
    let validated = schema::validate_args(&tool.parameters_schema(), &args.to_string())?;
    Ok(tool.execute(validated).await)
}

/// The dispatch loop: mediates between conversational turns and tool
/// executions. All collaborators are passed in at construction; the
/// loop owns no global state.
pub struct DispatchLoop {
    session_id: String,
    registry: ToolRegistry,
    providers: ProviderRegistry,
    context: ConversationContext,
    transcript: Transcript,
    agent: AgentConfig,
    mode: TurnMode,
}

const SYSTEM_PROMPT: &str = "\
You are DeskPilot, a desktop automation agent.

You can see and control the user's desktop through tools: capture the
screen, list UI elements by selector (role:Button, name:Seven,
window:Calculator, automationid:X, text:substring), click elements,
type text, press keys, launch applications, open URLs, run shell
commands, read on-screen text, evaluate arithmetic, and draw shapes
with the mouse.

Rules:
- Prefer find_elements before clicking so you know the element exists.
- Use one tool at a time unless the steps are independent.
- When the task is done, answer in plain text without calling tools.
- Report honestly when something fails; do not retry endlessly.";

impl DispatchLoop {
    pub fn new(
        registry: ToolRegistry,
        providers: ProviderRegistry,
        transcript: Transcript,
        agent: AgentConfig,
        mode: TurnMode,
    ) -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(session = %session_id, ?mode, tools = registry.len(), "dispatch loop created");
        Self {
            session_id,
            registry,
            providers,
            context: ConversationContext::new(SYSTEM_PROMPT),
            transcript,
            agent,
            mode,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Forget the conversation so far (interactive `/reset`).
    pub fn reset(&mut self) {
        self.context.reset();
    }

    /// Run one user-visible turn: prompt, stream, execute any tool
    /// batch, report. In conversational mode outcomes are fed back and
    /// the cycle repeats until the model answers without tools, the
    /// round limit is reached, or too many consecutive tools fail.
    ///
    /// Loop-level failures (unknown tool, invalid arguments, provider
    /// errors) are reported and returned as errors; a tool's own failed
    /// outcome is reported and the loop continues normally.
    pub async fn run_turn(&mut self, input: &str) -> DeskPilotResult<TurnReport> {
        tracing::info!(session = %self.session_id, input_len = input.len(), "turn started");
        self.context.push(ChatMessage::text("user", input));

        let mut report = TurnReport::default();
        let mut consecutive_failures: u32 = 0;

        let max_rounds = match self.mode {
            TurnMode::Single => 1,
            TurnMode::Conversational => self.agent.max_turns.max(1),
        };

        for round in 0..max_rounds {
            report.rounds = round + 1;

            // ── Prompting + Streaming ─────────────────────────────────
            let (provider, call_cfg) = self.providers.call_config_for_role("tools")?;
            self.transcript.assistant_label();
            let response = match provider
                .chat(
                    self.context.snapshot(),
                    self.registry.descriptors(),
                    &call_cfg,
                    &self.transcript,
                )
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    self.transcript.error(&e.to_string());
                    return Err(e);
                }
            };

            self.context.push(ChatMessage {
                role: "assistant".into(),
                content: MessageContent::Text(response.content.clone()),
                tool_call_id: None,
                tool_calls: if response.tool_calls.is_empty() {
                    None
                } else {
                    Some(response.tool_calls.clone())
                },
            });
            report.text = response.content.clone();

            // ── Done: content-only response ends the turn ─────────────
            if response.tool_calls.is_empty() {
                return Ok(report);
            }

            // ── Tool-call detected → Executing ────────────────────────
            self.transcript.tool_calls_detected(&response.tool_calls);
            let executed = match execute_batch(&self.registry, &response.tool_calls).await {
                Ok(ex) => ex,
                Err(e) => {
                    // Fail-fast: report, end the turn, nothing further runs.
                    self.transcript.error(&e.to_string());
                    return Err(e);
                }
            };

            // ── Reporting ─────────────────────────────────────────────
            for ex in &executed {
                self.transcript.outcome(&ex.call.function.name, &ex.outcome);
                if ex.outcome.is_success() {
                    consecutive_failures = 0;
                } else {
                    consecutive_failures += 1;
                }

                if self.mode == TurnMode::Conversational {
                    self.context.push(ChatMessage::tool_result(
                        &ex.call.id,
                        ex.outcome.to_value().to_string(),
                    ));
                }
            }
            report.executed.extend(executed);

            if self.mode == TurnMode::Single {
                return Ok(report);
            }

            if consecutive_failures >= self.agent.max_failures {
                self.transcript.info(&format!(
                    "stopping after {consecutive_failures} consecutive tool failures"
                ));
                return Ok(report);
            }
        }

        self.transcript
            .info(&format!("round limit ({max_rounds}) reached"));
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::errors::DeskPilotError;
    use crate::llm::provider::{ChunkSink, LlmProvider};
    use crate::llm::types::{CallConfig, FunctionCall, LlmResponse, ToolDef};
    use crate::tools::Tool;

    /// Provider that replays a fixed script of responses.
    struct ScriptedProvider {
        responses: Mutex<VecDeque<LlmResponse>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<LlmResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn chat(
            &self,
            _messages: Vec<ChatMessage>,
            _tools: Vec<ToolDef>,
            _cfg: &CallConfig,
            _sink: &dyn ChunkSink,
        ) -> DeskPilotResult<LlmResponse> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| DeskPilotError::LlmProvider("script exhausted".into()))
        }

        async fn probe(&self) -> DeskPilotResult<()> {
            Ok(())
        }
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo the given text back."
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            })
        }
        async fn execute(&self, args: serde_json::Value) -> ToolOutcome {
            ToolOutcome::success(format!("echo: {}", args["text"].as_str().unwrap_or("")))
        }
    }

    fn tool_call(id: &str, name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            call_type: "function".into(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    fn loop_with(script: Vec<LlmResponse>, mode: TurnMode) -> DispatchLoop {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();

        let mut providers = ProviderRegistry::new("scripted".into());
        providers.register(Arc::new(ScriptedProvider::new(script)));

        DispatchLoop::new(
            registry,
            providers,
            crate::agent::Transcript::new(false),
            AgentConfig::default(),
            mode,
        )
    }

    fn response(content: &str, calls: Vec<ToolCall>) -> LlmResponse {
        LlmResponse {
            content: content.into(),
            reasoning: String::new(),
            tool_calls: calls,
        }
    }

    #[tokio::test]
    async fn conversational_turn_feeds_outcomes_back_until_plain_answer() {
        let script = vec![
            response("", vec![tool_call("c1", "echo", r#"{"text":"one"}"#)]),
            response("all done", vec![]),
        ];
        let mut dispatch = loop_with(script, TurnMode::Conversational);

        let report = dispatch.run_turn("do the thing").await.unwrap();
        assert_eq!(report.rounds, 2);
        assert_eq!(report.executed.len(), 1);
        assert!(report.all_succeeded());
        assert_eq!(report.text, "all done");

        // system + user + assistant(tool call) + tool result + assistant answer
        assert_eq!(dispatch.context.len(), 5);
        let tool_msg = &dispatch.context.messages()[3];
        assert_eq!(tool_msg.role, "tool");
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn single_mode_stops_after_one_batch() {
        let script = vec![response(
            "",
            vec![tool_call("c1", "echo", r#"{"text":"once"}"#)],
        )];
        let mut dispatch = loop_with(script, TurnMode::Single);

        let report = dispatch.run_turn("hi").await.unwrap();
        assert_eq!(report.rounds, 1);
        assert_eq!(report.executed.len(), 1);
        // No tool message is fed back in single mode.
        assert!(dispatch.context.messages().iter().all(|m| m.role != "tool"));
    }

    #[tokio::test]
    async fn unknown_tool_ends_the_turn_as_an_error() {
        let script = vec![response(
            "",
            vec![tool_call("c1", "missing", "{}")],
        )];
        let mut dispatch = loop_with(script, TurnMode::Conversational);

        let err = dispatch.run_turn("hi").await.unwrap_err();
        assert!(matches!(err, DeskPilotError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn reset_clears_conversation_between_turns() {
        let script = vec![response("first", vec![]), response("second", vec![])];
        let mut dispatch = loop_with(script, TurnMode::Conversational);

        dispatch.run_turn("one").await.unwrap();
        assert!(dispatch.context.len() > 1);
        dispatch.reset();
        assert_eq!(dispatch.context.len(), 1);

        let report = dispatch.run_turn("two").await.unwrap();
        assert_eq!(report.text, "second");
    }
}
