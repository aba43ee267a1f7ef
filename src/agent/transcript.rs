use std::io::Write;

use colored::Colorize;

use crate::llm::provider::ChunkSink;
use crate::llm::types::{StreamChunk, StreamChunkKind, ToolCall};
use crate::tools::ToolOutcome;

/// Terminal rendering of one conversation: streamed model text, tool
/// call banners, and tool outcomes.
pub struct Transcript {
    show_reasoning: bool,
}

impl Transcript {
    pub fn new(show_reasoning: bool) -> Self {
        Self { show_reasoning }
    }

    pub fn user_prompt(&self) {
        print!("{} ", "you ›".bold().cyan());
        let _ = std::io::stdout().flush();
    }

    pub fn assistant_label(&self) {
        print!("{} ", "agent ›".bold().green());
        let _ = std::io::stdout().flush();
    }

    /// Banner printed when the model's response contains tool calls.
    pub fn tool_calls_detected(&self, calls: &[ToolCall]) {
        println!();
        for call in calls {
            println!(
                "{} {}({})",
                "→".yellow(),
                call.function.name.bold(),
                call.function.arguments.dimmed()
            );
        }
    }

    /// Render one captured outcome (the Reporting state).
    pub fn outcome(&self, tool_name: &str, outcome: &ToolOutcome) {
        match outcome {
            ToolOutcome::Success { message, payload } => {
                println!("{} {} {}", "✓".green().bold(), tool_name.bold(), message);
                if let Some(obj) = payload.as_object() {
                    if !obj.is_empty() {
                        let rendered = serde_json::to_string_pretty(payload)
                            .unwrap_or_else(|_| payload.to_string());
                        for line in rendered.lines() {
                            println!("  {}", line.dimmed());
                        }
                    }
                }
            }
            ToolOutcome::Failure { error } => {
                println!("{} {} {}", "✗".red().bold(), tool_name.bold(), error.red());
            }
        }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "error:".red().bold(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{}", message.dimmed());
    }
}

impl ChunkSink for Transcript {
    fn emit(&self, chunk: &StreamChunk) {
        match chunk.kind {
            StreamChunkKind::Content => {
                print!("{}", chunk.content);
                let _ = std::io::stdout().flush();
            }
            StreamChunkKind::Reasoning => {
                if self.show_reasoning {
                    print!("{}", chunk.content.dimmed());
                    let _ = std::io::stdout().flush();
                }
            }
            StreamChunkKind::Done => {
                println!();
            }
            // Tool calls are rendered once the batch is complete.
            StreamChunkKind::ToolCall => {}
            StreamChunkKind::Error => {
                eprintln!("{} {}", "stream error:".red(), chunk.content);
            }
        }
    }
}
