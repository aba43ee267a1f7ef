//! DeskPilot command-line front end.
//!
//! Direct subcommands execute a single registry tool without a model;
//! `chat` talks to the configured inference backend through the
//! dispatch loop.

use std::io::BufRead;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;

use deskpilot::agent::{invoke_direct, DispatchLoop, Transcript, TurnMode};
use deskpilot::config::{self, AppConfig};
use deskpilot::errors::{DeskPilotError, DeskPilotResult};
use deskpilot::facade::NativeDesktop;
use deskpilot::llm::registry::ProviderRegistry;
use deskpilot::tools::{builtin_registry, ToolOutcome, ToolRegistry};

#[derive(Parser, Debug)]
#[command(name = "deskpilot")]
#[command(version)]
#[command(about = "Desktop automation agent and CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (debug, info, warn, error).
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Also print model reasoning tokens in chat mode.
    #[arg(long)]
    show_reasoning: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Capture the primary screen to a PNG file.
    Screenshot {
        /// Output path; defaults to a timestamped file in the working directory.
        path: Option<String>,
    },

    /// List UI elements matching a selector (e.g. "role:Button").
    Find { selector: String },

    /// Click the first element matching a selector.
    Click {
        selector: String,
        /// Use the right mouse button.
        #[arg(long)]
        right: bool,
        /// Double-click instead of single click.
        #[arg(long)]
        double: bool,
    },

    /// Type text at the current focus.
    Type { text: String },

    /// Press a key or key combination (enter, ctrl+c, ...).
    Key { key: String },

    /// Launch an application by name.
    Open { name: String },

    /// Open a URL in the default browser.
    Url { url: String },

    /// Run a shell command (requires [safety] allow_shell = true).
    Run { command: String },

    /// Evaluate an arithmetic expression.
    Calc { expression: String },

    /// Draw a shape with the mouse (circle, square, triangle, star, heart, spiral).
    Draw {
        shape: String,
        /// Centre X in physical pixels; defaults to the screen centre.
        #[arg(long)]
        x: Option<i64>,
        /// Centre Y in physical pixels; defaults to the screen centre.
        #[arg(long)]
        y: Option<i64>,
        /// Shape radius/half-size in pixels.
        #[arg(long, default_value_t = 100.0)]
        size: f64,
        /// Element to click before drawing (e.g. "name:Brush").
        #[arg(long)]
        prepare: Option<String>,
    },

    /// Read visible on-screen text via the accessibility tree.
    Read,

    /// Chat with the agent; give a message for one turn, none for interactive mode.
    Chat { message: Option<String> },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let config = match config::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(error = %e, "no config.toml found; using defaults");
            AppConfig::default()
        }
    };

    std::process::exit(run(cli, config).await);
}

async fn run(cli: Cli, config: AppConfig) -> i32 {
    let transcript = Transcript::new(cli.show_reasoning);

    let desktop = Arc::new(NativeDesktop::new(config.recognition.clone()));
    let registry = match builtin_registry(desktop, &config) {
        Ok(r) => r,
        Err(e) => {
            transcript.error(&e.to_string());
            return 1;
        }
    };

    let result = match cli.command {
        Commands::Screenshot { path } => {
            direct(&registry, &transcript, "screenshot", serde_json::json!({ "path": path })).await
        }
        Commands::Find { selector } => {
            direct(&registry, &transcript, "find_elements", serde_json::json!({ "selector": selector })).await
        }
        Commands::Click {
            selector,
            right,
            double,
        } => {
            let button = if right { "right" } else { "left" };
            direct(
                &registry,
                &transcript,
                "click_element",
                serde_json::json!({ "selector": selector, "button": button, "double": double }),
            )
            .await
        }
        Commands::Type { text } => {
            direct(&registry, &transcript, "type_text", serde_json::json!({ "text": text })).await
        }
        Commands::Key { key } => {
            direct(&registry, &transcript, "press_key", serde_json::json!({ "key": key })).await
        }
        Commands::Open { name } => {
            direct(&registry, &transcript, "open_application", serde_json::json!({ "name": name })).await
        }
        Commands::Url { url } => {
            direct(&registry, &transcript, "open_url", serde_json::json!({ "url": url })).await
        }
        Commands::Run { command } => {
            direct(&registry, &transcript, "run_command", serde_json::json!({ "command": command })).await
        }
        Commands::Calc { expression } => {
            direct(&registry, &transcript, "calculate", serde_json::json!({ "expression": expression })).await
        }
        Commands::Draw {
            shape,
            x,
            y,
            size,
            prepare,
        } => {
            direct(
                &registry,
                &transcript,
                "draw_shape",
                serde_json::json!({
                    "shape": shape,
                    "center_x": x,
                    "center_y": y,
                    "size": size,
                    "prepare_selector": prepare,
                }),
            )
            .await
        }
        Commands::Read => direct(&registry, &transcript, "read_screen", serde_json::json!({})).await,
        Commands::Chat { message } => {
            return chat(registry, config, transcript, message).await;
        }
    };

    match result {
        Ok(outcome) => {
            if outcome.is_success() {
                0
            } else {
                1
            }
        }
        Err(e) => {
            transcript.error(&e.to_string());
            1
        }
    }
}

/// Execute one registry tool outside any model conversation and render
/// its outcome.
async fn direct(
    registry: &ToolRegistry,
    transcript: &Transcript,
    name: &str,
    args: serde_json::Value,
) -> DeskPilotResult<ToolOutcome> {
    let outcome = invoke_direct(registry, name, args).await?;
    transcript.outcome(name, &outcome);
    Ok(outcome)
}

async fn chat(
    registry: ToolRegistry,
    config: AppConfig,
    transcript: Transcript,
    message: Option<String>,
) -> i32 {
    let providers = ProviderRegistry::from_config(&config);

    // The backend is probed exactly once, before any conversation.
    if let Err(e) = providers.ensure_available().await {
        transcript.error(&e.to_string());
        if matches!(e, DeskPilotError::ModelUnavailable(_)) {
            eprintln!(
                "{}",
                "Start your inference server (e.g. `ollama serve`) and check \
                 [llm.providers] in config.toml, then try again."
                    .dimmed()
            );
        }
        return 1;
    }

    let mode = if message.is_some() {
        TurnMode::Single
    } else {
        TurnMode::Conversational
    };
    let mut dispatch = DispatchLoop::new(registry, providers, transcript, config.agent, mode);

    if let Some(message) = message {
        return match dispatch.run_turn(&message).await {
            Ok(_) => 0,
            Err(_) => 1,
        };
    }

    println!(
        "{}",
        "DeskPilot interactive chat — type a task, 'reset' to clear the \
         conversation, or 'exit' to quit."
            .dimmed()
    );

    let stdin = std::io::stdin();
    loop {
        dispatch.transcript().user_prompt();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                dispatch.transcript().error(&format!("stdin: {e}"));
                break;
            }
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line {
            "exit" | "quit" => break,
            "reset" => {
                dispatch.reset();
                dispatch.transcript().info("conversation cleared");
                continue;
            }
            _ => {}
        }

        // Loop-level failures end the turn but not the session.
        if let Err(e) = dispatch.run_turn(line).await {
            tracing::debug!(error = %e, "turn failed");
        }
    }

    0
}
