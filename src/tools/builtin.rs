//! Built-in tool set wrapping the desktop facade.
//!
//! Every execute body follows the same contract: facade failures are
//! converted into a failed outcome at this boundary and never escape.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::{AgentConfig, RecognitionConfig, SafetyConfig};
use crate::errors::{DeskPilotError, DeskPilotResult};
use crate::facade::shapes::{self, ShapeKind};
use crate::facade::types::{MouseButton, Point};
use crate::facade::{Desktop, Selector};
use crate::tools::calc;
use crate::tools::outcome::ToolOutcome;
use crate::tools::traits::Tool;

/// Delay between successive drag waypoints.
const DRAG_PACE_MS: u64 = 12;

fn button_from_args(args: &Value) -> MouseButton {
    match args["button"].as_str() {
        Some("right") => MouseButton::Right,
        Some("middle") => MouseButton::Middle,
        _ => MouseButton::Left,
    }
}

// ── screenshot ──────────────────────────────────────────────────────────────

pub struct ScreenshotTool {
    desktop: Arc<dyn Desktop>,
}

impl ScreenshotTool {
    pub fn new(desktop: Arc<dyn Desktop>) -> Self {
        Self { desktop }
    }
}

#[async_trait]
impl Tool for ScreenshotTool {
    fn name(&self) -> &str {
        "screenshot"
    }

    fn description(&self) -> &str {
        "Capture the primary screen and save it as a PNG file in the working directory."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Optional output path; defaults to a timestamped file in the working directory"
                },
                "include_base64": {
                    "type": "boolean",
                    "description": "Also return the PNG as base64 in the payload"
                }
            },
            "required": []
        })
    }

    async fn execute(&self, args: Value) -> ToolOutcome {
        use base64::Engine as _;

        let shot = match self.desktop.capture_screen().await {
            Ok(s) => s,
            Err(e) => return ToolOutcome::failure(e.to_string()),
        };

        let path = match args["path"].as_str() {
            Some(p) => p.to_string(),
            None => format!(
                "{}_screenshot.png",
                chrono::Local::now().format("%Y%m%d_%H%M%S")
            ),
        };

        if let Err(e) = std::fs::write(&path, &shot.png_bytes) {
            return ToolOutcome::failure(format!("write '{path}': {e}"));
        }

        let mut payload = json!({
            "path": path,
            "width": shot.meta.physical_width,
            "height": shot.meta.physical_height,
        });
        if args["include_base64"].as_bool().unwrap_or(false) {
            payload["image_base64"] = Value::String(
                base64::engine::general_purpose::STANDARD.encode(&shot.png_bytes),
            );
        }

        ToolOutcome::success_with(
            format!(
                "Screenshot saved to {path} ({}x{})",
                shot.meta.physical_width, shot.meta.physical_height
            ),
            payload,
        )
    }
}

// ── find_elements ───────────────────────────────────────────────────────────

pub struct FindElementsTool {
    desktop: Arc<dyn Desktop>,
}

impl FindElementsTool {
    pub fn new(desktop: Arc<dyn Desktop>) -> Self {
        Self { desktop }
    }
}

#[async_trait]
impl Tool for FindElementsTool {
    fn name(&self) -> &str {
        "find_elements"
    }

    fn description(&self) -> &str {
        "List UI elements matching a selector (role:Button, name:Seven, window:Calculator, automationid:X, text:substring)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "selector": {
                    "type": "string",
                    "description": "Element selector in kind:value form"
                }
            },
            "required": ["selector"]
        })
    }

    async fn execute(&self, args: Value) -> ToolOutcome {
        let selector = match Selector::parse(args["selector"].as_str().unwrap_or_default()) {
            Ok(s) => s,
            Err(e) => return ToolOutcome::failure(e.to_string()),
        };

        match self.desktop.find_elements(&selector).await {
            Ok(elements) => {
                let count = elements.len();
                ToolOutcome::success_with(
                    format!("Found {count} element(s) matching '{selector}'"),
                    json!({
                        "count": count,
                        "elements": elements,
                    }),
                )
            }
            Err(e) => ToolOutcome::failure(e.to_string()),
        }
    }
}

// ── click_element ───────────────────────────────────────────────────────────

pub struct ClickElementTool {
    desktop: Arc<dyn Desktop>,
}

impl ClickElementTool {
    pub fn new(desktop: Arc<dyn Desktop>) -> Self {
        Self { desktop }
    }
}

#[async_trait]
impl Tool for ClickElementTool {
    fn name(&self) -> &str {
        "click_element"
    }

    fn description(&self) -> &str {
        "Locate a UI element by selector and click its centre."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "selector": {
                    "type": "string",
                    "description": "Element selector in kind:value form"
                },
                "button": {
                    "type": "string",
                    "enum": ["left", "right", "middle"],
                    "description": "Mouse button; defaults to left"
                },
                "double": {
                    "type": "boolean",
                    "description": "Double-click instead of single click"
                }
            },
            "required": ["selector"]
        })
    }

    async fn execute(&self, args: Value) -> ToolOutcome {
        let selector = match Selector::parse(args["selector"].as_str().unwrap_or_default()) {
            Ok(s) => s,
            Err(e) => return ToolOutcome::failure(e.to_string()),
        };
        let button = button_from_args(&args);
        let clicks = if args["double"].as_bool().unwrap_or(false) {
            2
        } else {
            1
        };

        match self.desktop.click(&selector, button, clicks).await {
            Ok(element) => ToolOutcome::success_with(
                format!("Clicked '{selector}'"),
                json!({ "element": element }),
            ),
            Err(e) => ToolOutcome::failure(e.to_string()),
        }
    }
}

// ── type_text / press_key ───────────────────────────────────────────────────

pub struct TypeTextTool {
    desktop: Arc<dyn Desktop>,
}

impl TypeTextTool {
    pub fn new(desktop: Arc<dyn Desktop>) -> Self {
        Self { desktop }
    }
}

#[async_trait]
impl Tool for TypeTextTool {
    fn name(&self) -> &str {
        "type_text"
    }

    fn description(&self) -> &str {
        "Type text at the current keyboard focus."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string", "description": "The text to type"}
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, args: Value) -> ToolOutcome {
        let text = args["text"].as_str().unwrap_or_default();
        match self.desktop.type_text(text).await {
            Ok(()) => ToolOutcome::success_with(
                format!("Typed {} character(s)", text.chars().count()),
                json!({"length": text.chars().count()}),
            ),
            Err(e) => ToolOutcome::failure(e.to_string()),
        }
    }
}

pub struct PressKeyTool {
    desktop: Arc<dyn Desktop>,
}

impl PressKeyTool {
    pub fn new(desktop: Arc<dyn Desktop>) -> Self {
        Self { desktop }
    }
}

#[async_trait]
impl Tool for PressKeyTool {
    fn name(&self) -> &str {
        "press_key"
    }

    fn description(&self) -> &str {
        "Press a key or key combination (enter, escape, tab, ctrl+c, ...)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "key": {"type": "string", "description": "Key name or +-separated combination"}
            },
            "required": ["key"]
        })
    }

    async fn execute(&self, args: Value) -> ToolOutcome {
        let key = args["key"].as_str().unwrap_or_default();
        match self.desktop.press_key(key).await {
            Ok(()) => ToolOutcome::success(format!("Pressed {key}")),
            Err(e) => ToolOutcome::failure(e.to_string()),
        }
    }
}

// ── open_application / open_url ─────────────────────────────────────────────

pub struct OpenApplicationTool {
    desktop: Arc<dyn Desktop>,
}

impl OpenApplicationTool {
    pub fn new(desktop: Arc<dyn Desktop>) -> Self {
        Self { desktop }
    }
}

#[async_trait]
impl Tool for OpenApplicationTool {
    fn name(&self) -> &str {
        "open_application"
    }

    fn description(&self) -> &str {
        "Launch an application by name."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "description": "Application name or executable"}
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, args: Value) -> ToolOutcome {
        let name = args["name"].as_str().unwrap_or_default();
        match self.desktop.open_application(name).await {
            Ok(()) => ToolOutcome::success(format!("Launched {name}")),
            Err(e) => ToolOutcome::failure(e.to_string()),
        }
    }
}

pub struct OpenUrlTool {
    desktop: Arc<dyn Desktop>,
}

impl OpenUrlTool {
    pub fn new(desktop: Arc<dyn Desktop>) -> Self {
        Self { desktop }
    }
}

#[async_trait]
impl Tool for OpenUrlTool {
    fn name(&self) -> &str {
        "open_url"
    }

    fn description(&self) -> &str {
        "Open an http(s) URL in the default browser."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "The URL to open"}
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value) -> ToolOutcome {
        let url = args["url"].as_str().unwrap_or_default();
        match self.desktop.open_url(url).await {
            Ok(()) => ToolOutcome::success(format!("Opened {url}")),
            Err(e) => ToolOutcome::failure(e.to_string()),
        }
    }
}

// ── run_command ─────────────────────────────────────────────────────────────

pub struct RunCommandTool {
    desktop: Arc<dyn Desktop>,
    allow_shell: bool,
    blocked: Vec<regex::Regex>,
}

impl RunCommandTool {
    pub fn new(desktop: Arc<dyn Desktop>, safety: &SafetyConfig) -> DeskPilotResult<Self> {
        let blocked = safety
            .blocked_patterns
            .iter()
            .map(|p| {
                regex::Regex::new(p).map_err(|e| {
                    DeskPilotError::Config(format!("invalid blocked pattern '{p}': {e}"))
                })
            })
            .collect::<DeskPilotResult<Vec<_>>>()?;
        Ok(Self {
            desktop,
            allow_shell: safety.allow_shell,
            blocked,
        })
    }
}

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Run a shell command and return its stdout, stderr and exit code."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {"type": "string", "description": "The shell command to execute"}
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: Value) -> ToolOutcome {
        let command = args["command"].as_str().unwrap_or_default();

        if !self.allow_shell {
            return ToolOutcome::failure(
                "shell commands are disabled (set [safety] allow_shell = true to enable)",
            );
        }
        if let Some(pat) = self.blocked.iter().find(|r| r.is_match(command)) {
            tracing::warn!(command, pattern = %pat, "blocked shell command");
            return ToolOutcome::failure(format!("command blocked by safety pattern '{pat}'"));
        }

        match self.desktop.run_command(command).await {
            Ok(out) => ToolOutcome::success_with(
                format!("Command exited with code {}", out.exit_code),
                json!({
                    "stdout": out.stdout,
                    "stderr": out.stderr,
                    "exit_code": out.exit_code,
                }),
            ),
            Err(e) => ToolOutcome::failure(e.to_string()),
        }
    }
}

// ── read_screen ─────────────────────────────────────────────────────────────

pub struct ReadScreenTool {
    desktop: Arc<dyn Desktop>,
    timeout: Duration,
}

impl ReadScreenTool {
    pub fn new(desktop: Arc<dyn Desktop>, recognition: &RecognitionConfig) -> Self {
        Self {
            desktop,
            timeout: Duration::from_millis(recognition.timeout_ms),
        }
    }
}

#[async_trait]
impl Tool for ReadScreenTool {
    fn name(&self) -> &str {
        "read_screen"
    }

    fn description(&self) -> &str {
        "Read the visible text on screen via the accessibility tree."
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}, "required": []})
    }

    async fn execute(&self, _args: Value) -> ToolOutcome {
        // Recognition races a fixed timeout; if the timeout wins, the
        // recognition task keeps running but its result is discarded.
        let desktop = self.desktop.clone();
        let recognition = tokio::spawn(async move { desktop.read_screen_text().await });

        match tokio::time::timeout(self.timeout, recognition).await {
            Ok(Ok(Ok(lines))) => ToolOutcome::success_with(
                format!("Read {} line(s) of text", lines.len()),
                json!({"count": lines.len(), "lines": lines}),
            ),
            Ok(Ok(Err(e))) => ToolOutcome::failure(e.to_string()),
            Ok(Err(join_err)) => ToolOutcome::failure(format!("recognition task failed: {join_err}")),
            Err(_) => ToolOutcome::failure(format!(
                "screen reading timed out after {}ms",
                self.timeout.as_millis()
            )),
        }
    }
}

// ── calculate ───────────────────────────────────────────────────────────────

pub struct CalculateTool;

#[async_trait]
impl Tool for CalculateTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression (operators + - * / % ^, functions sqrt/abs/floor/ceil/round/ln/log10/sin/cos/tan/min/max/pow, constants pi and e)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {"type": "string", "description": "The expression to evaluate"}
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, args: Value) -> ToolOutcome {
        let expression = args["expression"].as_str().unwrap_or_default();
        match calc::evaluate(expression) {
            Ok(value) => {
                let result = calc::format_value(value);
                ToolOutcome::success_with(
                    format!("{expression} = {result}"),
                    json!({"result": result}),
                )
            }
            Err(e) => ToolOutcome::failure(e),
        }
    }
}

// ── draw_shape ──────────────────────────────────────────────────────────────

pub struct DrawShapeTool {
    desktop: Arc<dyn Desktop>,
    best_effort_prepare: bool,
}

impl DrawShapeTool {
    pub fn new(desktop: Arc<dyn Desktop>, agent: &AgentConfig) -> Self {
        Self {
            desktop,
            best_effort_prepare: agent.best_effort_prepare,
        }
    }
}

#[async_trait]
impl Tool for DrawShapeTool {
    fn name(&self) -> &str {
        "draw_shape"
    }

    fn description(&self) -> &str {
        "Draw a shape (circle, square, triangle, star, heart, spiral) as a mouse drag, optionally clicking a tool button first."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "shape": {
                    "type": "string",
                    "enum": ["circle", "square", "triangle", "star", "heart", "spiral"],
                    "description": "Which shape to draw"
                },
                "center_x": {"type": "integer", "description": "Centre X in physical pixels; defaults to screen centre"},
                "center_y": {"type": "integer", "description": "Centre Y in physical pixels; defaults to screen centre"},
                "size": {"type": "number", "description": "Shape radius/half-size in pixels; defaults to 100"},
                "prepare_selector": {
                    "type": "string",
                    "description": "Optional element to click before drawing (e.g. a brush button)"
                }
            },
            "required": ["shape"]
        })
    }

    async fn execute(&self, args: Value) -> ToolOutcome {
        let kind = match ShapeKind::parse(args["shape"].as_str().unwrap_or_default()) {
            Ok(k) => k,
            Err(e) => return ToolOutcome::failure(e.to_string()),
        };
        let size = args["size"].as_f64().unwrap_or(100.0);
        if size <= 0.0 {
            return ToolOutcome::failure("size must be positive");
        }

        let center = match (args["center_x"].as_i64(), args["center_y"].as_i64()) {
            (Some(x), Some(y)) => Point {
                x: x as i32,
                y: y as i32,
            },
            _ => match self.desktop.screen_meta().await {
                Ok(meta) => Point {
                    x: meta.physical_width as i32 / 2,
                    y: meta.physical_height as i32 / 2,
                },
                Err(e) => return ToolOutcome::failure(e.to_string()),
            },
        };

        let mut skipped_prepare = false;
        if let Some(raw) = args["prepare_selector"].as_str() {
            let prepared = match Selector::parse(raw) {
                Ok(selector) => self
                    .desktop
                    .click(&selector, MouseButton::Left, 1)
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            if let Err(e) = prepared {
                if self.best_effort_prepare {
                    tracing::warn!(selector = raw, error = %e, "preparation click failed, continuing");
                    skipped_prepare = true;
                } else {
                    return ToolOutcome::failure(format!("preparation click failed: {e}"));
                }
            }
        }

        let points = shapes::generate(kind, center, size);
        match self
            .desktop
            .drag_path(&points, Duration::from_millis(DRAG_PACE_MS))
            .await
        {
            Ok(()) => ToolOutcome::success_with(
                format!(
                    "Drew {} at ({}, {}) with {} points",
                    kind.as_str(),
                    center.x,
                    center.y,
                    points.len()
                ),
                json!({
                    "shape": kind.as_str(),
                    "points": points.len(),
                    "skipped_prepare": skipped_prepare,
                }),
            ),
            Err(e) => ToolOutcome::failure(e.to_string()),
        }
    }
}

// ── wait ────────────────────────────────────────────────────────────────────

pub struct WaitTool;

#[async_trait]
impl Tool for WaitTool {
    fn name(&self) -> &str {
        "wait"
    }

    fn description(&self) -> &str {
        "Pause for a number of milliseconds."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "milliseconds": {"type": "integer", "description": "How long to wait (max 60000)"}
            },
            "required": ["milliseconds"]
        })
    }

    async fn execute(&self, args: Value) -> ToolOutcome {
        let ms = args["milliseconds"].as_u64().unwrap_or(1000).min(60_000);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        ToolOutcome::success(format!("Waited {ms}ms"))
    }
}
