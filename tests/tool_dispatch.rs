//! Registry + dispatch batch behaviour against a recording facade double.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use deskpilot::agent::{execute_batch, invoke_direct};
use deskpilot::config::AppConfig;
use deskpilot::errors::{DeskPilotError, DeskPilotResult};
use deskpilot::facade::types::{
    CommandOutput, ElementRole, MouseButton, Point, ScreenMeta, Screenshot, UiElement,
};
use deskpilot::facade::{Desktop, Selector};
use deskpilot::llm::types::{FunctionCall, ToolCall};
use deskpilot::tools::{builtin_registry, ToolOutcome, ToolRegistry};

/// Facade double that records every call in order.
struct MockDesktop {
    log: Mutex<Vec<String>>,
    elements: Vec<UiElement>,
}

impl MockDesktop {
    fn new(elements: Vec<UiElement>) -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            elements,
        }
    }

    fn record(&self, entry: impl Into<String>) {
        self.log.lock().unwrap().push(entry.into());
    }

    fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn meta() -> ScreenMeta {
        ScreenMeta {
            monitor_index: 0,
            scale_factor: 1.0,
            physical_width: 1920,
            physical_height: 1080,
            logical_width: 1920,
            logical_height: 1080,
        }
    }
}

#[async_trait]
impl Desktop for MockDesktop {
    async fn capture_screen(&self) -> DeskPilotResult<Screenshot> {
        self.record("capture_screen");
        Ok(Screenshot {
            png_bytes: vec![0x89, b'P', b'N', b'G'],
            meta: Self::meta(),
        })
    }

    async fn screen_meta(&self) -> DeskPilotResult<ScreenMeta> {
        Ok(Self::meta())
    }

    async fn find_elements(&self, selector: &Selector) -> DeskPilotResult<Vec<UiElement>> {
        self.record(format!("find:{selector}"));
        Ok(self
            .elements
            .iter()
            .filter(|e| selector.matches(e))
            .cloned()
            .collect())
    }

    async fn wait_for_element(
        &self,
        selector: &Selector,
        _timeout: Duration,
    ) -> DeskPilotResult<UiElement> {
        self.elements
            .iter()
            .find(|e| selector.matches(e))
            .cloned()
            .ok_or_else(|| DeskPilotError::Facade(format!("timed out waiting for '{selector}'")))
    }

    async fn click(
        &self,
        selector: &Selector,
        _button: MouseButton,
        _clicks: u32,
    ) -> DeskPilotResult<UiElement> {
        self.record(format!("click:{selector}"));
        self.elements
            .iter()
            .find(|e| selector.matches(e))
            .cloned()
            .ok_or_else(|| DeskPilotError::Facade(format!("no element matches '{selector}'")))
    }

    async fn click_at(
        &self,
        x: i32,
        y: i32,
        _button: MouseButton,
        _clicks: u32,
    ) -> DeskPilotResult<()> {
        self.record(format!("click_at:{x},{y}"));
        Ok(())
    }

    async fn type_text(&self, text: &str) -> DeskPilotResult<()> {
        self.record(format!("type:{text}"));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> DeskPilotResult<()> {
        self.record(format!("key:{key}"));
        Ok(())
    }

    async fn drag_path(&self, points: &[Point], _pace: Duration) -> DeskPilotResult<()> {
        self.record(format!("drag:{}", points.len()));
        Ok(())
    }

    async fn open_application(&self, name: &str) -> DeskPilotResult<()> {
        self.record(format!("open:{name}"));
        Ok(())
    }

    async fn open_url(&self, url: &str) -> DeskPilotResult<()> {
        self.record(format!("url:{url}"));
        Ok(())
    }

    async fn run_command(&self, command: &str) -> DeskPilotResult<CommandOutput> {
        self.record(format!("run:{command}"));
        Ok(CommandOutput {
            stdout: "ok\n".into(),
            stderr: String::new(),
            exit_code: 0,
        })
    }

    async fn read_screen_text(&self) -> DeskPilotResult<Vec<String>> {
        self.record("read_screen_text");
        Ok(vec!["Calculator".into(), "Seven".into()])
    }
}

fn seven_button() -> UiElement {
    UiElement {
        id: "btn_1".into(),
        role: ElementRole::Button,
        name: Some("Seven".into()),
        automation_id: Some("num7Button".into()),
        window: Some("Calculator".into()),
        bbox: [0.1, 0.1, 0.2, 0.2],
    }
}

fn registry_with(desktop: Arc<MockDesktop>) -> ToolRegistry {
    builtin_registry(desktop, &AppConfig::default()).unwrap()
}

fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.into(),
        call_type: "function".into(),
        function: FunctionCall {
            name: name.into(),
            arguments: arguments.into(),
        },
    }
}

#[tokio::test]
async fn batch_executes_strictly_in_request_order() {
    let desktop = Arc::new(MockDesktop::new(vec![seven_button()]));
    let registry = registry_with(desktop.clone());

    let calls = vec![
        call("a", "type_text", r#"{"text":"first"}"#),
        call("b", "click_element", r#"{"selector":"name:Seven"}"#),
        call("c", "press_key", r#"{"key":"enter"}"#),
    ];

    let executed = execute_batch(&registry, &calls).await.unwrap();
    assert_eq!(executed.len(), 3);
    assert!(executed.iter().all(|e| e.outcome.is_success()));

    assert_eq!(
        desktop.calls(),
        vec!["type:first", "click:name:Seven", "key:enter"]
    );
}

#[tokio::test]
async fn unknown_tool_fails_the_batch_before_any_later_call() {
    let desktop = Arc::new(MockDesktop::new(vec![seven_button()]));
    let registry = registry_with(desktop.clone());

    let calls = vec![
        call("a", "type_text", r#"{"text":"ran"}"#),
        call("b", "no_such_tool", "{}"),
        call("c", "type_text", r#"{"text":"never"}"#),
    ];

    let err = execute_batch(&registry, &calls).await.unwrap_err();
    assert!(matches!(err, DeskPilotError::ToolNotFound(name) if name == "no_such_tool"));

    // The first call ran; the one after the failure never started.
    assert_eq!(desktop.calls(), vec!["type:ran"]);
}

#[tokio::test]
async fn invalid_arguments_fail_fast_with_no_side_effect() {
    let desktop = Arc::new(MockDesktop::new(vec![seven_button()]));
    let registry = registry_with(desktop.clone());

    // Missing the required "text" field.
    let calls = vec![
        call("a", "type_text", r#"{"txet":"typo"}"#),
        call("b", "click_element", r#"{"selector":"name:Seven"}"#),
    ];

    let err = execute_batch(&registry, &calls).await.unwrap_err();
    assert!(matches!(err, DeskPilotError::InvalidArguments(_)));
    assert!(desktop.calls().is_empty());
}

#[tokio::test]
async fn wrong_argument_type_is_rejected_without_side_effect() {
    let desktop = Arc::new(MockDesktop::new(vec![seven_button()]));
    let registry = registry_with(desktop.clone());

    let err = invoke_direct(&registry, "type_text", serde_json::json!({"text": 42}))
        .await
        .unwrap_err();
    assert!(matches!(err, DeskPilotError::InvalidArguments(_)));
    assert!(desktop.calls().is_empty());
}

#[tokio::test]
async fn facade_not_found_becomes_a_failed_outcome_not_an_error() {
    let desktop = Arc::new(MockDesktop::new(vec![seven_button()]));
    let registry = registry_with(desktop.clone());

    let outcome = invoke_direct(
        &registry,
        "click_element",
        serde_json::json!({"selector": "name:DoesNotExist"}),
    )
    .await
    .unwrap();

    match outcome {
        ToolOutcome::Failure { error } => assert!(error.contains("DoesNotExist")),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn tool_failure_does_not_stop_the_batch() {
    let desktop = Arc::new(MockDesktop::new(vec![seven_button()]));
    let registry = registry_with(desktop.clone());

    let calls = vec![
        call("a", "click_element", r#"{"selector":"name:DoesNotExist"}"#),
        call("b", "type_text", r#"{"text":"still runs"}"#),
    ];

    let executed = execute_batch(&registry, &calls).await.unwrap();
    assert_eq!(executed.len(), 2);
    assert!(!executed[0].outcome.is_success());
    assert!(executed[1].outcome.is_success());
    assert!(desktop.calls().contains(&"type:still runs".to_string()));
}

#[tokio::test]
async fn find_with_zero_matches_is_success() {
    let desktop = Arc::new(MockDesktop::new(vec![seven_button()]));
    let registry = registry_with(desktop);

    let outcome = invoke_direct(
        &registry,
        "find_elements",
        serde_json::json!({"selector": "role:checkbox"}),
    )
    .await
    .unwrap();

    let json = outcome.to_value();
    assert_eq!(json["success"], serde_json::json!(true));
    assert_eq!(json["count"], serde_json::json!(0));
    assert_eq!(json["elements"], serde_json::json!([]));
}

#[tokio::test]
async fn calc_end_to_end() {
    let desktop = Arc::new(MockDesktop::new(Vec::new()));
    let registry = registry_with(desktop);

    let outcome = invoke_direct(
        &registry,
        "calculate",
        serde_json::json!({"expression": "2+2"}),
    )
    .await
    .unwrap();

    let json = outcome.to_value();
    assert_eq!(json["success"], serde_json::json!(true));
    assert_eq!(json["result"], serde_json::json!("4"));
    assert_eq!(json["message"], serde_json::json!("2+2 = 4"));
}

#[tokio::test]
async fn shell_tool_is_gated_by_config() {
    let desktop = Arc::new(MockDesktop::new(Vec::new()));

    // Default config: shell disabled.
    let registry = registry_with(desktop.clone());
    let outcome = invoke_direct(
        &registry,
        "run_command",
        serde_json::json!({"command": "echo hi"}),
    )
    .await
    .unwrap();
    assert!(!outcome.is_success());
    assert!(desktop.calls().is_empty());

    // Enabled, but with a blocked pattern.
    let mut config = AppConfig::default();
    config.safety.allow_shell = true;
    config.safety.blocked_patterns = vec![r"rm\s+-rf".into()];
    let registry = builtin_registry(desktop.clone(), &config).unwrap();

    let blocked = invoke_direct(
        &registry,
        "run_command",
        serde_json::json!({"command": "rm -rf /"}),
    )
    .await
    .unwrap();
    assert!(!blocked.is_success());
    assert!(desktop.calls().is_empty());

    let allowed = invoke_direct(
        &registry,
        "run_command",
        serde_json::json!({"command": "echo hi"}),
    )
    .await
    .unwrap();
    assert!(allowed.is_success());
    assert_eq!(allowed.to_value()["exit_code"], serde_json::json!(0));
    assert_eq!(desktop.calls(), vec!["run:echo hi"]);
}

#[tokio::test]
async fn draw_shape_replays_points_through_the_facade() {
    let desktop = Arc::new(MockDesktop::new(Vec::new()));
    let registry = registry_with(desktop.clone());

    let outcome = invoke_direct(
        &registry,
        "draw_shape",
        serde_json::json!({"shape": "circle", "center_x": 500, "center_y": 400, "size": 80}),
    )
    .await
    .unwrap();

    assert!(outcome.is_success());
    let calls = desktop.calls();
    assert_eq!(calls.len(), 1);
    // 64 samples plus the closing point.
    assert_eq!(calls[0], "drag:65");
}

#[tokio::test]
async fn draw_shape_prepare_click_is_best_effort_by_default() {
    let desktop = Arc::new(MockDesktop::new(Vec::new())); // no brush element
    let registry = registry_with(desktop.clone());

    let outcome = invoke_direct(
        &registry,
        "draw_shape",
        serde_json::json!({
            "shape": "square",
            "center_x": 300,
            "center_y": 300,
            "prepare_selector": "name:Brush",
        }),
    )
    .await
    .unwrap();

    // The failed preparation click is skipped and the drag still happens.
    assert!(outcome.is_success());
    assert_eq!(outcome.to_value()["skipped_prepare"], serde_json::json!(true));
    let calls = desktop.calls();
    assert_eq!(calls[0], "click:name:Brush");
    assert!(calls[1].starts_with("drag:"));
}

#[tokio::test]
async fn draw_shape_prepare_failure_aborts_when_strict() {
    let desktop = Arc::new(MockDesktop::new(Vec::new()));
    let mut config = AppConfig::default();
    config.agent.best_effort_prepare = false;
    let registry = builtin_registry(desktop.clone(), &config).unwrap();

    let outcome = invoke_direct(
        &registry,
        "draw_shape",
        serde_json::json!({
            "shape": "star",
            "center_x": 300,
            "center_y": 300,
            "prepare_selector": "name:Brush",
        }),
    )
    .await
    .unwrap();

    assert!(!outcome.is_success());
    // Only the failed preparation click reached the facade.
    assert_eq!(desktop.calls(), vec!["click:name:Brush"]);
}

#[tokio::test]
async fn read_screen_returns_accessible_text() {
    let desktop = Arc::new(MockDesktop::new(Vec::new()));
    let registry = registry_with(desktop);

    let outcome = invoke_direct(&registry, "read_screen", serde_json::json!({}))
        .await
        .unwrap();
    let json = outcome.to_value();
    assert_eq!(json["count"], serde_json::json!(2));
    assert_eq!(json["lines"][1], serde_json::json!("Seven"));
}
