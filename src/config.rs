use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{DeskPilotError, DeskPilotResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub recognition: RecognitionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    pub active_provider: String,
    pub providers: HashMap<String, ProviderEntry>,
    /// Role-to-model mapping. If a role is absent, falls back to active_provider defaults.
    #[serde(default)]
    pub roles: RolesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub display_name: String,
    pub api_base: String,
    /// Default model for this provider (used as fallback when no role config exists).
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Optional API key stored in config.toml (falls back to env var DESKPILOT_<ID>_API_KEY).
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Maps agent roles to specific provider+model combinations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RolesConfig {
    /// Main conversational LLM: streaming reply shown to the user.
    pub chat: Option<RoleEntry>,
    /// Tool-calling / function-call capable model.
    pub tools: Option<RoleEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleEntry {
    /// Must match a key under [llm.providers.*].
    pub provider: String,
    /// Model name sent to the API.
    pub model: String,
    /// Use SSE streaming. Set false for non-interactive calls.
    #[serde(default = "default_true")]
    pub stream: bool,
    /// Overrides the provider-level temperature for this role.
    pub temperature: Option<f64>,
}

fn default_temperature() -> f64 {
    0.1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Upper bound on prompt→tool→prompt cycles within one chat turn.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Consecutive failed tool executions before the loop gives up.
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
    /// When true, a failed optional preparation step (e.g. selecting a
    /// brush before drawing) is logged and skipped instead of failing
    /// the whole operation.
    #[serde(default = "default_true")]
    pub best_effort_prepare: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            max_failures: default_max_failures(),
            best_effort_prepare: true,
        }
    }
}

fn default_max_turns() -> u32 {
    12
}

fn default_max_failures() -> u32 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Master switch for the run_command tool.
    #[serde(default)]
    pub allow_shell: bool,
    /// Regex patterns that run_command refuses to execute.
    #[serde(default)]
    pub blocked_patterns: Vec<String>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            allow_shell: false,
            blocked_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// Time limit for the screen-text recognition race; the slower side is discarded.
    #[serde(default = "default_recognition_timeout")]
    pub timeout_ms: u64,
    /// Interval between accessibility-tree polls while waiting for an element.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_recognition_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

fn default_recognition_timeout() -> u64 {
    5000
}

fn default_poll_interval() -> u64 {
    200
}

fn default_true() -> bool {
    true
}

fn resolve_config_path() -> DeskPilotResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    if let Some(config_dir) = dirs::config_dir() {
        let candidate = config_dir.join("deskpilot").join("config.toml");
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in user config directory");
            return Ok(candidate);
        }
    }

    Err(DeskPilotError::Config(
        "config.toml not found next to executable, in working directory, or under the user config directory".into(),
    ))
}

pub fn load_config() -> DeskPilotResult<AppConfig> {
    let path = resolve_config_path()?;
    let content = std::fs::read_to_string(&path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), provider = %config.llm.active_provider, "config loaded");
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> DeskPilotResult<()> {
    let path = resolve_config_path()?;
    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let toml_src = r#"
            [llm]
            active_provider = "local"

            [llm.providers.local]
            display_name = "Local"
            api_base = "http://localhost:11434/v1/chat/completions"
            model = "qwen2.5:7b"
        "#;
        let cfg: AppConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(cfg.llm.active_provider, "local");
        assert!((cfg.llm.providers["local"].temperature - 0.1).abs() < f64::EPSILON);
        assert_eq!(cfg.agent.max_turns, 12);
        assert!(!cfg.safety.allow_shell);
        assert_eq!(cfg.recognition.timeout_ms, 5000);
    }

    #[test]
    fn safety_section_round_trips(){
        let toml_src = r#"
            [llm]
            active_provider = "x"

            [llm.providers.x]
            display_name = "X"
            api_base = "http://example.invalid/v1/chat/completions"
            model = "m"

            [safety]
            allow_shell = true
            blocked_patterns = ["rm\\s+-rf", "mkfs"]
        "#;
        let cfg: AppConfig = toml::from_str(toml_src).unwrap();
        assert!(cfg.safety.allow_shell);
        assert_eq!(cfg.safety.blocked_patterns.len(), 2);
    }
}
