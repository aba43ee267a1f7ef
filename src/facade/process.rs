use tokio::process::Command;

use crate::errors::{DeskPilotError, DeskPilotResult};
use crate::facade::types::CommandOutput;

/// Launch an application by name, detached from the agent process.
pub async fn open_application(name: &str) -> DeskPilotResult<()> {
    #[cfg(target_os = "windows")]
    let spawned = Command::new("cmd")
        .args(["/C", "start", "", name])
        .spawn();

    #[cfg(target_os = "macos")]
    let spawned = Command::new("open").args(["-a", name]).spawn();

    #[cfg(all(not(target_os = "windows"), not(target_os = "macos")))]
    let spawned = Command::new(name).spawn();

    spawned
        .map(|_| ())
        .map_err(|e| DeskPilotError::Facade(format!("launch '{name}': {e}")))
}

/// Open a URL in the system default browser.
pub async fn open_url(url: &str) -> DeskPilotResult<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(DeskPilotError::Facade(format!(
            "refusing to open non-http(s) URL '{url}'"
        )));
    }

    #[cfg(target_os = "windows")]
    let spawned = Command::new("cmd").args(["/C", "start", "", url]).spawn();

    #[cfg(target_os = "macos")]
    let spawned = Command::new("open").arg(url).spawn();

    #[cfg(all(not(target_os = "windows"), not(target_os = "macos")))]
    let spawned = Command::new("xdg-open").arg(url).spawn();

    spawned
        .map(|_| ())
        .map_err(|e| DeskPilotError::Facade(format!("open url '{url}': {e}")))
}

/// Run a shell command to completion and collect stdout/stderr/status.
pub async fn run_command(command: &str) -> DeskPilotResult<CommandOutput> {
    #[cfg(target_os = "windows")]
    let output = Command::new("cmd").args(["/C", command]).output().await;

    #[cfg(not(target_os = "windows"))]
    let output = Command::new("sh").args(["-c", command]).output().await;

    let output = output.map_err(|e| DeskPilotError::Facade(format!("run '{command}': {e}")))?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_command_collects_stdout_and_status() {
        let out = run_command("echo deskpilot").await.unwrap();
        assert_eq!(out.exit_code, 0);
        assert!(out.stdout.contains("deskpilot"));
    }

    #[tokio::test]
    async fn run_command_reports_nonzero_exit() {
        let out = run_command("exit 3").await.unwrap();
        assert_eq!(out.exit_code, 3);
    }

    #[tokio::test]
    async fn open_url_rejects_non_http_schemes() {
        assert!(open_url("file:///etc/passwd").await.is_err());
    }
}
