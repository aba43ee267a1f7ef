use std::time::Duration;

use async_trait::async_trait;

use crate::config::RecognitionConfig;
use crate::errors::{DeskPilotError, DeskPilotResult};
use crate::facade::selector::Selector;
use crate::facade::traits::Desktop;
use crate::facade::types::{CommandOutput, MouseButton, Point, ScreenMeta, Screenshot, UiElement};
use crate::facade::{accessibility, capture, input, process};

/// Facade implementation backed by the real OS: xcap capture, enigo
/// input, accessibility-tree element lookup, shell process control.
pub struct NativeDesktop {
    recognition: RecognitionConfig,
}

impl NativeDesktop {
    pub fn new(recognition: RecognitionConfig) -> Self {
        Self { recognition }
    }
}

impl Default for NativeDesktop {
    fn default() -> Self {
        Self::new(RecognitionConfig::default())
    }
}

#[async_trait]
impl Desktop for NativeDesktop {
    async fn capture_screen(&self) -> DeskPilotResult<Screenshot> {
        capture::capture_primary().await
    }

    async fn screen_meta(&self) -> DeskPilotResult<ScreenMeta> {
        capture::primary_meta().await
    }

    async fn find_elements(&self, selector: &Selector) -> DeskPilotResult<Vec<UiElement>> {
        let meta = capture::primary_meta().await?;
        let elements = accessibility::collect_elements(&meta).await?;
        Ok(elements
            .into_iter()
            .filter(|e| selector.matches(e))
            .collect())
    }

    async fn wait_for_element(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> DeskPilotResult<UiElement> {
        let interval = Duration::from_millis(self.recognition.poll_interval_ms);
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(found) = self.find_elements(selector).await?.into_iter().next() {
                return Ok(found);
            }
            if tokio::time::Instant::now() + interval > deadline {
                return Err(DeskPilotError::Facade(format!(
                    "timed out after {}ms waiting for '{selector}'",
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(interval).await;
        }
    }

    async fn click(
        &self,
        selector: &Selector,
        button: MouseButton,
        clicks: u32,
    ) -> DeskPilotResult<UiElement> {
        let meta = capture::primary_meta().await?;
        let elements = accessibility::collect_elements(&meta).await?;
        let target = elements
            .into_iter()
            .find(|e| selector.matches(e))
            .ok_or_else(|| DeskPilotError::Facade(format!("no element matches '{selector}'")))?;

        let (x, y) = target.center_physical(&meta);
        tracing::info!(selector = %selector, id = %target.id, x, y, "clicking element");
        input::click_at(x, y, button, clicks).await?;
        Ok(target)
    }

    async fn click_at(
        &self,
        x: i32,
        y: i32,
        button: MouseButton,
        clicks: u32,
    ) -> DeskPilotResult<()> {
        input::click_at(x, y, button, clicks).await
    }

    async fn type_text(&self, text: &str) -> DeskPilotResult<()> {
        input::type_text(text.to_string()).await
    }

    async fn press_key(&self, key: &str) -> DeskPilotResult<()> {
        input::press_key(key.to_string()).await
    }

    async fn drag_path(&self, points: &[Point], pace: Duration) -> DeskPilotResult<()> {
        input::drag_path(points.to_vec(), pace).await
    }

    async fn open_application(&self, name: &str) -> DeskPilotResult<()> {
        process::open_application(name).await
    }

    async fn open_url(&self, url: &str) -> DeskPilotResult<()> {
        process::open_url(url).await
    }

    async fn run_command(&self, command: &str) -> DeskPilotResult<CommandOutput> {
        process::run_command(command).await
    }

    async fn read_screen_text(&self) -> DeskPilotResult<Vec<String>> {
        let meta = capture::primary_meta().await?;
        let elements = accessibility::collect_elements(&meta).await?;
        let mut seen = std::collections::HashSet::new();
        Ok(elements
            .into_iter()
            .filter_map(|e| e.name)
            .filter(|n| seen.insert(n.clone()))
            .collect())
    }
}
