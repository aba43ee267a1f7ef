use std::time::Duration;

use async_trait::async_trait;

use crate::errors::DeskPilotResult;
use crate::facade::selector::Selector;
use crate::facade::types::{CommandOutput, MouseButton, Point, ScreenMeta, Screenshot, UiElement};

/// The desktop-automation facade. Every OS interaction the tool layer
/// performs goes through this trait, so tools can be exercised against
/// a recording double in tests.
///
/// Calls are independent of each other; the facade keeps no state
/// between them.
#[async_trait]
pub trait Desktop: Send + Sync {
    /// Capture the primary monitor as PNG bytes plus geometry.
    async fn capture_screen(&self) -> DeskPilotResult<Screenshot>;

    /// Geometry of the primary monitor without capturing pixels.
    async fn screen_meta(&self) -> DeskPilotResult<ScreenMeta>;

    /// All elements currently matching the selector. Zero matches is an
    /// empty Vec, not an error.
    async fn find_elements(&self, selector: &Selector) -> DeskPilotResult<Vec<UiElement>>;

    /// Poll for the first matching element until `timeout` elapses.
    async fn wait_for_element(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> DeskPilotResult<UiElement>;

    /// Locate the first matching element and click its centre.
    /// Not-found is a facade failure.
    async fn click(
        &self,
        selector: &Selector,
        button: MouseButton,
        clicks: u32,
    ) -> DeskPilotResult<UiElement>;

    /// Click at raw physical coordinates.
    async fn click_at(
        &self,
        x: i32,
        y: i32,
        button: MouseButton,
        clicks: u32,
    ) -> DeskPilotResult<()>;

    /// Type text at the current focus.
    async fn type_text(&self, text: &str) -> DeskPilotResult<()>;

    /// Press a named key ("enter", "escape", "tab", single characters, ...).
    async fn press_key(&self, key: &str) -> DeskPilotResult<()>;

    /// Press at the first point, move through the rest with fixed
    /// pacing, release at the last point.
    async fn drag_path(&self, points: &[Point], pace: Duration) -> DeskPilotResult<()>;

    /// Launch an application by name.
    async fn open_application(&self, name: &str) -> DeskPilotResult<()>;

    /// Open a URL in the default browser.
    async fn open_url(&self, url: &str) -> DeskPilotResult<()>;

    /// Run a shell command to completion and collect its output.
    async fn run_command(&self, command: &str) -> DeskPilotResult<CommandOutput>;

    /// Visible-text extraction from the accessibility tree. This is the
    /// long-running recognition operation callers race against a timeout.
    async fn read_screen_text(&self) -> DeskPilotResult<Vec<String>>;
}
