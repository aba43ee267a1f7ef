//! Accessibility-tree element collection.
//!
//! Walks the OS accessibility tree of the desktop and returns visible
//! elements with their bounding rectangles, roles, names, automation ids
//! and containing window titles. On platforms without an accessibility
//! backend the collection is empty, which callers treat as "no matches".

use crate::errors::DeskPilotResult;
use crate::facade::types::{ScreenMeta, UiElement};

// ── Windows implementation ──────────────────────────────────────────────────

#[cfg(target_os = "windows")]
mod win {
    use super::*;
    use crate::errors::DeskPilotError;
    use crate::facade::types::ElementRole;
    use windows::Win32::Foundation::RECT;
    use windows::Win32::System::Com::{
        CoCreateInstance, CoInitializeEx, CoUninitialize, CLSCTX_ALL, COINIT_MULTITHREADED,
    };
    use windows::Win32::UI::Accessibility::{
        CUIAutomation, IUIAutomation, IUIAutomationElement, IUIAutomationTreeWalker,
        UIA_CONTROLTYPE_ID,
    };

    /// RAII guard for COM initialization on the current thread.
    struct ComGuard;
    impl ComGuard {
        fn new() -> Result<Self, DeskPilotError> {
            unsafe {
                CoInitializeEx(None, COINIT_MULTITHREADED)
                    .ok()
                    .map_err(|e| DeskPilotError::Facade(format!("CoInitializeEx: {e}")))?;
            }
            Ok(Self)
        }
    }
    impl Drop for ComGuard {
        fn drop(&mut self) {
            unsafe { CoUninitialize() };
        }
    }

    /// Minimum normalised edge length — elements smaller than this are noise.
    const MIN_EDGE: f32 = 0.004;

    const MAX_DEPTH: u32 = 9;
    const MAX_ELEMENTS: usize = 800;

    /// Collects visible UI elements from the accessibility tree.
    /// Must be called from a blocking thread (COM is not async-safe).
    pub fn collect_elements_sync(meta: &ScreenMeta) -> DeskPilotResult<Vec<UiElement>> {
        let _com = ComGuard::new()?;

        let automation: IUIAutomation = unsafe {
            CoCreateInstance(&CUIAutomation, None, CLSCTX_ALL)
                .map_err(|e| DeskPilotError::Facade(format!("CoCreateInstance UIA: {e}")))?
        };

        let root = unsafe {
            automation
                .GetRootElement()
                .map_err(|e| DeskPilotError::Facade(format!("GetRootElement: {e}")))?
        };

        let walker = unsafe {
            automation
                .ControlViewWalker()
                .map_err(|e| DeskPilotError::Facade(format!("ControlViewWalker: {e}")))?
        };

        let mut elements = Vec::new();
        let mut counters = std::collections::HashMap::<&'static str, u32>::new();

        walk_tree(&walker, &root, meta, None, 0, &mut elements, &mut counters);

        tracing::debug!(count = elements.len(), "accessibility elements collected");
        Ok(elements)
    }

    fn walk_tree(
        walker: &IUIAutomationTreeWalker,
        element: &IUIAutomationElement,
        meta: &ScreenMeta,
        window: Option<&str>,
        depth: u32,
        out: &mut Vec<UiElement>,
        counters: &mut std::collections::HashMap<&'static str, u32>,
    ) {
        if depth > MAX_DEPTH || out.len() >= MAX_ELEMENTS {
            return;
        }

        // Extract element properties (ignore errors — some elements are inaccessible)
        let mut child_window: Option<String> = window.map(|s| s.to_string());
        if let Ok(ui_elem) = extract_element(element, meta, window, counters) {
            let bw = ui_elem.bbox[2] - ui_elem.bbox[0];
            let bh = ui_elem.bbox[3] - ui_elem.bbox[1];

            let too_small = bw < MIN_EDGE || bh < MIN_EDGE;
            // Unnamed containers and images carry no selector-addressable signal.
            let unnamed_low_signal = ui_elem.name.is_none()
                && ui_elem.automation_id.is_none()
                && matches!(
                    ui_elem.role,
                    ElementRole::Container | ElementRole::Unknown | ElementRole::Image
                );

            // Descendants of a window inherit its title for `window:` selectors.
            if ui_elem.role == ElementRole::Window {
                child_window = ui_elem.name.clone();
            }

            if !too_small && !unnamed_low_signal {
                out.push(ui_elem);
            }
        }

        let child = unsafe { walker.GetFirstChildElement(element) };
        let Ok(mut child) = child else { return };

        loop {
            walk_tree(
                walker,
                &child,
                meta,
                child_window.as_deref(),
                depth + 1,
                out,
                counters,
            );

            match unsafe { walker.GetNextSiblingElement(&child) } {
                Ok(next) => child = next,
                Err(_) => break,
            }
        }
    }

    fn extract_element(
        element: &IUIAutomationElement,
        meta: &ScreenMeta,
        window: Option<&str>,
        counters: &mut std::collections::HashMap<&'static str, u32>,
    ) -> DeskPilotResult<UiElement> {
        let rect: RECT = unsafe {
            element
                .CurrentBoundingRectangle()
                .map_err(|e| DeskPilotError::Facade(format!("bbox: {e}")))?
        };
        let name = unsafe { element.CurrentName().unwrap_or_default().to_string() };
        let automation_id = unsafe {
            element
                .CurrentAutomationId()
                .unwrap_or_default()
                .to_string()
        };
        let control_type = unsafe { element.CurrentControlType().unwrap_or(UIA_CONTROLTYPE_ID(0)) };
        let is_offscreen = unsafe { element.CurrentIsOffscreen().unwrap_or_default().as_bool() };
        if is_offscreen {
            return Err(DeskPilotError::Facade("offscreen".into()));
        }

        let role = control_type_to_role(control_type.0);
        let prefix = role_prefix(&role);

        let count = counters.entry(prefix).or_insert(0);
        *count += 1;
        let id = format!("{}_{}", prefix, count);

        // Convert screen rect to normalised [0, 1] using physical dimensions.
        // UIA rectangles are physical pixels for DPI-aware processes.
        let pw = meta.physical_width as f32;
        let ph = meta.physical_height as f32;
        let x1 = (rect.left as f32 / pw).clamp(0.0, 1.0);
        let y1 = (rect.top as f32 / ph).clamp(0.0, 1.0);
        let x2 = (rect.right as f32 / pw).clamp(0.0, 1.0);
        let y2 = (rect.bottom as f32 / ph).clamp(0.0, 1.0);

        Ok(UiElement {
            id,
            role,
            name: if name.is_empty() { None } else { Some(name) },
            automation_id: if automation_id.is_empty() {
                None
            } else {
                Some(automation_id)
            },
            window: window.map(|s| s.to_string()),
            bbox: [x1, y1, x2, y2],
        })
    }

    fn control_type_to_role(ct: i32) -> ElementRole {
        // UIA_*ControlTypeId values
        match ct {
            50000 => ElementRole::Button,    // Button
            50002 => ElementRole::Checkbox,  // CheckBox
            50003 => ElementRole::Select,    // ComboBox
            50004 => ElementRole::Input,     // Edit
            50005 => ElementRole::Link,      // Hyperlink
            50006 => ElementRole::Image,     // Image
            50007 => ElementRole::MenuItem,  // ListItem
            50008 => ElementRole::Container, // List
            50009 => ElementRole::Menu,      // Menu
            50010 => ElementRole::Menu,      // MenuBar
            50011 => ElementRole::MenuItem,  // MenuItem
            50013 => ElementRole::Radio,     // RadioButton
            50020 => ElementRole::Text,      // Text
            50021 => ElementRole::Container, // ToolBar
            50032 => ElementRole::Window,    // Window
            50033 => ElementRole::Text,      // TitleBar
            _ => ElementRole::Unknown,
        }
    }

    fn role_prefix(role: &ElementRole) -> &'static str {
        match role {
            ElementRole::Button => "btn",
            ElementRole::Input => "input",
            ElementRole::Link => "link",
            ElementRole::Icon => "icon",
            ElementRole::Checkbox => "chk",
            ElementRole::Radio => "radio",
            ElementRole::Select => "sel",
            ElementRole::Menu => "menu",
            ElementRole::MenuItem => "mi",
            ElementRole::Text => "txt",
            ElementRole::Image => "img",
            ElementRole::Window => "win",
            ElementRole::Container => "cont",
            ElementRole::Unknown => "unk",
        }
    }
}

// ── Async wrapper ───────────────────────────────────────────────────────────

/// Async entry point: spawns collection on a blocking thread.
#[cfg(target_os = "windows")]
pub async fn collect_elements(meta: &ScreenMeta) -> DeskPilotResult<Vec<UiElement>> {
    let meta = meta.clone();
    tokio::task::spawn_blocking(move || win::collect_elements_sync(&meta))
        .await
        .map_err(|e| crate::errors::DeskPilotError::Facade(format!("join: {e}")))?
}

#[cfg(not(target_os = "windows"))]
pub async fn collect_elements(_meta: &ScreenMeta) -> DeskPilotResult<Vec<UiElement>> {
    tracing::debug!("accessibility tree unavailable on this platform; returning no elements");
    Ok(Vec::new())
}
