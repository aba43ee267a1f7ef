use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementRole {
    Button,
    Input,
    Link,
    Text,
    Image,
    Checkbox,
    Radio,
    Select,
    Menu,
    MenuItem,
    Icon,
    Window,
    Container,
    Unknown,
}

impl ElementRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementRole::Button => "button",
            ElementRole::Input => "input",
            ElementRole::Link => "link",
            ElementRole::Text => "text",
            ElementRole::Image => "image",
            ElementRole::Checkbox => "checkbox",
            ElementRole::Radio => "radio",
            ElementRole::Select => "select",
            ElementRole::Menu => "menu",
            ElementRole::MenuItem => "menuitem",
            ElementRole::Icon => "icon",
            ElementRole::Window => "window",
            ElementRole::Container => "container",
            ElementRole::Unknown => "unknown",
        }
    }

    /// Case-insensitive role lookup for selector parsing.
    pub fn parse(s: &str) -> Option<Self> {
        let role = match s.to_ascii_lowercase().as_str() {
            "button" => ElementRole::Button,
            "input" | "edit" | "textbox" => ElementRole::Input,
            "link" | "hyperlink" => ElementRole::Link,
            "text" | "label" => ElementRole::Text,
            "image" => ElementRole::Image,
            "checkbox" => ElementRole::Checkbox,
            "radio" | "radiobutton" => ElementRole::Radio,
            "select" | "combobox" => ElementRole::Select,
            "menu" => ElementRole::Menu,
            "menuitem" => ElementRole::MenuItem,
            "icon" => ElementRole::Icon,
            "window" => ElementRole::Window,
            "container" | "pane" => ElementRole::Container,
            _ => return None,
        };
        Some(role)
    }
}

/// One node collected from the accessibility tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiElement {
    pub id: String,
    pub role: ElementRole,
    /// Accessible name, if the element has one.
    pub name: Option<String>,
    /// Toolkit automation id, if exposed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automation_id: Option<String>,
    /// Title of the containing top-level window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
    /// Normalized bounding box [xmin, ymin, xmax, ymax] in range 0.0–1.0
    pub bbox: [f32; 4],
}

impl UiElement {
    /// Centre of the bounding box in physical pixel coordinates.
    pub fn center_physical(&self, meta: &ScreenMeta) -> (i32, i32) {
        let cx = ((self.bbox[0] + self.bbox[2]) / 2.0 * meta.physical_width as f32).round() as i32;
        let cy = ((self.bbox[1] + self.bbox[3]) / 2.0 * meta.physical_height as f32).round() as i32;
        (cx, cy)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenMeta {
    pub monitor_index: u32,
    pub scale_factor: f64,
    pub physical_width: u32,
    pub physical_height: u32,
    pub logical_width: u32,
    pub logical_height: u32,
}

/// Primary-monitor capture: PNG bytes plus geometry.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub png_bytes: Vec<u8>,
    pub meta: ScreenMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_maps_to_physical_pixels() {
        let meta = ScreenMeta {
            monitor_index: 0,
            scale_factor: 1.0,
            physical_width: 1000,
            physical_height: 500,
            logical_width: 1000,
            logical_height: 500,
        };
        let el = UiElement {
            id: "btn_1".into(),
            role: ElementRole::Button,
            name: Some("Seven".into()),
            automation_id: None,
            window: None,
            bbox: [0.1, 0.2, 0.3, 0.4],
        };
        assert_eq!(el.center_physical(&meta), (200, 150));
    }

    #[test]
    fn role_parse_accepts_aliases() {
        assert_eq!(ElementRole::parse("Button"), Some(ElementRole::Button));
        assert_eq!(ElementRole::parse("edit"), Some(ElementRole::Input));
        assert_eq!(ElementRole::parse("hyperlink"), Some(ElementRole::Link));
        assert_eq!(ElementRole::parse("bogus"), None);
    }
}
