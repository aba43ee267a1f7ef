use std::fmt;

use crate::errors::{DeskPilotError, DeskPilotResult};
use crate::facade::types::{ElementRole, UiElement};

/// Identifies a UI element by kind and value, parsed from `kind:value`
/// strings (`role:Button`, `name:Seven`, `window:Calculator`,
/// `automationid:num7Button`, `text:Welcome`). A bare string with no
/// kind prefix is shorthand for `name:`.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Role(ElementRole),
    Name(String),
    Window(String),
    AutomationId(String),
    Text(String),
}

impl Selector {
    pub fn parse(input: &str) -> DeskPilotResult<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(DeskPilotError::InvalidArguments("empty selector".into()));
        }

        let Some((kind, value)) = input.split_once(':') else {
            return Ok(Selector::Name(input.to_string()));
        };
        let value = value.trim();
        if value.is_empty() {
            return Err(DeskPilotError::InvalidArguments(format!(
                "selector '{input}' has no value"
            )));
        }

        match kind.trim().to_ascii_lowercase().as_str() {
            "role" => ElementRole::parse(value)
                .map(Selector::Role)
                .ok_or_else(|| {
                    DeskPilotError::InvalidArguments(format!("unknown role '{value}'"))
                }),
            "name" => Ok(Selector::Name(value.to_string())),
            "window" => Ok(Selector::Window(value.to_string())),
            "automationid" => Ok(Selector::AutomationId(value.to_string())),
            "text" => Ok(Selector::Text(value.to_string())),
            other => Err(DeskPilotError::InvalidArguments(format!(
                "unknown selector kind '{other}' (expected role|name|window|automationid|text)"
            ))),
        }
    }

    /// Whether the element satisfies this selector. Name and text matches
    /// are case-insensitive; name is exact, text is substring.
    pub fn matches(&self, element: &UiElement) -> bool {
        match self {
            Selector::Role(role) => element.role == *role,
            Selector::Name(name) => element
                .name
                .as_deref()
                .is_some_and(|n| n.eq_ignore_ascii_case(name)),
            Selector::Window(title) => element
                .window
                .as_deref()
                .is_some_and(|w| w.to_lowercase().contains(&title.to_lowercase())),
            Selector::AutomationId(id) => element
                .automation_id
                .as_deref()
                .is_some_and(|a| a == id),
            Selector::Text(text) => element
                .name
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(&text.to_lowercase())),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Role(role) => write!(f, "role:{}", role.as_str()),
            Selector::Name(name) => write!(f, "name:{name}"),
            Selector::Window(title) => write!(f, "window:{title}"),
            Selector::AutomationId(id) => write!(f, "automationid:{id}"),
            Selector::Text(text) => write!(f, "text:{text}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(role: ElementRole, name: Option<&str>) -> UiElement {
        UiElement {
            id: "e1".into(),
            role,
            name: name.map(|s| s.to_string()),
            automation_id: Some("num7Button".into()),
            window: Some("Calculator".into()),
            bbox: [0.0, 0.0, 0.1, 0.1],
        }
    }

    #[test]
    fn parses_each_kind() {
        assert_eq!(
            Selector::parse("role:Button").unwrap(),
            Selector::Role(ElementRole::Button)
        );
        assert_eq!(
            Selector::parse("name:Seven").unwrap(),
            Selector::Name("Seven".into())
        );
        assert_eq!(
            Selector::parse("window:Calculator").unwrap(),
            Selector::Window("Calculator".into())
        );
        assert_eq!(
            Selector::parse("automationid:num7Button").unwrap(),
            Selector::AutomationId("num7Button".into())
        );
    }

    #[test]
    fn bare_string_is_a_name_selector() {
        assert_eq!(Selector::parse("Seven").unwrap(), Selector::Name("Seven".into()));
    }

    #[test]
    fn unknown_kind_is_invalid_arguments() {
        let err = Selector::parse("xpath://div").unwrap_err();
        assert!(matches!(err, DeskPilotError::InvalidArguments(_)));
    }

    #[test]
    fn empty_value_is_invalid_arguments() {
        assert!(Selector::parse("name:").is_err());
        assert!(Selector::parse("  ").is_err());
    }

    #[test]
    fn matching_rules() {
        let el = element(ElementRole::Button, Some("Seven"));
        assert!(Selector::parse("role:Button").unwrap().matches(&el));
        assert!(Selector::parse("name:seven").unwrap().matches(&el));
        assert!(Selector::parse("window:calc").unwrap().matches(&el));
        assert!(Selector::parse("automationid:num7Button").unwrap().matches(&el));
        assert!(Selector::parse("text:eve").unwrap().matches(&el));
        assert!(!Selector::parse("role:Input").unwrap().matches(&el));
        assert!(!Selector::parse("name:Sev").unwrap().matches(&el));
    }
}
