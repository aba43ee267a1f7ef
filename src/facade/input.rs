use std::time::Duration;

use enigo::{Coordinate, Direction, Enigo, Keyboard, Mouse, Settings};

use crate::errors::{DeskPilotError, DeskPilotResult};
use crate::facade::types::{MouseButton, Point};

fn new_enigo() -> DeskPilotResult<Enigo> {
    Enigo::new(&Settings::default())
        .map_err(|e| DeskPilotError::Facade(format!("input backend unavailable: {e}")))
}

fn to_enigo_button(button: MouseButton) -> enigo::Button {
    match button {
        MouseButton::Left => enigo::Button::Left,
        MouseButton::Right => enigo::Button::Right,
        MouseButton::Middle => enigo::Button::Middle,
    }
}

/// Move to (x, y) and click `clicks` times with the given button.
pub async fn click_at(x: i32, y: i32, button: MouseButton, clicks: u32) -> DeskPilotResult<()> {
    tokio::task::spawn_blocking(move || {
        let mut enigo = new_enigo()?;
        enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| DeskPilotError::Facade(format!("move mouse: {e}")))?;
        for _ in 0..clicks.max(1) {
            enigo
                .button(to_enigo_button(button), Direction::Click)
                .map_err(|e| DeskPilotError::Facade(format!("click: {e}")))?;
        }
        Ok(())
    })
    .await
    .map_err(|e| DeskPilotError::Facade(format!("input join: {e}")))?
}

/// Type text at the current focus.
pub async fn type_text(text: String) -> DeskPilotResult<()> {
    tokio::task::spawn_blocking(move || {
        let mut enigo = new_enigo()?;
        enigo
            .text(&text)
            .map_err(|e| DeskPilotError::Facade(format!("type text: {e}")))
    })
    .await
    .map_err(|e| DeskPilotError::Facade(format!("input join: {e}")))?
}

/// Press a key or a `+`-separated combination ("enter", "ctrl+c").
/// Modifiers are held while the final key is clicked.
pub async fn press_key(combo: String) -> DeskPilotResult<()> {
    tokio::task::spawn_blocking(move || {
        let parts: Vec<String> = combo.split('+').map(|p| p.trim().to_string()).collect();
        let Some((last, modifiers)) = parts.split_last() else {
            return Err(DeskPilotError::Facade("empty key combination".into()));
        };

        let mut enigo = new_enigo()?;
        let mods: Vec<enigo::Key> = modifiers
            .iter()
            .map(|m| parse_key(m))
            .collect::<DeskPilotResult<_>>()?;
        let key = parse_key(last)?;

        for m in &mods {
            enigo
                .key(*m, Direction::Press)
                .map_err(|e| DeskPilotError::Facade(format!("press modifier: {e}")))?;
        }
        let result = enigo
            .key(key, Direction::Click)
            .map_err(|e| DeskPilotError::Facade(format!("press key: {e}")));
        for m in mods.iter().rev() {
            let _ = enigo.key(*m, Direction::Release);
        }
        result
    })
    .await
    .map_err(|e| DeskPilotError::Facade(format!("input join: {e}")))?
}

/// Press at the first point, move through the rest with fixed pacing,
/// release at the last point.
pub async fn drag_path(points: Vec<Point>, pace: Duration) -> DeskPilotResult<()> {
    if points.len() < 2 {
        return Err(DeskPilotError::Facade(
            "drag path needs at least two points".into(),
        ));
    }
    tokio::task::spawn_blocking(move || {
        let mut enigo = new_enigo()?;
        let first = points[0];
        enigo
            .move_mouse(first.x, first.y, Coordinate::Abs)
            .map_err(|e| DeskPilotError::Facade(format!("move mouse: {e}")))?;
        enigo
            .button(enigo::Button::Left, Direction::Press)
            .map_err(|e| DeskPilotError::Facade(format!("press: {e}")))?;

        for p in &points[1..] {
            std::thread::sleep(pace);
            if let Err(e) = enigo.move_mouse(p.x, p.y, Coordinate::Abs) {
                // Release before bailing so the pointer is not left stuck down.
                let _ = enigo.button(enigo::Button::Left, Direction::Release);
                return Err(DeskPilotError::Facade(format!("drag move: {e}")));
            }
        }

        enigo
            .button(enigo::Button::Left, Direction::Release)
            .map_err(|e| DeskPilotError::Facade(format!("release: {e}")))
    })
    .await
    .map_err(|e| DeskPilotError::Facade(format!("input join: {e}")))?
}

fn parse_key(name: &str) -> DeskPilotResult<enigo::Key> {
    use enigo::Key;
    let key = match name.to_ascii_lowercase().as_str() {
        "enter" | "return" => Key::Return,
        "tab" => Key::Tab,
        "escape" | "esc" => Key::Escape,
        "space" => Key::Space,
        "backspace" => Key::Backspace,
        "delete" | "del" => Key::Delete,
        "up" => Key::UpArrow,
        "down" => Key::DownArrow,
        "left" => Key::LeftArrow,
        "right" => Key::RightArrow,
        "home" => Key::Home,
        "end" => Key::End,
        "pageup" => Key::PageUp,
        "pagedown" => Key::PageDown,
        "ctrl" | "control" => Key::Control,
        "alt" => Key::Alt,
        "shift" => Key::Shift,
        "meta" | "win" | "cmd" | "super" => Key::Meta,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Unicode(c),
                _ => {
                    return Err(DeskPilotError::Facade(format!("unknown key '{name}'")));
                }
            }
        }
    };
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_characters_map_to_unicode() {
        assert!(matches!(parse_key("a").unwrap(), enigo::Key::Unicode('a')));
        assert!(matches!(parse_key("7").unwrap(), enigo::Key::Unicode('7')));
    }

    #[test]
    fn named_keys_resolve() {
        assert!(matches!(parse_key("Enter").unwrap(), enigo::Key::Return));
        assert!(matches!(parse_key("esc").unwrap(), enigo::Key::Escape));
    }

    #[test]
    fn unknown_key_is_a_facade_error() {
        assert!(parse_key("bogus-key").is_err());
    }
}
