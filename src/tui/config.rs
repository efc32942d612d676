use ratatui::crossterm::event::KeyCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::tui::bindings::{Action, Binding, normal_bindings};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub normal: HashMap<String, KeyList>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum KeyList {
    Single(String),
    Multiple(Vec<String>),
}

impl KeyList {
    pub fn keys(&self) -> Vec<&str> {
        match self {
            KeyList::Single(s) => vec![s.as_str()],
            KeyList::Multiple(v) => v.iter().map(|s| s.as_str()).collect(),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs_path().map(|p| p.join("bindings.toml"))
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config").join("relpitch"))
}

pub fn load_config() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    if !path.exists() {
        return Config::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to parse {}: {}", path.display(), e);
                Config::default()
            }
        },
        Err(e) => {
            eprintln!("Failed to read {}: {}", path.display(), e);
            Config::default()
        }
    }
}

pub fn parse_key(s: &str) -> Option<KeyCode> {
    match s.to_lowercase().as_str() {
        "esc" | "escape" => Some(KeyCode::Esc),
        "enter" | "return" | "ret" => Some(KeyCode::Enter),
        "tab" => Some(KeyCode::Tab),
        "space" => Some(KeyCode::Char(' ')),
        "backspace" => Some(KeyCode::Backspace),
        "delete" | "del" => Some(KeyCode::Delete),
        _ => {
            let chars: Vec<char> = s.chars().collect();
            if chars.len() == 1 {
                Some(KeyCode::Char(chars[0]))
            } else {
                None
            }
        }
    }
}

pub fn parse_action(s: &str) -> Option<Action> {
    match s {
        "quit" => Some(Action::Quit),
        "confirm" => Some(Action::Confirm),
        "toggle_cent" => Some(Action::ToggleCent),
        "cycle_timbre" => Some(Action::CycleTimbre),
        "init_audio" => Some(Action::InitAudio),
        "clear_history" => Some(Action::ClearHistory),
        s if s.starts_with("difficulty_") => s[11..].parse().ok().map(Action::Difficulty),
        _ => None,
    }
}

pub fn apply_overrides(bindings: &mut Vec<Binding>, overrides: &HashMap<String, KeyList>) {
    for (action_str, keys) in overrides {
        let Some(action) = parse_action(action_str) else {
            continue;
        };
        bindings.retain(|b| b.action != action);
        for key_str in keys.keys() {
            if let Some(key) = parse_key(key_str) {
                bindings.push(Binding {
                    key,
                    action,
                    hint: "",
                });
            }
        }
    }
}

pub struct Bindings {
    pub normal: Vec<Binding>,
}

impl Bindings {
    pub fn load() -> Self {
        let config = load_config();
        let mut normal: Vec<Binding> = normal_bindings().to_vec();
        apply_overrides(&mut normal, &config.normal);
        Self { normal }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keys() {
        assert_eq!(parse_key("esc"), Some(KeyCode::Esc));
        assert_eq!(parse_key("space"), Some(KeyCode::Char(' ')));
        assert_eq!(parse_key("g"), Some(KeyCode::Char('g')));
        assert_eq!(parse_key("nonsense"), None);
    }

    #[test]
    fn test_parse_actions() {
        assert_eq!(parse_action("quit"), Some(Action::Quit));
        assert_eq!(parse_action("difficulty_3"), Some(Action::Difficulty(3)));
        assert_eq!(parse_action("difficulty_x"), None);
        assert_eq!(parse_action("unknown"), None);
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let mut bindings = normal_bindings().to_vec();
        let mut overrides = HashMap::new();
        overrides.insert(
            "confirm".to_string(),
            KeyList::Multiple(vec!["a".to_string(), "enter".to_string()]),
        );
        apply_overrides(&mut bindings, &overrides);

        let confirms: Vec<KeyCode> = bindings
            .iter()
            .filter(|b| b.action == Action::Confirm)
            .map(|b| b.key)
            .collect();
        assert_eq!(confirms, vec![KeyCode::Char('a'), KeyCode::Enter]);
    }

    #[test]
    fn test_toml_shape() {
        let config: Config = toml::from_str(
            r#"
            [normal]
            confirm = ["a", "enter"]
            quit = "Q"
            "#,
        )
        .unwrap();
        assert_eq!(config.normal["quit"].keys(), vec!["Q"]);
        assert_eq!(config.normal["confirm"].keys(), vec!["a", "enter"]);
    }
}
