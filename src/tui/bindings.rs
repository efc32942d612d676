use ratatui::crossterm::event::KeyCode;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    Confirm,
    ToggleCent,
    Difficulty(usize),
    CycleTimbre,
    InitAudio,
    ClearHistory,
}

#[derive(Clone, Copy)]
pub struct Binding {
    pub key: KeyCode,
    pub action: Action,
    pub hint: &'static str,
}

pub fn normal_bindings() -> &'static [Binding] {
    &[
        Binding { key: KeyCode::Char('q'), action: Action::Quit, hint: "quit" },
        Binding { key: KeyCode::Esc, action: Action::Quit, hint: "quit" },
        Binding { key: KeyCode::Char(' '), action: Action::Confirm, hint: "answer / next" },
        Binding { key: KeyCode::Enter, action: Action::Confirm, hint: "answer / next" },
        Binding { key: KeyCode::Char('c'), action: Action::ToggleCent, hint: "cents" },
        Binding { key: KeyCode::Char('1'), action: Action::Difficulty(0), hint: "no check" },
        Binding { key: KeyCode::Char('2'), action: Action::Difficulty(1), hint: "easy" },
        Binding { key: KeyCode::Char('3'), action: Action::Difficulty(2), hint: "normal" },
        Binding { key: KeyCode::Char('4'), action: Action::Difficulty(3), hint: "hard" },
        Binding { key: KeyCode::Char('5'), action: Action::Difficulty(4), hint: "very hard" },
        Binding { key: KeyCode::Char('t'), action: Action::CycleTimbre, hint: "timbre" },
        Binding { key: KeyCode::Char('i'), action: Action::InitAudio, hint: "audio" },
        Binding { key: KeyCode::Char('x'), action: Action::ClearHistory, hint: "clear history" },
    ]
}

pub fn lookup(bindings: &[Binding], key: KeyCode) -> Option<Action> {
    bindings.iter().find(|b| b.key == key).map(|b| b.action)
}

pub fn hints(bindings: &[Binding]) -> Vec<(&'static str, &'static str)> {
    let mut seen = std::collections::HashSet::new();
    bindings
        .iter()
        .filter(|b| seen.insert(b.action))
        .map(|b| (key_str(b.key), b.hint))
        .collect()
}

pub fn key_str(key: KeyCode) -> &'static str {
    match key {
        KeyCode::Char('q') => "q",
        KeyCode::Char('c') => "c",
        KeyCode::Char('t') => "t",
        KeyCode::Char('i') => "i",
        KeyCode::Char('x') => "x",
        KeyCode::Char('1') => "1",
        KeyCode::Char('2') => "2",
        KeyCode::Char('3') => "3",
        KeyCode::Char('4') => "4",
        KeyCode::Char('5') => "5",
        KeyCode::Char(' ') => "space",
        KeyCode::Enter => "ret",
        KeyCode::Esc => "esc",
        _ => "?",
    }
}
