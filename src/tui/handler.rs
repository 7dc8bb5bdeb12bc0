use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::models::Situation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    Quit,
    ShowTip(Situation),
    NextTip,
    LikeTip,
    SwitchLanguage,
    ToggleAudio,
    NextTrack,
    ReloadTips,
    ShowHelp,
    HideHelp,
    /// Terminal focus gained (`true`) or lost (`false`).
    Visibility(bool),
}

pub fn handle_key_event(key: KeyEvent, show_help: bool) -> Option<AppAction> {
    // If help is showing, any key closes it
    if show_help {
        return Some(AppAction::HideHelp);
    }

    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => Some(AppAction::Quit),
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(AppAction::Quit),

        (KeyCode::Char('1'), _) => Some(AppAction::ShowTip(Situation::Morning)),
        (KeyCode::Char('2'), _) => Some(AppAction::ShowTip(Situation::Work)),
        (KeyCode::Char('3'), _) => Some(AppAction::ShowTip(Situation::Break)),
        (KeyCode::Char('4'), _) => Some(AppAction::ShowTip(Situation::Evening)),
        (KeyCode::Char('5'), _) => Some(AppAction::ShowTip(Situation::Sleep)),

        (KeyCode::Char('n'), _) | (KeyCode::Enter, _) => Some(AppAction::NextTip),
        (KeyCode::Char('l'), _) => Some(AppAction::LikeTip),
        (KeyCode::Char('t'), _) => Some(AppAction::SwitchLanguage),
        (KeyCode::Char('a'), _) => Some(AppAction::ToggleAudio),
        (KeyCode::Char('s'), _) => Some(AppAction::NextTrack),
        (KeyCode::Char('r'), _) => Some(AppAction::ReloadTips),

        (KeyCode::Char('?'), _) => Some(AppAction::ShowHelp),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn digits_pick_situations() {
        assert_eq!(
            handle_key_event(press(KeyCode::Char('1')), false),
            Some(AppAction::ShowTip(Situation::Morning))
        );
        assert_eq!(
            handle_key_event(press(KeyCode::Char('5')), false),
            Some(AppAction::ShowTip(Situation::Sleep))
        );
    }

    #[test]
    fn help_swallows_any_key() {
        assert_eq!(
            handle_key_event(press(KeyCode::Char('l')), true),
            Some(AppAction::HideHelp)
        );
    }

    #[test]
    fn ctrl_c_quits() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key_event(key, false), Some(AppAction::Quit));
        assert_eq!(handle_key_event(press(KeyCode::Char('x')), false), None);
    }
}
