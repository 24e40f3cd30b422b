use ratatui::crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use papertree_reporting::ExportFormat;

use crate::action::Action;

/// Map a crossterm terminal event to a TUI action.
///
/// While `editing` the query prompt, printable keys go to the prompt.
pub fn map_event(event: &Event, editing: bool) -> Action {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            if editing {
                map_edit_key(key)
            } else {
                map_key(key)
            }
        }
        Event::Resize(w, h) => Action::Resize(*w, *h),
        _ => Action::None,
    }
}

fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
}

fn map_edit_key(key: &KeyEvent) -> Action {
    if is_ctrl_c(key) {
        return Action::Quit;
    }
    match key.code {
        KeyCode::Enter => Action::InputSubmit,
        KeyCode::Esc => Action::InputCancel,
        KeyCode::Backspace => Action::InputBackspace,
        KeyCode::Char(c) => Action::InputChar(c),
        _ => Action::None,
    }
}

fn map_key(key: &KeyEvent) -> Action {
    // Ctrl+C always quits
    if is_ctrl_c(key) {
        return Action::Quit;
    }

    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('j') | KeyCode::Down => Action::MoveDown,
        KeyCode::Char('k') | KeyCode::Up => Action::MoveUp,
        KeyCode::Enter => Action::DrillIn,
        KeyCode::Esc => Action::NavigateBack,
        KeyCode::Char('g') => Action::GoTop,
        KeyCode::Char('G') => Action::GoBottom,
        KeyCode::Char('/') => Action::EditQuery,
        KeyCode::Char('r') => Action::Retry,
        KeyCode::Char('x') => Action::CancelSearch,
        KeyCode::Char('e') => Action::Export(ExportFormat::Markdown),
        KeyCode::Char('E') => Action::Export(ExportFormat::Json),
        KeyCode::Char('?') => Action::ToggleHelp,
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::PageDown,
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::Home => Action::GoTop,
        KeyCode::End => Action::GoBottom,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn prompt_captures_letters() {
        assert_eq!(map_event(&press(KeyCode::Char('q')), true), Action::InputChar('q'));
        assert_eq!(map_event(&press(KeyCode::Char('q')), false), Action::Quit);
        assert_eq!(map_event(&press(KeyCode::Enter), true), Action::InputSubmit);
        assert_eq!(map_event(&press(KeyCode::Enter), false), Action::DrillIn);
    }

    #[test]
    fn ctrl_c_quits_everywhere() {
        let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(map_event(&ctrl_c, true), Action::Quit);
        assert_eq!(map_event(&ctrl_c, false), Action::Quit);
    }
}
