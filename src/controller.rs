use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, RowAction, TVConfig, TVError};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &TVConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, TVError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        let message = match event::read()? {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                if model.raw_keyevents() {
                    Some(Message::RawKey(key))
                } else {
                    self.handle_key(key)
                }
            }
            Event::Resize(width, height) => Some(Message::Resize(width as usize, height as usize)),
            _ => None,
        };
        Ok(message)
    }

    pub fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(Message::MoveDown),
            (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(Message::MoveUp),
            (KeyCode::Char('h'), _) | (KeyCode::Left, _) => Some(Message::MoveLeft),
            (KeyCode::Char('l'), _) | (KeyCode::Right, _) => Some(Message::MoveRight),
            (KeyCode::PageDown, _) => Some(Message::MovePageDown),
            (KeyCode::PageUp, _) => Some(Message::MovePageUp),
            (KeyCode::Char('g'), _) | (KeyCode::Home, _) => Some(Message::MoveBeginning),
            (KeyCode::Char('G'), _) | (KeyCode::End, _) => Some(Message::MoveEnd),
            (KeyCode::Char('s'), _) => Some(Message::Sort),
            (KeyCode::Char('f'), _) | (KeyCode::Char('/'), _) => Some(Message::Filter),
            (KeyCode::Char('F'), _) => Some(Message::ClearFilters),
            (KeyCode::Char(' '), _) => Some(Message::ToggleSelect),
            (KeyCode::Char('a'), _) => Some(Message::ToggleSelectAll),
            (KeyCode::Enter, _) | (KeyCode::Char('o'), _) => Some(Message::ToggleExpand),
            (KeyCode::Char('e'), _) => Some(Message::Export),
            (KeyCode::Char('c'), _) => Some(Message::CopyCell),
            (KeyCode::Char('C'), _) => Some(Message::CopyRow),
            (KeyCode::Char('D'), _) => Some(Message::RowAction(RowAction::Deactivate)),
            (KeyCode::Char('A'), _) => Some(Message::RowAction(RowAction::Activate)),
            (KeyCode::Char('M'), _) => Some(Message::RowAction(RowAction::Contact)),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Esc, _) => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    #[test]
    fn maps_keys_to_messages() {
        let controller = Controller::new(&TVConfig::default());
        let map = |code| controller.handle_key(KeyEvent::from(code));
        assert_eq!(map(KeyCode::Char('s')), Some(Message::Sort));
        assert_eq!(map(KeyCode::Char(' ')), Some(Message::ToggleSelect));
        assert_eq!(map(KeyCode::Enter), Some(Message::ToggleExpand));
        assert_eq!(map(KeyCode::Char('e')), Some(Message::Export));
        assert_eq!(map(KeyCode::Char('x')), None);
        assert_eq!(
            map(KeyCode::Char('M')),
            Some(Message::RowAction(RowAction::Contact))
        );

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(controller.handle_key(ctrl_c), Some(Message::Quit));
    }
}
