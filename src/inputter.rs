use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use tracing::trace;

/// Single line text editor used by the filter prompt.
#[derive(Default)]
pub struct Inputter {
    current_input: String,
    cursor_pos: usize, // In chars, not bytes
    finished: bool,
    canceled: bool,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub cursor_pos: usize,
}

impl Inputter {
    pub fn read(&mut self, key: event::KeyEvent) -> InputResult {
        let result = match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => self.enter(),
            (KeyCode::Esc, _) => self.escape(),
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Left, _) => self.left(),
            (KeyCode::Right, _) => self.right(),
            (KeyCode::Home, _) => self.home(),
            (KeyCode::End, _) => self.end(),
            (kc, km) => self.key(kc, km),
        };
        trace!("Input: {result:?}");
        result
    }

    /// Replace the content, placing the cursor at its end.
    pub fn set(&mut self, s: &str) {
        self.current_input = s.to_string();
        self.cursor_pos = s.chars().count();
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            canceled: self.canceled,
            finished: self.finished,
            input: self.current_input.clone(),
            cursor_pos: self.cursor_pos,
        }
    }

    pub fn clear(&mut self) {
        self.canceled = false;
        self.finished = false;
        self.current_input.clear();
        self.cursor_pos = 0;
    }

    fn enter(&mut self) -> InputResult {
        self.finished = true;
        self.get()
    }

    fn escape(&mut self) -> InputResult {
        self.canceled = true;
        self.finished = true;
        self.get()
    }

    fn backspace(&mut self) -> InputResult {
        if self.cursor_pos > 0 {
            self.cursor_pos -= 1;
            self.current_input.remove(self.byte_pos());
        }
        self.get()
    }

    fn delete(&mut self) -> InputResult {
        if self.cursor_pos < self.current_input.chars().count() {
            self.current_input.remove(self.byte_pos());
        }
        self.get()
    }

    fn left(&mut self) -> InputResult {
        self.cursor_pos = self.cursor_pos.saturating_sub(1);
        self.get()
    }

    fn right(&mut self) -> InputResult {
        if self.cursor_pos < self.current_input.chars().count() {
            self.cursor_pos += 1;
        }
        self.get()
    }

    fn home(&mut self) -> InputResult {
        self.cursor_pos = 0;
        self.get()
    }

    fn end(&mut self) -> InputResult {
        self.cursor_pos = self.current_input.chars().count();
        self.get()
    }

    fn key(&mut self, code: KeyCode, modifier: KeyModifiers) -> InputResult {
        if modifier.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            return self.get();
        }
        if let Some(chr) = code.as_char() {
            self.current_input.insert(self.byte_pos(), chr);
            self.cursor_pos += 1;
        }
        self.get()
    }

    fn byte_pos(&self) -> usize {
        self.current_input
            .char_indices()
            .nth(self.cursor_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn type_str(input: &mut Inputter, s: &str) {
        for c in s.chars() {
            input.read(KeyEvent::from(KeyCode::Char(c)));
        }
    }

    #[test]
    fn typing_and_editing() {
        let mut input = Inputter::default();
        type_str(&mut input, "amx");
        input.read(KeyEvent::from(KeyCode::Backspace));
        input.read(KeyEvent::from(KeyCode::Left));
        type_str(&mut input, "d");
        let res = input.get();
        assert_eq!(res.input, "adm");
        assert_eq!(res.cursor_pos, 2);
        assert!(!res.finished);

        let res = input.read(KeyEvent::from(KeyCode::Enter));
        assert!(res.finished);
        assert!(!res.canceled);
    }

    #[test]
    fn multibyte_characters() {
        let mut input = Inputter::default();
        input.set("Müller");
        assert_eq!(input.get().cursor_pos, 6);
        input.read(KeyEvent::from(KeyCode::Home));
        input.read(KeyEvent::from(KeyCode::Right));
        input.read(KeyEvent::from(KeyCode::Delete));
        assert_eq!(input.get().input, "Mller");
    }

    #[test]
    fn escape_cancels() {
        let mut input = Inputter::default();
        type_str(&mut input, "x");
        let res = input.read(KeyEvent::from(KeyCode::Esc));
        assert!(res.canceled && res.finished);
        input.clear();
        assert_eq!(input.get(), InputResult::default());
    }
}
