use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use unicode_width::UnicodeWidthChar;

/// Single line text editor with a cursor counted in chars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextField {
    value: String,
    cursor: usize,
    placeholder: &'static str,
    masked: bool,
}

impl TextField {
    pub fn new(placeholder: &'static str) -> Self {
        TextField {
            value: String::new(),
            cursor: 0,
            placeholder,
            masked: false,
        }
    }

    /// A field whose content is shown as `*`.
    pub fn masked(placeholder: &'static str) -> Self {
        TextField {
            masked: true,
            ..TextField::new(placeholder)
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_masked(&self) -> bool {
        self.masked
    }

    /// Replaces the content and moves the cursor to the end.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.cursor = self.len();
    }

    /// Text as it should appear on screen.
    pub fn display(&self) -> String {
        if self.masked {
            "*".repeat(self.len())
        } else {
            self.value.clone()
        }
    }

    /// The part of [`display`](Self::display) that fits in `width` columns,
    /// scrolled so the cursor stays visible, and the cursor's column in it.
    pub fn scrolled(&self, width: usize) -> (String, usize) {
        let chars: Vec<char> = self.display().chars().collect();
        let columns = |slice: &[char]| -> usize {
            slice.iter().map(|c| c.width().unwrap_or(0)).sum()
        };

        // Keep one column free after the cursor for the cursor itself
        let mut start = 0;
        while start < self.cursor && columns(&chars[start..self.cursor]) >= width.max(1) {
            start += 1;
        }

        let mut visible = String::new();
        let mut used = 0;
        for &c in &chars[start..] {
            let w = c.width().unwrap_or(0);
            if used + w > width {
                break;
            }
            visible.push(c);
            used += w;
        }

        (visible, columns(&chars[start..self.cursor]))
    }

    fn len(&self) -> usize {
        self.value.chars().count()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map_or(self.value.len(), |(i, _)| i)
    }

    /// Applies an editing key. Returns false when the key is not an editing key.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                let at = self.byte_index(self.cursor);
                self.value.insert(at, c);
                self.cursor += 1;
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    let at = self.byte_index(self.cursor - 1);
                    self.value.remove(at);
                    self.cursor -= 1;
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.len() {
                    let at = self.byte_index(self.cursor);
                    self.value.remove(at);
                }
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.len()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.len(),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(field: &mut TextField, text: &str) {
        for c in text.chars() {
            field.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_typing_appends_at_cursor() {
        let mut field = TextField::new("Host");
        type_str(&mut field, "lcalhost");
        field.handle_key(key(KeyCode::Home));
        field.handle_key(key(KeyCode::Right));
        type_str(&mut field, "o");

        assert_eq!(field.value(), "localhost");
        assert_eq!(field.cursor(), 2);
    }

    #[test]
    fn test_backspace_and_delete() {
        let mut field = TextField::new("Port");
        type_str(&mut field, "54321");
        field.handle_key(key(KeyCode::Backspace));
        assert_eq!(field.value(), "5432");

        field.handle_key(key(KeyCode::Home));
        field.handle_key(key(KeyCode::Delete));
        assert_eq!(field.value(), "432");

        // Nothing before the cursor to delete
        field.handle_key(key(KeyCode::Backspace));
        assert_eq!(field.value(), "432");
        assert_eq!(field.cursor(), 0);
    }

    #[test]
    fn test_cursor_stays_in_bounds() {
        let mut field = TextField::new("User");
        field.handle_key(key(KeyCode::Left));
        assert_eq!(field.cursor(), 0);

        type_str(&mut field, "ab");
        field.handle_key(key(KeyCode::Right));
        field.handle_key(key(KeyCode::Right));
        assert_eq!(field.cursor(), 2);
        field.handle_key(key(KeyCode::Delete));
        assert_eq!(field.value(), "ab");
    }

    #[test]
    fn test_multibyte_characters() {
        let mut field = TextField::new("Database Name");
        type_str(&mut field, "bäse");
        field.handle_key(key(KeyCode::Left));
        field.handle_key(key(KeyCode::Left));
        field.handle_key(key(KeyCode::Backspace));

        assert_eq!(field.value(), "bse");
        assert_eq!(field.cursor(), 1);
    }

    #[test]
    fn test_masked_display() {
        let mut field = TextField::masked("Password");
        type_str(&mut field, "secret");

        assert_eq!(field.value(), "secret");
        assert_eq!(field.display(), "******");
    }

    #[test]
    fn test_control_chords_are_not_text() {
        let mut field = TextField::new("Host");
        let handled = field.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));

        assert!(!handled);
        assert_eq!(field.value(), "");
    }

    #[test]
    fn test_scrolled_keeps_cursor_in_view() {
        let mut field = TextField::new("Host");
        field.set_value("a-very-long-hostname.example.internal");

        let (visible, column) = field.scrolled(10);
        assert_eq!(visible, ".internal");
        assert_eq!(column, 9);

        field.handle_key(key(KeyCode::Home));
        let (visible, column) = field.scrolled(10);
        assert_eq!(visible, "a-very-lon");
        assert_eq!(column, 0);
    }

    #[test]
    fn test_scrolled_short_value_is_untouched() {
        let mut field = TextField::masked("Password");
        type_str(&mut field, "pw");

        assert_eq!(field.scrolled(20), ("**".to_string(), 2));
    }

    #[test]
    fn test_scrolled_counts_display_columns() {
        let mut field = TextField::new("Database Name");
        field.set_value("データ");

        let (visible, column) = field.scrolled(20);
        assert_eq!(visible, "データ");
        assert_eq!(column, 6);

        let (visible, column) = field.scrolled(4);
        assert_eq!(visible, "タ");
        assert_eq!(column, 2);
    }

    #[test]
    fn test_set_value_moves_cursor_to_end() {
        let mut field = TextField::new("Host");
        field.set_value("db.local");
        assert_eq!(field.cursor(), 8);
    }
}
