//! Editable text produced by committed keys.

use tracing::debug;

use super::layout::Key;

/// Side effect of applying a key, for the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEffect {
    /// `content` changed (or a no-op edit such as Backspace on empty).
    Edited,
    /// Shift toggled; carries the new state.
    ShiftToggled(bool),
    /// The keyboard should be hidden.
    HideRequested,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    content: String,
    shift_active: bool,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one committed key. Any character key clears shift after use.
    pub fn apply(&mut self, key: Key) -> KeyEffect {
        let effect = match key {
            Key::Shift => {
                self.shift_active = !self.shift_active;
                KeyEffect::ShiftToggled(self.shift_active)
            }
            Key::Backspace => {
                self.content.pop();
                KeyEffect::Edited
            }
            Key::Space => {
                self.content.push(' ');
                KeyEffect::Edited
            }
            Key::Enter => {
                self.content.push('\n');
                KeyEffect::Edited
            }
            Key::Hide => KeyEffect::HideRequested,
            Key::Char(c) => {
                if self.shift_active {
                    self.content.extend(c.to_uppercase());
                } else {
                    self.content.push(c);
                }
                self.shift_active = false;
                KeyEffect::Edited
            }
        };
        debug!(key = %key, len = self.content.chars().count(), "Text buffer updated");
        effect
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn shift_active(&self) -> bool {
        self.shift_active
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
