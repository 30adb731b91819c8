// WHY: regex-automata reports byte offsets while every public offset is a
// character position, so all conversions go through this counter

/// Forward-only byte to character position counter.
///
/// Advancing is amortised O(1) per byte: only the bytes between the current
/// and the target position are inspected.
#[derive(Debug, Clone, Default)]
pub struct PositionCounter {
    /// Current byte position in text
    byte_pos: usize,
    /// Current character position in text
    char_pos: usize,
}

impl PositionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to `target_byte_pos` and return the character position there.
    ///
    /// Targets behind the current position restart the count from zero.
    pub fn advance_to_byte(&mut self, text: &str, target_byte_pos: usize) -> usize {
        let bytes = text.as_bytes();
        if target_byte_pos < self.byte_pos {
            self.byte_pos = 0;
            self.char_pos = 0;
        }
        while self.byte_pos < target_byte_pos && self.byte_pos < bytes.len() {
            // continuation bytes are 0b10xx_xxxx
            if (bytes[self.byte_pos] & 0xC0) != 0x80 {
                self.char_pos += 1;
            }
            self.byte_pos += 1;
        }
        self.char_pos
    }

    pub fn char_pos(&self) -> usize {
        self.char_pos
    }
}

/// Character position of `byte_pos` within `text`.
pub fn char_offset(text: &str, byte_pos: usize) -> usize {
    PositionCounter::new().advance_to_byte(text, byte_pos)
}
