use byteorder::{ByteOrder, LittleEndian};

const WORD_BYTES: usize = 4;

/// # WordCursor
/// A view of a raw board buffer as a run of little-endian 32-bit words. The cursor keeps a word position
/// and an end bound; every read checks the bound before touching the bytes, so a malformed size field can
/// never walk the parser off the end of the buffer.
///
/// Sub-ranges (a board aggregate, a channel aggregate) are made with `limit`, which shares the underlying
/// bytes and keeps positions absolute, so offsets in errors always refer to the whole buffer.
#[derive(Debug, Clone)]
pub struct WordCursor<'a> {
    buffer: &'a [u8],
    position: usize,
    end: usize,
}

impl<'a> WordCursor<'a> {

    pub fn new(buffer: &'a [u8]) -> Self {
        WordCursor { buffer, position: 0, end: buffer.len() / WORD_BYTES }
    }

    /// Number of bytes at the tail that do not make up a whole word
    pub fn trailing_bytes(&self) -> usize {
        self.buffer.len() % WORD_BYTES
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn remaining(&self) -> usize {
        self.end.saturating_sub(self.position)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn peek_word(&self) -> Option<u32> {
        if self.position >= self.end {
            return None;
        }
        let start = self.position * WORD_BYTES;
        Some(LittleEndian::read_u32(&self.buffer[start..start + WORD_BYTES]))
    }

    pub fn read_word(&mut self) -> Option<u32> {
        let word = self.peek_word()?;
        self.position += 1;
        Some(word)
    }

    /// Advance by n words. Returns false (and does not move) if fewer than n words remain.
    pub fn skip(&mut self, n: usize) -> bool {
        if n > self.remaining() {
            return false;
        }
        self.position += n;
        true
    }

    /// Move to an absolute word position, clamped to the end bound
    pub fn seek(&mut self, position: usize) {
        self.position = position.min(self.end);
    }

    /// A cursor over [position, end) of this one. The end is clamped so a sub-range can never extend past its parent.
    pub fn limit(&self, end: usize) -> WordCursor<'a> {
        WordCursor { buffer: self.buffer, position: self.position, end: end.min(self.end) }
    }

}
