use bitvec::prelude::*;

use super::channel_aggregate::ChannelAggregateParser;
use super::constants::*;
use super::error::ParseError;
use super::event::PsdEvent;
use super::word_cursor::WordCursor;

/// # RawAggregateBuffer
/// The bytes read from one board in one poll cycle. The allocation is kept between cycles;
/// only the first `length` bytes are valid.
#[derive(Debug, Clone, Default)]
pub struct RawAggregateBuffer {
    pub bytes: Vec<u8>,
    pub length: usize,
}

impl RawAggregateBuffer {

    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.length.min(self.bytes.len())]
    }

    pub fn clear(&mut self) {
        self.length = 0;
    }

    /// Make room for `length` bytes and hand back the writable region
    pub fn prepare(&mut self, length: usize) -> &mut [u8] {
        if self.bytes.len() < length {
            self.bytes.resize(length, 0);
        }
        self.length = length;
        &mut self.bytes[..length]
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

}

/// The four header words of a board aggregate. Only the size and channel mask drive decoding;
/// the rest is kept for diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardAggregateHeader {
    pub words: usize, // includes the header
    pub board_id: u8,
    pub pattern: u16,
    pub channel_mask: u8,
    pub board_counter: u32,
    pub board_time: u32,
}

/// Everything recovered from one board buffer. When `error` is set, parsing stopped there and
/// `events` holds what was fully decoded before it.
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub events: Vec<PsdEvent>,
    pub warnings: Vec<ParseError>,
    pub error: Option<ParseError>,
    pub aggregates: usize,
}

/// # BoardAggregateParser
/// Walks a board buffer: a sequence of board aggregates, optionally followed by zero padding.
/// Each board aggregate holds one channel aggregate per lane flagged in its channel mask.
#[derive(Debug, Clone)]
pub struct BoardAggregateParser {
    number_of_lanes: usize,
    lane_mask: u8,
}

impl BoardAggregateParser {

    /// `lane_mask` is the configured set of enabled lanes
    pub fn new(number_of_lanes: usize, lane_mask: u8) -> Self {
        BoardAggregateParser { number_of_lanes: number_of_lanes.min(NUMBER_OF_LANES), lane_mask }
    }

    pub fn parse(&self, buffer: &[u8]) -> ParseOutput {
        let mut output = ParseOutput::default();
        let mut cursor = WordCursor::new(buffer);
        if cursor.trailing_bytes() != 0 {
            log::warn!("Board buffer of {} bytes is not a whole number of words, ignoring the last {} bytes", buffer.len(), cursor.trailing_bytes());
        }
        if log::log_enabled!(log::Level::Trace) {
            Self::dump_words(&cursor);
        }

        while !cursor.is_empty() {
            match self.parse_aggregate(&mut cursor, &mut output) {
                Ok(true) => continue,
                Ok(false) => break,
                Err(e) => {
                    output.error = Some(e);
                    break;
                }
            }
        }

        output
    }

    /// Parse one board aggregate. Returns Ok(false) when the rest of the buffer is padding.
    fn parse_aggregate(&self, cursor: &mut WordCursor, output: &mut ParseOutput) -> Result<bool, ParseError> {
        let start = cursor.position();
        let first = match cursor.peek_word() {
            Some(word) => word,
            None => return Ok(false),
        };

        if first >> BOARD_MARKER_SHIFT != BOARD_MARKER {
            if first == 0 {
                Self::check_padding(cursor)?;
                return Ok(false);
            }
            return Err(ParseError::HeaderMismatch { offset: start, word: first });
        }

        let words = (first & BOARD_SIZE_MASK) as usize;
        if words < BOARD_HEADER_WORDS {
            return Err(ParseError::HeaderMismatch { offset: start, word: first });
        }
        if words > cursor.remaining() {
            return Err(ParseError::InsufficientWords { lane: None, offset: start, needed: words, available: cursor.remaining() });
        }

        let mut aggregate = cursor.limit(start + words);
        let header = Self::read_header(&mut aggregate)?;
        log::debug!("Board aggregate at word {}: {} words, board id {}, counter {}, time {}, channel mask {:#04x}",
            start, header.words, header.board_id, header.board_counter, header.board_time, header.channel_mask);

        for lane in header.channel_mask.view_bits::<Lsb0>().iter_ones() {
            if lane >= self.number_of_lanes {
                log::warn!("Board aggregate at word {} flags lane {} but only {} lanes are configured", start, lane, self.number_of_lanes);
                continue;
            }
            if self.lane_mask & (1 << lane) == 0 {
                log::warn!("Board aggregate at word {} carries data for lane {} which is not enabled", start, lane);
            }
            ChannelAggregateParser::new(lane as u8).parse(&mut aggregate, &mut output.events, &mut output.warnings)?;
        }

        if !aggregate.is_empty() {
            log::debug!("Board aggregate at word {} left {} words unread", start, aggregate.remaining());
        }
        cursor.seek(start + words);
        output.aggregates += 1;
        Ok(true)
    }

    fn read_header(cursor: &mut WordCursor) -> Result<BoardAggregateHeader, ParseError> {
        let mut header_words = [0u32; BOARD_HEADER_WORDS];
        for word in header_words.iter_mut() {
            *word = cursor.read_word().ok_or(ParseError::InsufficientWords {
                lane: None,
                offset: cursor.position(),
                needed: BOARD_HEADER_WORDS,
                available: cursor.remaining(),
            })?;
        }
        Ok(BoardAggregateHeader {
            words: (header_words[0] & BOARD_SIZE_MASK) as usize,
            board_id: (header_words[1] >> 27) as u8,
            pattern: ((header_words[1] >> 8) & 0x7fff) as u16,
            channel_mask: (header_words[1] & 0xff) as u8,
            board_counter: header_words[2] & BOARD_COUNTER_MASK,
            board_time: header_words[3],
        })
    }

    /// Zero padding must run to the end of the buffer
    fn check_padding(cursor: &mut WordCursor) -> Result<(), ParseError> {
        while let Some(word) = cursor.peek_word() {
            if word != 0 {
                return Err(ParseError::PaddingExpected { offset: cursor.position(), word });
            }
            cursor.skip(1);
        }
        Ok(())
    }

    fn dump_words(cursor: &WordCursor) {
        let mut dump = cursor.clone();
        let mut line = String::new();
        while let Some(word) = dump.read_word() {
            line.push_str(&format!("{:#010x} ", word));
            if dump.position() % 8 == 0 {
                log::trace!("{}", line);
                line.clear();
            }
        }
        if !line.is_empty() {
            log::trace!("{}", line);
        }
    }

}
