use super::constants::*;
use super::error::ParseError;
use super::event::PsdEvent;
use super::word_cursor::WordCursor;

/// Layout of the extras word, selected per channel aggregate by bits 26-24 of the flags word
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExtrasFormat {
    /// [31:16] extended timestamp, [15:0] baseline * 4
    ExtendedBaseline,
    /// [31:16] extended timestamp, 15 lost trigger, 14 over range, 13 1024 triggers, 12 n lost triggers
    ExtendedFlags,
    /// As ExtendedFlags plus [9:0] fine time
    ExtendedFlagsFineTime,
    /// [31:16] lost trigger counter, [15:0] total trigger counter
    TriggerCounters,
    /// [31:16] CFD sample after zero crossing, [15:0] CFD sample before
    ZeroCrossing,
    /// Fixed 0x12345678, used to catch misaligned decoding
    Sentinel,
    Unknown(u8),
}

impl From<u8> for ExtrasFormat {
    fn from(value: u8) -> Self {
        match value {
            0 => ExtrasFormat::ExtendedBaseline,
            1 => ExtrasFormat::ExtendedFlags,
            2 => ExtrasFormat::ExtendedFlagsFineTime,
            4 => ExtrasFormat::TriggerCounters,
            5 => ExtrasFormat::ZeroCrossing,
            7 => ExtrasFormat::Sentinel,
            other => ExtrasFormat::Unknown(other),
        }
    }
}

/// The two header words of a channel aggregate
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelAggregateHeader {
    pub words: usize, // includes the two header words
    pub dual_trace: bool,
    pub extras: bool,
    pub waveform: bool,
    pub extras_format: ExtrasFormat,
    pub sample_words: usize,
}

impl ChannelAggregateHeader {

    /// Words per event: trigger word, waveform, optional extras word, trailer
    pub fn event_words(&self) -> usize {
        let waveform_words = if self.waveform { self.sample_words } else { 0 };
        waveform_words + 2 + if self.extras { 1 } else { 0 }
    }

    fn event_count(&self, lane: u8, offset: usize) -> Result<usize, ParseError> {
        let event_words = self.event_words();
        if self.words < CHANNEL_HEADER_WORDS || (self.words - CHANNEL_HEADER_WORDS) % event_words != 0 {
            return Err(ParseError::EventCountMismatch { lane, offset, words: self.words, event_words });
        }
        Ok((self.words - CHANNEL_HEADER_WORDS) / event_words)
    }

}

/// # ChannelAggregateParser
/// Decodes one lane's channel aggregate: two header words followed by a whole number of fixed-size event records.
/// Events are pushed to the caller as soon as they are complete, so when a truncated buffer stops the parser
/// every event decoded before the truncation is kept.
#[derive(Debug, Clone)]
pub struct ChannelAggregateParser {
    lane: u8,
}

impl ChannelAggregateParser {

    pub fn new(lane: u8) -> Self {
        ChannelAggregateParser { lane }
    }

    /// Physical channel of the even input in this lane
    pub fn lane_base(&self) -> u8 {
        self.lane * CHANNELS_PER_LANE
    }

    pub fn read_header(&self, cursor: &mut WordCursor) -> Result<ChannelAggregateHeader, ParseError> {
        let offset = cursor.position();
        let size_word = self.read(cursor, CHANNEL_HEADER_WORDS)?;
        if size_word & CHANNEL_HEADER_BIT == 0 {
            return Err(ParseError::ChannelHeaderInvalid { lane: self.lane, offset, word: size_word });
        }
        let flags = self.read(cursor, 1)?;
        if flags & FLAGS_REQUIRED_BITS != FLAGS_REQUIRED_BITS {
            return Err(ParseError::ChannelHeaderInvalid { lane: self.lane, offset: offset + 1, word: flags });
        }

        // The sample field holds samples / 8 and each word packs two samples
        Ok(ChannelAggregateHeader {
            words: (size_word & CHANNEL_SIZE_MASK) as usize,
            dual_trace: (flags >> 31) & 0x1 == 0x1,
            extras: (flags >> 28) & 0x1 == 0x1,
            waveform: (flags >> 27) & 0x1 == 0x1,
            extras_format: ExtrasFormat::from(((flags >> 24) & 0x7) as u8),
            sample_words: 4 * (flags & SAMPLE_WORD_FIELD_MASK) as usize,
        })
    }

    /// Parse the channel aggregate at the cursor. Decoded events are appended to `events`, non-fatal problems to
    /// `warnings`. On success the cursor is left after the aggregate and the number of words consumed is returned.
    pub fn parse(&self, cursor: &mut WordCursor, events: &mut Vec<PsdEvent>, warnings: &mut Vec<ParseError>) -> Result<usize, ParseError> {
        let start = cursor.position();
        let header = self.read_header(cursor)?;
        let n_events = header.event_count(self.lane, start)?;
        log::trace!("Lane {} at word {}: {:?}, {} events", self.lane, start, header, n_events);

        let mut body = cursor.limit(start + header.words);
        for _ in 0..n_events {
            let event = self.parse_event(&mut body, &header, warnings)?;
            events.push(event);
        }

        cursor.seek(body.position());
        Ok(cursor.position() - start)
    }

    fn parse_event(&self, cursor: &mut WordCursor, header: &ChannelAggregateHeader, warnings: &mut Vec<ParseError>) -> Result<PsdEvent, ParseError> {
        let trigger_word = self.read(cursor, header.event_words())?;
        // highest bit marks the odd channel of the pair
        let mut event = PsdEvent::new(self.lane_base() + (trigger_word >> 31) as u8, trigger_word & TRIGGER_TIME_MASK);

        if header.waveform {
            self.read_waveform(cursor, header, &mut event)?;
        }

        if header.extras {
            let offset = cursor.position();
            let extras = self.read(cursor, 2)?;
            if let Some(warning) = self.decode_extras(extras, header.extras_format, offset, &mut event) {
                warnings.push(warning);
            }
        }

        let trailer = self.read(cursor, 1)?;
        event.short_charge = (trailer & SHORT_CHARGE_MASK) as u16;
        event.over_range |= (trailer >> 15) & 0x1 == 0x1;
        event.long_charge = (trailer >> 16) as u16;

        Ok(event)
    }

    fn read_waveform(&self, cursor: &mut WordCursor, header: &ChannelAggregateHeader, event: &mut PsdEvent) -> Result<(), ParseError> {
        if cursor.remaining() < header.sample_words {
            return Err(self.insufficient(cursor, header.sample_words));
        }
        let n_samples = header.sample_words * 2;
        event.analog_traces = vec![Vec::with_capacity(n_samples); if header.dual_trace { 2 } else { 1 }];
        event.digital_traces = Vec::with_capacity(2);

        for _ in 0..header.sample_words {
            let word = self.read(cursor, 1)?;
            event.add_digital_sample(0, (word >> 14) & 0x1 == 0x1);
            event.add_digital_sample(1, (word >> 15) & 0x1 == 0x1);
            if header.dual_trace {
                // even samples belong to the second trace, odd ones to the first
                event.add_analog_sample(1, (word & ANALOG_SAMPLE_MASK) as u16);
                event.add_analog_sample(0, ((word >> 16) & ANALOG_SAMPLE_MASK) as u16);
            } else {
                event.add_analog_sample(0, (word & ANALOG_SAMPLE_MASK) as u16);
                event.add_analog_sample(0, ((word >> 16) & ANALOG_SAMPLE_MASK) as u16);
            }
            event.add_digital_sample(0, (word >> 30) & 0x1 == 0x1);
            event.add_digital_sample(1, (word >> 31) & 0x1 == 0x1);
        }
        Ok(())
    }

    fn decode_extras(&self, word: u32, format: ExtrasFormat, offset: usize, event: &mut PsdEvent) -> Option<ParseError> {
        match format {
            ExtrasFormat::ExtendedBaseline => {
                event.extended_timestamp = (word >> 16) as u16;
            }
            ExtrasFormat::ExtendedFlags => {
                Self::decode_flags(word, event);
                event.extended_timestamp = (word >> 16) as u16;
            }
            ExtrasFormat::ExtendedFlagsFineTime => {
                Self::decode_flags(word, event);
                event.extended_timestamp = (word >> 16) as u16;
                event.fine_time = (word & FINE_TIME_MASK) as u16;
            }
            ExtrasFormat::TriggerCounters | ExtrasFormat::ZeroCrossing | ExtrasFormat::Unknown(_) => (),
            ExtrasFormat::Sentinel => {
                if word != EXTRAS_SENTINEL {
                    return Some(ParseError::SentinelMismatch { lane: self.lane, offset, word });
                }
            }
        }
        None
    }

    fn decode_flags(word: u32, event: &mut PsdEvent) {
        event.lost_trigger = (word >> 15) & 0x1 == 0x1;
        event.over_range = (word >> 14) & 0x1 == 0x1;
        event.kilo_count = (word >> 13) & 0x1 == 0x1;
        event.n_lost_count = (word >> 12) & 0x1 == 0x1;
    }

    fn read(&self, cursor: &mut WordCursor, needed: usize) -> Result<u32, ParseError> {
        cursor.read_word().ok_or_else(|| self.insufficient(cursor, needed))
    }

    fn insufficient(&self, cursor: &WordCursor, needed: usize) -> ParseError {
        ParseError::InsufficientWords { lane: Some(self.lane), offset: cursor.position(), needed, available: cursor.remaining() }
    }

}
