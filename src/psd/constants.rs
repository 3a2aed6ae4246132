// Board aggregate header
pub const BOARD_MARKER: u32 = 0xA;
pub const BOARD_MARKER_SHIFT: u32 = 28;
pub const BOARD_SIZE_MASK: u32 = 0x0fff_ffff;
pub const BOARD_HEADER_WORDS: usize = 4;
pub const BOARD_COUNTER_MASK: u32 = 0x007f_ffff;

// Channel aggregate header
pub const CHANNEL_HEADER_BIT: u32 = 0x8000_0000;
pub const CHANNEL_SIZE_MASK: u32 = 0x003f_ffff;
pub const CHANNEL_HEADER_WORDS: usize = 2;
pub const FLAGS_REQUIRED_BITS: u32 = 0x6000_0000; // bits 29 and 30
pub const SAMPLE_WORD_FIELD_MASK: u32 = 0xffff;

// Event words
pub const TRIGGER_TIME_MASK: u32 = 0x7fff_ffff;
pub const ANALOG_SAMPLE_MASK: u32 = 0x3fff;
pub const FINE_TIME_MASK: u32 = 0x3ff;
pub const SHORT_CHARGE_MASK: u32 = 0x7fff;
pub const EXTRAS_SENTINEL: u32 = 0x1234_5678;

// Electronics constants
pub const NUMBER_OF_LANES: usize = 8; // channel mask is one byte
pub const CHANNELS_PER_LANE: u8 = 2;
pub const NS_PER_TICK: f64 = 2.0; // 500 MHz sampling
pub const FINE_TIME_DIVISOR: f64 = 512.0;
pub const TRIGGER_TIME_BITS: u32 = 31;

// Replay file records
pub const RECORD_HEADER_BYTES: usize = 8;
