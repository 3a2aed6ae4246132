use bitvec::prelude::*;
use serde_derive::{Serialize, Deserialize};

use super::constants::{NS_PER_TICK, FINE_TIME_DIVISOR, TRIGGER_TIME_BITS};

/// # PsdEvent
/// One digitized pulse on one channel, as decoded from a channel aggregate.
///
/// Time is split across three fields: the 31-bit trigger time counter, the 16-bit extended timestamp
/// (only present when the extras word is enabled) and the 10-bit fine time from the CFD.
/// Ordering only ever uses the composite timestamp; the fine time is carried for analysis.
///
/// The long-gate integral is called `long_charge` throughout (older firmware documentation calls it energy).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PsdEvent {
    pub channel: u8,
    pub trigger_time: u32,
    pub extended_timestamp: u16,
    pub fine_time: u16,
    pub long_charge: u16,
    pub short_charge: u16,
    pub lost_trigger: bool,
    pub over_range: bool,
    pub kilo_count: bool,
    pub n_lost_count: bool,
    pub baseline: u16,
    pub pileup: u16,
    pub format: u32,
    pub format2: u32,
    pub analog_traces: Vec<Vec<u16>>,
    pub digital_traces: Vec<BitVec<u8>>,
}

impl PsdEvent {

    pub fn new(channel: u8, trigger_time: u32) -> Self {
        PsdEvent { channel, trigger_time, ..Default::default() }
    }

    /// (extended << 31) | trigger time. 47 bits of device clock ticks.
    pub fn composite_timestamp(&self) -> u64 {
        ((self.extended_timestamp as u64) << TRIGGER_TIME_BITS) | (self.trigger_time as u64)
    }

    /// Time in ns including the CFD interpolation
    pub fn absolute_time(&self) -> f64 {
        self.composite_timestamp() as f64 * NS_PER_TICK + (self.fine_time as f64) / FINE_TIME_DIVISOR
    }

    /// All-zero time is how the hardware pads a readout; such records are not real events.
    pub fn has_valid_time(&self) -> bool {
        self.extended_timestamp != 0 || self.trigger_time != 0 || self.fine_time != 0
    }

    pub fn has_waveform(&self) -> bool {
        self.analog_traces.iter().any(|trace| !trace.is_empty())
    }

    pub fn add_analog_sample(&mut self, trace: usize, sample: u16) {
        if trace >= self.analog_traces.len() {
            self.analog_traces.resize(trace + 1, Vec::new());
        }
        self.analog_traces[trace].push(sample);
    }

    pub fn add_digital_sample(&mut self, trace: usize, sample: bool) {
        if trace >= self.digital_traces.len() {
            self.digital_traces.resize(trace + 1, BitVec::new());
        }
        self.digital_traces[trace].push(sample);
    }

    /// Flat header used by the writers: channel, trigger time, extended timestamp, fine time,
    /// long charge, short charge, packed flags
    pub fn get_header_array(&self) -> [u64; 7] {
        let flags = (self.lost_trigger as u64)
            | (self.over_range as u64) << 1
            | (self.kilo_count as u64) << 2
            | (self.n_lost_count as u64) << 3;
        [
            self.channel as u64,
            self.trigger_time as u64,
            self.extended_timestamp as u64,
            self.fine_time as u64,
            self.long_charge as u64,
            self.short_charge as u64,
            flags,
        ]
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_timestamp_concatenates() {
        let mut event = PsdEvent::new(3, 0x7fff_ffff);
        event.extended_timestamp = 0x0002;
        assert_eq!(event.composite_timestamp(), (2u64 << 31) | 0x7fff_ffff);
        event.extended_timestamp = 0xffff;
        assert_eq!(event.composite_timestamp(), (1u64 << 47) - 1);
    }

    #[test]
    fn absolute_time_adds_fine_time() {
        let mut event = PsdEvent::new(0, 100);
        event.fine_time = 256;
        assert_eq!(event.absolute_time(), 200.5);
    }

    #[test]
    fn padding_has_no_valid_time() {
        let event = PsdEvent::new(4, 0);
        assert!(!event.has_valid_time());
        let mut event = PsdEvent::new(4, 0);
        event.fine_time = 1;
        assert!(event.has_valid_time());
    }

    #[test]
    fn traces_grow_on_demand() {
        let mut event = PsdEvent::new(0, 1);
        assert!(!event.has_waveform());
        event.add_analog_sample(1, 42);
        event.add_digital_sample(1, true);
        assert_eq!(event.analog_traces, vec![vec![], vec![42]]);
        assert_eq!(event.digital_traces.len(), 2);
        assert!(event.digital_traces[1][0]);
        assert!(event.has_waveform());
    }

    #[test]
    fn header_packs_flags() {
        let mut event = PsdEvent::new(1, 2);
        event.over_range = true;
        event.n_lost_count = true;
        assert_eq!(event.get_header_array()[6], 0b1010);
    }
}
