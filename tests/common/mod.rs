#![allow(dead_code)]

use bitvec::prelude::*;
use rusted_psd::psd::event::PsdEvent;

/// How a channel aggregate is laid out
#[derive(Debug, Clone, Copy)]
pub struct ChannelLayout {
    pub dual_trace: bool,
    /// Some(format) when every event carries an extras word
    pub extras_format: Option<u32>,
    /// samples / 8, zero for no waveform
    pub sample_field: u32,
}

impl ChannelLayout {
    pub fn plain() -> Self {
        ChannelLayout { dual_trace: false, extras_format: None, sample_field: 0 }
    }

    pub fn timed() -> Self {
        ChannelLayout { dual_trace: false, extras_format: Some(2), sample_field: 0 }
    }

    pub fn samples(&self) -> usize {
        8 * self.sample_field as usize
    }
}

pub fn to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

/// Event with traces sized for the layout, filled with a recognizable pattern
pub fn event_for(layout: &ChannelLayout, channel: u8, extended: u16, trigger: u32) -> PsdEvent {
    let mut event = PsdEvent::new(channel, trigger);
    event.extended_timestamp = extended;
    event.short_charge = (trigger as u16) & 0x7fff;
    event.long_charge = 0x4000 | channel as u16;
    if matches!(layout.extras_format, Some(1) | Some(2)) {
        event.lost_trigger = trigger % 2 == 0;
        event.kilo_count = trigger % 3 == 0;
    }
    if layout.extras_format == Some(2) {
        event.fine_time = (trigger & 0x3ff) as u16;
    }
    if layout.sample_field > 0 {
        // dual trace splits the samples between the two analog traces
        let (traces, per_trace) = if layout.dual_trace { (2, layout.samples() / 2) } else { (1, layout.samples()) };
        event.analog_traces = (0..traces)
            .map(|t| (0..per_trace).map(|i| ((i * 37 + t * 1000 + trigger as usize) & 0x3fff) as u16).collect())
            .collect();
        event.digital_traces = (0..2)
            .map(|t| (0..layout.samples()).map(|i| (i + t) % 3 == 0).collect::<BitVec<u8>>())
            .collect();
    }
    event
}

fn encode_event(layout: &ChannelLayout, event: &PsdEvent, words: &mut Vec<u32>) {
    words.push(((event.channel as u32 % 2) << 31) | event.trigger_time);

    if layout.sample_field > 0 {
        let digital = |trace: usize, sample: usize| event.digital_traces[trace][sample] as u32;
        for i in 0..layout.samples() / 2 {
            let (low, high) = if layout.dual_trace {
                (event.analog_traces[1][i], event.analog_traces[0][i])
            } else {
                (event.analog_traces[0][2 * i], event.analog_traces[0][2 * i + 1])
            };
            words.push(
                low as u32
                    | digital(0, 2 * i) << 14
                    | digital(1, 2 * i) << 15
                    | (high as u32) << 16
                    | digital(0, 2 * i + 1) << 30
                    | digital(1, 2 * i + 1) << 31,
            );
        }
    }

    match layout.extras_format {
        Some(2) => words.push(
            (event.extended_timestamp as u32) << 16
                | (event.lost_trigger as u32) << 15
                | (event.over_range as u32) << 14
                | (event.kilo_count as u32) << 13
                | (event.n_lost_count as u32) << 12
                | event.fine_time as u32,
        ),
        Some(1) => words.push(
            (event.extended_timestamp as u32) << 16
                | (event.lost_trigger as u32) << 15
                | (event.over_range as u32) << 14
                | (event.kilo_count as u32) << 13
                | (event.n_lost_count as u32) << 12,
        ),
        Some(0) => words.push((event.extended_timestamp as u32) << 16),
        Some(7) => words.push(0x1234_5678),
        Some(_) => words.push(0),
        None => (),
    }

    words.push((event.long_charge as u32) << 16 | (event.over_range as u32) << 15 | event.short_charge as u32);
}

/// Channel aggregate for one lane: size word, flags word, events
pub fn encode_channel(layout: &ChannelLayout, events: &[PsdEvent]) -> Vec<u32> {
    let mut flags = 0x6000_0000 | layout.sample_field;
    if layout.dual_trace {
        flags |= 1 << 31;
    }
    if let Some(format) = layout.extras_format {
        flags |= 1 << 28 | format << 24;
    }
    if layout.sample_field > 0 {
        flags |= 1 << 27;
    }

    let mut words = vec![0, flags];
    for event in events {
        encode_event(layout, event, &mut words);
    }
    words[0] = 0x8000_0000 | words.len() as u32;
    words
}

/// Board aggregate holding the given lanes. Lanes must be ascending.
pub fn encode_board(board_id: u32, counter: u32, lanes: &[(u8, Vec<u32>)]) -> Vec<u32> {
    let mask = lanes.iter().fold(0u32, |mask, (lane, _)| mask | 1u32 << *lane);
    let mut words = vec![0, board_id << 27 | mask, counter, counter * 16];
    for (_, channel) in lanes {
        words.extend_from_slice(channel);
    }
    words[0] = 0xa000_0000 | words.len() as u32;
    words
}

/// One lane, events split across the two channels of the lane
pub fn lane_events(layout: &ChannelLayout, lane: u8, extended: u16, triggers: &[u32]) -> Vec<PsdEvent> {
    triggers
        .iter()
        .enumerate()
        .map(|(i, trigger)| event_for(layout, lane * 2 + (i % 2) as u8, extended, *trigger))
        .collect()
}
