use super::board_aggregate::{BoardAggregateParser, ParseOutput, RawAggregateBuffer};
use super::constants::{NUMBER_OF_LANES, CHANNELS_PER_LANE};
use super::event::PsdEvent;

/// Per-lane counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LaneState {
    pub events: u64,
    pub padding: u64,
}

/// # Board
/// Everything the controller keeps for one digitizer board: its parser, its reusable raw buffer and counters.
#[derive(Debug)]
pub struct Board {
    pub index: usize,
    pub lanes: [LaneState; NUMBER_OF_LANES],
    pub buffer: RawAggregateBuffer,
    pub aggregates: u64,
    pub parse_errors: u64,
    pub warnings: u64,
    pub bytes_read: u64,
    parser: BoardAggregateParser,
}

impl Board {

    pub fn new(index: usize, number_of_lanes: usize, lane_mask: u8) -> Self {
        Board {
            index,
            lanes: [LaneState::default(); NUMBER_OF_LANES],
            buffer: RawAggregateBuffer::new(),
            aggregates: 0,
            parse_errors: 0,
            warnings: 0,
            bytes_read: 0,
            parser: BoardAggregateParser::new(number_of_lanes, lane_mask),
        }
    }

    /// Parse whatever is in the raw buffer and update the counters.
    /// Problems are logged here with the board index; they never stop the run.
    pub fn parse_buffer(&mut self) -> Vec<PsdEvent> {
        self.bytes_read += self.buffer.length as u64;
        let ParseOutput { events, warnings, error, aggregates } = self.parser.parse(self.buffer.as_slice());
        self.buffer.clear();

        self.aggregates += aggregates as u64;
        for warning in warnings.iter() {
            log::warn!("Board {}: {}", self.index, warning);
        }
        self.warnings += warnings.len() as u64;
        if let Some(e) = error {
            log::error!("Board {}: {} Skipping the buffer from word {} on.", self.index, e, e.offset());
            self.parse_errors += 1;
        }

        for event in events.iter() {
            let lane = &mut self.lanes[(event.channel / CHANNELS_PER_LANE) as usize % NUMBER_OF_LANES];
            if event.has_valid_time() {
                lane.events += 1;
            } else {
                lane.padding += 1;
            }
        }
        events
    }

    pub fn total_events(&self) -> u64 {
        self.lanes.iter().map(|lane| lane.events).sum()
    }

}
