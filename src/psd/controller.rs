use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use serde_derive::{Serialize, Deserialize};

use super::acquisition::{Acquisition, ReadStatus};
use super::board::Board;
use super::config::Config;
use super::error::ControllerError;
use super::ordered_buffer::OrderedMergeBuffer;
use super::sink::OutputSink;

const DRAIN_REPORT_INTERVAL: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StopReason {
    EventLimit,
    TimeLimit,
    External,
    SourceExhausted,
}

/// Totals reported at the end of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub events_read: u64,
    pub events_written: u64,
    pub padding_dropped: u64,
    pub late_events: u64,
    pub parse_errors: u64,
    pub bytes_read: u64,
    pub run_time: f64,
    pub stop_reason: StopReason,
}

/// What the sinks store about the run next to the events: the configuration it ran with and its totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub config: Config,
    pub summary: RunSummary,
}

/// # StreamController
/// Drives the acquisition cycles: read every board in order, parse, merge, write what is ready.
/// Parse problems are logged and skipped by the boards. Acquisition and sink errors end the run.
#[derive(Debug)]
pub struct StreamController<A: Acquisition, S: OutputSink> {
    config: Config,
    acquisition: A,
    sink: S,
    stop_flag: Arc<AtomicBool>,
    boards: Vec<Board>,
    merge_buffer: OrderedMergeBuffer,
    events_read: u64,
    events_written: u64,
    padding_dropped: u64,
    late_events: u64,
}

impl<A: Acquisition, S: OutputSink> StreamController<A, S> {

    pub fn new(config: Config, acquisition: A, sink: S, stop_flag: Arc<AtomicBool>) -> Self {
        let boards = (0..config.number_of_boards())
            .map(|index| Board::new(index, config.number_of_lanes, config.lane_mask(index)))
            .collect();
        Self {
            config,
            acquisition,
            sink,
            stop_flag,
            boards,
            merge_buffer: OrderedMergeBuffer::new(),
            events_read: 0,
            events_written: 0,
            padding_dropped: 0,
            late_events: 0,
        }
    }

    /// Run cycles until a stop condition is met, then drain everything to the sink.
    pub fn run(&mut self) -> Result<RunSummary, ControllerError> {
        let start = Instant::now();
        let mut last_update = Instant::now();
        self.acquisition.start().map_err(ControllerError::SourceError)?;
        log::info!("Acquisition started with {} boards, merge watermark {}", self.boards.len(), self.config.merge_watermark);

        let stop_reason = loop {
            if let Some(reason) = self.check_stop(start.elapsed().as_secs_f64()) {
                break reason;
            }
            if self.run_cycle()? == ReadStatus::Exhausted {
                break StopReason::SourceExhausted;
            }
            if last_update.elapsed().as_secs_f64() >= self.config.update_interval {
                self.report_progress(start.elapsed().as_secs_f64());
                last_update = Instant::now();
            }
        };
        log::info!("Stopping acquisition: {:?}", stop_reason);

        self.drain_remaining()?;
        let summary = RunSummary {
            events_read: self.events_read,
            events_written: self.events_written,
            padding_dropped: self.padding_dropped,
            late_events: self.late_events,
            parse_errors: self.boards.iter().map(|board| board.parse_errors).sum(),
            bytes_read: self.boards.iter().map(|board| board.bytes_read).sum(),
            run_time: start.elapsed().as_secs_f64(),
            stop_reason,
        };
        self.sink.finish(&RunRecord { config: self.config.clone(), summary: summary.clone() })?;
        self.acquisition.stop().map_err(ControllerError::SourceError)?;
        Ok(summary)
    }

    /// One pass over every board. Returns Exhausted as soon as the source runs dry.
    fn run_cycle(&mut self) -> Result<ReadStatus, ControllerError> {
        let mut status = ReadStatus::Filled;
        for board in self.boards.iter_mut() {
            match self.acquisition.read_board(board.index, &mut board.buffer) {
                Ok(ReadStatus::Filled) => (),
                Ok(ReadStatus::Exhausted) => {
                    status = ReadStatus::Exhausted;
                    break;
                }
                Err(e) => return Err(ControllerError::AcquisitionError(board.index, e)),
            }

            let events = board.parse_buffer();
            let report = self.merge_buffer.ingest(events);
            self.events_read += report.accepted as u64;
            self.padding_dropped += report.padding as u64;
            if report.late > 0 {
                log::warn!("Board {}: {} events are older than the last written timestamp; merge_watermark {} is smaller than the reordering depth",
                    board.index, report.late, self.config.merge_watermark);
                self.late_events += report.late as u64;
            }
            log::debug!("Board {}: {} events accepted, {} padding records dropped", board.index, report.accepted, report.padding);
        }

        for event in self.merge_buffer.drain_ready(self.config.merge_watermark) {
            self.sink.write_event(&event)?;
            self.events_written += 1;
        }
        Ok(status)
    }

    fn check_stop(&self, elapsed: f64) -> Option<StopReason> {
        if self.stop_flag.load(Ordering::Relaxed) {
            Some(StopReason::External)
        } else if self.config.max_events > 0 && self.events_read >= self.config.max_events {
            Some(StopReason::EventLimit)
        } else if self.config.max_run_time > 0.0 && elapsed >= self.config.max_run_time {
            Some(StopReason::TimeLimit)
        } else {
            None
        }
    }

    fn report_progress(&self, elapsed: f64) {
        log::info!("{}", self.progress_line(elapsed));
    }

    fn progress_line(&self, elapsed: f64) -> String {
        let rate = if elapsed > 0.0 { self.events_read as f64 / elapsed } else { 0.0 };
        format!("Elapsed: {:.1} s | Events read: {} | Rate: {:.1} Hz | Buffered: {}",
            elapsed, self.events_read, rate, self.merge_buffer.len())
    }

    fn drain_remaining(&mut self) -> Result<(), ControllerError> {
        log::info!("Draining {} buffered events...", self.merge_buffer.len());
        let mut drained: u64 = 0;
        let mut drain = self.merge_buffer.drain_all();
        while let Some(event) = drain.next() {
            self.sink.write_event(&event)?;
            self.events_written += 1;
            drained += 1;
            if drained % DRAIN_REPORT_INTERVAL == 0 {
                log::info!("{} events remaining", drain.remaining());
            }
        }
        Ok(())
    }

    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psd::board_aggregate::RawAggregateBuffer;
    use crate::psd::config::BoardConfig;
    use crate::psd::error::AcquisitionError;
    use crate::psd::sink::MemorySink;

    /// Hands out the same single-event aggregate forever, with a trigger time that increases per read
    struct Endless {
        reads: u32,
    }

    impl Acquisition for Endless {
        fn read_board(&mut self, _board: usize, buffer: &mut RawAggregateBuffer) -> Result<ReadStatus, AcquisitionError> {
            self.reads += 1;
            let words = [0xa000_0008, 0x0000_0001, 0, 0, 0x8000_0004, 0x6000_0000, self.reads, 0x0001_0002];
            let bytes: Vec<u8> = words.iter().flat_map(|w: &u32| w.to_le_bytes()).collect();
            buffer.prepare(bytes.len()).copy_from_slice(&bytes);
            Ok(ReadStatus::Filled)
        }
    }

    fn config(boards: usize, max_events: u64) -> Config {
        Config {
            boards: vec![BoardConfig::default(); boards],
            merge_watermark: 4,
            max_events,
            ..Default::default()
        }
    }

    #[test]
    fn event_limit_stops_and_drains() {
        let mut controller = StreamController::new(config(2, 10), Endless { reads: 0 }, MemorySink::default(), Arc::new(AtomicBool::new(false)));
        let summary = controller.run().unwrap();
        assert_eq!(summary.stop_reason, StopReason::EventLimit);
        assert_eq!(summary.events_read, 10);
        assert_eq!(summary.events_written, 10);
        let sink = controller.into_sink();
        let run = sink.run.unwrap();
        assert_eq!(run.summary, summary);
        assert_eq!(run.config.max_events, 10);
        assert!(sink.events.windows(2).all(|pair| pair[0].trigger_time <= pair[1].trigger_time));
    }

    #[test]
    fn external_stop_before_first_cycle() {
        let stop = Arc::new(AtomicBool::new(true));
        let mut controller = StreamController::new(config(1, 0), Endless { reads: 0 }, MemorySink::default(), stop);
        let summary = controller.run().unwrap();
        assert_eq!(summary.stop_reason, StopReason::External);
        assert_eq!(summary.events_read, 0);
        assert_eq!(controller.sink().run.as_ref().map(|run| run.summary.stop_reason), Some(StopReason::External));
    }

    #[test]
    fn time_limit() {
        let mut conf = config(1, 0);
        conf.max_run_time = 0.01;
        let mut controller = StreamController::new(conf, Endless { reads: 0 }, MemorySink::default(), Arc::new(AtomicBool::new(false)));
        let summary = controller.run().unwrap();
        assert_eq!(summary.stop_reason, StopReason::TimeLimit);
        assert_eq!(summary.events_read, summary.events_written);
        assert!(summary.run_time >= 0.01);
    }

    #[test]
    fn progress_line_reports_rate_and_backlog() {
        let mut conf = config(1, 5);
        conf.update_interval = 1e-9;
        conf.merge_watermark = 1000;
        let mut controller = StreamController::new(conf, Endless { reads: 0 }, MemorySink::default(), Arc::new(AtomicBool::new(false)));
        let summary = controller.run().unwrap();
        assert_eq!(summary.events_written, 5);

        controller.events_read = 40;
        controller.merge_buffer.ingest(vec![crate::psd::event::PsdEvent::new(0, 9)]);
        assert_eq!(controller.progress_line(2.0), "Elapsed: 2.0 s | Events read: 40 | Rate: 20.0 Hz | Buffered: 1");
        assert_eq!(controller.progress_line(0.0), "Elapsed: 0.0 s | Events read: 40 | Rate: 0.0 Hz | Buffered: 1");
    }

    #[test]
    fn shutdown_drain_writes_everything_in_order() {
        // watermark never reached, so every event goes out in the final drain
        let mut conf = config(1, 2500);
        conf.merge_watermark = 100000;
        let mut controller = StreamController::new(conf, Endless { reads: 0 }, MemorySink::default(), Arc::new(AtomicBool::new(false)));
        let summary = controller.run().unwrap();
        assert_eq!(summary.events_written, 2500);
        let sink = controller.into_sink();
        assert_eq!(sink.events.len(), 2500);
        assert!(sink.events.windows(2).all(|pair| pair[0].trigger_time < pair[1].trigger_time));
    }
}
