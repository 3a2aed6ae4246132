use std::collections::BTreeMap;

use super::event::PsdEvent;

/// Result of handing a batch of events to the buffer
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IngestReport {
    pub accepted: usize,
    pub padding: usize,
    /// Events older than something already emitted. The watermark was too small to hold them back.
    pub late: usize,
}

/// # OrderedMergeBuffer
/// Holds decoded events from every board and lane, ordered by composite timestamp. Ties are broken by the
/// order the events were ingested, so the output is deterministic for a given input sequence.
///
/// Each lane is time ordered on its own, but lanes and boards are not ordered against each other. The buffer
/// only releases its earliest events while it holds more than `watermark` of them; an event can still arrive
/// after a later one was released if the watermark is smaller than the real reordering depth. Such events are
/// counted as late and emitted normally.
#[derive(Debug, Default)]
pub struct OrderedMergeBuffer {
    pending: BTreeMap<(u64, u64), PsdEvent>,
    sequence: u64,
    last_emitted: Option<u64>,
}

impl OrderedMergeBuffer {

    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a batch, dropping padding records with all-zero time
    pub fn ingest<I: IntoIterator<Item = PsdEvent>>(&mut self, events: I) -> IngestReport {
        let mut report = IngestReport::default();
        for event in events {
            if !event.has_valid_time() {
                report.padding += 1;
                continue;
            }
            let timestamp = event.composite_timestamp();
            if self.last_emitted.is_some_and(|last| timestamp < last) {
                report.late += 1;
            }
            self.pending.insert((timestamp, self.sequence), event);
            self.sequence += 1;
            report.accepted += 1;
        }
        report
    }

    /// Pop the earliest events until no more than `watermark` remain
    pub fn drain_ready(&mut self, watermark: usize) -> DrainReady<'_> {
        DrainReady { buffer: self, watermark }
    }

    /// Pop everything in time order. Used at the end of a run.
    pub fn drain_all(&mut self) -> DrainReady<'_> {
        DrainReady { buffer: self, watermark: 0 }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Composite timestamp of the most recently emitted event
    pub fn last_emitted(&self) -> Option<u64> {
        self.last_emitted
    }

    fn pop_earliest(&mut self) -> Option<PsdEvent> {
        let ((timestamp, _), event) = self.pending.pop_first()?;
        self.last_emitted = Some(self.last_emitted.map_or(timestamp, |last| last.max(timestamp)));
        Some(event)
    }

}

/// Iterator popping events from an OrderedMergeBuffer one at a time. Events not pulled stay in the buffer.
#[derive(Debug)]
pub struct DrainReady<'a> {
    buffer: &'a mut OrderedMergeBuffer,
    watermark: usize,
}

impl<'a> DrainReady<'a> {
    /// Events still held by the buffer
    pub fn remaining(&self) -> usize {
        self.buffer.len()
    }
}

impl<'a> Iterator for DrainReady<'a> {
    type Item = PsdEvent;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.len() > self.watermark {
            self.buffer.pop_earliest()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(channel: u8, extended: u16, trigger: u32) -> PsdEvent {
        let mut event = PsdEvent::new(channel, trigger);
        event.extended_timestamp = extended;
        event
    }

    #[test]
    fn drops_padding_records() {
        let mut buffer = OrderedMergeBuffer::new();
        let report = buffer.ingest(vec![event(0, 0, 0), event(1, 0, 5), event(2, 0, 0)]);
        assert_eq!(report, IngestReport { accepted: 1, padding: 2, late: 0 });
        assert_eq!(buffer.len(), 1);
        let all: Vec<PsdEvent> = buffer.drain_all().collect();
        assert_eq!(all[0].channel, 1);
    }

    #[test]
    fn fine_time_alone_is_not_padding() {
        let mut buffer = OrderedMergeBuffer::new();
        let mut fine = event(0, 0, 0);
        fine.fine_time = 3;
        assert_eq!(buffer.ingest(vec![fine]).accepted, 1);
    }

    #[test]
    fn drain_ready_respects_watermark() {
        let mut buffer = OrderedMergeBuffer::new();
        buffer.ingest(vec![event(0, 0, 40), event(1, 0, 10), event(2, 0, 30), event(3, 0, 20)]);
        let ready: Vec<u32> = buffer.drain_ready(2).map(|e| e.trigger_time).collect();
        assert_eq!(ready, vec![10, 20]);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.drain_ready(2).count(), 0);
        assert_eq!(buffer.last_emitted(), Some(20));
    }

    #[test]
    fn extended_timestamp_dominates() {
        let mut buffer = OrderedMergeBuffer::new();
        buffer.ingest(vec![event(0, 1, 0), event(1, 0, 0x7fff_ffff)]);
        let order: Vec<u8> = buffer.drain_all().map(|e| e.channel).collect();
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn ties_keep_ingest_order() {
        let mut buffer = OrderedMergeBuffer::new();
        let mut early_fine = event(5, 0, 7);
        early_fine.fine_time = 500;
        let mut late_fine = event(2, 0, 7);
        late_fine.fine_time = 1;
        buffer.ingest(vec![early_fine]);
        buffer.ingest(vec![late_fine, event(9, 0, 7)]);
        let order: Vec<u8> = buffer.drain_all().map(|e| e.channel).collect();
        assert_eq!(order, vec![5, 2, 9]);
    }

    #[test]
    fn interleaved_lanes_merge_when_watermark_is_deep_enough() {
        let mut buffer = OrderedMergeBuffer::new();
        let mut emitted = Vec::new();
        // two lanes, each ordered, offset by up to 3 events
        let lane_a: Vec<u32> = (0..20).map(|i| 10 + i * 10).collect();
        let lane_b: Vec<u32> = (0..20).map(|i| 5 + i * 10).collect();
        for chunk in 0..5 {
            let mut batch: Vec<PsdEvent> = lane_a[chunk * 4..chunk * 4 + 4].iter().map(|t| event(0, 0, *t)).collect();
            batch.extend(lane_b[chunk * 4..chunk * 4 + 4].iter().map(|t| event(1, 0, *t)));
            let report = buffer.ingest(batch);
            assert_eq!(report.late, 0);
            emitted.extend(buffer.drain_ready(8).map(|e| e.trigger_time));
        }
        emitted.extend(buffer.drain_all().map(|e| e.trigger_time));
        assert_eq!(emitted.len(), 40);
        assert!(emitted.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn shallow_watermark_reports_late_events() {
        let mut buffer = OrderedMergeBuffer::new();
        buffer.ingest(vec![event(0, 0, 100), event(0, 0, 200)]);
        assert_eq!(buffer.drain_ready(0).count(), 2);
        let report = buffer.ingest(vec![event(1, 0, 150), event(1, 0, 250)]);
        assert_eq!(report.late, 1);
        assert_eq!(report.accepted, 2);
        assert_eq!(buffer.drain_all().count(), 2);
    }

    #[test]
    fn partial_drain_leaves_rest_in_buffer() {
        let mut buffer = OrderedMergeBuffer::new();
        buffer.ingest((1..=5).map(|t| event(0, 0, t)));
        let mut drain = buffer.drain_all();
        assert_eq!(drain.next().map(|e| e.trigger_time), Some(1));
        assert_eq!(drain.remaining(), 4);
        assert_eq!(buffer.len(), 4);
    }
}
