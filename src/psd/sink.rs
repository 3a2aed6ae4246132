use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::controller::RunRecord;
use super::error::SinkError;
use super::event::PsdEvent;

/// # OutputSink
/// Receives events in time order from the controller and persists them.
pub trait OutputSink {
    fn write_event(&mut self, event: &PsdEvent) -> Result<(), SinkError>;

    /// Called once after the final drain with the run configuration and totals
    fn finish(&mut self, _run: &RunRecord) -> Result<(), SinkError> {
        Ok(())
    }
}

/// # YamlWriter
/// Streams every event as its own YAML document. Slow but readable, and needs no native libraries.
/// The last document of the stream is the RunRecord.
#[derive(Debug)]
pub struct YamlWriter {
    writer: BufWriter<File>,
    events_written: u64,
}

impl YamlWriter {

    pub fn new(path: &Path) -> Result<Self, SinkError> {
        let file = File::create(path)?;
        Ok(Self { writer: BufWriter::new(file), events_written: 0 })
    }

    pub fn events_written(&self) -> u64 {
        self.events_written
    }

}

impl OutputSink for YamlWriter {

    fn write_event(&mut self, event: &PsdEvent) -> Result<(), SinkError> {
        self.writer.write_all(b"---\n")?;
        serde_yaml::to_writer(&mut self.writer, event)?;
        self.events_written += 1;
        Ok(())
    }

    fn finish(&mut self, run: &RunRecord) -> Result<(), SinkError> {
        self.writer.write_all(b"---\n")?;
        serde_yaml::to_writer(&mut self.writer, run)?;
        self.writer.flush()?;
        Ok(())
    }

}

/// Keeps everything in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub events: Vec<PsdEvent>,
    /// Set by finish
    pub run: Option<RunRecord>,
}

impl OutputSink for MemorySink {

    fn write_event(&mut self, event: &PsdEvent) -> Result<(), SinkError> {
        self.events.push(event.clone());
        Ok(())
    }

    fn finish(&mut self, run: &RunRecord) -> Result<(), SinkError> {
        self.run = Some(run.clone());
        Ok(())
    }

}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {

    fn write_event(&mut self, event: &PsdEvent) -> Result<(), SinkError> {
        (**self).write_event(event)
    }

    fn finish(&mut self, run: &RunRecord) -> Result<(), SinkError> {
        (**self).finish(run)
    }

}
