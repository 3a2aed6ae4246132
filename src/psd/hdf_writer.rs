use std::path::Path;
use hdf5::File;
use ndarray::Array2;

use super::controller::RunRecord;
use super::error::SinkError;
use super::event::PsdEvent;
use super::sink::OutputSink;

const GROUP_NAME: &str = "events";
const META_NAME: &str = "meta";

/// # HDFWriter
/// Wraps the hdf5-rust library. Every event gets a header dataset plus one matrix per trace kind
/// (samples x traces) when it carries a waveform. The meta group holds first/last timestamps and the count,
/// the run totals, the stop reason and the YAML of the configuration the run used.
#[derive(Debug)]
pub struct HDFWriter {
    file_handle: File,
    group: hdf5::Group,
    event_counter: u64,
    first_timestamp: Option<u64>,
    last_timestamp: u64,
}

impl HDFWriter {

    /// Create the writer, opening a file at path and creating the events group
    pub fn new(path: &Path) -> Result<Self, hdf5::Error> {
        let file_handle = File::create(path)?;
        let group = file_handle.create_group(GROUP_NAME)?;
        Ok(Self {
            file_handle,
            group,
            event_counter: 0,
            first_timestamp: None,
            last_timestamp: 0,
        })
    }

    fn analog_matrix(event: &PsdEvent) -> Array2<u16> {
        let samples = event.analog_traces.iter().map(|trace| trace.len()).max().unwrap_or(0);
        let mut matrix = Array2::<u16>::zeros([samples, event.analog_traces.len()]);
        for (column, trace) in event.analog_traces.iter().enumerate() {
            for (row, sample) in trace.iter().enumerate() {
                matrix[[row, column]] = *sample;
            }
        }
        matrix
    }

    fn digital_matrix(event: &PsdEvent) -> Array2<u8> {
        let samples = event.digital_traces.iter().map(|trace| trace.len()).max().unwrap_or(0);
        let mut matrix = Array2::<u8>::zeros([samples, event.digital_traces.len()]);
        for (column, trace) in event.digital_traces.iter().enumerate() {
            for row in trace.iter_ones() {
                matrix[[row, column]] = 1;
            }
        }
        matrix
    }

}

impl OutputSink for HDFWriter {

    fn write_event(&mut self, event: &PsdEvent) -> Result<(), SinkError> {
        let n = self.event_counter;
        self.group.new_dataset_builder()
            .with_data(&event.get_header_array())
            .create(format!("event{}_header", n).as_str())?;
        if !event.analog_traces.is_empty() {
            self.group.new_dataset_builder()
                .with_data(&Self::analog_matrix(event))
                .create(format!("event{}_analog", n).as_str())?;
        }
        if !event.digital_traces.is_empty() {
            self.group.new_dataset_builder()
                .with_data(&Self::digital_matrix(event))
                .create(format!("event{}_digital", n).as_str())?;
        }

        let timestamp = event.composite_timestamp();
        if self.first_timestamp.is_none() {
            self.first_timestamp = Some(timestamp);
        }
        self.last_timestamp = timestamp;
        self.event_counter += 1;
        Ok(())
    }

    /// Write meta information on first and last events and on the run
    fn finish(&mut self, run: &RunRecord) -> Result<(), SinkError> {
        let meta = self.file_handle.create_group(META_NAME)?;
        let meta_data: [u64; 3] = [self.first_timestamp.unwrap_or(0), self.last_timestamp, self.event_counter];
        meta.new_dataset_builder()
            .with_data(&meta_data)
            .create("meta")?;

        let summary = &run.summary;
        let totals: [u64; 6] = [
            summary.events_read,
            summary.events_written,
            summary.padding_dropped,
            summary.late_events,
            summary.parse_errors,
            summary.bytes_read,
        ];
        meta.new_dataset_builder().with_data(&totals).create("run")?;
        meta.new_dataset_builder().with_data(&[summary.run_time]).create("run_time")?;
        // text is stored as raw utf-8 bytes
        let stop_reason = format!("{:?}", summary.stop_reason);
        meta.new_dataset_builder().with_data(stop_reason.as_bytes()).create("stop_reason")?;
        let config = serde_yaml::to_string(&run.config)?;
        meta.new_dataset_builder().with_data(config.as_bytes()).create("config")?;

        self.file_handle.flush()?;
        log::info!("{} events written to HDF5, timestamps {} to {}", meta_data[2], meta_data[0], meta_data[1]);
        Ok(())
    }

}
