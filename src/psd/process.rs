use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use super::acquisition::{Acquisition, ReplayFile};
use super::config::Config;
use super::controller::{RunSummary, StreamController};
use super::error::ProcessorError;
use super::sink::{OutputSink, YamlWriter};

#[cfg(feature = "hdf5")]
fn create_sink(config: &Config) -> Result<Box<dyn OutputSink>, ProcessorError> {
    if config.wants_hdf_output() {
        let writer = super::hdf_writer::HDFWriter::new(&config.output_path)
            .map_err(super::error::SinkError::from)?;
        Ok(Box::new(writer))
    } else {
        Ok(Box::new(YamlWriter::new(&config.output_path)?))
    }
}

#[cfg(not(feature = "hdf5"))]
fn create_sink(config: &Config) -> Result<Box<dyn OutputSink>, ProcessorError> {
    if config.wants_hdf_output() {
        log::warn!("HDF5 output requested but rusted_psd was built without the hdf5 feature. Writing YAML to {} instead.", config.output_path.display());
    }
    Ok(Box::new(YamlWriter::new(&config.output_path)?))
}

/// Replay a recorded acquisition through the parsers and the merge buffer into the configured output.
pub fn process_run(config: Config, stop_flag: Arc<AtomicBool>) -> Result<RunSummary, ProcessorError> {
    config.validate()?;

    let source = ReplayFile::new(&config.input_path)?;
    if let Some(size) = source.total_size_bytes() {
        log::info!("Total run size: {}", human_bytes::human_bytes(size as f64));
    }
    let sink = create_sink(&config)?;
    log::info!("Reading {} and writing {}", source.get_filename().display(), config.output_path.display());

    let mut controller = StreamController::new(config, source, sink, stop_flag);
    let summary = controller.run()?;

    log::info!("Run stopped ({:?}) after {:.2} s", summary.stop_reason, summary.run_time);
    log::info!("Read {} of board data, {} events written, {} padding records dropped",
        human_bytes::human_bytes(summary.bytes_read as f64), summary.events_written, summary.padding_dropped);
    if summary.parse_errors > 0 {
        log::warn!("{} board buffers were only partially decoded", summary.parse_errors);
    }
    if summary.late_events > 0 {
        log::warn!("{} events were written out of order. Increase merge_watermark.", summary.late_events);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn missing_input_is_reported() {
        let config = Config {
            input_path: PathBuf::from("/no/such/run.dat"),
            output_path: std::env::temp_dir().join("rusted_psd_never_written.yaml"),
            ..Default::default()
        };
        let result = process_run(config, Arc::new(AtomicBool::new(false)));
        assert!(matches!(result, Err(ProcessorError::AcquisitionError(_))));
    }
}
