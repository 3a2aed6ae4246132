use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use argh::FromArgs;
use log::{error, info};

use rusted_psd::psd::config::Config;
use rusted_psd::psd::process::process_run;

#[derive(Debug, FromArgs)]
/// Decode recorded DPP-PSD digitizer buffers into a single time ordered event stream.
/// Type s and press enter to stop the run early.
struct CliArgs {
    /// path to the YAML run configuration
    #[argh(option, short = 'c')]
    config: PathBuf,
    /// log at debug level
    #[argh(switch, short = 'd')]
    debug: bool,
}

/// Raise the stop flag when a line starting with 's' is typed
fn spawn_stop_watcher(stop_flag: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(text) if text.trim_start().starts_with('s') => {
                    info!("Stop requested.");
                    stop_flag.store(true, Ordering::Relaxed);
                    break;
                }
                Ok(_) => (),
                Err(_) => break,
            }
        }
    });
}

fn main() {
    let args: CliArgs = argh::from_env();

    //Setup logging
    let level = if args.debug { simplelog::LevelFilter::Debug } else { simplelog::LevelFilter::Info };
    simplelog::TermLogger::init(level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto)
    .unwrap();

    info!("Starting up rusted psd...");

    let config = match Config::read_config_file(&args.config) {
        Ok(conf) => conf,
        Err(e) => {
            error!("Could not load the configuration: {} Shutting down.", e);
            return;
        }
    };

    let stop_flag = Arc::new(AtomicBool::new(false));
    spawn_stop_watcher(stop_flag.clone());

    match process_run(config, stop_flag) {
        Ok(summary) => info!("Run successfully completed with {} events written.", summary.events_written),
        Err(e) => error!("Run ran into an error: {} Shutting down.", e),
    }
}
