use std::path::{Path, PathBuf};
use serde_derive::{Serialize, Deserialize};

use super::constants::NUMBER_OF_LANES;
use super::error::ConfigError;

fn default_channel_mask() -> u16 {
    0xffff
}

fn default_lanes() -> usize {
    NUMBER_OF_LANES
}

fn default_watermark() -> usize {
    100000
}

fn default_update_interval() -> f64 {
    1.0
}

/// Per-board settings the merger cares about. Everything else about the board
/// (thresholds, gates, register programming) belongs to the hardware layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_channel_mask")]
    pub channel_mask: u16,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self { channel_mask: default_channel_mask() }
    }
}

/// # Config
/// Structure representing the run configuration. Contains pathing, board layout and run limits.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    #[serde(default = "default_lanes")]
    pub number_of_lanes: usize,
    pub boards: Vec<BoardConfig>,
    #[serde(default = "default_watermark")]
    pub merge_watermark: usize,
    #[serde(default = "default_update_interval")]
    pub update_interval: f64,
    #[serde(default)]
    pub max_events: u64,
    #[serde(default)]
    pub max_run_time: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("None"),
            output_path: PathBuf::from("None"),
            number_of_lanes: default_lanes(),
            boards: vec![BoardConfig::default()],
            merge_watermark: default_watermark(),
            update_interval: default_update_interval(),
            max_events: 0,
            max_run_time: 0.0,
        }
    }
}

impl Config {

    /// Read the configuration in a YAML file
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;
        let config = serde_yaml::from_str::<Self>(&yaml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.boards.is_empty() {
            return Err(ConfigError::InvalidValue(String::from("at least one board is required")));
        }
        if self.number_of_lanes == 0 || self.number_of_lanes > NUMBER_OF_LANES {
            return Err(ConfigError::InvalidValue(format!("number_of_lanes must be between 1 and {}, found {}", NUMBER_OF_LANES, self.number_of_lanes)));
        }
        if !(self.update_interval > 0.0) {
            return Err(ConfigError::InvalidValue(format!("update_interval must be positive, found {}", self.update_interval)));
        }
        if self.max_run_time < 0.0 {
            return Err(ConfigError::InvalidValue(format!("max_run_time must not be negative, found {}", self.max_run_time)));
        }
        Ok(())
    }

    pub fn number_of_boards(&self) -> usize {
        self.boards.len()
    }

    /// Lane enable byte for a board. A lane is enabled when either of its two channels is.
    pub fn lane_mask(&self, board: usize) -> u8 {
        let channel_mask = match self.boards.get(board) {
            Some(conf) => conf.channel_mask,
            None => return 0,
        };
        let mut mask: u8 = 0;
        for lane in 0..self.number_of_lanes {
            if (channel_mask >> (lane * 2)) & 0x3 != 0 {
                mask |= 1 << lane;
            }
        }
        mask
    }

    /// True when the output should go through the HDF5 writer
    pub fn wants_hdf_output(&self) -> bool {
        matches!(self.output_path.extension().and_then(|ext| ext.to_str()), Some("h5") | Some("hdf5"))
    }

}
