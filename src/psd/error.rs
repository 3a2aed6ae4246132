use std::fmt::Display;
use std::path::PathBuf;
use std::error::Error;

/*
    Parse errors
    Offsets are word offsets into the board buffer being parsed.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    HeaderMismatch { offset: usize, word: u32 },
    PaddingExpected { offset: usize, word: u32 },
    ChannelHeaderInvalid { lane: u8, offset: usize, word: u32 },
    InsufficientWords { lane: Option<u8>, offset: usize, needed: usize, available: usize },
    EventCountMismatch { lane: u8, offset: usize, words: usize, event_words: usize },
    SentinelMismatch { lane: u8, offset: usize, word: u32 },
}

impl ParseError {
    /// Warnings are recorded but never stop the parser
    pub fn is_warning(&self) -> bool {
        matches!(self, ParseError::SentinelMismatch { .. })
    }

    pub fn offset(&self) -> usize {
        match self {
            Self::HeaderMismatch { offset, .. } => *offset,
            Self::PaddingExpected { offset, .. } => *offset,
            Self::ChannelHeaderInvalid { offset, .. } => *offset,
            Self::InsufficientWords { offset, .. } => *offset,
            Self::EventCountMismatch { offset, .. } => *offset,
            Self::SentinelMismatch { offset, .. } => *offset,
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HeaderMismatch { offset, word } => write!(f, "Board aggregate header {:#010x} at word {} does not carry the 0xa marker!", word, offset),
            Self::PaddingExpected { offset, word } => write!(f, "Expected zero padding but found {:#010x} at word {}!", word, offset),
            Self::ChannelHeaderInvalid { lane, offset, word } => write!(f, "Invalid channel aggregate header {:#010x} for lane {} at word {}!", word, lane, offset),
            Self::InsufficientWords { lane: Some(lane), offset, needed, available } => write!(f, "Insufficient words for lane {} at word {}! Needed: {}, Available: {}", lane, offset, needed, available),
            Self::InsufficientWords { lane: None, offset, needed, available } => write!(f, "Insufficient words for board aggregate at word {}! Needed: {}, Available: {}", offset, needed, available),
            Self::EventCountMismatch { lane, offset, words, event_words } => write!(f, "Channel aggregate of {} words for lane {} at word {} does not hold whole events of {} words!", words, lane, offset, event_words),
            Self::SentinelMismatch { lane, offset, word } => write!(f, "Extras sentinel mismatch for lane {} at word {}! Found: {:#010x}, Expected: 0x12345678", lane, offset, word),
        }
    }
}

impl Error for ParseError {

}

/*
    Acquisition errors
    Every acquisition error is fatal for the run.
 */
#[derive(Debug)]
pub enum AcquisitionError {
    IOError(std::io::Error),
    BadFilePath(PathBuf),
    BoardMismatch(u32, usize),
    TruncatedRecord(usize, usize),
}

impl From<std::io::Error> for AcquisitionError {
    fn from(value: std::io::Error) -> Self {
        AcquisitionError::IOError(value)
    }
}

impl Display for AcquisitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IOError(e) => write!(f, "Acquisition recieved an io error: {}", e),
            Self::BadFilePath(path) => write!(f, "File {} does not exist at ReplayFile::new!", path.display()),
            Self::BoardMismatch(found, expected) => write!(f, "Replay record belongs to board {} but board {} was requested!", found, expected),
            Self::TruncatedRecord(found, expected) => write!(f, "Replay record truncated! Found {} bytes, Expected {}", found, expected),
        }
    }
}

impl Error for AcquisitionError {

}

/*
    Sink errors
 */
#[derive(Debug)]
pub enum SinkError {
    IOError(std::io::Error),
    YamlError(serde_yaml::Error),
    #[cfg(feature = "hdf5")]
    HDFError(hdf5::Error),
}

impl From<std::io::Error> for SinkError {
    fn from(value: std::io::Error) -> Self {
        SinkError::IOError(value)
    }
}

impl From<serde_yaml::Error> for SinkError {
    fn from(value: serde_yaml::Error) -> Self {
        SinkError::YamlError(value)
    }
}

#[cfg(feature = "hdf5")]
impl From<hdf5::Error> for SinkError {
    fn from(value: hdf5::Error) -> Self {
        SinkError::HDFError(value)
    }
}

impl Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IOError(e) => write!(f, "Output sink recieved an io error: {}", e),
            Self::YamlError(e) => write!(f, "Output sink could not serialize an event: {}", e),
            #[cfg(feature = "hdf5")]
            Self::HDFError(e) => write!(f, "Output sink recieved an hdf5 error: {}", e),
        }
    }
}

impl Error for SinkError {

}

/*
    Config errors
 */
#[derive(Debug)]
pub enum ConfigError {
    BadFilePath(PathBuf),
    IOError(std::io::Error),
    ParsingError(serde_yaml::Error),
    InvalidValue(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::IOError(value)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(value: serde_yaml::Error) -> Self {
        ConfigError::ParsingError(value)
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadFilePath(path) => write!(f, "File {} given to Config does not exist!", path.display()),
            Self::IOError(e) => write!(f, "Config received an io error: {}", e),
            Self::ParsingError(e) => write!(f, "Config received a parsing error: {}", e),
            Self::InvalidValue(msg) => write!(f, "Config has an invalid value: {}", msg),
        }
    }
}

impl Error for ConfigError {

}

/*
    Controller errors
 */
#[derive(Debug)]
pub enum ControllerError {
    AcquisitionError(usize, AcquisitionError),
    SourceError(AcquisitionError),
    SinkError(SinkError),
}

impl From<SinkError> for ControllerError {
    fn from(value: SinkError) -> Self {
        ControllerError::SinkError(value)
    }
}

impl Display for ControllerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AcquisitionError(board, e) => write!(f, "Acquisition failed for board {}: {}", board, e),
            Self::SourceError(e) => write!(f, "Acquisition could not be started or stopped: {}", e),
            Self::SinkError(e) => write!(f, "Writing events failed: {}", e),
        }
    }
}

impl Error for ControllerError {

}

/*
    Processor errors
 */
#[derive(Debug)]
pub enum ProcessorError {
    ConfigError(ConfigError),
    AcquisitionError(AcquisitionError),
    SinkError(SinkError),
    ControllerError(ControllerError),
}

impl From<ConfigError> for ProcessorError {
    fn from(value: ConfigError) -> Self {
        Self::ConfigError(value)
    }
}

impl From<AcquisitionError> for ProcessorError {
    fn from(value: AcquisitionError) -> Self {
        Self::AcquisitionError(value)
    }
}

impl From<SinkError> for ProcessorError {
    fn from(value: SinkError) -> Self {
        Self::SinkError(value)
    }
}

impl From<ControllerError> for ProcessorError {
    fn from(value: ControllerError) -> Self {
        Self::ControllerError(value)
    }
}

impl Display for ProcessorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigError(e) => write!(f, "Processor failed due to Configuration error: {}", e),
            Self::AcquisitionError(e) => write!(f, "Processor failed to open the data source: {}", e),
            Self::SinkError(e) => write!(f, "Processor failed to open the output: {}", e),
            Self::ControllerError(e) => write!(f, "Processor failed during the run: {}", e),
        }
    }
}

impl Error for ProcessorError {

}
