pub mod acquisition;
pub mod board;
pub mod board_aggregate;
pub mod channel_aggregate;
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod event;
#[cfg(feature = "hdf5")]
pub mod hdf_writer;
pub mod ordered_buffer;
pub mod process;
pub mod sink;
pub mod word_cursor;
