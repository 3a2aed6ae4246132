use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use super::board_aggregate::RawAggregateBuffer;
use super::constants::RECORD_HEADER_BYTES;
use super::error::AcquisitionError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadStatus {
    /// The buffer holds this cycle's data for the board (possibly zero bytes)
    Filled,
    /// The source has no more data, the run should end
    Exhausted,
}

/// # Acquisition
/// The source of raw board buffers. Reads are blocking and happen board by board within a cycle.
/// Any error returned here ends the run.
pub trait Acquisition {
    fn start(&mut self) -> Result<(), AcquisitionError> {
        Ok(())
    }

    fn read_board(&mut self, board: usize, buffer: &mut RawAggregateBuffer) -> Result<ReadStatus, AcquisitionError>;

    fn stop(&mut self) -> Result<(), AcquisitionError> {
        Ok(())
    }

    /// Total bytes the source expects to deliver, if known
    fn total_size_bytes(&self) -> Option<u64> {
        None
    }
}

/// # ReplayFile
/// Replays raw board buffers recorded from a previous acquisition. The file is a sequence of records,
/// each a little-endian u32 board index, a little-endian u32 byte length, then the payload.
/// Records must appear in the order the controller polls the boards.
#[derive(Debug)]
pub struct ReplayFile {
    file_handle: BufReader<File>,
    file_path: PathBuf,
    size_bytes: u64,
    bytes_consumed: u64,
    records_read: u64,
    is_eof: bool,
}

impl ReplayFile {

    /// Open a replay file in read-only mode.
    pub fn new(path: &Path) -> Result<Self, AcquisitionError> {
        if !path.exists() {
            return Err(AcquisitionError::BadFilePath(path.to_path_buf()));
        }

        let file = File::open(path)?;
        let size_bytes = file.metadata()?.len();

        Ok(ReplayFile {
            file_handle: BufReader::new(file),
            file_path: path.to_path_buf(),
            size_bytes,
            bytes_consumed: 0,
            records_read: 0,
            is_eof: false,
        })
    }

    /// Append one record to a replay stream
    pub fn write_record<W: Write>(writer: &mut W, board: u32, bytes: &[u8]) -> Result<(), AcquisitionError> {
        writer.write_u32::<LittleEndian>(board)?;
        writer.write_u32::<LittleEndian>(bytes.len() as u32)?;
        writer.write_all(bytes)?;
        Ok(())
    }

    pub fn get_filename(&self) -> &Path {
        &self.file_path
    }

    pub fn is_eof(&self) -> bool {
        self.is_eof
    }

    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Read until `buffer` is full or the file ends. Returns the number of bytes read.
    fn fill(&mut self, buffer: &mut [u8]) -> Result<usize, AcquisitionError> {
        let mut filled = 0;
        while filled < buffer.len() {
            match self.file_handle.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(AcquisitionError::IOError(e)),
            }
        }
        Ok(filled)
    }

}

impl Acquisition for ReplayFile {

    fn read_board(&mut self, board: usize, buffer: &mut RawAggregateBuffer) -> Result<ReadStatus, AcquisitionError> {
        buffer.clear();
        if self.is_eof {
            return Ok(ReadStatus::Exhausted);
        }

        let mut header = [0u8; RECORD_HEADER_BYTES];
        let got = self.fill(&mut header)?;
        self.bytes_consumed += got as u64;
        if got == 0 {
            self.is_eof = true;
            return Ok(ReadStatus::Exhausted);
        } else if got < RECORD_HEADER_BYTES {
            return Err(AcquisitionError::TruncatedRecord(got, RECORD_HEADER_BYTES));
        }

        let record_board = LittleEndian::read_u32(&header[0..4]);
        let length = LittleEndian::read_u32(&header[4..8]) as usize;
        if record_board as usize != board {
            return Err(AcquisitionError::BoardMismatch(record_board, board));
        }

        // never size the buffer past what is left in the file
        let available = self.size_bytes.saturating_sub(self.bytes_consumed);
        if length as u64 > available {
            return Err(AcquisitionError::TruncatedRecord(available as usize, length));
        }

        let got = self.fill(buffer.prepare(length))?;
        self.bytes_consumed += got as u64;
        if got < length {
            buffer.clear();
            return Err(AcquisitionError::TruncatedRecord(got, length));
        }

        self.records_read += 1;
        Ok(ReadStatus::Filled)
    }

    fn total_size_bytes(&self) -> Option<u64> {
        Some(self.size_bytes)
    }

}
