//! Forward-only log reader

use std::io::{self, Read};

use crate::codec::SampleCodec;
use crate::error::{DecodeError, LogError};
use crate::snapshot::{ChannelShape, InputSnapshot};

use super::header::LogHeader;

/// Sequential reader for one recording.
///
/// Once the end of the log or a decode error is reached the reader is
/// finished and every further call reports end of log.
pub struct LogReader<R: Read = Box<dyn Read + Send>> {
    name: String,
    reader: R,
    codec: SampleCodec,
    scratch: Vec<u8>,
    records: u64,
    finished: bool,
}

impl<R: Read> LogReader<R> {
    /// Read the header and check it against the expected channel shape
    pub fn open(name: impl Into<String>, mut reader: R, expected: ChannelShape) -> Result<Self, LogError> {
        let name = name.into();
        let header = LogHeader::read_from(&mut reader).map_err(|e| LogError::BadHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;

        if header.shape != expected {
            return Err(LogError::ShapeMismatch {
                name,
                expected,
                found: header.shape,
            });
        }

        Ok(Self::without_header(name, reader, expected))
    }

    /// Wrap a stream positioned at the first record
    pub fn without_header(name: impl Into<String>, reader: R, shape: ChannelShape) -> Self {
        Self {
            name: name.into(),
            reader,
            codec: SampleCodec::new(shape),
            scratch: vec![0u8; shape.record_size()],
            records: 0,
            finished: false,
        }
    }

    /// Read the next record.
    ///
    /// Returns `Ok(None)` at the end of the log.
    pub fn read_next(&mut self) -> Result<Option<InputSnapshot>, LogError> {
        if self.finished {
            return Ok(None);
        }

        let result = self.read_record();
        if !matches!(result, Ok(Some(_))) {
            self.finished = true;
        }
        result
    }

    fn read_record(&mut self) -> Result<Option<InputSnapshot>, LogError> {
        let expected = self.scratch.len();
        if expected == 0 {
            // Zero-width records are indistinguishable from end of log
            return Ok(None);
        }

        let filled = fill(&mut self.reader, &mut self.scratch).map_err(LogError::ReadFailure)?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < expected {
            return Err(DecodeError::TruncatedRecord {
                expected,
                actual: filled,
            }
            .into());
        }

        let snapshot = self.codec.decode(&self.scratch)?;
        self.records += 1;
        Ok(Some(snapshot))
    }

    /// Number of records returned so far
    pub fn records_read(&self) -> u64 {
        self.records
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> ChannelShape {
        self.codec.shape()
    }
}

impl<R: Read> Iterator for LogReader<R> {
    type Item = Result<InputSnapshot, LogError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}

/// Read until `buf` is full or the stream ends, returning the bytes read
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
