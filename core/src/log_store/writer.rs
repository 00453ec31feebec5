//! Append-only log writer

use std::io::Write;

use crate::codec::SampleCodec;
use crate::error::LogError;
use crate::snapshot::{ChannelShape, InputSnapshot};

use super::header::LogHeader;

/// Sequential writer for one recording.
///
/// Records are staged in a reusable buffer and handed to the underlying
/// writer one at a time. Dropping the writer without calling [`finish`]
/// releases the handle; buffered sinks flush on drop on a best-effort basis.
///
/// [`finish`]: LogWriter::finish
pub struct LogWriter<W: Write = Box<dyn Write + Send>> {
    name: String,
    writer: W,
    codec: SampleCodec,
    scratch: Vec<u8>,
    records: u64,
}

impl<W: Write> LogWriter<W> {
    /// Create a writer and emit the log header
    pub fn new(name: impl Into<String>, mut writer: W, shape: ChannelShape) -> Result<Self, LogError> {
        LogHeader::new(shape)
            .write_to(&mut writer)
            .map_err(LogError::WriteFailure)?;

        Ok(Self {
            name: name.into(),
            writer,
            codec: SampleCodec::new(shape),
            scratch: Vec::with_capacity(shape.record_size()),
            records: 0,
        })
    }

    /// Append one record
    pub fn append(&mut self, snapshot: &InputSnapshot) -> Result<(), LogError> {
        self.scratch.clear();
        self.codec.encode_into(snapshot, &mut self.scratch);
        self.writer
            .write_all(&self.scratch)
            .map_err(LogError::WriteFailure)?;
        self.records += 1;
        Ok(())
    }

    /// Number of records appended so far
    pub fn records_written(&self) -> u64 {
        self.records
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> ChannelShape {
        self.codec.shape()
    }

    /// Flush and close the log, returning the record count
    pub fn finish(mut self) -> Result<u64, LogError> {
        self.writer.flush().map_err(LogError::WriteFailure)?;
        Ok(self.records)
    }

    /// Consume the writer and return the inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_store::LogReader;
    use crate::log_store::header::HEADER_SIZE;
    use std::io;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_header_and_records() {
        let shape = ChannelShape::new(2, 1);
        let mut writer = LogWriter::new("test", Vec::new(), shape).unwrap();

        writer
            .append(&InputSnapshot::new([0.1, 0.2], [false]))
            .unwrap();
        writer
            .append(&InputSnapshot::new([0.3, 0.4], [true]))
            .unwrap();
        assert_eq!(writer.records_written(), 2);

        let bytes = writer.into_inner();
        assert_eq!(bytes.len(), HEADER_SIZE + 2 * shape.record_size());
        assert_eq!(bytes[HEADER_SIZE + 8], 0);
        assert_eq!(bytes[HEADER_SIZE + 17], 1);
    }

    #[test]
    fn test_out_of_range_axes_stay_readable() {
        let shape = ChannelShape::new(2, 0);
        let mut writer = LogWriter::new("wild", Vec::new(), shape).unwrap();
        writer
            .append(&InputSnapshot::new([3.0, f32::NAN], []))
            .unwrap();

        let bytes = writer.into_inner();
        let mut reader = LogReader::open("wild", bytes.as_slice(), shape).unwrap();
        assert_eq!(
            reader.read_next().unwrap(),
            Some(InputSnapshot::new([1.0, 0.0], []))
        );
    }

    #[test]
    fn test_finish_returns_count() {
        let mut writer = LogWriter::new("test", Vec::new(), ChannelShape::new(1, 0)).unwrap();
        for _ in 0..4 {
            writer.append(&InputSnapshot::new([0.0], [])).unwrap();
        }
        assert_eq!(writer.finish().unwrap(), 4);
    }

    #[test]
    fn test_failing_sink_reports_write_failure() {
        let result = LogWriter::new("broken", BrokenPipe, ChannelShape::new(1, 1));
        assert!(matches!(result, Err(LogError::WriteFailure(_))));
    }
}
