//! Error types for the codec, log store and channels
//!
//! All errors are local to the channel that raised them. Errors that happen
//! inside a tick are reported through [`ChannelEvent`](crate::ChannelEvent)s
//! instead of being returned, so the control loop never stops on them.

use std::io;

use crate::channel::ChannelMode;
use crate::snapshot::ChannelShape;

/// Failure to decode one record
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// Record length does not match the channel shape
    #[error("corrupt record: expected {expected} bytes, got {actual}")]
    CorruptRecord { expected: usize, actual: usize },

    /// Axis value is not finite or outside [-1.0, 1.0]
    #[error("corrupt record: axis {axis} holds out-of-range value {value}")]
    CorruptValue { axis: usize, value: f32 },

    /// Unused bits of the button bitfield are set
    #[error("corrupt record: stray button bits {bits:#010b}")]
    StrayButtonBits { bits: u8 },

    /// End of stream reached in the middle of a record
    #[error("truncated record: expected {expected} bytes, got {actual}")]
    TruncatedRecord { expected: usize, actual: usize },
}

impl DecodeError {
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::TruncatedRecord { .. })
    }

    /// Every non-truncation failure is a corrupt record
    pub fn is_corrupt(&self) -> bool {
        !self.is_truncated()
    }
}

/// Log store failure
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// Storage location cannot be created, truncated or opened
    #[error("recording '{name}' is unavailable: {source}")]
    PathUnavailable {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Name cannot be resolved to a location under the base directory
    #[error("invalid recording name '{0}'")]
    InvalidName(String),

    /// Missing or unrecognised file header
    #[error("recording '{name}' has an invalid header: {reason}")]
    BadHeader { name: String, reason: String },

    /// Log was captured with a different channel shape
    #[error("recording '{name}' holds {found}, channel expects {expected}")]
    ShapeMismatch {
        name: String,
        expected: ChannelShape,
        found: ChannelShape,
    },

    /// I/O error while appending or closing a recording
    #[error("write to recording failed: {0}")]
    WriteFailure(#[source] io::Error),

    /// I/O error while reading a recording
    #[error("read from recording failed: {0}")]
    ReadFailure(#[source] io::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl LogError {
    pub fn is_path_unavailable(&self) -> bool {
        matches!(self, Self::PathUnavailable { .. } | Self::InvalidName(_))
    }

    pub fn is_write_failure(&self) -> bool {
        matches!(self, Self::WriteFailure(_))
    }

    pub fn is_corrupt_record(&self) -> bool {
        matches!(self, Self::Decode(e) if e.is_corrupt())
    }

    pub fn is_truncated_record(&self) -> bool {
        matches!(self, Self::Decode(e) if e.is_truncated())
    }
}

/// Channel and session failure
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Start requested while the channel already runs a session
    #[error("channel '{channel}' is already {mode}")]
    AlreadyActive { channel: String, mode: ChannelMode },

    /// Recording duration is not a positive number of ticks
    #[error("recording duration must be at least one tick, got {ticks}")]
    InvalidDuration { ticks: u64 },

    /// Getter index outside the channel shape
    #[error("{kind} index {index} out of range (channel has {len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    #[error("unknown channel '{0}'")]
    UnknownChannel(String),

    #[error("channel '{0}' is already registered")]
    DuplicateChannel(String),

    /// Another channel holds the log
    #[error("log '{log}' is in use by channel '{channel}'")]
    LogInUse { log: String, channel: String },

    /// Shape with no axes and no buttons; its records would be empty
    #[error("channel '{0}' has no axes and no buttons")]
    EmptyShape(String),

    #[error(transparent)]
    Log(#[from] LogError),
}

impl ChannelError {
    pub fn is_already_active(&self) -> bool {
        matches!(self, Self::AlreadyActive { .. })
    }

    pub fn is_log_in_use(&self) -> bool {
        matches!(self, Self::LogInUse { .. })
    }

    pub fn is_path_unavailable(&self) -> bool {
        matches!(self, Self::Log(e) if e.is_path_unavailable())
    }

    pub fn is_write_failure(&self) -> bool {
        matches!(self, Self::Log(e) if e.is_write_failure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_classification() {
        let truncated = DecodeError::TruncatedRecord {
            expected: 9,
            actual: 4,
        };
        assert!(truncated.is_truncated());
        assert!(!truncated.is_corrupt());

        let corrupt = DecodeError::CorruptValue {
            axis: 1,
            value: f32::INFINITY,
        };
        assert!(corrupt.is_corrupt());

        let log: LogError = truncated.into();
        assert!(log.is_truncated_record());
        assert!(!log.is_corrupt_record());
    }

    #[test]
    fn test_channel_error_predicates() {
        let err: ChannelError = LogError::PathUnavailable {
            name: "missing".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        }
        .into();
        assert!(err.is_path_unavailable());
        assert!(!err.is_already_active());

        let err = ChannelError::AlreadyActive {
            channel: "drive".into(),
            mode: ChannelMode::Recording,
        };
        assert!(err.is_already_active());
        assert_eq!(err.to_string(), "channel 'drive' is already recording");
    }
}
