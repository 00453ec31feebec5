//! Fixed-width sample codec
//!
//! One record per tick. The record carries no framing of its own, so the
//! channel shape must be supplied to decode it:
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ axes:    axis_count × f32 (little endian)│
//! │ buttons: ceil(button_count / 8) bytes    │
//! │          bit i of byte i/8 = button i    │
//! └──────────────────────────────────────────┘
//! ```

use byteorder::{ByteOrder, LittleEndian};

use crate::error::DecodeError;
use crate::snapshot::{AXIS_MAX, AXIS_MIN, ChannelShape, InputSnapshot};

/// Encoder/decoder bound to one channel shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleCodec {
    shape: ChannelShape,
}

impl SampleCodec {
    pub fn new(shape: ChannelShape) -> Self {
        Self { shape }
    }

    pub fn shape(&self) -> ChannelShape {
        self.shape
    }

    /// Size of one encoded record
    pub fn record_size(&self) -> usize {
        self.shape.record_size()
    }

    /// Append one encoded record to `out`.
    ///
    /// Entries beyond the shape are ignored and missing entries are written
    /// as neutral values, so the record is always exactly `record_size` bytes.
    /// Axes are clamped to the valid range and NaN is written as 0.0, so every
    /// encoded record decodes.
    pub fn encode_into(&self, snapshot: &InputSnapshot, out: &mut Vec<u8>) {
        let start = out.len();
        out.resize(start + self.record_size(), 0);
        let record = &mut out[start..];

        let (axes, buttons) = record.split_at_mut(self.shape.axis_count() * 4);
        for (i, chunk) in axes.chunks_exact_mut(4).enumerate() {
            let value = match snapshot.axis(i) {
                Some(v) if !v.is_nan() => v.clamp(AXIS_MIN, AXIS_MAX),
                _ => 0.0,
            };
            LittleEndian::write_f32(chunk, value);
        }
        for (i, _) in snapshot
            .buttons
            .iter()
            .take(self.shape.button_count())
            .enumerate()
            .filter(|(_, pressed)| **pressed)
        {
            buttons[i / 8] |= 1 << (i % 8);
        }
    }

    pub fn encode(&self, snapshot: &InputSnapshot) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.record_size());
        self.encode_into(snapshot, &mut out);
        out
    }

    /// Decode exactly one record
    pub fn decode(&self, bytes: &[u8]) -> Result<InputSnapshot, DecodeError> {
        let expected = self.record_size();
        if bytes.len() != expected {
            return Err(DecodeError::CorruptRecord {
                expected,
                actual: bytes.len(),
            });
        }

        let (axis_bytes, button_bytes) = bytes.split_at(self.shape.axis_count() * 4);
        let mut snapshot = InputSnapshot::neutral(self.shape);

        for (axis, chunk) in axis_bytes.chunks_exact(4).enumerate() {
            let value = LittleEndian::read_f32(chunk);
            if !(AXIS_MIN..=AXIS_MAX).contains(&value) {
                return Err(DecodeError::CorruptValue { axis, value });
            }
            snapshot.axes[axis] = value;
        }

        let button_count = self.shape.button_count();
        if let Some(&last) = button_bytes.last() {
            let used = button_count - (button_bytes.len() - 1) * 8;
            let stray = if used == 8 { 0 } else { last & !((1u8 << used) - 1) };
            if stray != 0 {
                return Err(DecodeError::StrayButtonBits { bits: stray });
            }
        }
        for (i, pressed) in snapshot.buttons.iter_mut().enumerate() {
            *pressed = button_bytes[i / 8] & (1 << (i % 8)) != 0;
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let codec = SampleCodec::new(ChannelShape::new(2, 3));
        let bytes = codec.encode(&InputSnapshot::new([0.5, -1.0], [true, false, true]));

        assert_eq!(bytes.len(), 9);
        assert_eq!(&bytes[0..4], &0.5f32.to_le_bytes());
        assert_eq!(&bytes[4..8], &(-1.0f32).to_le_bytes());
        assert_eq!(bytes[8], 0b101);
    }

    #[test]
    fn test_roundtrip_is_bit_exact() {
        let shape = ChannelShape::new(3, 10);
        let codec = SampleCodec::new(shape);
        let snapshot = InputSnapshot::new(
            [0.1, -0.333_333_34, 1.0],
            [true, false, false, true, false, false, false, false, true, true],
        );

        let decoded = codec.decode(&codec.encode(&snapshot)).unwrap();
        assert_eq!(decoded, snapshot);
        for (a, b) in decoded.axes.iter().zip(snapshot.axes.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_encode_fills_missing_entries() {
        let codec = SampleCodec::new(ChannelShape::new(2, 2));
        let bytes = codec.encode(&InputSnapshot::new([0.25], []));
        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!(decoded.axes.as_slice(), &[0.25, 0.0]);
        assert_eq!(decoded.buttons.as_slice(), &[false, false]);
    }

    #[test]
    fn test_decode_wrong_length_is_corrupt() {
        let codec = SampleCodec::new(ChannelShape::new(2, 1));
        let err = codec.decode(&[0u8; 8]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::CorruptRecord {
                expected: 9,
                actual: 8
            }
        );
    }

    #[test]
    fn test_decode_rejects_out_of_range_axis() {
        let codec = SampleCodec::new(ChannelShape::new(1, 0));
        let err = codec.decode(&1.5f32.to_le_bytes()).unwrap_err();
        assert!(matches!(err, DecodeError::CorruptValue { axis: 0, .. }));

        let err = codec.decode(&f32::NAN.to_le_bytes()).unwrap_err();
        assert!(matches!(err, DecodeError::CorruptValue { axis: 0, .. }));
    }

    #[test]
    fn test_encode_clamps_axes() {
        let codec = SampleCodec::new(ChannelShape::new(3, 1));
        let bytes = codec.encode(&InputSnapshot::new([1.5, f32::NAN, -7.0], [true]));

        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!(decoded, InputSnapshot::new([1.0, 0.0, -1.0], [true]));
    }

    #[test]
    fn test_decode_rejects_stray_button_bits() {
        let codec = SampleCodec::new(ChannelShape::new(0, 3));
        assert!(codec.decode(&[0b0000_0111]).is_ok());

        let err = codec.decode(&[0b0000_1001]).unwrap_err();
        assert_eq!(err, DecodeError::StrayButtonBits { bits: 0b0000_1000 });
    }

    #[test]
    fn test_full_button_byte_has_no_padding() {
        let codec = SampleCodec::new(ChannelShape::new(0, 8));
        let decoded = codec.decode(&[0xFF]).unwrap();
        assert!(decoded.buttons.iter().all(|b| *b));
    }

    #[test]
    fn test_empty_shape() {
        let codec = SampleCodec::new(ChannelShape::new(0, 0));
        assert!(codec.encode(&InputSnapshot::default()).is_empty());
        assert_eq!(codec.decode(&[]).unwrap(), InputSnapshot::default());
    }
}
