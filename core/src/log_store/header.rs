//! Log file header

use std::io::{self, Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::snapshot::ChannelShape;

pub const LOG_MAGIC: [u8; 4] = *b"JRPL";
pub const LOG_VERSION: u8 = 1;
pub const HEADER_SIZE: usize = 8;

/// Self-describing header written before the first record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogHeader {
    pub version: u8,
    pub shape: ChannelShape,
}

impl LogHeader {
    pub fn new(shape: ChannelShape) -> Self {
        Self {
            version: LOG_VERSION,
            shape,
        }
    }

    /// Write the 8-byte header
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&LOG_MAGIC)?;
        writer.write_u8(self.version)?;
        writer.write_u8(self.shape.axes)?;
        writer.write_u8(self.shape.buttons)?;
        writer.write_u8(0)?; // reserved
        Ok(())
    }

    /// Read and validate the 8-byte header
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != LOG_MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "not a joystick recording (bad magic)",
            ));
        }

        let version = reader.read_u8()?;
        if version != LOG_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported log version {version}"),
            ));
        }

        let axes = reader.read_u8()?;
        let buttons = reader.read_u8()?;
        let _reserved = reader.read_u8()?;

        Ok(Self {
            version,
            shape: ChannelShape::new(axes, buttons),
        })
    }
}
