use crate::error::{LinesError, Result};
use crate::stream::ByteStream;
use serde::Serialize;

/// One pen sample. The integer fields are stored in their version-2
/// wire forms; version-1 streams store scaled f32s and are converted
/// on the fly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub speed: u16,
    pub direction: u8,
    pub width: u16,
    pub pressure: u8,
}

impl Point {
    pub const V1_SIZE: usize = 24;
    pub const V2_SIZE: usize = 14;

    pub fn serialized_size(version: u8) -> Result<usize> {
        match version {
            1 => Ok(Self::V1_SIZE),
            2 => Ok(Self::V2_SIZE),
            other => Err(LinesError::InvalidEncoding(format!(
                "unsupported point encoding version {other}"
            ))),
        }
    }

    pub fn read(stream: &mut ByteStream, version: u8) -> Result<Self> {
        match version {
            1 => Self::read_v1(stream),
            2 => Self::read_v2(stream),
            other => Err(LinesError::InvalidEncoding(format!(
                "unsupported point encoding version {other}"
            ))),
        }
    }

    pub fn write(&self, stream: &mut ByteStream, version: u8) -> Result<()> {
        match version {
            1 => self.write_v1(stream),
            2 => self.write_v2(stream),
            other => Err(LinesError::InvalidEncoding(format!(
                "unsupported point encoding version {other}"
            ))),
        }
    }

    // v1 stores all six fields as f32, with speed and width scaled by
    // 4, direction mapped from radians onto [0, 255] and pressure onto
    // [0, 255]. Float-to-int casts saturate, so malformed extremes
    // clamp instead of wrapping.
    fn read_v1(stream: &mut ByteStream) -> Result<Self> {
        let x = stream.read_f32()?;
        let y = stream.read_f32()?;
        let speed = (stream.read_f32()? * 4.0).round() as u16;
        let direction = (255.0 * stream.read_f32()? / (std::f32::consts::PI * 2.0)).round() as u8;
        let width = (stream.read_f32()? * 4.0).round() as u16;
        let pressure = (stream.read_f32()? * 255.0).round() as u8;
        Ok(Self {
            x,
            y,
            speed,
            direction,
            width,
            pressure,
        })
    }

    fn write_v1(&self, stream: &mut ByteStream) -> Result<()> {
        stream.write_f32(self.x)?;
        stream.write_f32(self.y)?;
        stream.write_f32(f32::from(self.speed) / 4.0)?;
        stream.write_f32(f32::from(self.direction) * (std::f32::consts::PI * 2.0) / 255.0)?;
        stream.write_f32(f32::from(self.width) / 4.0)?;
        stream.write_f32(f32::from(self.pressure) / 255.0)
    }

    fn read_v2(stream: &mut ByteStream) -> Result<Self> {
        let x = stream.read_f32()?;
        let y = stream.read_f32()?;
        let speed = stream.read_u16()?;
        let width = stream.read_u16()?;
        let direction = stream.read_u8()?;
        let pressure = stream.read_u8()?;
        Ok(Self {
            x,
            y,
            speed,
            direction,
            width,
            pressure,
        })
    }

    fn write_v2(&self, stream: &mut ByteStream) -> Result<()> {
        stream.write_f32(self.x)?;
        stream.write_f32(self.y)?;
        stream.write_u16(self.speed)?;
        stream.write_u16(self.width)?;
        stream.write_u8(self.direction)?;
        stream.write_u8(self.pressure)
    }
}
