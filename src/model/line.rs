use crate::crdt::CrdtId;
use crate::error::{LinesError, Result};
use crate::model::point::Point;
use serde::Serialize;

/// Stroke colours. The numeric codes are wire-visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u32)]
pub enum PenColor {
    Black = 0,
    Gray = 1,
    White = 2,
    Yellow = 3,
    Green = 4,
    Pink = 5,
    Blue = 6,
    Red = 7,
    GrayOverlap = 8,
    Highlight = 9,
    Green2 = 10,
    Cyan = 11,
    Magenta = 12,
    Yellow2 = 13,
}

impl PenColor {
    pub fn from_u32(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::Black),
            1 => Ok(Self::Gray),
            2 => Ok(Self::White),
            3 => Ok(Self::Yellow),
            4 => Ok(Self::Green),
            5 => Ok(Self::Pink),
            6 => Ok(Self::Blue),
            7 => Ok(Self::Red),
            8 => Ok(Self::GrayOverlap),
            9 => Ok(Self::Highlight),
            10 => Ok(Self::Green2),
            11 => Ok(Self::Cyan),
            12 => Ok(Self::Magenta),
            13 => Ok(Self::Yellow2),
            other => Err(LinesError::UnknownColor(other)),
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Drawing tools. The numeric codes are wire-visible; the `1`/`2`
/// suffixes distinguish the firmware generations of each brush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u32)]
pub enum Pen {
    Paintbrush1 = 0,
    Pencil1 = 1,
    Ballpoint1 = 2,
    Marker1 = 3,
    Fineliner1 = 4,
    Highlighter1 = 5,
    Eraser = 6,
    MechanicalPencil1 = 7,
    EraserArea = 8,
    Paintbrush2 = 12,
    MechanicalPencil2 = 13,
    Pencil2 = 14,
    Ballpoint2 = 15,
    Marker2 = 16,
    Fineliner2 = 17,
    Highlighter2 = 18,
    Calligraphy = 21,
    Shader = 23,
}

impl Pen {
    pub fn from_u32(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::Paintbrush1),
            1 => Ok(Self::Pencil1),
            2 => Ok(Self::Ballpoint1),
            3 => Ok(Self::Marker1),
            4 => Ok(Self::Fineliner1),
            5 => Ok(Self::Highlighter1),
            6 => Ok(Self::Eraser),
            7 => Ok(Self::MechanicalPencil1),
            8 => Ok(Self::EraserArea),
            12 => Ok(Self::Paintbrush2),
            13 => Ok(Self::MechanicalPencil2),
            14 => Ok(Self::Pencil2),
            15 => Ok(Self::Ballpoint2),
            16 => Ok(Self::Marker2),
            17 => Ok(Self::Fineliner2),
            18 => Ok(Self::Highlighter2),
            21 => Ok(Self::Calligraphy),
            23 => Ok(Self::Shader),
            other => Err(LinesError::UnknownPen(other)),
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// A single stroke.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub color: PenColor,
    pub tool: Pen,
    pub points: Vec<Point>,
    pub thickness_scale: f64,
    pub starting_length: f32,
    pub move_id: Option<CrdtId>,
}
