pub mod group;
pub mod line;
pub mod point;
pub mod text;

pub use self::group::{Group, SceneItem};
pub use self::line::{Line, Pen, PenColor};
pub use self::point::Point;
pub use self::text::{GlyphRange, ParagraphStyle, Rectangle, Text, TextItem};
