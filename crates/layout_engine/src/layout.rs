pub mod column;
pub mod page;
pub mod rating;
pub mod restrictions;
pub mod snapshot;
pub mod text;

pub use column::{Cell, Column, ColumnView, Position, PositionRecord, Slot};
pub use page::Layout;
pub use rating::{Gaps, Rating};
pub use snapshot::{CellSnapshot, ColumnSnapshot, LayoutSnapshot, PositionSnapshot};
pub use text::{HeightOptions, TextBlocksHeights, TextDistribution};
