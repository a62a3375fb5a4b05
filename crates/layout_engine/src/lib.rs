pub mod block;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod layout;
pub mod metrics;
pub mod ordered;
pub mod search;
pub mod tie_break;
pub mod worker;

pub use block::{Anchor, BlockInstance, InstanceConfig, Placement, Restriction, Side};
pub use config::{EngineConfig, SearchConfig, TieBreakMode};
pub use error::{LayoutError, Result};
pub use layout::{Column, ColumnView, Layout, LayoutSnapshot, Position, Slot, TextBlocksHeights};
pub use metrics::{Metrics, MetricsUpdate};
pub use search::{BlockLayout, LayoutBuilder, LayoutQuality, MetaChild, MetaNode, SearchStats};
pub use tie_break::TieBreaker;
pub use worker::{BuildRequest, LayoutWorker};
