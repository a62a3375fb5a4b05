/// Lines of text that must stay free next to titles, annotations and images
pub const MIN_TEXT_LINES: usize = 3;

/// Images count slightly more than text blocks when rating page fill
pub const IMAGE_WEIGHT: f64 = 1.1;
pub const IMAGE_TYPE: &str = "image";

/// Title types from which the lead text block is measured separately
pub const LEAD_BLOCK_TITLE_TYPE: i64 = 3;

/// Layout config keys
pub const KEY_COLSPAN: &str = "colspan";
pub const KEY_TITLE_TYPE: &str = "titleType";
pub const KEY_START_BLOCK_IDX: &str = "startBlockIdx";
pub const KEY_FROM_START: &str = "fromStart";
pub const KEY_TEXT_BLOCKS_COUNT: &str = "textBlocksCount";
pub const KEY_TEXT_BLOCKS_HEIGHTS: &str = "textBlocksHeights";

/// Placement export
pub const EXPORT_HEADER: [&str; 6] = ["Column", "Top", "Height", "Colspan", "Type", "Lines"];
pub const EXPORT_FILE_PREFIX: &str = "layout";
