//! Article text accounting.
//!
//! Block heights are measured by the renderer before a build and shipped in
//! the request. Here they are only looked up and turned into line counts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    constants::LEAD_BLOCK_TITLE_TYPE,
    error::{LayoutError, Result},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeightOptions {
    pub allow_last_block_tools_btn: bool,
    pub disable_art_lead_formatting: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CachedHeights {
    Block(f64),
    Article(Vec<Option<f64>>),
}

/// Precomputed text block heights, keyed the way the renderer caches them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextBlocksHeights {
    cache: HashMap<String, CachedHeights>,
}

impl TextBlocksHeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrates the table sent in `config.textBlocksHeights`. `null` is an empty table.
    pub fn from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).map_err(LayoutError::from)
    }

    /// Lead blocks of some title types and every block of negative title
    /// types are measured with their own formatting.
    pub fn cache_key(idx: usize, title_type: i64, options: HeightOptions) -> String {
        let lead = idx == 0 && title_type >= LEAD_BLOCK_TITLE_TYPE;
        if title_type < 0 || lead {
            let mut key = format!("{title_type}_{idx}");
            if lead && options.disable_art_lead_formatting {
                key.push_str("_noArtLead");
            }
            key
        } else {
            idx.to_string()
        }
    }

    pub fn insert(&mut self, idx: usize, title_type: i64, options: HeightOptions, height: f64) {
        self.cache.insert(
            Self::cache_key(idx, title_type, options),
            CachedHeights::Block(height),
        );
    }

    pub fn insert_all(&mut self, title_type: i64, heights: Vec<Option<f64>>) {
        self.cache
            .insert(format!("all_{title_type}"), CachedHeights::Article(heights));
    }

    pub fn get(&self, idx: usize, title_type: i64, options: HeightOptions) -> Option<f64> {
        match self.cache.get(&Self::cache_key(idx, title_type, options))? {
            CachedHeights::Block(height) => Some(*height),
            CachedHeights::Article(_) => None,
        }
    }

    /// Heights of blocks `0..count`, from the whole-article entry when there
    /// is one, otherwise block by block.
    pub fn get_all(&self, title_type: i64, options: HeightOptions, count: usize) -> Vec<Option<f64>> {
        if let Some(CachedHeights::Article(heights)) = self.cache.get(&format!("all_{title_type}")) {
            let mut heights = heights.clone();
            heights.resize(count, None);
            for (idx, height) in heights.iter_mut().enumerate() {
                if height.is_none() {
                    *height = self.get(idx, title_type, options);
                }
            }
            return heights;
        }
        (0..count)
            .map(|idx| self.get(idx, title_type, options))
            .collect()
    }

    /// Highest block index with a measured height, plus one.
    pub fn block_count(&self) -> usize {
        self.cache
            .iter()
            .filter_map(|(key, heights)| match heights {
                CachedHeights::Article(all) => Some(all.len()),
                CachedHeights::Block(_) => key
                    .rsplit('_')
                    .find_map(|part| part.parse::<usize>().ok())
                    .map(|idx| idx + 1),
            })
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// How the article text flows through the free slots of a layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDistribution {
    /// Columns reached after the text ran out
    pub empty_columns_count: usize,
    pub available_lines: usize,
    /// Free lines the text could not fill
    pub empty_lines_count: usize,
}

impl TextDistribution {
    /// Pours `blocks` (line counts, in reading order) into columns offering `free_lines` each.
    pub fn pour(free_lines: impl IntoIterator<Item = usize>, blocks: &[usize]) -> Self {
        let mut distribution = Self::default();
        let mut remaining = blocks.iter().copied();
        let mut current = remaining.next();
        // Text that starts past the last block never reaches a column
        let mut exhausted = blocks.is_empty();

        for mut lines in free_lines {
            distribution.available_lines += lines;
            if exhausted {
                distribution.empty_columns_count += 1;
            } else {
                while lines > 0 {
                    let block = current.unwrap_or(0);
                    if lines < block {
                        current = Some(block - lines);
                        lines = 0;
                        break;
                    }
                    lines -= block;
                    current = remaining.next();
                    if current.is_none() {
                        exhausted = true;
                        break;
                    }
                }
            }
            distribution.empty_lines_count += lines;
        }
        distribution
    }

    pub fn is_valid(&self) -> bool {
        self.empty_lines_count == 0
    }
}
