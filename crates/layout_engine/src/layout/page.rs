use std::{cell::OnceCell, cmp::Ordering, rc::Rc};

use serde_json::{Map, Value};

use crate::{
    block::{BlockInstance, Side},
    constants::{
        KEY_FROM_START, KEY_START_BLOCK_IDX, KEY_TEXT_BLOCKS_COUNT, KEY_TITLE_TYPE, MIN_TEXT_LINES,
    },
    error::{LayoutError, Result},
    layout::{
        column::{Column, ColumnView, Position},
        rating::{Gaps, Rating},
        text::{HeightOptions, TextBlocksHeights, TextDistribution},
    },
    metrics::Metrics,
    tie_break::TieBreaker,
};

/// One page candidate: `colspan` columns and the blocks placed in them.
///
/// Cloning is cheap. Columns are shared until a placement touches them, so
/// sibling branches of the search never see each other's blocks.
#[derive(Debug, Clone)]
pub struct Layout {
    columns: Vec<Rc<Column>>,
    config: Map<String, Value>,
    block_instances: Vec<Rc<BlockInstance>>,
    metrics: Metrics,
    text_heights: Rc<TextBlocksHeights>,
    rating: OnceCell<Rating>,
    text_distribution: OnceCell<TextDistribution>,
    total_lines: OnceCell<usize>,
    total_text_lines: OnceCell<usize>,
}

/// Placement found while scanning, applied later on a copy
struct Candidate {
    column: usize,
    top: f64,
    columns_count: usize,
}

impl Layout {
    pub fn new(colspan: usize, metrics: Metrics) -> Self {
        Self::from_parts(
            (0..colspan).map(|i| Rc::new(Column::new(i))).collect(),
            Map::new(),
            Vec::new(),
            metrics,
        )
    }

    pub(crate) fn from_parts(
        columns: Vec<Rc<Column>>,
        config: Map<String, Value>,
        block_instances: Vec<Rc<BlockInstance>>,
        metrics: Metrics,
    ) -> Self {
        Self {
            columns,
            config,
            block_instances,
            metrics,
            text_heights: Rc::default(),
            rating: OnceCell::new(),
            text_distribution: OnceCell::new(),
            total_lines: OnceCell::new(),
            total_text_lines: OnceCell::new(),
        }
    }

    /// Shallow-merges `config` over the current one.
    pub fn apply_config(&mut self, config: &Map<String, Value>) -> &mut Self {
        for (key, value) in config {
            self.config.insert(key.clone(), value.clone());
        }
        self.invalidate();
        self
    }

    pub fn with_config(mut self, config: &Map<String, Value>) -> Self {
        self.apply_config(config);
        self
    }

    pub fn with_text_heights(mut self, heights: TextBlocksHeights) -> Self {
        self.text_heights = Rc::new(heights);
        self.invalidate();
        self
    }

    pub fn colspan(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Rc<Column>] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<ColumnView<'_>> {
        ColumnView::new(&self.columns, index, &self.metrics)
    }

    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    pub fn block_instances(&self) -> &[Rc<BlockInstance>] {
        &self.block_instances
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn text_heights(&self) -> &TextBlocksHeights {
        &self.text_heights
    }

    pub fn title_type(&self) -> Option<f64> {
        self.config.get(KEY_TITLE_TYPE).and_then(Value::as_f64)
    }

    fn title_type_key(&self) -> i64 {
        self.title_type().map_or(0, |t| t as i64)
    }

    /// Every way `instance` can be added, one independent copy per placement.
    ///
    /// With `expand` the copies may have more columns than `self`. An empty
    /// result means the block does not fit.
    pub fn add_block_instance(
        &self,
        instance: &Rc<BlockInstance>,
        expand: bool,
        max_height: Option<f64>,
    ) -> Vec<Layout> {
        let colspan = instance.colspan;
        if colspan == 0 || (colspan > self.colspan() && !expand) || !(instance.height > 0.0) {
            return Vec::new();
        }
        let placement = instance.placement();
        let mut base = self.clone();
        let mut candidates = Vec::new();

        if placement.side == Side::Right {
            let Some(index) = base.colspan().checked_sub(colspan) else {
                return Vec::new();
            };
            let found = find_positions(&base.columns, index, &base.metrics, instance, max_height);
            candidates.extend(found.into_iter().map(|position| Candidate {
                column: index,
                top: position.top,
                columns_count: base.colspan(),
            }));
        } else {
            if expand {
                base.expand_for_text(base.metrics.lines_count(0.0, instance.height, colspan));
            }
            let columns_count = base.colspan();
            let mut scratch = base.columns.clone();

            for index in 0..columns_count {
                if expand && candidates.is_empty() && index + colspan > scratch.len() {
                    grow(&mut scratch, index + colspan);
                }
                let found = find_positions(&scratch, index, &base.metrics, instance, max_height);
                let accepted = !found.is_empty();
                candidates.extend(found.into_iter().map(|position| Candidate {
                    column: index,
                    top: position.top,
                    columns_count: scratch.len(),
                }));
                if (accepted && !placement.arbitrary) || placement.side == Side::Left {
                    break;
                }
            }

            if candidates.is_empty() && expand {
                grow(&mut scratch, columns_count + colspan);
                let found =
                    find_positions(&scratch, columns_count, &base.metrics, instance, max_height);
                candidates.extend(found.into_iter().map(|position| Candidate {
                    column: columns_count,
                    top: position.top,
                    columns_count: scratch.len(),
                }));
            }
        }

        candidates
            .into_iter()
            .map(|candidate| {
                let mut layout = base.clone();
                layout.expand(candidate.columns_count.saturating_sub(layout.colspan()));
                layout.apply_position(candidate.column, candidate.top, Rc::clone(instance));
                layout
            })
            .collect()
    }

    /// Places `instance` at `top` of column `index` without any search.
    pub fn place(&mut self, index: usize, top: f64, instance: BlockInstance) -> Result<()> {
        if instance.colspan == 0 {
            return Err(LayoutError::InvalidRequest(format!(
                "block '{}' must span at least one column",
                instance.kind
            )));
        }
        if index + instance.colspan > self.colspan() {
            return Err(LayoutError::ColumnOutOfRange {
                index,
                colspan: self.colspan(),
            });
        }
        self.apply_position(index, top, Rc::new(instance));
        Ok(())
    }

    fn apply_position(&mut self, index: usize, top: f64, instance: Rc<BlockInstance>) {
        for (key, value) in &instance.layout_config {
            self.config.insert(key.clone(), value.clone());
        }
        self.block_instances.push(Rc::clone(&instance));
        if let Some(column) = self.columns.get_mut(index) {
            Rc::make_mut(column).push_cell(Rc::clone(&instance), top);
        }
        for (offset, current) in (1..=instance.colspan).rev().enumerate() {
            let Some(column) = self.columns.get_mut(index + offset) else {
                break;
            };
            Rc::make_mut(column).push_position(top, current, Rc::clone(&instance));
        }
        self.invalidate();
    }

    /// Appends `count` empty columns.
    pub fn expand(&mut self, count: usize) -> &mut Self {
        if count > 0 {
            let len = self.columns.len() + count;
            grow(&mut self.columns, len);
            self.invalidate();
        }
        self
    }

    /// Grows the layout until placed blocks, text and `extra_lines` fit.
    pub fn expand_for_text(&mut self, extra_lines: usize) -> &mut Self {
        let lines_per_column = self.metrics.lines_per_column;
        if lines_per_column == 0 {
            return self;
        }
        let total = self.total_lines_count() + extra_lines;
        let needed = total.div_ceil(lines_per_column);
        self.expand(needed.saturating_sub(self.colspan()))
    }

    fn invalidate(&mut self) {
        self.rating.take();
        self.text_distribution.take();
        self.total_lines.take();
        self.total_text_lines.take();
    }

    pub fn rating(&self) -> &Rating {
        self.rating
            .get_or_init(|| Rating::measure(&self.columns, &self.metrics))
    }

    pub fn rate(&self) -> f64 {
        self.rating().rate
    }

    pub fn gaps(&self) -> &Gaps {
        &self.rating().gaps
    }

    /// Orders two layouts by page fill, title type and empty column runs.
    ///
    /// `Equal` means only a coin flip can separate them.
    pub fn compare_to(&self, other: &Layout) -> Ordering {
        self.rating()
            .compare(other.rating(), (self.title_type(), other.title_type()))
    }

    /// The better of two layouts.
    pub fn pick(first: Layout, second: Layout, tie_breaker: &mut TieBreaker) -> Layout {
        match first.compare_to(&second) {
            Ordering::Greater => first,
            Ordering::Less => second,
            Ordering::Equal if tie_breaker.keep_first() => first,
            Ordering::Equal => second,
        }
    }

    pub fn start_block_idx(&self) -> usize {
        if self.config.get(KEY_FROM_START).is_some_and(is_truthy) {
            return 0;
        }
        self.config
            .get(KEY_START_BLOCK_IDX)
            .and_then(Value::as_u64)
            .map_or(0, |idx| idx as usize)
    }

    pub fn text_blocks_count(&self) -> usize {
        self.config
            .get(KEY_TEXT_BLOCKS_COUNT)
            .and_then(Value::as_u64)
            .map_or_else(|| self.text_heights.block_count(), |count| count as usize)
    }

    /// Line counts of the text blocks still to be laid out, in reading order
    fn text_block_lines(&self, options: HeightOptions) -> Vec<usize> {
        let start = self.start_block_idx();
        self.text_heights
            .get_all(self.title_type_key(), options, self.text_blocks_count())
            .into_iter()
            .skip(start)
            .map(|height| height.map_or(0, |h| self.metrics.whole_lines(h)))
            .collect()
    }

    pub fn total_text_lines_count(&self) -> usize {
        *self.total_text_lines.get_or_init(|| {
            let options = HeightOptions {
                allow_last_block_tools_btn: true,
                ..Default::default()
            };
            self.text_block_lines(options).iter().sum()
        })
    }

    /// Line-equivalent of every placed block plus the article text.
    pub fn total_lines_count(&self) -> usize {
        *self.total_lines.get_or_init(|| {
            let cells: usize = self
                .columns
                .iter()
                .flat_map(|column| column.cells().iter())
                .map(|cell| cell.lines(&self.metrics))
                .sum();
            cells + self.total_text_lines_count()
        })
    }

    pub fn text_distribution(&self) -> &TextDistribution {
        self.text_distribution.get_or_init(|| {
            let min_height = self.metrics.min_text_height(MIN_TEXT_LINES);
            let free_lines = (0..self.colspan()).map(|index| {
                self.column(index).map_or(0, |view| {
                    view.find_all_positions(0.0, 1, min_height, true, self.metrics.columns_height)
                        .iter()
                        .map(|slot| self.metrics.whole_lines(slot.height))
                        .sum()
                })
            });
            TextDistribution::pour(free_lines, &self.text_block_lines(HeightOptions::default()))
        })
    }

    /// No free line is left without text.
    pub fn is_valid(&self) -> bool {
        self.text_distribution().is_valid()
    }
}

fn find_positions(
    columns: &[Rc<Column>],
    index: usize,
    metrics: &Metrics,
    instance: &BlockInstance,
    max_height: Option<f64>,
) -> Vec<Position> {
    ColumnView::new(columns, index, metrics)
        .map(|view| view.find_position(instance, max_height))
        .unwrap_or_default()
}

fn grow(columns: &mut Vec<Rc<Column>>, len: usize) {
    while columns.len() < len {
        columns.push(Rc::new(Column::new(columns.len())));
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
