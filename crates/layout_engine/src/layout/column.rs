use std::rc::Rc;

use crate::{
    block::{Anchor, BlockInstance},
    metrics::Metrics,
    ordered::{Keyed, OrderedList},
};

/// A placed block, owned by the column it starts in
#[derive(Debug, Clone)]
pub struct Cell {
    pub instance: Rc<BlockInstance>,
    pub top: f64,
}

impl Cell {
    pub fn lines(&self, metrics: &Metrics) -> usize {
        metrics.lines_count(self.top, self.instance.height, self.instance.colspan)
    }
}

impl Keyed for Cell {
    fn key(&self) -> f64 {
        self.top
    }
}

/// Vertical space reserved in a column by a block starting here or to the left.
#[derive(Debug, Clone)]
pub struct PositionRecord {
    pub top: f64,
    pub height: f64,
    /// Columns the block still covers from this one, always <= its colspan
    pub current_colspan: usize,
    pub instance: Rc<BlockInstance>,
}

impl PositionRecord {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

impl Keyed for PositionRecord {
    fn key(&self) -> f64 {
        self.top
    }
}

/// Free vertical window found by the scanners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot {
    pub top: f64,
    pub height: f64,
}

/// Accepted placement. Top-anchored placements leave `height` open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub top: f64,
    pub height: Option<f64>,
}

impl From<Slot> for Position {
    fn from(slot: Slot) -> Self {
        Self {
            top: slot.top,
            height: Some(slot.height),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Column {
    index: usize,
    cells: OrderedList<Cell>,
    positions: OrderedList<PositionRecord>,
}

impl Column {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    pub(crate) fn from_parts(
        index: usize,
        cells: OrderedList<Cell>,
        positions: OrderedList<PositionRecord>,
    ) -> Self {
        Self {
            index,
            cells,
            positions,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn cells(&self) -> &OrderedList<Cell> {
        &self.cells
    }

    pub fn positions(&self) -> &OrderedList<PositionRecord> {
        &self.positions
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Bottom edge of the lowest reserved position
    pub fn height(&self) -> f64 {
        self.positions.last().map_or(0.0, PositionRecord::bottom)
    }

    pub(crate) fn push_cell(&mut self, instance: Rc<BlockInstance>, top: f64) {
        self.cells.insert(Cell { instance, top });
    }

    pub(crate) fn push_position(
        &mut self,
        top: f64,
        current_colspan: usize,
        instance: Rc<BlockInstance>,
    ) {
        let height = instance.height;
        self.positions.insert(PositionRecord {
            top,
            height,
            current_colspan,
            instance,
        });
    }
}

/// A column seen from its layout: it can reach its neighbours and the metrics.
#[derive(Debug, Clone, Copy)]
pub struct ColumnView<'a> {
    columns: &'a [Rc<Column>],
    index: usize,
    metrics: &'a Metrics,
}

impl<'a> ColumnView<'a> {
    pub fn new(columns: &'a [Rc<Column>], index: usize, metrics: &'a Metrics) -> Option<Self> {
        (index < columns.len()).then_some(Self {
            columns,
            index,
            metrics,
        })
    }

    pub fn column(&self) -> &'a Column {
        &self.columns[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn metrics(&self) -> &'a Metrics {
        self.metrics
    }

    pub fn next(&self) -> Option<Self> {
        Self::new(self.columns, self.index + 1, self.metrics)
    }

    pub fn prev(&self) -> Option<Self> {
        let index = self.index.checked_sub(1)?;
        Self::new(self.columns, index, self.metrics)
    }

    /// Where `instance` may go in this column and the ones it spans to the right.
    ///
    /// Returns at most one position unless the instance asks for arbitrary
    /// placement. An empty result means the block does not fit here.
    pub fn find_position(&self, instance: &BlockInstance, max_height: Option<f64>) -> Vec<Position> {
        let metrics = self.metrics;
        let max_height = max_height.unwrap_or(metrics.columns_height);
        let colspan = instance.colspan;
        let height = instance.height;
        let placement = instance.placement();

        match placement.anchor {
            Anchor::Top => {
                if self.check_position(0.0, colspan, height, max_height) {
                    vec![Position {
                        top: 0.0,
                        height: None,
                    }]
                } else {
                    Vec::new()
                }
            }
            Anchor::Bottom => {
                let mut top = metrics.columns_height - height;
                if instance.config.align {
                    let delta = metrics.columns_height % metrics.line_height;
                    if delta != 0.0 {
                        top -= delta;
                    }
                }
                if self.check_position(top, colspan, height, max_height) {
                    vec![Position {
                        top,
                        height: Some(height),
                    }]
                } else {
                    Vec::new()
                }
            }
            Anchor::Flow => {
                let slots = self.find_all_positions(0.0, colspan, height, instance.align, max_height);
                if !slots.is_empty() {
                    let mut accepted = Vec::new();
                    for slot in slots {
                        if let Some(slot) = self.apply_restrictions(instance, slot) {
                            if !placement.arbitrary {
                                return vec![slot.into()];
                            }
                            accepted.push(slot.into());
                        }
                    }
                    return accepted;
                }
                self.find_first_position(0.0, colspan, height, instance.align, max_height)
                    .and_then(|slot| self.apply_restrictions(instance, slot))
                    .map(Position::from)
                    .into_iter()
                    .collect()
            }
        }
    }

    fn apply_restrictions(&self, instance: &BlockInstance, slot: Slot) -> Option<Slot> {
        instance
            .config
            .restrictions
            .iter()
            .try_fold(slot, |slot, restriction| restriction.apply(self, instance, slot))
    }

    /// First free window from `top` downward, free across all `colspan` columns.
    pub fn find_first_position(
        &self,
        top: f64,
        colspan: usize,
        height: f64,
        align: bool,
        max_height: f64,
    ) -> Option<Slot> {
        let mut scan = Scan::start(self, top, colspan, height, align, max_height)?;
        for record in self.column().positions() {
            match scan.visit(record) {
                Visit::Skip => {}
                Visit::Found(slot) => return Some(slot),
                Visit::Stop => break,
            }
        }
        scan.tail()
    }

    /// Every free window from `top` downward, free across all `colspan` columns.
    pub fn find_all_positions(
        &self,
        top: f64,
        colspan: usize,
        height: f64,
        align: bool,
        max_height: f64,
    ) -> Vec<Slot> {
        let Some(mut scan) = Scan::start(self, top, colspan, height, align, max_height) else {
            return Vec::new();
        };
        let mut slots = Vec::new();
        for record in self.column().positions() {
            match scan.visit(record) {
                Visit::Skip => {}
                Visit::Found(slot) => {
                    slots.push(slot);
                    scan.pass(record);
                }
                Visit::Stop => break,
            }
        }
        slots.extend(scan.tail());
        slots
    }

    /// Whether `[top, top + height)` is free here and in the next `colspan - 1` columns.
    pub fn check_position(&self, top: f64, colspan: usize, height: f64, max_height: f64) -> bool {
        if colspan == 0 || top < 0.0 || top + height > max_height {
            return false;
        }
        let next = self.next();
        if colspan > 1 && next.is_none() {
            return false;
        }
        let bottom = top + height;
        let free = self
            .column()
            .positions()
            .iter()
            .all(|record| record.bottom() <= top || record.top >= bottom);
        if !free {
            return false;
        }
        match next {
            Some(next) if colspan > 1 => next.check_position(top, colspan - 1, height, max_height),
            _ => true,
        }
    }
}

enum Visit {
    Skip,
    Found(Slot),
    Stop,
}

/// Cursor shared by the two position scanners.
///
/// Walks a column's records top to bottom. A gap above the next record is a
/// candidate once the columns to the right confirm the same window is free.
struct Scan<'v, 'a> {
    view: &'v ColumnView<'a>,
    next: Option<ColumnView<'a>>,
    top: f64,
    colspan: usize,
    height: f64,
    align: bool,
    max_height: f64,
    confirmed: bool,
    last_height: f64,
}

impl<'v, 'a> Scan<'v, 'a> {
    fn start(
        view: &'v ColumnView<'a>,
        top: f64,
        colspan: usize,
        height: f64,
        align: bool,
        max_height: f64,
    ) -> Option<Self> {
        let top = if align { view.metrics.align_top(top) } else { top };
        if colspan == 0 || top + height > max_height {
            return None;
        }
        let next = view.next();
        if colspan > 1 && next.is_none() {
            return None;
        }
        Some(Self {
            view,
            next,
            top,
            colspan,
            height,
            align,
            max_height,
            confirmed: colspan == 1,
            last_height: f64::MAX,
        })
    }

    fn confirm_right(&self) -> Option<Slot> {
        self.next?.find_first_position(
            self.top,
            self.colspan - 1,
            self.height,
            self.align,
            self.max_height,
        )
    }

    fn visit(&mut self, record: &PositionRecord) -> Visit {
        if self.top >= record.bottom() {
            return Visit::Skip;
        }
        if self.top + self.height <= record.top {
            if self.confirmed {
                return Visit::Found(Slot {
                    top: self.top,
                    height: self.last_height.min(record.top - self.top),
                });
            }
            let Some(right) = self.confirm_right() else {
                return Visit::Stop;
            };
            self.top = right.top;
            if self.top + self.height <= record.top {
                return Visit::Found(Slot {
                    top: self.top,
                    height: right.height.min(record.top - self.top),
                });
            }
            if self.top >= record.bottom() {
                self.confirmed = true;
                self.last_height = right.height;
                return Visit::Skip;
            }
        }
        self.pass(record);
        Visit::Skip
    }

    /// Moves the cursor below `record`.
    fn pass(&mut self, record: &PositionRecord) {
        self.top = record.bottom();
        if self.align {
            self.top = self.view.metrics.align_top(self.top);
        }
        self.confirmed = self.colspan == 1;
        self.last_height = f64::MAX;
    }

    /// Window between the last record and the bottom of the column.
    fn tail(&self) -> Option<Slot> {
        if self.top < 0.0 || self.top + self.height > self.max_height {
            return None;
        }
        if self.colspan == 1 {
            return Some(Slot {
                top: self.top,
                height: self.max_height - self.top,
            });
        }
        let right = self.confirm_right()?;
        let top = if self.align {
            self.view.metrics.align_top(right.top)
        } else {
            right.top
        };
        Some(Slot {
            top,
            height: right.height.min(self.max_height - top),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::InstanceConfig;

    fn metrics() -> Metrics {
        Metrics::new(1000.0, 20.0, 50).unwrap()
    }

    fn columns(count: usize) -> Vec<Rc<Column>> {
        (0..count).map(|i| Rc::new(Column::new(i))).collect()
    }

    fn place(columns: &mut [Rc<Column>], index: usize, top: f64, instance: BlockInstance) {
        let instance = Rc::new(instance);
        Rc::make_mut(&mut columns[index]).push_cell(Rc::clone(&instance), top);
        for (offset, current) in (1..=instance.colspan).rev().enumerate() {
            if let Some(column) = columns.get_mut(index + offset) {
                Rc::make_mut(column).push_position(top, current, Rc::clone(&instance));
            }
        }
    }

    fn top_aligned(kind: &str, colspan: usize, height: f64) -> BlockInstance {
        BlockInstance::new(kind, colspan, height).with_config(InstanceConfig {
            align_top: true,
            ..Default::default()
        })
    }

    #[test]
    fn test_align_top_in_empty_column() {
        let m = metrics();
        let cols = columns(1);
        let view = ColumnView::new(&cols, 0, &m).unwrap();

        let found = view.find_position(&top_aligned("title", 1, 200.0), None);
        assert_eq!(
            found,
            vec![Position {
                top: 0.0,
                height: None
            }]
        );
    }

    #[test]
    fn test_first_position_after_top_block() {
        let m = metrics();
        let mut cols = columns(1);
        place(&mut cols, 0, 0.0, top_aligned("title", 1, 200.0));

        let view = ColumnView::new(&cols, 0, &m).unwrap();
        assert_eq!(view.column().positions().len(), 1);
        assert_eq!(view.column().positions().as_slice()[0].height, 200.0);

        let slot = view.find_first_position(0.0, 1, 300.0, false, m.columns_height);
        assert_eq!(
            slot,
            Some(Slot {
                top: 200.0,
                height: 800.0
            })
        );
    }

    #[test]
    fn test_align_top_rejected_when_occupied() {
        let m = metrics();
        let mut cols = columns(2);
        place(&mut cols, 1, 0.0, BlockInstance::new("image", 1, 100.0));

        let view = ColumnView::new(&cols, 0, &m).unwrap();
        assert!(view.find_position(&top_aligned("title", 1, 200.0), None).len() == 1);
        // Spanning into the occupied column fails
        assert!(view.find_position(&top_aligned("title", 2, 200.0), None).is_empty());
    }

    #[test]
    fn test_align_bottom_snaps_to_line_grid() {
        let m = Metrics::new(1010.0, 20.0, 50).unwrap();
        let cols = columns(1);
        let view = ColumnView::new(&cols, 0, &m).unwrap();

        let mut config = InstanceConfig {
            align_bottom: true,
            ..Default::default()
        };
        let plain = BlockInstance::new("tools", 1, 100.0).with_config(config.clone());
        assert_eq!(view.find_position(&plain, None)[0].top, 910.0);

        config.align = true;
        let snapped = BlockInstance::new("tools", 1, 100.0).with_config(config);
        assert_eq!(view.find_position(&snapped, None)[0].top, 900.0);
    }

    #[test]
    fn test_multi_column_window_must_be_free_everywhere() {
        let m = metrics();
        let mut cols = columns(2);
        place(&mut cols, 1, 0.0, BlockInstance::new("image", 1, 300.0));

        let view = ColumnView::new(&cols, 0, &m).unwrap();
        let slot = view.find_first_position(0.0, 2, 100.0, false, m.columns_height);
        assert_eq!(
            slot,
            Some(Slot {
                top: 300.0,
                height: 700.0
            })
        );
    }

    #[test]
    fn test_multi_column_needs_neighbour() {
        let m = metrics();
        let cols = columns(2);
        let view = ColumnView::new(&cols, 1, &m).unwrap();
        assert!(view.find_first_position(0.0, 2, 100.0, false, 1000.0).is_none());
        assert!(!view.check_position(0.0, 2, 100.0, 1000.0));
    }

    #[test]
    fn test_zero_colspan_has_no_position() {
        let m = metrics();
        let cols = columns(2);
        let view = ColumnView::new(&cols, 0, &m).unwrap();

        assert!(view.find_position(&BlockInstance::new("image", 0, 500.0), None).is_empty());
        assert!(view.find_position(&top_aligned("title", 0, 200.0), None).is_empty());
        assert!(view.find_all_positions(0.0, 0, 100.0, false, 1000.0).is_empty());
        assert!(!view.check_position(0.0, 0, 100.0, 1000.0));
    }

    #[test]
    fn test_find_all_positions_lists_every_gap() {
        let m = metrics();
        let mut cols = columns(1);
        place(&mut cols, 0, 100.0, BlockInstance::new("image", 1, 100.0));
        place(&mut cols, 0, 500.0, BlockInstance::new("image", 1, 100.0));

        let view = ColumnView::new(&cols, 0, &m).unwrap();
        let slots = view.find_all_positions(0.0, 1, 50.0, false, m.columns_height);
        assert_eq!(
            slots,
            vec![
                Slot {
                    top: 0.0,
                    height: 100.0
                },
                Slot {
                    top: 200.0,
                    height: 300.0
                },
                Slot {
                    top: 600.0,
                    height: 400.0
                },
            ]
        );
    }

    #[test]
    fn test_find_all_positions_with_alignment() {
        let m = metrics();
        let mut cols = columns(1);
        place(&mut cols, 0, 0.0, BlockInstance::new("title", 1, 130.0));

        let view = ColumnView::new(&cols, 0, &m).unwrap();
        let slots = view.find_all_positions(0.0, 1, 60.0, true, m.columns_height);
        assert_eq!(
            slots,
            vec![Slot {
                top: 140.0,
                height: 860.0
            }]
        );

        let image = BlockInstance::new("image", 1, 60.0);
        assert_eq!(view.find_position(&image, None)[0].top, 130.0);
        assert_eq!(
            view.find_position(&image.aligned(), None),
            vec![Position {
                top: 140.0,
                height: Some(860.0)
            }]
        );
    }

    #[test]
    fn test_too_tall_block_has_no_position() {
        let m = metrics();
        let cols = columns(1);
        let view = ColumnView::new(&cols, 0, &m).unwrap();
        assert!(view.find_position(&BlockInstance::new("image", 1, 1200.0), None).is_empty());
    }

    #[test]
    fn test_arbitrary_returns_every_accepted_position() {
        let m = metrics();
        let mut cols = columns(1);
        place(&mut cols, 0, 400.0, BlockInstance::new("image", 1, 100.0));
        let view = ColumnView::new(&cols, 0, &m).unwrap();

        let first_fit = BlockInstance::new("annotation", 1, 100.0);
        assert_eq!(view.find_position(&first_fit, None).len(), 1);

        let arbitrary = BlockInstance::new("annotation", 1, 100.0).with_config(InstanceConfig {
            arbitrary: true,
            ..Default::default()
        });
        let found = view.find_position(&arbitrary, None);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].top, 0.0);
        assert_eq!(found[1].top, 500.0);
    }

    #[test]
    fn test_column_height_follows_lowest_position() {
        let mut cols = columns(1);
        assert_eq!(cols[0].height(), 0.0);
        place(&mut cols, 0, 300.0, BlockInstance::new("image", 1, 100.0));
        place(&mut cols, 0, 0.0, BlockInstance::new("title", 1, 100.0));
        assert_eq!(cols[0].height(), 400.0);
        assert_eq!(cols[0].cells().first().map(|c| c.top), Some(0.0));
    }
}
