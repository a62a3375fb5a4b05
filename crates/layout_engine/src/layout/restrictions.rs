use crate::{
    block::{BlockInstance, Restriction},
    constants::MIN_TEXT_LINES,
    layout::column::{ColumnView, PositionRecord, Slot},
};

impl Restriction {
    /// Vetoes `slot` or returns it, possibly moved and shrunk to the block.
    pub(crate) fn apply(
        self,
        view: &ColumnView<'_>,
        instance: &BlockInstance,
        slot: Slot,
    ) -> Option<Slot> {
        match self {
            Restriction::Title => title(view, instance, slot),
            Restriction::Annotation => annotation(view, instance, slot),
            Restriction::Image => image(view, instance, slot),
            Restriction::PreserveOrder => preserve_order(view, instance, slot),
        }
    }
}

fn title(view: &ColumnView<'_>, instance: &BlockInstance, slot: Slot) -> Option<Slot> {
    (instance.height <= view.metrics().columns_height / 2.0).then_some(slot)
}

fn annotation(view: &ColumnView<'_>, instance: &BlockInstance, slot: Slot) -> Option<Slot> {
    let metrics = view.metrics();
    let text_height = metrics.columns_height - metrics.align_top(slot.top + instance.height);
    (text_height >= metrics.min_text_height(MIN_TEXT_LINES)).then_some(slot)
}

/// Pins the image to whatever it touches and keeps room for text next to it.
fn image(view: &ColumnView<'_>, instance: &BlockInstance, slot: Slot) -> Option<Slot> {
    let metrics = view.metrics();
    let line_height = metrics.line_height;
    let min_text = metrics.min_text_height(MIN_TEXT_LINES);
    let height = instance.height;
    let bottom = slot.top + slot.height;
    let touches_top = slot.top == 0.0;
    let touches_bottom = metrics.columns_height - bottom < line_height;

    let at_top = |top: f64| Slot { top, height };

    if touches_top && touches_bottom {
        let text_top = metrics.align_top(height);
        return (metrics.columns_height - text_top >= min_text).then_some(at_top(slot.top));
    }
    if !touches_top && !touches_bottom {
        // Between two blocks: centre it, there must be room for two of it
        if slot.height < height * 2.0 {
            return None;
        }
        let delta = ((slot.height - height) / 2.0).round();
        return Some(at_top(slot.top + delta));
    }

    let (before, after) = view.column().positions().split_at_key(slot.top);
    let above = before.last();
    let below = after.first();

    let keep_top = |text_top: f64, limit: f64| (limit - text_top >= min_text).then_some(at_top(slot.top));
    let push_down = || {
        let top = bottom - height;
        (top - metrics.align_top(slot.top) >= min_text).then_some(at_top(top))
    };
    let adjacent = |record: &PositionRecord, distance: f64| {
        distance < line_height && record.current_colspan >= instance.colspan
    };

    match (above, below) {
        (None, None) if touches_top => keep_top(metrics.align_top(slot.top + height), bottom),
        (None, None) => push_down(),
        (Some(above), None) => {
            if adjacent(above, slot.top - above.bottom()) {
                keep_top(
                    metrics.align_top(slot.top + height),
                    metrics.columns_height,
                )
            } else {
                push_down()
            }
        }
        (None, Some(below)) => {
            if adjacent(below, below.top - bottom) {
                let top = slot.height - height;
                (top >= min_text).then_some(at_top(top))
            } else {
                keep_top(metrics.align_top(height), slot.height)
            }
        }
        (Some(_), Some(_)) => None,
    }
}

/// Same-typed blocks must keep their reading order across the page.
fn preserve_order(view: &ColumnView<'_>, instance: &BlockInstance, slot: Slot) -> Option<Slot> {
    let idx = match instance.idx {
        None | Some(0) => return Some(slot),
        Some(idx) => idx,
    };

    let mut current = Some(*view);
    while let Some(column) = current {
        let is_origin = column.index() == view.index();
        let previous = column
            .column()
            .positions()
            .iter()
            .rev()
            .filter(|p| !(is_origin && p.top > slot.top))
            .find(|p| p.instance.kind == instance.kind);
        if let Some(previous) = previous {
            return previous
                .instance
                .idx
                .is_some_and(|other| other < idx)
                .then_some(slot);
        }
        current = column.prev();
    }
    None
}
