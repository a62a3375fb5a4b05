use std::{cmp::Ordering, rc::Rc};

use itertools::Itertools;
use serde::Serialize;

use crate::{
    constants::{IMAGE_TYPE, IMAGE_WEIGHT},
    layout::column::Column,
    metrics::Metrics,
};

/// Runs of fully empty columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Gaps {
    pub count: usize,
    pub avg_size: f64,
    pub above_avg_rate: f64,
    pub below_avg_rate: f64,
}

impl Gaps {
    pub fn measure<'a>(columns: impl IntoIterator<Item = &'a Column>) -> Self {
        let runs: Vec<usize> = columns
            .into_iter()
            .chunk_by(|column| column.is_empty())
            .into_iter()
            .filter_map(|(empty, run)| empty.then(|| run.count()))
            .collect();
        if runs.is_empty() {
            return Self::default();
        }

        let count = runs.len() as f64;
        let avg_size = runs.iter().sum::<usize>() as f64 / count;
        let above = runs.iter().filter(|&&size| size as f64 > avg_size).count();
        let below = runs.iter().filter(|&&size| (size as f64) < avg_size).count();
        Self {
            count: runs.len(),
            avg_size,
            above_avg_rate: above as f64 / count,
            below_avg_rate: below as f64 / count,
        }
    }
}

/// How well a layout fills its page. Only meaningful relative to another rating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub rate: f64,
    pub gaps: Gaps,
}

impl Rating {
    pub fn measure(columns: &[Rc<Column>], metrics: &Metrics) -> Self {
        let filled: f64 = columns
            .iter()
            .flat_map(|column| column.positions().iter())
            .map(|position| {
                if position.instance.kind == IMAGE_TYPE {
                    position.height * IMAGE_WEIGHT
                } else {
                    position.height
                }
            })
            .sum();
        let capacity = metrics.columns_height * columns.len() as f64;
        let rate = if capacity > 0.0 { filled / capacity } else { 0.0 };
        Self {
            rate,
            gaps: Gaps::measure(columns.iter().map(AsRef::as_ref)),
        }
    }

    /// `Greater` when `self` is the better page.
    ///
    /// Title types only take part when both sides carry one. Equal ratings
    /// are left to the caller's tie breaker.
    pub fn compare(&self, other: &Self, title_types: (Option<f64>, Option<f64>)) -> Ordering {
        let by_title = match title_types {
            (Some(mine), Some(theirs)) => mine.total_cmp(&theirs),
            _ => Ordering::Equal,
        };
        self.rate
            .total_cmp(&other.rate)
            .then(by_title)
            .then(other.gaps.count.cmp(&self.gaps.count))
            .then(other.gaps.avg_size.total_cmp(&self.gaps.avg_size))
            .then(other.gaps.above_avg_rate.total_cmp(&self.gaps.above_avg_rate))
            .then(other.gaps.below_avg_rate.total_cmp(&self.gaps.below_avg_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockInstance;

    fn column(index: usize, heights: &[(&str, f64)]) -> Rc<Column> {
        let mut column = Column::new(index);
        let mut top = 0.0;
        for (kind, height) in heights {
            let instance = Rc::new(BlockInstance::new(*kind, 1, *height));
            column.push_cell(Rc::clone(&instance), top);
            column.push_position(top, 1, instance);
            top += height;
        }
        Rc::new(column)
    }

    #[test]
    fn test_rate_weights_images() {
        let metrics = Metrics::new(1000.0, 20.0, 50).unwrap();
        let columns = vec![
            column(0, &[("title", 200.0), ("image", 300.0)]),
            column(1, &[]),
        ];
        let rating = Rating::measure(&columns, &metrics);
        assert!((rating.rate - (200.0 + 330.0) / 2000.0).abs() < 1e-9);
        assert_eq!(rating.gaps.count, 1);
    }

    #[test]
    fn test_gap_runs() {
        let columns = [
            column(0, &[]),
            column(1, &[]),
            column(2, &[("title", 100.0)]),
            column(3, &[]),
            column(4, &[("image", 100.0)]),
            column(5, &[]),
            column(6, &[]),
            column(7, &[]),
        ];
        let gaps = Gaps::measure(columns.iter().map(AsRef::as_ref));
        assert_eq!(gaps.count, 3);
        assert_eq!(gaps.avg_size, 2.0);
        assert!((gaps.above_avg_rate - 1.0 / 3.0).abs() < 1e-9);
        assert!((gaps.below_avg_rate - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_empty_columns_means_no_gaps() {
        let columns = [column(0, &[("title", 100.0)])];
        assert_eq!(Gaps::measure(columns.iter().map(AsRef::as_ref)), Gaps::default());
    }

    #[test]
    fn test_compare_order() {
        let full = Rating {
            rate: 0.8,
            gaps: Gaps::default(),
        };
        let sparse = Rating {
            rate: 0.5,
            gaps: Gaps::default(),
        };
        assert_eq!(full.compare(&sparse, (None, None)), Ordering::Greater);
        assert_eq!(sparse.compare(&full, (Some(9.0), Some(1.0))), Ordering::Less);

        // Title type only counts when both layouts have one
        assert_eq!(full.compare(&full, (Some(2.0), Some(1.0))), Ordering::Greater);
        assert_eq!(full.compare(&full, (Some(2.0), None)), Ordering::Equal);

        let one_gap = Rating {
            rate: 0.5,
            gaps: Gaps {
                count: 1,
                avg_size: 1.0,
                ..Default::default()
            },
        };
        let two_gaps = Rating {
            rate: 0.5,
            gaps: Gaps {
                count: 2,
                avg_size: 1.0,
                ..Default::default()
            },
        };
        assert_eq!(one_gap.compare(&two_gaps, (None, None)), Ordering::Greater);

        let wide_gap = Rating {
            rate: 0.5,
            gaps: Gaps {
                count: 1,
                avg_size: 3.0,
                ..Default::default()
            },
        };
        assert_eq!(one_gap.compare(&wide_gap, (None, None)), Ordering::Greater);
    }
}
