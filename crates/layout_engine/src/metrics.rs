use crate::error::{LayoutError, Result};
use serde::{Deserialize, Serialize};

/// Text view geometry a build runs against.
///
/// Every `Layout` carries a copy and hands it to its columns, so two builds
/// never share mutable rendering state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub columns_height: f64,
    pub line_height: f64,
    pub lines_per_column: usize,
}

impl Metrics {
    pub fn new(columns_height: f64, line_height: f64, lines_per_column: usize) -> Result<Self> {
        if !(columns_height > 0.0) {
            return Err(LayoutError::InvalidMetrics(format!(
                "columnsHeight must be positive, got {columns_height}"
            )));
        }
        if !(line_height > 0.0) {
            return Err(LayoutError::InvalidMetrics(format!(
                "lineHeight must be positive, got {line_height}"
            )));
        }
        Ok(Self {
            columns_height,
            line_height,
            lines_per_column,
        })
    }

    /// Derives `lines_per_column` from the two heights.
    pub fn from_heights(columns_height: f64, line_height: f64) -> Result<Self> {
        let metrics = Self::new(columns_height, line_height, 0)?;
        Ok(Self {
            lines_per_column: metrics.whole_lines(columns_height),
            ..metrics
        })
    }

    /// Snaps `top` down the page to the next line boundary.
    pub fn align_top(&self, top: f64) -> f64 {
        let delta = top % self.line_height;
        if delta != 0.0 {
            top + self.line_height - delta
        } else {
            top
        }
    }

    /// Line-equivalent of a block placed at `top` spanning `colspan` columns.
    pub fn lines_count(&self, top: f64, height: f64, colspan: usize) -> usize {
        let lines = ((top + height - self.align_top(top)) / self.line_height).ceil();
        colspan * lines.max(0.0) as usize
    }

    /// Number of full text lines fitting in `height`.
    pub fn whole_lines(&self, height: f64) -> usize {
        (height / self.line_height).floor().max(0.0) as usize
    }

    pub fn min_text_height(&self, lines: usize) -> f64 {
        self.line_height * lines as f64
    }
}

/// Partial metrics as sent by the host; merged over the previous request's values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines_per_column: Option<usize>,
}

impl MetricsUpdate {
    pub fn merged(self, update: MetricsUpdate) -> Self {
        Self {
            columns_height: update.columns_height.or(self.columns_height),
            line_height: update.line_height.or(self.line_height),
            lines_per_column: update.lines_per_column.or(self.lines_per_column),
        }
    }

    pub fn resolve(&self) -> Result<Metrics> {
        let columns_height = self
            .columns_height
            .ok_or_else(|| LayoutError::InvalidMetrics("columnsHeight is missing".to_string()))?;
        let line_height = self
            .line_height
            .ok_or_else(|| LayoutError::InvalidMetrics("lineHeight is missing".to_string()))?;
        match self.lines_per_column {
            Some(lines) => Metrics::new(columns_height, line_height, lines),
            None => Metrics::from_heights(columns_height, line_height),
        }
    }
}

impl From<Metrics> for MetricsUpdate {
    fn from(metrics: Metrics) -> Self {
        Self {
            columns_height: Some(metrics.columns_height),
            line_height: Some(metrics.line_height),
            lines_per_column: Some(metrics.lines_per_column),
        }
    }
}
