//! Plain-data form of a layout, as posted back to the host.

use std::rc::Rc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{
    block::BlockInstance,
    error::{LayoutError, Result},
    layout::{
        column::{Cell, Column, PositionRecord},
        page::Layout,
        text::TextBlocksHeights,
    },
    metrics::Metrics,
    ordered::OrderedList,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    #[serde(rename = "_colspan")]
    pub colspan: usize,
    #[serde(rename = "_config", default, deserialize_with = "null_as_default")]
    pub config: Map<String, Value>,
    #[serde(rename = "_blockInstances", default, deserialize_with = "null_as_default")]
    pub block_instances: Vec<BlockInstance>,
    #[serde(rename = "_columns")]
    pub columns: Vec<ColumnSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnSnapshot {
    #[serde(rename = "_cells", default)]
    pub cells: Vec<CellSnapshot>,
    #[serde(rename = "_positions", default)]
    pub positions: Vec<PositionSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub top: f64,
    pub instance: BlockInstance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub top: f64,
    pub current_colspan: usize,
    pub instance: BlockInstance,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Layout {
    pub fn to_snapshot(&self) -> LayoutSnapshot {
        let columns = self
            .columns()
            .iter()
            .map(|column| ColumnSnapshot {
                cells: column
                    .cells()
                    .iter()
                    .map(|cell| CellSnapshot {
                        top: cell.top,
                        instance: BlockInstance::clone(&cell.instance),
                    })
                    .collect(),
                positions: column
                    .positions()
                    .iter()
                    .map(|position| PositionSnapshot {
                        top: position.top,
                        current_colspan: position.current_colspan,
                        instance: BlockInstance::clone(&position.instance),
                    })
                    .collect(),
            })
            .collect();

        LayoutSnapshot {
            colspan: self.colspan(),
            config: self.config().clone(),
            block_instances: self
                .block_instances()
                .iter()
                .map(|instance| BlockInstance::clone(instance))
                .collect(),
            columns,
        }
    }

    /// Rebuilds a layout from its snapshot so it can be rated or extended again.
    pub fn from_snapshot(
        snapshot: LayoutSnapshot,
        metrics: Metrics,
        text_heights: TextBlocksHeights,
    ) -> Result<Self> {
        if snapshot.colspan != snapshot.columns.len() {
            return Err(LayoutError::Snapshot(format!(
                "_colspan is {} but {} columns were sent",
                snapshot.colspan,
                snapshot.columns.len()
            )));
        }

        let mut columns = Vec::with_capacity(snapshot.columns.len());
        for (index, column) in snapshot.columns.into_iter().enumerate() {
            let cells: OrderedList<Cell> = column
                .cells
                .into_iter()
                .map(|cell| Cell {
                    instance: Rc::new(cell.instance),
                    top: cell.top,
                })
                .collect();
            let mut positions = OrderedList::new();
            for position in column.positions {
                if position.current_colspan == 0 || position.current_colspan > position.instance.colspan {
                    return Err(LayoutError::Snapshot(format!(
                        "column {index}: current_colspan {} does not fit a block of colspan {}",
                        position.current_colspan, position.instance.colspan
                    )));
                }
                positions.insert(PositionRecord {
                    top: position.top,
                    height: position.instance.height,
                    current_colspan: position.current_colspan,
                    instance: Rc::new(position.instance),
                });
            }
            columns.push(Rc::new(Column::from_parts(index, cells, positions)));
        }

        let block_instances = snapshot.block_instances.into_iter().map(Rc::new).collect();
        Ok(Layout::from_parts(columns, snapshot.config, block_instances, metrics)
            .with_text_heights(text_heights))
    }
}
