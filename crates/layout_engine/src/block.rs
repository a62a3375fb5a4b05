use crate::error::LayoutError;
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::{Map, Value};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// Named placement rule attached to a block instance.
///
/// Names are resolved when the instance is deserialized, so a misspelled
/// restriction fails the request instead of being ignored.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(try_from = "String", into = "&'static str")]
pub enum Restriction {
    Title,
    Annotation,
    Image,
    PreserveOrder,
}

impl TryFrom<String> for Restriction {
    type Error = LayoutError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse().map_err(|_| LayoutError::UnknownRestriction(name))
    }
}

/// Vertical strategy used by `Column::find_position`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Top,
    Bottom,
    Flow,
}

/// Horizontal strategy used by `Layout::add_block_instance`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Any,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub anchor: Anchor,
    pub side: Side,
    /// Branch on every accepted position instead of the first one
    pub arbitrary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstanceConfig {
    pub align_top: bool,
    pub align_bottom: bool,
    pub align_left: bool,
    pub align_right: bool,
    pub arbitrary: bool,
    /// Snap bottom-anchored blocks to the line grid
    pub align: bool,
    pub restrictions: Vec<Restriction>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InstanceConfig {
    pub fn placement(&self) -> Placement {
        let anchor = if self.align_top {
            Anchor::Top
        } else if self.align_bottom {
            Anchor::Bottom
        } else {
            Anchor::Flow
        };
        let side = if self.align_right {
            Side::Right
        } else if self.align_left {
            Side::Left
        } else {
            Side::Any
        };
        Placement {
            anchor,
            side,
            arbitrary: self.arbitrary,
        }
    }
}

fn default_colspan() -> usize {
    1
}

fn positive_colspan<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    match usize::deserialize(deserializer)? {
        0 => Err(D::Error::custom(LayoutError::InvalidRequest(
            "colspan must be at least 1".to_string(),
        ))),
        colspan => Ok(colspan),
    }
}

/// A unit of page content looking for a place: title, image, annotation, tools...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInstance {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_colspan", deserialize_with = "positive_colspan")]
    pub colspan: usize,
    pub height: f64,
    /// Snap flowing placements to the line grid
    #[serde(default)]
    pub align: bool,
    #[serde(default)]
    pub config: InstanceConfig,
    #[serde(default)]
    pub layout_config: Map<String, Value>,
    /// Position among the instances of the same type, used by `preserveOrder`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idx: Option<usize>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BlockInstance {
    pub fn new(kind: impl Into<String>, colspan: usize, height: f64) -> Self {
        Self {
            kind: kind.into(),
            colspan,
            height,
            align: false,
            config: InstanceConfig::default(),
            layout_config: Map::new(),
            idx: None,
            extra: Map::new(),
        }
    }

    pub fn with_config(mut self, config: InstanceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_restrictions(mut self, restrictions: impl IntoIterator<Item = Restriction>) -> Self {
        self.config.restrictions = restrictions.into_iter().collect();
        self
    }

    pub fn with_layout_config(mut self, key: &str, value: Value) -> Self {
        self.layout_config.insert(key.to_string(), value);
        self
    }

    pub fn with_idx(mut self, idx: usize) -> Self {
        self.idx = Some(idx);
        self
    }

    pub fn aligned(mut self) -> Self {
        self.align = true;
        self
    }

    pub fn placement(&self) -> Placement {
        self.config.placement()
    }
}
