//! Tree search over block placements.
//!
//! The meta tree says which block types a template holds and how they nest.
//! The instance map lists the size variants of each type. The search tries
//! every variant of a type on every layout reached so far ("wide") and then
//! moves on to the child types ("deep"), keeping the leaves the evaluation
//! accepts. Nothing here knows about columns: any [`BlockLayout`] will do.

use std::{
    collections::HashMap,
    rc::Rc,
    time::{Duration, Instant},
};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    block::BlockInstance,
    error::{LayoutError, Result},
    layout::Layout,
};

/// A partial page the search can branch on.
pub trait BlockLayout: Clone {
    type Instance;

    /// Every layout obtained by adding `instance`. Empty when it does not fit.
    fn add_block_instance(&self, instance: &Self::Instance, expand: bool) -> Vec<Self>;

    fn block_count(&self) -> usize;
}

impl BlockLayout for Layout {
    type Instance = Rc<BlockInstance>;

    fn add_block_instance(&self, instance: &Rc<BlockInstance>, expand: bool) -> Vec<Self> {
        Layout::add_block_instance(self, instance, expand, None)
    }

    fn block_count(&self) -> usize {
        self.block_instances().len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaNode {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub root: bool,
    /// Required: skipping this type does not complete a layout
    #[serde(default)]
    pub imperative: bool,
    /// `None` marks a leaf
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<MetaChild>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaChild {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutQuality {
    pub mark: f64,
    pub valid: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SearchStats {
    /// Layouts created, the source layout included
    pub produced: usize,
    pub accepted: usize,
    pub elapsed: Duration,
}

type Evaluate<'a, L> = Box<dyn Fn(&L) -> LayoutQuality + 'a>;
type Sufficient<'a, L> = Box<dyn Fn(&[L]) -> bool + 'a>;
type Pick<'a, L> = Box<dyn FnMut(L, L) -> L + 'a>;

pub struct LayoutBuilder<'a, L: BlockLayout> {
    evaluate: Evaluate<'a, L>,
    sufficient: Sufficient<'a, L>,
    pick: Pick<'a, L>,
    allow_expand: bool,
    stats: SearchStats,
}

struct SearchState<'s, L: BlockLayout> {
    meta_info: &'s [MetaNode],
    instance_map: &'s HashMap<String, Vec<L::Instance>>,
    built: Vec<L>,
    produced: usize,
}

impl<'s, L: BlockLayout> SearchState<'s, L> {
    fn meta(&self, kind: &str) -> Result<&'s MetaNode> {
        self.meta_info
            .iter()
            .find(|meta| meta.kind == kind)
            .ok_or_else(|| LayoutError::MetaNotFound {
                kind: kind.to_string(),
            })
    }
}

impl<'a, L: BlockLayout + 'a> Default for LayoutBuilder<'a, L> {
    fn default() -> Self {
        Self {
            evaluate: Box::new(|layout: &L| LayoutQuality {
                mark: layout.block_count() as f64,
                valid: true,
            }),
            sufficient: Box::new(|built: &[L]| !built.is_empty()),
            pick: Box::new(|first: L, _: L| first),
            allow_expand: false,
            stats: SearchStats::default(),
        }
    }
}

impl<'a, L: BlockLayout + 'a> LayoutBuilder<'a, L> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(mut self, evaluate: impl Fn(&L) -> LayoutQuality + 'a) -> Self {
        self.evaluate = Box::new(evaluate);
        self
    }

    /// Stops the search once the accepted layouts are good enough.
    pub fn sufficient(mut self, sufficient: impl Fn(&[L]) -> bool + 'a) -> Self {
        self.sufficient = Box::new(sufficient);
        self
    }

    pub fn pick(mut self, pick: impl FnMut(L, L) -> L + 'a) -> Self {
        self.pick = Box::new(pick);
        self
    }

    pub fn allow_expand(mut self, allow_expand: bool) -> Self {
        self.allow_expand = allow_expand;
        self
    }

    /// Statistics of the last build
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// Best layout reachable from `source`, or `None`.
    ///
    /// Configuration errors abort the search and are logged, never returned.
    pub fn build_layout(
        &mut self,
        meta_info: &[MetaNode],
        instance_map: &HashMap<String, Vec<L::Instance>>,
        source: L,
    ) -> Option<L> {
        match self.try_build_layout(meta_info, instance_map, source) {
            Ok(layout) => layout,
            Err(e) => {
                warn!("Layout search aborted: {e}");
                None
            }
        }
    }

    pub fn try_build_layout(
        &mut self,
        meta_info: &[MetaNode],
        instance_map: &HashMap<String, Vec<L::Instance>>,
        source: L,
    ) -> Result<Option<L>> {
        let started = Instant::now();
        let root = meta_info
            .iter()
            .find(|meta| meta.root)
            .ok_or(LayoutError::MissingRootMeta)?;

        let mut state = SearchState {
            meta_info,
            instance_map,
            built: Vec::new(),
            produced: 1,
        };
        let outcome = self.go_wide(&mut state, &source, root);

        self.stats = SearchStats {
            produced: state.produced,
            accepted: state.built.len(),
            elapsed: started.elapsed(),
        };
        debug!(
            "Search finished: {} layouts produced, {} accepted in {:?}",
            self.stats.produced, self.stats.accepted, self.stats.elapsed
        );
        outcome?;

        let mut built = state.built.into_iter();
        let Some(first) = built.next() else {
            return Ok(None);
        };
        Ok(Some(built.fold(first, |best, next| (self.pick)(best, next))))
    }

    /// Tries every variant of `meta`'s type, then skipping it when allowed.
    /// Returns whether the search should stop.
    fn go_wide(&self, state: &mut SearchState<'_, L>, layout: &L, meta: &MetaNode) -> Result<bool> {
        let instance_map = state.instance_map;
        let instances = instance_map
            .get(&meta.kind)
            .ok_or_else(|| LayoutError::MissingInstances {
                kind: meta.kind.clone(),
            })?;

        for instance in instances {
            let children = layout.add_block_instance(instance, self.allow_expand);
            state.produced += children.len();
            for child in &children {
                if self.go_deep(state, child, meta)? {
                    return Ok(true);
                }
            }
        }

        if !meta.imperative {
            return self.go_deep(state, layout, meta);
        }
        Ok(false)
    }

    /// Evaluates a leaf or descends into the child types of `meta`.
    fn go_deep(&self, state: &mut SearchState<'_, L>, layout: &L, meta: &MetaNode) -> Result<bool> {
        let Some(children) = &meta.children else {
            let quality = (self.evaluate)(layout);
            if quality.valid {
                debug!(
                    "Accepted layout #{} ({} blocks, mark {:.3})",
                    state.built.len() + 1,
                    layout.block_count(),
                    quality.mark
                );
                state.built.push(layout.clone());
            }
            return Ok((self.sufficient)(&state.built));
        };

        for child in children {
            let child_meta = state.meta(&child.kind)?;
            if self.go_wide(state, layout, child_meta)? {
                return Ok(true);
            }
        }
        Ok((self.sufficient)(&state.built))
    }
}
