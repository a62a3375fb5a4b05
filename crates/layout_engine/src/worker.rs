use std::{collections::HashMap, rc::Rc};

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    block::BlockInstance,
    config::EngineConfig,
    constants::{KEY_COLSPAN, KEY_TEXT_BLOCKS_HEIGHTS},
    error::{LayoutError, Result},
    layout::{Layout, LayoutSnapshot, TextBlocksHeights},
    metrics::MetricsUpdate,
    search::{LayoutBuilder, LayoutQuality, MetaNode},
    tie_break::TieBreaker,
};

/// Parameters of one `buildLayout` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequest {
    pub meta_info: Vec<MetaNode>,
    pub instance_map: HashMap<String, Vec<BlockInstance>>,
    pub config: Map<String, Value>,
    #[serde(default)]
    pub text_view_metrics: MetricsUpdate,
}

/// Hosts the engine between requests.
///
/// Metrics are merged over the previous request's values, so the host may
/// send only what changed.
#[derive(Debug)]
pub struct LayoutWorker {
    metrics: MetricsUpdate,
    config: EngineConfig,
    tie_breaker: TieBreaker,
}

impl LayoutWorker {
    pub fn new(config: EngineConfig) -> Self {
        let tie_breaker = TieBreaker::from_mode(config.search.tie_break, config.search.seed);
        Self {
            metrics: MetricsUpdate::default(),
            config,
            tie_breaker,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &MetricsUpdate {
        &self.metrics
    }

    /// Replaces the engine configuration for subsequent builds.
    pub fn reset_config(&mut self, config: EngineConfig) -> Result<()> {
        config.validate()?;
        self.tie_breaker = TieBreaker::from_mode(config.search.tie_break, config.search.seed);
        self.config = config;
        Ok(())
    }

    /// Best layout for the request, `None` when no placement is valid.
    pub fn build(&mut self, request: BuildRequest) -> Result<Option<Layout>> {
        let BuildRequest {
            meta_info,
            instance_map,
            mut config,
            text_view_metrics,
        } = request;

        let merged = self.metrics.merged(text_view_metrics);
        let metrics = merged.resolve()?;
        self.metrics = merged;

        let colspan = config
            .get(KEY_COLSPAN)
            .and_then(Value::as_u64)
            .filter(|&colspan| colspan > 0)
            .ok_or_else(|| {
                LayoutError::InvalidRequest("config.colspan must be a positive integer".to_string())
            })? as usize;
        let heights = config
            .remove(KEY_TEXT_BLOCKS_HEIGHTS)
            .map(TextBlocksHeights::from_value)
            .transpose()?
            .unwrap_or_default();

        let source = Layout::new(colspan, metrics)
            .with_config(&config)
            .with_text_heights(heights);
        let instance_map: HashMap<String, Vec<Rc<BlockInstance>>> = instance_map
            .into_iter()
            .map(|(kind, instances)| (kind, instances.into_iter().map(Rc::new).collect()))
            .collect();

        let search = &self.config.search;
        let stop_after = search.stop_after;
        let tie_breaker = &mut self.tie_breaker;
        let mut builder = LayoutBuilder::new()
            .allow_expand(search.allow_expand)
            .evaluate(|layout: &Layout| LayoutQuality {
                mark: layout.rate(),
                valid: layout.is_valid() || layout.colspan() == 1,
            })
            .sufficient(move |built: &[Layout]| stop_after.is_some_and(|limit| built.len() >= limit))
            .pick(|first, second| Layout::pick(first, second, tie_breaker));

        let best = builder.build_layout(&meta_info, &instance_map, source);
        let stats = *builder.stats();
        info!(
            "Built layout for {} columns: {} candidates, {} accepted, {} in {:?}",
            colspan,
            stats.produced,
            stats.accepted,
            if best.is_some() { "found" } else { "none" },
            stats.elapsed
        );
        Ok(best)
    }

    /// Same as [`LayoutWorker::build`], serialized for the host.
    pub fn build_layout(&mut self, request: BuildRequest) -> Result<Option<LayoutSnapshot>> {
        Ok(self.build(request)?.map(|layout| layout.to_snapshot()))
    }
}

impl Default for LayoutWorker {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
