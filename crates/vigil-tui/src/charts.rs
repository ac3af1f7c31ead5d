//! Chart surface — prepared chart models with single-owner binding.
//!
//! Renderers never read wire data directly. Each render pass binds a
//! prepared [`ChartModel`] to a slot on the [`ChartSurface`]; rebinding a
//! slot drops the previous model, so a slot never holds two generations
//! of the same chart. Slots without fresh data keep their last model and
//! render from it, which is what lets charts survive partial snapshots.

use std::collections::HashMap;

use vigil_core::{PlatformCount, SentimentStats, Timeline};

/// Identifies one chart slot on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    /// Interactions per platform (bar chart).
    PlatformDistribution,
    /// Interactions over time (connected line).
    Timeline,
    /// Positive / neutral / negative split (gauge row).
    Sentiment,
}

/// Render-ready chart data: parallel labels and values.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartModel {
    pub labels: Vec<String>,
    pub values: Vec<u64>,
}

impl ChartModel {
    pub fn max_value(&self) -> u64 {
        self.values.iter().copied().max().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.values.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Builds the distribution model from per-platform counts.
pub fn distribution_model(stats: &[PlatformCount]) -> ChartModel {
    ChartModel {
        labels: stats.iter().map(|s| s.platform.clone()).collect(),
        values: stats.iter().map(|s| s.count).collect(),
    }
}

/// Builds the timeline model. `labels` and `interactions` are zipped;
/// a length mismatch drops the unpaired tail rather than erroring.
pub fn timeline_model(timeline: &Timeline) -> ChartModel {
    let len = timeline.labels.len().min(timeline.interactions.len());
    ChartModel {
        labels: timeline.labels[..len].to_vec(),
        values: timeline.interactions[..len].to_vec(),
    }
}

/// Builds the fixed three-category sentiment model.
pub fn sentiment_model(stats: &SentimentStats) -> ChartModel {
    ChartModel {
        labels: vec!["positive".into(), "neutral".into(), "negative".into()],
        values: vec![stats.positive, stats.neutral, stats.negative],
    }
}

/// Owns the bound chart models, one per slot.
#[derive(Debug, Default)]
pub struct ChartSurface {
    slots: HashMap<ChartKind, ChartModel>,
}

impl ChartSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a model to a slot. An existing model in that slot is dropped.
    pub fn bind(&mut self, kind: ChartKind, model: ChartModel) {
        self.slots.insert(kind, model);
    }

    /// The model currently bound to a slot, if any.
    pub fn get(&self, kind: ChartKind) -> Option<&ChartModel> {
        self.slots.get(&kind)
    }

    /// Drop the model bound to a slot. Returns whether one was bound.
    #[allow(dead_code)]
    pub fn destroy(&mut self, kind: ChartKind) -> bool {
        self.slots.remove(&kind).is_some()
    }

    /// Drop every bound model.
    #[allow(dead_code)]
    pub fn destroy_all(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rebinding_replaces_the_previous_model() {
        let mut surface = ChartSurface::new();
        surface.bind(
            ChartKind::Timeline,
            ChartModel {
                labels: vec!["a".into()],
                values: vec![1],
            },
        );
        surface.bind(
            ChartKind::Timeline,
            ChartModel {
                labels: vec!["b".into()],
                values: vec![2],
            },
        );

        let bound = surface.get(ChartKind::Timeline).expect("bound");
        assert_eq!(bound.labels, vec!["b".to_owned()]);
        // Other slots are independent.
        assert!(surface.get(ChartKind::Sentiment).is_none());
    }

    #[test]
    fn destroy_empties_only_one_slot() {
        let mut surface = ChartSurface::new();
        surface.bind(
            ChartKind::PlatformDistribution,
            distribution_model(&[PlatformCount {
                platform: "telegram".into(),
                count: 9,
            }]),
        );
        surface.bind(ChartKind::Sentiment, sentiment_model(&SentimentStats::default()));

        assert!(surface.destroy(ChartKind::PlatformDistribution));
        assert!(!surface.destroy(ChartKind::PlatformDistribution));
        assert!(surface.get(ChartKind::Sentiment).is_some());
    }

    #[test]
    fn timeline_mismatch_drops_the_unpaired_tail() {
        let timeline = Timeline {
            labels: vec!["mon".into(), "tue".into(), "wed".into()],
            interactions: vec![4, 7],
        };
        let model = timeline_model(&timeline);
        assert_eq!(model.labels.len(), 2);
        assert_eq!(model.values, vec![4, 7]);
    }

    #[test]
    fn sentiment_model_is_always_three_categories() {
        let model = sentiment_model(&SentimentStats {
            positive: 10,
            neutral: 0,
            negative: 3,
        });
        assert_eq!(model.labels.len(), 3);
        assert_eq!(model.total(), 13);
        assert_eq!(model.max_value(), 10);
    }
}
