//! Models under test and their append-only result history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pack::TierName;
use crate::scoring::ScoreBand;
use crate::statistics::{mean, round_half_up, ScoreMap};

/// One completed evaluation of a model against a pack tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    /// Id of the pack that was used. Not guaranteed to still resolve.
    pub pack_id: String,
    pub tier: TierName,
    /// When the analysis ran, stored as epoch milliseconds.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub time: DateTime<Utc>,
    /// Score per parsed section id, in the order the sections were parsed.
    pub scores: ScoreMap,
}

impl TestRecord {
    /// Rounded mean of the raw section scores, 0 when there are none.
    pub fn overall(&self) -> u32 {
        mean(self.scores.values().copied())
            .map(|avg| round_half_up(avg) as u32)
            .unwrap_or(0)
    }
}

/// A named subject under test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    #[serde(default)]
    pub history: Vec<TestRecord>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            history: Vec::new(),
        }
    }

    /// The most recently appended record.
    pub fn latest(&self) -> Option<&TestRecord> {
        self.history.last()
    }

    pub fn is_tested(&self) -> bool {
        !self.history.is_empty()
    }
}

/// Snapshot of a model's latest result, as shown after an analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestSummary {
    pub model: String,
    pub pack_id: String,
    pub tier: TierName,
    pub time: DateTime<Utc>,
    pub overall: u32,
    pub band: ScoreBand,
    pub scores: ScoreMap,
}

impl LatestSummary {
    /// `None` when the model has never been tested.
    pub fn of(model: &Model) -> Option<Self> {
        let latest = model.latest()?;
        let overall = latest.overall();
        Some(Self {
            model: model.name.clone(),
            pack_id: latest.pack_id.clone(),
            tier: latest.tier,
            time: latest.time,
            overall,
            band: ScoreBand::of(overall),
            scores: latest.scores.clone(),
        })
    }
}
