//! Tabular views over recorded history.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::history::TestRecord;
use crate::ordered::OrderedMap;
use crate::pack::TierName;
use crate::workspace::Workspace;

/// Header of one history column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordColumn {
    /// Position in the model's history, usable with `delete_test`.
    pub index: usize,
    pub pack_label: String,
    pub time: DateTime<Utc>,
    pub tier: TierName,
}

/// Rows are score keys in first-seen order; a missing cell is 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreMatrix<C> {
    pub columns: Vec<C>,
    pub rows: Vec<ScoreRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRow {
    pub key: String,
    pub cells: Vec<u32>,
}

fn rows<'a>(records: impl Iterator<Item = &'a TestRecord> + Clone) -> Vec<ScoreRow> {
    let mut keys: OrderedMap<()> = OrderedMap::new();
    for record in records.clone() {
        for key in record.scores.keys() {
            if !keys.contains_key(key) {
                keys.insert(key, ());
            }
        }
    }
    keys.into_iter()
        .map(|(key, ())| {
            let cells = records
                .clone()
                .map(|r| r.scores.get(&key).copied().unwrap_or(0))
                .collect();
            ScoreRow { key, cells }
        })
        .collect()
}

/// Every record of one model side by side. `None` for an unknown model.
pub fn history_matrix(workspace: &Workspace, model: &str) -> Option<ScoreMatrix<RecordColumn>> {
    let model = workspace.model(model)?;
    let columns = model
        .history
        .iter()
        .enumerate()
        .map(|(index, record)| RecordColumn {
            index,
            pack_label: workspace.pack_label(&record.pack_id),
            time: record.time,
            tier: record.tier,
        })
        .collect();
    Some(ScoreMatrix {
        columns,
        rows: rows(model.history.iter()),
    })
}

/// The latest record of every tested model side by side, one column per
/// model name.
pub fn cross_model_matrix(workspace: &Workspace) -> ScoreMatrix<String> {
    let tested: Vec<_> = workspace
        .tested_models()
        .filter_map(|m| m.latest().map(|r| (m.name.clone(), r)))
        .collect();
    ScoreMatrix {
        columns: tested.iter().map(|(name, _)| name.clone()).collect(),
        rows: rows(tested.iter().map(|(_, r)| *r)),
    }
}
