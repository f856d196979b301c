//! Whole-workspace export and merge-on-import.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AiqError, Result};
use crate::history::Model;
use crate::pack::Pack;
use crate::workspace::Workspace;

/// Format version written into every export.
pub const BUNDLE_VERSION: &str = "4.2";

/// The document written by [`export_bundle`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle<'a> {
    pub models: &'a [Model],
    pub installed_packs: &'a [Pack],
    pub custom_packs: &'a [Pack],
    pub export_date: DateTime<Utc>,
    pub version: &'static str,
}

pub fn export_bundle(workspace: &Workspace, now: DateTime<Utc>) -> ExportBundle<'_> {
    ExportBundle {
        models: &workspace.models,
        installed_packs: &workspace.installed_packs,
        custom_packs: &workspace.custom_packs,
        export_date: now,
        version: BUNDLE_VERSION,
    }
}

/// A previously exported document, read back for merging.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBundle {
    pub models: Vec<Model>,
    #[serde(default)]
    pub installed_packs: Vec<Pack>,
    #[serde(default)]
    pub custom_packs: Vec<Pack>,
    #[serde(default)]
    pub export_date: Option<Value>,
    #[serde(default)]
    pub version: Option<Value>,
}

/// Parse an export document. `models` is mandatory; the pack lists are not.
pub fn parse_bundle(content: &str) -> Result<ImportBundle> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| AiqError::InvalidBundle(e.to_string()))?;
    if matches!(value.get("models"), None | Some(Value::Null)) {
        return Err(AiqError::InvalidBundle("missing `models`".into()));
    }
    serde_json::from_value(value).map_err(|e| AiqError::InvalidBundle(e.to_string()))
}

/// What [`merge_import`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub models_added: usize,
    pub models_extended: usize,
    pub records_added: usize,
    pub packs_added: usize,
}

/// Merge `incoming` into a copy of `current`.
///
/// Models are matched by name and their histories concatenated; unknown
/// models are appended. Packs are matched by id within each set and only
/// added when absent.
pub fn merge_import(current: &Workspace, incoming: ImportBundle) -> (Workspace, MergeStats) {
    let mut merged = current.clone();
    let mut stats = MergeStats::default();

    for model in incoming.models {
        stats.records_added += model.history.len();
        match merged.model_mut(&model.name) {
            Some(existing) => {
                existing.history.extend(model.history);
                stats.models_extended += 1;
            }
            None => {
                merged.models.push(model);
                stats.models_added += 1;
            }
        }
    }

    for (target, packs) in [
        (&mut merged.installed_packs, incoming.installed_packs),
        (&mut merged.custom_packs, incoming.custom_packs),
    ] {
        for pack in packs {
            if !target.iter().any(|p| p.id == pack.id) {
                target.push(pack);
                stats.packs_added += 1;
            }
        }
    }

    tracing::info!(
        models_added = stats.models_added,
        models_extended = stats.models_extended,
        records = stats.records_added,
        packs = stats.packs_added,
        "import merged"
    );
    (merged, stats)
}
