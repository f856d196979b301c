//! The current model/pack/tier selection and the `analyze` pipeline.
//!
//! Nothing here is global: the caller owns a [`Session`] and a
//! [`Workspace`] and passes both in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AiqError, Result};
use crate::history::TestRecord;
use crate::pack::{Pack, Tier, TierName};
use crate::parser::parse_response;
use crate::scoring;
use crate::statistics::ScoreMap;
use crate::store::KvStore;
use crate::workspace::Workspace;

pub const CURRENT_MODEL_KEY: &str = "aiqx_current_model";
pub const CURRENT_PACK_KEY: &str = "aiqx_current_pack";
pub const CURRENT_TIER_KEY: &str = "aiqx_current_tier";

/// Explicit selection context for an analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub model: Option<String>,
    /// Id of the selected pack.
    pub pack: Option<String>,
    pub tier: TierName,
}

impl Session {
    /// Restore the saved selection, repairing it against `workspace`.
    ///
    /// A saved model that no longer exists falls back to the first model. A
    /// saved pack that no longer resolves leaves no pack selected; when no
    /// pack was ever saved the first installed pack is picked.
    pub fn load(store: &dyn KvStore, workspace: &Workspace) -> Result<Self> {
        let saved_model = store.get(CURRENT_MODEL_KEY).map_err(AiqError::Storage)?;
        let model = saved_model
            .filter(|name| workspace.model(name).is_some())
            .or_else(|| workspace.models.first().map(|m| m.name.clone()));

        let saved_pack = store.get(CURRENT_PACK_KEY).map_err(AiqError::Storage)?;
        let pack = match saved_pack.filter(|id| !id.is_empty()) {
            Some(id) => workspace.find_pack(&id).map(|p| p.id.clone()),
            None => workspace.installed_packs.first().map(|p| p.id.clone()),
        };

        let tier = store
            .get(CURRENT_TIER_KEY)
            .map_err(AiqError::Storage)?
            .and_then(|t| t.parse().ok())
            .unwrap_or_default();

        Ok(Self { model, pack, tier })
    }

    pub fn save(&self, store: &dyn KvStore) -> Result<()> {
        let write = |key: &str, value: Option<&str>| match value {
            Some(v) => store.set(key, v),
            None => store.remove(key),
        };
        write(CURRENT_MODEL_KEY, self.model.as_deref()).map_err(AiqError::Storage)?;
        write(CURRENT_PACK_KEY, self.pack.as_deref()).map_err(AiqError::Storage)?;
        store
            .set(CURRENT_TIER_KEY, self.tier.as_str())
            .map_err(AiqError::Storage)
    }

    /// Follow a model rename.
    pub fn model_renamed(&mut self, old: &str, new: &str) {
        if self.model.as_deref() == Some(old) {
            self.model = Some(new.to_string());
        }
    }

    /// After a model is deleted, select the first remaining one.
    pub fn model_deleted(&mut self, name: &str, workspace: &Workspace) {
        if self.model.as_deref() == Some(name) {
            self.model = workspace.models.first().map(|m| m.name.clone());
        }
    }

    /// Clear the pack selection if it pointed at the deleted pack and no
    /// installed pack with the same id remains.
    pub fn pack_deleted(&mut self, id: &str, workspace: &Workspace) {
        if self.pack.as_deref() == Some(id) && workspace.find_pack(id).is_none() {
            self.pack = None;
        }
    }

    /// The selected pack and tier, or why there is no usable selection.
    pub fn resolve<'w>(&self, workspace: &'w Workspace) -> Result<(&'w Pack, &'w Tier)> {
        let id = self
            .pack
            .as_deref()
            .ok_or_else(|| AiqError::NoValidSelection("no test pack selected".into()))?;
        let pack = workspace
            .find_pack(id)
            .ok_or_else(|| AiqError::NoValidSelection(format!("pack {id} is not installed")))?;
        let tier = pack
            .tier(self.tier)
            .filter(|tier| tier.question_count > 0)
            .ok_or_else(|| {
                AiqError::NoValidSelection(format!("pack {id} has no {} tier", self.tier))
            })?;
        Ok((pack, tier))
    }

    /// Prompt text of the selected tier.
    pub fn prompt<'w>(&self, workspace: &'w Workspace) -> Result<&'w str> {
        let (_, tier) = self.resolve(workspace)?;
        Ok(&tier.prompt)
    }
}

/// Parse `response` against `tier` and score every section with `pack`'s
/// parameters. Pure: nothing is recorded.
pub fn score_response(pack: &Pack, tier: &Tier, response: &str) -> Result<ScoreMap> {
    let sections = parse_response(response, &tier.expected_domains)?;
    Ok(sections
        .iter()
        .map(|(domain, text)| (domain, scoring::score(domain, text, &pack.scoring_params)))
        .collect())
}

/// Score a pasted response for the session's selection and append the
/// result to the selected model's history.
///
/// Every check runs before the workspace is touched, so on error no record
/// is appended.
pub fn analyze(
    workspace: &mut Workspace,
    session: &Session,
    response: &str,
    now: DateTime<Utc>,
) -> Result<TestRecord> {
    let model = session
        .model
        .as_deref()
        .filter(|name| workspace.model(name).is_some())
        .ok_or_else(|| AiqError::NoValidSelection("no model selected".into()))?;
    let (pack, tier) = session.resolve(workspace)?;

    let response = response.trim();
    if response.is_empty() {
        return Err(AiqError::EmptyResponse);
    }

    let scores = score_response(pack, tier, response)?;
    let record = TestRecord {
        pack_id: pack.id.clone(),
        tier: session.tier,
        time: now,
        scores,
    };
    workspace.append_record(model, record.clone())?;
    tracing::info!(
        model,
        pack = %record.pack_id,
        tier = %record.tier,
        overall = record.overall(),
        "analysis recorded"
    );
    Ok(record)
}
