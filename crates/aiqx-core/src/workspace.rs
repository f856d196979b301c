//! The pack catalogs and model registry.
//!
//! A [`Workspace`] is the single in-memory owner of every pack and model.
//! Each mutating method validates first and only then touches state, so an
//! error always leaves the workspace as it was.

use serde::{Deserialize, Serialize};

use crate::error::{AiqError, Result};
use crate::history::{Model, TestRecord};
use crate::pack::Pack;
use crate::store::{self, KvStore};

/// Storage key for the model list.
pub const MODELS_KEY: &str = "aiqx_models_v4";
/// Storage key for the installed pack set.
pub const INSTALLED_PACKS_KEY: &str = "aiqx_installed_packs";
/// Storage key for the custom pack set.
pub const CUSTOM_PACKS_KEY: &str = "aiqx_custom_packs";

/// What to do when an imported pack's id is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnConflict {
    #[default]
    Keep,
    Replace,
}

/// Result of [`Workspace::import_pack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportOutcome {
    Added,
    Replaced,
    Skipped,
}

impl std::fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ImportOutcome::Added => "added",
            ImportOutcome::Replaced => "replaced",
            ImportOutcome::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Which of the two pack sets a pack lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackOrigin {
    Installed,
    Custom,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    #[serde(default)]
    pub models: Vec<Model>,
    #[serde(default)]
    pub installed_packs: Vec<Pack>,
    #[serde(default)]
    pub custom_packs: Vec<Pack>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    // -- models ------------------------------------------------------------

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn model_mut(&mut self, name: &str) -> Option<&mut Model> {
        self.models.iter_mut().find(|m| m.name == name)
    }

    /// Models with at least one record, in registry order.
    pub fn tested_models(&self) -> impl Iterator<Item = &Model> {
        self.models.iter().filter(|m| m.is_tested())
    }

    /// Register a new model. Returns the trimmed name it was stored under.
    pub fn add_model(&mut self, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AiqError::InvalidModelName);
        }
        if self.model(name).is_some() {
            return Err(AiqError::ModelExists(name.to_string()));
        }
        self.models.push(Model::new(name));
        tracing::info!(model = name, "model added");
        Ok(name.to_string())
    }

    /// Rename a model in place, keeping its history.
    ///
    /// Returns `Ok(false)` when the trimmed new name equals the old one.
    pub fn rename_model(&mut self, old: &str, new: &str) -> Result<bool> {
        let new = new.trim();
        if new.is_empty() {
            return Err(AiqError::InvalidModelName);
        }
        if self.model(old).is_none() {
            return Err(AiqError::UnknownModel(old.to_string()));
        }
        if new == old {
            return Ok(false);
        }
        if self.model(new).is_some() {
            return Err(AiqError::ModelExists(new.to_string()));
        }
        if let Some(model) = self.model_mut(old) {
            model.name = new.to_string();
        }
        tracing::info!(from = old, to = new, "model renamed");
        Ok(true)
    }

    /// Remove a model together with its whole history.
    pub fn delete_model(&mut self, name: &str) -> Result<Model> {
        let idx = self
            .models
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| AiqError::UnknownModel(name.to_string()))?;
        let model = self.models.remove(idx);
        tracing::info!(model = name, records = model.history.len(), "model deleted");
        Ok(model)
    }

    /// Append a record to a model's history.
    pub fn append_record(&mut self, model: &str, record: TestRecord) -> Result<()> {
        let target = self
            .model_mut(model)
            .ok_or_else(|| AiqError::UnknownModel(model.to_string()))?;
        target.history.push(record);
        tracing::debug!(model, records = target.history.len(), "record appended");
        Ok(())
    }

    /// Remove exactly one record by its position in the history.
    pub fn delete_test(&mut self, model: &str, index: usize) -> Result<TestRecord> {
        let target = self
            .model_mut(model)
            .ok_or_else(|| AiqError::UnknownModel(model.to_string()))?;
        let len = target.history.len();
        if index >= len {
            return Err(AiqError::TestIndexOutOfRange {
                model: model.to_string(),
                index,
                len,
            });
        }
        Ok(target.history.remove(index))
    }

    // -- packs -------------------------------------------------------------

    /// Look a pack up by id. Custom packs shadow installed ones.
    pub fn find_pack(&self, id: &str) -> Option<&Pack> {
        self.find_pack_with_origin(id).map(|(pack, _)| pack)
    }

    pub fn find_pack_with_origin(&self, id: &str) -> Option<(&Pack, PackOrigin)> {
        if let Some(pack) = self.custom_packs.iter().find(|p| p.id == id) {
            return Some((pack, PackOrigin::Custom));
        }
        self.installed_packs
            .iter()
            .find(|p| p.id == id)
            .map(|p| (p, PackOrigin::Installed))
    }

    /// Every pack, custom first.
    pub fn all_packs(&self) -> impl Iterator<Item = (&Pack, PackOrigin)> {
        self.custom_packs
            .iter()
            .map(|p| (p, PackOrigin::Custom))
            .chain(self.installed_packs.iter().map(|p| (p, PackOrigin::Installed)))
    }

    /// Add a pack to the custom set.
    ///
    /// On an id collision the existing pack is either kept or replaced at the
    /// same position.
    pub fn import_pack(&mut self, pack: Pack, on_conflict: OnConflict) -> ImportOutcome {
        let outcome = upsert(&mut self.custom_packs, pack, on_conflict);
        tracing::debug!(%outcome, "custom pack import");
        outcome
    }

    /// Add a pack to the installed set. Existing ids are left alone.
    pub fn install_pack(&mut self, pack: Pack) -> ImportOutcome {
        upsert(&mut self.installed_packs, pack, OnConflict::Keep)
    }

    /// Delete a custom pack. Installed packs cannot be deleted.
    pub fn delete_custom_pack(&mut self, id: &str) -> Result<Pack> {
        match self.custom_packs.iter().position(|p| p.id == id) {
            Some(idx) => {
                let pack = self.custom_packs.remove(idx);
                tracing::info!(pack = id, "custom pack deleted");
                Ok(pack)
            }
            None if self.installed_packs.iter().any(|p| p.id == id) => {
                Err(AiqError::PackNotCustom(id.to_string()))
            }
            None => Err(AiqError::UnknownPack(id.to_string())),
        }
    }

    // -- display -----------------------------------------------------------

    /// Human-readable name for a domain id.
    ///
    /// `preferred` (usually the selected pack) is consulted first, then every
    /// custom and installed pack's domain list. Unknown ids are title-cased.
    pub fn display_name(&self, domain_id: &str, preferred: Option<&Pack>) -> String {
        preferred
            .into_iter()
            .chain(self.custom_packs.iter())
            .chain(self.installed_packs.iter())
            .find_map(|p| p.domain_name(domain_id))
            .map(str::to_string)
            .unwrap_or_else(|| title_case(domain_id))
    }

    /// Column label for a record's pack: its name cut to 20 characters, or
    /// the bare id when the pack no longer exists.
    pub fn pack_label(&self, pack_id: &str) -> String {
        match self.find_pack(pack_id) {
            Some(pack) => pack.name.chars().take(20).collect(),
            None => pack_id.to_string(),
        }
    }

    // -- persistence -------------------------------------------------------

    pub fn load(store: &dyn KvStore) -> Result<Self> {
        Ok(Self {
            models: store::read_json(store, MODELS_KEY)?.unwrap_or_default(),
            installed_packs: store::read_json(store, INSTALLED_PACKS_KEY)?.unwrap_or_default(),
            custom_packs: store::read_json(store, CUSTOM_PACKS_KEY)?.unwrap_or_default(),
        })
    }

    pub fn save(&self, store: &dyn KvStore) -> Result<()> {
        store::write_json(store, MODELS_KEY, &self.models)?;
        store::write_json(store, INSTALLED_PACKS_KEY, &self.installed_packs)?;
        store::write_json(store, CUSTOM_PACKS_KEY, &self.custom_packs)?;
        Ok(())
    }
}

fn upsert(packs: &mut Vec<Pack>, pack: Pack, on_conflict: OnConflict) -> ImportOutcome {
    match packs.iter().position(|p| p.id == pack.id) {
        None => {
            packs.push(pack);
            ImportOutcome::Added
        }
        Some(_) if on_conflict == OnConflict::Keep => ImportOutcome::Skipped,
        Some(idx) => {
            packs[idx] = pack;
            ImportOutcome::Replaced
        }
    }
}

/// `"tone_match"` → `"Tone Match"`. Only ASCII letters are upper-cased.
pub fn title_case(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    let mut prev_is_word = false;
    for c in id.chars() {
        let c = if c == '_' { ' ' } else { c };
        let is_word = c.is_ascii_alphanumeric();
        if is_word && !prev_is_word {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
        prev_is_word = is_word;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::normalize_pack;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn pack(id: &str, name: &str) -> Pack {
        normalize_pack(json!({
            "id": id,
            "version": "1",
            "name": name,
            "domains": [{"id": "logic", "name": format!("{name} Logic")}],
            "tiers": {"basic": {"prompt": "[[logic]]", "questionCount": 1}}
        }))
        .unwrap()
    }

    #[test]
    fn add_model_trims_and_rejects_duplicates() {
        let mut ws = Workspace::new();
        assert_eq!(ws.add_model("  gpt-4  ").unwrap(), "gpt-4");
        assert!(matches!(ws.add_model("gpt-4"), Err(AiqError::ModelExists(_))));
        assert!(matches!(ws.add_model("   "), Err(AiqError::InvalidModelName)));
        assert_eq!(ws.models.len(), 1);
    }

    #[test]
    fn rename_model_rules() {
        let mut ws = Workspace::new();
        ws.add_model("a").unwrap();
        ws.add_model("b").unwrap();
        assert!(!ws.rename_model("a", " a ").unwrap());
        assert!(matches!(ws.rename_model("a", "b"), Err(AiqError::ModelExists(_))));
        assert!(matches!(ws.rename_model("zz", "c"), Err(AiqError::UnknownModel(_))));
        assert!(ws.rename_model("a", " c ").unwrap());
        assert_eq!(ws.models[0].name, "c");
    }

    #[test]
    fn delete_test_by_index() {
        let mut ws = Workspace::new();
        ws.add_model("m").unwrap();
        for pack_id in ["p0", "p1", "p2"] {
            ws.append_record(
                "m",
                TestRecord {
                    pack_id: pack_id.into(),
                    tier: Default::default(),
                    time: chrono::Utc::now(),
                    scores: Default::default(),
                },
            )
            .unwrap();
        }
        let removed = ws.delete_test("m", 1).unwrap();
        assert_eq!(removed.pack_id, "p1");
        let left: Vec<_> = ws.model("m").unwrap().history.iter().map(|r| r.pack_id.as_str()).collect();
        assert_eq!(left, vec!["p0", "p2"]);
        assert!(matches!(
            ws.delete_test("m", 2),
            Err(AiqError::TestIndexOutOfRange { index: 2, len: 2, .. })
        ));
    }

    #[test]
    fn import_conflicts() {
        let mut ws = Workspace::new();
        assert_eq!(ws.import_pack(pack("a", "First"), OnConflict::Keep), ImportOutcome::Added);
        ws.import_pack(pack("b", "Second"), OnConflict::Keep);
        assert_eq!(ws.import_pack(pack("a", "Again"), OnConflict::Keep), ImportOutcome::Skipped);
        assert_eq!(ws.find_pack("a").unwrap().name, "First");
        assert_eq!(ws.import_pack(pack("a", "Again"), OnConflict::Replace), ImportOutcome::Replaced);
        assert_eq!(ws.custom_packs[0].name, "Again");
        assert_eq!(ws.custom_packs.len(), 2);
    }

    #[test]
    fn custom_shadows_installed_and_only_custom_deletes() {
        let mut ws = Workspace::new();
        ws.install_pack(pack("core", "Installed"));
        ws.import_pack(pack("core", "Custom"), OnConflict::Keep);
        let (found, origin) = ws.find_pack_with_origin("core").unwrap();
        assert_eq!(found.name, "Custom");
        assert_eq!(origin, PackOrigin::Custom);

        ws.delete_custom_pack("core").unwrap();
        assert_eq!(ws.find_pack("core").unwrap().name, "Installed");
        assert!(matches!(ws.delete_custom_pack("core"), Err(AiqError::PackNotCustom(_))));
        assert!(matches!(ws.delete_custom_pack("nope"), Err(AiqError::UnknownPack(_))));
    }

    #[test]
    fn display_names() {
        let mut ws = Workspace::new();
        ws.install_pack(pack("i", "Installed"));
        ws.import_pack(pack("c", "Custom"), OnConflict::Keep);
        assert_eq!(ws.display_name("logic", None), "Custom Logic");
        let preferred = pack("x", "Preferred");
        assert_eq!(ws.display_name("logic", Some(&preferred)), "Preferred Logic");
        assert_eq!(ws.display_name("tone_match", None), "Tone Match");
        assert_eq!(ws.display_name("2fa-flow", None), "2fa-Flow");
    }

    #[test]
    fn pack_labels() {
        let mut ws = Workspace::new();
        ws.install_pack(pack("long", "An Exceptionally Long Pack Name"));
        assert_eq!(ws.pack_label("long"), "An Exceptionally Lon");
        assert_eq!(ws.pack_label("gone"), "gone");
    }

    #[test]
    fn save_and_load_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(Workspace::load(&store).unwrap(), Workspace::new());

        let mut ws = Workspace::new();
        ws.add_model("m").unwrap();
        ws.install_pack(pack("core", "Core"));
        ws.save(&store).unwrap();
        assert_eq!(Workspace::load(&store).unwrap(), ws);
    }
}
