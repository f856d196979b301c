//! Pack schema and defaulting.
//!
//! A pack document is accepted from a file, an in-memory JSON value, or a
//! remote catalog. Every path goes through [`normalize_pack`] (or the
//! equivalent `Deserialize` impl, which routes through the same checks), so a
//! [`Pack`] value always carries an id, a version, tiers, and an explicit
//! expected-domain list for each tier. Fields this crate does not know about
//! are kept in `extra` and written back out unchanged.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AiqError, Result};
use crate::parser::marker_regex;

/// Base score used when a pack (or a scorer call) does not specify one.
pub const DEFAULT_BASE_SCORE: i64 = 30;
/// Per-hedge-term bonus used when none is specified.
pub const DEFAULT_HEDGE_BONUS: i64 = 3;
/// Per-absolute-term adjustment used when none is specified.
pub const DEFAULT_ABSOLUTE_PENALTY: i64 = -5;

/// One difficulty level of a pack.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TierName {
    #[default]
    Basic,
    Advanced,
    Expert,
}

impl TierName {
    pub const ALL: [TierName; 3] = [TierName::Basic, TierName::Advanced, TierName::Expert];

    pub fn as_str(&self) -> &'static str {
        match self {
            TierName::Basic => "basic",
            TierName::Advanced => "advanced",
            TierName::Expert => "expert",
        }
    }
}

impl fmt::Display for TierName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TierName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(TierName::Basic),
            "advanced" => Ok(TierName::Advanced),
            "expert" => Ok(TierName::Expert),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}

/// Display metadata for a domain. Not used by scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Cumulative bonus granted once the answer reaches `threshold` characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthBonus {
    pub threshold: i64,
    pub bonus: i64,
}

/// Tunables for the heuristic scorer.
///
/// The numeric fields are optional so that a partial object from a pack
/// document survives a round trip; the accessors fall back to the built-in
/// defaults at call time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hedge_bonus: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_penalty: Option<i64>,
    #[serde(default)]
    pub length_bonuses: Vec<LengthBonus>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScoringParams {
    /// A params object with nothing set. Scoring with it uses the fallback
    /// constants and grants no length bonuses.
    pub fn unset() -> Self {
        Self {
            base_score: None,
            hedge_bonus: None,
            absolute_penalty: None,
            length_bonuses: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn base_score(&self) -> i64 {
        self.base_score.unwrap_or(DEFAULT_BASE_SCORE)
    }

    pub fn hedge_bonus(&self) -> i64 {
        self.hedge_bonus.unwrap_or(DEFAULT_HEDGE_BONUS)
    }

    pub fn absolute_penalty(&self) -> i64 {
        self.absolute_penalty.unwrap_or(DEFAULT_ABSOLUTE_PENALTY)
    }
}

impl Default for ScoringParams {
    /// The parameters assigned to a pack that declares none.
    fn default() -> Self {
        Self {
            base_score: Some(DEFAULT_BASE_SCORE),
            hedge_bonus: Some(DEFAULT_HEDGE_BONUS),
            absolute_penalty: Some(DEFAULT_ABSOLUTE_PENALTY),
            length_bonuses: vec![
                LengthBonus {
                    threshold: 150,
                    bonus: 15,
                },
                LengthBonus {
                    threshold: 300,
                    bonus: 10,
                },
            ],
            extra: Map::new(),
        }
    }
}

/// A single difficulty level: the prompt sent to the model and the domain
/// markers its answer is expected to contain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier {
    pub prompt: String,
    pub question_count: u32,
    pub expected_domains: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The tiers a pack defines. Unknown tier keys are carried in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Tiers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic: Option<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced: Option<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expert: Option<Tier>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Tiers {
    pub fn get(&self, name: TierName) -> Option<&Tier> {
        match name {
            TierName::Basic => self.basic.as_ref(),
            TierName::Advanced => self.advanced.as_ref(),
            TierName::Expert => self.expert.as_ref(),
        }
    }

    /// Present tiers in basic → advanced → expert order.
    pub fn iter(&self) -> impl Iterator<Item = (TierName, &Tier)> {
        TierName::ALL
            .into_iter()
            .filter_map(move |name| self.get(name).map(|tier| (name, tier)))
    }
}

/// A normalized assessment pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawPack")]
pub struct Pack {
    pub id: String,
    pub version: String,
    pub name: String,
    pub author: String,
    pub description: String,
    pub difficulty: String,
    pub tags: Vec<String>,
    pub domains: Vec<DomainInfo>,
    pub tiers: Tiers,
    pub scoring_params: ScoringParams,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Pack {
    pub fn tier(&self, name: TierName) -> Option<&Tier> {
        self.tiers.get(name)
    }

    /// Sum of `questionCount` across the tiers the pack defines.
    pub fn total_questions(&self) -> u32 {
        self.tiers.iter().map(|(_, t)| t.question_count).sum()
    }

    /// Display name declared for `domain_id` in this pack's domain list.
    pub fn domain_name(&self, domain_id: &str) -> Option<&str> {
        self.domains
            .iter()
            .find(|d| d.id == domain_id)
            .map(|d| d.name.as_str())
    }

    /// File name used when exporting this pack on its own.
    pub fn export_file_name(&self) -> String {
        format!("{}-v{}.json", self.id, self.version)
    }
}

// ---------------------------------------------------------------------------
// Raw (pre-validation) document shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPack {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    domains: Option<Vec<DomainInfo>>,
    #[serde(default)]
    tiers: Option<RawTiers>,
    #[serde(default)]
    scoring_params: Option<ScoringParams>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawTiers {
    #[serde(default)]
    basic: Option<RawTier>,
    #[serde(default)]
    advanced: Option<RawTier>,
    #[serde(default)]
    expert: Option<RawTier>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTier {
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    question_count: Option<u32>,
    #[serde(default)]
    expected_domains: Option<Vec<String>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Treat missing, null and empty strings alike.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn normalize_tier(name: TierName, raw: RawTier) -> Tier {
    let prompt = raw.prompt.unwrap_or_default();
    let expected_domains = match raw.expected_domains {
        Some(domains) => domains,
        None => {
            let derived = extract_domains_from_prompt(&prompt);
            tracing::debug!(tier = %name, count = derived.len(), "derived expected domains from prompt");
            derived
        }
    };
    Tier {
        prompt,
        question_count: raw.question_count.unwrap_or(0),
        expected_domains,
        extra: raw.extra,
    }
}

impl TryFrom<RawPack> for Pack {
    type Error = AiqError;

    fn try_from(raw: RawPack) -> Result<Self> {
        let id = present(raw.id)
            .ok_or_else(|| AiqError::InvalidPackFormat("missing `id`".into()))?;
        let version = present(raw.version).ok_or_else(|| {
            AiqError::InvalidPackFormat(format!("pack {id}: missing `version`"))
        })?;
        let raw_tiers = raw
            .tiers
            .ok_or_else(|| AiqError::InvalidPackFormat(format!("pack {id}: missing `tiers`")))?;

        let name = present(raw.name).unwrap_or_else(|| format!("Unnamed Pack ({id})"));
        let author = present(raw.author).unwrap_or_else(|| "Unknown".to_string());
        let description =
            present(raw.description).unwrap_or_else(|| "No description provided".to_string());
        let difficulty = present(raw.difficulty).unwrap_or_else(|| "baseline".to_string());

        let tiers = Tiers {
            basic: raw_tiers
                .basic
                .map(|t| normalize_tier(TierName::Basic, t)),
            advanced: raw_tiers
                .advanced
                .map(|t| normalize_tier(TierName::Advanced, t)),
            expert: raw_tiers
                .expert
                .map(|t| normalize_tier(TierName::Expert, t)),
            extra: raw_tiers.extra,
        };

        Ok(Pack {
            id,
            version,
            name,
            author,
            description,
            difficulty,
            tags: raw.tags.unwrap_or_default(),
            domains: raw.domains.unwrap_or_default(),
            tiers,
            scoring_params: raw.scoring_params.unwrap_or_default(),
            extra: raw.extra,
        })
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Validate and default an externally supplied pack document.
///
/// Fails with [`AiqError::InvalidPackFormat`] when `id`, `version` or `tiers`
/// is absent, or when a known field has the wrong type.
pub fn normalize_pack(raw: Value) -> Result<Pack> {
    if !raw.is_object() {
        return Err(AiqError::InvalidPackFormat(
            "pack document must be a JSON object".into(),
        ));
    }
    let raw: RawPack =
        serde_json::from_value(raw).map_err(|e| AiqError::InvalidPackFormat(e.to_string()))?;
    let pack = Pack::try_from(raw)?;
    tracing::debug!(pack = %pack.id, version = %pack.version, "normalized pack");
    Ok(pack)
}

/// Parse a pack from JSON text.
pub fn parse_pack_str(content: &str) -> Result<Pack> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| AiqError::InvalidPackFormat(e.to_string()))?;
    normalize_pack(value)
}

/// Read and normalize a pack file.
pub fn load_pack(path: &Path) -> anyhow::Result<Pack> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read pack file: {}", path.display()))?;
    parse_pack_str(&content).with_context(|| format!("failed to import pack: {}", path.display()))
}

/// Every `[[...]]` marker in `prompt`, in order of appearance, duplicates
/// retained. The bracket interior is returned verbatim.
pub fn extract_domains_from_prompt(prompt: &str) -> Vec<String> {
    marker_regex()
        .captures_iter(prompt)
        .map(|caps| caps[1].to_string())
        .collect()
}
