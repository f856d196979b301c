//! Packs shipped with the crate.

use crate::error::Result;
use crate::pack::{parse_pack_str, Pack};

const CORE_ASSESSMENT: &str = include_str!("../packs/core-assessment.json");

/// The starter packs seeded into an empty installed set.
pub fn builtin_packs() -> Result<Vec<Pack>> {
    [CORE_ASSESSMENT].into_iter().map(parse_pack_str).collect()
}
