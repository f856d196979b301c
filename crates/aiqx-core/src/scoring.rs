//! Heuristic answer scorer.
//!
//! Turns one domain's answer text into an integer in `[0, 100]`. The score
//! rewards length, calibrated hedging, explicit structure and concrete
//! detail, and penalizes overconfident wording. It is a pure function of its
//! inputs.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::pack::ScoringParams;

/// Upper bound of the hedge-term contribution.
pub const HEDGE_CAP: i64 = 15;
/// Upper bound of the structural-connective contribution.
pub const STRUCTURE_CAP: i64 = 10;
/// Points per structural connective.
pub const STRUCTURE_WEIGHT: i64 = 2;

const MIN_SCORE: i64 = 0;
const MAX_SCORE: i64 = 100;

fn build(pattern: &str) -> Regex {
    Regex::new(pattern).expect("scoring vocabulary regex is valid")
}

// Vocabulary is matched case-insensitively and without word boundaries, so
// "may" also counts inside "mayor".
static HEDGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    build(
        r"(?i)however|depends|assumption|limit|uncertain|might|could|perhaps|possibly|may|sometimes|often|typically",
    )
});
static ABSOLUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    build(r"(?i)always|never|obvious|clearly|definitely|certainly|absolutely|must|impossible|guaranteed")
});
static STRUCTURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    build(r"(?i)first|second|third|because|therefore|thus|consequently|for example|specifically|namely")
});
static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| build(r"[0-9]+|[+\-*/=<>]"));
static REASONING_RE: LazyLock<Regex> = LazyLock::new(|| build(r"(?i)because|therefore|thus|so"));
static EXAMPLE_RE: LazyLock<Regex> =
    LazyLock::new(|| build(r"(?i)example|for instance|specifically"));

/// Itemized contributions behind a score, useful for explaining a result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base: i64,
    pub length_bonus: i64,
    pub hedge_terms: usize,
    pub hedge_bonus: i64,
    pub absolute_terms: usize,
    pub absolute_penalty: i64,
    pub structure_terms: usize,
    pub structure_bonus: i64,
    pub long_answer_bonus: i64,
    pub word_count_bonus: i64,
    pub numeric_bonus: i64,
    pub reasoning_bonus: i64,
    pub example_bonus: i64,
    /// Sum of all contributions before clamping.
    pub raw: i64,
    /// Final score in `[0, 100]`.
    pub score: u32,
}

/// Score `text` for `domain_id` under `params`.
///
/// `domain_id` does not influence the result; it is accepted so that
/// per-domain weighting can be added without changing call sites.
pub fn score(domain_id: &str, text: &str, params: &ScoringParams) -> u32 {
    explain(domain_id, text, params).score
}

/// Like [`score`], returning every term that contributed.
pub fn explain(_domain_id: &str, text: &str, params: &ScoringParams) -> ScoreBreakdown {
    if text.trim().is_empty() {
        return ScoreBreakdown::default();
    }

    // Lengths are in UTF-16 code units, so characters outside the BMP count twice.
    let len = text.encode_utf16().count() as i64;
    let words = text.split_whitespace().count();

    let base = params.base_score();

    let length_bonus = params
        .length_bonuses
        .iter()
        .filter(|b| len >= b.threshold)
        .map(|b| b.bonus)
        .fold(0i64, i64::saturating_add);

    let hedge_terms = HEDGE_RE.find_iter(text).count();
    let hedge_bonus = (hedge_terms as i64)
        .saturating_mul(params.hedge_bonus())
        .min(HEDGE_CAP);

    let absolute_terms = ABSOLUTE_RE.find_iter(text).count();
    let absolute_penalty = (absolute_terms as i64).saturating_mul(params.absolute_penalty());

    let structure_terms = STRUCTURE_RE.find_iter(text).count();
    let structure_bonus = (structure_terms as i64)
        .saturating_mul(STRUCTURE_WEIGHT)
        .min(STRUCTURE_CAP);

    // The flat checks below overlap with the structural scan on purpose:
    // "because"/"therefore"/"thus" and "specifically" can score twice.
    let long_answer_bonus = if len > 200 { 10 } else { 0 };
    let word_count_bonus = if words > 50 { 5 } else { 0 };
    let numeric_bonus = if NUMERIC_RE.is_match(text) { 5 } else { 0 };
    let reasoning_bonus = if REASONING_RE.is_match(text) { 5 } else { 0 };
    let example_bonus = if EXAMPLE_RE.is_match(text) { 5 } else { 0 };

    let raw = [
        base,
        length_bonus,
        hedge_bonus,
        absolute_penalty,
        structure_bonus,
        long_answer_bonus,
        word_count_bonus,
        numeric_bonus,
        reasoning_bonus,
        example_bonus,
    ]
    .into_iter()
    .fold(0i64, i64::saturating_add);

    let score = raw.clamp(MIN_SCORE, MAX_SCORE) as u32;

    ScoreBreakdown {
        base,
        length_bonus,
        hedge_terms,
        hedge_bonus,
        absolute_terms,
        absolute_penalty,
        structure_terms,
        structure_bonus,
        long_answer_bonus,
        word_count_bonus,
        numeric_bonus,
        reasoning_bonus,
        example_bonus,
        raw,
        score,
    }
}

/// Qualitative band a score falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    Critical,
    Low,
    Medium,
    Good,
    Excellent,
}

impl ScoreBand {
    pub fn of(score: u32) -> Self {
        match score {
            0..=19 => ScoreBand::Critical,
            20..=39 => ScoreBand::Low,
            40..=59 => ScoreBand::Medium,
            60..=79 => ScoreBand::Good,
            _ => ScoreBand::Excellent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreBand::Critical => "critical",
            ScoreBand::Low => "low",
            ScoreBand::Medium => "medium",
            ScoreBand::Good => "good",
            ScoreBand::Excellent => "excellent",
        }
    }
}

impl std::fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::LengthBonus;

    fn params_150() -> ScoringParams {
        ScoringParams {
            base_score: Some(30),
            hedge_bonus: Some(3),
            absolute_penalty: Some(-5),
            length_bonuses: vec![LengthBonus {
                threshold: 150,
                bonus: 15,
            }],
            ..ScoringParams::unset()
        }
    }

    #[test]
    fn empty_and_whitespace_score_zero() {
        let generous = ScoringParams {
            base_score: Some(90),
            ..ScoringParams::default()
        };
        for text in ["", "   ", "\n\t  \n"] {
            assert_eq!(score("any", text, &generous), 0);
            assert_eq!(score("any", text, &ScoringParams::unset()), 0);
        }
    }

    #[test]
    fn hedged_numeric_answer() {
        let text = "It might be 4, however it depends on the base.";
        let b = explain("math", text, &params_150());
        assert_eq!(b.hedge_terms, 3);
        assert_eq!(b.hedge_bonus, 9);
        assert_eq!(b.length_bonus, 0);
        assert_eq!(b.absolute_terms, 0);
        assert_eq!(b.numeric_bonus, 5);
        assert_eq!(b.reasoning_bonus, 0);
        assert_eq!(b.score, 44);
        assert_eq!(score("math", text, &params_150()), 44);
    }

    #[test]
    fn deterministic() {
        let text = "First, because the premise holds, therefore the conclusion follows. For example, 2 > 1.";
        let params = ScoringParams::default();
        let a = score("logic", text, &params);
        for _ in 0..5 {
            assert_eq!(score("logic", text, &params), a);
        }
        // The domain id is not part of the computation.
        assert_eq!(score("ethics", text, &params), a);
    }

    #[test]
    fn length_bonuses_stack() {
        let text = "a".repeat(320);
        let b = explain("x", &text, &ScoringParams::default());
        assert_eq!(b.length_bonus, 25);
        assert_eq!(b.long_answer_bonus, 10);
        // 30 + 25 + 10
        assert_eq!(b.score, 65);
    }

    #[test]
    fn length_counts_utf16_units() {
        // 80 emoji are 160 code units: over the 150 threshold.
        let emoji = "\u{1F600}".repeat(80);
        assert_eq!(score("x", &emoji, &ScoringParams::default()), 45);

        // 110 emoji are 220 code units: the long-answer bonus applies too.
        let b = explain("x", &"\u{1F600}".repeat(110), &ScoringParams::default());
        assert_eq!(b.length_bonus, 15);
        assert_eq!(b.long_answer_bonus, 10);
        assert_eq!(b.score, 55);

        // BMP characters count once.
        let b = explain("x", &"\u{00e9}".repeat(160), &ScoringParams::default());
        assert_eq!(b.length_bonus, 15);
        assert_eq!(b.long_answer_bonus, 0);
    }

    #[test]
    fn hedge_contribution_is_capped() {
        let text = "maybe perhaps possibly might could often";
        let b = explain("x", text, &ScoringParams::default());
        assert!(b.hedge_terms >= 6);
        assert_eq!(b.hedge_bonus, HEDGE_CAP);
    }

    #[test]
    fn unanchored_vocabulary() {
        // "mayor" carries "may", "also" carries "so".
        let b = explain("x", "the mayor also spoke", &ScoringParams::unset());
        assert_eq!(b.hedge_terms, 1);
        assert_eq!(b.reasoning_bonus, 5);
    }

    #[test]
    fn reasoning_and_example_checks_double_count() {
        let b = explain("x", "because specifically", &ScoringParams::unset());
        assert_eq!(b.structure_terms, 2);
        assert_eq!(b.structure_bonus, 4);
        assert_eq!(b.reasoning_bonus, 5);
        assert_eq!(b.example_bonus, 5);
        assert_eq!(b.score, 30 + 4 + 5 + 5);
    }

    #[test]
    fn absolute_terms_can_drive_to_zero() {
        let text = "always never clearly definitely must ".repeat(3);
        assert_eq!(score("x", &text, &ScoringParams::default()), 0);
    }

    #[test]
    fn adversarial_input_stays_in_range() {
        let hedges = "however might could perhaps ".repeat(2000);
        let absolutes = "always never obviously must ".repeat(2000);
        let mixed = format!("{hedges}{absolutes} 1+1=2 because for example");
        let extreme = ScoringParams {
            base_score: Some(i64::MAX),
            hedge_bonus: Some(i64::MAX),
            absolute_penalty: Some(i64::MIN),
            ..ScoringParams::default()
        };
        for text in [&hedges, &absolutes, &mixed] {
            for params in [ScoringParams::default(), ScoringParams::unset(), extreme.clone()] {
                let s = score("x", text, &params);
                assert!(s <= 100, "score {s} out of range");
            }
        }
        // 30 base + 25 length + 15 capped hedges + 10 long + 5 words
        assert_eq!(score("x", &hedges, &ScoringParams::default()), 85);
    }

    #[test]
    fn missing_params_fall_back() {
        let b = explain("x", "plain words", &ScoringParams::unset());
        assert_eq!(b.base, 30);
        assert_eq!(b.score, 30);
        let b = explain("x", "always", &ScoringParams::unset());
        assert_eq!(b.absolute_penalty, -5);
    }

    #[test]
    fn bands() {
        assert_eq!(ScoreBand::of(0), ScoreBand::Critical);
        assert_eq!(ScoreBand::of(19), ScoreBand::Critical);
        assert_eq!(ScoreBand::of(20), ScoreBand::Low);
        assert_eq!(ScoreBand::of(59), ScoreBand::Medium);
        assert_eq!(ScoreBand::of(79), ScoreBand::Good);
        assert_eq!(ScoreBand::of(80), ScoreBand::Excellent);
        assert_eq!(ScoreBand::Good.to_string(), "good");
    }
}
