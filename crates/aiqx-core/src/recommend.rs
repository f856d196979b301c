//! Cross-model ranking and fit-for-purpose recommendations.
//!
//! Only each model's most recent record is considered. Its question scores
//! are folded per domain, the best three domains become the model's
//! strengths, and models are ranked by the mean of their domain scores.

use serde::Serialize;

use crate::history::Model;
use crate::statistics::{aggregate_by_domain, mean};
use crate::workspace::Workspace;

/// How many strengths are reported per model.
pub const MAX_STRENGTHS: usize = 3;
/// How many use cases are reported per model.
pub const MAX_USE_CASES: usize = 4;
/// How many follow-up packs are suggested per model.
pub const MAX_PACK_SUGGESTIONS: usize = 3;
/// Suggestion emitted when no strength maps to a known pack.
pub const FALLBACK_PACK_SUGGESTION: &str = "Run more specialized tests for detailed insights";

/// Domain id → what a model strong in that domain is good for.
pub static USE_CASES: &[(&str, &str)] = &[
    // Core capabilities
    ("logic", "Analytical reasoning and problem-solving"),
    ("math", "Mathematical calculations and data analysis"),
    ("epistemic", "Research and fact-checking"),
    ("ethics", "Ethical decision-making and compliance"),
    ("creativity", "Creative and innovative thinking"),
    ("robustness", "Handling edge cases and unusual requests"),
    ("planning", "Project planning and strategy"),
    ("self", "Self-assessment and quality improvement"),
    ("format", "Following instructions precisely"),
    ("clarity", "Explaining complex topics simply"),
    // Advanced reasoning
    ("metacog", "Meta-cognitive reasoning and analysis"),
    ("systems", "Systems thinking and complexity"),
    ("paradox", "Solving logical puzzles"),
    ("counterfactual", "Hypothetical scenario analysis"),
    ("innovation", "Innovation and novel solutions"),
    ("abstraction", "Abstract thinking across domains"),
    ("secondorder", "Analyzing consequences and impacts"),
    ("recursive", "Complex multi-layered problems"),
    ("framing", "Problem reframing and assumptions"),
    ("synthesis", "Synthesizing multiple sources"),
    // Code proficiency
    ("syntax", "Writing code in multiple languages"),
    ("debugging", "Finding and fixing bugs"),
    ("architecture", "Software design and architecture"),
    ("optimization", "Performance optimization"),
    ("readability", "Writing clean, maintainable code"),
    ("algorithms", "Algorithm design and optimization"),
    ("testing", "Test creation and quality assurance"),
    ("security", "Security analysis and best practices"),
    ("refactoring", "Code improvement and modernization"),
    ("documentation", "Technical documentation"),
    // Professional writing
    ("business", "Business communication"),
    ("technical", "Technical writing and documentation"),
    ("persuasive", "Persuasive and compelling writing"),
    ("tone", "Adapting tone for different audiences"),
    ("editing", "Editing and proofreading"),
    ("structure", "Document organization"),
    ("conciseness", "Clear, concise communication"),
    ("audience", "Audience-appropriate content"),
    // Creative writing
    ("narrative", "Storytelling and narratives"),
    ("character", "Character development"),
    ("dialogue", "Natural dialogue writing"),
    ("description", "Descriptive and vivid writing"),
    ("style", "Stylistic variety"),
    ("worldbuilding", "Creating fictional worlds"),
    ("pacing", "Story pacing and tension"),
    ("voice", "Distinct narrative voice"),
    ("originality", "Original creative ideas"),
    ("emotion", "Emotional and engaging content"),
    // Information processing
    ("summarization", "Summarizing information"),
    ("extraction", "Extracting key information"),
    ("comparison", "Comparing and contrasting"),
    ("categorization", "Organizing and categorizing"),
    ("pattern", "Pattern recognition"),
    ("verification", "Fact-checking and verification"),
    // Conversational intelligence
    ("context", "Maintaining conversation context"),
    ("ambiguity", "Handling unclear questions"),
    ("tone_match", "Matching communication style"),
    ("empathy", "Empathetic responses"),
    ("helpfulness", "Helpful and balanced advice"),
    ("topic_nav", "Natural topic transitions"),
    ("boundaries", "Setting appropriate boundaries"),
    ("follow_up", "Asking clarifying questions"),
    ("repair", "Recovering from misunderstandings"),
    // Instruction & safety
    ("format_strict", "Following precise instructions"),
    ("constraints", "Working within constraints"),
    ("multistep", "Complex multi-step tasks"),
    ("refusal", "Appropriate task refusal"),
    ("manipulation", "Resisting manipulation"),
    ("implicit", "Understanding implicit requirements"),
    ("conflict", "Handling conflicting instructions"),
    ("precision", "High precision compliance"),
    ("safety_edge", "Safe handling of edge cases"),
    ("consistency", "Consistent behavior"),
    // Fit-for-purpose
    ("reasoning", "Complex reasoning and analytical tasks"),
    ("coding", "Software development and programming"),
    ("writing", "Writing and content creation"),
    ("analysis", "Data analysis and research"),
    ("conversation", "Interactive dialogue and assistance"),
    ("instructions", "Following precise specifications"),
    ("metacognition", "Self-assessment and quality control"),
    // Problem solving & critical thinking
    ("problemsolve", "Novel problem-solving"),
    ("criticalthink", "Critical analysis and evaluation"),
    ("inference", "Drawing logical conclusions"),
    ("prioritize", "Prioritization and decision-making"),
];

/// Domain id → pack that probes that strength further.
pub static PACK_SUGGESTIONS: &[(&str, &str)] = &[
    ("reasoning", "Advanced Reasoning Pack"),
    ("coding", "Code Proficiency Pack"),
    ("writing", "Professional Writing Pack"),
    ("analysis", "Information Processing Pack"),
    ("conversation", "Conversational Intelligence Pack"),
    ("instructions", "Instruction & Safety Pack"),
    ("creativity", "Creative Writing Pack"),
    ("metacognition", "Advanced Reasoning Pack"),
    ("logic", "Advanced Reasoning Pack"),
    ("math", "Advanced Reasoning Pack"),
    ("epistemic", "Advanced Reasoning Pack"),
    ("problemsolve", "Problem-Solving & Critical Thinking Pack"),
    ("criticalthink", "Problem-Solving & Critical Thinking Pack"),
];

fn lookup(table: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

pub fn use_case_for(domain: &str) -> Option<&'static str> {
    lookup(USE_CASES, domain)
}

pub fn pack_suggestion_for(domain: &str) -> Option<&'static str> {
    lookup(PACK_SUGGESTIONS, domain)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Strength {
    pub domain: String,
    pub score: u32,
}

/// One model's entry in the ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub model: String,
    pub strengths: Vec<Strength>,
    pub use_cases: Vec<String>,
    pub recommended_packs: Vec<String>,
    /// Mean of the latest record's per-domain scores.
    pub avg_score: f64,
    /// Number of records in the model's history, not just the latest.
    pub test_count: usize,
}

/// Top domains of `model`'s latest record, or `None` if it was never tested.
pub fn strengths(model: &Model) -> Option<(Vec<Strength>, f64)> {
    let latest = model.latest()?;
    let domains = aggregate_by_domain(&latest.scores);
    let avg = mean(domains.values().copied()).unwrap_or(0.0);

    let mut ranked: Vec<Strength> = domains
        .into_iter()
        .map(|(domain, score)| Strength { domain, score })
        .collect();
    // Stable: equal scores keep first-seen order.
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.truncate(MAX_STRENGTHS);
    Some((ranked, avg))
}

/// Use-case blurbs for `strengths`; unmapped domains use their display name.
pub fn use_cases<F>(strengths: &[Strength], display_name: F) -> Vec<String>
where
    F: Fn(&str) -> String,
{
    strengths
        .iter()
        .map(|s| {
            use_case_for(&s.domain)
                .map(str::to_string)
                .unwrap_or_else(|| display_name(&s.domain))
        })
        .take(MAX_USE_CASES)
        .collect()
}

/// Follow-up packs for `strengths`, deduplicated in rank order.
pub fn recommended_packs(strengths: &[Strength]) -> Vec<String> {
    let mut packs: Vec<String> = Vec::new();
    for suggestion in strengths.iter().filter_map(|s| pack_suggestion_for(&s.domain)) {
        if packs.len() == MAX_PACK_SUGGESTIONS {
            break;
        }
        if !packs.iter().any(|p| p == suggestion) {
            packs.push(suggestion.to_string());
        }
    }
    if packs.is_empty() {
        packs.push(FALLBACK_PACK_SUGGESTION.to_string());
    }
    packs
}

/// Rank every tested model by average domain score, best first.
///
/// Ties keep the registry order of the models.
pub fn recommend(workspace: &Workspace) -> Vec<Recommendation> {
    let mut ranking: Vec<Recommendation> = workspace
        .tested_models()
        .filter_map(|model| {
            let (strengths, avg_score) = strengths(model)?;
            let use_cases = use_cases(&strengths, |d| workspace.display_name(d, None));
            let recommended_packs = recommended_packs(&strengths);
            Some(Recommendation {
                model: model.name.clone(),
                strengths,
                use_cases,
                recommended_packs,
                avg_score,
                test_count: model.history.len(),
            })
        })
        .collect();
    ranking.sort_by(|a, b| b.avg_score.total_cmp(&a.avg_score));
    tracing::debug!(models = ranking.len(), "ranked models");
    ranking
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::TestRecord;
    use crate::pack::TierName;
    use chrono::Utc;

    fn tested(name: &str, runs: &[&[(&str, u32)]]) -> Model {
        Model {
            name: name.into(),
            history: runs
                .iter()
                .map(|scores| TestRecord {
                    pack_id: "core".into(),
                    tier: TierName::Basic,
                    time: Utc::now(),
                    scores: scores.iter().map(|&(k, v)| (k, v)).collect(),
                })
                .collect(),
        }
    }

    fn names(ranking: &[Recommendation]) -> Vec<&str> {
        ranking.iter().map(|r| r.model.as_str()).collect()
    }

    #[test]
    fn untested_models_are_skipped() {
        let ws = Workspace {
            models: vec![Model::new("idle"), tested("busy", &[&[("logic", 50)]])],
            ..Workspace::default()
        };
        assert_eq!(names(&recommend(&ws)), vec!["busy"]);
    }

    #[test]
    fn only_latest_record_counts() {
        let ws = Workspace {
            models: vec![tested("m", &[&[("logic", 100)], &[("logic", 20)]])],
            ..Workspace::default()
        };
        let rec = &recommend(&ws)[0];
        assert_eq!(rec.avg_score, 20.0);
        assert_eq!(rec.test_count, 2);
    }

    #[test]
    fn average_is_over_domains_not_questions() {
        // logic: (80 + 60) / 2 = 70, math: 40 → (70 + 40) / 2 = 55
        let ws = Workspace {
            models: vec![tested("m", &[&[("logic_1", 80), ("logic_2", 60), ("math_1", 40)]])],
            ..Workspace::default()
        };
        assert_eq!(recommend(&ws)[0].avg_score, 55.0);
    }

    #[test]
    fn ranking_is_descending_and_stable() {
        let ws = Workspace {
            models: vec![
                tested("low", &[&[("logic", 10)]]),
                tested("tie-a", &[&[("logic", 60)]]),
                tested("high", &[&[("logic", 90)]]),
                tested("tie-b", &[&[("math", 60)]]),
            ],
            ..Workspace::default()
        };
        assert_eq!(names(&recommend(&ws)), vec!["high", "tie-a", "tie-b", "low"]);
    }

    #[test]
    fn strengths_top_three_with_stable_ties() {
        let model = tested(
            "m",
            &[&[("ethics", 70), ("logic", 90), ("math", 70), ("clarity", 70), ("self", 10)]],
        );
        let (top, _) = strengths(&model).unwrap();
        let domains: Vec<_> = top.iter().map(|s| s.domain.as_str()).collect();
        assert_eq!(domains, vec!["logic", "ethics", "math"]);
    }

    #[test]
    fn use_cases_fall_back_to_display_name() {
        let strengths = vec![
            Strength { domain: "creativity".into(), score: 90 },
            Strength { domain: "synthesis".into(), score: 80 },
            Strength { domain: "tone_match_extra".into(), score: 70 },
        ];
        let ws = Workspace::default();
        let cases = use_cases(&strengths, |d| ws.display_name(d, None));
        assert_eq!(
            cases,
            vec![
                "Creative and innovative thinking",
                "Synthesizing multiple sources",
                "Tone Match Extra",
            ]
        );
    }

    #[test]
    fn pack_suggestions_dedup_and_fallback() {
        let s = |d: &str| Strength { domain: d.into(), score: 50 };
        assert_eq!(
            recommended_packs(&[s("logic"), s("math"), s("coding")]),
            vec!["Advanced Reasoning Pack", "Code Proficiency Pack"]
        );
        assert_eq!(
            recommended_packs(&[s("unmapped"), s("other")]),
            vec![FALLBACK_PACK_SUGGESTION]
        );
    }

    #[test]
    fn lookup_tables_have_unique_keys() {
        for table in [USE_CASES, PACK_SUGGESTIONS] {
            for (i, (key, _)) in table.iter().enumerate() {
                assert!(
                    table[i + 1..].iter().all(|(k, _)| k != key),
                    "duplicate key {key}"
                );
            }
        }
    }
}
