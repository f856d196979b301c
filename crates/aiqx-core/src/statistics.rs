//! Domain aggregation and averaging.
//!
//! Question-level score keys such as `reasoning_1` or `reasoning12` are folded
//! into their domain (`reasoning`) and averaged.

use crate::ordered::OrderedMap;

/// Scores keyed by question (or domain) id, in first-seen order.
pub type ScoreMap = OrderedMap<u32>;

/// Grouping key for a question id.
///
/// A trailing `_<digits>` suffix is removed first, then any digits still
/// trailing what remains: `"logic_2"` and `"logic2"` both become `"logic"`.
pub fn domain_of(question_id: &str) -> &str {
    let without_index = strip_underscore_index(question_id);
    without_index.trim_end_matches(|c: char| c.is_ascii_digit())
}

fn strip_underscore_index(id: &str) -> &str {
    let digits_trimmed = id.trim_end_matches(|c: char| c.is_ascii_digit());
    if digits_trimmed.len() == id.len() {
        return id;
    }
    digits_trimmed.strip_suffix('_').unwrap_or(id)
}

/// Round half up, matching how scores are displayed everywhere else.
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Arithmetic mean of the values, `None` when there are none.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = u32>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), v| (sum + u64::from(v), count + 1));
    if count == 0 {
        None
    } else {
        Some(sum as f64 / count as f64)
    }
}

/// Average question scores per domain.
///
/// Domains appear in the order their first question appears in `scores`.
pub fn aggregate_by_domain(scores: &ScoreMap) -> ScoreMap {
    let mut groups: OrderedMap<(u64, u64)> = OrderedMap::new();
    for (question_id, &score) in scores.iter() {
        let domain = domain_of(question_id);
        match groups.get_mut(domain) {
            Some((total, count)) => {
                *total += u64::from(score);
                *count += 1;
            }
            None => {
                groups.insert(domain, (u64::from(score), 1));
            }
        }
    }

    groups
        .into_iter()
        .map(|(domain, (total, count))| {
            let avg = round_half_up(total as f64 / count as f64) as u32;
            (domain, avg)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, u32)]) -> ScoreMap {
        entries.iter().map(|&(k, v)| (k, v)).collect()
    }

    #[test]
    fn domain_keys() {
        assert_eq!(domain_of("reasoning_1"), "reasoning");
        assert_eq!(domain_of("reasoning_2"), "reasoning");
        assert_eq!(domain_of("reasoning12"), "reasoning");
        assert_eq!(domain_of("logic"), "logic");
        assert_eq!(domain_of("tone_match"), "tone_match");
        assert_eq!(domain_of("tone_match_3"), "tone_match");
        assert_eq!(domain_of("q_10"), "q");
        assert_eq!(domain_of("42"), "");
    }

    #[test]
    fn empty_input() {
        assert!(aggregate_by_domain(&ScoreMap::new()).is_empty());
    }

    #[test]
    fn averages_questions() {
        let out = aggregate_by_domain(&map(&[("logic_1", 80), ("logic_2", 60)]));
        assert_eq!(out, map(&[("logic", 70)]));
    }

    #[test]
    fn rounds_half_up_and_keeps_order() {
        let out = aggregate_by_domain(&map(&[
            ("math_1", 70),
            ("logic_1", 50),
            ("math_2", 75),
            ("logic", 40),
        ]));
        assert_eq!(out, map(&[("math", 73), ("logic", 45)]));
    }

    #[test]
    fn mean_of_nothing() {
        assert_eq!(mean(Vec::<u32>::new()), None);
        assert_eq!(mean([10, 20]), Some(15.0));
    }
}
