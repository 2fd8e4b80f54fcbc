//! Deterministic intent-text scoring (C1).
//!
//! No external state: identical inputs always produce byte-identical
//! output, which is why this lives as free functions rather than a
//! struct with mutable fields.

use std::collections::HashMap;

const ACADEMIC: &[&str] = &["assignment", "course", "lecture", "syllabus", "grade", "exam", "study"];
const RESEARCH: &[&str] = &["research", "dataset", "publication", "experiment", "thesis", "lab"];
const ADMINISTRATIVE: &[&str] = &["enrollment", "registrar", "billing", "transcript", "payroll", "budget"];
const EMERGENCY: &[&str] = &["emergency", "outage", "incident", "urgent", "critical failure"];
const SUSPICIOUS: &[&str] = &["bypass", "workaround", "ignore policy", "don't tell", "backdoor"];

const VAGUE_PHRASES: &[&str] = &["just want to", "quickly check", "real quick"];
const CIRCUMVENTION_PHRASES: &[&str] = &["bypass the policy", "skip the approval", "without approval"];

#[derive(Debug, Clone, Default)]
pub struct IntentResult {
    pub intent_score: f64,
    pub keyword_matches: HashMap<String, u32>,
    pub flags: Vec<String>,
}

/// Score intent text against a requested resource type and role.
pub fn analyze(intent_text: &str, resource_type: &str, _role: &str) -> IntentResult {
    let lower = intent_text.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();

    let mut matches = HashMap::new();
    matches.insert("academic".to_string(), count_matches(&lower, ACADEMIC));
    matches.insert("research".to_string(), count_matches(&lower, RESEARCH));
    matches.insert("administrative".to_string(), count_matches(&lower, ADMINISTRATIVE));
    matches.insert("emergency".to_string(), count_matches(&lower, EMERGENCY));
    matches.insert("suspicious".to_string(), count_matches(&lower, SUSPICIOUS));

    let mut flags = Vec::new();

    let length_score = length_structure_score(&lower, &words);
    let keyword_score = keyword_category_score(&matches);
    let coherence_score = if references_resource(&lower, resource_type) { 100.0 } else { 0.0 };

    let has_red_flag = contains_any(&lower, VAGUE_PHRASES)
        || contains_any(&lower, CIRCUMVENTION_PHRASES)
        || (matches.get("emergency").copied().unwrap_or(0) > 0 && words.len() < 8);

    if has_red_flag || matches.get("suspicious").copied().unwrap_or(0) > 0 {
        flags.push("suspicious".to_string());
    }

    let red_flag_score = if has_red_flag { 0.0 } else { 100.0 };

    let mut intent_score =
        0.2 * length_score + 0.4 * keyword_score + 0.3 * coherence_score + 0.1 * red_flag_score;

    if flags.contains(&"suspicious".to_string()) {
        intent_score = intent_score.min(30.0);
    }

    IntentResult {
        intent_score: intent_score.clamp(0.0, 100.0),
        keyword_matches: matches,
        flags,
    }
}

fn count_matches(text: &str, keywords: &[&str]) -> u32 {
    keywords.iter().filter(|k| text.contains(*k)).count() as u32
}

fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| text.contains(p))
}

fn length_structure_score(text: &str, words: &[&str]) -> f64 {
    if text.len() < 20 || words.len() < 5 {
        return 0.0;
    }
    let char_ratio = (text.len() as f64 / 100.0).min(1.0);
    let word_ratio = (words.len() as f64 / 15.0).min(1.0);
    (char_ratio.min(word_ratio)) * 100.0
}

fn keyword_category_score(matches: &HashMap<String, u32>) -> f64 {
    let positive: u32 = ["academic", "research", "administrative", "emergency"]
        .iter()
        .map(|k| matches.get(*k).copied().unwrap_or(0))
        .sum();
    let suspicious = matches.get("suspicious").copied().unwrap_or(0);

    let base = (positive.min(3) as f64 / 3.0) * 100.0;
    (base - (suspicious.min(3) as f64 / 3.0) * 100.0).clamp(0.0, 100.0)
}

fn references_resource(text: &str, resource_type: &str) -> bool {
    let resource_lower = resource_type.to_lowercase();
    if text.contains(&resource_lower) {
        return true;
    }
    // Parent-category aliases for common resource types.
    match resource_lower.as_str() {
        "grades" | "transcripts" => text.contains("academic record") || text.contains("grade"),
        "research_data" => text.contains("research") || text.contains("dataset"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs_are_deterministic() {
        let a = analyze("I need to review my course grades before the deadline", "grades", "student");
        let b = analyze("I need to review my course grades before the deadline", "grades", "student");
        assert_eq!(a.intent_score, b.intent_score);
        assert_eq!(a.flags, b.flags);
    }

    #[test]
    fn short_vague_text_scores_low() {
        let result = analyze("just want to check", "grades", "student");
        assert!(result.intent_score < 40.0);
    }

    #[test]
    fn circumvention_language_caps_score_at_30() {
        let result = analyze(
            "I need access to bypass the policy and skip the approval process entirely today",
            "grades",
            "student",
        );
        assert!(result.flags.contains(&"suspicious".to_string()));
        assert!(result.intent_score <= 30.0);
    }

    #[test]
    fn well_formed_academic_request_scores_high() {
        let result = analyze(
            "I am requesting access to my course grades so I can verify my transcript before the registrar deadline next week for my academic advisor meeting",
            "grades",
            "student",
        );
        assert!(result.intent_score > 60.0, "score was {}", result.intent_score);
        assert!(result.flags.is_empty());
    }
}
