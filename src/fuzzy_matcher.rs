use crate::catalog::{Catalog, QuestionDefinition};
use itertools::Itertools;
use std::collections::BTreeSet;
use strsim::jaro_winkler;

/// Lowercase, replace every non-alphanumeric character with a space and
/// collapse runs of whitespace.
pub fn normalize_text(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .join(" ")
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Insertion/deletion edit distance.
fn indel_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    a.len() + b.len() - 2 * lcs_len(&a, &b)
}

fn norm_distance(dist: usize, lensum: usize) -> f64 {
    if lensum == 0 {
        100.0
    } else {
        100.0 - 100.0 * dist as f64 / lensum as f64
    }
}

/// Token-set similarity on a 0-100 scale.
///
/// Both inputs are normalized and split into word sets. The score is the best
/// of comparing the shared tokens against each side's full token set, and the
/// two leftover sets against each other, so word order and extra words on one
/// side are tolerated. A message whose words are all contained in the other
/// string scores 100.
pub fn token_set_ratio(s1: &str, s2: &str) -> f64 {
    let a = normalize_text(s1);
    let b = normalize_text(s2);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let tokens_a: BTreeSet<&str> = a.split(' ').collect();
    let tokens_b: BTreeSet<&str> = b.split(' ').collect();

    let intersect: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let diff_ab: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let diff_ba: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    if !intersect.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }

    // BTreeSet iteration is already sorted
    let diff_ab_joined = diff_ab.iter().join(" ");
    let diff_ba_joined = diff_ba.iter().join(" ");
    let ab_len = diff_ab_joined.chars().count();
    let ba_len = diff_ba_joined.chars().count();
    let sect_len = intersect.iter().join(" ").chars().count();

    let sep = usize::from(sect_len != 0);
    let sect_ab_len = sect_len + sep + ab_len;
    let sect_ba_len = sect_len + sep + ba_len;

    let dist = indel_distance(&diff_ab_joined, &diff_ba_joined);
    let result = norm_distance(dist, sect_ab_len + sect_ba_len);
    if sect_len == 0 {
        return result;
    }

    // Only the leftover tokens differ between sect and sect+rest
    let sect_ab_ratio = norm_distance(sep + ab_len, sect_len + sect_ab_len);
    let sect_ba_ratio = norm_distance(sep + ba_len, sect_len + sect_ba_len);

    result.max(sect_ab_ratio).max(sect_ba_ratio)
}

#[derive(Debug, Clone)]
pub struct QuestionMatch<'a> {
    pub question: &'a QuestionDefinition,
    pub score: f64,
}

/// Routes free text to the closest catalog question.
pub struct QuestionMatcher<'a> {
    catalog: &'a Catalog,
    search_texts: Vec<String>,
}

impl<'a> QuestionMatcher<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        let search_texts = catalog
            .questions()
            .iter()
            .map(QuestionDefinition::search_text)
            .collect();
        Self {
            catalog,
            search_texts,
        }
    }

    /// Best-scoring question at or above `threshold` (0-100). The first
    /// question in catalog order wins ties.
    pub fn find_best(&self, message: &str, threshold: u8) -> Option<QuestionMatch<'a>> {
        let mut best: Option<(usize, f64)> = None;
        for (pos, text) in self.search_texts.iter().enumerate() {
            let score = token_set_ratio(message, text);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((pos, score));
            }
        }

        let (pos, score) = best?;
        let question = &self.catalog.questions()[pos];
        if score < f64::from(threshold) {
            tracing::debug!(
                "Best match '{}' scored {:.1}, below threshold {}",
                question.id,
                score,
                threshold
            );
            return None;
        }
        tracing::info!("Matched question '{}' with score {:.1}", question.id, score);
        Some(QuestionMatch { question, score })
    }

    /// Closest question labels by Jaro-Winkler similarity, for "did you mean"
    /// hints when nothing clears the threshold.
    pub fn suggest(&self, message: &str, limit: usize) -> Vec<&'a QuestionDefinition> {
        let norm = normalize_text(message);
        self.catalog
            .questions()
            .iter()
            .map(|q| (q, jaro_winkler(&norm, &normalize_text(&q.label))))
            .sorted_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal))
            .take(limit)
            .map(|(q, _)| q)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_json_str(
            r#"[
                {"id": "risk", "label": "Summarize the renewal risk of a deal",
                 "questionTemplate": "What is the renewal risk for deal {dealId}?",
                 "agent": "renewals", "backendQuestionId": "q2"},
                {"id": "sentiment", "label": "Analyze customer sentiment",
                 "questionTemplate": "Analyze customer sentiment for {customerName}",
                 "agent": "renewals", "backendQuestionId": "sentimentQ1"},
                {"id": "adoption", "label": "Show adoption level for a deployment",
                 "questionTemplate": "Show adoption level for {customerName} deployment",
                 "agent": "adoption", "backendQuestionId": "adoptionQ5"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  What's the  RISK for D-12345? "), "what s the risk for d 12345");
    }

    #[test]
    fn test_token_set_ratio_order_insensitive() {
        assert_eq!(token_set_ratio("risk renewal", "renewal risk"), 100.0);
        assert_eq!(token_set_ratio("renewal risk", "Summarize the renewal risk of a deal"), 100.0);
        assert_eq!(token_set_ratio("", "anything"), 0.0);
    }

    #[test]
    fn test_token_set_ratio_partial_overlap() {
        let score = token_set_ratio(
            "What is the renewal risk for deal D-12345?",
            "Summarize the renewal risk of a deal What is the renewal risk for deal {dealId}?",
        );
        assert!(score > 80.0 && score < 100.0, "score was {}", score);

        let unrelated = token_set_ratio("xyzzy gobbledygook", "Analyze customer sentiment");
        assert!(unrelated < 50.0, "score was {}", unrelated);
    }

    #[test]
    fn test_normalize_text_lowercases_non_ascii() {
        assert_eq!(normalize_text("ÉTAT"), normalize_text("état"));
        assert_eq!(normalize_text("Größe/ÜBER"), "größe über");
    }

    #[test]
    fn test_indel_distance() {
        assert_eq!(indel_distance("abc", "abc"), 0);
        assert_eq!(indel_distance("abc", "xyz"), 6);
        // lcs("abcd", "abce") = 3
        assert_eq!(indel_distance("abcd", "abce"), 2);
        assert_eq!(norm_distance(2, 8), 75.0);
        assert_eq!(norm_distance(0, 0), 100.0);
    }

    #[test]
    fn test_find_best_routes_messages() {
        let catalog = catalog();
        let matcher = QuestionMatcher::new(&catalog);

        let m = matcher
            .find_best("What is the renewal risk for deal D-12345?", 50)
            .unwrap();
        assert_eq!(m.question.id, "risk");

        let m = matcher
            .find_best("Analyze customer sentiment for Acme Corp", 50)
            .unwrap();
        assert_eq!(m.question.id, "sentiment");
    }

    #[test]
    fn test_find_best_tie_goes_to_first_question() {
        let catalog = Catalog::from_json_str(
            r#"[
                {"id": "products-a", "label": "List the products on a deal",
                 "questionTemplate": "Which products are on deal {dealId}?",
                 "agent": "renewals", "backendQuestionId": "q4"},
                {"id": "products-b", "label": "List the products on a deal",
                 "questionTemplate": "Which products are on deal {dealId}?",
                 "agent": "renewals", "backendQuestionId": "q5"}
            ]"#,
        )
        .unwrap();
        let matcher = QuestionMatcher::new(&catalog);

        for message in ["Which products are on deal D-12345?", "List the products on a deal"] {
            let m = matcher.find_best(message, 50).unwrap();
            assert_eq!(m.question.id, "products-a");
        }
    }

    #[test]
    fn test_find_best_below_threshold_is_none() {
        let catalog = catalog();
        let matcher = QuestionMatcher::new(&catalog);
        assert!(matcher
            .find_best("xyzzy gobbledygook nonsense asdfqwer", 80)
            .is_none());
    }

    #[test]
    fn test_every_label_routes_to_itself() {
        let catalog = catalog();
        let matcher = QuestionMatcher::new(&catalog);
        for q in catalog.questions() {
            let m = matcher.find_best(&q.label, 90).unwrap();
            assert_eq!(m.question.id, q.id);
        }
    }

    #[test]
    fn test_suggest_orders_by_label_similarity() {
        let catalog = catalog();
        let matcher = QuestionMatcher::new(&catalog);
        let suggestions = matcher.suggest("analyze sentiment", 1);
        assert_eq!(suggestions[0].id, "sentiment");
    }
}
