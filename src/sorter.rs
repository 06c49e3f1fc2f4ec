use crate::config::SignalLists;
use crate::types::Candidate;
use std::cmp::Ordering;

/// Weighted signal score of `text`.
///
/// Each distinct term counts once per list it appears in, however often it
/// occurs. Matching is a case-insensitive substring scan; the sum is uncapped.
pub fn score_text(text: &str, signals: &SignalLists) -> i32 {
    let text = text.to_lowercase();
    let weights = &signals.weights;

    list_hits(&text, &signals.positive) * weights.positive
        + list_hits(&text, &signals.sponsor) * weights.sponsor
        + list_hits(&text, &signals.brands) * weights.brand
        + list_hits(&text, &signals.negative) * weights.negative
}

fn list_hits(text: &str, terms: &[String]) -> i32 {
    let mut distinct: Vec<String> = terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    distinct.sort();
    distinct.dedup();
    distinct.iter().filter(|t| text.contains(t.as_str())).count() as i32
}

/// Compare two candidates for ranking, best first.
pub fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    // Primary: reachable by email
    b.contact
        .has_email()
        .cmp(&a.contact.has_email())
        // Secondary: has a website
        .then_with(|| b.contact.has_website().cmp(&a.contact.has_website()))
        // Tertiary: signal score
        .then_with(|| b.score.cmp(&a.score))
        // Then audience size
        .then_with(|| b.subscriber_count.cmp(&a.subscriber_count))
}

/// Sort best first. The sort is stable, so full ties keep discovery order.
pub fn rank(candidates: &mut [Candidate]) {
    candidates.sort_by(compare_candidates);
}

/// Rank and keep at most `target` candidates.
pub fn select_top(mut candidates: Vec<Candidate>, target: usize) -> Vec<Candidate> {
    rank(&mut candidates);
    candidates.truncate(target);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Contact;
    use chrono::{TimeZone, Utc};

    fn candidate(id: &str, score: i32, subs: u64, email: bool, website: bool) -> Candidate {
        Candidate {
            id: id.to_string(),
            display_name: id.to_string(),
            country: None,
            subscriber_count: subs,
            last_published_at: Utc.with_ymd_and_hms(2024, 5, 20, 0, 0, 0).unwrap(),
            contact: Contact {
                handle: None,
                emails: if email { vec![format!("{id}@mail.io")] } else { vec![] },
                websites: if website { vec![format!("https://{id}.io")] } else { vec![] },
            },
            score,
        }
    }

    fn ids(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_score_example() {
        let signals = SignalLists::default();
        assert_eq!(score_text("review sponsored anker", &signals), 7);
    }

    #[test]
    fn test_repeated_term_counts_once() {
        let signals = SignalLists::default();
        assert_eq!(score_text("Review review REVIEW", &signals), 2);
    }

    #[test]
    fn test_negative_term_outweighs_positive() {
        let signals = SignalLists::default();
        assert!(score_text("review prank", &signals) < 0);
    }

    #[test]
    fn test_score_uses_configured_weights() {
        let mut signals = SignalLists::default();
        signals.weights.sponsor = 10;
        assert_eq!(score_text("sponsored", &signals), 10);
        assert_eq!(score_text("", &signals), 0);
    }

    #[test]
    fn test_larger_audience_wins_tie() {
        let mut list = vec![
            candidate("small", 5, 50_000, true, true),
            candidate("large", 5, 120_000, true, true),
        ];
        rank(&mut list);
        assert_eq!(ids(&list), vec!["large", "small"]);
    }

    #[test]
    fn test_contact_flags_outrank_score() {
        let mut list = vec![
            candidate("scored", 40, 150_000, false, true),
            candidate("bare", 90, 190_000, false, false),
            candidate("mailable", 1, 6_000, true, false),
        ];
        rank(&mut list);
        assert_eq!(ids(&list), vec!["mailable", "scored", "bare"]);
    }

    #[test]
    fn test_full_ties_keep_input_order() {
        let mut list = vec![
            candidate("first", 3, 10_000, true, false),
            candidate("second", 3, 10_000, true, false),
            candidate("third", 3, 10_000, true, false),
        ];
        rank(&mut list);
        assert_eq!(ids(&list), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_select_top_truncates() {
        let list: Vec<Candidate> = (0..5)
            .map(|i| candidate(&format!("c{i}"), i, 10_000, false, false))
            .collect();
        let top = select_top(list, 3);
        assert_eq!(ids(&top), vec!["c4", "c3", "c2"]);

        let few = select_top(vec![candidate("only", 0, 10_000, false, false)], 30);
        assert_eq!(few.len(), 1);
    }
}
