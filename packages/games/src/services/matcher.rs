//! Fuzzy comparison of free-text guesses against known answers.
//!
//! Both inputs are trimmed and lower-cased before scoring. Scores are
//! percentages in `0..=100`.

use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Character overlap in order. Word order matters.
    Ratio,
    /// Overlap of the word sets. Word order and repeats do not matter.
    TokenSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestMatch {
    pub candidate: String,
    pub score: u8,
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn ratio_normalized(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let common = lcs_len(&a, &b);
    (200.0 * common as f64 / total as f64).round() as u8
}

fn token_set_normalized(a: &str, b: &str) -> u8 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    let join = |tokens: Vec<&str>| tokens.join(" ");
    let sect = join(tokens_a.intersection(&tokens_b).copied().collect());
    let diff_ab = join(tokens_a.difference(&tokens_b).copied().collect());
    let diff_ba = join(tokens_b.difference(&tokens_a).copied().collect());

    let combined_a = format!("{} {}", sect, diff_ab).trim().to_string();
    let combined_b = format!("{} {}", sect, diff_ba).trim().to_string();

    [
        ratio_normalized(&sect, &combined_a),
        ratio_normalized(&sect, &combined_b),
        ratio_normalized(&combined_a, &combined_b),
    ]
    .into_iter()
    .max()
    .unwrap_or(0)
}

pub fn score(mode: MatchMode, input: &str, candidate: &str) -> u8 {
    let (input, candidate) = (normalize(input), normalize(candidate));
    match mode {
        MatchMode::Ratio => ratio_normalized(&input, &candidate),
        MatchMode::TokenSet => token_set_normalized(&input, &candidate),
    }
}

pub fn is_match(mode: MatchMode, input: &str, candidate: &str, threshold: u8) -> bool {
    score(mode, input, candidate) >= threshold
}

/// Highest-scoring candidate. Earlier candidates win ties.
pub fn best_match<'a, I>(mode: MatchMode, input: &str, candidates: I) -> Option<BestMatch>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<BestMatch> = None;
    for candidate in candidates {
        let candidate_score = score(mode, input, candidate);
        if best.as_ref().map_or(true, |b| candidate_score > b.score) {
            best = Some(BestMatch {
                candidate: candidate.to_string(),
                score: candidate_score,
            });
        }
    }
    best
}

/// Best candidate, kept only when it reaches `threshold`.
pub fn accept_best<'a, I>(mode: MatchMode, input: &str, candidates: I, threshold: u8) -> Option<BestMatch>
where
    I: IntoIterator<Item = &'a str>,
{
    best_match(mode, input, candidates).filter(|m| m.score >= threshold)
}
