//! Jaro-Winkler similarity between canonical keys.
//!
//! The score is used for "did you mean" suggestions when a command token has
//! no exact match. It is never consulted to resolve a command.
//!
//! The prefix boost is applied at every Jaro score, not only above 0.7.

/// Weight applied to the shared prefix.
const PREFIX_SCALE: f64 = 0.1;

/// Longest prefix that contributes to the boost.
const MAX_PREFIX: usize = 4;

/// Computes the Jaro-Winkler similarity of `a` and `b`, in `[0, 1]`.
///
/// Identical inputs score `1.0`; an empty input against a non-empty one
/// scores `0.0`. Characters are compared as `char`s.
///
/// ```rust
/// use brass_core::similarity::similarity;
///
/// assert_eq!(similarity("ping", "ping"), 1.0);
/// assert!(similarity("ping", "png") > 0.8);
/// assert_eq!(similarity("ping", ""), 0.0);
/// ```
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let jaro = jaro(&a, &b);
    if jaro == 0.0 {
        return 0.0;
    }

    let prefix = a
        .iter()
        .zip(&b)
        .take(MAX_PREFIX)
        .take_while(|(x, y)| x == y)
        .count();

    jaro + prefix as f64 * PREFIX_SCALE * (1.0 - jaro)
}

fn jaro(a: &[char], b: &[char]) -> f64 {
    let window = (a.len().max(b.len()) / 2).saturating_sub(1);

    let mut a_matched = vec![false; a.len()];
    let mut b_matched = vec![false; b.len()];
    let mut matches = 0usize;

    for (i, ch) in a.iter().enumerate() {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(b.len());
        for j in start..end {
            if !b_matched[j] && b[j] == *ch {
                a_matched[i] = true;
                b_matched[j] = true;
                matches += 1;
                break;
            }
        }
    }

    if matches == 0 {
        return 0.0;
    }

    // Walk both matched sequences in order; every disagreement is half a transposition.
    let mut half_transpositions = 0usize;
    let mut j = 0usize;
    for (i, ch) in a.iter().enumerate() {
        if !a_matched[i] {
            continue;
        }
        while !b_matched[j] {
            j += 1;
        }
        if *ch != b[j] {
            half_transpositions += 1;
        }
        j += 1;
    }

    let m = matches as f64;
    let t = half_transpositions as f64 / 2.0;
    (m / a.len() as f64 + m / b.len() as f64 + (m - t) / m) / 3.0
}

/// Returns the candidate closest to `needle` together with its score.
///
/// Ties keep the first candidate seen.
pub fn closest<'a, I>(needle: &str, candidates: I) -> Option<(&'a str, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .map(|candidate| (candidate, similarity(needle, candidate)))
        .fold(None, |best, (candidate, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((candidate, score)),
        })
}
