//! Fuzzy key matching for spoken lookups ("costi", "igiene dentale").

use strsim::{jaro_winkler, normalized_levenshtein};

/// Minimum mean token similarity for a fuzzy hit.
const MIN_SCORE: f64 = 0.80;

/// Tokens shorter than this carry no signal ("di", "la").
const MIN_TOKEN_CHARS: usize = 3;

/// Canonical key form: lowercase, words joined by `_`.
pub fn normalize_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}

/// Compute fuzzy string similarity using combined metrics.
fn fuzzy_match(a: &str, b: &str) -> f64 {
    // Jaro-Winkler rewards shared prefixes, which suits inflected Italian words.
    let jw = jaro_winkler(a, b);
    let lev = normalized_levenshtein(a, b);
    jw * 0.6 + lev * 0.4
}

/// Mean, over the query's tokens, of each token's best match in `haystacks`.
pub fn score(query: &str, haystacks: &[&str]) -> f64 {
    let query_tokens = tokens(query);
    if query_tokens.is_empty() {
        return 0.0;
    }
    let hay_tokens: Vec<String> = haystacks.iter().flat_map(|h| tokens(h)).collect();
    if hay_tokens.is_empty() {
        return 0.0;
    }

    let total: f64 = query_tokens
        .iter()
        .map(|q| {
            hay_tokens
                .iter()
                .map(|h| fuzzy_match(q, h))
                .fold(0.0, f64::max)
        })
        .sum();
    total / query_tokens.len() as f64
}

/// Pick the best-scoring entry above the threshold. Ties go to the earliest entry.
pub fn best_match<'a, T, I>(query: &str, entries: I) -> Option<T>
where
    I: IntoIterator<Item = (T, Vec<&'a str>)>,
{
    let mut best: Option<(T, f64)> = None;
    for (entry, haystacks) in entries {
        let s = score(query, &haystacks);
        if s >= MIN_SCORE && best.as_ref().map_or(true, |(_, top)| s > *top) {
            best = Some((entry, s));
        }
    }
    best.map(|(entry, _)| entry)
}
