//! Country name normalization: alias table → exact → fuzzy → passthrough.
//!
//! Alias targets are the `NAME` values of the Natural Earth admin-0 dataset,
//! which are the canonical keys of the boundary dataset.

use std::collections::HashMap;

/// Default similarity cutoff for fuzzy matches.
pub const DEFAULT_FUZZY_CUTOFF: f64 = 0.8;

const COUNTRY_ALIASES: &[(&str, &str)] = &[
    ("usa", "United States of America"),
    ("us", "United States of America"),
    ("u.s.", "United States of America"),
    ("u.s.a.", "United States of America"),
    ("america", "United States of America"),
    ("united states", "United States of America"),
    ("uk", "United Kingdom"),
    ("u.k.", "United Kingdom"),
    ("britain", "United Kingdom"),
    ("great britain", "United Kingdom"),
    ("england", "United Kingdom"),
    ("scotland", "United Kingdom"),
    ("wales", "United Kingdom"),
    ("russian federation", "Russia"),
    ("south korea", "South Korea"),
    ("korea", "South Korea"),
    ("republic of korea", "South Korea"),
    ("north korea", "North Korea"),
    ("dprk", "North Korea"),
    ("persia", "Iran"),
    ("islamic republic of iran", "Iran"),
    ("viet nam", "Vietnam"),
    ("lao pdr", "Laos"),
    ("czech republic", "Czechia"),
    ("ivory coast", "C\u{00F4}te d'Ivoire"),
    ("cote d'ivoire", "C\u{00F4}te d'Ivoire"),
    ("brunei darussalam", "Brunei"),
    ("syrian arab republic", "Syria"),
    ("republic of moldova", "Moldova"),
    ("macedonia", "North Macedonia"),
    ("burma", "Myanmar"),
    ("swaziland", "eSwatini"),
    ("eswatini", "eSwatini"),
    ("east timor", "Timor-Leste"),
    ("slovak republic", "Slovakia"),
    ("republic of the congo", "Congo"),
    ("congo-brazzaville", "Congo"),
    ("democratic republic of the congo", "Dem. Rep. Congo"),
    ("drc", "Dem. Rep. Congo"),
    ("congo-kinshasa", "Dem. Rep. Congo"),
    ("bosnia", "Bosnia and Herz."),
    ("bosnia and herzegovina", "Bosnia and Herz."),
    ("central african republic", "Central African Rep."),
    ("dominican republic", "Dominican Rep."),
    ("equatorial guinea", "Eq. Guinea"),
    ("south sudan", "S. Sudan"),
    ("solomon islands", "Solomon Is."),
    ("uae", "United Arab Emirates"),
    ("emirates", "United Arab Emirates"),
    ("holland", "Netherlands"),
    ("the netherlands", "Netherlands"),
    ("turkiye", "Turkey"),
    ("t\u{00FC}rkiye", "Turkey"),
    ("bharat", "India"),
    ("cape verde", "Cabo Verde"),
    ("palestinian territories", "Palestine"),
];

/// Maps user-supplied country strings to canonical names.
#[derive(Debug, Clone)]
pub struct NameResolver {
    aliases: HashMap<String, String>,
    cutoff: f64,
}

impl Default for NameResolver {
    fn default() -> Self {
        Self::new(DEFAULT_FUZZY_CUTOFF)
    }
}

impl NameResolver {
    pub fn new(cutoff: f64) -> Self {
        let aliases = COUNTRY_ALIASES
            .iter()
            .map(|(alias, canonical)| (alias.to_string(), canonical.to_string()))
            .collect();
        Self { aliases, cutoff }
    }

    /// Add or override aliases. Keys are matched lower-cased.
    pub fn with_aliases<I, K, V>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (alias, canonical) in extra {
            self.aliases
                .insert(alias.as_ref().trim().to_lowercase(), canonical.into());
        }
        self
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    /// Best-effort canonical name for `text`. Never fails; an unmatched input
    /// comes back unchanged so the lookup reports it as not found.
    ///
    /// `known` must be in a stable order; it breaks ties between equally
    /// similar candidates.
    pub fn normalize(&self, text: &str, known: &[String]) -> String {
        let trimmed = text.trim();
        let lower = trimmed.to_lowercase();

        if let Some(canonical) = self.aliases.get(&lower) {
            return canonical.clone();
        }

        if known.iter().any(|k| k == trimmed) {
            return trimmed.to_string();
        }

        if let Some(i) = best_match(trimmed, known.iter().map(String::as_str), self.cutoff) {
            return known[i].clone();
        }

        let lowered: Vec<String> = known.iter().map(|k| k.to_lowercase()).collect();
        if let Some(i) = best_match(&lower, lowered.iter().map(String::as_str), self.cutoff) {
            return known[i].clone();
        }

        text.to_string()
    }
}

/// Index of the candidate most similar to `query` with ratio ≥ `cutoff`.
/// Earlier candidates win ties.
fn best_match<'a>(query: &str, candidates: impl Iterator<Item = &'a str>, cutoff: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, candidate) in candidates.enumerate() {
        let score = similarity(query, candidate);
        if score >= cutoff && best.map_or(true, |(_, s)| score > s) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i)
}

/// Normalized Levenshtein similarity in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    let dist = edit_distance(a, b);
    (longest - dist) as f64 / longest as f64
}

/// Compute edit distance between two strings (Levenshtein).
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let n = b.len();

    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0; n + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[n]
}
