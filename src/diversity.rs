//! Label diversity metric used by downstream policy gates.

use std::collections::BTreeMap;

/// Shannon entropy (natural log) of the empirical label distribution.
///
/// Returns `0.0` for no labels. The result depends only on the multiset of
/// label frequencies, so it is unchanged by reordering or renaming labels.
pub fn shannon_index<I, S>(labels: I) -> f64
where
    I: IntoIterator<Item = S>,
    S: Ord,
{
    let mut counts: BTreeMap<S, u64> = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }
    let total: u64 = counts.values().sum();
    if total == 0 {
        return 0.0;
    }

    // Summing in frequency order keeps the float result independent of the
    // label names.
    let mut frequencies: Vec<u64> = counts.into_values().collect();
    frequencies.sort_unstable();
    let n = total as f64;
    frequencies.iter().fold(0.0, |acc, &count| {
        let p = count as f64 / n;
        acc - p * p.ln()
    })
}
