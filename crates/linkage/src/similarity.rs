//! Value-pair comparators: exact, postal-code partial, and approximate string
//! similarity with length-conditioned algorithm switching.
//!
//! Every function here is pure. Missing-value handling lives one level up in
//! [`crate::compare`]; the functions below always receive present values.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::LinkError;

// ---------------------------------------------------------------------------
// Comparator
// ---------------------------------------------------------------------------

/// A configured comparison function for one attribute pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Comparator {
    Exact,
    ZipPartial,
    String(StringComparator),
}

impl Comparator {
    /// Compare two present values.
    pub fn compare(&self, left: &str, right: &str) -> f64 {
        match self {
            Self::Exact => exact(left, right),
            Self::ZipPartial => zip_partial(left, right),
            Self::String(cmp) => cmp.compare(left, right),
        }
    }
}

/// 1.0 on equality, else 0.0.
pub fn exact(left: &str, right: &str) -> f64 {
    if left == right {
        1.0
    } else {
        0.0
    }
}

/// Partial agreement of postal codes.
///
/// 1.0 for identical codes, 0.5 when the first two characters agree, 0.25
/// when only the first character agrees, 0.0 otherwise. Masked placeholder
/// characters (`10xxx`) compare like any other character.
pub fn zip_partial(left: &str, right: &str) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    if left == right {
        return 1.0;
    }
    let prefix = |s: &str, n: usize| s.chars().take(n).collect::<String>();
    if prefix(left, 2) == prefix(right, 2) {
        0.5
    } else if prefix(left, 1) == prefix(right, 1) {
        0.25
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// String algorithms
// ---------------------------------------------------------------------------

pub const DEFAULT_Q: usize = 2;
pub const DEFAULT_LCS_MIN_LEN: usize = 2;
pub const DEFAULT_LEN_SHORT: usize = 7;

const SW_MATCH: f64 = 5.0;
const SW_MISMATCH: f64 = -5.0;
const SW_GAP_START: f64 = -5.0;
const SW_GAP_CONTINUE: f64 = -1.0;

/// Approximate string similarity algorithms. Each returns a value in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum StringAlgorithm {
    Jaro,
    JaroWinkler,
    Levenshtein,
    DamerauLevenshtein,
    QGram { q: usize },
    Cosine { q: usize },
    SmithWaterman,
    LongestCommonSubstring { min_len: usize },
}

impl Default for StringAlgorithm {
    fn default() -> Self {
        Self::Levenshtein
    }
}

impl FromStr for StringAlgorithm {
    type Err = LinkError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "jaro" => Ok(Self::Jaro),
            "jarowinkler" | "jaro_winkler" | "jw" => Ok(Self::JaroWinkler),
            "levenshtein" => Ok(Self::Levenshtein),
            "dameraulevenshtein" | "damerau_levenshtein" | "dl" => Ok(Self::DamerauLevenshtein),
            "q_gram" | "qgram" => Ok(Self::QGram { q: DEFAULT_Q }),
            "cosine" => Ok(Self::Cosine { q: DEFAULT_Q }),
            "smith_waterman" | "smithwaterman" | "sw" => Ok(Self::SmithWaterman),
            "longest_common_substring" | "lcs" => Ok(Self::LongestCommonSubstring {
                min_len: DEFAULT_LCS_MIN_LEN,
            }),
            other => Err(LinkError::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for StringAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jaro => write!(f, "jaro"),
            Self::JaroWinkler => write!(f, "jaro_winkler"),
            Self::Levenshtein => write!(f, "levenshtein"),
            Self::DamerauLevenshtein => write!(f, "damerau_levenshtein"),
            Self::QGram { q } => write!(f, "qgram(q={q})"),
            Self::Cosine { q } => write!(f, "cosine(q={q})"),
            Self::SmithWaterman => write!(f, "smith_waterman"),
            Self::LongestCommonSubstring { min_len } => write!(f, "lcs(min_len={min_len})"),
        }
    }
}

impl StringAlgorithm {
    /// Resolve a configured method name plus optional per-variant parameters.
    ///
    /// Parameters that the chosen algorithm does not take are rejected rather
    /// than silently ignored.
    pub fn with_params(
        name: &str,
        q: Option<usize>,
        min_len: Option<usize>,
    ) -> Result<Self, LinkError> {
        let mut alg: Self = name.parse()?;
        match (&mut alg, q, min_len) {
            (_, None, None) => {}
            (Self::QGram { q: slot } | Self::Cosine { q: slot }, Some(q), None) => {
                if q == 0 {
                    return Err(LinkError::ConfigValidation(format!("{name}: q must be >= 1")));
                }
                *slot = q;
            }
            (Self::LongestCommonSubstring { min_len: slot }, None, Some(min_len)) => {
                if min_len == 0 {
                    return Err(LinkError::ConfigValidation(format!(
                        "{name}: min_len must be >= 1"
                    )));
                }
                *slot = min_len;
            }
            _ => {
                return Err(LinkError::ConfigValidation(format!(
                    "method '{name}' does not take the given parameters"
                )))
            }
        }
        Ok(alg)
    }

    /// Similarity of two strings under this algorithm, in [0, 1].
    pub fn similarity(&self, left: &str, right: &str) -> f64 {
        let a: Vec<char> = left.chars().collect();
        let b: Vec<char> = right.chars().collect();
        if a.is_empty() && b.is_empty() {
            return 1.0;
        }
        let sim = match *self {
            Self::Jaro => strsim::jaro(left, right),
            Self::JaroWinkler => strsim::jaro_winkler(left, right),
            Self::Levenshtein => strsim::normalized_levenshtein(left, right),
            Self::DamerauLevenshtein => strsim::normalized_damerau_levenshtein(left, right),
            Self::QGram { q } => qgram_overlap(left, right, q),
            Self::Cosine { q } => qgram_cosine(left, right, q),
            Self::SmithWaterman => smith_waterman(&a, &b),
            Self::LongestCommonSubstring { min_len } => lcs_dice(&a, &b, min_len),
        };
        sim.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Length-conditioned string comparator
// ---------------------------------------------------------------------------

/// Approximate string comparison with a separate policy for short strings.
///
/// When either string has at most `len_short` characters the short algorithm
/// and short threshold apply; otherwise the long ones do. A configured
/// threshold binarizes the output to exactly 0.0 or 1.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StringComparator {
    pub algorithm: StringAlgorithm,
    pub threshold: Option<f64>,
    pub short_algorithm: StringAlgorithm,
    pub short_threshold: Option<f64>,
    pub len_short: usize,
}

impl Default for StringComparator {
    fn default() -> Self {
        Self {
            algorithm: StringAlgorithm::Levenshtein,
            threshold: None,
            short_algorithm: StringAlgorithm::Levenshtein,
            short_threshold: None,
            len_short: DEFAULT_LEN_SHORT,
        }
    }
}

impl StringComparator {
    /// Same algorithm and threshold for short and long strings.
    pub fn uniform(algorithm: StringAlgorithm, threshold: Option<f64>) -> Self {
        Self {
            algorithm,
            threshold,
            short_algorithm: algorithm,
            short_threshold: threshold,
            len_short: DEFAULT_LEN_SHORT,
        }
    }

    pub fn is_short(&self, left: &str, right: &str) -> bool {
        left.chars().count() <= self.len_short || right.chars().count() <= self.len_short
    }

    pub fn compare(&self, left: &str, right: &str) -> f64 {
        let (alg, threshold) = if self.is_short(left, right) {
            (self.short_algorithm, self.short_threshold)
        } else {
            (self.algorithm, self.threshold)
        };
        binarize(alg.similarity(left, right), threshold)
    }
}

/// `value >= threshold` → 1.0, else 0.0. No threshold passes the value through.
pub fn binarize(value: f64, threshold: Option<f64>) -> f64 {
    match threshold {
        Some(t) if value >= t => 1.0,
        Some(_) => 0.0,
        None => value,
    }
}

// ---------------------------------------------------------------------------
// Token profiles (q-grams per word, padded with one space on each side)
// ---------------------------------------------------------------------------

fn qgram_profile(s: &str, q: usize) -> HashMap<String, usize> {
    let mut profile = HashMap::new();
    for word in s.split_whitespace() {
        let padded: Vec<char> = std::iter::once(' ')
            .chain(word.chars())
            .chain(std::iter::once(' '))
            .collect();
        if padded.len() <= q {
            *profile.entry(padded.iter().collect()).or_insert(0) += 1;
            continue;
        }
        for gram in padded.windows(q) {
            *profile.entry(gram.iter().collect()).or_insert(0) += 1;
        }
    }
    profile
}

/// Shared q-grams over the larger profile size.
fn qgram_overlap(left: &str, right: &str, q: usize) -> f64 {
    let a = qgram_profile(left, q);
    let b = qgram_profile(right, q);
    let a_total: usize = a.values().sum();
    let b_total: usize = b.values().sum();
    if a_total == 0 || b_total == 0 {
        return exact(left, right);
    }
    let shared: usize = a
        .iter()
        .map(|(gram, count)| (*count).min(b.get(gram).copied().unwrap_or(0)))
        .sum();
    shared as f64 / a_total.max(b_total) as f64
}

fn qgram_cosine(left: &str, right: &str, q: usize) -> f64 {
    let a = qgram_profile(left, q);
    let b = qgram_profile(right, q);
    let norm = |p: &HashMap<String, usize>| p.values().map(|c| (c * c) as f64).sum::<f64>().sqrt();
    let (na, nb) = (norm(&a), norm(&b));
    if na == 0.0 || nb == 0.0 {
        return exact(left, right);
    }
    let dot: usize = a
        .iter()
        .map(|(gram, count)| count * b.get(gram).copied().unwrap_or(0))
        .sum();
    dot as f64 / (na * nb)
}

// ---------------------------------------------------------------------------
// Alignment / substring
// ---------------------------------------------------------------------------

/// Local alignment with affine gaps, normalized by the mean length.
fn smith_waterman(a: &[char], b: &[char]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let cols = b.len() + 1;
    let mut h = vec![0.0f64; (a.len() + 1) * cols];
    let mut e = vec![f64::NEG_INFINITY; (a.len() + 1) * cols];
    let mut f = vec![f64::NEG_INFINITY; (a.len() + 1) * cols];
    let mut best = 0.0f64;

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let idx = i * cols + j;
            let score = if a[i - 1] == b[j - 1] { SW_MATCH } else { SW_MISMATCH };
            e[idx] = (h[idx - 1] + SW_GAP_START).max(e[idx - 1] + SW_GAP_CONTINUE);
            f[idx] = (h[idx - cols] + SW_GAP_START).max(f[idx - cols] + SW_GAP_CONTINUE);
            h[idx] = 0.0f64
                .max(h[idx - cols - 1] + score)
                .max(e[idx])
                .max(f[idx]);
            best = best.max(h[idx]);
        }
    }

    let mean_len = (a.len() + b.len()) as f64 / 2.0;
    best / (mean_len * SW_MATCH)
}

/// Earliest longest common substring: (start in a, start in b, length).
fn longest_common_substring(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            curr[j] = if a[i - 1] == b[j - 1] { prev[j - 1] + 1 } else { 0 };
            if curr[j] > best.2 {
                best = (i - curr[j], j - curr[j], curr[j]);
            }
        }
        std::mem::swap(&mut prev, &mut curr);
        curr.iter_mut().for_each(|c| *c = 0);
    }
    best
}

/// Repeatedly strip the longest common substring (at least `min_len` long)
/// from both strings and score the stripped total with a Dice normalization.
fn lcs_dice(a: &[char], b: &[char], min_len: usize) -> f64 {
    let denom = (a.len() + b.len()) as f64;
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    let mut total = 0usize;
    loop {
        let (ia, ib, len) = longest_common_substring(&a, &b);
        if len == 0 || len < min_len {
            break;
        }
        total += len;
        a.drain(ia..ia + len);
        b.drain(ib..ib + len);
    }
    2.0 * total as f64 / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn zip_partial_levels() {
        assert_eq!(zip_partial("10115", "10115"), 1.0);
        assert_eq!(zip_partial("10115", "10999"), 0.5);
        assert_eq!(zip_partial("10115", "19999"), 0.25);
        assert_eq!(zip_partial("10115", "80331"), 0.0);
        assert_eq!(zip_partial("", "10115"), 0.0);
    }

    #[test]
    fn zip_partial_masked_codes() {
        assert_eq!(zip_partial("10xxx", "10xxx"), 1.0);
        assert_eq!(zip_partial("10xxx", "10115"), 0.5);
    }

    #[test]
    fn exact_match() {
        assert_eq!(exact("BERLIN", "BERLIN"), 1.0);
        assert_eq!(exact("BERLIN", "Berlin"), 0.0);
    }

    #[test]
    fn levenshtein_values() {
        let lev = StringAlgorithm::Levenshtein;
        assert!(close(lev.similarity("ACME", "ACNE"), 0.75));
        assert_eq!(lev.similarity("ACME", "ACME"), 1.0);
        assert_eq!(lev.similarity("ABC", "XYZ"), 0.0);
    }

    #[test]
    fn damerau_counts_transposition_once() {
        let dl = StringAlgorithm::DamerauLevenshtein;
        let lev = StringAlgorithm::Levenshtein;
        // "CA" -> "AC" is one transposition but two substitutions.
        assert!(close(dl.similarity("CA", "AC"), 0.5));
        assert_eq!(lev.similarity("CA", "AC"), 0.0);
        // Unrestricted variant: CA -> ABC costs 2.
        assert!(close(dl.similarity("CA", "ABC"), 1.0 - 2.0 / 3.0));
    }

    #[test]
    fn jaro_classic_examples() {
        assert!(close(StringAlgorithm::Jaro.similarity("MARTHA", "MARHTA"), 0.944));
        assert!(close(StringAlgorithm::Jaro.similarity("DWAYNE", "DUANE"), 0.822));
        assert!(close(StringAlgorithm::JaroWinkler.similarity("MARTHA", "MARHTA"), 0.961));
        assert!(close(StringAlgorithm::JaroWinkler.similarity("DWAYNE", "DUANE"), 0.84));
    }

    #[test]
    fn jaro_winkler_no_boost_below_point_seven() {
        let j = StringAlgorithm::Jaro.similarity("ABCD", "AXYZ");
        assert!(j <= 0.7);
        assert_eq!(StringAlgorithm::JaroWinkler.similarity("ABCD", "AXYZ"), j);
    }

    #[test]
    fn edit_similarity_counts_chars_not_bytes() {
        let lev = StringAlgorithm::Levenshtein;
        assert!(close(lev.similarity("MÜLLER", "MULLER"), 1.0 - 1.0 / 6.0));
        assert!(close(StringAlgorithm::DamerauLevenshtein.similarity("BERLIN", "BERLN"), 1.0 - 1.0 / 6.0));
    }

    #[test]
    fn qgram_and_cosine() {
        let qg = StringAlgorithm::QGram { q: 2 };
        let cos = StringAlgorithm::Cosine { q: 2 };
        assert_eq!(qg.similarity("ACME GMBH", "ACME GMBH"), 1.0);
        assert!(close(cos.similarity("ACME GMBH", "GMBH ACME"), 1.0));
        assert!(qg.similarity("ACME", "ACNE") < 1.0);
        assert_eq!(qg.similarity("AB", "XY"), 0.0);
    }

    #[test]
    fn qgram_divides_by_larger_profile() {
        let qg = StringAlgorithm::QGram { q: 2 };
        // " ACME " has 5 bigrams, "ACME GMBH" has 10; all 5 are shared.
        assert_eq!(qg.similarity("ACME", "ACME GMBH"), 0.5);
        assert_eq!(qg.similarity("ACME GMBH", "ACME"), 0.5);
    }

    #[test]
    fn smith_waterman_local_alignment() {
        let sw = StringAlgorithm::SmithWaterman;
        assert!(close(sw.similarity("ACME", "ACME"), 1.0));
        // Shared "ACME" inside a longer string: 20 / (mean(4, 9) * 5)
        assert!(close(sw.similarity("ACME", "ACME GMBH"), 20.0 / 32.5));
        assert_eq!(sw.similarity("ABC", "XYZ"), 0.0);
    }

    #[test]
    fn lcs_strips_repeatedly() {
        let lcs = StringAlgorithm::LongestCommonSubstring { min_len: 2 };
        assert_eq!(lcs.similarity("ACME GMBH", "ACME GMBH"), 1.0);
        // "GMBH" then "ACME" are both found despite the order swap.
        assert!(close(lcs.similarity("ACMEGMBH", "GMBHACME"), 1.0));
        assert_eq!(lcs.similarity("AB", "BA"), 0.0);
    }

    #[test]
    fn parse_aliases() {
        assert_eq!("jw".parse::<StringAlgorithm>().unwrap(), StringAlgorithm::JaroWinkler);
        assert_eq!("jarowinkler".parse::<StringAlgorithm>().unwrap(), StringAlgorithm::JaroWinkler);
        assert_eq!("dl".parse::<StringAlgorithm>().unwrap(), StringAlgorithm::DamerauLevenshtein);
        assert_eq!(
            "lcs".parse::<StringAlgorithm>().unwrap(),
            StringAlgorithm::LongestCommonSubstring { min_len: 2 }
        );
        let err = "soundex".parse::<StringAlgorithm>().unwrap_err();
        assert!(matches!(err, LinkError::UnknownAlgorithm(ref n) if n == "soundex"));
    }

    #[test]
    fn with_params_validates() {
        assert_eq!(
            StringAlgorithm::with_params("qgram", Some(3), None).unwrap(),
            StringAlgorithm::QGram { q: 3 }
        );
        assert!(StringAlgorithm::with_params("qgram", Some(0), None).is_err());
        assert!(StringAlgorithm::with_params("jaro", Some(3), None).is_err());
        assert_eq!(
            StringAlgorithm::with_params("lcs", None, Some(3)).unwrap(),
            StringAlgorithm::LongestCommonSubstring { min_len: 3 }
        );
    }

    #[test]
    fn binarize_thresholds() {
        assert_eq!(binarize(0.95, Some(0.95)), 1.0);
        assert_eq!(binarize(0.949, Some(0.95)), 0.0);
        assert_eq!(binarize(0.42, None), 0.42);
    }

    #[test]
    fn short_policy_applies_at_cutoff() {
        // Levenshtein rejects both pairs at 0.9; Jaro-Winkler accepts both.
        let cmp = StringComparator {
            algorithm: StringAlgorithm::JaroWinkler,
            threshold: Some(0.9),
            short_algorithm: StringAlgorithm::Levenshtein,
            short_threshold: Some(0.9),
            len_short: 7,
        };
        // len == cutoff -> short (levenshtein 6/7)
        assert_eq!(cmp.compare("ABCDEFG", "ABCDEFX"), 0.0);
        // len == cutoff + 1 -> long (jaro-winkler 0.95)
        assert_eq!(cmp.compare("ABCDEFGH", "ABCDEFGX"), 1.0);
    }

    #[test]
    fn short_policy_when_only_one_side_short() {
        let cmp = StringComparator {
            len_short: 3,
            ..StringComparator::default()
        };
        assert!(cmp.is_short("ABC", "ABCDEFGHIJ"));
        assert!(!cmp.is_short("ABCD", "ABCDEFGHIJ"));
    }

    #[test]
    fn comparator_dispatch() {
        assert_eq!(Comparator::Exact.compare("BY", "BY"), 1.0);
        assert_eq!(Comparator::ZipPartial.compare("80331", "80999"), 0.5);
        let s = Comparator::String(StringComparator::uniform(StringAlgorithm::Jaro, Some(0.99)));
        assert_eq!(s.compare("ACME", "ACNE"), 0.0);
    }
}
