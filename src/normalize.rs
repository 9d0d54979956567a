//! Company name normalization
//!
//! Produces the canonical lookup key used for joining and grouping company
//! names across the reference export and the scraped hit table. Handles:
//! - Case and whitespace variations: "ACME GmbH " vs "acme gmbh"
//! - Legal-entity suffixes: GmbH, GmbH & Co. KG, AG, Ltd, Inc, ...
//! - The "Anzeige" listing badge the scraper occasionally captures next to
//!   the company name
//! - The degree symbol in names like "Kälte³60°" (spelled out as "grad")
//!
//! Also provides the edit distance used by the dedup grouper.

/// Interface chrome captured alongside some scraped names.
const SCRAPE_ARTIFACT: &str = "Anzeige";

/// Legal-entity suffixes stripped during normalization.
/// Order matters - longer/more specific patterns come first so that
/// "gmbh & co kg" wins over "kg".
const LEGAL_SUFFIXES: &[&str] = &[
    "gmbh & co. kgaa",
    "gmbh & co kgaa",
    "gmbh & co. kg",
    "gmbh & co kg",
    "gmbh + co. kg",
    "gmbh + co kg",
    "se & co. kg",
    "se & co kg",
    "ag & co. kg",
    "ag & co kg",
    "ug (haftungsbeschränkt)",
    "ug (haftungsbeschrankt)",
    "ges.m.b.h.",
    "gesellschaft mbh",
    "gmbh",
    "mbh",
    "kgaa",
    "ag",
    "kg",
    "ug",
    "se",
    "ohg",
    "gbr",
    "e.k.",
    "e. k.",
    "e.v.",
    "ltd.",
    "ltd",
    "limited",
    "llc",
    "inc.",
    "inc",
    "corp.",
    "corp",
    "co.",
    "plc",
    "s.a.",
    "b.v.",
    "bv",
    "nv",
];

/// Normalize a raw company name into its canonical lookup key.
///
/// Steps, in order: trim; drop the scraping artifact; lower-case; strip one
/// trailing legal-entity suffix; strip trailing "&"/"+" and punctuation;
/// spell out the degree symbol. Pure and deterministic; idempotent for
/// inputs already in output form.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let without_artifact = trimmed.replace(SCRAPE_ARTIFACT, "");
    let mut result = without_artifact.trim().to_lowercase();

    result = strip_legal_suffix(&result);

    // Orphaned connectives left behind by suffix stripping, plus stray
    // trailing punctuation.
    result = result
        .trim_end_matches(['&', '+', ',', '.', ' '])
        .to_string();

    result = result.replace('°', " grad");

    collapse_whitespace(&result)
}

/// Strip a single trailing legal-entity suffix, end-anchored.
///
/// The suffix must be preceded by a comma or whitespace so that e.g.
/// "verlag" is not truncated by the "ag" pattern. Applied at most once.
fn strip_legal_suffix(name: &str) -> String {
    for suffix in LEGAL_SUFFIXES {
        let patterns = [format!(", {}", suffix), format!(" {}", suffix)];
        for pattern in &patterns {
            if name.ends_with(pattern.as_str()) {
                let end = name.len() - pattern.len();
                return name[..end].trim_end().to_string();
            }
        }
    }
    name.to_string()
}

/// Collapse runs of whitespace into single spaces and trim.
fn collapse_whitespace(name: &str) -> String {
    name.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Edit distance between two strings, computed per char.
pub fn levenshtein(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();

    let len1 = s1_chars.len();
    let len2 = s2_chars.len();

    if len1 == 0 {
        return len2;
    }
    if len2 == 0 {
        return len1;
    }

    let mut matrix = vec![vec![0usize; len2 + 1]; len1 + 1];

    for i in 0..=len1 {
        matrix[i][0] = i;
    }
    for j in 0..=len2 {
        matrix[0][j] = j;
    }

    for i in 1..=len1 {
        for j in 1..=len2 {
            let cost = if s1_chars[i - 1] == s2_chars[j - 1] { 0 } else { 1 };

            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }

    matrix[len1][len2]
}
