//! Query preprocessing for the text-search path.
//!
//! Two modes: raw passthrough, and keyword extraction that strips
//! stop words and query filler so BM25 ranks identifiers instead of
//! prose. Keyword extraction runs before every text search.

/// How a query string is prepared before text search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Pass the query through untouched.
    Raw,
    /// Extract search keywords: lowercase, split on punctuation (keeping
    /// hyphenated terms), drop stop words and short tokens, dedupe, cap.
    Keywords,
}

/// Maximum keywords kept after extraction.
const MAX_KEYWORDS: usize = 12;

/// Minimum token length kept after extraction.
const MIN_TOKEN_LEN: usize = 3;

/// Closed stop-word list: English function words plus the filler verbs
/// agents tend to put in front of identifier queries.
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "if", "then", "else", "when", "where", "how", "what",
    "which", "who", "why", "is", "are", "was", "were", "be", "been", "being", "do", "does", "did",
    "in", "on", "at", "to", "for", "of", "with", "by", "from", "as", "that", "this", "these",
    "those", "it", "its", "can", "could", "should", "would", "will", "may", "might", "must", "not",
    "no", "all", "any", "some", "there", "here", "about", "into", "over", "under", "out", "also",
    "very", "just", "than", "too", "show", "find", "list", "get", "me", "my", "our", "your", "you",
    "we", "i", "please", "want", "need", "like", "look", "see", "used", "use", "uses", "using",
];

/// Normalize a free-text query according to `mode`.
pub fn preprocess(query: &str, mode: QueryMode) -> String {
    match mode {
        QueryMode::Raw => query.to_string(),
        QueryMode::Keywords => extract_keywords(query),
    }
}

fn extract_keywords(query: &str) -> String {
    let lowered = query.to_lowercase();

    let mut keywords: Vec<String> = Vec::new();
    for raw in lowered.split(|c: char| !(c.is_alphanumeric() || c == '-')) {
        let token = raw.trim_matches('-');
        if token.len() < MIN_TOKEN_LEN {
            continue;
        }
        if STOP_WORDS.contains(&token) {
            continue;
        }
        if keywords.iter().any(|k| k == token) {
            continue;
        }
        keywords.push(token.to_string());
        if keywords.len() == MAX_KEYWORDS {
            break;
        }
    }

    keywords.join(" ")
}
