use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

/// One sentence-like slice of the story, addressed by its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub index: usize,
    pub text: String,
}

static WORD_CHAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w").unwrap());
static BRACKETS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[()\[\]{}]").unwrap());

const TOKEN_SEPARATORS: [char; 6] = [' ', '\t', '\n', '\r', '\u{0B}', '\u{0C}'];

/// Splits text on line breaks and periods into trimmed, non-blank segments.
pub fn split_into_sentences(text: &str) -> Vec<Segment> {
    let segments: Vec<Segment> = text
        .split(['\n', '.'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(index, s)| Segment {
            index,
            text: s.to_string(),
        })
        .collect();

    if segments.is_empty() {
        warn!("No speakable sentences found in text");
    }
    segments
}

/// Splits a transcript into the words an aligner is expected to time.
///
/// Fragments without a single word character (stray punctuation, dashes)
/// are dropped since the aligner never emits an entry for them.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(TOKEN_SEPARATORS)
        .filter(|t| !t.is_empty() && WORD_CHAR.is_match(t))
        .map(str::to_string)
        .collect()
}

/// Rewrites a token into the form the aligner's dictionary lookup accepts.
pub fn normalize_token(token: &str) -> String {
    BRACKETS
        .replace_all(token.trim_matches('*'), "")
        .replace('*', "_")
}

/// The transcript actually handed to the aligner for `tokens`.
pub fn aligner_transcript(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|t| normalize_token(t))
        .collect::<Vec<_>>()
        .join(" ")
}
