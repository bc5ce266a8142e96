use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Rewrites words that should not be spoken or shown as-is.
///
/// Implementations must replace whole words only, so that the text still
/// tokenizes into the same number of whitespace-separated pieces.
pub trait Redactor: Send + Sync {
    fn redact(&self, text: &str) -> String;
}

pub struct NoOpRedactor;

impl Redactor for NoOpRedactor {
    fn redact(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Case-insensitive whole-word replacement from a fixed table.
pub struct WordMapRedactor {
    mappings: HashMap<String, String>,
}

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").unwrap());

impl WordMapRedactor {
    pub fn new<I, K, V>(mappings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            mappings: mappings
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_lowercase(), v.into()))
                .collect(),
        }
    }
}

impl Redactor for WordMapRedactor {
    fn redact(&self, text: &str) -> String {
        WORD.replace_all(text, |caps: &Captures| {
            let word = &caps[0];
            match self.mappings.get(&word.to_lowercase()) {
                Some(replacement) => replacement.clone(),
                None => word.to_string(),
            }
        })
        .into_owned()
    }
}

/// The built-in table of sensitive words and their spoken stand-ins.
pub fn default_mappings() -> Vec<(String, String)> {
    [
        ("kill", "person-delete"),
        ("killed", "person-deleted"),
        ("murder", "person-delete"),
        ("murdered", "person-deleted"),
        ("suicide", "self-delete"),
        ("suicided", "self-deleted"),
        ("death", "life-delete"),
        ("die", "life-delete"),
        ("died", "life-deleted"),
        ("sex", "tiranosaurus-seggs"),
        ("sexual", "seggsual"),
        ("sexually", "seggsually"),
        ("sexualize", "seggsualize"),
        ("sexualized", "seggsualized"),
        ("rape", "grape"),
        ("raped", "graped"),
        ("assault", "as-salt"),
        ("assaulted", "as-salted"),
        ("lesbian", "raibow-flag"),
        ("homosexual", "hormone-seggsual"),
        ("gay", "raibow-flag"),
        ("trans", "trains"),
        ("transexual", "train-seggsual"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
