// Text normalization ahead of vectorization.
//
// The filters run in a fixed order: lower-case, strip markup tags, turn
// punctuation into spaces, collapse whitespace, strip digits, split, and drop
// English stop words (the short NLTK list, so content words such as "new"
// or "state" survive). Output tokens contain none of the stripped material, so
// feeding them back through `normalize` is a no-op.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex_lite::Regex;
use stop_words::{get, LANGUAGE};

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<([^>]+)>").expect("valid tag regex"))
}

fn punct_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r##"[!"#$%&'()*+,\-./:;<=>?@\[\\\]^_`{|}~]+"##).expect("valid punctuation regex")
    })
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

fn numeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+").expect("valid numeric regex"))
}

fn stop_words() -> &'static HashSet<String> {
    static WORDS: OnceLock<HashSet<String>> = OnceLock::new();
    WORDS.get_or_init(|| get(LANGUAGE::English).into_iter().collect())
}

/// Whether `word` (already lower-cased) is an English stop word.
pub fn is_stop_word(word: &str) -> bool {
    stop_words().contains(word)
}

/// Normalize a document into similarity tokens.
pub fn normalize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let untagged = tag_re().replace_all(&lowered, "");
    let unpunctuated = punct_re().replace_all(&untagged, " ");
    let collapsed = whitespace_re().replace_all(&unpunctuated, " ");
    let stripped = numeric_re().replace_all(&collapsed, "");

    stripped
        .split_whitespace()
        .filter(|token| !is_stop_word(token))
        .map(str::to_string)
        .collect()
}
