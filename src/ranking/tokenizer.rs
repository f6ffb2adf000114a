use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn re_word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+").unwrap())
}

fn re_camel_part() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\p{Lu}+[\p{Ll}\p{N}]*|\p{Ll}[\p{Ll}\p{N}]*|\p{N}+").unwrap())
}

fn re_url() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b[a-z][a-z0-9+.-]*://\S*").unwrap())
}

/// Replaces every URL in `text` with a single space
pub fn filter_urls(text: &str) -> String {
    re_url().replace_all(text, " ").into_owned()
}

/// Lower-cased word tokens of `text`
///
/// Mixed-case words also contribute their camel-case parts, so
/// `NewReader` yields `newreader`, `new` and `reader`.
pub fn tokenize(text: &str) -> HashSet<String> {
    let mut tokens = HashSet::new();
    append_tokens(&mut tokens, text);
    tokens
}

/// Adds the tokens of `text` to `tokens`
pub fn append_tokens(tokens: &mut HashSet<String>, text: &str) {
    for word in re_word().find_iter(text) {
        let word = word.as_str();
        tokens.insert(word.to_lowercase());

        let has_lower = word.chars().any(char::is_lowercase);
        let has_upper = word.chars().any(char::is_uppercase);
        if has_lower && has_upper {
            for part in re_camel_part().find_iter(word) {
                tokens.insert(part.as_str().to_lowercase());
            }
        }
    }
}
