//! Readme text extraction
//!
//! Packages without package-level docs fall back to their readme for a
//! synopsis. Markdown readmes are flattened to plain text first.

use regex::Regex;
use std::sync::OnceLock;

/// Sentences starting with these (case-insensitively) are not synopses
const ILLEGAL_PREFIXES: &[&str] = &["copyright", "all rights", "author"];

fn re_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*(```|~~~).*$").unwrap())
}

fn re_image() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!\[([^\[\]]*)\](\([^)]*\)|\[[^\]]*\])").unwrap())
}

/// Inline or reference link; the text may hold one level of brackets
fn re_link() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[((?:[^\[\]]|\[[^\[\]]*\])*)\](\([^)]*\)|\[[^\]]*\])").unwrap())
}

fn re_link_definition() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*\[[^\]]+\]:\s*\S+.*$").unwrap())
}

fn re_html_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"</?[A-Za-z][^>]*>").unwrap())
}

fn re_line_marker() -> &'static Regex {
    // headings, quotes, bullets, numbered items, rules
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*(#{1,6}[ \t]*|>[ \t]?|[-*+][ \t]+|\d+\.[ \t]+|([-*_=][ \t]*){3,}$)")
            .unwrap()
    })
}

fn re_emphasis() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\*\*|__|\*|`)").unwrap())
}

/// Converts a readme body to plain text
///
/// Files named `*.md`, `*.markdown` or `*.mkd` (any case) are treated as
/// markdown and stripped of markup; anything else is returned unchanged.
pub fn readme_to_text(file_name: &str, data: &str) -> String {
    let lower = file_name.to_lowercase();
    let is_markdown = [".md", ".markdown", ".mkd"]
        .iter()
        .any(|ext| lower.ends_with(ext));
    if !is_markdown {
        return data.to_string();
    }

    let text = re_fence().replace_all(data, "");
    let text = re_link_definition().replace_all(&text, "");
    let mut text = text.into_owned();
    // Images inside links ("badges") need a second pass
    loop {
        let next = re_image().replace_all(&text, "$1");
        let next = re_link().replace_all(&next, "$1").into_owned();
        if next == text {
            break;
        }
        text = next;
    }
    let text = re_html_tag().replace_all(&text, "");
    let text = re_line_marker().replace_all(&text, "");
    let text = re_emphasis().replace_all(&text, "");

    text.trim().to_string()
}

/// Byte length of the first sentence of `text`
///
/// A sentence ends at a period followed by whitespace, unless the period
/// follows a single capital letter (an initial, as in "J. Doe"). Ideographic
/// full stops end a sentence unconditionally.
fn first_sentence_len(text: &str) -> usize {
    let (mut ppp, mut pp, mut p) = (' ', ' ', ' ');
    for (i, c) in text.char_indices() {
        let q = if c.is_whitespace() { ' ' } else { c };
        if q == ' ' && p == '.' && (!pp.is_uppercase() || ppp.is_uppercase()) {
            return i;
        }
        if p == '。' || p == '．' {
            return i;
        }
        (ppp, pp, p) = (pp, p, q);
    }
    text.len()
}

/// Extracts a one-line synopsis: the first sentence with whitespace collapsed
///
/// Returns an empty string when the sentence looks like a copyright or
/// authorship notice.
pub fn synopsis(text: &str) -> String {
    let sentence = &text[..first_sentence_len(text)];
    let cleaned = sentence.split_whitespace().collect::<Vec<_>>().join(" ");

    let lower = cleaned.to_lowercase();
    if ILLEGAL_PREFIXES.iter().any(|prefix| lower.starts_with(prefix)) {
        return String::new();
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_readme_untouched() {
        let data = "# Not markdown\n*really*";
        assert_eq!(readme_to_text("README", data), data);
        assert_eq!(readme_to_text("README.txt", data), data);
    }

    #[test]
    fn test_markdown_stripped() {
        let data = "# Foo\n\nFoo is a **fast** [parser](http://x.example) for `bar`.\n\n\
                    ![badge](http://ci.example/badge.png)\n\n- item one\n";
        let text = readme_to_text("README.md", data);
        assert!(text.starts_with("Foo\n\nFoo is a fast parser for bar."));
        assert!(text.contains("badge"));
        assert!(text.contains("item one"));
        assert!(!text.contains("http://"));
        assert!(!text.contains('#'));
    }

    #[test]
    fn test_reference_style_and_nested_links() {
        let data = "[![build](https://ci.example/badge.svg)][ci] ![logo][logo-ref]\n\n\
                    See [the [v2] docs](https://docs.example).\n\n\
                    [ci]: https://ci.example\n[logo-ref]: https://img.example/logo.png\n";
        let text = readme_to_text("README.md", data);
        assert_eq!(text, "build logo\n\nSee the [v2] docs.");
    }

    #[test]
    fn test_markdown_extensions_case_insensitive() {
        assert_eq!(readme_to_text("README.MARKDOWN", "**x**"), "x");
        assert_eq!(readme_to_text("readme.mkd", "**x**"), "x");
    }

    #[test]
    fn test_code_fence_markers_removed() {
        let text = readme_to_text("README.md", "Intro.\n```go\nfmt.Println()\n```\n");
        assert!(!text.contains("```"));
        assert!(text.contains("fmt.Println()"));
    }

    #[test]
    fn test_synopsis_first_sentence() {
        assert_eq!(
            synopsis("Package foo parses bar. It also does baz."),
            "Package foo parses bar."
        );
        assert_eq!(synopsis("No period at all"), "No period at all");
        assert_eq!(synopsis(""), "");
    }

    #[test]
    fn test_synopsis_collapses_whitespace() {
        assert_eq!(synopsis("  Foo\n   does\tthings.\nMore."), "Foo does things.");
    }

    #[test]
    fn test_synopsis_keeps_initials() {
        assert_eq!(
            synopsis("Written by J. Doe in Go. Second."),
            "Written by J. Doe in Go."
        );
    }

    #[test]
    fn test_synopsis_ideographic_stop() {
        assert_eq!(synopsis("中文介绍。更多"), "中文介绍。");
    }

    #[test]
    fn test_synopsis_illegal_prefixes() {
        assert_eq!(synopsis("Copyright 2013 The Authors. All good."), "");
        assert_eq!(synopsis("All rights reserved."), "");
        assert_eq!(synopsis("Author: someone."), "");
        assert_eq!(synopsis("Authentic parser."), "Authentic parser.");
    }
}
