//! Comparison keys for filenames and catalog titles.
//!
//! Both sides of a match go through the same pipeline so that
//! `Show.S01E03.Der.Bär.mkv` and the catalog title `Der Bär` end up as
//! plain lowercase ASCII tokens that an edit-distance ratio can compare.

use crate::config::{recognized_extension, ExtensionSet};
use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref SEASON_EPISODE: Regex = Regex::new(r"(?i)s\d{1,2}e\d{1,2}").unwrap();
    static ref NON_KEY_CHARS: Regex = Regex::new(r"[^a-z0-9.]+").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Case-sensitive, applied before lowercasing.
const DIGRAPHS: &[(char, &str)] = &[
    ('ä', "ae"),
    ('ö', "oe"),
    ('ü', "ue"),
    ('ß', "ss"),
    ('Ä', "Ae"),
    ('Ö', "Oe"),
    ('Ü', "Ue"),
];

/// Characters a filename may not carry on any of the platforms we rename on.
const HOSTILE_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Maps raw names to comparison keys. Holds the extension set used to strip a
/// trailing media extension from filenames.
#[derive(Debug, Clone)]
pub struct Normalizer {
    extensions: ExtensionSet,
}

impl Normalizer {
    pub fn new(extensions: ExtensionSet) -> Self {
        Self { extensions }
    }

    pub fn extensions(&self) -> &ExtensionSet {
        &self.extensions
    }

    /// Never fails. Re-normalizing a key as a title (`is_filename = false`)
    /// returns the key unchanged.
    pub fn normalize(&self, raw: &str, is_filename: bool) -> String {
        let mut s = raw;
        if is_filename {
            if let Some(dot) = recognized_extension(raw, &self.extensions) {
                s = &raw[..dot];
            }
        }

        let s = SEASON_EPISODE.replace_all(s, " ");
        let s = strip_accents(&s);
        let s = expand_digraphs(&s);
        let s = s.to_lowercase();
        let s = NON_KEY_CHARS.replace_all(&s, " ");
        let key = collapse_whitespace(&s);

        // Decomposition can surface markers step two could not see
        // (full-width digits, combining marks inside `S01E02`).
        if SEASON_EPISODE.is_match(&key) {
            collapse_whitespace(&SEASON_EPISODE.replace_all(&key, " "))
        } else {
            key
        }
    }
}

fn strip_accents(s: &str) -> String {
    s.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

fn expand_digraphs(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match DIGRAPHS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => out.push_str(to),
            None => out.push(c),
        }
    }
    out
}

fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Strip characters that are not allowed in filenames (and control
/// characters), then trim.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control() && !HOSTILE_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediaKindConfig;

    fn normalizer() -> Normalizer {
        Normalizer::new(MediaKindConfig::video().extension_set())
    }

    #[test]
    fn test_strips_extension_and_markers() {
        let n = normalizer();
        assert_eq!(n.normalize("Show.S01E02.mkv", true), "show.");
        assert_eq!(n.normalize("Show - Pilot.mkv", true), "show pilot");
        assert_eq!(n.normalize("show s1e2 the end.MP4", true), "show the end");
        // The extension is cut at its dot even when lowercasing changes its length.
        assert_eq!(n.normalize("Pilot.m\u{212A}v", true), "pilot");
    }

    #[test]
    fn test_extension_kept_for_titles_and_unknown_extensions() {
        let n = normalizer();
        assert_eq!(n.normalize("Pilot.mkv", false), "pilot.mkv");
        assert_eq!(n.normalize("Pilot.txt", true), "pilot.txt");
    }

    #[test]
    fn test_accents_and_digraphs() {
        let n = normalizer();
        // Umlauts decompose before the digraph table sees them; ß does not.
        assert_eq!(n.normalize("Der Bär", false), "der bar");
        assert_eq!(n.normalize("Straße", false), "strasse");
        assert_eq!(n.normalize("Café Olé", false), "cafe ole");
    }

    #[test]
    fn test_punctuation_collapses_to_single_spaces() {
        let n = normalizer();
        assert_eq!(n.normalize("  A -- B!!  (C) ", false), "a b c");
        assert_eq!(n.normalize("", false), "");
        assert_eq!(n.normalize("!!!", false), "");
    }

    #[test]
    fn test_idempotent() {
        let n = normalizer();
        let samples = [
            "Show.S01E02.mkv",
            "Der Bär — Teil 2",
            "Ｓ０１Ｅ０２ Full Width",
            "S1\u{301}E2 combining",
            "Straße nach Ödland",
            "ﬁnal ﬂight",
            "a.b..c",
            "\u{0}\u{7}control",
        ];
        for raw in samples {
            for is_filename in [true, false] {
                let once = n.normalize(raw, is_filename);
                assert_eq!(n.normalize(&once, false), once, "input {:?}", raw);
            }
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename(" What? Now: \"Yes\" <1/2> | * \\ "), "What Now Yes 12");
        assert_eq!(sanitize_filename("Tab\there\u{7}"), "Tabhere");
        assert_eq!(sanitize_filename("Plain"), "Plain");
    }
}
