//! Embedded audio tags as match records.

pub mod lofty_reader;

pub use lofty_reader::LoftyTagReader;

use crate::error::Error;
use crate::matcher::MediaRecord;
use crate::normalize::Normalizer;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

pub const TITLE: &str = "title";
pub const TRACK_NUMBER: &str = "tracknumber";
pub const DISC_NUMBER: &str = "discnumber";

lazy_static! {
    static ref FIRST_DIGITS: Regex = Regex::new(r"\d+").unwrap();
    static ref LEADING_DIGITS: Regex = Regex::new(r"^\s*(\d+)").unwrap();
}

/// Tag name (lowercase) to first value.
pub type TagMap = HashMap<String, String>;

pub trait TagReader: Send + Sync {
    fn read_tags(&self, path: &Path) -> Result<TagMap, Error>;
}

/// Why a readable file is left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSkip {
    MissingTags,
    EmptyTitle,
}

impl fmt::Display for TagSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagSkip::MissingTags => write!(f, "missing title, track or disc tag"),
            TagSkip::EmptyTitle => write!(f, "title empty after cleanup"),
        }
    }
}

/// Build the record a track is renamed after. `track`/`disc` are accepted
/// as aliases.
pub fn track_record(tags: &TagMap, normalizer: &Normalizer) -> Result<MediaRecord, TagSkip> {
    let raw_title = first_present(tags, &[TITLE]);
    let raw_track = first_present(tags, &[TRACK_NUMBER, "track"]);
    let raw_disc = first_present(tags, &[DISC_NUMBER, "disc"]);

    let (Some(raw_title), Some(raw_track), Some(raw_disc)) = (raw_title, raw_track, raw_disc) else {
        return Err(TagSkip::MissingTags);
    };

    let title = clean_tag_value(raw_title);
    if title.is_empty() {
        return Err(TagSkip::EmptyTitle);
    }

    Ok(MediaRecord::new(track_number(raw_track), &title, normalizer)
        .with_disc_number(disc_number(raw_disc)))
}

fn first_present<'a>(tags: &'a TagMap, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| tags.get(*key))
        .map(String::as_str)
        .find(|value| !value.trim().is_empty())
}

/// First run of digits (`"1/2"` is disc 1, `"CD 12"` is disc 12), 0 if none.
pub fn disc_number(raw: &str) -> u32 {
    FIRST_DIGITS
        .find(raw)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Leading digits (`"07/12"` is 7), 0 if the value does not start with one.
pub fn track_number(raw: &str) -> u32 {
    LEADING_DIGITS
        .captures(raw)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

/// Make a tag value safe to use in a filename: undo UTF-8 read as
/// Latin-1/Windows-1252, compose to NFC, drop control characters and
/// `<>:"/\|?*`, trim.
pub fn clean_tag_value(raw: &str) -> String {
    repair_mojibake(raw)
        .nfc()
        .filter(|c| !c.is_control() && !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect::<String>()
        .trim()
        .to_string()
}

const CP1252_HIGH: &[(char, u8)] = &[
    ('€', 0x80),
    ('‚', 0x82),
    ('ƒ', 0x83),
    ('„', 0x84),
    ('…', 0x85),
    ('†', 0x86),
    ('‡', 0x87),
    ('ˆ', 0x88),
    ('‰', 0x89),
    ('Š', 0x8A),
    ('‹', 0x8B),
    ('Œ', 0x8C),
    ('Ž', 0x8E),
    ('‘', 0x91),
    ('’', 0x92),
    ('“', 0x93),
    ('”', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('˜', 0x98),
    ('™', 0x99),
    ('š', 0x9A),
    ('›', 0x9B),
    ('œ', 0x9C),
    ('ž', 0x9E),
    ('Ÿ', 0x9F),
];

fn repair_mojibake(s: &str) -> String {
    if !s.contains(['Ã', 'Â']) {
        return s.to_string();
    }

    let bytes: Option<Vec<u8>> = s
        .chars()
        .map(|c| match u8::try_from(u32::from(c)) {
            Ok(byte) => Some(byte),
            Err(_) => CP1252_HIGH
                .iter()
                .find(|(from, _)| *from == c)
                .map(|(_, byte)| *byte),
        })
        .collect();

    bytes
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| s.to_string())
}
