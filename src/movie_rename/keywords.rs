//! Removal of release metadata tokens from cleaned titles.

use regex::Regex;

use anyhow::{Context, Result};

use crate::movie_rename::clean::{CleanRules, collapse_whitespace};

const RESOLUTION_TAGS: &[&str] = &["2160p", "1080p", "720p", "480p", "4K", "UHD", "10bit", "8bit", "HDR"];

const CODEC_TAGS: &[&str] = &[
    "x264", "x265", "H264", "H 264", "H265", "HEVC", "AVC", "AV1", "XviD", "mp4", "mkv", "avi",
];

const SOURCE_TAGS: &[&str] = &[
    "BluRay", "WEBRip", "WEB-DL", "HDRip", "BRRip", "DVDRip", "HDTV", "NF", "AMZN", "ZEE5",
];

const GROUP_TAGS: &[&str] = &[
    "YIFY", "RARBG", "PSA", "BONE", "AV1Saon", "Saon", "Pahe in", "YTS AM", "YTS MX", "AA",
];

const AUDIO_TAGS: &[&str] = &["AAC", "AAC5.1", "DD5.1", "DDP5.1", "DDP5 1", "8CH", "6CH", "CH", "Atmos"];

const LANGUAGE_TAGS: &[&str] = &["Korean", "HIN", "KAN", "MAL", "Dual Audio"];

const EDITORIAL_TAGS: &[&str] = &["EXTENDED", "PROPER", "REMASTERED", "IMAX", "UNRATED", "REPACK"];

/// Default keyword set: resolution, codec, source, group, audio, language and editorial tags.
#[must_use]
pub fn default_keywords() -> Vec<String> {
    [
        RESOLUTION_TAGS,
        CODEC_TAGS,
        SOURCE_TAGS,
        GROUP_TAGS,
        AUDIO_TAGS,
        LANGUAGE_TAGS,
        EDITORIAL_TAGS,
    ]
    .concat()
    .into_iter()
    .map(ToString::to_string)
    .collect()
}

/// Case-insensitive whole word keyword remover.
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    patterns: Vec<(String, Regex)>,
}

impl KeywordFilter {
    /// Compile the given keywords.
    ///
    /// Each keyword goes through the same separator normalization as titles,
    /// so `WEB-DL` still matches once hyphens have become spaces.
    /// Longer keywords are applied first so a multi-word tag is removed before
    /// a shorter tag contained in it. Keywords of equal length keep their configured order.
    ///
    /// # Errors
    /// Returns an error if a keyword pattern fails to compile.
    pub fn new(keywords: &[String], rules: &CleanRules) -> Result<Self> {
        let mut normalized: Vec<String> = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            let keyword = rules.clean(keyword);
            if !keyword.is_empty() && !normalized.iter().any(|k| k.eq_ignore_ascii_case(&keyword)) {
                normalized.push(keyword);
            }
        }
        normalized.sort_by_key(|keyword| std::cmp::Reverse(keyword.chars().count()));

        let patterns = normalized
            .into_iter()
            .map(|keyword| {
                let regex = Regex::new(&whole_word_pattern(&keyword))
                    .with_context(|| format!("Invalid keyword: '{keyword}'"))?;
                Ok((keyword, regex))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Remove every whole word keyword match and re-collapse whitespace.
    #[must_use]
    pub fn filter(&self, title: &str) -> String {
        let mut name = title.to_string();
        for (_, regex) in &self.patterns {
            if regex.is_match(&name) {
                name = regex.replace_all(&name, " ").to_string();
            }
        }
        collapse_whitespace(&name)
    }

    /// Check if the title contains any keyword as a whole word.
    #[must_use]
    pub fn contains_keyword(&self, title: &str) -> bool {
        self.patterns.iter().any(|(_, regex)| regex.is_match(title))
    }

    /// Normalized keywords in the order they are applied.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|(keyword, _)| keyword.as_str())
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.patterns.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Build a case-insensitive pattern with word boundaries on the sides that start or end with a word character.
fn whole_word_pattern(keyword: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let start = if keyword.starts_with(is_word) { r"\b" } else { "" };
    let end = if keyword.ends_with(is_word) { r"\b" } else { "" };
    format!("(?i){start}{}{end}", regex::escape(keyword))
}

#[cfg(test)]
mod keyword_filter_tests {
    use super::*;

    fn filter_with(keywords: &[&str]) -> KeywordFilter {
        let keywords: Vec<String> = keywords.iter().map(ToString::to_string).collect();
        KeywordFilter::new(&keywords, &CleanRules::default()).unwrap()
    }

    #[test]
    fn respects_word_boundaries() {
        let filter = filter_with(&["CH"]);
        assert_eq!(filter.filter("Channel 5"), "Channel 5");
        assert_eq!(filter.filter("Movie CH 2020"), "Movie 2020");
    }

    #[test]
    fn case_insensitive() {
        let filter = filter_with(&["BluRay", "x264"]);
        assert_eq!(filter.filter("Heat BLURAY X264 1995"), "Heat 1995");
    }

    #[test]
    fn removes_all_occurrences() {
        let filter = filter_with(&["PROPER"]);
        assert_eq!(filter.filter("Proper Heat PROPER proper"), "Heat");
    }

    #[test]
    fn keywords_use_separator_normalization() {
        let filter = filter_with(&["WEB-DL", "DD5.1"]);
        assert_eq!(filter.filter("Heat 1995 WEB DL DD5 1"), "Heat 1995");
    }

    #[test]
    fn longer_keywords_applied_first() {
        let filter = filter_with(&["AV1", "AV1Saon", "Pahe", "Pahe in"]);
        assert_eq!(filter.filter("Movie AV1Saon Pahe in"), "Movie");
        let order: Vec<&str> = filter.keywords().collect();
        assert_eq!(order, vec!["AV1Saon", "Pahe in", "Pahe", "AV1"]);
    }

    #[test]
    fn empty_keywords_are_dropped() {
        let filter = filter_with(&["-", "_", " ", "x265"]);
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn duplicate_keywords_are_dropped() {
        let filter = filter_with(&["HEVC", "hevc", "HEVC"]);
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn contains_keyword() {
        let filter = filter_with(&["1080p"]);
        assert!(filter.contains_keyword("Heat 1080p"));
        assert!(!filter.contains_keyword("Heat 10800p"));
    }

    #[test]
    fn empty_filter_only_collapses() {
        let filter = KeywordFilter::default();
        assert!(filter.is_empty());
        assert_eq!(filter.filter(" Heat   1995 "), "Heat 1995");
    }

    #[test]
    fn default_keywords_strip_release_tags() {
        let filter = KeywordFilter::new(&default_keywords(), &CleanRules::default()).unwrap();
        assert_eq!(
            filter.filter("The Matrix 1999 1080p BluRay x264 DDP5 1 YIFY"),
            "The Matrix 1999"
        );
    }
}
