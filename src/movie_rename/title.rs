use std::fmt;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use crate::movie_rename::clean::{CleanRules, collapse_whitespace};
use crate::movie_rename::keywords::KeywordFilter;
use crate::movie_rename::year::extract_year;

static RE_CANONICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.+ \(\d{4}\)$").expect("Failed to create regex pattern for canonical name"));

static RE_INVALID_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[/\\:*?"<>|]+"#).expect("Failed to create regex pattern for invalid characters"));

/// Normalized movie title with an optional release year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedTitle {
    pub text: String,
    pub year: Option<u16>,
}

impl CleanedTitle {
    #[must_use]
    pub const fn new(text: String, year: Option<u16>) -> Self {
        Self { text, year }
    }

    /// Title text is empty after cleaning.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Canonical name: `Title (Year)`, or just `Title` when the year is unknown.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CleanedTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(year) => write!(f, "{} ({year})", self.text),
            None => write!(f, "{}", self.text),
        }
    }
}

/// Runs the cleaner, keyword filter and year extractor in sequence.
#[derive(Debug, Clone, Default)]
pub struct TitleNormalizer {
    rules: CleanRules,
    filter: KeywordFilter,
}

impl TitleNormalizer {
    /// Create a normalizer for the given rules and keywords.
    ///
    /// # Errors
    /// Returns an error if a keyword cannot be compiled.
    pub fn new(rules: CleanRules, keywords: &[String]) -> Result<Self> {
        let filter = KeywordFilter::new(keywords, &rules)?;
        Ok(Self { rules, filter })
    }

    /// Turn a raw file stem into a cleaned title and year.
    ///
    /// ```rust
    /// use movie_renamer::movie_rename::{CleanRules, TitleNormalizer, default_keywords};
    ///
    /// let normalizer = TitleNormalizer::new(CleanRules::default(), &default_keywords()).unwrap();
    /// let title = normalizer.normalize("The.Matrix.1999.1080p.BluRay.x264-GROUP");
    /// assert_eq!(title.canonical(), "The Matrix (1999)");
    /// ```
    #[must_use]
    pub fn normalize(&self, raw: &str) -> CleanedTitle {
        let cleaned = self.rules.clean(raw);
        let filtered = self.filter.filter(&cleaned);
        let (text, year) = extract_year(&filtered);
        CleanedTitle::new(text, year)
    }

    /// Strip leftover keywords from an existing file stem without reformatting it otherwise.
    ///
    /// Hyphens become spaces and whitespace is collapsed.
    #[must_use]
    pub fn cleanup_name(&self, stem: &str) -> String {
        let name = self.filter.filter(&stem.replace('-', " "));
        collapse_whitespace(&name)
            .trim_matches(|c: char| c == '.' || c == ' ')
            .to_string()
    }

    /// Check if a file stem still contains keywords, with hyphens read as spaces.
    #[must_use]
    pub fn needs_cleanup(&self, stem: &str) -> bool {
        self.filter.contains_keyword(&stem.replace('-', " "))
    }

    #[must_use]
    pub const fn keyword_filter(&self) -> &KeywordFilter {
        &self.filter
    }

    #[must_use]
    pub const fn rules(&self) -> &CleanRules {
        &self.rules
    }
}

/// Check if a name already has the canonical `Title (YYYY)` form.
#[must_use]
pub fn is_canonical(name: &str) -> bool {
    RE_CANONICAL.is_match(name)
}

/// Replace characters that are not allowed in file names and collapse whitespace.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    collapse_whitespace(&RE_INVALID_FILENAME_CHARS.replace_all(name, " "))
}
