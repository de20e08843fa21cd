//! Separator and bracket normalization for raw file names.

use std::sync::LazyLock;

use regex::Regex;

static RE_BRACKETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\[\](){}]+").expect("Failed to create regex pattern for brackets"));

static RE_BACKUP_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:backup_)+").expect("Failed to create regex pattern for backup prefix"));

pub(crate) static RE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Failed to compile whitespace regex"));

/// Default separator characters replaced with a space.
pub const DEFAULT_SEPARATORS: [char; 3] = ['.', '_', '-'];

/// Rules for turning a raw file name into a space separated title string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanRules {
    /// Characters that are treated as word separators.
    pub separators: Vec<char>,
    /// Remove `[]`, `()` and `{}` characters.
    pub strip_brackets: bool,
    /// Remove any number of leading `backup_` prefixes.
    pub strip_backup_prefix: bool,
}

impl Default for CleanRules {
    fn default() -> Self {
        Self {
            separators: DEFAULT_SEPARATORS.to_vec(),
            strip_brackets: true,
            strip_backup_prefix: true,
        }
    }
}

impl CleanRules {
    /// Replace separators with spaces, collapse whitespace and trim.
    ///
    /// Never fails: input without anything to clean passes through unchanged.
    ///
    /// ```rust
    /// use movie_renamer::movie_rename::CleanRules;
    ///
    /// let rules = CleanRules::default();
    /// assert_eq!(rules.clean("The.Matrix_1999"), "The Matrix 1999");
    /// assert_eq!(rules.clean("backup_backup_[Heat]"), "Heat");
    /// ```
    #[must_use]
    pub fn clean(&self, raw: &str) -> String {
        let mut name = if self.strip_backup_prefix {
            RE_BACKUP_PREFIX.replace(raw, "").to_string()
        } else {
            raw.to_string()
        };

        if self.strip_brackets {
            name = RE_BRACKETS.replace_all(&name, " ").to_string();
        }

        if !self.separators.is_empty() {
            name = name
                .chars()
                .map(|c| if self.separators.contains(&c) { ' ' } else { c })
                .collect();
        }

        collapse_whitespace(&name)
    }
}

/// Collapse all whitespace runs to a single space and trim both ends.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text, " ").trim().to_string()
}
