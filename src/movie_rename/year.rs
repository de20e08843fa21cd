//! Release year detection.

use std::sync::LazyLock;

use regex::Regex;

use crate::movie_rename::clean::collapse_whitespace;

/// A year 1900-2099 as a whole word, or already wrapped in parentheses.
static RE_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((?P<paren>(?:19|20)\d{2})\)|\b(?P<bare>(?:19|20)\d{2})\b")
        .expect("Failed to create regex pattern for year")
});

static RE_TRAILING_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\((?:19|20)\d{2}\)|\b(?:19|20)\d{2})\s*$").expect("Failed to create regex pattern for trailing year")
});

const TRIM_CHARS: &[char] = &[' ', '-', ',', ':', ';'];

/// Find the release year and remove it from the title.
///
/// When several years are present the last one wins.
/// Anything after the winning year is release metadata and is dropped,
/// as are candidate years right before it, unless that would leave nothing of the title.
/// Returns the title unchanged (whitespace collapsed) and `None` when no year is found.
///
/// ```rust
/// use movie_renamer::movie_rename::extract_year;
///
/// assert_eq!(extract_year("Heat 1995"), ("Heat".to_string(), Some(1995)));
/// assert_eq!(extract_year("Movie 1999 2020"), ("Movie".to_string(), Some(2020)));
/// assert_eq!(extract_year("Heat"), ("Heat".to_string(), None));
/// ```
#[must_use]
pub fn extract_year(title: &str) -> (String, Option<u16>) {
    let Some(captures) = RE_YEAR.captures_iter(title).last() else {
        return (collapse_whitespace(title), None);
    };
    let Some(year_match) = captures.name("paren").or_else(|| captures.name("bare")) else {
        return (collapse_whitespace(title), None);
    };
    let Ok(year) = year_match.as_str().parse::<u16>() else {
        return (collapse_whitespace(title), None);
    };
    let whole_match = captures.get(0).map_or(year_match.start(), |m| m.start());

    let mut head = title[..whole_match].trim_end();
    while let Some(trailing) = RE_TRAILING_YEAR.find(head) {
        let remaining = head[..trailing.start()].trim_end();
        if remaining.trim_matches(TRIM_CHARS).is_empty() {
            break;
        }
        head = remaining;
    }

    let text = collapse_whitespace(head).trim_matches(TRIM_CHARS).to_string();
    (text, Some(year))
}

#[cfg(test)]
mod extract_year_tests {
    use super::*;

    #[test]
    fn single_year() {
        assert_eq!(extract_year("The Matrix 1999"), ("The Matrix".to_string(), Some(1999)));
    }

    #[test]
    fn year_like_title_before_release_year_is_dropped() {
        assert_eq!(
            extract_year("Blade Runner 2049 2017"),
            ("Blade Runner".to_string(), Some(2017))
        );
    }

    #[test]
    fn no_year() {
        assert_eq!(extract_year("The  Matrix "), ("The Matrix".to_string(), None));
    }

    #[test]
    fn last_year_wins() {
        assert_eq!(
            extract_year("Movie 1999 Remastered 2020"),
            ("Movie 1999 Remastered".to_string(), Some(2020))
        );
    }

    #[test]
    fn adjacent_years_before_winner_are_dropped() {
        assert_eq!(extract_year("Movie 1999 2020"), ("Movie".to_string(), Some(2020)));
    }

    #[test]
    fn year_only_title_is_kept() {
        assert_eq!(extract_year("1917 2019"), ("1917".to_string(), Some(2019)));
    }

    #[test]
    fn leading_year_in_title_is_kept() {
        assert_eq!(
            extract_year("2001 A Space Odyssey 1968"),
            ("2001 A Space Odyssey".to_string(), Some(1968))
        );
    }

    #[test]
    fn text_after_year_is_dropped() {
        assert_eq!(extract_year("Heat 1995 GROUP"), ("Heat".to_string(), Some(1995)));
    }

    #[test]
    fn out_of_range_numbers_are_ignored() {
        assert_eq!(extract_year("Movie 1899 2160"), ("Movie 1899 2160".to_string(), None));
        assert_eq!(extract_year("Movie 19999"), ("Movie 19999".to_string(), None));
    }

    #[test]
    fn year_inside_word_is_ignored() {
        assert_eq!(extract_year("Movie x2020y"), ("Movie x2020y".to_string(), None));
    }

    #[test]
    fn parenthesized_year_is_idempotent() {
        assert_eq!(extract_year("The Matrix (1999)"), ("The Matrix".to_string(), Some(1999)));
    }

    #[test]
    fn trailing_separator_is_trimmed() {
        assert_eq!(extract_year("Heat - 1995"), ("Heat".to_string(), Some(1995)));
    }

    #[test]
    fn year_only() {
        assert_eq!(extract_year("2020"), (String::new(), Some(2020)));
    }
}
