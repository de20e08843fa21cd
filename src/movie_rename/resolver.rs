//! Title verification against the OMDb metadata service.
//!
//! Documentation:
//! <https://www.omdbapi.com/>

use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::movie_rename::QueryMode;
use crate::movie_rename::similarity::ratio;
use crate::movie_rename::title::sanitize_file_name;
use crate::print_warning;

/// Best matching title from the metadata service.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub title: String,
    pub year: u16,
    /// Similarity to the query in `[0, 1]`.
    pub similarity: f64,
}

impl MatchCandidate {
    /// Canonical `Title (Year)` name with characters that are invalid in file names removed.
    #[must_use]
    pub fn canonical(&self) -> String {
        format!("{} ({})", sanitize_file_name(&self.title), self.year)
    }
}

/// Looks up the canonical title for a cleaned movie title.
pub trait MatchResolver {
    /// Returns `None` when there is no match or the lookup failed.
    fn resolve(&self, title: &str) -> Option<MatchCandidate>;
}

impl<F> MatchResolver for F
where
    F: Fn(&str) -> Option<MatchCandidate>,
{
    fn resolve(&self, title: &str) -> Option<MatchCandidate> {
        self(title)
    }
}

/// Blocking OMDb API client.
#[derive(Debug)]
pub struct OmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
    mode: QueryMode,
}

/// Response for `?s=` queries.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchResponse {
    response: String,
    #[serde(default)]
    search: Vec<SearchItem>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchItem {
    title: String,
    year: String,
}

/// Response for `?t=` queries.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TitleResponse {
    response: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    year: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl OmdbClient {
    /// Create a new client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration, mode: QueryMode) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            mode,
        })
    }

    /// Send a single query and return the response body.
    fn fetch(&self, title: &str) -> Result<String> {
        let query_key = match self.mode {
            QueryMode::Search => "s",
            QueryMode::Title => "t",
        };

        let response = self
            .client
            .get(&self.base_url)
            .query(&[(query_key, title), ("apikey", self.api_key.as_str())])
            .send()
            .context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {status}");
        }

        response.text().context("Failed to read response body")
    }

    fn lookup(&self, title: &str) -> Result<Option<MatchCandidate>> {
        let body = self.fetch(title)?;
        match self.mode {
            QueryMode::Search => parse_search_response(title, &body),
            QueryMode::Title => parse_title_response(title, &body),
        }
    }
}

impl MatchResolver for OmdbClient {
    fn resolve(&self, title: &str) -> Option<MatchCandidate> {
        match self.lookup(title) {
            Ok(candidate) => candidate,
            Err(error) => {
                print_warning!("OMDb request failed for '{title}': {error:#}");
                None
            }
        }
    }
}

/// Parse a search response and pick the candidate most similar to the query.
///
/// Ties keep the first candidate. A best score of zero is not a match.
///
/// # Errors
/// Returns an error if the body is not a valid search response.
pub fn parse_search_response(query: &str, body: &str) -> Result<Option<MatchCandidate>> {
    let response: SearchResponse = serde_json::from_str(body).context("Malformed search response")?;
    if !is_true(&response.response) {
        if let Some(error) = response.error {
            print_warning!("No match for '{query}': {error}");
        }
        return Ok(None);
    }

    let query = query.to_lowercase();
    let mut best: Option<MatchCandidate> = None;
    for item in response.search {
        let Some(year) = parse_year(&item.year) else {
            continue;
        };
        let similarity = ratio(&query, &item.title.to_lowercase());
        if best.as_ref().is_none_or(|current| similarity > current.similarity) {
            best = Some(MatchCandidate {
                title: item.title,
                year,
                similarity,
            });
        }
    }

    Ok(best.filter(|candidate| candidate.similarity > 0.0))
}

/// Parse a direct title response.
///
/// # Errors
/// Returns an error if the body is not a valid title response.
pub fn parse_title_response(query: &str, body: &str) -> Result<Option<MatchCandidate>> {
    let response: TitleResponse = serde_json::from_str(body).context("Malformed title response")?;
    if !is_true(&response.response) {
        if let Some(error) = response.error {
            print_warning!("No match for '{query}': {error}");
        }
        return Ok(None);
    }

    let (Some(title), Some(year)) = (response.title, response.year.as_deref().and_then(parse_year)) else {
        return Ok(None);
    };
    let similarity = ratio(&query.to_lowercase(), &title.to_lowercase());

    Ok(Some(MatchCandidate {
        title,
        year,
        similarity,
    }))
}

fn is_true(status: &str) -> bool {
    status.trim().eq_ignore_ascii_case("true")
}

/// Parse the leading four digit year, e.g. `2005–2010` -> 2005.
fn parse_year(year: &str) -> Option<u16> {
    let digits: String = year.trim().chars().take(4).collect();
    if digits.len() == 4 && digits.chars().all(|c| c.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}
