//! Configuration for movie rename operations.

use std::path::PathBuf;
use std::time::Duration;
use std::{fmt, fs};

use anyhow::Context;
use itertools::Itertools;
use serde::Deserialize;

use crate::movie_rename::clean::{CleanRules, DEFAULT_SEPARATORS};
use crate::movie_rename::keywords::default_keywords;
use crate::movie_rename::resolver::OmdbClient;
use crate::movie_rename::title::TitleNormalizer;
use crate::print_warning;

pub const DEFAULT_LOG_FILE: &str = "rename_log.txt";
pub const DEFAULT_OMDB_URL: &str = "http://www.omdbapi.com/";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 5;

/// How the target directory is scanned.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// One movie per sub-directory: rename the folder and the files inside it.
    #[default]
    Folders,
    /// Rename individual video and subtitle files using a temporary name.
    Loose,
}

/// Which OMDb query is used for online verification.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// `?s=` search returning a list of candidates.
    #[default]
    Search,
    /// `?t=` direct title lookup returning a single record.
    Title,
}

/// Config from the user config file.
#[derive(Debug, Deserialize)]
pub struct MovieRenameUserConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub cleanup: bool,
    #[serde(default = "default_true")]
    pub confirm_subtitles: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default)]
    pub dryrun: bool,
    #[serde(default)]
    pub extra_keywords: Vec<String>,
    #[serde(default = "default_true")]
    pub include_root_files: bool,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default)]
    pub omdb_url: Option<String>,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub query_mode: Option<QueryMode>,
    #[serde(default)]
    pub scan_mode: Option<ScanMode>,
    #[serde(default)]
    pub separators: Option<Vec<char>>,
    #[serde(default = "default_true")]
    pub strip_backup_prefix: bool,
    #[serde(default = "default_true")]
    pub strip_brackets: bool,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub verbose: bool,
}

impl Default for MovieRenameUserConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            cleanup: false,
            confirm_subtitles: true,
            debug: false,
            directory: None,
            dryrun: false,
            extra_keywords: Vec::new(),
            include_root_files: true,
            keywords: None,
            log_file: None,
            omdb_url: None,
            online: false,
            query_mode: None,
            scan_mode: None,
            separators: None,
            strip_backup_prefix: true,
            strip_brackets: true,
            timeout: None,
            verbose: false,
        }
    }
}

/// Wrapper needed for parsing the config section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    movie_rename: MovieRenameUserConfig,
}

/// Final config created from CLI arguments and user config file.
#[derive(Debug, Clone)]
pub struct MovieRenameConfig {
    pub api_key: Option<String>,
    pub cleanup: bool,
    pub confirm_subtitles: bool,
    pub debug: bool,
    pub dryrun: bool,
    pub include_root_files: bool,
    pub keywords: Vec<String>,
    pub log_file: String,
    pub omdb_url: String,
    pub online: bool,
    pub query_mode: QueryMode,
    pub rules: CleanRules,
    pub scan_mode: ScanMode,
    pub timeout: Duration,
    pub verbose: bool,
}

impl MovieRenameUserConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    ///
    /// # Errors
    /// Returns an error if config file exists but cannot be read or parsed.
    pub fn get_user_config() -> anyhow::Result<Self> {
        let Some(path) = crate::config::CONFIG_PATH.as_deref() else {
            return Ok(Self::default());
        };

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse config file {}:\n{e}", path.display())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {error}",
                path.display()
            )),
        }
    }

    /// Parse config from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.movie_rename)
            .with_context(|| "Failed to parse config TOML")
    }
}

impl Default for MovieRenameConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            cleanup: false,
            confirm_subtitles: true,
            debug: false,
            dryrun: false,
            include_root_files: true,
            keywords: default_keywords(),
            log_file: DEFAULT_LOG_FILE.to_string(),
            omdb_url: DEFAULT_OMDB_URL.to_string(),
            online: false,
            query_mode: QueryMode::default(),
            rules: CleanRules::default(),
            scan_mode: ScanMode::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            verbose: false,
        }
    }
}

impl MovieRenameConfig {
    /// Create config from the user config file values.
    ///
    /// An explicit `keywords` list replaces the defaults, `extra_keywords` are appended.
    #[must_use]
    pub fn from_user_config(user_config: MovieRenameUserConfig) -> Self {
        let keywords: Vec<String> = user_config
            .keywords
            .unwrap_or_else(default_keywords)
            .into_iter()
            .chain(user_config.extra_keywords)
            .map(|keyword| keyword.trim().to_string())
            .filter(|keyword| !keyword.is_empty())
            .unique()
            .collect();

        let rules = CleanRules {
            separators: user_config
                .separators
                .unwrap_or_else(|| DEFAULT_SEPARATORS.to_vec()),
            strip_brackets: user_config.strip_brackets,
            strip_backup_prefix: user_config.strip_backup_prefix,
        };

        Self {
            api_key: user_config.api_key.filter(|key| !key.trim().is_empty()),
            cleanup: user_config.cleanup,
            confirm_subtitles: user_config.confirm_subtitles,
            debug: user_config.debug,
            dryrun: user_config.dryrun,
            include_root_files: user_config.include_root_files,
            keywords,
            log_file: user_config.log_file.unwrap_or_else(|| DEFAULT_LOG_FILE.to_string()),
            omdb_url: user_config.omdb_url.unwrap_or_else(|| DEFAULT_OMDB_URL.to_string()),
            online: user_config.online,
            query_mode: user_config.query_mode.unwrap_or_default(),
            rules,
            scan_mode: user_config.scan_mode.unwrap_or_default(),
            timeout: Duration::from_secs(user_config.timeout.unwrap_or(DEFAULT_TIMEOUT_SECONDS)),
            verbose: user_config.verbose,
        }
    }

    /// Build the title normalizer for the configured rules and keywords.
    ///
    /// # Errors
    /// Returns an error if a keyword cannot be compiled.
    pub fn normalizer(&self) -> anyhow::Result<TitleNormalizer> {
        TitleNormalizer::new(self.rules.clone(), &self.keywords)
    }

    /// Build the OMDb client when online verification is enabled.
    ///
    /// Online mode without an API key falls back to offline with a warning.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn omdb_client(&self) -> anyhow::Result<Option<OmdbClient>> {
        if !self.online {
            return Ok(None);
        }
        let Some(api_key) = self.api_key.as_deref() else {
            print_warning!(
                "Online verification needs an API key (--api-key, {} or config file), continuing offline",
                crate::config::API_KEY_ENV
            );
            return Ok(None);
        };
        OmdbClient::new(&self.omdb_url, api_key, self.timeout, self.query_mode).map(Some)
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Folders => write!(f, "folders"),
            Self::Loose => write!(f, "loose"),
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search => write!(f, "search"),
            Self::Title => write!(f, "title"),
        }
    }
}

impl fmt::Display for MovieRenameConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keywords = if self.keywords.is_empty() {
            "keywords: []".to_string()
        } else {
            "keywords:\n".to_string() + &*self.keywords.iter().map(|name| format!("    {name}")).join("\n")
        };
        let separators = self.rules.separators.iter().map(|c| format!("'{c}'")).join(", ");
        writeln!(f, "Config:")?;
        writeln!(f, "  cleanup:    {}", crate::colorize_bool(self.cleanup))?;
        writeln!(f, "  confirm:    {}", crate::colorize_bool(self.confirm_subtitles))?;
        writeln!(f, "  debug:      {}", crate::colorize_bool(self.debug))?;
        writeln!(f, "  dryrun:     {}", crate::colorize_bool(self.dryrun))?;
        writeln!(f, "  root files: {}", crate::colorize_bool(self.include_root_files))?;
        writeln!(f, "  online:     {}", crate::colorize_bool(self.online))?;
        writeln!(f, "  api key:    {}", crate::colorize_bool(self.api_key.is_some()))?;
        writeln!(f, "  verbose:    {}", crate::colorize_bool(self.verbose))?;
        writeln!(f, "  scan mode:  {}", self.scan_mode)?;
        writeln!(f, "  query mode: {}", self.query_mode)?;
        writeln!(f, "  timeout:    {}s", self.timeout.as_secs())?;
        writeln!(f, "  omdb url:   \"{}\"", self.omdb_url)?;
        writeln!(f, "  log file:   \"{}\"", self.log_file)?;
        writeln!(f, "  separators: [{separators}]")?;
        writeln!(f, "  brackets:   {}", crate::colorize_bool(self.rules.strip_brackets))?;
        writeln!(f, "  backup_:    {}", crate::colorize_bool(self.rules.strip_backup_prefix))?;
        writeln!(f, "  {keywords}")
    }
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod movie_rename_config_tests {
    use super::*;

    #[test]
    fn from_toml_str_parses_empty_config() {
        let config = MovieRenameUserConfig::from_toml_str("").unwrap();
        assert!(config.confirm_subtitles);
        assert!(config.include_root_files);
        assert!(config.strip_brackets);
        assert!(!config.online);
        assert!(config.keywords.is_none());
    }

    #[test]
    fn from_toml_str_parses_section() {
        let toml = r#"
[movie_rename]
api_key = "abc123"
dryrun = true
online = true
scan_mode = "loose"
query_mode = "title"
timeout = 3
separators = [".", "_"]
"#;
        let config = MovieRenameUserConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("abc123"));
        assert!(config.dryrun);
        assert!(config.online);
        assert_eq!(config.scan_mode, Some(ScanMode::Loose));
        assert_eq!(config.query_mode, Some(QueryMode::Title));
        assert_eq!(config.timeout, Some(3));
        assert_eq!(config.separators, Some(vec!['.', '_']));
    }

    #[test]
    fn from_toml_str_invalid_scan_mode_returns_error() {
        let toml = r#"
[movie_rename]
scan_mode = "sideways"
"#;
        assert!(MovieRenameUserConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn from_toml_str_invalid_toml_returns_error() {
        assert!(MovieRenameUserConfig::from_toml_str("this is not valid toml {{{").is_err());
    }

    #[test]
    fn other_sections_are_ignored() {
        let toml = r"
[dots]
debug = true
";
        let config = MovieRenameUserConfig::from_toml_str(toml).unwrap();
        assert!(!config.debug);
    }

    #[test]
    fn explicit_keywords_replace_defaults() {
        let user_config = MovieRenameUserConfig {
            keywords: Some(vec!["1080p".to_string(), " ".to_string()]),
            extra_keywords: vec!["GROUP".to_string(), "1080p".to_string()],
            ..Default::default()
        };
        let config = MovieRenameConfig::from_user_config(user_config);
        assert_eq!(config.keywords, vec!["1080p", "GROUP"]);
    }

    #[test]
    fn extra_keywords_extend_defaults() {
        let user_config = MovieRenameUserConfig {
            extra_keywords: vec!["GROUP".to_string()],
            ..Default::default()
        };
        let config = MovieRenameConfig::from_user_config(user_config);
        assert_eq!(config.keywords.len(), default_keywords().len() + 1);
        assert_eq!(config.keywords.last().map(String::as_str), Some("GROUP"));
    }

    #[test]
    fn defaults_from_empty_user_config() {
        let config = MovieRenameConfig::from_user_config(MovieRenameUserConfig::default());
        assert_eq!(config.scan_mode, ScanMode::Folders);
        assert_eq!(config.query_mode, QueryMode::Search);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECONDS));
        assert_eq!(config.log_file, DEFAULT_LOG_FILE);
        assert_eq!(config.rules, CleanRules::default());
    }

    #[test]
    fn blank_api_key_is_ignored() {
        let user_config = MovieRenameUserConfig {
            api_key: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(MovieRenameConfig::from_user_config(user_config).api_key.is_none());
    }

    #[test]
    fn offline_has_no_client() {
        let config = MovieRenameConfig::default();
        assert!(config.omdb_client().unwrap().is_none());
    }

    #[test]
    fn online_without_key_has_no_client() {
        let config = MovieRenameConfig {
            online: true,
            ..Default::default()
        };
        assert!(config.omdb_client().unwrap().is_none());
    }

    #[test]
    fn display_formats_config() {
        let config = MovieRenameConfig {
            dryrun: true,
            keywords: vec!["x265".to_string()],
            ..Default::default()
        };
        let display = format!("{config}");
        assert!(display.contains("Config:"));
        assert!(display.contains("dryrun:"));
        assert!(display.contains("x265"));
        assert!(display.contains("scan mode:  folders"));
    }
}
