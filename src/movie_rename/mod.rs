//! Movie rename module for normalizing movie folder and file names.
//!
//! Noisy release names like `The.Matrix.1999.1080p.BluRay.x264-GROUP.mkv` are turned into
//! the canonical `Title (Year)` form, optionally verified against an external metadata
//! service, and the renames are applied to the movie folders and the files inside them.

mod applier;
mod clean;
mod config;
mod keywords;
mod planner;
mod rename;
mod resolver;
mod similarity;
mod title;
mod year;

pub use applier::{AcceptAll, Applier, RenameLog, RenameLogEntry, RunStats, StdinConfirm, SubtitleConfirm};
pub use clean::CleanRules;
pub use config::{
    DEFAULT_LOG_FILE, DEFAULT_OMDB_URL, DEFAULT_TIMEOUT_SECONDS, MovieRenameConfig, MovieRenameUserConfig, QueryMode, ScanMode,
};
pub use keywords::{KeywordFilter, default_keywords};
pub use planner::{EntryRole, FileRename, PlanOutcome, Planner, RawEntry, RenamePlan, SkipReason, StagedFile};
pub use rename::MovieRename;
pub use resolver::{MatchCandidate, MatchResolver, OmdbClient, parse_search_response, parse_title_response};
pub use similarity::ratio;
pub use title::{CleanedTitle, TitleNormalizer, is_canonical, sanitize_file_name};
pub use year::extract_year;
