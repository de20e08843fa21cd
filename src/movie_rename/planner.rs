//! Rename planning for movie folders and loose files.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::movie_rename::resolver::MatchResolver;
use crate::movie_rename::title::{CleanedTitle, TitleNormalizer, is_canonical};
use crate::print_warning;

const VIDEO_EXTENSIONS: [&str; 3] = ["mkv", "mp4", "avi"];
const SUBTITLE_EXTENSION: &str = "srt";

/// Role of a file inside a movie folder, decided by file extension only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRole {
    PrimaryVideo,
    Subtitle,
    Unclassified,
}

impl EntryRole {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let extension = crate::path_to_file_extension_string(path);
        if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            Self::PrimaryVideo
        } else if extension == SUBTITLE_EXTENSION {
            Self::Subtitle
        } else {
            Self::Unclassified
        }
    }

    /// Video or subtitle file.
    #[must_use]
    pub const fn is_media(self) -> bool {
        matches!(self, Self::PrimaryVideo | Self::Subtitle)
    }
}

/// A file path with its classified role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub path: PathBuf,
    pub role: EntryRole,
}

impl RawEntry {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        let role = EntryRole::from_path(&path);
        Self { path, role }
    }

    #[must_use]
    pub fn name(&self) -> String {
        crate::path_to_filename_string(&self.path)
    }
}

/// Single file rename inside a planned folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRename {
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    pub role: EntryRole,
}

/// Renames for one movie folder.
///
/// File paths point inside the target folder,
/// since the folder itself is renamed first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlan {
    pub source: PathBuf,
    pub target: PathBuf,
    pub target_name: String,
    pub file_renames: Vec<FileRename>,
}

impl RenamePlan {
    #[must_use]
    pub fn renames_folder(&self) -> bool {
        self.source != self.target
    }

    #[must_use]
    pub fn subtitle_count(&self) -> usize {
        self.file_renames
            .iter()
            .filter(|rename| rename.role == EntryRole::Subtitle)
            .count()
    }
}

/// A loose file prepared for the two-phase rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub source: PathBuf,
    pub title: CleanedTitle,
    /// Lowercase extension including the leading dot.
    pub extension: String,
    pub temp_path: PathBuf,
}

impl StagedFile {
    /// Final path for the given canonical name.
    #[must_use]
    pub fn final_path(&self, canonical: &str) -> PathBuf {
        self.source.with_file_name(format!("{canonical}{}", self.extension))
    }
}

/// Why a folder or file was left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyCanonical,
    NoVideo,
    EmptyTitle(String),
    DestinationExists(String),
    NothingToRename,
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyCanonical => write!(f, "already renamed"),
            Self::NoVideo => write!(f, "no movie file found"),
            Self::EmptyTitle(name) => write!(f, "title is empty after cleaning '{name}'"),
            Self::DestinationExists(name) => write!(f, "destination '{name}' already exists"),
            Self::NothingToRename => write!(f, "nothing to rename"),
            Self::Unreadable(error) => write!(f, "{error}"),
        }
    }
}

/// Result of planning one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    Ready(RenamePlan),
    Skipped(SkipReason),
}

/// Computes target names from classified files.
///
/// With a resolver the planner runs in online mode and prefers the service title.
pub struct Planner<'a> {
    normalizer: &'a TitleNormalizer,
    resolver: Option<&'a dyn MatchResolver>,
    verbose: bool,
}

impl<'a> Planner<'a> {
    #[must_use]
    pub const fn new(normalizer: &'a TitleNormalizer, resolver: Option<&'a dyn MatchResolver>) -> Self {
        Self {
            normalizer,
            resolver,
            verbose: false,
        }
    }

    /// Print diagnostics for files that are left alone.
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub const fn is_online(&self) -> bool {
        self.resolver.is_some()
    }

    /// List the non-hidden files directly inside a folder in case-insensitive name order.
    ///
    /// # Errors
    /// Returns an error if the folder cannot be read.
    pub fn read_entries(folder: &Path) -> Result<Vec<RawEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(folder).with_context(|| format!("Failed to read directory {}", folder.display()))? {
            let entry = entry.with_context(|| format!("Failed to read entry in {}", folder.display()))?;
            if crate::is_hidden_name(&entry.file_name()) {
                continue;
            }
            let path = entry.path();
            if path.is_file() {
                entries.push(RawEntry::new(path));
            }
        }
        entries.sort_by_key(|entry| entry.name().to_lowercase());
        Ok(entries)
    }

    /// Read and plan a folder.
    ///
    /// The canonical name check runs before anything else so already renamed folders
    /// are never read or looked up.
    #[must_use]
    pub fn plan_folder(&self, folder: &Path) -> PlanOutcome {
        match crate::get_normalized_dir_name(folder) {
            Ok(name) if is_canonical(&name) => return PlanOutcome::Skipped(SkipReason::AlreadyCanonical),
            Ok(_) => {}
            Err(error) => return PlanOutcome::Skipped(SkipReason::Unreadable(error.to_string())),
        }
        match Self::read_entries(folder) {
            Ok(entries) => self.plan(folder, &entries),
            Err(error) => PlanOutcome::Skipped(SkipReason::Unreadable(format!("{error:#}"))),
        }
    }

    /// Plan the renames for a folder and its classified files.
    #[must_use]
    pub fn plan(&self, folder: &Path, entries: &[RawEntry]) -> PlanOutcome {
        let folder_name = match crate::get_normalized_dir_name(folder) {
            Ok(name) => name,
            Err(error) => return PlanOutcome::Skipped(SkipReason::Unreadable(error.to_string())),
        };
        if is_canonical(&folder_name) {
            return PlanOutcome::Skipped(SkipReason::AlreadyCanonical);
        }

        let mut videos = entries.iter().filter(|entry| entry.role == EntryRole::PrimaryVideo);
        let Some(video) = videos.next() else {
            return PlanOutcome::Skipped(SkipReason::NoVideo);
        };
        let extra_videos: Vec<String> = videos.map(RawEntry::name).collect();
        if self.verbose && !extra_videos.is_empty() {
            println!(
                "Using {} as the movie file, leaving {} as is",
                video.name(),
                extra_videos.join(", ")
            );
        }
        let (stem, extension) = match crate::get_normalized_file_name_and_extension(&video.path) {
            Ok(parts) => parts,
            Err(error) => return PlanOutcome::Skipped(SkipReason::Unreadable(error.to_string())),
        };

        let title = self.normalizer.normalize(&stem);
        if title.is_empty() {
            return PlanOutcome::Skipped(SkipReason::EmptyTitle(stem));
        }
        let canonical = self.resolve_folder_name(&title);

        let target = folder.with_file_name(&canonical);
        let case_only_change = canonical.to_lowercase() == folder_name.to_lowercase();
        if target != folder && target.exists() && !case_only_change {
            return PlanOutcome::Skipped(SkipReason::DestinationExists(canonical));
        }

        let mut file_renames = Vec::new();
        let video_name = format!("{canonical}.{}", extension.to_lowercase());
        file_renames.push(FileRename {
            old_path: target.join(video.name()),
            new_path: target.join(video_name),
            role: EntryRole::PrimaryVideo,
        });
        for subtitle in entries.iter().filter(|entry| entry.role == EntryRole::Subtitle) {
            file_renames.push(FileRename {
                old_path: target.join(subtitle.name()),
                new_path: target.join(format!("{canonical}.{SUBTITLE_EXTENSION}")),
                role: EntryRole::Subtitle,
            });
        }
        file_renames.retain(|rename| rename.old_path != rename.new_path);

        if target == folder && file_renames.is_empty() {
            return PlanOutcome::Skipped(SkipReason::NothingToRename);
        }

        PlanOutcome::Ready(RenamePlan {
            source: folder.to_path_buf(),
            target,
            target_name: canonical,
            file_renames,
        })
    }

    /// Prepare a loose video or subtitle file for the two-phase rename.
    ///
    /// # Errors
    /// Returns the skip reason when the file should be left alone.
    pub fn stage_loose_file(&self, path: &Path) -> std::result::Result<StagedFile, SkipReason> {
        let (stem, extension) = crate::get_normalized_file_name_and_extension(path)
            .map_err(|error| SkipReason::Unreadable(error.to_string()))?;
        if is_canonical(&stem) {
            return Err(SkipReason::AlreadyCanonical);
        }

        let title = self.normalizer.normalize(&stem);
        if title.is_empty() {
            return Err(SkipReason::EmptyTitle(stem));
        }

        let extension = if extension.is_empty() {
            String::new()
        } else {
            format!(".{}", extension.to_lowercase())
        };
        let temp_name = format!("temp_{}{extension}", title.canonical());
        let temp_path = path.with_file_name(&temp_name);
        if temp_path.exists() {
            return Err(SkipReason::DestinationExists(temp_name));
        }

        Ok(StagedFile {
            source: path.to_path_buf(),
            title,
            extension,
            temp_path,
        })
    }

    /// Final canonical name for a cleaned title.
    ///
    /// Offline this is always the cleaned name.
    /// Online it is the service title, or `None` when the service has no match.
    #[must_use]
    pub fn verify(&self, title: &CleanedTitle) -> Option<String> {
        match self.resolver {
            Some(resolver) => resolver.resolve(&title.text).map(|candidate| candidate.canonical()),
            None => Some(title.canonical()),
        }
    }

    /// Folder name: the service title when online and matched, otherwise the cleaned name.
    fn resolve_folder_name(&self, title: &CleanedTitle) -> String {
        self.verify(title).unwrap_or_else(|| {
            let canonical = title.canonical();
            print_warning!("No online match for '{}', using '{canonical}'", title.text);
            canonical
        })
    }
}
