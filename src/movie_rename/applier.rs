//! Executes planned renames and records them in the rename log.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::movie_rename::planner::{EntryRole, RenamePlan, SkipReason, StagedFile};
use crate::movie_rename::title::CleanedTitle;
use crate::{print_error, print_warning};

/// Decides whether a subtitle is renamed when a folder has several of them.
pub trait SubtitleConfirm {
    fn confirm(&mut self, subtitle: &str, target: &str) -> bool;
}

impl<F> SubtitleConfirm for F
where
    F: FnMut(&str, &str) -> bool,
{
    fn confirm(&mut self, subtitle: &str, target: &str) -> bool {
        self(subtitle, target)
    }
}

/// Accepts every subtitle.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl SubtitleConfirm for AcceptAll {
    fn confirm(&mut self, _subtitle: &str, _target: &str) -> bool {
        true
    }
}

/// Asks on the terminal. Read errors count as "no".
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirm;

impl SubtitleConfirm for StdinConfirm {
    fn confirm(&mut self, subtitle: &str, target: &str) -> bool {
        crate::confirm_with_user(
            &format!("Multiple subtitles found. Rename '{subtitle}' to '{target}'?"),
            false,
        )
        .unwrap_or_else(|error| {
            print_error!("Failed to read answer: {error}");
            false
        })
    }
}

/// One `from -> to` line in the rename log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameLogEntry {
    pub from: String,
    pub to: String,
}

impl fmt::Display for RenameLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Renames performed, or planned in a dry run, during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameLog {
    entries: Vec<RenameLogEntry>,
}

impl RenameLog {
    pub fn push(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.entries.push(RenameLogEntry {
            from: from.into(),
            to: to.into(),
        });
    }

    #[must_use]
    pub fn entries(&self) -> &[RenameLogEntry] {
        &self.entries
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the log, replacing any previous file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_string()).with_context(|| format!("Failed to write log file {}", path.display()))
    }
}

impl fmt::Display for RenameLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

/// Counts for the end of run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub renamed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Applies renames to the filesystem, or only prints them in a dry run.
pub struct Applier {
    root: PathBuf,
    dryrun: bool,
    verbose: bool,
    confirm: Box<dyn SubtitleConfirm>,
    claimed: HashSet<PathBuf>,
    sources: HashSet<PathBuf>,
    log: RenameLog,
    stats: RunStats,
}

impl Applier {
    #[must_use]
    pub fn new(root: PathBuf, dryrun: bool, verbose: bool) -> Self {
        Self {
            root,
            dryrun,
            verbose,
            confirm: Box::new(AcceptAll),
            claimed: HashSet::new(),
            sources: HashSet::new(),
            log: RenameLog::default(),
            stats: RunStats::default(),
        }
    }

    /// Use the given confirmation for folders with several subtitles.
    #[must_use]
    pub fn with_subtitle_confirm(mut self, confirm: impl SubtitleConfirm + 'static) -> Self {
        self.confirm = Box::new(confirm);
        self
    }

    #[must_use]
    pub const fn log(&self) -> &RenameLog {
        &self.log
    }

    #[must_use]
    pub const fn stats(&self) -> RunStats {
        self.stats
    }

    /// Record a skipped folder or file.
    pub fn skip(&mut self, path: &Path, reason: &SkipReason) {
        self.stats.skipped += 1;
        let name = crate::get_relative_path_or_filename(path, &self.root);
        if *reason == SkipReason::AlreadyCanonical {
            if self.verbose {
                println!("Skipping {name}: {reason}");
            }
        } else {
            print_warning!("Skipping {name}: {reason}");
        }
    }

    /// Apply a folder plan: the folder first, then the files inside it.
    pub fn apply_folder(&mut self, plan: &RenamePlan) {
        if plan.renames_folder() && !self.rename(&plan.source, &plan.target) {
            return;
        }

        let confirm_subtitles = !self.dryrun && plan.subtitle_count() > 1;
        for file in &plan.file_renames {
            if confirm_subtitles && file.role == EntryRole::Subtitle {
                let subtitle = crate::path_to_filename_string(&file.old_path);
                let target = crate::path_to_filename_string(&file.new_path);
                if !self.confirm.confirm(&subtitle, &target) {
                    if self.verbose {
                        println!("Leaving subtitle {subtitle} as is");
                    }
                    self.stats.skipped += 1;
                    continue;
                }
            }
            self.rename(&file.old_path, &file.new_path);
        }
    }

    /// Rename a loose file in two phases: source to temp name, then temp name to final name.
    ///
    /// `verify` gives the final canonical name for the cleaned title.
    /// When it returns `None`, or the second phase cannot happen,
    /// the file is moved back to its original name.
    pub fn apply_staged<F>(&mut self, staged: &StagedFile, verify: F)
    where
        F: FnOnce(&CleanedTitle) -> Option<String>,
    {
        let name = crate::get_relative_path_or_filename(&staged.source, &self.root);
        if !self.dryrun
            && let Err(error) = fs::rename(&staged.source, &staged.temp_path)
        {
            print_error!("Failed to move {name} to temporary name: {error}");
            self.stats.failed += 1;
            return;
        }

        let Some(canonical) = verify(&staged.title) else {
            self.revert(staged);
            print_warning!("Skipping {name}: no match for '{}', keeping original name", staged.title.text);
            self.stats.skipped += 1;
            return;
        };

        let final_path = staged.final_path(&canonical);
        if final_path == staged.source {
            self.revert(staged);
            self.skip(&staged.source, &SkipReason::AlreadyCanonical);
            return;
        }
        if self.is_taken(&staged.source, &final_path) {
            self.revert(staged);
            let target = crate::path_to_filename_string(&final_path);
            self.skip(&staged.source, &SkipReason::DestinationExists(target));
            return;
        }

        if !self.dryrun
            && let Err(error) = fs::rename(&staged.temp_path, &final_path)
        {
            print_error!("Failed to rename {name}: {error}");
            self.revert(staged);
            self.stats.failed += 1;
            return;
        }

        self.record(&staged.source, &final_path);
    }

    /// Rename a single path, never overwriting an existing destination.
    ///
    /// Returns true if the rename was done, or would be done in a dry run.
    pub fn rename(&mut self, old: &Path, new: &Path) -> bool {
        if self.is_taken(old, new) {
            let target = crate::path_to_filename_string(new);
            self.skip(old, &SkipReason::DestinationExists(target));
            return false;
        }

        if !self.dryrun {
            let result = if is_case_only_change(old, new) {
                rename_with_temp_file(old, new)
            } else {
                fs::rename(old, new)
            };
            if let Err(error) = result {
                let name = crate::get_relative_path_or_filename(old, &self.root);
                print_error!("Failed to rename {name}: {error}");
                self.stats.failed += 1;
                return false;
            }
        }

        self.record(old, new);
        true
    }

    /// Path was renamed earlier in this run, directly or through a parent folder.
    #[must_use]
    pub fn was_renamed(&self, path: &Path) -> bool {
        self.sources.iter().any(|source| path.starts_with(source))
    }

    /// Write the rename log.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_log(&self, path: &Path) -> Result<()> {
        self.log.write(path)
    }

    /// Print and log a completed rename.
    fn record(&mut self, old: &Path, new: &Path) {
        self.stats.renamed += 1;
        let number = self.stats.renamed;
        let old_str = crate::get_relative_path_or_filename(old, &self.root);
        let new_str = crate::get_relative_path_or_filename(new, &self.root);
        if self.dryrun {
            println!("{}", format!("Dryrun {number}:").bold().cyan());
        } else {
            println!("{}", format!("Rename {number}:").bold().magenta());
        }
        crate::show_diff(&old_str, &new_str);

        self.log
            .push(crate::path_to_filename_string(old), crate::path_to_filename_string(new));
        self.claimed.insert(new.to_path_buf());
        self.sources.insert(old.to_path_buf());
    }

    /// Destination is already claimed in this run, or exists on disk as a different entry.
    fn is_taken(&self, old: &Path, new: &Path) -> bool {
        self.claimed.contains(new) || (new.exists() && !is_case_only_change(old, new))
    }

    fn revert(&self, staged: &StagedFile) {
        if self.dryrun {
            return;
        }
        if let Err(error) = fs::rename(&staged.temp_path, &staged.source) {
            print_error!(
                "Failed to restore {} from {}: {error}",
                staged.source.display(),
                staged.temp_path.display()
            );
        }
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} renamed, {} skipped, {} failed",
            self.renamed, self.skipped, self.failed
        )
    }
}

/// Paths only differ by letter case.
fn is_case_only_change(old: &Path, new: &Path) -> bool {
    old != new && crate::path_to_string(old).to_lowercase() == crate::path_to_string(new).to_lowercase()
}

/// Rename through an intermediate name so case-only changes work on case-insensitive filesystems.
fn rename_with_temp_file(path: &Path, new_path: &Path) -> std::io::Result<()> {
    let mut temp_name = new_path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_file = PathBuf::from(temp_name);
    fs::rename(path, &temp_file)?;
    fs::rename(&temp_file, new_path)
}

#[cfg(test)]
mod applier_tests {
    use super::*;

    use std::fs::File;

    use tempfile::tempdir;

    use crate::movie_rename::planner::FileRename;

    fn staged(dir: &Path, name: &str, title: &str, year: u16) -> StagedFile {
        let source = dir.join(name);
        File::create(&source).unwrap();
        let title = CleanedTitle::new(title.to_string(), Some(year));
        StagedFile {
            temp_path: dir.join(format!("temp_{title}.mkv")),
            source,
            title,
            extension: ".mkv".to_string(),
        }
    }

    #[test]
    fn dryrun_does_not_touch_files() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("a.mkv");
        let new = dir.path().join("b.mkv");
        File::create(&old).unwrap();

        let mut applier = Applier::new(dir.path().to_path_buf(), true, false);
        assert!(applier.rename(&old, &new));
        assert!(old.exists());
        assert!(!new.exists());
        assert_eq!(applier.log().to_string(), "a.mkv -> b.mkv\n");
        assert_eq!(applier.stats().renamed, 1);
        assert!(applier.was_renamed(&old));
        assert!(!applier.was_renamed(&new));
    }

    #[test]
    fn never_overwrites() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("a.mkv");
        let new = dir.path().join("b.mkv");
        File::create(&old).unwrap();
        File::create(&new).unwrap();

        let mut applier = Applier::new(dir.path().to_path_buf(), false, false);
        assert!(!applier.rename(&old, &new));
        assert!(old.exists());
        assert!(applier.log().is_empty());
        assert_eq!(applier.stats().skipped, 1);
    }

    #[test]
    fn case_only_rename() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("heat (1995).mkv");
        let new = dir.path().join("Heat (1995).mkv");
        File::create(&old).unwrap();

        let mut applier = Applier::new(dir.path().to_path_buf(), false, false);
        assert!(applier.rename(&old, &new));
        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["Heat (1995).mkv".to_string()]);
    }

    #[test]
    fn claimed_destination_is_detected_in_dryrun() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("Heat (1995)");
        let plan = RenamePlan {
            source: dir.path().join("heat"),
            target: target.clone(),
            target_name: "Heat (1995)".to_string(),
            file_renames: vec![
                FileRename {
                    old_path: target.join("en.srt"),
                    new_path: target.join("Heat (1995).srt"),
                    role: EntryRole::Subtitle,
                },
                FileRename {
                    old_path: target.join("fi.srt"),
                    new_path: target.join("Heat (1995).srt"),
                    role: EntryRole::Subtitle,
                },
            ],
        };
        fs::create_dir(&plan.source).unwrap();

        let mut applier = Applier::new(dir.path().to_path_buf(), true, false);
        applier.apply_folder(&plan);
        assert_eq!(
            applier.stats(),
            RunStats {
                renamed: 2,
                skipped: 1,
                failed: 0
            }
        );
        assert_eq!(applier.log().entries()[1].from, "en.srt");
    }

    #[test]
    fn declined_subtitle_is_left_alone() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("Heat (1995)");
        fs::create_dir(&folder).unwrap();
        for name in ["en.srt", "fi.srt"] {
            File::create(folder.join(name)).unwrap();
        }
        let plan = RenamePlan {
            source: folder.clone(),
            target: folder.clone(),
            target_name: "Heat (1995)".to_string(),
            file_renames: vec![
                FileRename {
                    old_path: folder.join("en.srt"),
                    new_path: folder.join("Heat (1995).srt"),
                    role: EntryRole::Subtitle,
                },
                FileRename {
                    old_path: folder.join("fi.srt"),
                    new_path: folder.join("Heat (1995).srt"),
                    role: EntryRole::Subtitle,
                },
            ],
        };

        let mut applier = Applier::new(dir.path().to_path_buf(), false, false)
            .with_subtitle_confirm(|subtitle: &str, _: &str| subtitle == "en.srt");
        applier.apply_folder(&plan);
        assert!(folder.join("Heat (1995).srt").exists());
        assert!(folder.join("fi.srt").exists());
        assert_eq!(applier.stats().skipped, 1);
    }

    #[test]
    fn two_phase_rename() {
        let dir = tempdir().unwrap();
        let staged = staged(dir.path(), "Heat.1995.1080p.mkv", "Heat", 1995);

        let mut applier = Applier::new(dir.path().to_path_buf(), false, false);
        applier.apply_staged(&staged, |title| Some(title.canonical()));
        assert!(dir.path().join("Heat (1995).mkv").exists());
        assert!(!staged.source.exists());
        assert!(!staged.temp_path.exists());
        assert_eq!(applier.log().to_string(), "Heat.1995.1080p.mkv -> Heat (1995).mkv\n");
    }

    #[test]
    fn two_phase_reverts_to_original_name() {
        let dir = tempdir().unwrap();
        let staged = staged(dir.path(), "Heat.1995.1080p.mkv", "Heat", 1995);

        let mut applier = Applier::new(dir.path().to_path_buf(), false, false);
        applier.apply_staged(&staged, |_| None);
        assert!(staged.source.exists());
        assert!(!staged.temp_path.exists());
        assert!(applier.log().is_empty());
        assert_eq!(applier.stats().skipped, 1);
    }

    #[test]
    fn two_phase_reverts_on_collision() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("Heat (1995).mkv")).unwrap();
        let staged = staged(dir.path(), "Heat.1995.1080p.mkv", "Heat", 1995);

        let mut applier = Applier::new(dir.path().to_path_buf(), false, false);
        applier.apply_staged(&staged, |title| Some(title.canonical()));
        assert!(staged.source.exists());
        assert!(!staged.temp_path.exists());
        assert_eq!(applier.stats().skipped, 1);
    }

    #[test]
    fn writes_log_file() {
        let dir = tempdir().unwrap();
        let mut log = RenameLog::default();
        log.push("a", "b");
        log.push("c", "d");
        let path = dir.path().join("rename_log.txt");
        fs::write(&path, "old contents\n").unwrap();
        log.write(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a -> b\nc -> d\n");
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn detects_case_only_change() {
        assert!(is_case_only_change(Path::new("/a/heat.mkv"), Path::new("/a/Heat.mkv")));
        assert!(!is_case_only_change(Path::new("/a/heat.mkv"), Path::new("/a/heat.mkv")));
        assert!(!is_case_only_change(Path::new("/a/heat.mkv"), Path::new("/a/heat.avi")));
    }

    #[test]
    fn failed_file_rename_does_not_stop_the_plan() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("Heat (1995)");
        fs::create_dir(&folder).unwrap();
        File::create(folder.join("en.srt")).unwrap();
        let plan = RenamePlan {
            source: folder.clone(),
            target: folder.clone(),
            target_name: "Heat (1995)".to_string(),
            file_renames: vec![
                FileRename {
                    old_path: folder.join("missing.mkv"),
                    new_path: folder.join("Heat (1995).mkv"),
                    role: EntryRole::PrimaryVideo,
                },
                FileRename {
                    old_path: folder.join("en.srt"),
                    new_path: folder.join("Heat (1995).srt"),
                    role: EntryRole::Subtitle,
                },
            ],
        };

        let mut applier = Applier::new(dir.path().to_path_buf(), false, false);
        applier.apply_folder(&plan);
        assert_eq!(
            applier.stats(),
            RunStats {
                renamed: 1,
                skipped: 0,
                failed: 1
            }
        );
        assert!(folder.join("Heat (1995).srt").exists());
        assert_eq!(applier.log().to_string(), "en.srt -> Heat (1995).srt\n");
    }

    #[test]
    fn failed_folder_rename_leaves_files_alone() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("Heat (1995)");
        let plan = RenamePlan {
            source: dir.path().join("heat"),
            target: target.clone(),
            target_name: "Heat (1995)".to_string(),
            file_renames: vec![FileRename {
                old_path: target.join("Heat.1995.mkv"),
                new_path: target.join("Heat (1995).mkv"),
                role: EntryRole::PrimaryVideo,
            }],
        };

        let mut applier = Applier::new(dir.path().to_path_buf(), false, false);
        applier.apply_folder(&plan);
        assert_eq!(
            applier.stats(),
            RunStats {
                renamed: 0,
                skipped: 0,
                failed: 1
            }
        );
        assert!(applier.log().is_empty());
        assert!(!target.exists());
    }

    #[test]
    fn failed_second_phase_restores_original_name() {
        let dir = tempdir().unwrap();
        let staged = staged(dir.path(), "Heat.1995.1080p.mkv", "Heat", 1995);

        let mut applier = Applier::new(dir.path().to_path_buf(), false, false);
        applier.apply_staged(&staged, |title| Some(format!("missing/{}", title.canonical())));
        assert!(staged.source.exists());
        assert!(!staged.temp_path.exists());
        assert!(!dir.path().join("missing").exists());
        assert!(applier.log().is_empty());
        assert_eq!(applier.stats().failed, 1);
    }

    #[test]
    fn failed_first_phase_is_counted() {
        let dir = tempdir().unwrap();
        let title = CleanedTitle::new("Heat".to_string(), Some(1995));
        let staged = StagedFile {
            source: dir.path().join("Heat.1995.mkv"),
            temp_path: dir.path().join("temp_Heat (1995).mkv"),
            title,
            extension: ".mkv".to_string(),
        };

        let mut applier = Applier::new(dir.path().to_path_buf(), false, false);
        applier.apply_staged(&staged, |_| panic!("verification must not run"));
        assert_eq!(applier.stats().failed, 1);
        assert!(applier.log().is_empty());
    }

    #[test]
    fn stats_display() {
        let stats = RunStats {
            renamed: 3,
            skipped: 1,
            failed: 0,
        };
        assert_eq!(stats.to_string(), "3 renamed, 1 skipped, 0 failed");
    }
}
