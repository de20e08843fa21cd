use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use walkdir::WalkDir;

use crate::movie_rename::applier::{AcceptAll, Applier, RunStats, StdinConfirm, SubtitleConfirm};
use crate::movie_rename::config::{MovieRenameConfig, ScanMode};
use crate::movie_rename::planner::{EntryRole, PlanOutcome, Planner};
use crate::movie_rename::resolver::MatchResolver;
use crate::movie_rename::title::TitleNormalizer;
use crate::print_error;

/// Renames movie folders and files under a root directory.
#[derive(Debug)]
pub struct MovieRename {
    root: PathBuf,
    config: MovieRenameConfig,
}

impl MovieRename {
    #[must_use]
    pub const fn new(root: PathBuf, config: MovieRenameConfig) -> Self {
        Self { root, config }
    }

    /// Run with the configured OMDb client and subtitle prompt.
    ///
    /// # Errors
    /// Returns an error if the root directory cannot be read,
    /// the keywords do not compile, or the HTTP client cannot be created.
    pub fn run(&self) -> Result<RunStats> {
        let client = self.config.omdb_client()?;
        let resolver = client.as_ref().map(|client| client as &dyn MatchResolver);
        if self.config.confirm_subtitles && !self.config.dryrun {
            self.run_with(resolver, StdinConfirm)
        } else {
            self.run_with(resolver, AcceptAll)
        }
    }

    /// Run with the given resolver and subtitle confirmation.
    ///
    /// # Errors
    /// Returns an error if the root directory cannot be read or the keywords do not compile.
    pub fn run_with(
        &self,
        resolver: Option<&dyn MatchResolver>,
        confirm: impl SubtitleConfirm + 'static,
    ) -> Result<RunStats> {
        if self.config.debug {
            println!("{self}");
        }

        let normalizer = self.config.normalizer()?;
        let planner = Planner::new(&normalizer, resolver).with_verbose(self.config.verbose);
        let mut applier =
            Applier::new(self.root.clone(), self.config.dryrun, self.config.verbose).with_subtitle_confirm(confirm);

        match self.config.scan_mode {
            ScanMode::Folders => self.rename_folders(&planner, &mut applier)?,
            ScanMode::Loose => self.rename_loose_files(&planner, &mut applier),
        }

        if self.config.cleanup {
            self.cleanup(&normalizer, &mut applier);
        }

        let log_path = self.root.join(&self.config.log_file);
        if let Err(error) = applier.write_log(&log_path) {
            print_error!("{error:#}");
        }

        let stats = applier.stats();
        self.print_summary(stats, &log_path);
        Ok(stats)
    }

    /// Plan and apply each direct sub-directory.
    fn rename_folders(&self, planner: &Planner, applier: &mut Applier) -> Result<()> {
        for folder in self.movie_folders()? {
            if self.config.verbose {
                println!("{}", crate::path_to_filename_string(&folder).bold());
            }
            match planner.plan_folder(&folder) {
                PlanOutcome::Ready(plan) => applier.apply_folder(&plan),
                PlanOutcome::Skipped(reason) => applier.skip(&folder, &reason),
            }
        }
        Ok(())
    }

    /// Two-phase rename of every video and subtitle file under the root.
    fn rename_loose_files(&self, planner: &Planner, applier: &mut Applier) {
        for path in self.media_files(self.config.include_root_files) {
            match planner.stage_loose_file(&path) {
                Ok(staged) => applier.apply_staged(&staged, |title| planner.verify(title)),
                Err(reason) => applier.skip(&path, &reason),
            }
        }
    }

    /// Remove leftover keywords from file names after the main scan.
    fn cleanup(&self, normalizer: &TitleNormalizer, applier: &mut Applier) {
        if self.config.verbose {
            println!("{}", "Cleaning up leftover names".bold());
        }
        for path in self.media_files(true) {
            if applier.was_renamed(&path) {
                continue;
            }
            let Ok((stem, extension)) = crate::get_normalized_file_name_and_extension(&path) else {
                continue;
            };
            if !normalizer.needs_cleanup(&stem) {
                continue;
            }
            let cleaned = normalizer.cleanup_name(&stem);
            if cleaned.is_empty() || cleaned == stem {
                continue;
            }
            let new_path = if extension.is_empty() {
                path.with_file_name(cleaned)
            } else {
                path.with_file_name(format!("{cleaned}.{extension}"))
            };
            applier.rename(&path, &new_path);
        }
    }

    /// Non-hidden sub-directories of the root in case-insensitive name order.
    fn movie_folders(&self) -> Result<Vec<PathBuf>> {
        let mut folders = Vec::new();
        for entry in
            fs::read_dir(&self.root).with_context(|| format!("Failed to read directory {}", self.root.display()))?
        {
            let entry = entry.with_context(|| format!("Failed to read entry in {}", self.root.display()))?;
            if crate::is_hidden_name(&entry.file_name()) {
                continue;
            }
            let path = entry.path();
            if path.is_dir() {
                folders.push(path);
            }
        }
        folders.sort_by_key(|path| crate::path_to_filename_string(path).to_lowercase());
        Ok(folders)
    }

    /// Video and subtitle files under the root, skipping hidden entries.
    fn media_files(&self, include_root_files: bool) -> Vec<PathBuf> {
        let min_depth = if include_root_files { 1 } else { 2 };
        WalkDir::new(&self.root)
            .min_depth(min_depth)
            .sort_by(|a, b| {
                a.file_name()
                    .to_string_lossy()
                    .to_lowercase()
                    .cmp(&b.file_name().to_string_lossy().to_lowercase())
            })
            .into_iter()
            .filter_entry(|entry| !crate::is_hidden(entry))
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| EntryRole::from_path(path).is_media())
            .collect()
    }

    fn print_summary(&self, stats: RunStats, log_path: &Path) {
        let verb = if self.config.dryrun { "would rename" } else { "renamed" };
        let message = format!(
            "{} {verb}, {} skipped, {} failed",
            stats.renamed, stats.skipped, stats.failed
        );
        if stats.failed > 0 {
            println!("{}", message.red());
        } else if self.config.dryrun {
            println!("{message}");
        } else {
            println!("{}", message.green());
        }
        println!("Log: {}", log_path.display());
    }
}

impl fmt::Display for MovieRename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Root: {}", self.root.display())?;
        write!(f, "{}", self.config)
    }
}
