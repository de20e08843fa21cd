use std::path::PathBuf;
use std::time::Duration;

use itertools::Itertools;

use movie_renamer::movie_rename::{MovieRenameConfig, MovieRenameUserConfig};
use movie_renamer::print_error;

use crate::Args;

/// Create the root directory and final config from command line args and the user config file.
///
/// # Errors
/// Returns an error if the target directory does not exist.
pub fn try_from_args(args: Args) -> anyhow::Result<(PathBuf, MovieRenameConfig)> {
    let user_config = MovieRenameUserConfig::get_user_config().unwrap_or_else(|error| {
        print_error!("{error:#}");
        MovieRenameUserConfig::default()
    });
    let path = args.path.clone().or_else(|| user_config.directory.clone());
    let root = movie_renamer::resolve_input_dir(path.as_deref())?;
    let env_api_key = movie_renamer::config::api_key_from_env();
    Ok((root, from_args(args, user_config, env_api_key)))
}

/// Merge args over the user config.
///
/// Boolean flags are combined, values given on the command line take precedence.
fn from_args(args: Args, user_config: MovieRenameUserConfig, env_api_key: Option<String>) -> MovieRenameConfig {
    let cli_api_key = args.api_key.map(|key| key.trim().to_string()).filter(|key| !key.is_empty());
    let yes = args.yes;
    let no_root = args.no_root;
    let user_config = MovieRenameUserConfig {
        api_key: cli_api_key.or(env_api_key).or(user_config.api_key),
        cleanup: args.cleanup || user_config.cleanup,
        debug: args.debug || user_config.debug,
        dryrun: args.print || user_config.dryrun,
        extra_keywords: user_config
            .extra_keywords
            .into_iter()
            .chain(args.keyword)
            .unique()
            .collect(),
        online: args.online || user_config.online,
        query_mode: args.query_mode.or(user_config.query_mode),
        scan_mode: args.scan_mode.or(user_config.scan_mode),
        timeout: args.timeout.or(user_config.timeout),
        verbose: args.verbose || user_config.verbose,
        ..user_config
    };

    let mut config = MovieRenameConfig::from_user_config(user_config);
    config.confirm_subtitles = config.confirm_subtitles && !yes;
    config.include_root_files = config.include_root_files && !no_root;
    if config.timeout.is_zero() {
        config.timeout = Duration::from_secs(movie_renamer::movie_rename::DEFAULT_TIMEOUT_SECONDS);
    }
    config
}
