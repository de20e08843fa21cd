mod config;

use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use clap_complete::Shell;

use movie_renamer::movie_rename::{MovieRename, QueryMode, ScanMode};
use movie_renamer::print_error;

#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Rename movie folders and files to the `Title (Year)` format"
)]
pub(crate) struct Args {
    /// Optional target directory
    #[arg(value_hint = clap::ValueHint::DirPath)]
    path: Option<PathBuf>,

    /// OMDb API key
    #[arg(short = 'a', long, value_name = "KEY")]
    api_key: Option<String>,

    /// Remove leftover keywords from file names after renaming
    #[arg(short = 'c', long)]
    cleanup: bool,

    /// Enable debug prints
    #[arg(short = 'D', long)]
    debug: bool,

    /// Additional keyword to remove from titles
    #[arg(short = 'k', long, num_args = 1, action = clap::ArgAction::Append, name = "KEYWORD")]
    keyword: Vec<String>,

    /// Skip loose files directly under the target directory
    #[arg(short = 'n', long)]
    no_root: bool,

    /// Verify titles online with OMDb
    #[arg(short = 'o', long)]
    online: bool,

    /// Only print changes without renaming
    #[arg(short = 'p', long)]
    print: bool,

    /// OMDb query type
    #[arg(short = 'q', long, value_enum)]
    query_mode: Option<QueryMode>,

    /// How the target directory is scanned
    #[arg(short = 's', long, value_enum)]
    scan_mode: Option<ScanMode>,

    /// OMDb request timeout in seconds
    #[arg(short = 't', long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Rename all subtitles without asking
    #[arg(short = 'y', long)]
    yes: bool,

    /// Create shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if let Some(ref shell) = args.completion {
        movie_renamer::generate_shell_completion(*shell, Args::command(), true, env!("CARGO_BIN_NAME"))
    } else {
        if let Err(error) = run(args) {
            print_error!("{error:#}");
        }
        Ok(())
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let (root, config) = config::try_from_args(args)?;
    MovieRename::new(root, config).run()?;
    Ok(())
}
