use anyhow::Result;
use bahkat::commands::{self, DownloadOptions};
use clap::Parser;
use std::path::PathBuf;

/// bahkat - package status and installer downloads
///
/// Compares the packages listed in a JSON index against what is recorded
/// as installed, and downloads installers for them in parallel.
///
/// Examples:
///   bahkat status packages.json            # Show what is installed and outdated
///   bahkat download packages.json -j 4     # Fetch installers, four at a time
///   bahkat skip packages.json speller      # Stop offering this speller version
#[derive(Parser, Debug)]
#[command(author, version = env!("BAHKAT_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding installed-state records (also via BAHKAT_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "BAHKAT_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub store_root: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Show the install status of every listed package
    Status(StatusArgs),

    /// Skip the listed version of a package when offering updates
    Skip(SkipArgs),

    /// Download installers for the listed packages
    Download(DownloadArgs),
}

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// JSON file with the package list
    #[arg(value_name = "PACKAGES")]
    pub packages: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct SkipArgs {
    /// JSON file with the package list
    #[arg(value_name = "PACKAGES")]
    pub packages: PathBuf,

    /// Id of the package to skip
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct DownloadArgs {
    /// JSON file with the package list
    #[arg(value_name = "PACKAGES")]
    pub packages: PathBuf,

    /// Maximum number of concurrent downloads
    #[arg(long, short = 'j', env = "BAHKAT_JOBS", value_name = "N")]
    pub jobs: Option<usize>,

    /// Directory to save installers in (defaults to the temp directory)
    #[arg(long, short = 'd', value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Only download packages with an update available
    #[arg(long)]
    pub only_updates: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = bahkat::runtime::RealRuntime;

    match cli.command {
        Commands::Status(args) => commands::status(runtime, &args.packages, cli.store_root)?,
        Commands::Skip(args) => commands::skip(runtime, &args.packages, &args.id, cli.store_root)?,
        Commands::Download(args) => {
            let options = DownloadOptions {
                scratch_dir: args.dir,
                max_concurrent: args.jobs,
                only_updates: args.only_updates,
            };
            commands::download(runtime, &args.packages, cli.store_root, options).await?
        }
    }
    Ok(())
}
