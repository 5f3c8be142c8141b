use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Enrollment and grade-record sidecar speaking line-delimited JSON on stdin/stdout."
)]
pub struct Cli {
    /// Open (or create) the workspace database at startup instead of waiting
    /// for a workspace.select request
    #[arg(short, long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
