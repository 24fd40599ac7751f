use crate::extract::ExtractorKind;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Errors and warnings from Xcode build logs, over stdio JSON-RPC or the command line.",
    long_about = None
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "XCODE_DERIVED_DATA",
        help = "DerivedData directory (default: ~/Library/Developer/Xcode/DerivedData)."
    )]
    pub derived_data: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = ExtractorKind::Gunzip,
        help = "How log files are turned into text."
    )]
    pub extractor: ExtractorKind,

    #[arg(
        long,
        global = true,
        help = "Append log output to this file instead of stderr."
    )]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the JSON-RPC server on stdin/stdout (the default).
    Serve,
    /// List the projects under DerivedData as JSON.
    Projects,
    /// Diagnostics from a project's latest build log.
    Diagnostics {
        #[arg(help = "Project directory name in DerivedData, e.g. 'MyApp-abc123'.")]
        project: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Parse one log file directly.
    Parse {
        #[arg(help = "Path to the log file.")]
        file: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(clap::Args, Debug, Clone, PartialEq, Eq)]
pub struct OutputArgs {
    #[arg(long, help = "Report errors only.")]
    pub no_warnings: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}
