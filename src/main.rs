//! # xcode-diagnostics
//!
//! Reads the newest Xcode build log of a project and reports its errors and
//! warnings, either to a JSON-RPC client on stdio or on the command line.
//!
//! ```sh
//! xcode-diagnostics                      # serve on stdin/stdout
//! xcode-diagnostics projects
//! xcode-diagnostics diagnostics MyApp-abc123 --format text
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use xcode_diagnostics::cli::{Command, OutputArgs, OutputFormat};
use xcode_diagnostics::prelude::*;
use xcode_diagnostics::{
    extract_diagnostics, Cli, DerivedData, DiagnosticParser, DiagnosticsReport, McpServer,
};

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(path) = log_file {
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Opening log file {:?}", path))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    } else {
        builder.target(env_logger::Target::Stderr);
    }
    builder.init();
    Ok(())
}

fn print_report(report: &DiagnosticsReport, output: &OutputArgs) -> Result<()> {
    match output.format {
        OutputFormat::Json => {
            let text =
                serde_json::to_string_pretty(report).context("Serializing diagnostics report")?;
            println!("{}", text);
        }
        OutputFormat::Text => {
            let color = io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
            println!("{}", xcode_diagnostics::fmt::render_report(report, color));
        }
    }
    Ok(())
}

pub fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let derived_data = cli
        .derived_data
        .clone()
        .map(DerivedData::new)
        .unwrap_or_default();
    let extractor = cli.extractor.build();
    debug!(
        "DerivedData {} with {:?} extractor",
        derived_data.root().display(),
        cli.extractor
    );

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let server = McpServer::new(derived_data, extractor);
            let stdin = io::stdin();
            server.serve(stdin.lock(), io::stdout().lock())?;
        }
        Command::Projects => {
            let projects = derived_data.list_projects()?;
            let text = serde_json::to_string_pretty(&serde_json::json!({ "projects": projects }))
                .context("Serializing project list")?;
            println!("{}", text);
        }
        Command::Diagnostics { project, output } => {
            let report = extract_diagnostics(
                &derived_data,
                extractor.as_ref(),
                &project,
                !output.no_warnings,
            );
            print_report(&report, &output)?;
            if !report.success {
                std::process::exit(2);
            }
        }
        Command::Parse { file, output } => {
            if !file.is_file() {
                anyhow::bail!("No such log file: {}", file.display());
            }
            let outcome =
                DiagnosticParser::new(!output.no_warnings).parse_log(extractor.as_ref(), &file);
            info!("{:?}", outcome.stats);
            let report = DiagnosticsReport::from_outcome(&file, outcome);
            print_report(&report, &output)?;
        }
    }
    Ok(())
}
