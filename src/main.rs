use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use globalprogram::{
    LoadOptions, LocaleId, LocaleSource, SourceFormat, discover_sources, load, render_json,
    render_text, validate,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    Auto,
    Json,
    FlatJson,
    LanguageV1,
    KeyValue,
}

impl From<InputFormat> for SourceFormat {
    fn from(format: InputFormat) -> Self {
        match format {
            InputFormat::Auto => SourceFormat::Auto,
            InputFormat::Json => SourceFormat::Json,
            InputFormat::FlatJson => SourceFormat::FlatJson,
            InputFormat::LanguageV1 => SourceFormat::LanguageV1,
            InputFormat::KeyValue => SourceFormat::KeyValue,
        }
    }
}

/// Check translation coverage of locale files against a reference locale.
///
/// Exits with status 1 when a locale is missing keys or has placeholder
/// mismatches, when nothing could be loaded, or when the reference locale is absent.
#[derive(Debug, Parser)]
#[command(name = "globalprogram-coverage", version)]
struct Cli {
    /// Locale files, or directories scanned one level deep
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Locale every other locale is compared against
    #[arg(short, long, env = "GLOBALPROGRAM_REFERENCE", default_value = "en")]
    reference: String,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Decoder for locale files (auto picks by extension)
    #[arg(short, long, value_enum, default_value_t = InputFormat::Auto)]
    format: InputFormat,

    /// Give up on files still loading after this many seconds
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Also fail on extraneous keys, malformed templates and unreadable files
    #[arg(long)]
    strict: bool,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_directive = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let reference = LocaleId::parse(&cli.reference)
        .ok_or_else(|| format!("invalid reference locale '{}'", cli.reference))?;

    let (files, mut load_errors) = discover_sources(&cli.paths);
    for error in &load_errors {
        tracing::warn!("{}", error);
    }
    let sources: Vec<LocaleSource> = files.into_iter().map(LocaleSource::new).collect();

    let mut options = LoadOptions::new(reference).with_format(cli.format.into());
    if let Some(seconds) = cli.timeout {
        options = options.with_timeout(Duration::from_secs(seconds));
    }

    let outcome = load(sources, &options).await;
    load_errors.extend(outcome.errors);
    let catalog = outcome.catalog;
    let report = validate(&catalog);

    match cli.output {
        OutputFormat::Text => {
            print!("{}", render_text(&report, &catalog));
            if !load_errors.is_empty() {
                println!();
                println!("Skipped sources");
                for error in &load_errors {
                    println!("  {}", error);
                }
            }
        }
        OutputFormat::Json => println!("{}", render_json(&report, &load_errors)?),
    }

    let passed = report.passes(cli.strict) && !(cli.strict && !load_errors.is_empty());
    if !passed {
        tracing::info!(status = ?report.status, "coverage check failed");
    }
    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
