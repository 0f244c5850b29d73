use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use rowsmith_generate::{GenerateOptions, GenerationEngine, GenerationError, OutputFormat};
use rowsmith_profile::{
    IssueSeverity, Profile, ProfileError, ValidationIssue, parse_profile, read_profile,
};
use serde_json::Value;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum CliError {
    #[error("profile error: {0}")]
    Profile(#[from] ProfileError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("profile validation failed with {errors} error(s)")]
    InvalidProfile { errors: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Parser, Debug)]
#[command(name = "rowsmith", version, about = "Rowsmith CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate rows from a profile document.
    Generate(GenerateArgs),
    /// Validate a profile document without generating rows.
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Path to the profile document.
    #[arg(long, value_name = "FILE")]
    profile: PathBuf,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    out: PathBuf,
    /// Number of rows to generate.
    #[arg(long, default_value_t = 100)]
    rows: u64,
    /// Base seed for the deterministic value stream.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Row file format: csv or json.
    #[arg(long, default_value = "csv")]
    format: String,
    /// Base directory for value-list files (defaults to the profile's directory).
    #[arg(long, value_name = "DIR")]
    from_file_dir: Option<PathBuf>,
    /// Chance of emitting null for a nullable field.
    #[arg(long, default_value_t = 0.1)]
    null_chance: f64,
    /// Attempt budget per requested row.
    #[arg(long, default_value_t = 50)]
    max_attempts_row: u32,
    /// Fail instead of under-filling when the attempt budget runs out.
    #[arg(long, default_value_t = false)]
    strict: bool,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Path to the profile document.
    #[arg(long, value_name = "FILE")]
    profile: PathBuf,
    /// Base directory for value-list files (defaults to the profile's directory).
    #[arg(long, value_name = "DIR")]
    from_file_dir: Option<PathBuf>,
}

fn main() -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Validate(args) => run_validate(args),
    }
}

fn run_generate(args: GenerateArgs) -> Result<(), CliError> {
    let GenerateArgs {
        profile,
        out,
        rows,
        seed,
        format,
        from_file_dir,
        null_chance,
        max_attempts_row,
        strict,
    } = args;

    let format = parse_format(&format)?;
    let profile = load_profile(&profile, from_file_dir.as_deref())?;
    for issue in &profile.warnings {
        print_issue(issue);
    }

    let options = GenerateOptions {
        out_dir: out,
        rows,
        seed,
        max_attempts_row,
        null_chance,
        strict,
        format,
    };
    let result = GenerationEngine::new(options).run(&profile)?;

    println!("run directory: {}", result.run_dir.display());
    println!(
        "rows: {} of {} requested, {} bytes in {} ms",
        result.report.rows_emitted,
        result.report.rows_requested,
        result.report.bytes_written,
        result.report.duration_ms,
    );

    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), CliError> {
    let ValidateArgs {
        profile,
        from_file_dir,
    } = args;

    let raw = fs::read_to_string(&profile)?;
    let profile_json: Value = serde_json::from_str(&raw)?;
    let base_dir = from_file_dir.as_deref().or_else(|| profile.parent());

    match parse_profile(&profile_json, base_dir) {
        Ok(lowered) => {
            for issue in &lowered.warnings {
                print_issue(issue);
            }
            println!(
                "profile is valid: {} field(s), {} constraint(s)",
                lowered.fields.len(),
                lowered.constraints.len(),
            );
            Ok(())
        }
        Err(ProfileError::Invalid { report }) => {
            for issue in report.errors.iter().chain(report.warnings.iter()) {
                print_issue(issue);
            }
            Err(CliError::InvalidProfile {
                errors: report.errors.len(),
            })
        }
        Err(other) => Err(other.into()),
    }
}

/// Loads a profile, resolving value-list files against `from_file_dir` when
/// given instead of the profile's own directory.
fn load_profile(path: &Path, from_file_dir: Option<&Path>) -> Result<Profile, CliError> {
    match from_file_dir {
        None => Ok(read_profile(path)?),
        Some(base_dir) => {
            let raw = fs::read_to_string(path)?;
            let profile_json: Value = serde_json::from_str(&raw)?;
            Ok(parse_profile(&profile_json, Some(base_dir))?)
        }
    }
}

fn print_issue(issue: &ValidationIssue) {
    let severity = match issue.severity {
        IssueSeverity::Error => "error",
        IssueSeverity::Warning => "warning",
    };
    match &issue.hint {
        Some(hint) => println!(
            "{severity} [{}] {}: {} ({hint})",
            issue.code, issue.path, issue.message
        ),
        None => println!(
            "{severity} [{}] {}: {}",
            issue.code, issue.path, issue.message
        ),
    }
}

fn parse_format(format: &str) -> Result<OutputFormat, CliError> {
    match format {
        "csv" => Ok(OutputFormat::Csv),
        "json" => Ok(OutputFormat::Json),
        other => Err(CliError::InvalidConfig(format!(
            "unknown format: {other} (expected csv or json)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names_map_to_output_formats() {
        assert!(matches!(parse_format("csv"), Ok(OutputFormat::Csv)));
        assert!(matches!(parse_format("json"), Ok(OutputFormat::Json)));
        assert!(parse_format("parquet").is_err());
    }

    #[test]
    fn cli_arguments_parse_with_defaults() {
        let cli = Cli::try_parse_from(["rowsmith", "generate", "--profile", "orders.json"])
            .expect("arguments should parse");
        match cli.command {
            Command::Generate(args) => {
                assert_eq!(args.profile, PathBuf::from("orders.json"));
                assert_eq!(args.out, PathBuf::from("runs"));
                assert_eq!(args.rows, 100);
                assert_eq!(args.seed, 0);
                assert_eq!(args.format, "csv");
                assert!(!args.strict);
            }
            Command::Validate(_) => panic!("expected the generate subcommand"),
        }
    }

    #[test]
    fn validate_subcommand_accepts_a_value_list_dir() {
        let cli = Cli::try_parse_from([
            "rowsmith",
            "validate",
            "--profile",
            "orders.json",
            "--from-file-dir",
            "lists",
        ])
        .expect("arguments should parse");
        match cli.command {
            Command::Validate(args) => {
                assert_eq!(args.from_file_dir, Some(PathBuf::from("lists")));
            }
            Command::Generate(_) => panic!("expected the validate subcommand"),
        }
    }
}
