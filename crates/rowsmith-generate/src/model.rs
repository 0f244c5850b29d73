use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Output format for generated rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn file_name(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "rows.csv",
            OutputFormat::Json => "rows.json",
        }
    }
}

/// Options for the generation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Directory where run artifacts are written.
    pub out_dir: PathBuf,
    /// Number of rows to generate.
    pub rows: u64,
    /// Base seed for the deterministic random stream.
    pub seed: u64,
    /// Maximum attempts to build a single row.
    pub max_attempts_row: u32,
    /// Chance of emitting the absent value for a nullable field.
    pub null_chance: f64,
    /// Fail instead of under-filling when the attempt budget runs out.
    pub strict: bool,
    /// Format of the generated row file.
    pub format: OutputFormat,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("out"),
            rows: 100,
            seed: 0,
            max_attempts_row: 50,
            null_chance: 0.1,
            strict: false,
            format: OutputFormat::Csv,
        }
    }
}

/// Structured generation issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationIssue {
    pub level: String,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Report for a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub seed: u64,
    pub rows_requested: u64,
    pub rows_emitted: u64,
    pub combinations_consumed: u64,
    pub walk_restarts: u64,
    pub assembly_retries: u64,
    pub bytes_written: u64,
    pub duration_ms: u64,
    pub throughput_bytes_per_sec: f64,
    pub warnings_by_code: BTreeMap<String, u64>,
    pub warnings: Vec<GenerationIssue>,
}

impl GenerationReport {
    pub fn new(run_id: String, seed: u64, rows_requested: u64) -> Self {
        Self {
            run_id,
            seed,
            rows_requested,
            rows_emitted: 0,
            combinations_consumed: 0,
            walk_restarts: 0,
            assembly_retries: 0,
            bytes_written: 0,
            duration_ms: 0,
            throughput_bytes_per_sec: 0.0,
            warnings_by_code: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn record_retry(&mut self) {
        self.assembly_retries += 1;
    }

    pub fn record_combination(&mut self) {
        self.combinations_consumed += 1;
    }

    pub fn record_walk_restart(&mut self) {
        self.walk_restarts += 1;
    }

    pub fn record_warning(&mut self, issue: GenerationIssue) {
        *self.warnings_by_code.entry(issue.code.clone()).or_insert(0) += 1;
        self.warnings.push(issue);
    }
}
