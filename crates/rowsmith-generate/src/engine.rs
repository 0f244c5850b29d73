use std::path::{Path, PathBuf};
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use rowsmith_core::{Fields, LinearDefaults};
use rowsmith_profile::Profile;

use crate::assemble::{Row, assemble_row};
use crate::compile::compile_tree;
use crate::errors::{GenerationError, Result};
use crate::model::{GenerateOptions, GenerationIssue, GenerationReport, OutputFormat};
use crate::output::csv::write_rows_csv;
use crate::output::json::write_rows_json;
use crate::walker::TreeWalker;

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub run_dir: PathBuf,
    pub report: GenerationReport,
}

/// Entry point for generating rows from a parsed profile.
#[derive(Debug, Clone)]
pub struct GenerationEngine {
    options: GenerateOptions,
}

impl GenerationEngine {
    pub fn new(options: GenerateOptions) -> Self {
        Self { options }
    }

    pub fn run(&self, profile: &Profile) -> Result<GenerationResult> {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();
        let run_dir = self
            .options
            .out_dir
            .join(format!("{timestamp}__run_{run_id}"));
        std::fs::create_dir_all(&run_dir)?;

        let mut report =
            GenerationReport::new(run_id.clone(), self.options.seed, self.options.rows);

        info!(
            run_id = %run_id,
            fields = profile.fields.len(),
            rows = self.options.rows,
            seed = self.options.seed,
            strict = self.options.strict,
            "generation started"
        );

        let outcome = self.generate_and_write(profile, &run_dir, &mut report);

        let elapsed = start.elapsed();
        report.duration_ms = elapsed.as_millis() as u64;
        report.throughput_bytes_per_sec = if elapsed.as_secs_f64() > 0.0 {
            report.bytes_written as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let report_path = run_dir.join("generation_report.json");
        let write_report = |report: &GenerationReport| -> Result<()> {
            std::fs::write(&report_path, serde_json::to_vec_pretty(report)?)?;
            Ok(())
        };

        match outcome {
            Ok(()) => {
                write_report(&report)?;
                info!(
                    run_id = %run_id,
                    rows_emitted = report.rows_emitted,
                    combinations = report.combinations_consumed,
                    retries = report.assembly_retries,
                    duration_ms = report.duration_ms,
                    bytes_written = report.bytes_written,
                    "generation completed"
                );
                Ok(GenerationResult { run_dir, report })
            }
            Err(err) => {
                record_generation_failure(&mut report, err.to_string());
                write_report(&report)?;
                warn!(run_id = %run_id, error = %err, "generation failed");
                Err(err)
            }
        }
    }

    fn generate_and_write(
        &self,
        profile: &Profile,
        run_dir: &Path,
        report: &mut GenerationReport,
    ) -> Result<()> {
        let tree = compile_tree(profile)?;
        let defaults = LinearDefaults::default();
        let mut walker = TreeWalker::new(&profile.fields, &tree, defaults.clone());

        let stream_seed = hash_seed(self.options.seed, &profile_key(&profile.fields));
        let budget = self
            .options
            .rows
            .saturating_mul(self.options.max_attempts_row as u64);
        let mut rows: Vec<Row> = Vec::with_capacity(self.options.rows as usize);
        let mut attempts: u64 = 0;
        let mut attempts_this_row: u32 = 0;

        while (rows.len() as u64) < self.options.rows && attempts < budget {
            let row_spec = match walker.next() {
                Some(spec) => spec,
                None => {
                    walker.reset();
                    report.record_walk_restart();
                    match walker.next() {
                        Some(spec) => spec,
                        None => {
                            // a fresh walk yielded nothing: every combination
                            // in the tree is contradictory
                            record_issue(
                                report,
                                "profile_unsatisfiable",
                                "every constraint combination is contradictory; no row can satisfy this profile"
                                    .to_string(),
                                None,
                            );
                            break;
                        }
                    }
                }
            };
            report.record_combination();
            attempts += 1;

            let row_seed = hash_row_seed(stream_seed, rows.len() as u64, attempts_this_row);
            let mut rng = ChaCha8Rng::seed_from_u64(row_seed);
            match assemble_row(
                &row_spec,
                &profile.fields,
                &defaults,
                self.options.null_chance,
                &mut rng,
            )? {
                Some(row) => {
                    rows.push(row);
                    attempts_this_row = 0;
                }
                None => {
                    report.record_retry();
                    attempts_this_row = attempts_this_row.saturating_add(1);
                }
            }
        }

        let emitted = rows.len() as u64;
        report.rows_emitted = emitted;
        if emitted < self.options.rows {
            if self.options.strict {
                return Err(GenerationError::Exhausted {
                    emitted,
                    requested: self.options.rows,
                });
            }
            record_issue(
                report,
                "rows_underfilled",
                format!("emitted {emitted} of {} requested rows", self.options.rows),
                None,
            );
        }

        let rows_path = run_dir.join(self.options.format.file_name());
        let bytes = match self.options.format {
            OutputFormat::Csv => write_rows_csv(&rows_path, &profile.fields, &rows)?,
            OutputFormat::Json => write_rows_json(&rows_path, &profile.fields, &rows)?,
        };
        report.bytes_written = bytes;
        info!(rows = emitted, path = %rows_path.display(), "rows written");
        Ok(())
    }
}

fn record_issue(
    report: &mut GenerationReport,
    code: &str,
    message: String,
    field: Option<String>,
) {
    let issue = GenerationIssue {
        level: "warning".to_string(),
        code: code.to_string(),
        message,
        field,
    };
    log_issue(&issue);
    report.record_warning(issue);
}

fn record_generation_failure(report: &mut GenerationReport, message: String) {
    let issue = GenerationIssue {
        level: "error".to_string(),
        code: "generation_failed".to_string(),
        message,
        field: None,
    };
    log_issue(&issue);
    report.record_warning(issue);
}

fn log_issue(issue: &GenerationIssue) {
    warn!(
        code = %issue.code,
        field = issue.field.as_deref().unwrap_or(""),
        message = %issue.message
    );
}

fn profile_key(fields: &Fields) -> String {
    let names: Vec<&str> = fields.iter().map(|field| field.name.as_str()).collect();
    names.join(",")
}

fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn hash_row_seed(stream_seed: u64, row_index: u64, attempt: u32) -> u64 {
    let mut hash = stream_seed ^ row_index.wrapping_mul(0x9e3779b97f4a7c15);
    hash ^= attempt as u64;
    hash = hash.wrapping_mul(0x100000001b3);
    hash
}

#[cfg(test)]
mod tests {
    use rowsmith_core::{AtomicKind, Constraint, Field, FieldType, Fields};
    use uuid::Uuid;

    use super::*;

    fn impossible_profile() -> Profile {
        let amount = Field::new("amount", FieldType::Numeric).not_nullable();
        Profile {
            fields: Fields::new(vec![amount.clone()]).expect("valid fields"),
            constraints: vec![
                Constraint::atomic(amount.clone(), AtomicKind::GreaterThan(10.0)),
                Constraint::atomic(amount, AtomicKind::LessThan(5.0)),
            ],
            warnings: Vec::new(),
        }
    }

    fn temp_out_dir() -> PathBuf {
        std::env::temp_dir().join(format!("rowsmith-engine-{}", Uuid::new_v4()))
    }

    #[test]
    fn unsatisfiable_profiles_emit_zero_rows_and_a_warning() {
        let out_dir = temp_out_dir();
        let engine = GenerationEngine::new(GenerateOptions {
            out_dir: out_dir.clone(),
            rows: 5,
            ..GenerateOptions::default()
        });

        let result = engine.run(&impossible_profile()).expect("non-strict run");
        assert_eq!(result.report.rows_emitted, 0);
        assert!(
            result
                .report
                .warnings
                .iter()
                .any(|issue| issue.code == "profile_unsatisfiable")
        );
        assert!(result.run_dir.join("rows.csv").exists());
        assert!(result.run_dir.join("generation_report.json").exists());
        std::fs::remove_dir_all(&out_dir).ok();
    }

    #[test]
    fn strict_mode_turns_underfill_into_an_error() {
        let out_dir = temp_out_dir();
        let engine = GenerationEngine::new(GenerateOptions {
            out_dir: out_dir.clone(),
            rows: 5,
            strict: true,
            ..GenerateOptions::default()
        });

        let err = engine
            .run(&impossible_profile())
            .expect_err("strict run must fail");
        match err {
            GenerationError::Exhausted { emitted, requested } => {
                assert_eq!(emitted, 0);
                assert_eq!(requested, 5);
            }
            other => panic!("expected Exhausted, got {other}"),
        }
        std::fs::remove_dir_all(&out_dir).ok();
    }

    #[test]
    fn row_seeds_differ_across_rows_and_attempts() {
        let stream = hash_seed(42, "a,b");
        assert_ne!(hash_row_seed(stream, 0, 0), hash_row_seed(stream, 1, 0));
        assert_ne!(hash_row_seed(stream, 0, 0), hash_row_seed(stream, 0, 1));
        assert_ne!(stream, hash_seed(42, "a,b,c"));
        assert_eq!(stream, hash_seed(42, "a,b"));
    }
}
