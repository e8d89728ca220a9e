//! Replays `fixtures/*.json` cases against the decoder.
//!
//! A case holds a schema, a list of raw records, and for each record either
//! the expected failures as `"field:kind"` strings (in report order) or
//! `null` when the record as a whole must be rejected.
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Deserialize;
use serde_json::Value;

use json_failable::path_de::from_str_with_path;
use json_failable::record::RecordSpec;

#[derive(Debug, Deserialize)]
struct Case {
    #[serde(default)]
    description: String,
    schema: Value,
    records: Vec<Value>,
    expect: Vec<Option<Vec<String>>>,
}

fn main() -> Result<ExitCode> {
    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("fixtures"));

    let mut paths: Vec<PathBuf> = std::fs::read_dir(&dir)
        .with_context(|| format!("failed to read fixture dir {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut failed = 0usize;
    for path in &paths {
        match run_case(path) {
            Ok(mismatches) if mismatches.is_empty() => {
                println!("{} {}", "pass".green().bold(), path.display());
            }
            Ok(mismatches) => {
                failed += 1;
                println!("{} {}", "FAIL".red().bold(), path.display());
                for m in mismatches {
                    println!("    {m}");
                }
            }
            Err(error) => {
                failed += 1;
                println!("{} {}: {error:#}", "ERROR".red().bold(), path.display());
            }
        }
    }
    println!("{} cases, {} failed", paths.len(), failed);
    Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn run_case(path: &Path) -> Result<Vec<String>> {
    let src = std::fs::read_to_string(path)?;
    let case: Case = from_str_with_path(&src)?;
    anyhow::ensure!(
        case.records.len() == case.expect.len(),
        "{} records but {} expectations",
        case.records.len(),
        case.expect.len()
    );
    let spec = RecordSpec::from_schema(&case.schema).context("bad schema")?;

    let mut mismatches = Vec::new();
    for (i, (raw, expect)) in case.records.iter().zip(&case.expect).enumerate() {
        let actual = spec.decode(raw).ok().map(|rec| {
            rec.report()
                .iter()
                .map(|f| format!("{}:{}", f.field, f.error.kind()))
                .collect::<Vec<_>>()
        });
        if &actual != expect {
            mismatches.push(format!(
                "{} record {i}: expected {expect:?}, got {actual:?}",
                case.description
            ));
        }
    }
    Ok(mismatches)
}
