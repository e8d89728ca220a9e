//! Minimal CLI: schema + JSON/NDJSON inputs → (check | clean)
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use json_failable::error::RecordError;
use json_failable::jq_exec::JqFilter;
use json_failable::path_de;
use json_failable::record::{DecodedRecord, EncodeMode, Policy, RecordSpec};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// decode JSON/NDJSON records field by field against a schema, reporting per-field failures
#[derive(Parser, Debug)]
#[command(name = "json-failable")]
pub struct CommandLineInterface {
    /// log decode details to stderr (same as RUST_LOG=debug)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// decode every record and print its failure report
    Check(CheckOut),
    /// write the present values of every accepted record as NDJSON
    Clean(CleanOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// schema describing the record type (JSON-schema-ish object with `properties`)
    #[arg(long, short)]
    schema: PathBuf,

    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// which failures still let a record through
    #[arg(long, value_enum, default_value_t = PolicyArg::Strict)]
    policy: PolicyArg,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum PolicyArg {
    Strict,
    RequiredOnly,
    Lenient,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ReportFormat {
    Text,
    Json,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CleanOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// write failed and absent fields as null instead of omitting them
    #[arg(long)]
    nulls: bool,

    /// output .ndjson file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// One raw record plus where it came from. A line that failed to parse
/// keeps its syntax error in place of the value.
struct Document {
    source: String,
    index: usize,
    value: Result<Value, RecordError>,
}

/// A document after decoding.
struct Checked {
    source: String,
    index: usize,
    outcome: Result<DecodedRecord, RecordError>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl From<PolicyArg> for Policy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Strict => Policy::Strict,
            PolicyArg::RequiredOnly => Policy::RequiredOnly,
            PolicyArg::Lenient => Policy::Lenient,
        }
    }
}

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let jq = self.jq_expr.as_deref().map(JqFilter::compile).transpose()?;
        let source_paths = resolve_file_path_patterns(&self.input)
            .map_err(|e| anyhow::anyhow!("failed to resolve input file paths: {e}"))?;

        let mut out = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = read_source(&source_path)
                .with_context(|| format!("failed to read source file ({source_path_str})"))?;

            let mut index = 0usize;
            let mut values = Vec::new();
            if self.ndjson {
                for (line_no, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let parsed = parse_document(line);
                    if let Err(e) = &parsed {
                        tracing::warn!(source = %source_path_str, line = line_no + 1, error = %e, "unparseable NDJSON line");
                    }
                    values.push(parsed);
                }
            } else {
                values.push(parse_document(&source));
            }

            for value in values {
                let value = match value {
                    Ok(value) => value,
                    Err(e) => {
                        out.push(Document { source: source_path_str.clone(), index, value: Err(e) });
                        index += 1;
                        continue;
                    }
                };
                let value = match self.json_pointer.as_deref() {
                    None => value,
                    Some(ptr) => match value.pointer(ptr) {
                        Some(sub) => sub.clone(),
                        None => {
                            tracing::warn!(source = %source_path_str, pointer = ptr, "JSON pointer matched nothing");
                            continue;
                        }
                    },
                };
                let records = match jq.as_ref() {
                    None => vec![value],
                    Some(jq) => jq.run(&value).with_context(|| {
                        format!("failed to apply jq expression to source file ({source_path_str})")
                    })?,
                };
                for value in records {
                    out.push(Document { source: source_path_str.clone(), index, value: Ok(value) });
                    index += 1;
                }
            }
        }
        Ok(out)
    }

    fn load_spec(&self) -> Result<RecordSpec> {
        RecordSpec::load(&self.schema)
            .with_context(|| format!("failed to load schema {}", self.schema.display()))
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<ExitCode> {
        init_tracing(self.verbose);
        match &self.cmd {
            Command::Check(target) => target.run(),
            Command::Clean(target) => target.run(),
        }
    }
}

impl CheckOut {
    fn run(&self) -> Result<ExitCode> {
        let settings = &self.input_settings;
        let spec = settings.load_spec()?;
        let policy = Policy::from(settings.policy);
        let docs = settings.load_documents()?;

        let checked: Vec<Checked> = docs.into_par_iter().map(|doc| doc.decode(&spec)).collect();

        let mut rendered = String::new();
        let mut rejected = 0usize;
        for doc in &checked {
            let accepted = matches!(&doc.outcome, Ok(rec) if policy.accepts(rec));
            if !accepted {
                rejected += 1;
            }
            let line = match self.format {
                ReportFormat::Text => render_text(doc, accepted),
                ReportFormat::Json => render_json(doc, accepted).to_string(),
            };
            rendered.push_str(&line);
            rendered.push('\n');
        }
        tracing::info!(records = checked.len(), rejected, "check finished");

        write_output(self.out.as_ref(), &rendered)?;
        Ok(if rejected == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
    }
}

impl CleanOut {
    fn run(&self) -> Result<ExitCode> {
        let settings = &self.input_settings;
        let spec = settings.load_spec()?;
        let policy = Policy::from(settings.policy);
        let mode = if self.nulls { EncodeMode::Null } else { EncodeMode::Omit };
        let docs = settings.load_documents()?;
        let records = docs.len();

        let lines: Vec<Option<String>> = docs
            .into_par_iter()
            .map(|doc| doc.decode(&spec))
            .map(|doc| match doc.outcome {
                Ok(rec) if policy.accepts(&rec) => Some(rec.encode(mode).to_string()),
                Ok(rec) => {
                    tracing::debug!(source = %doc.source, index = doc.index, failed = rec.report().len(), "record rejected");
                    None
                }
                Err(e) => {
                    tracing::debug!(source = %doc.source, index = doc.index, error = %e, "record rejected");
                    None
                }
            })
            .collect();

        let mut rendered = String::new();
        for line in lines.iter().flatten() {
            rendered.push_str(line);
            rendered.push('\n');
        }
        let kept = lines.iter().flatten().count();
        tracing::info!(records, kept, "clean finished");

        write_output(self.out.as_ref(), &rendered)?;
        Ok(ExitCode::SUCCESS)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

impl Document {
    fn decode(self, spec: &RecordSpec) -> Checked {
        let outcome = self.value.and_then(|value| spec.decode(&value));
        Checked { source: self.source, index: self.index, outcome }
    }
}

fn parse_document(src: &str) -> Result<Value, RecordError> {
    path_de::from_str_with_path(src).map_err(|e| RecordError::Syntax { path: e.path, source: e.source })
}

fn render_text(doc: &Checked, accepted: bool) -> String {
    let location = format!("{}#{}", doc.source, doc.index);
    match &doc.outcome {
        Err(e) => format!("{} {location}: {e}", "error".red().bold()),
        Ok(rec) => {
            let status = match (accepted, rec.is_complete()) {
                (true, true) => "ok".green().bold(),
                (true, false) => "partial".yellow().bold(),
                (false, _) => "rejected".red().bold(),
            };
            let mut s = format!("{status} {location}");
            for failure in rec.report() {
                let marker = if failure.required { "required".red() } else { "optional".yellow() };
                s.push_str(&format!("\n    {marker} {}", failure.error));
            }
            s
        }
    }
}

fn render_json(doc: &Checked, accepted: bool) -> Value {
    match &doc.outcome {
        Err(e) => json!({
            "source": doc.source,
            "record": doc.index,
            "accepted": false,
            "error": e.to_string(),
        }),
        Ok(rec) => json!({
            "source": doc.source,
            "record": doc.index,
            "accepted": accepted,
            "failures": rec.report(),
        }),
    }
}

fn write_output(out: Option<&PathBuf>, rendered: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(out, rendered).with_context(|| format!("failed to write {}", out.display()))?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn read_source(path: &Path) -> std::io::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
    }
}

fn init_tracing(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>, Box<dyn std::error::Error + Send + Sync>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let before = out.len();
            for entry in glob::glob(pattern)? {
                out.push(entry?);
            }
            if out.len() == before {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                return Err(format!("glob pattern matched no files: {pattern}").into());
            }
        } else {
            // Treat as a literal path ('-' is stdin)
            out.push(PathBuf::from(pattern));
        }
    }

    if out.iter().filter(|p| p.as_os_str() == "-").count() > 1 {
        return Err("stdin ('-') may only be given once".into());
    }

    Ok(out)
}
