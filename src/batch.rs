//! Folder batch runs.
//!
//! Every file in the input folder whose name matches the pattern is read,
//! filtered with one compiled expression and written under the same name to
//! the output folder. One [`BatchRecord`] is kept per file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Serialize;

use crate::filter::{ExprFilter, Pipeline};
use crate::table::{read_table, write_table};

/// Batch settings
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// File name pattern, `*` and `?` wildcards
    pub pattern: String,
    /// Expression applied to every file; files are copied through when unset
    pub expr: Option<String>,
    /// Where to write the per-file summary CSV
    pub summary_csv: Option<PathBuf>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            pattern: "*.csv".to_string(),
            expr: None,
            summary_csv: None,
        }
    }
}

/// Summary of one processed file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRecord {
    pub file: String,
    #[serde(rename = "N_in")]
    pub n_in: usize,
    #[serde(rename = "N_out")]
    pub n_out: usize,
    pub pass_rate: f64,
    pub expr_used: bool,
    pub expr_pass_rate: Option<f64>,
    pub out_csv: String,
}

/// Translate a file name wildcard pattern into an anchored regex
pub fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    re.push('$');

    Regex::new(&re).with_context(|| format!("Invalid file pattern '{}'", pattern))
}

/// Files directly under `dir` whose names match `pattern`, sorted by name
pub fn matching_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Input directory not found: {}", dir.display());
    }
    let re = glob_to_regex(pattern)?;

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .map_or(false, |name| re.is_match(name));
        if path.is_file() && matches {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

/// Filter one file into `out_dir`
pub fn process_file(input: &Path, out_dir: &Path, pipeline: &Pipeline) -> Result<BatchRecord> {
    let file = input
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Invalid file name: {}", input.display()))?
        .to_string();

    let table = read_table(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let (filtered, report) = pipeline
        .run(&table)
        .with_context(|| format!("Failed to filter {}", file))?;

    let out_csv = out_dir.join(&file);
    write_table(&filtered, &out_csv)
        .with_context(|| format!("Failed to write {}", out_csv.display()))?;

    let expr_pass_rate = report.stage("expr").map(|stats| stats.pass_rate);
    log::info!("{}: {}", file, report);

    Ok(BatchRecord {
        file,
        n_in: report.n_in,
        n_out: report.n_out,
        pass_rate: report.pass_rate(),
        expr_used: expr_pass_rate.is_some(),
        expr_pass_rate,
        out_csv: out_csv.display().to_string(),
    })
}

/// Process every matching file of `in_dir`. The first failure aborts the run.
pub fn batch_run(in_dir: &Path, out_dir: &Path, options: &BatchOptions) -> Result<Vec<BatchRecord>> {
    let mut pipeline = Pipeline::new();
    if let Some(expr) = options.expr.as_deref().filter(|e| !e.trim().is_empty()) {
        let stage = ExprFilter::new(expr).with_context(|| format!("Invalid expression '{}'", expr))?;
        pipeline.push(Box::new(stage));
    }

    let files = matching_files(in_dir, &options.pattern)?;
    if files.is_empty() {
        log::warn!(
            "no files in {} match '{}'",
            in_dir.display(),
            options.pattern
        );
    }

    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let records = files
        .iter()
        .map(|file| process_file(file, out_dir, &pipeline))
        .collect::<Result<Vec<_>>>()?;

    if let Some(path) = &options.summary_csv {
        write_summary(&records, path)?;
    }

    Ok(records)
}

/// Write batch records as CSV
pub fn write_summary(records: &[BatchRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    log::info!("wrote summary of {} files to {}", records.len(), path.display());
    Ok(())
}
