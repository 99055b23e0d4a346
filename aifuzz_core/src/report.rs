use crate::oracle::{Classification, Oracle};
use crate::task::ProbeResult;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to create output directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write results to {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize results: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One result as shown on the console, without any styling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub class: Classification,
    /// Everything after the label.
    pub detail: String,
}

impl std::fmt::Display for ReportLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.class.label(), self.detail)
    }
}

pub fn report_line(oracle: &dyn Oracle, result: &ProbeResult) -> ReportLine {
    let class = oracle.classify(result);
    let detail = match (result.status_code(), result.error()) {
        (Some(status), _) => format!("{} ({}) - Status: {}", result.path(), result.url(), status),
        (None, error) => format!(
            "{} ({}) - {}",
            result.path(),
            result.url(),
            error.unwrap_or("unknown error")
        ),
    };
    ReportLine { class, detail }
}

/// One line per result, in the order given.
pub fn report_lines(oracle: &dyn Oracle, results: &[ProbeResult]) -> Vec<ReportLine> {
    results.iter().map(|r| report_line(oracle, r)).collect()
}

pub fn format_results(oracle: &dyn Oracle, results: &[ProbeResult]) -> String {
    report_lines(oracle, results)
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Per-class counts for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    counts: BTreeMap<Classification, usize>,
}

impl Summary {
    pub fn from_results(oracle: &dyn Oracle, results: &[ProbeResult]) -> Self {
        let mut counts = BTreeMap::new();
        for result in results {
            *counts.entry(oracle.classify(result)).or_insert(0) += 1;
        }
        Self {
            total: results.len(),
            counts,
        }
    }

    pub fn count(&self, class: Classification) -> usize {
        self.counts.get(&class).copied().unwrap_or(0)
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} probed", self.total)?;
        for class in Classification::ALL {
            write!(f, ", {} {}", self.count(class), class.label().to_lowercase())?;
        }
        Ok(())
    }
}

pub fn to_json(results: &[ProbeResult]) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(results)?)
}

/// Stem of the result file for a run started now, e.g.
/// `results_20250101_120000_123`.
pub fn timestamped_file_stem() -> String {
    format!("results_{}", chrono::Local::now().format("%Y%m%d_%H%M%S_%3f"))
}

/// Attempts at a free file name before giving up on the output directory.
const MAX_NAME_ATTEMPTS: usize = 100;

/// Creates `output_dir` if needed and writes a timestamped result file into it.
///
/// Existing files are never overwritten: if the name is taken, a numeric
/// suffix (`_1`, `_2`, ...) is appended until a free name is found.
///
/// # Returns
///
/// The path of the newly created file.
pub fn save_results(results: &[ProbeResult], output_dir: &Path) -> Result<PathBuf, ReportError> {
    fs::create_dir_all(output_dir).map_err(|source| ReportError::CreateDir {
        path: output_dir.to_path_buf(),
        source,
    })?;
    let json = to_json(results)?;
    let stem = timestamped_file_stem();

    let mut attempt = 0;
    let (path, mut file) = loop {
        let name = match attempt {
            0 => format!("{stem}.json"),
            n => format!("{stem}_{n}.json"),
        };
        let path = output_dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => break (path, file),
            Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt + 1 < MAX_NAME_ATTEMPTS => {
                log::debug!("{path:?} already exists, trying the next name");
                attempt += 1;
            }
            Err(source) => return Err(ReportError::Write { path, source }),
        }
    };

    if let Err(source) = file.write_all(json.as_bytes()) {
        return Err(ReportError::Write { path, source });
    }
    log::info!("Saved {} results to {:?}", results.len(), path);
    Ok(path)
}
