//! Score aggregation and report tables.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use reprompt_core::Answer;
use reprompt_datasets::DatasetKind;
use reprompt_runner::Response;
use serde::Deserialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::metrics::fuzzy_match_any;
use crate::ScoreError;

/// Records of runs with the gold passage omitted; they have no right answer
/// to score against.
const OMITTED_GOLD_FILE: &str = "a-1.json";

/// The analysis families, each rendered to its own table.
pub const ANALYSIS_METHODS: [&str; 3] = ["page_retrieval", "reprompt_mechanism", "reprompt_tuning"];

/// Subfolders whose runs asked for a page number only.
const PAGE_ONLY_SUBFOLDER: &str = "page-only";

/// What a score compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreMode {
    /// Fuzzy-match the model's answer against the expected answer.
    Answer,
    /// Compare the model's page against the gold page.
    Page,
}

/// The fields of a run record that scoring needs.
#[derive(Debug, Deserialize)]
struct ScoredRecord {
    answer: Answer,
    page: i64,
    #[serde(default)]
    response: Response,
}

/// Every `*.json` record under `dir`, sorted, excluding omitted-gold runs.
/// A missing directory has no records.
pub fn collect_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_string_lossy();
            name.ends_with(".json") && !name.contains(OMITTED_GOLD_FILE)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

/// Score one record: 1 for a hit, 0 otherwise.
///
/// A blocked or unparsed response, or one missing the compared field,
/// scores 0.
pub fn calculate_score(path: &Path, mode: ScoreMode) -> Result<u32, ScoreError> {
    let content = std::fs::read_to_string(path).map_err(|source| ScoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let record: ScoredRecord =
        serde_json::from_str(&content).map_err(|source| ScoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let Some(response) = record.response.answer() else {
        return Ok(0);
    };
    let hit = match mode {
        ScoreMode::Page => response.page == Some(record.page),
        ScoreMode::Answer => response
            .answer
            .as_deref()
            .is_some_and(|answer| fuzzy_match_any(answer, record.answer.candidates().as_slice())),
    };
    Ok(u32::from(hit))
}

/// Mean score over `files` as a percentage, `None` when there are none.
pub fn compute_scores(files: &[PathBuf], mode: ScoreMode) -> Result<Option<f64>, ScoreError> {
    if files.is_empty() {
        return Ok(None);
    }
    let mut total = 0u32;
    for file in files {
        total += calculate_score(file, mode)?;
    }
    Ok(Some(100.0 * f64::from(total) / files.len() as f64))
}

/// Score of `{results_dir}/{dataset}/{model}/c{ctx}/{method}`.
pub fn tabulate_scores(
    results_dir: &Path,
    dataset: DatasetKind,
    total_context: usize,
    method: &str,
    model: &str,
    mode: ScoreMode,
) -> Result<Option<f64>, ScoreError> {
    let dir = results_dir
        .join(dataset.as_str())
        .join(model)
        .join(format!("c{total_context}"))
        .join(method);
    let files = collect_files(&dir);
    debug!(dir = %dir.display(), files = files.len(), "Scoring");
    compute_scores(&files, mode)
}

fn format_score(score: Option<f64>) -> String {
    match score {
        Some(s) => format!("{s:.2}"),
        None => "None".into(),
    }
}

/// The main comparison table: every dataset, context length, model and
/// method of a `baseline_vs_reprompt` results tree.
#[derive(Debug, Clone, PartialEq)]
pub struct MainTable {
    pub datasets: Vec<DatasetKind>,
    pub models: Vec<String>,
    pub methods: Vec<String>,
    pub context_lengths: Vec<usize>,
    pub mode: ScoreMode,
}

impl Default for MainTable {
    fn default() -> Self {
        Self {
            datasets: DatasetKind::ALL.to_vec(),
            models: vec!["gpt4".into(), "claude".into()],
            methods: vec!["baseline".into(), "reprompt".into(), "cr+reprompt".into()],
            context_lengths: vec![10_000, 20_000, 40_000, 80_000],
            mode: ScoreMode::Answer,
        }
    }
}

impl MainTable {
    /// One `\section` per dataset, a line per context length, and a score
    /// line per model and method.
    pub fn render(&self, results_dir: &Path) -> Result<String, ScoreError> {
        let mut out = String::new();
        for &dataset in &self.datasets {
            let _ = writeln!(out, "\\section{{{}}}", dataset.label());
            for &total_context in &self.context_lengths {
                let _ = writeln!(out, "Context Length: {total_context}");
                for model in &self.models {
                    for method in &self.methods {
                        let score = tabulate_scores(
                            results_dir,
                            dataset,
                            total_context,
                            method,
                            model,
                            self.mode,
                        )?;
                        let _ = writeln!(
                            out,
                            "Model: {model}, Method: {method}, Score: {}",
                            format_score(score)
                        );
                    }
                }
            }
        }
        Ok(out)
    }

    pub fn write(&self, results_dir: &Path, output_path: &Path) -> Result<(), ScoreError> {
        let table = self.render(results_dir)?;
        write_file(output_path, &table)?;
        info!(path = %output_path.display(), "Wrote main table");
        Ok(())
    }
}

/// One row of an analysis table.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRow {
    pub dataset: String,
    pub model: String,
    pub total_context: usize,
    pub variant: String,
    pub runs: usize,
    pub score: Option<f64>,
}

/// Rows for every `{dataset}/{model}/c{ctx}/{variant}` below `method_dir`.
pub fn analysis_rows(method_dir: &Path) -> Result<Vec<AnalysisRow>, ScoreError> {
    let mut rows = Vec::new();
    for (dataset, dataset_dir) in subdirs(method_dir)? {
        let label = dataset
            .parse::<DatasetKind>()
            .map(|kind| kind.label().to_string())
            .unwrap_or(dataset);
        for (model, model_dir) in subdirs(&dataset_dir)? {
            let mut contexts: Vec<(usize, PathBuf)> = subdirs(&model_dir)?
                .into_iter()
                .filter_map(|(name, path)| {
                    name.strip_prefix('c')
                        .and_then(|n| n.parse().ok())
                        .map(|ctx| (ctx, path))
                })
                .collect();
            contexts.sort_by_key(|(ctx, _)| *ctx);

            for (total_context, context_dir) in contexts {
                for (variant, variant_dir) in subdirs(&context_dir)? {
                    let mode = if variant == PAGE_ONLY_SUBFOLDER {
                        ScoreMode::Page
                    } else {
                        ScoreMode::Answer
                    };
                    let files = collect_files(&variant_dir);
                    rows.push(AnalysisRow {
                        dataset: label.clone(),
                        model: model.clone(),
                        total_context,
                        runs: files.len(),
                        score: compute_scores(&files, mode)?,
                        variant,
                    });
                }
            }
        }
    }
    Ok(rows)
}

/// Render rows as a booktabs LaTeX table.
pub fn render_analysis_table(method: &str, rows: &[AnalysisRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "% {}", escape_latex(method));
    out.push_str("\\begin{tabular}{llrlrr}\n\\toprule\n");
    out.push_str("Dataset & Model & Context & Variant & Runs & Score \\\\\n\\midrule\n");
    for row in rows {
        let _ = writeln!(
            out,
            "{} & {} & {} & {} & {} & {} \\\\",
            escape_latex(&row.dataset),
            escape_latex(&row.model),
            row.total_context,
            escape_latex(&row.variant),
            row.runs,
            format_score(row.score)
        );
    }
    out.push_str("\\bottomrule\n\\end{tabular}\n");
    out
}

/// Write `{output_dir}/{method}.tex` for every analysis method under
/// `analysis_dir`. Returns the written paths.
pub fn generate_analysis_tables(
    analysis_dir: &Path,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, ScoreError> {
    let mut written = Vec::new();
    for method in ANALYSIS_METHODS {
        let rows = analysis_rows(&analysis_dir.join(method))?;
        let path = output_dir.join(format!("{method}.tex"));
        write_file(&path, &render_analysis_table(method, &rows))?;
        info!(path = %path.display(), rows = rows.len(), "Wrote analysis table");
        written.push(path);
    }
    Ok(written)
}

fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '&' | '%' | '#' | '$') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Child directories of `dir`, sorted by name. A missing directory has none.
fn subdirs(dir: &Path) -> Result<Vec<(String, PathBuf)>, ScoreError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).map_err(|source| ScoreError::Read {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut dirs: Vec<(String, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| (e.file_name().to_string_lossy().into_owned(), e.path()))
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn write_file(path: &Path, content: &str) -> Result<(), ScoreError> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
    };
    write().map_err(|source| ScoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}
