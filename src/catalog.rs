//! Saved-run listing and filtering

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::PlaybackResult;

/// One saved run as listed by the persistence service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRunSummary {
    pub id: u64,
    pub algorithm: String,
    #[serde(default)]
    pub network_name: String,
    #[serde(default)]
    pub diffusion_model: String,
    #[serde(default)]
    pub seed_size: u32,
    #[serde(default)]
    pub spread: f64,
    /// Milliseconds
    #[serde(default)]
    pub runtime: f64,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub model_params: Option<serde_json::Value>,
}

impl SavedRunSummary {
    pub fn list_from_json(json: &str) -> PlaybackResult<Vec<SavedRunSummary>> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn runtime_seconds(&self) -> f64 {
        self.runtime / 1000.0
    }

    /// Model parameters as text; strings are shown as-is
    pub fn params_text(&self) -> Option<String> {
        match self.model_params.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// `classic_greedy` -> `CLASSIC GREEDY`
pub fn display_name(algorithm: &str) -> String {
    algorithm.replace('_', " ").to_uppercase()
}

/// Exact-match filter; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFilter {
    pub network: Option<String>,
    pub model: Option<String>,
    pub algorithm: Option<String>,
}

impl RunFilter {
    pub fn matches(&self, run: &SavedRunSummary) -> bool {
        fn accepts(wanted: &Option<String>, actual: &str) -> bool {
            wanted.as_deref().is_none_or(|w| w.is_empty() || w == actual)
        }
        accepts(&self.network, &run.network_name)
            && accepts(&self.model, &run.diffusion_model)
            && accepts(&self.algorithm, &run.algorithm)
    }

    pub fn apply<'a>(&self, runs: &'a [SavedRunSummary]) -> Vec<&'a SavedRunSummary> {
        runs.iter().filter(|run| self.matches(run)).collect()
    }
}

/// Distinct values of one field, first-seen order (filter choices)
pub fn distinct_values<'a>(
    runs: &'a [SavedRunSummary],
    field: impl Fn(&'a SavedRunSummary) -> &'a str,
) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    runs.iter()
        .map(field)
        .filter(|value| seen.insert(*value))
        .collect()
}

/// Plain-text table of runs
pub fn format_table(runs: &[&SavedRunSummary]) -> String {
    if runs.is_empty() {
        return "No saved runs match your filters".to_string();
    }

    let header = ["ID", "ALGORITHM", "NETWORK", "MODEL", "SEEDS", "SPREAD", "RUNTIME"];
    let rows: Vec<[String; 7]> = runs
        .iter()
        .map(|run| {
            [
                run.id.to_string(),
                display_name(&run.algorithm),
                run.network_name.clone(),
                run.diffusion_model.clone(),
                run.seed_size.to_string(),
                run.spread.to_string(),
                format!("{:.2}s", run.runtime_seconds()),
            ]
        })
        .collect();

    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let line = |cells: &[&str]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(&header[..])];
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push(line(&cells[..]));
    }
    out.join("\n")
}
