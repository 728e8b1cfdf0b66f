use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RobustError;
use crate::io::{nan_f64, nan_opt_f64, nan_vec, read_json, write_json};
use crate::plot::{PlotOptions, plot_results};
use crate::subsets::spec_label;
use crate::types::InfoCriterion;

/// Everything estimated for one specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecResult {
    /// Dependent variable(s); several names denote a composite outcome.
    pub y: Vec<String>,
    pub controls: Vec<String>,
    /// Sorted member names identifying the specification.
    pub spec_name: Vec<String>,
    /// Regressors in estimation order: predictors, controls, intercept.
    pub predictors: Vec<String>,
    #[serde(with = "nan_vec")]
    pub b: Vec<f64>,
    #[serde(with = "nan_vec")]
    pub p: Vec<f64>,
    #[serde(with = "nan_vec")]
    pub estimates: Vec<f64>,
    #[serde(with = "nan_vec")]
    pub p_values: Vec<f64>,
    #[serde(with = "nan_f64")]
    pub ll: f64,
    #[serde(with = "nan_f64")]
    pub aic: f64,
    #[serde(with = "nan_f64")]
    pub bic: f64,
    #[serde(with = "nan_f64")]
    pub hqic: f64,
    #[serde(with = "nan_opt_f64", default)]
    pub av_k_metric: Option<f64>,
    pub nobs: usize,
}

impl SpecResult {
    pub fn ic(&self, ic: InfoCriterion) -> f64 {
        match ic {
            InfoCriterion::Ll => self.ll,
            InfoCriterion::Aic => self.aic,
            InfoCriterion::Bic => self.bic,
            InfoCriterion::Hqic => self.hqic,
        }
    }

    /// Full-sample coefficient of `name`, if it is a regressor of this spec.
    pub fn coef(&self, name: &str) -> Option<f64> {
        self.predictors
            .iter()
            .position(|p| p == name)
            .and_then(|i| self.b.get(i).copied())
    }
}

#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub median: f64,
    pub max: f64,
    pub min: f64,
    pub ci_up: f64,
    pub ci_down: f64,
    pub mean: f64,
    pub std_one_up: f64,
    pub std_one_down: f64,
    pub ll: f64,
    pub aic: f64,
    pub bic: f64,
    pub hqic: f64,
    pub av_k_metric: Option<f64>,
    pub spec_name: Vec<String>,
    pub y: Vec<String>,
}

impl SummaryRow {
    pub fn ic(&self, ic: InfoCriterion) -> f64 {
        match ic {
            InfoCriterion::Ll => self.ll,
            InfoCriterion::Aic => self.aic,
            InfoCriterion::Bic => self.bic,
            InfoCriterion::Hqic => self.hqic,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BmaRow {
    pub control_var: String,
    pub probs: f64,
    pub average_coefs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OlsResult {
    pub y_name: Vec<String>,
    pub x_name: Vec<String>,
    pub controls: Vec<String>,
    pub draws: usize,
    pub specs: Vec<SpecResult>,
}

impl OlsResult {
    pub fn n_specs(&self) -> usize {
        self.specs.len()
    }

    pub fn specs_names(&self) -> Vec<Vec<String>> {
        self.specs.iter().map(|s| s.spec_name.clone()).collect()
    }

    /// Bootstrap estimates, one row per specification.
    pub fn estimates(&self) -> Vec<&[f64]> {
        self.specs.iter().map(|s| s.estimates.as_slice()).collect()
    }

    pub fn p_values(&self) -> Vec<&[f64]> {
        self.specs.iter().map(|s| s.p_values.as_slice()).collect()
    }

    pub fn find_spec(&self, name: &[String]) -> Option<&SpecResult> {
        self.specs.iter().find(|s| s.spec_name == name)
    }

    pub fn summary_rows(&self) -> Vec<SummaryRow> {
        self.specs
            .iter()
            .map(|spec| {
                let sorted = sorted_finite(&spec.estimates);
                let (mean, std) = crate::frame::mean_std(&sorted);
                SummaryRow {
                    median: median_sorted(&sorted),
                    max: sorted.last().copied().unwrap_or(f64::NAN),
                    min: sorted.first().copied().unwrap_or(f64::NAN),
                    ci_up: quantile_nearest(&sorted, 0.975),
                    ci_down: quantile_nearest(&sorted, 0.025),
                    mean,
                    std_one_up: mean + std,
                    std_one_down: mean - std,
                    ll: spec.ll,
                    aic: spec.aic,
                    bic: spec.bic,
                    hqic: spec.hqic,
                    av_k_metric: spec.av_k_metric,
                    spec_name: spec.spec_name.clone(),
                    y: spec.y.clone(),
                }
            })
            .collect()
    }

    pub fn summary_table(&self) -> Result<DataFrame> {
        let rows = self.summary_rows();
        let col = |f: fn(&SummaryRow) -> f64| rows.iter().map(f).collect::<Vec<f64>>();
        let av_k: Vec<Option<f64>> = rows.iter().map(|r| r.av_k_metric).collect();
        let spec_name: Vec<String> = rows.iter().map(|r| spec_label(&r.spec_name)).collect();
        let y: Vec<String> = rows.iter().map(|r| r.y.join("+")).collect();
        let df = DataFrame::new(
            rows.len(),
            vec![
                Series::new("median".into(), col(|r| r.median)).into(),
                Series::new("max".into(), col(|r| r.max)).into(),
                Series::new("min".into(), col(|r| r.min)).into(),
                Series::new("ci_up".into(), col(|r| r.ci_up)).into(),
                Series::new("ci_down".into(), col(|r| r.ci_down)).into(),
                Series::new("mean".into(), col(|r| r.mean)).into(),
                Series::new("std_one_up".into(), col(|r| r.std_one_up)).into(),
                Series::new("std_one_down".into(), col(|r| r.std_one_down)).into(),
                Series::new("ll".into(), col(|r| r.ll)).into(),
                Series::new("aic".into(), col(|r| r.aic)).into(),
                Series::new("bic".into(), col(|r| r.bic)).into(),
                Series::new("hqic".into(), col(|r| r.hqic)).into(),
                Series::new("av_k_metric".into(), av_k).into(),
                Series::new("spec_name".into(), spec_name).into(),
                Series::new("y".into(), y).into(),
            ],
        )?;
        Ok(df)
    }

    /// Bayesian model averaging with BIC-implied model weights.
    pub fn compute_bma(&self) -> Vec<BmaRow> {
        let neg_half_bic: Vec<f64> = self.specs.iter().map(|s| -s.bic / 2.0).collect();
        let max_ll = neg_half_bic
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        let weights: Vec<f64> = neg_half_bic.iter().map(|v| (v - max_ll).exp()).collect();
        let total = nansum(weights.iter().copied());
        debug!("bma: specs={}, max_ll={max_ll}, total_weight={total}", weights.len());

        self.controls
            .iter()
            .map(|control| {
                let members = self
                    .specs
                    .iter()
                    .zip(&weights)
                    .filter(|(spec, _)| spec.controls.contains(control));
                let mut likelihood = 0.0;
                let mut weighted = 0.0;
                for (spec, w) in members {
                    if w.is_finite() {
                        likelihood += w;
                    }
                    let term = spec.coef(control).unwrap_or(f64::NAN) * w;
                    if term.is_finite() {
                        weighted += term;
                    }
                }
                BmaRow {
                    control_var: control.clone(),
                    probs: likelihood / total,
                    average_coefs: weighted / total,
                }
            })
            .collect()
    }

    pub fn bma_table(&self) -> Result<DataFrame> {
        let rows = self.compute_bma();
        let df = DataFrame::new(
            rows.len(),
            vec![
                Series::new(
                    "control_var".into(),
                    rows.iter().map(|r| r.control_var.clone()).collect::<Vec<_>>(),
                )
                .into(),
                Series::new("probs".into(), rows.iter().map(|r| r.probs).collect::<Vec<_>>()).into(),
                Series::new(
                    "average_coefs".into(),
                    rows.iter().map(|r| r.average_coefs).collect::<Vec<_>>(),
                )
                .into(),
            ],
        )?;
        Ok(df)
    }

    /// Combine with another result estimated with the same predictors and
    /// draw count. The other result's spec names and outcome labels are
    /// prefixed with `prefix` so the two sets stay distinguishable.
    pub fn merge(&self, other: &OlsResult, prefix: &str) -> Result<OlsResult> {
        if self.draws != other.draws {
            return Err(RobustError::InvalidArgument(format!(
                "cannot merge results with {} and {} draws",
                self.draws, other.draws
            ))
            .into());
        }
        if self.x_name != other.x_name {
            return Err(RobustError::InvalidArgument(format!(
                "cannot merge results for predictors [{}] and [{}]",
                self.x_name.join(", "),
                other.x_name.join(", ")
            ))
            .into());
        }
        let mut controls = self.controls.clone();
        for c in &other.controls {
            if !controls.contains(c) {
                controls.push(c.clone());
            }
        }
        let mut y_name = self.y_name.clone();
        let mut specs = self.specs.clone();
        for spec in &other.specs {
            let mut spec = spec.clone();
            spec.y = spec.y.iter().map(|y| format!("{prefix}{y}")).collect();
            spec.spec_name = spec
                .spec_name
                .iter()
                .map(|name| format!("{prefix}{name}"))
                .collect();
            // the no-controls spec is named after its outcome instead
            if spec.spec_name.is_empty() {
                spec.spec_name = spec.y.clone();
            }
            specs.push(spec);
        }
        for y in &other.y_name {
            let y = format!("{prefix}{y}");
            if !y_name.contains(&y) {
                y_name.push(y);
            }
        }
        Ok(OlsResult {
            y_name,
            x_name: self.x_name.clone(),
            controls,
            draws: self.draws,
            specs,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(self, path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn plot(&self, options: &PlotOptions) -> Result<Vec<PathBuf>> {
        plot_results(self, options)
    }

    /// Plain-text overview of the specification curve.
    pub fn summary(&self) -> String {
        let rows = self.summary_rows();
        let medians = sorted_finite(&rows.iter().map(|r| r.median).collect::<Vec<_>>());
        let all_b: Vec<f64> = self
            .specs
            .iter()
            .flat_map(|s| s.estimates.iter().copied())
            .filter(|v| v.is_finite())
            .collect();
        let all_p: Vec<f64> = self
            .specs
            .iter()
            .flat_map(|s| s.p_values.iter().copied())
            .filter(|v| v.is_finite())
            .collect();
        let positive = all_b.iter().filter(|b| **b > 0.0).count();
        let significant = all_p.iter().filter(|p| **p < 0.05).count();

        let mut out = String::new();
        let _ = writeln!(out, "Dependent variable: {}", self.y_name.join(", "));
        let _ = writeln!(out, "Predictor(s): {}", self.x_name.join(", "));
        let _ = writeln!(out, "Controls: {}", self.controls.join(", "));
        let _ = writeln!(out, "Specifications: {}", self.specs.len());
        let _ = writeln!(out, "Draws per specification: {}", self.draws);
        let _ = writeln!(
            out,
            "Median of specification medians: {:.6}",
            median_sorted(&medians)
        );
        if let (Some(lo), Some(hi)) = (medians.first(), medians.last()) {
            let _ = writeln!(out, "Range of specification medians: [{lo:.6}, {hi:.6}]");
        }
        if !all_b.is_empty() {
            let _ = writeln!(
                out,
                "Share of positive estimates: {:.4}",
                positive as f64 / all_b.len() as f64
            );
        }
        if !all_p.is_empty() {
            let _ = writeln!(
                out,
                "Share of estimates with p < 0.05: {:.4}",
                significant as f64 / all_p.len() as f64
            );
        }
        for ic in [InfoCriterion::Aic, InfoCriterion::Bic, InfoCriterion::Hqic] {
            if let Some(best) = self
                .specs
                .iter()
                .filter(|s| s.ic(ic).is_finite())
                .min_by(|a, b| a.ic(ic).total_cmp(&b.ic(ic)))
            {
                let _ = writeln!(
                    out,
                    "Best specification by {}: {} ({:.4})",
                    ic.name().to_uppercase(),
                    spec_label(&best.spec_name),
                    best.ic(ic)
                );
            }
        }
        out
    }
}

pub fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    out.sort_by(f64::total_cmp);
    out
}

pub fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Quantile picking the nearest order statistic, rounding half to even.
pub fn quantile_nearest(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let idx = (pos.round_ties_even() as usize).min(sorted.len() - 1);
    sorted[idx]
}

fn nansum(values: impl Iterator<Item = f64>) -> f64 {
    values.filter(|v| v.is_finite()).sum()
}
