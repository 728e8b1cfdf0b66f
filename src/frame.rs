use std::collections::HashMap;

use anyhow::{Context, Result};
use polars::prelude::*;

use crate::error::RobustError;
use crate::types::Matrix;

/// Numeric columns pulled out of a polars frame, keyed by name. Missing
/// values (null or NaN) are stored as NaN.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    height: usize,
    columns: HashMap<String, Vec<f64>>,
    groups: HashMap<String, Vec<Option<usize>>>,
}

/// Rows of one specification after listwise deletion: the outcome, the
/// regressors (intercept last) and, for fixed effects, the group of each row.
#[derive(Debug, Clone)]
pub struct Design {
    pub y: Vec<f64>,
    pub x: Matrix,
    pub groups: Option<Vec<usize>>,
}

impl Design {
    pub fn nobs(&self) -> usize {
        self.y.len()
    }

    pub fn subset(&self, rows: &[usize]) -> Design {
        Design {
            y: rows.iter().map(|&i| self.y[i]).collect(),
            x: rows.iter().map(|&i| self.x[i].clone()).collect(),
            groups: self
                .groups
                .as_ref()
                .map(|g| rows.iter().map(|&i| g[i]).collect()),
        }
    }
}

impl Frame {
    pub fn from_dataframe(df: &DataFrame, names: &[String], group: Option<&str>) -> Result<Self> {
        let mut columns = HashMap::new();
        for name in names {
            if columns.contains_key(name) {
                continue;
            }
            columns.insert(name.clone(), numeric_column(df, name)?);
        }
        let mut groups = HashMap::new();
        if let Some(group) = group {
            groups.insert(group.to_string(), group_codes(df, group)?);
        }
        Ok(Self {
            height: df.height(),
            columns,
            groups,
        })
    }

    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .get(name)
            .map(|v| v.as_slice())
            .ok_or_else(|| RobustError::MissingColumn(name.to_string()).into())
    }

    pub fn groups(&self, name: &str) -> Result<&[Option<usize>]> {
        self.groups
            .get(name)
            .map(|v| v.as_slice())
            .ok_or_else(|| RobustError::MissingColumn(name.to_string()).into())
    }

    /// Build the design of one specification: `y`, then `regressors` in
    /// order, then the intercept. Rows with any missing value are dropped and
    /// the remaining rows are demeaned within groups when `group` is set.
    pub fn design(&self, y: &[f64], regressors: &[String], group: Option<&str>) -> Result<Design> {
        if y.len() != self.height {
            return Err(anyhow::anyhow!(
                "outcome length {} does not match frame height {}",
                y.len(),
                self.height
            ));
        }
        let cols = regressors
            .iter()
            .map(|name| self.column(name))
            .collect::<Result<Vec<_>>>()?;
        let groups = group.map(|g| self.groups(g)).transpose()?;

        let keep = complete_rows(y, &cols, groups);
        let mut y_out: Vec<f64> = keep.iter().map(|&i| y[i]).collect();
        let mut x_cols: Vec<Vec<f64>> = cols
            .iter()
            .map(|col| keep.iter().map(|&i| col[i]).collect())
            .collect();
        let group_out = groups.map(|g| {
            keep.iter()
                .map(|&i| g[i].unwrap_or_default())
                .collect::<Vec<usize>>()
        });

        if let Some(g) = group_out.as_ref() {
            group_demean(std::slice::from_mut(&mut y_out), g);
            group_demean(&mut x_cols, g);
        }

        let x = (0..y_out.len())
            .map(|row| {
                let mut r: Vec<f64> = x_cols.iter().map(|col| col[row]).collect();
                r.push(1.0);
                r
            })
            .collect();
        Ok(Design {
            y: y_out,
            x,
            groups: group_out,
        })
    }

    /// Composite outcome from several columns (see [`composite`]).
    pub fn composite(&self, names: &[String]) -> Result<Vec<f64>> {
        let cols = names
            .iter()
            .map(|name| self.column(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(composite(&cols))
    }
}

pub fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| RobustError::MissingColumn(name.to_string()))?;
    let series = column
        .as_materialized_series()
        .cast(&DataType::Float64)
        .with_context(|| format!("cast {name} to Float64"))?;
    let values = series.f64()?;
    Ok(values
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

/// Integer codes for a grouping column, compared by string representation
/// and numbered in order of first appearance. Nulls, and NaN in a float
/// column, stay `None`.
pub fn group_codes(df: &DataFrame, name: &str) -> Result<Vec<Option<usize>>> {
    let column = df
        .column(name)
        .map_err(|_| RobustError::MissingColumn(name.to_string()))?;
    let raw = column.as_materialized_series();
    let nan_rows: Vec<bool> = if raw.dtype().is_float() {
        raw.cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| matches!(v, Some(x) if x.is_nan()))
            .collect()
    } else {
        vec![false; raw.len()]
    };
    let series = raw
        .cast(&DataType::String)
        .with_context(|| format!("cast {name} to String"))?;
    let values = series.str()?;
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(values.len());
    for (v, is_nan) in values.into_iter().zip(nan_rows) {
        out.push(v.filter(|_| !is_nan).map(|label| {
            let next = seen.len();
            *seen.entry(label.to_string()).or_insert(next)
        }));
    }
    Ok(out)
}

/// True when any cell of the frame is null, or NaN in a float column.
pub fn has_missing(df: &DataFrame) -> Result<bool> {
    for column in df.columns() {
        if column.null_count() > 0 {
            return Ok(true);
        }
        let series = column.as_materialized_series();
        if matches!(series.dtype(), DataType::Float64 | DataType::Float32) {
            let casted = series.cast(&DataType::Float64)?;
            if casted
                .f64()?
                .into_iter()
                .any(|v| matches!(v, Some(x) if x.is_nan()))
            {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

pub fn complete_rows(y: &[f64], cols: &[&[f64]], groups: Option<&[Option<usize>]>) -> Vec<usize> {
    (0..y.len())
        .filter(|&i| {
            y[i].is_finite()
                && cols.iter().all(|col| col[i].is_finite())
                && groups.is_none_or(|g| g[i].is_some())
        })
        .collect()
}

/// Subtract the per-group mean from every column in place.
pub fn group_demean(cols: &mut [Vec<f64>], groups: &[usize]) {
    let n_groups = groups.iter().copied().max().map(|m| m + 1).unwrap_or(0);
    for col in cols.iter_mut() {
        let mut sums = vec![0.0; n_groups];
        let mut counts = vec![0usize; n_groups];
        for (v, &g) in col.iter().zip(groups) {
            sums[g] += v;
            counts[g] += 1;
        }
        for (v, &g) in col.iter_mut().zip(groups) {
            *v -= sums[g] / counts[g] as f64;
        }
    }
}

/// Mean and sample standard deviation over the finite values of `values`.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let n = finite.len();
    if n == 0 {
        return (f64::NAN, f64::NAN);
    }
    let mean = finite.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, f64::NAN);
    }
    let var = finite.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1) as f64;
    (mean, var.sqrt())
}

/// Z-score each column, then average across columns row by row, skipping
/// missing cells. A row with nothing present is NaN.
pub fn composite(cols: &[&[f64]]) -> Vec<f64> {
    let height = cols.first().map(|c| c.len()).unwrap_or(0);
    let stats: Vec<(f64, f64)> = cols.iter().map(|c| mean_std(c)).collect();
    (0..height)
        .map(|row| {
            let mut sum = 0.0;
            let mut count = 0usize;
            for (col, (mean, std)) in cols.iter().zip(&stats) {
                let z = (col[row] - mean) / std;
                if z.is_finite() {
                    sum += z;
                    count += 1;
                }
            }
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        })
        .collect()
}
