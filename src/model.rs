use anyhow::{Context, Result};
use olsfit::simple_ols;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::bootstrap::{DrawConfig, strap_ols};
use crate::crossval::kfold_rmse;
use crate::error::RobustError;
use crate::frame::{Frame, has_missing};
use crate::parallel::{Workers, draw_seed};
use crate::qc::{check_disjoint, check_distinct, check_not_empty, check_positive};
use crate::results::{OlsResult, SpecResult};
use crate::subsets::{all_subsets, space_size, spec_label, spec_name};
use crate::types::CONST_NAME;

#[derive(Debug, Clone)]
pub struct FitConfig {
    pub draws: usize,
    /// Rows per draw; groups per draw under fixed effects. Defaults to the
    /// number of rows in the dataset.
    pub sample_size: Option<usize>,
    pub replace: bool,
    pub kfold: Option<usize>,
    pub shuffle: bool,
    /// Grouping column; when set, a within (fixed effects) model is fitted
    /// and draws resample whole groups.
    pub group: Option<String>,
    pub seed: Option<u64>,
    pub cores: Option<usize>,
    pub parallel: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            draws: 500,
            sample_size: None,
            replace: false,
            kfold: None,
            shuffle: false,
            group: None,
            seed: None,
            cores: None,
            parallel: true,
        }
    }
}

/// An outcome to be modelled: its member columns and values.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub names: Vec<String>,
    pub values: Vec<f64>,
}

/// Specification curve analysis over OLS models.
///
/// ```no_run
/// # use polars::prelude::*;
/// # use robustipy::model::{FitConfig, OlsRobust};
/// # fn demo(df: DataFrame) -> anyhow::Result<()> {
/// let mut model = OlsRobust::new(vec!["y".into()], vec!["x".into()], df)?;
/// let config = FitConfig { draws: 100, ..Default::default() };
/// model.fit(&["z1".to_string(), "z2".to_string()], &config)?;
/// let results = model.get_results();
/// # Ok(()) }
/// ```
#[derive(Debug, Clone)]
pub struct OlsRobust {
    y: Vec<String>,
    x: Vec<String>,
    data: DataFrame,
    results: Option<OlsResult>,
}

impl OlsRobust {
    pub fn new(y: Vec<String>, x: Vec<String>, data: DataFrame) -> Result<Self> {
        check_not_empty(&y, "y")?;
        check_not_empty(&x, "x")?;
        check_distinct(&y, "y")?;
        check_distinct(&x, "x")?;
        check_disjoint(&y, &x, "y", "x")?;
        for name in y.iter().chain(&x) {
            ensure_column(&data, name)?;
        }
        if has_missing(&data)? {
            warn!("Missing values found in data. Listwise deletion will be applied");
        }
        Ok(Self {
            y,
            x,
            data,
            results: None,
        })
    }

    pub fn get_results(&self) -> Option<&OlsResult> {
        self.results.as_ref()
    }

    /// Composite outcomes for every combination of two or more dependent
    /// variables, each the row mean of the z-scored members.
    pub fn multiple_y(&self) -> Result<Vec<Outcome>> {
        let frame = Frame::from_dataframe(&self.data, &self.y, None)?;
        info!("Calculating composite outcomes from {} indicators", self.y.len());
        all_subsets(&self.y)
            .into_iter()
            .filter(|names| names.len() > 1)
            .map(|names| {
                let values = frame.composite(&names)?;
                Ok(Outcome { names, values })
            })
            .collect()
    }

    pub fn fit(&mut self, controls: &[String], config: &FitConfig) -> Result<&OlsResult> {
        check_positive(config.draws, "draws")?;
        let sample_size = config.sample_size.unwrap_or(self.data.height());
        check_positive(sample_size, "sample_size")?;
        check_distinct(controls, "controls")?;
        check_disjoint(controls, &self.x, "controls", "x")?;
        check_disjoint(controls, &self.y, "controls", "y")?;
        let space_n = space_size(controls).ok_or_else(|| {
            RobustError::InvalidArgument(format!(
                "{} controls give more specifications than can be enumerated",
                controls.len()
            ))
        })?;
        for name in controls {
            ensure_column(&self.data, name)?;
        }
        let group = config.group.as_deref();
        if let Some(group) = group {
            ensure_column(&self.data, group)?;
            let in_model = self.y.iter().chain(&self.x).chain(controls).any(|c| c == group);
            if in_model {
                return Err(RobustError::InvalidArgument(format!(
                    "group column {group} cannot also be a model variable"
                ))
                .into());
            }
        }

        let names: Vec<String> = self
            .y
            .iter()
            .chain(&self.x)
            .chain(controls)
            .cloned()
            .collect();
        let frame = Frame::from_dataframe(&self.data, &names, group)?;

        let outcomes = if self.y.len() > 1 {
            self.multiple_y()?
        } else {
            vec![Outcome {
                names: self.y.clone(),
                values: frame.column(&self.y[0])?.to_vec(),
            }]
        };

        let base_seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let workers = Workers::new(config.parallel, config.cores, config.draws)?;
        let subsets = all_subsets(controls);
        let total = space_n * outcomes.len();
        info!(
            "Fitting {total} specifications ({} outcome(s) x {space_n} control sets), {} draws each",
            outcomes.len(),
            config.draws
        );

        let mut specs = Vec::with_capacity(total);
        let mut warned_clamp = false;
        for (o_idx, outcome) in outcomes.iter().enumerate() {
            for (s_idx, spec) in subsets.iter().enumerate() {
                let spec_index = o_idx * space_n + s_idx;
                let regressors: Vec<String> = self.x.iter().chain(spec).cloned().collect();
                let mut members = if self.y.len() > 1 {
                    outcome.names.clone()
                } else {
                    Vec::new()
                };
                members.extend(spec.iter().cloned());
                let name = spec_name(&members);
                let label = spec_label(&name);

                let design = frame.design(&outcome.values, &regressors, group)?;
                let n_params = regressors.len() + 1;
                if design.nobs() <= n_params {
                    return Err(RobustError::InvalidArgument(format!(
                        "specification [{label}] has {} complete rows for {n_params} parameters",
                        design.nobs()
                    ))
                    .into());
                }

                let full = simple_ols(&design.y, &design.x)
                    .with_context(|| format!("full sample fit of [{label}]"))?;
                let av_k_metric = config
                    .kfold
                    .map(|k| kfold_rmse(&design, k))
                    .transpose()
                    .with_context(|| format!("cross-validation of [{label}]"))?;

                let mut draw_size = sample_size;
                if design.groups.is_none() && !config.replace && draw_size > design.nobs() {
                    if !warned_clamp {
                        warn!(
                            "sample_size ({sample_size}) exceeds complete rows ({}) without replacement; drawing all rows",
                            design.nobs()
                        );
                        warned_clamp = true;
                    }
                    draw_size = design.nobs();
                }
                let draw_config = DrawConfig {
                    sample_size: draw_size,
                    replace: config.replace,
                    shuffle: config.shuffle,
                };

                let draws = workers.map(config.draws, |d| {
                    let seed = draw_seed(base_seed, spec_index, config.draws, d);
                    let mut rng = StdRng::seed_from_u64(seed);
                    strap_ols(&design, &draw_config, &mut rng)
                });
                let failed = draws.iter().filter(|d| !d.b.is_finite()).count();
                if failed > 0 {
                    warn!("[{label}]: {failed} of {} draws could not be estimated", config.draws);
                }
                debug!(
                    "spec {}/{total} [{label}]: nobs={}, b={}, bic={}",
                    spec_index + 1,
                    design.nobs(),
                    full.b[0],
                    full.bic()
                );

                let mut predictors = regressors;
                predictors.push(CONST_NAME.to_string());
                specs.push(SpecResult {
                    y: outcome.names.clone(),
                    controls: spec.clone(),
                    spec_name: name,
                    predictors,
                    b: full.b.clone(),
                    p: full.p.clone(),
                    estimates: draws.iter().map(|d| d.b).collect(),
                    p_values: draws.iter().map(|d| d.p).collect(),
                    ll: full.ll(),
                    aic: full.aic(),
                    bic: full.bic(),
                    hqic: full.hqic(),
                    av_k_metric,
                    nobs: design.nobs(),
                });
            }
            info!(
                "Finished outcome {} ({}/{})",
                outcome.names.join("+"),
                o_idx + 1,
                outcomes.len()
            );
        }

        let results = self.results.insert(OlsResult {
            y_name: self.y.clone(),
            x_name: self.x.clone(),
            controls: controls.to_vec(),
            draws: config.draws,
            specs,
        });
        Ok(&*results)
    }
}

fn ensure_column(df: &DataFrame, name: &str) -> Result<()> {
    if df.column(name).is_err() {
        return Err(RobustError::MissingColumn(name.to_string()).into());
    }
    Ok(())
}
