use std::collections::{HashMap, HashSet};

use olsfit::{OlsEngine, PinvOls};
use rand::Rng;
use rand::seq::SliceRandom;
use rand::seq::index;
use tracing::trace;

use crate::frame::Design;

#[derive(Debug, Clone, Copy)]
pub struct DrawConfig {
    /// Rows to draw, or groups to draw when the design carries groups.
    pub sample_size: usize,
    pub replace: bool,
    /// Permute the outcome before sampling (joint significance under the null).
    pub shuffle: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Draw {
    pub b: f64,
    pub p: f64,
}

impl Draw {
    fn failed() -> Self {
        Self {
            b: f64::NAN,
            p: f64::NAN,
        }
    }
}

/// One resampled estimation of the coefficient on the first regressor.
/// A sample that cannot be estimated yields NaN rather than an error.
pub fn strap_ols<R: Rng + ?Sized>(design: &Design, config: &DrawConfig, rng: &mut R) -> Draw {
    let shuffled;
    let data = if config.shuffle {
        let mut d = design.clone();
        d.y.shuffle(rng);
        shuffled = d;
        &shuffled
    } else {
        design
    };

    let rows = match data.groups.as_deref() {
        None => sample_rows(data.nobs(), config, rng),
        Some(groups) => sample_groups(groups, config.sample_size, rng),
    };
    if rows.is_empty() {
        trace!("bootstrap draw produced an empty sample");
        return Draw::failed();
    }
    let sample = data.subset(&rows);
    match PinvOls.fit_stripped(&sample.y, &sample.x) {
        Ok(fit) => Draw {
            b: fit.b.first().copied().unwrap_or(f64::NAN),
            p: fit.p.first().copied().unwrap_or(f64::NAN),
        },
        Err(err) => {
            trace!("bootstrap draw failed: {err}");
            Draw::failed()
        }
    }
}

fn sample_rows<R: Rng + ?Sized>(n: usize, config: &DrawConfig, rng: &mut R) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    if config.replace {
        (0..config.sample_size)
            .map(|_| rng.random_range(0..n))
            .collect()
    } else {
        let mut rows = index::sample(rng, n, config.sample_size.min(n)).into_vec();
        rows.sort_unstable();
        rows
    }
}

/// Cluster resampling: draw `sample_size` group labels with replacement, keep
/// every row of each distinct drawn group, then drop groups left with a
/// single row.
pub fn sample_groups<R: Rng + ?Sized>(groups: &[usize], sample_size: usize, rng: &mut R) -> Vec<usize> {
    let mut labels: Vec<usize> = groups
        .iter()
        .copied()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    if labels.is_empty() {
        return Vec::new();
    }
    labels.sort_unstable();
    let chosen: HashSet<usize> = (0..sample_size)
        .map(|_| labels[rng.random_range(0..labels.len())])
        .collect();

    let mut sizes: HashMap<usize, usize> = HashMap::new();
    for g in groups.iter().filter(|g| chosen.contains(*g)) {
        *sizes.entry(*g).or_default() += 1;
    }
    groups
        .iter()
        .enumerate()
        .filter(|(_, g)| sizes.get(*g).copied().unwrap_or(0) > 1)
        .map(|(i, _)| i)
        .collect()
}
