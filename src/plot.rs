//! HTML figures of a specification curve, rendered with plotly.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use plotly::common::color::{NamedColor, Rgb, Rgba};
use plotly::common::{Fill, Line, Mode};
use plotly::layout::Axis;
use plotly::{Layout, Plot, Scatter};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;
use statrs::distribution::{Continuous, Normal};
use tracing::{info, warn};

use crate::frame::mean_std;
use crate::results::{OlsResult, SummaryRow, sorted_finite};
use crate::subsets::{selection_key, spec_label};
use crate::types::InfoCriterion;

const SET1: [(u8, u8, u8); 9] = [
    (0xE4, 0x1A, 0x1C),
    (0x37, 0x7E, 0xB8),
    (0x4D, 0xAF, 0x4A),
    (0x98, 0x4E, 0xA3),
    (0xFF, 0x7F, 0x00),
    (0xFF, 0xFF, 0x33),
    (0xA6, 0x56, 0x28),
    (0xF7, 0x81, 0xBF),
    (0x99, 0x99, 0x99),
];

const ROLLING_WINDOW: usize = 10;
const JOYPLOT_SPECS: usize = 100;
const DENSITY_POINTS: usize = 200;

#[derive(Debug, Clone)]
pub struct PlotOptions {
    /// Specifications to highlight, each given by its control names.
    pub specs: Option<Vec<Vec<String>>>,
    pub ic: Option<InfoCriterion>,
    pub output_dir: PathBuf,
    pub prefix: Option<String>,
    pub joyplot: bool,
    /// Seed for choosing which specifications the ridgeline shows.
    pub seed: u64,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            specs: None,
            ic: None,
            output_dir: PathBuf::from("Plots"),
            prefix: None,
            joyplot: false,
            seed: 0,
        }
    }
}

pub fn plot_results(results: &OlsResult, options: &PlotOptions) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(&options.output_dir)
        .with_context(|| format!("create {}", options.output_dir.display()))?;
    let highlight = resolve_highlight(results, options.specs.as_deref());
    let mut written = Vec::new();

    let path = plot_path(options, "curve");
    plot_curve(results, &highlight).write_html(&path);
    written.push(path);

    if let Some(ic) = options.ic {
        let path = plot_path(options, ic.name());
        plot_ic(results, ic, &highlight).write_html(&path);
        written.push(path);
    }
    if !highlight.is_empty() {
        let path = plot_path(options, "bdist");
        plot_bdist(results, &highlight).write_html(&path);
        written.push(path);
    }
    if options.joyplot {
        let path = plot_path(options, "joyplot");
        plot_joyplot(results, options.seed).write_html(&path);
        written.push(path);
    }
    for path in &written {
        info!("Wrote {}", path.display());
    }
    Ok(written)
}

fn plot_path(options: &PlotOptions, name: &str) -> PathBuf {
    let file_name = match options.prefix.as_deref() {
        Some(pfx) => format!("{pfx}_{name}.html"),
        None => format!("{name}.html"),
    };
    options.output_dir.join(file_name)
}

/// Spec names to highlight, keeping only those present in the results.
fn resolve_highlight(results: &OlsResult, specs: Option<&[Vec<String>]>) -> Vec<Vec<String>> {
    let Some(specs) = specs else {
        return Vec::new();
    };
    selection_key(specs)
        .into_iter()
        .filter(|key| {
            let found = results.find_spec(key).is_some();
            if !found {
                warn!("specification [{}] not found; not highlighted", spec_label(key));
            }
            found
        })
        .collect()
}

fn set1(i: usize) -> Rgb {
    let (r, g, b) = SET1[i % SET1.len()];
    Rgb::new(r, g, b)
}

fn sorted_rows(results: &OlsResult, key: impl Fn(&SummaryRow) -> f64) -> Vec<SummaryRow> {
    let mut rows = results.summary_rows();
    rows.sort_by(|a, b| key(a).total_cmp(&key(b)));
    rows
}

fn add_vertical_line(plot: &mut Plot, x: f64, y_min: f64, y_max: f64, color: Rgb, name: Option<String>) {
    let mut trace = Scatter::new(vec![x, x], vec![y_min, y_max])
        .mode(Mode::Lines)
        .line(Line::default().color(color).width(1.5));
    trace = match name {
        Some(name) => trace.name(&name),
        None => trace.show_legend(false),
    };
    plot.add_trace(trace);
}

fn plot_curve(results: &OlsResult, highlight: &[Vec<String>]) -> Plot {
    let rows = sorted_rows(results, |r| r.median);
    let x: Vec<f64> = (0..rows.len()).map(|i| i as f64).collect();
    let column = |f: fn(&SummaryRow) -> f64| rows.iter().map(f).collect::<Vec<f64>>();

    let mut plot = Plot::new();
    plot.add_trace(
        Scatter::new(x.clone(), column(|r| r.median))
            .mode(Mode::Lines)
            .line(Line::default().color(NamedColor::Blue))
            .name("Median"),
    );
    for (values, name) in [
        (column(|r| r.std_one_up), "Mean + 1 SD"),
        (column(|r| r.std_one_down), "Mean - 1 SD"),
    ] {
        plot.add_trace(
            Scatter::new(x.clone(), rolling_mean(&values, ROLLING_WINDOW))
                .mode(Mode::Lines)
                .line(Line::default().color(Rgba::new(0xFF, 0x00, 0x00, 0.9)))
                .name(name),
        );
    }
    for (values, name) in [(column(|r| r.min), "Min"), (column(|r| r.max), "Max")] {
        plot.add_trace(
            Scatter::new(x.clone(), rolling_mean(&values, ROLLING_WINDOW))
                .mode(Mode::Lines)
                .line(Line::default().color(Rgba::new(0x80, 0x80, 0x80, 0.5)))
                .name(name),
        );
    }
    let last = x.last().copied().unwrap_or(0.0);
    plot.add_trace(
        Scatter::new(vec![0.0, last], vec![0.0, 0.0])
            .mode(Mode::Lines)
            .line(Line::default().color(NamedColor::Black))
            .show_legend(false),
    );

    let bounds = sorted_finite(
        &rows
            .iter()
            .flat_map(|r| [r.min, r.max])
            .collect::<Vec<_>>(),
    );
    let (y_min, y_max) = match (bounds.first(), bounds.last()) {
        (Some(lo), Some(hi)) => (lo.min(0.0), hi.max(0.0)),
        _ => (-1.0, 1.0),
    };
    for (i, key) in highlight.iter().enumerate() {
        if let Some(pos) = rows.iter().position(|r| &r.spec_name == key) {
            let label = format!("Controls: {}", key.join(", "));
            add_vertical_line(&mut plot, pos as f64, y_min, y_max, set1(i), Some(label));
        }
    }

    plot.set_layout(
        Layout::new()
            .title("Estimates curve")
            .x_axis(Axis::new().title("Specification (ranked by median)"))
            .y_axis(Axis::new().title("Coefficient")),
    );
    plot
}

fn plot_ic(results: &OlsResult, ic: InfoCriterion, highlight: &[Vec<String>]) -> Plot {
    let rows = sorted_rows(results, |r| r.ic(ic));
    let values: Vec<f64> = rows.iter().map(|r| r.ic(ic)).collect();
    let x: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();

    let mut plot = Plot::new();
    let sorted = sorted_finite(&values);
    let (lo, hi) = match (sorted.first(), sorted.last()) {
        (Some(lo), Some(hi)) => (*lo, *hi),
        _ => (0.0, 1.0),
    };
    plot.add_trace(
        Scatter::new(x, values)
            .mode(Mode::Lines)
            .line(Line::default().color(NamedColor::Black))
            .name(&ic.name().to_uppercase()),
    );
    for (i, key) in highlight.iter().enumerate() {
        if let Some(pos) = rows.iter().position(|r| &r.spec_name == key) {
            add_vertical_line(&mut plot, pos as f64, lo, hi, set1(i), None);
        }
    }
    plot.set_layout(
        Layout::new()
            .title(format!("{} curve", ic.name().to_uppercase()))
            .x_axis(Axis::new().title("Specification"))
            .y_axis(Axis::new().title(ic.name().to_uppercase())),
    );
    plot
}

fn plot_bdist(results: &OlsResult, highlight: &[Vec<String>]) -> Plot {
    let mut plot = Plot::new();
    for (i, key) in highlight.iter().enumerate() {
        let Some(spec) = results.find_spec(key) else {
            continue;
        };
        let Some((grid, density)) = gaussian_kde(&spec.estimates, DENSITY_POINTS) else {
            warn!("[{}]: too few finite draws for a density", spec_label(key));
            continue;
        };
        plot.add_trace(
            Scatter::new(grid, density)
                .mode(Mode::Lines)
                .line(Line::default().color(set1(i)))
                .name(&spec_label(key)),
        );
    }
    plot.set_layout(
        Layout::new()
            .title("Bootstrap Est. Dist.")
            .x_axis(Axis::new().title("Coefficient"))
            .y_axis(Axis::new().title("Density")),
    );
    plot
}

/// Ridgeline of bootstrap densities for up to 100 specifications, ordered by
/// median estimate.
fn plot_joyplot(results: &OlsResult, seed: u64) -> Plot {
    let mut order: Vec<(f64, usize)> = results
        .summary_rows()
        .iter()
        .enumerate()
        .map(|(i, r)| (r.median, i))
        .collect();
    order.sort_by(|a, b| a.0.total_cmp(&b.0));
    let picked: Vec<usize> = if order.len() > JOYPLOT_SPECS {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut idx = index::sample(&mut rng, order.len(), JOYPLOT_SPECS).into_vec();
        idx.sort_unstable();
        idx.into_iter().map(|i| order[i].1).collect()
    } else {
        order.iter().map(|(_, i)| *i).collect()
    };

    let mut plot = Plot::new();
    let n = picked.len().max(1);
    for (rank, &spec_idx) in picked.iter().enumerate() {
        let spec = &results.specs[spec_idx];
        let Some((grid, density)) = gaussian_kde(&spec.estimates, DENSITY_POINTS) else {
            continue;
        };
        let peak = density.iter().copied().fold(0.0_f64, f64::max);
        let offset = rank as f64;
        let ridge: Vec<f64> = density
            .iter()
            .map(|d| offset + if peak > 0.0 { 3.0 * d / peak } else { 0.0 })
            .collect();
        let baseline = vec![offset; grid.len()];
        let shade = (rank as f64 / n as f64 * 200.0) as u8;
        plot.add_trace(
            Scatter::new(grid.clone(), baseline)
                .mode(Mode::Lines)
                .line(Line::default().color(NamedColor::White).width(0.5))
                .show_legend(false),
        );
        plot.add_trace(
            Scatter::new(grid, ridge)
                .mode(Mode::Lines)
                .line(Line::default().color(NamedColor::White).width(0.5))
                .fill(Fill::ToNextY)
                .fill_color(Rgb::new(0xD7, 0x30u8.saturating_add(shade / 2), shade / 4))
                .name(&spec_label(&spec.spec_name))
                .show_legend(false),
        );
    }
    plot.set_layout(
        Layout::new()
            .title("Bootstrap estimates by specification")
            .x_axis(Axis::new().title("Coefficient"))
            .y_axis(Axis::new().show_tick_labels(false)),
    );
    plot
}

/// Trailing mean over `window` values; NaN until the window is full or when
/// it contains a missing value.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                return f64::NAN;
            }
            let slice = &values[i + 1 - window..=i];
            if slice.iter().any(|v| !v.is_finite()) {
                f64::NAN
            } else {
                slice.iter().sum::<f64>() / window as f64
            }
        })
        .collect()
}

/// Gaussian kernel density on an evenly spaced grid, with Scott's rule
/// bandwidth. `None` when fewer than two distinct finite values exist.
pub fn gaussian_kde(values: &[f64], points: usize) -> Option<(Vec<f64>, Vec<f64>)> {
    let data = sorted_finite(values);
    let n = data.len();
    let (_, std) = mean_std(&data);
    if n < 2 || std.is_nan() || std <= 0.0 || points < 2 {
        return None;
    }
    let bw = std * (n as f64).powf(-0.2);
    let kernel = Normal::new(0.0, 1.0).ok()?;
    let lo = data[0] - 3.0 * bw;
    let hi = data[n - 1] + 3.0 * bw;
    let step = (hi - lo) / (points - 1) as f64;
    let grid: Vec<f64> = (0..points).map(|i| lo + step * i as f64).collect();
    let density = grid
        .iter()
        .map(|g| data.iter().map(|x| kernel.pdf((g - x) / bw)).sum::<f64>() / (n as f64 * bw))
        .collect();
    Some((grid, density))
}
