use robustipy::crossval::kfold_splits;
use robustipy::frame::{complete_rows, composite, group_demean};
use robustipy::plot::{PlotOptions, gaussian_kde, rolling_mean};
use robustipy::results::{OlsResult, SpecResult, quantile_nearest};
use robustipy::types::InfoCriterion;

fn spec(controls: &[&str], bic: f64, estimates: Vec<f64>) -> SpecResult {
    let controls: Vec<String> = controls.iter().map(|s| s.to_string()).collect();
    let mut predictors = vec!["x".to_string()];
    predictors.extend(controls.iter().cloned());
    predictors.push("const".to_string());
    let mut b = vec![1.0];
    b.extend(controls.iter().map(|_| 3.0));
    b.push(0.5);
    let p = vec![0.01; b.len()];
    SpecResult {
        y: vec!["y".to_string()],
        spec_name: controls.clone(),
        controls,
        predictors,
        b,
        p,
        p_values: vec![0.04; estimates.len()],
        estimates,
        ll: -bic / 2.0,
        aic: bic - 1.0,
        bic,
        hqic: bic - 0.5,
        av_k_metric: None,
        nobs: 100,
    }
}

fn two_spec_result() -> OlsResult {
    OlsResult {
        y_name: vec!["y".to_string()],
        x_name: vec!["x".to_string()],
        controls: vec!["c".to_string()],
        draws: 5,
        specs: vec![
            spec(&[], 10.0, vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            spec(&["c"], 12.0, vec![0.5, f64::NAN, 1.5, 2.5, 3.5]),
        ],
    }
}

#[test]
fn nearest_quantile_rounds_half_to_even() {
    let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
    assert_eq!(quantile_nearest(&sorted, 0.975), 5.0);
    assert_eq!(quantile_nearest(&sorted, 0.025), 1.0);
    assert_eq!(quantile_nearest(&[1.0, 2.0, 3.0], 0.25), 1.0);
    assert_eq!(quantile_nearest(&[1.0, 2.0, 3.0], 0.75), 3.0);
    assert!(quantile_nearest(&[], 0.5).is_nan());
}

#[test]
fn summary_rows_skip_missing_draws() {
    let result = two_spec_result();
    let rows = result.summary_rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].median, 3.0);
    assert_eq!(rows[0].min, 1.0);
    assert_eq!(rows[0].max, 5.0);
    assert!((rows[0].std_one_up - (3.0 + 2.5_f64.sqrt())).abs() < 1e-12);
    assert_eq!(rows[1].median, 2.0);
    assert_eq!(rows[1].min, 0.5);
    assert_eq!(rows[1].ic(InfoCriterion::Bic), 12.0);

    let table = result.summary_table().expect("table");
    assert_eq!(table.height(), 2);
    assert!(table.column("ci_up").is_ok());
    assert!(table.column("spec_name").is_ok());
}

#[test]
fn bma_weights_follow_bic() {
    let result = two_spec_result();
    let bma = result.compute_bma();
    assert_eq!(bma.len(), 1);
    let w = (-1.0_f64).exp();
    let total = 1.0 + w;
    assert!((bma[0].probs - w / total).abs() < 1e-12);
    assert!((bma[0].average_coefs - 3.0 * w / total).abs() < 1e-12);

    let mut always = two_spec_result();
    always.specs[0] = spec(&["c"], 10.0, vec![1.0; 5]);
    let bma = always.compute_bma();
    assert!((bma[0].probs - 1.0).abs() < 1e-12);
    assert_eq!(always.bma_table().expect("table").height(), 1);
}

#[test]
fn merge_prefixes_the_other_result() {
    let left = two_spec_result();
    let right = two_spec_result();
    let merged = left.merge(&right, "alt_").expect("merge");
    assert_eq!(merged.n_specs(), 4);
    assert_eq!(merged.specs[3].spec_name, vec!["alt_c".to_string()]);
    assert_eq!(merged.specs[2].y, vec!["alt_y".to_string()]);
    assert_eq!(merged.y_name, vec!["y".to_string(), "alt_y".to_string()]);
    assert_eq!(merged.controls, vec!["c".to_string()]);

    let names = merged.specs_names();
    for (i, name) in names.iter().enumerate() {
        assert!(!names[i + 1..].contains(name), "duplicate spec {name:?}");
    }
    assert_eq!(merged.specs[2].spec_name, vec!["alt_y".to_string()]);
    let baseline = merged.find_spec(&["alt_y".to_string()]).expect("right baseline");
    assert_eq!(baseline.y, vec!["alt_y".to_string()]);
    assert_eq!(merged.find_spec(&[]).expect("left baseline").y, vec!["y".to_string()]);

    let mut other = two_spec_result();
    other.draws = 7;
    assert!(left.merge(&other, "x_").is_err());
}

#[test]
fn save_and_load_keep_missing_draws() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("results.json");
    let result = two_spec_result();
    result.save(&path).expect("save");
    let loaded = OlsResult::load(&path).expect("load");
    assert_eq!(loaded.n_specs(), 2);
    assert!(loaded.specs[1].estimates[1].is_nan());
    assert_eq!(loaded.specs[1].estimates[2], 1.5);
    assert!(loaded.specs[0].av_k_metric.is_none());
    assert!(loaded.summary().contains("Specifications: 2"));
}

#[test]
fn frame_helpers() {
    let mut cols = vec![vec![1.0, 3.0, 10.0, 20.0]];
    group_demean(&mut cols, &[0, 0, 1, 1]);
    assert_eq!(cols[0], vec![-1.0, 1.0, -5.0, 5.0]);

    let a = [1.0, 2.0, 3.0];
    let b = [10.0, f64::NAN, 30.0];
    let c = composite(&[&a, &b]);
    let half = 0.5_f64.sqrt();
    assert!((c[0] - (-1.0 - half) / 2.0).abs() < 1e-12);
    assert!((c[1] - 0.0).abs() < 1e-12);
    assert!((c[2] - (1.0 + half) / 2.0).abs() < 1e-12);

    let y = [1.0, f64::NAN, 3.0, 4.0];
    let x = [1.0, 2.0, f64::NAN, 4.0];
    let groups = [Some(0), Some(0), Some(1), None];
    assert_eq!(complete_rows(&y, &[&x], None), vec![0, 3]);
    assert_eq!(complete_rows(&y, &[&x], Some(&groups[..])), vec![0]);
}

#[test]
fn kfold_splits_are_contiguous() {
    let splits = kfold_splits(10, 3);
    assert_eq!(splits, vec![0..4, 4..7, 7..10]);
}

#[test]
fn density_and_rolling_helpers() {
    let values: Vec<f64> = (0..200).map(|i| (i as f64 * 0.37).sin()).collect();
    let (grid, density) = gaussian_kde(&values, 400).expect("kde");
    let step = grid[1] - grid[0];
    let area: f64 = density.iter().sum::<f64>() * step;
    assert!((area - 1.0).abs() < 0.02, "area={area}");
    assert!(gaussian_kde(&[1.0, 1.0], 10).is_none());

    let rolled = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 2);
    assert!(rolled[0].is_nan());
    assert_eq!(&rolled[1..], &[1.5, 2.5, 3.5]);
}

#[test]
fn plots_are_written() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = two_spec_result();
    let options = PlotOptions {
        specs: Some(vec![vec!["c".to_string()]]),
        ic: Some(InfoCriterion::Bic),
        output_dir: dir.path().to_path_buf(),
        prefix: Some("demo".to_string()),
        joyplot: true,
        ..Default::default()
    };
    let written = result.plot(&options).expect("plot");
    assert_eq!(written.len(), 4);
    for path in written {
        assert!(path.exists(), "{} missing", path.display());
    }
}
