use polars::prelude::*;
use robustipy::model::{FitConfig, OlsRobust};
use robustipy::subsets::{all_subsets, space_size};

fn noise(i: usize, salt: usize) -> f64 {
    ((i * 7919 + salt * 104729) % 101) as f64 / 101.0 - 0.5
}

fn synthetic(n: usize) -> DataFrame {
    let x: Vec<f64> = (0..n).map(|i| (i % 13) as f64 + noise(i, 1)).collect();
    let z1: Vec<f64> = (0..n).map(|i| ((i * 3) % 7) as f64 + noise(i, 2)).collect();
    let z2: Vec<f64> = (0..n).map(|i| ((i * 5) % 11) as f64 * 0.5 + noise(i, 3)).collect();
    let y: Vec<f64> = (0..n)
        .map(|i| 1.0 + 2.0 * x[i] + 0.5 * z1[i] + noise(i, 4))
        .collect();
    let y2: Vec<f64> = (0..n).map(|i| y[i] * 0.8 + noise(i, 5)).collect();
    let g: Vec<String> = (0..n).map(|i| format!("g{}", i % 5)).collect();
    DataFrame::new(
        n,
        vec![
            Series::new("y".into(), y).into(),
            Series::new("y2".into(), y2).into(),
            Series::new("x".into(), x).into(),
            Series::new("z1".into(), z1).into(),
            Series::new("z2".into(), z2).into(),
            Series::new("g".into(), g).into(),
        ],
    )
    .expect("frame")
}

fn names(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn config(draws: usize, seed: u64) -> FitConfig {
    FitConfig {
        draws,
        replace: true,
        seed: Some(seed),
        ..Default::default()
    }
}

#[test]
fn subsets_are_ordered_by_size() {
    let items = names(&["a", "b", "c"]);
    let subsets = all_subsets(&items);
    assert_eq!(Some(subsets.len()), space_size(&items));
    assert_eq!(subsets[0], Vec::<String>::new());
    assert_eq!(subsets[1], names(&["a"]));
    assert_eq!(subsets[3], names(&["c"]));
    assert_eq!(subsets[4], names(&["a", "b"]));
    assert_eq!(subsets[6], names(&["b", "c"]));
    assert_eq!(subsets[7], names(&["a", "b", "c"]));
}

#[test]
fn results_absent_before_fit() {
    let model = OlsRobust::new(names(&["y"]), names(&["x"]), synthetic(40)).expect("model");
    assert!(model.get_results().is_none());
}

#[test]
fn fit_covers_the_specification_space() {
    let mut model = OlsRobust::new(names(&["y"]), names(&["x"]), synthetic(60)).expect("model");
    let controls = names(&["z1", "z2"]);
    let results = model.fit(&controls, &config(25, 7)).expect("fit");
    assert_eq!(results.n_specs(), 4);
    assert_eq!(results.draws, 25);
    for spec in &results.specs {
        assert_eq!(spec.estimates.len(), 25);
        assert_eq!(spec.p_values.len(), 25);
        assert_eq!(spec.predictors.first().map(String::as_str), Some("x"));
        assert_eq!(spec.predictors.last().map(String::as_str), Some("const"));
        assert_eq!(spec.b.len(), spec.predictors.len());
        assert!(spec.estimates.iter().all(|b| b.is_finite()));
        assert!((spec.b[0] - 2.0).abs() < 0.3, "b={}", spec.b[0]);
        assert!(spec.bic.is_finite() && spec.aic < spec.bic);
    }
    assert!(results.specs[0].controls.is_empty());
    assert_eq!(results.specs[3].spec_name, names(&["z1", "z2"]));
    let full = &results.specs[3];
    let z1 = full.coef("z1").expect("z1 coefficient");
    assert!((z1 - 0.5).abs() < 0.3, "z1={z1}");
}

#[test]
fn same_seed_same_draws_regardless_of_threads() {
    let data = synthetic(50);
    let controls = names(&["z1"]);
    let mut a = OlsRobust::new(names(&["y"]), names(&["x"]), data.clone()).expect("model");
    let mut b = OlsRobust::new(names(&["y"]), names(&["x"]), data).expect("model");
    let parallel = config(30, 11);
    let sequential = FitConfig {
        parallel: false,
        ..config(30, 11)
    };
    let ra = a.fit(&controls, &parallel).expect("fit").clone();
    let rb = b.fit(&controls, &sequential).expect("fit").clone();
    for (sa, sb) in ra.specs.iter().zip(&rb.specs) {
        assert_eq!(sa.estimates, sb.estimates);
    }
}

#[test]
fn listwise_deletion_per_specification() {
    let mut df = synthetic(60);
    let mut z1: Vec<Option<f64>> = df
        .column("z1")
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .into_iter()
        .collect();
    z1[3] = None;
    z1[10] = None;
    df.with_column(Series::new("z1".into(), z1).into()).unwrap();

    let mut model = OlsRobust::new(names(&["y"]), names(&["x"]), df).expect("model");
    let results = model.fit(&names(&["z1"]), &config(5, 1)).expect("fit");
    assert_eq!(results.specs[0].nobs, 60);
    assert_eq!(results.specs[1].nobs, 58);
}

#[test]
fn unknown_columns_are_rejected() {
    assert!(OlsRobust::new(names(&["nope"]), names(&["x"]), synthetic(20)).is_err());
    assert!(OlsRobust::new(names(&["y"]), Vec::new(), synthetic(20)).is_err());
    let mut model = OlsRobust::new(names(&["y"]), names(&["x"]), synthetic(20)).expect("model");
    assert!(model.fit(&names(&["missing"]), &config(5, 1)).is_err());
    assert!(model.fit(&names(&["x"]), &config(5, 1)).is_err());
    assert!(model.fit(&names(&["z1"]), &config(0, 1)).is_err());
}

#[test]
fn kfold_metric_is_reported() {
    let mut model = OlsRobust::new(names(&["y"]), names(&["x"]), synthetic(60)).expect("model");
    let cfg = FitConfig {
        kfold: Some(5),
        ..config(5, 3)
    };
    let results = model.fit(&names(&["z1"]), &cfg).expect("fit");
    for spec in &results.specs {
        let metric = spec.av_k_metric.expect("kfold metric");
        assert!(metric.is_finite() && metric > 0.0 && metric < 2.0);
    }
    let bad = FitConfig {
        kfold: Some(1),
        ..config(5, 3)
    };
    assert!(model.fit(&names(&["z1"]), &bad).is_err());
}

#[test]
fn fixed_effects_resample_groups() {
    let mut model = OlsRobust::new(names(&["y"]), names(&["x"]), synthetic(60)).expect("model");
    let cfg = FitConfig {
        group: Some("g".to_string()),
        sample_size: Some(5),
        ..config(20, 5)
    };
    let results = model.fit(&names(&["z1"]), &cfg).expect("fit");
    assert_eq!(results.n_specs(), 2);
    for spec in &results.specs {
        assert!((spec.b[0] - 2.0).abs() < 0.3, "b={}", spec.b[0]);
        assert!(spec.estimates.iter().all(|b| b.is_finite()));
    }
    let clash = FitConfig {
        group: Some("z1".to_string()),
        ..config(5, 5)
    };
    assert!(model.fit(&names(&["z1"]), &clash).is_err());
}

#[test]
fn several_outcomes_form_composites() {
    let model = OlsRobust::new(names(&["y", "y2"]), names(&["x"]), synthetic(60)).expect("model");
    let composites = model.multiple_y().expect("composites");
    assert_eq!(composites.len(), 1);
    assert_eq!(composites[0].names, names(&["y", "y2"]));
    let mean = composites[0].values.iter().sum::<f64>() / 60.0;
    assert!(mean.abs() < 1e-9);

    let mut model = model;
    let results = model.fit(&names(&["z1", "z2"]), &config(5, 2)).expect("fit");
    assert_eq!(results.n_specs(), 4);
    assert_eq!(results.specs[0].spec_name, names(&["y", "y2"]));
    assert_eq!(results.specs[1].spec_name, names(&["y", "y2", "z1"]));
    assert_eq!(results.specs[1].y, names(&["y", "y2"]));
}

#[test]
fn shuffled_outcome_still_estimates() {
    let mut model = OlsRobust::new(names(&["y"]), names(&["x"]), synthetic(60)).expect("model");
    let cfg = FitConfig {
        shuffle: true,
        ..config(40, 9)
    };
    let results = model.fit(&[], &cfg).expect("fit");
    let spec = &results.specs[0];
    assert!(spec.estimates.iter().all(|b| b.is_finite()));
    let mean = spec.estimates.iter().sum::<f64>() / spec.estimates.len() as f64;
    assert!(mean.abs() < spec.b[0].abs());
}

#[test]
fn cluster_draws_drop_singleton_groups() {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use robustipy::bootstrap::sample_groups;

    let mut rng = StdRng::seed_from_u64(42);
    let rows = sample_groups(&[0, 0, 1, 2, 2, 2], 50, &mut rng);
    assert_eq!(rows, vec![0, 1, 3, 4, 5]);
}

#[test]
fn nan_group_cells_are_dropped() {
    let n = 40;
    let x: Vec<f64> = (0..n).map(|i| (i % 9) as f64 + noise(i, 1)).collect();
    let y: Vec<f64> = (0..n).map(|i| 1.0 + 2.0 * x[i] + noise(i, 4)).collect();
    let mut g: Vec<f64> = (0..n).map(|i| (i % 4) as f64).collect();
    g[3] = f64::NAN;
    g[17] = f64::NAN;
    let df = DataFrame::new(
        n,
        vec![
            Series::new("y".into(), y).into(),
            Series::new("x".into(), x).into(),
            Series::new("g".into(), g).into(),
        ],
    )
    .expect("frame");

    let codes = robustipy::frame::group_codes(&df, "g").expect("codes");
    assert_eq!(codes[3], None);
    assert_eq!(codes[17], None);
    assert_eq!(codes.iter().flatten().max(), Some(&3));

    let mut model = OlsRobust::new(names(&["y"]), names(&["x"]), df).expect("model");
    let cfg = FitConfig {
        group: Some("g".to_string()),
        sample_size: Some(4),
        ..config(5, 3)
    };
    let results = model.fit(&[], &cfg).expect("fit");
    assert_eq!(results.specs[0].nobs, 38);
}

#[test]
fn oversized_sample_without_replacement_is_clamped() {
    let mut model = OlsRobust::new(names(&["y"]), names(&["x"]), synthetic(60)).expect("model");
    let cfg = FitConfig {
        draws: 5,
        replace: false,
        sample_size: Some(10_000),
        seed: Some(4),
        ..Default::default()
    };
    let results = model.fit(&names(&["z1"]), &cfg).expect("fit");
    for spec in &results.specs {
        assert!(spec.estimates.iter().all(|b| b.is_finite()));
        // every draw holds all rows, so it reproduces the full-sample fit
        assert!(spec.estimates.iter().all(|b| (b - spec.b[0]).abs() < 1e-8));
    }
}

#[test]
fn too_few_complete_rows_is_an_error() {
    let mut df = synthetic(40);
    let sparse: Vec<Option<f64>> = (0..40).map(|i| (i < 2).then_some(i as f64)).collect();
    df.with_column(Series::new("z3".into(), sparse).into()).unwrap();
    let mut model = OlsRobust::new(names(&["y"]), names(&["x"]), df).expect("model");
    let err = model.fit(&names(&["z3"]), &config(5, 1)).unwrap_err();
    assert!(err.to_string().contains("complete rows"), "{err}");
}

#[test]
fn specification_space_overflow_is_rejected() {
    let many: Vec<String> = (0..64).map(|i| format!("c{i}")).collect();
    assert_eq!(space_size(&many), None);
    assert_eq!(space_size(&many[..63]), Some(1usize << 63));

    let mut model = OlsRobust::new(names(&["y"]), names(&["x"]), synthetic(20)).expect("model");
    let err = model.fit(&many, &config(5, 1)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<robustipy::error::RobustError>(),
        Some(robustipy::error::RobustError::InvalidArgument(_))
    ));
}
