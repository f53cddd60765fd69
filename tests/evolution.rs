use u_symreg::dataset::Dataset;
use u_symreg::evolution::{GapAlgorithm, GpAlgorithm, Individual, Parameters};
use u_symreg::expr::Expression;
use u_symreg::metrics::{mae, mse, rmse};
use u_symreg::random::create_rng;

fn quadratic(rows: usize) -> Dataset {
    let features: Vec<Vec<f64>> = (0..rows)
        .map(|i| {
            let x = i as f64 / rows as f64 * 4.0 - 2.0;
            vec![x, 1.0 - x]
        })
        .collect();
    let labels = features.iter().map(|r| r[0] * r[0] + r[1]).collect();
    Dataset::new(features, labels).unwrap()
}

fn params(evals: usize) -> Parameters {
    Parameters::new(evals, mse)
        .with_error_function(rmse)
        .with_error_function(mae)
}

#[test]
fn gap_runs_are_reproducible() {
    let run = |parallel: bool| {
        let mut gap = GapAlgorithm::from_dataset(quadratic(40), 1234, 30, 15, 0.5).unwrap();
        gap.fit(&params(1500).with_parallel(parallel)).unwrap()
    };
    let (a, b) = (run(false), run(true));
    assert_eq!(a.best, b.best);
    assert_eq!(a.fitness_history, b.fitness_history);
}

#[test]
fn best_fitness_history_is_monotone() {
    let mut gap = GapAlgorithm::from_dataset(quadratic(40), 5, 40, 20, 0.5).unwrap();
    let report = gap.fit(&params(4000)).unwrap();
    assert_eq!(report.generations, 100);
    assert_eq!(report.fitness_history.len(), 101);
    for w in report.fitness_history.windows(2) {
        assert!(w[1] <= w[0]);
    }
    assert!(report.best_fitness <= report.fitness_history[0]);
}

#[test]
fn gp_cross_validation_reports_every_function() {
    let mut gp = GpAlgorithm::from_dataset(quadratic(30), 9, 20, 15, 0.5).unwrap();
    let cv = gp.perform_k_cross_validation(3, &params(400)).unwrap();
    assert_eq!(cv.errors.len(), 3);
    assert!(cv.errors.iter().all(|row| row.len() == 3));
    for fold in 0..3 {
        let (m, r) = (cv.errors[0][fold], cv.errors[1][fold]);
        assert!((m.sqrt() - r).abs() <= 1e-9 * r.max(1.0));
    }
    assert_eq!(cv.mean_errors().len(), 3);
}

#[test]
fn train_from_file_and_reload_best() {
    let dir = std::env::temp_dir();
    let data_path = dir.join(format!("u_symreg_e2e_{}.dat", std::process::id()));
    let expr_path = dir.join(format!("u_symreg_e2e_{}.expr", std::process::id()));

    let data = quadratic(25);
    let mut text = String::from("@relation quadratic\n@inputs x0, x1\n\n");
    for (row, label) in data.features.iter().zip(&data.labels) {
        text.push_str(&format!("{}, {}, {}\n", row[0], row[1], label));
    }
    std::fs::write(&data_path, text).unwrap();

    let mut gap = GapAlgorithm::from_file(&data_path, '@', ',', 3, 20, 15, 0.5).unwrap();
    assert_eq!(gap.num_rows(), 25);
    let report = gap.fit(&params(600).with_parallel(false)).unwrap();

    std::fs::write(&expr_path, format!("{}\n", report.best)).unwrap();
    let mut reloaded = Expression::load(&expr_path, 15, 2).unwrap();
    let fitness = reloaded.evaluate_expression(&data.features, &data.labels, mse, true);

    let _ = std::fs::remove_file(&data_path);
    let _ = std::fs::remove_file(&expr_path);

    let expected = report.best.fitness();
    assert!((fitness - expected).abs() <= 1e-6 * expected.abs().max(1.0));
}

#[test]
fn shuffled_split_then_held_out_fit() {
    let mut rng = create_rng(77);
    let data = quadratic(50).shuffled(&mut rng);
    let (train, test) = data.split_train_test(0.2, None, &mut rng).unwrap();
    assert_eq!(test.len(), 10);

    let mut gp = GpAlgorithm::from_dataset(train.clone(), 8, 20, 15, 0.5).unwrap();
    let cv = gp.fit_cv_files(&train, &test, &params(400)).unwrap();
    let predicted: Vec<f64> = test.features.iter().map(|r| cv.best.predict(r)).collect();
    assert_eq!(cv.errors[2][0].to_bits(), mae(&predicted, &test.labels).to_bits());
}
