use palmer_core::{ErrorKind, Value};
use palmer_datasets::make_penguins;
use palmer_io::{read_featurized, read_table, save_artifact, write_table};
use palmer_pipeline::featurize::{load_encoders, FEATURE_ENCODER_KIND, LABEL_ENCODER_KIND};
use palmer_pipeline::trainer::load_model;
use palmer_pipeline::{
    run_all, run_evaluate, run_featurize, run_split, run_train, DirectorySink, MemorySink, PathParams,
    PipelineConfig,
};
use palmer_preprocessing::LabelEncoder;
use std::fs;
use tempfile::TempDir;

fn workspace(rows: usize, missing: usize) -> (TempDir, PipelineConfig) {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        paths: PathParams::rooted_at(dir.path()),
        ..PipelineConfig::default()
    };
    let raw = make_penguins(rows, missing, 42).unwrap();
    write_table(&config.paths.raw_path(), &raw).unwrap();
    (dir, config)
}

#[test]
fn full_run_writes_every_artifact() {
    let (_dir, config) = workspace(344, 2);
    let mut sink = DirectorySink::new(&config.paths.report_dir);
    let summary = run_all(&config, &mut sink).unwrap();

    assert_eq!(summary.split.train_rows, 273);
    assert_eq!(summary.split.test_rows, 69);
    assert!((0.0..=1.0).contains(&summary.train.train_accuracy));
    assert!((0.0..=1.0).contains(&summary.train.test_accuracy));
    assert!((0.0..=1.0).contains(&summary.metrics.accuracy));
    assert_eq!(summary.metrics.n_rows, 69);
    assert!(summary.metrics.roc.is_some());

    let paths = &config.paths;
    for path in [
        paths.train_split_path(),
        paths.test_split_path(),
        paths.processed_path("train_processed.csv"),
        paths.processed_path("test_processed.csv"),
        paths.feature_encoder_path(),
        paths.label_encoder_path(),
        paths.model_path(),
        paths.report_dir.join("metrics.json"),
        paths.report_dir.join("plots").join("confusion_matrix.json"),
        paths.report_dir.join("plots").join("roc.json"),
        paths.report_dir.join("plots").join("feature_importance.json"),
        paths.report_dir.join("report.md"),
    ] {
        assert!(path.exists(), "missing {}", path.display());
    }
}

#[test]
fn stages_are_deterministic() {
    let (_a, first) = workspace(200, 4);
    let (_b, second) = workspace(200, 4);
    let mut sink_a = MemorySink::default();
    let mut sink_b = MemorySink::default();
    let a = run_all(&first, &mut sink_a).unwrap();
    let b = run_all(&second, &mut sink_b).unwrap();

    assert_eq!(
        read_table(&first.paths.test_split_path()).unwrap(),
        read_table(&second.paths.test_split_path()).unwrap()
    );
    assert_eq!(a.metrics, b.metrics);
    assert_eq!(sink_a.metrics, sink_b.metrics);
}

#[test]
fn featurized_partitions_share_columns() {
    let (_dir, config) = workspace(150, 3);
    run_split(&config.split, &config.paths).unwrap();
    let summary = run_featurize(&config.featurize, &config.evaluate, &config.paths).unwrap();

    let target = &config.featurize.target_column;
    let train = read_featurized(&config.paths.processed_path("train_processed.csv"), target).unwrap();
    let test = read_featurized(&config.paths.processed_path("test_processed.csv"), target).unwrap();
    assert_eq!(train.columns(), test.columns());
    assert_eq!(train.columns(), summary.columns.as_slice());
    assert!(!train.columns().contains(&"species".to_string()));

    let encoders = load_encoders(&config.paths).unwrap();
    assert_eq!(encoders.label.classes(), &["female", "male"]);
    assert_eq!(encoders.feature.categories(), &["Adelie", "Chinstrap", "Gentoo"]);
}

#[test]
fn too_many_neighbors_is_config_error() {
    let (_dir, mut config) = workspace(150, 0);
    run_split(&config.split, &config.paths).unwrap();
    run_featurize(&config.featurize, &config.evaluate, &config.paths).unwrap();

    config.train.neighbor_count = 500;
    let err = run_train(&config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(!config.paths.model_path().exists());
}

#[test]
fn unseen_species_in_test_partition() {
    let (_dir, config) = workspace(150, 0);
    run_split(&config.split, &config.paths).unwrap();

    let test_path = config.paths.test_split_path();
    let test = read_table(&test_path).unwrap();
    let test = test.map_column("species", |_| Value::Text("Emperor".into())).unwrap();
    write_table(&test_path, &test).unwrap();

    let err = run_featurize(&config.featurize, &config.evaluate, &config.paths).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Encoding);
    assert!(!config.paths.feature_encoder_path().exists());
}

#[test]
fn evaluate_without_model_is_artifact_error() {
    let (_dir, config) = workspace(150, 0);
    run_split(&config.split, &config.paths).unwrap();
    run_featurize(&config.featurize, &config.evaluate, &config.paths).unwrap();

    let err = run_evaluate(&config, &mut MemorySink::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Artifact);
}

#[test]
fn wrong_artifact_kind_is_rejected() {
    let (_dir, config) = workspace(150, 0);
    let mut sink = MemorySink::default();
    run_all(&config, &mut sink).unwrap();

    let encoder = fs::read_to_string(config.paths.feature_encoder_path()).unwrap();
    let payload: serde_json::Value = serde_json::from_str(&encoder).unwrap();
    save_artifact(&config.paths.model_path(), FEATURE_ENCODER_KIND, &payload["payload"]).unwrap();

    let err = load_model(&config.paths.model_path()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Artifact);
}

#[test]
fn dataset_schema_must_match_model() {
    let (_dir, config) = workspace(150, 0);
    run_all(&config, &mut MemorySink::default()).unwrap();

    let test_path = config.paths.processed_path("test_processed.csv");
    let table = read_table(&test_path).unwrap();
    let renamed = table.rename_columns(|c| c.replace("bill", "beak"));
    write_table(&test_path, &renamed).unwrap();

    let err = run_evaluate(&config, &mut MemorySink::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Artifact);
}

#[test]
fn label_encoder_must_match_model_classes() {
    let (_dir, config) = workspace(150, 0);
    run_all(&config, &mut MemorySink::default()).unwrap();

    let label = LabelEncoder::from_classes(
        config.featurize.target_column.clone(),
        vec!["female".into(), "male".into(), "unknown".into()],
    );
    save_artifact(&config.paths.label_encoder_path(), LABEL_ENCODER_KIND, &label).unwrap();

    let err = run_evaluate(&config, &mut MemorySink::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Artifact);
}

#[test]
fn skipped_roc_leaves_no_stale_plot() {
    let (_dir, config) = workspace(150, 0);
    run_all(&config, &mut DirectorySink::new(&config.paths.report_dir)).unwrap();
    let roc = config.paths.report_dir.join("plots").join("roc.json");
    assert!(roc.exists());

    // Keep only one sex in the featurized test set so the ROC is skipped.
    let test_path = config.paths.processed_path("test_processed.csv");
    let table = read_table(&test_path).unwrap();
    let target = table.column_index(&config.featurize.target_column).unwrap();
    let males = table.filter_rows(|row| row[target].as_f64() == Some(1.0));
    write_table(&test_path, &males).unwrap();

    let metrics = run_evaluate(&config, &mut DirectorySink::new(&config.paths.report_dir)).unwrap();
    assert!(metrics.roc.is_none());
    assert!(!roc.exists());
}
