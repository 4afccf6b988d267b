use std::io::Write;

use tempfile::NamedTempFile;
use voxflow_app::Settings;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn loads_a_full_config_file() {
    let file = write_config(
        r#"
max_file_size_mb = 50
free_daily_limit_minutes = 15
pro_daily_limit_minutes = 240
queue_capacity = 8
worker_pool_size = 4
legacy_pro_user_ids = [101, 202]

[backend]
kind = "local"
model = "medium"
timeout_secs = 300
"#,
    );

    let settings = Settings::from_path(file.path()).unwrap();
    assert_eq!(settings.max_file_size_mb, 50);
    assert_eq!(settings.free_daily_limit_minutes, 15);
    assert_eq!(settings.pro_daily_limit_minutes, 240);
    assert_eq!(settings.queue_capacity, 8);
    assert_eq!(settings.worker_pool_size, 4);
    assert_eq!(settings.legacy_pro_user_ids, vec![101, 202]);
    assert_eq!(settings.backend.model, "medium");
    assert_eq!(settings.backend.timeout_secs, 300);
}

#[test]
fn missing_fields_fall_back_to_defaults() {
    let file = write_config("max_file_size_mb = 100\n");

    let settings = Settings::from_path(file.path()).unwrap();
    let defaults = Settings::default();
    assert_eq!(settings.max_file_size_mb, 100);
    assert_eq!(settings.queue_capacity, defaults.queue_capacity);
    assert_eq!(settings.backend.kind, "local");
    assert_eq!(settings.backend.model, defaults.backend.model);
}

#[test]
fn partial_backend_table_is_accepted() {
    let file = write_config("[backend]\nmodel = \"large-v3\"\n");

    let settings = Settings::from_path(file.path()).unwrap();
    assert_eq!(settings.backend.model, "large-v3");
    assert_eq!(settings.backend.kind, "local");
}

#[test]
fn unknown_backend_kind_is_clamped_to_local() {
    let file = write_config("[backend]\nkind = \"carrier-pigeon\"\n");

    let settings = Settings::from_path(file.path()).unwrap();
    assert_eq!(settings.backend.kind, "local");
}

#[test]
fn pro_limit_below_free_is_raised() {
    let file = write_config("free_daily_limit_minutes = 60\npro_daily_limit_minutes = 10\n");

    let settings = Settings::from_path(file.path()).unwrap();
    assert_eq!(settings.pro_daily_limit_minutes, 60);
}

#[test]
fn zero_worker_pool_is_rejected() {
    let file = write_config("worker_pool_size = 0\n");

    let err = Settings::from_path(file.path()).unwrap_err();
    assert!(err.contains("worker_pool_size"));
}

#[test]
fn remote_backend_requires_an_endpoint() {
    let file = write_config("[backend]\nkind = \"remote\"\n");

    let err = Settings::from_path(file.path()).unwrap_err();
    assert!(err.contains("remote_endpoint"));
}
