// tests/config_loading.rs

use std::fs;

use sitepipe::config::{load_and_validate, load_or_builtin};
use sitepipe::errors::SitepipeError;
use sitepipe::pipeline::TaskId;
use sitepipe::types::TriggerWhileRunningBehaviour;
use sitepipe_test_utils::ConfigFileBuilder;
use tempfile::tempdir;

fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Sitepipe.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn missing_file_falls_back_to_builtin_layout() {
    let dir = tempdir().unwrap();
    let cfg = load_or_builtin(dir.path().join("Sitepipe.toml")).unwrap();

    assert_eq!(cfg.paths.source.to_str(), Some("docs"));
    assert_eq!(cfg.paths.build.to_str(), Some("build"));
    assert_eq!(cfg.server.port, 3000);
    assert_eq!(cfg.images.webp_quality, 90);
    assert_eq!(cfg.watch.len(), 3);
    assert!(cfg.watch.iter().any(|w| w.tasks == vec![TaskId::Html] && w.reload));
}

#[test]
fn partial_file_keeps_defaults_for_other_sections() {
    let (_dir, path) = write_config(
        r#"
[config]
triggered_while_running_behaviour = "cancel"

[server]
port = 8080

[[watch]]
patterns = ["docs/**/*.md"]
tasks = ["html"]
reload = true
"#,
    );
    let cfg = load_and_validate(&path).unwrap();

    assert_eq!(
        cfg.config.triggered_while_running_behaviour,
        TriggerWhileRunningBehaviour::Cancel
    );
    assert_eq!(cfg.server.port, 8080);
    assert!(cfg.server.cors);
    assert_eq!(cfg.styles.output.to_str(), Some("css/style.min.css"));
    assert_eq!(cfg.watch.len(), 1);
}

#[test]
fn empty_watch_list_disables_watching() {
    let (_dir, path) = write_config("watch = []\n");
    let cfg = load_and_validate(&path).unwrap();
    assert!(cfg.watch.is_empty());
}

#[test]
fn misspelled_task_name_fails_at_parse_time() {
    let (_dir, path) = write_config(
        r#"
[[watch]]
patterns = ["docs/img/*.png"]
tasks = ["createwebp"]
"#,
    );
    let err = load_or_builtin(&path).unwrap_err();
    assert!(matches!(err, SitepipeError::TomlError(_)), "got {err:?}");
}

#[test]
fn misspelled_key_is_rejected() {
    let (_dir, path) = write_config(
        r#"
[images]
webp_qualtiy = 70
"#,
    );
    let err = load_or_builtin(&path).unwrap_err();
    assert!(
        matches!(&err, SitepipeError::TomlError(e) if e.to_string().contains("webp_qualtiy")),
        "got {err:?}"
    );
}

#[test]
fn binding_the_server_to_a_watch_is_rejected() {
    let (_dir, path) = write_config(
        r#"
[[watch]]
patterns = ["docs/*.html"]
tasks = ["server"]
"#,
    );
    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, SitepipeError::ConfigError(msg) if msg.contains("server")));
}

#[test]
fn invalid_glob_reports_the_pattern() {
    let (_dir, path) = write_config("[copy]\ninclude = [\"fonts/{woff\"]\n");
    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, SitepipeError::Glob { pattern, .. } if pattern == "fonts/{woff"));
}

#[test]
fn out_of_range_quality_is_rejected() {
    let raw = ConfigFileBuilder::new().webp_quality(101).raw();
    let err = sitepipe::config::ConfigFile::try_from(raw).unwrap_err();
    assert!(err.to_string().contains("webp_quality"));
}

#[test]
fn build_dir_may_not_contain_sources() {
    let (_dir, path) = write_config("[paths]\nsource = \"build/src\"\nbuild = \"build\"\n");
    assert!(matches!(
        load_and_validate(&path),
        Err(SitepipeError::ConfigError(_))
    ));
}

#[test]
fn use_hash_lives_in_config_section() {
    let (_dir, path) = write_config("[config]\nuse_hash = false\n");
    assert!(!load_and_validate(&path).unwrap().config.use_hash);

    let (_dir, path) = write_config(
        r#"
[[watch]]
patterns = ["docs/*.html"]
tasks = ["html"]
use_hash = false
"#,
    );
    assert!(matches!(load_and_validate(&path), Err(SitepipeError::TomlError(_))));
}
