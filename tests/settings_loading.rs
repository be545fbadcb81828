// tests/settings_loading.rs

use std::path::Path;
use std::time::Duration;

use jinja2config::config::{load_and_validate, load_from_path, load_or_default};
use jinja2config::errors::Jinja2ConfigError;
use jinja2config_test_utils::TemplateTree;

#[test]
fn full_settings_file_round_trips_into_accessors() {
    let dir = TemplateTree::new();
    let path = dir.write(
        "jinja2config.toml",
        r#"
[renderer]
program = "jinja2"
args = ["--format=json", "{template}", "{context}"]

[formatter]
program = "prettier"
args = ["--write", "{file}"]
strict = true

[watch]
template_suffix = ".yml.j2"
template_extension = ".j2"
debounce_secs = 2
poll_interval_ms = 250

[entities]
enabled = false

[process]
timeout_secs = 30
"#,
    );

    let settings = load_and_validate(&path).unwrap();

    assert_eq!(settings.renderer().program, "jinja2");
    assert!(settings.formatter().strict);
    assert_eq!(settings.template_suffix(), ".yml.j2");
    assert_eq!(settings.template_extension(), ".j2");
    assert_eq!(settings.debounce(), Duration::from_secs(2));
    assert_eq!(settings.poll_interval(), Duration::from_millis(250));
    assert_eq!(settings.process_timeout(), Some(Duration::from_secs(30)));
    assert!(!settings.entities().enabled);
}

#[test]
fn partial_file_keeps_defaults_for_missing_sections() {
    let dir = TemplateTree::new();
    let path = dir.write("s.toml", "[watch]\ndebounce_secs = 9\n");

    let settings = load_and_validate(&path).unwrap();

    assert_eq!(settings.debounce(), Duration::from_secs(9));
    assert_eq!(settings.template_suffix(), ".yaml.jinja");
    assert_eq!(settings.renderer().program, "jinja");
    assert_eq!(settings.formatter().program, "prettier");
    assert_eq!(settings.process_timeout(), None);
}

#[test]
fn no_settings_path_means_defaults() {
    let settings = load_or_default(None).unwrap();
    assert_eq!(settings.debounce(), Duration::from_secs(5));
    assert_eq!(settings.poll_interval(), Duration::from_millis(1000));
    assert!(!settings.formatter().strict);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_or_default(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
    assert!(matches!(err, Jinja2ConfigError::IoError(_)));
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let dir = TemplateTree::new();
    let path = dir.write("bad.toml", "[watch\ndebounce_secs = ");
    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, Jinja2ConfigError::TomlError(_)));
}

#[test]
fn invalid_values_fail_validation() {
    let dir = TemplateTree::new();
    let cases = [
        "[watch]\ndebounce_secs = 0\n",
        "[watch]\ntemplate_extension = \".txt\"\n",
        "[renderer]\nargs = [\"{context}\"]\n",
        "[formatter]\nargs = [\"--write\"]\n",
        "[process]\ntimeout_secs = 0\n",
        "[entities]\nenabled = true\nbase_url = \"\"\n",
    ];

    for (i, body) in cases.iter().enumerate() {
        let path = dir.write(&format!("case{i}.toml"), body);
        let err = load_and_validate(&path).unwrap_err();
        assert!(
            matches!(err, Jinja2ConfigError::ConfigError(_)),
            "case {i} should fail validation: {body}"
        );
    }
}
