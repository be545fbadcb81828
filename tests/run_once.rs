// tests/run_once.rs
//
// Drives the public `run` entry point in `--once` / `--dry-run` mode.
#![cfg(unix)]

use std::path::PathBuf;

use jinja2config::cli::CliArgs;
use jinja2config::run;
use jinja2config_test_utils::{init_tracing, ShTools, TemplateTree};

fn settings_file(tree: &TemplateTree, tools: &ShTools, renderer: &str) -> PathBuf {
    tree.write(
        "tools/settings.toml",
        &format!(
            r#"
[renderer]
program = "sh"
args = ["{renderer}", "{{template}}", "{{context}}"]

[formatter]
program = "sh"
args = ["{formatter}", "{{file}}"]

[entities]
enabled = false
"#,
            renderer = tools.script(renderer),
            formatter = tools.script("format.sh"),
        ),
    )
}

fn args(tree: &TemplateTree, settings: PathBuf) -> CliArgs {
    CliArgs {
        root: tree.path("site"),
        settings: Some(settings),
        once: true,
        log_level: None,
        dry_run: false,
    }
}

#[tokio::test]
async fn once_builds_every_template_and_exits() {
    init_tracing();
    let tree = TemplateTree::new();
    let tools = ShTools::new();
    tree.write("site/jinja2config.yaml", "skip_files:\n  - draft.yaml.jinja\n");
    tree.write("site/a.yaml.jinja", "a: 1\n");
    tree.write("site/packages/b.yaml.jinja", "b: 2\n");
    tree.write("site/draft.yaml.jinja", "wip\n");
    let settings = settings_file(&tree, &tools, "render.sh");

    run(args(&tree, settings)).await.unwrap();

    assert!(tree.exists("site/a.yaml"));
    assert!(tree.exists("site/packages/b.yaml"));
    assert!(!tree.exists("site/draft.yaml"));
}

#[tokio::test]
async fn once_fails_when_a_template_fails() {
    let tree = TemplateTree::new();
    let tools = ShTools::new();
    tree.write("site/a.yaml.jinja", "a: 1\n");
    tree.write("site/b.yaml.jinja", "FAIL\n");
    let settings = settings_file(&tree, &tools, "render.sh");

    let err = run(args(&tree, settings)).await.unwrap_err();

    assert!(err.to_string().contains("1 template(s) failed"));
    assert!(tree.exists("site/a.yaml"));
    assert!(tree.exists("site/b.yaml.jinja.errors.log"));
}

#[tokio::test]
async fn dry_run_writes_nothing() {
    let tree = TemplateTree::new();
    let tools = ShTools::new();
    tree.write("site/a.yaml.jinja", "a: 1\n");
    let settings = settings_file(&tree, &tools, "render.sh");

    let mut cli = args(&tree, settings);
    cli.dry_run = true;
    run(cli).await.unwrap();

    assert_eq!(tree.list("site"), vec!["a.yaml.jinja"]);
}

#[tokio::test]
async fn missing_renderer_is_fatal() {
    let tree = TemplateTree::new();
    tree.write("site/a.yaml.jinja", "a: 1\n");
    let settings = tree.write(
        "tools/settings.toml",
        "[renderer]\nprogram = \"no-such-renderer-xyz\"\n\n[entities]\nenabled = false\n",
    );

    let err = run(args(&tree, settings)).await.unwrap_err();

    assert!(err.to_string().contains("no-such-renderer-xyz"));
    assert!(!tree.exists("site/a.yaml"));
}

#[tokio::test]
async fn missing_root_is_fatal() {
    let tree = TemplateTree::new();
    let tools = ShTools::new();
    let settings = settings_file(&tree, &tools, "render.sh");

    let err = run(args(&tree, settings)).await.unwrap_err();
    assert!(err.to_string().contains("not accessible"));
}
