mod common;

use std::collections::BTreeSet;
use std::fs;

use common::{all_flags, build_config, content, paths, plan};
use pyseed::config::FeatureName;
use pyseed::error::Error;
use pyseed::materializer::{materialize, write_files, Phase};
use pyseed::renderer::MiniJinjaRenderer;
use tempfile::TempDir;

#[test]
fn test_api_project() {
    let temp_dir = TempDir::new().unwrap();
    let config = build_config("myapi", temp_dir.path(), "api", &[]);
    let files = plan(&config);

    let manifest = content(&files, "pyproject.toml");
    assert!(manifest.contains("name = \"myapi\""));
    assert!(manifest.contains("\"fastapi\","));
    assert!(manifest.contains("\"uvicorn\","));
    assert!(manifest.contains("[project.scripts]\nmyapi = \"myapi.main:app\""));

    let main = content(&files, "src/myapi/main.py");
    assert!(main.contains("@app.get(\"/health\")"));
    assert!(main.contains("return {\"status\": \"ok\"}"));

    let compose = content(&files, "docker-compose.yml");
    assert!(compose.contains("  db:\n    image: postgres:16-alpine"));
    assert!(compose.contains("POSTGRES_DB: myapi"));
    assert!(compose.contains("pg_isready"));
    assert!(compose.contains("- \"8000:8000\""));

    let dockerfile = content(&files, "Dockerfile");
    assert!(dockerfile.contains(
        "CMD [\"uvicorn\", \"myapi.main:app\", \"--host\", \"0.0.0.0\", \"--port\", \"8000\"]"
    ));
    assert!(content(&files, ".env.example").contains("PORT=8000\n"));
}

#[test]
fn test_minimal_library() {
    let temp_dir = TempDir::new().unwrap();
    let mut flags = all_flags(false);
    flags.retain(|(name, _)| *name != FeatureName::PrivateRepo);
    let mut partial = common::overrides("Minimal-Lib", temp_dir.path());
    partial.features = flags.into_iter().collect();
    partial.license = Some("None".to_string());
    let config =
        pyseed::config::resolve(&partial, &pyseed::config::EnvView::default()).unwrap();
    let files = plan(&config);

    assert_eq!(config.project_name.as_str(), "Minimal_Lib");
    let expected: BTreeSet<String> = [
        "pyproject.toml",
        ".python-version",
        ".gitignore",
        ".env.example",
        ".editorconfig",
        "src/Minimal_Lib/__init__.py",
        "src/Minimal_Lib/py.typed",
        "tests/__init__.py",
        "tests/test_placeholder.py",
        "README.md",
        ".pre-commit-config.yaml",
        ".github/workflows/ci.yml",
    ]
    .into_iter()
    .map(str::to_string)
    .collect();
    assert_eq!(paths(&files), expected);

    let manifest = content(&files, "pyproject.toml");
    assert!(!manifest.contains("[tool.bandit]"));
    assert!(!manifest.contains("license ="));
    assert!(!content(&files, ".pre-commit-config.yaml").contains("detect-secrets"));
    assert!(!content(&files, "README.md").contains("make "));
}

#[test]
fn test_disabled_docker_removes_both_files() {
    let temp_dir = TempDir::new().unwrap();
    let config = build_config("nodocker", temp_dir.path(), "api", &[(FeatureName::Docker, false)]);
    let planned = paths(&plan(&config));
    assert!(!planned.contains("Dockerfile"));
    assert!(!planned.contains(".dockerignore"));
    // compose is a separate flag
    assert!(planned.contains("docker-compose.yml"));
}

#[test]
fn test_each_flag_removes_its_artifacts() {
    let temp_dir = TempDir::new().unwrap();
    let cases: [(FeatureName, &[&str]); 5] = [
        (FeatureName::Vscode, &[".vscode/settings.json", ".vscode/extensions.json"]),
        (FeatureName::Makefile, &["Makefile"]),
        (FeatureName::Changelog, &["CHANGELOG.md"]),
        (FeatureName::Dependabot, &[".github/dependabot.yml"]),
        (FeatureName::DockerCompose, &["docker-compose.yml"]),
    ];
    for (flag, artifacts) in cases {
        let on = paths(&plan(&build_config("flagged", temp_dir.path(), "data", &[])));
        let off = paths(&plan(&build_config("flagged", temp_dir.path(), "data", &[(flag, false)])));
        for artifact in artifacts {
            assert!(on.contains(*artifact), "{artifact} missing with {flag} on");
            assert!(!off.contains(*artifact), "{artifact} present with {flag} off");
        }
    }
}

#[test]
fn test_ci_workflow_does_not_depend_on_hosting() {
    let temp_dir = TempDir::new().unwrap();
    let config = build_config("local", temp_dir.path(), "cli", &[(FeatureName::Github, false)]);
    let files = plan(&config);
    assert!(paths(&files).contains(".github/workflows/ci.yml"));
    assert!(content(&files, "README.md").contains("ci.yml"));
}

#[test]
fn test_compose_is_inert_for_tui() {
    let temp_dir = TempDir::new().unwrap();
    let config =
        build_config("my-tui", temp_dir.path(), "tui", &[(FeatureName::DockerCompose, true)]);
    let files = plan(&config);
    assert!(!paths(&files).contains("docker-compose.yml"));
    assert!(!content(&files, "README.md").contains("docker compose up"));
    assert!(content(&files, "Dockerfile").contains("# TUI apps typically not containerized"));
}

#[test]
fn test_tui_type_name_uses_capitalized_identifier() {
    let temp_dir = TempDir::new().unwrap();
    let config = build_config("my-tui", temp_dir.path(), "tui", &[]);
    let files = plan(&config);

    assert!(content(&files, "src/my_tui/app.py").contains("class My_tuiApp(App[None]):"));
    assert!(content(&files, "src/my_tui/app.py").contains("CSS_PATH = \"css/my_tui.tcss\""));
    assert!(content(&files, "tests/test_app.py").contains("from my_tui.app import My_tuiApp"));
    assert!(paths(&files).contains("src/my_tui/css/my_tui.tcss"));
}

#[test]
fn test_asyncio_mode_declared_once_for_every_type() {
    let temp_dir = TempDir::new().unwrap();
    for project_type in ["library", "api", "cli", "data", "tui"] {
        let files = plan(&build_config("asyncy", temp_dir.path(), project_type, &[]));
        let count = content(&files, "pyproject.toml").matches("asyncio_mode").count();
        assert_eq!(count, 1, "{project_type}");
    }
}

#[test]
fn test_readme_tree_and_commands() {
    let temp_dir = TempDir::new().unwrap();
    let config = build_config("myapi", temp_dir.path(), "api", &[]);
    let files = plan(&config);
    let readme = content(&files, "README.md");

    assert!(readme.starts_with("# myapi\n"));
    assert!(readme.contains("├── uv.lock") || readme.contains("└── uv.lock"));
    assert!(readme.contains("├── src/\n│   └── myapi/\n"));
    assert!(readme.contains("make run\n# or: uv run uvicorn myapi.main:app --reload"));
    assert!(readme.contains("docker compose up"));

    let makefile = content(&files, "Makefile");
    assert!(makefile.starts_with(
        ".PHONY: install test lint format typecheck ci clean run docker-build docker-run\n"
    ));
    assert!(makefile.contains("\nrun:\n\tuv run uvicorn myapi.main:app --reload\n"));
}

#[test]
fn test_ci_matrix_and_version_marker() {
    let temp_dir = TempDir::new().unwrap();
    let mut partial = common::overrides("versioned", temp_dir.path());
    partial.runtime_version = Some("3.12".to_string());
    let config =
        pyseed::config::resolve(&partial, &pyseed::config::EnvView::default()).unwrap();
    let files = plan(&config);

    let ci = content(&files, ".github/workflows/ci.yml");
    assert!(ci.contains("python-version: [\"3.11\", \"3.12\", \"3.13\"]"));
    assert!(ci.contains("${{ matrix.python-version }}"));
    assert_eq!(content(&files, ".python-version"), "3.12\n");
    assert!(content(&files, "pyproject.toml").contains("target-version = \"py312\""));
}

#[test]
fn test_license_text() {
    let temp_dir = TempDir::new().unwrap();
    let files = plan(&build_config("licensed", temp_dir.path(), "library", &[]));
    let license = content(&files, "LICENSE");
    assert!(license.starts_with("MIT License\n\nCopyright (c) 2024 Jane Doe\n"));
}

#[test]
fn test_phases_and_permissions() {
    let temp_dir = TempDir::new().unwrap();
    let files = plan(&build_config("phased", temp_dir.path(), "cli", &[]));
    for file in &files {
        assert!(!file.executable, "{}", file.relative_path.display());
        let expected = if file.relative_path.ends_with(".pre-commit-config.yaml") {
            Phase::PostInstall
        } else {
            Phase::Base
        };
        assert_eq!(file.phase, expected, "{}", file.relative_path.display());
    }
    assert_eq!(files.first().map(|f| f.relative_path.display().to_string()).as_deref(), Some("pyproject.toml"));
}

#[test]
fn test_vscode_files_are_json() {
    let temp_dir = TempDir::new().unwrap();
    let files = plan(&build_config("coded", temp_dir.path(), "library", &[]));
    let extensions: serde_json::Value =
        serde_json::from_str(content(&files, ".vscode/extensions.json")).unwrap();
    assert_eq!(extensions["recommendations"][0], "charliermarsh.ruff");
    let settings: serde_json::Value =
        serde_json::from_str(content(&files, ".vscode/settings.json")).unwrap();
    assert_eq!(settings["[python]"]["editor.defaultFormatter"], "charliermarsh.ruff");
}

#[test]
fn test_materialize_is_deterministic() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let renderer = MiniJinjaRenderer::new().unwrap();

    let config_a = build_config("same", first.path(), "data", &[]);
    let config_b = build_config("same", second.path(), "data", &[]);
    materialize(&renderer, &config_a, &config_a.target_directory).unwrap();
    materialize(&renderer, &config_b, &config_b.target_directory).unwrap();

    assert!(!dir_diff::is_different(&config_a.target_directory, &config_b.target_directory).unwrap());
    assert!(config_a.target_directory.join("src/same/pipeline.py").is_file());
}

#[test]
fn test_write_failure_is_reported_with_path() {
    let temp_dir = TempDir::new().unwrap();
    let config = build_config("blocked", temp_dir.path(), "library", &[]);
    let files = plan(&config);

    // A file where the package directory should go.
    let target = temp_dir.path().join("blocked");
    fs::create_dir_all(target.join("src")).unwrap();
    fs::write(target.join("src/blocked"), "").unwrap();

    match write_files(&target, &files) {
        Err(Error::WriteError { path, .. }) => assert!(path.starts_with(target.join("src/blocked"))),
        other => panic!("Expected WriteError, got {other:?}"),
    }
    // Files before the failing one stay on disk.
    assert!(target.join("pyproject.toml").is_file());
}
