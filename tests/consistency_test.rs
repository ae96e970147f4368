mod common;

use std::fs;

use common::{all_flags, build_config, plan};
use pyseed::config::FeatureName;
use pyseed::consistency::{find_problems, verify, Snapshot};
use pyseed::error::Error;
use pyseed::materializer::{materialize, GeneratedFile};
use pyseed::renderer::MiniJinjaRenderer;
use tempfile::TempDir;

fn replace(files: &mut [GeneratedFile], path: &str, from: &str, to: &str) {
    let file = files
        .iter_mut()
        .find(|f| f.relative_path.to_str() == Some(path))
        .unwrap();
    assert!(file.content.contains(from), "{path} does not contain {from:?}");
    file.content = file.content.replace(from, to);
}

const ARTIFACT_FLAGS: [FeatureName; 8] = [
    FeatureName::Vscode,
    FeatureName::Docker,
    FeatureName::DockerCompose,
    FeatureName::Makefile,
    FeatureName::Changelog,
    FeatureName::Security,
    FeatureName::Dependabot,
    FeatureName::Github,
];

#[test]
fn test_every_type_and_flag_combination_is_consistent() {
    let temp_dir = TempDir::new().unwrap();
    for project_type in ["library", "api", "cli", "data", "tui"] {
        for mask in 0u32..(1 << ARTIFACT_FLAGS.len()) {
            let flags: Vec<(FeatureName, bool)> = ARTIFACT_FLAGS
                .iter()
                .enumerate()
                .map(|(bit, name)| (*name, mask & (1 << bit) != 0))
                .collect();
            let config = build_config("my-project", temp_dir.path(), project_type, &flags);
            let problems = find_problems(&config, &Snapshot::from_plan(&plan(&config)));
            assert!(problems.is_empty(), "{project_type}/{flags:?}: {problems:#?}");
        }
    }
}

#[test]
fn test_every_name_form_is_consistent() {
    let temp_dir = TempDir::new().unwrap();
    for project_type in ["library", "api", "cli", "data", "tui"] {
        for name in ["my-project", "Mixed.Case-Name", "_under"] {
            for flags in [vec![], all_flags(false)] {
                let config = build_config(name, temp_dir.path(), project_type, &flags);
                let problems = find_problems(&config, &Snapshot::from_plan(&plan(&config)));
                assert!(problems.is_empty(), "{project_type}/{name}: {problems:#?}");
            }
        }
    }
}

#[test]
fn test_identifier_is_the_same_everywhere() {
    let temp_dir = TempDir::new().unwrap();
    let config = build_config("my-api.v2", temp_dir.path(), "api", &[]);
    let files = plan(&config);
    for file in &files {
        assert!(!file.content.contains("my-api.v2"), "{} leaks the raw name", file.relative_path.display());
        // GitHub expressions are the only double braces allowed
        assert!(!file.content.replace("${{", "").contains("{{"), "{}", file.relative_path.display());
    }
    for path in ["pyproject.toml", "README.md", "docker-compose.yml", "tests/test_api.py", "Makefile"] {
        let file = files.iter().find(|f| f.relative_path.to_str() == Some(path)).unwrap();
        assert!(file.content.contains("my_api_v2"), "{path}");
    }
}

#[test]
fn test_readme_title_drift_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config = build_config("drift", temp_dir.path(), "library", &[]);
    let mut files = plan(&config);
    replace(&mut files, "README.md", "# drift\n", "# drifted\n");

    let problems = find_problems(&config, &Snapshot::from_plan(&files));
    assert!(problems.iter().any(|p| p.starts_with("README.md: title")), "{problems:?}");
}

#[test]
fn test_unresolved_placeholder_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config = build_config("slots", temp_dir.path(), "cli", &[]);
    let mut files = plan(&config);
    replace(&mut files, "src/slots/main.py", "import typer", "import {project_name}");

    match verify(&config, &Snapshot::from_plan(&files)) {
        Err(Error::Inconsistent(problems)) => {
            assert!(problems.iter().any(|p| p.contains("unresolved placeholder '{project_name}'")));
        }
        other => panic!("Expected Inconsistent, got {other:?}"),
    }
}

#[test]
fn test_missing_flagged_artifact_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config = build_config("gated", temp_dir.path(), "library", &[]);
    let files: Vec<GeneratedFile> =
        plan(&config).into_iter().filter(|f| !f.relative_path.ends_with("Dockerfile")).collect();

    let problems = find_problems(&config, &Snapshot::from_plan(&files));
    assert!(problems.contains(&"Dockerfile is missing although docker is on".to_string()));
    assert!(problems.iter().any(|p| p.contains("tree lists 'Dockerfile'")));
}

#[test]
fn test_wrong_import_in_tests_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config = build_config("pipes", temp_dir.path(), "data", &[]);
    let mut files = plan(&config);
    replace(&mut files, "tests/test_pipeline.py", "from pipes.pipeline", "from pipeline_pkg.pipeline");

    let problems = find_problems(&config, &Snapshot::from_plan(&files));
    assert!(problems.iter().any(|p| p.contains("imports 'pipeline_pkg'")), "{problems:?}");
}

#[test]
fn test_makefile_and_readme_commands_must_agree() {
    let temp_dir = TempDir::new().unwrap();
    let config = build_config("runner", temp_dir.path(), "cli", &[]);
    let mut files = plan(&config);
    replace(&mut files, "Makefile", "uv run python -m runner.main", "python -m runner");

    let problems = find_problems(&config, &Snapshot::from_plan(&files));
    assert!(problems.iter().any(|p| p.contains("does not match the recipe of 'make run'")), "{problems:?}");
}

#[test]
fn test_dependency_drift_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config = build_config("deps", temp_dir.path(), "api", &[]);
    let mut files = plan(&config);
    replace(&mut files, "pyproject.toml", "    \"structlog\",\n", "");

    let problems = find_problems(&config, &Snapshot::from_plan(&files));
    assert!(problems.iter().any(|p| p.contains("runtime dependencies")), "{problems:?}");
}

#[test]
fn test_ci_matrix_drift_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config = build_config("matrix", temp_dir.path(), "library", &[]);
    let mut files = plan(&config);
    replace(&mut files, ".github/workflows/ci.yml", "[\"3.11\", \"3.12\", \"3.13\"]", "[\"3.12\", \"3.13\"]");

    let problems = find_problems(&config, &Snapshot::from_plan(&files));
    assert!(problems.iter().any(|p| p.starts_with("ci.yml: python matrix")), "{problems:?}");
}

#[test]
fn test_missing_ci_workflow_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config = build_config("noci", temp_dir.path(), "cli", &[(FeatureName::Github, false)]);
    let mut files = plan(&config);
    files.retain(|f| f.relative_path.to_str() != Some(".github/workflows/ci.yml"));

    let problems = find_problems(&config, &Snapshot::from_plan(&files));
    assert!(problems.contains(&".github/workflows/ci.yml is missing".to_string()), "{problems:?}");
}

#[test]
fn test_tree_on_disk_is_consistent() {
    let temp_dir = TempDir::new().unwrap();
    let renderer = MiniJinjaRenderer::new().unwrap();
    let config = build_config("on-disk", temp_dir.path(), "tui", &[]);
    let target = config.target_directory.clone();
    materialize(&renderer, &config, &target).unwrap();
    fs::write(target.join("uv.lock"), "version = 1\n").unwrap();
    fs::write(target.join(".secrets.baseline"), "{}").unwrap();
    fs::create_dir_all(target.join(".venv/lib")).unwrap();
    fs::write(target.join(".venv/lib/site.py"), "").unwrap();

    let snapshot = Snapshot::from_disk(&target).unwrap();
    assert!(snapshot.contains("src/on_disk/app.py"));
    assert!(!snapshot.contains(".venv/lib/site.py"));
    verify(&config, &snapshot).unwrap();
}

#[test]
fn test_stray_file_on_disk_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let renderer = MiniJinjaRenderer::new().unwrap();
    let config = build_config("stray", temp_dir.path(), "library", &[]);
    let target = config.target_directory.clone();
    materialize(&renderer, &config, &target).unwrap();
    fs::write(target.join("uv.lock"), "version = 1\n").unwrap();
    fs::write(target.join("hello.py"), "print('hello')\n").unwrap();

    let problems = find_problems(&config, &Snapshot::from_disk(&target).unwrap());
    assert_eq!(problems, vec!["README.md: tree does not list 'hello.py'".to_string()]);
}
