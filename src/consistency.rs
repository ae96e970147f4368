//! Post-generation consistency checks.
//!
//! Every check reads a [`Snapshot`] of the output tree and compares it against the
//! [`BuildConfig`] it was produced from. A snapshot can come from an in-memory plan or
//! from a directory on disk, so the same rules cover dry runs and finished projects.

use log::debug;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

use crate::config::{BuildConfig, FeatureName};
use crate::constants::{LOCK_FILE, SECRETS_BASELINE};
use crate::error::{Error, Result};
use crate::materializer::GeneratedFile;
use crate::registry::{normalized_name, DependencyPlan};

/// Directories produced by tools, never by generation.
const SKIPPED_DIRS: &[&str] =
    &[".git", ".venv", "__pycache__", ".mypy_cache", ".pytest_cache", ".ruff_cache"];

/// Files that exist on disk but are not listed in the README tree.
const UNLISTED_FILES: &[&str] = &[SECRETS_BASELINE];

/// Text content of an output tree keyed by relative path.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    files: BTreeMap<PathBuf, String>,
}

impl Snapshot {
    pub fn from_plan(files: &[GeneratedFile]) -> Self {
        Self {
            files: files
                .iter()
                .map(|f| (f.relative_path.clone(), f.content.clone()))
                .collect(),
        }
    }

    /// Reads every UTF-8 file under `root`, skipping tool caches and environments.
    pub fn from_disk(root: &Path) -> Result<Self> {
        let mut files = BTreeMap::new();
        let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && SKIPPED_DIRS.iter().any(|d| entry.file_name() == *d))
        });
        for entry in walker {
            let entry = entry.map_err(|e| Error::IoError(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path()).to_path_buf();
            match fs::read_to_string(entry.path()) {
                Ok(content) => {
                    files.insert(relative, content);
                }
                Err(e) => debug!("Skipping unreadable file {}: {}", relative.display(), e),
            }
        }
        Ok(Self { files })
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(Path::new(path)).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(Path::new(path))
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    fn iter(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.files.iter().map(|(p, c)| (p.as_path(), c.as_str()))
    }
}

fn unresolved_slot_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)(?:^|[^$])\{\{-?\s*[A-Za-z_][\w.]*\s*-?\}\}|\{(?:project_name|project_name_capitalized|runtime_version|license|author|year)\}",
        )
        .expect("slot pattern is valid")
    })
}

fn first_party_import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^from (\w+)\.(?:main|app|pipeline) import").expect("import pattern is valid")
    })
}

/// Package name without version specifier, extras or markers, in normalized form.
pub fn requirement_name(requirement: &str) -> String {
    requirement
        .split(|c: char| "<>=!~[;@ ".contains(c))
        .next()
        .map(|name| normalized_name(name.trim()))
        .unwrap_or_default()
}

/// Runs every check and collects the problems found.
pub fn find_problems(config: &BuildConfig, snapshot: &Snapshot) -> Vec<String> {
    let mut problems = Vec::new();
    check_slots(snapshot, &mut problems);
    check_manifest(config, snapshot, &mut problems);
    check_identifier_references(config, snapshot, &mut problems);
    check_artifacts(config, snapshot, &mut problems);
    check_ci_matrix(config, snapshot, &mut problems);
    check_readme_tree(snapshot, &mut problems);
    check_readme_commands(snapshot, &mut problems);
    problems
}

/// Fails with [`Error::Inconsistent`] when any check reports a problem.
pub fn verify(config: &BuildConfig, snapshot: &Snapshot) -> Result<()> {
    let problems = find_problems(config, snapshot);
    if problems.is_empty() {
        debug!("Consistency check passed for {} files", snapshot.files.len());
        Ok(())
    } else {
        Err(Error::Inconsistent(problems))
    }
}

fn check_slots(snapshot: &Snapshot, problems: &mut Vec<String>) {
    for (path, content) in snapshot.iter() {
        if let Some(m) = unresolved_slot_re().find(content) {
            problems.push(format!(
                "{}: unresolved placeholder '{}'",
                path.display(),
                m.as_str().trim_start_matches(|c| c != '{')
            ));
        }
    }
}

fn toml_strings(value: Option<&toml::Value>) -> Vec<String> {
    value
        .and_then(toml::Value::as_array)
        .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

fn check_manifest(config: &BuildConfig, snapshot: &Snapshot, problems: &mut Vec<String>) {
    let Some(raw) = snapshot.get("pyproject.toml") else {
        problems.push("pyproject.toml is missing".to_string());
        return;
    };
    let manifest: toml::Table = match toml::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            problems.push(format!("pyproject.toml does not parse: {e}"));
            return;
        }
    };
    let id = config.project_name.as_str();

    let name = manifest.get("project").and_then(|p| p.get("name")).and_then(|n| n.as_str());
    if name != Some(id) {
        problems.push(format!("pyproject.toml: project name {name:?} is not '{id}'"));
    }

    let packages = toml_strings(
        manifest
            .get("tool")
            .and_then(|t| t.get("hatch"))
            .and_then(|h| h.get("build"))
            .and_then(|b| b.get("targets"))
            .and_then(|t| t.get("wheel"))
            .and_then(|w| w.get("packages")),
    );
    let expected_package = format!("src/{id}");
    if packages != [expected_package.clone()] {
        problems.push(format!("pyproject.toml: wheel packages {packages:?}, expected [\"{expected_package}\"]"));
    }

    let requires = manifest
        .get("project")
        .and_then(|p| p.get("requires-python"))
        .and_then(|r| r.as_str());
    let expected_requires = format!(">={}", config.runtime_version);
    if requires != Some(expected_requires.as_str()) {
        problems.push(format!("pyproject.toml: requires-python {requires:?}, expected '{expected_requires}'"));
    }

    let plan = DependencyPlan::for_config(config);
    let declared_runtime: BTreeSet<String> =
        toml_strings(manifest.get("project").and_then(|p| p.get("dependencies")))
            .iter()
            .map(|r| requirement_name(r))
            .collect();
    let declared_dev: BTreeSet<String> = toml_strings(
        manifest.get("dependency-groups").and_then(|g| g.get("dev")),
    )
    .iter()
    .map(|r| requirement_name(r))
    .collect();
    let expected_runtime: BTreeSet<String> =
        plan.runtime.iter().map(|p| requirement_name(p.0)).collect();
    let expected_dev: BTreeSet<String> = plan.dev.iter().map(|p| requirement_name(p.0)).collect();
    if declared_runtime != expected_runtime {
        problems.push(format!(
            "pyproject.toml: runtime dependencies {declared_runtime:?}, expected {expected_runtime:?}"
        ));
    }
    if declared_dev != expected_dev {
        problems.push(format!("pyproject.toml: dev dependencies {declared_dev:?}, expected {expected_dev:?}"));
    }
    let overlap: Vec<&String> = declared_runtime.intersection(&declared_dev).collect();
    if !overlap.is_empty() {
        problems.push(format!("pyproject.toml: {overlap:?} declared in both groups"));
    }

    let asyncio_modes = raw.lines().filter(|l| l.trim_start().starts_with("asyncio_mode")).count();
    if asyncio_modes > 1 {
        problems.push(format!("pyproject.toml: asyncio_mode declared {asyncio_modes} times"));
    }
}

fn check_identifier_references(config: &BuildConfig, snapshot: &Snapshot, problems: &mut Vec<String>) {
    let id = config.project_name.as_str();

    match snapshot.get("README.md").and_then(|r| r.lines().next()) {
        Some(title) if title == format!("# {id}") => {}
        title => problems.push(format!("README.md: title {title:?} does not name '{id}'")),
    }

    match snapshot.get(".python-version").map(str::trim) {
        Some(v) if v == config.runtime_version => {}
        v => problems.push(format!(
            ".python-version: {v:?}, expected '{}'",
            config.runtime_version
        )),
    }

    for path in snapshot.paths() {
        let Ok(rest) = path.strip_prefix("src") else {
            continue;
        };
        let mut parts = rest.components();
        if let (Some(package), Some(_)) = (parts.next(), parts.next()) {
            if package.as_os_str() != id {
                problems.push(format!("{}: outside package 'src/{id}'", path.display()));
            }
        }
    }

    for (path, content) in snapshot.iter().filter(|(p, _)| p.starts_with("tests")) {
        for cap in first_party_import_re().captures_iter(content) {
            if &cap[1] != id {
                problems.push(format!("{}: imports '{}' instead of '{id}'", path.display(), &cap[1]));
            }
        }
    }

    if let Some(raw) = snapshot.get("docker-compose.yml") {
        match serde_yaml::from_str::<serde_yaml::Value>(raw) {
            Ok(compose) => {
                let db = compose["services"]["db"]["environment"]["POSTGRES_DB"].as_str();
                if db != Some(id) {
                    problems.push(format!("docker-compose.yml: POSTGRES_DB {db:?} is not '{id}'"));
                }
            }
            Err(e) => problems.push(format!("docker-compose.yml does not parse: {e}")),
        }
    }
}

fn check_artifacts(config: &BuildConfig, snapshot: &Snapshot, problems: &mut Vec<String>) {
    let gated: [(&str, bool, &[&str]); 7] = [
        (
            "vscode",
            config.feature(FeatureName::Vscode),
            &[".vscode/settings.json", ".vscode/extensions.json"],
        ),
        ("docker", config.feature(FeatureName::Docker), &["Dockerfile", ".dockerignore"]),
        ("docker_compose", config.compose_enabled(), &["docker-compose.yml"]),
        ("makefile", config.feature(FeatureName::Makefile), &["Makefile"]),
        ("changelog", config.feature(FeatureName::Changelog), &["CHANGELOG.md"]),
        ("dependabot", config.feature(FeatureName::Dependabot), &[".github/dependabot.yml"]),
        ("license", !config.license.is_none(), &["LICENSE"]),
    ];
    for (name, enabled, paths) in gated {
        for path in paths {
            match (enabled, snapshot.contains(path)) {
                (true, false) => problems.push(format!("{path} is missing although {name} is on")),
                (false, true) => problems.push(format!("{path} is present although {name} is off")),
                _ => {}
            }
        }
    }

    let security = config.feature(FeatureName::Security);
    let scanned = snapshot
        .get(".pre-commit-config.yaml")
        .is_some_and(|c| c.contains("detect-secrets"));
    if security != scanned {
        problems.push(format!(
            ".pre-commit-config.yaml: secret scanning hook {} although security is {}",
            if scanned { "present" } else { "absent" },
            if security { "on" } else { "off" }
        ));
    }
    let bandit = snapshot.get("pyproject.toml").is_some_and(|c| c.contains("[tool.bandit]"));
    if security != bandit {
        problems.push(format!(
            "pyproject.toml: [tool.bandit] {} although security is {}",
            if bandit { "present" } else { "absent" },
            if security { "on" } else { "off" }
        ));
    }
}

fn check_ci_matrix(config: &BuildConfig, snapshot: &Snapshot, problems: &mut Vec<String>) {
    let Some(raw) = snapshot.get(".github/workflows/ci.yml") else {
        problems.push(".github/workflows/ci.yml is missing".to_string());
        return;
    };
    let workflow: serde_yaml::Value = match serde_yaml::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            problems.push(format!("ci.yml does not parse: {e}"));
            return;
        }
    };
    let matrix: Vec<&str> = workflow["jobs"]["ci"]["strategy"]["matrix"]["python-version"]
        .as_sequence()
        .map(|seq| seq.iter().filter_map(serde_yaml::Value::as_str).collect())
        .unwrap_or_default();
    let expected = config.ci_versions();
    if matrix != expected {
        problems.push(format!("ci.yml: python matrix {matrix:?}, expected {expected:?}"));
    }
}

/// File paths drawn in the README's `text` block.
pub fn readme_tree_paths(readme: &str) -> BTreeSet<PathBuf> {
    let mut paths = BTreeSet::new();
    let mut dirs: Vec<String> = Vec::new();
    let block = readme
        .split("```text\n")
        .nth(1)
        .and_then(|rest| rest.split("\n```").next())
        .unwrap_or_default();
    for line in block.lines() {
        let Some(idx) = line.find("── ") else {
            continue;
        };
        let depth = line[..idx].chars().count().saturating_sub(1) / 4;
        let name = &line[idx + "── ".len()..];
        dirs.truncate(depth);
        match name.strip_suffix('/') {
            Some(dir) => dirs.push(dir.to_string()),
            None => {
                let mut path: PathBuf = dirs.iter().collect();
                path.push(name);
                paths.insert(path);
            }
        }
    }
    paths
}

fn check_readme_tree(snapshot: &Snapshot, problems: &mut Vec<String>) {
    let Some(readme) = snapshot.get("README.md") else {
        problems.push("README.md is missing".to_string());
        return;
    };
    let listed = readme_tree_paths(readme);
    let mut actual: BTreeSet<PathBuf> = snapshot
        .paths()
        .filter(|p| !UNLISTED_FILES.iter().any(|u| *p == Path::new(u)))
        .map(Path::to_path_buf)
        .collect();
    actual.insert(PathBuf::from(LOCK_FILE));

    for missing in actual.difference(&listed) {
        problems.push(format!("README.md: tree does not list '{}'", missing.display()));
    }
    for extra in listed.difference(&actual) {
        problems.push(format!("README.md: tree lists '{}' which is not generated", extra.display()));
    }
}

/// Target name to recipe lines.
pub fn makefile_targets(makefile: &str) -> BTreeMap<String, Vec<String>> {
    let mut targets: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut current: Option<String> = None;
    for line in makefile.lines() {
        if let Some(recipe) = line.strip_prefix('\t') {
            if let Some(target) = &current {
                targets.entry(target.clone()).or_default().push(recipe.trim().to_string());
            }
        } else if let Some((target, _)) = line.split_once(':') {
            if !target.starts_with('.') && !target.contains(char::is_whitespace) && !target.is_empty() {
                targets.entry(target.to_string()).or_default();
                current = Some(target.to_string());
                continue;
            }
            current = None;
        } else if line.trim().is_empty() {
            current = None;
        }
    }
    targets
}

fn check_readme_commands(snapshot: &Snapshot, problems: &mut Vec<String>) {
    let Some(readme) = snapshot.get("README.md") else {
        return;
    };
    let targets = snapshot.get("Makefile").map(makefile_targets);
    let mut last_target: Option<&str> = None;
    for line in readme.lines() {
        if let Some(target) = line.strip_prefix("make ") {
            match &targets {
                Some(targets) if targets.contains_key(target) => {}
                Some(_) => problems.push(format!("README.md: 'make {target}' has no Makefile target")),
                None => problems.push(format!("README.md: 'make {target}' without a Makefile")),
            }
            last_target = Some(target);
        } else if let Some(command) = line.strip_prefix("# or: ") {
            let recipe = last_target.and_then(|t| targets.as_ref().and_then(|m| m.get(t)));
            if !recipe.is_some_and(|lines| lines.iter().any(|l| l == command)) {
                problems.push(format!(
                    "README.md: '{command}' does not match the recipe of 'make {}'",
                    last_target.unwrap_or("?")
                ));
            }
        }
    }
}
