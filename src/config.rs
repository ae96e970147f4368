//! Configuration resolution for pyseed.
//! Merges per-invocation overrides, an explicit view of the environment and built-in
//! defaults into one immutable [`BuildConfig`]. Every later stage reads from that record
//! only; nothing downstream looks at the CLI or the process environment again.

use chrono::Datelike;
use indexmap::IndexMap;
use log::debug;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;

use crate::constants::{
    env, DEFAULT_LOCATION_DIR, DEFAULT_RUNTIME_VERSION, FALLBACK_AUTHOR, MANIFEST_FILES,
    SUPPORTED_VERSIONS,
};
use crate::error::ConfigError;
use crate::registry::lookup;
use crate::sanitize::{sanitize, substitute, Identifier};

/// Category of project to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Library,
    Api,
    Cli,
    Data,
    Tui,
}

impl ProjectType {
    pub const ALL: [ProjectType; 5] = [
        ProjectType::Library,
        ProjectType::Api,
        ProjectType::Cli,
        ProjectType::Data,
        ProjectType::Tui,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectType::Library => "library",
            ProjectType::Api => "api",
            ProjectType::Cli => "cli",
            ProjectType::Data => "data",
            ProjectType::Tui => "tui",
        }
    }

    /// Whether the registry defines a compose service for this type.
    pub fn supports_compose(self) -> bool {
        crate::registry::lookup(self).compose.is_some()
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProjectType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ConfigError::InvalidProjectType(s.to_string()))
    }
}

/// License to ship with the generated project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum License {
    #[serde(rename = "MIT")]
    Mit,
    #[serde(rename = "Apache-2.0")]
    Apache2,
    #[serde(rename = "GPL-3.0")]
    Gpl3,
    #[serde(rename = "BSD-3-Clause")]
    Bsd3,
    #[serde(rename = "Unlicense")]
    Unlicense,
    #[serde(rename = "None")]
    None,
}

impl License {
    pub const ALL: [License; 6] = [
        License::Mit,
        License::Apache2,
        License::Gpl3,
        License::Bsd3,
        License::Unlicense,
        License::None,
    ];

    /// SPDX identifier, or `"None"`.
    pub fn as_str(self) -> &'static str {
        match self {
            License::Mit => "MIT",
            License::Apache2 => "Apache-2.0",
            License::Gpl3 => "GPL-3.0",
            License::Bsd3 => "BSD-3-Clause",
            License::Unlicense => "Unlicense",
            License::None => "None",
        }
    }

    pub fn is_none(self) -> bool {
        self == License::None
    }
}

impl fmt::Display for License {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for License {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        License::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::InvalidLicense(s.to_string()))
    }
}

/// Independent toggles, one per optional artifact category or post-generation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureName {
    Vscode,
    Docker,
    DockerCompose,
    Makefile,
    Changelog,
    Security,
    Dependabot,
    Github,
    PrivateRepo,
    OpenEditor,
}

impl FeatureName {
    pub const ALL: [FeatureName; 10] = [
        FeatureName::Vscode,
        FeatureName::Docker,
        FeatureName::DockerCompose,
        FeatureName::Makefile,
        FeatureName::Changelog,
        FeatureName::Security,
        FeatureName::Dependabot,
        FeatureName::Github,
        FeatureName::PrivateRepo,
        FeatureName::OpenEditor,
    ];

    pub fn key(self) -> &'static str {
        match self {
            FeatureName::Vscode => "vscode",
            FeatureName::Docker => "docker",
            FeatureName::DockerCompose => "docker_compose",
            FeatureName::Makefile => "makefile",
            FeatureName::Changelog => "changelog",
            FeatureName::Security => "security",
            FeatureName::Dependabot => "dependabot",
            FeatureName::Github => "github",
            FeatureName::PrivateRepo => "private_repo",
            FeatureName::OpenEditor => "open_editor",
        }
    }

    /// Environment variable that overrides this flag.
    pub fn env_key(self) -> &'static str {
        match self {
            FeatureName::Vscode => "INCLUDE_VSCODE",
            FeatureName::Docker => "INCLUDE_DOCKER",
            FeatureName::DockerCompose => "INCLUDE_DOCKER_COMPOSE",
            FeatureName::Makefile => "INCLUDE_MAKEFILE",
            FeatureName::Changelog => "INCLUDE_CHANGELOG",
            FeatureName::Security => "INCLUDE_SECURITY",
            FeatureName::Dependabot => "INCLUDE_DEPENDABOT",
            FeatureName::Github => "INCLUDE_GITHUB",
            FeatureName::PrivateRepo => "PRIVATE_REPO",
            FeatureName::OpenEditor => "OPEN_EDITOR",
        }
    }

    /// Line shown in the "Features enabled" summary, `None` for flags that are not artifacts.
    pub fn summary(self) -> Option<&'static str> {
        match self {
            FeatureName::Vscode => Some("VS Code configuration"),
            FeatureName::Docker => Some("Dockerfile"),
            FeatureName::DockerCompose => Some("docker-compose.yml"),
            FeatureName::Makefile => Some("Makefile"),
            FeatureName::Changelog => Some("CHANGELOG.md"),
            FeatureName::Security => Some("Security scanning (bandit, detect-secrets)"),
            FeatureName::Dependabot => Some("Dependabot"),
            FeatureName::Github => Some("GitHub repository"),
            FeatureName::PrivateRepo | FeatureName::OpenEditor => None,
        }
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Resolved value of every [`FeatureName`], in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureFlags(IndexMap<FeatureName, bool>);

impl FeatureFlags {
    pub fn all(value: bool) -> Self {
        Self(FeatureName::ALL.into_iter().map(|name| (name, value)).collect())
    }

    pub fn get(&self, name: FeatureName) -> bool {
        self.0.get(&name).copied().unwrap_or(false)
    }

    pub fn with(mut self, name: FeatureName, value: bool) -> Self {
        self.0.insert(name, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureName, bool)> + '_ {
        self.0.iter().map(|(name, value)| (*name, *value))
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self::all(true)
    }
}

/// Per-invocation overrides. Every field is optional; unset fields fall through to the
/// environment and then to defaults.
#[derive(Debug, Clone, Default)]
pub struct PartialConfig {
    pub name: Option<String>,
    pub location: Option<PathBuf>,
    pub runtime_version: Option<String>,
    pub project_type: Option<String>,
    pub license: Option<String>,
    pub author: Option<String>,
    pub year: Option<i32>,
    pub features: IndexMap<FeatureName, bool>,
}

/// Read-only snapshot of the environment handed to [`resolve`].
#[derive(Debug, Clone, Default)]
pub struct EnvView {
    vars: HashMap<String, String>,
}

impl EnvView {
    /// Captures the process environment. This is the only place pyseed reads it.
    pub fn from_process() -> Self {
        Self { vars: std::env::vars().collect() }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self { vars: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }

    /// Value for `key`; empty values count as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }
}

/// The single source of truth for a run. Built once by [`resolve`], never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct BuildConfig {
    pub project_name: Identifier,
    pub raw_name: String,
    pub runtime_version: String,
    pub project_type: ProjectType,
    pub license: License,
    pub author: String,
    pub year: i32,
    pub features: FeatureFlags,
    pub location: PathBuf,
    pub target_directory: PathBuf,
}

impl BuildConfig {
    pub fn feature(&self, name: FeatureName) -> bool {
        self.features.get(name)
    }

    /// The compose flag only has an effect for project types that support it.
    pub fn compose_enabled(&self) -> bool {
        self.feature(FeatureName::DockerCompose) && self.project_type.supports_compose()
    }

    /// Ruff target, e.g. `py312`.
    pub fn python_target(&self) -> String {
        format!("py{}", self.runtime_version.replace('.', ""))
    }

    /// CI matrix: every supported version, independent of the pinned one.
    pub fn ci_versions(&self) -> Vec<&'static str> {
        SUPPORTED_VERSIONS.to_vec()
    }
}

fn pick<'a>(cli: Option<&'a str>, env: &'a EnvView, key: &str) -> Option<&'a str> {
    cli.or_else(|| env.get(key))
}

/// Parses the boolean spellings accepted in the environment.
pub fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlagValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn resolve_runtime_version(value: &str) -> Result<String, ConfigError> {
    if SUPPORTED_VERSIONS.contains(&value) {
        Ok(value.to_string())
    } else {
        Err(ConfigError::UnsupportedRuntimeVersion {
            value: value.to_string(),
            supported: SUPPORTED_VERSIONS.join(", "),
        })
    }
}

fn resolve_features(
    overrides: &IndexMap<FeatureName, bool>,
    env: &EnvView,
) -> Result<FeatureFlags, ConfigError> {
    let mut flags = FeatureFlags::default();
    for name in FeatureName::ALL {
        let value = match overrides.get(&name) {
            Some(value) => *value,
            None => match env.get(name.env_key()) {
                Some(raw) => parse_bool(name.env_key(), raw)?,
                None => continue,
            },
        };
        flags = flags.with(name, value);
    }
    Ok(flags)
}

/// Reads `user.name` from the global git configuration.
pub fn vcs_identity() -> Option<String> {
    let config = git2::Config::open_default().ok()?;
    config
        .get_string("user.name")
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Display name of the account `gh` is logged in to.
pub fn hosting_identity() -> Option<String> {
    which::which("gh").ok()?;
    let output = Command::new("gh")
        .args(["api", "user", "--jq", ".name"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    parse_account_name(&String::from_utf8_lossy(&output.stdout))
}

/// `gh api user --jq .name` prints `null` for accounts without a display name.
fn parse_account_name(stdout: &str) -> Option<String> {
    let name = stdout.trim();
    (!name.is_empty() && name != "null").then(|| name.to_string())
}

/// `$HOME/Repos`, or `Repos` relative to the working directory without a home.
pub fn default_location() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(DEFAULT_LOCATION_DIR),
        None => PathBuf::from(DEFAULT_LOCATION_DIR),
    }
}

/// Precondition on the target: missing or an empty directory.
pub fn check_target(path: &Path) -> Result<(), ConfigError> {
    if !path.exists() {
        return Ok(());
    }
    if !path.is_dir() {
        return Err(ConfigError::TargetNotDirectory(path.to_path_buf()));
    }
    if let Some(manifest) = MANIFEST_FILES.iter().find(|f| path.join(f).exists()) {
        debug!("Found existing manifest '{}' in {}", manifest, path.display());
        return Err(ConfigError::TargetNotEmpty(path.to_path_buf()));
    }
    // Unreadable directories count as occupied.
    let empty = fs::read_dir(path).map(|mut entries| entries.next().is_none()).unwrap_or(false);
    if !empty {
        return Err(ConfigError::TargetNotEmpty(path.to_path_buf()));
    }
    Ok(())
}

/// Merges overrides, environment and defaults into a validated [`BuildConfig`].
///
/// Precedence per field: explicit override, then environment, then default.
/// Nothing is written here; the target directory is only inspected.
pub fn resolve(overrides: &PartialConfig, env: &EnvView) -> Result<BuildConfig, ConfigError> {
    let raw_name = overrides.name.clone().ok_or(ConfigError::MissingProjectName)?;

    let project_type = match pick(overrides.project_type.as_deref(), env, env::PROJECT_TYPE) {
        Some(value) => value.parse()?,
        None => ProjectType::Library,
    };
    let runtime_version = resolve_runtime_version(
        pick(overrides.runtime_version.as_deref(), env, env::PYTHON_VERSION)
            .unwrap_or(DEFAULT_RUNTIME_VERSION),
    )?;
    let license = match pick(overrides.license.as_deref(), env, env::LICENSE) {
        Some(value) => value.parse()?,
        None => License::Mit,
    };
    let features = resolve_features(&overrides.features, env)?;

    // The name becomes exactly one directory under the location.
    let mut components = Path::new(&raw_name).components();
    if !matches!((components.next(), components.next()), (Some(Component::Normal(_)), None)) {
        return Err(ConfigError::InvalidName { sanitized: substitute(&raw_name), raw: raw_name });
    }
    let project_name = sanitize(&raw_name)?;
    // A package cannot depend on itself.
    if project_name.is_reserved() || lookup(project_type).installs(project_name.as_str()) {
        return Err(ConfigError::ReservedName(raw_name));
    }

    let location = match &overrides.location {
        Some(location) => location.clone(),
        None => env.get(env::LOCATION).map(PathBuf::from).unwrap_or_else(default_location),
    };
    let target_directory = location.join(&raw_name);
    check_target(&target_directory)?;

    let author = pick(overrides.author.as_deref(), env, env::AUTHOR)
        .map(str::to_string)
        .or_else(vcs_identity)
        .or_else(hosting_identity)
        .unwrap_or_else(|| FALLBACK_AUTHOR.to_string());
    let year = overrides.year.unwrap_or_else(|| chrono::Utc::now().year());

    let config = BuildConfig {
        project_name,
        raw_name,
        runtime_version,
        project_type,
        license,
        author,
        year,
        features,
        location,
        target_directory,
    };
    debug!("Resolved configuration: {:?}", config);
    Ok(config)
}
