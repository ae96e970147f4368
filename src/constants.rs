//! Common constants used throughout pyseed.

/// Python versions a generated project may target, oldest first.
pub const SUPPORTED_VERSIONS: [&str; 3] = ["3.11", "3.12", "3.13"];

/// Runtime version used when nothing else is given.
pub const DEFAULT_RUNTIME_VERSION: &str = "3.12";

/// Directory under `$HOME` where new repositories go by default.
pub const DEFAULT_LOCATION_DIR: &str = "Repos";

/// Author used when neither the caller nor git know one.
pub const FALLBACK_AUTHOR: &str = "Your Name";

/// Identifiers a project may not take, compared lower-cased.
/// Besides the test names this covers the namespaces of the dev tooling
/// that every generated project installs.
pub const RESERVED_NAMES: [&str; 11] = [
    "test",
    "tests",
    "test_repo",
    "ruff",
    "pytest",
    "pytest_cov",
    "mypy",
    "pre_commit",
    "pytest_asyncio",
    "bandit",
    "detect_secrets",
];

/// Files whose presence marks a directory as an existing project.
pub const MANIFEST_FILES: [&str; 3] = ["pyproject.toml", "setup.py", "setup.cfg"];

/// Stub files `uv init` drops into a fresh project.
pub const UV_STUB_FILES: [&str; 2] = ["hello.py", "main.py"];

/// The lock artifact produced by the dependency manager.
pub const LOCK_FILE: &str = "uv.lock";

/// Baseline written by the secret scan.
pub const SECRETS_BASELINE: &str = ".secrets.baseline";

/// Environment keys read by the configuration resolver.
pub mod env {
    pub const PROJECT_TYPE: &str = "PROJECT_TYPE";
    pub const PYTHON_VERSION: &str = "PYTHON_VERSION";
    pub const LICENSE: &str = "PROJECT_LICENSE";
    pub const AUTHOR: &str = "PROJECT_AUTHOR";
    pub const LOCATION: &str = "REPO_LOCATION";
}
