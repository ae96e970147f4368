//! Static per-project-type template table.
//!
//! Every cross-cutting file (manifest, Makefile, Dockerfile, README, `.env.example`,
//! compose file) takes its per-type fragment from the [`TemplateSet`] returned by
//! [`lookup`]. Nothing else in the crate matches on [`ProjectType`] to decide content.
//!
//! String fragments may contain `{{ project_name }}` and the other render slots; the
//! materializer renders them with the same engine and context as whole files.

use indexmap::IndexSet;
use serde::Serialize;
use std::fmt;

use crate::config::{BuildConfig, FeatureName, ProjectType};

/// A package name handed verbatim to the dependency manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PackageRef(pub &'static str);

/// Normalized package name: lower-cased, with `_` and `.` folded into `-`.
pub fn normalized_name(name: &str) -> String {
    name.to_ascii_lowercase().replace(['_', '.'], "-")
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// An output file: rendered path pattern plus the name of its content template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTemplate {
    pub path: &'static str,
    pub template: &'static str,
}

/// A command exposed both as a Makefile target and in the README.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTemplate {
    pub target: &'static str,
    pub label: &'static str,
    pub command: &'static str,
    /// Flag that must be on for this command to be offered at all.
    pub requires: Option<FeatureName>,
}

/// How the container image starts the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DockerEntry {
    pub instruction: &'static str,
    pub argv: &'static [&'static str],
    pub note: Option<&'static str>,
}

/// Application service settings for the compose file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeService {
    pub ports: &'static [&'static str],
    pub volumes: &'static [&'static str],
    pub restart: Option<&'static str>,
}

/// Everything a project type contributes.
#[derive(Debug)]
pub struct TemplateSet {
    pub project_type: ProjectType,
    pub runtime_dependencies: &'static [PackageRef],
    pub dev_dependencies: &'static [PackageRef],
    pub starter_files: &'static [FileTemplate],
    pub env_vars: &'static [(&'static str, &'static str)],
    pub script: Option<&'static str>,
    pub run_command: Option<CommandTemplate>,
    pub dev_command: Option<CommandTemplate>,
    pub extra_commands: &'static [CommandTemplate],
    pub docker: DockerEntry,
    pub compose: Option<ComposeService>,
}

/// Development tooling every project gets.
pub const CORE_DEV_DEPENDENCIES: &[PackageRef] = &[
    PackageRef("ruff"),
    PackageRef("pytest"),
    PackageRef("pytest-cov"),
    PackageRef("mypy"),
    PackageRef("pre-commit"),
    PackageRef("pytest-asyncio"),
];

/// Added to the dev group when the `security` flag is on.
pub const SECURITY_DEV_DEPENDENCIES: &[PackageRef] =
    &[PackageRef("bandit"), PackageRef("detect-secrets")];

/// Files every project type gets regardless of flags.
pub const PACKAGE_SKELETON: &[FileTemplate] = &[
    FileTemplate { path: "src/{{ project_name }}/__init__.py", template: "empty" },
    FileTemplate { path: "src/{{ project_name }}/py.typed", template: "empty" },
    FileTemplate { path: "tests/__init__.py", template: "empty" },
];

static LIBRARY: TemplateSet = TemplateSet {
    project_type: ProjectType::Library,
    runtime_dependencies: &[],
    dev_dependencies: &[],
    starter_files: &[FileTemplate {
        path: "tests/test_placeholder.py",
        template: "library/test_placeholder.py",
    }],
    env_vars: &[],
    script: None,
    run_command: None,
    dev_command: None,
    extra_commands: &[],
    docker: DockerEntry {
        instruction: "CMD",
        argv: &["python", "-m", "{{ project_name }}"],
        note: None,
    },
    compose: None,
};

static API: TemplateSet = TemplateSet {
    project_type: ProjectType::Api,
    runtime_dependencies: &[
        PackageRef("fastapi"),
        PackageRef("uvicorn"),
        PackageRef("httpx"),
        PackageRef("pydantic"),
        PackageRef("pydantic-settings"),
        PackageRef("python-dotenv"),
        PackageRef("structlog"),
    ],
    dev_dependencies: &[PackageRef("httpx")],
    starter_files: &[
        FileTemplate { path: "src/{{ project_name }}/main.py", template: "api/main.py" },
        FileTemplate { path: "tests/test_api.py", template: "api/test_api.py" },
    ],
    env_vars: &[("HOST", "0.0.0.0"), ("PORT", "8000"), ("DATABASE_URL", "")],
    script: Some("{{ project_name }}.main:app"),
    run_command: Some(CommandTemplate {
        target: "run",
        label: "Run development server",
        command: "uv run uvicorn {{ project_name }}.main:app --reload",
        requires: None,
    }),
    dev_command: None,
    extra_commands: &[
        CommandTemplate {
            target: "docker-build",
            label: "Build the container image",
            command: "docker build -t {{ project_name }} .",
            requires: Some(FeatureName::Docker),
        },
        CommandTemplate {
            target: "docker-run",
            label: "Run the container",
            command: "docker run -p 8000:8000 {{ project_name }}",
            requires: Some(FeatureName::Docker),
        },
    ],
    docker: DockerEntry {
        instruction: "CMD",
        argv: &[
            "uvicorn",
            "{{ project_name }}.main:app",
            "--host",
            "0.0.0.0",
            "--port",
            "8000",
        ],
        note: None,
    },
    compose: Some(ComposeService {
        ports: &["8000:8000"],
        volumes: &["./src:/app/src:ro"],
        restart: Some("unless-stopped"),
    }),
};

static CLI: TemplateSet = TemplateSet {
    project_type: ProjectType::Cli,
    runtime_dependencies: &[PackageRef("typer"), PackageRef("rich"), PackageRef("python-dotenv")],
    dev_dependencies: &[],
    starter_files: &[
        FileTemplate { path: "src/{{ project_name }}/main.py", template: "cli/main.py" },
        FileTemplate { path: "tests/test_cli.py", template: "cli/test_cli.py" },
    ],
    env_vars: &[],
    script: Some("{{ project_name }}.main:app"),
    run_command: Some(CommandTemplate {
        target: "run",
        label: "Run CLI",
        command: "uv run python -m {{ project_name }}.main",
        requires: None,
    }),
    dev_command: None,
    extra_commands: &[],
    docker: DockerEntry {
        instruction: "ENTRYPOINT",
        argv: &["python", "-m", "{{ project_name }}.main"],
        note: None,
    },
    compose: None,
};

static DATA: TemplateSet = TemplateSet {
    project_type: ProjectType::Data,
    runtime_dependencies: &[
        PackageRef("polars"),
        PackageRef("pyarrow"),
        PackageRef("duckdb"),
        PackageRef("sqlalchemy"),
        PackageRef("httpx"),
        PackageRef("pydantic"),
        PackageRef("python-dotenv"),
        PackageRef("structlog"),
    ],
    dev_dependencies: &[PackageRef("faker")],
    starter_files: &[
        FileTemplate { path: "src/{{ project_name }}/pipeline.py", template: "data/pipeline.py" },
        FileTemplate { path: "tests/test_pipeline.py", template: "data/test_pipeline.py" },
    ],
    env_vars: &[("DATABASE_URL", ""), ("AWS_PROFILE", "")],
    script: None,
    run_command: None,
    dev_command: None,
    extra_commands: &[],
    docker: DockerEntry {
        instruction: "CMD",
        argv: &["python", "-m", "{{ project_name }}"],
        note: None,
    },
    compose: Some(ComposeService {
        ports: &[],
        volumes: &["./src:/app/src:ro", "./data:/app/data"],
        restart: None,
    }),
};

static TUI: TemplateSet = TemplateSet {
    project_type: ProjectType::Tui,
    runtime_dependencies: &[
        PackageRef("textual"),
        PackageRef("rich"),
        PackageRef("python-dotenv"),
    ],
    dev_dependencies: &[PackageRef("textual-dev")],
    starter_files: &[
        FileTemplate { path: "src/{{ project_name }}/app.py", template: "tui/app.py" },
        FileTemplate {
            path: "src/{{ project_name }}/css/{{ project_name }}.tcss",
            template: "tui/app.tcss",
        },
        FileTemplate { path: "tests/test_app.py", template: "tui/test_app.py" },
    ],
    env_vars: &[],
    script: None,
    run_command: Some(CommandTemplate {
        target: "run",
        label: "Run TUI app",
        command: "uv run python -m {{ project_name }}.app",
        requires: None,
    }),
    dev_command: Some(CommandTemplate {
        target: "dev",
        label: "Run with hot reload (textual dev mode)",
        command: "uv run textual run --dev src/{{ project_name }}/app.py",
        requires: None,
    }),
    extra_commands: &[],
    docker: DockerEntry {
        instruction: "CMD",
        argv: &["python", "-m", "{{ project_name }}.app"],
        note: Some("TUI apps typically not containerized"),
    },
    compose: None,
};

/// Returns the template set for `project_type`.
pub fn lookup(project_type: ProjectType) -> &'static TemplateSet {
    match project_type {
        ProjectType::Library => &LIBRARY,
        ProjectType::Api => &API,
        ProjectType::Cli => &CLI,
        ProjectType::Data => &DATA,
        ProjectType::Tui => &TUI,
    }
}

impl TemplateSet {
    /// Commands offered for this configuration, in Makefile order.
    pub fn commands(&self, config: &BuildConfig) -> Vec<CommandTemplate> {
        self.run_command
            .iter()
            .chain(self.dev_command.iter())
            .chain(self.extra_commands.iter())
            .filter(|c| c.requires.map_or(true, |flag| config.feature(flag)))
            .copied()
            .collect()
    }

    /// Whether `name` is one of the packages this type adds, compared normalized.
    pub fn installs(&self, name: &str) -> bool {
        let wanted = normalized_name(name);
        self.runtime_dependencies
            .iter()
            .chain(self.dev_dependencies)
            .any(|pkg| normalized_name(pkg.0) == wanted)
    }
}

/// Packages passed to the dependency manager, split by group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyPlan {
    pub runtime: Vec<PackageRef>,
    pub dev: Vec<PackageRef>,
}

impl DependencyPlan {
    /// Runtime set of the type; dev set is the core tooling, the type's dev extras and
    /// the security tooling when enabled. No package appears twice across both groups.
    pub fn for_config(config: &BuildConfig) -> Self {
        let set = lookup(config.project_type);
        let runtime: IndexSet<PackageRef> = set.runtime_dependencies.iter().copied().collect();

        let security: &[PackageRef] =
            if config.feature(FeatureName::Security) { SECURITY_DEV_DEPENDENCIES } else { &[] };
        let dev: IndexSet<PackageRef> = CORE_DEV_DEPENDENCIES
            .iter()
            .chain(set.dev_dependencies)
            .chain(security)
            .copied()
            .filter(|pkg| !runtime.contains(pkg))
            .collect();

        Self { runtime: runtime.into_iter().collect(), dev: dev.into_iter().collect() }
    }

    pub fn all(&self) -> impl Iterator<Item = &PackageRef> {
        self.runtime.iter().chain(self.dev.iter())
    }
}
