//! Command-line interface for pyseed.
//! Type, license and version are taken as plain strings so that they go through the
//! same validation as values coming from the environment.

use clap::Parser;
use indexmap::IndexMap;
use std::path::PathBuf;

use crate::config::{FeatureName, PartialConfig};

/// Command-line arguments for pyseed.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "pyseed: create Python repositories with uv, CI and sane defaults",
    long_about = None
)]
pub struct Args {
    /// Repository name (prompted for when omitted)
    #[arg(short = 'n', long)]
    pub reponame: Option<String>,

    /// Parent directory for the new repository [default: ~/Repos]
    #[arg(short = 'l', long)]
    pub repoloc: Option<PathBuf>,

    /// Python version [default: 3.12]
    #[arg(short, long)]
    pub python: Option<String>,

    /// Project type: library, api, cli, data or tui [default: library]
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub project_type: Option<String>,

    /// License: MIT, Apache-2.0, GPL-3.0, BSD-3-Clause, Unlicense or None [default: MIT]
    #[arg(long)]
    pub license: Option<String>,

    /// Author name for the license [default: git user.name]
    #[arg(short, long)]
    pub author: Option<String>,

    #[arg(long, overrides_with = "no_vscode", hide = true)]
    pub vscode: bool,
    /// Skip VS Code configuration
    #[arg(long, overrides_with = "vscode")]
    pub no_vscode: bool,

    #[arg(long, overrides_with = "no_docker", hide = true)]
    pub docker: bool,
    /// Skip Dockerfile and .dockerignore
    #[arg(long, overrides_with = "docker")]
    pub no_docker: bool,

    #[arg(long, overrides_with = "no_docker_compose", hide = true)]
    pub docker_compose: bool,
    /// Skip docker-compose.yml (api and data only)
    #[arg(long, overrides_with = "docker_compose")]
    pub no_docker_compose: bool,

    #[arg(long, overrides_with = "no_makefile", hide = true)]
    pub makefile: bool,
    /// Skip the Makefile
    #[arg(long, overrides_with = "makefile")]
    pub no_makefile: bool,

    #[arg(long, overrides_with = "no_changelog", hide = true)]
    pub changelog: bool,
    /// Skip CHANGELOG.md
    #[arg(long, overrides_with = "changelog")]
    pub no_changelog: bool,

    #[arg(long, overrides_with = "no_security", hide = true)]
    pub security: bool,
    /// Skip bandit and detect-secrets
    #[arg(long, overrides_with = "security")]
    pub no_security: bool,

    #[arg(long, overrides_with = "no_dependabot", hide = true)]
    pub dependabot: bool,
    /// Skip the Dependabot configuration
    #[arg(long, overrides_with = "dependabot")]
    pub no_dependabot: bool,

    #[arg(long, overrides_with = "no_github", hide = true)]
    pub github: bool,
    /// Skip remote repository creation and the initial push
    #[arg(long, overrides_with = "github")]
    pub no_github: bool,

    /// Create a private remote repository (default)
    #[arg(long, overrides_with = "public")]
    pub private: bool,
    /// Create a public remote repository
    #[arg(long, overrides_with = "private")]
    pub public: bool,

    #[arg(long, overrides_with = "no_open_editor", hide = true)]
    pub open_editor: bool,
    /// Don't open VS Code after creation
    #[arg(long, overrides_with = "open_editor")]
    pub no_open_editor: bool,

    /// Print the files and commands without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,
}

fn toggle(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

impl Args {
    /// Flags given explicitly on the command line; absent ones fall through to the
    /// environment and defaults.
    pub fn feature_overrides(&self) -> IndexMap<FeatureName, bool> {
        [
            (FeatureName::Vscode, toggle(self.vscode, self.no_vscode)),
            (FeatureName::Docker, toggle(self.docker, self.no_docker)),
            (FeatureName::DockerCompose, toggle(self.docker_compose, self.no_docker_compose)),
            (FeatureName::Makefile, toggle(self.makefile, self.no_makefile)),
            (FeatureName::Changelog, toggle(self.changelog, self.no_changelog)),
            (FeatureName::Security, toggle(self.security, self.no_security)),
            (FeatureName::Dependabot, toggle(self.dependabot, self.no_dependabot)),
            (FeatureName::Github, toggle(self.github, self.no_github)),
            (FeatureName::PrivateRepo, toggle(self.private, self.public)),
            (FeatureName::OpenEditor, toggle(self.open_editor, self.no_open_editor)),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }

    pub fn to_partial(&self) -> PartialConfig {
        PartialConfig {
            name: self.reponame.clone(),
            location: self.repoloc.clone(),
            runtime_version: self.python.clone(),
            project_type: self.project_type.clone(),
            license: self.license.clone(),
            author: self.author.clone(),
            year: None,
            features: self.feature_overrides(),
        }
    }
}

/// Parses command line arguments, exiting through clap on invalid input.
pub fn get_args() -> Args {
    Args::parse()
}
