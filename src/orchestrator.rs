//! External tool invocation.
//!
//! Every external call is an [`ExternalStep`] whose argument vector is derived from the
//! [`BuildConfig`] alone. Steps run through a [`CommandRunner`], so tests can record them
//! instead of spawning processes.

use log::{debug, warn};
use std::fmt;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::config::{BuildConfig, FeatureName};
use crate::error::ExternalError;

/// Environment variable removed for `uv` invocations, so an activated virtualenv of the
/// calling shell does not leak into the new project.
const VIRTUAL_ENV: &str = "VIRTUAL_ENV";

/// One call to an external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalStep {
    InitProject,
    AddDependencies { dev: bool, packages: Vec<String> },
    Lock,
    Sync,
    VcsInit,
    HookInstall,
    SecretScan,
    RunTests,
    RemoteExists,
    CreateRemote,
    StageAll,
    RunPreCommit,
    Commit,
    Push,
    OpenEditor,
    OpenEditorApp,
}

impl ExternalStep {
    pub fn program(&self) -> &'static str {
        match self {
            ExternalStep::InitProject
            | ExternalStep::AddDependencies { .. }
            | ExternalStep::Lock
            | ExternalStep::Sync
            | ExternalStep::HookInstall
            | ExternalStep::SecretScan
            | ExternalStep::RunTests
            | ExternalStep::RunPreCommit => "uv",
            ExternalStep::VcsInit
            | ExternalStep::StageAll
            | ExternalStep::Commit
            | ExternalStep::Push => "git",
            ExternalStep::RemoteExists | ExternalStep::CreateRemote => "gh",
            ExternalStep::OpenEditor => "code",
            ExternalStep::OpenEditorApp => "open",
        }
    }

    /// Argument vector for this step, without the program name.
    pub fn args(&self, config: &BuildConfig) -> Vec<String> {
        let args: Vec<&str> = match self {
            ExternalStep::InitProject => {
                return vec![
                    "init".into(),
                    ".".into(),
                    "--python".into(),
                    config.runtime_version.clone(),
                    "--no-workspace".into(),
                    "--name".into(),
                    config.project_name.to_string(),
                    "--vcs".into(),
                    "none".into(),
                ];
            }
            ExternalStep::AddDependencies { dev, packages } => {
                let mut args = vec!["add".to_string()];
                if *dev {
                    args.push("--dev".into());
                }
                args.push("--no-sync".into());
                args.extend(packages.iter().cloned());
                return args;
            }
            ExternalStep::Lock => vec!["lock"],
            ExternalStep::Sync => vec!["sync"],
            ExternalStep::VcsInit => vec!["init", "--quiet"],
            ExternalStep::HookInstall => vec!["run", "pre-commit", "install"],
            ExternalStep::SecretScan => vec!["run", "detect-secrets", "scan"],
            ExternalStep::RunTests => vec!["run", "pytest"],
            ExternalStep::RemoteExists => return vec!["repo".into(), "view".into(), config.raw_name.clone()],
            ExternalStep::CreateRemote => {
                let visibility = if config.feature(FeatureName::PrivateRepo) {
                    "--private"
                } else {
                    "--public"
                };
                vec!["repo", "create", config.raw_name.as_str(), visibility, "--source=.", "--remote=origin"]
            }
            ExternalStep::StageAll => vec!["add", "-A"],
            ExternalStep::RunPreCommit => vec!["run", "pre-commit", "run", "--all-files"],
            ExternalStep::Commit => vec!["commit", "-m", "Initial commit"],
            ExternalStep::Push => vec!["push", "-u", "origin", "main"],
            ExternalStep::OpenEditor => {
                return vec![config.target_directory.display().to_string()];
            }
            ExternalStep::OpenEditorApp => {
                return vec![
                    "-a".into(),
                    "Visual Studio Code".into(),
                    config.target_directory.display().to_string(),
                ];
            }
        };
        args.into_iter().map(str::to_string).collect()
    }

    /// Whether `VIRTUAL_ENV` is stripped from the child's environment.
    pub fn clean_env(&self) -> bool {
        self.program() == "uv"
    }

    /// Whether stdout is captured instead of shown to the user.
    pub fn captures_output(&self) -> bool {
        matches!(self, ExternalStep::SecretScan | ExternalStep::RemoteExists)
    }

    /// Full command line, for messages.
    pub fn command_line(&self, config: &BuildConfig) -> String {
        let mut parts = vec![self.program().to_string()];
        parts.extend(self.args(config).into_iter().map(|arg| {
            if arg.contains(' ') {
                format!("\"{arg}\"")
            } else {
                arg
            }
        }));
        parts.join(" ")
    }
}

impl fmt::Display for ExternalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExternalStep::InitProject => "init project",
            ExternalStep::AddDependencies { dev: false, .. } => "add dependencies",
            ExternalStep::AddDependencies { dev: true, .. } => "add dev dependencies",
            ExternalStep::Lock => "lock dependencies",
            ExternalStep::Sync => "sync environment",
            ExternalStep::VcsInit => "git init",
            ExternalStep::HookInstall => "install pre-commit hooks",
            ExternalStep::SecretScan => "secret baseline scan",
            ExternalStep::RunTests => "run tests",
            ExternalStep::RemoteExists => "check remote repository",
            ExternalStep::CreateRemote => "create remote repository",
            ExternalStep::StageAll => "stage files",
            ExternalStep::RunPreCommit => "run pre-commit",
            ExternalStep::Commit => "initial commit",
            ExternalStep::Push => "push",
            ExternalStep::OpenEditor | ExternalStep::OpenEditorApp => "open editor",
        };
        f.write_str(name)
    }
}

/// What a finished step produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutput {
    /// Captured stdout; empty unless the step captures output.
    pub stdout: String,
}

/// Executes external steps.
pub trait CommandRunner {
    /// Runs `program args..` in `cwd`. A non-zero exit is an [`ExternalError::Failed`].
    fn run(
        &self,
        step: &ExternalStep,
        config: &BuildConfig,
        cwd: &Path,
    ) -> Result<StepOutput, ExternalError>;

    /// Whether `program` can be found on `PATH`.
    fn is_available(&self, program: &str) -> bool;
}

/// Spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        step: &ExternalStep,
        config: &BuildConfig,
        cwd: &Path,
    ) -> Result<StepOutput, ExternalError> {
        let program = step.program();
        let mut command = Command::new(program);
        command.args(step.args(config)).current_dir(cwd).stdin(Stdio::null());
        if step.clean_env() {
            command.env_remove(VIRTUAL_ENV);
        }
        debug!("Running in {}: {}", cwd.display(), step.command_line(config));

        let spawn_error = |source: std::io::Error| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ExternalError::NotFound { step: step.to_string(), program: program.to_string() }
            } else {
                ExternalError::Spawn { step: step.to_string(), program: program.to_string(), source }
            }
        };

        let (status, stdout) = if step.captures_output() {
            let output = command.stderr(Stdio::piped()).output().map_err(spawn_error)?;
            (output.status, String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let mut child = command
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .spawn()
                .map_err(spawn_error)?;
            (child.wait().map_err(spawn_error)?, String::new())
        };

        if !status.success() {
            return Err(ExternalError::Failed {
                step: step.to_string(),
                command: step.command_line(config),
                status,
            });
        }
        Ok(StepOutput { stdout })
    }

    fn is_available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Tools required for a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prerequisites {
    /// False when `gh` is missing; the remote steps are then skipped.
    pub hosting_available: bool,
}

/// Runs steps for one configuration in its target directory.
pub struct Orchestrator<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a BuildConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a BuildConfig) -> Self {
        Self { runner, config }
    }

    /// `uv` and `git` must exist. `gh` only matters when `github` is on; without it the
    /// hosting steps are skipped.
    pub fn check_prerequisites(&self) -> Result<Prerequisites, ExternalError> {
        for program in ["uv", "git"] {
            if !self.runner.is_available(program) {
                return Err(ExternalError::NotFound {
                    step: "check prerequisites".to_string(),
                    program: program.to_string(),
                });
            }
        }
        let hosting_available =
            !self.config.feature(FeatureName::Github) || self.runner.is_available("gh");
        if !hosting_available {
            warn!("gh CLI not found, skipping GitHub setup");
        }
        Ok(Prerequisites { hosting_available })
    }

    /// Runs `step`; any failure is returned with the step identity.
    pub fn run(&self, step: &ExternalStep) -> Result<StepOutput, ExternalError> {
        println!("Running: {}", step.command_line(self.config));
        self.runner.run(step, self.config, &self.config.target_directory)
    }

    /// Runs `step`, downgrading a failure to a warning.
    pub fn run_best_effort(&self, step: &ExternalStep) -> Option<StepOutput> {
        match self.run(step) {
            Ok(output) => Some(output),
            Err(e) => {
                warn!("{e}");
                None
            }
        }
    }

    /// Runs a step whose exit status is the answer, e.g. whether a remote exists.
    /// Only a failure to start the tool is an error.
    pub fn probe(&self, step: &ExternalStep) -> Result<bool, ExternalError> {
        match self.runner.run(step, self.config, &self.config.target_directory) {
            Ok(_) => Ok(true),
            Err(ExternalError::Failed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
