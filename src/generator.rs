//! End-to-end project generation.
//!
//! The run is strictly sequential: render and check the whole plan in memory, verify the
//! tools, then interleave file writes with external steps. Files tagged
//! [`Phase::PostInstall`] are only written once the lock artifact exists.

use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{BuildConfig, FeatureName};
use crate::consistency::{self, Snapshot};
use crate::constants::{LOCK_FILE, SECRETS_BASELINE, UV_STUB_FILES};
use crate::error::{Error, Result};
use crate::materializer::{write_files, GeneratedFile, Materializer, Phase};
use crate::orchestrator::{CommandRunner, ExternalStep, Orchestrator};
use crate::registry::DependencyPlan;
use crate::renderer::TemplateRenderer;

/// Baseline written when the secret scan does not succeed.
const EMPTY_BASELINE: &str = "{}";

/// What a finished run did.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    pub target: PathBuf,
    pub written: Vec<PathBuf>,
    pub remote_created: bool,
    pub tests_passed: bool,
}

/// Drives one run for one [`BuildConfig`].
pub struct Generator<'a> {
    config: &'a BuildConfig,
    renderer: &'a dyn TemplateRenderer,
    runner: &'a dyn CommandRunner,
}

impl<'a> Generator<'a> {
    pub fn new(
        config: &'a BuildConfig,
        renderer: &'a dyn TemplateRenderer,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self { config, renderer, runner }
    }

    /// Renders every file and checks the result. No side effects.
    pub fn plan(&self) -> Result<Vec<GeneratedFile>> {
        let files = Materializer::new(self.renderer, self.config).plan()?;
        consistency::verify(self.config, &Snapshot::from_plan(&files))?;
        Ok(files)
    }

    /// External steps a run performs, in order, assuming every step succeeds.
    pub fn planned_steps(&self, hosting_available: bool) -> Vec<ExternalStep> {
        let config = self.config;
        let deps = DependencyPlan::for_config(config);
        let mut steps = vec![ExternalStep::InitProject];
        if !deps.runtime.is_empty() {
            steps.push(ExternalStep::AddDependencies {
                dev: false,
                packages: deps.runtime.iter().map(ToString::to_string).collect(),
            });
        }
        steps.push(ExternalStep::AddDependencies {
            dev: true,
            packages: deps.dev.iter().map(ToString::to_string).collect(),
        });
        steps.extend([ExternalStep::Lock, ExternalStep::Sync]);
        if config.feature(FeatureName::Security) {
            steps.push(ExternalStep::SecretScan);
        }
        steps.extend([ExternalStep::VcsInit, ExternalStep::HookInstall, ExternalStep::RunTests]);
        if config.feature(FeatureName::Github) && hosting_available {
            steps.extend([
                ExternalStep::RemoteExists,
                ExternalStep::CreateRemote,
                ExternalStep::StageAll,
                ExternalStep::RunPreCommit,
                ExternalStep::StageAll,
                ExternalStep::Commit,
                ExternalStep::Push,
            ]);
        }
        if config.feature(FeatureName::OpenEditor) {
            steps.push(ExternalStep::OpenEditor);
        }
        steps
    }

    /// Prints what a run would do and returns the checked plan.
    pub fn dry_run(&self) -> Result<Vec<GeneratedFile>> {
        let files = self.plan()?;
        let target = &self.config.target_directory;
        for file in &files {
            println!("Would create: '{}'", target.join(&file.relative_path).display());
        }
        for step in self.planned_steps(true) {
            println!("Would run: {}", step.command_line(self.config));
        }
        Ok(files)
    }

    fn write(&self, files: &[GeneratedFile], phase: Phase) -> Result<Vec<PathBuf>> {
        let written = write_files(
            &self.config.target_directory,
            files.iter().filter(|f| f.phase == phase),
        )?;
        for path in &written {
            println!("Created: '{}'", path.display());
        }
        Ok(written)
    }

    fn remove_stubs(&self) -> Result<()> {
        for stub in UV_STUB_FILES {
            let path = self.config.target_directory.join(stub);
            if path.exists() {
                debug!("Removing stub {}", path.display());
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    fn install_dependencies(&self, orchestrator: &Orchestrator) -> Result<()> {
        for step in self.planned_steps(false) {
            if matches!(step, ExternalStep::AddDependencies { .. }) {
                orchestrator.run(&step)?;
            }
        }
        orchestrator.run(&ExternalStep::Lock)?;
        orchestrator.run(&ExternalStep::Sync)?;

        let lock = self.config.target_directory.join(LOCK_FILE);
        if !lock.is_file() {
            return Err(Error::MissingLock(lock));
        }
        Ok(())
    }

    fn write_secrets_baseline(&self, orchestrator: &Orchestrator) -> Result<PathBuf> {
        let baseline = match orchestrator.run_best_effort(&ExternalStep::SecretScan) {
            Some(output) if !output.stdout.trim().is_empty() => output.stdout,
            _ => {
                warn!("Secret scan did not succeed, writing an empty {}", SECRETS_BASELINE);
                EMPTY_BASELINE.to_string()
            }
        };
        let file = GeneratedFile::new(SECRETS_BASELINE, baseline, Phase::PostInstall);
        let written = write_files(&self.config.target_directory, [&file])?;
        for path in &written {
            println!("Created: '{}'", path.display());
        }
        Ok(self.config.target_directory.join(SECRETS_BASELINE))
    }

    fn publish(&self, orchestrator: &Orchestrator) -> Result<()> {
        if orchestrator.probe(&ExternalStep::RemoteExists)? {
            return Err(Error::RemoteExists(self.config.raw_name.clone()));
        }
        orchestrator.run(&ExternalStep::CreateRemote)?;
        orchestrator.run(&ExternalStep::StageAll)?;
        // Exits non-zero whenever a hook rewrites files.
        orchestrator.run_best_effort(&ExternalStep::RunPreCommit);
        orchestrator.run(&ExternalStep::StageAll)?;
        orchestrator.run(&ExternalStep::Commit)?;
        orchestrator.run(&ExternalStep::Push)?;
        Ok(())
    }

    fn open_editor(&self, orchestrator: &Orchestrator) {
        if orchestrator.run_best_effort(&ExternalStep::OpenEditor).is_some() {
            return;
        }
        if cfg!(target_os = "macos")
            && orchestrator.run_best_effort(&ExternalStep::OpenEditorApp).is_some()
        {
            return;
        }
        warn!("VS Code not opened; install its 'code' shell command");
    }

    /// Runs the whole generation.
    ///
    /// Nothing is written before the plan passes the consistency check and the required
    /// tools are found. A failure after that leaves the target partially populated.
    pub fn generate(&self) -> Result<Outcome> {
        let config = self.config;
        let target = &config.target_directory;
        let files = self.plan()?;

        let orchestrator = Orchestrator::new(self.runner, config);
        let prerequisites = orchestrator.check_prerequisites()?;

        fs::create_dir_all(target)
            .map_err(|source| Error::WriteError { path: target.clone(), source })?;
        info!("Generating {} in {}", config.project_name, target.display());

        orchestrator.run(&ExternalStep::InitProject)?;
        self.remove_stubs()?;

        let mut written = self.write(&files, Phase::Base)?;
        self.install_dependencies(&orchestrator)?;
        written.extend(self.write(&files, Phase::PostInstall)?);

        if config.feature(FeatureName::Security) {
            written.push(self.write_secrets_baseline(&orchestrator)?);
        }

        orchestrator.run(&ExternalStep::VcsInit)?;
        orchestrator.run(&ExternalStep::HookInstall)?;

        let tests_passed = orchestrator.run_best_effort(&ExternalStep::RunTests).is_some();
        if !tests_passed {
            warn!("Tests failed");
        }

        let mut remote_created = false;
        if config.feature(FeatureName::Github) && prerequisites.hosting_available {
            self.publish(&orchestrator)?;
            remote_created = true;
        }

        if config.feature(FeatureName::OpenEditor) {
            self.open_editor(&orchestrator);
        }

        match Snapshot::from_disk(target) {
            Ok(snapshot) => {
                for problem in consistency::find_problems(config, &snapshot) {
                    warn!("{problem}");
                }
            }
            Err(e) => warn!("Could not re-read {}: {}", target.display(), e),
        }

        Ok(Outcome { target: target.clone(), written, remote_created, tests_passed })
    }
}

/// Final message: location, enabled artifacts and next steps.
pub fn summary(config: &BuildConfig, outcome: &Outcome) -> String {
    let mut lines = vec![format!("Created {}", outcome.target.display()), String::new()];

    lines.push("Features enabled:".to_string());
    for name in FeatureName::ALL {
        let enabled = match name {
            FeatureName::DockerCompose => config.compose_enabled(),
            _ => config.feature(name),
        };
        if let (true, Some(label)) = (enabled, name.summary()) {
            lines.push(format!("  - {label}"));
        }
    }
    if !config.license.is_none() {
        lines.push(format!("  - License: {}", config.license));
    }

    lines.push(String::new());
    lines.push("Next steps:".to_string());
    lines.push(format!("  cd {}", display_path(&outcome.target)));
    lines.push("  source .venv/bin/activate".to_string());
    if config.feature(FeatureName::Makefile) {
        lines.push("  make test".to_string());
    } else {
        lines.push("  uv run pytest".to_string());
    }
    if outcome.remote_created {
        lines.push(String::new());
        lines.push(format!("Pushed to remote repository '{}'", config.raw_name));
    }
    lines.join("\n")
}

fn display_path(path: &Path) -> String {
    match dirs::home_dir().and_then(|home| path.strip_prefix(home).ok().map(Path::to_path_buf)) {
        Some(relative) => format!("~/{}", relative.display()),
        None => path.display().to_string(),
    }
}
