#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::ExitStatus;

use pyseed::config::{resolve, BuildConfig, EnvView, FeatureName, PartialConfig};
use pyseed::error::ExternalError;
use pyseed::materializer::{GeneratedFile, Materializer};
use pyseed::orchestrator::{CommandRunner, ExternalStep, StepOutput};
use pyseed::renderer::MiniJinjaRenderer;

pub fn overrides(name: &str, location: &Path) -> PartialConfig {
    PartialConfig {
        name: Some(name.to_string()),
        location: Some(location.to_path_buf()),
        author: Some("Jane Doe".to_string()),
        year: Some(2024),
        ..Default::default()
    }
}

pub fn build_config(
    name: &str,
    location: &Path,
    project_type: &str,
    flags: &[(FeatureName, bool)],
) -> BuildConfig {
    let mut partial = overrides(name, location);
    partial.project_type = Some(project_type.to_string());
    partial.features = flags.iter().copied().collect();
    resolve(&partial, &EnvView::default()).unwrap()
}

pub fn all_flags(value: bool) -> Vec<(FeatureName, bool)> {
    FeatureName::ALL.into_iter().map(|name| (name, value)).collect()
}

pub fn plan(config: &BuildConfig) -> Vec<GeneratedFile> {
    let renderer = MiniJinjaRenderer::new().unwrap();
    Materializer::new(&renderer, config).plan().unwrap()
}

pub fn paths(files: &[GeneratedFile]) -> BTreeSet<String> {
    files.iter().map(|f| f.relative_path.display().to_string()).collect()
}

pub fn content<'a>(files: &'a [GeneratedFile], path: &str) -> &'a str {
    files
        .iter()
        .find(|f| f.relative_path == Path::new(path))
        .map(|f| f.content.as_str())
        .unwrap_or_else(|| panic!("{path} not planned"))
}

pub fn exit_failure() -> ExitStatus {
    ExitStatus::from_raw(1 << 8)
}

/// Records steps instead of spawning processes. Simulates what uv leaves on disk.
#[derive(Default)]
pub struct RecordingRunner {
    pub steps: RefCell<Vec<ExternalStep>>,
    pub missing: Vec<&'static str>,
    pub failing: Vec<ExternalStep>,
    pub remote_exists: bool,
    pub scan_output: String,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self { scan_output: "{\n  \"version\": \"1.5.0\"\n}\n".to_string(), ..Default::default() }
    }

    pub fn recorded(&self) -> Vec<ExternalStep> {
        self.steps.borrow().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(
        &self,
        step: &ExternalStep,
        config: &BuildConfig,
        cwd: &Path,
    ) -> Result<StepOutput, ExternalError> {
        self.steps.borrow_mut().push(step.clone());
        let failed = || ExternalError::Failed {
            step: step.to_string(),
            command: step.command_line(config),
            status: exit_failure(),
        };
        if self.failing.contains(step) {
            return Err(failed());
        }
        match step {
            ExternalStep::InitProject => {
                fs::write(cwd.join("pyproject.toml"), "[project]\nname = \"stub\"\n").unwrap();
                fs::write(cwd.join("README.md"), "").unwrap();
                fs::write(cwd.join(".python-version"), "3.12\n").unwrap();
                fs::write(cwd.join("hello.py"), "print('hello')\n").unwrap();
                fs::write(cwd.join("main.py"), "print('main')\n").unwrap();
            }
            ExternalStep::Lock => {
                fs::write(cwd.join("uv.lock"), "version = 1\n").unwrap();
            }
            ExternalStep::RemoteExists if !self.remote_exists => return Err(failed()),
            ExternalStep::SecretScan => {
                return Ok(StepOutput { stdout: self.scan_output.clone() });
            }
            _ => {}
        }
        Ok(StepOutput::default())
    }

    fn is_available(&self, program: &str) -> bool {
        !self.missing.contains(&program)
    }
}
