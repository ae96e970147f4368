//! Renders the output tree for a [`BuildConfig`] and writes it to disk.
//!
//! Planning and writing are separate: [`Materializer::plan`] renders every file in
//! memory, [`write_files`] puts a subset of them on disk. The generator uses the
//! [`Phase`] tag to write the files that depend on installed tooling only after the
//! dependency manager has run.

use log::debug;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::config::{BuildConfig, FeatureName};
use crate::constants::LOCK_FILE;
use crate::error::{Error, Result};
use crate::registry::{lookup, DependencyPlan, TemplateSet, PACKAGE_SKELETON};
use crate::renderer::{
    EnvVar, RenderContext, RenderedCommand, RenderedCompose, RenderedDocker, TemplateRenderer,
};

/// When a file may be written relative to the external steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// Before dependency installation.
    Base,
    /// After the lock artifact exists.
    PostInstall,
}

/// One rendered output file. Never updated after it is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub relative_path: PathBuf,
    pub content: String,
    pub executable: bool,
    pub phase: Phase,
}

impl GeneratedFile {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(path: P, content: S, phase: Phase) -> Self {
        Self { relative_path: path.into(), content: content.into(), executable: false, phase }
    }
}

/// Checks a rendered path stays inside the target directory.
pub fn is_rendered_path_valid(path: &str) -> bool {
    !path.is_empty()
        && !path.split('/').any(str::is_empty)
        && Path::new(path).components().all(|c| matches!(c, Component::Normal(_)))
}

/// Renders files for one configuration.
pub struct Materializer<'a> {
    renderer: &'a dyn TemplateRenderer,
    config: &'a BuildConfig,
    set: &'static TemplateSet,
}

impl<'a> Materializer<'a> {
    pub fn new(renderer: &'a dyn TemplateRenderer, config: &'a BuildConfig) -> Self {
        Self { renderer, config, set: lookup(config.project_type) }
    }

    /// Full render context: config scalars plus the registry fragments rendered against them.
    pub fn context(&self) -> Result<RenderContext> {
        let mut ctx = RenderContext::from_config(self.config);
        let render = |source: &str| self.renderer.render_str(source, &ctx);

        let deps = DependencyPlan::for_config(self.config);
        let script = self.set.script.map(render).transpose()?;
        let env_vars = self
            .set
            .env_vars
            .iter()
            .map(|(key, value)| {
                Ok(EnvVar { key: key.to_string(), value: render(*value)? })
            })
            .collect::<Result<Vec<_>>>()?;
        let commands = self
            .set
            .commands(self.config)
            .into_iter()
            .map(|cmd| {
                Ok(RenderedCommand {
                    target: cmd.target.to_string(),
                    label: cmd.label.to_string(),
                    command: render(cmd.command)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let docker = RenderedDocker {
            instruction: self.set.docker.instruction.to_string(),
            argv: self.set.docker.argv.iter().map(|arg| render(*arg)).collect::<Result<_>>()?,
            note: self.set.docker.note.map(str::to_string),
        };
        let compose_service = match self.set.compose {
            Some(service) if self.config.compose_enabled() => Some(RenderedCompose {
                ports: service.ports.iter().map(|p| p.to_string()).collect(),
                volumes: service.volumes.iter().map(|v| v.to_string()).collect(),
                restart: service.restart.map(str::to_string),
            }),
            _ => None,
        };

        ctx.runtime_dependencies = deps.runtime.iter().map(ToString::to_string).collect();
        ctx.dev_dependencies = deps.dev.iter().map(ToString::to_string).collect();
        ctx.script = script;
        ctx.env_vars = env_vars;
        ctx.commands = commands;
        ctx.docker = docker;
        ctx.compose_service = compose_service;
        Ok(ctx)
    }

    fn file(
        &self,
        ctx: &RenderContext,
        path: &str,
        template: &str,
        phase: Phase,
    ) -> Result<GeneratedFile> {
        let rendered_path = self.renderer.render_str(path, ctx)?;
        if !is_rendered_path_valid(&rendered_path) {
            return Err(Error::InvalidPath(rendered_path));
        }
        let content = self.renderer.render(template, ctx)?;
        debug!("Rendered '{}' from template '{}'", rendered_path, template);
        Ok(GeneratedFile::new(rendered_path, content, phase))
    }

    /// Renders every output file, in write order.
    ///
    /// The README is rendered last so its tree listing is built from the actual plan.
    pub fn plan(&self) -> Result<Vec<GeneratedFile>> {
        let config = self.config;
        let mut ctx = self.context()?;

        let mut files = vec![
            self.file(&ctx, "pyproject.toml", "pyproject.toml", Phase::Base)?,
            self.file(&ctx, ".python-version", "python-version", Phase::Base)?,
            self.file(&ctx, ".gitignore", "gitignore", Phase::Base)?,
            self.file(&ctx, ".env.example", "env.example", Phase::Base)?,
            self.file(&ctx, ".editorconfig", "editorconfig", Phase::Base)?,
        ];
        for template in PACKAGE_SKELETON.iter().chain(self.set.starter_files) {
            files.push(self.file(&ctx, template.path, template.template, Phase::Base)?);
        }
        files.push(self.file(&ctx, ".github/workflows/ci.yml", "github/ci.yml", Phase::Base)?);
        if config.feature(FeatureName::Dependabot) {
            files.push(self.file(
                &ctx,
                ".github/dependabot.yml",
                "github/dependabot.yml",
                Phase::Base,
            )?);
        }
        if config.feature(FeatureName::Vscode) {
            files.extend(vscode_files()?);
        }
        if config.feature(FeatureName::Docker) {
            files.push(self.file(&ctx, "Dockerfile", "Dockerfile", Phase::Base)?);
            files.push(self.file(&ctx, ".dockerignore", "dockerignore", Phase::Base)?);
        }
        if config.feature(FeatureName::Makefile) {
            files.push(self.file(&ctx, "Makefile", "Makefile", Phase::Base)?);
        }
        if config.feature(FeatureName::Changelog) {
            files.push(self.file(&ctx, "CHANGELOG.md", "CHANGELOG.md", Phase::Base)?);
        }
        if !config.license.is_none() {
            let template = format!("license/{}", config.license);
            files.push(self.file(&ctx, "LICENSE", &template, Phase::Base)?);
        }
        if config.compose_enabled() {
            files.push(self.file(&ctx, "docker-compose.yml", "docker-compose.yml", Phase::Base)?);
        }
        let pre_commit =
            self.file(&ctx, ".pre-commit-config.yaml", "pre-commit-config.yaml", Phase::PostInstall)?;

        let mut listed: Vec<PathBuf> = files.iter().map(|f| f.relative_path.clone()).collect();
        listed.push(pre_commit.relative_path.clone());
        listed.push(PathBuf::from("README.md"));
        listed.push(PathBuf::from(LOCK_FILE));
        ctx.tree = tree_listing(&listed);

        files.push(self.file(&ctx, "README.md", "README.md", Phase::Base)?);
        files.push(pre_commit);
        Ok(files)
    }
}

fn vscode_files() -> Result<Vec<GeneratedFile>> {
    let settings = json!({
        "python.defaultInterpreterPath": ".venv/bin/python",
        "[python]": {
            "editor.defaultFormatter": "charliermarsh.ruff",
            "editor.formatOnSave": true,
            "editor.codeActionsOnSave": {
                "source.fixAll": "explicit",
                "source.organizeImports": "explicit"
            }
        },
        "python.analysis.typeCheckingMode": "strict"
    });
    let extensions = json!({
        "recommendations": [
            "charliermarsh.ruff",
            "ms-python.python",
            "ms-python.mypy-type-checker",
            "tamasfe.even-better-toml"
        ]
    });
    Ok(vec![
        GeneratedFile::new(
            ".vscode/settings.json",
            serde_json::to_string_pretty(&settings)? + "\n",
            Phase::Base,
        ),
        GeneratedFile::new(
            ".vscode/extensions.json",
            serde_json::to_string_pretty(&extensions)? + "\n",
            Phase::Base,
        ),
    ])
}

#[derive(Default)]
struct TreeNode {
    children: BTreeMap<String, TreeNode>,
}

/// Draws `paths` as a box-drawing tree. Directories get a trailing `/`.
pub fn tree_listing<P: AsRef<Path>>(paths: &[P]) -> String {
    let mut root = TreeNode::default();
    for path in paths {
        let parts: Vec<String> = path
            .as_ref()
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let last = parts.len().saturating_sub(1);
        let mut node = &mut root;
        for (i, part) in parts.into_iter().enumerate() {
            let key = if i < last { format!("{part}/") } else { part };
            node = node.children.entry(key).or_default();
        }
    }
    let mut lines = Vec::new();
    draw(&root, "", &mut lines);
    lines.join("\n")
}

fn draw(node: &TreeNode, prefix: &str, lines: &mut Vec<String>) {
    let count = node.children.len();
    for (i, (name, child)) in node.children.iter().enumerate() {
        let last = i + 1 == count;
        lines.push(format!("{prefix}{}{name}", if last { "└── " } else { "├── " }));
        let nested = format!("{prefix}{}", if last { "    " } else { "│   " });
        draw(child, &nested, lines);
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| Error::WriteError { path: parent.to_path_buf(), source })?;
    }
    fs::write(path, content).map_err(|source| Error::WriteError { path: path.to_path_buf(), source })
}

/// Writes `files` under `target`, creating directories as needed.
///
/// Stops at the first failure; files already written stay on disk.
pub fn write_files<'f, I>(target: &Path, files: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator<Item = &'f GeneratedFile>,
{
    let mut written = Vec::new();
    for file in files {
        let dest = target.join(&file.relative_path);
        debug!("Writing file: {}", dest.display());
        write_file(&dest, &file.content)?;
        written.push(dest);
    }
    Ok(written)
}

/// Plans every file for `config` and writes all of them under `target`.
pub fn materialize(
    renderer: &dyn TemplateRenderer,
    config: &BuildConfig,
    target: &Path,
) -> Result<Vec<GeneratedFile>> {
    let files = Materializer::new(renderer, config).plan()?;
    write_files(target, &files)?;
    Ok(files)
}
