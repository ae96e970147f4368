//! Template rendering for pyseed.
//! All templates are compiled into the binary and rendered with MiniJinja in strict
//! mode: referencing a slot that [`RenderContext`] does not define is an error instead
//! of an empty string in the output.
use indexmap::IndexMap;
use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;

use crate::config::{BuildConfig, FeatureName};
use crate::error::Result;

/// Built-in templates, keyed by the name the registry and materializer use.
const TEMPLATES: &[(&str, &str)] = &[
    ("empty", include_str!("templates/empty.j2")),
    ("python-version", include_str!("templates/python-version.j2")),
    ("pyproject.toml", include_str!("templates/pyproject.toml.j2")),
    ("gitignore", include_str!("templates/gitignore.j2")),
    ("env.example", include_str!("templates/env.example.j2")),
    ("editorconfig", include_str!("templates/editorconfig.j2")),
    ("pre-commit-config.yaml", include_str!("templates/pre-commit-config.yaml.j2")),
    ("github/ci.yml", include_str!("templates/github/ci.yml.j2")),
    ("github/dependabot.yml", include_str!("templates/github/dependabot.yml.j2")),
    ("Makefile", include_str!("templates/Makefile.j2")),
    ("Dockerfile", include_str!("templates/Dockerfile.j2")),
    ("dockerignore", include_str!("templates/dockerignore.j2")),
    ("docker-compose.yml", include_str!("templates/docker-compose.yml.j2")),
    ("CHANGELOG.md", include_str!("templates/CHANGELOG.md.j2")),
    ("README.md", include_str!("templates/README.md.j2")),
    ("license/MIT", include_str!("templates/license/MIT.j2")),
    ("license/Apache-2.0", include_str!("templates/license/Apache-2.0.j2")),
    ("license/GPL-3.0", include_str!("templates/license/GPL-3.0.j2")),
    ("license/BSD-3-Clause", include_str!("templates/license/BSD-3-Clause.j2")),
    ("license/Unlicense", include_str!("templates/license/Unlicense.j2")),
    ("library/test_placeholder.py", include_str!("templates/library/test_placeholder.py.j2")),
    ("api/main.py", include_str!("templates/api/main.py.j2")),
    ("api/test_api.py", include_str!("templates/api/test_api.py.j2")),
    ("cli/main.py", include_str!("templates/cli/main.py.j2")),
    ("cli/test_cli.py", include_str!("templates/cli/test_cli.py.j2")),
    ("data/pipeline.py", include_str!("templates/data/pipeline.py.j2")),
    ("data/test_pipeline.py", include_str!("templates/data/test_pipeline.py.j2")),
    ("tui/app.py", include_str!("templates/tui/app.py.j2")),
    ("tui/app.tcss", include_str!("templates/tui/app.tcss.j2")),
    ("tui/test_app.py", include_str!("templates/tui/test_app.py.j2")),
];

/// Names of every built-in template.
pub fn template_names() -> impl Iterator<Item = &'static str> {
    TEMPLATES.iter().map(|(name, _)| *name)
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedCommand {
    pub target: String,
    pub label: String,
    pub command: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderedDocker {
    pub instruction: String,
    pub argv: Vec<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedCompose {
    pub ports: Vec<String>,
    pub volumes: Vec<String>,
    pub restart: Option<String>,
}

/// Every slot a template may reference.
///
/// The scalar slots come straight from [`BuildConfig`]; the list slots hold registry
/// fragments after they have been rendered against the scalars.
#[derive(Debug, Clone, Serialize)]
pub struct RenderContext {
    pub project_name: String,
    pub project_name_capitalized: String,
    pub runtime_version: String,
    pub python_target: String,
    pub license: Option<String>,
    pub author: String,
    pub year: i32,
    pub project_type: String,
    pub features: IndexMap<&'static str, bool>,
    pub compose: bool,
    pub ci_versions: Vec<String>,
    pub runtime_dependencies: Vec<String>,
    pub dev_dependencies: Vec<String>,
    pub script: Option<String>,
    pub env_vars: Vec<EnvVar>,
    pub commands: Vec<RenderedCommand>,
    pub docker: RenderedDocker,
    pub compose_service: Option<RenderedCompose>,
    pub tree: String,
}

impl RenderContext {
    /// Scalar slots for `config`; list slots start empty.
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            project_name: config.project_name.to_string(),
            project_name_capitalized: config.project_name.capitalized(),
            runtime_version: config.runtime_version.clone(),
            python_target: config.python_target(),
            license: (!config.license.is_none()).then(|| config.license.to_string()),
            author: config.author.clone(),
            year: config.year,
            project_type: config.project_type.to_string(),
            features: FeatureName::ALL
                .into_iter()
                .map(|name| (name.key(), config.feature(name)))
                .collect(),
            compose: config.compose_enabled(),
            ci_versions: config.ci_versions().into_iter().map(str::to_string).collect(),
            runtime_dependencies: Vec::new(),
            dev_dependencies: Vec::new(),
            script: None,
            env_vars: Vec::new(),
            commands: Vec::new(),
            docker: RenderedDocker::default(),
            compose_service: None,
            tree: String::new(),
        }
    }
}

/// Trait for template rendering engines.
pub trait TemplateRenderer {
    /// Renders the built-in template called `name`.
    fn render(&self, name: &str, context: &RenderContext) -> Result<String>;

    /// Renders an inline fragment such as a path pattern or a registry command.
    fn render_str(&self, source: &str, context: &RenderContext) -> Result<String>;
}

/// MiniJinja-based template rendering engine.
pub struct MiniJinjaRenderer {
    env: Environment<'static>,
}

impl MiniJinjaRenderer {
    /// Creates a renderer with every built-in template loaded.
    ///
    /// # Errors
    /// * `Error::MinijinjaError` if a built-in template fails to parse
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        // Output is YAML, TOML and source code; never escape it.
        env.set_auto_escape_callback(|_| AutoEscape::None);
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    fn render(&self, name: &str, context: &RenderContext) -> Result<String> {
        let tmpl = self.env.get_template(name)?;
        Ok(tmpl.render(context)?)
    }

    fn render_str(&self, source: &str, context: &RenderContext) -> Result<String> {
        Ok(self.env.render_str(source, context)?)
    }
}
