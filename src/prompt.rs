//! Interactive input for values the command line left out.

use dialoguer::Input;

use crate::config::PartialConfig;
use crate::error::{Error, Result};

/// Asks the user for missing values.
pub trait Prompter {
    fn project_name(&self) -> Result<String>;
}

/// Terminal prompter backed by dialoguer.
#[derive(Debug, Default, Clone, Copy)]
pub struct DialoguerPrompter;

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for DialoguerPrompter {
    fn project_name(&self) -> Result<String> {
        Input::<String>::new()
            .with_prompt("Repository name")
            .validate_with(|input: &String| -> std::result::Result<(), &str> {
                if input.trim().is_empty() {
                    Err("a repository name is required")
                } else {
                    Ok(())
                }
            })
            .interact_text()
            .map(|name| name.trim().to_string())
            .map_err(|e| Error::PromptError(e.to_string()))
    }
}

/// Prompts for the project name when it is missing and a user is there to answer.
/// Without a terminal the name stays unset and resolution reports it.
pub fn fill_missing_name(
    prompter: &dyn Prompter,
    mut overrides: PartialConfig,
    interactive: bool,
) -> Result<PartialConfig> {
    if overrides.name.is_none() && interactive {
        overrides.name = Some(prompter.project_name()?);
    }
    Ok(overrides)
}
