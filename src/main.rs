//! pyseed entry point.
//! Parses arguments, resolves the configuration once and hands it to the generator.

use std::io::IsTerminal;

use pyseed::{
    cli::{get_args, Args},
    config::{resolve, EnvView},
    error::{default_error_handler, Result},
    generator::{summary, Generator},
    logger::init_logger,
    orchestrator::SystemRunner,
    prompt::{fill_missing_name, DialoguerPrompter},
    renderer::MiniJinjaRenderer,
};

fn main() {
    let args = get_args();
    init_logger(args.verbose);

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

/// Main application logic.
///
/// # Flow
/// 1. Captures the environment and fills in a missing name interactively
/// 2. Resolves and validates the configuration
/// 3. Prints the plan (dry run) or generates the project
fn run(args: Args) -> Result<()> {
    let env = EnvView::from_process();
    let prompter = DialoguerPrompter::new();
    let overrides = fill_missing_name(&prompter, args.to_partial(), std::io::stdin().is_terminal())?;
    let config = resolve(&overrides, &env)?;

    println!(
        "Creating {} ({}, Python {})",
        config.project_name, config.project_type, config.runtime_version
    );

    let renderer = MiniJinjaRenderer::new()?;
    let runner = SystemRunner;
    let generator = Generator::new(&config, &renderer, &runner);

    if args.dry_run {
        let files = generator.dry_run()?;
        println!("Dry run: {} files planned, nothing written.", files.len());
        return Ok(());
    }

    let outcome = generator.generate()?;
    println!("\n{}", summary(&config, &outcome));
    Ok(())
}
