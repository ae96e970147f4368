//! pyseed creates ready-to-use Python repositories.
//! A single resolved configuration drives a static per-type template table, a renderer
//! that materializes the file tree, a consistency checker over that tree and an
//! orchestrator for the external tools (uv, git, gh).

/// Command-line interface module for the pyseed application
pub mod cli;

/// Configuration resolution: CLI overrides, environment view and defaults
pub mod config;

/// Post-generation consistency checks over a plan or a directory
pub mod consistency;

/// Common constants
pub mod constants;

/// Error types and handling for the pyseed application
pub mod error;

/// End-to-end generation flow
pub mod generator;

pub mod logger;

/// Renders the output tree and writes it to disk
pub mod materializer;

/// External tool steps and the runner that executes them
pub mod orchestrator;

/// User input and interaction handling
pub mod prompt;

/// Per-project-type template table
pub mod registry;

/// Template rendering with MiniJinja
pub mod renderer;

/// Project name to Python identifier
pub mod sanitize;
