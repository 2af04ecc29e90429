//! Gloss CLI library
//!
//! This module contains the core CLI logic for the gloss documentation tool.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::info;

use gloss::{
    DocBuilder, GlossError,
    config::{AppConfig, OutputConfig, OutputFormat},
    source::FsTree,
};

/// Run the gloss CLI application
///
/// This resolves the requested type inside the module, renders the
/// documents and writes them to the output file, or to stdout when no
/// output file is given.
///
/// # Errors
///
/// Returns `GlossError` for:
/// - File I/O errors
/// - Configuration loading errors and invalid flags
/// - A missing or malformed go.mod
/// - Parse errors in the root file
/// - Constant checking errors in a documented package
pub fn run(args: &Args) -> Result<(), GlossError> {
    info!(
        module = args.module,
        file = args.file,
        name = args.name;
        "Documenting type"
    );

    let app_config = config::load_config(args.config.as_ref())?;
    let app_config = apply_overrides(app_config, args)?;

    let module_root = Path::new(&args.module);
    let root_file = module_relative(module_root, Path::new(&args.file));

    let builder = DocBuilder::new(app_config);
    let documents = builder.resolve(&FsTree::new(module_root), &root_file, &args.name)?;
    let rendered = builder.render(&documents, &args.name)?;

    match &args.output {
        Some(output) => {
            fs::write(output, rendered)?;
            info!(output_file = output, documents = documents.len(); "Documentation written");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Apply the command-line flags on top of the loaded configuration.
fn apply_overrides(config: AppConfig, args: &Args) -> Result<AppConfig, GlossError> {
    let format = match &args.format {
        Some(format) => format.parse::<OutputFormat>()?,
        None => config.output().format(),
    };
    let title = args
        .title
        .clone()
        .or_else(|| config.output().title().map(str::to_string));

    Ok(AppConfig::new(
        config.resolve().clone(),
        OutputConfig::new(format, title),
    ))
}

/// The root file relative to the module root.
///
/// Accepts paths that already include the module directory, as shell
/// completion produces them.
fn module_relative(module_root: &Path, file: &Path) -> PathBuf {
    file.strip_prefix(module_root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| file.to_path_buf())
}
