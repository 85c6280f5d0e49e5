#![deny(missing_docs)]

//! # Compile Command
//!
//! Pipeline: discover sources -> compile document -> render -> write.
//!
//! Nothing is written unless the whole document compiles.

use crate::error::CliResult;
use crate::project::discover;
use std::fs;
use std::path::PathBuf;
use tinyspec_core::{CompileOptions, Document};
use tracing::info;

/// Arguments shared by the `yaml` and `json` commands.
#[derive(clap::Args, Debug, Clone)]
pub struct CompileArgs {
    /// Directory searched for `header.yaml` and `*.tinyspec` sources.
    #[clap(long, env = "TINYSPEC_SRC", default_value = ".")]
    pub src: PathBuf,

    /// Output file (defaults to `swagger.yaml` / `swagger.json`).
    #[clap(long, short)]
    pub output: Option<PathBuf>,

    /// Widen optional properties so that they also accept `null`.
    #[clap(long, env = "TINYSPEC_ADD_NULLS")]
    pub add_nulls: bool,

    /// Print the document instead of writing a file.
    #[clap(long)]
    pub stdout: bool,
}

/// Rendering format of the output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// YAML output.
    Yaml,
    /// Pretty-printed JSON output.
    Json,
}

impl OutputFormat {
    /// File written when no `--output` is given.
    pub fn default_file_name(self) -> &'static str {
        match self {
            OutputFormat::Yaml => "swagger.yaml",
            OutputFormat::Json => "swagger.json",
        }
    }

    fn render(self, document: &Document) -> CliResult<String> {
        let rendered = match self {
            OutputFormat::Yaml => document.to_yaml()?,
            OutputFormat::Json => document.to_json()?,
        };
        Ok(rendered)
    }
}

/// Compiles the project and returns the rendered document.
pub fn render(args: &CompileArgs, format: OutputFormat) -> CliResult<String> {
    let sources = discover(&args.src)?;
    let options = CompileOptions::default().with_add_nulls(args.add_nulls);
    let document = Document::compile(
        &sources.header,
        &sources.models,
        &sources.endpoints,
        &options,
    )?;
    format.render(&document)
}

/// Executes the command.
///
/// # Arguments
///
/// * `args` - Command arguments.
/// * `format` - Output format selected by the subcommand.
pub fn execute(args: &CompileArgs, format: OutputFormat) -> CliResult<()> {
    let rendered = render(args, format)?;

    if args.stdout {
        print!("{}", rendered);
        return Ok(());
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format.default_file_name()));
    fs::write(&output, rendered)?;
    info!(output = ?output, "wrote document");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_project(root: &Path) {
        fs::write(
            root.join("header.yaml"),
            "swagger: '2.0'\ninfo:\n  title: Demo\n  version: 1.0.0\n",
        )
        .unwrap();
        fs::write(root.join("models.tinyspec"), "Widget {name: s, count?: i}").unwrap();
        fs::write(
            root.join("endpoints.tinyspec"),
            "Widgets:\nGET /widgets/:id\n=> {widget: Widget}",
        )
        .unwrap();
    }

    fn args(src: &Path, output: PathBuf) -> CompileArgs {
        CompileArgs {
            src: src.to_path_buf(),
            output: Some(output),
            add_nulls: false,
            stdout: false,
        }
    }

    #[test]
    fn test_writes_json_document() {
        let dir = tempdir().unwrap();
        write_project(dir.path());
        let output = dir.path().join("out.json");

        execute(&args(dir.path(), output.clone()), OutputFormat::Json).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(value["swagger"], "2.0");
        assert_eq!(value["tags"][0]["name"], "Widgets");
        assert_eq!(value["definitions"]["Widget"]["required"][0], "name");
        assert!(value["paths"]["/widgets/{id}"]["get"].is_object());
    }

    #[test]
    fn test_writes_yaml_document_with_nulls() {
        let dir = tempdir().unwrap();
        write_project(dir.path());
        let output = dir.path().join("out.yaml");
        let mut args = args(dir.path(), output.clone());
        args.add_nulls = true;

        execute(&args, OutputFormat::Yaml).unwrap();

        let value: serde_json::Value =
            serde_yaml::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(
            value["definitions"]["Widget"]["properties"]["count"]["type"],
            serde_json::json!(["integer", "null"])
        );
    }

    #[test]
    fn test_failed_compile_writes_nothing() {
        let dir = tempdir().unwrap();
        write_project(dir.path());
        fs::write(dir.path().join("endpoints.tinyspec"), "$CRUX /widgets").unwrap();
        let output = dir.path().join("out.yaml");

        assert!(execute(&args(dir.path(), output.clone()), OutputFormat::Yaml).is_err());
        assert!(!output.exists());
    }
}
