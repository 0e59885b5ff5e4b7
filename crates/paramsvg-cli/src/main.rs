//! paramsvg: command-line access to parametric SVG extraction and merging.
//!
//! Runs the same core as the editor's worker on files or stdin. Useful
//! for:
//!
//! - Inspecting the variables a drawing declares
//! - Scripting bulk edits of `<param>` values before upload
//! - Normalizing drawings (namespaces, `<defs>`, indentation)
//!
//! # Usage
//!
//! ```text
//! paramsvg extract drawing.svg
//! paramsvg merge drawing.svg --var width=100 --var height=50 -o out.svg
//! paramsvg fmt - < drawing.svg
//! ```
//!
//! Set `RUST_LOG=debug` for diagnostics, including the parser's reason
//! when a merge is rejected.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use paramsvg_core::codec::DEFAULT_INDENT;
use paramsvg_core::{Layout, MergeOptions, Merger, Variable};

/// Extract and merge the variables of parametric SVG drawings.
#[derive(Parser)]
#[command(name = "paramsvg", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the variables declared in a drawing as JSON.
    Extract {
        /// Input drawing, or `-` for stdin.
        input: PathBuf,
    },

    /// Write variables into a drawing's `<defs>`.
    Merge {
        /// Input drawing, or `-` for stdin.
        input: PathBuf,

        /// Variable binding as `NAME=VALUE`. May be repeated; applied
        /// in order after `--variables-json`.
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_variable)]
        vars: Vec<Variable>,

        /// Variables as a JSON array of `{"name", "value"}` objects.
        #[arg(long)]
        variables_json: Option<String>,

        /// Do not add missing `xmlns` / `xmlns:parametric` declarations.
        #[arg(long)]
        no_namespaces: bool,

        /// Write the markup without re-indenting it.
        #[arg(long, conflicts_with = "indent")]
        compact: bool,

        /// Spaces per indentation level.
        #[arg(long)]
        indent: Option<usize>,

        /// Full merge options as a JSON string.
        ///
        /// When provided, `--no-namespaces`, `--compact` and `--indent`
        /// are ignored. The JSON must be a valid `MergeOptions`
        /// serialization.
        #[arg(long)]
        options_json: Option<String>,

        /// Print the `{ payload, error }` result as JSON instead of the
        /// bare markup.
        #[arg(long)]
        json: bool,

        /// Write the payload to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Pretty-print a drawing.
    Fmt {
        /// Input drawing, or `-` for stdin.
        input: PathBuf,

        /// Spaces per indentation level.
        #[arg(long, default_value_t = DEFAULT_INDENT)]
        indent: usize,
    },
}

/// Parse a `NAME=VALUE` argument. The value may itself contain `=`.
fn parse_variable(arg: &str) -> Result<Variable, String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{arg}`"))?;
    if name.is_empty() {
        return Err(format!("variable name is empty in `{arg}`"));
    }
    Ok(Variable::new(name, value))
}

/// Build [`MergeOptions`] from CLI flags.
///
/// If `--options-json` is provided, the JSON is parsed directly and the
/// individual layout flags are ignored.
fn options_from_cli(
    options_json: Option<&str>,
    no_namespaces: bool,
    compact: bool,
    indent: Option<usize>,
) -> Result<MergeOptions, String> {
    if let Some(json) = options_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --options-json: {e}"));
    }

    let layout = if compact {
        Layout::Compact
    } else {
        Layout::Pretty {
            indent: indent.unwrap_or(DEFAULT_INDENT),
        }
    };
    Ok(MergeOptions {
        complete_namespaces: !no_namespaces,
        layout,
    })
}

/// Collect variables from `--variables-json` followed by each `--var`.
fn variables_from_cli(variables_json: Option<&str>, vars: &[Variable]) -> Result<Vec<Variable>, String> {
    let mut variables: Vec<Variable> = match variables_json {
        Some(json) => serde_json::from_str(json)
            .map_err(|e| format!("Error parsing --variables-json: {e}"))?,
        None => Vec::new(),
    };
    variables.extend_from_slice(vars);
    Ok(variables)
}

fn read_input(input: &Path) -> Result<String, String> {
    if input == Path::new("-") {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .map_err(|e| format!("Error reading stdin: {e}"))?;
        Ok(source)
    } else {
        std::fs::read_to_string(input).map_err(|e| format!("Error reading {}: {e}", input.display()))
    }
}

fn write_output(output: Option<&Path>, contents: &str) -> Result<(), String> {
    match output {
        Some(path) => {
            std::fs::write(path, contents).map_err(|e| format!("Error writing {}: {e}", path.display()))?;
            log::info!("wrote {} bytes to {}", contents.len(), path.display());
            Ok(())
        }
        None => {
            print!("{contents}");
            Ok(())
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, String> {
    match cli.command {
        Command::Extract { input } => {
            let source = read_input(&input)?;
            let extracted = paramsvg_core::extract(&source);
            let json = serde_json::to_string_pretty(&extracted.variables)
                .map_err(|e| format!("Error encoding variables: {e}"))?;
            println!("{json}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Merge {
            input,
            vars,
            variables_json,
            no_namespaces,
            compact,
            indent,
            options_json,
            json,
            output,
        } => {
            let options = options_from_cli(options_json.as_deref(), no_namespaces, compact, indent)?;
            let variables = variables_from_cli(variables_json.as_deref(), &vars)?;
            let source = read_input(&input)?;

            let contents = Merger::with_options(options).file_contents(&source, &variables);
            if json {
                let encoded = serde_json::to_string_pretty(&contents)
                    .map_err(|e| format!("Error encoding result: {e}"))?;
                write_output(output.as_deref(), &(encoded + "\n"))?;
                return Ok(if contents.error.is_some() {
                    ExitCode::FAILURE
                } else {
                    ExitCode::SUCCESS
                });
            }

            match contents.into_result() {
                Ok(payload) => {
                    write_output(output.as_deref(), &payload)?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(report) => {
                    eprintln!("{}", report.message);
                    eprintln!("{}: {}", report.button_text, report.button_url);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Fmt { input, indent } => {
            let source = read_input(&input)?;
            let formatted = paramsvg_core::format(&source, indent)
                .map_err(|e| format!("Error formatting {}: {e}", input.display()))?;
            print!("{formatted}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}
