//! Tasklang CLI - Command-line interface for the tasklang parser
//!
//! Reads s-expression source from a file or stdin and prints the generic
//! values, the typed AST, or a per-form check report.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tasklang::{OutputConfig, OutputFormat, reader, render, render_value, transform};

#[derive(Parser)]
#[command(name = "tasklang")]
#[command(about = "Parse tasklang s-expressions into a typed AST", long_about = None)]
struct Cli {
    /// JSON file holding an output configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format (overrides the configuration file)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Single-line output
    #[arg(long)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the AST for every form
    Parse {
        /// Source file, or `-` for stdin
        input: PathBuf,
    },

    /// Report whether every form transforms cleanly
    Check {
        /// Source file, or `-` for stdin
        input: PathBuf,
    },

    /// Print the generic values without transforming them
    Read {
        /// Source file, or `-` for stdin
        input: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => OutputConfig::load(path)?,
        None => OutputConfig::default(),
    };
    if let Some(format) = cli.format {
        config.format = format;
    }
    if cli.compact {
        config.pretty = false;
    }

    match cli.command {
        Commands::Parse { input } => {
            let source = read_source(&input)?;
            for node in tasklang::parse_all(&source)? {
                println!("{}", render(&node, &config)?);
            }
        }

        Commands::Check { input } => {
            let source = read_source(&input)?;
            let forms = reader::read_all(&source)
                .with_context(|| format!("reading {}", input.display()))?;

            let mut failures = 0;
            for (idx, form) in forms.iter().enumerate() {
                match transform(form) {
                    Ok(_) => println!("form {}: ok", idx + 1),
                    Err(err) => {
                        failures += 1;
                        println!("form {}: {}", idx + 1, err);
                    }
                }
            }

            if failures > 0 {
                bail!("{} of {} forms failed to parse", failures, forms.len());
            }
        }

        Commands::Read { input } => {
            let source = read_source(&input)?;
            let forms = reader::read_all(&source)
                .with_context(|| format!("reading {}", input.display()))?;
            for form in &forms {
                println!("{}", render_value(form, &config)?);
            }
        }
    }

    Ok(())
}

fn read_source(input: &Path) -> anyhow::Result<String> {
    if input == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))
}
