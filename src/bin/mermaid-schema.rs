//! Mermaid Schema CLI
//!
//! Command-line interface for turning JSON/YAML schemas into Mermaid class diagrams.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use mermaid_schema::{generate, DiagramError, PreferenceOverrides, Preferences};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mermaid-schema")]
#[command(about = "Generate Mermaid class diagrams from JSON/YAML schemas")]
#[command(version)]
struct Cli {
    /// Schema files or directories (searched recursively for .json/.yaml/.yml)
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Output file (stdout if not specified)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Preferences file (JSON or YAML, camelCase keys)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Render arrays of objects and refs as relations
    #[arg(long, action = clap::ArgAction::Set)]
    arrays_as_relation: Option<bool>,

    /// Enum rendering: inline, note, or class
    #[arg(long)]
    enum_style: Option<String>,

    /// Singularize array field names
    #[arg(long, action = clap::ArgAction::Set)]
    singularize: Option<bool>,

    /// Show properties inherited through `extends`
    #[arg(long)]
    show_inherited: bool,

    /// Required field marker: plus, none, or suffix_q
    #[arg(long)]
    required_style: Option<String>,

    /// allOf handling: merge, inherit, or compose
    #[arg(long)]
    all_of_mode: Option<String>,

    /// Omit the `classDiagram` header line
    #[arg(long)]
    no_header: bool,

    /// Only log errors
    #[arg(long, short, conflicts_with = "verbose")]
    quiet: bool,

    /// Log loading and reference resolution
    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    /// Flags given on the command line, as overrides.
    fn overrides(&self) -> PreferenceOverrides {
        PreferenceOverrides {
            arrays_as_relation: self.arrays_as_relation,
            enum_style: self.enum_style.clone(),
            use_english_singularizer: self.singularize,
            show_inherited_fields: self.show_inherited.then_some(true),
            required_field_style: self.required_style.clone(),
            all_of_mode: self.all_of_mode.clone(),
            no_class_diagram_header: self.no_header.then_some(true),
        }
    }

    fn preferences(&self) -> Result<Preferences, DiagramError> {
        let mut prefs = Preferences::default();
        if let Some(path) = &self.config {
            prefs = prefs.apply(&PreferenceOverrides::from_file(path)?)?;
        }
        prefs.apply(&self.overrides())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(cli: &Cli) {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<(), u8> {
    let prefs = cli.preferences().map_err(report)?;
    let diagram = generate(&cli.paths, &prefs).map_err(report)?;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &diagram).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => print!("{}", diagram),
    }
    Ok(())
}

fn report(e: DiagramError) -> u8 {
    eprintln!("Error: {}", e);
    e.exit_code() as u8
}
