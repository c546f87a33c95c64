//! HarnessGraph CLI - wiring harness diagrams and bills of materials from the command line.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{CellAlignment, Table};
use harnessgraph::{
    write_outputs, BomRow, GraphvizCommand, Harness, HarnessDocument, HarnessError,
    Iec60757Colors, OutputFormat,
};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "harnessgraph")]
#[command(about = "Wiring harness diagram and BOM tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Log every registration, connection and BOM line to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a harness document and validate every connection
    Check {
        /// Path to a JSON harness document
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print the bill of materials
    Bom {
        /// Path to a JSON harness document
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: BomFormat,
    },

    /// Print the Graphviz DOT description
    Graph {
        /// Path to a JSON harness document
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },

    /// Write diagram and BOM files next to a common base path
    Render {
        /// Path to a JSON harness document
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output base path (defaults to FILE without its extension)
        #[arg(short, long, value_name = "BASE")]
        output: Option<PathBuf>,

        /// Comma-separated output formats: png, svg, gv, tsv, csv, pdf, html
        #[arg(short, long, value_delimiter = ',', default_value = "png,svg,tsv")]
        format: Vec<OutputFormat>,

        /// Graphviz program used for png/svg
        #[arg(long, value_name = "PROGRAM", default_value = "dot")]
        dot: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum BomFormat {
    /// Human-readable table
    Human,
    /// JSON rows
    Json,
    /// Tab-separated values
    Tsv,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match cli.command {
        Commands::Check { file } => handle_check(&file),
        Commands::Bom { file, format } => handle_bom(&file, format),
        Commands::Graph { file, output } => handle_graph(&file, output.as_deref()),
        Commands::Render {
            file,
            output,
            format,
            dot,
        } => handle_render(&file, output, &format, dot),
    };

    process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn load(file: &Path) -> anyhow::Result<Harness> {
    let document = HarnessDocument::from_path(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let harness = document
        .build()
        .with_context(|| format!("invalid harness in {}", file.display()))?;
    Ok(harness)
}

/// Print the error chain and return the failing exit code.
fn report(err: anyhow::Error) -> i32 {
    eprintln!("Error: {:#}", err);
    let designator = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<HarnessError>())
        .and_then(HarnessError::designator);
    if let Some(designator) = designator {
        eprintln!("  in component {}", designator);
    }
    1
}

fn bom_table(rows: &[BomRow]) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
    table.set_header(vec!["Id", "Qty", "Unit", "Description", "Designators"]);
    for row in rows {
        table.add_row(vec![
            row.id.to_string(),
            row.qty.to_string(),
            row.unit.clone().unwrap_or_default(),
            row.description.clone(),
            row.designators.join(", "),
        ]);
    }
    for index in [0, 1] {
        if let Some(column) = table.column_mut(index) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
    table
}

fn handle_check(file: &Path) -> i32 {
    match load(file) {
        Ok(harness) => {
            let connections: usize = harness.cables().iter().map(|c| c.connections.len()).sum();
            println!(
                "OK: {} connectors, {} cables, {} connections, {} mates",
                harness.connectors().len(),
                harness.cables().len(),
                connections,
                harness.mates().len()
            );
            0
        }
        Err(e) => report(e),
    }
}

fn handle_bom(file: &Path, format: BomFormat) -> i32 {
    let harness = match load(file) {
        Ok(harness) => harness,
        Err(e) => return report(e),
    };
    let bom = harness.bom();

    match format {
        BomFormat::Human => {
            if let Some(title) = &harness.metadata.title {
                println!("{}", title);
                println!();
            }
            println!("{}", bom_table(&bom.rows()));
        }
        BomFormat::Json => match serde_json::to_string_pretty(&bom.rows()) {
            Ok(json) => println!("{}", json),
            Err(e) => return report(e.into()),
        },
        BomFormat::Tsv => {
            if let Err(e) = bom.write_tsv(std::io::stdout().lock()) {
                return report(e.into());
            }
        }
    }
    0
}

fn handle_graph(file: &Path, output: Option<&Path>) -> i32 {
    let result = load(file).and_then(|harness| {
        let dot = harness.graph(&Iec60757Colors)?.to_dot();
        match output {
            Some(path) => std::fs::write(path, dot)
                .with_context(|| format!("failed to write {}", path.display())),
            None => {
                print!("{}", dot);
                Ok(())
            }
        }
    });
    match result {
        Ok(()) => 0,
        Err(e) => report(e),
    }
}

fn handle_render(file: &Path, output: Option<PathBuf>, formats: &[OutputFormat], dot: PathBuf) -> i32 {
    let base = output.unwrap_or_else(|| file.with_extension(""));
    let engine = GraphvizCommand::new(dot);

    let result = load(file).and_then(|harness| {
        write_outputs(&harness, &engine, &Iec60757Colors, &base, formats)
            .with_context(|| format!("failed to write outputs for {}", base.display()))
    });
    match result {
        Ok(outcome) => {
            for path in &outcome.written {
                println!("Wrote {}", path.display());
            }
            for format in &outcome.skipped {
                println!("{} output is not yet supported", format.as_str().to_uppercase());
            }
            0
        }
        Err(e) => report(e),
    }
}
