//! Simple harness example: load a harness document and print its BOM and DOT graph.

use harnessgraph::prelude::*;
use std::path::Path;

fn main() -> Result<(), HarnessError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/demo_harness.json".to_string());
    let path = Path::new(&path);

    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        eprintln!("Usage: cargo run --example simple_harness [path/to/harness.json]");
        std::process::exit(1);
    }

    let harness = harnessgraph::load_harness(path)?;
    if let Some(title) = &harness.metadata.title {
        println!("{}", title);
        println!();
    }

    println!("Bill of materials:");
    for row in harness.bom().rows() {
        let unit = row.unit.as_deref().unwrap_or("");
        println!(
            "  {:>3}  {:>6} {:<2} {}  [{}]",
            row.id,
            row.qty,
            unit,
            row.description,
            row.designators.join(", ")
        );
    }
    println!();

    let graph = harness.graph(&Iec60757Colors)?;
    println!(
        "Graph: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    println!("{}", graph.to_dot());
    Ok(())
}
