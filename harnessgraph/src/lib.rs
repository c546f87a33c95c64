//! harnessgraph - wiring harness model, BOM and diagram description library
//!
//! This library models an electrical wiring harness (connectors, cables,
//! bundles, mates) and derives a merged bill of materials and a Graphviz
//! graph description from it.
//!
//! # Quick Start
//!
//! ```
//! use harnessgraph::{CableSpec, ConnectorSpec, Harness, Iec60757Colors};
//!
//! let mut harness = Harness::default();
//! harness
//!     .add_connector("X1", ConnectorSpec::with_pincount(2).with_pinlabels(["GND", "VCC"]))
//!     .unwrap();
//! harness.add_connector("X2", ConnectorSpec::with_pincount(2)).unwrap();
//! harness
//!     .add_cable("W1", CableSpec::default().with_colors(["RD", "BK"]))
//!     .unwrap();
//! harness
//!     .connect(Some(("X1", "GND".into())), ("W1", "RD".into()), Some(("X2", 1u32.into())))
//!     .unwrap();
//!
//! for row in harness.bom().rows() {
//!     println!("{} x {} ({})", row.qty, row.description, row.designators.join(", "));
//! }
//! let dot = harness.graph(&Iec60757Colors).unwrap().to_dot();
//! assert!(dot.contains("\"W1\":w1:e -- \"X2\":p1l:w"));
//! ```
//!
//! # Features
//!
//! - **Reference resolution**: pins by id or label, wires by id, color or label
//! - **BOM aggregation**: content-hash merging with designator sets
//! - **Graph description**: petgraph-backed DOT output for Graphviz

pub mod bom;
pub mod config;
pub mod error;
pub mod graph;
pub mod harness;
pub mod model;
pub mod render;
pub mod resolve;

// Re-export main types
pub use bom::{Bom, BomCategory, BomEntry, BomItem, BomRow};
pub use config::{HarnessDocument, Metadata, Options, Tweak};
pub use error::{Ambiguity, HarnessError, KeySpace};
pub use graph::{
    build_graph_description, ColorTranslator, GraphDescription, Iec60757Colors, RenderParams,
};
pub use harness::Harness;
pub use model::{
    AdditionalComponent, Arrow, Cable, CableSpec, Connector, ConnectorSpec, Mate, PinEndpoint,
    QtyMultiplier, Reference,
};
pub use render::{write_outputs, GraphvizCommand, ImageFormat, LayoutEngine, OutputFormat};

/// Load a harness document from a JSON file and assemble it.
pub fn load_harness(path: &std::path::Path) -> Result<Harness, HarnessError> {
    HarnessDocument::from_path(path)?.build()
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        CableSpec, ConnectorSpec, Harness, HarnessDocument, HarnessError, Iec60757Colors,
        Reference,
    };
}
