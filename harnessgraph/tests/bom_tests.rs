//! Integration tests for BOM aggregation

use harnessgraph::prelude::*;
use harnessgraph::{AdditionalComponent, BomCategory, QtyMultiplier};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn demo() -> Harness {
    harnessgraph::load_harness(&fixture_path("demo_harness.json")).expect("Fixture should load")
}

#[test]
fn test_fixture_bom_rows() {
    let rows = demo().bom().rows();
    let summary: Vec<(&str, f64, BomCategory)> = rows
        .iter()
        .map(|r| (r.description.as_str(), r.qty, r.category))
        .collect();

    assert_eq!(
        summary,
        vec![
            ("Connector, Ferrule, 1 pins", 2.0, BomCategory::Connector),
            ("Connector, Molex KK 254, female, 4 pins", 2.0, BomCategory::Connector),
            ("Crimp contact", 8.0, BomCategory::ConnectorAdditional),
            ("Cable, Serial, 4 x 0.25 mm2, shielded", 0.5, BomCategory::Cable),
            ("Heatshrink", 8.0, BomCategory::CableAdditional),
            ("Wire, 0.25 mm2, BK", 0.2, BomCategory::Wire),
            ("Wire, 0.25 mm2, RD", 0.2, BomCategory::Wire),
            ("Cable tie", 4.0, BomCategory::Additional),
        ]
    );
    let ids: Vec<usize> = rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, (1..=8).collect::<Vec<_>>());
}

#[test]
fn test_fixture_designators() {
    let rows = demo().bom().rows();
    let designators = |description: &str| {
        rows.iter()
            .find(|r| r.description == description)
            .map(|r| r.designators.clone())
            .unwrap()
    };

    assert!(
        designators("Connector, Ferrule, 1 pins").is_empty(),
        "Autogenerated designators should never appear"
    );
    assert_eq!(designators("Connector, Molex KK 254, female, 4 pins"), vec!["X1", "X2"]);
    assert_eq!(designators("Crimp contact"), vec!["X1", "X2"]);
    assert_eq!(designators("Wire, 0.25 mm2, BK"), vec!["B1"]);
    assert!(designators("Cable tie").is_empty());
}

#[test]
fn test_rebuild_reflects_new_connections() {
    let mut harness = Harness::default();
    harness
        .add_connector(
            "X1",
            ConnectorSpec::with_pincount(4)
                .with_additional_component(
                    AdditionalComponent::new("Seal").with_multiplier(QtyMultiplier::Populated),
                ),
        )
        .unwrap();
    harness.add_cable("W1", CableSpec::with_wirecount(2)).unwrap();

    let seal_qty = |h: &Harness| {
        h.bom()
            .rows()
            .into_iter()
            .find(|r| r.description == "Seal")
            .map(|r| r.qty)
    };
    assert_eq!(seal_qty(&harness), Some(0.0));

    harness
        .connect(Some(("X1", 1u32.into())), ("W1", 1u32.into()), None)
        .unwrap();
    harness
        .connect(Some(("X1", 3u32.into())), ("W1", 2u32.into()), None)
        .unwrap();
    assert_eq!(seal_qty(&harness), Some(2.0));
}

#[test]
fn test_connections_multiplier_counts_wires_not_mates() {
    let mut harness = Harness::default();
    harness
        .add_connector(
            "X1",
            ConnectorSpec::with_pincount(2).with_additional_component(
                AdditionalComponent::new("Terminal").with_multiplier(QtyMultiplier::Connections),
            ),
        )
        .unwrap();
    harness.add_connector("X2", ConnectorSpec::with_pincount(2)).unwrap();
    harness.add_cable("W1", CableSpec::with_wirecount(2)).unwrap();

    harness
        .connect(Some(("X1", 1u32.into())), ("W1", 1u32.into()), None)
        .unwrap();
    harness
        .connect(Some(("X1", 1u32.into())), ("W1", 2u32.into()), None)
        .unwrap();
    harness.add_mate_pin("X1", 2u32, "X2", 2u32, "==>").unwrap();

    let terminal = harness
        .bom()
        .rows()
        .into_iter()
        .find(|r| r.description == "Terminal")
        .unwrap();
    assert_eq!(terminal.qty, 2.0);
    assert_eq!(terminal.designators, vec!["X1"]);
}

#[test]
fn test_designators_sorted_naturally_and_unique() {
    let mut harness = Harness::default();
    for designator in ["X10", "X2", "X1"] {
        harness
            .add_connector(designator, ConnectorSpec::with_pincount(1).with_type("Pin header"))
            .unwrap();
    }
    let rows = harness.bom().rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].qty, 3.0);
    assert_eq!(rows[0].designators, vec!["X1", "X2", "X10"]);
}

#[test]
fn test_lengths_accumulate_per_unit() {
    let mut harness = Harness::default();
    harness
        .add_cable("W1", CableSpec::with_wirecount(2).with_gauge("AWG22").with_length(0.1))
        .unwrap();
    harness
        .add_cable("W2", CableSpec::with_wirecount(2).with_gauge("AWG22").with_length(0.2))
        .unwrap();
    let rows = harness.bom().rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].qty, 0.3);
    assert_eq!(rows[0].unit.as_deref(), Some("m"));
    assert_eq!(rows[0].designators, vec!["W1", "W2"]);
}

#[test]
fn test_tsv_export() {
    let tsv = demo().bom().to_tsv().unwrap();
    let lines: Vec<&str> = tsv.lines().collect();
    assert_eq!(lines.len(), 9);
    assert_eq!(
        lines[0],
        "Id\tDescription\tQty\tUnit\tDesignators\tP/N\tManufacturer\tMPN\tSupplier\tSPN\tCategory"
    );
    assert_eq!(
        lines[3],
        "3\tCrimp contact\t8\t\tX1, X2\tKK-CRIMP\t\t\t\t\tconnector_additional"
    );
}
