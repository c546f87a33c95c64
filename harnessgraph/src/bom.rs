//! BOM Aggregator
//!
//! Walks a harness and merges every orderable part into line items keyed by
//! its content hash. Merging adds quantities and unions designators.
//! The mapping is rebuilt from scratch on every call to [`Bom::populate`];
//! it is never patched incrementally.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;

use crate::error::HarnessError;
use crate::harness::Harness;
use crate::model::{AdditionalComponent, BomHash, Cable, Connector, PartNumbers, AUTOGENERATED_PREFIX};

const TSV_HEADER: [&str; 11] = [
    "Id",
    "Description",
    "Qty",
    "Unit",
    "Designators",
    "P/N",
    "Manufacturer",
    "MPN",
    "Supplier",
    "SPN",
    "Category",
];

/// Category label of a BOM line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BomCategory {
    Connector,
    ConnectorAdditional,
    Cable,
    CableAdditional,
    Wire,
    WireAdditional,
    Additional,
}

impl BomCategory {
    /// Category for an additional component attached to a part of this category.
    pub fn additional(self) -> Self {
        match self {
            BomCategory::Connector | BomCategory::ConnectorAdditional => {
                BomCategory::ConnectorAdditional
            }
            BomCategory::Cable | BomCategory::CableAdditional => BomCategory::CableAdditional,
            BomCategory::Wire | BomCategory::WireAdditional => BomCategory::WireAdditional,
            BomCategory::Additional => BomCategory::Additional,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BomCategory::Connector => "connector",
            BomCategory::ConnectorAdditional => "connector_additional",
            BomCategory::Cable => "cable",
            BomCategory::CableAdditional => "cable_additional",
            BomCategory::Wire => "wire",
            BomCategory::WireAdditional => "wire_additional",
            BomCategory::Additional => "additional",
        }
    }
}

impl fmt::Display for BomCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Anything the aggregator can visit.
#[derive(Debug, Clone, Copy)]
pub enum BomItem<'a> {
    Connector(&'a Connector),
    Cable(&'a Cable),
    Additional(&'a AdditionalComponent),
}

impl<'a> BomItem<'a> {
    pub fn category(&self) -> BomCategory {
        match self {
            BomItem::Connector(_) => BomCategory::Connector,
            BomItem::Cable(cable) if cable.is_bundle() => BomCategory::Wire,
            BomItem::Cable(_) => BomCategory::Cable,
            BomItem::Additional(_) => BomCategory::Additional,
        }
    }

    pub fn ignore_in_bom(&self) -> bool {
        match self {
            BomItem::Connector(c) => c.ignore_in_bom,
            BomItem::Cable(c) => c.ignore_in_bom,
            BomItem::Additional(a) => a.ignore_in_bom,
        }
    }
}

/// One merged BOM line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BomEntry {
    pub qty: f64,
    pub designators: BTreeSet<String>,
    pub category: BomCategory,
}

/// Flattened BOM line for external formatters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BomRow {
    pub id: usize,
    pub description: String,
    pub qty: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub designators: Vec<String>,
    #[serde(flatten)]
    pub part: PartNumbers,
    pub category: BomCategory,
}

/// Merged bill of materials keyed by content hash.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bom {
    entries: BTreeMap<BomHash, BomEntry>,
}

impl Bom {
    /// Visit all connectors, then all cables, then all free-standing items.
    pub fn populate(harness: &Harness) -> Self {
        let mut bom = Bom::default();
        for connector in harness.connectors() {
            bom.add_item(BomItem::Connector(connector));
        }
        for cable in harness.cables() {
            bom.add_item(BomItem::Cable(cable));
        }
        for item in harness.additional_bom_items() {
            bom.add_item(BomItem::Additional(item));
        }

        tracing::debug!("Populated BOM with {} entries", bom.len());
        for (hash, entry) in &bom.entries {
            tracing::debug!(
                "  {} x {} [{}] {:?}",
                entry.qty,
                hash.description,
                entry.category,
                entry.designators
            );
        }
        bom
    }

    /// Add one item and everything attached to it.
    pub fn add_item(&mut self, item: BomItem<'_>) {
        if item.ignore_in_bom() {
            return;
        }
        let category = item.category();

        match item {
            BomItem::Connector(connector) => {
                let designator = Some(connector.designator.as_str());
                self.add(connector.bom_hash(), connector.bom_qty(), designator, category);
                for comp in connector.additional_components.iter().filter(|c| !c.ignore_in_bom) {
                    let multiplier = comp
                        .qty_multiplier
                        .map(|m| connector.multiplier_value(m))
                        .unwrap_or(1.0);
                    self.add(
                        comp.bom_hash(),
                        comp.bom_qty(multiplier),
                        designator,
                        category.additional(),
                    );
                }
            }
            BomItem::Cable(cable) => {
                let designator = Some(cable.designator.as_str());
                if cable.is_bundle() {
                    // A bundle is not orderable; its wires are.
                    for wire in &cable.wires {
                        self.add(cable.wire_bom_hash(wire), cable.bom_qty(), designator, category);
                    }
                } else {
                    self.add(cable.bom_hash(), cable.bom_qty(), designator, category);
                }
                for comp in cable.additional_components.iter().filter(|c| !c.ignore_in_bom) {
                    let multiplier = comp
                        .qty_multiplier
                        .map(|m| cable.multiplier_value(m))
                        .unwrap_or(1.0);
                    self.add(
                        comp.bom_hash(),
                        comp.bom_qty(multiplier),
                        designator,
                        category.additional(),
                    );
                }
            }
            BomItem::Additional(comp) => {
                self.add(comp.bom_hash(), comp.bom_qty(1.0), None, category);
            }
        }
    }

    /// Merge one line into the mapping. Autogenerated designators are
    /// dropped; the category of the most recent write wins.
    pub fn add(&mut self, hash: BomHash, qty: f64, designator: Option<&str>, category: BomCategory) {
        let entry = self.entries.entry(hash).or_insert_with(|| BomEntry {
            qty: 0.0,
            designators: BTreeSet::new(),
            category,
        });
        entry.qty += qty;
        if let Some(des) = designator {
            if !des.is_empty() && !des.starts_with(AUTOGENERATED_PREFIX) {
                entry.designators.insert(des.to_string());
            }
        }
        entry.category = category;
    }

    pub fn get(&self, hash: &BomHash) -> Option<&BomEntry> {
        self.entries.get(hash)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&BomHash, &BomEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lines ordered by category, then by content hash, numbered from 1.
    pub fn rows(&self) -> Vec<BomRow> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|(ha, ea), (hb, eb)| ea.category.cmp(&eb.category).then_with(|| ha.cmp(hb)));

        entries
            .into_iter()
            .enumerate()
            .map(|(i, (hash, entry))| {
                let mut designators: Vec<String> = entry.designators.iter().cloned().collect();
                designators.sort_by(|a, b| natord::compare(a, b));
                BomRow {
                    id: i + 1,
                    description: hash.description.clone(),
                    qty: round_qty(entry.qty),
                    unit: hash.unit.clone(),
                    designators,
                    part: hash.part.clone(),
                    category: entry.category,
                }
            })
            .collect()
    }

    /// Write the rows as tab-separated values with a header line.
    ///
    /// Fields containing tabs, quotes or line breaks are quoted, never altered.
    pub fn write_tsv<W: io::Write>(&self, writer: W) -> Result<(), HarnessError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);
        writer.write_record(TSV_HEADER)?;
        for row in self.rows() {
            writer.write_record([
                row.id.to_string(),
                row.description,
                row.qty.to_string(),
                row.unit.unwrap_or_default(),
                row.designators.join(", "),
                row.part.pn.unwrap_or_default(),
                row.part.manufacturer.unwrap_or_default(),
                row.part.mpn.unwrap_or_default(),
                row.part.supplier.unwrap_or_default(),
                row.part.spn.unwrap_or_default(),
                row.category.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_tsv(&self) -> Result<String, HarnessError> {
        let mut buf = Vec::new();
        self.write_tsv(&mut buf)?;
        String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
    }
}

/// Trim float noise from accumulated lengths.
fn round_qty(qty: f64) -> f64 {
    (qty * 1e6).round() / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CableSpec, ConnectorSpec, QtyMultiplier};

    fn hash(description: &str) -> BomHash {
        BomHash {
            description: description.to_string(),
            unit: None,
            part: PartNumbers::default(),
        }
    }

    #[test]
    fn test_merge_is_order_independent() {
        let mut first = Bom::default();
        first.add(hash("A"), 1.0, Some("X1"), BomCategory::Connector);
        first.add(hash("A"), 1.0, Some("X2"), BomCategory::Connector);
        first.add(hash("B"), 2.0, Some("X3"), BomCategory::Connector);

        let mut second = Bom::default();
        second.add(hash("A"), 1.0, Some("X1"), BomCategory::Connector);
        second.add(hash("B"), 2.0, Some("X3"), BomCategory::Connector);
        second.add(hash("A"), 1.0, Some("X2"), BomCategory::Connector);

        assert_eq!(first, second);
        let a = first.get(&hash("A")).unwrap();
        assert_eq!(a.qty, 2.0);
        assert_eq!(a.designators.len(), 2);
    }

    #[test]
    fn test_autogenerated_designators_are_hidden() {
        let mut bom = Bom::default();
        let auto = format!("{}W3", AUTOGENERATED_PREFIX);
        for _ in 0..3 {
            bom.add(hash("Ferrule"), 1.0, Some(auto.as_str()), BomCategory::Connector);
        }
        let entry = bom.get(&hash("Ferrule")).unwrap();
        assert_eq!(entry.qty, 3.0);
        assert!(entry.designators.is_empty());
    }

    #[test]
    fn test_latest_category_wins() {
        let mut bom = Bom::default();
        bom.add(hash("A"), 1.0, None, BomCategory::Connector);
        bom.add(hash("A"), 1.0, None, BomCategory::Additional);
        assert_eq!(bom.get(&hash("A")).unwrap().category, BomCategory::Additional);
    }

    #[test]
    fn test_bundle_yields_wires_only() {
        let cable = Cable::from_spec(
            "W1",
            CableSpec::bundle().with_colors(["RD", "BK", "RD"]).with_length(0.5),
        )
        .unwrap();
        let mut bom = Bom::default();
        bom.add_item(BomItem::Cable(&cable));

        assert!(bom.get(&cable.bom_hash()).is_none());
        assert_eq!(bom.len(), 2);
        let red = bom.get(&cable.wire_bom_hash(&cable.wires[0])).unwrap();
        assert_eq!(red.qty, 1.0);
        assert_eq!(red.category, BomCategory::Wire);
        assert!(red.designators.contains("W1"));
    }

    #[test]
    fn test_ignored_item_contributes_nothing() {
        let mut spec = ConnectorSpec::with_pincount(2)
            .with_additional_component(AdditionalComponent::new("Backshell"));
        spec.ignore_in_bom = true;
        let connector = Connector::from_spec("X1", spec).unwrap();
        let mut bom = Bom::default();
        bom.add_item(BomItem::Connector(&connector));
        assert!(bom.is_empty());
    }

    #[test]
    fn test_ignored_sub_component_skipped() {
        let spec = ConnectorSpec::with_pincount(2)
            .with_additional_component(AdditionalComponent::new("Backshell").ignored());
        let connector = Connector::from_spec("X1", spec).unwrap();
        let mut bom = Bom::default();
        bom.add_item(BomItem::Connector(&connector));
        assert_eq!(bom.len(), 1);
    }

    #[test]
    fn test_sub_component_category_and_multiplier() {
        let spec = ConnectorSpec::with_pincount(4).with_additional_component(
            AdditionalComponent::new("Crimp").with_multiplier(QtyMultiplier::Pincount),
        );
        let connector = Connector::from_spec("X1", spec).unwrap();
        let mut bom = Bom::default();
        bom.add_item(BomItem::Connector(&connector));

        let crimp = bom.get(&hash("Crimp")).unwrap();
        assert_eq!(crimp.qty, 4.0);
        assert_eq!(crimp.category, BomCategory::ConnectorAdditional);
        assert!(crimp.designators.contains("X1"));
    }

    #[test]
    fn test_free_standing_item_has_no_designator() {
        let mut item = AdditionalComponent::new("Cable tie").with_qty(10.0);
        item.designators = vec!["CT1".to_string()];
        let mut bom = Bom::default();
        bom.add_item(BomItem::Additional(&item));
        let entry = bom.get(&hash("Cable tie")).unwrap();
        assert_eq!(entry.qty, 10.0);
        assert_eq!(entry.category, BomCategory::Additional);
        assert!(entry.designators.is_empty());
    }

    #[test]
    fn test_rows_sorted_naturally() {
        let mut bom = Bom::default();
        for des in ["X10", "X2", "X1"] {
            bom.add(hash("Plug"), 1.0, Some(des), BomCategory::Connector);
        }
        bom.add(hash("Tie"), 0.1, None, BomCategory::Additional);
        bom.add(hash("Tie"), 0.2, None, BomCategory::Additional);
        let rows = bom.rows();
        assert_eq!(rows[0].designators, vec!["X1", "X2", "X10"]);
        assert_eq!(rows[1].qty, 0.3);
        assert_eq!(rows[1].id, 2);
    }

    #[test]
    fn test_tsv_has_header_and_rows() {
        let mut bom = Bom::default();
        bom.add(hash("Plug"), 2.0, Some("X1"), BomCategory::Connector);
        let tsv = bom.to_tsv().unwrap();
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Id\tDescription\tQty"));
        assert_eq!(lines[1], "1\tPlug\t2\t\tX1\t\t\t\t\t\tconnector");
    }

    #[test]
    fn test_tsv_keeps_tabs_and_newlines_in_fields() {
        let description = "Label \"A\"\tsleeve, line1\nline2";
        let mut bom = Bom::default();
        bom.add(hash(description), 1.0, None, BomCategory::Additional);
        let tsv = bom.to_tsv().unwrap();

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_reader(tsv.as_bytes());
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][1], description);
        assert_eq!(&records[0][10], "additional");
    }
}
