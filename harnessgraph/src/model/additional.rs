use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use super::{join_description, BomHash, PartNumbers, QtyMultiplier};

fn default_qty() -> f64 {
    1.0
}

/// A BOM-only part with no geometry of its own: heatshrink, labels, cable
/// ties. Either attached to a connector or cable, or free-standing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalComponent {
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default = "default_qty")]
    pub qty: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qty_multiplier: Option<QtyMultiplier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Carried for external formatters; never merged into BOM designators.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub designators: Vec<String>,
    #[serde(default)]
    pub ignore_in_bom: bool,
    #[serde(flatten)]
    pub part: PartNumbers,
}

impl AdditionalComponent {
    pub fn new(component_type: impl Into<String>) -> Self {
        Self {
            component_type: component_type.into(),
            subtype: None,
            qty: default_qty(),
            qty_multiplier: None,
            unit: None,
            designators: Vec::new(),
            ignore_in_bom: false,
            part: PartNumbers::default(),
        }
    }

    pub fn with_qty(mut self, qty: f64) -> Self {
        self.qty = qty;
        self
    }

    pub fn with_multiplier(mut self, multiplier: QtyMultiplier) -> Self {
        self.qty_multiplier = Some(multiplier);
        self
    }

    pub fn with_pn(mut self, pn: impl Into<String>) -> Self {
        self.part.pn = Some(pn.into());
        self
    }

    pub fn ignored(mut self) -> Self {
        self.ignore_in_bom = true;
        self
    }

    pub fn description(&self) -> String {
        join_description([
            Some(Cow::Borrowed(self.component_type.as_str())),
            self.subtype.as_deref().map(Cow::Borrowed),
        ])
    }

    pub fn bom_hash(&self) -> BomHash {
        BomHash {
            description: self.description(),
            unit: self.unit.clone(),
            part: self.part.clone(),
        }
    }

    /// Quantity after applying the parent's multiplier value.
    pub fn bom_qty(&self, multiplier_value: f64) -> f64 {
        match self.qty_multiplier {
            Some(_) => self.qty * multiplier_value,
            None => self.qty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_defaults() {
        let c: AdditionalComponent =
            serde_json::from_str(r#"{"type": "Cable tie", "pn": "CT-100"}"#).unwrap();
        assert_eq!(c.qty, 1.0);
        assert_eq!(c.part.pn.as_deref(), Some("CT-100"));
        assert!(!c.ignore_in_bom);
    }

    #[test]
    fn test_multiplier_only_applies_when_set() {
        let plain = AdditionalComponent::new("Label").with_qty(2.0);
        assert_eq!(plain.bom_qty(8.0), 2.0);
        let scaled = plain.with_multiplier(QtyMultiplier::Pincount);
        assert_eq!(scaled.bom_qty(8.0), 16.0);
    }
}
