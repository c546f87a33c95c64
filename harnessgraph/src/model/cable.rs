use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

use super::{
    join_description, AdditionalComponent, BomHash, PartNumbers, PinId, QtyMultiplier, WireId,
    AUTOGENERATED_PREFIX,
};
use crate::error::HarnessError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CableCategory {
    #[default]
    Cable,
    /// Loose wires grouped for drawing only; each wire is sourced on its own.
    Bundle,
}

/// Cable declaration as written in a harness description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CableSpec {
    pub category: CableCategory,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub cable_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gauge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_unit: Option<String>,
    pub shield: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bgcolor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wirecount: Option<usize>,
    pub colors: Vec<String>,
    pub wirelabels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_name: Option<bool>,
    pub ignore_in_bom: bool,
    #[serde(flatten)]
    pub part: PartNumbers,
    pub additional_components: Vec<AdditionalComponent>,
}

impl CableSpec {
    pub fn with_wirecount(wirecount: usize) -> Self {
        Self {
            wirecount: Some(wirecount),
            ..Default::default()
        }
    }

    pub fn bundle() -> Self {
        Self {
            category: CableCategory::Bundle,
            ..Default::default()
        }
    }

    pub fn with_colors<S: Into<String>>(mut self, colors: impl IntoIterator<Item = S>) -> Self {
        self.colors = colors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_wirelabels<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.wirelabels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_length(mut self, length: f64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_gauge(mut self, gauge: impl Into<String>) -> Self {
        self.gauge = Some(gauge.into());
        self
    }

    pub fn with_additional_component(mut self, component: AdditionalComponent) -> Self {
        self.additional_components.push(component);
        self
    }
}

/// Ordered list of named colors making up one wire's insulation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct WireColor(pub Vec<String>);

impl WireColor {
    /// Splits a color code into its parts: `"GN:YE"` and `"GNYE"` both give
    /// `["GN", "YE"]`; anything else (`"RD"`, `"#FF0000"`, `"red"`) is one color.
    pub fn parse(code: &str) -> Self {
        let code = code.trim();
        if code.is_empty() {
            return WireColor(Vec::new());
        }
        if code.contains(':') {
            return WireColor(
                code.split(':')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }
        let is_code_run = code.len() > 2
            && code.len() % 2 == 0
            && code.chars().all(|c| c.is_ascii_uppercase());
        if is_code_run {
            let parts = code
                .as_bytes()
                .chunks(2)
                .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                .collect();
            return WireColor(parts);
        }
        WireColor(vec![code.to_string()])
    }

    pub fn is_multicolor(&self) -> bool {
        self.0.len() > 1
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for WireColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(""))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Wire {
    pub id: WireId,
    /// Color code exactly as declared; this is the key wire references match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_code: Option<String>,
    pub color: WireColor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A pin on a registered connector, referenced by designator and pin id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PinEndpoint {
    pub connector: String,
    pub pin: PinId,
}

impl PinEndpoint {
    pub fn new(connector: impl Into<String>, pin: PinId) -> Self {
        Self {
            connector: connector.into(),
            pin,
        }
    }
}

impl fmt::Display for PinEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.connector, self.pin)
    }
}

/// One hop of a wire through the diagram. Either end may be open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CableConnection {
    pub from: Option<PinEndpoint>,
    pub via: WireId,
    pub to: Option<PinEndpoint>,
}

/// A registered cable or bundle.
#[derive(Debug, Clone, Serialize)]
pub struct Cable {
    pub designator: String,
    pub category: CableCategory,
    pub cable_type: Option<String>,
    pub gauge: Option<String>,
    pub length: Option<f64>,
    pub length_unit: String,
    pub shield: bool,
    pub color: Option<String>,
    pub bgcolor: Option<String>,
    pub notes: Option<String>,
    pub wires: Vec<Wire>,
    pub connections: Vec<CableConnection>,
    pub show_name: bool,
    pub ignore_in_bom: bool,
    pub part: PartNumbers,
    pub additional_components: Vec<AdditionalComponent>,
}

impl Cable {
    pub fn from_spec(designator: &str, spec: CableSpec) -> Result<Self, HarnessError> {
        let wirecount = Self::derive_wirecount(designator, &spec)?;

        if let Some(length) = spec.length {
            if !length.is_finite() || length < 0.0 {
                return Err(HarnessError::invalid(
                    designator,
                    format!("invalid length {}", length),
                ));
            }
        }

        for component in &spec.additional_components {
            let Some(multiplier) = component.qty_multiplier else {
                continue;
            };
            if !multiplier.applies_to_cable() {
                return Err(HarnessError::invalid(
                    designator,
                    format!(
                        "additional component '{}' uses a connector quantity multiplier",
                        component.component_type
                    ),
                ));
            }
            let needs_length =
                matches!(multiplier, QtyMultiplier::Length | QtyMultiplier::TotalLength);
            if needs_length && spec.length.is_none() {
                return Err(HarnessError::invalid(
                    designator,
                    format!(
                        "additional component '{}' is scaled by length but the cable has none",
                        component.component_type
                    ),
                ));
            }
        }

        let wires = (0..wirecount)
            .map(|i| {
                let color_code = spec.colors.get(i).filter(|c| !c.is_empty()).cloned();
                Wire {
                    id: i + 1,
                    color: color_code.as_deref().map(WireColor::parse).unwrap_or_default(),
                    color_code,
                    label: spec.wirelabels.get(i).filter(|l| !l.is_empty()).cloned(),
                }
            })
            .collect();

        Ok(Cable {
            designator: designator.to_string(),
            category: spec.category,
            cable_type: spec.cable_type,
            gauge: spec.gauge,
            length: spec.length,
            length_unit: spec.length_unit.unwrap_or_else(|| "m".to_string()),
            shield: spec.shield,
            color: spec.color,
            bgcolor: spec.bgcolor,
            notes: spec.notes,
            wires,
            connections: Vec::new(),
            show_name: spec
                .show_name
                .unwrap_or(!designator.starts_with(AUTOGENERATED_PREFIX)),
            ignore_in_bom: spec.ignore_in_bom,
            part: spec.part,
            additional_components: spec.additional_components,
        })
    }

    fn derive_wirecount(designator: &str, spec: &CableSpec) -> Result<usize, HarnessError> {
        let candidates = [
            ("colors", (!spec.colors.is_empty()).then_some(spec.colors.len())),
            ("wirelabels", (!spec.wirelabels.is_empty()).then_some(spec.wirelabels.len())),
        ];

        let mut wirecount = spec.wirecount;
        for (field, len) in candidates {
            let Some(len) = len else { continue };
            match wirecount {
                Some(n) if n != len => {
                    return Err(HarnessError::invalid(
                        designator,
                        format!("{} has {} entries but the cable has {} wires", field, len, n),
                    ));
                }
                _ => wirecount = Some(len),
            }
        }

        match wirecount {
            Some(n) if n > 0 => Ok(n),
            _ => Err(HarnessError::invalid(designator, "cable has no wires")),
        }
    }

    pub fn is_bundle(&self) -> bool {
        self.category == CableCategory::Bundle
    }

    pub fn wirecount(&self) -> usize {
        self.wires.len()
    }

    pub fn wire(&self, id: WireId) -> Option<&Wire> {
        id.checked_sub(1).and_then(|i| self.wires.get(i))
    }

    pub(crate) fn push_connection(&mut self, connection: CableConnection) {
        self.connections.push(connection);
    }

    fn unit(&self) -> Option<String> {
        self.length.map(|_| self.length_unit.clone())
    }

    pub fn bom_hash(&self) -> BomHash {
        let size = match &self.gauge {
            Some(gauge) => format!("{} x {}", self.wirecount(), gauge),
            None => format!("{} wires", self.wirecount()),
        };
        BomHash {
            description: join_description([
                Some(Cow::Borrowed("Cable")),
                self.cable_type.as_deref().map(Cow::Borrowed),
                Some(Cow::Owned(size)),
                self.shield.then_some(Cow::Borrowed("shielded")),
                self.color.as_deref().map(Cow::Borrowed),
            ]),
            unit: self.unit(),
            part: self.part.clone(),
        }
    }

    /// Content hash of a single wire, used when the cable is a bundle.
    pub fn wire_bom_hash(&self, wire: &Wire) -> BomHash {
        BomHash {
            description: join_description([
                Some(Cow::Borrowed("Wire")),
                self.cable_type.as_deref().map(Cow::Borrowed),
                self.gauge.as_deref().map(Cow::Borrowed),
                wire.color_code.as_deref().map(Cow::Borrowed),
            ]),
            unit: self.unit(),
            part: self.part.clone(),
        }
    }

    pub fn bom_qty(&self) -> f64 {
        self.length.unwrap_or(1.0)
    }

    /// Number of connected wire ends across all connection records.
    pub fn terminations(&self) -> usize {
        self.connections
            .iter()
            .map(|c| usize::from(c.from.is_some()) + usize::from(c.to.is_some()))
            .sum()
    }

    pub fn has_multicolor_wire(&self) -> bool {
        self.wires.iter().any(|w| w.color.is_multicolor())
    }

    /// Value an additional component's quantity is multiplied by.
    pub fn multiplier_value(&self, multiplier: QtyMultiplier) -> f64 {
        let length = self.length.unwrap_or(0.0);
        match multiplier {
            QtyMultiplier::Wirecount => self.wirecount() as f64,
            QtyMultiplier::Terminations => self.terminations() as f64,
            QtyMultiplier::Length => length,
            QtyMultiplier::TotalLength => length * self.wirecount() as f64,
            QtyMultiplier::Pincount | QtyMultiplier::Populated | QtyMultiplier::Connections => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_color_parse() {
        assert_eq!(WireColor::parse("RD").0, vec!["RD"]);
        assert_eq!(WireColor::parse("GNYE").0, vec!["GN", "YE"]);
        assert_eq!(WireColor::parse("GN:YE").0, vec!["GN", "YE"]);
        assert_eq!(WireColor::parse("#FF0000").0, vec!["#FF0000"]);
        assert!(WireColor::parse("").is_empty());
        assert!(WireColor::parse("BKWHRD").is_multicolor());
    }

    #[test]
    fn test_wires_from_colors() {
        let cable = Cable::from_spec("W1", CableSpec::default().with_colors(["RD", "BK"])).unwrap();
        assert_eq!(cable.wirecount(), 2);
        assert_eq!(cable.wire(1).unwrap().color_code.as_deref(), Some("RD"));
        assert_eq!(cable.wire(2).unwrap().id, 2);
        assert!(cable.wire(0).is_none());
        assert!(cable.wire(3).is_none());
    }

    #[test]
    fn test_rejects_mismatched_counts() {
        let spec = CableSpec::with_wirecount(3).with_colors(["RD", "BK"]);
        assert!(Cable::from_spec("W1", spec).is_err());
        let spec = CableSpec::default()
            .with_colors(["RD", "BK"])
            .with_wirelabels(["A"]);
        assert!(Cable::from_spec("W1", spec).is_err());
    }

    #[test]
    fn test_rejects_length_multiplier_without_length() {
        let spec = CableSpec::with_wirecount(2).with_additional_component(
            AdditionalComponent::new("Heatshrink").with_multiplier(QtyMultiplier::Length),
        );
        assert!(Cable::from_spec("W1", spec).is_err());
    }

    #[test]
    fn test_cable_bom_hash_and_qty() {
        let spec = CableSpec::with_wirecount(4)
            .with_gauge("0.25 mm2")
            .with_length(2.5);
        let cable = Cable::from_spec("W1", spec).unwrap();
        let hash = cable.bom_hash();
        assert_eq!(hash.description, "Cable, 4 x 0.25 mm2");
        assert_eq!(hash.unit.as_deref(), Some("m"));
        assert_eq!(cable.bom_qty(), 2.5);
    }

    #[test]
    fn test_wire_bom_hash_uses_color() {
        let spec = CableSpec::bundle()
            .with_colors(["RD", "BK"])
            .with_gauge("0.5 mm2");
        let cable = Cable::from_spec("W1", spec).unwrap();
        let hash = cable.wire_bom_hash(&cable.wires[1]);
        assert_eq!(hash.description, "Wire, 0.5 mm2, BK");
        assert_eq!(hash.unit, None);
        assert_eq!(cable.bom_qty(), 1.0);
    }

    #[test]
    fn test_multiplier_values() {
        let mut cable =
            Cable::from_spec("W1", CableSpec::with_wirecount(3).with_length(2.0)).unwrap();
        cable.push_connection(CableConnection {
            from: Some(PinEndpoint::new("X1", 1)),
            via: 1,
            to: None,
        });
        assert_eq!(cable.multiplier_value(QtyMultiplier::Wirecount), 3.0);
        assert_eq!(cable.multiplier_value(QtyMultiplier::Terminations), 1.0);
        assert_eq!(cable.multiplier_value(QtyMultiplier::Length), 2.0);
        assert_eq!(cable.multiplier_value(QtyMultiplier::TotalLength), 6.0);
        assert_eq!(cable.multiplier_value(QtyMultiplier::Connections), 1.0);
    }

    #[test]
    fn test_length_multiplier_scales_additional_component() {
        let spec = CableSpec::with_wirecount(2).with_length(1.5).with_additional_component(
            AdditionalComponent::new("Sleeve")
                .with_qty(2.0)
                .with_multiplier(QtyMultiplier::Length),
        );
        let cable = Cable::from_spec("W1", spec).unwrap();
        let sleeve = &cable.additional_components[0];
        let multiplier = cable.multiplier_value(QtyMultiplier::Length);
        assert_eq!(sleeve.bom_qty(multiplier), 3.0);
    }
}
