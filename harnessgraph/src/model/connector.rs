use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;

use super::{
    join_description, AdditionalComponent, BomHash, PartNumbers, PinId, QtyMultiplier, Reference,
    Side, AUTOGENERATED_PREFIX,
};
use crate::error::HarnessError;
use crate::resolve::resolve_pin;

/// Connector declaration as written in a harness description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorSpec {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub connector_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pincount: Option<usize>,
    pub pins: Vec<PinId>,
    pub pinlabels: Vec<String>,
    pub pincolors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bgcolor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub loops: Vec<[Reference; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_name: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_pincount: Option<bool>,
    pub hide_disconnected_pins: bool,
    pub ignore_in_bom: bool,
    #[serde(flatten)]
    pub part: PartNumbers,
    pub additional_components: Vec<AdditionalComponent>,
}

impl ConnectorSpec {
    /// Connector with pins `1..=pincount`.
    pub fn with_pincount(pincount: usize) -> Self {
        Self {
            pincount: Some(pincount),
            ..Default::default()
        }
    }

    pub fn with_pins(mut self, pins: impl IntoIterator<Item = PinId>) -> Self {
        self.pins = pins.into_iter().collect();
        self
    }

    pub fn with_pinlabels<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.pinlabels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_type(mut self, connector_type: impl Into<String>) -> Self {
        self.connector_type = Some(connector_type.into());
        self
    }

    pub fn with_additional_component(mut self, component: AdditionalComponent) -> Self {
        self.additional_components.push(component);
        self
    }
}

/// How a pin participates in the diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PinActivation {
    #[default]
    Inactive,
    /// Referenced by a mate only, no wire lands on it.
    MateOnly,
    /// At least one wire lands on it.
    Connection,
}

/// Activation bookkeeping for a single pin. Activation only ever moves
/// forward; a pin is never deactivated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PinState {
    pub activation: PinActivation,
    pub left: bool,
    pub right: bool,
    pub connections: usize,
}

impl PinState {
    pub fn is_active(&self) -> bool {
        self.activation != PinActivation::Inactive
    }

    pub fn is_active_on(&self, side: Side) -> bool {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub(crate) fn activate(&mut self, side: Side, is_connection: bool) {
        match side {
            Side::Left => self.left = true,
            Side::Right => self.right = true,
        }
        let activation = if is_connection {
            self.connections += 1;
            PinActivation::Connection
        } else {
            PinActivation::MateOnly
        };
        self.activation = self.activation.max(activation);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Pin {
    pub id: PinId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub state: PinState,
}

/// A registered connector. Owned by the harness; pins are owned by the
/// connector and referenced elsewhere by `(designator, pin id)`.
#[derive(Debug, Clone, Serialize)]
pub struct Connector {
    pub designator: String,
    pub connector_type: Option<String>,
    pub subtype: Option<String>,
    pub color: Option<String>,
    pub bgcolor: Option<String>,
    pub notes: Option<String>,
    pub pins: Vec<Pin>,
    pub loops: Vec<(PinId, PinId)>,
    pub show_name: bool,
    pub show_pincount: bool,
    pub hide_disconnected_pins: bool,
    pub ignore_in_bom: bool,
    pub part: PartNumbers,
    pub additional_components: Vec<AdditionalComponent>,
}

impl Connector {
    /// Build a connector from its declaration, checking pin invariants and
    /// resolving loop references.
    pub fn from_spec(designator: &str, spec: ConnectorSpec) -> Result<Self, HarnessError> {
        let pincount = Self::derive_pincount(designator, &spec)?;

        let pin_ids: Vec<PinId> = if spec.pins.is_empty() {
            (1..=pincount as PinId).collect()
        } else {
            spec.pins.clone()
        };
        let mut seen = HashSet::new();
        for id in &pin_ids {
            if !seen.insert(*id) {
                return Err(HarnessError::invalid(
                    designator,
                    format!("pin {} is defined more than once", id),
                ));
            }
        }

        let pins = pin_ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| Pin {
                id,
                label: spec.pinlabels.get(i).filter(|l| !l.is_empty()).cloned(),
                color: spec.pincolors.get(i).filter(|c| !c.is_empty()).cloned(),
                state: PinState::default(),
            })
            .collect();

        for component in &spec.additional_components {
            if let Some(multiplier) = component.qty_multiplier {
                if !multiplier.applies_to_connector() {
                    return Err(HarnessError::invalid(
                        designator,
                        format!(
                            "additional component '{}' uses a cable quantity multiplier",
                            component.component_type
                        ),
                    ));
                }
            }
        }

        let autogenerated = designator.starts_with(AUTOGENERATED_PREFIX);
        let mut connector = Connector {
            designator: designator.to_string(),
            connector_type: spec.connector_type,
            subtype: spec.subtype,
            color: spec.color,
            bgcolor: spec.bgcolor,
            notes: spec.notes,
            pins,
            loops: Vec::new(),
            show_name: spec.show_name.unwrap_or(!autogenerated),
            show_pincount: spec.show_pincount.unwrap_or(true),
            hide_disconnected_pins: spec.hide_disconnected_pins,
            ignore_in_bom: spec.ignore_in_bom,
            part: spec.part,
            additional_components: spec.additional_components,
        };

        for [a, b] in &spec.loops {
            let a = resolve_pin(&connector, a)?;
            let b = resolve_pin(&connector, b)?;
            if a == b {
                return Err(HarnessError::invalid(
                    designator,
                    format!("loop from pin {} to itself", a),
                ));
            }
            connector.loops.push((a, b));
        }

        Ok(connector)
    }

    fn derive_pincount(designator: &str, spec: &ConnectorSpec) -> Result<usize, HarnessError> {
        let candidates = [
            ("pins", (!spec.pins.is_empty()).then_some(spec.pins.len())),
            ("pinlabels", (!spec.pinlabels.is_empty()).then_some(spec.pinlabels.len())),
            ("pincolors", (!spec.pincolors.is_empty()).then_some(spec.pincolors.len())),
        ];

        let mut pincount = spec.pincount;
        for (field, len) in candidates {
            let Some(len) = len else { continue };
            match pincount {
                Some(n) if n != len => {
                    return Err(HarnessError::invalid(
                        designator,
                        format!("{} has {} entries but the connector has {} pins", field, len, n),
                    ));
                }
                _ => pincount = Some(len),
            }
        }

        match pincount {
            Some(n) if n > 0 => Ok(n),
            _ => Err(HarnessError::invalid(designator, "connector has no pins")),
        }
    }

    pub fn pincount(&self) -> usize {
        self.pins.len()
    }

    pub fn pin(&self, id: PinId) -> Option<&Pin> {
        self.pins.iter().find(|p| p.id == id)
    }

    pub(crate) fn activate_pin(&mut self, id: PinId, side: Side, is_connection: bool) {
        if let Some(pin) = self.pins.iter_mut().find(|p| p.id == id) {
            pin.state.activate(side, is_connection);
        }
    }

    pub fn active_pins(&self) -> impl Iterator<Item = &Pin> {
        self.pins.iter().filter(|p| p.state.is_active())
    }

    pub fn has_active_side(&self, side: Side) -> bool {
        self.pins.iter().any(|p| p.state.is_active_on(side))
    }

    pub fn is_looped(&self, id: PinId) -> bool {
        self.loops.iter().any(|(a, b)| *a == id || *b == id)
    }

    pub fn bom_hash(&self) -> BomHash {
        let pincount = self.show_pincount.then(|| format!("{} pins", self.pincount()));
        BomHash {
            description: join_description([
                Some(Cow::Borrowed("Connector")),
                self.connector_type.as_deref().map(Cow::Borrowed),
                self.subtype.as_deref().map(Cow::Borrowed),
                pincount.map(Cow::Owned),
                self.color.as_deref().map(Cow::Borrowed),
            ]),
            unit: None,
            part: self.part.clone(),
        }
    }

    pub fn bom_qty(&self) -> f64 {
        1.0
    }

    /// Value an additional component's quantity is multiplied by.
    pub fn multiplier_value(&self, multiplier: QtyMultiplier) -> f64 {
        match multiplier {
            QtyMultiplier::Pincount => self.pincount() as f64,
            QtyMultiplier::Populated => self.active_pins().count() as f64,
            QtyMultiplier::Connections => {
                self.pins.iter().map(|p| p.state.connections).sum::<usize>() as f64
            }
            QtyMultiplier::Wirecount
            | QtyMultiplier::Terminations
            | QtyMultiplier::Length
            | QtyMultiplier::TotalLength => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pins_derived_from_pincount() {
        let c = Connector::from_spec("X1", ConnectorSpec::with_pincount(3)).unwrap();
        let ids: Vec<PinId> = c.pins.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(c.pins.iter().all(|p| !p.state.is_active()));
    }

    #[test]
    fn test_pins_derived_from_labels() {
        let spec = ConnectorSpec::default().with_pinlabels(["GND", "", "VCC"]);
        let c = Connector::from_spec("X1", spec).unwrap();
        assert_eq!(c.pincount(), 3);
        assert_eq!(c.pins[1].label, None);
        assert_eq!(c.pins[2].label.as_deref(), Some("VCC"));
    }

    #[test]
    fn test_rejects_duplicate_pin_ids() {
        let spec = ConnectorSpec::default().with_pins([1, 2, 1]);
        let err = Connector::from_spec("X1", spec).unwrap_err();
        assert!(matches!(err, HarnessError::InvalidComponent { .. }));
    }

    #[test]
    fn test_rejects_label_count_mismatch() {
        let spec = ConnectorSpec::with_pincount(2).with_pinlabels(["A", "B", "C"]);
        assert!(Connector::from_spec("X1", spec).is_err());
    }

    #[test]
    fn test_pincolors_must_match_pincount() {
        let mut spec = ConnectorSpec::with_pincount(3);
        spec.pincolors = vec!["RD".into(), "BK".into()];
        let err = Connector::from_spec("X1", spec).unwrap_err();
        assert!(err.to_string().contains("pincolors has 2 entries"));

        let mut spec = ConnectorSpec::default();
        spec.pincolors = vec!["RD".into(), "".into()];
        let c = Connector::from_spec("X1", spec).unwrap();
        assert_eq!(c.pincount(), 2);
        assert_eq!(c.pins[0].color.as_deref(), Some("RD"));
        assert_eq!(c.pins[1].color, None);
    }

    #[test]
    fn test_rejects_empty_connector() {
        assert!(Connector::from_spec("X1", ConnectorSpec::default()).is_err());
    }

    #[test]
    fn test_rejects_cable_multiplier() {
        let spec = ConnectorSpec::with_pincount(2).with_additional_component(
            AdditionalComponent::new("Sleeve").with_multiplier(QtyMultiplier::Length),
        );
        assert!(Connector::from_spec("X1", spec).is_err());
    }

    #[test]
    fn test_loops_resolved_through_labels() {
        let mut spec = ConnectorSpec::default().with_pinlabels(["A", "B", "C"]);
        spec.loops = vec![[Reference::from("A"), Reference::from(3u32)]];
        let c = Connector::from_spec("X1", spec).unwrap();
        assert_eq!(c.loops, vec![(1, 3)]);
        assert!(c.is_looped(3));
        assert!(!c.is_looped(2));
    }

    #[test]
    fn test_activation_never_reverts() {
        let mut state = PinState::default();
        state.activate(Side::Right, true);
        state.activate(Side::Left, false);
        assert_eq!(state.activation, PinActivation::Connection);
        assert!(state.left && state.right);
        assert_eq!(state.connections, 1);
    }

    #[test]
    fn test_connections_multiplier_ignores_mates() {
        let mut c = Connector::from_spec("X1", ConnectorSpec::with_pincount(3)).unwrap();
        c.activate_pin(1, Side::Right, true);
        c.activate_pin(1, Side::Right, true);
        c.activate_pin(2, Side::Left, true);
        c.activate_pin(3, Side::Left, false);

        assert_eq!(c.multiplier_value(QtyMultiplier::Connections), 3.0);
        assert_eq!(c.multiplier_value(QtyMultiplier::Populated), 3.0);
        assert_eq!(c.multiplier_value(QtyMultiplier::Pincount), 3.0);
        assert_eq!(c.multiplier_value(QtyMultiplier::Length), 1.0);
    }

    #[test]
    fn test_bom_hash_description() {
        let spec = ConnectorSpec::with_pincount(2).with_type("Molex KK 254");
        let c = Connector::from_spec("X1", spec).unwrap();
        assert_eq!(c.bom_hash().description, "Connector, Molex KK 254, 2 pins");
    }

    #[test]
    fn test_autogenerated_connector_hides_name() {
        let name = format!("{}1", AUTOGENERATED_PREFIX);
        let c = Connector::from_spec(&name, ConnectorSpec::with_pincount(1)).unwrap();
        assert!(!c.show_name);
    }
}
