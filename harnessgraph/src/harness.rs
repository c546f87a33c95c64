//! Harness Assembly
//!
//! The [`Harness`] owns every connector, cable, mate and free-standing
//! additional component. After construction the only way to change it is
//! through the registration methods and `connect` / `add_mate_pin` /
//! `add_mate_component`. Each of these resolves and validates all of its
//! inputs before touching any state, so a failed call leaves the harness
//! exactly as it was.

use std::collections::HashMap;

use crate::bom::Bom;
use crate::config::{Metadata, Options, Tweak};
use crate::error::HarnessError;
use crate::graph::{build_graph_description, ColorTranslator, GraphDescription, RenderParams};
use crate::model::{
    AdditionalComponent, Arrow, Cable, CableConnection, CableSpec, Connector, ConnectorSpec, Mate,
    PinEndpoint, Reference, Side,
};
use crate::resolve::{resolve_pin, resolve_wire};

/// Position of a registered component in its owning list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComponentIndex {
    Connector(usize),
    Cable(usize),
}

#[derive(Debug, Clone, Default)]
pub struct Harness {
    pub metadata: Metadata,
    pub options: Options,
    pub tweak: Tweak,
    connectors: Vec<Connector>,
    cables: Vec<Cable>,
    mates: Vec<Mate>,
    additional_bom_items: Vec<AdditionalComponent>,
    /// Index mapping: designator -> connector or cable position
    component_indices: HashMap<String, ComponentIndex>,
}

impl Harness {
    pub fn new(metadata: Metadata, options: Options, tweak: Tweak) -> Self {
        Self {
            metadata,
            options,
            tweak,
            ..Default::default()
        }
    }

    /// Register a connector. Designators are unique across connectors and
    /// cables; re-registering one is rejected.
    pub fn add_connector(&mut self, designator: &str, spec: ConnectorSpec) -> Result<(), HarnessError> {
        self.ensure_unused(designator)?;
        let connector = Connector::from_spec(designator, spec)?;
        tracing::debug!(
            "Registered connector {} with {} pins",
            designator,
            connector.pincount()
        );
        self.component_indices.insert(
            designator.to_string(),
            ComponentIndex::Connector(self.connectors.len()),
        );
        self.connectors.push(connector);
        Ok(())
    }

    /// Register a cable or bundle.
    pub fn add_cable(&mut self, designator: &str, spec: CableSpec) -> Result<(), HarnessError> {
        self.ensure_unused(designator)?;
        let cable = Cable::from_spec(designator, spec)?;
        tracing::debug!(
            "Registered {:?} {} with {} wires",
            cable.category,
            designator,
            cable.wirecount()
        );
        self.component_indices
            .insert(designator.to_string(), ComponentIndex::Cable(self.cables.len()));
        self.cables.push(cable);
        Ok(())
    }

    /// Register a free-standing BOM item. It has no parent, so a quantity
    /// multiplier is meaningless and rejected.
    pub fn add_additional_bom_item(&mut self, item: AdditionalComponent) -> Result<(), HarnessError> {
        if item.qty_multiplier.is_some() {
            return Err(HarnessError::invalid(
                &item.component_type,
                "free-standing BOM items cannot use a quantity multiplier",
            ));
        }
        tracing::debug!("Registered additional BOM item {}", item.description());
        self.additional_bom_items.push(item);
        Ok(())
    }

    /// Mate two pins. Both pins become active without counting as an
    /// electrical connection; the source is drawn on the right, the
    /// destination on the left.
    pub fn add_mate_pin(
        &mut self,
        from_name: &str,
        from_pin: impl Into<Reference>,
        to_name: &str,
        to_pin: impl Into<Reference>,
        arrow: &str,
    ) -> Result<(), HarnessError> {
        let from = self.resolve_endpoint(from_name, &from_pin.into())?;
        let to = self.resolve_endpoint(to_name, &to_pin.into())?;
        let arrow: Arrow = arrow.parse()?;

        self.activate(&from, Side::Right, false);
        self.activate(&to, Side::Left, false);
        tracing::debug!("Mated pin {} with {}", from, to);
        self.mates.push(Mate::Pin { from, to, arrow });
        Ok(())
    }

    /// Mate two whole components. Both designators must already be
    /// registered as a connector or cable.
    pub fn add_mate_component(
        &mut self,
        from_name: &str,
        to_name: &str,
        arrow: &str,
    ) -> Result<(), HarnessError> {
        for name in [from_name, to_name] {
            if !self.contains(name) {
                return Err(HarnessError::UnknownComponent(name.to_string()));
            }
        }
        let arrow: Arrow = arrow.parse()?;

        tracing::debug!("Mated component {} with {}", from_name, to_name);
        self.mates.push(Mate::Component {
            from: from_name.to_string(),
            to: to_name.to_string(),
            arrow,
        });
        Ok(())
    }

    /// Route one wire of `via` from an optional pin to an optional pin.
    ///
    /// Pin and wire references may be ids, labels or colors; see
    /// [`crate::resolve`]. A `None` endpoint leaves that wire end open.
    /// The same wire may be connected any number of times; each call adds
    /// one connection record to the cable.
    pub fn connect(
        &mut self,
        from: Option<(&str, Reference)>,
        via: (&str, Reference),
        to: Option<(&str, Reference)>,
    ) -> Result<(), HarnessError> {
        let from = from
            .map(|(name, pin)| self.resolve_endpoint(name, &pin))
            .transpose()?;
        let to = to
            .map(|(name, pin)| self.resolve_endpoint(name, &pin))
            .transpose()?;

        let (via_name, via_wire) = via;
        let cable_idx = match self.component_indices.get(via_name) {
            Some(ComponentIndex::Cable(idx)) => *idx,
            _ => return Err(HarnessError::UnknownCable(via_name.to_string())),
        };
        let wire = resolve_wire(&self.cables[cable_idx], &via_wire)?;

        if let Some(endpoint) = &from {
            self.activate(endpoint, Side::Right, true);
        }
        if let Some(endpoint) = &to {
            self.activate(endpoint, Side::Left, true);
        }
        tracing::debug!(
            "Connected {} via {}:{} to {}",
            from.as_ref().map(ToString::to_string).unwrap_or_else(|| "(open)".into()),
            via_name,
            wire,
            to.as_ref().map(ToString::to_string).unwrap_or_else(|| "(open)".into()),
        );
        self.cables[cable_idx].push_connection(CableConnection {
            from,
            via: wire,
            to,
        });
        Ok(())
    }

    fn ensure_unused(&self, designator: &str) -> Result<(), HarnessError> {
        if self.contains(designator) {
            return Err(HarnessError::DuplicateDesignator(designator.to_string()));
        }
        Ok(())
    }

    fn resolve_endpoint(&self, name: &str, pin: &Reference) -> Result<PinEndpoint, HarnessError> {
        let connector = self
            .connector(name)
            .ok_or_else(|| HarnessError::UnknownConnector(name.to_string()))?;
        let pin = resolve_pin(connector, pin)?;
        Ok(PinEndpoint::new(name, pin))
    }

    fn activate(&mut self, endpoint: &PinEndpoint, side: Side, is_connection: bool) {
        if let Some(ComponentIndex::Connector(idx)) = self.component_indices.get(&endpoint.connector) {
            self.connectors[*idx].activate_pin(endpoint.pin, side, is_connection);
        }
    }

    /// Whether `designator` names a registered connector or cable.
    pub fn contains(&self, designator: &str) -> bool {
        self.component_indices.contains_key(designator)
    }

    pub fn connector(&self, designator: &str) -> Option<&Connector> {
        match self.component_indices.get(designator) {
            Some(ComponentIndex::Connector(idx)) => self.connectors.get(*idx),
            _ => None,
        }
    }

    pub fn cable(&self, designator: &str) -> Option<&Cable> {
        match self.component_indices.get(designator) {
            Some(ComponentIndex::Cable(idx)) => self.cables.get(*idx),
            _ => None,
        }
    }

    /// Connectors in registration order.
    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    /// Cables in registration order.
    pub fn cables(&self) -> &[Cable] {
        &self.cables
    }

    pub fn mates(&self) -> &[Mate] {
        &self.mates
    }

    pub fn additional_bom_items(&self) -> &[AdditionalComponent] {
        &self.additional_bom_items
    }

    /// Rebuild the bill of materials from scratch.
    pub fn bom(&self) -> Bom {
        Bom::populate(self)
    }

    /// Build a fresh graph description. Nothing is cached; callers that
    /// render repeatedly should keep the result themselves.
    pub fn graph(&self, colors: &dyn ColorTranslator) -> Result<GraphDescription, HarnessError> {
        let params = RenderParams::for_harness(self);
        build_graph_description(self, &params, colors)
    }
}
