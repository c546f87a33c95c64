//! Reference Resolver
//!
//! Maps loosely written endpoint references onto canonical identifiers.
//! A pin can be referenced by its id or by its label; a wire by its
//! 1-based id, its color code or its wire label. Each of these is a key
//! space. Resolution runs in three steps:
//!
//! 1. If the reference hits two key spaces that point at different
//!    targets, it is ambiguous.
//! 2. Named key spaces (labels, colors) are tried in order; a key that
//!    occurs more than once in its space is ambiguous.
//! 3. The id space is tried last. Nothing matched means not found.
//!
//! Resolution is pure: it reads connector/cable state and never mutates it.

use crate::error::{Ambiguity, HarnessError, KeySpace};
use crate::model::{Cable, Connector, PinId, Reference, WireId};

/// Every position at which a reference matched inside one key space.
struct Matches {
    space: KeySpace,
    positions: Vec<usize>,
}

impl Matches {
    fn collect<'a>(space: KeySpace, keys: impl Iterator<Item = Option<&'a str>>, text: &str) -> Self {
        let positions = keys
            .enumerate()
            .filter(|(_, key)| *key == Some(text))
            .map(|(i, _)| i)
            .collect();
        Matches { space, positions }
    }

    fn first(&self) -> Option<usize> {
        self.positions.first().copied()
    }
}

/// Resolve `reference` to a position in the component's pin or wire list.
fn resolve_position(
    designator: &str,
    reference: &Reference,
    named: &[Matches],
    direct: &Matches,
) -> Result<usize, HarnessError> {
    let ambiguous = |ambiguity| HarnessError::AmbiguousReference {
        designator: designator.to_string(),
        reference: reference.to_string(),
        ambiguity,
    };

    let hits: Vec<(KeySpace, usize)> = std::iter::once(direct)
        .chain(named.iter())
        .filter_map(|m| m.first().map(|pos| (m.space, pos)))
        .collect();
    for (i, (first_space, first_pos)) in hits.iter().enumerate() {
        for (second_space, second_pos) in &hits[i + 1..] {
            if first_pos != second_pos {
                return Err(ambiguous(Ambiguity::AcrossKeySpaces {
                    first: *first_space,
                    second: *second_space,
                }));
            }
        }
    }

    for m in named {
        match m.positions.as_slice() {
            [] => continue,
            [pos] => return Ok(*pos),
            positions => {
                return Err(ambiguous(Ambiguity::Duplicate {
                    key_space: m.space,
                    count: positions.len(),
                }))
            }
        }
    }

    direct.first().ok_or_else(|| HarnessError::ReferenceNotFound {
        designator: designator.to_string(),
        reference: reference.to_string(),
    })
}

/// Resolve a pin id or pin label to the pin's canonical id.
pub fn resolve_pin(connector: &Connector, reference: &Reference) -> Result<PinId, HarnessError> {
    let text = reference.as_text();
    let direct = Matches {
        space: KeySpace::Pins,
        positions: reference
            .as_index()
            .and_then(|n| connector.pins.iter().position(|p| p.id == n))
            .into_iter()
            .collect(),
    };
    let labels = Matches::collect(
        KeySpace::PinLabels,
        connector.pins.iter().map(|p| p.label.as_deref()),
        &text,
    );

    let pos = resolve_position(&connector.designator, reference, &[labels], &direct)?;
    Ok(connector.pins[pos].id)
}

/// Resolve a wire id, color code or wire label to the 1-based wire id.
pub fn resolve_wire(cable: &Cable, reference: &Reference) -> Result<WireId, HarnessError> {
    let text = reference.as_text();
    let direct = Matches {
        space: KeySpace::Wires,
        positions: reference
            .as_index()
            .map(|n| n as usize)
            .filter(|n| (1..=cable.wirecount()).contains(n))
            .map(|n| n - 1)
            .into_iter()
            .collect(),
    };
    let colors = Matches::collect(
        KeySpace::Colors,
        cable.wires.iter().map(|w| w.color_code.as_deref()),
        &text,
    );
    let labels = Matches::collect(
        KeySpace::WireLabels,
        cable.wires.iter().map(|w| w.label.as_deref()),
        &text,
    );

    let pos = resolve_position(&cable.designator, reference, &[colors, labels], &direct)?;
    Ok(cable.wires[pos].id)
}
