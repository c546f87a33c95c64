//! Harness Component Model
//!
//! Canonical representations of the parts a wiring harness is built from:
//! connectors, cables (including bundles of loose wires), mates and
//! free-standing additional components. Every part that can end up in the
//! bill of materials exposes a [`BomHash`], the content-addressable identity
//! used to merge identical parts into one BOM line.

pub mod additional;
pub mod cable;
pub mod connector;
pub mod mate;

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::HarnessError;

pub use additional::AdditionalComponent;
pub use cable::{Cable, CableCategory, CableConnection, CableSpec, PinEndpoint, Wire, WireColor};
pub use connector::{Connector, ConnectorSpec, Pin, PinActivation, PinState};
pub use mate::Mate;

/// Designators starting with this prefix are generated for diagram wiring
/// only and never show up in the BOM.
pub const AUTOGENERATED_PREFIX: &str = "AUTOGENERATED_";

/// Pin identifier within a connector.
pub type PinId = u32;

/// 1-based wire identifier within a cable.
pub type WireId = usize;

/// A loosely specified pin or wire reference as written by a user:
/// either a bare number or a name (pin label, wire color or wire label).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    Index(u32),
    Name(String),
}

impl Reference {
    /// Numeric form, used to match pin and wire ids.
    pub fn as_index(&self) -> Option<u32> {
        match self {
            Reference::Index(n) => Some(*n),
            Reference::Name(s) => s.trim().parse().ok(),
        }
    }

    /// Textual form, used to match labels and colors.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Reference::Index(n) => Cow::Owned(n.to_string()),
            Reference::Name(s) => Cow::Borrowed(s.as_str()),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Index(n) => write!(f, "{}", n),
            Reference::Name(s) => write!(f, "{}", s),
        }
    }
}

impl From<u32> for Reference {
    fn from(n: u32) -> Self {
        Reference::Index(n)
    }
}

impl From<&str> for Reference {
    fn from(s: &str) -> Self {
        Reference::Name(s.to_string())
    }
}

impl From<String> for Reference {
    fn from(s: String) -> Self {
        Reference::Name(s)
    }
}

/// Side of a component box a pin is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Port suffix used in graph node labels.
    pub fn port_suffix(&self) -> &'static str {
        match self {
            Side::Left => "l",
            Side::Right => "r",
        }
    }

    /// Graphviz compass point facing away from the box on this side.
    pub fn compass(&self) -> &'static str {
        match self {
            Side::Left => "w",
            Side::Right => "e",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrowDirection {
    None,
    Forward,
    Backward,
    Both,
}

impl ArrowDirection {
    /// Value of the Graphviz `dir` edge attribute.
    pub fn dot_dir(&self) -> &'static str {
        match self {
            ArrowDirection::None => "none",
            ArrowDirection::Forward => "forward",
            ArrowDirection::Backward => "back",
            ArrowDirection::Both => "both",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrowWeight {
    Single,
    Double,
}

/// Arrow drawn for a mate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Arrow {
    pub direction: ArrowDirection,
    pub weight: ArrowWeight,
}

impl FromStr for Arrow {
    type Err = HarnessError;

    /// Parses arrow strings such as `--`, `-->`, `<--`, `<->` or `==>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let backward = trimmed.starts_with('<');
        let forward = trimmed.ends_with('>');
        let body = trimmed.strip_prefix('<').unwrap_or(trimmed);
        let body = body.strip_suffix('>').unwrap_or(body);

        if body.is_empty() {
            return Err(HarnessError::InvalidArrow(s.to_string()));
        }
        let weight = if body.chars().all(|c| c == '-') {
            ArrowWeight::Single
        } else if body.chars().all(|c| c == '=') {
            ArrowWeight::Double
        } else {
            return Err(HarnessError::InvalidArrow(s.to_string()));
        };
        let direction = match (backward, forward) {
            (true, true) => ArrowDirection::Both,
            (true, false) => ArrowDirection::Backward,
            (false, true) => ArrowDirection::Forward,
            (false, false) => ArrowDirection::None,
        };
        Ok(Arrow { direction, weight })
    }
}

/// Sourcing information shared by every orderable part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartNumbers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spn: Option<String>,
}

/// Content hash of a BOM-relevant part. Two parts with equal hashes are the
/// same orderable item and are merged into one BOM line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BomHash {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(flatten)]
    pub part: PartNumbers,
}

/// Scales an additional component's quantity by a property of its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QtyMultiplier {
    /// Number of pins on the parent connector.
    Pincount,
    /// Number of active pins on the parent connector.
    Populated,
    /// Number of wire connections landing on the parent connector.
    Connections,
    /// Number of wires in the parent cable.
    Wirecount,
    /// Number of connected wire ends in the parent cable.
    Terminations,
    /// Length of the parent cable.
    Length,
    /// Length of the parent cable times its wire count.
    TotalLength,
}

impl QtyMultiplier {
    pub fn applies_to_connector(&self) -> bool {
        matches!(
            self,
            QtyMultiplier::Pincount | QtyMultiplier::Populated | QtyMultiplier::Connections
        )
    }

    pub fn applies_to_cable(&self) -> bool {
        !self.applies_to_connector()
    }
}

/// Joins the non-empty description fragments with `", "`.
pub(crate) fn join_description<'a>(parts: impl IntoIterator<Item = Option<Cow<'a, str>>>) -> String {
    parts
        .into_iter()
        .flatten()
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
