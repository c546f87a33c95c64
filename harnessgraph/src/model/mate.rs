use serde::Serialize;

use super::{Arrow, PinEndpoint};

/// A non-electrical association drawn as a dashed arrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mate {
    /// Pin-to-pin mate, e.g. a plug seated in its receptacle.
    Pin {
        from: PinEndpoint,
        to: PinEndpoint,
        arrow: Arrow,
    },
    /// Whole-component mate between two designators.
    Component {
        from: String,
        to: String,
        arrow: Arrow,
    },
}

impl Mate {
    pub fn arrow(&self) -> Arrow {
        match self {
            Mate::Pin { arrow, .. } | Mate::Component { arrow, .. } => *arrow,
        }
    }

    /// Designators of the two mated components.
    pub fn designators(&self) -> (&str, &str) {
        match self {
            Mate::Pin { from, to, .. } => (&from.connector, &to.connector),
            Mate::Component { from, to, .. } => (from, to),
        }
    }
}
