//! Error types shared by the harness model, resolver, BOM and render layers.

use std::fmt;
use thiserror::Error;

/// A lookup space a raw reference can be matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySpace {
    Pins,
    PinLabels,
    Wires,
    Colors,
    WireLabels,
}

impl fmt::Display for KeySpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySpace::Pins => write!(f, "pins"),
            KeySpace::PinLabels => write!(f, "pinlabels"),
            KeySpace::Wires => write!(f, "wires"),
            KeySpace::Colors => write!(f, "colors"),
            KeySpace::WireLabels => write!(f, "wirelabels"),
        }
    }
}

/// Why a reference could not be mapped to a single target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ambiguity {
    /// Matches in two key spaces that point at different targets.
    AcrossKeySpaces { first: KeySpace, second: KeySpace },
    /// The same key appears more than once within one key space.
    Duplicate { key_space: KeySpace, count: usize },
}

impl fmt::Display for Ambiguity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ambiguity::AcrossKeySpaces { first, second } => write!(
                f,
                "defined both in {} and {}, for different targets",
                first, second
            ),
            Ambiguity::Duplicate { key_space, count } => {
                write!(f, "defined {} times in {}", count, key_space)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("{designator}:{reference} is ambiguous: {ambiguity}")]
    AmbiguousReference {
        designator: String,
        reference: String,
        ambiguity: Ambiguity,
    },

    #[error("{designator}:{reference} not found")]
    ReferenceNotFound {
        designator: String,
        reference: String,
    },

    #[error("Unknown connector: {0}")]
    UnknownConnector(String),

    #[error("Unknown cable: {0}")]
    UnknownCable(String),

    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    #[error("Designator already in use: {0}")]
    DuplicateDesignator(String),

    #[error("Invalid component {designator}: {message}")]
    InvalidComponent { designator: String, message: String },

    #[error("Invalid arrow: {0:?}")]
    InvalidArrow(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TSV error: {0}")]
    Tsv(#[from] csv::Error),
}

impl HarnessError {
    pub(crate) fn invalid(designator: &str, message: impl Into<String>) -> Self {
        HarnessError::InvalidComponent {
            designator: designator.to_string(),
            message: message.into(),
        }
    }

    /// Designator of the component the error points at, if any.
    pub fn designator(&self) -> Option<&str> {
        match self {
            HarnessError::AmbiguousReference { designator, .. }
            | HarnessError::ReferenceNotFound { designator, .. }
            | HarnessError::InvalidComponent { designator, .. } => Some(designator),
            HarnessError::UnknownConnector(d)
            | HarnessError::UnknownCable(d)
            | HarnessError::UnknownComponent(d)
            | HarnessError::DuplicateDesignator(d) => Some(d),
            HarnessError::InvalidArrow(_)
            | HarnessError::Render(_)
            | HarnessError::Io(_)
            | HarnessError::Json(_)
            | HarnessError::Tsv(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_reference() {
        let err = HarnessError::ReferenceNotFound {
            designator: "X1".to_string(),
            reference: "BOGUS".to_string(),
        };
        assert_eq!(err.to_string(), "X1:BOGUS not found");
        assert_eq!(err.designator(), Some("X1"));
    }

    #[test]
    fn test_ambiguity_message() {
        let err = HarnessError::AmbiguousReference {
            designator: "W1".to_string(),
            reference: "RD".to_string(),
            ambiguity: Ambiguity::AcrossKeySpaces {
                first: KeySpace::Colors,
                second: KeySpace::WireLabels,
            },
        };
        assert_eq!(
            err.to_string(),
            "W1:RD is ambiguous: defined both in colors and wirelabels, for different targets"
        );
    }
}
