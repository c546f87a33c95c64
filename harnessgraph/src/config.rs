//! Configuration Input
//!
//! Already-parsed metadata, rendering options and graph tweaks, plus the
//! [`HarnessDocument`]: a JSON description listing the connectors, cables,
//! connections, mates and extra BOM items a harness is assembled from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::HarnessError;
use crate::harness::Harness;
use crate::model::{AdditionalComponent, CableSpec, ConnectorSpec, Reference};

/// Free-form document metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_fontname() -> String {
    "arial".to_string()
}

fn default_bgcolor() -> String {
    "#FFFFFF".to_string()
}

/// Diagram-wide rendering options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    #[serde(default = "default_fontname")]
    pub fontname: String,
    #[serde(default = "default_bgcolor")]
    pub bgcolor: String,
    #[serde(default = "default_bgcolor")]
    pub bgcolor_node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgcolor_connector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgcolor_cable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgcolor_bundle: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            fontname: default_fontname(),
            bgcolor: default_bgcolor(),
            bgcolor_node: default_bgcolor(),
            bgcolor_connector: None,
            bgcolor_cable: None,
            bgcolor_bundle: None,
        }
    }
}

/// Post-processing applied to the finished graph description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tweak {
    /// Attribute overrides keyed by node name (or `graph`, `node`, `edge`
    /// for the defaults). A `null` value removes the attribute.
    #[serde(default, rename = "override")]
    pub overrides: BTreeMap<String, BTreeMap<String, Option<String>>>,
    /// Raw DOT lines appended before the closing brace.
    #[serde(default)]
    pub append: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorDecl {
    pub designator: String,
    #[serde(flatten)]
    pub spec: ConnectorSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CableDecl {
    pub designator: String,
    #[serde(flatten)]
    pub spec: CableSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinDecl {
    pub designator: String,
    pub pin: Reference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireDecl {
    pub designator: String,
    pub wire: Reference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<PinDecl>,
    pub via: WireDecl,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<PinDecl>,
}

fn default_arrow() -> String {
    "--".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MateDecl {
    Pin {
        from: PinDecl,
        to: PinDecl,
        #[serde(default = "default_arrow")]
        arrow: String,
    },
    Component {
        from: String,
        to: String,
        #[serde(default = "default_arrow")]
        arrow: String,
    },
}

/// Complete declaration list for one harness.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessDocument {
    pub metadata: Metadata,
    pub options: Options,
    pub tweak: Tweak,
    pub connectors: Vec<ConnectorDecl>,
    pub cables: Vec<CableDecl>,
    pub connections: Vec<ConnectionDecl>,
    pub mates: Vec<MateDecl>,
    pub additional_bom_items: Vec<AdditionalComponent>,
}

impl HarnessDocument {
    pub fn from_json_str(content: &str) -> Result<Self, HarnessError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Assemble the harness: components first, then connections, mates and
    /// free-standing BOM items. Stops at the first failing declaration.
    pub fn build(self) -> Result<Harness, HarnessError> {
        let mut harness = Harness::new(self.metadata, self.options, self.tweak);

        for decl in self.connectors {
            harness.add_connector(&decl.designator, decl.spec)?;
        }
        for decl in self.cables {
            harness.add_cable(&decl.designator, decl.spec)?;
        }
        for decl in self.connections {
            harness.connect(
                decl.from.as_ref().map(|p| (p.designator.as_str(), p.pin.clone())),
                (decl.via.designator.as_str(), decl.via.wire.clone()),
                decl.to.as_ref().map(|p| (p.designator.as_str(), p.pin.clone())),
            )?;
        }
        for mate in self.mates {
            match mate {
                MateDecl::Pin { from, to, arrow } => {
                    harness.add_mate_pin(&from.designator, from.pin, &to.designator, to.pin, &arrow)?
                }
                MateDecl::Component { from, to, arrow } => {
                    harness.add_mate_component(&from, &to, &arrow)?
                }
            }
        }
        for item in self.additional_bom_items {
            harness.add_additional_bom_item(item)?;
        }

        tracing::debug!(
            "Built harness with {} connectors, {} cables, {} mates",
            harness.connectors().len(),
            harness.cables().len(),
            harness.mates().len()
        );
        Ok(harness)
    }
}

impl Harness {
    pub fn from_document(document: HarnessDocument) -> Result<Self, HarnessError> {
        document.build()
    }
}
