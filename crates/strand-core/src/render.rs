//! # Chain Rendering
//!
//! Serializable view of a chain for debugging and JSON output.
//!
//! Traversal visits a node's children before its next step. Released nodes
//! are skipped, so a partially destroyed chain still renders.

use crate::chain::Chain;
use crate::node::Node;
use crate::types::StrandError;
use serde::Serialize;
use std::fmt;

/// One rendered node with its sub-conditions and following steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    pub fields: Vec<String>,
    pub types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<Box<NodeView>>,
}

/// Render a chain from its root.
#[must_use]
pub fn render(chain: &Chain) -> Option<NodeView> {
    view(chain, 0)
}

/// Render a chain as a JSON string.
pub fn to_json(chain: &Chain) -> Result<String, StrandError> {
    serde_json::to_string(&render(chain)).map_err(|e| StrandError::Serialization(e.to_string()))
}

fn view(chain: &Chain, slot: u32) -> Option<NodeView> {
    let node = chain.node_at(slot).filter(|n| !n.is_released())?;
    Some(NodeView {
        kind: node.kind().to_string(),
        operator: node.operator().map(str::to_string),
        fields: node.fields().to_vec(),
        types: node.entity_types().iter().cloned().collect(),
        values: node.values().map(|v| v.object_list()),
        children: node
            .children()
            .iter()
            .filter_map(|&child| view(chain, child))
            .collect(),
        next: node.next().and_then(|next| view(chain, next)).map(Box::new),
    })
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "chain {} ({})", self.id().unwrap_or("-"), self.token())?;
        write_steps(f, self, 0, 1)
    }
}

fn write_steps(f: &mut fmt::Formatter<'_>, chain: &Chain, head: u32, depth: usize) -> fmt::Result {
    let mut slot = Some(head);
    while let Some(node) = slot.and_then(|s| chain.node_at(s)) {
        if node.is_released() {
            break;
        }
        write_node(f, node, depth)?;
        for &child in node.children() {
            write_steps(f, chain, child, depth + 1)?;
        }
        slot = node.next();
    }
    Ok(())
}

fn write_node(f: &mut fmt::Formatter<'_>, node: &Node, depth: usize) -> fmt::Result {
    let elements: Vec<String> = node.elements().iter().map(ToString::to_string).collect();
    write!(f, "{:indent$}{}", "", node.kind(), indent = depth * 2)?;
    if let Some(op) = node.operator() {
        write!(f, ":{op}")?;
    }
    writeln!(f, "({}) [{}]", elements.join(", "), node.status())
}
