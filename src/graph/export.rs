//! Graph export for dependency visualization and debugging.
//!
//! A [`GraphSnapshot`] captures a container's dependency graph together with
//! each service's kind and slot state, and renders it as Graphviz DOT or
//! Mermaid. JSON and YAML output are available with the `graph-export`
//! feature.

#[cfg(feature = "graph-export")]
use serde::Serialize;

use crate::cache::SlotState;
use crate::error::DiResult;
use crate::key::ServiceKey;
use crate::kind::ServiceKind;

/// Output formats for [`GraphSnapshot::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Graphviz DOT
    Dot,
    /// Mermaid flowchart
    Mermaid,
    /// Pretty-printed JSON
    #[cfg(feature = "graph-export")]
    Json,
    /// YAML
    #[cfg(feature = "graph-export")]
    Yaml,
}

/// A service node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "graph-export", derive(Serialize))]
pub struct GraphNode {
    pub key: ServiceKey,
    /// `None` for keys that only appear as a dependency and have no local definition.
    pub kind: Option<ServiceKind>,
    pub state: SlotState,
    pub has_teardown: bool,
}

/// A "depends-on" edge.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "graph-export", derive(Serialize))]
pub struct GraphEdge {
    /// The dependent service
    pub from: ServiceKey,
    /// The service depended upon
    pub to: ServiceKey,
}

/// Graph-level metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "graph-export", derive(Serialize))]
pub struct GraphMetadata {
    pub node_count: usize,
    pub edge_count: usize,
    pub resolved_count: usize,
    /// Keys in construction order
    pub construction_order: Vec<ServiceKey>,
    /// Keys in teardown order
    pub teardown_order: Vec<ServiceKey>,
    #[cfg(feature = "graph-export")]
    pub exported_at: String,
}

/// Point-in-time view of a container's dependency graph.
///
/// # Examples
///
/// ```rust
/// use wirebox::{BoxError, ContainerBuilder, ExportFormat};
///
/// # fn main() -> wirebox::DiResult<()> {
/// let container = ContainerBuilder::new()
///     .add_instance("config", 1u8)
///     .add_factory("repo", ["config"], |_| Ok::<_, BoxError>(2u8))
///     .build()?;
///
/// let dot = container.graph_snapshot().render(ExportFormat::Dot)?;
/// assert!(dot.contains("\"repo\" -> \"config\""));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "graph-export", derive(Serialize))]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub metadata: GraphMetadata,
}

impl GraphSnapshot {
    /// Renders the snapshot in the requested format.
    pub fn render(&self, format: ExportFormat) -> DiResult<String> {
        match format {
            ExportFormat::Dot => Ok(self.to_dot()),
            ExportFormat::Mermaid => Ok(self.to_mermaid()),
            #[cfg(feature = "graph-export")]
            ExportFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| crate::DiError::Export(e.to_string())),
            #[cfg(feature = "graph-export")]
            ExportFormat::Yaml => serde_yaml::to_string(self)
                .map_err(|e| crate::DiError::Export(e.to_string())),
        }
    }

    fn to_dot(&self) -> String {
        let mut output = String::new();
        output.push_str("digraph DependencyGraph {\n");
        output.push_str("  rankdir=TB;\n");
        output.push_str("  node [shape=box];\n\n");

        for node in &self.nodes {
            let kind = node.kind.map_or_else(|| "external".to_string(), |k| k.to_string());
            let color = match node.state {
                SlotState::Resolved => "lightblue",
                SlotState::Pending => "lightyellow",
                SlotState::Absent => "white",
            };
            let periphery = if node.has_teardown { 2 } else { 1 };
            output.push_str(&format!(
                "  \"{}\" [label=\"{}\\n({})\", fillcolor={}, style=filled, peripheries={}];\n",
                node.key, node.key, kind, color, periphery
            ));
        }

        output.push('\n');

        for edge in &self.edges {
            output.push_str(&format!("  \"{}\" -> \"{}\";\n", edge.from, edge.to));
        }

        output.push_str("}\n");
        output
    }

    fn to_mermaid(&self) -> String {
        let mut output = String::new();
        output.push_str("graph TD\n");

        for node in &self.nodes {
            let id = mermaid_id(&node.key);
            match node.kind {
                Some(ServiceKind::AsyncFactory) => output.push_str(&format!("  {}([{}])\n", id, node.key)),
                Some(_) => output.push_str(&format!("  {}[{}]\n", id, node.key)),
                None => output.push_str(&format!("  {}{{{{{}}}}}\n", id, node.key)),
            }
        }

        for edge in &self.edges {
            output.push_str(&format!("  {} --> {}\n", mermaid_id(&edge.from), mermaid_id(&edge.to)));
        }

        output.push_str("\n  classDef resolved fill:#e1f5fe\n");
        output.push_str("  classDef pending fill:#fff3e0\n");

        for node in &self.nodes {
            let class = match node.state {
                SlotState::Resolved => "resolved",
                SlotState::Pending => "pending",
                SlotState::Absent => continue,
            };
            output.push_str(&format!("  class {} {}\n", mermaid_id(&node.key), class));
        }

        output
    }
}

// Mermaid ids must be bare identifiers.
fn mermaid_id(key: &ServiceKey) -> String {
    key.as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
