//! Debug visualization of a compiled graph's submission plan.

use anyhow::Result;
use petgraph::dot::Dot;
use petgraph::Graph;

use crate::core::device::Device;
use crate::graph::compiler::CompiledGraph;
use crate::sync::domain::QueueType;

/// Trait that is implemented for the compiled graph to help with debugging and
/// visualizing the submission plan.
pub trait GraphViz {
    /// Get the string representation of this graph in `dot` format.
    fn dot(&self) -> Result<String>;
}

impl<'cb, D: Device> GraphViz for CompiledGraph<'cb, D> {
    fn dot(&self) -> Result<String> {
        let mut graph: Graph<String, String> = Graph::new();
        let indices: Vec<_> = self
            .nodes
            .iter()
            .map(|node| {
                graph.add_node(format!(
                    "{} ({:?}, {} barriers)",
                    node.name,
                    node.queue,
                    node.transitions.len()
                ))
            })
            .collect();

        // per-queue execution order
        for queue in [QueueType::Graphics, QueueType::Compute] {
            let mut prev: Option<usize> = None;
            for (index, node) in self.nodes.iter().enumerate() {
                if node.queue != queue {
                    continue;
                }
                if let Some(prev) = prev {
                    graph.add_edge(indices[prev], indices[index], String::from("order"));
                }
                prev = Some(index);
            }
        }

        // cross-queue fence pairs
        for &(producer, consumer) in &self.cross_queue {
            graph.add_edge(indices[producer], indices[consumer], String::from("fence"));
        }

        Ok(format!("{}", Dot::new(&graph)))
    }
}
