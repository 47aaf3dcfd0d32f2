//! The render task graph: pass declaration, compilation and execution.
//!
//! A [`RenderTaskGraph`](compiler::RenderTaskGraph) is built fresh every frame. The
//! application declares transient textures and imports external resources, then
//! appends passes built with [`PassBuilder`](pass::PassBuilder). Passes execute in
//! registration order; the compiler performs no reordering, it only resolves resource
//! state transitions and inserts the cross-queue fence operations the declared
//! accesses require. [`GraphManager`](manager::GraphManager) owns the pools backing
//! the graph and drives the per-frame compile/execute cycle.

pub mod compiler;
pub mod manager;
pub mod pass;
pub mod stage;
pub mod viz;
