//! Domains abstract over the queue a pass executes on.
//!
//! Work is divided into two domains:
//! - [`Graphics`]: rasterization work submitted to the graphics queue.
//! - [`Compute`]: dispatch work submitted to the async compute queue.
//!
//! A pass is always constructed for a concrete domain through
//! [`PassBuilder`](crate::graph::pass::PassBuilder); there is no way to create a node
//! without picking its queue type. Scheduling treats both domains identically, the
//! domain only selects the queue a node's command lists are recorded for and executed
//! on.

/// The queue types the sequencer drives.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum QueueType {
    Graphics,
    Compute,
}

/// This trait defines an execution domain. Passes are generic over it so that the
/// queue type is fixed at construction.
pub trait ExecutionDomain: 'static {
    /// The queue this domain's command lists execute on.
    const QUEUE_TYPE: QueueType;
}

/// Graphics queue domain.
pub struct Graphics;
/// Async compute queue domain.
pub struct Compute;

impl ExecutionDomain for Graphics {
    const QUEUE_TYPE: QueueType = QueueType::Graphics;
}

impl ExecutionDomain for Compute {
    const QUEUE_TYPE: QueueType = QueueType::Compute;
}
