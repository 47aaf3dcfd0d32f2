//! Frame synchronization and render task graph core
//!
//! Deimos is the frame-pacing and render-task-graph (RTG) heart of a real-time renderer.
//! It pipelines CPU frame preparation against a dedicated render thread and a further-lagging
//! GPU, compiles a per-frame list of graphics/compute tasks into a correctly ordered,
//! correctly barrier-transitioned, multi-queue submission sequence, and manages a pool of
//! transient textures whose lifetime is graph-scoped.
//!
//! The native graphics API is not bound here. Everything the core needs from it (command
//! list begin/end, resource barriers, queue execute/signal, fence waits, present) is
//! consumed through the [`Device`](crate::core::device::Device) trait, so the same core
//! drives any backend that can express those primitives.
//!
//! # Example
//!
//! A frame loop takes a device implementation and a swapchain, then drives
//! [`FrameManager::render_frame`](crate::frame::FrameManager::render_frame) once per frame:
//! ```ignore
//! use deimos::prelude::*;
//!
//! let settings = SettingsBuilder::new()
//!     .name("deimos demo app")
//!     .frames_in_flight(2)
//!     .build();
//! let mut frame = FrameManager::new(device, swapchain, settings)?;
//!
//! loop {
//!     frame.render_frame(|ctx| {
//!         let mut graph = RenderTaskGraph::new();
//!         let color = graph.texture(ResourceDesc::new(1920, 1080, PixelFormat::Rgba16Float));
//!         graph.add_pass(
//!             PassBuilder::graphics("main")
//!                 .render_target(color)
//!                 .executor(|pass: &mut PassContext<'_, _>| {
//!                     // record draws into pass.command_list(0)
//!                     Ok(())
//!                 })
//!                 .build(),
//!         );
//!         let compiled = ctx.graph().compile(graph)?;
//!         let submit = ctx.graph().execute(compiled)?;
//!         ctx.submit(submit);
//!         Ok(())
//!     })?;
//! }
//! ```
//!
//! For further documentation, check out the following modules
//! - [`graph`] for declaring passes and compiling the task graph.
//! - [`frame`] for the application/render-thread frame loop.
//! - [`resource`] for transient resource descriptors, handles and pooling.
//! - [`sync`] for queue domains, submission sequencing and the deferred command queue.
//! - [`core`] for the device boundary, settings and the error type.

#[macro_use]
extern crate derivative;
#[macro_use]
extern crate log;

pub mod prelude;
pub use crate::prelude::*;

pub mod core;
pub mod frame;
pub mod graph;
pub mod resource;
pub mod sync;
pub mod util;
