//! Contains all the logic responsible for frame pacing and render-thread handoff.
//!
//! The frame loop runs on two threads. The application thread calls
//! [`FrameManager::render_frame`] once per frame; the dedicated render thread receives
//! one dispatch per frame and performs, in strict order: drain the deferred command
//! queue into a freshly begun system command list, invoke the application render
//! callback, wait for the in-flight slot this frame reuses, submit the system list,
//! submit the application's sets in the order supplied, present, and signal completion
//! into the slot.
//!
//! The application thread blocks only at the rendezvous with the render thread at the
//! top of [`FrameManager::render_frame`]; this is the sole point where the two threads
//! synchronize, and the frame prepared by the application overlaps the previous
//! frame's recording and submission. A stalled GPU stalls the loop: every wait is an
//! unbounded blocking wait, there is no cancellation and no timeout.
//!
//! # Example
//! ```ignore
//! use deimos::prelude::*;
//!
//! let mut frame = FrameManager::new(device, swapchain, CoreSettings::default())?;
//! loop {
//!     frame.render_frame(|ctx| {
//!         let mut graph = RenderTaskGraph::new();
//!         // declare resources, add passes ...
//!         let compiled = ctx.graph().compile(graph)?;
//!         let submit = ctx.graph().execute(compiled)?;
//!         ctx.submit(submit);
//!         Ok(())
//!     })?;
//! }
//! ```

pub mod stats;

use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::Result;

use crate::core::device::Device;
use crate::core::error::Error;
use crate::core::settings::CoreSettings;
use crate::frame::stats::{FrameStats, FrameTiming};
use crate::graph::manager::GraphManager;
use crate::sync::deferred::DeferredCommandQueue;
use crate::sync::domain::QueueType;
use crate::sync::in_flight::InFlightSlots;
use crate::sync::render_thread::RenderThread;
use crate::sync::submit::{submit_command, SubmitItem, SubmitSet};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum FrameState {
    Idle,
    BeginFrame,
    RenderDispatched,
    RenderSyncing,
}

struct RenderShared<D: Device> {
    device: D,
    swapchain: D::Swapchain,
    deferred: DeferredCommandQueue<D>,
    // Mutated only inside a render dispatch; the application thread never contends.
    graph: Mutex<GraphManager<D>>,
    in_flight: Mutex<InFlightSlots<D>>,
    frame_fence: D::Fence,
    stats: Mutex<FrameStats>,
}

/// Context handed to the application render callback, once per render dispatch.
pub struct RenderFrameContext<'a, D: Device> {
    device: &'a D,
    graph: &'a mut GraphManager<D>,
    submissions: &'a mut Vec<SubmitSet<D>>,
}

impl<'a, D: Device> RenderFrameContext<'a, D> {
    /// The graph manager, for building and compiling this frame's task graph.
    pub fn graph(&mut self) -> &mut GraphManager<D> {
        &mut *self.graph
    }

    /// Append a submission set. Sets are submitted after the system command list, in
    /// the order they were appended.
    pub fn submit(&mut self, set: SubmitSet<D>) {
        self.submissions.push(set);
    }

    /// The device.
    pub fn device(&self) -> &'a D {
        self.device
    }
}

/// Cloneable producer handle for the deferred command queue, usable from any thread.
pub struct RenderCommandQueue<D: Device> {
    shared: Arc<RenderShared<D>>,
}

impl<D: Device> Clone for RenderCommandQueue<D> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<D: Device> RenderCommandQueue<D> {
    /// Queue a command to run at the start of the next render dispatch, in push order,
    /// before the application render callback.
    pub fn push(&self, f: impl FnOnce(&D, &mut D::CommandList) + Send + 'static) {
        self.shared.deferred.push(f);
    }
}

/// Responsible for frame pacing, render-thread handoff and in-flight GPU work
/// tracking.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct FrameManager<D: Device> {
    #[derivative(Debug = "ignore")]
    shared: Arc<RenderShared<D>>,
    #[derivative(Debug = "ignore")]
    render_thread: RenderThread,
    state: FrameState,
    frame_index: u64,
}

impl<D: Device> FrameManager<D> {
    /// Initialize the frame loop. Fatal initialization failures (fence creation, render
    /// thread spawn, a zero-buffer swap chain) are reported here and should abort
    /// startup.
    pub fn new(device: D, swapchain: D::Swapchain, settings: CoreSettings) -> Result<Self> {
        if settings.frames_in_flight == 0 {
            return Err(Error::InitFailed("at least one frame in flight is required").into());
        }
        if settings.stats_depth < 2 {
            return Err(Error::InitFailed("statistics ring needs a depth of at least two").into());
        }
        let back_buffers = device.back_buffer_count(&swapchain);
        if back_buffers == 0 {
            return Err(Error::InitFailed("swap chain reports zero back buffers").into());
        }

        // The slot ring must cover every back buffer the swap chain can hand out.
        let slots = settings.frames_in_flight.max(back_buffers);
        let frame_fence = device.create_fence()?;
        let graph = GraphManager::new(device.clone(), &settings)?;
        info!(
            "`{}`: {} in-flight slots, {} back buffers",
            settings.name, slots, back_buffers
        );

        Ok(Self {
            shared: Arc::new(RenderShared {
                device,
                swapchain,
                deferred: DeferredCommandQueue::new(),
                graph: Mutex::new(graph),
                in_flight: Mutex::new(InFlightSlots::new(slots)),
                frame_fence,
                stats: Mutex::new(FrameStats::new(settings.stats_depth)),
            }),
            render_thread: RenderThread::spawn()?,
            state: FrameState::Idle,
            frame_index: 0,
        })
    }

    /// Run one frame of the state machine:
    /// `Idle → BeginFrame → RenderDispatched → RenderSyncing → Idle`.
    ///
    /// Waits for the previous render dispatch (the sole thread rendezvous), advances
    /// per-frame bookkeeping, then hands this frame's dispatch to the render thread
    /// and returns without waiting for it, so the caller can prepare the next frame
    /// while this one records and submits.
    pub fn render_frame<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnOnce(&mut RenderFrameContext<'_, D>) -> Result<()> + Send + 'static,
    {
        // Rendezvous with the previous dispatch before touching any frame state.
        self.state = FrameState::RenderSyncing;
        let wait_start = Instant::now();
        self.render_thread.wait()?;
        let wait_render_us = wait_start.elapsed().as_micros() as u64;
        self.state = FrameState::Idle;

        // Device-side bookkeeping; the previous dispatch has fully retired, so the
        // pool and graph state are safe to touch from this thread.
        self.state = FrameState::BeginFrame;
        self.frame_index += 1;
        self.shared.graph.lock().map_err(Error::from)?.begin_frame();
        self.shared.stats.lock().map_err(Error::from)?.push(FrameTiming {
            wait_render_us,
            ..Default::default()
        });

        let shared = self.shared.clone();
        self.render_thread
            .dispatch(move || render_dispatch(shared, callback))?;
        self.state = FrameState::RenderDispatched;
        Ok(())
    }

    /// Block until the render thread and every in-flight GPU submission have finished.
    /// Call before tearing down device objects.
    pub fn wait_idle(&mut self) -> Result<()> {
        self.render_thread.wait()?;
        let mut in_flight = self.shared.in_flight.lock().map_err(Error::from)?;
        in_flight.wait_all(&self.shared.device, &self.shared.frame_fence)?;
        self.state = FrameState::Idle;
        Ok(())
    }

    /// Queue a render command from this thread; see [`RenderCommandQueue::push`].
    pub fn defer(&self, f: impl FnOnce(&D, &mut D::CommandList) + Send + 'static) {
        self.shared.deferred.push(f);
    }

    /// A cloneable producer handle for queueing render commands from other threads.
    pub fn render_commands(&self) -> RenderCommandQueue<D> {
        RenderCommandQueue {
            shared: self.shared.clone(),
        }
    }

    /// Inspect the frame timing statistics.
    pub fn with_stats<R>(&self, f: impl FnOnce(&FrameStats) -> R) -> R {
        let stats = self.shared.stats.lock().unwrap();
        f(&stats)
    }

    /// Frames started so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }
}

fn render_dispatch<D, F>(shared: Arc<RenderShared<D>>, callback: F) -> Result<()>
where
    D: Device,
    F: FnOnce(&mut RenderFrameContext<'_, D>) -> Result<()>,
{
    let device = &shared.device;

    // (1) Flip the deferred queue and drain the captured commands, in push order,
    // into a freshly rented and already begun system command list.
    let mut graph = shared.graph.lock().map_err(Error::from)?;
    let mut system_list = graph.new_frame_command_list()?;
    shared.deferred.flip();
    shared.deferred.drain(device, &mut system_list.list);

    // (2) The application render callback appends its submission sets.
    let mut submissions: Vec<SubmitSet<D>> = Vec::new();
    let callback_start = Instant::now();
    let callback_result = {
        let mut ctx = RenderFrameContext {
            device,
            graph: &mut *graph,
            submissions: &mut submissions,
        };
        callback(&mut ctx)
    };
    let app_callback_us = callback_start.elapsed().as_micros() as u64;
    drop(graph);

    // Close the system list before anything fallible; an open list must never reach
    // the rental pool.
    let end_result = device.end_command_list(&mut system_list.list);
    callback_result?;
    end_result?;

    // (3) Wait until the in-flight slot this frame reuses is free.
    let mut in_flight = shared.in_flight.lock().map_err(Error::from)?;
    let gpu_start = Instant::now();
    in_flight.wait_reuse(device, &shared.frame_fence)?;
    let wait_gpu_us = gpu_start.elapsed().as_micros() as u64;

    // (4) Submit the system command list.
    let mut system_set = SubmitSet::new();
    system_set
        .graphics
        .push(SubmitItem::CommandList(system_list));
    submit_command(device, &mut system_set)?;

    // (5) Application submission sets, in the order supplied.
    for set in submissions.iter_mut() {
        submit_command(device, set)?;
    }

    // (6) Present.
    let present_start = Instant::now();
    device.present(&shared.swapchain)?;
    let present_us = present_start.elapsed().as_micros() as u64;

    // (7) Signal completion into the slot. The retired sets keep their rented lists
    // and fences out of the pools until the GPU passes this fence value.
    let value = in_flight.next_value();
    device.queue_signal(QueueType::Graphics, &shared.frame_fence, value)?;
    let mut retired = submissions;
    retired.push(system_set);
    in_flight.publish(value, retired);
    drop(in_flight);

    let mut stats = shared.stats.lock().map_err(Error::from)?;
    if let Some(timing) = stats.latest_mut() {
        timing.app_callback_us = app_callback_us;
        timing.wait_gpu_us = wait_gpu_us;
        timing.present_us = present_us;
        timing.complete = true;
    }
    Ok(())
}
