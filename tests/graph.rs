use std::sync::Arc;

use anyhow::Result;
use deimos::prelude::*;
use layout::backends::svg::SVGWriter;
use layout::gv;
use layout::gv::GraphBuilder;

mod framework;

use framework::{DeviceOp, MockDevice, NoteExecutor};

/// Render a `dot` string through the same pipeline a human would use to look at it.
fn render_dot(dot: &str) -> String {
    let mut parser = gv::DotParser::new(dot);
    match parser.process() {
        Ok(g) => {
            let mut svg = SVGWriter::new();
            let mut builder = GraphBuilder::new();
            builder.visit_graph(&g);
            let mut vg = builder.get();
            vg.do_it(false, false, false, &mut svg);
            svg.finalize()
        }
        Err(e) => {
            parser.print_error();
            panic!("dot render error: {}", e);
        }
    }
}

fn fence_signals(device: &MockDevice) -> Vec<(QueueType, u64, u64)> {
    device
        .ops()
        .iter()
        .filter_map(|op| match op {
            DeviceOp::Signal {
                queue,
                fence,
                value,
            } => Some((*queue, *fence, *value)),
            _ => None,
        })
        .collect()
}

fn fence_waits(device: &MockDevice) -> Vec<(QueueType, u64, u64)> {
    device
        .ops()
        .iter()
        .filter_map(|op| match op {
            DeviceOp::QueueWait {
                queue,
                fence,
                value,
            } => Some((*queue, *fence, *value)),
            _ => None,
        })
        .collect()
}

#[test]
fn same_queue_write_then_read_needs_one_barrier_and_no_fence() -> Result<()> {
    let (device, mut manager) = framework::make_manager();
    manager.begin_frame();

    let mut graph = RenderTaskGraph::new();
    let color = graph.texture(ResourceDesc::new(256, 256, PixelFormat::Rgba8Unorm));
    graph.add_pass(
        PassBuilder::graphics("draw")
            .render_target(color)
            .executor(NoteExecutor("draw"))
            .build(),
    );
    graph.add_pass(
        PassBuilder::graphics("sample")
            .shader_read(color)
            .executor(NoteExecutor("sample"))
            .build(),
    );

    let compiled = manager.compile(graph)?;
    assert_eq!(compiled.num_cross_queue_edges(), 0);
    let mut submit = manager.execute(compiled)?;
    submit_command(&device, &mut submit)?;

    let rt_to_read = device
        .barriers()
        .iter()
        .filter(|(_, before, after)| {
            *before == ResourceState::RenderTarget && *after == ResourceState::ShaderResource
        })
        .count();
    assert_eq!(rt_to_read, 1);
    assert!(fence_signals(&device).is_empty());
    assert!(fence_waits(&device).is_empty());
    Ok(())
}

#[test]
fn cross_queue_write_then_read_needs_one_fence_pair() -> Result<()> {
    let (device, mut manager) = framework::make_manager();
    manager.begin_frame();

    let mut graph = RenderTaskGraph::new();
    let color = graph.texture(ResourceDesc::new(512, 512, PixelFormat::Rgba16Float));
    graph.add_pass(
        PassBuilder::graphics("draw")
            .render_target(color)
            .executor(NoteExecutor("draw"))
            .build(),
    );
    graph.add_pass(
        PassBuilder::compute("reduce")
            .shader_read(color)
            .executor(NoteExecutor("reduce"))
            .build(),
    );

    let compiled = manager.compile(graph)?;
    assert_eq!(compiled.num_cross_queue_edges(), 1);
    let mut submit = manager.execute(compiled)?;
    submit_command(&device, &mut submit)?;

    let signals = fence_signals(&device);
    let waits = fence_waits(&device);
    assert_eq!(signals.len(), 1);
    assert_eq!(waits.len(), 1);
    // same fence, same value, producer signals on graphics, consumer waits on compute
    assert_eq!(signals[0].0, QueueType::Graphics);
    assert_eq!(waits[0].0, QueueType::Compute);
    assert_eq!(signals[0].1, waits[0].1);
    assert_eq!(signals[0].2, waits[0].2);

    // the state transition is still required on top of the fence pair
    let rt_to_read = device
        .barriers()
        .iter()
        .filter(|(_, before, after)| {
            *before == ResourceState::RenderTarget && *after == ResourceState::ShaderResource
        })
        .count();
    assert_eq!(rt_to_read, 1);
    Ok(())
}

#[test]
fn matching_state_never_emits_a_barrier() -> Result<()> {
    let (device, mut manager) = framework::make_manager();
    manager.begin_frame();

    let mut graph = RenderTaskGraph::new();
    let color = graph.texture(ResourceDesc::new(64, 64, PixelFormat::Rgba8Unorm));
    graph.add_pass(
        PassBuilder::graphics("read once")
            .shader_read(color)
            .executor(NoteExecutor("first"))
            .build(),
    );
    graph.add_pass(
        PassBuilder::graphics("read again")
            .shader_read(color)
            .executor(NoteExecutor("second"))
            .build(),
    );

    let mut submit = {
        let compiled = manager.compile(graph)?;
        manager.execute(compiled)?
    };
    submit_command(&device, &mut submit)?;

    // one transition out of the initial state, none between the two reads
    assert_eq!(device.barriers().len(), 1);
    assert_eq!(
        device.barriers()[0].1,
        ResourceState::Common,
        "first transition starts from the pool seed state"
    );
    Ok(())
}

#[test]
fn passes_record_and_execute_in_registration_order() -> Result<()> {
    let (device, mut manager) = framework::make_manager();
    manager.begin_frame();

    let mut graph = RenderTaskGraph::new();
    let a = graph.texture(ResourceDesc::new(128, 128, PixelFormat::Rgba8Unorm));
    graph.add_pass(
        PassBuilder::graphics("first")
            .render_target(a)
            .executor(NoteExecutor("first"))
            .build(),
    );
    graph.add_pass(
        PassBuilder::compute("second")
            .unordered_access(a)
            .executor(NoteExecutor("second"))
            .build(),
    );
    graph.add_pass(
        PassBuilder::graphics("third")
            .shader_read(a)
            .executor(NoteExecutor("third"))
            .build(),
    );

    let compiled = manager.compile(graph)?;
    let mut submit = manager.execute(compiled)?;
    submit_command(&device, &mut submit)?;

    let first = device.position(|op| *op == DeviceOp::Note("first")).unwrap();
    let second = device.position(|op| *op == DeviceOp::Note("second")).unwrap();
    let third = device.position(|op| *op == DeviceOp::Note("third")).unwrap();
    assert!(first < second && second < third);

    // graphics sees two executes in order, compute one
    let graphics_executes = device.count(|op| matches!(op, DeviceOp::Execute { queue: QueueType::Graphics, .. }));
    let compute_executes = device.count(|op| matches!(op, DeviceOp::Execute { queue: QueueType::Compute, .. }));
    assert_eq!(graphics_executes, 2);
    assert_eq!(compute_executes, 1);
    Ok(())
}

#[test]
fn swapchain_is_left_presentable() -> Result<()> {
    let (device, mut manager) = framework::make_manager();
    manager.begin_frame();

    let desc = ResourceDesc::new(1280, 720, PixelFormat::Bgra8Unorm);
    let back_buffer = Arc::new(device.create_texture(&desc)?);

    let mut graph = RenderTaskGraph::new();
    let swap = graph.import_swapchain(
        back_buffer.clone(),
        desc,
        ResourceState::Present,
        ResourceState::Present,
    );
    assert!(swap.is_external() && swap.is_swapchain() && swap.is_valid());

    graph.add_pass(
        PassBuilder::graphics("composite")
            .render_target(swap)
            .executor(NoteExecutor("composite"))
            .build(),
    );

    let compiled = manager.compile(graph)?;
    let mut submit = manager.execute(compiled)?;
    submit_command(&device, &mut submit)?;

    let barriers = device.barriers();
    assert_eq!(
        barriers,
        vec![
            (back_buffer.id, ResourceState::Present, ResourceState::RenderTarget),
            (back_buffer.id, ResourceState::RenderTarget, ResourceState::Present),
        ]
    );

    // the trailing transition rides its own list, executed after the pass's list
    let graphics_executes = device.count(|op| matches!(op, DeviceOp::Execute { queue: QueueType::Graphics, .. }));
    assert_eq!(graphics_executes, 2);
    Ok(())
}

#[test]
fn a_pass_may_request_multiple_command_lists() -> Result<()> {
    struct SplitExecutor(ResourceHandle);

    impl PassExecutor<MockDevice> for SplitExecutor {
        fn execute(&mut self, pass: &mut PassContext<'_, MockDevice>) -> Result<()> {
            assert_eq!(pass.command_list_count(), 2);
            let _second = pass.command_list(1);
            // declared resources resolve to concrete textures and views
            let view = pass.resources().view(self.0, ViewKind::Target);
            assert_eq!(view.kind, ViewKind::Target);
            pass.device().note("split");
            Ok(())
        }
    }

    let (device, mut manager) = framework::make_manager();
    manager.begin_frame();

    let mut graph = RenderTaskGraph::new();
    let color = graph.texture(ResourceDesc::new(256, 256, PixelFormat::Rgba8Unorm));
    graph.add_pass(
        PassBuilder::graphics("split")
            .render_target(color)
            .command_lists(2)
            .executor(SplitExecutor(color))
            .build(),
    );

    let compiled = manager.compile(graph)?;
    let mut submit = manager.execute(compiled)?;
    submit_command(&device, &mut submit)?;

    // both lists are begun, closed, and executed in order on the graphics queue
    assert_eq!(device.count(|op| matches!(op, DeviceOp::Begin { .. })), 2);
    assert_eq!(device.count(|op| matches!(op, DeviceOp::End { .. })), 2);
    assert_eq!(
        device.count(|op| matches!(op, DeviceOp::Execute { queue: QueueType::Graphics, .. })),
        2
    );
    assert_eq!(device.count(|op| *op == DeviceOp::Note("split")), 1);
    Ok(())
}

#[test]
fn undeclared_handle_fails_the_compile() -> Result<()> {
    let (_device, mut manager) = framework::make_manager();
    manager.begin_frame();

    // a handle minted by a different graph is meaningless here
    let mut other = RenderTaskGraph::<MockDevice>::new();
    let stray = other.texture(ResourceDesc::new(4, 4, PixelFormat::R8Unorm));

    let mut graph = RenderTaskGraph::new();
    graph.add_pass(
        PassBuilder::graphics("broken")
            .shader_read(stray)
            .executor(NoteExecutor("broken"))
            .build(),
    );

    let result = manager.compile(graph);
    let err = result.err().expect("compile must reject the stray handle");
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::InvalidHandle(_))
    ));
    Ok(())
}

#[test]
fn invalid_handle_is_reserved() {
    assert!(!ResourceHandle::INVALID.is_valid());
    assert!(!ResourceHandle::INVALID.is_external());
    assert!(!ResourceHandle::INVALID.is_swapchain());
}

#[test]
fn compiled_plan_renders_to_dot() -> Result<()> {
    let (_device, mut manager) = framework::make_manager();
    manager.begin_frame();

    let mut graph = RenderTaskGraph::new();
    let color = graph.texture(ResourceDesc::new(320, 240, PixelFormat::Rgba8Unorm));
    graph.add_pass(
        PassBuilder::graphics("shadow")
            .render_target(color)
            .executor(NoteExecutor("shadow"))
            .build(),
    );
    graph.add_pass(
        PassBuilder::compute("blur")
            .shader_read(color)
            .executor(NoteExecutor("blur"))
            .build(),
    );

    let compiled = manager.compile(graph)?;
    let dot = compiled.dot()?;
    assert!(dot.contains("shadow"));
    assert!(dot.contains("blur"));
    assert!(dot.contains("fence"));

    let svg = render_dot(&dot);
    assert!(!svg.is_empty());
    Ok(())
}
