//! Ordering rules that hold without a GPU: every check runs before any
//! graphics call is made.

use meshview_core::RendererConfig;
use meshview_renderer::draw::{IndexedDrawSink, record_draws};
use meshview_renderer::{BootstrapStep, PhaseTracker, Renderer, RendererError};
use meshview_scene::{DrawRange, Scene, draw_ranges_from_markers};

fn fresh_renderer() -> Renderer {
    Renderer::new(&RendererConfig::default())
}

#[test]
fn test_every_step_but_the_first_is_rejected_on_a_fresh_renderer() {
    let mut renderer = fresh_renderer();
    let scene = Scene::new();
    let shaders = meshview_renderer::ShaderSources::default();

    let results = [
        (BootstrapStep::Device, renderer.create_device()),
        (BootstrapStep::Swapchain, renderer.create_swapchain()),
        (BootstrapStep::DepthBuffer, renderer.create_depth_buffer()),
        (BootstrapStep::UniformBuffer, renderer.create_uniform_buffer()),
        (BootstrapStep::Descriptors, renderer.create_descriptors()),
        (BootstrapStep::RenderPass, renderer.create_render_pass()),
        (BootstrapStep::Framebuffers, renderer.create_framebuffers()),
        (
            BootstrapStep::GeometryBuffers,
            renderer.create_geometry_buffers(&scene),
        ),
        (BootstrapStep::Pipeline, renderer.create_pipeline(&shaders)),
        (BootstrapStep::CommandBuffers, renderer.create_command_buffers()),
        (BootstrapStep::SyncObjects, renderer.create_sync_objects()),
    ];

    for (expected_step, result) in results {
        match result {
            Err(RendererError::Precondition { step, missing }) => {
                assert_eq!(step, expected_step);
                assert!(expected_step.prerequisites().contains(&missing));
            }
            other => panic!("{expected_step}: expected precondition error, got {other:?}"),
        }
    }
    assert!(renderer.phases().teardown_order().is_empty());
}

#[test]
fn test_steps_cannot_skip_ahead_of_their_predecessor() {
    let mut tracker = PhaseTracker::new();
    for step in [
        BootstrapStep::Instance,
        BootstrapStep::Surface,
        BootstrapStep::Device,
    ] {
        tracker.require(step).unwrap();
        tracker.complete(step);
    }

    assert!(matches!(
        tracker.require(BootstrapStep::SyncObjects),
        Err(RendererError::Precondition {
            step: BootstrapStep::SyncObjects,
            missing: BootstrapStep::CommandBuffers,
        })
    ));
    assert!(matches!(
        tracker.require(BootstrapStep::GeometryBuffers),
        Err(RendererError::Precondition {
            missing: BootstrapStep::Framebuffers,
            ..
        })
    ));
    assert!(tracker.require(BootstrapStep::Swapchain).is_ok());
}

#[test]
fn test_device_reports_missing_instance() {
    let mut renderer = fresh_renderer();
    let err = renderer.create_device().unwrap_err();
    assert_eq!(
        err.to_string(),
        "device requires instance to be created first"
    );
}

#[test]
fn test_draw_frame_before_bootstrap_is_an_error() {
    let mut renderer = fresh_renderer();
    assert!(matches!(
        renderer.draw_frame(),
        Err(RendererError::NotBootstrapped {
            missing: BootstrapStep::Instance,
            ..
        })
    ));
}

#[test]
fn test_shutdown_of_a_fresh_renderer_is_a_noop() {
    let mut renderer = fresh_renderer();
    renderer.shutdown();
    assert!(!renderer.phases().is_fully_bootstrapped());
    drop(renderer);
}

#[test]
fn test_teardown_of_a_partial_bootstrap_is_reverse_creation_order() {
    let mut tracker = PhaseTracker::new();
    let created = [
        BootstrapStep::Instance,
        BootstrapStep::Surface,
        BootstrapStep::Device,
        BootstrapStep::Swapchain,
        BootstrapStep::DepthBuffer,
    ];
    for step in created {
        tracker.require(step).unwrap();
        tracker.complete(step);
    }

    let order = tracker.teardown_order();
    let mut expected = created.to_vec();
    expected.reverse();
    assert_eq!(order, expected);

    for step in order {
        tracker.mark_destroyed(step).unwrap();
    }
    assert!(tracker.teardown_order().is_empty());
}

#[test]
fn test_destroying_a_step_early_is_refused() {
    let mut tracker = PhaseTracker::new();
    for step in BootstrapStep::ALL {
        tracker.require(step).unwrap();
        tracker.complete(step);
    }
    for step in BootstrapStep::ALL {
        if step == BootstrapStep::SyncObjects {
            continue;
        }
        assert!(
            tracker.mark_destroyed(step).is_err(),
            "{step} was destroyed while its dependents were alive"
        );
    }
}

#[derive(Default)]
struct Recorder(Vec<(u32, u32)>);

impl IndexedDrawSink for Recorder {
    fn draw_range(&mut self, range: DrawRange) {
        self.0.push((range.index_count, range.first_index));
    }
}

#[test]
fn test_markers_with_an_empty_model_replay_three_draws() {
    let mut recorder = Recorder::default();
    let draws = record_draws(&mut recorder, draw_ranges_from_markers(&[3, 3, 9]));
    assert_eq!(draws, 3);
    assert_eq!(recorder.0, vec![(3, 0), (0, 3), (6, 3)]);
}
