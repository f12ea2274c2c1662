use std::sync::mpsc;

use compute::MockCoprocessor;
use glam::Vec3;
use render::{Camera, RenderConfig, Scale};
use runtime::{Checkpoint, Harness, HarnessConfig};
use scene::SceneId;

fn small_config() -> RenderConfig {
    RenderConfig {
        buffer_width: 48,
        buffer_height: 32,
        output_width: 40,
        output_height: 24,
        offset_x: 4,
        offset_y: 4,
        ..RenderConfig::default()
    }
}

fn new_harness(frames: u64, start: Checkpoint) -> Harness<MockCoprocessor> {
    let config = HarnessConfig {
        frames,
        max_consecutive_faults: 3,
        ..HarnessConfig::default()
    };
    Harness::new(MockCoprocessor::new(), small_config(), config, start).unwrap()
}

#[test]
fn nan_camera_frames_are_dropped_and_loop_continues() {
    let mut harness = new_harness(6, Checkpoint::new(SceneId::Sphere, Scale::Quarter)).with_camera(|cp| {
        if cp.frame == 2 || cp.frame == 3 {
            Camera::new(Vec3::NAN, Vec3::Z)
        } else {
            Camera::orbit(cp.time)
        }
    });

    let summary = harness.run().unwrap();
    assert_eq!(summary.frames_drawn, 4);
    assert_eq!(summary.frames_dropped, 2);
    assert_eq!(harness.checkpoint().frame, 6);
    // Dropped frames still step time, so the faulting inputs are not retried.
    assert!((harness.checkpoint().time - 6.0 * 0.025).abs() < 1e-5);
    assert_eq!(harness.renderer().coprocessor().hazards(), 0);
    assert!(harness.renderer().channel().is_halted());
}

#[test]
fn too_many_consecutive_faults_abort_the_run() {
    let mut harness = new_harness(50, Checkpoint::new(SceneId::Morph, Scale::Quarter))
        .with_camera(|_| Camera::new(Vec3::ZERO, Vec3::Y));

    let err = harness.run().unwrap_err();
    assert!(err.to_string().contains("4 consecutive faults"), "{err}");
    assert_eq!(harness.checkpoint().frame, 3);
}

#[test]
fn scene_cycling_wraps_past_the_last_scene() {
    let start = Checkpoint::new(SceneId::Chrome, Scale::Quarter);
    let config = HarnessConfig {
        frames: 2,
        cycle_every: Some(1),
        ..HarnessConfig::default()
    };
    let mut harness = Harness::new(MockCoprocessor::new(), small_config(), config, start).unwrap();

    let summary = harness.run().unwrap();
    assert_eq!(summary.frames_drawn, 2);
    assert_eq!(harness.checkpoint().scene, SceneId::Pillars);
    assert_eq!(summary.last_stats.unwrap().scene, SceneId::Morph);
}

#[test]
fn reloaded_config_applies_between_frames() {
    let (tx, rx) = mpsc::channel();
    let mut harness = new_harness(2, Checkpoint::new(SceneId::Sphere, Scale::Half)).with_reloads(rx);

    let bigger = RenderConfig {
        buffer_width: 64,
        buffer_height: 40,
        ..small_config()
    };
    let broken = RenderConfig {
        output_width: 30,
        ..small_config()
    };
    tx.send(bigger.clone()).unwrap();
    tx.send(broken).unwrap();
    harness.run().unwrap();

    // Only the newest pending config is tried; it is invalid and ignored.
    assert_eq!(harness.renderer().config(), &small_config());
    assert_eq!(harness.framebuffer().width(), 48);

    let (tx, rx) = mpsc::channel();
    let mut harness = new_harness(1, Checkpoint::new(SceneId::Sphere, Scale::Half)).with_reloads(rx);
    tx.send(bigger.clone()).unwrap();
    harness.run().unwrap();
    assert_eq!(harness.renderer().config(), &bigger);
    assert_eq!((harness.framebuffer().width(), harness.framebuffer().height()), (64, 40));
}
