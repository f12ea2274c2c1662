//! Frame loop with warm restart.
//!
//! Everything the loop needs to resume lives in a [`Checkpoint`] owned here,
//! not in the renderer, and `draw` never touches it. A frame that faults is
//! dropped and the loop steps the checkpoint past it.

use std::sync::mpsc::Receiver;

use anyhow::{bail, Context, Result};
use compute::Coprocessor;
use render::{Camera, FrameBuffer, FrameInput, FrameStats, RenderConfig, RenderError, Renderer, Scale};
use scene::SceneId;
use tracing::{debug, info, warn};

/// Resume point of the frame loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Checkpoint {
    pub frame: u64,
    pub time: f32,
    pub scene: SceneId,
    pub scale: Scale,
}

impl Checkpoint {
    #[must_use]
    pub fn new(scene: SceneId, scale: Scale) -> Self {
        Self {
            frame: 0,
            time: 0.0,
            scene,
            scale,
        }
    }

    /// Steps to the next frame, moving on to the next scene every
    /// `cycle_every` frames.
    fn advance(&mut self, time_step: f32, cycle_every: Option<u64>) {
        self.frame += 1;
        self.time += time_step;
        if let Some(n) = cycle_every.filter(|&n| n > 0) {
            if self.frame % n == 0 {
                self.scene = self.scene.next();
                self.time = 0.0;
                info!(scene = %self.scene, "switching scene");
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    pub frames: u64,
    pub time_step: f32,
    pub cycle_every: Option<u64>,
    pub max_consecutive_faults: u32,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            frames: 100,
            time_step: 0.025,
            cycle_every: None,
            max_consecutive_faults: 8,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub frames_drawn: u64,
    pub frames_dropped: u64,
    pub hits: u64,
    pub misses: u64,
    pub last_stats: Option<FrameStats>,
}

pub type CameraSource = Box<dyn FnMut(&Checkpoint) -> Camera>;

pub struct Harness<C: Coprocessor> {
    renderer: Renderer<C>,
    framebuffer: FrameBuffer,
    checkpoint: Checkpoint,
    config: HarnessConfig,
    camera: CameraSource,
    reloads: Option<Receiver<RenderConfig>>,
}

impl<C: Coprocessor> Harness<C> {
    /// # Errors
    ///
    /// Fails when the render config is invalid.
    pub fn new(
        coprocessor: C,
        render_config: RenderConfig,
        config: HarnessConfig,
        start: Checkpoint,
    ) -> Result<Self> {
        let framebuffer = FrameBuffer::new(render_config.buffer_width, render_config.buffer_height)?;
        let renderer = Renderer::new(coprocessor, render_config).context("creating renderer")?;
        Ok(Self {
            renderer,
            framebuffer,
            checkpoint: start,
            config,
            camera: Box::new(|cp: &Checkpoint| Camera::orbit(cp.time)),
            reloads: None,
        })
    }

    /// Replaces the orbiting camera.
    #[must_use]
    pub fn with_camera(mut self, camera: impl FnMut(&Checkpoint) -> Camera + 'static) -> Self {
        self.camera = Box::new(camera);
        self
    }

    /// Render configs received here are applied between frames.
    #[must_use]
    pub fn with_reloads(mut self, reloads: Receiver<RenderConfig>) -> Self {
        self.reloads = Some(reloads);
        self
    }

    /// Runs until `frames` frames have been drawn or dropped.
    ///
    /// # Errors
    ///
    /// Fails on asset or framebuffer errors, and when more than
    /// `max_consecutive_faults` frames fault in a row.
    pub fn run(&mut self) -> Result<RunSummary> {
        self.renderer.init().context("initializing renderer")?;
        let mut summary = RunSummary::default();
        let mut consecutive_faults = 0;

        info!(
            frames = self.config.frames,
            scene = %self.checkpoint.scene,
            scale = %self.checkpoint.scale,
            "starting frame loop"
        );
        while self.checkpoint.frame < self.config.frames {
            self.apply_reloads()?;

            let saved = self.checkpoint;
            let camera = (self.camera)(&saved);
            let input = FrameInput::new(camera, saved.time, saved.scene, saved.scale);

            match self.renderer.draw(&mut self.framebuffer, &input) {
                Ok(stats) => {
                    consecutive_faults = 0;
                    summary.frames_drawn += 1;
                    summary.hits += stats.hits as u64;
                    summary.misses += stats.misses as u64;
                    debug!(frame = saved.frame, elapsed = ?stats.elapsed, "frame ok");
                    summary.last_stats = Some(stats);
                }
                Err(RenderError::NumericFault(what)) => {
                    consecutive_faults += 1;
                    summary.frames_dropped += 1;
                    warn!(
                        frame = saved.frame,
                        time = saved.time,
                        consecutive_faults,
                        "numeric fault in {what}, restarting from checkpoint"
                    );
                    if consecutive_faults > self.config.max_consecutive_faults {
                        bail!(
                            "giving up after {consecutive_faults} consecutive faults at frame {}",
                            saved.frame
                        );
                    }
                }
                Err(e) => return Err(e).context(format!("drawing frame {}", saved.frame)),
            }
            self.checkpoint
                .advance(self.config.time_step, self.config.cycle_every);
        }

        info!(
            drawn = summary.frames_drawn,
            dropped = summary.frames_dropped,
            "frame loop finished"
        );
        Ok(summary)
    }

    fn apply_reloads(&mut self) -> Result<()> {
        let Some(latest) = self.reloads.as_ref().and_then(|rx| rx.try_iter().last()) else {
            return Ok(());
        };
        let size_changed = latest.buffer_width != self.framebuffer.width()
            || latest.buffer_height != self.framebuffer.height();
        match self.renderer.set_config(latest) {
            Ok(()) => {
                if size_changed {
                    let config = self.renderer.config();
                    self.framebuffer = FrameBuffer::new(config.buffer_width, config.buffer_height)?;
                }
                info!(frame = self.checkpoint.frame, "render config reloaded");
            }
            Err(e) => warn!("ignoring reloaded config: {e}"),
        }
        Ok(())
    }

    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        self.checkpoint
    }

    #[must_use]
    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.framebuffer
    }

    #[must_use]
    pub fn renderer(&self) -> &Renderer<C> {
        &self.renderer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_cycles_scene_and_resets_time() {
        let mut cp = Checkpoint::new(SceneId::Textured, Scale::Half);
        cp.advance(0.5, Some(2));
        assert_eq!((cp.frame, cp.time, cp.scene), (1, 0.5, SceneId::Textured));
        cp.advance(0.5, Some(2));
        assert_eq!((cp.frame, cp.time, cp.scene), (2, 0.0, SceneId::Chrome));
        cp.advance(0.5, Some(2));
        cp.advance(0.5, Some(2));
        assert_eq!(cp.scene, SceneId::Morph);
    }

    #[test]
    fn zero_cycle_length_never_switches() {
        let mut cp = Checkpoint::new(SceneId::Sphere, Scale::Full);
        for _ in 0..5 {
            cp.advance(0.025, Some(0));
        }
        assert_eq!(cp.scene, SceneId::Sphere);
        assert_eq!(cp.frame, 5);
    }
}
