//! CPU side of the ray marcher.
//!
//! [`Renderer`] owns the job channel and drives one frame at a time: it
//! resets the co-processor with the camera origin, walks the output window
//! row by row keeping one pixel-pair march in flight, and shades each pair
//! on the CPU while the next one runs.
//!
//! ```no_run
//! use compute::MockCoprocessor;
//! use render::{Camera, FrameBuffer, FrameInput, RenderConfig, Renderer, Scale};
//! use scene::SceneId;
//!
//! let config = RenderConfig::default();
//! let mut fb = FrameBuffer::new(config.buffer_width, config.buffer_height)?;
//! let mut renderer = Renderer::new(MockCoprocessor::new(), config)?;
//! renderer.init()?;
//! let stats = renderer.draw(
//!     &mut fb,
//!     &FrameInput::new(Camera::orbit(0.0), 0.0, SceneId::Sphere, Scale::Half),
//! )?;
//! println!("{} hits", stats.hits);
//! # Ok::<(), render::RenderError>(())
//! ```
#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]

pub mod camera;
pub mod config;
pub mod driver;
pub mod framebuffer;

use std::time::Duration;

use compute::{Coprocessor, JobChannel};
use glam::Vec3;
use scene::{AssetError, Assets, Scene, SceneId};
use thiserror::Error;

pub use camera::Camera;
pub use config::{RenderConfig, Scale};
pub use framebuffer::FrameBuffer;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("invalid render config: {0}")]
    InvalidConfig(String),
    #[error("framebuffer {width}x{height} is smaller than the configured {needed_width}x{needed_height}")]
    FramebufferTooSmall {
        width: usize,
        height: usize,
        needed_width: usize,
        needed_height: usize,
    },
    #[error("non-finite {0} in frame setup")]
    NumericFault(&'static str),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything one frame depends on besides the renderer itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    pub camera: Camera,
    pub time: f32,
    pub scene: SceneId,
    pub scale: Scale,
    /// Sample coordinate to report in [`FrameStats::probe`].
    pub probe: Option<(usize, usize)>,
}

impl FrameInput {
    #[must_use]
    pub fn new(camera: Camera, time: f32, scene: SceneId, scale: Scale) -> Self {
        Self {
            camera,
            time,
            scene,
            scale,
            probe: None,
        }
    }

    #[must_use]
    pub fn with_probe(mut self, x: usize, y: usize) -> Self {
        self.probe = Some((x, y));
        self
    }
}

/// One marched and shaded sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneSample {
    pub direction: Vec3,
    /// Total marched distance.
    pub distance: f32,
    pub hit: bool,
    pub position: Vec3,
    /// Surface normal, only for hits.
    pub normal: Option<Vec3>,
    /// Field value at the final step.
    pub last_distance: f32,
    pub color: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameStats {
    pub scene: SceneId,
    pub scale: Scale,
    pub samples: usize,
    pub hits: usize,
    pub misses: usize,
    pub initial_distance: f32,
    pub elapsed: Duration,
    pub probe: Option<LaneSample>,
}

impl FrameStats {
    fn new(scene: SceneId, scale: Scale, initial_distance: f32) -> Self {
        Self {
            scene,
            scale,
            samples: 0,
            hits: 0,
            misses: 0,
            initial_distance,
            elapsed: Duration::ZERO,
            probe: None,
        }
    }

    fn record(&mut self, sample: &LaneSample) {
        self.samples += 1;
        if sample.hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }
}

/// Frame driver over a co-processor backend.
pub struct Renderer<C: Coprocessor> {
    channel: JobChannel<C>,
    config: RenderConfig,
    assets: Option<Assets>,
}

impl<C: Coprocessor> Renderer<C> {
    /// # Errors
    ///
    /// [`RenderError::InvalidConfig`] when `config` fails validation.
    pub fn new(coprocessor: C, config: RenderConfig) -> Result<Self, RenderError> {
        config.validate()?;
        Ok(Self {
            channel: JobChannel::new(coprocessor),
            config,
            assets: None,
        })
    }

    /// Loads textures and leaves the co-processor halted.
    ///
    /// Called by the first [`Self::draw`] when skipped.
    ///
    /// # Errors
    ///
    /// [`RenderError::Asset`] when `asset_dir` is set and unreadable.
    pub fn init(&mut self) -> Result<(), RenderError> {
        let assets = match &self.config.asset_dir {
            Some(dir) => {
                tracing::info!("loading textures from {}", dir.display());
                Assets::load_dir(dir)?
            }
            None => {
                tracing::info!("using procedural textures");
                Assets::procedural()
            }
        };
        self.assets = Some(assets);
        self.channel.stop();
        self.channel.sync();
        Ok(())
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.assets.is_some()
    }

    /// Renders one frame into the configured window of `fb`.
    ///
    /// # Errors
    ///
    /// - [`RenderError::NumericFault`] for a non-finite camera or time, or
    ///   when the scene distance or screen basis derived from them is not
    ///   usable. The frame is abandoned with the channel halted.
    /// - [`RenderError::FramebufferTooSmall`] when `fb` cannot hold the
    ///   configured buffer.
    /// - Anything [`Self::init`] returns on first use.
    pub fn draw(&mut self, fb: &mut FrameBuffer, input: &FrameInput) -> Result<FrameStats, RenderError> {
        if !input.camera.is_finite() {
            return Err(RenderError::NumericFault("camera"));
        }
        if !input.time.is_finite() {
            return Err(RenderError::NumericFault("time"));
        }
        if fb.width() < self.config.buffer_width || fb.height() < self.config.buffer_height {
            return Err(RenderError::FramebufferTooSmall {
                width: fb.width(),
                height: fb.height(),
                needed_width: self.config.buffer_width,
                needed_height: self.config.buffer_height,
            });
        }
        if self.assets.is_none() {
            self.init()?;
        }
        let Some(assets) = self.assets.as_ref() else {
            return Err(RenderError::InvalidConfig("textures not loaded".into()));
        };

        let frame = driver::FrameSetup {
            config: &self.config,
            assets,
            camera: input.camera,
            time: input.time,
            scene: input.scene,
            scale: input.scale,
            probe: input.probe,
        };
        let channel = &mut self.channel;
        let stats = match input.scene {
            SceneId::Morph => draw_scene::<scene::Morph, C>(channel, fb, &frame),
            SceneId::Pillars => draw_scene::<scene::Pillars, C>(channel, fb, &frame),
            SceneId::Octahedra => draw_scene::<scene::Octahedra, C>(channel, fb, &frame),
            SceneId::Sphere => draw_scene::<scene::Sphere, C>(channel, fb, &frame),
            SceneId::Textured => draw_scene::<scene::Textured, C>(channel, fb, &frame),
            SceneId::Chrome => draw_scene::<scene::Chrome, C>(channel, fb, &frame),
        }?;

        tracing::debug!(
            scene = %stats.scene,
            scale = %stats.scale,
            hits = stats.hits,
            misses = stats.misses,
            "frame drawn"
        );
        Ok(stats)
    }

    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Swaps the config between frames. Textures reload on the next draw
    /// when the asset directory changes.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidConfig`]; the old config stays active.
    pub fn set_config(&mut self, config: RenderConfig) -> Result<(), RenderError> {
        config.validate()?;
        if config.asset_dir != self.config.asset_dir {
            self.assets = None;
        }
        self.config = config;
        Ok(())
    }

    #[must_use]
    pub fn assets(&self) -> Option<&Assets> {
        self.assets.as_ref()
    }

    #[must_use]
    pub fn channel(&self) -> &JobChannel<C> {
        &self.channel
    }

    #[must_use]
    pub fn coprocessor(&self) -> &C {
        self.channel.coprocessor()
    }

    pub fn into_coprocessor(self) -> C {
        self.channel.into_inner()
    }
}

fn draw_scene<S: Scene, C: Coprocessor>(
    channel: &mut JobChannel<C>,
    fb: &mut FrameBuffer,
    frame: &driver::FrameSetup<'_>,
) -> Result<FrameStats, RenderError> {
    match frame.scale {
        Scale::Full => driver::draw_scaled::<S, C, 1>(channel, fb, frame),
        Scale::Half => driver::draw_scaled::<S, C, 2>(channel, fb, frame),
        Scale::Quarter => driver::draw_scaled::<S, C, 4>(channel, fb, frame),
    }
}

#[cfg(test)]
mod tests {
    use compute::MockCoprocessor;

    use super::*;

    fn renderer() -> Renderer<MockCoprocessor> {
        Renderer::new(MockCoprocessor::new(), RenderConfig::default()).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = RenderConfig {
            output_width: 10,
            ..RenderConfig::default()
        };
        assert!(matches!(
            Renderer::new(MockCoprocessor::new(), config),
            Err(RenderError::InvalidConfig(_))
        ));
    }

    #[test]
    fn nan_time_faults_without_dispatching() {
        let mut renderer = renderer();
        let mut fb = FrameBuffer::new(320, 240).unwrap();
        let input = FrameInput::new(Camera::orbit(0.0), f32::NAN, SceneId::Morph, Scale::Quarter);
        assert!(matches!(
            renderer.draw(&mut fb, &input),
            Err(RenderError::NumericFault("time"))
        ));
        assert_eq!(renderer.coprocessor().dispatches(), 0);
        assert!(fb.words().iter().all(|&w| w == 0));
    }

    #[test]
    fn small_framebuffer_is_rejected() {
        let mut renderer = renderer();
        let mut fb = FrameBuffer::new(312, 200).unwrap();
        let input = FrameInput::new(Camera::orbit(0.0), 0.0, SceneId::Morph, Scale::Quarter);
        assert!(matches!(
            renderer.draw(&mut fb, &input),
            Err(RenderError::FramebufferTooSmall { needed_width: 320, .. })
        ));
    }

    #[test]
    fn draw_initializes_lazily_and_leaves_channel_halted() {
        let mut renderer = renderer();
        assert!(!renderer.is_initialized());
        let mut fb = FrameBuffer::new(320, 240).unwrap();
        let input = FrameInput::new(Camera::orbit(0.5), 0.5, SceneId::Octahedra, Scale::Quarter);
        let stats = renderer.draw(&mut fb, &input).unwrap();
        assert!(renderer.is_initialized());
        assert!(renderer.channel().is_halted());
        assert_eq!(stats.samples, 78 * 50);
        assert_eq!(stats.hits + stats.misses, stats.samples);
    }

    #[test]
    fn changing_asset_dir_drops_loaded_textures() {
        let mut renderer = renderer();
        renderer.init().unwrap();
        renderer.set_config(RenderConfig::default()).unwrap();
        assert!(renderer.is_initialized());

        renderer
            .set_config(RenderConfig {
                asset_dir: Some("textures".into()),
                ..RenderConfig::default()
            })
            .unwrap();
        assert!(!renderer.is_initialized());
    }
}
