#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
//! # Scene registry
//!
//! A scene bundles everything the scanline driver needs to know about one
//! look: the CPU distance field used for the starting distance, the normal
//! and shading functions applied to every hit, the co-processor kernel that
//! marches the same field in fixed point, and what to draw on a miss.
//!
//! # Monomorphization
//!
//! Each scene is a zero-sized type implementing [`Scene`]; its
//! [`SceneConfig`] is a `const`, so the driver is compiled once per scene and
//! the function pointers inline. [`SceneId`] is the closed runtime list used
//! to pick one.

use std::fmt;
use std::str::FromStr;

use compute::Kernel;
use glam::Vec3;
use thiserror::Error;

pub mod context;
pub mod math;
pub mod sdf;
pub mod shading;
pub mod texture;

pub use context::FrameContext;
pub use math::Precision;
pub use shading::Surface;
pub use texture::{AssetError, Assets};

pub type DistanceFn = fn(Vec3, &FrameContext<'_>) -> f32;
pub type NormalFn = fn(Vec3, &FrameContext<'_>) -> Vec3;
pub type ShadeFn = fn(&Surface, &FrameContext<'_>) -> u16;

/// Cutoff shared by the built-in scenes.
pub const RENDER_DISTANCE: f32 = 11.0;

#[derive(Clone, Copy)]
pub struct SceneConfig {
    pub name: &'static str,
    pub distance: DistanceFn,
    pub normal: NormalFn,
    pub shade: ShadeFn,
    /// March kernel evaluating `distance` in fixed point.
    pub kernel: Kernel,
    /// Packed miss colour. Zero means none: misses use the fallback.
    pub background: u16,
    pub render_distance: f32,
    /// Misses go through `shade` with a miss [`Surface`] instead.
    pub shade_on_miss: bool,
}

impl fmt::Debug for SceneConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneConfig")
            .field("name", &self.name)
            .field("kernel", &self.kernel)
            .field("background", &format_args!("{:#06x}", self.background))
            .field("render_distance", &self.render_distance)
            .field("shade_on_miss", &self.shade_on_miss)
            .finish_non_exhaustive()
    }
}

pub trait Scene {
    const CONFIG: SceneConfig;
}

pub struct Morph;
pub struct Pillars;
pub struct Octahedra;
pub struct Sphere;
pub struct Textured;
pub struct Chrome;

impl Scene for Morph {
    const CONFIG: SceneConfig = SceneConfig {
        name: "morph",
        distance: sdf::morph,
        normal: sdf::morph_normal,
        shade: shading::rainbow,
        kernel: Kernel::MarchMorph,
        background: 0,
        render_distance: RENDER_DISTANCE,
        shade_on_miss: false,
    };
}

impl Scene for Pillars {
    const CONFIG: SceneConfig = SceneConfig {
        name: "pillars",
        distance: sdf::pillars,
        normal: sdf::pillars_normal,
        shade: shading::stripes,
        kernel: Kernel::MarchPillars,
        background: math::rgb5(22, 22, 31),
        render_distance: RENDER_DISTANCE,
        shade_on_miss: false,
    };
}

impl Scene for Octahedra {
    const CONFIG: SceneConfig = SceneConfig {
        name: "octahedra",
        distance: sdf::octa,
        normal: sdf::octa_normal,
        shade: shading::flat,
        kernel: Kernel::MarchOcta,
        background: math::rgb5(31, 11, 11),
        render_distance: RENDER_DISTANCE,
        shade_on_miss: false,
    };
}

impl Scene for Sphere {
    const CONFIG: SceneConfig = SceneConfig {
        name: "sphere",
        distance: sdf::sphere,
        normal: sdf::sphere_normal,
        shade: shading::point_light,
        kernel: Kernel::MarchSphere,
        background: math::rgb5(2, 2, 6),
        render_distance: RENDER_DISTANCE,
        shade_on_miss: false,
    };
}

impl Scene for Textured {
    const CONFIG: SceneConfig = SceneConfig {
        name: "textured",
        distance: sdf::pillars,
        normal: sdf::pillars_normal,
        shade: shading::textured,
        kernel: Kernel::MarchPillars,
        background: 0,
        render_distance: RENDER_DISTANCE,
        shade_on_miss: false,
    };
}

impl Scene for Chrome {
    const CONFIG: SceneConfig = SceneConfig {
        name: "chrome",
        distance: sdf::morph,
        normal: sdf::morph_normal,
        shade: shading::environment,
        kernel: Kernel::MarchMorph,
        background: 0,
        render_distance: RENDER_DISTANCE,
        shade_on_miss: true,
    };
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown scene '{0}'")]
pub struct UnknownScene(pub String);

/// Closed list of the built-in scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneId {
    Morph,
    Pillars,
    Octahedra,
    Sphere,
    Textured,
    Chrome,
}

impl SceneId {
    pub const ALL: [SceneId; 6] = [
        SceneId::Morph,
        SceneId::Pillars,
        SceneId::Octahedra,
        SceneId::Sphere,
        SceneId::Textured,
        SceneId::Chrome,
    ];

    #[must_use]
    pub const fn config(self) -> SceneConfig {
        match self {
            SceneId::Morph => Morph::CONFIG,
            SceneId::Pillars => Pillars::CONFIG,
            SceneId::Octahedra => Octahedra::CONFIG,
            SceneId::Sphere => Sphere::CONFIG,
            SceneId::Textured => Textured::CONFIG,
            SceneId::Chrome => Chrome::CONFIG,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        self.config().name
    }

    #[must_use]
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|&id| id == self).unwrap_or(0)
    }

    /// Maps any index onto the list, wrapping in both directions.
    #[must_use]
    pub fn from_index_wrapping(index: i64) -> Self {
        let len = Self::ALL.len() as i64;
        Self::ALL[index.rem_euclid(len) as usize]
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self::from_index_wrapping(self.index() as i64 + 1)
    }

    #[must_use]
    pub fn prev(self) -> Self {
        Self::from_index_wrapping(self.index() as i64 - 1)
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SceneId {
    type Err = UnknownScene;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownScene(s.to_owned()))
    }
}
