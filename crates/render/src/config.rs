use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use scene::Precision;
use serde::{Deserialize, Serialize};

use crate::RenderError;

/// Geometry and tuning of the marcher, loadable from JSON.
///
/// Missing fields take their defaults, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Full framebuffer size in pixels; the row stride.
    pub buffer_width: usize,
    pub buffer_height: usize,
    /// Size of the marched window at full scale.
    pub output_width: usize,
    pub output_height: usize,
    /// Top-left corner of the window inside the framebuffer.
    pub offset_x: usize,
    pub offset_y: usize,
    /// Lower bound for the starting march distance.
    pub min_initial_distance: f32,
    pub precision: Precision,
    /// Directory with texture PNGs. Procedural textures when unset.
    pub asset_dir: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            buffer_width: 320,
            buffer_height: 240,
            output_width: 312,
            output_height: 200,
            offset_x: 4,
            offset_y: 16,
            min_initial_distance: 0.01,
            precision: Precision::default(),
            asset_dir: None,
        }
    }
}

impl RenderConfig {
    /// Reads and validates a JSON config file.
    ///
    /// # Errors
    ///
    /// I/O and parse failures, or any [`Self::validate`] failure.
    pub fn from_path(path: &Path) -> Result<Self, RenderError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        tracing::debug!("loaded render config from {}", path.display());
        Ok(config)
    }

    /// Checks that every scale tiles the window with pixel pairs and that the
    /// window fits the buffer.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidConfig`] naming the first violated rule.
    pub fn validate(&self) -> Result<(), RenderError> {
        let fail = |msg: String| Err(RenderError::InvalidConfig(msg));

        if self.output_width == 0 || self.output_height == 0 {
            return fail("output window is empty".into());
        }
        if self.output_width % 4 != 0 || self.output_height % 4 != 0 {
            return fail(format!(
                "output {}x{} must be divisible by 4",
                self.output_width, self.output_height
            ));
        }
        if (self.output_width / 4) % 2 != 0 {
            return fail(format!(
                "output width {} leaves an odd sample count at quarter scale",
                self.output_width
            ));
        }
        if self.offset_x % 2 != 0 || self.buffer_width % 2 != 0 {
            return fail("offset_x and buffer_width must be even".into());
        }
        if self.offset_x + self.output_width > self.buffer_width
            || self.offset_y + self.output_height > self.buffer_height
        {
            return fail(format!(
                "window {}x{} at ({}, {}) does not fit a {}x{} buffer",
                self.output_width,
                self.output_height,
                self.offset_x,
                self.offset_y,
                self.buffer_width,
                self.buffer_height
            ));
        }
        if !self.min_initial_distance.is_finite() || self.min_initial_distance < 0.0 {
            return fail(format!(
                "min_initial_distance {} must be finite and non-negative",
                self.min_initial_distance
            ));
        }
        Ok(())
    }
}

/// Output scaling: one marched sample per 1x1, 2x2 or 4x4 pixel block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    #[default]
    Full,
    Half,
    Quarter,
}

impl Scale {
    pub const ALL: [Scale; 3] = [Scale::Full, Scale::Half, Scale::Quarter];

    #[must_use]
    pub const fn factor(self) -> usize {
        match self {
            Scale::Full => 1,
            Scale::Half => 2,
            Scale::Quarter => 4,
        }
    }

    /// Marched samples per row and column for a window.
    #[must_use]
    pub const fn samples(self, config: &RenderConfig) -> (usize, usize) {
        (
            config.output_width / self.factor(),
            config.output_height / self.factor(),
        )
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "1/{}x", self.factor())
    }
}

impl FromStr for Scale {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "full" => Ok(Scale::Full),
            "2" | "half" => Ok(Scale::Half),
            "4" | "quarter" => Ok(Scale::Quarter),
            other => Err(RenderError::InvalidConfig(format!(
                "unknown scale '{other}', expected 1, 2 or 4"
            ))),
        }
    }
}
