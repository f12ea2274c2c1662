//! Material and environment textures plus the normal-map Z table.
//!
//! Texels are stored the way the shaders read them: two signed tangent-space
//! normal components and an RGBA5515 colour whose bit 5 marks a texel whose
//! normal is treated as having Z = 1.

use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use thiserror::Error;

/// Width and height of every texture.
pub const TEX_DIM: usize = 256;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("{path} is {found:?}, expected {expected:?}")]
    Dimensions {
        path: PathBuf,
        expected: (u32, u32),
        found: (u32, u32),
    },
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct TexPixel {
    pub norm_a: i8,
    pub norm_b: i8,
    pub color: u16,
}

impl TexPixel {
    pub const FLAT_NORMAL: u16 = 1 << 5;

    /// Packs 8-bit colour channels as RGBA5515.
    #[must_use]
    pub fn new(rgb: [u8; 3], normal: [i8; 2], flat_normal: bool) -> Self {
        let [r, g, b] = rgb.map(u16::from);
        let mut color = ((r >> 3) << 11) | ((g >> 3) << 6) | (b >> 3);
        if flat_normal {
            color |= Self::FLAT_NORMAL;
        }
        Self {
            norm_a: normal[0],
            norm_b: normal[1],
            color,
        }
    }

    /// Colour channels in `0..=31`.
    #[must_use]
    pub fn rgb(self) -> Vec3 {
        Vec3::new(
            f32::from(self.color >> 11),
            f32::from((self.color >> 6) & 0x1F),
            f32::from(self.color & 0x1F),
        )
    }

    #[must_use]
    pub fn is_flat_normal(self) -> bool {
        self.color & Self::FLAT_NORMAL != 0
    }
}

/// A `TEX_DIM` x `TEX_DIM` texture addressed with wrapping coordinates.
#[derive(Clone, Debug)]
pub struct Texture {
    texels: Vec<TexPixel>,
}

impl Texture {
    pub fn from_fn(mut f: impl FnMut(usize, usize) -> TexPixel) -> Self {
        let mut texels = Vec::with_capacity(TEX_DIM * TEX_DIM);
        for y in 0..TEX_DIM {
            for x in 0..TEX_DIM {
                texels.push(f(x, y));
            }
        }
        Self { texels }
    }

    #[must_use]
    pub fn sample(&self, u: i32, v: i32) -> TexPixel {
        let mask = TEX_DIM as i32 - 1;
        let (u, v) = ((u & mask) as usize, (v & mask) as usize);
        self.texels[v * TEX_DIM + u]
    }

    #[must_use]
    pub fn texels(&self) -> &[TexPixel] {
        &self.texels
    }
}

/// Tangent-space Z for every pair of signed normal-map components.
#[derive(Clone, Debug)]
pub struct NormalZTable {
    z: Vec<f32>,
}

impl Default for NormalZTable {
    fn default() -> Self {
        Self::new()
    }
}

impl NormalZTable {
    #[must_use]
    pub fn new() -> Self {
        let mut z = Vec::with_capacity(256 * 256);
        for a in i8::MIN..=i8::MAX {
            for b in i8::MIN..=i8::MAX {
                let x = f32::from(a) / 128.0;
                let y = f32::from(b) / 128.0;
                z.push((1.0 - x * x - y * y).max(0.0).sqrt());
            }
        }
        Self { z }
    }

    #[must_use]
    pub fn lookup(&self, a: i8, b: i8) -> f32 {
        let row = usize::from(a as u8 ^ 0x80);
        let col = usize::from(b as u8 ^ 0x80);
        self.z[row * 256 + col]
    }
}

/// Everything the shaders sample.
#[derive(Clone, Debug)]
pub struct Assets {
    pub materials: [Texture; 3],
    pub environment: Texture,
    pub normal_z: NormalZTable,
}

impl Assets {
    /// Builds all textures in-process.
    #[must_use]
    pub fn procedural() -> Self {
        tracing::debug!("building procedural textures");
        Self {
            materials: [
                Texture::from_fn(bricks),
                Texture::from_fn(grooves),
                Texture::from_fn(rivets),
            ],
            environment: Texture::from_fn(sky),
            normal_z: NormalZTable::new(),
        }
    }

    /// Loads `material0.png`..`material2.png` and `environment.png` from
    /// `dir`.
    ///
    /// A material image is 256x512: colour in the top half, normal map in the
    /// bottom half. The environment is a 256x256 colour image.
    ///
    /// # Errors
    ///
    /// Fails if a file is missing, cannot be decoded, or has the wrong size.
    pub fn load_dir(dir: &Path) -> Result<Self, AssetError> {
        let material = |i: usize| load_material(&dir.join(format!("material{i}.png")));
        let assets = Self {
            materials: [material(0)?, material(1)?, material(2)?],
            environment: load_environment(&dir.join("environment.png"))?,
            normal_z: NormalZTable::new(),
        };
        tracing::info!("loaded textures from {}", dir.display());
        Ok(assets)
    }
}

fn load_rgba(path: &Path, expected: (u32, u32)) -> Result<image::RgbaImage, AssetError> {
    let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let img = image::load_from_memory_with_format(&bytes, image::ImageFormat::Png)
        .map_err(|source| AssetError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();
    if img.dimensions() != expected {
        return Err(AssetError::Dimensions {
            path: path.to_path_buf(),
            expected,
            found: img.dimensions(),
        });
    }
    Ok(img)
}

fn load_material(path: &Path) -> Result<Texture, AssetError> {
    let dim = TEX_DIM as u32;
    let img = load_rgba(path, (dim, dim * 2))?;
    Ok(Texture::from_fn(|x, y| {
        let [r, g, b, _] = img.get_pixel(x as u32, y as u32).0;
        let [nr, ng, nb, _] = img.get_pixel(x as u32, y as u32 + dim).0;
        let normal = [(i16::from(nr) - 127) as i8, (i16::from(ng) - 127) as i8];
        TexPixel::new([r, g, b], normal, nb >= 252)
    }))
}

fn load_environment(path: &Path) -> Result<Texture, AssetError> {
    let dim = TEX_DIM as u32;
    let img = load_rgba(path, (dim, dim))?;
    Ok(Texture::from_fn(|x, y| {
        let [r, g, b, _] = img.get_pixel(x as u32, y as u32).0;
        TexPixel::new([r, g, b], [0, 0], false)
    }))
}

fn bricks(x: usize, y: usize) -> TexPixel {
    let row = y / 32;
    let shifted = (x + row % 2 * 32) % 64;
    let mortar = y % 32 < 3 || shifted < 3;
    if mortar {
        return TexPixel::new([150, 150, 140], [0, 0], true);
    }
    let shade = ((x * 7 + y * 13) % 24) as u8;
    let edge = shifted < 6 || y % 32 < 6;
    let normal = if edge { [-50, -50] } else { [0, 0] };
    TexPixel::new([170 + shade, 70 + shade, 50], normal, !edge)
}

fn grooves(x: usize, _y: usize) -> TexPixel {
    let phase = (x % 16) as f32 / 16.0 * std::f32::consts::TAU;
    let slope = (phase.cos() * 90.0) as i8;
    let bright = (phase.sin() * 40.0 + 150.0) as u8;
    TexPixel::new([bright / 2, bright, bright], [slope, 0], false)
}

fn rivets(x: usize, y: usize) -> TexPixel {
    let dx = (x % 32) as f32 - 16.0;
    let dy = (y % 32) as f32 - 16.0;
    let r = (dx * dx + dy * dy).sqrt();
    if r < 6.0 {
        let a = (dx / 6.0 * 100.0) as i8;
        let b = (dy / 6.0 * 100.0) as i8;
        TexPixel::new([220, 210, 180], [a, b], false)
    } else {
        TexPixel::new([90, 100, 110], [0, 0], true)
    }
}

fn sky(x: usize, y: usize) -> TexPixel {
    let t = y as f32 / (TEX_DIM - 1) as f32;
    let horizon = Vec3::new(220.0, 200.0, 190.0);
    let mut col = if t < 0.5 {
        Vec3::new(40.0, 80.0, 200.0).lerp(horizon, t * 2.0)
    } else {
        horizon.lerp(Vec3::new(60.0, 45.0, 30.0), (t - 0.5) * 2.0)
    };
    let (dx, dy) = (x as f32 - 80.0, y as f32 - 70.0);
    if dx * dx + dy * dy < 144.0 {
        col = Vec3::new(255.0, 250.0, 220.0);
    }
    TexPixel::new([col.x as u8, col.y as u8, col.z as u8], [0, 0], false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texel_packs_rgba5515_with_flag_bit() {
        let texel = TexPixel::new([255, 0, 255], [0, 0], true);
        assert_eq!(texel.color, (31 << 11) | 31 | TexPixel::FLAT_NORMAL);
        assert!(texel.is_flat_normal());
        assert_eq!(texel.rgb(), Vec3::new(31.0, 0.0, 31.0));
        assert_eq!(std::mem::size_of::<TexPixel>(), 4);
    }

    #[test]
    fn sampling_wraps_both_axes() {
        let tex = Texture::from_fn(|x, y| TexPixel::new([x as u8, y as u8, 0], [0, 0], false));
        assert_eq!(tex.sample(-1, 0), tex.sample(255, 0));
        assert_eq!(tex.sample(3, 256 + 7), tex.sample(3, 7));
    }

    #[test]
    fn normal_z_completes_unit_vector() {
        let table = NormalZTable::new();
        assert!((table.lookup(0, 0) - 1.0).abs() < 1e-6);
        assert_eq!(table.lookup(i8::MIN, 0), 0.0);
        let (a, b) = (40_i8, -70_i8);
        let (x, y) = (f32::from(a) / 128.0, f32::from(b) / 128.0);
        let z = table.lookup(a, b);
        assert!((x * x + y * y + z * z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn missing_asset_dir_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Assets::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, AssetError::Io { .. }), "{err}");
    }

    #[test]
    fn wrong_sized_material_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        image::RgbaImage::new(16, 16)
            .save(dir.path().join("material0.png"))
            .unwrap();
        let err = Assets::load_dir(dir.path()).unwrap_err();
        assert!(
            matches!(err, AssetError::Dimensions { found: (16, 16), .. }),
            "{err}"
        );
    }

    #[test]
    fn material_png_loads_colour_and_normal_halves() {
        let dir = tempfile::tempdir().unwrap();
        let mut mat = image::RgbaImage::new(256, 512);
        mat.put_pixel(5, 9, image::Rgba([248, 8, 16, 255]));
        mat.put_pixel(5, 256 + 9, image::Rgba([227, 27, 255, 255]));
        for i in 0..3 {
            mat.save(dir.path().join(format!("material{i}.png"))).unwrap();
        }
        image::RgbaImage::new(256, 256)
            .save(dir.path().join("environment.png"))
            .unwrap();

        let assets = Assets::load_dir(dir.path()).unwrap();
        let texel = assets.materials[1].sample(5, 9);
        assert_eq!(texel.norm_a, 100);
        assert_eq!(texel.norm_b, -100);
        assert!(texel.is_flat_normal());
        assert_eq!(texel.rgb(), Vec3::new(31.0, 1.0, 2.0));
    }
}
