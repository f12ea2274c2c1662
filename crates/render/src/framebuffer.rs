use crate::RenderError;

/// RGBA5551 framebuffer stored as pixel pairs.
///
/// Each `u32` word holds two horizontally adjacent pixels, the left one in
/// the high half. Rows are `width / 2` words apart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    words: Vec<u32>,
}

impl FrameBuffer {
    /// Zeroed buffer.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidConfig`] when `width` is odd or either side is
    /// zero.
    pub fn new(width: usize, height: usize) -> Result<Self, RenderError> {
        if width == 0 || height == 0 || width % 2 != 0 {
            return Err(RenderError::InvalidConfig(format!(
                "framebuffer {width}x{height} must be non-empty with an even width"
            )));
        }
        Ok(Self {
            width,
            height,
            words: vec![0; width / 2 * height],
        })
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Words per row.
    #[must_use]
    pub fn stride_words(&self) -> usize {
        self.width / 2
    }

    #[must_use]
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn words_mut(&mut self) -> &mut [u32] {
        &mut self.words
    }

    /// Raw words in native byte order, for handing to a display.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    pub fn fill(&mut self, pixel: u16) {
        let word = u32::from(pixel) * 0x0001_0001;
        self.words.fill(word);
    }

    /// # Panics
    ///
    /// If `(x, y)` is outside the buffer.
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> u16 {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let word = self.words[y * self.stride_words() + x / 2];
        if x % 2 == 0 {
            (word >> 16) as u16
        } else {
            word as u16
        }
    }

    /// Expands to 8-bit RGBA; the coverage bit becomes full alpha.
    #[must_use]
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        let expand = |c: u16| ((c << 3) | (c >> 2)) as u8;
        image::RgbaImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let p = self.pixel(x as usize, y as usize);
            image::Rgba([
                expand(p >> 11),
                expand((p >> 6) & 0x1F),
                expand((p >> 1) & 0x1F),
                if p & 1 == 1 { 255 } else { 0 },
            ])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_width_is_rejected() {
        assert!(FrameBuffer::new(7, 4).is_err());
        assert!(FrameBuffer::new(0, 4).is_err());
    }

    #[test]
    fn left_pixel_lives_in_high_half() {
        let mut fb = FrameBuffer::new(4, 2).unwrap();
        fb.words_mut()[3] = 0xAAAA_5555;
        assert_eq!(fb.pixel(2, 1), 0xAAAA);
        assert_eq!(fb.pixel(3, 1), 0x5555);
        assert_eq!(fb.pixel(0, 0), 0);
    }

    #[test]
    fn byte_view_covers_every_word() {
        let mut fb = FrameBuffer::new(6, 3).unwrap();
        fb.fill(0x0001);
        assert_eq!(fb.as_bytes().len(), 6 * 3 * 2);
        assert_eq!(&fb.as_bytes()[..4], &0x0001_0001u32.to_ne_bytes());
    }

    #[test]
    fn rgba_expansion_maps_full_channels_to_255() {
        let mut fb = FrameBuffer::new(2, 1).unwrap();
        fb.fill(0xF801);
        let img = fb.to_rgba_image();
        assert_eq!(img.get_pixel(1, 0).0, [255, 0, 0, 255]);
    }
}
