use image::GrayImage;

/// A black and white picture as handed to the printer. The bitmap's height
/// runs across the tape, its width along it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
}

/// How gray levels become black or white.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Pixels darker than the level print black.
    Threshold(u8),
    /// Floyd-Steinberg error diffusion, for photos.
    Dither,
}

impl Default for Conversion {
    fn default() -> Self {
        Conversion::Threshold(128)
    }
}

impl Bitmap {
    /// An all-white bitmap.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![false; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    /// Whether `(x, y)` prints black. Out of bounds reads as white.
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.index(x, y).is_some_and(|i| self.pixels[i])
    }

    pub fn set(&mut self, x: u32, y: u32, black: bool) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = black;
        }
    }

    pub fn from_luma(img: &GrayImage, conversion: Conversion) -> Self {
        let levels: Vec<u8> = match conversion {
            Conversion::Threshold(_) => img.pixels().map(|p| p[0]).collect(),
            Conversion::Dither => floyd_steinberg_dither(img),
        };
        let cutoff = match conversion {
            Conversion::Threshold(level) => level,
            Conversion::Dither => 128,
        };

        Self {
            width: img.width(),
            height: img.height(),
            pixels: levels.into_iter().map(|v| v < cutoff).collect(),
        }
    }

    pub fn black_pixels(&self) -> usize {
        self.pixels.iter().filter(|&&p| p).count()
    }
}

/// Floyd-Steinberg error diffusion to 0/255 levels.
fn floyd_steinberg_dither(img: &GrayImage) -> Vec<u8> {
    let width = img.width() as usize;
    let height = img.height() as usize;

    // i16 so diffused error can over- and undershoot
    let mut buf: Vec<i16> = img.pixels().map(|p| p[0] as i16).collect();

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let old = buf[idx].clamp(0, 255);
            let new = if old > 127 { 255i16 } else { 0i16 };
            let err = old - new;
            buf[idx] = new;

            if x + 1 < width {
                buf[idx + 1] += err * 7 / 16;
            }
            if y + 1 < height {
                let below = idx + width;
                if x > 0 {
                    buf[below - 1] += err * 3 / 16;
                }
                buf[below] += err * 5 / 16;
                if x + 1 < width {
                    buf[below + 1] += err / 16;
                }
            }
        }
    }

    buf.into_iter().map(|v| v.clamp(0, 255) as u8).collect()
}
