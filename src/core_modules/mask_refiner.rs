// THEORY:
// A raw color mask is noisy: sensor grain and reflections sprinkle isolated foreground
// pixels all over the frame, and a real object often arrives with pinholes and ragged
// edges. The `MaskRefiner` cleans this up in a fixed sequence:
//
// 1.  **Smoothing**: a small Gaussian merges nearby speckle into contiguous patches
//     (and spreads thin noise so thinly that it rounds away).
// 2.  **Erosion**: one 3x3 minimum pass removes whatever is still too small to survive.
// 3.  **Dilation**: one 3x3 maximum pass restores the size the real object lost.
// 4.  **Re-binarisation**: anything still non-zero is foreground.
//
// The refiner is a pure function of its input mask and settings.

pub mod mask_refiner {
    use crate::core_modules::color_classifier::{FOREGROUND, Mask};
    use image::Luma;

    /// Tunables for a refinement pass.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RefineSettings {
        /// Side of the square Gaussian kernel. Must be odd.
        pub blur_kernel: u32,
        pub erode_iterations: u32,
        pub dilate_iterations: u32,
    }

    impl Default for RefineSettings {
        fn default() -> Self {
            Self {
                blur_kernel: 7,
                erode_iterations: 1,
                dilate_iterations: 1,
            }
        }
    }

    pub fn refine(mask: &Mask, settings: &RefineSettings) -> Mask {
        let mut refined = gaussian_blur(mask, settings.blur_kernel);
        for _ in 0..settings.erode_iterations {
            refined = morph(&refined, Morph::Erode);
        }
        for _ in 0..settings.dilate_iterations {
            refined = morph(&refined, Morph::Dilate);
        }
        binarize(&mut refined);
        refined
    }

    /// Kernel weights for an odd `size`, normalized to sum to 1.
    /// Sigma follows the usual "derive from kernel size" rule.
    pub fn gaussian_kernel(size: u32) -> Vec<f32> {
        let size = size.max(1) | 1;
        let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
        let radius = (size / 2) as i32;
        let scale = -0.5 / (sigma * sigma);

        let weights: Vec<f32> = (-radius..=radius)
            .map(|offset| ((offset * offset) as f32 * scale).exp())
            .collect();
        let total: f32 = weights.iter().sum();
        weights.into_iter().map(|w| w / total).collect()
    }

    /// Reflect-101 border: `gfedcb|abcdefgh|gfedcba`.
    fn reflect_101(index: i64, len: i64) -> usize {
        if len == 1 {
            return 0;
        }
        let mut index = index;
        while index < 0 || index >= len {
            if index < 0 {
                index = -index;
            }
            if index >= len {
                index = 2 * len - 2 - index;
            }
        }
        index as usize
    }

    /// Separable Gaussian smoothing, horizontal pass then vertical pass.
    pub fn gaussian_blur(mask: &Mask, kernel_size: u32) -> Mask {
        let (width, height) = mask.dimensions();
        if width == 0 || height == 0 {
            return mask.clone();
        }
        let kernel = gaussian_kernel(kernel_size);
        let radius = (kernel.len() / 2) as i64;
        let (w, h) = (width as i64, height as i64);
        let source = mask.as_raw();

        let mut horizontal = vec![0.0f32; source.len()];
        for y in 0..h {
            let row = (y * w) as usize;
            for x in 0..w {
                let mut acc = 0.0f32;
                for (k, weight) in kernel.iter().enumerate() {
                    let sx = reflect_101(x + k as i64 - radius, w);
                    acc += source[row + sx] as f32 * weight;
                }
                horizontal[row + x as usize] = acc;
            }
        }

        let mut out = Mask::new(width, height);
        for y in 0..h {
            for x in 0..w {
                let mut acc = 0.0f32;
                for (k, weight) in kernel.iter().enumerate() {
                    let sy = reflect_101(y + k as i64 - radius, h);
                    acc += horizontal[sy * width as usize + x as usize] * weight;
                }
                out.put_pixel(x as u32, y as u32, Luma([acc.round().clamp(0.0, 255.0) as u8]));
            }
        }
        out
    }

    #[derive(Debug, Clone, Copy)]
    enum Morph {
        Erode,
        Dilate,
    }

    /// One pass of a 3x3 square min/max filter. Out-of-bounds neighbours are ignored.
    fn morph(mask: &Mask, op: Morph) -> Mask {
        let (width, height) = mask.dimensions();
        let mut out = Mask::new(width, height);

        for y in 0..height as i64 {
            for x in 0..width as i64 {
                let mut value = match op {
                    Morph::Erode => u8::MAX,
                    Morph::Dilate => u8::MIN,
                };
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        let nx = x + dx;
                        let ny = y + dy;
                        if nx >= 0 && nx < width as i64 && ny >= 0 && ny < height as i64 {
                            let neighbour = mask.get_pixel(nx as u32, ny as u32).0[0];
                            value = match op {
                                Morph::Erode => value.min(neighbour),
                                Morph::Dilate => value.max(neighbour),
                            };
                        }
                    }
                }
                out.put_pixel(x as u32, y as u32, Luma([value]));
            }
        }
        out
    }

    pub fn erode(mask: &Mask) -> Mask {
        morph(mask, Morph::Erode)
    }

    pub fn dilate(mask: &Mask) -> Mask {
        morph(mask, Morph::Dilate)
    }

    fn binarize(mask: &mut Mask) {
        for pixel in mask.pixels_mut() {
            if pixel.0[0] != 0 {
                pixel.0[0] = FOREGROUND;
            }
        }
    }
}
