use egui::Color32;

/// A small, deterministic hash for turning "content" into a stable token.
///
/// This is intentionally not cryptographic; frames use it to derive an
/// identity from their label.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Fnv1a64(u64);

impl Fnv1a64 {
    const OFFSET_BASIS: u64 = 14695981039346656037;
    const PRIME: u64 = 1099511628211;

    pub(crate) fn new() -> Self {
        Self(Self::OFFSET_BASIS)
    }

    pub(crate) fn update(&mut self, bytes: &[u8]) {
        let mut hash = self.0;
        for b in bytes {
            hash ^= *b as u64;
            hash = hash.wrapping_mul(Self::PRIME);
        }
        self.0 = hash;
    }

    pub(crate) fn finish(self) -> u64 {
        self.0
    }
}

pub fn hash64(bytes: &[u8]) -> u64 {
    let mut h = Fnv1a64::new();
    h.update(bytes);
    h.finish()
}

/// Number of distinct shades in the flame palette.
pub const FLAME_PALETTE_LEN: usize = 16;

/// Warm palette for flame bars, from deep orange to amber.
///
/// The index is scattered with a stride coprime to the palette length, so
/// neighbouring bars (which differ by one in `depth + index`) get clearly
/// different shades.
pub fn flame_color(index: usize) -> Color32 {
    let shade = (index % FLAME_PALETTE_LEN) * 11 % FLAME_PALETTE_LEN;
    let g = 0.25 + shade as f32 / FLAME_PALETTE_LEN as f32 * 0.5;
    Color32::from_rgb(255, (g * 255.0).round() as u8, 0)
}

pub fn luma(color: Color32) -> f32 {
    // Cheap, perceptual-ish luma in sRGB space.
    let r = color.r() as f32 / 255.0;
    let g = color.g() as f32 / 255.0;
    let b = color.b() as f32 / 255.0;
    0.299 * r + 0.587 * g + 0.114 * b
}

pub fn text_color_on(background: Color32) -> Color32 {
    if luma(background) > 0.55 {
        Color32::BLACK
    } else {
        Color32::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv_matches_reference_vectors() {
        assert_eq!(hash64(b""), 0xcbf29ce484222325);
        assert_eq!(hash64(b"a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn flame_palette_is_periodic_and_warm() {
        for index in 0..64 {
            let color = flame_color(index);
            assert_eq!(color, flame_color(index + FLAME_PALETTE_LEN));
            assert_eq!((color.r(), color.b()), (255, 0));
            assert!((64..=192).contains(&color.g()));
        }
        assert_ne!(flame_color(0), flame_color(1));
    }

    #[test]
    fn label_contrast_follows_shade() {
        // 13 * 11 = 143, the last shade of the palette.
        assert_eq!(text_color_on(flame_color(13)), Color32::BLACK);
        assert_eq!(text_color_on(flame_color(0)), Color32::WHITE);
    }
}
