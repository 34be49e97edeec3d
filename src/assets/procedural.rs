use std::collections::HashMap;
use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgb, RgbImage};
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::error::AssetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Solid,
    Stars,
    Checkerboard,
    Grid,
    Scanlines,
}

/// Declarative background tile rendered without any network access
#[derive(Debug, Clone, PartialEq)]
pub struct PatternDescriptor {
    pub kind: PatternKind,
    pub foreground: [u8; 3],
    pub background: [u8; 3],
    /// Tile edge length in pixels
    pub tile: u32,
    /// Cell spacing for grids, checkers and scanlines
    pub cell: u32,
    pub seed: u64,
}

impl PatternDescriptor {
    pub fn plain() -> Self {
        Self {
            kind: PatternKind::Solid,
            foreground: [192, 192, 192],
            background: [192, 192, 192],
            tile: 8,
            cell: 8,
            seed: 0,
        }
    }

    /// Patterns behind the `procedural:` ids used by the built-in themes
    pub fn builtin() -> HashMap<String, PatternDescriptor> {
        let mut patterns = HashMap::new();
        patterns.insert(
            "stars".to_string(),
            Self {
                kind: PatternKind::Stars,
                foreground: [255, 255, 255],
                background: [0, 0, 24],
                tile: 128,
                cell: 0,
                seed: 1998,
            },
        );
        patterns.insert(
            "teal".to_string(),
            Self {
                kind: PatternKind::Solid,
                foreground: [0, 128, 128],
                background: [0, 128, 128],
                tile: 8,
                cell: 8,
                seed: 0,
            },
        );
        patterns.insert(
            "grid".to_string(),
            Self {
                kind: PatternKind::Grid,
                foreground: [255, 113, 206],
                background: [45, 0, 70],
                tile: 64,
                cell: 16,
                seed: 0,
            },
        );
        patterns.insert(
            "scanlines".to_string(),
            Self {
                kind: PatternKind::Scanlines,
                foreground: [0, 40, 0],
                background: [0, 0, 0],
                tile: 16,
                cell: 3,
                seed: 0,
            },
        );
        patterns.insert(
            "checker".to_string(),
            Self {
                kind: PatternKind::Checkerboard,
                foreground: [255, 255, 255],
                background: [200, 200, 200],
                tile: 32,
                cell: 8,
                seed: 0,
            },
        );
        patterns
    }

    /// Rasterize one tile
    pub fn render(&self) -> RgbImage {
        let tile = self.tile.max(1);
        let cell = self.cell.max(1);
        let fg = Rgb(self.foreground);
        let bg = Rgb(self.background);

        match self.kind {
            PatternKind::Solid => ImageBuffer::from_pixel(tile, tile, bg),
            PatternKind::Checkerboard => ImageBuffer::from_fn(tile, tile, |x, y| {
                if ((x / cell) + (y / cell)) % 2 == 0 { fg } else { bg }
            }),
            PatternKind::Grid => ImageBuffer::from_fn(tile, tile, |x, y| {
                if x % cell == 0 || y % cell == 0 { fg } else { bg }
            }),
            PatternKind::Scanlines => ImageBuffer::from_fn(tile, tile, |_, y| {
                if y % cell == 0 { fg } else { bg }
            }),
            PatternKind::Stars => {
                let mut img = ImageBuffer::from_pixel(tile, tile, bg);
                let mut rng = SmallRng::seed_from_u64(self.seed);
                let stars = (tile * tile / 256).max(1);
                for _ in 0..stars {
                    let x = rng.gen_range(0..tile);
                    let y = rng.gen_range(0..tile);
                    // Dim stars read as depth
                    let brightness: f32 = rng.gen_range(0.4..=1.0);
                    let color = Rgb(self.foreground.map(|c| (c as f32 * brightness) as u8));
                    img.put_pixel(x, y, color);
                }
                img
            }
        }
    }

    /// Encode the tile as PNG bytes
    pub fn render_png(&self) -> Result<Vec<u8>, AssetError> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(self.render())
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .map_err(|e| AssetError::RenderFailed {
                reason: e.to_string(),
            })?;
        Ok(bytes)
    }

    /// `data:` URI usable directly as a CSS `url()`
    pub fn to_data_uri(&self) -> Result<String, AssetError> {
        let png = self.render_png()?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
    }
}
