//! Artifact codec: payload <-> QR code PNG.
//!
//! The producer only sees [`ArtifactCodec`]; [`QrPngCodec`] is the real
//! implementation (`qrcode` for symbol layout, `image` for rasterisation,
//! `rqrr` for detection and decoding).

use crate::core::config::{CodecConfig, ErrorCorrection};
use crate::core::error::QrForgeError;
use image::{ImageFormat, RgbImage};
use qrcode::{Color, EcLevel, QrCode};
use std::path::Path;

/// Quiet zone around the symbol, in modules.
const QUIET_ZONE: usize = 4;

pub trait ArtifactCodec: Send + Sync {
    /// Write an artifact encoding `data` to `dest`.
    fn encode(&self, data: &str, dest: &Path) -> Result<(), QrForgeError>;

    /// Read the payload back out of the artifact at `src`.
    fn decode(&self, src: &Path) -> Result<String, QrForgeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor(pub [u8; 3]);

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor([0, 0, 0]);
    pub const WHITE: RgbColor = RgbColor([255, 255, 255]);
}

#[derive(Debug, Clone)]
pub struct QrPngCodec {
    size: u32,
    ec_level: ErrorCorrection,
    foreground: RgbColor,
    background: RgbColor,
}

impl QrPngCodec {
    pub fn new(size: u32, ec_level: ErrorCorrection) -> Self {
        Self {
            size,
            ec_level,
            foreground: RgbColor::BLACK,
            background: RgbColor::WHITE,
        }
    }

    pub fn from_config(config: &CodecConfig) -> Self {
        Self::new(config.size, config.ec_level)
    }

    pub fn with_colors(mut self, foreground: RgbColor, background: RgbColor) -> Self {
        self.foreground = foreground;
        self.background = background;
        self
    }

    pub fn with_ec_level(mut self, ec_level: ErrorCorrection) -> Self {
        self.ec_level = ec_level;
        self
    }

    fn qr_ec_level(&self) -> EcLevel {
        match self.ec_level {
            ErrorCorrection::Low => EcLevel::L,
            ErrorCorrection::Medium => EcLevel::M,
            ErrorCorrection::Quartile => EcLevel::Q,
            ErrorCorrection::High => EcLevel::H,
        }
    }

    /// Rasterise with whole-pixel modules; the edge is at least `size` pixels.
    fn render(&self, code: &QrCode) -> RgbImage {
        let modules = code.width();
        let span = modules + 2 * QUIET_ZONE;
        let scale = (self.size as usize).div_ceil(span).max(1);
        let edge = (span * scale) as u32;

        let mut img = RgbImage::from_pixel(edge, edge, image::Rgb(self.background.0));
        let dark = image::Rgb(self.foreground.0);

        for (i, color) in code.to_colors().into_iter().enumerate() {
            if color != Color::Dark {
                continue;
            }
            let x0 = (i % modules + QUIET_ZONE) * scale;
            let y0 = (i / modules + QUIET_ZONE) * scale;
            for y in y0..y0 + scale {
                for x in x0..x0 + scale {
                    img.put_pixel(x as u32, y as u32, dark);
                }
            }
        }
        img
    }
}

impl ArtifactCodec for QrPngCodec {
    fn encode(&self, data: &str, dest: &Path) -> Result<(), QrForgeError> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), self.qr_ec_level())
            .map_err(|e| QrForgeError::CodecError(format!("failed to generate QR: {}", e)))?;

        self.render(&code)
            .save_with_format(dest, ImageFormat::Png)
            .map_err(|e| {
                QrForgeError::CodecError(format!("failed to write {}: {}", dest.display(), e))
            })
    }

    fn decode(&self, src: &Path) -> Result<String, QrForgeError> {
        let img = image::open(src)
            .map_err(|e| {
                QrForgeError::CodecError(format!("failed to open image {}: {}", src.display(), e))
            })?
            .to_luma8();

        let (width, height) = img.dimensions();
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                img.get_pixel(x as u32, y as u32).0[0]
            });

        let grids = prepared.detect_grids();
        let grid = grids.first().ok_or_else(|| {
            QrForgeError::CodecError(format!("no QR code found in {}", src.display()))
        })?;
        let (_meta, content) = grid
            .decode()
            .map_err(|e| QrForgeError::CodecError(format!("failed to decode QR: {:?}", e)))?;
        Ok(content)
    }
}
