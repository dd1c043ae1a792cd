//! QR code generation for site URLs.
//!
//! The symbol is encoded at the highest error-correction level, rendered
//! black on white with a thin quiet zone, then scaled to a fixed square so
//! every site gets an identically sized image.

use crate::config::QrConfig;
use image::{
    GrayImage, ImageFormat, Luma,
    imageops::{self, FilterType},
};
use qrcode::{EcLevel, QrCode};
use std::path::{Path, PathBuf};
use thiserror::Error;

const DARK: Luma<u8> = Luma([0]);
const LIGHT: Luma<u8> = Luma([255]);

#[derive(Debug, Error)]
pub enum QrError {
    #[error("cannot encode `{url}` as a QR code: {reason}")]
    Encode {
        url: String,
        reason: qrcode::types::QrError,
    },

    #[error("cannot write QR image `{}`", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Render `url` into a `size`×`size` grayscale bitmap.
pub fn render_qr(url: &str, config: &QrConfig) -> Result<GrayImage, QrError> {
    let code = QrCode::with_error_correction_level(url.as_bytes(), EcLevel::H).map_err(|reason| {
        QrError::Encode {
            url: url.to_owned(),
            reason,
        }
    })?;

    let symbol: GrayImage = code
        .render::<Luma<u8>>()
        .dark_color(DARK)
        .light_color(LIGHT)
        .quiet_zone(false)
        .module_dimensions(config.module_px, config.module_px)
        .build();

    // The renderer only knows a 4-module quiet zone; draw our own.
    let pad = config.border * config.module_px;
    let mut framed = GrayImage::from_pixel(
        symbol.width() + 2 * pad,
        symbol.height() + 2 * pad,
        LIGHT,
    );
    imageops::overlay(&mut framed, &symbol, i64::from(pad), i64::from(pad));

    Ok(imageops::resize(
        &framed,
        config.size,
        config.size,
        FilterType::Nearest,
    ))
}

/// Encode `url` and write it as PNG to `output`, replacing any existing file.
pub fn generate_qr(url: &str, output: &Path, config: &QrConfig) -> Result<(), QrError> {
    let image = render_qr(url, config)?;
    image
        .save_with_format(output, ImageFormat::Png)
        .map_err(|source| QrError::Image {
            path: output.to_path_buf(),
            source,
        })
}
