//! Decode, resize, and encode calls. The pipeline treats these as opaque transforms.

use anyhow::{Context, Result, anyhow};
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Frame, ImageReader};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::{PipelineConfig, TargetFormat};

/// Open `path`, read its size, and decode it. Returns `(size_in_bytes, image)`.
pub fn open_and_decode(path: &Path) -> Result<(u64, DynamicImage)> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let size = file
        .metadata()
        .with_context(|| format!("stat {}", path.display()))?
        .len();
    let image = ImageReader::new(BufReader::new(file))
        .with_guessed_format()
        .with_context(|| format!("sniff format of {}", path.display()))?
        .decode()
        .with_context(|| format!("decode {}", path.display()))?;
    Ok((size, image))
}

/// Target dimensions when an image of `width`×`height` must be narrowed to `max_width`.
/// None when resizing is disabled (`max_width == 0`) or the image already fits.
pub fn scaled_dimensions(width: u32, height: u32, max_width: u32) -> Option<(u32, u32)> {
    if max_width == 0 || width <= max_width {
        return None;
    }
    let height = (height as f64 * max_width as f64 / width as f64).round() as u32;
    Some((max_width, height.max(1)))
}

/// Resize to `max_width` (aspect preserved, Lanczos3) when wider; otherwise return as is.
pub fn fit_width(image: DynamicImage, max_width: u32) -> DynamicImage {
    match scaled_dimensions(image.width(), image.height(), max_width) {
        Some((w, h)) => image.resize_exact(w, h, FilterType::Lanczos3),
        None => image,
    }
}

/// Encode `image` per `config` into `buf`. On error `buf` keeps whatever the encoder wrote.
pub fn encode_into(image: &DynamicImage, config: &PipelineConfig, buf: &mut Vec<u8>) -> Result<()> {
    match config.format {
        TargetFormat::Webp => {
            let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
            let encoder = webp::Encoder::from_image(&rgba).map_err(|e| anyhow!("webp: {}", e))?;
            let memory = encoder
                .encode_simple(false, config.quality)
                .map_err(|e| anyhow!("webp: {:?}", e))?;
            buf.extend_from_slice(&memory);
        }
        TargetFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            let quality = config.quality.clamp(1.0, 100.0) as u8;
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut *buf, quality))
                .context("jpeg encode")?;
        }
        TargetFormat::Png => {
            image
                .write_with_encoder(PngEncoder::new(&mut *buf))
                .context("png encode")?;
        }
        TargetFormat::Gif => {
            // Trailer is written when the encoder drops.
            let mut encoder = GifEncoder::new(&mut *buf);
            encoder
                .encode_frame(Frame::new(image.to_rgba8()))
                .context("gif encode")?;
        }
    }
    Ok(())
}
