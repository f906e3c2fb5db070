//! PNG capture of scanned-out frames.

use anyhow::{ensure, Context, Result};
use std::path::Path;
use vga_scanout_hw::{ColorMode, Geometry};

/// Converts physical scanout bytes to RGBA8 using the color mode's debug palette.
pub fn to_rgba8(color_mode: ColorMode, pixels: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(pixels.len() * 4);
    for &pixel in pixels {
        let (r, g, b) = color_mode.to_rgb888(pixel);
        rgba.push(r);
        rgba.push(g);
        rgba.push(b);
        rgba.push(255);
    }
    rgba
}

/// Encodes one physical frame as PNG bytes.
pub fn encode_png(geometry: &Geometry, pixels: &[u8]) -> Result<Vec<u8>> {
    ensure!(
        pixels.len() == geometry.frame_pixels(),
        "Capture holds {} bytes, frame needs {}",
        pixels.len(),
        geometry.frame_pixels()
    );

    let rgba = to_rgba8(geometry.color_mode(), pixels);
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(
            &mut png_data,
            geometry.screen_width() as u32,
            geometry.screen_height() as u32,
        );
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&rgba)?;
    }

    Ok(png_data)
}

/// Writes one physical frame to a PNG file.
pub fn save_png<P: AsRef<Path>>(path: P, geometry: &Geometry, pixels: &[u8]) -> Result<()> {
    let png_data = encode_png(geometry, pixels)?;
    std::fs::write(path.as_ref(), png_data).context("Failed to write capture file")?;
    Ok(())
}
