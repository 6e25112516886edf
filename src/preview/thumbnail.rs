use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbaImage, imageops};

use crate::error::PreviewError;
use crate::preview::orientation::encode_as;

pub const PREVIEW_EXTENSION: &str = ".jpg";

pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
}

// Not clamped to 1, so small sources scale up. Edges never round below one pixel.
pub fn preview_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let scale = max_edge as f64 / width.max(height) as f64;
    let scaled = |edge: u32| ((edge as f64 * scale).round() as u32).max(1);
    (scaled(width), scaled(height))
}

pub fn render(image: &DynamicImage, max_edge: u32) -> Result<Thumbnail, PreviewError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PreviewError::Encode("image has no pixels".to_string()));
    }
    let (width, height) = preview_dimensions(image.width(), image.height(), max_edge);

    let mut canvas = RgbaImage::new(width, height);
    let resampled = imageops::resize(&image.to_rgba8(), width, height, FilterType::CatmullRom);
    imageops::replace(&mut canvas, &resampled, 0, 0);

    // JPEG carries no alpha channel.
    let flattened = DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8());
    let jpeg = encode_as(&flattened, ImageFormat::Jpeg)?;
    Ok(Thumbnail {
        width,
        height,
        jpeg,
    })
}
