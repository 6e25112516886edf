#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use media_file_server::preview::FrameExtractor;
use media_file_server::{ContentService, Error, PreviewError, Result, ServiceConfig};
use tokio_util::sync::CancellationToken;

pub fn service(root: &Path, max_edge: Option<u32>) -> ContentService {
    service_with(root, max_edge, Arc::new(StillFrame))
}

pub fn service_with(
    root: &Path,
    max_edge: Option<u32>,
    extractor: Arc<dyn FrameExtractor>,
) -> ContentService {
    let mut config = ServiceConfig::new(root);
    if let Some(edge) = max_edge {
        config = config.with_previews(edge);
    }
    ContentService::with_frame_extractor(&config, extractor)
}

pub fn files_in(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(root)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// Red top-left, blue top-right, green bottom half.
pub fn quadrants(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        if y >= height / 2 {
            Rgb([0, 255, 0])
        } else if x < width / 2 {
            Rgb([255, 0, 0])
        } else {
            Rgb([0, 0, 255])
        }
    })
}

pub fn png_bytes(image: RgbImage) -> Vec<u8> {
    let mut output = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
        .unwrap();
    output
}

pub fn jpeg_bytes(image: RgbImage) -> Vec<u8> {
    let mut output = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_with_encoder(JpegEncoder::new_with_quality(&mut output, 95))
        .unwrap();
    output
}

pub fn oriented_jpeg(image: RgbImage, code: u16) -> Vec<u8> {
    let jpeg = jpeg_bytes(image);
    let mut tiff = b"II\x2a\x00\x08\x00\x00\x00".to_vec();
    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&0x0112u16.to_le_bytes());
    tiff.extend_from_slice(&3u16.to_le_bytes());
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&code.to_le_bytes());
    tiff.extend_from_slice(&[0, 0, 0, 0, 0, 0]);

    let payload = [b"Exif\0\0".as_slice(), tiff.as_slice()].concat();
    let mut output = jpeg[..2].to_vec();
    output.extend_from_slice(&[0xFF, 0xE1]);
    output.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    output.extend_from_slice(&payload);
    output.extend_from_slice(&jpeg[2..]);
    output
}

pub struct StillFrame;

#[async_trait]
impl FrameExtractor for StillFrame {
    async fn extract_frame(
        &self,
        input: &Path,
        output: &Path,
        max_edge: u32,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        assert!(input.exists(), "video must be persisted before extraction");
        let frame = RgbImage::from_pixel(max_edge, max_edge * 9 / 16, Rgb([40, 80, 120]));
        let bytes = jpeg_bytes(frame);
        tokio::fs::write(output, bytes)
            .await
            .map_err(|err| PreviewError::Subprocess(err.to_string()))?;
        Ok(())
    }
}

pub struct BrokenTranscoder;

#[async_trait]
impl FrameExtractor for BrokenTranscoder {
    async fn extract_frame(
        &self,
        _input: &Path,
        output: &Path,
        _max_edge: u32,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        tokio::fs::write(output, b"\xFF\xD8 truncated").await.unwrap();
        Err(PreviewError::Subprocess("exit status: 1".to_string()).into())
    }
}

pub struct StuckTranscoder;

#[async_trait]
impl FrameExtractor for StuckTranscoder {
    async fn extract_frame(
        &self,
        _input: &Path,
        output: &Path,
        _max_edge: u32,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        tokio::fs::write(output, b"\xFF\xD8").await.unwrap();
        std::future::pending::<()>().await;
        Err(Error::Cancelled)
    }
}
