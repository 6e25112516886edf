use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};

use crate::error::PreviewError;

const ORIENTATION_TAG: u16 = 0x0112;
const EXIF_HEADER: &[u8] = b"Exif\0\0";
const MAX_JPEG_QUALITY: u8 = 100;

pub struct Normalized {
    pub image: DynamicImage,
    pub format: ImageFormat,
    pub orientation: Orientation,
    // None when the source was already upright.
    pub encoded: Option<Vec<u8>>,
}

pub fn normalize(bytes: &[u8]) -> Result<Normalized, PreviewError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| PreviewError::Decode(err.to_string()))?;
    let format = reader
        .format()
        .ok_or_else(|| PreviewError::Decode("unrecognized image container".to_string()))?;
    let mut decoder = reader
        .into_decoder()
        .map_err(|err| PreviewError::Decode(err.to_string()))?;

    let exif = decoder
        .exif_metadata()
        .map_err(|err| PreviewError::Decode(err.to_string()))?;
    let orientation = match exif.as_deref().and_then(orientation_code) {
        None => Orientation::NoTransforms,
        Some(code) => u8::try_from(code)
            .ok()
            .and_then(Orientation::from_exif)
            .ok_or_else(|| PreviewError::Decode(format!("invalid orientation code {code}")))?,
    };

    let mut image = DynamicImage::from_decoder(decoder)
        .map_err(|err| PreviewError::Decode(err.to_string()))?;
    if orientation == Orientation::NoTransforms {
        return Ok(Normalized {
            image,
            format,
            orientation,
            encoded: None,
        });
    }

    image.apply_orientation(orientation);
    let encoded = encode_as(&image, format)?;
    Ok(Normalized {
        image,
        format,
        orientation,
        encoded: Some(encoded),
    })
}

pub fn encode_as(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, PreviewError> {
    let mut output = Vec::new();
    let result = match format {
        ImageFormat::Jpeg => {
            image.write_with_encoder(JpegEncoder::new_with_quality(&mut output, MAX_JPEG_QUALITY))
        }
        other => image.write_to(&mut Cursor::new(&mut output), other),
    };
    result.map_err(|err| PreviewError::Encode(format!("{format:?}: {err}")))?;
    Ok(output)
}

// Raw IFD0 value, so codes outside 1..=8 can be rejected instead of ignored.
fn orientation_code(exif: &[u8]) -> Option<u16> {
    let tiff = exif.strip_prefix(EXIF_HEADER).unwrap_or(exif);
    let big_endian = match tiff.get(0..4)? {
        [b'I', b'I', 42, 0] => false,
        [b'M', b'M', 0, 42] => true,
        _ => return None,
    };
    let read_u16 = |at: usize| -> Option<u16> {
        let raw: [u8; 2] = tiff.get(at..at + 2)?.try_into().ok()?;
        Some(if big_endian {
            u16::from_be_bytes(raw)
        } else {
            u16::from_le_bytes(raw)
        })
    };
    let read_u32 = |at: usize| -> Option<u32> {
        let raw: [u8; 4] = tiff.get(at..at + 4)?.try_into().ok()?;
        Some(if big_endian {
            u32::from_be_bytes(raw)
        } else {
            u32::from_le_bytes(raw)
        })
    };

    let ifd = read_u32(4)? as usize;
    let entries = read_u16(ifd)? as usize;
    (0..entries)
        .map(|index| ifd + 2 + index * 12)
        .find(|entry| read_u16(*entry) == Some(ORIENTATION_TAG))
        // SHORT values sit left-aligned in the 4-byte value field.
        .and_then(|entry| read_u16(entry + 8))
}
