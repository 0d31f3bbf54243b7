use std::io::Cursor;

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat};

use crate::error::{CompositionError, DecodeError};

/// Decode a base64 image payload, optionally wrapped in a `data:` URI.
pub fn decode_image(data: &str) -> Result<DynamicImage, DecodeError> {
    let payload = strip_data_uri(data.trim());
    let bytes = STANDARD.decode(payload)?;
    Ok(image::load_from_memory(&bytes)?)
}

fn strip_data_uri(data: &str) -> &str {
    match data.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(";base64,")
            .map(|(_, payload)| payload)
            .unwrap_or(data),
        None => data,
    }
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, CompositionError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|source| CompositionError::Encode {
            width: image.width(),
            height: image.height(),
            source,
        })?;
    Ok(buf.into_inner())
}

pub fn encode_png_base64(image: &DynamicImage) -> Result<String, CompositionError> {
    Ok(STANDARD.encode(encode_png(image)?))
}
