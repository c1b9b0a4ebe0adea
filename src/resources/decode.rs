use crate::transport::TransportError;
use crate::Result;
use bytes::Bytes;
use image::{ImageFormat, ImageReader};
use std::io::Cursor;

/// An image payload that has been sniffed and measured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub bytes: Bytes,
    pub content_type: String,
    pub width: u32,
    pub height: u32,
}

impl DecodedImage {
    /// Identify the format from magic bytes and read the dimensions.
    ///
    /// A concrete `image/*` header wins over the sniffed type; a missing or
    /// generic header (`application/octet-stream`) falls back to the sniffed
    /// format. Payloads that are not an image are rejected.
    pub fn decode(bytes: Bytes, header_content_type: Option<&str>) -> Result<Self> {
        let format = image::guess_format(&bytes).map_err(|e| not_an_image(e.to_string()))?;
        let (width, height) = ImageReader::with_format(Cursor::new(&bytes[..]), format)
            .into_dimensions()
            .map_err(|e| not_an_image(e.to_string()))?;

        let content_type = header_content_type
            .map(|h| h.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
            .filter(|h| h.starts_with("image/"))
            .unwrap_or_else(|| format.to_mime_type().to_string());

        Ok(Self {
            bytes,
            content_type,
            width,
            height,
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Conventional file extension for the content type.
    pub fn extension(&self) -> &'static str {
        ImageFormat::from_mime_type(&self.content_type)
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or("bin")
    }
}

fn not_an_image(reason: String) -> crate::Error {
    TransportError::new(None, format!("payload is not a decodable image: {}", reason)).into()
}
