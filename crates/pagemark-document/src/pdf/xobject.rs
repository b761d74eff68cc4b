// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image XObjects: reads marker artifacts, accepts PNG and JPEG only, and
// turns decoded pixels into an RGB image with an optional soft mask.

use std::path::Path;

use image::{DynamicImage, ImageFormat};
use lopdf::{Document, ObjectId, Stream, dictionary};
use pagemark_core::error::{PagemarkError, Result};
use tracing::debug;

/// A decoded artifact, ready to be written as an XObject.
#[derive(Debug, Clone)]
pub(crate) struct DecodedArtifact {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// Packed 8-bit RGB samples.
    pub rgb: Vec<u8>,
    /// 8-bit alpha samples, present only when some pixel is not opaque.
    pub alpha: Option<Vec<u8>>,
}

fn unavailable(artifact: &Path, reason: impl Into<String>) -> PagemarkError {
    PagemarkError::ArtifactUnavailable {
        artifact: artifact.to_path_buf(),
        reason: reason.into(),
    }
}

/// Read the raw bytes of an artifact.
pub(crate) fn read_artifact(artifact: &Path) -> Result<Vec<u8>> {
    std::fs::read(artifact).map_err(|err| unavailable(artifact, err.to_string()))
}

/// Decode artifact bytes. Anything other than PNG or JPEG is rejected.
pub(crate) fn decode_artifact(artifact: &Path, bytes: &[u8]) -> Result<DecodedArtifact> {
    let format = image::guess_format(bytes)
        .map_err(|err| unavailable(artifact, format!("unrecognised image data: {err}")))?;
    if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
        return Err(unavailable(
            artifact,
            format!("unsupported format {format:?}, expected PNG or JPEG"),
        ));
    }

    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|err| unavailable(artifact, format!("failed to decode: {err}")))?;
    Ok(split_channels(decoded, format))
}

fn split_channels(decoded: DynamicImage, format: ImageFormat) -> DecodedArtifact {
    let (width, height) = (decoded.width(), decoded.height());
    if !decoded.color().has_alpha() {
        return DecodedArtifact {
            width,
            height,
            format,
            rgb: decoded.to_rgb8().into_raw(),
            alpha: None,
        };
    }

    let rgba = decoded.to_rgba8();
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    let mut alpha = Vec::with_capacity(rgba.len() / 4);
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }
    let translucent = alpha.iter().any(|&a| a != u8::MAX);

    DecodedArtifact {
        width,
        height,
        format,
        rgb,
        alpha: translucent.then_some(alpha),
    }
}

/// Write `artifact` as an image XObject (plus its soft mask) and return its id.
pub(crate) fn add_image_xobject(doc: &mut Document, artifact: &DecodedArtifact) -> ObjectId {
    let width = i64::from(artifact.width);
    let height = i64::from(artifact.height);

    let mut image = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width,
        "Height" => height,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    if let Some(alpha) = &artifact.alpha {
        let mask_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha.clone(),
        ));
        image.set("SMask", mask_id);
    }

    let id = doc.add_object(Stream::new(image, artifact.rgb.clone()));
    debug!(
        object = id.0,
        width = artifact.width,
        height = artifact.height,
        format = ?artifact.format,
        soft_mask = artifact.alpha.is_some(),
        "Image XObject added"
    );
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[test]
    fn opaque_png_has_no_soft_mask() {
        let png = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, Rgb([10, 20, 30]))),
            ImageFormat::Png,
        );
        let decoded = decode_artifact(Path::new("qr.png"), &png).unwrap();
        assert_eq!((decoded.width, decoded.height), (4, 3));
        assert_eq!(decoded.rgb.len(), 4 * 3 * 3);
        assert!(decoded.alpha.is_none());
    }

    #[test]
    fn translucent_png_keeps_alpha() {
        let png = encode(
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 128]))),
            ImageFormat::Png,
        );
        let decoded = decode_artifact(Path::new("qr.png"), &png).unwrap();
        assert_eq!(decoded.alpha, Some(vec![128; 4]));
        assert_eq!(&decoded.rgb[..3], &[255, 0, 0]);
    }

    #[test]
    fn jpeg_is_accepted() {
        let jpeg = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 200, 200]))),
            ImageFormat::Jpeg,
        );
        let decoded = decode_artifact(Path::new("qr.jpg"), &jpeg).unwrap();
        assert_eq!(decoded.format, ImageFormat::Jpeg);
    }

    #[test]
    fn other_formats_are_unavailable() {
        let bmp = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]))),
            ImageFormat::Bmp,
        );
        let err = decode_artifact(Path::new("qr.bmp"), &bmp).unwrap_err();
        assert!(matches!(err, PagemarkError::ArtifactUnavailable { .. }));

        let err = decode_artifact(Path::new("qr.png"), b"plain text").unwrap_err();
        assert!(matches!(err, PagemarkError::ArtifactUnavailable { .. }));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let err = read_artifact(Path::new("/nonexistent/qr.png")).unwrap_err();
        assert!(matches!(err, PagemarkError::ArtifactUnavailable { .. }));
    }

    #[test]
    fn soft_mask_is_linked() {
        let mut doc = Document::with_version("1.5");
        let artifact = DecodedArtifact {
            width: 1,
            height: 1,
            format: ImageFormat::Png,
            rgb: vec![0, 0, 0],
            alpha: Some(vec![0]),
        };
        let id = add_image_xobject(&mut doc, &artifact);
        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        let mask = stream.dict.get(b"SMask").unwrap().as_reference().unwrap();
        assert!(doc.get_object(mask).unwrap().as_stream().is_ok());
    }
}
