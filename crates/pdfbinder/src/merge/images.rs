//! Embedding raster images as full-page image XObjects.
//!
//! JPEG data is stored as-is behind a `DCTDecode` filter. PNG data, which
//! only arrives from hosts staging files themselves, is decoded, flattened on
//! white and stored as raw RGB for the final `compress` pass to deflate.

use image::codecs::jpeg::JpegDecoder;
use image::{ColorType, ImageDecoder};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use std::io::Cursor;

use crate::error::{PdfBinderError, Result};
use crate::io::normalizer::flatten_on_white;
use crate::io::stager::StagedMime;

/// Resource name of the image on its page.
const IMAGE_NAME: &str = "Im0";

/// An image XObject ready to be added to a document.
#[derive(Debug)]
pub struct ImageXObject {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// The XObject stream.
    pub stream: Stream,
}

/// Build an image XObject from staged image bytes.
pub fn image_xobject(mime: StagedMime, bytes: &[u8]) -> Result<ImageXObject> {
    match mime {
        StagedMime::Jpeg => jpeg_xobject(bytes),
        StagedMime::Png => raw_rgb_xobject(bytes),
        StagedMime::Pdf => Err(PdfBinderError::other("not an image")),
    }
}

fn jpeg_xobject(bytes: &[u8]) -> Result<ImageXObject> {
    let decoder = JpegDecoder::new(Cursor::new(bytes))
        .map_err(|e| PdfBinderError::other(format!("invalid JPEG: {e}")))?;
    let (width, height) = decoder.dimensions();
    let color_space = match decoder.color_type() {
        ColorType::L8 => "DeviceGray",
        _ => "DeviceRGB",
    };

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8i64,
        "Filter" => "DCTDecode",
    };

    Ok(ImageXObject {
        width,
        height,
        stream: Stream::new(dict, bytes.to_vec()).with_compression(false),
    })
}

fn raw_rgb_xobject(bytes: &[u8]) -> Result<ImageXObject> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| PdfBinderError::other(format!("invalid image: {e}")))?;
    let rgb = flatten_on_white(decoded);
    let (width, height) = rgb.dimensions();

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8i64,
    };

    Ok(ImageXObject {
        width,
        height,
        stream: Stream::new(dict, rgb.into_raw()),
    })
}

/// Add `image` to `doc` on a page of its own, sized to the image in points.
///
/// Returns the id of the new page. The page is parented to `parent_id` but
/// not added to its `Kids`.
pub fn add_image_page(
    doc: &mut Document,
    parent_id: ObjectId,
    image: ImageXObject,
) -> Result<ObjectId> {
    let width = i64::from(image.width);
    let height = i64::from(image.height);
    let image_id = doc.add_object(image.stream);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    0i64.into(),
                    0i64.into(),
                    height.into(),
                    0i64.into(),
                    0i64.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));

    let page = dictionary! {
        "Type" => "Page",
        "Parent" => parent_id,
        "MediaBox" => vec![0i64.into(), 0i64.into(), width.into(), height.into()],
        "Resources" => dictionary! {
            "XObject" => dictionary! { IMAGE_NAME => image_id },
        },
        "Contents" => content_id,
    };

    Ok(doc.add_object(page))
}
