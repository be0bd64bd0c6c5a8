//! PNG to image XObject conversion

use crate::types::{OverlayError, Result};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;

/// An image XObject added to a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRef {
    pub id: ObjectId,
    /// Pixel width of the source image
    pub width: u32,
    /// Pixel height of the source image
    pub height: u32,
}

/// Decode PNG bytes and add them as an RGB image XObject.
///
/// The alpha channel becomes a DeviceGray soft mask so transparent
/// signature padding does not cover the page.
pub fn embed_png(doc: &mut Document, png: &[u8]) -> Result<ImageRef> {
    let img = image::load_from_memory_with_format(png, image::ImageFormat::Png)?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let smask_id = if alpha.iter().all(|&a| a == u8::MAX) {
        None
    } else {
        let dict = image_dict(width, height, b"DeviceGray");
        Some(doc.add_object(Stream::new(dict, compress(&alpha)?)))
    };

    let mut dict = image_dict(width, height, b"DeviceRGB");
    if let Some(smask_id) = smask_id {
        dict.set("SMask", Object::Reference(smask_id));
    }
    let id = doc.add_object(Stream::new(dict, compress(&rgb)?));

    Ok(ImageRef { id, width, height })
}

fn image_dict(width: u32, height: u32, color_space: &[u8]) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(color_space.to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    dict
}

fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| OverlayError::Encode(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| OverlayError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Bitmap;

    #[test]
    fn test_transparent_png_gets_soft_mask() {
        let png = Bitmap::transparent(3, 2).unwrap().encode_png().unwrap();
        let mut doc = Document::with_version("1.7");
        let image = embed_png(&mut doc, &png).unwrap();
        assert_eq!((image.width, image.height), (3, 2));

        let stream = doc.get_object(image.id).unwrap().as_stream().unwrap();
        assert!(stream.dict.has(b"SMask"));
        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 3);
    }

    #[test]
    fn test_garbage_is_an_image_error() {
        let mut doc = Document::with_version("1.7");
        let result = embed_png(&mut doc, b"not a png");
        assert!(matches!(result, Err(OverlayError::Image(_))));
    }
}
