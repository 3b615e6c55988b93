use std::io::{Cursor, Read};

use anyhow::{Context, Result, anyhow};
use flate2::read::ZlibDecoder;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage, RgbaImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pdfium_render::prelude::*;
use tracing::debug;

use super::PageImage;

/// Fixed zoom applied when rendering scanned pages.
pub const RENDER_ZOOM: f32 = 1.5;

const MAX_PARENT_DEPTH: usize = 32;

/// Produces one image per page, in page order.
///
/// Pages are rendered with pdfium when the library can be loaded. Without
/// it, each page's largest embedded image is used instead, and pages with
/// nothing decodable are skipped.
pub fn page_images(bytes: &[u8]) -> Result<Vec<PageImage>> {
    match bind_pdfium() {
        Ok(pdfium) => render_pages(&pdfium, bytes),
        Err(err) => {
            debug!(error = ?err, "pdfium unavailable, using embedded page images");
            embedded_page_images(bytes)
        }
    }
}

fn bind_pdfium() -> Result<Pdfium, PdfiumError> {
    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
}

fn render_pages(pdfium: &Pdfium, bytes: &[u8]) -> Result<Vec<PageImage>> {
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|err| anyhow!("failed to open PDF for rendering: {err:?}"))?;
    let config = PdfRenderConfig::new().scale_page_by_factor(RENDER_ZOOM);

    let mut images = Vec::new();
    for (index, page) in document.pages().iter().enumerate() {
        let page_number = index as u32 + 1;
        let bitmap = page
            .render_with_config(&config)
            .map_err(|err| anyhow!("failed to render page {page_number}: {err:?}"))?;
        let width = u32::try_from(bitmap.width()).context("negative bitmap width")?;
        let height = u32::try_from(bitmap.height()).context("negative bitmap height")?;
        let pixels = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes())
            .with_context(|| format!("page {page_number} bitmap has the wrong size"))?;

        images.push(PageImage {
            page_number,
            mime_type: "image/png".to_string(),
            width: Some(width),
            height: Some(height),
            data: encode_png(&DynamicImage::ImageRgba8(pixels))?,
        });
    }
    Ok(images)
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .context("failed to encode page image as PNG")?;
    Ok(buffer.into_inner())
}

/// Largest decodable image XObject of every page, sized as the page at
/// [`RENDER_ZOOM`].
pub(crate) fn embedded_page_images(bytes: &[u8]) -> Result<Vec<PageImage>> {
    let document = Document::load_mem(bytes).context("failed to parse PDF for page images")?;

    let mut images = Vec::new();
    for (page_number, page_id) in document.get_pages() {
        if let Some(image) = page_image(&document, page_number, page_id) {
            images.push(image);
        }
    }
    Ok(images)
}

struct EmbeddedImage {
    mime_type: &'static str,
    width: u32,
    height: u32,
    data: Vec<u8>,
}

fn page_image(document: &Document, page_number: u32, page_id: ObjectId) -> Option<PageImage> {
    let page = document.get_dictionary(page_id).ok()?;
    let resources = inherited(document, page, b"Resources")
        .and_then(|object| resolve(document, object))
        .and_then(|object| object.as_dict().ok())?;
    let xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|object| resolve(document, object))
        .and_then(|object| object.as_dict().ok())?;

    let image = xobjects
        .iter()
        .filter_map(|(_, object)| embedded_image(document, object))
        .max_by_key(|image| u64::from(image.width) * u64::from(image.height))?;

    let (width, height) = inherited(document, page, b"MediaBox")
        .and_then(|object| media_box_size(document, object))
        .unwrap_or((image.width as f32, image.height as f32));

    Some(PageImage {
        page_number,
        mime_type: image.mime_type.to_string(),
        width: Some(scaled(width)),
        height: Some(scaled(height)),
        data: image.data,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Raw,
    Flate,
    Jpeg,
    Jpeg2000,
}

fn embedded_image(document: &Document, object: &Object) -> Option<EmbeddedImage> {
    let stream = resolve(document, object)?.as_stream().ok()?;
    let subtype = stream.dict.get(b"Subtype").ok()?.as_name().ok()?;
    if subtype != b"Image" {
        return None;
    }

    let filter = match stream.dict.get(b"Filter") {
        Ok(filter) => Some(resolve(document, filter)?),
        Err(_) => None,
    };
    let encoding = encoding(filter)?;
    let width = dimension(document, &stream.dict, b"Width")?;
    let height = dimension(document, &stream.dict, b"Height")?;

    let (mime_type, data) = match encoding {
        Encoding::Jpeg => ("image/jpeg", stream.content.clone()),
        Encoding::Jpeg2000 => ("image/jp2", stream.content.clone()),
        Encoding::Flate => {
            if has_predictor(document, stream) {
                return None;
            }
            let mut samples = Vec::new();
            ZlibDecoder::new(stream.content.as_slice())
                .read_to_end(&mut samples)
                .ok()?;
            ("image/png", samples_to_png(document, stream, width, height, samples)?)
        }
        Encoding::Raw => (
            "image/png",
            samples_to_png(document, stream, width, height, stream.content.clone())?,
        ),
    };

    Some(EmbeddedImage {
        mime_type,
        width,
        height,
        data,
    })
}

/// Accepts no filter or exactly one known filter. Chains are not decoded.
fn encoding(filter: Option<&Object>) -> Option<Encoding> {
    let name = match filter {
        None => return Some(Encoding::Raw),
        Some(Object::Name(name)) => name.as_slice(),
        Some(Object::Array(items)) => match items.as_slice() {
            [] => return Some(Encoding::Raw),
            [Object::Name(name)] => name.as_slice(),
            _ => return None,
        },
        Some(_) => return None,
    };
    match name {
        b"FlateDecode" => Some(Encoding::Flate),
        b"DCTDecode" => Some(Encoding::Jpeg),
        b"JPXDecode" => Some(Encoding::Jpeg2000),
        _ => None,
    }
}

fn has_predictor(document: &Document, stream: &Stream) -> bool {
    stream
        .dict
        .get(b"DecodeParms")
        .ok()
        .and_then(|params| resolve(document, params))
        .and_then(|params| params.as_dict().ok())
        .and_then(|params| params.get(b"Predictor").ok())
        .and_then(number)
        .is_some_and(|predictor| predictor > 1.0)
}

/// 8-bit gray or RGB samples to PNG. Other layouts are skipped.
fn samples_to_png(
    document: &Document,
    stream: &Stream,
    width: u32,
    height: u32,
    mut samples: Vec<u8>,
) -> Option<Vec<u8>> {
    let bits = stream
        .dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|value| number(resolve(document, value)?))?;
    if bits != 8.0 {
        return None;
    }

    let components = color_components(document, stream.dict.get(b"ColorSpace").ok()?)?;
    let expected = (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(components)?;
    if samples.len() < expected {
        return None;
    }
    samples.truncate(expected);

    let image = match components {
        1 => DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, samples)?),
        3 => DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, samples)?),
        _ => return None,
    };
    encode_png(&image).ok()
}

fn color_components(document: &Document, object: &Object) -> Option<usize> {
    match resolve(document, object)? {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" => Some(1),
            b"DeviceRGB" | b"CalRGB" => Some(3),
            _ => None,
        },
        Object::Array(items) => match items.as_slice() {
            [Object::Name(family), profile] if family.as_slice() == b"ICCBased" => {
                let profile = resolve(document, profile)?.as_stream().ok()?;
                let count = number(resolve(document, profile.dict.get(b"N").ok()?)?)?;
                Some(count as usize)
            }
            [single] => color_components(document, single),
            _ => None,
        },
        _ => None,
    }
}

fn inherited<'a>(document: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut current = page;
    for _ in 0..MAX_PARENT_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = document.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

fn media_box_size(document: &Document, object: &Object) -> Option<(f32, f32)> {
    let values = resolve(document, object)?.as_array().ok()?;
    if values.len() != 4 {
        return None;
    }
    let coords: Vec<f32> = values
        .iter()
        .filter_map(|value| number(resolve(document, value)?))
        .collect();
    if coords.len() != 4 {
        return None;
    }
    let width = (coords[2] - coords[0]).abs();
    let height = (coords[3] - coords[1]).abs();
    (width > 0.0 && height > 0.0).then_some((width, height))
}

fn dimension(document: &Document, dict: &Dictionary, key: &[u8]) -> Option<u32> {
    let value = number(resolve(document, dict.get(key).ok()?)?)?;
    (value > 0.0).then_some(value as u32)
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

fn scaled(points: f32) -> u32 {
    (points * RENDER_ZOOM).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::extractor::test_pdf::{self, ScanImage};

    const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

    #[test]
    fn scanned_pages_yield_one_image_each_in_order() {
        let images = page_images(&test_pdf::image_only(3)).unwrap();
        assert_eq!(images.len(), 3);
        for (index, image) in images.iter().enumerate() {
            assert_eq!(image.page_number, index as u32 + 1);
            assert_eq!(image.width, Some(918));
            assert_eq!(image.height, Some(1188));
        }
    }

    #[test]
    fn flate_scans_are_not_dropped() {
        let images = page_images(&test_pdf::flate_image_only(2)).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].page_number, 1);
        assert_eq!(images[1].page_number, 2);
        for image in &images {
            assert_eq!(image.mime_type, "image/png");
            assert!(image.data.starts_with(PNG_SIGNATURE));
        }
    }

    #[test]
    fn embedded_jpeg_is_passed_through() {
        let images = embedded_page_images(&test_pdf::image_only(2)).unwrap();
        assert_eq!(images.len(), 2);
        for (index, image) in images.iter().enumerate() {
            assert_eq!(image.mime_type, "image/jpeg");
            assert_eq!(image.data, test_pdf::fake_jpeg(index as u32 + 1));
        }
    }

    #[test]
    fn embedded_flate_samples_become_png() {
        let images = embedded_page_images(&test_pdf::flate_image_only(1)).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].mime_type, "image/png");
        assert_eq!(images[0].width, Some(918));

        let decoded = image::load_from_memory(&images[0].data).unwrap().to_luma8();
        assert_eq!(decoded.dimensions(), (8, 4));
        assert_eq!(decoded.as_raw(), &test_pdf::gray_ramp());
    }

    #[test]
    fn filter_chains_are_skipped_not_mislabelled() {
        let chained = ScanImage {
            filter: Some(Object::Array(vec![
                Object::Name(b"ASCII85Decode".to_vec()),
                Object::Name(b"DCTDecode".to_vec()),
            ])),
            width: 8,
            height: 4,
            color_space: "DeviceRGB",
            data: b"s8W-!s8W-!~>".to_vec(),
        };
        let images = embedded_page_images(&test_pdf::scanned(vec![chained])).unwrap();
        assert!(images.is_empty());
    }

    #[test]
    fn filter_names_map_to_encodings() {
        let name = |value: &str| Object::Name(value.as_bytes().to_vec());
        assert_eq!(encoding(None), Some(Encoding::Raw));
        assert_eq!(encoding(Some(&name("FlateDecode"))), Some(Encoding::Flate));
        assert_eq!(encoding(Some(&name("DCTDecode"))), Some(Encoding::Jpeg));
        assert_eq!(
            encoding(Some(&Object::Array(vec![name("JPXDecode")]))),
            Some(Encoding::Jpeg2000)
        );
        assert_eq!(encoding(Some(&name("CCITTFaxDecode"))), None);
    }

    #[test]
    fn text_pages_have_no_embedded_images() {
        let images = embedded_page_images(&test_pdf::text_pages(&["hello"])).unwrap();
        assert!(images.is_empty());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(page_images(b"definitely not a pdf").is_err());
    }
}
