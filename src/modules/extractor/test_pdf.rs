//! In-memory PDF fixtures for extractor tests.

use std::io::Write;

use flate2::{Compression, write::ZlibEncoder};
use lopdf::{
    Document, Object, Stream,
    content::{Content, Operation},
    dictionary,
};

pub fn fake_jpeg(page_number: u32) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.extend_from_slice(format!("scan-page-{page_number}").as_bytes());
    bytes.extend_from_slice(&[0xFF, 0xD9]);
    bytes
}

/// One page per entry, each drawing its text in Courier.
pub fn text_pages(pages: &[&str]) -> Vec<u8> {
    build(pages.len(), |doc, index| {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let mut operations = vec![Operation::new("BT", vec![])];
        if !pages[index].is_empty() {
            operations.extend([
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(pages[index])]),
            ]);
        }
        operations.push(Operation::new("ET", vec![]));
        (resources_id, Content { operations })
    })
}

/// One image XObject drawn over a whole page.
pub struct ScanImage {
    pub filter: Option<Object>,
    pub width: i64,
    pub height: i64,
    pub color_space: &'static str,
    pub data: Vec<u8>,
}

/// Scanned-style pages: no text layer, one JPEG XObject drawn full page.
pub fn image_only(page_count: usize) -> Vec<u8> {
    scanned(
        (1..=page_count as u32)
            .map(|page_number| ScanImage {
                filter: Some("DCTDecode".into()),
                width: 1275,
                height: 1650,
                color_space: "DeviceRGB",
                data: fake_jpeg(page_number),
            })
            .collect(),
    )
}

/// 8x4 gray samples, dark to light.
pub fn gray_ramp() -> Vec<u8> {
    (0..32u8).map(|value| value * 8).collect()
}

/// Scanned pages whose image is zlib-compressed gray samples.
pub fn flate_image_only(page_count: usize) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&gray_ramp()).expect("compress samples");
    let compressed = encoder.finish().expect("finish compression");

    scanned(
        (0..page_count)
            .map(|_| ScanImage {
                filter: Some("FlateDecode".into()),
                width: 8,
                height: 4,
                color_space: "DeviceGray",
                data: compressed.clone(),
            })
            .collect(),
    )
}

pub fn scanned(images: Vec<ScanImage>) -> Vec<u8> {
    build(images.len(), |doc, index| {
        let scan = &images[index];
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => scan.width,
            "Height" => scan.height,
            "ColorSpace" => scan.color_space,
            "BitsPerComponent" => 8,
        };
        if let Some(filter) = &scan.filter {
            dict.set("Filter", filter.clone());
        }
        let image_id = doc.add_object(Stream::new(dict, scan.data.clone()));
        let resources_id = doc.add_object(dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        });
        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    612.into(),
                    0.into(),
                    0.into(),
                    792.into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec!["Im0".into()]),
            Operation::new("Q", vec![]),
        ];
        (resources_id, Content { operations })
    })
}

fn build(
    page_count: usize,
    mut page: impl FnMut(&mut Document, usize) -> (lopdf::ObjectId, Content),
) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(page_count);
    for index in 0..page_count {
        let (resources_id, content) = page(&mut doc, index);
        let encoded = content.encode().expect("encode page content");
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize test PDF");
    bytes
}
