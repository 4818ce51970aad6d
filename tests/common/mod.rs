#![allow(dead_code)]

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use quickink_pdf::SignatureInfo;

/// Text drawn by the single page of every source document we build.
pub const ORIGINAL_TEXT: &str = "Original page text";

/// A one-page PDF with a MediaBox of `width` x `height` points.
pub fn source_pdf(width: i64, height: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), (height - 72).into()]),
            Operation::new("Tj", vec![Object::string_literal(ORIGINAL_TEXT)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// A PNG of a dark stroke on a transparent background.
pub fn signature_png(width: u32, height: u32) -> Vec<u8> {
    let pixels = RgbaImage::from_fn(width, height, |x, y| {
        if y == height / 2 || x == y {
            Rgba([20, 20, 60, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(pixels)
        .write_to(&mut bytes, ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

pub fn data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(png))
}

pub fn jane_doe() -> SignatureInfo {
    SignatureInfo {
        signature_image_data: data_uri(&signature_png(300, 100)),
        signer_name: "Jane Doe".to_string(),
        signer_email: "jane@x.com".to_string(),
        signed_at: "2024-01-01T12:00:00Z".to_string(),
        ip_address: Some("203.0.113.9".to_string()),
        document_title: "Lease Agreement".to_string(),
        document_description: None,
        audit_trail: Vec::new(),
    }
}

pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Strings shown by `Tj`/`TJ` on one page, in drawing order.
pub fn page_texts(doc: &Document, page_id: ObjectId) -> Vec<String> {
    let content = doc.get_page_content(page_id).unwrap();
    let decoded = Content::decode(&content).unwrap();

    let mut texts = Vec::new();
    for operation in decoded.operations {
        match operation.operator.as_str() {
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operation.operands.first() {
                    texts.push(latin1(bytes));
                }
            }
            "TJ" => {
                if let Some(Object::Array(parts)) = operation.operands.first() {
                    let joined: String = parts
                        .iter()
                        .filter_map(|part| match part {
                            Object::String(bytes, _) => Some(latin1(bytes)),
                            _ => None,
                        })
                        .collect();
                    texts.push(joined);
                }
            }
            _ => {}
        }
    }
    texts
}

pub fn all_texts(doc: &Document) -> Vec<String> {
    page_ids(doc)
        .into_iter()
        .flat_map(|page_id| page_texts(doc, page_id))
        .collect()
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
