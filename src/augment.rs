//! Stamping a signature block onto an existing PDF.
//!
//! The original page content streams are never rewritten. The signed page's
//! contents become `[q] + original streams + [Q + overlay]`, so whatever
//! graphics state the original leaves behind cannot leak into the block.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info};

use crate::config::GenerationConfig;
use crate::error::{Result, SignError};
use crate::imaging::SignatureImage;
use crate::layout::{footer_lines, place_block, BlockLayout, Canvas, PageBox, TargetPage};
use crate::overlay::{OverlayCanvas, OverlayResources};
use crate::signature::SignatureInfo;

/// How far up the page tree to look for inherited attributes.
const MAX_TREE_DEPTH: usize = 32;

/// US Letter, used when no MediaBox can be found anywhere in the tree.
const FALLBACK_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Loads `source`, adds the signature block (and a page, if needed) and
/// returns the serialized document.
pub fn augment_document(
    source: &[u8],
    info: &SignatureInfo,
    image: &SignatureImage,
    config: &GenerationConfig,
) -> Result<Vec<u8>> {
    let signed_at = info.signed_at()?;

    let mut doc = Document::load_mem(source)
        .map_err(|e| SignError::DocumentLoadError(e.to_string()))?;

    let pages = doc.get_pages();
    let page_count = pages.len();
    let (_, &last_page_id) = pages
        .iter()
        .next_back()
        .ok_or_else(|| SignError::DocumentLoadError("document has no pages".into()))?;

    let media_box = media_box(&doc, last_page_id);
    let page = PageBox {
        x: media_box[0],
        y: media_box[1],
        width: media_box[2] - media_box[0],
        height: media_box[3] - media_box[1],
    };

    let placement = place_block(&page);
    debug!(
        page_count,
        page_height = page.height,
        target = ?placement.target,
        "placing signature block"
    );

    // Embedded fresh for every call
    let regular_id = doc.add_object(standard_font("Helvetica"));
    let bold_id = doc.add_object(standard_font("Helvetica-Bold"));
    let image_id = embed_image(&mut doc, image)?;

    let (target_page_id, resources) = match placement.target {
        TargetPage::Last => {
            let resources = attach_resources(&mut doc, last_page_id, regular_id, bold_id, image_id)?;
            (last_page_id, resources)
        }
        TargetPage::New => {
            let new_page_id = append_page(&mut doc, &media_box)?;
            let resources = attach_resources(&mut doc, new_page_id, regular_id, bold_id, image_id)?;
            (new_page_id, resources)
        }
    };

    let mut canvas = match placement.target {
        TargetPage::Last => OverlayCanvas::after_saved_state(resources),
        TargetPage::New => OverlayCanvas::new(resources),
    };

    BlockLayout::new(
        placement.x,
        placement.y,
        (image.width(), image.height()),
        info,
        &signed_at,
    )
    .draw(&mut canvas);

    for line in footer_lines(&page, &config.product_name, &info.document_title, &signed_at) {
        canvas.draw_text(&line);
    }

    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), canvas.finish()));
    match placement.target {
        TargetPage::Last => wrap_contents(&mut doc, target_page_id, overlay_id)?,
        TargetPage::New => set_page_entry(&mut doc, target_page_id, "Contents", Object::Reference(overlay_id))?,
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| SignError::PdfError(format!("Failed to save PDF: {}", e)))?;

    info!(
        pages_before = page_count,
        pages_after = doc.get_pages().len(),
        bytes = output.len(),
        "signature embedded in source document"
    );
    Ok(output)
}

// ============================================================================
// Page Tree Helpers
// ============================================================================

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

/// Looks `key` up on the page, then on its ancestors.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(resolve(doc, value));
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// The page's MediaBox, normalized so the first corner is lower-left.
fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let values: Option<Vec<f32>> = inherited(doc, page_id, b"MediaBox")
        .and_then(|object| object.as_array().ok())
        .and_then(|items| items.iter().map(|item| number(resolve(doc, item))).collect());

    match values.as_deref() {
        Some([x0, y0, x1, y1]) => [x0.min(*x1), y0.min(*y1), x0.max(*x1), y0.max(*y1)],
        _ => FALLBACK_MEDIA_BOX,
    }
}

fn set_page_entry(doc: &mut Document, page_id: ObjectId, key: &str, value: Object) -> Result<()> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| SignError::PdfError(format!("page dictionary unavailable: {}", e)))?
        .set(key, value);
    Ok(())
}

/// Appends a blank page with the given MediaBox to the root page tree.
fn append_page(doc: &mut Document, media_box: &[f32; 4]) -> Result<ObjectId> {
    let pages_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .and_then(|root| doc.get_dictionary(root))
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| SignError::DocumentLoadError(format!("page tree unavailable: {}", e)))?;

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => media_box.iter().map(|v| Object::Real((*v).into())).collect::<Vec<Object>>(),
    });

    let pages = doc
        .get_object_mut(pages_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| SignError::DocumentLoadError(format!("page tree unavailable: {}", e)))?;

    let count = pages.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
    pages.set("Count", count + 1);

    let indirect_kids = pages.get(b"Kids").and_then(Object::as_reference).ok();
    if indirect_kids.is_none() {
        let mut kids = pages
            .get(b"Kids")
            .and_then(Object::as_array)
            .cloned()
            .unwrap_or_default();
        kids.push(Object::Reference(page_id));
        pages.set("Kids", kids);
    }

    if let Some(kids_id) = indirect_kids {
        match doc.get_object_mut(kids_id) {
            Ok(Object::Array(kids)) => kids.push(Object::Reference(page_id)),
            _ => {
                return Err(SignError::DocumentLoadError(
                    "page tree Kids is not an array".into(),
                ))
            }
        }
    }

    Ok(page_id)
}

// ============================================================================
// Resources
// ============================================================================

fn standard_font(base_font: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Adds the signature as an RGB image XObject with a grayscale soft mask.
fn embed_image(doc: &mut Document, image: &SignatureImage) -> Result<ObjectId> {
    let (rgb, alpha) = image.rgb_and_alpha();
    let width = image.width() as i64;
    let height = image.height() as i64;

    let smask_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        deflate(&alpha)?,
    ));

    Ok(doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
            "SMask" => Object::Reference(smask_id),
        },
        deflate(&rgb)?,
    )))
}

/// Resolves a resource category to an owned dictionary.
fn category(doc: &Document, resources: &Dictionary, key: &[u8]) -> Dictionary {
    resources
        .get(key)
        .ok()
        .map(|object| resolve(doc, object))
        .and_then(|object| object.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new)
}

/// First of `base1`, `base2`, ... not already used in `dict`.
fn unused_name(dict: &Dictionary, base: &str) -> String {
    (1..)
        .map(|n| format!("{}{}", base, n))
        .find(|candidate| !dict.has(candidate.as_bytes()))
        .unwrap_or_else(|| base.to_string())
}

/// Gives the page its own resource dictionary holding the inherited entries
/// plus the overlay fonts and image, and returns the names used.
fn attach_resources(
    doc: &mut Document,
    page_id: ObjectId,
    regular_id: ObjectId,
    bold_id: ObjectId,
    image_id: ObjectId,
) -> Result<OverlayResources> {
    let mut resources = inherited(doc, page_id, b"Resources")
        .and_then(|object| object.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);

    let mut fonts = category(doc, &resources, b"Font");
    let mut xobjects = category(doc, &resources, b"XObject");

    let regular_font = unused_name(&fonts, "QiF");
    fonts.set(regular_font.as_str(), Object::Reference(regular_id));
    let bold_font = unused_name(&fonts, "QiF");
    fonts.set(bold_font.as_str(), Object::Reference(bold_id));
    let signature = unused_name(&xobjects, "QiIm");
    xobjects.set(signature.as_str(), Object::Reference(image_id));

    resources.set("Font", fonts);
    resources.set("XObject", xobjects);
    set_page_entry(doc, page_id, "Resources", Object::Dictionary(resources))?;

    Ok(OverlayResources {
        regular_font,
        bold_font,
        signature,
    })
}

// ============================================================================
// Contents
// ============================================================================

/// Brackets the page's existing streams with `q` ... `Q` and appends the
/// overlay stream, which begins with that `Q`.
fn wrap_contents(doc: &mut Document, page_id: ObjectId, overlay_id: ObjectId) -> Result<()> {
    let existing: Vec<Object> = {
        let page = doc
            .get_dictionary(page_id)
            .map_err(|e| SignError::PdfError(format!("page dictionary unavailable: {}", e)))?;
        match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Array(items)) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    };

    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(save_id));
    contents.extend(existing);
    contents.push(Object::Reference(overlay_id));

    set_page_entry(doc, page_id, "Contents", Object::Array(contents))
}
