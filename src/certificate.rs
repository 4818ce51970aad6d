//! Standalone signing certificate, produced when there is no source PDF.

use std::io::BufWriter;

use chrono::{DateTime, Utc};
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::*;
use tracing::{info, warn};

use crate::config::GenerationConfig;
use crate::error::{Result, SignError};
use crate::imaging::SignatureImage;
use crate::layout::{
    fit_image, BoxShape, Canvas, ImageFrame, Rule, Shade, TextRun, Weight,
};
use crate::signature::{format_audit_date, format_iso, format_long_date, SignatureInfo};

// ============================================================================
// Constants
// ============================================================================

/// A4 in points
pub const PAGE_WIDTH_PT: f32 = 595.28;
pub const PAGE_HEIGHT_PT: f32 = 841.89;

const MARGIN: f32 = 50.0;

/// Signature box and the image bounds inside it
const SIG_BOX_WIDTH: f32 = 300.0;
const SIG_BOX_HEIGHT: f32 = 120.0;
const SIG_MAX_WIDTH: f32 = 260.0;
const SIG_MAX_HEIGHT: f32 = 90.0;

const ROW_STEP: f32 = 18.0;
const AUDIT_STEP: f32 = 18.0;

/// Lowest baseline an audit row may use without touching the footer rule.
const AUDIT_FLOOR: f32 = 62.0;

const BRAND: Shade = Shade(0.145, 0.388, 0.922);
const HEADING: Shade = Shade::gray(0.2);

pub const LEGAL_NOTICE: [&str; 5] = [
    "This document has been electronically signed in accordance with the Electronic Signatures in",
    "Global and National Commerce Act (E-SIGN Act) and the Uniform Electronic Transactions Act",
    "(UETA). The electronic signature applied to this document is legally binding and carries the",
    "same legal effect as a handwritten signature. A complete audit trail including IP address,",
    "timestamp, and signer identification has been recorded.",
];

// ============================================================================
// Certificate ID
// ============================================================================

/// Base-36 rendering of the generation instant in epoch milliseconds,
/// uppercased. Identifies the certificate; it is not a secret.
pub fn certificate_id(generated_at: &DateTime<Utc>) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    let mut value = generated_at.timestamp_millis().max(0) as u64;
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

// ============================================================================
// Layout
// ============================================================================

/// Draws the whole certificate onto `canvas` and returns its id.
pub fn draw_certificate(
    canvas: &mut impl Canvas,
    info: &SignatureInfo,
    image_size: (u32, u32),
    config: &GenerationConfig,
    generated_at: &DateTime<Utc>,
) -> Result<String> {
    let signed_at = info.signed_at()?;
    let events = info.audit_events()?;
    let width = PAGE_WIDTH_PT;
    let mut y_pos = PAGE_HEIGHT_PT - MARGIN;

    // Header band
    canvas.draw_box(&BoxShape {
        x: 0.0,
        y: y_pos - 30.0,
        width,
        height: 80.0,
        fill: BRAND,
        border: None,
    });
    canvas.draw_text(&TextRun::new(
        config.product_name.as_str(),
        MARGIN,
        y_pos - 5.0,
        28.0,
        Weight::Bold,
        Shade::WHITE,
    ));
    canvas.draw_text(&TextRun::new(
        config.certificate_subtitle.as_str(),
        MARGIN,
        y_pos - 25.0,
        12.0,
        Weight::Regular,
        Shade(0.85, 0.9, 1.0),
    ));
    y_pos -= 100.0;

    // Title
    canvas.draw_text(&TextRun::new(
        "SIGNING CERTIFICATE",
        MARGIN,
        y_pos,
        20.0,
        Weight::Bold,
        Shade::gray(0.1),
    ));
    y_pos -= 15.0;
    canvas.draw_rule(&Rule {
        from: (MARGIN, y_pos),
        to: (width - MARGIN, y_pos),
        thickness: 2.0,
        color: BRAND,
    });
    y_pos -= 30.0;

    // Document details
    y_pos = draw_heading(canvas, "Document Details", y_pos);
    y_pos = draw_info_row(canvas, "Document Title:", &info.document_title, y_pos);
    if let Some(description) = info.description() {
        y_pos = draw_info_row(canvas, "Description:", description, y_pos);
    }
    y_pos = draw_info_row(canvas, "Date Signed:", &format_long_date(&signed_at), y_pos);
    y_pos = draw_info_row(canvas, "Status:", "COMPLETED", y_pos);
    y_pos -= 12.0;

    // Signer details
    y_pos = draw_heading(canvas, "Signer Details", y_pos);
    y_pos = draw_info_row(canvas, "Name:", &info.signer_name, y_pos);
    y_pos = draw_info_row(canvas, "Email:", &info.signer_email, y_pos);
    if let Some(ip) = info.ip() {
        y_pos = draw_info_row(canvas, "IP Address:", ip, y_pos);
    }
    y_pos = draw_info_row(canvas, "Timestamp:", &format_iso(&signed_at), y_pos);
    y_pos -= 4.0;

    // Signature
    canvas.draw_text(&TextRun::new("Signature", MARGIN, y_pos, 14.0, Weight::Bold, HEADING));
    y_pos -= 15.0;
    y_pos = draw_signature_box(canvas, info, image_size, y_pos);

    // Legal notice
    y_pos = draw_legal_notice(canvas, width, y_pos);

    // Audit trail
    y_pos = draw_heading(canvas, "Audit Trail", y_pos);
    let mut dropped = 0;
    for (event, at) in &events {
        if y_pos < AUDIT_FLOOR {
            dropped += 1;
            continue;
        }
        canvas.draw_box(&BoxShape {
            x: MARGIN + 5.0,
            y: y_pos,
            width: 6.0,
            height: 6.0,
            fill: BRAND,
            border: None,
        });
        canvas.draw_text(&TextRun::new(
            event.as_str(),
            MARGIN + 20.0,
            y_pos,
            10.0,
            Weight::Regular,
            Shade::gray(0.2),
        ));
        canvas.draw_text(&TextRun::new(
            format_audit_date(at),
            MARGIN + 250.0,
            y_pos,
            9.0,
            Weight::Regular,
            Shade::gray(0.5),
        ));
        y_pos -= AUDIT_STEP;
    }
    if dropped > 0 {
        warn!(dropped, "audit trail does not fit on the certificate page");
    }

    // Footer
    let id = certificate_id(generated_at);
    canvas.draw_rule(&Rule {
        from: (MARGIN, 50.0),
        to: (width - MARGIN, 50.0),
        thickness: 0.5,
        color: Shade::gray(0.8),
    });
    canvas.draw_text(&TextRun::new(
        format!("Generated by {} - {}", config.product_name, config.product_tagline),
        MARGIN,
        35.0,
        8.0,
        Weight::Regular,
        Shade::gray(0.6),
    ));
    canvas.draw_text(&TextRun::new(
        format!("Certificate ID: {}", id),
        width - MARGIN - 180.0,
        35.0,
        8.0,
        Weight::Regular,
        Shade::gray(0.6),
    ));

    Ok(id)
}

fn draw_heading(canvas: &mut impl Canvas, title: &str, y: f32) -> f32 {
    canvas.draw_text(&TextRun::new(title, MARGIN, y, 14.0, Weight::Bold, HEADING));
    y - 22.0
}

fn draw_info_row(canvas: &mut impl Canvas, label: &str, value: &str, y: f32) -> f32 {
    canvas.draw_text(&TextRun::new(
        label,
        MARGIN + 10.0,
        y,
        10.0,
        Weight::Bold,
        Shade::gray(0.4),
    ));
    canvas.draw_text(&TextRun::new(
        value,
        MARGIN + 140.0,
        y,
        10.0,
        Weight::Regular,
        Shade::gray(0.15),
    ));
    y - ROW_STEP
}

fn draw_signature_box(
    canvas: &mut impl Canvas,
    info: &SignatureInfo,
    image_size: (u32, u32),
    top: f32,
) -> f32 {
    let background = Shade::gray(0.97);
    canvas.draw_box(&BoxShape {
        x: MARGIN,
        y: top - SIG_BOX_HEIGHT,
        width: SIG_BOX_WIDTH,
        height: SIG_BOX_HEIGHT,
        fill: background,
        border: Some((Shade::gray(0.8), 1.0)),
    });

    let (sig_width, sig_height) = fit_image(
        image_size.0 as f32,
        image_size.1 as f32,
        SIG_MAX_WIDTH,
        SIG_MAX_HEIGHT,
    );
    canvas.draw_signature(
        &ImageFrame {
            x: MARGIN + (SIG_BOX_WIDTH - sig_width) / 2.0,
            y: top - 110.0 + (SIG_MAX_HEIGHT - sig_height) / 2.0,
            width: sig_width,
            height: sig_height,
        },
        background,
    );

    canvas.draw_rule(&Rule {
        from: (MARGIN + 20.0, top - 105.0),
        to: (MARGIN + SIG_BOX_WIDTH - 20.0, top - 105.0),
        thickness: 0.5,
        color: Shade::gray(0.6),
    });
    canvas.draw_text(&TextRun::new(
        info.signer_name.as_str(),
        MARGIN + 20.0,
        top - 118.0,
        9.0,
        Weight::Regular,
        Shade::gray(0.4),
    ));

    top - SIG_BOX_HEIGHT - 20.0
}

fn draw_legal_notice(canvas: &mut impl Canvas, page_width: f32, top: f32) -> f32 {
    canvas.draw_box(&BoxShape {
        x: MARGIN,
        y: top - 90.0,
        width: page_width - MARGIN * 2.0,
        height: 90.0,
        fill: Shade(0.96, 0.97, 0.98),
        border: Some((Shade(0.85, 0.87, 0.9), 1.0)),
    });
    canvas.draw_text(&TextRun::new(
        "Legal Notice",
        MARGIN + 15.0,
        top - 18.0,
        10.0,
        Weight::Bold,
        Shade::gray(0.3),
    ));

    let mut line_y = top - 35.0;
    for line in LEGAL_NOTICE {
        canvas.draw_text(&TextRun::new(
            line,
            MARGIN + 15.0,
            line_y,
            8.0,
            Weight::Regular,
            Shade::gray(0.45),
        ));
        line_y -= 12.0;
    }

    top - 105.0
}

// ============================================================================
// PDF Generation
// ============================================================================

/// Points to printpdf millimetres
fn mm(points: f32) -> Mm {
    Mm(points * 25.4 / 72.0)
}

fn rgb(shade: Shade) -> Color {
    Color::Rgb(Rgb::new(shade.0, shade.1, shade.2, None))
}

struct LayerCanvas<'a> {
    layer: PdfLayerReference,
    font_regular: &'a IndirectFontRef,
    font_bold: &'a IndirectFontRef,
    signature: &'a SignatureImage,
}

impl Canvas for LayerCanvas<'_> {
    fn draw_box(&mut self, shape: &BoxShape) {
        let (left, bottom) = (shape.x, shape.y);
        let (right, top) = (shape.x + shape.width, shape.y + shape.height);
        let corners = vec![
            (Point::new(mm(left), mm(bottom)), false),
            (Point::new(mm(right), mm(bottom)), false),
            (Point::new(mm(right), mm(top)), false),
            (Point::new(mm(left), mm(top)), false),
        ];

        self.layer.set_fill_color(rgb(shape.fill));
        let mode = match shape.border {
            Some((border, thickness)) => {
                self.layer.set_outline_color(rgb(border));
                self.layer.set_outline_thickness(thickness);
                PaintMode::FillStroke
            }
            None => PaintMode::Fill,
        };
        self.layer.add_polygon(Polygon {
            rings: vec![corners],
            mode,
            winding_order: WindingOrder::NonZero,
        });
    }

    fn draw_rule(&mut self, rule: &Rule) {
        self.layer.set_outline_color(rgb(rule.color));
        self.layer.set_outline_thickness(rule.thickness);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(mm(rule.from.0), mm(rule.from.1)), false),
                (Point::new(mm(rule.to.0), mm(rule.to.1)), false),
            ],
            is_closed: false,
        });
    }

    fn draw_text(&mut self, run: &TextRun) {
        let font = match run.weight {
            Weight::Regular => self.font_regular,
            Weight::Bold => self.font_bold,
        };
        self.layer.set_fill_color(rgb(run.color));
        self.layer
            .use_text(run.text.as_str(), run.size, mm(run.x), mm(run.y), font);
    }

    fn draw_signature(&mut self, frame: &ImageFrame, backdrop: Shade) {
        if frame.width <= 0.0 {
            return;
        }
        let width_px = self.signature.width();
        let height_px = self.signature.height();

        // Flattened over the box colour; printpdf images carry no soft mask here
        let image = Image::from(ImageXObject {
            width: Px(width_px as usize),
            height: Px(height_px as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: self.signature.rgb_over(backdrop),
            image_filter: None,
            clipping_bbox: None,
            smask: None,
        });

        // DPI that renders the raster at exactly frame.width points
        let dpi = width_px as f32 * 72.0 / frame.width;

        image.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(mm(frame.x)),
                translate_y: Some(mm(frame.y)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
    }
}

/// Builds the one-page certificate PDF.
pub fn compose_certificate(
    info: &SignatureInfo,
    image: &SignatureImage,
    config: &GenerationConfig,
    generated_at: &DateTime<Utc>,
) -> Result<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(
        format!("Signing Certificate - {}", info.document_title),
        mm(PAGE_WIDTH_PT),
        mm(PAGE_HEIGHT_PT),
        "Layer 1",
    );

    let font_regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| SignError::PdfError(e.to_string()))?;
    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| SignError::PdfError(e.to_string()))?;

    let mut canvas = LayerCanvas {
        layer: doc.get_page(page).get_layer(layer),
        font_regular: &font_regular,
        font_bold: &font_bold,
        signature: image,
    };
    let id = draw_certificate(
        &mut canvas,
        info,
        (image.width(), image.height()),
        config,
        generated_at,
    )?;

    let mut writer = BufWriter::new(Vec::new());
    doc.save(&mut writer)
        .map_err(|e| SignError::PdfError(e.to_string()))?;
    let bytes = writer
        .into_inner()
        .map_err(|e| SignError::PdfError(e.to_string()))?;

    info!(certificate_id = %id, bytes = bytes.len(), "signing certificate generated");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{parse_timestamp, AuditEntry};

    /// Records what was drawn instead of rendering it.
    #[derive(Default)]
    struct Recorder {
        texts: Vec<TextRun>,
        images: Vec<ImageFrame>,
    }

    impl Canvas for Recorder {
        fn draw_box(&mut self, _shape: &BoxShape) {}
        fn draw_rule(&mut self, _rule: &Rule) {}
        fn draw_text(&mut self, run: &TextRun) {
            self.texts.push(run.clone());
        }
        fn draw_signature(&mut self, frame: &ImageFrame, _backdrop: Shade) {
            self.images.push(*frame);
        }
    }

    impl Recorder {
        fn has_text(&self, needle: &str) -> bool {
            self.texts.iter().any(|run| run.text == needle)
        }
    }

    fn info() -> SignatureInfo {
        SignatureInfo {
            signature_image_data: String::new(),
            signer_name: "Jane Doe".to_string(),
            signer_email: "jane@x.com".to_string(),
            signed_at: "2024-01-01T12:00:00Z".to_string(),
            ip_address: Some("198.51.100.7".to_string()),
            document_title: "Lease".to_string(),
            document_description: Some("Two-year residential lease".to_string()),
            audit_trail: Vec::new(),
        }
    }

    fn draw(info: &SignatureInfo, image_size: (u32, u32)) -> (Recorder, String) {
        let mut recorder = Recorder::default();
        let generated_at = parse_timestamp("2024-01-01T12:00:05Z").unwrap();
        let id = draw_certificate(
            &mut recorder,
            info,
            image_size,
            &GenerationConfig::default(),
            &generated_at,
        )
        .unwrap();
        (recorder, id)
    }

    #[test]
    fn certificate_id_is_uppercase_base36() {
        let at = parse_timestamp("2024-01-01T12:00:00Z").unwrap();
        let id = certificate_id(&at);
        assert!(!id.is_empty());
        assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_eq!(u64::from_str_radix(&id, 36).unwrap(), at.timestamp_millis() as u64);
    }

    #[test]
    fn lists_document_and_signer_details() {
        let (recorder, id) = draw(&info(), (300, 100));
        for expected in [
            "QuickInk",
            "SIGNING CERTIFICATE",
            "Lease",
            "Two-year residential lease",
            "January 1, 2024 at 12:00:00 PM UTC",
            "COMPLETED",
            "Jane Doe",
            "jane@x.com",
            "198.51.100.7",
            "2024-01-01T12:00:00.000Z",
            "Legal Notice",
            "Generated by QuickInk - Self-Hosted E-Signature Solution",
        ] {
            assert!(recorder.has_text(expected), "missing {expected:?}");
        }
        assert!(recorder.has_text(&format!("Certificate ID: {}", id)));
    }

    #[test]
    fn ip_row_is_omitted_when_absent() {
        let mut without_ip = info();
        without_ip.ip_address = None;
        let (recorder, _) = draw(&without_ip, (300, 100));
        assert!(!recorder.has_text("IP Address:"));
        assert!(recorder.has_text("Timestamp:"));
    }

    #[test]
    fn default_audit_trail_has_four_events() {
        let (recorder, _) = draw(&info(), (300, 100));
        for event in crate::signature::DEFAULT_AUDIT_EVENTS {
            assert!(recorder.has_text(event), "missing {event:?}");
        }
        let stamps = recorder
            .texts
            .iter()
            .filter(|run| run.text == "Jan 1, 2024, 12:00 PM")
            .count();
        assert_eq!(stamps, 4);
    }

    #[test]
    fn everything_stays_above_the_footer() {
        let (recorder, _) = draw(&info(), (300, 100));
        let lowest_body = recorder
            .texts
            .iter()
            .filter(|run| !run.text.starts_with("Generated by") && !run.text.starts_with("Certificate ID"))
            .map(|run| run.y)
            .fold(f32::MAX, f32::min);
        assert!(lowest_body >= AUDIT_FLOOR);
    }

    #[test]
    fn overlong_audit_trail_is_cut_to_the_page() {
        let mut long_trail = info();
        long_trail.audit_trail = (0..30)
            .map(|i| AuditEntry::new(format!("Event {i}"), "2024-01-01T12:00:00Z"))
            .collect();
        let (recorder, _) = draw(&long_trail, (300, 100));
        assert!(recorder.has_text("Event 0"));
        assert!(!recorder.has_text("Event 29"));
    }

    #[test]
    fn signature_fits_its_box_without_upscaling() {
        let (large, _) = draw(&info(), (1040, 180));
        let frame = large.images[0];
        assert!(frame.width <= SIG_MAX_WIDTH && frame.height <= SIG_MAX_HEIGHT);
        assert!(((frame.width / frame.height) - (1040.0 / 180.0)).abs() < 1e-3);

        let (small, _) = draw(&info(), (80, 30));
        assert_eq!((small.images[0].width, small.images[0].height), (80.0, 30.0));
    }
}
