//! Signature block geometry and placement.
//!
//! All coordinates are PDF points with the origin at the bottom-left of the
//! page. The layout is computed once into plain shapes and then drawn onto a
//! [`Canvas`], so the overlay writer and the certificate writer share it.

use chrono::{DateTime, Utc};

use crate::signature::{format_block_date, format_iso, SignatureInfo};

// ============================================================================
// Constants
// ============================================================================

/// Signature block outer size
pub const BLOCK_WIDTH: f32 = 260.0;
pub const BLOCK_HEIGHT: f32 = 160.0;
pub const BLOCK_PADDING: f32 = 12.0;

/// Bounding box for the signature image inside the block
pub const SIG_MAX_WIDTH: f32 = 220.0;
pub const SIG_MAX_HEIGHT: f32 = 70.0;

/// Placement margins
pub const RIGHT_MARGIN: f32 = 40.0;
pub const BOTTOM_MARGIN: f32 = 50.0;
pub const FOOTER_ALLOWANCE: f32 = 30.0;
pub const NEW_PAGE_TOP_OFFSET: f32 = 80.0;

/// The block only goes on the last page if it needs less than this share of
/// the page height.
pub const MAX_PAGE_SHARE: f32 = 0.45;

pub const FOOTER_LEFT_MARGIN: f32 = 40.0;

// ============================================================================
// Drawing Primitives
// ============================================================================

/// RGB colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shade(pub f32, pub f32, pub f32);

impl Shade {
    pub const WHITE: Shade = Shade(1.0, 1.0, 1.0);

    pub const fn gray(level: f32) -> Self {
        Shade(level, level, level)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    Regular,
    Bold,
}

/// A single line of text; `(x, y)` is the baseline start.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub weight: Weight,
    pub color: Shade,
}

impl TextRun {
    pub fn new(text: impl Into<String>, x: f32, y: f32, size: f32, weight: Weight, color: Shade) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            size,
            weight,
            color,
        }
    }
}

/// Filled rectangle with an optional border `(colour, width)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxShape {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub fill: Shade,
    pub border: Option<(Shade, f32)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub from: (f32, f32),
    pub to: (f32, f32),
    pub thickness: f32,
    pub color: Shade,
}

/// Where the signature image lands; `(x, y)` is its lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageFrame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A surface the layout can be drawn on.
pub trait Canvas {
    fn draw_box(&mut self, shape: &BoxShape);
    fn draw_rule(&mut self, rule: &Rule);
    fn draw_text(&mut self, run: &TextRun);
    /// Draws the signature image into `frame`. `backdrop` is the colour
    /// underneath, for writers that cannot carry transparency.
    fn draw_signature(&mut self, frame: &ImageFrame, backdrop: Shade);
}

// ============================================================================
// Image Fitting
// ============================================================================

/// Scales `(width, height)` down to fit inside `(max_width, max_height)`,
/// preserving aspect ratio. Never scales up.
pub fn fit_image(width: f32, height: f32, max_width: f32, max_height: f32) -> (f32, f32) {
    if width <= 0.0 || height <= 0.0 {
        return (0.0, 0.0);
    }
    let scale = (max_width / width).min(max_height / height).min(1.0);
    (width * scale, height * scale)
}

// ============================================================================
// Placement
// ============================================================================

/// A page's MediaBox, as lower-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PageBox {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetPage {
    /// Reuse the bottom of the document's last page.
    Last,
    /// Append a blank page the size of the last one.
    New,
}

/// Where the signature block goes; `(x, y)` is the block's lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub target: TargetPage,
    pub x: f32,
    pub y: f32,
}

/// Vertical space the block claims from the bottom of a page.
pub fn required_space() -> f32 {
    BLOCK_HEIGHT + BOTTOM_MARGIN + FOOTER_ALLOWANCE
}

/// Decides between the last page and a new one from the page height alone.
/// Existing content is not inspected.
pub fn place_block(page: &PageBox) -> Placement {
    let x = page.x + page.width - BLOCK_WIDTH - RIGHT_MARGIN;

    if required_space() < page.height * MAX_PAGE_SHARE {
        Placement {
            target: TargetPage::Last,
            x,
            y: page.y + BOTTOM_MARGIN,
        }
    } else {
        Placement {
            target: TargetPage::New,
            x,
            y: page.y + page.height - BLOCK_HEIGHT - NEW_PAGE_TOP_OFFSET,
        }
    }
}

// ============================================================================
// Signature Block
// ============================================================================

const BLOCK_FILL: Shade = Shade(0.98, 0.98, 0.99);
const BLOCK_BORDER: Shade = Shade(0.78, 0.8, 0.84);
const LABEL_COLOR: Shade = Shade(0.45, 0.45, 0.5);
const DIVIDER_COLOR: Shade = Shade(0.6, 0.62, 0.66);
const NAME_COLOR: Shade = Shade(0.1, 0.1, 0.12);
const DETAIL_COLOR: Shade = Shade(0.4, 0.4, 0.44);
const IP_COLOR: Shade = Shade(0.55, 0.55, 0.6);

/// The fully positioned signature block.
///
/// ```text
/// ┌──────────────────────────────┐
/// │ Signature                    │
/// │       [signature image]      │
/// │  ──────────────────────────  │
/// │  Jane Doe                    │
/// │  jane@example.com            │
/// │  Signed: Jan 1, 2024, ...    │
/// │  IP: 127.0.0.1               │
/// └──────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BlockLayout {
    pub frame: BoxShape,
    pub label: TextRun,
    pub image: ImageFrame,
    pub divider: Rule,
    pub details: Vec<TextRun>,
}

impl BlockLayout {
    /// Lays out the block with its lower-left corner at `(x, y)` for an image
    /// of `image_size` pixels.
    pub fn new(
        x: f32,
        y: f32,
        image_size: (u32, u32),
        info: &SignatureInfo,
        signed_at: &DateTime<Utc>,
    ) -> Self {
        let top = y + BLOCK_HEIGHT;
        let left = x + BLOCK_PADDING;

        let frame = BoxShape {
            x,
            y,
            width: BLOCK_WIDTH,
            height: BLOCK_HEIGHT,
            fill: BLOCK_FILL,
            border: Some((BLOCK_BORDER, 0.75)),
        };

        let label = TextRun::new(
            "Signature",
            left,
            top - BLOCK_PADDING - 9.0,
            8.0,
            Weight::Bold,
            LABEL_COLOR,
        );

        // Centered horizontally, hanging from just below the label
        let (width, height) = fit_image(
            image_size.0 as f32,
            image_size.1 as f32,
            SIG_MAX_WIDTH,
            SIG_MAX_HEIGHT,
        );
        let image = ImageFrame {
            x: x + (BLOCK_WIDTH - width) / 2.0,
            y: top - BLOCK_PADDING - 18.0 - height,
            width,
            height,
        };

        let line_y = image.y - 6.0;
        let divider = Rule {
            from: (left, line_y),
            to: (x + BLOCK_WIDTH - BLOCK_PADDING, line_y),
            thickness: 0.75,
            color: DIVIDER_COLOR,
        };

        // Each line advances by a fixed step whether or not it is drawn
        let mut details = Vec::with_capacity(4);
        let mut text_y = line_y - 14.0;

        details.push(TextRun::new(
            info.signer_name.as_str(),
            left,
            text_y,
            10.0,
            Weight::Bold,
            NAME_COLOR,
        ));
        text_y -= 13.0;

        details.push(TextRun::new(
            info.signer_email.as_str(),
            left,
            text_y,
            8.0,
            Weight::Regular,
            DETAIL_COLOR,
        ));
        text_y -= 12.0;

        details.push(TextRun::new(
            format!("Signed: {}", format_block_date(signed_at)),
            left,
            text_y,
            8.0,
            Weight::Regular,
            DETAIL_COLOR,
        ));
        text_y -= 11.0;

        if let Some(ip) = info.ip() {
            details.push(TextRun::new(
                format!("IP: {}", ip),
                left,
                text_y,
                7.0,
                Weight::Regular,
                IP_COLOR,
            ));
        }

        Self {
            frame,
            label,
            image,
            divider,
            details,
        }
    }

    /// Draws in back-to-front order: box, label, image, divider, details.
    pub fn draw(&self, canvas: &mut impl Canvas) {
        canvas.draw_box(&self.frame);
        canvas.draw_text(&self.label);
        canvas.draw_signature(&self.image, self.frame.fill);
        canvas.draw_rule(&self.divider);
        for line in &self.details {
            canvas.draw_text(line);
        }
    }
}

/// The two attribution lines at the bottom-left of the signed page.
pub fn footer_lines(
    page: &PageBox,
    product_name: &str,
    document_title: &str,
    signed_at: &DateTime<Utc>,
) -> [TextRun; 2] {
    let x = page.x + FOOTER_LEFT_MARGIN;
    [
        TextRun::new(
            format!("Electronically signed via {}", product_name),
            x,
            page.y + 22.0,
            8.0,
            Weight::Regular,
            Shade::gray(0.6),
        ),
        TextRun::new(
            format!(
                "Document: {}  |  Completed: {}",
                document_title,
                format_iso(signed_at)
            ),
            x,
            page.y + 11.0,
            7.0,
            Weight::Regular,
            Shade::gray(0.7),
        ),
    ]
}
