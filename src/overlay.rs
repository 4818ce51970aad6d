//! Raw content-stream writer for drawing onto pages of an existing PDF.

use crate::layout::{BoxShape, Canvas, ImageFrame, Rule, Shade, TextRun, Weight};

/// Resource names the overlay refers to; they must be registered on the
/// page the stream is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayResources {
    pub regular_font: String,
    pub bold_font: String,
    pub signature: String,
}

/// Accumulates PDF content operators.
pub struct OverlayCanvas {
    resources: OverlayResources,
    content: Vec<u8>,
}

impl OverlayCanvas {
    pub fn new(resources: OverlayResources) -> Self {
        Self {
            resources,
            content: Vec::new(),
        }
    }

    /// Starts the stream with a `Q`, closing a `q` that was prepended to
    /// the page's original content. The leading newline keeps the `Q` from
    /// fusing with a final token of the original stream.
    pub fn after_saved_state(resources: OverlayResources) -> Self {
        let mut canvas = Self::new(resources);
        canvas.content.extend_from_slice(b"\nQ\n");
        canvas
    }

    pub fn finish(self) -> Vec<u8> {
        self.content
    }

    fn font_for(&self, weight: Weight) -> &str {
        match weight {
            Weight::Regular => &self.resources.regular_font,
            Weight::Bold => &self.resources.bold_font,
        }
    }
}

impl Canvas for OverlayCanvas {
    fn draw_box(&mut self, shape: &BoxShape) {
        let rect = format!(
            "{} {} {} {} re",
            num(shape.x),
            num(shape.y),
            num(shape.width),
            num(shape.height)
        );
        let ops = match shape.border {
            Some((border, width)) => format!(
                "q\n{} rg\n{} RG\n{} w\n{}\nB\nQ\n",
                color(shape.fill),
                color(border),
                num(width),
                rect
            ),
            None => format!("q\n{} rg\n{}\nf\nQ\n", color(shape.fill), rect),
        };
        self.content.extend_from_slice(ops.as_bytes());
    }

    fn draw_rule(&mut self, rule: &Rule) {
        let ops = format!(
            "q\n{} RG\n{} w\n{} {} m\n{} {} l\nS\nQ\n",
            color(rule.color),
            num(rule.thickness),
            num(rule.from.0),
            num(rule.from.1),
            num(rule.to.0),
            num(rule.to.1)
        );
        self.content.extend_from_slice(ops.as_bytes());
    }

    fn draw_text(&mut self, run: &TextRun) {
        let header = format!(
            "q\n{} rg\nBT\n/{} {} Tf\n{} {} Td\n",
            color(run.color),
            self.font_for(run.weight),
            num(run.size),
            num(run.x),
            num(run.y)
        );
        self.content.extend_from_slice(header.as_bytes());
        write_literal(&mut self.content, &run.text);
        self.content.extend_from_slice(b" Tj\nET\nQ\n");
    }

    fn draw_signature(&mut self, frame: &ImageFrame, _backdrop: Shade) {
        // Soft mask carries transparency, so the backdrop is not needed
        let ops = format!(
            "q\n{} 0 0 {} {} {} cm\n/{} Do\nQ\n",
            num(frame.width),
            num(frame.height),
            num(frame.x),
            num(frame.y),
            self.resources.signature
        );
        self.content.extend_from_slice(ops.as_bytes());
    }
}

/// Formats a coordinate without exponent notation or trailing zeros.
fn num(value: f32) -> String {
    let fixed = format!("{:.3}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

fn color(shade: Shade) -> String {
    format!("{} {} {}", num(shade.0), num(shade.1), num(shade.2))
}

/// Writes `text` as a WinAnsi literal string, escaping delimiters.
/// Characters outside Latin-1 become `?`.
fn write_literal(out: &mut Vec<u8>, text: &str) {
    out.push(b'(');
    for ch in text.chars() {
        let byte = match ch as u32 {
            0x20..=0x7e | 0xa0..=0xff => ch as u32 as u8,
            0x09 | 0x0a | 0x0d => b' ',
            _ => b'?',
        };
        if matches!(byte, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(byte);
    }
    out.push(b')');
}
