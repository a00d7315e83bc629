//! Per-page text span extraction.
//!
//! Walks a page's content stream with a simplified PDF text-rendering state
//! machine and produces flat [`TextSpan`]s carrying exactly what heading
//! detection needs: text, effective font size, boldness, and position.

use crate::backend::{
    decode_text_simple, get_number_from_value, BackendFontInfo, ContentOp, PageId, PdfBackend,
    PdfValue,
};
use crate::PdfError;

/// A single run of text at a specific position on the page.
#[derive(Debug, Clone)]
pub struct TextSpan {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub is_bold: bool,
}

/// Two spans whose Y coordinates differ by less than this are treated as
/// belonging to the same line.
pub const Y_TOLERANCE: f32 = 1.0;

/// The identity 2x3 text matrix: [a, b, c, d, tx, ty].
const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Mutable state tracked while walking a page's content stream.
#[derive(Debug, Clone)]
struct TextState {
    font_key: Vec<u8>,
    font_size: f32,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    leading: f32,
    is_bold: bool,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            leading: 0.0,
            is_bold: false,
        }
    }
}

impl TextState {
    fn x(&self) -> f32 {
        self.text_matrix[4]
    }

    fn y(&self) -> f32 {
        self.text_matrix[5]
    }

    /// Effective font size accounting for the text matrix vertical scale.
    fn effective_font_size(&self) -> f32 {
        let scale = (self.text_matrix[1].powi(2) + self.text_matrix[3].powi(2)).sqrt();
        (self.font_size * scale).abs()
    }

    /// Multiply the text line matrix by a translation (used by Td / TD / T*).
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let new_tx = self.line_matrix[0] * tx + self.line_matrix[2] * ty + self.line_matrix[4];
        let new_ty = self.line_matrix[1] * tx + self.line_matrix[3] * ty + self.line_matrix[5];
        self.line_matrix[4] = new_tx;
        self.line_matrix[5] = new_ty;
        self.text_matrix = self.line_matrix;
    }

    /// Apply the `Tf` operator: set font and size, detect bold from the
    /// base-font name.
    fn set_font(&mut self, key: Vec<u8>, base_font: &str, size: f32) {
        self.font_key = key;
        self.font_size = size;
        self.is_bold = base_font.to_uppercase().contains("BOLD");
    }
}

fn resolve_font<'a>(key: &[u8], fonts: &'a [BackendFontInfo]) -> Option<&'a BackendFontInfo> {
    fonts.iter().find(|info| info.name == key)
}

fn decode_string(val: &PdfValue) -> String {
    match val {
        PdfValue::Str(bytes) => decode_text_simple(bytes),
        _ => String::new(),
    }
}

/// Walk a single page's content stream and produce a flat list of
/// [`TextSpan`]s.
///
/// Handles the text-positioning and text-showing operators (`BT`, `ET`,
/// `Tf`, `Tm`, `Td`, `TD`, `T*`, `TL`, `Tj`, `TJ`, `'`, `"`); everything
/// else is ignored.
pub fn extract_page_spans(
    backend: &dyn PdfBackend,
    page_id: PageId,
) -> Result<Vec<TextSpan>, PdfError> {
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;
    let fonts = backend.page_fonts(page_id).unwrap_or_default();

    Ok(spans_from_ops(&ops, &fonts))
}

/// Pure state-machine walk over already-decoded content operations.
pub fn spans_from_ops(ops: &[ContentOp], fonts: &[BackendFontInfo]) -> Vec<TextSpan> {
    let mut state = TextState::default();
    let mut spans: Vec<TextSpan> = Vec::new();

    for op in ops {
        match op.operator.as_str() {
            "BT" => {
                state.text_matrix = IDENTITY_MATRIX;
                state.line_matrix = IDENTITY_MATRIX;
            }
            "ET" => {
                // Font state is kept across text objects; some PDFs reuse
                // the font set earlier.
            }

            "Tf" => {
                if op.operands.len() >= 2 {
                    let key = match &op.operands[0] {
                        PdfValue::Name(n) => n.clone(),
                        PdfValue::Str(s) => s.clone(),
                        _ => continue,
                    };
                    let size = get_number_from_value(&op.operands[1]).unwrap_or(0.0);
                    let base = resolve_font(&key, fonts)
                        .and_then(|info| info.base_font.clone())
                        .unwrap_or_else(|| String::from_utf8_lossy(&key).into_owned());
                    state.set_font(key, &base, size);
                }
            }

            "Tm" => {
                let vals: Vec<f32> = op
                    .operands
                    .iter()
                    .take(6)
                    .filter_map(get_number_from_value)
                    .collect();
                if vals.len() == 6 {
                    state.text_matrix = [vals[0], vals[1], vals[2], vals[3], vals[4], vals[5]];
                    state.line_matrix = state.text_matrix;
                }
            }
            "Td" => {
                if op.operands.len() >= 2 {
                    let tx = get_number_from_value(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number_from_value(&op.operands[1]).unwrap_or(0.0);
                    state.translate_line(tx, ty);
                }
            }
            "TD" => {
                // TD is equivalent to: -ty TL ; tx ty Td
                if op.operands.len() >= 2 {
                    let tx = get_number_from_value(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number_from_value(&op.operands[1]).unwrap_or(0.0);
                    state.leading = -ty;
                    state.translate_line(tx, ty);
                }
            }
            "T*" => {
                state.translate_line(0.0, -state.leading);
            }
            "TL" => {
                if let Some(v) = op.operands.first().and_then(get_number_from_value) {
                    state.leading = v;
                }
            }

            "Tj" => {
                if let Some(first) = op.operands.first() {
                    emit_span(decode_string(first), &state, &mut spans);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(arr)) = op.operands.first() {
                    let text = join_tj_array(arr, state.font_size);
                    emit_span(text, &state, &mut spans);
                }
            }
            "'" => {
                state.translate_line(0.0, -state.leading);
                if let Some(first) = op.operands.first() {
                    emit_span(decode_string(first), &state, &mut spans);
                }
            }
            "\"" => {
                // " aw ac string  =>  set spacing, move to next line, show.
                if op.operands.len() >= 3 {
                    state.translate_line(0.0, -state.leading);
                    emit_span(decode_string(&op.operands[2]), &state, &mut spans);
                }
            }

            _ => { /* Ignore non-text operators */ }
        }
    }

    spans
}

fn emit_span(text: String, state: &TextState, spans: &mut Vec<TextSpan>) {
    if text.trim().is_empty() {
        return;
    }
    spans.push(TextSpan {
        text,
        x: state.x(),
        y: state.y(),
        font_size: state.effective_font_size(),
        is_bold: state.is_bold,
    });
}

/// Join a `TJ` array into one string, turning large negative kerning
/// adjustments (thousandths of text space) into word gaps.
fn join_tj_array(arr: &[PdfValue], font_size: f32) -> String {
    let mut buf = String::new();

    for elem in arr {
        match elem {
            PdfValue::Str(_) => buf.push_str(&decode_string(elem)),
            val => {
                if let Some(adj) = get_number_from_value(val) {
                    let dx = -adj / 1000.0 * font_size;
                    let gap_threshold = font_size * 0.15;
                    if dx > gap_threshold && !buf.is_empty() && !buf.ends_with(' ') {
                        buf.push(' ');
                    }
                }
            }
        }
    }

    buf
}

/// Extract text spans from every page of the document.
///
/// Returns `(page_number, spans)` pairs, 1-based, in page order.
pub fn extract_all_pages(
    backend: &dyn PdfBackend,
) -> Result<Vec<(u32, Vec<TextSpan>)>, PdfError> {
    let page_map = backend.pages();
    let mut result: Vec<(u32, Vec<TextSpan>)> = Vec::with_capacity(page_map.len());

    for (&page_num, &page_id) in &page_map {
        let spans = extract_page_spans(backend, page_id)?;
        result.push((page_num, spans));
    }

    Ok(result)
}

/// Assemble one page's spans into plain reading-order text.
///
/// Spans are sorted top-to-bottom, left-to-right; spans sharing a line (Y
/// within [`Y_TOLERANCE`]) are joined with single spaces, lines with
/// newlines.
pub fn page_text(spans: &[TextSpan]) -> String {
    if spans.is_empty() {
        return String::new();
    }

    let mut sorted: Vec<&TextSpan> = spans.iter().collect();
    sorted.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_y = sorted[0].y;

    for span in sorted {
        if (span.y - current_y).abs() <= Y_TOLERANCE {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(span.text.trim_end());
        } else {
            lines.push(std::mem::take(&mut current));
            current_y = span.y;
            current.push_str(span.text.trim_end());
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines.join("\n")
}
