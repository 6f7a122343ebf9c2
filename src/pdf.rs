use std::collections::HashMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::cmap::ToUnicode;
use crate::error::Error;
use crate::fonts::{decode_utf16be, strip_subset_tag};
use crate::model::{PdfDocument, TextSpan};

const UNKNOWN_FONT: &str = "Unknown";

/// Upper bound on `/Parent` hops when looking for inherited resources.
const MAX_TREE_DEPTH: usize = 32;

/// `TJ` adjustments at least this wide (in thousandths of an em) read as a
/// word gap.
const TJ_SPACE_THRESHOLD: f64 = 250.0;

/// Single-byte encodings lopdf can decode by name.
const SIMPLE_ENCODINGS: [&str; 4] = [
    "WinAnsiEncoding",
    "MacRomanEncoding",
    "StandardEncoding",
    "MacExpertEncoding",
];

/// Used for simple fonts that name no encoding, and for text shown before
/// any font is selected.
const DEFAULT_ENCODING: &str = "WinAnsiEncoding";

struct FontInfo {
    name: String,
    two_byte: bool,
    encoding: &'static str,
    to_unicode: Option<ToUnicode>,
}

impl FontInfo {
    fn decode(&self, bytes: &[u8]) -> String {
        let by_encoding = |code: &[u8]| {
            if self.two_byte {
                decode_utf16be(code)
            } else {
                Document::decode_text(Some(self.encoding), code)
            }
        };
        match &self.to_unicode {
            Some(cmap) => cmap.decode(bytes, by_encoding),
            None => by_encoding(bytes),
        }
    }
}

/// Affine matrix `[a b c d e f]` in PDF's row-vector convention.
#[derive(Clone, Copy)]
struct Matrix([f64; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        if operands.len() != 6 {
            return None;
        }
        let mut m = [0.0; 6];
        for (slot, obj) in m.iter_mut().zip(operands) {
            *slot = number(obj)?;
        }
        Some(Matrix(m))
    }

    fn then(&self, other: &Matrix) -> Matrix {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a1 * a2 + b1 * c2,
            a1 * b2 + b1 * d2,
            c1 * a2 + d1 * c2,
            c1 * b2 + d1 * d2,
            e1 * a2 + f1 * c2 + e2,
            e1 * b2 + f1 * d2 + f2,
        ])
    }

    /// Same scale and baseline as `other`, further to the right.
    fn continues_line(&self, other: &Matrix) -> bool {
        self.0[..4] == other.0[..4]
            && (self.0[5] - other.0[5]).abs() < 0.01
            && self.0[4] > other.0[4]
    }

    fn vertical_scale(&self) -> f64 {
        let [_, _, c, d, _, _] = self.0;
        (c * c + d * d).sqrt()
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

/// `/Resources` of a page, inherited from the page tree when absent.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve_dict(doc, resources);
        }
        node = resolve_dict(doc, node.get(b"Parent").ok()?)?;
    }
    None
}

/// `/Encoding` of a simple font: a base encoding name, directly or as the
/// `/BaseEncoding` of a differences dictionary.
fn simple_encoding(doc: &Document, font: &Dictionary) -> &'static str {
    let name = match font.get(b"Encoding").ok().and_then(|o| resolve(doc, o)) {
        Some(Object::Name(name)) => Some(name.as_slice()),
        Some(Object::Dictionary(dict)) => match dict.get(b"BaseEncoding") {
            Ok(Object::Name(name)) => Some(name.as_slice()),
            _ => None,
        },
        _ => None,
    };
    name.and_then(|n| SIMPLE_ENCODINGS.iter().find(|e| e.as_bytes() == n))
        .copied()
        .unwrap_or(DEFAULT_ENCODING)
}

fn to_unicode(doc: &Document, font: &Dictionary, code_len: usize) -> Option<ToUnicode> {
    let Some(Object::Stream(stream)) = font.get(b"ToUnicode").ok().and_then(|o| resolve(doc, o))
    else {
        return None;
    };
    let data = if stream.dict.get(b"Filter").is_ok() {
        match stream.decompressed_content() {
            Ok(data) => data,
            Err(e) => {
                log::debug!("unreadable ToUnicode stream: {e}");
                return None;
            }
        }
    } else {
        stream.content.clone()
    };
    Some(ToUnicode::parse(&data, code_len))
}

fn page_fonts(doc: &Document, page_id: ObjectId) -> HashMap<Vec<u8>, FontInfo> {
    let mut fonts = HashMap::new();
    let Some(font_dict) = page_resources(doc, page_id)
        .and_then(|r| r.get(b"Font").ok())
        .and_then(|f| resolve_dict(doc, f))
    else {
        return fonts;
    };

    for (key, obj) in font_dict.iter() {
        let Some(font) = resolve_dict(doc, obj) else {
            continue;
        };
        let base_font = match font.get(b"BaseFont").ok().and_then(|o| resolve(doc, o)) {
            Some(Object::Name(name)) => String::from_utf8_lossy(name).into_owned(),
            _ => UNKNOWN_FONT.to_string(),
        };
        let two_byte = matches!(font.get(b"Subtype"), Ok(Object::Name(n)) if n.as_slice() == b"Type0");
        fonts.insert(
            key.clone(),
            FontInfo {
                name: strip_subset_tag(&base_font).to_string(),
                two_byte,
                encoding: simple_encoding(doc, font),
                to_unicode: to_unicode(doc, font, if two_byte { 2 } else { 1 }),
            },
        );
    }
    fonts
}

/// Groups consecutive glyph runs that share a font and size into spans.
struct SpanBuilder<'a> {
    page_number: usize,
    spans: &'a mut Vec<TextSpan>,
    current: Option<TextSpan>,
    /// A move along the baseline happened since the last shown text.
    gap: bool,
}

impl SpanBuilder<'_> {
    fn push(&mut self, font_name: &str, font_size: f64, text: &str) {
        let gap = std::mem::take(&mut self.gap);
        if let Some(span) = &mut self.current {
            if span.font_name == font_name && (span.font_size - font_size).abs() < 1e-6 {
                if gap
                    && !span.text.ends_with(char::is_whitespace)
                    && !text.starts_with(char::is_whitespace)
                {
                    span.text.push(' ');
                }
                span.text.push_str(text);
                return;
            }
        }
        self.flush();
        self.current = Some(TextSpan {
            page_number: self.page_number,
            text: text.to_string(),
            font_name: font_name.to_string(),
            font_size,
        });
    }

    fn flush(&mut self) {
        self.gap = false;
        if let Some(span) = self.current.take()
            && !span.text.trim().is_empty()
        {
            self.spans.push(span);
        }
    }
}

struct TextState<'f> {
    font: Option<&'f FontInfo>,
    font_size: f64,
    text_matrix: Matrix,
    ctm: Matrix,
}

impl TextState<'_> {
    fn font_name(&self) -> &str {
        self.font.map_or(UNKNOWN_FONT, |f| f.name.as_str())
    }

    fn effective_size(&self) -> f64 {
        self.font_size.abs() * self.text_matrix.then(&self.ctm).vertical_scale()
    }

    fn decode(&self, bytes: &[u8]) -> String {
        match self.font {
            Some(font) => font.decode(bytes),
            None => Document::decode_text(Some(DEFAULT_ENCODING), bytes),
        }
    }
}

fn shown_text(state: &TextState, operand: Option<&Object>) -> String {
    match operand {
        Some(Object::String(bytes, _)) => state.decode(bytes),
        Some(Object::Array(items)) => {
            let mut text = String::new();
            for item in items {
                match item {
                    Object::String(bytes, _) => text.push_str(&state.decode(bytes)),
                    other => {
                        if number(other).is_some_and(|adj| -adj >= TJ_SPACE_THRESHOLD)
                            && !text.ends_with(' ')
                        {
                            text.push(' ');
                        }
                    }
                }
            }
            text
        }
        _ => String::new(),
    }
}

fn extract_page_spans(
    content: &Content,
    fonts: &HashMap<Vec<u8>, FontInfo>,
    page_number: usize,
    spans: &mut Vec<TextSpan>,
) {
    let mut builder = SpanBuilder {
        page_number,
        spans,
        current: None,
        gap: false,
    };
    let mut state = TextState {
        font: None,
        font_size: 0.0,
        text_matrix: Matrix::IDENTITY,
        ctm: Matrix::IDENTITY,
    };
    let mut saved_ctm: Vec<Matrix> = Vec::new();

    for op in &content.operations {
        let operands = op.operands.as_slice();
        let shown = match op.operator.as_str() {
            "q" => {
                saved_ctm.push(state.ctm);
                None
            }
            "Q" => {
                state.ctm = saved_ctm.pop().unwrap_or(Matrix::IDENTITY);
                None
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    state.ctm = m.then(&state.ctm);
                }
                None
            }
            "BT" => {
                state.text_matrix = Matrix::IDENTITY;
                None
            }
            "ET" | "T*" => {
                builder.flush();
                None
            }
            "Tf" => {
                state.font = match operands.first() {
                    Some(Object::Name(name)) => fonts.get(name),
                    _ => None,
                };
                if state.font.is_none() {
                    log::debug!("page {page_number}: text in unresolved font resource");
                }
                state.font_size = operands.get(1).and_then(number).unwrap_or(0.0);
                None
            }
            "Tm" => {
                match Matrix::from_operands(operands) {
                    Some(m) => {
                        if m.continues_line(&state.text_matrix) {
                            builder.gap = true;
                        } else {
                            builder.flush();
                        }
                        state.text_matrix = m;
                    }
                    None => builder.flush(),
                }
                None
            }
            "Td" | "TD" => {
                let tx = operands.first().and_then(number).unwrap_or(0.0);
                let ty = operands.get(1).and_then(number).unwrap_or(0.0);
                if ty != 0.0 {
                    builder.flush();
                } else if tx > 0.0 {
                    builder.gap = true;
                }
                state.text_matrix = Matrix([1.0, 0.0, 0.0, 1.0, tx, ty]).then(&state.text_matrix);
                None
            }
            "Tj" | "TJ" => Some(shown_text(&state, operands.first())),
            "'" => {
                builder.flush();
                Some(shown_text(&state, operands.first()))
            }
            "\"" => {
                builder.flush();
                Some(shown_text(&state, operands.get(2)))
            }
            _ => None,
        };

        if let Some(text) = shown
            && !text.is_empty()
        {
            builder.push(state.font_name(), state.effective_size(), &text);
        }
    }
    builder.flush();
}

pub fn parse(bytes: &[u8]) -> Result<PdfDocument, Error> {
    if bytes.is_empty() {
        return Err(Error::EmptyFile);
    }
    let doc = Document::load_mem(bytes)?;
    if doc.is_encrypted() {
        log::warn!("PDF is encrypted; text extraction may be incomplete");
    }

    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(Error::InvalidPdf("PDF has no pages".into()));
    }

    let mut spans = Vec::new();
    for (page_number, page_id) in &pages {
        let page_number = *page_number as usize;
        let data = match doc.get_page_content(*page_id) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("page {page_number}: unreadable content stream: {e}");
                continue;
            }
        };
        let content = match Content::decode(&data) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("page {page_number}: undecodable content stream: {e}");
                continue;
            }
        };
        let fonts = page_fonts(&doc, *page_id);
        extract_page_spans(&content, &fonts, page_number, &mut spans);
    }

    log::debug!("parsed PDF: {} pages, {} text spans", pages.len(), spans.len());

    Ok(PdfDocument {
        page_count: pages.len(),
        spans,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Operation;

    fn simple_font(encoding: &'static str) -> HashMap<Vec<u8>, FontInfo> {
        HashMap::from([(
            b"F1".to_vec(),
            FontInfo {
                name: "Times-Roman".into(),
                two_byte: false,
                encoding,
                to_unicode: None,
            },
        )])
    }

    fn spans_of(operations: Vec<Operation>, fonts: &HashMap<Vec<u8>, FontInfo>) -> Vec<TextSpan> {
        let mut spans = Vec::new();
        extract_page_spans(&Content { operations }, fonts, 1, &mut spans);
        spans
    }

    fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    fn ints(values: &[i64]) -> Vec<Object> {
        values.iter().map(|v| Object::Integer(*v)).collect()
    }

    #[test]
    fn moves_along_the_baseline_separate_words() {
        let fonts = simple_font(DEFAULT_ENCODING);
        let spans = spans_of(
            vec![
                op("BT", vec![]),
                op("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                op("Td", ints(&[72, 700])),
                op("Tj", vec![Object::string_literal("Hello")]),
                op("Td", ints(&[40, 0])),
                op("Tj", vec![Object::string_literal("World")]),
                op("Tm", ints(&[1, 0, 0, 1, 200, 700])),
                op("Tm", ints(&[1, 0, 0, 1, 72, 700])),
                op("Tj", vec![Object::string_literal("again")]),
                op("Tm", ints(&[1, 0, 0, 1, 120, 700])),
                op("Tj", vec![Object::string_literal("here")]),
                op("ET", vec![]),
            ],
            &fonts,
        );
        let texts: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, ["Hello World", "again here"]);
    }

    #[test]
    fn simple_fonts_decode_with_their_declared_encoding() {
        let fonts = simple_font("MacRomanEncoding");
        let spans = spans_of(
            vec![
                op("BT", vec![]),
                op("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                op("Tj", vec![Object::string_literal(b"caf\x8E".to_vec())]),
                op("ET", vec![]),
            ],
            &fonts,
        );
        assert_eq!(spans[0].text, "caf\u{e9}");
    }

    #[test]
    fn encoding_name_comes_from_the_font_dictionary() {
        let doc = Document::with_version("1.7");
        let named = Dictionary::from_iter(vec![("Encoding", Object::Name(b"MacRomanEncoding".to_vec()))]);
        assert_eq!(simple_encoding(&doc, &named), "MacRomanEncoding");

        let differences = Dictionary::from_iter(vec![(
            "Encoding",
            Object::Dictionary(Dictionary::from_iter(vec![(
                "BaseEncoding",
                Object::Name(b"StandardEncoding".to_vec()),
            )])),
        )]);
        assert_eq!(simple_encoding(&doc, &differences), "StandardEncoding");
        assert_eq!(simple_encoding(&doc, &Dictionary::new()), DEFAULT_ENCODING);
    }

    #[test]
    fn scaled_text_matrix_scales_font_size() {
        let state = TextState {
            font: None,
            font_size: 1.0,
            text_matrix: Matrix([12.0, 0.0, 0.0, 12.0, 72.0, 700.0]),
            ctm: Matrix::IDENTITY,
        };
        assert!((state.effective_size() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn ctm_scale_combines_with_text_matrix() {
        let state = TextState {
            font: None,
            font_size: 6.0,
            text_matrix: Matrix::IDENTITY,
            ctm: Matrix([2.0, 0.0, 0.0, 2.0, 0.0, 0.0]),
        };
        assert!((state.effective_size() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn tj_gaps_become_spaces() {
        let state = TextState {
            font: None,
            font_size: 12.0,
            text_matrix: Matrix::IDENTITY,
            ctm: Matrix::IDENTITY,
        };
        let array = Object::Array(vec![
            Object::string_literal("Hello"),
            Object::Integer(-300),
            Object::string_literal("world"),
            Object::Integer(-20),
            Object::string_literal("!"),
        ]);
        assert_eq!(shown_text(&state, Some(&array)), "Hello world!");
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(parse(&[]), Err(Error::EmptyFile)));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = parse(b"%PDF-1.7 truncated").err().unwrap();
        assert!(err.is_parse_error());
    }
}
