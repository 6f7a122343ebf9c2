//! `/ToUnicode` CMaps: the code-to-text table a font carries so that shown
//! strings (often glyph IDs under `Identity-H`) can be read back as text.

use std::collections::HashMap;

/// `bfrange` entries wider than this are clipped.
const MAX_RANGE_LEN: u32 = 0xFFFF;

enum Token<'a> {
    Hex(Vec<u8>),
    Word(&'a str),
    ArrayStart,
    ArrayEnd,
}

fn parse_hex(digits: &str) -> Vec<u8> {
    let nibbles: Vec<u8> = digits
        .chars()
        .filter_map(|c| c.to_digit(16))
        .map(|d| d as u8)
        .collect();
    nibbles
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect()
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let bytes = text.as_bytes();
    let is_delimiter = |b: u8| b.is_ascii_whitespace() || b"<>[]()/%{}".contains(&b);
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b if b.is_ascii_whitespace() => i += 1,
            b'%' => {
                while i < bytes.len() && bytes[i] != b'\n' && bytes[i] != b'\r' {
                    i += 1;
                }
            }
            b'<' if bytes.get(i + 1) == Some(&b'<') => i += 2,
            b'>' if bytes.get(i + 1) == Some(&b'>') => i += 2,
            b'<' => {
                let end = text[i..].find('>').map_or(bytes.len(), |n| i + n);
                tokens.push(Token::Hex(parse_hex(&text[i + 1..end])));
                i = end + 1;
            }
            b'[' => {
                tokens.push(Token::ArrayStart);
                i += 1;
            }
            b']' => {
                tokens.push(Token::ArrayEnd);
                i += 1;
            }
            b'(' => {
                // Literal strings only appear in the CIDSystemInfo header.
                let mut depth = 0usize;
                while i < bytes.len() {
                    match bytes[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                i += 1;
            }
            _ => {
                let start = i;
                i += 1;
                while i < bytes.len() && !is_delimiter(bytes[i]) {
                    i += 1;
                }
                tokens.push(Token::Word(&text[start..i]));
            }
        }
    }
    tokens
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().take(4).fold(0, |acc, b| (acc << 8) | u32::from(*b))
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]))
        .collect()
}

pub(crate) struct ToUnicode {
    code_len: usize,
    map: HashMap<u32, String>,
}

impl ToUnicode {
    /// Parse a CMap program. `default_code_len` (bytes per code) applies when
    /// the CMap declares no codespace range.
    pub(crate) fn parse(data: &[u8], default_code_len: usize) -> ToUnicode {
        let text = String::from_utf8_lossy(data);
        let tokens = tokenize(&text);
        let mut cmap = ToUnicode {
            code_len: default_code_len.max(1),
            map: HashMap::new(),
        };
        let mut codespace_seen = false;

        let mut i = 0;
        while i < tokens.len() {
            match &tokens[i] {
                Token::Word("begincodespacerange") => {
                    if let Some(Token::Hex(low)) = tokens.get(i + 1)
                        && !codespace_seen
                        && !low.is_empty()
                    {
                        cmap.code_len = low.len();
                        codespace_seen = true;
                    }
                    i += 1;
                }
                Token::Word("beginbfchar") => {
                    i += 1;
                    while let (Some(Token::Hex(src)), Some(Token::Hex(dst))) =
                        (tokens.get(i), tokens.get(i + 1))
                    {
                        cmap.map
                            .insert(code_of(src), String::from_utf16_lossy(&utf16_units(dst)));
                        i += 2;
                    }
                }
                Token::Word("beginbfrange") => {
                    i += 1;
                    while let (Some(Token::Hex(low)), Some(Token::Hex(high))) =
                        (tokens.get(i), tokens.get(i + 1))
                    {
                        let (low, high) = (code_of(low), code_of(high));
                        let len = high.saturating_sub(low).min(MAX_RANGE_LEN);
                        i += 2;
                        match tokens.get(i) {
                            Some(Token::Hex(dst)) => {
                                let base = utf16_units(dst);
                                for offset in 0..=len {
                                    let mut units = base.clone();
                                    if let Some(last) = units.last_mut() {
                                        *last = last.wrapping_add(offset as u16);
                                    }
                                    cmap.map
                                        .insert(low + offset, String::from_utf16_lossy(&units));
                                }
                                i += 1;
                            }
                            Some(Token::ArrayStart) => {
                                i += 1;
                                let mut offset = 0;
                                while let Some(Token::Hex(dst)) = tokens.get(i) {
                                    if offset <= len {
                                        cmap.map.insert(
                                            low + offset,
                                            String::from_utf16_lossy(&utf16_units(dst)),
                                        );
                                    }
                                    offset += 1;
                                    i += 1;
                                }
                                if matches!(tokens.get(i), Some(Token::ArrayEnd)) {
                                    i += 1;
                                }
                            }
                            _ => break,
                        }
                    }
                }
                _ => i += 1,
            }
        }

        log::debug!(
            "ToUnicode CMap: {} mapping(s), {}-byte codes",
            cmap.map.len(),
            cmap.code_len
        );
        cmap
    }

    /// Map each code in `bytes`; codes the CMap does not cover go through
    /// `fallback`.
    pub(crate) fn decode(&self, bytes: &[u8], fallback: impl Fn(&[u8]) -> String) -> String {
        let mut text = String::new();
        for code in bytes.chunks(self.code_len) {
            match self.map.get(&code_of(code)) {
                Some(mapped) => text.push_str(mapped),
                None => text.push_str(&fallback(code)),
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CMAP: &str = "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /Adobe-Identity-UCS def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0003> <0048>
<0004> <0069>
endbfchar
2 beginbfrange
<0010> <0012> <0061>
<0020> <0021> [<00660069> <00660066>]
endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end";

    fn no_fallback(_: &[u8]) -> String {
        "?".to_string()
    }

    #[test]
    fn bfchar_and_bfrange_map_codes() {
        let cmap = ToUnicode::parse(CMAP.as_bytes(), 1);
        assert_eq!(cmap.code_len, 2);
        assert_eq!(cmap.decode(&[0x00, 0x03, 0x00, 0x04], no_fallback), "Hi");
        assert_eq!(cmap.decode(&[0x00, 0x10, 0x00, 0x12], no_fallback), "ac");
        assert_eq!(cmap.decode(&[0x00, 0x20, 0x00, 0x21], no_fallback), "fiff");
    }

    #[test]
    fn unmapped_codes_use_fallback() {
        let cmap = ToUnicode::parse(CMAP.as_bytes(), 1);
        assert_eq!(cmap.decode(&[0x00, 0x03, 0x01, 0x00], no_fallback), "H?");
    }

    #[test]
    fn missing_codespace_keeps_default_width() {
        let cmap = ToUnicode::parse(b"1 beginbfchar <41> <0058> endbfchar", 1);
        assert_eq!(cmap.decode(b"AB", |c| String::from_utf8_lossy(c).into_owned()), "XB");
    }
}
