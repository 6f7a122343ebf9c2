//! Font name comparison and the byte/char mappings for PDF font strings.

/// Word font names are accepted when either name contains the other,
/// ignoring case, so "Times New Roman PSMT" satisfies "Times New Roman".
pub(crate) fn docx_font_matches(observed: &str, expected: &str) -> bool {
    let observed = observed.to_lowercase();
    let expected = expected.to_lowercase();
    observed == expected || observed.contains(&expected) || expected.contains(&observed)
}

/// PDF font names only match when the configured name appears inside the
/// reported one.
pub(crate) fn pdf_font_matches(observed: &str, expected: &str) -> bool {
    observed.to_lowercase().contains(&expected.to_lowercase())
}

/// Drop the `ABCDEF+` tag that marks an embedded font subset.
pub(crate) fn strip_subset_tag(base_font: &str) -> &str {
    match base_font.split_once('+') {
        Some((tag, rest))
            if tag.len() == 6 && tag.bytes().all(|b| b.is_ascii_uppercase()) && !rest.is_empty() =>
        {
            rest
        }
        _ => base_font,
    }
}

/// Unicode to Windows-1252 (WinAnsi) byte; unmappable chars become `?`.
fn char_to_winansi(c: char) -> u8 {
    match c {
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u8,
        _ => b'?',
    }
}

pub(crate) fn encode_winansi(text: &str) -> Vec<u8> {
    text.chars().map(char_to_winansi).collect()
}

/// Two-byte strings of composite fonts without a `/ToUnicode` map. Only
/// meaningful for UCS-2 encodings; glyph IDs decode to noise.
pub(crate) fn decode_utf16be(bytes: &[u8]) -> String {
    let units = bytes
        .chunks(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]));
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
