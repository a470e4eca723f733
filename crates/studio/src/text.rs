//! Text measurement and word wrapping.
//!
//! Widths use the Helvetica AFM metrics (the PDF base-14 font the report is
//! set in), so label wrapping in the exploded view and line breaking on the
//! instructions page agree on where a line ends.

/// Advance widths of ASCII 32..=126 in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// WinAnsi code points 0x80..=0x9F that differ from Latin-1: character,
/// byte, Helvetica width.
const WIN_ANSI_EXTRAS: [(char, u8, u16); 27] = [
    ('\u{20ac}', 0x80, 556),  // €
    ('\u{201a}', 0x82, 222),  // ‚
    ('\u{0192}', 0x83, 556),  // ƒ
    ('\u{201e}', 0x84, 333),  // „
    ('\u{2026}', 0x85, 1000), // …
    ('\u{2020}', 0x86, 556),  // †
    ('\u{2021}', 0x87, 556),  // ‡
    ('\u{02c6}', 0x88, 333),  // ˆ
    ('\u{2030}', 0x89, 1000), // ‰
    ('\u{0160}', 0x8a, 667),  // Š
    ('\u{2039}', 0x8b, 333),  // ‹
    ('\u{0152}', 0x8c, 1000), // Œ
    ('\u{017d}', 0x8e, 611),  // Ž
    ('\u{2018}', 0x91, 222),  // ‘
    ('\u{2019}', 0x92, 222),  // ’
    ('\u{201c}', 0x93, 333),  // “
    ('\u{201d}', 0x94, 333),  // ”
    ('\u{2022}', 0x95, 350),  // •
    ('\u{2013}', 0x96, 556),  // en dash
    ('\u{2014}', 0x97, 1000), // em dash
    ('\u{02dc}', 0x98, 333),  // ˜
    ('\u{2122}', 0x99, 1000), // ™
    ('\u{0161}', 0x9a, 500),  // š
    ('\u{203a}', 0x9b, 333),  // ›
    ('\u{0153}', 0x9c, 944),  // œ
    ('\u{017e}', 0x9e, 500),  // ž
    ('\u{0178}', 0x9f, 667),  // Ÿ
];

/// Width used for other characters outside printable ASCII.
const FALLBACK_WIDTH: u16 = 556;

/// WinAnsi byte for `c`, `None` when the font has no glyph for it.
pub fn win_ansi_byte(c: char) -> Option<u8> {
    let code = u32::from(c);
    if code < 0x80 || (0xa0..=0xff).contains(&code) {
        return u8::try_from(code).ok();
    }
    WIN_ANSI_EXTRAS
        .iter()
        .find(|(extra, _, _)| *extra == c)
        .map(|(_, byte, _)| *byte)
}

fn char_width(c: char) -> u16 {
    let code = c as u32;
    if (32..=126).contains(&code) {
        return HELVETICA_WIDTHS[(code - 32) as usize];
    }
    WIN_ANSI_EXTRAS
        .iter()
        .find(|(extra, _, _)| *extra == c)
        .map_or(FALLBACK_WIDTH, |(_, _, width)| *width)
}

/// Width of `text` set at `font_size`, in the same unit as `font_size`.
pub fn text_width(text: &str, font_size: f64) -> f64 {
    let units: u32 = text.chars().map(|c| u32::from(char_width(c))).sum();
    f64::from(units) / 1000.0 * font_size
}

/// Greedy word wrap to `max_width`.
///
/// Explicit newlines start a new line. A single word wider than the line is
/// broken between characters. Always returns at least one line.
pub fn wrap(text: &str, max_width: f64, font_size: f64) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        wrap_paragraph(paragraph, max_width, font_size, &mut lines);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn wrap_paragraph(paragraph: &str, max_width: f64, font_size: f64, lines: &mut Vec<String>) {
    let mut current = String::new();
    let mut any_word = false;

    for word in paragraph.split_whitespace() {
        any_word = true;
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if text_width(&candidate, font_size) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if text_width(word, font_size) <= max_width {
            current = word.to_string();
        } else {
            let mut pieces = break_word(word, max_width, font_size);
            current = pieces.pop().unwrap_or_default();
            lines.extend(pieces);
        }
    }

    if !current.is_empty() || !any_word {
        lines.push(current);
    }
}

fn break_word(word: &str, max_width: f64, font_size: f64) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    for c in word.chars() {
        piece.push(c);
        if piece.chars().count() > 1 && text_width(&piece, font_size) > max_width {
            piece.pop();
            pieces.push(std::mem::take(&mut piece));
            piece.push(c);
        }
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}
