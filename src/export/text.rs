//! Text measurement for the builtin Helvetica faces.
//!
//! Widths are the standard Type 1 advance widths in 1/1000 em for printable
//! ASCII. Other characters are measured as a digit.

const MM_PER_PT: f32 = 0.352_778;
const FALLBACK_ADVANCE: u16 = 556;
const ELLIPSIS: &str = "...";

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

fn advance(c: char, bold: bool) -> u16 {
    let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
    match c as u32 {
        cp @ 32..=126 => table[(cp - 32) as usize],
        _ => FALLBACK_ADVANCE,
    }
}

/// Rendered width of `text` in millimetres.
pub fn text_width(text: &str, size_pt: f32, bold: bool) -> f32 {
    let units: u32 = text.chars().map(|c| advance(c, bold) as u32).sum();
    units as f32 / 1000.0 * size_pt * MM_PER_PT
}

/// Greedy word wrap. Words wider than `max_width` are split between
/// characters. Always returns at least one line.
pub fn wrap(text: &str, size_pt: f32, bold: bool, max_width: f32) -> Vec<String> {
    let fits = |s: &str| text_width(s, size_pt, bold) <= max_width;
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if fits(&candidate) {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if fits(word) {
            current = word.to_string();
            continue;
        }
        for c in word.chars() {
            current.push(c);
            if !fits(&current) && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(c);
            }
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Largest size between `min_pt` and `max_pt`, in half-point steps, at which
/// `text` fits on one line. Returns `min_pt` when nothing fits.
pub fn fit_size(text: &str, max_pt: f32, min_pt: f32, bold: bool, max_width: f32) -> f32 {
    let mut size = max_pt;
    while size > min_pt && text_width(text, size, bold) > max_width {
        size -= 0.5;
    }
    size.max(min_pt)
}

/// Cuts `text` and appends an ellipsis so that it fits `max_width`.
pub fn ellipsize(text: &str, size_pt: f32, bold: bool, max_width: f32) -> String {
    if text_width(text, size_pt, bold) <= max_width {
        return text.to_string();
    }
    let mut chars: Vec<char> = text.trim_end().chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate = format!("{}{}", chars.iter().collect::<String>().trim_end(), ELLIPSIS);
        if text_width(&candidate, size_pt, bold) <= max_width {
            return candidate;
        }
    }
    ELLIPSIS.to_string()
}
