//! Terminal display-width engine.
//!
//! One authoritative classification path: a static sorted table of inclusive
//! code-point ranges that occupy two terminal columns, consulted through
//! binary search. Printable ASCII short-circuits before the lookup; code
//! points outside the table's bounds are narrow by definition.
//!
//! Invariants:
//! - `WIDE_RANGES` is sorted, non-overlapping and never mutated at runtime
//!   (pinned by `table_sorted_and_disjoint`).
//! - No caller measures width any other way; truncation never splits a
//!   two-column character.

/// Inclusive code-point ranges rendered at two columns. East Asian Wide and
/// Fullwidth ranges plus the emoji presentation blocks.
static WIDE_RANGES: &[(u32, u32)] = &[
    (0x1100, 0x115F),   // Hangul Jamo leading consonants
    (0x2329, 0x232A),   // angle brackets
    (0x2E80, 0x303E),   // CJK radicals .. CJK symbols and punctuation
    (0x3041, 0x33FF),   // Hiragana .. CJK compatibility
    (0x3400, 0x4DBF),   // CJK extension A
    (0x4E00, 0x9FFF),   // CJK unified ideographs
    (0xA000, 0xA4CF),   // Yi syllables and radicals
    (0xA960, 0xA97F),   // Hangul Jamo extended-A
    (0xAC00, 0xD7A3),   // Hangul syllables
    (0xF900, 0xFAFF),   // CJK compatibility ideographs
    (0xFE10, 0xFE19),   // vertical forms
    (0xFE30, 0xFE6F),   // CJK compatibility forms, small form variants
    (0xFF00, 0xFF60),   // fullwidth forms
    (0xFFE0, 0xFFE6),   // fullwidth signs
    (0x16FE0, 0x16FE4), // ideographic symbols
    (0x17000, 0x187F7), // Tangut
    (0x18800, 0x18CD5), // Tangut components
    (0x1AFF0, 0x1B16F), // Katakana extensions, Kana supplement
    (0x1F004, 0x1F004), // mahjong red dragon
    (0x1F0CF, 0x1F0CF), // playing card joker
    (0x1F18E, 0x1F18E), // negative squared AB
    (0x1F191, 0x1F19A), // squared CL..VS
    (0x1F200, 0x1F320), // enclosed ideographs, emoji weather/plants
    (0x1F32D, 0x1F335), // food, moon, cactus
    (0x1F337, 0x1F37C), // plants and food
    (0x1F37E, 0x1F393), // bottle .. graduation cap
    (0x1F3A0, 0x1F3CA), // activities
    (0x1F3CF, 0x1F3D3), // sports
    (0x1F3E0, 0x1F3F0), // buildings
    (0x1F3F4, 0x1F3F4), // waving black flag
    (0x1F3F8, 0x1F43E), // sports equipment, animals
    (0x1F440, 0x1F440), // eyes
    (0x1F442, 0x1F4FC), // body parts, objects
    (0x1F4FF, 0x1F53D), // objects, arrows
    (0x1F54B, 0x1F54E), // religious buildings
    (0x1F550, 0x1F567), // clock faces
    (0x1F57A, 0x1F57A), // man dancing
    (0x1F595, 0x1F596), // hand gestures
    (0x1F5A4, 0x1F5A4), // black heart
    (0x1F5FB, 0x1F64F), // places, smileys, gestures
    (0x1F680, 0x1F6C5), // transport
    (0x1F6CC, 0x1F6CC), // sleeping accommodation
    (0x1F6D0, 0x1F6D2), // symbols
    (0x1F6D5, 0x1F6D7), // hindu temple, elevator
    (0x1F6DC, 0x1F6DF), // wireless, ring buoy
    (0x1F6EB, 0x1F6EC), // airplane departure/arrival
    (0x1F6F4, 0x1F6FC), // scooters, pickup truck
    (0x1F7E0, 0x1F7EB), // colored circles and squares
    (0x1F7F0, 0x1F7F0), // heavy equals sign
    (0x1F90C, 0x1F93A), // hands, people
    (0x1F93C, 0x1F945), // wrestling, goal net
    (0x1F947, 0x1F9FF), // medals, food, animals, objects
    (0x1FA70, 0x1FAFF), // symbols and pictographs extended-A
    (0x20000, 0x2FFFD), // CJK extension B..F
    (0x30000, 0x3FFFD), // CJK extension G
];

/// True when `c` occupies two terminal columns.
#[inline]
pub fn is_wide(c: char) -> bool {
    let cp = c as u32;
    // Printable ASCII dominates chat text; skip the table entirely.
    if (0x20..=0x7E).contains(&cp) {
        return false;
    }
    let (min, _) = WIDE_RANGES[0];
    let (_, max) = WIDE_RANGES[WIDE_RANGES.len() - 1];
    if cp < min || cp > max {
        return false;
    }
    let mut lo = 0usize;
    let mut hi = WIDE_RANGES.len();
    while lo < hi {
        let mid = (lo + hi) / 2;
        let (start, end) = WIDE_RANGES[mid];
        if cp < start {
            hi = mid;
        } else if cp > end {
            lo = mid + 1;
        } else {
            return true;
        }
    }
    false
}

/// Column width of a single character (1 or 2).
#[inline]
pub fn char_width(c: char) -> usize {
    if is_wide(c) { 2 } else { 1 }
}

/// Total display width of `text` in terminal columns.
pub fn display_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}

/// Longest prefix of `text` whose display width does not exceed `max_width`,
/// together with the width actually consumed. Stops before any character
/// that would overflow, so a two-column character is never split: when only
/// one column remains and the next character is wide, the walk ends there.
pub fn truncate_to_width(text: &str, max_width: usize) -> (&str, usize) {
    let mut width = 0usize;
    let mut end = 0usize;
    for (idx, c) in text.char_indices() {
        let w = char_width(c);
        if width + w > max_width {
            break;
        }
        width += w;
        end = idx + c.len_utf8();
    }
    (&text[..end], width)
}
