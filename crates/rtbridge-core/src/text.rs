//! UTF-16 index helpers.
//!
//! Remote text primitives address content in UTF-16 code units. These helpers
//! translate between that addressing and Rust's UTF-8 byte offsets.

/// Length of `text` in UTF-16 code units.
#[must_use]
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Convert a UTF-16 index into a byte offset within `text`.
///
/// Returns `None` if the index lies past the end of the text or falls in the
/// middle of a surrogate pair.
#[must_use]
pub fn byte_offset(text: &str, index: usize) -> Option<usize> {
    let mut units = 0;
    for (offset, ch) in text.char_indices() {
        if units == index {
            return Some(offset);
        }
        if units > index {
            return None;
        }
        units += ch.len_utf16();
    }
    (units == index).then_some(text.len())
}

/// Borrow the UTF-16 range `[start, end)` of `text`.
///
/// Returns `None` for reversed or out-of-bounds ranges and for ranges that
/// split a surrogate pair.
#[must_use]
pub fn utf16_slice(text: &str, start: usize, end: usize) -> Option<&str> {
    if start > end {
        return None;
    }
    let from = byte_offset(text, start)?;
    let to = byte_offset(text, end)?;
    Some(&text[from..to])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_offsets_match_bytes() {
        assert_eq!(utf16_len("hello"), 5);
        assert_eq!(byte_offset("hello", 0), Some(0));
        assert_eq!(byte_offset("hello", 5), Some(5));
        assert_eq!(byte_offset("hello", 6), None);
    }

    #[test]
    fn astral_characters_take_two_units() {
        let text = "a😀b";
        assert_eq!(utf16_len(text), 4);
        assert_eq!(byte_offset(text, 1), Some(1));
        // Index 2 sits between the two halves of the surrogate pair.
        assert_eq!(byte_offset(text, 2), None);
        assert_eq!(byte_offset(text, 3), Some(5));
        assert_eq!(utf16_slice(text, 1, 3), Some("😀"));
    }

    #[test]
    fn slice_rejects_bad_ranges() {
        assert_eq!(utf16_slice("hello world", 2, 5), Some("llo"));
        assert_eq!(utf16_slice("hello", 3, 2), None);
        assert_eq!(utf16_slice("hello", 2, 9), None);
        assert_eq!(utf16_slice("héllo", 1, 2), Some("é"));
    }
}
