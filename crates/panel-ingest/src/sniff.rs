//! Delimiter and text encoding detection from the start of a file.

use std::borrow::Cow;

use encoding_rs::{UTF_8, WINDOWS_1252};
use panel_model::TextEncoding;

/// UTF-8 byte order mark.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Delimiters considered by [`sniff_delimiter`], in tie-break order.
const DELIMITERS: [u8; 4] = [b';', b',', b'\t', b'|'];

/// Picks the delimiter that occurs most often in the first line, ignoring
/// quoted sections. Falls back to `,` when none occurs.
pub fn sniff_delimiter(sample: &[u8]) -> u8 {
    let sample = sample.strip_prefix(UTF8_BOM).unwrap_or(sample);
    let line_end = sample
        .iter()
        .position(|&b| b == b'\n')
        .unwrap_or(sample.len());
    let line = &sample[..line_end];

    let mut counts = [0usize; DELIMITERS.len()];
    let mut in_quotes = false;
    for &byte in line {
        if byte == b'"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(slot) = DELIMITERS.iter().position(|&d| d == byte) {
            counts[slot] += 1;
        }
    }

    let mut best = (b',', 0usize);
    for (slot, &count) in counts.iter().enumerate() {
        if count > best.1 {
            best = (DELIMITERS[slot], count);
        }
    }
    best.0
}

/// UTF-8 when the sample validates (a multi-byte sequence cut off at the
/// end of the sample is tolerated), windows-1252 otherwise.
///
/// Only the sample is examined. [`SurveyReader`](crate::SurveyReader) passes
/// the leading 256 KiB, so a windows-1252 file whose first accented byte comes
/// later is read as UTF-8 and those cells decode with U+FFFD. Files resolved by
/// place name should force the encoding through
/// [`ProcessingOptions::with_encoding`](panel_model::ProcessingOptions::with_encoding).
pub fn sniff_encoding(sample: &[u8]) -> TextEncoding {
    if sample.starts_with(UTF8_BOM) {
        return TextEncoding::Utf8;
    }
    let valid = encoding_rs::Encoding::utf8_valid_up_to(sample);
    if valid == sample.len() {
        return TextEncoding::Utf8;
    }
    let tail = &sample[valid..];
    if tail.len() < 4 && tail.first().is_some_and(|&b| b >= 0xC0) && is_truncated_utf8(tail) {
        TextEncoding::Utf8
    } else {
        TextEncoding::Latin1
    }
}

/// A lead byte followed only by continuation bytes, fewer than it announces.
fn is_truncated_utf8(tail: &[u8]) -> bool {
    let lead = tail[0];
    let expected = if lead >= 0xF0 {
        4
    } else if lead >= 0xE0 {
        3
    } else {
        2
    };
    tail.len() < expected && tail[1..].iter().all(|&b| (0x80..0xC0).contains(&b))
}

/// Decodes one cell. Invalid sequences become U+FFFD instead of failing.
pub fn decode(bytes: &[u8], encoding: TextEncoding) -> Cow<'_, str> {
    let codec = match encoding {
        TextEncoding::Utf8 => UTF_8,
        TextEncoding::Latin1 => WINDOWS_1252,
    };
    codec.decode_without_bom_handling(bytes).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semicolon_wins_over_decimal_commas() {
        let sample = b"ID_UF;MEDIA_LP;MEDIA_MT\n35;250,5;260,1\n";
        assert_eq!(sniff_delimiter(sample), b';');
    }

    #[test]
    fn quoted_delimiters_are_ignored() {
        let sample = b"\"A;B\",C,D\n";
        assert_eq!(sniff_delimiter(sample), b',');
    }

    #[test]
    fn defaults_to_comma() {
        assert_eq!(sniff_delimiter(b"SINGLE\n1\n"), b',');
        assert_eq!(sniff_delimiter(b"A\tB\tC\n"), b'\t');
    }

    #[test]
    fn latin1_bytes_are_detected() {
        // "SÃO" in windows-1252
        assert_eq!(sniff_encoding(b"S\xC3O PAULO;1\n"), TextEncoding::Latin1);
        assert_eq!(sniff_encoding("SÃO PAULO;1\n".as_bytes()), TextEncoding::Utf8);
        assert_eq!(sniff_encoding(b"\xEF\xBB\xBFA;B\n"), TextEncoding::Utf8);
    }

    #[test]
    fn truncated_trailing_sequence_is_still_utf8() {
        let mut sample = "SÃO".as_bytes().to_vec();
        sample.push(0xC3);
        assert_eq!(sniff_encoding(&sample), TextEncoding::Utf8);
    }

    #[test]
    fn decode_windows_1252() {
        assert_eq!(decode(b"GOI\xC1S", TextEncoding::Latin1), "GOIÁS");
        assert_eq!(decode("GOIÁS".as_bytes(), TextEncoding::Utf8), "GOIÁS");
    }
}
