//! Response body decoding
//!
//! Product pages arrive in whatever encoding the shop uses. Detection order:
//! byte order mark, `charset=` in the Content-Type header, a `charset=` declaration
//! inside a `<meta>` tag within the first 1024 bytes, then UTF-8 with lossy fallback.

use encoding_rs::{Encoding, UTF_8};

const META_SCAN_LIMIT: usize = 1024;

/// Decode a page body to a UTF-8 string. Never fails; undecodable bytes become U+FFFD.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| content_type.and_then(charset_from_content_type))
        .or_else(|| charset_from_meta(bytes))
        .unwrap_or(UTF_8);

    // `decode` strips a matching BOM and substitutes malformed sequences
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!("Body decoded as {} with replacement characters", encoding.name());
    }
    text.into_owned()
}

/// `text/html; charset=ISO-8859-1` -> windows-1252
fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    let lower = content_type.to_ascii_lowercase();
    let (_, after) = lower.split_once("charset=")?;
    label_to_encoding(after)
}

/// Look for `charset=` inside a `<meta ...>` tag near the top of the document
fn charset_from_meta(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(META_SCAN_LIMIT)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();

    let mut search_from = 0;
    while let Some(offset) = head[search_from..].find("charset=") {
        let position = search_from + offset;
        let tag_start = head[..position].rfind('<');
        let tag_closed = tag_start.is_some_and(|start| head[start..position].contains('>'));
        if let (Some(start), false) = (tag_start, tag_closed) {
            if head[start..position].starts_with("<meta") {
                return label_to_encoding(&head[position + "charset=".len()..]);
            }
        }
        search_from = position + "charset=".len();
    }
    None
}

fn label_to_encoding(raw: &str) -> Option<&'static Encoding> {
    let label = raw
        .trim_start_matches(['"', '\''])
        .split(['"', '\'', ';', ',', '>', ' ', '/'])
        .next()?
        .trim();
    if label.is_empty() {
        return None;
    }
    Encoding::for_label(label.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_charset_wins() {
        let body = b"<meta charset=\"utf-8\"><p>caf\xe9</p>";
        let text = decode_body(body, Some("text/html; charset=ISO-8859-1"));
        assert!(text.ends_with("café</p>"));
    }

    #[test]
    fn meta_charset_is_used_without_header() {
        let body = b"<html><head><meta charset='iso-8859-1'></head><body>caf\xe9</body></html>";
        assert!(decode_body(body, Some("text/html")).contains("café"));
    }

    #[test]
    fn http_equiv_meta_is_recognised() {
        let body = b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=windows-1252\">\x93hi\x94";
        assert!(decode_body(body, None).ends_with("\u{201c}hi\u{201d}"));
    }

    #[test]
    fn charset_outside_meta_is_ignored() {
        let body = "<p>charset=iso-8859-1</p>日本".as_bytes();
        assert_eq!(decode_body(body, None), "<p>charset=iso-8859-1</p>日本");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        assert_eq!(decode_body(b"a\xffb", None), "a\u{FFFD}b");
    }

    #[test]
    fn bom_overrides_header() {
        let body = b"\xEF\xBB\xBFcaf\xC3\xA9";
        assert_eq!(decode_body(body, Some("text/html; charset=iso-8859-1")), "café");
    }
}
