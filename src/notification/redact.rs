//! Secret redaction for diagnostic copies of inbound payloads
//!
//! A body that parses as JSON is masked on the decoded tree, so escaped key
//! spellings and composite values are caught. Anything else falls back to a
//! lexical scan of the raw text.

use serde_json::Value;
use std::borrow::Cow;

/// Replacement written over the shared secret value.
pub const SECRET_MASK: &str = "****";

/// Wire name of the shared secret field. TP-Link spells it this way.
pub const SECRET_FIELD: &str = "shardSecret";

/// Return a copy of `body` safe to log: every `shardSecret` value is masked.
///
/// Invalid UTF-8 is replaced lossily.
pub fn redact_payload(body: &[u8]) -> String {
    if let Ok(mut value) = serde_json::from_slice::<Value>(body) {
        if redact_value(&mut value) {
            return value.to_string();
        }
    }
    let text = String::from_utf8_lossy(body);
    redact_str(&text).into_owned()
}

/// Mask every `shardSecret` member in a decoded JSON tree.
///
/// Returns true when anything was masked.
pub fn redact_value(value: &mut Value) -> bool {
    match value {
        Value::Object(map) => {
            let mut masked = false;
            for (key, member) in map.iter_mut() {
                if key == SECRET_FIELD {
                    *member = Value::String(SECRET_MASK.to_string());
                    masked = true;
                } else {
                    masked |= redact_value(member);
                }
            }
            masked
        }
        Value::Array(items) => items
            .iter_mut()
            .fold(false, |masked, item| redact_value(item) | masked),
        _ => false,
    }
}

/// Mask `shardSecret` values in text that may not be valid JSON.
///
/// Keys are unescaped before comparing. A secret value runs to the end of
/// its string, to its matching bracket, or to the next delimiter, and
/// otherwise to end of input. Borrows when nothing matched.
pub fn redact_str(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    let mut out = String::new();
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'"' {
            i += 1;
            continue;
        }
        let key_end = string_end(bytes, i);
        let colon = skip_whitespace(bytes, key_end);
        if colon >= bytes.len() || bytes[colon] != b':' {
            i = key_end;
            continue;
        }
        let value_start = skip_whitespace(bytes, colon + 1);
        if !is_secret_key(&text[i..key_end]) {
            i = value_start;
            continue;
        }
        let value_end = value_end(bytes, value_start);
        out.push_str(&text[copied..i]);
        out.push_str(&format!(r#""{}":"{}""#, SECRET_FIELD, SECRET_MASK));
        copied = value_end;
        i = value_end;
    }

    if copied == 0 && out.is_empty() {
        return Cow::Borrowed(text);
    }
    out.push_str(&text[copied..]);
    Cow::Owned(out)
}

fn is_secret_key(quoted: &str) -> bool {
    match serde_json::from_str::<String>(quoted) {
        Ok(key) => key == SECRET_FIELD,
        Err(_) => quoted.trim_matches('"') == SECRET_FIELD,
    }
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Index just past the string opening at `start`, or end of input
fn string_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Index just past the value starting at `start`, or end of input
fn value_end(bytes: &[u8], start: usize) -> usize {
    match bytes.get(start) {
        None => start,
        Some(b'"') => string_end(bytes, start),
        Some(b'[') | Some(b'{') => {
            let mut depth = 0usize;
            let mut i = start;
            while i < bytes.len() {
                match bytes[i] {
                    b'"' => {
                        i = string_end(bytes, i);
                        continue;
                    }
                    b'[' | b'{' => depth += 1,
                    b']' | b'}' => {
                        depth -= 1;
                        if depth == 0 {
                            return i + 1;
                        }
                    }
                    _ => {}
                }
                i += 1;
            }
            bytes.len()
        }
        Some(_) => {
            let mut i = start;
            while i < bytes.len()
                && !matches!(bytes[i], b',' | b'}' | b']')
                && !bytes[i].is_ascii_whitespace()
            {
                i += 1;
            }
            i
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_compact() {
        let body = br#"{"description":"x","shardSecret":"fef97b18-e440-45bc","timestamp":1}"#;
        let redacted = redact_payload(body);
        assert_eq!(redacted, r#"{"description":"x","shardSecret":"****","timestamp":1}"#);
    }

    #[test]
    fn test_redact_with_whitespace() {
        let body = br#"{"description": "test","shardSecret" :  "secret123"}"#;
        let redacted = redact_payload(body);
        assert!(!redacted.contains("secret123"));
        assert!(redacted.contains(r#""shardSecret":"****""#));
    }

    #[test]
    fn test_redact_escaped_quote_in_value() {
        let body = br#"{"shardSecret":"abc\"def","Site":"s"}"#;
        let redacted = redact_payload(body);
        assert!(!redacted.contains("def"));
        assert!(redacted.contains(r#""Site":"s""#));
    }

    #[test]
    fn test_redact_escaped_key() {
        let redacted = redact_payload(br#"{"shard\u0053ecret":"hunter2","Site":"s"}"#);
        assert!(!redacted.contains("hunter2"));

        // same spelling in a body that doesn't parse
        let redacted = redact_payload(br#"{"Site":"s","shard\u0053ecret":"hunter2","#);
        assert!(!redacted.contains("hunter2"));
        assert!(redacted.contains(r#""Site":"s""#));
    }

    #[test]
    fn test_redact_composite_values() {
        for body in [
            &br#"{"shardSecret": ["a", "hunter2"], "Site": "s"}"#[..],
            &br#"{"shardSecret": {"k": "hunter2", "n": [1, 2]}, "Site": "s"}"#[..],
            &br#"{"shardSecret": ["a", "hunter2"], "Site": }"#[..],
            &br#"{"shardSecret": {"k": "hunter2", "n": [1"#[..],
        ] {
            let redacted = redact_payload(body);
            assert!(!redacted.contains("hunter2"), "{}", redacted);
        }
    }

    #[test]
    fn test_redact_malformed_payloads() {
        // unterminated string at end of input
        let redacted = redact_payload(br#"{"Site":"a","shardSecret":"hunter2"#);
        assert!(!redacted.contains("hunter2"));

        // non-string value
        let redacted = redact_payload(br#"{"shardSecret": 123456, "x": json}"#);
        assert!(!redacted.contains("123456"));
        assert!(redacted.contains(r#""x": json"#));

        // key with nothing after it
        let redacted = redact_payload(br#"{"shardSecret":"#);
        assert_eq!(redacted, r#"{"shardSecret":"****""#);
    }

    #[test]
    fn test_redact_every_occurrence() {
        let body = br#"[{"shardSecret":"one"},{"nested":{"shardSecret":"two"}}]"#;
        let redacted = redact_payload(body);
        assert!(!redacted.contains("one"));
        assert!(!redacted.contains("two"));
    }

    #[test]
    fn test_redact_invalid_utf8() {
        let mut body = br#"{"shardSecret":"s3cr3t","Site":""#.to_vec();
        body.extend_from_slice(&[0xff, 0xfe]);
        body.extend_from_slice(br#""}"#);
        let redacted = redact_payload(&body);
        assert!(!redacted.contains("s3cr3t"));
    }

    #[test]
    fn test_secret_named_value_is_not_a_key() {
        let text = r#"{"Site":"shardSecret","x":1}"#;
        assert!(matches!(redact_str(text), Cow::Borrowed(_)));
    }

    #[test]
    fn test_redact_untouched_without_secret() {
        let text = r#"{"Site":"Home"}"#;
        assert!(matches!(redact_str(text), Cow::Borrowed(_)));
        assert_eq!(redact_payload(text.as_bytes()), text);
    }
}
