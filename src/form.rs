//! Text scanning helpers for form bodies and the credential record.
//!
//! All lookups are plain offset searches over the input; none of them consume
//! or mutate it, so any number of fields can be pulled out of the same text.

/// Decode `application/x-www-form-urlencoded` text.
///
/// `+` becomes a space and `%XX` becomes the byte `0xXX`. A `%` that is not
/// followed by two hex digits is kept as-is.
///
/// The decoded bytes are read back as UTF-8. Sequences that are not valid
/// UTF-8 (a lone `%FF`, say) turn into U+FFFD, since names and passphrases are
/// stored and shown as text.
pub fn url_decode(src: &str) -> String {
    let bytes = src.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());

    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 2;
                    }
                    _ => out.push(b'%'),
                }
            }
            c => out.push(c),
        }
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Value of the first `key=` in `body`, up to the next `&` or the end.
pub fn extract_field<'a>(body: &'a str, key: &str) -> Option<&'a str> {
    let start = find_field(body, key)? + key.len() + 1;
    let rest = &body[start..];
    let end = rest.find('&').unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Offset of the first `key=` in `body`.
pub fn find_field(body: &str, key: &str) -> Option<usize> {
    body.find(&format!("{}=", key))
}

/// The quoted string following `"key"` in a JSON-like text.
///
/// Finds `"key"`, the first `:` after it, then returns the text between the
/// next two `"` characters. Escapes are not interpreted.
pub fn extract_json_string_field<'a>(json: &'a str, key: &str) -> Option<&'a str> {
    let quoted_key = format!("\"{}\"", key);
    let key_at = json.find(&quoted_key)?;
    let after_key = key_at + quoted_key.len();

    let colon = after_key + json[after_key..].find(':')?;
    let open = colon + json[colon..].find('"')?;
    let close = open + 1 + json[open + 1..].find('"')?;

    Some(&json[open + 1..close])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_decode() {
        assert_eq!(url_decode("a+b%20c"), "a b c");
        assert_eq!(url_decode("My%2FNet%3a5G"), "My/Net:5G");
        assert_eq!(url_decode(""), "");
    }

    #[test]
    fn test_url_decode_malformed_escapes() {
        // trailing or truncated escapes pass through untouched
        assert_eq!(url_decode("100%"), "100%");
        assert_eq!(url_decode("50%4"), "50%4");
        assert_eq!(url_decode("%zz"), "%zz");
        assert_eq!(url_decode("%4g1"), "%4g1");
        // the escape right at the end is still decoded
        assert_eq!(url_decode("x%41"), "xA");
    }

    #[test]
    fn test_url_decode_utf8() {
        assert_eq!(url_decode("caf%C3%A9"), "café");
        assert_eq!(url_decode("Wi-Fi+%E5%AE%B6"), "Wi-Fi 家");
        // bytes that are not UTF-8 become replacement characters
        assert_eq!(url_decode("Net%FF"), "Net\u{FFFD}");
        assert_eq!(url_decode("%C3"), "\u{FFFD}");
    }

    #[test]
    fn test_extract_field() {
        assert_eq!(extract_field("ssid=Home&pass=secret", "pass"), Some("secret"));
        assert_eq!(extract_field("ssid=Home&pass=secret", "ssid"), Some("Home"));
        assert_eq!(extract_field("ssid=Home", "pass"), None);
        assert_eq!(extract_field("ssid=&pass=x", "ssid"), Some(""));
    }

    #[test]
    fn test_extract_field_independent_lookups() {
        let body = "pass=p%26w&ssid=Net+1&extra=1";
        assert_eq!(extract_field(body, "ssid"), Some("Net+1"));
        assert_eq!(extract_field(body, "pass"), Some("p%26w"));
        assert_eq!(extract_field(body, "extra"), Some("1"));
        // a key without `=` is not a field
        assert_eq!(extract_field("ssidpass", "ssid"), None);
    }

    #[test]
    fn test_extract_json_string_field() {
        let json = "{\"ssid\":\"Home\",\"pass\":\"x\"}";
        assert_eq!(extract_json_string_field(json, "ssid"), Some("Home"));
        assert_eq!(extract_json_string_field(json, "pass"), Some("x"));
        assert_eq!(extract_json_string_field("{\"ssid\":\"Home\"}", "pass"), None);
    }

    #[test]
    fn test_extract_json_string_field_missing_quotes() {
        assert_eq!(extract_json_string_field("{\"ssid\":Home}", "ssid"), None);
        assert_eq!(extract_json_string_field("{\"ssid\":\"Home", "ssid"), None);
        assert_eq!(extract_json_string_field("{\"ssid\" \"Home\"}", "ssid"), None);
        assert_eq!(
            extract_json_string_field("{ \"ssid\" : \"Spaced Out\" }", "ssid"),
            Some("Spaced Out")
        );
    }
}
