/// Make an arbitrary argument value safe to embed in a cache file name.
///
/// ASCII alphanumerics, `-` and `.` pass through; every other byte becomes `%XX`.
/// The escape is injective, so `_` stays free for joining segments.
pub fn escape_key_segment(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());

    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.') {
            escaped.push(byte as char);
        } else {
            escaped.push_str(&format!("%{:02X}", byte));
        }
    }

    if escaped.is_empty() {
        escaped.push_str("%00");
    }

    escaped
}
