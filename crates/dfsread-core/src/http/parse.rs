//! Response status-line and header-line parsing.

/// Parse the numeric status from an `HTTP/1.1 307 Temporary Redirect` line.
pub(crate) fn parse_status_line(line: &str) -> Option<u32> {
    let mut parts = line.split_whitespace();
    let proto = parts.next()?;
    if !proto.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

/// Case-insensitive lookup of a header value in collected `Name: value` lines.
pub(crate) fn header_value<'a>(lines: &'a [String], name: &str) -> Option<&'a str> {
    for line in lines {
        if let Some((field, value)) = line.split_once(':') {
            if field.trim().eq_ignore_ascii_case(name) {
                return Some(value.trim());
            }
        }
    }
    None
}

pub(crate) fn content_length(lines: &[String]) -> Option<u64> {
    header_value(lines, "content-length")?.parse().ok()
}
