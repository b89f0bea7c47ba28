//! Locating a JSON object embedded in free-form log text.

/// Returns the first balanced `{...}` span in `line`, if any.
///
/// Scanning starts at the first `{`. Braces are counted only outside string
/// literals; a `"` preceded by an unescaped `\` does not end a string. If
/// the depth never returns to zero before the end of the line, the object is
/// truncated and `None` is returned. Text after the first closing brace,
/// including any further objects, is ignored.
pub fn extract_json(line: &str) -> Option<&str> {
    let start = line.find('{')?;
    let bytes = line.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    // Braces are ASCII, so `i` is a char boundary.
                    return Some(&line[start..=i]);
                }
            }
            _ => {}
        }
    }

    None
}
