//! Agent output line protocol.
//!
//! The TeamRadar agent writes free-form log text to stdout, one record per
//! `\n`-terminated line. Some lines carry a JSON object somewhere in the
//! middle of the text; when that object has a string `"Content"` field, the
//! line is a user-facing notification.
//!
//! Extraction is three stages, each usable on its own:
//! - [`LineExtractor`] — splits arbitrarily chunked bytes into complete lines
//! - [`extract_json`] — locates the first balanced `{...}` span in a line
//! - [`decode`] — parses that span and pulls out the `"Content"` string
//!
//! [`parse_line`] chains the last two. Every failure degrades to `None`:
//! log lines are untrusted text and never abort the stream.

mod fragment;
mod line;
mod notification;

pub use fragment::extract_json;
pub use line::LineExtractor;
pub use notification::{DecodeError, Notification, decode, try_decode};

/// Extracts a notification from one raw line of agent output.
///
/// Lines that are not valid UTF-8, carry no embedded JSON object, or whose
/// object lacks a string `"Content"` field yield `None`.
pub fn parse_line(line: &[u8]) -> Option<Notification> {
    let text = std::str::from_utf8(line).ok()?;
    extract_json(text).and_then(decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_line_with_embedded_object() {
        let line = br#"INFO 2016-01-01 msg {"Content":"Room A joined"} trailing text"#;
        let n = parse_line(line).unwrap();
        assert_eq!(n.content, "Room A joined");
    }

    #[test]
    fn parse_line_plain_text() {
        assert!(parse_line(b"INFO connected to server").is_none());
        assert!(parse_line(b"").is_none());
    }

    #[test]
    fn parse_line_invalid_utf8() {
        let mut line = br#"{"Content":"x"} "#.to_vec();
        line.extend_from_slice(&[0xff, 0xfe]);
        assert!(parse_line(&line).is_none());
    }

    #[test]
    fn parse_line_object_without_content() {
        assert!(parse_line(br#"DEBUG {"Type":"ping"}"#).is_none());
    }
}
