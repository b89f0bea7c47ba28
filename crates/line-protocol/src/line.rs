//! Newline splitting with carry-over across reads.

/// Splits a byte stream into `\n`-terminated lines.
///
/// Reads from a pipe end wherever the OS decides, so a line may arrive in
/// several pieces. Bytes after the last newline are kept and prepended to
/// the next chunk; they are never emitted on their own.
#[derive(Debug, Default)]
pub struct LineExtractor {
    remainder: Vec<u8>,
}

impl LineExtractor {
    /// Creates an extractor with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every line it completes, in arrival order.
    ///
    /// Returned lines exclude the `\n`. Consecutive newlines produce empty
    /// lines; callers skip them. An empty chunk is a no-op.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut lines = Vec::new();
        if chunk.is_empty() {
            return lines;
        }

        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let mut line = std::mem::take(&mut self.remainder);
            line.extend_from_slice(&rest[..pos]);
            lines.push(line);
            rest = &rest[pos + 1..];
        }
        self.remainder.extend_from_slice(rest);

        lines
    }

    /// Bytes received after the last newline.
    pub fn pending(&self) -> &[u8] {
        &self.remainder
    }

    /// Takes the buffered partial line, leaving the extractor empty.
    ///
    /// For consumers that cannot afford to hold an unbounded line, such as
    /// a stream that is only logged.
    pub fn take_pending(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.remainder)
    }

    /// Drops any buffered partial line, returning how many bytes were lost.
    pub fn clear(&mut self) -> usize {
        let n = self.remainder.len();
        self.remainder.clear();
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(chunks: &[&[u8]]) -> Vec<Vec<u8>> {
        let mut ex = LineExtractor::new();
        chunks.iter().flat_map(|c| ex.feed(c)).collect()
    }

    #[test]
    fn single_complete_line() {
        let mut ex = LineExtractor::new();
        assert_eq!(ex.feed(b"hello\n"), vec![b"hello".to_vec()]);
        assert!(ex.pending().is_empty());
    }

    #[test]
    fn partial_line_is_held() {
        let mut ex = LineExtractor::new();
        assert!(ex.feed(br#"{"Cont"#).is_empty());
        assert_eq!(ex.pending(), br#"{"Cont"#);

        let lines = ex.feed(b"ent\":\"hi\"}\n");
        assert_eq!(lines, vec![br#"{"Content":"hi"}"#.to_vec()]);
        assert!(ex.pending().is_empty());
    }

    #[test]
    fn multiple_lines_and_trailing_fragment() {
        let mut ex = LineExtractor::new();
        let lines = ex.feed(b"a\nb\nc");
        assert_eq!(lines, vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(ex.pending(), b"c");
    }

    #[test]
    fn consecutive_newlines_yield_empty_lines() {
        let lines = feed_all(&[b"a\n\n\nb\n"]);
        assert_eq!(
            lines,
            vec![b"a".to_vec(), Vec::new(), Vec::new(), b"b".to_vec()]
        );
    }

    #[test]
    fn empty_chunk_is_noop() {
        let mut ex = LineExtractor::new();
        ex.feed(b"part");
        assert!(ex.feed(b"").is_empty());
        assert_eq!(ex.pending(), b"part");
    }

    #[test]
    fn chunk_of_only_newline_flushes_remainder() {
        let mut ex = LineExtractor::new();
        ex.feed(b"tail");
        assert_eq!(ex.feed(b"\n"), vec![b"tail".to_vec()]);
    }

    #[test]
    fn split_point_does_not_change_output() {
        let input: &[u8] = b"INFO one\n{\"Content\":\"x\"}\n\nlast line\nunterminated";
        let whole = feed_all(&[input]);

        for split in 0..=input.len() {
            let (a, b) = input.split_at(split);
            assert_eq!(feed_all(&[a, b]), whole, "split at {split}");
        }
    }

    #[test]
    fn byte_at_a_time() {
        let input: &[u8] = b"x\nyy\nzzz\n";
        let chunks: Vec<&[u8]> = input.chunks(1).collect();
        assert_eq!(
            feed_all(&chunks),
            vec![b"x".to_vec(), b"yy".to_vec(), b"zzz".to_vec()]
        );
    }

    #[test]
    fn carriage_return_is_kept() {
        let mut ex = LineExtractor::new();
        assert_eq!(ex.feed(b"crlf\r\n"), vec![b"crlf\r".to_vec()]);
    }

    #[test]
    fn non_utf8_passes_through() {
        let mut ex = LineExtractor::new();
        let lines = ex.feed(&[0xff, 0x00, b'\n']);
        assert_eq!(lines, vec![vec![0xff, 0x00]]);
    }

    #[test]
    fn take_pending_empties_buffer() {
        let mut ex = LineExtractor::new();
        ex.feed(b"a
progress 40%");
        assert_eq!(ex.take_pending(), b"progress 40%".to_vec());
        assert!(ex.pending().is_empty());
        assert_eq!(ex.feed(b" done\n"), vec![b" done".to_vec()]);
    }

    #[test]
    fn clear_drops_partial() {
        let mut ex = LineExtractor::new();
        ex.feed(b"abc");
        assert_eq!(ex.clear(), 3);
        assert!(ex.pending().is_empty());
        assert_eq!(ex.feed(b"d\n"), vec![b"d".to_vec()]);
    }
}
