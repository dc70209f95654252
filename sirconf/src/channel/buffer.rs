//! Pattern buffer with tail-window prompt search.
//!
//! Prompts are only looked for in the last `search_depth` bytes of the
//! accumulated output, so long command outputs do not make every read
//! rescan everything received so far. Error markers are scanned
//! incrementally instead: each chunk is checked once.

use std::fmt;
use std::ops::Range;

use vte::{Parser, Perform};

use super::patterns::PromptMatcher;

/// How far back an incremental scan reaches into already-scanned bytes,
/// so markers split across two chunks are still found.
const SCAN_OVERLAP: usize = 64;

/// Collects printable output, dropping terminal escape sequences.
struct Printable<'a> {
    out: &'a mut Vec<u8>,
}

impl Perform for Printable<'_> {
    fn print(&mut self, c: char) {
        let mut encoded = [0u8; 4];
        self.out
            .extend_from_slice(c.encode_utf8(&mut encoded).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.out.push(byte);
        }
    }
}

/// Buffer for accumulating output and searching it for patterns.
pub struct PatternBuffer {
    /// Cleaned output received since the last reset.
    buffer: Vec<u8>,

    /// How many bytes from the end to search for prompts.
    search_depth: usize,

    /// Escape-sequence parser; keeps state across chunks.
    parser: Parser,

    /// Bytes already checked by [`PatternBuffer::find_unscanned`].
    scanned: usize,
}

impl PatternBuffer {
    /// Create a new pattern buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
            parser: Parser::new(),
            scanned: 0,
        }
    }

    /// Append raw device output, stripping ANSI escape sequences.
    pub fn extend(&mut self, data: &[u8]) {
        let mut printable = Printable {
            out: &mut self.buffer,
        };
        self.parser.advance(&mut printable, data);
    }

    /// Find a pattern in the tail window.
    ///
    /// The returned range is relative to the whole buffer.
    pub fn find_in_tail<P: PromptMatcher + ?Sized>(&self, pattern: &P) -> Option<Range<usize>> {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        pattern
            .find_match(&self.buffer[start..])
            .map(|range| range.start + start..range.end + start)
    }

    /// Find a pattern in output that has not been scanned yet.
    ///
    /// Marks everything currently buffered as scanned.
    pub fn find_unscanned<P: PromptMatcher + ?Sized>(
        &mut self,
        pattern: &P,
    ) -> Option<Range<usize>> {
        let start = self.scanned.saturating_sub(SCAN_OVERLAP);
        self.scanned = self.buffer.len();
        pattern
            .find_match(&self.buffer[start..])
            .map(|range| range.start + start..range.end + start)
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        self.scanned = 0;
        std::mem::take(&mut self.buffer)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Bytes after the last newline, i.e. whatever the device is showing
    /// on its current line.
    pub fn last_line(&self) -> &[u8] {
        match memchr::memrchr(b'\n', &self.buffer) {
            Some(pos) => &self.buffer[pos + 1..],
            None => &self.buffer,
        }
    }

    /// Get the buffer contents as a string (lossy UTF-8 conversion).
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }

    pub fn search_depth(&self) -> usize {
        self.search_depth
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl fmt::Debug for PatternBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternBuffer")
            .field("len", &self.buffer.len())
            .field("search_depth", &self.search_depth)
            .field("scanned", &self.scanned)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::bytes::Regex;

    #[test]
    fn test_basic_extend() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"Hello, world!\r\n");
        assert_eq!(buffer.as_slice(), b"Hello, world!\r\n");
    }

    #[test]
    fn test_ansi_stripping() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"\x1b[32mGreen text\x1b[0m");
        assert_eq!(buffer.as_slice(), b"Green text");
    }

    #[test]
    fn test_escape_split_across_chunks() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"abc\x1b[3");
        buffer.extend(b"2mdef");
        assert_eq!(buffer.as_slice(), b"abcdef");
    }

    #[test]
    fn test_tail_search_offsets_are_absolute() {
        let mut buffer = PatternBuffer::new(20);
        buffer.extend(&[b'x'; 100]);
        buffer.extend(b"\nrouter# ");

        let pattern = Regex::new(r"router# $").unwrap();
        assert_eq!(buffer.find_in_tail(&pattern), Some(101..109));
    }

    #[test]
    fn test_tail_search_not_in_tail() {
        let mut buffer = PatternBuffer::new(10);
        buffer.extend(b"router# ");
        buffer.extend(&[b'x'; 100]);

        let pattern = Regex::new(r"router#").unwrap();
        assert!(buffer.find_in_tail(&pattern).is_none());
    }

    #[test]
    fn test_unscanned_search_sees_each_chunk() {
        let marker = Regex::new(r"<ERROR> ").unwrap();
        let mut buffer = PatternBuffer::new(10);

        buffer.extend(b"line one\n");
        assert!(buffer.find_unscanned(&marker).is_none());

        // Split across two reads, and far outside the tail window.
        buffer.extend(b"<ERR");
        assert!(buffer.find_unscanned(&marker).is_none());
        buffer.extend(b"OR> invalid parameter\n");
        buffer.extend(&[b'x'; 50]);
        assert_eq!(buffer.find_unscanned(&marker), Some(9..17));
    }

    #[test]
    fn test_last_line() {
        let mut buffer = PatternBuffer::new(1000);
        assert_eq!(buffer.last_line(), b"");
        buffer.extend(b"show log\r\nline one\r\nMore? ");
        assert_eq!(buffer.last_line(), b"More? ");
        buffer.extend(b"\n");
        assert_eq!(buffer.last_line(), b"");
    }

    #[test]
    fn test_take_clears_buffer() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"test data");
        assert_eq!(buffer.take(), b"test data");
        assert!(buffer.is_empty());
    }
}
