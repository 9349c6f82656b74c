//! Low-level byte scanner with position tracking
//!
//! Forward-only cursor over the input buffer. Delimiter searches go
//! through memchr/memmem; line/col bookkeeping happens once per `advance`
//! by counting newlines in the consumed slice.

use memchr::{memchr, memchr_iter, memmem};

pub(super) struct Scanner<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Scanner {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[inline]
    pub fn col(&self) -> u32 {
        self.col
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    #[inline]
    pub fn input_len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    #[inline]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    #[inline]
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.bytes[self.pos..].starts_with(prefix)
    }

    /// Consume `n` bytes, updating line/col from the consumed slice.
    pub fn advance(&mut self, n: usize) {
        let end = (self.pos + n).min(self.bytes.len());
        let consumed = &self.bytes[self.pos..end];
        let mut last_nl = None;
        let mut newlines = 0u32;
        for idx in memchr_iter(b'\n', consumed) {
            newlines += 1;
            last_nl = Some(idx);
        }
        if let Some(idx) = last_nl {
            self.line += newlines;
            self.col = (consumed.len() - idx) as u32;
        } else {
            self.col += consumed.len() as u32;
        }
        self.pos = end;
    }

    /// Absolute offset of the next `byte` at or after the cursor.
    #[inline]
    pub fn find_byte(&self, byte: u8) -> Option<usize> {
        memchr(byte, &self.bytes[self.pos..]).map(|i| self.pos + i)
    }

    /// Absolute offset of the next occurrence of `needle`.
    #[inline]
    pub fn find(&self, needle: &[u8]) -> Option<usize> {
        memmem::find(&self.bytes[self.pos..], needle).map(|i| self.pos + i)
    }

    /// Borrow `[start, end)` of the input. Bounds come from this scanner's
    /// own offsets, so they are always on char boundaries.
    #[inline]
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.input[start..end]
    }

    /// Read a tag or attribute name starting at the cursor; the cursor
    /// advances past it. Names end at whitespace, `=`, `>`, `/` or `?`.
    pub fn read_name(&mut self) -> &'a str {
        let start = self.pos;
        let mut end = start;
        while end < self.bytes.len() {
            match self.bytes[end] {
                b' ' | b'\t' | b'\r' | b'\n' | b'=' | b'>' | b'/' | b'?' => break,
                _ => end += 1,
            }
        }
        self.advance(end - start);
        self.slice(start, end)
    }

    /// Advance past any run of ASCII whitespace.
    pub fn skip_whitespace(&mut self) {
        let start = self.pos;
        let mut end = start;
        while end < self.bytes.len() {
            match self.bytes[end] {
                b' ' | b'\t' | b'\r' | b'\n' => end += 1,
                _ => break,
            }
        }
        if end > start {
            self.advance(end - start);
        }
    }
}
