//! The markup lexer proper
//!
//! Single forward pass over the input buffer, dispatching structural
//! events to a handler chain. An open-tag stack classifies close tags as
//! matched or unmatched; in HTML mode void elements never join the stack.
//!
//! When a handler disables structural parsing through [`ParseStatus`],
//! the lexer scans for the literal re-enable marker, reports everything
//! before it as plain text, and resumes with a text span that begins
//! exactly at the marker so the disabling handler can recognize it.

use std::cell::RefCell;
use std::rc::Rc;

use super::scanner::Scanner;
use super::{Attribute, MarkupHandler, ParseError, ParseStatus, ParseStatusRef};
use crate::names::{self, TemplateMode};

/// Streaming markup lexer, bound to one template mode.
#[derive(Debug, Clone, Copy)]
pub struct MarkupLexer {
    mode: TemplateMode,
}

impl MarkupLexer {
    pub fn new(mode: TemplateMode) -> Self {
        MarkupLexer { mode }
    }

    pub fn mode(&self) -> TemplateMode {
        self.mode
    }

    /// Lex `buffer`, pushing events into `handler`. `top_level` is
    /// forwarded verbatim in `document_start`.
    pub fn parse<H: MarkupHandler>(
        &self,
        buffer: &str,
        top_level: bool,
        handler: &mut H,
    ) -> Result<(), ParseError> {
        let status: ParseStatusRef = Rc::new(RefCell::new(ParseStatus::default()));
        handler.parse_status(Rc::clone(&status));
        handler.document_start(top_level, 1, 1)?;

        let mut s = Scanner::new(buffer);
        let mut open_stack: Vec<String> = Vec::new();
        let mut attrs: Vec<Attribute<'_>> = Vec::new();

        while !s.is_eof() {
            if status.borrow().is_parsing_disabled() {
                self.lex_disabled(&mut s, &status, handler)?;
                continue;
            }
            self.lex_markup(&mut s, &mut open_stack, &mut attrs, handler)?;
        }

        if status.borrow().is_parsing_disabled() {
            return Err(ParseError::new(
                "unclosed parser-level comment block",
                s.line(),
                s.col(),
            ));
        }
        handler.document_end(s.line(), s.col())
    }

    /// Structural parsing is off: everything up to the re-enable marker
    /// is plain text, and the resuming span starts exactly at the marker.
    fn lex_disabled<H: MarkupHandler>(
        &self,
        s: &mut Scanner<'_>,
        status: &ParseStatusRef,
        handler: &mut H,
    ) -> Result<(), ParseError> {
        let marker = match status.borrow().marker() {
            Some(m) => m.to_vec(),
            None => return Ok(()),
        };
        let (line, col) = (s.line(), s.col());
        let at = s.find(&marker).ok_or_else(|| {
            ParseError::new("unclosed parser-level comment block", line, col)
        })?;

        if at > s.pos() {
            let content = s.slice(s.pos(), at);
            handler.text(content, line, col)?;
            s.advance(at - s.pos());
        }
        status.borrow_mut().clear();

        let start = s.pos();
        let (mline, mcol) = (s.line(), s.col());
        s.advance(marker.len());
        let end = s.find_byte(b'<').unwrap_or_else(|| s.input_len());
        handler.text(s.slice(start, end), mline, mcol)?;
        s.advance(end - s.pos());
        Ok(())
    }

    fn lex_markup<'a, H: MarkupHandler>(
        &self,
        s: &mut Scanner<'a>,
        open_stack: &mut Vec<String>,
        attrs: &mut Vec<Attribute<'a>>,
        handler: &mut H,
    ) -> Result<(), ParseError> {
        if s.peek() != Some(b'<') {
            return self.lex_text(s, handler);
        }
        if s.starts_with(b"<!--") {
            return self.lex_comment(s, handler);
        }
        if s.starts_with(b"<![CDATA[") {
            return self.lex_cdata(s, handler);
        }
        if at_doctype(s) {
            return self.lex_doctype(s, handler);
        }
        if s.starts_with(b"<?") {
            return self.lex_processing_instruction(s, handler);
        }
        if s.starts_with(b"</") {
            return self.lex_close_tag(s, open_stack, handler);
        }
        match s.peek_at(1) {
            Some(b) if b.is_ascii_alphabetic() || b == b'_' || b == b':' => {
                self.lex_open_tag(s, open_stack, attrs, handler)
            }
            // a lone '<' is content, not structure
            _ => self.lex_text(s, handler),
        }
    }

    fn lex_text<H: MarkupHandler>(
        &self,
        s: &mut Scanner<'_>,
        handler: &mut H,
    ) -> Result<(), ParseError> {
        let (line, col) = (s.line(), s.col());
        let start = s.pos();
        // a text span starting at '<' means the '<' itself is content,
        // so the search for the next tag begins one byte later
        let search_from = if s.peek() == Some(b'<') { 1 } else { 0 };
        s.advance(search_from);
        let end = s.find_byte(b'<').unwrap_or_else(|| s.input_len());
        handler.text(s.slice(start, end), line, col)?;
        s.advance(end - s.pos());
        Ok(())
    }

    fn lex_comment<H: MarkupHandler>(
        &self,
        s: &mut Scanner<'_>,
        handler: &mut H,
    ) -> Result<(), ParseError> {
        let (line, col) = (s.line(), s.col());
        let start = s.pos();
        let end = s
            .find(b"-->")
            .ok_or_else(|| ParseError::new("unclosed comment", line, col))?;
        handler.comment(s.slice(start + 4, end), line, col)?;
        s.advance(end + 3 - start);
        Ok(())
    }

    fn lex_cdata<H: MarkupHandler>(
        &self,
        s: &mut Scanner<'_>,
        handler: &mut H,
    ) -> Result<(), ParseError> {
        let (line, col) = (s.line(), s.col());
        let start = s.pos();
        let end = s
            .find(b"]]>")
            .ok_or_else(|| ParseError::new("unclosed CDATA section", line, col))?;
        handler.cdata(s.slice(start + 9, end), line, col)?;
        s.advance(end + 3 - start);
        Ok(())
    }

    fn lex_doctype<H: MarkupHandler>(
        &self,
        s: &mut Scanner<'_>,
        handler: &mut H,
    ) -> Result<(), ParseError> {
        let (line, col) = (s.line(), s.col());
        let start = s.pos();
        let end = s
            .find_byte(b'>')
            .ok_or_else(|| ParseError::new("unclosed DOCTYPE clause", line, col))?;
        // "<!" + "DOCTYPE" = 9 bytes before the clause
        handler.doctype(s.slice(start + 9, end).trim(), line, col)?;
        s.advance(end + 1 - start);
        Ok(())
    }

    fn lex_processing_instruction<H: MarkupHandler>(
        &self,
        s: &mut Scanner<'_>,
        handler: &mut H,
    ) -> Result<(), ParseError> {
        let (line, col) = (s.line(), s.col());
        let start = s.pos();
        let end = s
            .find(b"?>")
            .ok_or_else(|| ParseError::new("unclosed processing instruction", line, col))?;
        let content = s.slice(start + 2, end);
        let (target, data) = match content.find(|c: char| c.is_ascii_whitespace()) {
            Some(ws) => {
                let data = content[ws..].trim_start();
                (&content[..ws], (!data.is_empty()).then_some(data))
            }
            None => (content, None),
        };
        handler.processing_instruction(target, data, line, col)?;
        s.advance(end + 2 - start);
        Ok(())
    }

    fn lex_close_tag<H: MarkupHandler>(
        &self,
        s: &mut Scanner<'_>,
        open_stack: &mut Vec<String>,
        handler: &mut H,
    ) -> Result<(), ParseError> {
        let (line, col) = (s.line(), s.col());
        let start = s.pos();
        let end = s
            .find_byte(b'>')
            .ok_or_else(|| ParseError::new("unclosed close tag", line, col))?;
        let name = s.slice(start + 2, end).trim();
        let normalized = self.mode.normalize(name);
        let matched = match open_stack.iter().rposition(|open| *open == normalized) {
            Some(idx) => {
                open_stack.truncate(idx);
                true
            }
            None => false,
        };
        handler.close_tag(name, matched, line, col)?;
        s.advance(end + 1 - start);
        Ok(())
    }

    fn lex_open_tag<'a, H: MarkupHandler>(
        &self,
        s: &mut Scanner<'a>,
        open_stack: &mut Vec<String>,
        attrs: &mut Vec<Attribute<'a>>,
        handler: &mut H,
    ) -> Result<(), ParseError> {
        let (line, col) = (s.line(), s.col());
        s.advance(1);
        let name = s.read_name();
        attrs.clear();

        let self_closing = loop {
            s.skip_whitespace();
            match s.peek() {
                Some(b'>') => {
                    s.advance(1);
                    break false;
                }
                Some(b'/') if s.peek_at(1) == Some(b'>') => {
                    s.advance(2);
                    break true;
                }
                Some(_) => self.lex_attribute(s, attrs, line, col)?,
                None => return Err(ParseError::new("unclosed tag", line, col)),
            }
        };

        if !self_closing {
            let normalized = self.mode.normalize(name);
            let void = self.mode.is_html() && names::is_html_void(&normalized);
            if !void {
                open_stack.push(normalized);
            }
        }
        handler.open_tag(name, attrs, self_closing, line, col)
    }

    fn lex_attribute<'a>(
        &self,
        s: &mut Scanner<'a>,
        attrs: &mut Vec<Attribute<'a>>,
        tag_line: u32,
        tag_col: u32,
    ) -> Result<(), ParseError> {
        let name = s.read_name();
        if name.is_empty() {
            return Err(ParseError::new("malformed tag", tag_line, tag_col));
        }
        s.skip_whitespace();
        let value = if s.peek() == Some(b'=') {
            s.advance(1);
            s.skip_whitespace();
            match s.peek() {
                Some(quote @ (b'"' | b'\'')) => {
                    s.advance(1);
                    let start = s.pos();
                    let end = s.find_byte(quote).ok_or_else(|| {
                        ParseError::new("unclosed attribute value", tag_line, tag_col)
                    })?;
                    let value = s.slice(start, end);
                    s.advance(end + 1 - start);
                    Some(value)
                }
                _ => {
                    let start = s.pos();
                    let mut len = 0;
                    loop {
                        match s.peek_at(len) {
                            None | Some(b' ' | b'\t' | b'\r' | b'\n' | b'>') => break,
                            Some(b'/') if s.peek_at(len + 1) == Some(b'>') => break,
                            Some(_) => len += 1,
                        }
                    }
                    s.advance(len);
                    Some(s.slice(start, start + len))
                }
            }
        } else {
            None
        };
        attrs.push(Attribute { name, value });
        Ok(())
    }
}

fn at_doctype(s: &Scanner<'_>) -> bool {
    const KEYWORD: &[u8] = b"DOCTYPE";
    s.starts_with(b"<!")
        && KEYWORD
            .iter()
            .enumerate()
            .all(|(i, &k)| s.peek_at(2 + i).is_some_and(|b| b.eq_ignore_ascii_case(&k)))
}
