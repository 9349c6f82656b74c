//! Markup lexer and its handler contract
//!
//! The lexer turns template characters into structural callbacks on a
//! [`MarkupHandler`]: document start/end, open/close tags, text, comments,
//! CDATA sections, processing instructions and DOCTYPE clauses, each with
//! 1-based line/col coordinates.
//!
//! Handlers and lexer share a [`ParseStatus`] control channel: a handler
//! may disable structural parsing until a literal marker reappears in the
//! input, at which point the lexer resumes with a text span beginning
//! exactly at that marker.

mod markup;
mod scanner;

pub mod collector;

pub use markup::MarkupLexer;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A single attribute as lexed, borrowing from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute<'a> {
    pub name: &'a str,
    /// `None` for valueless attributes (`<input disabled>`)
    pub value: Option<&'a str>,
}

/// Failure while lexing markup, positioned 1-based in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub col: u32,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: u32, col: u32) -> Self {
        ParseError {
            message: message.into(),
            line,
            col,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {}, col {})", self.message, self.line, self.col)
    }
}

impl std::error::Error for ParseError {}

/// Control channel between the lexer and its handler chain.
///
/// Created fresh by the lexer for each parse and handed to every handler
/// via [`MarkupHandler::parse_status`] before the first event. One
/// mutating operation exists: disable structural parsing until a literal
/// marker is seen again in the input.
#[derive(Debug, Default)]
pub struct ParseStatus {
    disabled_until: Option<Vec<u8>>,
}

impl ParseStatus {
    /// Stop structural lexing; report everything as text until `marker`
    /// reappears literally in the input.
    pub fn set_parsing_disabled(&mut self, marker: &str) {
        self.disabled_until = Some(marker.as_bytes().to_vec());
    }

    pub fn is_parsing_disabled(&self) -> bool {
        self.disabled_until.is_some()
    }

    /// The marker that re-enables parsing, while disabled.
    pub fn marker(&self) -> Option<&[u8]> {
        self.disabled_until.as_deref()
    }

    /// Re-enable structural lexing.
    pub fn clear(&mut self) {
        self.disabled_until = None;
    }
}

/// Shared handle to the per-parse [`ParseStatus`].
pub type ParseStatusRef = Rc<RefCell<ParseStatus>>;

/// Receiver of lexer events.
///
/// All event methods default to no-ops so a handler only implements what
/// it observes. Chained handlers forward every event, observed or not, to
/// the next link.
pub trait MarkupHandler {
    /// Called once per parse, before `document_start`, with the shared
    /// control channel. Chained handlers must propagate it.
    fn parse_status(&mut self, _status: ParseStatusRef) {}

    /// `top_level` distinguishes whole-template parses from fragment
    /// parses of the same input.
    fn document_start(&mut self, _top_level: bool, _line: u32, _col: u32) -> Result<(), ParseError> {
        Ok(())
    }

    fn document_end(&mut self, _line: u32, _col: u32) -> Result<(), ParseError> {
        Ok(())
    }

    fn open_tag(
        &mut self,
        _name: &str,
        _attributes: &[Attribute<'_>],
        _self_closing: bool,
        _line: u32,
        _col: u32,
    ) -> Result<(), ParseError> {
        Ok(())
    }

    /// `matched` is false for a close tag with no corresponding open tag
    /// on the lexer's element stack.
    fn close_tag(
        &mut self,
        _name: &str,
        _matched: bool,
        _line: u32,
        _col: u32,
    ) -> Result<(), ParseError> {
        Ok(())
    }

    fn text(&mut self, _content: &str, _line: u32, _col: u32) -> Result<(), ParseError> {
        Ok(())
    }

    /// `content` excludes the `<!--` / `-->` delimiters.
    fn comment(&mut self, _content: &str, _line: u32, _col: u32) -> Result<(), ParseError> {
        Ok(())
    }

    fn cdata(&mut self, _content: &str, _line: u32, _col: u32) -> Result<(), ParseError> {
        Ok(())
    }

    fn processing_instruction(
        &mut self,
        _target: &str,
        _data: Option<&str>,
        _line: u32,
        _col: u32,
    ) -> Result<(), ParseError> {
        Ok(())
    }

    /// `clause` is everything between `<!DOCTYPE ` and `>`.
    fn doctype(&mut self, _clause: &str, _line: u32, _col: u32) -> Result<(), ParseError> {
        Ok(())
    }
}

impl<H: MarkupHandler + ?Sized> MarkupHandler for &mut H {
    fn parse_status(&mut self, status: ParseStatusRef) {
        (**self).parse_status(status)
    }

    fn document_start(&mut self, top_level: bool, line: u32, col: u32) -> Result<(), ParseError> {
        (**self).document_start(top_level, line, col)
    }

    fn document_end(&mut self, line: u32, col: u32) -> Result<(), ParseError> {
        (**self).document_end(line, col)
    }

    fn open_tag(
        &mut self,
        name: &str,
        attributes: &[Attribute<'_>],
        self_closing: bool,
        line: u32,
        col: u32,
    ) -> Result<(), ParseError> {
        (**self).open_tag(name, attributes, self_closing, line, col)
    }

    fn close_tag(&mut self, name: &str, matched: bool, line: u32, col: u32) -> Result<(), ParseError> {
        (**self).close_tag(name, matched, line, col)
    }

    fn text(&mut self, content: &str, line: u32, col: u32) -> Result<(), ParseError> {
        (**self).text(content, line, col)
    }

    fn comment(&mut self, content: &str, line: u32, col: u32) -> Result<(), ParseError> {
        (**self).comment(content, line, col)
    }

    fn cdata(&mut self, content: &str, line: u32, col: u32) -> Result<(), ParseError> {
        (**self).cdata(content, line, col)
    }

    fn processing_instruction(
        &mut self,
        target: &str,
        data: Option<&str>,
        line: u32,
        col: u32,
    ) -> Result<(), ParseError> {
        (**self).processing_instruction(target, data, line, col)
    }

    fn doctype(&mut self, clause: &str, line: u32, col: u32) -> Result<(), ParseError> {
        (**self).doctype(clause, line, col)
    }
}
