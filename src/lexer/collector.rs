//! Event collector for tests and offline inspection
//!
//! Buffers every lexer callback as an owned value, in order. Used as the
//! terminal link of a handler chain when the caller wants the normalized
//! event stream as data rather than push callbacks.

use super::{Attribute, MarkupHandler, ParseError};

/// An owned copy of a single lexer event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupEvent {
    DocumentStart {
        top_level: bool,
        line: u32,
        col: u32,
    },
    DocumentEnd {
        line: u32,
        col: u32,
    },
    OpenTag {
        name: String,
        attributes: Vec<(String, Option<String>)>,
        self_closing: bool,
        line: u32,
        col: u32,
    },
    CloseTag {
        name: String,
        matched: bool,
        line: u32,
        col: u32,
    },
    Text {
        content: String,
        line: u32,
        col: u32,
    },
    Comment {
        content: String,
        line: u32,
        col: u32,
    },
    Cdata {
        content: String,
        line: u32,
        col: u32,
    },
    ProcessingInstruction {
        target: String,
        data: Option<String>,
        line: u32,
        col: u32,
    },
    DocType {
        clause: String,
        line: u32,
        col: u32,
    },
}

/// Terminal handler that buffers events as owned [`MarkupEvent`]s.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<MarkupEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        EventCollector::default()
    }

    pub fn events(&self) -> &[MarkupEvent] {
        &self.events
    }

    /// Drain the buffered events, leaving the collector reusable.
    pub fn take_events(&mut self) -> Vec<MarkupEvent> {
        std::mem::take(&mut self.events)
    }
}

impl MarkupHandler for EventCollector {
    fn document_start(&mut self, top_level: bool, line: u32, col: u32) -> Result<(), ParseError> {
        self.events.push(MarkupEvent::DocumentStart {
            top_level,
            line,
            col,
        });
        Ok(())
    }

    fn document_end(&mut self, line: u32, col: u32) -> Result<(), ParseError> {
        self.events.push(MarkupEvent::DocumentEnd { line, col });
        Ok(())
    }

    fn open_tag(
        &mut self,
        name: &str,
        attributes: &[Attribute<'_>],
        self_closing: bool,
        line: u32,
        col: u32,
    ) -> Result<(), ParseError> {
        self.events.push(MarkupEvent::OpenTag {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|a| (a.name.to_string(), a.value.map(str::to_string)))
                .collect(),
            self_closing,
            line,
            col,
        });
        Ok(())
    }

    fn close_tag(&mut self, name: &str, matched: bool, line: u32, col: u32) -> Result<(), ParseError> {
        self.events.push(MarkupEvent::CloseTag {
            name: name.to_string(),
            matched,
            line,
            col,
        });
        Ok(())
    }

    fn text(&mut self, content: &str, line: u32, col: u32) -> Result<(), ParseError> {
        self.events.push(MarkupEvent::Text {
            content: content.to_string(),
            line,
            col,
        });
        Ok(())
    }

    fn comment(&mut self, content: &str, line: u32, col: u32) -> Result<(), ParseError> {
        self.events.push(MarkupEvent::Comment {
            content: content.to_string(),
            line,
            col,
        });
        Ok(())
    }

    fn cdata(&mut self, content: &str, line: u32, col: u32) -> Result<(), ParseError> {
        self.events.push(MarkupEvent::Cdata {
            content: content.to_string(),
            line,
            col,
        });
        Ok(())
    }

    fn processing_instruction(
        &mut self,
        target: &str,
        data: Option<&str>,
        line: u32,
        col: u32,
    ) -> Result<(), ParseError> {
        self.events.push(MarkupEvent::ProcessingInstruction {
            target: target.to_string(),
            data: data.map(str::to_string),
            line,
            col,
        });
        Ok(())
    }

    fn doctype(&mut self, clause: &str, line: u32, col: u32) -> Result<(), ParseError> {
        self.events.push(MarkupEvent::DocType {
            clause: clause.to_string(),
            line,
            col,
        });
        Ok(())
    }
}
