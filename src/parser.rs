//! Parse orchestration and the parser-level comment protocol
//!
//! [`MarkupTemplateParser`] wires the lexer to a handler chain: the
//! parser-level comment handler always sits first, the block selector is
//! inserted when fragment selectors are given, and the caller's handler
//! terminates the chain.
//!
//! Parser-level comments are comments whose content opens with `/*`. A
//! block that also closes with `*/` inside the same comment is discarded
//! whole. A block that does not close there spans raw markup: the handler
//! disables structural lexing until the literal `*/-->` sequence, then
//! strips that marker from the resuming text span and forwards only what
//! follows it.

use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::rc::Rc;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::error::{InputError, Result, TemplateError};
use crate::lexer::{Attribute, MarkupHandler, MarkupLexer, ParseError, ParseStatusRef};
use crate::names::TemplateMode;
use crate::resource::Resource;
use crate::select::{BlockSelectorHandler, FragmentReferenceResolver};

/// Literal sequence that closes a spanning parser-level comment block.
pub const PARSER_LEVEL_COMMENT_CLOSE: &str = "*/-->";

const RESOLVER_CACHE_CAPACITY: usize = 16;

/// Receiver of per-document parse timing records.
///
/// Injected into the parser so embedders can route instrumentation to
/// their own collection; the default sink emits a trace event.
pub trait TimingSink {
    fn document_parsed(&self, template: &str, elapsed: Duration);
}

/// Default sink: records the elapsed time as a `tracing` trace event.
#[derive(Debug, Default)]
pub struct TracingTimingSink;

impl TimingSink for TracingTimingSink {
    fn document_parsed(&self, template: &str, elapsed: Duration) {
        tracing::trace!(
            template,
            elapsed_ns = elapsed.as_nanos() as u64,
            "template parsed"
        );
    }
}

/// Engine configuration visible to the parsing layer.
///
/// Immutable once constructed. The dialect prefix drives fragment
/// reference resolution in the block selector.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    dialect_prefix: Option<String>,
}

impl EngineConfig {
    pub fn new() -> Self {
        EngineConfig::default()
    }

    pub fn with_dialect_prefix(prefix: impl Into<String>) -> Self {
        EngineConfig {
            dialect_prefix: Some(prefix.into()),
        }
    }

    pub fn dialect_prefix(&self) -> Option<&str> {
        self.dialect_prefix.as_deref()
    }
}

/// Handler-chain link implementing the parser-level comment protocol and
/// the document timing record.
pub struct ParserLevelCommentHandler<'n, H: MarkupHandler> {
    next: H,
    template: &'n str,
    sink: &'n dyn TimingSink,
    status: Option<ParseStatusRef>,
    in_comment_block: bool,
    started_at: Option<Instant>,
}

impl<'n, H: MarkupHandler> ParserLevelCommentHandler<'n, H> {
    pub fn new(template: &'n str, sink: &'n dyn TimingSink, next: H) -> Self {
        ParserLevelCommentHandler {
            next,
            template,
            sink,
            status: None,
            in_comment_block: false,
            started_at: None,
        }
    }
}

impl<H: MarkupHandler> MarkupHandler for ParserLevelCommentHandler<'_, H> {
    fn parse_status(&mut self, status: ParseStatusRef) {
        self.status = Some(Rc::clone(&status));
        self.next.parse_status(status);
    }

    fn document_start(&mut self, top_level: bool, line: u32, col: u32) -> Result<(), ParseError> {
        self.started_at = Some(Instant::now());
        self.next.document_start(top_level, line, col)
    }

    fn document_end(&mut self, line: u32, col: u32) -> Result<(), ParseError> {
        // computed unconditionally; filtering is the sink's business
        let elapsed = self
            .started_at
            .map(|t| t.elapsed())
            .unwrap_or_default();
        self.sink.document_parsed(self.template, elapsed);
        self.next.document_end(line, col)
    }

    fn comment(&mut self, content: &str, line: u32, col: u32) -> Result<(), ParseError> {
        if !content.starts_with("/*") {
            return self.next.comment(content, line, col);
        }
        // a body of exactly "/*" has no "*/" suffix, so it spans
        if content.ends_with("*/") {
            // self-closing block: swallowed whole, zero events forwarded
            return Ok(());
        }
        // spanning block: structural lexing stops until the literal
        // close sequence reappears in the input
        if let Some(status) = &self.status {
            status
                .borrow_mut()
                .set_parsing_disabled(PARSER_LEVEL_COMMENT_CLOSE);
        }
        self.in_comment_block = true;
        Ok(())
    }

    fn text(&mut self, content: &str, line: u32, col: u32) -> Result<(), ParseError> {
        if !self.in_comment_block {
            return self.next.text(content, line, col);
        }
        if content.starts_with(PARSER_LEVEL_COMMENT_CLOSE) {
            self.in_comment_block = false;
            let rest = &content[PARSER_LEVEL_COMMENT_CLOSE.len()..];
            if !rest.is_empty() {
                // the close marker never spans a line, so only col moves
                return self
                    .next
                    .text(rest, line, col + PARSER_LEVEL_COMMENT_CLOSE.len() as u32);
            }
            return Ok(());
        }
        // still inside the block: every span is discarded
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
        self.next.open_tag(name, attributes, self_closing, line, col)
    }

    fn close_tag(&mut self, name: &str, matched: bool, line: u32, col: u32) -> Result<(), ParseError> {
        self.next.close_tag(name, matched, line, col)
    }

    fn cdata(&mut self, content: &str, line: u32, col: u32) -> Result<(), ParseError> {
        self.next.cdata(content, line, col)
    }

    fn processing_instruction(
        &mut self,
        target: &str,
        data: Option<&str>,
        line: u32,
        col: u32,
    ) -> Result<(), ParseError> {
        self.next.processing_instruction(target, data, line, col)
    }

    fn doctype(&mut self, clause: &str, line: u32, col: u32) -> Result<(), ParseError> {
        self.next.doctype(clause, line, col)
    }
}

/// Template parser bound to one mode for its whole lifetime.
pub struct MarkupTemplateParser {
    mode: TemplateMode,
    lexer: MarkupLexer,
    sink: Box<dyn TimingSink>,
    resolvers: RefCell<LruCache<String, Rc<FragmentReferenceResolver>>>,
}

impl MarkupTemplateParser {
    pub fn new(mode: TemplateMode) -> Self {
        MarkupTemplateParser::with_sink(mode, Box::new(TracingTimingSink))
    }

    pub fn with_sink(mode: TemplateMode, sink: Box<dyn TimingSink>) -> Self {
        MarkupTemplateParser {
            mode,
            lexer: MarkupLexer::new(mode),
            sink,
            resolvers: RefCell::new(LruCache::new(
                NonZeroUsize::new(RESOLVER_CACHE_CAPACITY).unwrap(),
            )),
        }
    }

    pub fn mode(&self) -> TemplateMode {
        self.mode
    }

    /// Parse a whole template (`document_start` reports top-level).
    pub fn parse_template<H: MarkupHandler>(
        &self,
        config: &EngineConfig,
        mode: TemplateMode,
        resource: Resource,
        selectors: &[&str],
        handler: &mut H,
    ) -> Result<()> {
        self.parse(config, mode, resource, selectors, true, handler)
    }

    /// Parse a fragment: identical to [`Self::parse_template`] except the
    /// top-level flag delivered in `document_start`.
    pub fn parse_fragment<H: MarkupHandler>(
        &self,
        config: &EngineConfig,
        mode: TemplateMode,
        resource: Resource,
        selectors: &[&str],
        handler: &mut H,
    ) -> Result<()> {
        self.parse(config, mode, resource, selectors, false, handler)
    }

    fn parse<H: MarkupHandler>(
        &self,
        config: &EngineConfig,
        mode: TemplateMode,
        resource: Resource,
        selectors: &[&str],
        top_level: bool,
        handler: &mut H,
    ) -> Result<()> {
        // mode is fixed at construction; a mismatch fails before any
        // event is read
        if mode != self.mode {
            return Err(TemplateError::Configuration(format!(
                "parser is configured for {} mode and cannot parse a {} template",
                self.mode, mode
            )));
        }

        let template = resource.name().to_string();
        let buffer = resource.read()?;

        let outcome = if selectors.is_empty() {
            let mut chain =
                ParserLevelCommentHandler::new(&template, self.sink.as_ref(), handler);
            self.lexer.parse(&buffer, top_level, &mut chain)
        } else {
            let resolver = config
                .dialect_prefix()
                .map(|prefix| self.resolver_for(prefix));
            let selector = BlockSelectorHandler::new(handler, selectors, resolver, mode)?;
            let mut chain =
                ParserLevelCommentHandler::new(&template, self.sink.as_ref(), selector);
            self.lexer.parse(&buffer, top_level, &mut chain)
        };

        outcome.map_err(|e| {
            TemplateError::Input(InputError {
                template,
                line: Some(e.line),
                col: Some(e.col),
                message: e.message,
            })
        })
    }

    fn resolver_for(&self, prefix: &str) -> Rc<FragmentReferenceResolver> {
        let mut cache = self.resolvers.borrow_mut();
        if let Some(resolver) = cache.get(prefix) {
            return Rc::clone(resolver);
        }
        let resolver = Rc::new(FragmentReferenceResolver::new(prefix));
        cache.put(prefix.to_string(), Rc::clone(&resolver));
        resolver
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::lexer::collector::{EventCollector, MarkupEvent};

    fn parse_html(input: &str) -> Vec<MarkupEvent> {
        let parser = MarkupTemplateParser::new(TemplateMode::Html);
        let mut collector = EventCollector::new();
        parser
            .parse_template(
                &EngineConfig::new(),
                TemplateMode::Html,
                Resource::from_string("t", input),
                &[],
                &mut collector,
            )
            .unwrap();
        collector.take_events()
    }

    fn content_events(events: &[MarkupEvent]) -> Vec<&MarkupEvent> {
        events
            .iter()
            .filter(|e| {
                !matches!(
                    e,
                    MarkupEvent::DocumentStart { .. } | MarkupEvent::DocumentEnd { .. }
                )
            })
            .collect()
    }

    #[test]
    fn test_ordinary_comments_pass_through() {
        let events = parse_html("<!-- plain -->");
        assert_eq!(
            content_events(&events),
            vec![&MarkupEvent::Comment {
                content: " plain ".to_string(),
                line: 1,
                col: 1
            }]
        );
    }

    #[test]
    fn test_self_closing_parser_level_comment_produces_zero_events() {
        let events = parse_html("a<!--/* hidden */-->b");
        assert_eq!(
            content_events(&events),
            vec![
                &MarkupEvent::Text {
                    content: "a".to_string(),
                    line: 1,
                    col: 1
                },
                &MarkupEvent::Text {
                    content: "b".to_string(),
                    line: 1,
                    col: 21
                },
            ]
        );
    }

    #[test]
    fn test_spanning_comment_discards_block_and_keeps_remainder() {
        let events = parse_html("<!--/* drop --><div>gone</div>*/--> kept");
        assert_eq!(
            content_events(&events),
            vec![&MarkupEvent::Text {
                content: " kept".to_string(),
                line: 1,
                col: 36
            }]
        );
    }

    #[test]
    fn test_spanning_comment_with_empty_remainder() {
        let events = parse_html("x<!--/* drop -->y*/-->");
        assert_eq!(
            content_events(&events),
            vec![&MarkupEvent::Text {
                content: "x".to_string(),
                line: 1,
                col: 1
            }]
        );
    }

    #[test]
    fn test_overlapping_self_close_is_discarded_whole() {
        // "/*/" opens with "/*" and ends with "*/" on the shared '*'
        let events = parse_html("a<!--/*/-->b");
        assert_eq!(
            content_events(&events),
            vec![
                &MarkupEvent::Text {
                    content: "a".to_string(),
                    line: 1,
                    col: 1
                },
                &MarkupEvent::Text {
                    content: "b".to_string(),
                    line: 1,
                    col: 12
                },
            ]
        );
    }

    #[test]
    fn test_bare_slash_star_comment_spans() {
        // "/*" alone does not end with "*/": it opens a spanning block
        let events = parse_html("<!--/*-->ignored*/-->z");
        assert_eq!(
            content_events(&events),
            vec![&MarkupEvent::Text {
                content: "z".to_string(),
                line: 1,
                col: 22
            }]
        );
    }

    #[test]
    fn test_unclosed_spanning_comment_is_input_error() {
        let parser = MarkupTemplateParser::new(TemplateMode::Html);
        let mut collector = EventCollector::new();
        let err = parser
            .parse_template(
                &EngineConfig::new(),
                TemplateMode::Html,
                Resource::from_string("broken.html", "<!--/* never closed -->x"),
                &[],
                &mut collector,
            )
            .unwrap_err();
        match err {
            TemplateError::Input(e) => {
                assert_eq!(e.template, "broken.html");
                assert!(e.message.contains("unclosed parser-level comment"));
                assert!(e.line.is_some() && e.col.is_some());
            }
            other => panic!("expected input error, got {other:?}"),
        }
    }

    #[test]
    fn test_mode_mismatch_fails_before_any_event() {
        let parser = MarkupTemplateParser::new(TemplateMode::Html);
        let mut collector = EventCollector::new();
        let err = parser
            .parse_template(
                &EngineConfig::new(),
                TemplateMode::Xml,
                Resource::from_string("t", "<p/>"),
                &[],
                &mut collector,
            )
            .unwrap_err();
        assert!(matches!(err, TemplateError::Configuration(_)));
        assert!(collector.events().is_empty());
    }

    #[test]
    fn test_fragment_parse_is_not_top_level() {
        let parser = MarkupTemplateParser::new(TemplateMode::Html);
        let mut collector = EventCollector::new();
        parser
            .parse_fragment(
                &EngineConfig::new(),
                TemplateMode::Html,
                Resource::from_string("t", "<p>x</p>"),
                &[],
                &mut collector,
            )
            .unwrap();
        assert_eq!(
            collector.events()[0],
            MarkupEvent::DocumentStart {
                top_level: false,
                line: 1,
                col: 1
            }
        );
    }

    #[test]
    fn test_lexer_error_carries_resource_name_and_position() {
        let parser = MarkupTemplateParser::new(TemplateMode::Html);
        let mut collector = EventCollector::new();
        let err = parser
            .parse_template(
                &EngineConfig::new(),
                TemplateMode::Html,
                Resource::from_string("bad.html", "\n <!-- oops"),
                &[],
                &mut collector,
            )
            .unwrap_err();
        assert_eq!(err.position(), Some((2, 2)));
        assert!(err.to_string().contains("bad.html"));
    }

    #[test]
    fn test_timing_sink_receives_one_record_per_parse() {
        use std::cell::Cell;

        struct CountingSink {
            records: Rc<Cell<u32>>,
        }

        impl TimingSink for CountingSink {
            fn document_parsed(&self, template: &str, _elapsed: Duration) {
                assert_eq!(template, "timed.html");
                self.records.set(self.records.get() + 1);
            }
        }

        let records = Rc::new(Cell::new(0));
        let parser = MarkupTemplateParser::with_sink(
            TemplateMode::Html,
            Box::new(CountingSink {
                records: Rc::clone(&records),
            }),
        );
        let mut collector = EventCollector::new();
        parser
            .parse_template(
                &EngineConfig::new(),
                TemplateMode::Html,
                Resource::from_string("timed.html", "<p>x</p>"),
                &[],
                &mut collector,
            )
            .unwrap();
        assert_eq!(records.get(), 1);
    }

    #[test]
    fn test_comment_handler_span_protocol_directly() {
        // drive the handler without the lexer: spans inside the block
        // are discarded, the marker-leading span is stripped and
        // forwarded with its column moved past the marker
        let sink = TracingTimingSink;
        let mut collector = EventCollector::new();
        let mut handler = ParserLevelCommentHandler::new("t", &sink, &mut collector);
        handler.comment("/* open", 1, 1).unwrap();
        handler.text("discarded", 2, 1).unwrap();
        handler.text("also <b>discarded</b>", 2, 10).unwrap();
        handler.text("*/-->rest", 3, 10).unwrap();
        handler.text("normal", 4, 1).unwrap();
        drop(handler);
        assert_eq!(
            collector.take_events(),
            vec![
                MarkupEvent::Text {
                    content: "rest".to_string(),
                    line: 3,
                    col: 15
                },
                MarkupEvent::Text {
                    content: "normal".to_string(),
                    line: 4,
                    col: 1
                },
            ]
        );
    }

    #[test]
    fn test_selector_filters_to_matched_subtree() {
        let parser = MarkupTemplateParser::new(TemplateMode::Html);
        let mut collector = EventCollector::new();
        parser
            .parse_template(
                &EngineConfig::new(),
                TemplateMode::Html,
                Resource::from_string(
                    "t",
                    "<div>out<section><p>in</p></section>tail</div>",
                ),
                &["section"],
                &mut collector,
            )
            .unwrap();
        let events = collector.take_events();
        let names: Vec<String> = events
            .iter()
            .filter_map(|e| match e {
                MarkupEvent::OpenTag { name, .. } => Some(format!("<{name}>")),
                MarkupEvent::CloseTag { name, .. } => Some(format!("</{name}>")),
                MarkupEvent::Text { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["<section>", "<p>", "in", "</p>", "</section>"]);
    }
}
