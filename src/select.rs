//! Block selection: forwarding only the subtrees named by fragment
//! selectors
//!
//! A selector matches an open tag either by element name (normalized per
//! mode) or, when a dialect prefix is configured, through a fragment
//! declaration attribute on the tag: `prefix:fragment` in both modes, or
//! `data-prefix-fragment` in HTML. The attribute value names the fragment
//! exactly (`header`) or in parameterized form (`header(title)`).
//!
//! Runs after parser-level comment normalization, so selectors never see
//! content that the comment protocol removed.

use std::rc::Rc;

use crate::error::TemplateError;
use crate::lexer::{Attribute, MarkupHandler, ParseError, ParseStatusRef};
use crate::names::{self, TemplateMode};

/// Resolves whether a tag's attributes declare a named fragment, for one
/// dialect prefix.
#[derive(Debug)]
pub struct FragmentReferenceResolver {
    fragment_attr: String,
    data_attr: String,
}

impl FragmentReferenceResolver {
    pub fn new(prefix: &str) -> Self {
        FragmentReferenceResolver {
            fragment_attr: format!("{prefix}:fragment"),
            data_attr: format!("data-{prefix}-fragment"),
        }
    }

    /// Whether any attribute declares a fragment named `reference`.
    pub fn matches(
        &self,
        mode: TemplateMode,
        attributes: &[Attribute<'_>],
        reference: &str,
    ) -> bool {
        attributes.iter().any(|attr| {
            let declares = mode.names_equal(attr.name, &self.fragment_attr)
                || (mode.is_html() && attr.name.eq_ignore_ascii_case(&self.data_attr));
            declares
                && attr
                    .value
                    .is_some_and(|v| reference_value_matches(v, reference))
        })
    }
}

/// Whether a fragment declaration value names `reference`: exact match
/// or the parameterized `reference(...)` form.
fn reference_value_matches(value: &str, reference: &str) -> bool {
    let value = value.trim();
    if value == reference {
        return true;
    }
    value.strip_prefix(reference).is_some_and(|rest| {
        rest.trim_start().starts_with('(')
    })
}

/// Handler-chain link that forwards only the subtree(s) matched by the
/// configured selectors. Document start/end always pass through.
pub struct BlockSelectorHandler<H: MarkupHandler> {
    next: H,
    selectors: Vec<String>,
    resolver: Option<Rc<FragmentReferenceResolver>>,
    mode: TemplateMode,
    /// normalized names of elements still expecting a close tag,
    /// kept in lockstep with the lexer's own open-tag stack
    open_stack: Vec<String>,
    /// index in `open_stack` of the currently-selected subtree's root
    selected: Option<usize>,
}

impl<H: MarkupHandler> BlockSelectorHandler<H> {
    pub fn new(
        next: H,
        selectors: &[&str],
        resolver: Option<Rc<FragmentReferenceResolver>>,
        mode: TemplateMode,
    ) -> Result<Self, TemplateError> {
        if selectors.is_empty() {
            return Err(TemplateError::Contract(
                "block selection requires at least one selector".to_string(),
            ));
        }
        if selectors.iter().any(|s| s.trim().is_empty()) {
            return Err(TemplateError::Contract(
                "block selectors must be non-empty".to_string(),
            ));
        }
        Ok(BlockSelectorHandler {
            next,
            selectors: selectors.iter().map(|s| mode.normalize(s.trim())).collect(),
            resolver,
            mode,
            open_stack: Vec::new(),
            selected: None,
        })
    }

    fn inside_selection(&self) -> bool {
        self.selected.is_some()
    }

    fn tag_matches(&self, name: &str, attributes: &[Attribute<'_>]) -> bool {
        let normalized = self.mode.normalize(name);
        if self.selectors.iter().any(|s| *s == normalized) {
            return true;
        }
        if let Some(resolver) = &self.resolver {
            return self
                .selectors
                .iter()
                .any(|s| resolver.matches(self.mode, attributes, s));
        }
        false
    }

    /// Whether this open tag will be paired with a close tag (HTML void
    /// elements and self-closed tags are complete on their own).
    fn expects_close(&self, name: &str, self_closing: bool) -> bool {
        if self_closing {
            return false;
        }
        !(self.mode.is_html() && names::is_html_void(&self.mode.normalize(name)))
    }
}

impl<H: MarkupHandler> MarkupHandler for BlockSelectorHandler<H> {
    fn parse_status(&mut self, status: ParseStatusRef) {
        self.next.parse_status(status);
    }

    fn document_start(&mut self, top_level: bool, line: u32, col: u32) -> Result<(), ParseError> {
        self.next.document_start(top_level, line, col)
    }

    fn document_end(&mut self, line: u32, col: u32) -> Result<(), ParseError> {
        self.next.document_end(line, col)
    }

    fn open_tag(
        &mut self,
        name: &str,
        attributes: &[Attribute<'_>],
        self_closing: bool,
        line: u32,
        col: u32,
    ) -> Result<(), ParseError> {
        let forward = if self.inside_selection() {
            true
        } else if self.tag_matches(name, attributes) {
            if self.expects_close(name, self_closing) {
                self.selected = Some(self.open_stack.len());
            }
            // a self-contained tag is a complete one-event subtree
            true
        } else {
            false
        };
        if self.expects_close(name, self_closing) {
            self.open_stack.push(self.mode.normalize(name));
        }
        if forward {
            self.next.open_tag(name, attributes, self_closing, line, col)
        } else {
            Ok(())
        }
    }

    fn close_tag(&mut self, name: &str, matched: bool, line: u32, col: u32) -> Result<(), ParseError> {
        if matched {
            // mirror the lexer: one matched close may pop several
            // unclosed inner opens
            let normalized = self.mode.normalize(name);
            if let Some(idx) = self.open_stack.iter().rposition(|open| *open == normalized) {
                self.open_stack.truncate(idx);
                if let Some(selected) = self.selected {
                    if selected == idx {
                        // this close tag ends the selected subtree
                        self.selected = None;
                        return self.next.close_tag(name, matched, line, col);
                    }
                    if selected > idx {
                        // an enclosing, never-forwarded element closed
                        // over the selection; end it without forwarding
                        self.selected = None;
                        return Ok(());
                    }
                }
            }
        }
        if self.inside_selection() {
            self.next.close_tag(name, matched, line, col)
        } else {
            Ok(())
        }
    }

    fn text(&mut self, content: &str, line: u32, col: u32) -> Result<(), ParseError> {
        if self.inside_selection() {
            self.next.text(content, line, col)
        } else {
            Ok(())
        }
    }

    fn comment(&mut self, content: &str, line: u32, col: u32) -> Result<(), ParseError> {
        if self.inside_selection() {
            self.next.comment(content, line, col)
        } else {
            Ok(())
        }
    }

    fn cdata(&mut self, content: &str, line: u32, col: u32) -> Result<(), ParseError> {
        if self.inside_selection() {
            self.next.cdata(content, line, col)
        } else {
            Ok(())
        }
    }

    fn processing_instruction(
        &mut self,
        target: &str,
        data: Option<&str>,
        line: u32,
        col: u32,
    ) -> Result<(), ParseError> {
        if self.inside_selection() {
            self.next.processing_instruction(target, data, line, col)
        } else {
            Ok(())
        }
    }

    fn doctype(&mut self, clause: &str, line: u32, col: u32) -> Result<(), ParseError> {
        if self.inside_selection() {
            self.next.doctype(clause, line, col)
        } else {
            Ok(())
        }
    }
}
