//! Reusable node model
//!
//! One tagged-variant type covers every event the engine materializes:
//! tags, text, comments, CDATA, processing instructions and DOCTYPEs.
//! Two provenance classes exist for each variant:
//!
//! - *engine-pooled* instances live in a [`NodeArena`] slot, created once
//!   per parser thread and repopulated in place (`reset`) for each event,
//!   so the hot streaming path allocates nothing per event;
//! - *model-factory* instances are standalone, fully populated at
//!   construction, and owned by whatever tree holds them.
//!
//! A node's observable fields are always self-consistent after any
//! reset/clone: reset overwrites every mutable field, never a subset.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;

use crate::lexer::Attribute;
use crate::names::TemplateMode;

/// Variant discriminant shared by the node model and the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeKind {
    OpenTag = 0,
    CloseTag = 1,
    UnmatchedCloseTag = 2,
    Text = 3,
    Comment = 4,
    Cdata = 5,
    ProcessingInstruction = 6,
    DocType = 7,
}

impl NodeKind {
    pub const ALL: [NodeKind; 8] = [
        NodeKind::OpenTag,
        NodeKind::CloseTag,
        NodeKind::UnmatchedCloseTag,
        NodeKind::Text,
        NodeKind::Comment,
        NodeKind::Cdata,
        NodeKind::ProcessingInstruction,
        NodeKind::DocType,
    ];

    /// Whether this variant's primary value is an element name (as opposed
    /// to a content payload).
    #[inline]
    fn is_named(self) -> bool {
        matches!(
            self,
            NodeKind::OpenTag
                | NodeKind::CloseTag
                | NodeKind::UnmatchedCloseTag
                | NodeKind::ProcessingInstruction
        )
    }
}

/// An attribute owned by a node (copied out of the lexer's borrowed view).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedAttribute {
    pub name: String,
    /// `None` for valueless attributes (`<input disabled>`)
    pub value: Option<String>,
}

impl OwnedAttribute {
    pub fn new(name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        OwnedAttribute {
            name: name.into(),
            value: value.map(Into::into),
        }
    }
}

/// A template event materialized as a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    mode: TemplateMode,
    /// Element name / PI target for named variants; empty otherwise
    name: String,
    /// Payload for text/comment/CDATA/DOCTYPE; PI data
    content: String,
    /// Only populated for open tags
    attributes: Vec<OwnedAttribute>,
    template_name: Option<String>,
    line: u32,
    col: u32,
}

impl Node {
    /// Engine-form constructor: an empty, reusable instance bound to a
    /// template mode. Populated later via [`Node::reset`].
    pub fn pooled(kind: NodeKind, mode: TemplateMode) -> Self {
        Node {
            kind,
            mode,
            name: String::new(),
            content: String::new(),
            attributes: Vec::new(),
            template_name: None,
            line: 0,
            col: 0,
        }
    }

    /// Model-factory constructor: a fully-populated standalone instance
    /// for programmatic tree building. `value` is the element name (or PI
    /// target) for named variants and the content payload otherwise.
    pub fn factory(kind: NodeKind, mode: TemplateMode, value: &str) -> Self {
        let mut node = Node::pooled(kind, mode);
        node.reset(value, None, 0, 0);
        node
    }

    /// Overwrite all mutable fields in place.
    ///
    /// Used to repopulate a pooled instance for the next event without
    /// allocating a new node. Names of tag variants are case-normalized
    /// per the node's mode; stale content and attributes are cleared.
    pub fn reset(&mut self, value: &str, template_name: Option<&str>, line: u32, col: u32) {
        self.name.clear();
        self.content.clear();
        self.attributes.clear();
        if self.kind.is_named() {
            match self.mode {
                TemplateMode::Html => {
                    self.name.extend(value.chars().map(|c| c.to_ascii_lowercase()))
                }
                TemplateMode::Xml => self.name.push_str(value),
            }
        } else {
            self.content.push_str(value);
        }
        self.template_name = template_name.map(str::to_string);
        self.line = line;
        self.col = col;
    }

    /// Replace the attribute set (open tags only; ignored for other
    /// variants, which never carry attributes).
    pub fn set_attributes(&mut self, attrs: &[Attribute<'_>]) {
        self.attributes.clear();
        if self.kind != NodeKind::OpenTag {
            return;
        }
        self.attributes
            .extend(attrs.iter().map(|a| OwnedAttribute::new(a.name, a.value)));
    }

    /// Set the data payload for a processing-instruction node.
    pub fn set_content(&mut self, content: &str) {
        self.content.clear();
        self.content.push_str(content);
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn mode(&self) -> TemplateMode {
        self.mode
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn attributes(&self) -> &[OwnedAttribute] {
        &self.attributes
    }

    pub fn template_name(&self) -> Option<&str> {
        self.template_name.as_deref()
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn col(&self) -> u32 {
        self.col
    }

    /// The variant's primary value: element name / PI target for named
    /// variants, content payload otherwise.
    pub fn value(&self) -> &str {
        if self.kind.is_named() {
            &self.name
        } else {
            &self.content
        }
    }

    /// Write the node's textual form to a character sink.
    ///
    /// Close tags always serialize as `</name>`: the matched/unmatched
    /// distinction affects engine-level interpretation, never output.
    pub fn write<W: fmt::Write>(&self, w: &mut W) -> fmt::Result {
        match self.kind {
            NodeKind::OpenTag => {
                w.write_char('<')?;
                w.write_str(&self.name)?;
                for attr in &self.attributes {
                    w.write_char(' ')?;
                    w.write_str(&attr.name)?;
                    if let Some(value) = &attr.value {
                        w.write_str("=\"")?;
                        w.write_str(value)?;
                        w.write_char('"')?;
                    }
                }
                w.write_char('>')
            }
            NodeKind::CloseTag | NodeKind::UnmatchedCloseTag => {
                w.write_str("</")?;
                w.write_str(&self.name)?;
                w.write_char('>')
            }
            NodeKind::Text => w.write_str(&self.content),
            NodeKind::Comment => {
                w.write_str("<!--")?;
                w.write_str(&self.content)?;
                w.write_str("-->")
            }
            NodeKind::Cdata => {
                w.write_str("<![CDATA[")?;
                w.write_str(&self.content)?;
                w.write_str("]]>")
            }
            NodeKind::ProcessingInstruction => {
                w.write_str("<?")?;
                w.write_str(&self.name)?;
                if !self.content.is_empty() {
                    w.write_char(' ')?;
                    w.write_str(&self.content)?;
                }
                w.write_str("?>")
            }
            NodeKind::DocType => {
                w.write_str("<!DOCTYPE ")?;
                w.write_str(&self.content)?;
                w.write_char('>')
            }
        }
    }
}

/// Public observable contract of a node, implemented by the engine's own
/// [`Node`] and by any external representation a processor may hand back.
pub trait NodeView: Any {
    fn kind(&self) -> NodeKind;
    fn mode(&self) -> TemplateMode;
    /// Element name / PI target for named variants, payload otherwise.
    fn value(&self) -> &str;
    fn template_name(&self) -> Option<&str>;
    fn line(&self) -> u32;
    fn col(&self) -> u32;
    fn as_any(&self) -> &dyn Any;
}

impl NodeView for Node {
    fn kind(&self) -> NodeKind {
        self.kind
    }

    fn mode(&self) -> TemplateMode {
        self.mode
    }

    fn value(&self) -> &str {
        Node::value(self)
    }

    fn template_name(&self) -> Option<&str> {
        Node::template_name(self)
    }

    fn line(&self) -> u32 {
        self.line
    }

    fn col(&self) -> u32 {
        self.col
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Adapt an arbitrary node view to the engine's internal form.
///
/// - Already internal and `force_clone` is false: zero-copy passthrough.
/// - Already internal and `force_clone` is true: independent clone, so the
///   same logical event can be handed to multiple consumers without
///   aliasing.
/// - External implementation: a fresh internal instance populated (via
///   reset) from the view's observable fields, regardless of `force_clone`.
pub fn as_engine_node(view: &dyn NodeView, force_clone: bool) -> Cow<'_, Node> {
    if let Some(node) = view.as_any().downcast_ref::<Node>() {
        if force_clone {
            Cow::Owned(node.clone())
        } else {
            Cow::Borrowed(node)
        }
    } else {
        let mut node = Node::pooled(view.kind(), view.mode());
        node.reset(view.value(), view.template_name(), view.line(), view.col());
        Cow::Owned(node)
    }
}

/// Handle to a pooled node slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotId(u8);

/// Arena of pre-allocated pooled nodes, one slot per variant.
///
/// Slots are repopulated in place per event; capturing a node for use
/// beyond the current event clones it out of its slot. Slots are owned by
/// exactly one thread for exactly one "current event" at a time.
pub struct NodeArena {
    slots: Vec<Node>,
}

impl NodeArena {
    pub fn new(mode: TemplateMode) -> Self {
        NodeArena {
            slots: NodeKind::ALL
                .iter()
                .map(|&kind| Node::pooled(kind, mode))
                .collect(),
        }
    }

    /// The slot handle for a variant.
    #[inline]
    pub fn slot(kind: NodeKind) -> SlotId {
        SlotId(kind as u8)
    }

    /// Repopulate a slot for the next event and return it for any
    /// follow-up population (attributes, PI data).
    pub fn reset(
        &mut self,
        slot: SlotId,
        value: &str,
        template_name: Option<&str>,
        line: u32,
        col: u32,
    ) -> &mut Node {
        let node = &mut self.slots[slot.0 as usize];
        node.reset(value, template_name, line, col);
        node
    }

    pub fn node(&self, slot: SlotId) -> &Node {
        &self.slots[slot.0 as usize]
    }

    /// Copy a slot's current node out of the arena, giving it a life
    /// independent of the next reset.
    pub fn capture(&self, slot: SlotId) -> Node {
        self.slots[slot.0 as usize].clone()
    }
}
