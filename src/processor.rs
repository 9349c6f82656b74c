//! Processor matching and dispatch
//!
//! Processors come in two families sharing one matching contract:
//!
//! - [`ElementProcessor`]: streaming, invoked per open-tag occurrence,
//!   returning a directive for the execution engine without touching the
//!   node model;
//! - [`TreeElementProcessor`]: invoked over a realized subtree, with a
//!   `before` hook that may mutate, remove or replace the subtree and an
//!   `after` hook that fires on exit.
//!
//! Candidates are an externally-ordered sequence; every processor whose
//! matcher accepts the tag is invoked in that order.

use crate::error::TemplateError;
use crate::names::{AttributeName, ElementDefinition, ElementDefinitions, ElementName, TemplateMode};
use crate::node::{Node, NodeKind, OwnedAttribute};

/// Per-parse context handed to every processor invocation.
#[derive(Debug, Clone)]
pub struct ProcessingContext {
    pub template: String,
    pub mode: TemplateMode,
}

/// Dialect-level context the matcher family was registered under.
#[derive(Debug, Clone)]
pub struct MatchingContext {
    pub dialect_prefix: Option<String>,
    pub mode: TemplateMode,
}

/// Attribute constraint of a [`TagMatcher`]: the attribute must be
/// present, and when `value` is set it must match exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMatch {
    pub name: AttributeName,
    pub value: Option<String>,
}

/// Predicate deciding which tag occurrences a processor applies to.
///
/// At least one constraint is required; a matcher with neither an
/// element nor an attribute constraint would apply to everything, which
/// is always a registration mistake.
#[derive(Debug, Clone)]
pub struct TagMatcher {
    element: Option<ElementName>,
    attribute: Option<AttributeMatch>,
}

impl TagMatcher {
    pub fn new(
        element: Option<ElementName>,
        attribute: Option<AttributeMatch>,
    ) -> Result<Self, TemplateError> {
        if element.is_none() && attribute.is_none() {
            return Err(TemplateError::Configuration(
                "a tag matcher requires an element or attribute constraint".to_string(),
            ));
        }
        Ok(TagMatcher { element, attribute })
    }

    /// Apply both constraints to a concrete tag occurrence. Attribute
    /// names compare under the mode's case rules; values compare exactly.
    pub fn matches(
        &self,
        element_name: &str,
        attributes: &[OwnedAttribute],
        mode: TemplateMode,
    ) -> bool {
        if let Some(element) = &self.element {
            if !mode.names_equal(element.as_str(), element_name) {
                return false;
            }
        }
        if let Some(constraint) = &self.attribute {
            let found = attributes.iter().any(|attr| {
                mode.names_equal(constraint.name.as_str(), &attr.name)
                    && match &constraint.value {
                        Some(expected) => attr.value.as_deref() == Some(expected.as_str()),
                        None => true,
                    }
            });
            if !found {
                return false;
            }
        }
        true
    }
}

/// Directive returned by a streaming processor, consumed by the
/// execution engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessorResult {
    Continue,
    SkipBody,
    RemoveElement,
    ReplaceWith(Vec<Node>),
}

/// Streaming element processor: observes a tag occurrence, returns a
/// directive, never mutates the node model.
pub trait ElementProcessor {
    fn matcher(&self) -> &TagMatcher;

    #[allow(clippy::too_many_arguments)]
    fn process(
        &self,
        ctx: &ProcessingContext,
        mctx: &MatchingContext,
        definition: &ElementDefinition,
        element_name: &str,
        attributes: &[OwnedAttribute],
        line: u32,
        col: u32,
    ) -> ProcessorResult;
}

/// Invoke every matching streaming processor in candidate order,
/// collecting their directives.
#[allow(clippy::too_many_arguments)]
pub fn dispatch(
    processors: &[Box<dyn ElementProcessor>],
    ctx: &ProcessingContext,
    mctx: &MatchingContext,
    definitions: &mut ElementDefinitions,
    element_name: &str,
    attributes: &[OwnedAttribute],
    line: u32,
    col: u32,
) -> Vec<ProcessorResult> {
    let mode = definitions.mode();
    let definition = definitions.for_element(element_name);
    processors
        .iter()
        .filter(|p| p.matcher().matches(element_name, attributes, mode))
        .map(|p| p.process(ctx, mctx, &definition, element_name, attributes, line, col))
        .collect()
}

/// An element subtree realized as owned nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub node: Node,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(node: Node) -> Self {
        TreeNode {
            node,
            children: Vec::new(),
        }
    }

    pub fn with_children(node: Node, children: Vec<TreeNode>) -> Self {
        TreeNode { node, children }
    }
}

/// Directive returned by a tree processor's `before` hook.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeDirective {
    Continue,
    /// Drop the subtree; its `after` hooks never fire
    Remove,
    /// Substitute the subtree with sibling subtrees; the replacement is
    /// not traversed and its `after` hooks never fire
    Replace(Vec<TreeNode>),
}

/// Realized-tree element processor: `before` fires on entry and may
/// rewrite the subtree, `after` fires on exit.
pub trait TreeElementProcessor {
    fn matcher(&self) -> &TagMatcher;

    fn before(
        &self,
        _ctx: &ProcessingContext,
        _mctx: &MatchingContext,
        _node: &mut TreeNode,
    ) -> TreeDirective {
        TreeDirective::Continue
    }

    fn after(&self, _ctx: &ProcessingContext, _mctx: &MatchingContext, _node: &mut TreeNode) {}
}

/// Depth-first traversal applying every matching tree processor in
/// candidate order.
///
/// The first non-`Continue` directive from a `before` hook settles the
/// node: later candidates are not invoked for it, and `after` hooks are
/// skipped for removed or replaced nodes.
pub fn process_tree(
    nodes: &mut Vec<TreeNode>,
    processors: &[&dyn TreeElementProcessor],
    ctx: &ProcessingContext,
    mctx: &MatchingContext,
) {
    let mut i = 0;
    while i < nodes.len() {
        if nodes[i].node.kind() != NodeKind::OpenTag {
            i += 1;
            continue;
        }
        let mode = nodes[i].node.mode();
        let mut directive = TreeDirective::Continue;
        let mut invoked = Vec::new();
        for (idx, processor) in processors.iter().enumerate() {
            let node = &mut nodes[i];
            if processor
                .matcher()
                .matches(node.node.name(), node.node.attributes(), mode)
            {
                invoked.push(idx);
                directive = processor.before(ctx, mctx, node);
                if directive != TreeDirective::Continue {
                    break;
                }
            }
        }
        match directive {
            TreeDirective::Remove => {
                nodes.remove(i);
            }
            TreeDirective::Replace(replacement) => {
                let advance = replacement.len();
                nodes.splice(i..=i, replacement);
                i += advance;
            }
            TreeDirective::Continue => {
                process_tree(&mut nodes[i].children, processors, ctx, mctx);
                for &idx in &invoked {
                    processors[idx].after(ctx, mctx, &mut nodes[i]);
                }
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn ctx() -> ProcessingContext {
        ProcessingContext {
            template: "t".to_string(),
            mode: TemplateMode::Html,
        }
    }

    fn mctx() -> MatchingContext {
        MatchingContext {
            dialect_prefix: Some("th".to_string()),
            mode: TemplateMode::Html,
        }
    }

    fn element_matcher(defs: &mut ElementDefinitions, name: &str) -> TagMatcher {
        TagMatcher::new(Some(defs.element_name(name)), None).unwrap()
    }

    fn attribute_matcher(
        defs: &mut ElementDefinitions,
        name: &str,
        value: Option<&str>,
    ) -> TagMatcher {
        TagMatcher::new(
            None,
            Some(AttributeMatch {
                name: defs.attribute_name(name),
                value: value.map(str::to_string),
            }),
        )
        .unwrap()
    }

    fn open(name: &str, attrs: &[(&str, Option<&str>)]) -> Node {
        let mut node = Node::factory(NodeKind::OpenTag, TemplateMode::Html, name);
        let owned: Vec<crate::lexer::Attribute<'_>> = attrs
            .iter()
            .map(|(n, v)| crate::lexer::Attribute { name: n, value: *v })
            .collect();
        node.set_attributes(&owned);
        node
    }

    #[test]
    fn test_matcher_requires_a_constraint() {
        assert!(matches!(
            TagMatcher::new(None, None),
            Err(TemplateError::Configuration(_))
        ));
    }

    #[test]
    fn test_element_constraint() {
        let mut defs = ElementDefinitions::new(TemplateMode::Html);
        let matcher = element_matcher(&mut defs, "div");
        assert!(matcher.matches("DIV", &[], TemplateMode::Html));
        assert!(!matcher.matches("span", &[], TemplateMode::Html));
    }

    #[test]
    fn test_attribute_constraint_presence_and_value() {
        let mut defs = ElementDefinitions::new(TemplateMode::Html);
        let attrs = vec![OwnedAttribute::new("th:text", Some("greeting"))];

        let by_presence = attribute_matcher(&mut defs, "th:text", None);
        assert!(by_presence.matches("p", &attrs, TemplateMode::Html));

        let by_value = attribute_matcher(&mut defs, "th:text", Some("greeting"));
        assert!(by_value.matches("p", &attrs, TemplateMode::Html));

        let wrong_value = attribute_matcher(&mut defs, "th:text", Some("other"));
        assert!(!wrong_value.matches("p", &attrs, TemplateMode::Html));
    }

    #[test]
    fn test_combined_constraints_both_required() {
        let mut defs = ElementDefinitions::new(TemplateMode::Html);
        let matcher = TagMatcher::new(
            Some(defs.element_name("div")),
            Some(AttributeMatch {
                name: defs.attribute_name("th:if"),
                value: None,
            }),
        )
        .unwrap();
        let attrs = vec![OwnedAttribute::new("th:if", Some("cond"))];
        assert!(matcher.matches("div", &attrs, TemplateMode::Html));
        assert!(!matcher.matches("span", &attrs, TemplateMode::Html));
        assert!(!matcher.matches("div", &[], TemplateMode::Html));
    }

    struct RecordingProcessor {
        matcher: TagMatcher,
        label: &'static str,
        result: ProcessorResult,
        log: std::rc::Rc<RefCell<Vec<&'static str>>>,
    }

    impl ElementProcessor for RecordingProcessor {
        fn matcher(&self) -> &TagMatcher {
            &self.matcher
        }

        fn process(
            &self,
            _ctx: &ProcessingContext,
            _mctx: &MatchingContext,
            _definition: &ElementDefinition,
            _element_name: &str,
            _attributes: &[OwnedAttribute],
            _line: u32,
            _col: u32,
        ) -> ProcessorResult {
            self.log.borrow_mut().push(self.label);
            self.result.clone()
        }
    }

    #[test]
    fn test_dispatch_invokes_matching_processors_in_order() {
        let mut defs = ElementDefinitions::new(TemplateMode::Html);
        let log = std::rc::Rc::new(RefCell::new(Vec::new()));
        let processors: Vec<Box<dyn ElementProcessor>> = vec![
            Box::new(RecordingProcessor {
                matcher: element_matcher(&mut defs, "div"),
                label: "first",
                result: ProcessorResult::Continue,
                log: log.clone(),
            }),
            Box::new(RecordingProcessor {
                matcher: element_matcher(&mut defs, "span"),
                label: "other",
                result: ProcessorResult::Continue,
                log: log.clone(),
            }),
            Box::new(RecordingProcessor {
                matcher: element_matcher(&mut defs, "div"),
                label: "second",
                result: ProcessorResult::SkipBody,
                log: log.clone(),
            }),
        ];

        let results = dispatch(
            &processors,
            &ctx(),
            &mctx(),
            &mut defs,
            "div",
            &[],
            1,
            1,
        );
        assert_eq!(*log.borrow(), vec!["first", "second"]);
        assert_eq!(
            results,
            vec![ProcessorResult::Continue, ProcessorResult::SkipBody]
        );
    }

    struct TreeRecorder {
        matcher: TagMatcher,
        directive: TreeDirective,
        log: std::rc::Rc<RefCell<Vec<String>>>,
    }

    impl TreeElementProcessor for TreeRecorder {
        fn matcher(&self) -> &TagMatcher {
            &self.matcher
        }

        fn before(
            &self,
            _ctx: &ProcessingContext,
            _mctx: &MatchingContext,
            node: &mut TreeNode,
        ) -> TreeDirective {
            self.log
                .borrow_mut()
                .push(format!("before {}", node.node.name()));
            self.directive.clone()
        }

        fn after(&self, _ctx: &ProcessingContext, _mctx: &MatchingContext, node: &mut TreeNode) {
            self.log
                .borrow_mut()
                .push(format!("after {}", node.node.name()));
        }
    }

    #[test]
    fn test_tree_traversal_fires_before_children_after() {
        let mut defs = ElementDefinitions::new(TemplateMode::Html);
        let log = std::rc::Rc::new(RefCell::new(Vec::new()));
        let recorder = TreeRecorder {
            matcher: attribute_matcher(&mut defs, "th:each", None),
            directive: TreeDirective::Continue,
            log: log.clone(),
        };

        let mut tree = vec![TreeNode::with_children(
            open("ul", &[("th:each", Some("i"))]),
            vec![TreeNode::new(open("li", &[("th:each", Some("j"))]))],
        )];
        process_tree(&mut tree, &[&recorder], &ctx(), &mctx());
        assert_eq!(
            *log.borrow(),
            vec!["before ul", "before li", "after li", "after ul"]
        );
    }

    #[test]
    fn test_after_never_fires_for_removed_nodes() {
        let mut defs = ElementDefinitions::new(TemplateMode::Html);
        let log = std::rc::Rc::new(RefCell::new(Vec::new()));
        let recorder = TreeRecorder {
            matcher: attribute_matcher(&mut defs, "th:remove", None),
            directive: TreeDirective::Remove,
            log: log.clone(),
        };

        let mut tree = vec![
            TreeNode::new(open("div", &[("th:remove", None)])),
            TreeNode::new(open("p", &[])),
        ];
        process_tree(&mut tree, &[&recorder], &ctx(), &mctx());
        assert_eq!(*log.borrow(), vec!["before div"]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].node.name(), "p");
    }

    #[test]
    fn test_replacement_is_not_traversed() {
        let mut defs = ElementDefinitions::new(TemplateMode::Html);
        let log = std::rc::Rc::new(RefCell::new(Vec::new()));
        // the replacement subtree would itself match, so traversing it
        // would show up in the log
        let recorder = TreeRecorder {
            matcher: element_matcher(&mut defs, "div"),
            directive: TreeDirective::Replace(vec![
                TreeNode::new(open("div", &[])),
                TreeNode::new(open("div", &[])),
            ]),
            log: log.clone(),
        };

        let mut tree = vec![TreeNode::new(open("div", &[]))];
        process_tree(&mut tree, &[&recorder], &ctx(), &mctx());
        assert_eq!(*log.borrow(), vec!["before div"]);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_first_settling_directive_stops_later_candidates() {
        let mut defs = ElementDefinitions::new(TemplateMode::Html);
        let log = std::rc::Rc::new(RefCell::new(Vec::new()));
        let remover = TreeRecorder {
            matcher: element_matcher(&mut defs, "div"),
            directive: TreeDirective::Remove,
            log: log.clone(),
        };
        let never_reached = TreeRecorder {
            matcher: element_matcher(&mut defs, "div"),
            directive: TreeDirective::Continue,
            log: log.clone(),
        };

        let mut tree = vec![TreeNode::new(open("div", &[]))];
        process_tree(&mut tree, &[&remover, &never_reached], &ctx(), &mctx());
        assert_eq!(*log.borrow(), vec!["before div"]);
        assert!(tree.is_empty());
    }
}
