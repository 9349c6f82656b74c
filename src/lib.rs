//! velum - Server-side markup templating core
//!
//! Layers:
//! - Lexer: streaming HTML/XML markup to handler-chain events (lexer)
//! - Parse orchestration: comment protocol, timing, entry points (parser)
//! - Block selection: fragment selectors over the event stream (select)
//! - Node model: reusable pooled/factory event nodes (node)
//! - Processor contract: tag matching and dispatch (processor)

pub mod error;
pub mod lexer;
pub mod names;
pub mod node;
pub mod parser;
pub mod processor;
pub mod resource;
pub mod select;

pub use error::{InputError, Result, TemplateError};
pub use lexer::{Attribute, MarkupHandler, MarkupLexer, ParseError, ParseStatus, ParseStatusRef};
pub use names::{AttributeName, ElementDefinition, ElementDefinitions, ElementName, TemplateMode};
pub use node::{as_engine_node, Node, NodeArena, NodeKind, NodeView, OwnedAttribute, SlotId};
pub use parser::{
    EngineConfig, MarkupTemplateParser, ParserLevelCommentHandler, TimingSink, TracingTimingSink,
    PARSER_LEVEL_COMMENT_CLOSE,
};
pub use processor::{
    dispatch, process_tree, AttributeMatch, ElementProcessor, MatchingContext, ProcessingContext,
    ProcessorResult, TagMatcher, TreeDirective, TreeElementProcessor, TreeNode,
};
pub use resource::Resource;
pub use select::{BlockSelectorHandler, FragmentReferenceResolver};
